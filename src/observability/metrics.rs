//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mvola_transactions_total` (counter): finished attempts by status, source
//! - `mvola_callbacks_total` (counter): callbacks by outcome (matched, unmatched, ignored)
//! - `mvola_pending_slots` (gauge): requests currently waiting for a callback
//! - `mvola_callback_wait_seconds` (histogram): time spent waiting on a slot
//! - `mvola_upstream_requests_total` (counter): gateway calls by call, outcome
//! - `mvola_request_timeouts_total` (counter): inbound requests cut off by the overall timeout
//!
//! Recording is a no-op until a recorder is installed.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

pub const TRANSACTIONS_TOTAL: &str = "mvola_transactions_total";
pub const CALLBACKS_TOTAL: &str = "mvola_callbacks_total";
pub const PENDING_SLOTS: &str = "mvola_pending_slots";
pub const CALLBACK_WAIT_SECONDS: &str = "mvola_callback_wait_seconds";
pub const UPSTREAM_REQUESTS_TOTAL: &str = "mvola_upstream_requests_total";
pub const REQUEST_TIMEOUTS_TOTAL: &str = "mvola_request_timeouts_total";

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            register_metrics();
            tracing::info!(address = %addr, "Prometheus metrics exporter started");
        }
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install Prometheus recorder");
        }
    }
}

fn register_metrics() {
    describe_counter!(TRANSACTIONS_TOTAL, "Finished transaction attempts");
    describe_counter!(CALLBACKS_TOTAL, "Received gateway callbacks");
    describe_gauge!(PENDING_SLOTS, "Requests waiting for a callback");
    describe_histogram!(CALLBACK_WAIT_SECONDS, "Time spent waiting for a callback");
    describe_counter!(UPSTREAM_REQUESTS_TOTAL, "Calls made to the MVola gateway");
    describe_counter!(REQUEST_TIMEOUTS_TOTAL, "Inbound requests that hit the overall timeout");
}

pub fn record_transaction(status: &str, source: &str) {
    counter!(
        TRANSACTIONS_TOTAL,
        "status" => status.to_string(),
        "source" => source.to_string()
    )
    .increment(1);
}

pub fn record_callback(outcome: &str) {
    counter!(CALLBACKS_TOTAL, "outcome" => outcome.to_string()).increment(1);
}

pub fn record_upstream(call: &str, outcome: &str) {
    counter!(
        UPSTREAM_REQUESTS_TOTAL,
        "call" => call.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

pub fn record_request_timeout() {
    counter!(REQUEST_TIMEOUTS_TOTAL).increment(1);
}

pub fn pending_slot_added() {
    gauge!(PENDING_SLOTS).increment(1.0);
}

pub fn pending_slot_removed() {
    gauge!(PENDING_SLOTS).decrement(1.0);
}

/// Record how long a waiter spent on its slot.
pub fn record_callback_wait(started: Instant) {
    histogram!(CALLBACK_WAIT_SECONDS).record(started.elapsed().as_secs_f64());
}
