//! Correlation id generation.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of correlation ids for attempts that do not bring their own.
pub trait CorrelationIdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

impl<F> CorrelationIdGenerator for F
where
    F: Fn() -> String + Send + Sync,
{
    fn generate(&self) -> String {
        self()
    }
}

/// Time-based ids rendered as `YYYYMMDDHHMMSSmmm` (UTC).
///
/// The millisecond clock is bumped forward whenever two calls land in the
/// same millisecond, so ids are unique and strictly increasing within the
/// process.
#[derive(Debug, Default)]
pub struct TimestampIdGenerator {
    last_millis: AtomicI64,
}

impl TimestampIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_millis(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last_millis
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
            .unwrap_or(now);
        now.max(previous + 1)
    }
}

impl CorrelationIdGenerator for TimestampIdGenerator {
    fn generate(&self) -> String {
        let millis = self.next_millis();
        match DateTime::<Utc>::from_timestamp_millis(millis) {
            Some(at) => at.format("%Y%m%d%H%M%S%3f").to_string(),
            None => millis.to_string(),
        }
    }
}
