//! Pending-request registry.
//!
//! Maps a correlation id to a one-shot slot that a create-transaction
//! request waits on and an unrelated callback request resolves.
//!
//! # Locking contract
//! - Slots live in a sharded `DashMap`; every operation touches one shard
//!   lock for one key and never holds it across an `.await`.
//! - A slot owns the sending half of a `oneshot` channel. `deliver` takes
//!   it out under the shard lock, so only the first delivery can send.
//! - The receiving half lives in the `SlotHandle`. The channel buffers the
//!   value, so a delivery that lands before the waiter polls is not lost.
//! - A `SlotHandle` removes its own slot when released or dropped. Slots
//!   carry a registration token so a stale handle never removes a newer
//!   slot registered under the same id.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::observability::metrics;
use crate::transactions::TransactionStatus;

/// What a callback hands to the waiting request.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// Mapped transaction status.
    pub status: TransactionStatus,
    /// Full callback body.
    pub payload: Value,
}

/// Result of waiting on a slot.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome {
    Delivered(Delivery),
    TimedOut,
}

/// Errors raised by the registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The id already has a slot in flight.
    #[error("correlation id '{0}' is already in flight")]
    DuplicateId(String),
}

struct Slot {
    token: u64,
    sender: Option<oneshot::Sender<Delivery>>,
    registered_at: Instant,
}

/// Thread-safe `correlation id → pending slot` map.
///
/// Cloning is cheap; clones share the same slots.
#[derive(Clone, Default)]
pub struct PendingRegistry {
    slots: Arc<DashMap<String, Slot>>,
    next_token: Arc<AtomicU64>,
}

impl PendingRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an unset slot for `id` and return the handle to wait on.
    ///
    /// The slot is visible to `deliver` as soon as this returns.
    pub fn register(&self, id: &str) -> Result<SlotHandle, RegistryError> {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();

        match self.slots.entry(id.to_string()) {
            Entry::Occupied(_) => return Err(RegistryError::DuplicateId(id.to_string())),
            Entry::Vacant(vacant) => {
                vacant.insert(Slot {
                    token,
                    sender: Some(sender),
                    registered_at: Instant::now(),
                });
            }
        }
        metrics::pending_slot_added();
        tracing::debug!(correlation_id = %id, "Pending slot registered");

        Ok(SlotHandle {
            id: id.to_string(),
            token,
            receiver,
            registry: self.clone(),
            released: false,
        })
    }

    /// Resolve the slot for `id`. First write wins.
    ///
    /// Returns `false` when no slot is registered, when the slot was already
    /// resolved, or when its waiter is gone. None of these is an error.
    pub fn deliver(&self, id: &str, delivery: Delivery) -> bool {
        let (sender, age) = match self.slots.get_mut(id) {
            Some(mut slot) => {
                let age = slot.registered_at.elapsed();
                (slot.sender.take(), age)
            }
            None => {
                tracing::info!(correlation_id = %id, "No pending slot for callback, audit only");
                return false;
            }
        };

        let Some(sender) = sender else {
            tracing::warn!(
                correlation_id = %id,
                "Slot already resolved, discarding duplicate callback"
            );
            return false;
        };

        let status = delivery.status.to_string();
        match sender.send(delivery) {
            Ok(()) => {
                tracing::info!(
                    correlation_id = %id,
                    status = %status,
                    waited_ms = age.as_millis() as u64,
                    "Pending slot resolved"
                );
                true
            }
            Err(_) => {
                tracing::debug!(correlation_id = %id, "Waiter already gone, callback dropped");
                false
            }
        }
    }

    /// Delete the slot for `id`. Idempotent.
    pub fn remove(&self, id: &str) {
        if self.slots.remove(id).is_some() {
            metrics::pending_slot_removed();
            tracing::debug!(correlation_id = %id, "Pending slot removed");
        }
    }

    fn remove_owned(&self, id: &str, token: u64) {
        if self.slots.remove_if(id, |_, slot| slot.token == token).is_some() {
            metrics::pending_slot_removed();
            tracing::debug!(correlation_id = %id, "Pending slot released");
        }
    }

    /// Whether a slot is registered for `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.slots.contains_key(id)
    }

    /// Number of in-flight slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl std::fmt::Debug for PendingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRegistry")
            .field("in_flight", &self.slots.len())
            .finish()
    }
}

/// Waitable handle for one registered slot.
///
/// Dropping the handle removes the slot, so a cancelled request never leaks
/// a registry entry.
pub struct SlotHandle {
    id: String,
    token: u64,
    receiver: oneshot::Receiver<Delivery>,
    registry: PendingRegistry,
    released: bool,
}

impl SlotHandle {
    /// Correlation id of this slot.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Suspend the calling task until the slot is resolved or `timeout` elapses.
    pub async fn wait(&mut self, timeout: Duration) -> WaitOutcome {
        let started = Instant::now();
        let outcome = match tokio::time::timeout(timeout, &mut self.receiver).await {
            Ok(Ok(delivery)) => WaitOutcome::Delivered(delivery),
            Ok(Err(_)) => {
                // Sender dropped: the slot was removed out from under us.
                tracing::warn!(correlation_id = %self.id, "Pending slot removed while waiting");
                WaitOutcome::TimedOut
            }
            Err(_) => WaitOutcome::TimedOut,
        };
        metrics::record_callback_wait(started);
        outcome
    }

    /// Remove the slot and return a delivery that raced with the deadline, if any.
    pub fn release(mut self) -> Option<Delivery> {
        self.registry.remove_owned(&self.id, self.token);
        self.released = true;
        self.receiver.try_recv().ok()
    }
}

impl Drop for SlotHandle {
    fn drop(&mut self) {
        if !self.released {
            self.registry.remove_owned(&self.id, self.token);
        }
    }
}

impl std::fmt::Debug for SlotHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotHandle")
            .field("id", &self.id)
            .field("token", &self.token)
            .finish()
    }
}
