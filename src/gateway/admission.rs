//! Admission control for backend calls.
//!
//! A fixed pool of slots bounds how many backend calls run at once. Acquisition
//! never waits: callers that find the pool empty are told to back off.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::observability::metrics;

/// Fixed-capacity, non-blocking concurrency limiter.
#[derive(Debug, Clone)]
pub struct AdmissionController {
    slots: Arc<Semaphore>,
    capacity: usize,
}

impl AdmissionController {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Reserve a slot if one is free right now.
    ///
    /// Returns `None` immediately when all slots are held. The slot goes back
    /// to the pool when the returned guard is released or dropped.
    pub fn try_acquire(&self) -> Option<AdmissionSlot> {
        match self.slots.clone().try_acquire_owned() {
            Ok(permit) => {
                metrics::set_admission_in_flight(self.in_flight());
                Some(AdmissionSlot {
                    _permit: permit,
                    controller: self.clone(),
                })
            }
            Err(_) => None,
        }
    }

    /// Configured number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Slots currently held.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.available()
    }
}

/// A held admission slot.
///
/// Dropping the slot returns it to the pool, so it is released exactly once on
/// every exit path, including panics and cancelled requests.
#[derive(Debug)]
pub struct AdmissionSlot {
    _permit: OwnedSemaphorePermit,
    controller: AdmissionController,
}

impl AdmissionSlot {
    /// Return the slot to the pool.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for AdmissionSlot {
    fn drop(&mut self) {
        // Permit is dropped after this body runs.
        metrics::set_admission_in_flight(self.controller.in_flight().saturating_sub(1));
    }
}
