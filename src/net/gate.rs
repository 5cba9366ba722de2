//! Concurrency gate: a fixed pool of handler slots.
//!
//! # Responsibilities
//! - Hold exactly `capacity` permits for the whole service
//! - Hand out permits as RAII guards that release on drop, panics included
//! - Track current and peak occupancy for logging and tests
//!
//! # Design Decisions
//! - Acquisition waits instead of rejecting; overflow queues in the kernel
//!   accept backlog, not in the application

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounded pool of connection handler slots.
#[derive(Debug, Clone)]
pub struct ConnectionGate {
    slots: Arc<Semaphore>,
    capacity: usize,
    in_use: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ConnectionGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_use: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wait for a free slot.
    ///
    /// Returns `None` only if the gate has been closed.
    pub async fn acquire(&self) -> Option<ConnectionPermit> {
        let permit = self.slots.clone().acquire_owned().await.ok()?;
        Some(self.track(permit))
    }

    /// Take a free slot without waiting.
    pub fn try_acquire(&self) -> Option<ConnectionPermit> {
        let permit = self.slots.clone().try_acquire_owned().ok()?;
        Some(self.track(permit))
    }

    /// Stop handing out permits; pending and future `acquire` calls return `None`.
    pub fn close(&self) {
        self.slots.close();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently held.
    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::SeqCst)
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Highest number of slots ever held at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn track(&self, permit: OwnedSemaphorePermit) -> ConnectionPermit {
        let now = self.in_use.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        ConnectionPermit {
            _permit: permit,
            in_use: Arc::clone(&self.in_use),
        }
    }
}

/// A held handler slot.
///
/// When dropped, the slot is released back to the gate.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: OwnedSemaphorePermit,
    in_use: Arc<AtomicUsize>,
}

impl Drop for ConnectionPermit {
    fn drop(&mut self) {
        // Decrement before the semaphore permit field is released.
        self.in_use.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn permits_are_bounded() {
        let gate = ConnectionGate::new(2);
        let a = gate.try_acquire().unwrap();
        let _b = gate.try_acquire().unwrap();
        assert!(gate.try_acquire().is_none());
        assert_eq!(gate.in_use(), 2);

        drop(a);
        assert_eq!(gate.in_use(), 1);
        assert_eq!(gate.available(), 1);
        assert!(gate.try_acquire().is_some());
    }

    #[tokio::test]
    async fn peak_never_exceeds_capacity() {
        let gate = ConnectionGate::new(3);
        let mut tasks = Vec::new();
        for _ in 0..12 {
            let permit = gate.acquire().await.unwrap();
            tasks.push(tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                drop(permit);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(gate.peak(), 3);
        assert_eq!(gate.in_use(), 0);
    }

    #[tokio::test]
    async fn permit_released_when_handler_panics() {
        let gate = ConnectionGate::new(1);
        let permit = gate.acquire().await.unwrap();
        let result = tokio::spawn(async move {
            let _permit = permit;
            panic!("handler failed");
        })
        .await;

        assert!(result.is_err());
        assert_eq!(gate.in_use(), 0);
        assert!(gate.try_acquire().is_some());
    }

    #[tokio::test]
    async fn closed_gate_stops_acquisition() {
        let gate = ConnectionGate::new(1);
        gate.close();
        assert!(gate.acquire().await.is_none());
    }
}
