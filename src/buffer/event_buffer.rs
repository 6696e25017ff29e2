// src/buffer/event_buffer.rs
//! Bounded lock-free event buffer
//!
//! Producers call [`EventBuffer::enqueue`] from request-handling paths; a
//! periodic consumer calls [`EventBuffer::drain_all`]. Enqueue never waits:
//! when the buffer is full the record is rejected and handed back.

use crate::buffer::record::EventRecord;
use crate::utils::errors::{EngineError, Result};
use crossbeam::queue::ArrayQueue;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use tracing::{debug, trace, warn};

/// Outcome of [`EventBuffer::enqueue`]
#[derive(Debug)]
#[must_use]
pub enum EnqueueOutcome {
    /// Record stored; ownership moved to the buffer
    Accepted,

    /// Record dropped. Carries the record back to the producer when it
    /// survived the attempt (it does not survive an internal fault).
    Rejected(Option<EventRecord>),
}

impl EnqueueOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, EnqueueOutcome::Accepted)
    }

    pub fn is_rejected(&self) -> bool {
        !self.is_accepted()
    }

    /// Recover a rejected record, if any
    pub fn into_rejected(self) -> Option<EventRecord> {
        match self {
            EnqueueOutcome::Accepted => None,
            EnqueueOutcome::Rejected(record) => record,
        }
    }
}

/// Bounded buffer of event records with accept/reject accounting
pub struct EventBuffer {
    /// Underlying bounded queue
    queue: ArrayQueue<EventRecord>,

    /// Successful enqueues since last reset
    accepted: AtomicU64,

    /// Rejected enqueues (full or faulted) since last reset
    rejected: AtomicU64,
}

impl EventBuffer {
    /// Create a buffer holding at most `capacity` records
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. Use [`EventBuffer::try_new`] for
    /// capacities that come from configuration.
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    pub fn try_new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(EngineError::InvalidCapacity);
        }
        Ok(Self::new(capacity))
    }

    /// Insert a record at the tail (non-blocking, drop-on-full)
    ///
    /// A panic escaping the queue push counts as a rejection; `ArrayQueue`
    /// does not panic on push, so in practice only a full buffer rejects.
    pub fn enqueue(&self, record: EventRecord) -> EnqueueOutcome {
        let pushed = panic::catch_unwind(AssertUnwindSafe(|| self.queue.push(record)));
        self.settle(pushed)
    }

    /// Count a push attempt and turn it into an outcome
    fn settle(&self, pushed: thread::Result<std::result::Result<(), EventRecord>>) -> EnqueueOutcome {
        match pushed {
            Ok(Ok(())) => {
                self.accepted.fetch_add(1, Ordering::Relaxed);
                EnqueueOutcome::Accepted
            }
            Ok(Err(record)) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                trace!(service = record.service(), "Event buffer full, record dropped");
                EnqueueOutcome::Rejected(Some(record))
            }
            Err(_) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                warn!("Internal fault while buffering record, record dropped");
                EnqueueOutcome::Rejected(None)
            }
        }
    }

    /// Remove and return every buffered record in FIFO order
    ///
    /// Takes at most `capacity` records, so a drain racing with producers
    /// always terminates. Records enqueued during the drain may land in this
    /// batch or the next one.
    pub fn drain_all(&self) -> Vec<EventRecord> {
        let max = self.queue.capacity();
        let mut records = Vec::with_capacity(self.queue.len().min(max));

        while records.len() < max {
            match self.queue.pop() {
                Some(record) => records.push(record),
                None => break,
            }
        }

        if !records.is_empty() {
            debug!("Drained {} records from event buffer", records.len());
        }

        records
    }

    /// Pop a single record (non-blocking)
    pub fn try_pop(&self) -> Option<EventRecord> {
        self.queue.pop()
    }

    /// Discard all buffered records; counters are left alone
    ///
    /// Returns the number of records discarded.
    pub fn clear(&self) -> usize {
        let mut discarded = 0;
        while self.queue.pop().is_some() {
            discarded += 1;
        }
        debug!("Cleared {} records from event buffer", discarded);
        discarded
    }

    /// Current number of buffered records (may be stale under concurrency)
    pub fn size(&self) -> usize {
        self.queue.len()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.queue.is_full()
    }

    pub fn accepted_count(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn rejected_count(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Zero both counters without touching buffered records
    pub fn reset_counters(&self) {
        self.accepted.store(0, Ordering::Relaxed);
        self.rejected.store(0, Ordering::Relaxed);
    }

    /// Snapshot of counters and occupancy
    pub fn stats(&self) -> BufferStats {
        BufferStats {
            accepted: self.accepted_count(),
            rejected: self.rejected_count(),
            current_size: self.size(),
            capacity: self.capacity(),
        }
    }
}

impl std::fmt::Debug for EventBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBuffer")
            .field("size", &self.size())
            .field("capacity", &self.capacity())
            .field("accepted", &self.accepted_count())
            .field("rejected", &self.rejected_count())
            .finish()
    }
}

/// Buffer statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferStats {
    /// Records accepted since last reset
    pub accepted: u64,

    /// Records rejected since last reset
    pub rejected: u64,

    /// Records currently buffered
    pub current_size: usize,

    /// Buffer capacity
    pub capacity: usize,
}

impl BufferStats {
    /// Calculate fill percentage
    pub fn fill_percentage(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        (self.current_size as f64 / self.capacity as f64) * 100.0
    }

    /// Percentage of enqueue attempts that were rejected
    pub fn reject_rate(&self) -> f64 {
        let attempts = self.accepted + self.rejected;
        if attempts == 0 {
            0.0
        } else {
            (self.rejected as f64 / attempts as f64) * 100.0
        }
    }
}
