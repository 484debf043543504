//! Bounded in-memory trace store.
//!
//! A strict FIFO ring: `add` appends in arrival order and evicts the oldest
//! record once capacity is exceeded. Records are immutable after insertion.
//! One writer (the collector) and any number of readers (one per viewer
//! connection) share the store; all synchronization is internal and every
//! critical section is a short copy.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use spyglass_core::model::SpanRecord;

#[derive(Clone)]
pub struct TraceStore {
    inner: Arc<RwLock<Inner>>,
    capacity: usize,
}

struct Inner {
    records: VecDeque<SpanRecord>,
    /// Store position of the oldest retained record. Grows by one per
    /// eviction, so publisher cursors stay valid across eviction.
    head_seq: u64,
}

impl TraceStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(RwLock::new(Inner {
                records: VecDeque::with_capacity(capacity),
                head_seq: 0,
            })),
            capacity,
        }
    }

    /// Appends a record, evicting the oldest one at capacity.
    pub fn add(&self, record: SpanRecord) {
        let mut inner = self.inner.write().expect("trace store lock poisoned");
        if inner.records.len() == self.capacity {
            inner.records.pop_front();
            inner.head_seq += 1;
        }
        inner.records.push_back(record);
    }

    /// Full currently retained history, oldest first. A defensive copy:
    /// safe to iterate while concurrent `add`s proceed.
    pub fn snapshot(&self) -> Vec<SpanRecord> {
        let inner = self.inner.read().expect("trace store lock poisoned");
        inner.records.iter().cloned().collect()
    }

    /// Records at store position `cursor` or later, plus the cursor to resume
    /// from. A cursor older than the retained window yields everything still
    /// retained; evicted records are gone and are not replayed.
    pub fn read_since(&self, cursor: u64) -> (Vec<SpanRecord>, u64) {
        let inner = self.inner.read().expect("trace store lock poisoned");
        let next = inner.head_seq + inner.records.len() as u64;
        let skip = cursor.saturating_sub(inner.head_seq).min(inner.records.len() as u64) as usize;
        let batch = inner.records.iter().skip(skip).cloned().collect();
        (batch, next)
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .expect("trace store lock poisoned")
            .records
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
