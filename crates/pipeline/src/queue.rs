//! Bounded multi-producer/single-consumer buffer between the span source
//! callback and the collector.
//!
//! `offer` runs synchronously on whatever context completed the span: it
//! never blocks beyond a brief lock and never errors back to the caller.
//! At capacity the oldest queued entry is dropped to admit the new one;
//! the viewer cares about what is happening now, not exhaustive history.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;

use crate::raw::RawSpan;

pub struct SpanQueue {
    state: Mutex<State>,
    notify: Notify,
    capacity: usize,
}

struct State {
    items: VecDeque<RawSpan>,
    closed: bool,
}

impl SpanQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            notify: Notify::new(),
            capacity,
        }
    }

    /// Enqueues a completed span, evicting the oldest queued entry when full.
    /// Returns false once the queue is closed (span discarded).
    pub fn offer(&self, span: RawSpan) -> bool {
        {
            let mut state = self.state.lock().expect("span queue lock poisoned");
            if state.closed {
                return false;
            }
            if state.items.len() == self.capacity {
                state.items.pop_front();
            }
            state.items.push_back(span);
        }
        self.notify.notify_one();
        true
    }

    /// Dequeues the oldest span, suspending while the queue is empty.
    /// Returns `None` once the queue is closed and drained. Single consumer.
    pub async fn recv(&self) -> Option<RawSpan> {
        loop {
            {
                let mut state = self.state.lock().expect("span queue lock poisoned");
                if let Some(span) = state.items.pop_front() {
                    return Some(span);
                }
                if state.closed {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Stops accepting spans and wakes the consumer so it can observe the
    /// close after draining what remains.
    pub fn close(&self) {
        self.state.lock().expect("span queue lock poisoned").closed = true;
        self.notify.notify_one();
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("span queue lock poisoned").items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
