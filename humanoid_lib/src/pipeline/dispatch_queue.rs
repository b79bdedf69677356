//! Bounded hand-off queue between the receiver and the worker.
//!
//! When full, `push` evicts the oldest item and inserts the new one under a
//! single lock, so the producer never blocks and the consumer is never more
//! than `capacity` items behind the newest pose.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub const DEFAULT_QUEUE_CAPACITY: usize = 5;

pub struct DispatchQueue<T> {
    items: Mutex<VecDeque<T>>,
    not_empty: Condvar,
    capacity: usize,
}

impl<T> DispatchQueue<T> {
    /// Create a queue holding at most `capacity` items (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            not_empty: Condvar::new(),
            capacity,
        }
    }

    /// Enqueue `item` as the newest entry. Returns the evicted oldest entry
    /// if the queue was full.
    pub fn push(&self, item: T) -> Option<T> {
        let evicted = {
            let mut items = self.items.lock();
            let evicted = if items.len() >= self.capacity {
                items.pop_front()
            } else {
                None
            };
            items.push_back(item);
            evicted
        };
        self.not_empty.notify_one();
        evicted
    }

    /// Dequeue the oldest entry, waiting up to `timeout` for one to arrive.
    pub fn pop(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut items = self.items.lock();

        while items.is_empty() {
            if self.not_empty.wait_until(&mut items, deadline).timed_out() {
                break;
            }
        }

        items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> Default for DispatchQueue<T> {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}
