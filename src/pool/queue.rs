//! Closeable blocking FIFO shared between pool workers and submitters.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

struct QueueInner<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Multi-producer multi-consumer queue with close semantics: `pop` blocks
/// until an item arrives or the queue is closed and drained, and `push` is
/// rejected once the queue is closed.
pub struct TaskQueue<T> {
    inner: Mutex<QueueInner<T>>,
    available: Condvar,
}

impl<T> TaskQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                items: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Enqueue an item. Returns false (item dropped) if the queue is closed.
    pub fn push(&self, item: T) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.closed {
                return false;
            }
            inner.items.push_back(item);
        }
        self.available.notify_one();
        true
    }

    /// Block until an item is available or the queue is closed and empty.
    pub fn pop(&self) -> Option<T> {
        let mut inner = self.inner.lock();
        self.available
            .wait_while(&mut inner, |q| q.items.is_empty() && !q.closed);
        inner.items.pop_front()
    }

    /// Dequeue without blocking.
    pub fn try_pop(&self) -> Option<T> {
        self.inner.lock().items.pop_front()
    }

    /// Stop accepting pushes and wake every blocked consumer. Items already
    /// queued remain poppable until drained.
    pub fn close(&self) {
        {
            let mut inner = self.inner.lock();
            inner.closed = true;
        }
        self.available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
