use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::queue::{Dequeue, Enqueue};

/// An unbounded FIFO queue for any number of producers and consumers.
///
/// Every operation runs inside one critical section of an internal mutex.
/// Consumers that find the queue empty park on a condition variable in
/// [`wait_and_pop`](Self::wait_and_pop) until a producer pushes.
///
/// Share it through an [`Arc`] or a scoped borrow.
pub struct BlockingQueue<T> {
    items: Mutex<VecDeque<T>>,
    available: Condvar,
}

impl<T> BlockingQueue<T> {
    pub const fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
        }
    }

    /// Creates a queue with room for `capacity` items before it reallocates.
    /// The queue is still unbounded.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            available: Condvar::new(),
        }
    }

    /// Appends `item` and wakes one waiting consumer. Never blocks for room.
    pub fn push(&self, item: T) {
        self.lock().push_back(item);
        self.available.notify_one();
    }

    /// Removes the oldest item, parking the calling thread while the queue is
    /// empty.
    ///
    /// The lock is released while parked and the emptiness check is repeated
    /// after every wake-up, spurious or not. If nothing is ever pushed again
    /// this waits forever.
    pub fn wait_and_pop(&self) -> T {
        let mut items = self.lock();
        loop {
            if let Some(item) = items.pop_front() {
                return item;
            }
            items = self
                .available
                .wait(items)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`wait_and_pop`](Self::wait_and_pop), but gives up and returns
    /// `None` once `timeout` has elapsed with the queue still empty.
    ///
    /// A timeout too large to be represented as a deadline waits forever.
    pub fn wait_and_pop_timeout(&self, timeout: Duration) -> Option<T> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Some(self.wait_and_pop());
        };
        let mut items = self.lock();
        loop {
            if let Some(item) = items.pop_front() {
                return Some(item);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            (items, _) = self
                .available
                .wait_timeout(items, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Removes the oldest item if there is one, without waiting.
    pub fn try_pop(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Removes every queued item at once, oldest first.
    pub fn drain(&self) -> Vec<T> {
        self.lock().drain(..).collect()
    }

    /// Number of queued items at the moment the lock was held.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the queue was empty at the moment the lock was held.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        // `VecDeque` is never observed half-updated, so a panic in another
        // holder leaves nothing to repair.
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for BlockingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingQueue")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl<T> Enqueue for &BlockingQueue<T> {
    type Item = T;
    fn enqueue(&mut self, item: T) -> Result<(), T> {
        self.push(item);
        Ok(())
    }
}

impl<T> Dequeue for &BlockingQueue<T> {
    type Item = T;
    fn dequeue(&mut self) -> Option<T> {
        self.try_pop()
    }
    fn dequeue_wait(&mut self) -> T {
        self.wait_and_pop()
    }
}

impl<T> Enqueue for Arc<BlockingQueue<T>> {
    type Item = T;
    fn enqueue(&mut self, item: T) -> Result<(), T> {
        self.push(item);
        Ok(())
    }
}

impl<T> Dequeue for Arc<BlockingQueue<T>> {
    type Item = T;
    fn dequeue(&mut self) -> Option<T> {
        self.try_pop()
    }
    fn dequeue_wait(&mut self) -> T {
        self.wait_and_pop()
    }
}
