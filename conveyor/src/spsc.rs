//! A bounded lock-free ring buffer for one producer and one consumer.
//!
//! The ring is split into a [`Producer`] and a [`Consumer`]. Neither half can
//! be cloned and both operate through `&mut self`, so a second producer or
//! consumer cannot be created in safe code.
//!
//! A ring of `N` slots holds at most `N - 1` items: one slot always stays empty
//! so that `head == tail` means empty and `head + 1 == tail` means full,
//! without a separate counter. `N` must be a power of two so indices wrap with
//! a mask.

use std::cell::UnsafeCell;
use std::fmt;
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;
use thiserror::Error;

use crate::queue::{Dequeue, Enqueue};

pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum CapacityError {
    #[error("ring capacity must be at least 2, got {0}")]
    TooSmall(usize),
    #[error("ring capacity must be a power of two, got {0}")]
    NotPowerOfTwo(usize),
}

/// Creates a ring with `capacity` slots.
///
/// # Panics
///
/// Panics if `capacity` is less than 2 or not a power of two. Use
/// [`try_channel`] to handle that case.
pub fn channel<T>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    match try_channel(capacity) {
        Ok(halves) => halves,
        Err(e) => panic!("{e}"),
    }
}

/// Creates a ring with `capacity` slots, rejecting invalid capacities.
pub fn try_channel<T>(capacity: usize) -> Result<(Producer<T>, Consumer<T>), CapacityError> {
    check_capacity(capacity)?;
    let ring = Arc::new(Ring::new(capacity));
    let producer = Producer { ring: ring.clone() };
    let consumer = Consumer { ring };
    Ok((producer, consumer))
}

fn check_capacity(capacity: usize) -> Result<(), CapacityError> {
    if capacity < 2 {
        Err(CapacityError::TooSmall(capacity))
    } else if !capacity.is_power_of_two() {
        Err(CapacityError::NotPowerOfTwo(capacity))
    } else {
        Ok(())
    }
}

#[derive(Debug)]
pub struct Builder<T> {
    capacity: usize,
    marker: PhantomData<fn(T) -> T>,
}

impl<T> Builder<T> {
    pub fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            marker: PhantomData,
        }
    }

    /// Sets the number of slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is less than 2 or not a power of two.
    pub fn capacity(&mut self, capacity: usize) -> &mut Self {
        if let Err(e) = check_capacity(capacity) {
            panic!("{e}");
        }
        self.capacity = capacity;
        self
    }

    pub fn build(&self) -> (Producer<T>, Consumer<T>) {
        let ring = Arc::new(Ring::new(self.capacity));
        (Producer { ring: ring.clone() }, Consumer { ring })
    }
}

impl<T> Default for Builder<T> {
    fn default() -> Self {
        Self::new()
    }
}

struct Ring<T> {
    /// Next slot the producer writes. Only the producer stores it.
    head: CachePadded<AtomicUsize>,
    /// Next slot the consumer reads. Only the consumer stores it.
    tail: CachePadded<AtomicUsize>,
    mask: usize,
    buf: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

// SAFETY: A slot is accessed by at most one side at a time. The producer owns
// the slots outside `[tail, head)`, the consumer owns those inside, and the
// ownership hand-off is published through `head` and `tail`.
unsafe impl<T: Send> Sync for Ring<T> {}

impl<T> Ring<T> {
    fn new(capacity: usize) -> Self {
        debug_assert!(capacity.is_power_of_two());
        Self {
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            mask: capacity - 1,
            buf: (0..capacity)
                .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
                .collect(),
        }
    }

    fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        head.wrapping_sub(tail) & self.mask
    }
}

impl<T> Drop for Ring<T> {
    fn drop(&mut self) {
        let head = *self.head.get_mut();
        let mut tail = *self.tail.get_mut();
        while tail != head {
            // SAFETY: Slots in `[tail, head)` hold initialized items that were
            // never popped.
            unsafe { self.buf[tail].get_mut().assume_init_drop() };
            tail = tail.wrapping_add(1) & self.mask;
        }
    }
}

/// The writing half of a ring.
pub struct Producer<T> {
    ring: Arc<Ring<T>>,
}

impl<T> Producer<T> {
    /// Writes `item` into the next free slot.
    ///
    /// Returns the item back if the ring is full. Nothing is modified in that
    /// case; retrying or backing off is up to the caller.
    pub fn push(&mut self, item: T) -> Result<(), T> {
        let Ring {
            head,
            tail,
            mask,
            buf,
        } = &*self.ring;

        let cur = head.load(Ordering::Relaxed);
        let next = cur.wrapping_add(1) & mask;
        // `Acquire` pairs with the consumer's `Release` on `tail`, so the slot
        // we are about to overwrite has been fully read.
        if next == tail.load(Ordering::Acquire) {
            return Err(item);
        }

        // SAFETY: `cur` is outside `[tail, head)`, so the consumer does not
        // touch it until `head` moves past it below.
        unsafe { (*buf[cur].get()).write(item) };
        // `Release` publishes the payload written above along with the index.
        head.store(next, Ordering::Release);

        Ok(())
    }

    /// Number of slots, one more than the most items the ring can hold.
    pub fn capacity(&self) -> usize {
        self.ring.mask + 1
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.ring.mask
    }

    /// Whether the [`Consumer`] is still alive.
    pub fn is_connected(&self) -> bool {
        Arc::strong_count(&self.ring) == 2
    }
}

/// The reading half of a ring.
pub struct Consumer<T> {
    ring: Arc<Ring<T>>,
}

impl<T> Consumer<T> {
    /// Moves the oldest item out of the ring, or returns `None` if it is empty.
    pub fn pop(&mut self) -> Option<T> {
        let Ring {
            head,
            tail,
            mask,
            buf,
        } = &*self.ring;

        let cur = tail.load(Ordering::Relaxed);
        // `Acquire` pairs with the producer's `Release` on `head`, so the
        // payload of every published slot is visible.
        if cur == head.load(Ordering::Acquire) {
            return None;
        }

        // SAFETY: `cur` is inside `[tail, head)` and was initialized by the
        // producer before `head` was published.
        let item = unsafe { (*buf[cur].get()).assume_init_read() };
        // `Release` hands the emptied slot back to the producer.
        tail.store(cur.wrapping_add(1) & mask, Ordering::Release);

        Some(item)
    }

    /// Number of slots, one more than the most items the ring can hold.
    pub fn capacity(&self) -> usize {
        self.ring.mask + 1
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.ring.mask
    }

    /// Whether the [`Producer`] is still alive.
    pub fn is_connected(&self) -> bool {
        Arc::strong_count(&self.ring) == 2
    }
}

impl<T> Enqueue for Producer<T> {
    type Item = T;
    fn enqueue(&mut self, item: T) -> Result<(), T> {
        self.push(item)
    }
    fn is_connected(&self) -> bool {
        Producer::is_connected(self)
    }
}

impl<T> Dequeue for Consumer<T> {
    type Item = T;
    fn dequeue(&mut self) -> Option<T> {
        self.pop()
    }
}

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}

impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}
