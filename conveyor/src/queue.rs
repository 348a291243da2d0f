use crossbeam_utils::Backoff;

/// The sending side of a FIFO queue.
pub trait Enqueue {
    type Item;

    /// Appends `item` without blocking.
    ///
    /// Returns the item back if the queue has no room for it. Unbounded queues
    /// always succeed.
    fn enqueue(&mut self, item: Self::Item) -> Result<(), Self::Item>;

    /// Appends `item`, waiting for room if the queue is full.
    fn enqueue_wait(&mut self, item: Self::Item) {
        send_with_backoff(self, item)
    }

    /// Whether a receiver may still take what is enqueued. Queues that cannot
    /// tell always return `true`.
    fn is_connected(&self) -> bool {
        true
    }
}

/// The receiving side of a FIFO queue.
pub trait Dequeue {
    type Item;

    /// Removes the oldest item without blocking, or returns `None` if the queue
    /// is empty at this instant.
    fn dequeue(&mut self) -> Option<Self::Item>;

    /// Removes the oldest item, waiting for one if the queue is empty.
    ///
    /// The provided implementation backs off with [`recv_with_backoff`].
    /// Queues with a real wait primitive override it.
    fn dequeue_wait(&mut self) -> Self::Item {
        recv_with_backoff(self)
    }
}

impl<Q: Enqueue + ?Sized> Enqueue for &mut Q {
    type Item = Q::Item;
    fn enqueue(&mut self, item: Self::Item) -> Result<(), Self::Item> {
        (**self).enqueue(item)
    }
    fn enqueue_wait(&mut self, item: Self::Item) {
        (**self).enqueue_wait(item)
    }
    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}

impl<Q: Dequeue + ?Sized> Dequeue for &mut Q {
    type Item = Q::Item;
    fn dequeue(&mut self) -> Option<Self::Item> {
        (**self).dequeue()
    }
    fn dequeue_wait(&mut self) -> Self::Item {
        (**self).dequeue_wait()
    }
}

impl<Q: Enqueue + ?Sized> Enqueue for Box<Q> {
    type Item = Q::Item;
    fn enqueue(&mut self, item: Self::Item) -> Result<(), Self::Item> {
        (**self).enqueue(item)
    }
    fn enqueue_wait(&mut self, item: Self::Item) {
        (**self).enqueue_wait(item)
    }
    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}

impl<Q: Dequeue + ?Sized> Dequeue for Box<Q> {
    type Item = Q::Item;
    fn dequeue(&mut self) -> Option<Self::Item> {
        (**self).dequeue()
    }
    fn dequeue_wait(&mut self) -> Self::Item {
        (**self).dequeue_wait()
    }
}

/// Enqueues `item`, spinning and then yielding while the queue is full.
///
/// This is the call-site backoff policy for bounded queues. It never parks on
/// a lock, and it never returns until the item has been accepted.
pub fn send_with_backoff<Q: Enqueue + ?Sized>(queue: &mut Q, mut item: Q::Item) {
    let backoff = Backoff::new();
    loop {
        match queue.enqueue(item) {
            Ok(()) => return,
            Err(rejected) => item = rejected,
        }
        backoff.snooze();
    }
}

/// Like [`send_with_backoff`], but gives `item` back once the queue is full
/// and nothing is left to receive from it.
pub fn try_send_with_backoff<Q: Enqueue + ?Sized>(
    queue: &mut Q,
    mut item: Q::Item,
) -> Result<(), Q::Item> {
    let backoff = Backoff::new();
    loop {
        match queue.enqueue(item) {
            Ok(()) => return Ok(()),
            Err(rejected) if !queue.is_connected() => return Err(rejected),
            Err(rejected) => item = rejected,
        }
        backoff.snooze();
    }
}

/// Dequeues an item, spinning and then yielding while the queue is empty.
///
/// Like [`BlockingQueue::wait_and_pop`](crate::BlockingQueue::wait_and_pop),
/// this waits forever if nothing is ever sent.
pub fn recv_with_backoff<Q: Dequeue + ?Sized>(queue: &mut Q) -> Q::Item {
    let backoff = Backoff::new();
    loop {
        if let Some(item) = queue.dequeue() {
            return item;
        }
        backoff.snooze();
    }
}
