use std::sync::atomic::{AtomicUsize, Ordering};

/// An item travelling through a pipeline stage, or the end of the stream.
///
/// Each logical stream carries exactly one [`EndOfStream`](Self::EndOfStream)
/// per consumer. The queues treat it like any other value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Message<T> {
    Item(T),
    EndOfStream,
}

impl<T> Message<T> {
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream)
    }

    pub fn into_item(self) -> Option<T> {
        match self {
            Self::Item(t) => Some(t),
            Self::EndOfStream => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Message<U> {
        match self {
            Self::Item(t) => Message::Item(f(t)),
            Self::EndOfStream => Message::EndOfStream,
        }
    }
}

impl<T> From<T> for Message<T> {
    fn from(value: T) -> Self {
        Self::Item(value)
    }
}

/// A join barrier for fan-in producers sharing one consumer.
///
/// Each of the `producers` calls [`finish`](Self::finish) once after its last
/// item. Exactly one call, the last one to happen, returns `true`; that caller
/// sends the single [`Message::EndOfStream`]. Finishing order does not matter.
#[derive(Debug)]
pub struct StreamEnd {
    remaining: AtomicUsize,
}

impl StreamEnd {
    pub const fn new(producers: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(producers),
        }
    }

    /// Marks one producer as done. Returns `true` if it was the last one.
    ///
    /// # Panics
    ///
    /// Panics if called more times than there are producers.
    pub fn finish(&self) -> bool {
        // `AcqRel` orders every producer's sends before the last producer's
        // end marker.
        match self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        {
            Ok(prev) => prev == 1,
            Err(_) => panic!("more producers finished than were registered"),
        }
    }

    /// Producers that have not finished yet.
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BlockingQueue;

    #[test]
    fn message_helpers() {
        let m = Message::from(4);
        assert!(!m.is_end_of_stream());
        assert_eq!(m.map(|x| x * 2), Message::Item(8));
        assert_eq!(m.into_item(), Some(4));
        assert!(Message::<u8>::EndOfStream.is_end_of_stream());
        assert_eq!(Message::<u8>::EndOfStream.map(u16::from), Message::EndOfStream);
        assert_eq!(Message::<u8>::EndOfStream.into_item(), None);
    }

    #[test]
    fn exactly_one_last_producer() {
        const PRODUCERS: usize = 8;
        const ITEMS: usize = 1000;

        let end = StreamEnd::new(PRODUCERS);
        let q = BlockingQueue::new();
        std::thread::scope(|cx| {
            for p in 0..PRODUCERS {
                let (end, q) = (&end, &q);
                cx.spawn(move || {
                    for i in 0..ITEMS {
                        if fastrand::u8(..) == 0 {
                            std::thread::yield_now();
                        }
                        q.push(Message::Item((p, i)));
                    }
                    if end.finish() {
                        q.push(Message::EndOfStream);
                    }
                });
            }
        });
        assert_eq!(end.remaining(), 0);

        let mut count = 0;
        while let Message::Item(_) = q.wait_and_pop() {
            count += 1;
        }
        assert_eq!(count, PRODUCERS * ITEMS);
        // The end marker was the last thing sent, and only once.
        assert!(q.is_empty());
    }

    #[test]
    #[should_panic = "more producers finished"]
    fn finish_too_often() {
        let end = StreamEnd::new(1);
        assert!(end.finish());
        end.finish();
    }
}
