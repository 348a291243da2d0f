use std::time::Instant;

use conveyor::{BlockingQueue, Message};

use super::*;

/// One producer streams `items` through a [`BlockingQueue`] to one consumer.
pub fn bench(items: usize, _capacity: usize) -> Duration {
    let q = BlockingQueue::new();
    let now = Instant::now();
    std::thread::scope(|cx| {
        cx.spawn(|| {
            for i in 0..items {
                q.push(Message::Item(make_item(i)));
            }
            q.push(Message::EndOfStream);
        });
        cx.spawn(|| {
            while let Message::Item(i) = q.wait_and_pop() {
                black_box(i);
            }
        });
    });
    now.elapsed()
}
