use std::time::Instant;

use conveyor::{Message, recv_with_backoff, send_with_backoff, spsc};

use super::*;

/// One producer streams `items` through a ring of `capacity` slots to one
/// consumer, backing off whenever the ring is full or empty.
pub fn bench(items: usize, capacity: usize) -> Duration {
    let (mut tx, mut rx) = spsc::channel(capacity);
    let now = Instant::now();
    std::thread::scope(|cx| {
        cx.spawn(move || {
            for i in 0..items {
                send_with_backoff(&mut tx, Message::Item(make_item(i)));
            }
            send_with_backoff(&mut tx, Message::EndOfStream);
        });
        cx.spawn(move || {
            while let Message::Item(i) = recv_with_backoff(&mut rx) {
                black_box(i);
            }
        });
    });
    now.elapsed()
}
