use std::sync::Arc;

use conveyor::{BlockingQueue, Dequeue, Enqueue, Message, spsc};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct DataItem {
    id: u64,
}

const NUM_ITEMS: u64 = 1_000_000;

fn produce(mut tx: impl Enqueue<Item = Message<DataItem>>, n: u64) {
    for id in 0..n {
        tx.enqueue_wait(Message::Item(DataItem { id }));
    }
    tx.enqueue_wait(Message::EndOfStream);
}

fn consume(mut rx: impl Dequeue<Item = Message<DataItem>>) -> u64 {
    let mut processed = 0;
    let mut next = 0;
    while let Message::Item(item) = rx.dequeue_wait() {
        assert_eq!(item.id, next, "out of order");
        next += 1;
        processed += 1;
    }
    processed
}

#[test]
fn blocking_two_stage() {
    let q = Arc::new(BlockingQueue::new());
    let processed = std::thread::scope(|cx| {
        cx.spawn(|| produce(q.clone(), NUM_ITEMS));
        cx.spawn(|| consume(q.clone())).join().unwrap()
    });
    assert_eq!(processed, NUM_ITEMS);
    assert!(q.is_empty());
}

#[test]
fn spsc_two_stage() {
    let (tx, mut rx) = spsc::channel(spsc::DEFAULT_CAPACITY);
    let processed = std::thread::scope(|cx| {
        cx.spawn(move || produce(tx, NUM_ITEMS));
        cx.spawn(|| consume(&mut rx)).join().unwrap()
    });
    assert_eq!(processed, NUM_ITEMS);
    assert_eq!(rx.pop(), None);
    assert!(!rx.is_connected());
}

#[test]
fn pushed_equals_popped() {
    let q = BlockingQueue::new();
    let pushed = fastrand::usize(1..5000);
    for i in 0..pushed {
        q.push(Message::Item(i));
    }
    q.push(Message::EndOfStream);

    let mut popped = 0;
    while q.try_pop().is_some() {
        popped += 1;
    }
    // Every item plus the end marker.
    assert_eq!(popped, pushed + 1);
    assert!(q.is_empty());
}
