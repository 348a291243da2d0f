use std::ops::Range;

use conveyor::{Dequeue, Enqueue, Message, StreamEnd, try_send_with_backoff};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DataItem {
    pub id: u64,
    pub result: f64,
}

impl DataItem {
    pub fn new(id: u64) -> Self {
        Self { id, result: 0.0 }
    }
}

/// Parser step: the integer square root of the id.
pub fn parse(item: DataItem) -> DataItem {
    DataItem {
        result: item.id.isqrt() as f64,
        ..item
    }
}

/// Transformer step: scales the parsed result.
pub fn transform(item: DataItem) -> DataItem {
    DataItem {
        result: item.result * 7.0,
        ..item
    }
}

/// Sends `msg`, returning `false` if the next stage is gone for good.
fn send<Q>(tx: &mut Q, msg: Message<DataItem>) -> bool
where
    Q: Enqueue<Item = Message<DataItem>> + ?Sized,
{
    if try_send_with_backoff(tx, msg).is_err() {
        tracing::warn!("next stage disconnected, dropping the rest of the stream");
        return false;
    }
    true
}

fn load<Q>(tx: &mut Q, mut ids: Range<u64>) -> bool
where
    Q: Enqueue<Item = Message<DataItem>> + ?Sized,
{
    ids.all(|id| send(tx, Message::Item(DataItem::new(id))))
}

/// Sends `0..items` followed by the end marker.
pub fn loader<Q>(mut tx: Q, items: u64)
where
    Q: Enqueue<Item = Message<DataItem>>,
{
    tracing::info!("started loader, items={items}");
    if load(&mut tx, 0..items) && send(&mut tx, Message::EndOfStream) {
        tracing::info!("finished loader and sent end marker");
    }
}

/// Sends `ids` and, if this is the last producer of `end` to finish, the one
/// end marker of the stream.
pub fn fan_in_loader<Q>(mut tx: Q, ids: Range<u64>, end: &StreamEnd)
where
    Q: Enqueue<Item = Message<DataItem>>,
{
    tracing::info!("started loader, ids={ids:?}");
    // A stopped loader still counts as finished so the stream can end.
    load(&mut tx, ids);
    if end.finish() {
        send(&mut tx, Message::EndOfStream);
        tracing::info!("finished loader and sent end marker");
    } else {
        tracing::info!("finished loader, remaining={}", end.remaining());
    }
}

/// Applies `f` to every item from `rx` and forwards it to `tx`, then forwards
/// the end marker. Returns the number of items relayed.
///
/// Stops early, dropping both queues, if `tx` loses its receiver.
pub fn relay<I, O>(
    name: &str,
    mut rx: I,
    mut tx: O,
    mut f: impl FnMut(DataItem) -> DataItem,
) -> u64
where
    I: Dequeue<Item = Message<DataItem>>,
    O: Enqueue<Item = Message<DataItem>>,
{
    tracing::info!("started {name}");
    let mut count = 0;
    while let Message::Item(item) = rx.dequeue_wait() {
        if !send(&mut tx, Message::Item(f(item))) {
            return count;
        }
        count += 1;
    }
    send(&mut tx, Message::EndOfStream);
    tracing::info!("finished {name}, relayed={count}");
    count
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Summary {
    pub processed: u64,
    pub sample: Option<DataItem>,
}

/// Drains `rx` until the end marker, keeping the item whose id is `sample`.
pub fn output<Q>(mut rx: Q, sample: Option<u64>) -> Summary
where
    Q: Dequeue<Item = Message<DataItem>>,
{
    tracing::info!("started output");
    let mut summary = Summary::default();
    while let Message::Item(item) = rx.dequeue_wait() {
        if Some(item.id) == sample {
            tracing::debug!("sampled item, data={item:?}");
            summary.sample = Some(item);
        }
        summary.processed += 1;
    }
    tracing::info!("finished output, processed={}", summary.processed);
    summary
}
