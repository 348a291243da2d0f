//! FIFO queues for producer/consumer pipelines.
//!
//! Two strategies implement the same [`Enqueue`]/[`Dequeue`] contract:
//!
//! - [`BlockingQueue`], an unbounded queue guarded by a mutex, usable by any
//!   number of producers and consumers, with a blocking
//!   [`wait_and_pop`](BlockingQueue::wait_and_pop).
//! - [`spsc`], a bounded lock-free ring buffer split into exactly one
//!   [`Producer`](spsc::Producer) and one [`Consumer`](spsc::Consumer).
//!
//! End of stream is signalled in-band with [`Message::EndOfStream`].

pub mod blocking;
pub mod queue;
pub mod spsc;
pub mod stream;

pub use blocking::BlockingQueue;
pub use queue::{Dequeue, Enqueue, recv_with_backoff, send_with_backoff, try_send_with_backoff};
pub use stream::{Message, StreamEnd};
