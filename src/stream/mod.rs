//! Bounded producer/consumer streaming.
//!
//! A blocking [`ItemSource`] is handed to a [`Producer`] running on another
//! thread, which pushes [`ProducerMessage`]s into a bounded channel. The
//! calling thread reads them through a [`Consumer`], and can ask the producer
//! to stop early by closing the consumer, which sends a single
//! [`ConsumerMessage::Closing`] back through a second channel.
//!
//! The two channels are the only state shared between the threads. The
//! outbound one holds at most `capacity` messages, so a fast source can never
//! get more than that ahead of a slow consumer. Source errors travel through
//! the channel as data and are re-raised by the consumer at the position the
//! failing item would have taken.

mod consumer;
mod message;
mod producer;
mod source;

use std::any::Any;

use crossbeam_channel::{Sender, bounded};

use crate::{Error, StreamConfig};

pub use crate::stream::consumer::{Consumer, IntoIter};
pub use crate::stream::message::{ConsumerMessage, ProducerMessage};
pub use crate::stream::producer::Producer;
pub use crate::stream::source::{ItemSource, IterSource};

type Wired<S> = (
    Producer<S>,
    Consumer<<S as ItemSource>::Item, <S as ItemSource>::Error>,
    Sender<()>,
);

fn wire<S: ItemSource>(source: S, capacity: usize) -> Wired<S> {
    let (outbound_tx, outbound_rx) = bounded(capacity);
    // Closing is sent at most once.
    let (inbound_tx, inbound_rx) = bounded(1);
    let (done_tx, done_rx) = bounded(0);

    (
        Producer::new(source, outbound_tx, inbound_rx),
        Consumer::new(outbound_rx, inbound_tx, done_rx),
        done_tx,
    )
}

/// Starts a producer for `source` on a dedicated thread and returns the
/// consumer end.
pub fn spawn<S>(source: S, config: &StreamConfig) -> Result<Consumer<S::Item, S::Error>, Error>
where
    S: ItemSource + Send + 'static,
    S::Item: Send + 'static,
    S::Error: Send + 'static,
{
    config.validate()?;

    let (producer, consumer, done) = wire(source, config.capacity);

    std::thread::Builder::new()
        .name(config.thread_name.clone())
        .spawn(move || {
            producer.run();
            drop(done);
        })?;

    Ok(consumer)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}

/// A fixed set of threads shared by many streams.
///
/// Streams beyond the number of workers wait in the pool's queue until a
/// worker frees up; their consumers block in `has_next` meanwhile. Each
/// running producer holds its worker until its stream ends or is closed.
///
/// A producer whose source panics is logged and dropped. Its source is still
/// closed, its consumer reports [`StreamError::Disconnected`](crate::StreamError)
/// and the worker moves on to the next queued stream.
pub struct StreamPool {
    pool: rayon::ThreadPool,
    capacity: usize,
}

impl StreamPool {
    pub fn new(config: &StreamConfig) -> Result<Self, Error> {
        config.validate()?;

        let prefix = config.thread_name.clone();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(move |index| format!("{prefix}-{index}"))
            .panic_handler(|payload| {
                let message = panic_message(payload.as_ref());
                tracing::error!(%message, "producer panicked");
            })
            .build()?;

        Ok(Self {
            pool,
            capacity: config.capacity,
        })
    }

    /// Queues a producer for `source` on the pool and returns the consumer end.
    pub fn stream<S>(&self, source: S) -> Consumer<S::Item, S::Error>
    where
        S: ItemSource + Send + 'static,
        S::Item: Send + 'static,
        S::Error: Send + 'static,
    {
        let (producer, consumer, done) = wire(source, self.capacity);

        self.pool.spawn(move || {
            producer.run();
            drop(done);
        });

        consumer
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }
}
