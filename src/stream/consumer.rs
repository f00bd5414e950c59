use crossbeam_channel::{Receiver, Sender};

use crate::StreamError;
use crate::stream::{ConsumerMessage, ProducerMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running,
    /// `Finished` was received, or the producer vanished.
    Finished,
    /// `close` was called before the end of the stream.
    Closed,
}

/// Pull-based view of a stream filled by a [`Producer`](crate::Producer) on
/// another thread.
///
/// ```rust,no_run
/// use tessera::{IterSource, StreamConfig};
///
/// let source = IterSource::new((0..3).map(Ok::<_, std::io::Error>));
/// let mut consumer = tessera::spawn(source, &StreamConfig::default()).unwrap();
///
/// while consumer.has_next() {
///     let item = consumer.next().unwrap();
///     println!("{item}");
/// }
/// ```
///
/// Dropping the consumer closes it.
pub struct Consumer<T, E> {
    /// Dropped on close so that a producer blocked on a full channel wakes up.
    outbound: Option<Receiver<ProducerMessage<T, E>>>,
    inbound: Sender<ConsumerMessage>,
    /// Disconnects once the producer has released its source.
    done: Receiver<()>,
    buffered: Option<Result<T, StreamError<E>>>,
    phase: Phase,
}

impl<T, E> Consumer<T, E> {
    pub(crate) fn new(
        outbound: Receiver<ProducerMessage<T, E>>,
        inbound: Sender<ConsumerMessage>,
        done: Receiver<()>,
    ) -> Self {
        Self {
            outbound: Some(outbound),
            inbound,
            done,
            buffered: None,
            phase: Phase::Running,
        }
    }

    /// Whether [`next`](Self::next) has something to return, which may be an
    /// error. Blocks until the producer sends the next message.
    pub fn has_next(&mut self) -> bool {
        if self.buffered.is_some() {
            return true;
        }
        if self.phase != Phase::Running {
            return false;
        }

        let Some(outbound) = &self.outbound else {
            return false;
        };

        match outbound.recv() {
            Ok(ProducerMessage::Item(item)) => self.buffered = Some(Ok(item)),
            Ok(ProducerMessage::Error(err)) => {
                self.buffered = Some(Err(StreamError::Source(err)));
            }
            Ok(ProducerMessage::Finished) => {
                self.phase = Phase::Finished;
                return false;
            }
            Err(_) => {
                self.phase = Phase::Finished;
                self.buffered = Some(Err(StreamError::Disconnected));
            }
        }

        true
    }

    /// Returns the next item, or re-raises the source error that occurred at
    /// this position in the stream. Nothing follows an error.
    ///
    /// Returns [`StreamError::Exhausted`] when [`has_next`](Self::has_next)
    /// would return `false`.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<T, StreamError<E>> {
        if !self.has_next() {
            return Err(StreamError::Exhausted);
        }

        self.buffered.take().unwrap_or(Err(StreamError::Exhausted))
    }

    /// Asks the producer to stop and release its source.
    ///
    /// Does not wait for the producer; it notices the request before its next
    /// pull. Afterwards `has_next` returns `false`. Closing a stream that has
    /// already finished sends nothing.
    pub fn close(&mut self) {
        if self.phase != Phase::Running {
            return;
        }

        self.phase = Phase::Closed;
        self.buffered = None;

        if self.inbound.try_send(ConsumerMessage::Closing).is_err() {
            tracing::trace!("producer already gone");
        }
        self.outbound = None;
    }

    /// Closes the stream if it is still running and blocks until the producer
    /// has released its source.
    pub fn join(mut self) {
        self.close();
        // Nothing is ever sent; this returns once the sender is dropped.
        let _ = self.done.recv();
    }
}

impl<T, E> Drop for Consumer<T, E> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<T, E> IntoIterator for Consumer<T, E> {
    type Item = Result<T, StreamError<E>>;
    type IntoIter = IntoIter<T, E>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter(self)
    }
}

/// Iterator over the remaining items of a [`Consumer`]. Ends after the first
/// error.
pub struct IntoIter<T, E>(Consumer<T, E>);

impl<T, E> Iterator for IntoIter<T, E> {
    type Item = Result<T, StreamError<E>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.has_next().then(|| self.0.next())
    }
}
