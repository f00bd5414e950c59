use std::ops::{Deref, DerefMut};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use tracing::Level;

use crate::stream::{ConsumerMessage, ItemSource, ProducerMessage};

/// Owns a source and closes it exactly once, however the owner goes away.
struct CloseOnDrop<S: ItemSource>(S);

impl<S: ItemSource> Deref for CloseOnDrop<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.0
    }
}

impl<S: ItemSource> DerefMut for CloseOnDrop<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.0
    }
}

impl<S: ItemSource> Drop for CloseOnDrop<S> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Drains an [`ItemSource`] into the outbound channel.
///
/// The producer is meant to run on its own thread (see
/// [`spawn`](crate::stream::spawn)). Before every pull it polls the inbound
/// channel without blocking and stops as soon as the consumer asked it to.
/// A pull that blocks inside the source cannot be interrupted; the request is
/// only seen once that pull returns.
///
/// Whatever ends the loop, exactly one [`ProducerMessage::Finished`] is sent
/// last and the source is closed afterwards. A source that is never run is
/// closed when the producer is dropped.
pub struct Producer<S: ItemSource> {
    source: CloseOnDrop<S>,
    outbound: Sender<ProducerMessage<S::Item, S::Error>>,
    inbound: Receiver<ConsumerMessage>,
}

impl<S: ItemSource> Producer<S> {
    pub fn new(
        source: S,
        outbound: Sender<ProducerMessage<S::Item, S::Error>>,
        inbound: Receiver<ConsumerMessage>,
    ) -> Self {
        Self {
            source: CloseOnDrop(source),
            outbound,
            inbound,
        }
    }

    /// Runs the loop to completion on the current thread.
    pub fn run(self) {
        let Producer {
            mut source,
            outbound,
            inbound,
        } = self;

        let span = tracing::span!(Level::DEBUG, "producer");
        let _enter = span.enter();

        let mut produced = 0usize;

        loop {
            match inbound.try_recv() {
                Ok(ConsumerMessage::Closing) => {
                    tracing::debug!(produced, "closing requested by consumer");
                    break;
                }
                Err(TryRecvError::Disconnected) => {
                    tracing::debug!(produced, "consumer dropped its control channel");
                    break;
                }
                Err(TryRecvError::Empty) => {}
            }

            if !source.has_next() {
                tracing::trace!(produced, "source exhausted");
                break;
            }

            let (message, failed) = match source.next() {
                Ok(item) => (ProducerMessage::Item(item), false),
                Err(err) => {
                    tracing::debug!(produced, "source failed, stopping");
                    (ProducerMessage::Error(err), true)
                }
            };

            // Blocks while the channel is full.
            if outbound.send(message).is_err() {
                tracing::debug!(produced, "consumer went away");
                break;
            }

            if failed {
                break;
            }

            produced += 1;
        }

        if outbound.send(ProducerMessage::Finished).is_err() {
            tracing::trace!("consumer gone before the end of the stream");
        }

        drop(source);
        tracing::debug!(produced, "producer finished");
    }
}
