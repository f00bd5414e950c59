/// Sent by the producer to the consumer.
///
/// A stream is any number of `Item`s, at most one `Error`, and exactly one
/// trailing `Finished`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProducerMessage<T, E> {
    Item(T),
    Error(E),
    Finished,
}

impl<T, E> ProducerMessage<T, E> {
    pub fn is_finished(&self) -> bool {
        matches!(self, ProducerMessage::Finished)
    }
}

/// Sent by the consumer to the producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerMessage {
    /// The consumer lost interest; stop pulling and release the source.
    Closing,
}
