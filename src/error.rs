use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to spawn producer thread")]
    Spawn(#[from] std::io::Error),

    #[error("Failed to build producer thread pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Couldn't parse stream configuration.\n{0}")]
    Config(#[from] serde_json::Error),

    #[error("Invalid stream configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid resource identifier '{0}', expected 'kind:name'")]
    InvalidIdentifier(String),

    #[cfg(feature = "logging")]
    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

/// Failure returned by [`Consumer::next`](crate::Consumer::next).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StreamError<E> {
    /// The underlying source failed while pulling the item at this position.
    #[error("Source failed: {0}")]
    Source(E),

    /// `next` was called on a stream that has no further items.
    #[error("Stream has no more items")]
    Exhausted,

    /// The producer went away without finishing the stream.
    #[error("Producer disconnected before finishing the stream")]
    Disconnected,
}
