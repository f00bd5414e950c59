#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod config;
mod error;
pub mod graph;
pub mod stream;
mod utils;

pub use crate::config::StreamConfig;
pub use crate::error::{Error, StreamError};
pub use crate::graph::{
    Direction, Metadata, ResourceGraph, ResourceIdentifier, ResourceMetadata, ResourceNode,
    ResourceState, ResourceStates, Traversal,
};
pub use crate::stream::{
    Consumer, ConsumerMessage, ItemSource, IterSource, Producer, ProducerMessage, StreamPool,
    spawn,
};
#[cfg(feature = "logging")]
pub use crate::utils::init_logging;
