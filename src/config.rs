use serde::{Deserialize, Serialize};

use crate::Error;

/// Settings for producer/consumer streams.
///
/// Every field is optional when deserialized:
///
/// ```json
/// { "capacity": 128, "thread_name": "feature-reader", "workers": 2 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamConfig {
    /// How many messages may sit in the outbound channel before the producer
    /// blocks.
    pub capacity: usize,
    /// Name given to dedicated producer threads, and prefix for pooled ones.
    pub thread_name: String,
    /// Number of threads in a [`StreamPool`](crate::StreamPool).
    pub workers: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            thread_name: String::from("tessera-producer"),
            workers: 4,
        }
    }
}

impl StreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.capacity == 0 {
            return Err(Error::InvalidConfig("capacity must be at least 1".into()));
        }
        if self.workers == 0 {
            return Err(Error::InvalidConfig("workers must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StreamConfig::from_json("{}").unwrap();
        assert_eq!(config, StreamConfig::default());
        assert_eq!(config.capacity, 64);
    }

    #[test]
    fn test_partial_json() {
        let json = r#"{ "capacity": 2, "thread_name": "reader" }"#;
        let config = StreamConfig::from_json(json).unwrap();
        assert_eq!(
            config,
            StreamConfig::new().with_capacity(2).with_thread_name("reader")
        );
    }

    #[test]
    fn test_rejects_invalid() {
        assert!(matches!(
            StreamConfig::from_json(r#"{ "capacity": 0 }"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            StreamConfig::from_json(r#"{ "workers": 0 }"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            StreamConfig::from_json(r#"{ "capasity": 1 }"#),
            Err(Error::Config(_))
        ));
    }
}
