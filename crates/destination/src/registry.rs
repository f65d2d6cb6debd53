//! An explicit, instance-owned table of destinations.
//!
//! The original implementation kept destinations in a process-wide
//! `sync.RWMutex`-guarded map, registered via side-effecting `init()`
//! functions. That made destination availability a global, load-order
//! dependent fact. Here the set of destinations is built once at startup
//! from configuration and threaded explicitly through the scheduler —
//! nothing reaches for ambient global state.

use std::collections::HashMap;
use std::sync::Arc;

use crate::traits::{Destination, DestinationError};

/// An explicit table of named destinations, built once at startup.
#[derive(Default, Clone)]
pub struct Registry {
    destinations: HashMap<String, Arc<dyn Destination>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self { destinations: HashMap::new() }
    }

    /// Registers `destination` under `name`, replacing any prior entry.
    pub fn register(&mut self, name: impl Into<String>, destination: Arc<dyn Destination>) {
        self.destinations.insert(name.into(), destination);
    }

    /// Looks up a single destination by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Destination>, DestinationError> {
        self.destinations.get(name).cloned().ok_or_else(|| DestinationError::Unknown(name.to_string()))
    }

    /// Looks up several destinations by name, in the order requested,
    /// erroring on the first unknown name.
    pub fn get_all(&self, names: &[String]) -> Result<Vec<Arc<dyn Destination>>, DestinationError> {
        names.iter().map(|name| self.get(name)).collect()
    }

    /// The names of every registered destination, sorted.
    pub fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = self.destinations.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod test {
    use async_trait::async_trait;
    use model::Message;

    use super::*;
    use crate::traits::Writer;

    struct NoopDestination;

    struct NoopWriter;

    #[async_trait]
    impl Writer for NoopWriter {
        async fn write_message(&mut self, _msg: &Message) -> Result<(), DestinationError> {
            Ok(())
        }

        async fn close(self: Box<Self>) -> Result<(), DestinationError> {
            Ok(())
        }
    }

    #[async_trait]
    impl Destination for NoopDestination {
        async fn open(&self, _group: &str, _stream: &str) -> Result<Box<dyn Writer>, DestinationError> {
            Ok(Box::new(NoopWriter))
        }
    }

    #[test]
    fn available_is_sorted() {
        let mut registry = Registry::new();
        registry.register("stdout", Arc::new(NoopDestination));
        registry.register("datadog", Arc::new(NoopDestination));
        assert_eq!(registry.available(), vec!["datadog".to_string(), "stdout".to_string()]);
    }

    #[test]
    fn unknown_name_errors() {
        let registry = Registry::new();
        assert!(matches!(registry.get("missing"), Err(DestinationError::Unknown(_))));
    }
}
