use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::{FileTransportProvider, TransportProvider};

/// Transport providers indexed by URL scheme.
#[derive(Clone, Default)]
pub struct TransportRegistry {
    providers: HashMap<String, Arc<dyn TransportProvider>>,
}

impl TransportRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry serving `file:` URLs.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(FileTransportProvider));
        registry
    }

    /// Registers `provider` for each of its schemes, replacing any provider
    /// previously registered for the same scheme.
    pub fn register(&mut self, provider: Arc<dyn TransportProvider>) {
        for scheme in provider.schemes() {
            let scheme = scheme.to_ascii_lowercase();
            debug!(scheme = %scheme, "transport provider registered");
            self.providers.insert(scheme, Arc::clone(&provider));
        }
    }

    pub fn lookup(&self, scheme: &str) -> Option<Arc<dyn TransportProvider>> {
        self.providers.get(&scheme.to_ascii_lowercase()).cloned()
    }

    /// Registered schemes, sorted.
    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<String> = self.providers.keys().cloned().collect();
        schemes.sort();
        schemes
    }
}

impl std::fmt::Debug for TransportRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MemoryStore, MemoryTransportProvider};

    #[test]
    fn defaults_serve_file_only() {
        let registry = TransportRegistry::with_defaults();
        assert_eq!(registry.schemes(), vec!["file".to_string()]);
        assert!(registry.lookup("FILE").is_some());
        assert!(registry.lookup("mem").is_none());
    }

    #[test]
    fn register_adds_schemes() {
        let mut registry = TransportRegistry::with_defaults();
        registry.register(Arc::new(MemoryTransportProvider::new(MemoryStore::new())));
        assert_eq!(
            registry.schemes(),
            vec!["file".to_string(), "mem".to_string()]
        );
    }
}
