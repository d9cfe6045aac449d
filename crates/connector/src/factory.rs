use std::sync::Arc;

use depot_protocol::{
    ConnectorError, RemoteRepository, RepositoryConnector, RepositoryConnectorFactory,
    RepositorySession,
};
use tracing::debug;

use crate::config::ConnectorConfig;
use crate::connector::BasicRepositoryConnector;
use crate::layout::RepositoryLayout;
use crate::transport::{TransportProvider, TransportRegistry};

/// Builds [`BasicRepositoryConnector`]s for every scheme in its registry.
#[derive(Debug, Clone)]
pub struct BasicConnectorFactory {
    registry: TransportRegistry,
    config: ConnectorConfig,
}

impl BasicConnectorFactory {
    pub fn new(registry: TransportRegistry, config: ConnectorConfig) -> Self {
        Self { registry, config }
    }

    /// Factory over the built-in `file` transport with default settings.
    pub fn with_defaults() -> Self {
        Self::new(TransportRegistry::with_defaults(), ConnectorConfig::default())
    }

    /// Adds a transport provider.
    pub fn with_provider(mut self, provider: Arc<dyn TransportProvider>) -> Self {
        self.registry.register(provider);
        self
    }

    pub fn registry(&self) -> &TransportRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut TransportRegistry {
        &mut self.registry
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Like [`RepositoryConnectorFactory::new_instance`], returning the
    /// concrete connector.
    pub fn connect(
        &self,
        session: &RepositorySession,
        repository: &RemoteRepository,
    ) -> Result<BasicRepositoryConnector, ConnectorError> {
        let no_connector = |reason: String| ConnectorError::NoConnector {
            repository: repository.id.clone(),
            reason,
        };

        let layout = RepositoryLayout::for_content_type(&repository.content_type).ok_or_else(
            || no_connector(format!("unsupported content type '{}'", repository.content_type)),
        )?;
        let scheme = repository
            .scheme()
            .ok_or_else(|| no_connector(format!("no URL scheme in '{}'", repository.url)))?;
        let provider = self.registry.lookup(&scheme).ok_or_else(|| {
            no_connector(format!(
                "no transport for scheme '{scheme}' (available: {})",
                self.registry.schemes().join(", ")
            ))
        })?;

        debug!(repository = %repository, scheme = %scheme, "creating connector");
        BasicRepositoryConnector::new(
            session.clone(),
            repository.clone(),
            layout,
            provider,
            self.config.clone(),
        )
    }
}

impl Default for BasicConnectorFactory {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl RepositoryConnectorFactory for BasicConnectorFactory {
    fn new_instance(
        &self,
        session: &RepositorySession,
        repository: &RemoteRepository,
    ) -> Result<Box<dyn RepositoryConnector>, ConnectorError> {
        Ok(Box::new(self.connect(session, repository)?))
    }
}
