use std::path::PathBuf;
use std::sync::Arc;

use function_runtime::{
    AdminClient, AuthenticationConfig, BrokerClient, InstanceCache, SecretsProvider,
    SecretsProviderConfigurator,
};
use serde::{Deserialize, Serialize};

use crate::loader::Loader;

/// Thread-runtime block of `WorkerConfig::function_runtime_factory_configs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRuntimeFactoryConfig {
    /// Name of the thread group all function threads are started in.
    pub thread_group_name: String,
}

/// Settings for a factory that provisions its own connections.
///
/// Used when the thread runtime runs on its own, or is embedded by another
/// runtime that delegates instance execution to it.
pub struct StandaloneConfig {
    pub thread_group_name: String,
    pub broker_service_url: String,
    pub storage_service_url: Option<String>,
    pub auth: AuthenticationConfig,
    /// Shared provider for every container. When unset, each container gets
    /// its own provider from the configurator.
    pub secrets_provider: Option<Arc<dyn SecretsProvider>>,
    pub metrics_registry: Option<prometheus::Registry>,
    pub extraction_directory: PathBuf,
    /// Falls back to [`Loader::ambient`].
    pub loader: Option<Arc<Loader>>,
    pub expose_admin_client: bool,
    /// Required when `expose_admin_client` is set.
    pub broker_web_service_url: Option<String>,
    /// Falls back to the process-wide instance cache.
    pub instance_cache: Option<Arc<dyn InstanceCache>>,
}

impl StandaloneConfig {
    pub fn new(
        thread_group_name: impl Into<String>,
        broker_service_url: impl Into<String>,
        extraction_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            thread_group_name: thread_group_name.into(),
            broker_service_url: broker_service_url.into(),
            storage_service_url: None,
            auth: AuthenticationConfig::default(),
            secrets_provider: None,
            metrics_registry: None,
            extraction_directory: extraction_directory.into(),
            loader: None,
            expose_admin_client: false,
            broker_web_service_url: None,
            instance_cache: None,
        }
    }
}

/// Settings for a factory built around already-connected clients.
pub struct EmbeddedConfig {
    pub thread_group_name: String,
    pub broker_client: Arc<dyn BrokerClient>,
    pub admin_client: Option<Arc<dyn AdminClient>>,
    pub storage_service_url: Option<String>,
    pub secrets_provider: Option<Arc<dyn SecretsProvider>>,
    pub secrets_provider_configurator: Option<Arc<dyn SecretsProviderConfigurator>>,
    pub metrics_registry: Option<prometheus::Registry>,
    pub extraction_directory: PathBuf,
    pub loader: Option<Arc<Loader>>,
    pub instance_cache: Option<Arc<dyn InstanceCache>>,
}

impl EmbeddedConfig {
    pub fn new(
        thread_group_name: impl Into<String>,
        broker_client: Arc<dyn BrokerClient>,
        extraction_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            thread_group_name: thread_group_name.into(),
            broker_client,
            admin_client: None,
            storage_service_url: None,
            secrets_provider: None,
            secrets_provider_configurator: None,
            metrics_registry: None,
            extraction_directory: extraction_directory.into(),
            loader: None,
            instance_cache: None,
        }
    }
}

/// Fully resolved input of the single factory initializer. Every named
/// constructor reduces to one of these.
pub(crate) struct FactoryConfig {
    pub thread_group_name: String,
    pub broker_client: Arc<dyn BrokerClient>,
    pub admin_client: Option<Arc<dyn AdminClient>>,
    pub storage_service_url: Option<String>,
    pub secrets_provider: Option<Arc<dyn SecretsProvider>>,
    pub secrets_provider_configurator: Option<Arc<dyn SecretsProviderConfigurator>>,
    pub metrics_registry: Option<prometheus::Registry>,
    pub extraction_directory: PathBuf,
    pub loader: Option<Arc<Loader>>,
    pub instance_cache: Option<Arc<dyn InstanceCache>>,
}

impl From<EmbeddedConfig> for FactoryConfig {
    fn from(config: EmbeddedConfig) -> Self {
        Self {
            thread_group_name: config.thread_group_name,
            broker_client: config.broker_client,
            admin_client: config.admin_client,
            storage_service_url: config.storage_service_url,
            secrets_provider: config.secrets_provider,
            secrets_provider_configurator: config.secrets_provider_configurator,
            metrics_registry: config.metrics_registry,
            extraction_directory: config.extraction_directory,
            loader: config.loader,
            instance_cache: config.instance_cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use function_runtime::WorkerConfig;

    use super::*;

    #[test]
    fn parses_from_worker_factory_block() {
        let mut worker = WorkerConfig::new("pulsar://localhost:6650");
        let mut block = serde_json::Map::new();
        block.insert("thread_group_name".into(), serde_json::json!("fn-group"));
        worker.function_runtime_factory_configs = Some(block);

        let config: ThreadRuntimeFactoryConfig = worker.runtime_factory_config().unwrap();
        assert_eq!(config.thread_group_name, "fn-group");
    }

    #[test]
    fn missing_group_name_is_rejected() {
        let mut worker = WorkerConfig::new("pulsar://localhost:6650");
        worker.function_runtime_factory_configs = Some(serde_json::Map::new());

        let err = worker
            .runtime_factory_config::<ThreadRuntimeFactoryConfig>()
            .unwrap_err();
        assert!(err.to_string().contains("thread_group_name"), "got: {err}");
    }
}
