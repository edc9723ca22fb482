use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use function_runtime::{
    AdminClient, AuthenticationConfig, BrokerClient, ConnectionProvisioner, ContainerDescriptor,
    FunctionAuthProvider, FunctionCacheManager, FunctionDetails, InstanceCache, Runtime,
    RuntimeCustomizer, RuntimeError, RuntimeFactory, SecretsProvider, SecretsProviderConfigurator,
    WorkerConfig,
};
use prometheus::IntCounter;
use tracing::{debug, info, warn};

use crate::cache::FunctionCacheManagerImpl;
use crate::config::{EmbeddedConfig, FactoryConfig, StandaloneConfig, ThreadRuntimeFactoryConfig};
use crate::group::ThreadGroup;
use crate::instance_cache::SharedInstanceCache;
use crate::loader::Loader;
use crate::runtime::{SharedResources, ThreadRuntime};

/// Counter registered in the factory's metrics registry, if one is given.
const CONTAINERS_CREATED_METRIC: &str = "function_containers_created_total";

/// Builds [`ThreadRuntime`] containers that share one broker connection,
/// code cache and thread group.
///
/// All shared state is fixed at construction. The only mutation afterwards
/// is the one-way `open → closed` transition performed by [`close`](Self::close).
pub struct ThreadRuntimeFactory {
    thread_group: Arc<ThreadGroup>,
    fn_cache: Arc<FunctionCacheManagerImpl>,
    broker_client: Arc<dyn BrokerClient>,
    admin_client: Option<Arc<dyn AdminClient>>,
    storage_service_url: Option<String>,
    default_secrets_provider: Option<Arc<dyn SecretsProvider>>,
    secrets_provider_configurator: Option<Arc<dyn SecretsProviderConfigurator>>,
    metrics_registry: Option<prometheus::Registry>,
    containers_created: Option<IntCounter>,
    extraction_directory: PathBuf,
    loader: Arc<Loader>,
    instance_cache: Arc<dyn InstanceCache>,
    closed: AtomicBool,
}

impl ThreadRuntimeFactory {
    /// Build a factory that provisions its own broker client, and the admin
    /// client when `expose_admin_client` is set.
    pub fn standalone(
        config: StandaloneConfig,
        provisioner: &dyn ConnectionProvisioner,
    ) -> function_runtime::Result<Self> {
        // Checked again in `init`; here it keeps a bad name from opening connections.
        validate_group_name(&config.thread_group_name)?;
        let admin_url = admin_service_url(
            config.expose_admin_client,
            config.broker_web_service_url.as_deref(),
        )?;
        let (broker_client, admin_client) =
            provision_clients(provisioner, &config.broker_service_url, admin_url, &config.auth)?;

        Self::init(FactoryConfig {
            thread_group_name: config.thread_group_name,
            broker_client,
            admin_client,
            storage_service_url: config.storage_service_url,
            secrets_provider: config.secrets_provider,
            secrets_provider_configurator: None,
            metrics_registry: config.metrics_registry,
            extraction_directory: config.extraction_directory,
            loader: config.loader,
            instance_cache: config.instance_cache,
        })
    }

    /// Build a factory around clients the caller already connected.
    pub fn with_clients(config: EmbeddedConfig) -> function_runtime::Result<Self> {
        Self::init(config.into())
    }

    /// Build a factory from worker configuration.
    ///
    /// The thread group name comes from the worker's
    /// `function_runtime_factory_configs` block. Every container resolves
    /// its own secrets provider through `configurator`. The auth provider
    /// and runtime customizer have no effect on thread runtimes.
    pub fn initialize(
        worker: &WorkerConfig,
        auth: &AuthenticationConfig,
        configurator: Arc<dyn SecretsProviderConfigurator>,
        auth_provider: Option<Arc<dyn FunctionAuthProvider>>,
        customizer: Option<Arc<dyn RuntimeCustomizer>>,
        provisioner: &dyn ConnectionProvisioner,
        instance_cache: Option<Arc<dyn InstanceCache>>,
    ) -> function_runtime::Result<Self> {
        let factory_config: ThreadRuntimeFactoryConfig = worker.runtime_factory_config()?;
        // Before provisioning, as in `standalone`.
        validate_group_name(&factory_config.thread_group_name)?;
        if auth_provider.is_some() {
            debug!("function auth provider not used by thread runtime");
        }
        if customizer.is_some() {
            debug!("runtime customizer not used by thread runtime");
        }

        let admin_url = admin_service_url(
            worker.expose_admin_client_enabled,
            worker.broker_web_service_url.as_deref(),
        )?;
        let (broker_client, admin_client) =
            provision_clients(provisioner, &worker.broker_service_url, admin_url, auth)?;

        Self::init(FactoryConfig {
            thread_group_name: factory_config.thread_group_name,
            broker_client,
            admin_client,
            storage_service_url: worker.state_storage_service_url.clone(),
            secrets_provider: None,
            secrets_provider_configurator: Some(configurator),
            metrics_registry: None,
            extraction_directory: worker.extraction_directory.clone(),
            loader: None,
            instance_cache,
        })
    }

    /// The single initializer every constructor goes through.
    fn init(config: FactoryConfig) -> function_runtime::Result<Self> {
        validate_group_name(&config.thread_group_name)?;

        let loader = config.loader.unwrap_or_else(Loader::ambient);
        let fn_cache = Arc::new(FunctionCacheManagerImpl::new(Arc::clone(&loader)));
        let thread_group = Arc::new(ThreadGroup::new(config.thread_group_name));
        let instance_cache: Arc<dyn InstanceCache> = match config.instance_cache {
            Some(cache) => cache,
            None => SharedInstanceCache::global(),
        };
        let containers_created = config
            .metrics_registry
            .as_ref()
            .and_then(register_containers_counter);

        let secrets = if config.secrets_provider.is_some() {
            "shared"
        } else {
            "per-function"
        };
        info!(
            group = %thread_group.name(),
            loader = %loader.name(),
            admin = config.admin_client.is_some(),
            secrets,
            "factory initialized"
        );

        Ok(Self {
            thread_group,
            fn_cache,
            broker_client: config.broker_client,
            admin_client: config.admin_client,
            storage_service_url: config.storage_service_url,
            default_secrets_provider: config.secrets_provider,
            secrets_provider_configurator: config.secrets_provider_configurator,
            metrics_registry: config.metrics_registry,
            containers_created,
            extraction_directory: config.extraction_directory,
            loader,
            instance_cache,
            closed: AtomicBool::new(false),
        })
    }

    /// Assemble an unstarted container for one function instance.
    ///
    /// Runs on the caller's thread and spawns nothing. A failure affects
    /// only this call.
    pub fn create_container(
        &self,
        descriptor: ContainerDescriptor,
    ) -> function_runtime::Result<ThreadRuntime> {
        if self.is_closed() {
            return Err(RuntimeError::Closed(format!(
                "factory for thread group {} is closed",
                self.thread_group.name()
            )));
        }

        let secrets_provider =
            self.resolve_secrets_provider(&descriptor.instance_config.function_details)?;

        let runtime = ThreadRuntime::new(
            descriptor.instance_config,
            descriptor.code_archive,
            descriptor.original_code_file_name,
            descriptor.expected_health_check_interval,
            secrets_provider,
            SharedResources {
                fn_cache: Arc::clone(&self.fn_cache) as Arc<dyn FunctionCacheManager>,
                thread_group: Arc::clone(&self.thread_group),
                broker_client: Arc::clone(&self.broker_client),
                admin_client: self.admin_client.clone(),
                storage_service_url: self.storage_service_url.clone(),
                metrics_registry: self.metrics_registry.clone(),
                extraction_directory: self.extraction_directory.clone(),
            },
        );

        if let Some(counter) = &self.containers_created {
            counter.inc();
        }
        info!(
            id = %runtime.id(),
            function = %runtime.instance_config().function_details.fully_qualified_name(),
            instance = runtime.instance_config().instance_id,
            "container created"
        );
        Ok(runtime)
    }

    /// The shared default provider if there is one, otherwise a freshly
    /// constructed and initialized provider for `details`.
    fn resolve_secrets_provider(
        &self,
        details: &FunctionDetails,
    ) -> function_runtime::Result<Arc<dyn SecretsProvider>> {
        if let Some(provider) = &self.default_secrets_provider {
            return Ok(Arc::clone(provider));
        }

        let configurator = self.secrets_provider_configurator.as_ref().ok_or_else(|| {
            RuntimeError::ProviderResolution(format!(
                "no default secrets provider or configurator for {}",
                details.fully_qualified_name()
            ))
        })?;

        let name = configurator.secrets_provider_name(details);
        let provider_config = configurator.secrets_provider_config(details);
        let mut provider = self.loader.construct_secrets_provider(&name)?;

        let config_keys: Vec<&str> = provider_config.keys().map(String::as_str).collect();
        info!(
            provider = %name,
            config_keys = ?config_keys,
            function = %details.fully_qualified_name(),
            "initializing secrets provider"
        );
        provider
            .init(&provider_config)
            .map_err(|e| RuntimeError::ProviderResolution(format!("{name}: {e}")))?;

        Ok(Arc::from(provider))
    }

    /// Release every shared resource. Only the first call does anything;
    /// later and concurrent calls return immediately.
    ///
    /// Container threads are signalled, not joined. Client close failures
    /// are logged and do not stop the remaining steps.
    pub fn close(&self) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        self.thread_group.interrupt();
        self.fn_cache.close();

        if let Err(e) = self.broker_client.close() {
            warn!(error = %e, "failed to close broker client when closing function container factory");
        }

        if let Some(admin_client) = &self.admin_client
            && let Err(e) = admin_client.close()
        {
            warn!(error = %e, "failed to close admin client when closing function container factory");
        }

        self.instance_cache.shutdown();

        info!(group = %self.thread_group.name(), "factory shutdown complete");
    }

    /// [`close`](Self::close), then wait up to `timeout` for container
    /// threads to exit. Returns the number still running.
    pub fn close_and_join(&self, timeout: Duration) -> usize {
        self.close();
        self.thread_group.join(timeout)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn thread_group(&self) -> &Arc<ThreadGroup> {
        &self.thread_group
    }

    pub fn fn_cache(&self) -> &Arc<FunctionCacheManagerImpl> {
        &self.fn_cache
    }

    pub fn broker_client(&self) -> &Arc<dyn BrokerClient> {
        &self.broker_client
    }

    pub fn admin_client(&self) -> Option<&Arc<dyn AdminClient>> {
        self.admin_client.as_ref()
    }

    pub fn loader(&self) -> &Arc<Loader> {
        &self.loader
    }

    pub fn storage_service_url(&self) -> Option<&str> {
        self.storage_service_url.as_deref()
    }

    pub fn extraction_directory(&self) -> &Path {
        &self.extraction_directory
    }
}

impl RuntimeFactory for ThreadRuntimeFactory {
    fn name(&self) -> &str {
        "thread"
    }

    fn create_container(
        &self,
        descriptor: ContainerDescriptor,
    ) -> function_runtime::Result<Box<dyn Runtime>> {
        let runtime = ThreadRuntimeFactory::create_container(self, descriptor)?;
        Ok(Box::new(runtime))
    }

    fn close(&self) {
        ThreadRuntimeFactory::close(self);
    }
}

impl std::fmt::Debug for ThreadRuntimeFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadRuntimeFactory")
            .field("thread_group", &self.thread_group.name())
            .field("loader", &self.loader.name())
            .field("admin_client", &self.admin_client.is_some())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

fn validate_group_name(name: &str) -> function_runtime::Result<()> {
    if name.trim().is_empty() {
        return Err(RuntimeError::Config("thread group name is empty".into()));
    }
    Ok(())
}

/// Admin endpoint to connect to, or `None` when the admin client is disabled.
fn admin_service_url(
    enabled: bool,
    web_service_url: Option<&str>,
) -> function_runtime::Result<Option<&str>> {
    if !enabled {
        return Ok(None);
    }
    web_service_url.map(Some).ok_or_else(|| {
        RuntimeError::Config("admin client enabled without broker_web_service_url".into())
    })
}

fn validate_service_url(service_url: &str) -> function_runtime::Result<()> {
    url::Url::parse(service_url)
        .map(|_| ())
        .map_err(|e| RuntimeError::Connection(format!("invalid service url {service_url:?}: {e}")))
}

/// Provision the broker client and, when `admin_url` is set, the admin
/// client. The broker client is closed again if the admin client fails.
fn provision_clients(
    provisioner: &dyn ConnectionProvisioner,
    broker_url: &str,
    admin_url: Option<&str>,
    auth: &AuthenticationConfig,
) -> function_runtime::Result<(Arc<dyn BrokerClient>, Option<Arc<dyn AdminClient>>)> {
    validate_service_url(broker_url)?;
    if let Some(url) = admin_url {
        validate_service_url(url)?;
    }

    let broker_client = provisioner
        .create_broker_client(broker_url, auth)
        .map_err(|e| RuntimeError::Connection(format!("broker client: {e}")))?;

    let Some(url) = admin_url else {
        return Ok((broker_client, None));
    };

    match provisioner.create_admin_client(url, auth) {
        Ok(admin_client) => Ok((broker_client, Some(admin_client))),
        Err(e) => {
            if let Err(close_err) = broker_client.close() {
                warn!(error = %close_err, "failed to close broker client during rollback");
            }
            Err(RuntimeError::Connection(format!("admin client: {e}")))
        }
    }
}

fn register_containers_counter(registry: &prometheus::Registry) -> Option<IntCounter> {
    let counter = match IntCounter::new(
        CONTAINERS_CREATED_METRIC,
        "Function containers assembled by the thread runtime factory",
    ) {
        Ok(counter) => counter,
        Err(e) => {
            warn!(error = %e, "failed to create container counter");
            return None;
        }
    };
    if let Err(e) = registry.register(Box::new(counter.clone())) {
        warn!(error = %e, metric = CONTAINERS_CREATED_METRIC, "failed to register container counter");
        return None;
    }
    Some(counter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_name_must_not_be_blank() {
        assert!(validate_group_name("fn-group").is_ok());
        assert!(matches!(validate_group_name(""), Err(RuntimeError::Config(_))));
        assert!(matches!(validate_group_name("  "), Err(RuntimeError::Config(_))));
    }

    #[test]
    fn admin_url_required_only_when_enabled() {
        assert_eq!(admin_service_url(false, None).unwrap(), None);
        assert_eq!(
            admin_service_url(true, Some("http://localhost:8080")).unwrap(),
            Some("http://localhost:8080")
        );
        assert!(matches!(
            admin_service_url(true, None),
            Err(RuntimeError::Config(_))
        ));
    }

    #[test]
    fn service_url_must_parse() {
        assert!(validate_service_url("pulsar://localhost:6650").is_ok());
        assert!(validate_service_url("pulsar+ssl://broker.example.com:6651").is_ok());
        assert!(matches!(
            validate_service_url("not a url"),
            Err(RuntimeError::Connection(_))
        ));
    }

    #[test]
    fn counter_registration_is_not_repeated() {
        let registry = prometheus::Registry::new();
        let counter = register_containers_counter(&registry).unwrap();
        counter.inc();
        assert!(register_containers_counter(&registry).is_none());

        let families = registry.gather();
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].get_name(), CONTAINERS_CREATED_METRIC);
    }
}
