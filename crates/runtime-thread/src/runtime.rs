use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use function_runtime::{
    AdminClient, BrokerClient, FunctionCacheManager, InstanceConfig, Runtime, RuntimeError,
    SecretsProvider,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use crate::group::ThreadGroup;

/// Runs one function instance on the thread a [`ThreadRuntime`] starts.
///
/// Implementations should return promptly once `ctx.shutdown` is cancelled.
pub trait InstanceRunner: Send + Sync {
    fn run(&self, ctx: InstanceContext) -> function_runtime::Result<()>;
}

/// Everything a running instance can reach.
#[derive(Clone)]
pub struct InstanceContext {
    pub instance_config: InstanceConfig,
    pub code_archive: PathBuf,
    pub original_code_file_name: Option<String>,
    pub fn_cache: Arc<dyn FunctionCacheManager>,
    pub broker_client: Arc<dyn BrokerClient>,
    pub admin_client: Option<Arc<dyn AdminClient>>,
    pub storage_service_url: Option<String>,
    pub secrets_provider: Arc<dyn SecretsProvider>,
    pub metrics_registry: Option<prometheus::Registry>,
    pub extraction_directory: PathBuf,
    pub expected_health_check_interval: Option<Duration>,
    /// Cancelled by [`ThreadRuntime::stop`] or when the thread group is interrupted.
    pub shutdown: CancellationToken,
}

/// Shared resources a [`ThreadRuntime`] borrows from its factory.
pub(crate) struct SharedResources {
    pub fn_cache: Arc<dyn FunctionCacheManager>,
    pub thread_group: Arc<ThreadGroup>,
    pub broker_client: Arc<dyn BrokerClient>,
    pub admin_client: Option<Arc<dyn AdminClient>>,
    pub storage_service_url: Option<String>,
    pub metrics_registry: Option<prometheus::Registry>,
    pub extraction_directory: PathBuf,
}

struct Running {
    token: CancellationToken,
    alive: Arc<AtomicBool>,
    stopped: bool,
}

/// Clears the alive flag when the instance thread exits, including by panic.
struct AliveGuard(Arc<AtomicBool>);

impl Drop for AliveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A function-execution container that runs its instance on a dedicated
/// thread inside the factory's [`ThreadGroup`].
///
/// Created unstarted by the factory; the caller decides when to
/// [`start`](Self::start) it.
pub struct ThreadRuntime {
    id: String,
    instance_config: InstanceConfig,
    code_archive: PathBuf,
    original_code_file_name: Option<String>,
    expected_health_check_interval: Option<Duration>,
    secrets_provider: Arc<dyn SecretsProvider>,
    shared: SharedResources,
    running: Option<Running>,
}

impl ThreadRuntime {
    pub(crate) fn new(
        instance_config: InstanceConfig,
        code_archive: PathBuf,
        original_code_file_name: Option<String>,
        expected_health_check_interval: Option<Duration>,
        secrets_provider: Arc<dyn SecretsProvider>,
        shared: SharedResources,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            instance_config,
            code_archive,
            original_code_file_name,
            expected_health_check_interval,
            secrets_provider,
            shared,
            running: None,
        }
    }

    pub fn instance_config(&self) -> &InstanceConfig {
        &self.instance_config
    }

    pub fn code_archive(&self) -> &Path {
        &self.code_archive
    }

    pub fn original_code_file_name(&self) -> Option<&str> {
        self.original_code_file_name.as_deref()
    }

    pub fn expected_health_check_interval(&self) -> Option<Duration> {
        self.expected_health_check_interval
    }

    pub fn secrets_provider(&self) -> &Arc<dyn SecretsProvider> {
        &self.secrets_provider
    }

    pub fn fn_cache(&self) -> &Arc<dyn FunctionCacheManager> {
        &self.shared.fn_cache
    }

    pub fn thread_group(&self) -> &Arc<ThreadGroup> {
        &self.shared.thread_group
    }

    pub fn broker_client(&self) -> &Arc<dyn BrokerClient> {
        &self.shared.broker_client
    }

    pub fn admin_client(&self) -> Option<&Arc<dyn AdminClient>> {
        self.shared.admin_client.as_ref()
    }

    pub fn storage_service_url(&self) -> Option<&str> {
        self.shared.storage_service_url.as_deref()
    }

    pub fn metrics_registry(&self) -> Option<&prometheus::Registry> {
        self.shared.metrics_registry.as_ref()
    }

    pub fn extraction_directory(&self) -> &Path {
        &self.shared.extraction_directory
    }

    /// Whether [`start`](Self::start) has succeeded. Stays true after stop.
    pub fn is_started(&self) -> bool {
        self.running.is_some()
    }

    /// Whether [`stop`](Runtime::stop) has been called on a started runtime.
    pub fn is_stopped(&self) -> bool {
        self.running.as_ref().is_some_and(|r| r.stopped)
    }

    /// Start the instance on a new thread in the factory's thread group.
    ///
    /// A runtime starts at most once. Registers the code archive with the
    /// function cache first; the registration is dropped again by
    /// [`stop`](Runtime::stop).
    pub fn start(&mut self, runner: Arc<dyn InstanceRunner>) -> function_runtime::Result<()> {
        if self.running.is_some() {
            return Err(RuntimeError::Start(format!("runtime {} already started", self.id)));
        }

        let function_id = self.instance_config.function_id.clone();
        self.shared
            .fn_cache
            .register_function(&function_id, &self.code_archive)?;

        let token = self.shared.thread_group.child_token();
        let alive = Arc::new(AtomicBool::new(true));
        let ctx = self.context(token.clone());
        let fqfn = self.instance_config.function_details.fully_qualified_name();
        let thread_name = format!("{}-{}", fqfn, self.instance_config.instance_id);

        let guard = AliveGuard(Arc::clone(&alive));
        let spawned = self.shared.thread_group.spawn(&thread_name, token.clone(), move |_| {
            let _guard = guard;
            info!(function = %fqfn, "instance thread started");
            match runner.run(ctx) {
                Ok(()) => info!(function = %fqfn, "instance thread exited"),
                Err(e) => error!(function = %fqfn, error = %e, "instance thread failed"),
            }
        });

        if let Err(e) = spawned {
            self.shared.fn_cache.unregister_function(&function_id);
            return Err(RuntimeError::Start(format!("spawn {thread_name}: {e}")));
        }

        self.running = Some(Running {
            token,
            alive,
            stopped: false,
        });
        info!(id = %self.id, thread = %thread_name, "runtime started");
        Ok(())
    }

    fn context(&self, shutdown: CancellationToken) -> InstanceContext {
        InstanceContext {
            instance_config: self.instance_config.clone(),
            code_archive: self.code_archive.clone(),
            original_code_file_name: self.original_code_file_name.clone(),
            fn_cache: Arc::clone(&self.shared.fn_cache),
            broker_client: Arc::clone(&self.shared.broker_client),
            admin_client: self.shared.admin_client.clone(),
            storage_service_url: self.shared.storage_service_url.clone(),
            secrets_provider: Arc::clone(&self.secrets_provider),
            metrics_registry: self.shared.metrics_registry.clone(),
            extraction_directory: self.shared.extraction_directory.clone(),
            expected_health_check_interval: self.expected_health_check_interval,
            shutdown,
        }
    }
}

impl Runtime for ThreadRuntime {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_alive(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|r| r.alive.load(Ordering::Acquire))
    }

    fn stop(&mut self) {
        let Some(running) = self.running.as_mut() else {
            return;
        };
        if running.stopped {
            return;
        }
        running.stopped = true;
        running.token.cancel();
        self.shared
            .fn_cache
            .unregister_function(&self.instance_config.function_id);
        let alive = running.alive.load(Ordering::Acquire);
        info!(id = %self.id, alive, "runtime stop signalled");
    }
}

impl std::fmt::Debug for ThreadRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadRuntime")
            .field("id", &self.id)
            .field("function_id", &self.instance_config.function_id)
            .field("instance_id", &self.instance_config.instance_id)
            .field("started", &self.is_started())
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}
