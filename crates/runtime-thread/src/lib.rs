mod cache;
mod config;
mod factory;
mod group;
mod instance_cache;
mod loader;
mod runtime;
mod secrets;

pub use cache::FunctionCacheManagerImpl;
pub use config::{EmbeddedConfig, StandaloneConfig, ThreadRuntimeFactoryConfig};
pub use factory::ThreadRuntimeFactory;
pub use group::ThreadGroup;
pub use instance_cache::SharedInstanceCache;
pub use loader::{Loader, ProviderConstructor, SecretsProviderRegistry};
pub use runtime::{InstanceContext, InstanceRunner, ThreadRuntime};
pub use secrets::{
    ClearTextSecretsProvider, DefaultSecretsProviderConfigurator, EnvironmentSecretsProvider,
};
