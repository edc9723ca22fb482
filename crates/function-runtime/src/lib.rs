mod cache;
mod client;
mod config;
mod error;
mod factory;
mod runtime;
mod secrets;
mod types;

pub use cache::{FunctionCacheManager, InstanceCache};
pub use client::{AdminClient, BrokerClient, ConnectionProvisioner};
pub use config::WorkerConfig;
pub use error::{ClientError, Result, RuntimeError, SecretsError};
pub use factory::{FunctionAuthProvider, RuntimeCustomizer, RuntimeFactory};
pub use runtime::Runtime;
pub use secrets::{SecretsConfig, SecretsProvider, SecretsProviderConfigurator};
pub use types::{AuthenticationConfig, ContainerDescriptor, FunctionDetails, InstanceConfig};
