use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use function_runtime::{RuntimeError, SecretsProvider};

use crate::secrets::{ClearTextSecretsProvider, EnvironmentSecretsProvider};

/// Constructs an uninitialized secrets provider.
pub type ProviderConstructor = Arc<dyn Fn() -> Box<dyn SecretsProvider> + Send + Sync>;

/// Mapping from provider name to constructor.
#[derive(Clone, Default)]
pub struct SecretsProviderRegistry {
    constructors: HashMap<String, ProviderConstructor>,
}

impl SecretsProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the providers shipped with this crate:
    /// `cleartext` and `environment`.
    pub fn builtin() -> Self {
        Self::new()
            .with(ClearTextSecretsProvider::NAME, || {
                Box::new(ClearTextSecretsProvider)
            })
            .with(EnvironmentSecretsProvider::NAME, || {
                Box::new(EnvironmentSecretsProvider)
            })
    }

    /// Add or replace the constructor registered under `name`.
    pub fn with<F>(mut self, name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> Box<dyn SecretsProvider> + Send + Sync + 'static,
    {
        self.constructors.insert(name.into(), Arc::new(constructor));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn construct(&self, name: &str) -> Option<Box<dyn SecretsProvider>> {
        self.constructors.get(name).map(|constructor| constructor())
    }
}

impl std::fmt::Debug for SecretsProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretsProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

/// Resolution root for components a factory builds by name.
///
/// The function cache manager is bound to one loader, and per-function
/// secrets providers are constructed through it.
#[derive(Debug)]
pub struct Loader {
    name: String,
    providers: SecretsProviderRegistry,
}

impl Loader {
    pub fn new(name: impl Into<String>, providers: SecretsProviderRegistry) -> Self {
        Self {
            name: name.into(),
            providers,
        }
    }

    /// Process-wide default loader carrying the built-in providers.
    pub fn ambient() -> Arc<Loader> {
        static AMBIENT: OnceLock<Arc<Loader>> = OnceLock::new();
        Arc::clone(
            AMBIENT.get_or_init(|| Arc::new(Loader::new("ambient", SecretsProviderRegistry::builtin()))),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn providers(&self) -> &SecretsProviderRegistry {
        &self.providers
    }

    /// Build a fresh, uninitialized provider registered under `name`.
    pub fn construct_secrets_provider(&self, name: &str) -> Result<Box<dyn SecretsProvider>, RuntimeError> {
        self.providers.construct(name).ok_or_else(|| {
            RuntimeError::ProviderResolution(format!(
                "no secrets provider named {name:?} in loader {:?}",
                self.name
            ))
        })
    }
}
