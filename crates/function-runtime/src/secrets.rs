use std::collections::BTreeMap;

use crate::error::SecretsError;
use crate::types::FunctionDetails;

/// Provider-specific settings passed to [`SecretsProvider::init`].
pub type SecretsConfig = BTreeMap<String, String>;

/// Supplies sensitive configuration values to a running function.
///
/// `init` is called exactly once, before the provider is shared with a
/// container. Afterwards the provider is only read.
pub trait SecretsProvider: Send + Sync {
    fn init(&mut self, config: &SecretsConfig) -> Result<(), SecretsError>;

    /// Look up `secret_name`. `path_to_secret` is the provider-specific
    /// location declared by the function.
    fn provide_secret(&self, secret_name: &str, path_to_secret: &str) -> Option<String>;
}

/// Decides which secrets provider a function gets and how it is configured.
pub trait SecretsProviderConfigurator: Send + Sync {
    /// Registry name of the provider to construct for `details`.
    fn secrets_provider_name(&self, details: &FunctionDetails) -> String;

    fn secrets_provider_config(&self, details: &FunctionDetails) -> SecretsConfig;
}
