mod cleartext;
mod environment;

pub use cleartext::ClearTextSecretsProvider;
pub use environment::EnvironmentSecretsProvider;

use function_runtime::{FunctionDetails, SecretsConfig, SecretsProviderConfigurator};

/// Gives every function a `cleartext` provider with no settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSecretsProviderConfigurator;

impl SecretsProviderConfigurator for DefaultSecretsProviderConfigurator {
    fn secrets_provider_name(&self, _details: &FunctionDetails) -> String {
        ClearTextSecretsProvider::NAME.to_string()
    }

    fn secrets_provider_config(&self, _details: &FunctionDetails) -> SecretsConfig {
        SecretsConfig::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configurator_selects_cleartext() {
        let details = FunctionDetails {
            tenant: "public".into(),
            namespace: "default".into(),
            name: "exclaim".into(),
            ..Default::default()
        };
        let configurator = DefaultSecretsProviderConfigurator;
        assert_eq!(configurator.secrets_provider_name(&details), "cleartext");
        assert!(configurator.secrets_provider_config(&details).is_empty());
    }
}
