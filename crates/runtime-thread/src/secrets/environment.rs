use function_runtime::{SecretsConfig, SecretsError, SecretsProvider};

/// Reads secrets from the process environment, keyed by secret name.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentSecretsProvider;

impl EnvironmentSecretsProvider {
    pub const NAME: &'static str = "environment";
}

impl SecretsProvider for EnvironmentSecretsProvider {
    fn init(&mut self, _config: &SecretsConfig) -> Result<(), SecretsError> {
        Ok(())
    }

    fn provide_secret(&self, secret_name: &str, _path_to_secret: &str) -> Option<String> {
        std::env::var(secret_name).ok()
    }
}
