use function_runtime::{SecretsConfig, SecretsError, SecretsProvider};

/// Treats the declared secret path as the secret value itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClearTextSecretsProvider;

impl ClearTextSecretsProvider {
    pub const NAME: &'static str = "cleartext";
}

impl SecretsProvider for ClearTextSecretsProvider {
    fn init(&mut self, _config: &SecretsConfig) -> Result<(), SecretsError> {
        Ok(())
    }

    fn provide_secret(&self, _secret_name: &str, path_to_secret: &str) -> Option<String> {
        Some(path_to_secret.to_string())
    }
}
