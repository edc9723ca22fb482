#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("secrets provider resolution failed: {0}")]
    ProviderResolution(String),

    #[error("closed: {0}")]
    Closed(String),

    #[error("runtime start failed: {0}")]
    Start(String),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Failure reported by a broker or admin client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("connect {url}: {detail}")]
    Connect { url: String, detail: String },

    #[error("close: {0}")]
    Close(String),
}

/// Failure reported by a secrets provider while initializing.
#[derive(Debug, thiserror::Error)]
#[error("secrets provider init: {0}")]
pub struct SecretsError(pub String);
