use std::sync::Arc;

use crate::error::ClientError;
use crate::types::AuthenticationConfig;

/// Shared connection to the messaging broker.
pub trait BrokerClient: Send + Sync {
    fn service_url(&self) -> &str;
    fn close(&self) -> Result<(), ClientError>;
}

/// Shared connection to the broker's admin endpoint.
pub trait AdminClient: Send + Sync {
    fn web_service_url(&self) -> &str;
    fn close(&self) -> Result<(), ClientError>;
}

/// Builds broker and admin clients from a service URL and auth settings.
pub trait ConnectionProvisioner: Send + Sync {
    fn create_broker_client(
        &self,
        service_url: &str,
        auth: &AuthenticationConfig,
    ) -> Result<Arc<dyn BrokerClient>, ClientError>;

    fn create_admin_client(
        &self,
        web_service_url: &str,
        auth: &AuthenticationConfig,
    ) -> Result<Arc<dyn AdminClient>, ClientError>;
}
