use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Declared identity and settings of a user function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionDetails {
    pub tenant: String,
    pub namespace: String,
    pub name: String,
    /// Entry point inside the code archive.
    pub class_name: String,
    pub parallelism: u32,
    /// Secret name to provider-specific lookup path.
    pub secrets: Option<serde_json::Map<String, serde_json::Value>>,
}

impl FunctionDetails {
    /// `tenant/namespace/name`.
    pub fn fully_qualified_name(&self) -> String {
        format!("{}/{}/{}", self.tenant, self.namespace, self.name)
    }
}

/// Per-instance settings handed to a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceConfig {
    pub instance_id: u32,
    pub function_id: String,
    pub function_version: String,
    pub function_details: FunctionDetails,
    pub max_buffered_tuples: u32,
    pub cluster_name: String,
}

/// Client authentication and TLS settings used when provisioning connections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthenticationConfig {
    pub client_auth_plugin: Option<String>,
    pub client_auth_params: Option<String>,
    pub use_tls: bool,
    pub tls_allow_insecure_connection: bool,
    pub tls_hostname_verification_enabled: bool,
    pub tls_trust_certs_file_path: Option<PathBuf>,
}

/// Per-call input to `create_container`.
#[derive(Debug, Clone)]
pub struct ContainerDescriptor {
    pub instance_config: InstanceConfig,
    /// Local path of the function's code archive.
    pub code_archive: PathBuf,
    /// File name the code was uploaded under, if known.
    pub original_code_file_name: Option<String>,
    pub expected_health_check_interval: Option<Duration>,
}

impl ContainerDescriptor {
    pub fn new(instance_config: InstanceConfig, code_archive: impl Into<PathBuf>) -> Self {
        Self {
            instance_config,
            code_archive: code_archive.into(),
            original_code_file_name: None,
            expected_health_check_interval: None,
        }
    }
}
