use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RuntimeError};

/// Directory name used under the system temp dir when no extraction
/// directory is configured.
const DEFAULT_EXTRACTION_DIR_NAME: &str = "function-extraction";

fn default_extraction_directory() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_EXTRACTION_DIR_NAME)
}

/// Worker-level configuration shared by every runtime factory kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub broker_service_url: String,
    pub broker_web_service_url: Option<String>,
    pub state_storage_service_url: Option<String>,
    #[serde(default = "default_extraction_directory")]
    pub extraction_directory: PathBuf,
    #[serde(default)]
    pub expose_admin_client_enabled: bool,
    /// Factory-specific block, interpreted by the selected runtime factory.
    pub function_runtime_factory_configs: Option<serde_json::Map<String, serde_json::Value>>,
}

impl WorkerConfig {
    pub fn new(broker_service_url: impl Into<String>) -> Self {
        Self {
            broker_service_url: broker_service_url.into(),
            broker_web_service_url: None,
            state_storage_service_url: None,
            extraction_directory: default_extraction_directory(),
            expose_admin_client_enabled: false,
            function_runtime_factory_configs: None,
        }
    }

    /// Load a worker config from a YAML file.
    ///
    /// A relative `extraction_directory` is resolved against the config
    /// file's parent directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RuntimeError::Config(format!("read {}: {e}", path.display())))?;
        let mut config: WorkerConfig = serde_yaml_ng::from_str(&content)
            .map_err(|e| RuntimeError::Config(format!("parse {}: {e}", path.display())))?;
        if let Some(config_dir) = path.parent()
            && config.extraction_directory.is_relative()
        {
            config.extraction_directory = config_dir.join(&config.extraction_directory);
        }
        Ok(config)
    }

    /// Convert the generic factory block into a factory-specific config type.
    pub fn runtime_factory_config<T: DeserializeOwned>(&self) -> Result<T> {
        let block = self.function_runtime_factory_configs.clone().ok_or_else(|| {
            RuntimeError::Config("function_runtime_factory_configs is missing".into())
        })?;
        serde_json::from_value(serde_json::Value::Object(block))
            .map_err(|e| RuntimeError::Config(format!("function_runtime_factory_configs: {e}")))
    }
}
