use std::path::{Path, PathBuf};

use crate::error::Result;

/// Cache of loaded function code shared by every container of a factory.
pub trait FunctionCacheManager: Send + Sync {
    /// Record that an instance of `function_id` uses `code_archive`.
    fn register_function(&self, function_id: &str, code_archive: &Path) -> Result<()>;

    /// Drop one instance reference; the entry is evicted with the last one.
    fn unregister_function(&self, function_id: &str);

    fn code_archive(&self, function_id: &str) -> Option<PathBuf>;

    /// Release every cached entry. Later registrations fail.
    fn close(&self);
}

/// Process-wide state shared by function instances across factories.
pub trait InstanceCache: Send + Sync {
    /// Stop everything the cache runs on behalf of instances.
    fn shutdown(&self);
}
