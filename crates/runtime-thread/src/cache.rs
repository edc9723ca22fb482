use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use function_runtime::{FunctionCacheManager, RuntimeError};
use tracing::{debug, info};

use crate::loader::Loader;

struct CacheEntry {
    code_archive: PathBuf,
    instances: usize,
}

/// Reference-counted cache of function code archives, bound to one [`Loader`].
pub struct FunctionCacheManagerImpl {
    loader: Arc<Loader>,
    entries: Mutex<HashMap<String, CacheEntry>>,
    closed: AtomicBool,
}

impl FunctionCacheManagerImpl {
    pub fn new(loader: Arc<Loader>) -> Self {
        Self {
            loader,
            entries: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn loader(&self) -> &Arc<Loader> {
        &self.loader
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of distinct functions currently cached.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FunctionCacheManager for FunctionCacheManagerImpl {
    fn register_function(&self, function_id: &str, code_archive: &Path) -> function_runtime::Result<()> {
        let mut entries = self.entries();
        // Checked under the lock so a concurrent close cannot miss this entry.
        if self.is_closed() {
            return Err(RuntimeError::Closed(format!(
                "function cache closed, cannot register {function_id}"
            )));
        }

        let entry = entries
            .entry(function_id.to_string())
            .or_insert_with(|| CacheEntry {
                code_archive: code_archive.to_path_buf(),
                instances: 0,
            });
        if entry.code_archive != code_archive {
            return Err(RuntimeError::Config(format!(
                "function {function_id} already cached from {}, got {}",
                entry.code_archive.display(),
                code_archive.display()
            )));
        }
        entry.instances += 1;
        debug!(function_id, instances = entry.instances, loader = %self.loader.name(), "function registered");
        Ok(())
    }

    fn unregister_function(&self, function_id: &str) {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(function_id) else {
            return;
        };
        entry.instances = entry.instances.saturating_sub(1);
        if entry.instances == 0 {
            entries.remove(function_id);
            debug!(function_id, "function evicted");
        }
    }

    fn code_archive(&self, function_id: &str) -> Option<PathBuf> {
        self.entries()
            .get(function_id)
            .map(|entry| entry.code_archive.clone())
    }

    fn close(&self) {
        let mut entries = self.entries();
        self.closed.store(true, Ordering::Release);
        info!(count = entries.len(), "closing function cache");
        entries.clear();
    }
}
