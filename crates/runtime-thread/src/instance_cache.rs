use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use function_runtime::InstanceCache;
use tracing::{debug, info};

/// Instance cache shared by every factory in the process.
///
/// [`shutdown`](InstanceCache::shutdown) takes effect once; a shut-down
/// cache is never reopened.
#[derive(Debug, Default)]
pub struct SharedInstanceCache {
    shut_down: AtomicBool,
}

impl SharedInstanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache used when a factory is not given one.
    ///
    /// Once the current cache has been shut down, the next call installs
    /// and returns a fresh one. Factories already holding the old cache
    /// keep it.
    pub fn global() -> Arc<SharedInstanceCache> {
        static GLOBAL: OnceLock<Mutex<Arc<SharedInstanceCache>>> = OnceLock::new();
        let mut current = GLOBAL
            .get_or_init(|| Mutex::new(Arc::new(SharedInstanceCache::new())))
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if current.is_shut_down() {
            *current = Arc::new(SharedInstanceCache::new());
            debug!("replaced shut-down process instance cache");
        }
        Arc::clone(&current)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}

impl InstanceCache for SharedInstanceCache {
    fn shutdown(&self) {
        if self
            .shut_down
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        info!("instance cache shut down");
    }
}
