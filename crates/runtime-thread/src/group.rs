use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Poll interval while waiting for container threads in [`ThreadGroup::join`].
const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Named registry of every container thread started by one factory.
///
/// Each member thread receives a child of the group's cancellation token.
/// [`interrupt`](Self::interrupt) cancels all of them without waiting;
/// [`join`](Self::join) waits, bounded by a timeout, for them to exit.
pub struct ThreadGroup {
    name: String,
    token: CancellationToken,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl ThreadGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            token: CancellationToken::new(),
            threads: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Child token for a new member. Cancelled when the group is interrupted.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Spawn a named member thread running `body`.
    ///
    /// The thread is named `{group}-{name}`.
    pub fn spawn<F>(&self, name: &str, token: CancellationToken, body: F) -> std::io::Result<()>
    where
        F: FnOnce(CancellationToken) + Send + 'static,
    {
        let thread_name = format!("{}-{name}", self.name);
        let handle = std::thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || body(token))?;

        let mut threads = self.threads();
        threads.retain(|h| !h.is_finished());
        threads.push(handle);
        debug!(group = %self.name, thread = %thread_name, members = threads.len(), "thread spawned");
        Ok(())
    }

    /// Signal every member to stop. Non-blocking.
    pub fn interrupt(&self) {
        self.token.cancel();
        info!(group = %self.name, "thread group interrupted");
    }

    pub fn is_interrupted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Number of member threads that have not finished yet.
    pub fn active_count(&self) -> usize {
        self.threads().iter().filter(|h| !h.is_finished()).count()
    }

    /// Wait up to `timeout` for all member threads to exit.
    ///
    /// Returns the number of threads still running when the wait ended.
    pub fn join(&self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        loop {
            let running = self.reap();
            let now = Instant::now();
            if running == 0 || now >= deadline {
                if running > 0 {
                    warn!(group = %self.name, running, "threads still running after join timeout");
                }
                return running;
            }
            std::thread::sleep(JOIN_POLL_INTERVAL.min(deadline - now));
        }
    }

    /// Join finished members and return how many are still running.
    fn reap(&self) -> usize {
        let finished: Vec<JoinHandle<()>> = {
            let mut threads = self.threads();
            let (finished, running) = threads.drain(..).partition(|h| h.is_finished());
            *threads = running;
            finished
        };

        for handle in finished {
            let thread = handle.thread().name().unwrap_or_default().to_string();
            if handle.join().is_err() {
                warn!(group = %self.name, thread = %thread, "container thread panicked");
            }
        }

        self.threads().len()
    }

    fn threads(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.threads.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ThreadGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadGroup")
            .field("name", &self.name)
            .field("interrupted", &self.is_interrupted())
            .finish_non_exhaustive()
    }
}
