use std::{sync::Mutex, time::Duration};

use tokio::{runtime::Handle, task::JoinHandle, time};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

pub const SAVE_DEBOUNCE: Duration = Duration::from_millis(500);

/// Trailing-edge debounce for settings writes.
///
/// Each `schedule` aborts the write still waiting from the previous call, so a
/// burst of edits inside the window produces a single write once input settles.
pub struct SaveDebouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl SaveDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn schedule<F>(&self, write: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut pending = self.lock_pending();
        if let Some(previous) = pending.take() {
            previous.abort();
        }

        match Handle::try_current() {
            Ok(runtime) => {
                let delay = self.delay;
                *pending = Some(runtime.spawn(async move {
                    time::sleep(delay).await;
                    write();
                }));
            }
            Err(_) => {
                log_warn!("No async runtime available; writing settings immediately");
                write();
            }
        }
    }

    /// Drops the pending write, if any. Returns whether one was still waiting.
    pub fn cancel(&self) -> bool {
        match self.lock_pending().take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                log_debug!("Cancelled pending settings write");
                true
            }
            _ => false,
        }
    }

    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        self.lock_pending()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for SaveDebouncer {
    fn drop(&mut self) {
        if let Some(handle) = self.lock_pending().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    #[tokio::test(start_paused = true)]
    async fn burst_of_schedules_writes_once() {
        let debouncer = SaveDebouncer::new(SAVE_DEBOUNCE);
        let writes = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let writes = writes.clone();
            debouncer.schedule(move || {
                writes.fetch_add(1, Ordering::SeqCst);
            });
            time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(writes.load(Ordering::SeqCst), 0);
        assert!(debouncer.is_pending());

        time::sleep(Duration::from_millis(450)).await;
        assert_eq!(writes.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn separated_schedules_write_each_time() {
        let debouncer = SaveDebouncer::new(SAVE_DEBOUNCE);
        let writes = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let writes = writes.clone();
            debouncer.schedule(move || {
                writes.fetch_add(1, Ordering::SeqCst);
            });
            time::sleep(Duration::from_millis(600)).await;
        }
        assert_eq!(writes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_write() {
        let debouncer = SaveDebouncer::new(SAVE_DEBOUNCE);
        let writes = Arc::new(AtomicUsize::new(0));

        let counter = writes.clone();
        debouncer.schedule(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(writes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn without_runtime_writes_synchronously() {
        let debouncer = SaveDebouncer::new(SAVE_DEBOUNCE);
        let writes = Arc::new(AtomicUsize::new(0));
        let counter = writes.clone();
        debouncer.schedule(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(writes.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }
}
