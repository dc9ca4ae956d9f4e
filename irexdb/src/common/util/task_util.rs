use crate::errors::{ErrorKind, IrexError, IrexResult};
use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use timer::{Guard, Timer};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Runs repeating background tasks until stopped or dropped.
///
/// Every [crate::database::Database] owns one scheduler; it drives the
/// interval flush of dirty collections.
pub(crate) struct Scheduler {
    timer: Timer,
    guards: Mutex<Vec<Guard>>,
}

impl Scheduler {
    pub fn new() -> Scheduler {
        Scheduler {
            timer: Timer::new(),
            guards: Mutex::from(Vec::with_capacity(4)),
        }
    }

    #[inline]
    pub fn schedule<F>(&self, duration: Duration, f: F)
    where
        F: 'static + FnMut() + Send,
    {
        match chrono::Duration::from_std(duration) {
            Ok(chrono_duration) => {
                let guard = self.timer.schedule_repeating(chrono_duration, f);
                self.guards.lock().push(guard);
            }
            Err(e) => {
                log::error!("Failed to convert duration to chrono::Duration: {}, skipping task scheduling", e);
            }
        }
    }

    #[inline]
    pub fn stop(&self) {
        self.guards.lock().clear();
    }

    pub fn task_count(&self) -> usize {
        self.guards.lock().len()
    }
}

/// The tokio runtime the caller runs in, required by the callback forms.
pub(crate) fn current_runtime() -> IrexResult<Handle> {
    Handle::try_current().map_err(|e| {
        log::error!("Callback operations need a tokio runtime: {}", e);
        IrexError::new(
            &format!("Callback operations need a tokio runtime: {}", e),
            ErrorKind::InvalidOperation,
        )
    })
}

/// Drives `future` on a tokio task and hands its outcome to `callback`.
pub(crate) fn spawn_callback<T, Fut, F>(handle: &Handle, future: Fut, callback: F) -> JoinHandle<()>
where
    T: Send + 'static,
    Fut: Future<Output = IrexResult<T>> + Send + 'static,
    F: FnOnce(IrexResult<T>) + Send + 'static,
{
    handle.spawn(async move { callback(future.await) })
}
