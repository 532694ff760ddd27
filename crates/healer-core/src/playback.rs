use crate::model::LogEntry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::debug;

type Completion = Box<dyn FnOnce() + Send + 'static>;

/// Reveals a fixed sequence of log entries, one per tick.
pub struct LogPlayback;

impl LogPlayback {
    /// Starts playback on the current tokio runtime.
    ///
    /// Tick `k` (at `k * interval`) reveals entry `k`; `None` slots are
    /// skipped but still consume their tick. `on_complete` runs exactly once
    /// after the last tick unless the returned handle is stopped or dropped
    /// first, in which case it never runs.
    pub fn start<E, C>(
        entries: Vec<Option<LogEntry>>,
        interval: Duration,
        mut on_entry: E,
        on_complete: C,
    ) -> PlaybackHandle
    where
        E: FnMut(LogEntry) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        let completion: Arc<Mutex<Option<Completion>>> =
            Arc::new(Mutex::new(Some(Box::new(on_complete))));
        let cancelled = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));

        let task_completion = completion.clone();
        let task_cancelled = cancelled.clone();
        let task_finished = finished.clone();
        let total = entries.len();
        let task = tokio::spawn(async move {
            let period = interval.max(Duration::from_millis(1));
            let mut ticker = interval_at(Instant::now() + period, period);
            for (index, slot) in entries.into_iter().enumerate() {
                ticker.tick().await;
                if task_cancelled.load(Ordering::SeqCst) {
                    return;
                }
                match slot {
                    Some(entry) => on_entry(entry),
                    None => debug!(index, "skipping missing log entry"),
                }
            }
            task_finished.store(true, Ordering::SeqCst);
            let callback = task_completion
                .lock()
                .ok()
                .and_then(|mut slot| slot.take());
            if let Some(callback) = callback {
                debug!(entries = total, "log playback complete");
                callback();
            }
        });

        PlaybackHandle {
            task: Some(task),
            completion,
            cancelled,
            finished,
        }
    }
}

/// Owns the playback task. Stopping or dropping releases it.
pub struct PlaybackHandle {
    task: Option<JoinHandle<()>>,
    completion: Arc<Mutex<Option<Completion>>>,
    cancelled: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
}

impl PlaybackHandle {
    /// Cancels playback. Returns `true` if this call prevented the completion
    /// callback from running.
    pub fn stop(&mut self) -> bool {
        self.cancelled.store(true, Ordering::SeqCst);
        let prevented = self
            .completion
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
            .is_some();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if prevented {
            debug!("log playback cancelled");
        }
        prevented
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

impl Drop for PlaybackHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
