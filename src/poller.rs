//! Repeating-fetch lifecycle, independent of what is being fetched.

use futures::future::BoxFuture;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

/// The work run on every tick.
pub type Tick = Box<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Owns at most one repeating task.
///
/// Each tick awaits its work before the next tick is taken and late ticks
/// are skipped, so two ticks never run at the same time.
#[derive(Default)]
pub struct Poller {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Poller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops any running cycle, runs `tick` immediately and then every
    /// `every`. Must be called from within a tokio runtime.
    pub fn start(&self, every: Duration, tick: Tick) {
        let mut handle = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = handle.take() {
            previous.abort();
            debug!("Replaced running poll cycle");
        }

        info!(every_ms = every.as_millis(), "Polling started");
        *handle = Some(tokio::spawn(async move {
            // `interval` panics on a zero period.
            let mut ticker = interval(every.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                tick().await;
            }
        }));
    }

    /// Cancels the running cycle. A no-op when nothing is running.
    pub fn stop(&self) {
        let mut handle = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(running) = handle.take() {
            running.abort();
            info!("Polling stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}
