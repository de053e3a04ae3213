//! The one-second tick source.
//!
//! Exactly one ticker task may exist per driver. `start` refuses to spawn a
//! second one while the first is alive, because two tickers would drain the
//! countdown at twice real time.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

/// Receives the driver's ticks. All work must finish synchronously.
pub trait TickTarget: Send + Sync + 'static {
    fn on_tick(&self);
}

pub struct ClockDriver {
    period: Duration,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl Default for ClockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockDriver {
    pub fn new() -> Self {
        Self::with_period(Duration::from_secs(1))
    }

    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            ticker: Mutex::new(None),
        }
    }

    /// Spawn the ticker task on the current tokio runtime.
    ///
    /// Returns `false` without spawning anything if a ticker is already
    /// running. The first tick fires one period after the call.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn start<T: TickTarget>(&self, target: Arc<T>) -> bool {
        let mut ticker = self.lock();
        if ticker.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("clock driver already running");
            return false;
        }

        let period = self.period;
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            // A stalled runtime must not replay missed seconds in a burst.
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                target.on_tick();
            }
        });
        *ticker = Some(handle);
        debug!(period_ms = period.as_millis() as u64, "clock driver started");
        true
    }

    /// Abort the ticker. Returns `false` if nothing was running.
    pub fn stop(&self) -> bool {
        match self.lock().take() {
            Some(handle) => {
                let was_running = !handle.is_finished();
                handle.abort();
                debug!("clock driver stopped");
                was_running
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn lock(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.ticker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for ClockDriver {
    fn drop(&mut self) {
        if let Some(handle) = self.lock().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Default)]
    struct Counter(AtomicU64);

    impl TickTarget for Counter {
        fn on_tick(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Counter {
        fn get(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_second() {
        let driver = ClockDriver::new();
        let counter = Arc::new(Counter::default());
        assert!(driver.start(counter.clone()));

        time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(counter.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_is_refused() {
        let driver = ClockDriver::new();
        let counter = Arc::new(Counter::default());
        assert!(driver.start(counter.clone()));
        assert!(!driver.start(counter.clone()));
        assert!(driver.is_running());

        time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(counter.get(), 2, "duplicate driver would double the rate");
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent_and_halts_ticks() {
        let driver = ClockDriver::new();
        let counter = Arc::new(Counter::default());
        driver.start(counter.clone());
        time::sleep(Duration::from_millis(1500)).await;

        assert!(driver.stop());
        assert!(!driver.stop());
        assert!(!driver.is_running());

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(counter.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn can_restart_after_stop() {
        let driver = ClockDriver::new();
        let counter = Arc::new(Counter::default());
        driver.start(counter.clone());
        driver.stop();
        assert!(driver.start(counter.clone()));

        time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(counter.get(), 1);
    }
}
