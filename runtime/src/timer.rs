//! Cancellable repeating timers.
//!
//! A [`RepeatingTimer`] runs a tick callback on a fixed period, starting one
//! period after it is started. The returned [`TimerHandle`] stops it; dropping
//! the handle stops it too.

use crate::metrics::TimerMetrics;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Fixed-period timer configuration.
#[derive(Debug, Clone, Copy)]
pub struct RepeatingTimer {
    period: Duration,
}

impl RepeatingTimer {
    /// Create a timer that fires every `period`.
    ///
    /// A zero period is raised to one millisecond.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
        }
    }

    /// The period between ticks.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Spawn the timer task.
    ///
    /// `on_tick` runs once per period. Returning `false` stops the timer.
    /// Ticks missed while a callback is still running are skipped, not
    /// replayed in a burst.
    pub fn start<F, Fut>(self, mut on_tick: F) -> TimerHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let period = self.period;

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                if flag.load(Ordering::Acquire) {
                    break;
                }

                TimerMetrics::record_tick();
                if !on_tick().await {
                    tracing::debug!("Repeating timer stopped by its callback");
                    flag.store(true, Ordering::Release);
                    break;
                }
            }
        });

        TimerHandle {
            cancelled,
            task: Some(task),
        }
    }
}

/// Handle to a running [`RepeatingTimer`].
///
/// After [`cancel`](Self::cancel) returns, no further tick callback starts.
#[derive(Debug)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl TimerHandle {
    /// Stop the timer. Idempotent.
    pub fn cancel(&mut self) {
        let already = self.cancelled.swap(true, Ordering::AcqRel);
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if !already {
            TimerMetrics::record_cancel();
            tracing::debug!("Repeating timer cancelled");
        }
    }

    /// Whether the timer has stopped, by cancellation or by its callback.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_timer(period: Duration) -> (TimerHandle, Arc<AtomicUsize>) {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let handle = RepeatingTimer::new(period).start(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            }
        });
        (handle, ticks)
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_is_one_period_after_start() {
        let (_handle, ticks) = counting_timer(Duration::from_secs(10));

        tokio::time::sleep(Duration::from_millis(9_990)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_future_ticks() {
        let (mut handle, ticks) = counting_timer(Duration::from_secs(10));

        tokio::time::sleep(Duration::from_millis(10_010)).await;
        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_stops_timer() {
        let (handle, ticks) = counting_timer(Duration::from_secs(1));
        drop(handle);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn callback_returning_false_stops_timer() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let handle = RepeatingTimer::new(Duration::from_secs(1)).start(move || {
            let counter = Arc::clone(&counter);
            async move { counter.fetch_add(1, Ordering::SeqCst) < 1 }
        });

        tokio::time::sleep(Duration::from_millis(5_500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert!(handle.is_cancelled());
    }
}
