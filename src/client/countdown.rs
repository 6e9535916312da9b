//! Repeating re-render ticker driving the countdown display.

use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::interval};

use crate::clock::Clock;

/// Period between two ticks.
pub const TICK_PERIOD: Duration = Duration::from_millis(500);
/// The ticker stops on the first tick more than this long after the start.
pub const SETTLE_MS: u64 = 1_000;

/// Running ticker. Aborts its task on [`CountdownHandle::cancel`] or drop.
#[derive(Debug)]
pub struct CountdownHandle {
    task: JoinHandle<()>,
}

impl CountdownHandle {
    /// Stop the ticker.
    pub fn cancel(self) {
        // Drop aborts.
    }

    /// Whether the ticker stopped on its own or was aborted.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Whether a tick observed at `now_ms` is the last one.
pub fn should_stop(started_at: Option<u64>, now_ms: u64) -> bool {
    started_at.is_some_and(|started_at| now_ms.saturating_sub(started_at) > SETTLE_MS)
}

/// Spawn a ticker calling `on_tick` immediately and then every [`TICK_PERIOD`].
///
/// It stops after the tick on which more than [`SETTLE_MS`] elapsed since
/// `started_at`, or as soon as `on_tick` returns `false`. Without a start
/// timestamp it keeps ticking until cancelled.
pub fn start_ticker<F>(started_at: Option<u64>, clock: Arc<dyn Clock>, mut on_tick: F) -> CountdownHandle
where
    F: FnMut() -> bool + Send + 'static,
{
    let task = tokio::spawn(async move {
        let mut ticks = interval(TICK_PERIOD);
        loop {
            ticks.tick().await;
            if !on_tick() {
                break;
            }
            if should_stop(started_at, clock.now_ms()) {
                break;
            }
        }
    });
    CountdownHandle { task }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::time::{Instant, sleep};

    use super::*;

    /// Clock following tokio's (pausable) time.
    struct TokioClock {
        origin_ms: u64,
        origin: Instant,
    }

    impl Clock for TokioClock {
        fn now_ms(&self) -> u64 {
            self.origin_ms + self.origin.elapsed().as_millis() as u64
        }
    }

    fn tokio_clock(origin_ms: u64) -> Arc<dyn Clock> {
        Arc::new(TokioClock {
            origin_ms,
            origin: Instant::now(),
        })
    }

    fn counting() -> (Arc<AtomicUsize>, impl FnMut() -> bool + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
            true
        })
    }

    #[test]
    fn stops_only_after_settling() {
        assert!(!should_stop(None, u64::MAX));
        assert!(!should_stop(Some(10_000), 9_000));
        assert!(!should_stop(Some(10_000), 11_000));
        assert!(should_stop(Some(10_000), 11_001));
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_every_half_second_until_settled() {
        let (count, on_tick) = counting();
        // Start 2 s ahead: ticks at 0, 500, ..., 3500 ms; 3500 is the first past the settle window.
        let handle = start_ticker(Some(12_000), tokio_clock(10_000), on_tick);

        sleep(Duration::from_secs(10)).await;
        assert!(handle.is_finished());
        assert_eq!(count.load(Ordering::SeqCst), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn late_observer_ticks_once() {
        let (count, on_tick) = counting();
        let handle = start_ticker(Some(0), tokio_clock(60_000), on_tick);

        sleep(Duration::from_secs(2)).await;
        assert!(handle.is_finished());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unscheduled_ticker_runs_until_cancelled() {
        let (count, on_tick) = counting();
        let handle = start_ticker(None, tokio_clock(0), on_tick);

        sleep(Duration::from_millis(2_250)).await;
        assert_eq!(count.load(Ordering::SeqCst), 5);

        handle.cancel();
        sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 5);
    }
}
