use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LockResult, RwLock};
use std::time::{Duration, Instant};

use tracing::warn;

static POISON_REPORTED: AtomicBool = AtomicBool::new(false);

/// Enters a poisoned lock anyway. The first poisoning is logged.
fn recover<G>(result: LockResult<G>, operation: &'static str) -> G {
    result.unwrap_or_else(|poisoned| {
        if !POISON_REPORTED.swap(true, Ordering::Relaxed) {
            warn!(operation, "metrics_lock_poisoned");
        }
        poisoned.into_inner()
    })
}

/// Loop health over the last completed interval.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    pub tps: f32,
    pub frame_time_ms: f32,
    pub live_entities: usize,
    /// Simulation time discarded because a frame hit the tick cap.
    pub dropped_backlog_ms: u64,
}

/// Read side of the loop metrics; clones observe the same values.
#[derive(Clone, Debug, Default)]
pub struct MetricsHandle {
    latest: Arc<RwLock<LoopMetricsSnapshot>>,
}

impl MetricsHandle {
    pub fn snapshot(&self) -> LoopMetricsSnapshot {
        *recover(self.latest.read(), "read")
    }

    pub(crate) fn publish(&self, snapshot: LoopMetricsSnapshot) {
        *recover(self.latest.write(), "write") = snapshot;
    }
}

/// Counts frames and ticks until an interval has elapsed, then reports rates.
#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval: Duration,
    window_start: Instant,
    frames: u32,
    ticks: u32,
    frame_time: Duration,
    dropped: Duration,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration) -> Self {
        Self::since(Instant::now(), interval)
    }

    fn since(window_start: Instant, interval: Duration) -> Self {
        Self {
            interval,
            window_start,
            frames: 0,
            ticks: 0,
            frame_time: Duration::ZERO,
            dropped: Duration::ZERO,
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        self.frames = self.frames.saturating_add(1);
        self.frame_time = self.frame_time.saturating_add(frame_dt);
    }

    pub(crate) fn record_tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
    }

    pub(crate) fn record_dropped_backlog(&mut self, dropped: Duration) {
        self.dropped = self.dropped.saturating_add(dropped);
    }

    /// Closes the window and starts a new one once `interval` has passed.
    pub(crate) fn maybe_snapshot(
        &mut self,
        now: Instant,
        live_entities: usize,
    ) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.interval {
            return None;
        }

        let seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = match self.frames {
            0 => 0.0,
            frames => self.frame_time.as_secs_f32() * 1000.0 / frames as f32,
        };
        let snapshot = LoopMetricsSnapshot {
            fps: self.frames as f32 / seconds,
            tps: self.ticks as f32 / seconds,
            frame_time_ms,
            live_entities,
            dropped_backlog_ms: self.dropped.as_millis() as u64,
        };
        *self = Self::since(now, self.interval);
        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn rates_cover_the_whole_window() {
        let start = Instant::now();
        let mut metrics = MetricsAccumulator::since(start, Duration::from_secs(1));
        metrics.record_frame(Duration::from_millis(30));
        metrics.record_frame(Duration::from_millis(10));
        for _ in 0..8 {
            metrics.record_tick();
        }
        metrics.record_dropped_backlog(Duration::from_millis(25));

        let snapshot = metrics
            .maybe_snapshot(start + Duration::from_secs(2), 5)
            .expect("interval elapsed");
        assert!((snapshot.fps - 1.0).abs() < 0.01);
        assert!((snapshot.tps - 4.0).abs() < 0.01);
        assert!((snapshot.frame_time_ms - 20.0).abs() < 0.001);
        assert_eq!(snapshot.live_entities, 5);
        assert_eq!(snapshot.dropped_backlog_ms, 25);
    }

    #[test]
    fn nothing_is_reported_mid_window_and_counters_reset_after() {
        let start = Instant::now();
        let mut metrics = MetricsAccumulator::since(start, Duration::from_secs(1));
        metrics.record_tick();
        assert!(metrics
            .maybe_snapshot(start + Duration::from_millis(400), 0)
            .is_none());

        metrics
            .maybe_snapshot(start + Duration::from_secs(1), 0)
            .expect("first window");
        let second = metrics
            .maybe_snapshot(start + Duration::from_secs(2), 0)
            .expect("second window");
        assert_eq!(second.tps, 0.0);
        assert_eq!(second.frame_time_ms, 0.0);
    }

    #[test]
    fn handle_keeps_working_after_a_writer_panics() {
        let handle = MetricsHandle::default();
        let reader = handle.clone();
        thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = handle.latest.write().expect("write guard");
                    panic!("poison the metrics lock");
                })
                .join();
        });
        assert_eq!(reader.snapshot(), LoopMetricsSnapshot::default());

        handle.publish(LoopMetricsSnapshot {
            live_entities: 3,
            ..LoopMetricsSnapshot::default()
        });
        assert_eq!(reader.snapshot().live_entities, 3);
    }
}
