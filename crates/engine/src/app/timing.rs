use std::env;
use std::time::{Duration, Instant};

use tracing::warn;

use super::config::{LoopConfig, SLOW_FRAME_ENV_VAR};

const FALLBACK_MAX_FRAME_DELTA: Duration = Duration::from_millis(250);
const FALLBACK_METRICS_INTERVAL: Duration = Duration::from_secs(1);

/// Ticks owed for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StepPlan {
    pub(crate) ticks: u32,
    /// Simulation time thrown away because the per-frame tick cap was hit.
    pub(crate) dropped: Duration,
}

/// Fixed-timestep accumulator. Frame time goes in, whole ticks come out.
#[derive(Debug, Clone)]
pub(crate) struct FixedStep {
    step: Duration,
    max_frame_delta: Duration,
    max_ticks: u32,
    banked: Duration,
}

impl FixedStep {
    pub(crate) fn new(target_tps: u32, max_frame_delta: Duration, max_ticks: u32) -> Self {
        Self {
            step: Duration::from_secs_f64(1.0 / f64::from(target_tps.max(1))),
            max_frame_delta: non_zero_or(max_frame_delta, FALLBACK_MAX_FRAME_DELTA),
            max_ticks: max_ticks.max(1),
            banked: Duration::ZERO,
        }
    }

    pub(crate) fn from_config(config: &LoopConfig) -> Self {
        Self::new(
            config.target_tps,
            config.max_frame_delta,
            config.max_ticks_per_frame,
        )
    }

    pub(crate) fn step(&self) -> Duration {
        self.step
    }

    pub(crate) fn max_frame_delta(&self) -> Duration {
        self.max_frame_delta
    }

    pub(crate) fn max_ticks(&self) -> u32 {
        self.max_ticks
    }

    /// Banks a frame's elapsed time (clamped) and withdraws whole ticks.
    /// When the cap stops the withdrawal with a full tick or more still
    /// banked, the remainder is dropped rather than carried.
    pub(crate) fn advance(&mut self, frame_dt: Duration) -> StepPlan {
        self.banked = self
            .banked
            .saturating_add(frame_dt.min(self.max_frame_delta));

        let mut ticks = 0;
        while self.banked >= self.step && ticks < self.max_ticks {
            self.banked -= self.step;
            ticks += 1;
        }

        let dropped = if self.banked >= self.step {
            std::mem::take(&mut self.banked)
        } else {
            Duration::ZERO
        };
        StepPlan { ticks, dropped }
    }
}

/// Optional render-rate cap.
#[derive(Debug, Clone)]
pub(crate) struct FramePacer {
    frame_budget: Option<Duration>,
    last_present: Instant,
}

impl FramePacer {
    pub(crate) fn new(max_render_fps: Option<u32>) -> Self {
        Self {
            frame_budget: max_render_fps
                .filter(|fps| *fps > 0)
                .map(|fps| Duration::from_secs_f64(1.0 / f64::from(fps))),
            last_present: Instant::now(),
        }
    }

    pub(crate) fn describe(&self) -> String {
        match self.frame_budget {
            Some(budget) => format!("{:.0}", 1.0 / budget.as_secs_f64()),
            None => "off".to_string(),
        }
    }

    /// How long to wait before presenting, given time already spent.
    pub(crate) fn wait_for(&self, since_last_present: Duration) -> Duration {
        self.frame_budget
            .map_or(Duration::ZERO, |budget| budget.saturating_sub(since_last_present))
    }

    pub(crate) fn pace(&self) {
        let wait = self.wait_for(self.last_present.elapsed());
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
    }

    pub(crate) fn presented(&mut self) {
        self.last_present = Instant::now();
    }
}

pub(crate) fn metrics_interval(config: &LoopConfig) -> Duration {
    non_zero_or(config.metrics_log_interval, FALLBACK_METRICS_INTERVAL)
}

/// Artificial per-frame delay for exercising the catch-up path. The
/// environment variable overrides the configured value when it parses.
pub(crate) fn slow_frame_delay(configured_ms: u64) -> Duration {
    let from_env = match env::var(SLOW_FRAME_ENV_VAR) {
        Ok(value) => Some(value),
        Err(env::VarError::NotPresent) => None,
        Err(error) => {
            warn!(env_var = SLOW_FRAME_ENV_VAR, error = %error, "slow_frame_env_unreadable");
            None
        }
    };
    Duration::from_millis(resolve_slow_frame_ms(configured_ms, from_env.as_deref()))
}

fn resolve_slow_frame_ms(configured_ms: u64, from_env: Option<&str>) -> u64 {
    let Some(raw) = from_env else {
        return configured_ms;
    };
    match raw.trim().parse() {
        Ok(ms) => ms,
        Err(_) => {
            warn!(env_var = SLOW_FRAME_ENV_VAR, value = raw, "slow_frame_env_invalid");
            configured_ms
        }
    }
}

fn non_zero_or(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}
