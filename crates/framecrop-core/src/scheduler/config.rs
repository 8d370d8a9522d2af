//! Scheduler configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable selecting the scheduler mode (`framed` or `immediate`).
pub const SCHEDULER_MODE_ENV: &str = "FRAMECROP_SCHEDULER";

/// Environment variable overriding the target refresh rate.
pub const TARGET_FPS_ENV: &str = "FRAMECROP_TARGET_FPS";

/// Default target refresh rate.
pub const DEFAULT_TARGET_FPS: f64 = 60.0;

/// Default cap on carried-over time debt, in frame budgets.
pub const DEFAULT_MAX_DEBT_FRAMES: f64 = 10.0;

/// How scheduled callbacks are run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerMode {
    /// Coalesce onto display refresh ticks.
    #[default]
    Framed,
    /// Run callbacks synchronously when scheduled (tests, headless hosts).
    Immediate,
}

impl SchedulerMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "framed" => Some(SchedulerMode::Framed),
            "immediate" | "headless" | "test" => Some(SchedulerMode::Immediate),
            _ => None,
        }
    }
}

/// Frame scheduler settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub target_fps: f64,
    /// Upper bound on time debt carried between flushes, in frame budgets.
    pub max_debt_frames: f64,
    pub mode: SchedulerMode,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            target_fps: DEFAULT_TARGET_FPS,
            max_debt_frames: DEFAULT_MAX_DEBT_FRAMES,
            mode: SchedulerMode::Framed,
        }
    }
}

impl SchedulerConfig {
    /// Immediate-mode configuration for tests and headless hosts.
    pub fn immediate() -> Self {
        Self::default().with_mode(SchedulerMode::Immediate)
    }

    /// Defaults overridden by `FRAMECROP_SCHEDULER` and `FRAMECROP_TARGET_FPS`.
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(value) = lookup(SCHEDULER_MODE_ENV) {
            match SchedulerMode::parse(&value) {
                Some(mode) => config.mode = mode,
                None => log::warn!("Ignoring {}={:?}", SCHEDULER_MODE_ENV, value),
            }
        }
        if let Some(value) = lookup(TARGET_FPS_ENV) {
            match value.trim().parse::<f64>() {
                Ok(fps) if fps.is_finite() && fps > 0.0 => config.target_fps = fps,
                _ => log::warn!("Ignoring {}={:?}", TARGET_FPS_ENV, value),
            }
        }
        config
    }

    pub fn with_mode(mut self, mode: SchedulerMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_target_fps(mut self, fps: f64) -> Self {
        self.target_fps = fps;
        self
    }

    pub fn with_max_debt_frames(mut self, frames: f64) -> Self {
        self.max_debt_frames = frames;
        self
    }

    /// Time allotted to one frame. Rates below 1 fps are treated as 1 fps.
    pub fn frame_budget(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps.max(1.0))
    }

    /// Largest time debt carried between flushes.
    ///
    /// Negative or NaN multipliers mean no debt; a cap too large for a
    /// `Duration` saturates.
    pub fn max_debt(&self) -> Duration {
        let frames = if self.max_debt_frames.is_nan() {
            0.0
        } else {
            self.max_debt_frames.max(0.0)
        };
        Duration::try_from_secs_f64(self.frame_budget().as_secs_f64() * frames)
            .unwrap_or(Duration::MAX)
    }
}
