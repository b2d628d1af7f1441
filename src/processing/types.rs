use serde::Serialize;
use std::time::Duration;
use crate::config::ProcessingConfig;
use crate::data::types::{ForecastMetrics, ForecastResponse, TimeSeriesResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Idle,
    Preprocessing,
    Training,
    Validating,
    GeneratingInsights,
    Done,
    Cancelled,
    Failed,
}

impl Stage {
    /// Stage shown for a progress value while a run is active
    pub fn for_progress(progress: u8) -> Stage {
        match progress {
            0..=19 => Stage::Preprocessing,
            20..=69 => Stage::Training,
            70..=89 => Stage::Validating,
            _ => Stage::GeneratingInsights,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Preprocessing => "preprocessing",
            Stage::Training => "training",
            Stage::Validating => "validating",
            Stage::GeneratingInsights => "generating-insights",
            Stage::Done => "done",
            Stage::Cancelled => "cancelled",
            Stage::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Linear extrapolation of the time left from the time spent so far.
///
/// None until progress moves, and None whenever the estimate rounds to zero or less.
pub fn estimate_remaining(progress: u8, elapsed_secs: u64) -> Option<u64> {
    if progress == 0 {
        return None;
    }

    let progress = f64::from(progress);
    let remaining = ((100.0 - progress) * (elapsed_secs as f64 / progress)).round();
    if remaining > 0.0 {
        Some(remaining as u64)
    } else {
        None
    }
}

/// Everything fetched for one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResults {
    pub time_series: TimeSeriesResponse,
    pub forecast: ForecastResponse,
}

/// Error metrics surfaced on the dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RunMetrics {
    pub rmse: Option<f64>,
    pub mae: Option<f64>,
    pub mape: Option<f64>,
}

impl From<&ForecastMetrics> for RunMetrics {
    fn from(metrics: &ForecastMetrics) -> Self {
        Self {
            rmse: metrics.rmse,
            mae: metrics.mae,
            mape: metrics.mape,
        }
    }
}

/// Timer periods for the simulated pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub progress_tick: Duration,
    pub elapsed_tick: Duration,
    pub completion_delay: Duration,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            progress_tick: Duration::from_millis(300),
            elapsed_tick: Duration::from_millis(1000),
            completion_delay: Duration::from_millis(1000),
        }
    }
}

impl From<&ProcessingConfig> for Schedule {
    fn from(config: &ProcessingConfig) -> Self {
        // Periods of zero would make the tickers spin
        Self {
            progress_tick: Duration::from_millis(config.progress_tick_ms.max(1)),
            elapsed_tick: Duration::from_millis(config.elapsed_tick_ms.max(1)),
            completion_delay: Duration::from_millis(config.completion_delay_ms),
        }
    }
}
