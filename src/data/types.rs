use serde::{Deserialize, Serialize};
use crate::analysis::types::ForecastMethod;

/// What the backend has data for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub disorders: Vec<String>,
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub year_range: Option<YearRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesParams {
    /// Disorder label in the display language
    pub target: String,
    pub region: Option<String>,
    pub year_start: Option<i32>,
    pub year_end: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastParams {
    #[serde(flatten)]
    pub series: TimeSeriesParams,
    #[serde(rename = "forecastPeriod")]
    pub forecast_period: Option<u32>,
    pub method: Option<ForecastMethod>,
}

impl TimeSeriesParams {
    #[cfg(test)]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            region: None,
            year_start: None,
            year_end: None,
        }
    }
}

impl From<TimeSeriesParams> for ForecastParams {
    fn from(series: TimeSeriesParams) -> Self {
        Self {
            series,
            forecast_period: None,
            method: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub year: i32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesStatistics {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub trend: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesMetadata {
    pub statistics: SeriesStatistics,
    pub n_points: usize,
    pub years_covered: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub params: serde_json::Value,
    pub data: Vec<DataPoint>,
    pub metadata: SeriesMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub year: i32,
    pub value: f64,
    #[serde(default)]
    pub lower_bound: Option<f64>,
    #[serde(default)]
    pub upper_bound: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceIntervals {
    #[serde(default)]
    pub lower: Option<Vec<f64>>,
    #[serde(default)]
    pub upper: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetrics {
    pub rmse: Option<f64>,
    pub mae: Option<f64>,
    pub mape: Option<f64>,
    pub aic: Option<f64>,
    pub bic: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub params: serde_json::Value,
    pub predictions: Vec<Prediction>,
    #[serde(default)]
    pub confidence_intervals: ConfidenceIntervals,
    #[serde(default)]
    pub metrics: ForecastMetrics,
}
