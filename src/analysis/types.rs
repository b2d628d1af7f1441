use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnalysisType {
    #[default]
    TimeSeries,
    Clustering,
    Correlation,
    Regression,
    Anomaly,
}

impl AnalysisType {
    /// Name used in processing logs
    pub fn display_name(&self) -> &'static str {
        match self {
            AnalysisType::TimeSeries => "trend forecasting",
            AnalysisType::Clustering => "profile clustering",
            AnalysisType::Correlation => "disorder correlation",
            AnalysisType::Regression => "influence factors",
            AnalysisType::Anomaly => "anomaly detection",
        }
    }
}

impl std::fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AnalysisType::TimeSeries => "timeSeries",
            AnalysisType::Clustering => "clustering",
            AnalysisType::Correlation => "correlation",
            AnalysisType::Regression => "regression",
            AnalysisType::Anomaly => "anomaly",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastMethod {
    #[default]
    Prophet,
    Arima,
}

impl ForecastMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastMethod::Prophet => "prophet",
            ForecastMethod::Arima => "arima",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(rename = "year_start", skip_serializing_if = "Option::is_none")]
    pub year_start: Option<i32>,
    #[serde(rename = "year_end", skip_serializing_if = "Option::is_none")]
    pub year_end: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast_period: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<ForecastMethod>,
    /// Confidence level of the forecast band, e.g. 0.8
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yearly_seasonality: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusteringSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_clusters: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorrelationSettings {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub disorders: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegressionSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnomalySettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<u8>,
}

/// Parameters for one analysis, keyed by its type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AnalysisParams {
    TimeSeries(TimeSeriesSettings),
    Clustering(ClusteringSettings),
    Correlation(CorrelationSettings),
    Regression(RegressionSettings),
    Anomaly(AnomalySettings),
}

impl AnalysisParams {
    /// Empty parameter set for `analysis_type`
    pub fn empty(analysis_type: AnalysisType) -> Self {
        match analysis_type {
            AnalysisType::TimeSeries => AnalysisParams::TimeSeries(TimeSeriesSettings::default()),
            AnalysisType::Clustering => AnalysisParams::Clustering(ClusteringSettings::default()),
            AnalysisType::Correlation => AnalysisParams::Correlation(CorrelationSettings::default()),
            AnalysisType::Regression => AnalysisParams::Regression(RegressionSettings::default()),
            AnalysisType::Anomaly => AnalysisParams::Anomaly(AnomalySettings::default()),
        }
    }

    pub fn analysis_type(&self) -> AnalysisType {
        match self {
            AnalysisParams::TimeSeries(_) => AnalysisType::TimeSeries,
            AnalysisParams::Clustering(_) => AnalysisType::Clustering,
            AnalysisParams::Correlation(_) => AnalysisType::Correlation,
            AnalysisParams::Regression(_) => AnalysisType::Regression,
            AnalysisParams::Anomaly(_) => AnalysisType::Anomaly,
        }
    }

    /// Disorder the analysis targets, if the type has one and it is set
    pub fn target(&self) -> Option<&str> {
        let target = match self {
            AnalysisParams::TimeSeries(settings) => settings.target.as_deref(),
            AnalysisParams::Regression(settings) => settings.target.as_deref(),
            AnalysisParams::Anomaly(settings) => settings.target.as_deref(),
            AnalysisParams::Clustering(_) | AnalysisParams::Correlation(_) => None,
        };
        target.filter(|t| !t.is_empty())
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}
