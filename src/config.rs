use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::time::Duration;
use crate::analysis::form::ParamUpdate;
use crate::analysis::types::{AnalysisType, ForecastMethod};
use crate::data::translation::DisorderTranslations;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub disorders: DisorderTranslations,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingConfig {
    #[serde(default = "default_progress_tick_ms")]
    pub progress_tick_ms: u64,
    #[serde(default = "default_elapsed_tick_ms")]
    pub elapsed_tick_ms: u64,
    #[serde(default = "default_completion_delay_ms")]
    pub completion_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_csv_path")]
    pub csv_path: String,
    #[serde(default = "default_json_path")]
    pub json_path: String,
}

/// Analysis picked at startup, with optional overrides on top of the metadata defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(rename = "type", default = "default_analysis_type")]
    pub analysis_type: AnalysisType,
    pub target: Option<String>,
    pub region: Option<String>,
    pub year_start: Option<i32>,
    pub year_end: Option<i32>,
    pub forecast_period: Option<u32>,
    pub method: Option<ForecastMethod>,
    pub interval_width: Option<f64>,
    pub yearly_seasonality: Option<bool>,
    pub n_clusters: Option<u32>,
    /// Clustering and regression features
    #[serde(default)]
    pub features: Vec<String>,
    /// Disorders to correlate
    #[serde(default)]
    pub disorders: Vec<String>,
    pub sensitivity: Option<u8>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            progress_tick_ms: default_progress_tick_ms(),
            elapsed_tick_ms: default_elapsed_tick_ms(),
            completion_delay_ms: default_completion_delay_ms(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            csv_path: default_csv_path(),
            json_path: default_json_path(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            analysis_type: default_analysis_type(),
            target: None,
            region: None,
            year_start: None,
            year_end: None,
            forecast_period: None,
            method: None,
            interval_width: None,
            yearly_seasonality: None,
            n_clusters: None,
            features: Vec::new(),
            disorders: Vec::new(),
            sensitivity: None,
        }
    }
}

fn default_retries() -> u32 { 3 }
fn default_retry_delay_ms() -> u64 { 1000 }
fn default_timeout_secs() -> u64 { 30 }
fn default_progress_tick_ms() -> u64 { 300 }
fn default_elapsed_tick_ms() -> u64 { 1000 }
fn default_completion_delay_ms() -> u64 { 1000 }
fn default_csv_path() -> String { "results.csv".to_string() }
fn default_json_path() -> String { "results.json".to_string() }
fn default_analysis_type() -> AnalysisType { AnalysisType::TimeSeries }

impl ApiConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AnalysisConfig {
    /// Overrides as form updates, in the order the form applies them
    pub fn updates(&self) -> Vec<ParamUpdate> {
        let mut updates: Vec<ParamUpdate> = [
            self.target.clone().map(ParamUpdate::Target),
            self.region.clone().map(ParamUpdate::Region),
            self.year_start.map(ParamUpdate::YearStart),
            self.year_end.map(ParamUpdate::YearEnd),
            self.forecast_period.map(ParamUpdate::ForecastPeriod),
            self.method.map(ParamUpdate::Method),
            self.interval_width.map(ParamUpdate::IntervalWidth),
            self.yearly_seasonality.map(ParamUpdate::YearlySeasonality),
            self.n_clusters.map(ParamUpdate::Clusters),
            self.sensitivity.map(ParamUpdate::Sensitivity),
        ]
        .into_iter()
        .flatten()
        .collect();

        updates.extend(
            self.features
                .iter()
                .map(|name| ParamUpdate::Feature { name: name.clone(), enabled: true }),
        );
        updates.extend(
            self.disorders
                .iter()
                .map(|name| ParamUpdate::Disorder { name: name.clone(), enabled: true }),
        );
        updates
    }
}

#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub api_base_url: Option<String>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }

    /// Environment wins over the file for anything both define
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(url) = &env.api_base_url {
            self.api.base_url = url.clone();
        }
    }
}

impl EnvConfig {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        Ok(Self {
            api_base_url: std::env::var("MH_API_BASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config_uses_defaults() {
        let config = Config::parse(
            r#"
            [api]
            base_url = "http://localhost:8000/api/v1"
            "#,
        )
        .unwrap();

        assert_eq!(config.api.retries, 3);
        assert_eq!(config.api.retry_delay(), Duration::from_millis(1000));
        assert_eq!(config.processing.progress_tick_ms, 300);
        assert_eq!(config.processing.elapsed_tick_ms, 1000);
        assert_eq!(config.processing.completion_delay_ms, 1000);
        assert_eq!(config.analysis.analysis_type, AnalysisType::TimeSeries);
        assert!(!config.export.enabled);
        assert!(config.disorders.is_empty());
    }

    #[test]
    fn test_shipped_config_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml");
        let config = Config::load(path).unwrap();

        assert_eq!(config.api.base_url, "http://localhost:8000/api/v1");
        assert_eq!(config.disorders.translate("Depressão"), "Depressive disorders");
        assert_eq!(config.disorders.translate("Transtornos Esquizofrênicos"), "Schizophrenia disorders");
        assert_eq!(config.disorders.len(), 10);
        assert_eq!(config.analysis.method, Some(ForecastMethod::Prophet));
    }

    #[test]
    fn test_analysis_overrides_cover_every_type() {
        let config = Config::parse(
            r#"
            [api]
            base_url = "http://a"

            [analysis]
            type = "clustering"
            n_clusters = 4
            features = ["Ansiedade", "Bipolar"]
            disorders = ["Depressão"]
            sensitivity = 7
            interval_width = 0.8
            yearly_seasonality = false
            "#,
        )
        .unwrap();

        assert_eq!(config.analysis.analysis_type, AnalysisType::Clustering);
        assert_eq!(
            config.analysis.updates(),
            vec![
                ParamUpdate::IntervalWidth(0.8),
                ParamUpdate::YearlySeasonality(false),
                ParamUpdate::Clusters(4),
                ParamUpdate::Sensitivity(7),
                ParamUpdate::Feature { name: "Ansiedade".to_string(), enabled: true },
                ParamUpdate::Feature { name: "Bipolar".to_string(), enabled: true },
                ParamUpdate::Disorder { name: "Depressão".to_string(), enabled: true },
            ]
        );
    }

    #[test]
    fn test_shipped_analysis_section_sets_forecast_keys() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml");
        let config = Config::load(path).unwrap();

        assert_eq!(
            config.analysis.updates(),
            vec![ParamUpdate::ForecastPeriod(5), ParamUpdate::Method(ForecastMethod::Prophet)]
        );
    }

    #[test]
    fn test_env_overrides_base_url() {
        let mut config = Config::parse("[api]\nbase_url = \"http://a\"").unwrap();
        config.apply_env(&EnvConfig { api_base_url: Some("http://b/api/v1".to_string()) });
        assert_eq!(config.api.base_url, "http://b/api/v1");

        config.apply_env(&EnvConfig { api_base_url: None });
        assert_eq!(config.api.base_url, "http://b/api/v1");
    }
}
