use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use crate::processing::types::{AnalysisResults, RunMetrics};

/// Writes a finished analysis to disk.
pub struct ResultsExporter {
    csv_path: String,
    json_path: String,
}

#[derive(Serialize)]
struct JsonExport<'a> {
    exported_at: DateTime<Utc>,
    results: &'a AnalysisResults,
    metrics: Option<&'a RunMetrics>,
}

impl ResultsExporter {
    pub fn new(csv_path: String, json_path: String) -> Self {
        Self { csv_path, json_path }
    }

    /// Observed and forecast points, one row each
    pub fn export_csv(&self, results: &AnalysisResults) -> Result<()> {
        let file = File::create(&self.csv_path)
            .with_context(|| format!("Failed to create CSV export: {}", self.csv_path))?;
        let mut out = BufWriter::new(file);

        writeln!(out, "series,year,value,lower_bound,upper_bound")?;

        for point in &results.time_series.data {
            writeln!(out, "observed,{},{},,", point.year, point.value)?;
        }

        for prediction in &results.forecast.predictions {
            writeln!(
                out,
                "forecast,{},{},{},{}",
                prediction.year,
                prediction.value,
                optional(prediction.lower_bound),
                optional(prediction.upper_bound)
            )?;
        }

        out.flush()?;
        Ok(())
    }

    pub fn export_json(&self, results: &AnalysisResults, metrics: Option<&RunMetrics>) -> Result<()> {
        let file = File::create(&self.json_path)
            .with_context(|| format!("Failed to create JSON export: {}", self.json_path))?;

        let export = JsonExport {
            exported_at: Utc::now(),
            results,
            metrics,
        };
        serde_json::to_writer_pretty(BufWriter::new(file), &export)
            .with_context(|| format!("Failed to write JSON export: {}", self.json_path))?;

        Ok(())
    }

    pub fn csv_path(&self) -> &str {
        &self.csv_path
    }

    pub fn json_path(&self) -> &str {
        &self.json_path
    }
}

fn optional(value: Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::mock::{FORECAST_JSON, TIME_SERIES_JSON};

    fn results() -> AnalysisResults {
        AnalysisResults {
            time_series: serde_json::from_str(TIME_SERIES_JSON).unwrap(),
            forecast: serde_json::from_str(FORECAST_JSON).unwrap(),
        }
    }

    fn temp_path(name: &str) -> String {
        std::env::temp_dir()
            .join(format!("mindtrends-{}-{}", std::process::id(), name))
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn test_export_csv_rows() {
        let csv_path = temp_path("rows.csv");
        let exporter = ResultsExporter::new(csv_path.clone(), temp_path("unused.json"));

        exporter.export_csv(&results()).unwrap();

        let contents = std::fs::read_to_string(&csv_path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "series,year,value,lower_bound,upper_bound");
        assert_eq!(lines[1], "observed,2017,3.41,,");
        assert_eq!(lines[4], "forecast,2020,3.51,3.4,3.62");
        assert_eq!(lines[5], "forecast,2021,3.55,,");
        assert_eq!(lines.len(), 6);

        std::fs::remove_file(csv_path).ok();
    }

    #[test]
    fn test_export_json_includes_metrics() {
        let json_path = temp_path("export.json");
        let exporter = ResultsExporter::new(temp_path("unused.csv"), json_path.clone());
        let metrics = RunMetrics { rmse: Some(0.12), mae: None, mape: Some(2.5) };

        exporter.export_json(&results(), Some(&metrics)).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(value["metrics"]["rmse"], 0.12);
        assert!(value["metrics"]["mae"].is_null());
        assert_eq!(value["results"]["forecast"]["predictions"][0]["year"], 2020);
        assert!(value["exported_at"].is_string());

        std::fs::remove_file(json_path).ok();
    }

    #[test]
    fn test_export_to_missing_directory_fails() {
        let exporter = ResultsExporter::new(
            "/nonexistent-dir/results.csv".to_string(),
            "/nonexistent-dir/results.json".to_string(),
        );
        assert!(exporter.export_csv(&results()).is_err());
    }
}
