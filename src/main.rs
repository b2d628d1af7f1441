mod analysis;
mod config;
mod data;
mod monitoring;
mod processing;

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use analysis::form::ParameterForm;
use analysis::types::{AnalysisParams, AnalysisType};
use config::{AnalysisConfig, Config, EnvConfig};
use data::api::ApiClient;
use data::fetch::{FetchClient, ReqwestTransport};
use monitoring::export::ResultsExporter;
use processing::orchestrator::Orchestrator;
use processing::types::{Schedule, Stage};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Mindtrends starting...");

    // Load configuration
    let mut config = Config::load("config.toml")?;
    let env_config = EnvConfig::load()?;
    config.apply_env(&env_config);

    info!("API base URL: {}", config.api.base_url);
    info!("Analysis type: {}", config.analysis.analysis_type);
    if config.disorders.is_empty() {
        warn!("No disorder translations configured, labels are sent as-is");
    } else {
        info!("Disorder translations loaded: {}", config.disorders.len());
    }

    let transport = ReqwestTransport::new(config.api.timeout()).context("Failed to build HTTP client")?;
    let api = ApiClient::new(
        FetchClient::new(transport).with_retry_delay(config.api.retry_delay()),
        config.api.base_url.clone(),
        config.disorders.clone(),
    )
    .with_retries(config.api.retries);

    // Without metadata the form keeps empty defaults and the run reports what is missing
    let metadata = match api.get_metadata().await {
        Ok(metadata) => Some(metadata),
        Err(e) => {
            warn!("Failed to load metadata: {}", e);
            None
        }
    };

    // The form opens on the default type, then the configured one is selected
    let (params_tx, params_rx) = watch::channel(AnalysisParams::empty(AnalysisType::default()));
    let mut form = ParameterForm::new(AnalysisType::default(), move |params: &AnalysisParams| {
        params_tx.send_replace(params.clone());
    });
    if let Some(metadata) = &metadata {
        form.apply_metadata(metadata);
    }
    form.select(config.analysis.analysis_type);
    apply_overrides(&mut form, &config.analysis);
    let params = params_rx.borrow().clone();

    let orchestrator = Orchestrator::new(api, Schedule::from(&config.processing));
    orchestrator.start(params, metadata);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut report = tokio::time::interval(Duration::from_secs(1));

    let cancelled = loop {
        tokio::select! {
            _ = report.tick() => {
                let state = orchestrator.snapshot();
                info!(
                    stage = %state.stage,
                    progress = state.progress,
                    elapsed = state.elapsed,
                    remaining = ?state.remaining,
                    "Processing"
                );
                if !state.processing {
                    break false;
                }
            }
            _ = &mut ctrl_c => {
                info!("Cancelling...");
                orchestrator.cancel();
                break true;
            }
        }
    };

    if !cancelled {
        // Requests can outlive the progress bar
        orchestrator.wait().await;
    }

    let state = orchestrator.snapshot();
    info!("Finished in stage {} after {}s", state.stage, state.elapsed);

    if let Some(metrics) = &state.metrics {
        info!("Metrics: rmse={:?}, mae={:?}, mape={:?}", metrics.rmse, metrics.mae, metrics.mape);
    }

    if state.stage == Stage::Failed {
        let reason = state.error.as_deref().unwrap_or("unknown error");
        error!("Analysis failed: {}", reason);
        anyhow::bail!("Analysis failed: {}", reason);
    }

    if config.export.enabled && state.stage == Stage::Done {
        match &state.results {
            Some(results) => {
                let exporter =
                    ResultsExporter::new(config.export.csv_path.clone(), config.export.json_path.clone());

                orchestrator.log("Exporting results as CSV");
                exporter.export_csv(results)?;
                info!("Wrote {}", exporter.csv_path());

                orchestrator.log("Exporting results as JSON");
                exporter.export_json(results, state.metrics.as_ref())?;
                info!("Wrote {}", exporter.json_path());
            }
            None => warn!("No results to export"),
        }
    }

    info!("Shutting down...");
    Ok(())
}

/// Push `[analysis]` overrides through the form like any other control change
fn apply_overrides(form: &mut ParameterForm, analysis: &AnalysisConfig) {
    for update in analysis.updates() {
        if let Err(e) = form.update(update) {
            warn!("Ignoring [analysis] override: {}", e);
        }
    }
}
