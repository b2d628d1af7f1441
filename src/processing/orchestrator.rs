use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, error, info};
use crate::analysis::form::{DEFAULT_YEAR_END, DEFAULT_YEAR_START};
use crate::analysis::types::AnalysisParams;
use crate::data::api::ApiClient;
use crate::data::fetch::{FetchError, Transport};
use crate::data::types::{ForecastParams, Metadata, TimeSeriesParams};
use crate::processing::state::{ProcessingEvent, ProcessingState};
use crate::processing::types::{AnalysisResults, RunMetrics, Schedule};

/// Drives the simulated pipeline and the real backend calls for one run at a time.
///
/// Two tasks run per analysis. The ticker advances the cosmetic progress, counts
/// elapsed seconds and finishes the run after the completion delay. The pipeline
/// makes the actual requests. Both report through
/// [`ProcessingState::dispatch`] tagged with the run's generation, so anything
/// arriving after a cancel or a restart is dropped.
pub struct Orchestrator<T> {
    shared: Arc<Shared<T>>,
    tasks: Mutex<RunTasks>,
}

struct Shared<T> {
    api: ApiClient<T>,
    state: Mutex<ProcessingState>,
    wake: Notify,
    schedule: Schedule,
}

#[derive(Default)]
struct RunTasks {
    ticker: Option<JoinHandle<()>>,
    pipeline: Option<JoinHandle<()>>,
}

impl<T: Transport + 'static> Orchestrator<T> {
    pub fn new(api: ApiClient<T>, schedule: Schedule) -> Self {
        Self {
            shared: Arc::new(Shared {
                api,
                state: Mutex::new(ProcessingState::new()),
                wake: Notify::new(),
                schedule,
            }),
            tasks: Mutex::new(RunTasks::default()),
        }
    }

    #[cfg(test)]
    pub fn api(&self) -> &ApiClient<T> {
        &self.shared.api
    }

    pub fn snapshot(&self) -> ProcessingState {
        self.shared.lock().clone()
    }

    /// Begin a new run, replacing any run in progress. Returns its generation.
    pub fn start(&self, params: AnalysisParams, metadata: Option<Metadata>) -> u64 {
        let generation = self.shared.lock().start();
        info!("Starting run {} ({})", generation, params.analysis_type());

        let mut tasks = lock(&self.tasks);
        if let Some(ticker) = tasks.ticker.take() {
            ticker.abort();
        }
        // A previous pipeline keeps running; its generation is stale now
        tasks.ticker = Some(tokio::spawn(run_ticker(Arc::clone(&self.shared), generation)));
        tasks.pipeline = Some(tokio::spawn(run_pipeline(
            Arc::clone(&self.shared),
            generation,
            params,
            metadata,
        )));

        generation
    }

    /// Stop the current run. Requests already sent are left to finish.
    pub fn cancel(&self) -> bool {
        let cancelled = self.shared.lock().cancel();

        if let Some(ticker) = lock(&self.tasks).ticker.take() {
            ticker.abort();
        }
        self.shared.wake.notify_one();

        cancelled
    }

    /// Append a line to the current run's log
    pub fn log(&self, message: impl Into<String>) {
        let mut state = self.shared.lock();
        let generation = state.generation;
        state.dispatch(generation, ProcessingEvent::Log(message.into()));
    }

    /// Wait until the ticker stops and the pipeline has returned
    pub async fn wait(&self) {
        let (ticker, pipeline) = {
            let mut tasks = lock(&self.tasks);
            (tasks.ticker.take(), tasks.pipeline.take())
        };

        for handle in [ticker, pipeline].into_iter().flatten() {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    error!("Processing task failed: {}", e);
                }
            }
        }
    }
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, ProcessingState> {
        lock(&self.state)
    }

    fn dispatch(&self, generation: u64, event: ProcessingEvent) -> bool {
        self.lock().dispatch(generation, event)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock().is_current(generation)
    }
}

fn lock<S>(mutex: &Mutex<S>) -> MutexGuard<'_, S> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn run_ticker<T>(shared: Arc<Shared<T>>, generation: u64) {
    let schedule = shared.schedule;
    let started = Instant::now();
    let mut progress = interval_at(started + schedule.progress_tick, schedule.progress_tick);
    let mut elapsed = interval_at(started + schedule.elapsed_tick, schedule.elapsed_tick);
    let completion = tokio::time::sleep(schedule.completion_delay);
    tokio::pin!(completion);
    let mut armed = false;

    loop {
        tokio::select! {
            _ = progress.tick() => {
                shared.dispatch(generation, ProcessingEvent::ProgressTick);
            }
            _ = elapsed.tick() => {
                shared.dispatch(generation, ProcessingEvent::ElapsedTick);
            }
            _ = &mut completion, if armed => {
                shared.dispatch(generation, ProcessingEvent::Completed);
            }
            _ = shared.wake.notified() => {}
        }

        let (active, completing) = {
            let state = shared.lock();
            (state.is_current(generation) && state.processing, state.completing)
        };
        if !active {
            debug!("Ticker for run {} stopped", generation);
            return;
        }
        if completing && !armed {
            completion.as_mut().reset(Instant::now() + schedule.completion_delay);
            armed = true;
        }
    }
}

async fn run_pipeline<T: Transport>(
    shared: Arc<Shared<T>>,
    generation: u64,
    params: AnalysisParams,
    metadata: Option<Metadata>,
) {
    if let Err(e) = analyse(&shared, generation, &params, metadata.as_ref()).await {
        if shared.is_current(generation) {
            error!("Error during analysis: {}", e);
        }
        shared.dispatch(generation, ProcessingEvent::Failed(e.to_string()));
    }
    shared.wake.notify_one();
}

/// The real work behind the progress bar. Requests are sent as soon as the run
/// starts; the milestones only record what has actually finished.
async fn analyse<T: Transport>(
    shared: &Shared<T>,
    generation: u64,
    params: &AnalysisParams,
    metadata: Option<&Metadata>,
) -> Result<(), AnalysisError> {
    let log = |message: String| shared.dispatch(generation, ProcessingEvent::Log(message));
    let milestone = |progress: u8, message: &str| {
        shared.dispatch(generation, ProcessingEvent::Milestone { progress, message: message.to_string() })
    };

    log(format!("Starting {} analysis", params.analysis_type().display_name()));
    log(format!("Parameters: {}", params.to_json()));
    milestone(20, "Loading historical data...");

    let target = params.target().ok_or(AnalysisError::MissingTarget)?;
    let forecast_params = request_params(params, target, metadata);

    let time_series = shared.api.get_time_series(&forecast_params.series).await?;
    if !shared.is_current(generation) {
        debug!("Dropping time series for stale run {}", generation);
        return Ok(());
    }
    milestone(50, "Training forecast model...");

    let forecast = shared.api.get_forecast(&forecast_params).await?;
    if !shared.is_current(generation) {
        debug!("Dropping forecast for stale run {}", generation);
        return Ok(());
    }
    milestone(80, "Validating results...");

    let metrics = RunMetrics::from(&forecast.metrics);
    shared.dispatch(generation, ProcessingEvent::ResultsReady(AnalysisResults { time_series, forecast }));

    milestone(90, "Generating insights...");
    shared.dispatch(generation, ProcessingEvent::MetricsReady(metrics));

    milestone(100, "Analysis completed successfully!");
    Ok(())
}

/// Backend query for the selected analysis, falling back to the metadata year range
fn request_params(params: &AnalysisParams, target: &str, metadata: Option<&Metadata>) -> ForecastParams {
    let range = metadata.and_then(|m| m.year_range);
    let (region, year_start, year_end, forecast_period, method) = match params {
        AnalysisParams::TimeSeries(s) => (
            s.region.clone(),
            s.year_start,
            s.year_end,
            s.forecast_period,
            s.method,
        ),
        _ => (None, None, None, None, None),
    };

    ForecastParams {
        series: TimeSeriesParams {
            target: target.to_string(),
            region,
            year_start: Some(
                year_start
                    .or(range.map(|r| r.min))
                    .unwrap_or(DEFAULT_YEAR_START),
            ),
            year_end: Some(year_end.or(range.map(|r| r.max)).unwrap_or(DEFAULT_YEAR_END)),
        },
        forecast_period,
        method,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("no disorder selected")]
    MissingTarget,

    #[error(transparent)]
    Fetch(#[from] FetchError),
}
