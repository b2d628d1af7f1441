use chrono::Local;
use serde::Serialize;
use tracing::{debug, info};
use crate::processing::types::{estimate_remaining, AnalysisResults, RunMetrics, Stage};

/// Something that happened during a run.
#[derive(Debug, Clone)]
pub enum ProcessingEvent {
    /// Cosmetic progress step
    ProgressTick,
    /// One second of wall time
    ElapsedTick,
    /// Real pipeline step finished; progress is raised to at least `progress`
    Milestone { progress: u8, message: String },
    Log(String),
    ResultsReady(AnalysisResults),
    MetricsReady(RunMetrics),
    /// Completion delay after 100% ran out
    Completed,
    Failed(String),
}

/// Everything the processing view shows.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingState {
    /// Run token; anything tagged with an older value is stale
    pub generation: u64,
    pub stage: Stage,
    pub progress: u8,
    pub elapsed: u64,
    pub remaining: Option<u64>,
    pub logs: Vec<String>,
    pub cancelled: bool,
    pub processing: bool,
    /// Reached 100% and waiting out the completion delay
    pub completing: bool,
    pub results: Option<AnalysisResults>,
    pub metrics: Option<RunMetrics>,
    /// Why the run failed, once it has
    pub error: Option<String>,
}

impl ProcessingState {
    pub fn new() -> Self {
        Self {
            generation: 0,
            stage: Stage::Idle,
            progress: 0,
            elapsed: 0,
            remaining: None,
            logs: Vec::new(),
            cancelled: false,
            processing: false,
            completing: false,
            results: None,
            metrics: None,
            error: None,
        }
    }

    /// Reset for a new run and return its generation
    pub fn start(&mut self) -> u64 {
        self.generation += 1;
        self.stage = Stage::Preprocessing;
        self.progress = 0;
        self.elapsed = 0;
        self.remaining = None;
        self.logs.clear();
        self.cancelled = false;
        self.processing = true;
        self.completing = false;
        self.results = None;
        self.metrics = None;
        self.error = None;

        self.generation
    }

    /// Stop the current run. Returns false when nothing was running.
    pub fn cancel(&mut self) -> bool {
        if !self.processing {
            return false;
        }

        self.processing = false;
        self.completing = false;
        self.cancelled = true;
        self.stage = Stage::Cancelled;
        self.push_log("Processing cancelled by user");
        self.generation += 1;
        true
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Apply an event from run `generation`. Returns whether it changed anything.
    pub fn dispatch(&mut self, generation: u64, event: ProcessingEvent) -> bool {
        if !self.is_current(generation) {
            debug!("Discarding stale event from run {} (current {})", generation, self.generation);
            return false;
        }

        match event {
            ProcessingEvent::ProgressTick => {
                if !self.processing || self.completing {
                    return false;
                }
                let next = self.progress + 1;
                self.advance_to(next);
                if next % 10 == 0 {
                    self.push_log(format!("Progress: {}% complete", next));
                }
            }
            ProcessingEvent::ElapsedTick => {
                if !self.processing {
                    return false;
                }
                self.elapsed += 1;
            }
            ProcessingEvent::Milestone { progress, message } => {
                if self.processing {
                    self.advance_to(progress);
                }
                self.push_log(message);
            }
            ProcessingEvent::Log(message) => self.push_log(message),
            ProcessingEvent::ResultsReady(results) => self.results = Some(results),
            ProcessingEvent::MetricsReady(metrics) => self.metrics = Some(metrics),
            ProcessingEvent::Completed => {
                if !self.processing || !self.completing {
                    return false;
                }
                self.stage = Stage::Done;
                self.progress = 100;
                self.processing = false;
                self.completing = false;
                self.push_log("Processing completed successfully!");
            }
            // Also overrides a Done reached by the ticker before the request gave up
            ProcessingEvent::Failed(message) => {
                self.stage = Stage::Failed;
                self.processing = false;
                self.completing = false;
                self.push_log(format!("Error during analysis: {}", message));
                self.error = Some(message);
            }
        }

        true
    }

    /// Never moves progress backwards
    fn advance_to(&mut self, progress: u8) {
        self.progress = self.progress.max(progress).min(100);

        let stage = Stage::for_progress(self.progress);
        if stage != self.stage {
            self.stage = stage;
            self.push_log(format!("Stage: {}", stage));
        }

        self.remaining = estimate_remaining(self.progress, self.elapsed);

        if self.progress == 100 {
            self.completing = true;
        }
    }

    fn push_log(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("[run {}] {}", self.generation, message);
        self.logs
            .push(format!("[{}] {}", Local::now().format("%H:%M:%S"), message));
    }
}

impl Default for ProcessingState {
    fn default() -> Self {
        Self::new()
    }
}
