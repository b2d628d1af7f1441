//! In-memory transports for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use crate::data::fetch::{FetchError, HttpRequest, HttpResponse, Transport};

/// Replies with a fixed script, one entry per request.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<HttpResponse, FetchError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Result<HttpResponse, FetchError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn attempts(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
        self.requests.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Transport("script exhausted".to_string())))
    }
}

/// Answers by URL substring, optionally after a delay. With no matching
/// route the request never completes.
pub struct RoutedTransport {
    routes: Vec<(String, HttpResponse)>,
    delay: Duration,
    requests: Mutex<Vec<String>>,
}

impl RoutedTransport {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Routes are matched in insertion order.
    pub fn route(mut self, fragment: &str, status: u16, body: &str) -> Self {
        self.routes.push((
            fragment.to_string(),
            HttpResponse { status, headers: vec![], body: body.to_string() },
        ));
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for RoutedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
        self.requests.lock().unwrap().push(request.url.clone());

        let matched = self
            .routes
            .iter()
            .find(|(fragment, _)| request.url.contains(fragment.as_str()))
            .map(|(_, response)| response.clone());

        match matched {
            Some(response) => {
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                Ok(response)
            }
            None => std::future::pending().await,
        }
    }
}

pub const TIME_SERIES_JSON: &str = r#"{
    "message": "ok",
    "params": {"disorder": "Depressive disorders", "country": "global"},
    "data": [
        {"year": 2017, "value": 3.41},
        {"year": 2018, "value": 3.44},
        {"year": 2019, "value": 3.48}
    ],
    "metadata": {
        "statistics": {"mean": 3.443, "std": 0.035, "min": 3.41, "max": 3.48, "trend": "increasing"},
        "n_points": 3,
        "years_covered": [2017, 2018, 2019]
    }
}"#;

pub const FORECAST_JSON: &str = r#"{
    "message": "ok",
    "params": {"disorder": "Depressive disorders", "forecast_horizon": 2},
    "predictions": [
        {"year": 2020, "value": 3.51, "lower_bound": 3.40, "upper_bound": 3.62},
        {"year": 2021, "value": 3.55}
    ],
    "confidence_intervals": {"lower": [3.40, 3.41], "upper": [3.62, 3.69]},
    "metrics": {"rmse": 0.12, "mae": 0.09, "mape": 2.5, "aic": 10.0}
}"#;

pub const METADATA_JSON: &str = r#"{
    "disorders": ["Ansiedade", "Depressão"],
    "countries": ["Brazil"],
    "regions": ["global", "Americas"],
    "year_range": {"min": 1995, "max": 2020}
}"#;
