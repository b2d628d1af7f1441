use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};
use crate::data::fetch::{FetchClient, FetchError, RequestOptions, Transport, DEFAULT_RETRIES};
use crate::data::translation::DisorderTranslations;
use crate::data::types::{ForecastParams, ForecastResponse, Metadata, TimeSeriesParams, TimeSeriesResponse};

pub const DEFAULT_REGION: &str = "global";
pub const DEFAULT_FORECAST_HORIZON: u32 = 5;

/// Client for the analytics backend.
///
/// Each operation is stateless. Display-language disorder labels are translated
/// to backend identifiers before they go on the wire.
pub struct ApiClient<T> {
    fetch: FetchClient<T>,
    base_url: String,
    retries: u32,
    translations: DisorderTranslations,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(fetch: FetchClient<T>, base_url: impl Into<String>, translations: DisorderTranslations) -> Self {
        Self {
            fetch,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retries: DEFAULT_RETRIES,
            translations,
        }
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        self.fetch.transport()
    }

    /// Fetch available disorders, regions and year range
    pub async fn get_metadata(&self) -> Result<Metadata, FetchError> {
        let url = format!("{}/data/metadata", self.base_url);
        info!("Fetching metadata from: {}", url);

        let metadata: Metadata = self.get_json(&url).await.map_err(|e| {
            error!("Error in get_metadata: {}", e);
            e
        })?;

        debug!(
            "Metadata received: {} disorders, {} regions",
            metadata.disorders.len(),
            metadata.regions.len()
        );
        Ok(metadata)
    }

    /// Fetch the historical series for one disorder
    pub async fn get_time_series(&self, params: &TimeSeriesParams) -> Result<TimeSeriesResponse, FetchError> {
        let query = build_query(&self.series_query(params));
        let url = format!("{}/time-series?{}", self.base_url, query);
        info!("Time series request: {}", url);

        self.get_json(&url).await.map_err(|e| {
            error!("Error in get_time_series: {} (target={})", e, params.target);
            e
        })
    }

    /// Ask the backend for a forecast over the historical series
    pub async fn get_forecast(&self, params: &ForecastParams) -> Result<ForecastResponse, FetchError> {
        let mut pairs = self.series_query(&params.series);
        let horizon = params
            .forecast_period
            .filter(|period| *period > 0)
            .unwrap_or(DEFAULT_FORECAST_HORIZON);
        let method = params.method.unwrap_or_default();
        pairs.push(("forecast_horizon", Some(horizon.to_string())));
        pairs.push(("method", Some(method.as_str().to_string())));

        let url = format!("{}/time-series/forecast?{}", self.base_url, build_query(&pairs));
        info!("Forecast request: {}", url);

        self.get_json(&url).await.map_err(|e| {
            error!("Error in get_forecast: {} (target={})", e, params.series.target);
            e
        })
    }

    fn series_query(&self, params: &TimeSeriesParams) -> Vec<(&'static str, Option<String>)> {
        let region = params
            .region
            .as_deref()
            .filter(|region| !region.is_empty())
            .unwrap_or(DEFAULT_REGION);

        vec![
            ("disorder", Some(self.translations.translate(&params.target).to_string())),
            ("country", Some(region.to_string())),
            ("year_start", params.year_start.map(|y| y.to_string())),
            ("year_end", params.year_end.map(|y| y.to_string())),
        ]
    }

    async fn get_json<R: DeserializeOwned>(&self, url: &str) -> Result<R, FetchError> {
        let response = self
            .fetch
            .fetch_with_retry(url, &RequestOptions::default(), self.retries)
            .await?;

        response.json()
    }
}

/// Join present pairs into a query string. Absent values are left out entirely.
pub fn build_query(pairs: &[(&str, Option<String>)]) -> String {
    pairs
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_ref()
                .map(|value| format!("{}={}", encode_component(key), encode_component(value)))
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// RFC 3986 unreserved characters are the only ones left as-is
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

fn encode_component(raw: &str) -> String {
    utf8_percent_encode(raw, QUERY_COMPONENT).to_string()
}
