use reqwest::Client;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info};

pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("API Error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

/// Per-call options. The backend is read-only, so every request is a GET.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Replace the JSON defaults by name, or add to them
    pub headers: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        serde_json::from_str(&self.body).map_err(|e| FetchError::Parse(e.to_string()))
    }
}

/// One round trip to the network. Non-2xx statuses are returned, not raised.
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse, FetchError>> + Send;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
        let mut builder = self.client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (name.to_string(), value.to_str().unwrap_or_default().to_string())
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(HttpResponse { status, headers, body })
    }
}

/// Fixed-delay retry around a [`Transport`].
///
/// Every failure is retried the same way, HTTP 4xx included, with no backoff
/// or jitter between attempts.
pub struct FetchClient<T> {
    transport: T,
    retry_delay: Duration,
}

impl<T: Transport> FetchClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send `url`, trying up to `retries + 1` times. The last error is returned
    /// once the retries run out.
    pub async fn fetch_with_retry(
        &self,
        url: &str,
        options: &RequestOptions,
        retries: u32,
    ) -> Result<HttpResponse, FetchError> {
        let mut retries_left = retries;

        loop {
            match self.attempt(url, options).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    error!("Fetch error: url={}, error={}", url, e);

                    if retries_left == 0 {
                        return Err(e);
                    }

                    info!("Retrying fetch... {} attempts remaining", retries_left);
                    tokio::time::sleep(self.retry_delay).await;
                    retries_left -= 1;
                }
            }
        }
    }

    async fn attempt(&self, url: &str, options: &RequestOptions) -> Result<HttpResponse, FetchError> {
        debug!("Fetching URL: {}", url);

        let request = HttpRequest {
            url: url.to_string(),
            headers: merge_headers(&options.headers),
        };

        let response = self.transport.send(request).await?;

        if !response.is_success() {
            error!(
                "API Error: url={}, status={}, error={}, headers={:?}",
                url, response.status, response.body, response.headers
            );
            return Err(FetchError::Status {
                status: response.status,
                body: response.body,
            });
        }

        Ok(response)
    }
}

/// JSON defaults first, caller headers replace them by name.
fn merge_headers(overrides: &[(String, String)]) -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = vec![
        ("Content-Type".to_string(), "application/json".to_string()),
        ("Accept".to_string(), "application/json".to_string()),
    ];

    for (name, value) in overrides {
        match headers.iter_mut().find(|(existing, _)| existing.eq_ignore_ascii_case(name)) {
            Some(slot) => slot.1 = value.clone(),
            None => headers.push((name.clone(), value.clone())),
        }
    }

    headers
}
