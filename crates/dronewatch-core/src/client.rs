//! Detection backend client
//!
//! [`RemoteClient`] is the seam between the sync engine and the network. The
//! production implementation, [`HttpRemoteClient`], performs exactly one HTTP
//! round trip per call and normalizes every failure into [`RemoteError`]. No
//! retries and no timeout beyond reqwest's defaults: callers decide what to do
//! with a failure.

use std::future::Future;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::RemoteError;
use crate::models::{
    EventRecord, EventsPayload, LatestResult, LogTail, SettingsResponse, WorkerStatus,
};

/// Default backend address
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Backend accepts between 10 and 500 log lines
const LOG_LINES_RANGE: (u32, u32) = (10, 500);

/// Typed access to the detection backend
pub trait RemoteClient: Send + Sync + 'static {
    /// `GET /latest`
    fn fetch_latest(&self) -> impl Future<Output = Result<LatestResult, RemoteError>> + Send;

    /// `GET /events?limit=<limit>`, newest first
    fn fetch_events(
        &self,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<EventRecord>, RemoteError>> + Send;

    /// `POST /start`
    fn start(&self) -> impl Future<Output = Result<WorkerStatus, RemoteError>> + Send;

    /// `POST /stop`
    fn stop(&self) -> impl Future<Output = Result<WorkerStatus, RemoteError>> + Send;

    /// `POST /settings`, returns the threshold the backend now enforces
    fn apply_setting(
        &self,
        threshold: f64,
    ) -> impl Future<Output = Result<f64, RemoteError>> + Send;

    /// `GET /logs?lines=<lines>`
    fn fetch_logs(&self, lines: u32) -> impl Future<Output = Result<LogTail, RemoteError>> + Send;
}

/// reqwest-backed client
#[derive(Debug, Clone)]
pub struct HttpRemoteClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpRemoteClient {
    /// Create a client for the backend at `base_url`
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Backend address without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, RemoteError> {
        debug!("GET {}{}", self.base_url, path);
        let response = self.http.get(self.url(path)).query(query).send().await?;
        read_response(path, response).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, RemoteError> {
        debug!("POST {}{}", self.base_url, path);
        let mut request = self.http.post(self.url(path));
        if let Some(body) = body {
            // .json() also sets Content-Type: application/json
            request = request.json(&body);
        }
        let response = request.send().await?;
        read_response(path, response).await
    }
}

impl RemoteClient for HttpRemoteClient {
    async fn fetch_latest(&self) -> Result<LatestResult, RemoteError> {
        self.get("/latest", &[]).await
    }

    async fn fetch_events(&self, limit: u32) -> Result<Vec<EventRecord>, RemoteError> {
        let payload: EventsPayload = self.get("/events", &[("limit", limit.to_string())]).await?;
        Ok(payload.into_events())
    }

    async fn start(&self) -> Result<WorkerStatus, RemoteError> {
        self.post("/start", None).await
    }

    async fn stop(&self) -> Result<WorkerStatus, RemoteError> {
        self.post("/stop", None).await
    }

    async fn apply_setting(&self, threshold: f64) -> Result<f64, RemoteError> {
        let body = serde_json::json!({ "threshold": threshold });
        let response: SettingsResponse = self.post("/settings", Some(body)).await?;
        Ok(response.threshold)
    }

    async fn fetch_logs(&self, lines: u32) -> Result<LogTail, RemoteError> {
        let lines = lines.clamp(LOG_LINES_RANGE.0, LOG_LINES_RANGE.1);
        self.get("/logs", &[("lines", lines.to_string())]).await
    }
}

async fn read_response<T: DeserializeOwned>(
    path: &str,
    response: reqwest::Response,
) -> Result<T, RemoteError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let err = RemoteError::from_response(status.as_u16(), &text);
        warn!("{} answered {}: {}", path, status, err);
        return Err(err);
    }

    parse_body(&text)
}

/// Parse a success body, surfacing the raw text if it is not what we expect
fn parse_body<T: DeserializeOwned>(text: &str) -> Result<T, RemoteError> {
    if text.trim().is_empty() {
        return Err(RemoteError::Parse {
            detail: "empty response body".to_string(),
        });
    }

    serde_json::from_str(text).map_err(|e| {
        debug!("Response is not valid JSON for the expected type: {}", e);
        RemoteError::Parse {
            detail: text.to_string(),
        }
    })
}
