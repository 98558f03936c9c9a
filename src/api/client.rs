//! Blocking HTTP client for the typing server's REST API.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::dto::*;
use super::TypingBackend;
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    /// Base URL of the server, e.g. "http://localhost:5000"
    pub base_url: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            request_timeout_ms: 5000,
        }
    }
}

#[derive(Debug)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(config.base_url.clone()));
        }

        // the server keys users by a session cookie
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .cookie_store(true)
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `<base>/<segments...>`, escaping each segment.
    pub fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn get<T: DeserializeOwned>(&self, url: Url) -> ApiResult<T> {
        debug!(%url, "GET");
        let response = self.client.get(url).send()?;
        read_envelope(response)
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, url: Url, body: &B) -> ApiResult<T> {
        debug!(%url, "POST");
        let response = self.client.post(url).json(body).send()?;
        read_envelope(response)
    }
}

fn read_envelope<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let status = response.status();
    let body = response.text()?;

    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }

    decode_envelope(&body)
}

/// Pull the `message` out of an error body, or fall back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Decode a `{"status": "success", ...}` envelope into its payload.
pub fn decode_envelope<T: DeserializeOwned>(body: &str) -> ApiResult<T> {
    let value: Value = serde_json::from_str(body)?;

    match value.get("status").and_then(Value::as_str) {
        Some("success") => Ok(serde_json::from_value(value)?),
        _ => {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            Err(ApiError::Server(message))
        }
    }
}

impl TypingBackend for ApiClient {
    fn handshake(&self) -> ApiResult<()> {
        let url = self.base_url.clone();
        debug!(%url, "handshake");
        let response = self.client.get(url).send()?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ApiError::Status {
                status: status.as_u16(),
                message: "handshake failed".to_string(),
            })
        }
    }

    fn list_exercises(&self) -> ApiResult<ExerciseCatalog> {
        let body: ExerciseCatalogBody = self.get(self.endpoint(&["api", "exercises"])?)?;
        Ok(body.exercises)
    }

    fn exercises_for_level(&self, level: &str) -> ApiResult<Vec<Exercise>> {
        let mut url = self.endpoint(&["api", "exercises"])?;
        url.query_pairs_mut().append_pair("level", level);
        let body: ExerciseListBody = self.get(url)?;
        Ok(body.exercises)
    }

    fn fetch_exercise(&self, level: &str, exercise_id: &str) -> ApiResult<Exercise> {
        let body: ExerciseBody = self.get(self.endpoint(&["api", "exercise", level, exercise_id])?)?;
        Ok(body.exercise)
    }

    fn start_session(&self, request: &StartSessionRequest) -> ApiResult<StartedSession> {
        self.post(self.endpoint(&["api", "session", "start"])?, request)
    }

    fn submit_keystroke(
        &self,
        session_id: &str,
        request: &KeystrokeRequest,
    ) -> ApiResult<KeystrokeResponse> {
        self.post(
            self.endpoint(&["api", "session", session_id, "keystroke"])?,
            request,
        )
    }

    fn complete_session(
        &self,
        session_id: &str,
        request: &CompleteSessionRequest,
    ) -> ApiResult<CompletionAck> {
        self.post(
            self.endpoint(&["api", "session", session_id, "complete"])?,
            request,
        )
    }

    fn user_stats(&self) -> ApiResult<UserStatsReport> {
        self.get(self.endpoint(&["api", "user", "stats"])?)
    }
}
