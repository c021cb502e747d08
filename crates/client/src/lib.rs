//! HTTP client for the taskrelay API.
//!
//! Wraps task submission and result retrieval using [`reqwest`], and runs
//! the result poller over HTTP via [`TaskClient::wait_for_result`].

use async_trait::async_trait;
use serde::Deserialize;
use taskrelay_core::correlation::{CorrelationContext, REQUEST_ID_HEADER, TRACEPARENT_HEADER};
use taskrelay_core::poll::{poll, PollError, PollPolicy, ResultSource};
use taskrelay_core::result::ResultRecord;
use taskrelay_core::task::TaskKind;
use taskrelay_core::types::TaskId;

/// Errors from the client layer.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request itself failed (network, DNS, TLS, decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API returned a non-2xx status code.
    #[error("API error ({status}, {code}): {message}")]
    Api {
        status: u16,
        /// Machine-readable code from the error body, e.g. `QUEUE_UNAVAILABLE`.
        code: String,
        message: String,
    },
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    task_id: TaskId,
}

/// Error body produced by the API.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    code: String,
}

/// HTTP client for one taskrelay API deployment.
#[derive(Debug, Clone)]
pub struct TaskClient {
    client: reqwest::Client,
    base_url: String,
}

impl TaskClient {
    /// * `base_url` - e.g. `http://localhost:8000` (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Reuse an existing [`reqwest::Client`] (shared connection pool).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Submit a task and return its id.
    ///
    /// The payload is sent as a JSON string. Correlation values, when
    /// present, are forwarded as `traceparent` / `x-request-id` headers.
    pub async fn submit(
        &self,
        kind: TaskKind,
        payload: &str,
        correlation: &CorrelationContext,
    ) -> Result<TaskId, ClientError> {
        let mut request = self
            .client
            .post(format!("{}{}", self.base_url, kind.route_path()))
            .json(payload);

        if let Some(trace_parent) = &correlation.trace_parent {
            request = request.header(TRACEPARENT_HEADER, trace_parent);
        }
        if let Some(request_id) = &correlation.request_id {
            request = request.header(REQUEST_ID_HEADER, request_id);
        }

        let response: SubmitResponse = Self::parse_response(request.send().await?).await?;
        tracing::debug!(task_id = %response.task_id, task_kind = %kind, "Task submitted");
        Ok(response.task_id)
    }

    /// Read the current result for `id` (`pending` until recorded).
    pub async fn fetch_result(&self, id: &TaskId) -> Result<ResultRecord, ClientError> {
        let response = self
            .client
            .get(format!("{}/result/{id}", self.base_url))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Poll until `id` is terminal or `policy` runs out.
    pub async fn wait_for_result(
        &self,
        id: &TaskId,
        policy: &PollPolicy,
    ) -> Result<ResultRecord, PollError<ClientError>> {
        poll(self, id, policy).await
    }

    /// Decode a successful JSON body, or turn an error status into
    /// [`ClientError::Api`].
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(parsed) => (parsed.code, parsed.error),
            Err(_) => ("UNKNOWN".to_string(), body),
        };
        Err(ClientError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }
}

#[async_trait]
impl ResultSource for TaskClient {
    type Error = ClientError;

    async fn fetch(&self, id: &TaskId) -> Result<ResultRecord, Self::Error> {
        self.fetch_result(id).await
    }
}
