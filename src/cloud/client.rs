//! Retrying HTTP client for the cloud REST APIs.
//!
//! Every service handle owns one [`ApiClient`] bound to its endpoint. All
//! clients created by the same [`super::CloudSdk`] share the retry policy and
//! the bearer token.

use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::error::{ConvergeError, Result, TransportError};

use super::auth::TokenSource;
use super::retry::{RetryPolicy, UNAVAILABLE};

/// Header carrying the per-call request id.
const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Header carrying the idempotency key of mutating calls.
const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// HTTP client bound to one API endpoint.
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// Underlying HTTP client; connects lazily on first request.
    http: Client,
    /// Endpoint base URL without a trailing slash.
    base_url: String,
    /// Retry policy shared with sibling clients.
    policy: Arc<RetryPolicy>,
    /// Bearer token shared with sibling clients.
    tokens: Arc<TokenSource>,
}

/// Outcome of a single failed attempt.
enum AttemptError {
    /// The attempt may be repeated.
    Retriable(String),
    /// The call must stop here.
    Fatal(ConvergeError),
}

/// Error body returned by the REST gateway.
#[derive(serde::Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl ApiClient {
    /// Creates a client for the given endpoint.
    #[must_use]
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        policy: Arc<RetryPolicy>,
        tokens: Arc<TokenSource>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            policy,
            tokens,
        }
    }

    /// Returns the endpoint base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the retry policy.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Issues a GET request.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the call fails after retries.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        self.execute(Method::GET, path, query, None).await
    }

    /// Issues a POST request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the call fails after retries.
    pub async fn post<B: Serialize + Sync, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let body = encode(path, body)?;
        self.execute(Method::POST, path, &[], Some(body)).await
    }

    /// Issues a PATCH request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the call fails after retries.
    pub async fn patch<B: Serialize + Sync, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let body = encode(path, body)?;
        self.execute(Method::PATCH, path, &[], Some(body)).await
    }

    /// Issues a DELETE request.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the call fails after retries.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute(Method::DELETE, path, &[], None).await
    }

    /// Runs one logical call under the retry policy.
    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        let target = format!("{method} {path}");
        let request_id = Uuid::new_v4().to_string();
        let attempts = self.policy.max_attempts();
        let mut last_error = String::new();

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.policy.backoff(attempt);
                debug!("Retry attempt {attempt} of {} for {target} in {delay:?}", self.policy.max_retry_count);
                tokio::time::sleep(delay).await;
            }

            match self
                .execute_once(&method, path, query, body.as_ref(), &request_id, &target)
                .await
            {
                Ok(result) => return Ok(result),
                Err(AttemptError::Retriable(message)) => {
                    warn!("{target} attempt {} failed: {message}", attempt + 1);
                    last_error = message;
                }
                Err(AttemptError::Fatal(e)) => return Err(e),
            }
        }

        Err(ConvergeError::Transport(TransportError::RetriesExhausted {
            target,
            attempts,
            last_error,
        }))
    }

    /// Executes a single attempt.
    async fn execute_once<T: DeserializeOwned>(
        &self,
        method: &Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
        request_id: &str,
        target: &str,
    ) -> std::result::Result<T, AttemptError> {
        let token = self.tokens.bearer().await.map_err(AttemptError::Fatal)?;
        let url = format!("{}{path}", self.base_url);
        trace!("{target} -> {url} (request id {request_id})");

        let mut request = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(token)
            .header(REQUEST_ID_HEADER, request_id)
            .timeout(self.policy.per_call_timeout);

        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.header(IDEMPOTENCY_KEY_HEADER, request_id).json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Err(AttemptError::Fatal(ConvergeError::Transport(TransportError::Timeout {
                    target: target.to_string(),
                    timeout_ms: self.policy.per_call_timeout.as_millis(),
                })));
            }
            Err(e) if e.is_connect() && self.policy.is_retriable(UNAVAILABLE) => {
                return Err(AttemptError::Retriable(format!("connection failed: {e}")));
            }
            Err(e) => {
                return Err(AttemptError::Fatal(ConvergeError::Transport(
                    TransportError::network(target, format!("Request failed: {e}")),
                )));
            }
        };

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            AttemptError::Fatal(ConvergeError::Transport(TransportError::network(
                target,
                format!("Failed to read response: {e}"),
            )))
        })?;

        if !status.is_success() {
            let message = error_message(&text);
            if self.policy.is_retriable(status.as_u16()) {
                return Err(AttemptError::Retriable(format!("status {}: {message}", status.as_u16())));
            }
            if status == StatusCode::UNAUTHORIZED {
                return Err(AttemptError::Fatal(ConvergeError::Transport(
                    TransportError::Authentication { message },
                )));
            }
            return Err(AttemptError::Fatal(ConvergeError::Transport(TransportError::status(
                target,
                status.as_u16(),
                message,
            ))));
        }

        let text = if text.trim().is_empty() { "{}" } else { text.as_str() };
        serde_json::from_str(text).map_err(|e| {
            AttemptError::Fatal(ConvergeError::Transport(TransportError::invalid_response(
                target,
                format!("Failed to parse response: {e}"),
            )))
        })
    }
}

fn encode<B: Serialize>(path: &str, body: &B) -> Result<serde_json::Value> {
    serde_json::to_value(body).map_err(|e| {
        ConvergeError::internal(format!("Failed to encode request body for {path}: {e}"))
    })
}

/// Extracts the message of a gateway error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use std::time::Duration;
    use wiremock::matchers::{header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, max_retry_count: u32) -> ApiClient {
        let http = Client::new();
        let policy = RetryPolicy::default()
            .with_max_retry_count(max_retry_count)
            .with_retry_backoff(Duration::from_millis(1));
        let tokens = TokenSource::new(
            Credentials::IamToken(String::from("t1.test")),
            server.uri(),
            http.clone(),
        );
        ApiClient::new(http, server.uri(), Arc::new(policy), Arc::new(tokens))
    }

    #[tokio::test]
    async fn test_sends_bearer_and_request_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/compute/v1/disks"))
            .and(query_param("folderId", "b1g"))
            .and(header("authorization", "Bearer t1.test"))
            .and(header_exists("x-request-id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"disks": []})))
            .expect(1)
            .mount(&server)
            .await;

        let body: serde_json::Value = client(&server, 3)
            .get("/compute/v1/disks", &[("folderId", String::from("b1g"))])
            .await
            .expect("call should succeed");
        assert_eq!(body["disks"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_unavailable_retried_until_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/compute/v1/disks/d1"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "code": 14,
                "message": "backend unavailable"
            })))
            .expect(3)
            .mount(&server)
            .await;

        let err = client(&server, 2)
            .get::<serde_json::Value>("/compute/v1/disks/d1", &[])
            .await
            .unwrap_err();

        match err {
            ConvergeError::Transport(TransportError::RetriesExhausted { attempts, last_error, .. }) => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("backend unavailable"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_retry_then_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/compute/v1/disks/d1"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/compute/v1/disks/d1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "d1"})))
            .mount(&server)
            .await;

        let body: serde_json::Value = client(&server, 3)
            .get("/compute/v1/disks/d1", &[])
            .await
            .expect("second attempt should succeed");
        assert_eq!(body["id"], "d1");
    }

    #[tokio::test]
    async fn test_bad_request_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/compute/v1/disks"))
            .and(header_exists("idempotency-key"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "code": 3,
                "message": "invalid zone"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server, 3)
            .post::<_, serde_json::Value>("/compute/v1/disks", &serde_json::json!({"name": "x"}))
            .await
            .unwrap_err();

        match err {
            ConvergeError::Transport(TransportError::Status { status, message, .. }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "invalid zone");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_counts_as_unavailable() {
        let http = Client::new();
        let policy = RetryPolicy::default()
            .with_max_retry_count(1)
            .with_retry_backoff(Duration::from_millis(1));
        let tokens = TokenSource::new(
            Credentials::IamToken(String::from("t1.test")),
            "http://127.0.0.1:9",
            http.clone(),
        );
        let client = ApiClient::new(http, "http://127.0.0.1:9", Arc::new(policy), Arc::new(tokens));

        let err = client
            .get::<serde_json::Value>("/compute/v1/disks", &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConvergeError::Transport(TransportError::RetriesExhausted { attempts: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_slow_attempt_times_out_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/compute/v1/disks/d1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "d1"}))
                    .set_delay(Duration::from_millis(500)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let http = Client::new();
        let policy = RetryPolicy::default()
            .with_max_retry_count(3)
            .with_per_call_timeout(Duration::from_millis(50))
            .with_retry_backoff(Duration::from_millis(1));
        let tokens = TokenSource::new(
            Credentials::IamToken(String::from("t1.test")),
            server.uri(),
            http.clone(),
        );
        let client = ApiClient::new(http, server.uri(), Arc::new(policy), Arc::new(tokens));

        let err = client
            .get::<serde_json::Value>("/compute/v1/disks/d1", &[])
            .await
            .unwrap_err();

        match &err {
            ConvergeError::Transport(TransportError::Timeout { timeout_ms, .. }) => {
                assert_eq!(*timeout_ms, 50);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().ends_with("timed out after 50ms"));

        let received = server.received_requests().await.expect("recording enabled");
        assert_eq!(received.len(), 1);
    }

    #[test]
    fn test_error_message_fallback() {
        assert_eq!(error_message(r#"{"code":5,"message":"not found"}"#), "not found");
        assert_eq!(error_message("plain failure\n"), "plain failure");
    }
}
