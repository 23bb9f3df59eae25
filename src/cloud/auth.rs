//! Bearer token resolution.
//!
//! The token is resolved once per [`super::CloudSdk`] and shared by every
//! service client it hands out.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::Credentials;
use crate::error::{ConvergeError, Result, TransportError};

/// Timeout of the token exchange call.
const EXCHANGE_TIMEOUT_SECS: u64 = 10;

/// Lazily resolved bearer token.
pub struct TokenSource {
    /// Credentials the token is derived from.
    credentials: Credentials,
    /// IAM API base URL.
    iam_endpoint: String,
    /// HTTP client used for the exchange.
    http: Client,
    /// Cached bearer token.
    token: OnceCell<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateIamTokenRequest<'a> {
    yandex_passport_oauth_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateIamTokenResponse {
    iam_token: String,
}

impl TokenSource {
    /// Creates a token source. Nothing is fetched until the first call.
    #[must_use]
    pub fn new(credentials: Credentials, iam_endpoint: impl Into<String>, http: Client) -> Self {
        Self {
            credentials,
            iam_endpoint: iam_endpoint.into().trim_end_matches('/').to_string(),
            http,
            token: OnceCell::new(),
        }
    }

    /// Returns the bearer token, exchanging credentials on first use.
    ///
    /// # Errors
    ///
    /// Returns an authentication error if the exchange fails or the
    /// credential kind cannot be exchanged.
    pub async fn bearer(&self) -> Result<&str> {
        let token = self
            .token
            .get_or_try_init(|| async {
                match &self.credentials {
                    Credentials::IamToken(token) => Ok(token.clone()),
                    Credentials::OAuthToken(token) => self.exchange_oauth(token).await,
                    Credentials::ServiceAccountKey(key) => Err(authentication(format!(
                        "service account key {} cannot be exchanged here; supply an IAM or OAuth token",
                        key.id
                    ))),
                }
            })
            .await?;
        Ok(token.as_str())
    }

    async fn exchange_oauth(&self, oauth_token: &str) -> Result<String> {
        let url = format!("{}/iam/v1/tokens", self.iam_endpoint);
        info!("Exchanging OAuth token for an IAM token");

        let response = self
            .http
            .post(&url)
            .timeout(Duration::from_secs(EXCHANGE_TIMEOUT_SECS))
            .json(&CreateIamTokenRequest {
                yandex_passport_oauth_token: oauth_token,
            })
            .send()
            .await
            .map_err(|e| authentication(format!("token exchange failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(authentication(format!(
                "token exchange returned {}: {body}",
                status.as_u16()
            )));
        }

        let body: CreateIamTokenResponse = response
            .json()
            .await
            .map_err(|e| authentication(format!("malformed token response: {e}")))?;

        debug!("IAM token obtained");
        Ok(body.iam_token)
    }
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSource")
            .field("credentials", &self.credentials)
            .field("iam_endpoint", &self.iam_endpoint)
            .field("resolved", &self.token.initialized())
            .finish_non_exhaustive()
    }
}

fn authentication(message: String) -> ConvergeError {
    ConvergeError::Transport(TransportError::Authentication { message })
}
