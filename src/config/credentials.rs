//! Credential resolution.
//!
//! Exactly one of an IAM token, an OAuth token or a service account key must
//! be supplied. The resolved value is an opaque capability handed to the
//! client; nothing else in the crate looks inside it.

use serde::Deserialize;
use std::path::Path;
use tracing::debug;

use crate::error::{ConfigError, ConvergeError, Result};

/// Environment variable holding an IAM token.
pub const ENV_IAM_TOKEN: &str = "YC_IAM_TOKEN";

/// Environment variable holding an OAuth token.
pub const ENV_OAUTH_TOKEN: &str = "YC_OAUTH_TOKEN";

/// Environment variable holding the path to a service account key file.
pub const ENV_SERVICE_ACCOUNT_KEY_FILE: &str = "YC_SERVICE_ACCOUNT_KEY_FILE";

/// Credentials used to obtain a bearer token.
#[derive(Clone)]
pub enum Credentials {
    /// A short-lived IAM token, used as is.
    IamToken(String),
    /// A Yandex Passport OAuth token, exchanged for an IAM token.
    OAuthToken(String),
    /// An authorized key of a service account.
    ServiceAccountKey(ServiceAccountKey),
}

/// Authorized key of a service account, as downloaded from the console.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    /// Key id.
    pub id: String,
    /// Service account the key belongs to.
    pub service_account_id: String,
    /// PEM-encoded private key.
    pub private_key: String,
    /// Key algorithm.
    #[serde(default)]
    pub key_algorithm: Option<String>,
}

impl Credentials {
    /// Resolves credentials from the three mutually exclusive sources.
    ///
    /// # Errors
    ///
    /// Returns an error if none or more than one source is set. A service
    /// account key is read and checked, then rejected: signing its JWT is not
    /// supported, so it could never produce a bearer token.
    pub fn resolve(
        iam_token: Option<String>,
        oauth_token: Option<String>,
        service_account_key_file: Option<&Path>,
    ) -> Result<Self> {
        let iam_token = iam_token.filter(|t| !t.trim().is_empty());
        let oauth_token = oauth_token.filter(|t| !t.trim().is_empty());

        let supplied = usize::from(iam_token.is_some())
            + usize::from(oauth_token.is_some())
            + usize::from(service_account_key_file.is_some());

        if supplied == 0 {
            return Err(ConvergeError::Config(ConfigError::credentials(format!(
                "one of {ENV_IAM_TOKEN}, {ENV_OAUTH_TOKEN} or {ENV_SERVICE_ACCOUNT_KEY_FILE} is required"
            ))));
        }
        if supplied > 1 {
            return Err(ConvergeError::Config(ConfigError::credentials(
                "IAM token, OAuth token and service account key are mutually exclusive",
            )));
        }

        if let Some(token) = iam_token {
            debug!("Using IAM token credentials");
            return Ok(Self::IamToken(token));
        }
        if let Some(token) = oauth_token {
            debug!("Using OAuth token credentials");
            return Ok(Self::OAuthToken(token));
        }

        let Some(path) = service_account_key_file else {
            return Err(ConvergeError::internal("credential source disappeared"));
        };
        let key = Self::load_service_account_key(path)?;
        Err(ConvergeError::Config(ConfigError::credentials(format!(
            "service account key {} of {} cannot be exchanged for an IAM token; \
             supply {ENV_IAM_TOKEN} or {ENV_OAUTH_TOKEN} instead",
            key.id, key.service_account_id
        ))))
    }

    /// Resolves credentials from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`Credentials::resolve`].
    pub fn from_env() -> Result<Self> {
        let key_file = std::env::var(ENV_SERVICE_ACCOUNT_KEY_FILE).ok();
        Self::resolve(
            std::env::var(ENV_IAM_TOKEN).ok(),
            std::env::var(ENV_OAUTH_TOKEN).ok(),
            key_file.as_deref().map(Path::new),
        )
    }

    /// Returns a short name of the credential kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::IamToken(_) => "iam-token",
            Self::OAuthToken(_) => "oauth-token",
            Self::ServiceAccountKey(_) => "service-account-key",
        }
    }

    fn load_service_account_key(path: &Path) -> Result<ServiceAccountKey> {
        debug!("Loading service account key from: {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|e| {
            ConvergeError::Config(ConfigError::credentials(format!(
                "cannot read service account key {}: {e}",
                path.display()
            )))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            ConvergeError::Config(ConfigError::credentials(format!(
                "malformed service account key {}: {e}",
                path.display()
            )))
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ServiceAccountKey(key) => f
                .debug_struct("ServiceAccountKey")
                .field("id", &key.id)
                .field("service_account_id", &key.service_account_id)
                .finish_non_exhaustive(),
            other => write!(f, "{}(<redacted>)", other.kind()),
        }
    }
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("id", &self.id)
            .field("service_account_id", &self.service_account_id)
            .finish_non_exhaustive()
    }
}
