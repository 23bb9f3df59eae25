//! Service factory.

use reqwest::Client;
use std::sync::Arc;
use tracing::debug;

use crate::config::{Credentials, Endpoints};
use crate::error::{ConvergeError, Result, TransportError};

use super::auth::TokenSource;
use super::client::ApiClient;
use super::disk::DiskService;
use super::instance::InstanceService;
use super::lookup::{ImageService, SubnetService};
use super::operation::OperationService;
use super::retry::RetryPolicy;

/// Hands out service handles that share one retry policy and one token.
#[derive(Debug, Clone)]
pub struct CloudSdk {
    http: Client,
    endpoints: Endpoints,
    policy: Arc<RetryPolicy>,
    tokens: Arc<TokenSource>,
}

impl CloudSdk {
    /// Creates the factory. No connection is made until the first call.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(credentials: Credentials, endpoints: &Endpoints, policy: RetryPolicy) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ConvergeError::Transport(TransportError::network(
                    "client",
                    format!("Failed to create HTTP client: {e}"),
                ))
            })?;

        debug!(
            "Cloud SDK using {} credentials, compute endpoint {}",
            credentials.kind(),
            endpoints.compute
        );

        let tokens = TokenSource::new(credentials, endpoints.iam.clone(), http.clone());
        Ok(Self {
            http,
            endpoints: endpoints.clone(),
            policy: Arc::new(policy),
            tokens: Arc::new(tokens),
        })
    }

    /// Returns the retry policy shared by every client.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn client(&self, base_url: &str) -> ApiClient {
        ApiClient::new(
            self.http.clone(),
            base_url,
            Arc::clone(&self.policy),
            Arc::clone(&self.tokens),
        )
    }

    /// Disk service.
    #[must_use]
    pub fn disks(&self) -> DiskService {
        DiskService::new(self.client(&self.endpoints.compute))
    }

    /// Instance service.
    #[must_use]
    pub fn instances(&self) -> InstanceService {
        InstanceService::new(self.client(&self.endpoints.compute))
    }

    /// Operation service.
    #[must_use]
    pub fn operations(&self) -> OperationService {
        OperationService::new(self.client(&self.endpoints.operation))
    }

    /// Image lookup service.
    #[must_use]
    pub fn images(&self) -> ImageService {
        ImageService::new(self.client(&self.endpoints.compute))
    }

    /// Subnet lookup service.
    #[must_use]
    pub fn subnets(&self) -> SubnetService {
        SubnetService::new(self.client(&self.endpoints.vpc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_clients_share_policy() {
        let policy = RetryPolicy::default().with_per_call_timeout(Duration::from_secs(3));
        let sdk = CloudSdk::new(
            Credentials::IamToken(String::from("t1.test")),
            &Endpoints::default(),
            policy.clone(),
        )
        .expect("sdk");

        assert_eq!(sdk.policy(), &policy);
        assert_eq!(sdk.client(&sdk.endpoints.vpc).policy(), &policy);
        assert_eq!(
            sdk.client(&sdk.endpoints.compute).base_url(),
            "https://compute.api.cloud.yandex.net"
        );
    }
}
