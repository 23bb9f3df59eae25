//! Read-only lookups: images by family and subnets of a folder.

use tracing::debug;

use crate::error::{ConfigError, ConvergeError, Result};

use super::client::ApiClient;
use super::types::{Image, ListSubnetsResponse, Subnet};

/// Folder holding the public images.
pub const STANDARD_IMAGES_FOLDER: &str = "standard-images";

/// Image lookup.
#[derive(Debug, Clone)]
pub struct ImageService {
    client: ApiClient,
}

impl ImageService {
    /// Creates the service over a client bound to the compute endpoint.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Returns the newest image of a family.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an empty family and a transport
    /// error if the call fails.
    pub async fn latest_by_family(&self, folder_id: &str, family: &str) -> Result<Image> {
        if family.trim().is_empty() {
            return Err(ConvergeError::Config(ConfigError::validation(
                "image family cannot be empty",
                "family",
            )));
        }

        let folder_id = if folder_id.is_empty() { STANDARD_IMAGES_FOLDER } else { folder_id };
        debug!("Looking up latest image of family '{family}' in {folder_id}");

        self.client
            .get(
                "/compute/v1/images:latestByFamily",
                &[
                    ("folderId", folder_id.to_string()),
                    ("family", family.to_string()),
                ],
            )
            .await
    }
}

/// Subnet lookup.
#[derive(Debug, Clone)]
pub struct SubnetService {
    client: ApiClient,
}

impl SubnetService {
    /// Creates the service over a client bound to the VPC endpoint.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Returns every subnet of a folder, following page tokens.
    ///
    /// # Errors
    ///
    /// Returns a transport error if any page fails.
    pub async fn list(&self, folder_id: &str) -> Result<Vec<Subnet>> {
        let mut subnets = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("folderId", folder_id.to_string())];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let page: ListSubnetsResponse = self.client.get("/vpc/v1/subnets", &query).await?;
            debug!("Fetched {} subnets of {folder_id}", page.subnets.len());
            subnets.extend(page.subnets);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(subnets)
    }
}
