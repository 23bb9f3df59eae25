//! Disk service of the compute API.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::DiskSpec;
use crate::error::Result;
use crate::planner::{Action, DiffEngine, plan_disk};
use crate::reconciler::{DesiredResource, ObservedResource, Page, ResourceApi};

use super::client::ApiClient;
use super::types::{CreateDiskRequest, Disk, ListDisksResponse, Operation, UpdateDiskRequest};

const DISKS_PATH: &str = "/compute/v1/disks";

/// Disks are looked up one at a time; a non-empty second page means a duplicate name.
const LIST_PAGE_SIZE: u32 = 1;

/// Disk service.
#[derive(Debug, Clone)]
pub struct DiskService {
    client: ApiClient,
}

impl DiskService {
    /// Creates the service over a client bound to the compute endpoint.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

impl DesiredResource for DiskSpec {
    fn name(&self) -> &str {
        &self.name
    }

    fn folder_id(&self) -> &str {
        &self.folder_id
    }
}

impl ObservedResource for Disk {
    fn id(&self) -> &str {
        &self.id
    }
}

#[async_trait]
impl ResourceApi for DiskService {
    type Spec = DiskSpec;
    type Resource = Disk;

    const KIND: &'static str = "disk";
    const ID_METADATA_KEY: &'static str = "diskId";

    /// Lists disks one per page.
    ///
    /// A `nextPageToken` alone does not prove a second match, since the
    /// gateway may hand one out whenever a page is full. The next page is
    /// fetched and only a non-empty one sets `has_more`.
    async fn list(&self, folder_id: &str, filter: &str) -> Result<Page<Disk>> {
        let mut query = vec![
            ("folderId", folder_id.to_string()),
            ("filter", filter.to_string()),
            ("pageSize", LIST_PAGE_SIZE.to_string()),
        ];
        let response: ListDisksResponse = self.client.get(DISKS_PATH, &query).await?;

        let has_more = match response.next_page_token.filter(|t| !t.is_empty()) {
            Some(token) => {
                query.push(("pageToken", token));
                let next: ListDisksResponse = self.client.get(DISKS_PATH, &query).await?;
                debug!("Next disk page holds {} matches", next.disks.len());
                !next.disks.is_empty()
            }
            None => false,
        };

        Ok(Page {
            has_more,
            items: response.disks,
        })
    }

    async fn get(&self, id: &str) -> Result<Disk> {
        self.client.get(&format!("{DISKS_PATH}/{id}"), &[]).await
    }

    async fn create(&self, spec: &DiskSpec) -> Result<Operation> {
        let request = CreateDiskRequest::try_from(spec)?;
        info!(
            "Creating disk '{}' ({} bytes, {}) in {}",
            spec.name, request.size, request.type_id, request.zone_id
        );
        self.client.post(DISKS_PATH, &request).await
    }

    async fn update(&self, id: &str, spec: &DiskSpec) -> Result<Operation> {
        let request = UpdateDiskRequest::try_from(spec)?;
        info!("Updating disk '{}' ({id})", spec.name);
        self.client.patch(&format!("{DISKS_PATH}/{id}"), &request).await
    }

    async fn delete(&self, id: &str) -> Result<Operation> {
        info!("Deleting disk {id}");
        self.client.delete(&format!("{DISKS_PATH}/{id}")).await
    }

    fn plan(spec: &DiskSpec, observed: Option<&Disk>) -> Action {
        plan_disk(spec, observed)
    }

    fn diff(spec: &DiskSpec, observed: &Disk) -> Option<String> {
        let rendered = DiffEngine::new().render(spec, observed);
        debug!("Disk '{}' diff has {} lines", spec.name, rendered.lines().count());
        Some(rendered).filter(|d| !d.is_empty())
    }
}
