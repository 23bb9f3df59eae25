//! Instance service of the compute API.

use async_trait::async_trait;
use tracing::info;

use crate::config::InstanceSpec;
use crate::error::Result;
use crate::planner::{Action, plan_instance};
use crate::reconciler::{DesiredResource, ObservedResource, Page, ResourceApi};

use super::client::ApiClient;
use super::types::{CreateInstanceRequest, Instance, ListInstancesResponse, Operation};

const INSTANCES_PATH: &str = "/compute/v1/instances";

/// Instance service.
#[derive(Debug, Clone)]
pub struct InstanceService {
    client: ApiClient,
}

impl InstanceService {
    /// Creates the service over a client bound to the compute endpoint.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    async fn power(&self, id: &str, verb: &str) -> Result<Operation> {
        info!("Instance {id}: {verb}");
        self.client
            .post(&format!("{INSTANCES_PATH}/{id}:{verb}"), &serde_json::json!({}))
            .await
    }
}

impl DesiredResource for InstanceSpec {
    fn name(&self) -> &str {
        &self.name
    }

    fn folder_id(&self) -> &str {
        &self.folder_id
    }
}

impl ObservedResource for Instance {
    fn id(&self) -> &str {
        &self.id
    }
}

#[async_trait]
impl ResourceApi for InstanceService {
    type Spec = InstanceSpec;
    type Resource = Instance;

    const KIND: &'static str = "instance";
    const ID_METADATA_KEY: &'static str = "instanceId";

    async fn list(&self, folder_id: &str, filter: &str) -> Result<Page<Instance>> {
        let response: ListInstancesResponse = self
            .client
            .get(
                INSTANCES_PATH,
                &[
                    ("folderId", folder_id.to_string()),
                    ("filter", filter.to_string()),
                    ("orderBy", String::from("name asc")),
                ],
            )
            .await?;

        Ok(Page {
            has_more: response.next_page_token.is_some_and(|t| !t.is_empty()),
            items: response.instances,
        })
    }

    async fn get(&self, id: &str) -> Result<Instance> {
        self.client
            .get(&format!("{INSTANCES_PATH}/{id}"), &[("view", String::from("FULL"))])
            .await
    }

    async fn create(&self, spec: &InstanceSpec) -> Result<Operation> {
        let request = CreateInstanceRequest::try_from(spec)?;
        info!(
            "Creating instance '{}' on {} in {}",
            spec.name, request.platform_id, request.zone_id
        );
        self.client.post(INSTANCES_PATH, &request).await
    }

    async fn delete(&self, id: &str) -> Result<Operation> {
        info!("Deleting instance {id}");
        self.client.delete(&format!("{INSTANCES_PATH}/{id}")).await
    }

    async fn start(&self, id: &str) -> Result<Operation> {
        self.power(id, "start").await
    }

    async fn stop(&self, id: &str) -> Result<Operation> {
        self.power(id, "stop").await
    }

    async fn restart(&self, id: &str) -> Result<Operation> {
        self.power(id, "restart").await
    }

    fn plan(spec: &InstanceSpec, observed: Option<&Instance>) -> Action {
        plan_instance(spec.state, observed.map(|i| i.status))
    }
}
