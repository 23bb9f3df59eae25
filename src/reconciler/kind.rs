//! Per-kind capability interface.
//!
//! A resource kind plugs into the generic [`super::Reconciler`] by
//! implementing [`ResourceApi`]: the remote calls it supports plus its
//! transition table. Optional capabilities default to an
//! [`ReconcileError::Unsupported`] error.

use async_trait::async_trait;
use serde::Serialize;

use crate::cloud::Operation;
use crate::error::{ConvergeError, ReconcileError, Result};
use crate::planner::Action;

/// The declared state of one resource.
pub trait DesiredResource: Send + Sync {
    /// Resource name, unique within its folder.
    fn name(&self) -> &str;

    /// Folder the resource lives in.
    fn folder_id(&self) -> &str;
}

/// A resource as observed through the API.
pub trait ObservedResource: Clone + Serialize + Send + Sync {
    /// Server-assigned id.
    fn id(&self) -> &str;
}

/// One page of a filtered list call.
#[derive(Debug, Clone)]
pub struct Page<R> {
    /// Resources on this page.
    pub items: Vec<R>,
    /// True if the server reported further pages.
    pub has_more: bool,
}

/// Remote calls and decision table of one resource kind.
#[async_trait]
pub trait ResourceApi: Send + Sync {
    /// Declared state of this kind.
    type Spec: DesiredResource;
    /// Observed state of this kind.
    type Resource: ObservedResource;

    /// Kind name used in messages ("disk", "instance").
    const KIND: &'static str;

    /// Operation metadata key naming the affected resource id.
    const ID_METADATA_KEY: &'static str;

    /// Lists resources of a folder matching a filter expression.
    async fn list(&self, folder_id: &str, filter: &str) -> Result<Page<Self::Resource>>;

    /// Fetches a resource by id.
    async fn get(&self, id: &str) -> Result<Self::Resource>;

    /// Starts creating a resource.
    async fn create(&self, spec: &Self::Spec) -> Result<Operation>;

    /// Starts deleting a resource.
    async fn delete(&self, id: &str) -> Result<Operation>;

    /// Starts updating the mutable fields of a resource.
    async fn update(&self, _id: &str, _spec: &Self::Spec) -> Result<Operation> {
        Err(unsupported::<Self>("update"))
    }

    /// Starts a stopped resource.
    async fn start(&self, _id: &str) -> Result<Operation> {
        Err(unsupported::<Self>("start"))
    }

    /// Stops a running resource.
    async fn stop(&self, _id: &str) -> Result<Operation> {
        Err(unsupported::<Self>("stop"))
    }

    /// Restarts a running resource.
    async fn restart(&self, _id: &str) -> Result<Operation> {
        Err(unsupported::<Self>("restart"))
    }

    /// Picks the action for the declared and observed state.
    fn plan(spec: &Self::Spec, observed: Option<&Self::Resource>) -> Action;

    /// Renders the change an update makes, if the kind reports diffs.
    fn diff(_spec: &Self::Spec, _observed: &Self::Resource) -> Option<String> {
        None
    }
}

fn unsupported<A: ResourceApi + ?Sized>(action: &str) -> ConvergeError {
    ConvergeError::Reconcile(ReconcileError::unsupported(A::KIND, action))
}
