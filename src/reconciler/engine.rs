//! Reconciler state machine.
//!
//! One call converges one resource: locate it by name, pick an action from
//! the kind's transition table, perform it, wait for the operation and read
//! the result back. Any failing step aborts the call; nothing is rolled back.

use tokio::sync::watch;
use tracing::{debug, info};

use crate::cloud::{Operation, OperationApi, OperationWaiter, WaitPolicy};
use crate::error::{ConvergeError, OperationError, ReconcileError, Result};
use crate::planner::Action;

use super::kind::{DesiredResource, ObservedResource, ResourceApi};
use super::locator::ResourceLocator;
use super::outcome::ReconcileOutcome;

/// Generic reconciler for any resource kind.
pub struct Reconciler<'a, A: ResourceApi, O: OperationApi + ?Sized> {
    /// Resource service.
    api: &'a A,
    /// Operation service.
    operations: &'a O,
    /// Poll schedule of operation waits.
    wait_policy: WaitPolicy,
    /// Cancellation signal of operation waits.
    cancel: Option<watch::Receiver<bool>>,
}

impl<'a, A: ResourceApi, O: OperationApi + ?Sized> Reconciler<'a, A, O> {
    /// Creates a new reconciler.
    #[must_use]
    pub fn new(api: &'a A, operations: &'a O) -> Self {
        Self {
            api,
            operations,
            wait_policy: WaitPolicy::default(),
            cancel: None,
        }
    }

    /// Sets the operation poll schedule.
    #[must_use]
    pub const fn with_wait_policy(mut self, policy: WaitPolicy) -> Self {
        self.wait_policy = policy;
        self
    }

    /// Aborts operation waits once the receiver observes `true`.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Converges one resource toward its declared state.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::NotFound`] if the target needs an existing
    /// resource and there is none, and [`ReconcileError::Step`] wrapping the
    /// first failing lookup, call, wait or read.
    pub async fn reconcile(&self, spec: &A::Spec) -> Result<ReconcileOutcome<A::Resource>> {
        let name = spec.name();
        info!("Reconciling {} '{name}' in {}", A::KIND, spec.folder_id());

        let observed = ResourceLocator::new(self.api)
            .find(spec.folder_id(), name)
            .await
            .map_err(|e| Self::step_error(name, "find", e))?;

        let action = A::plan(spec, observed.as_ref());
        debug!("{} '{name}': {action}", A::KIND);

        let outcome = match (action, observed) {
            (Action::Nothing(converged), observed) => {
                ReconcileOutcome::unchanged(Self::message(name, converged.describe()), observed)
            }
            (Action::RejectMissing, _) => {
                return Err(ConvergeError::Reconcile(ReconcileError::NotFound {
                    kind: A::KIND.to_string(),
                    name: name.to_string(),
                }));
            }
            (Action::Create, _) => {
                let operation = self
                    .api
                    .create(spec)
                    .await
                    .map_err(|e| Self::step_error(name, action.verb(), e))?;
                let id = operation.resource_id(A::ID_METADATA_KEY).map(str::to_string);
                let finished = self.wait(name, operation).await?;
                let id = finished
                    .resource_id(A::ID_METADATA_KEY)
                    .map(str::to_string)
                    .or(id)
                    .ok_or_else(|| {
                        Self::step_error(
                            name,
                            "wait for",
                            ConvergeError::Operation(OperationError::MissingResourceId {
                                operation_id: finished.id.clone(),
                                key: A::ID_METADATA_KEY.to_string(),
                            }),
                        )
                    })?;
                let resource = self.fetch(name, &id).await?;
                ReconcileOutcome::changed(Self::message(name, action.past_tense()), Some(resource))
            }
            (Action::Delete, Some(existing)) => {
                let operation = self
                    .api
                    .delete(existing.id())
                    .await
                    .map_err(|e| Self::step_error(name, action.verb(), e))?;
                self.wait(name, operation).await?;
                ReconcileOutcome::changed(Self::message(name, action.past_tense()), None)
            }
            (Action::Update, Some(existing)) => {
                let diff = A::diff(spec, &existing);
                let operation = self
                    .api
                    .update(existing.id(), spec)
                    .await
                    .map_err(|e| Self::step_error(name, action.verb(), e))?;
                self.wait(name, operation).await?;
                let resource = self.fetch(name, existing.id()).await?;
                ReconcileOutcome::changed(Self::message(name, action.past_tense()), Some(resource))
                    .with_diff(diff)
            }
            (Action::Start | Action::Stop | Action::Restart, Some(existing)) => {
                let id = existing.id();
                let operation = match action {
                    Action::Start => self.api.start(id).await,
                    Action::Stop => self.api.stop(id).await,
                    _ => self.api.restart(id).await,
                }
                .map_err(|e| Self::step_error(name, action.verb(), e))?;
                self.wait(name, operation).await?;
                let resource = self.fetch(name, id).await?;
                ReconcileOutcome::changed(Self::message(name, action.past_tense()), Some(resource))
            }
            (_, None) => {
                return Err(ConvergeError::internal(format!(
                    "{action} planned for {} '{name}' without an observed resource",
                    A::KIND
                )));
            }
        };

        info!("{}", outcome.message);
        Ok(outcome)
    }

    async fn wait(&self, name: &str, operation: Operation) -> Result<Operation> {
        let mut waiter = OperationWaiter::new(self.operations).with_policy(self.wait_policy);
        if let Some(cancel) = &self.cancel {
            waiter = waiter.with_cancellation(cancel.clone());
        }
        waiter
            .wait(operation)
            .await
            .map_err(|e| Self::step_error(name, "wait for", e))
    }

    async fn fetch(&self, name: &str, id: &str) -> Result<A::Resource> {
        self.api
            .get(id)
            .await
            .map_err(|e| Self::step_error(name, "fetch", e))
    }

    fn message(name: &str, what: &str) -> String {
        format!("{} '{name}' {what}", A::KIND)
    }

    fn step_error(name: &str, step: &str, source: ConvergeError) -> ConvergeError {
        ConvergeError::Reconcile(ReconcileError::step(A::KIND, name, step, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::InstanceStatus;
    use crate::config::{DiskState, InstanceState};
    use crate::reconciler::testing::{
        FakeDisks, FakeInstances, FakeOperations, disk_spec, instance_spec, observed_disk,
        observed_instance,
    };
    use std::time::Duration;

    fn fast() -> WaitPolicy {
        WaitPolicy::default().with_intervals(Duration::from_millis(1), Duration::from_millis(2))
    }

    #[tokio::test]
    async fn test_create_then_idempotent() {
        let disks = FakeDisks::default();
        let ops = FakeOperations::default();
        let reconciler = Reconciler::new(&disks, &ops).with_wait_policy(fast());
        let spec = disk_spec("data-1", DiskState::Present, 20_000_000_000, &[("env", "prod")]);

        let first = reconciler.reconcile(&spec).await.expect("create");
        assert!(first.changed);
        assert_eq!(first.message, "disk 'data-1' created");
        let created = first.resource.expect("created disk");
        assert_eq!(created.size, "20000000000");
        assert_eq!(ops.polls(), 1);

        let second = reconciler.reconcile(&spec).await.expect("no-op");
        assert!(!second.changed);
        assert_eq!(second.message, "disk 'data-1' already present");
        assert_eq!(second.resource.map(|d| d.id), Some(created.id));
        assert_eq!(disks.mutations(), ["create"]);
    }

    #[tokio::test]
    async fn test_update_reports_diff() {
        let disks = FakeDisks::default();
        disks.insert(observed_disk("d1", "data-1", "20000000000"));
        let ops = FakeOperations::default();
        let spec = disk_spec("data-1", DiskState::Present, 30_000_000_000, &[]);

        let outcome = Reconciler::new(&disks, &ops)
            .with_wait_policy(fast())
            .reconcile(&spec)
            .await
            .expect("update");

        assert!(outcome.changed);
        assert_eq!(outcome.message, "disk 'data-1' updated");
        let diff = outcome.diff.expect("diff");
        assert!(diff.contains("+   \"size\": \"30000000000\""));
        assert_eq!(outcome.resource.map(|d| d.size), Some(String::from("30000000000")));
    }

    #[tokio::test]
    async fn test_delete_and_absent() {
        let disks = FakeDisks::default();
        disks.insert(observed_disk("d1", "data-1", "1"));
        let ops = FakeOperations::default();
        let reconciler = Reconciler::new(&disks, &ops).with_wait_policy(fast());
        let spec = disk_spec("data-1", DiskState::Absent, 1, &[]);

        let deleted = reconciler.reconcile(&spec).await.expect("delete");
        assert!(deleted.changed);
        assert!(deleted.resource.is_none());

        let absent = reconciler.reconcile(&spec).await.expect("no-op");
        assert!(!absent.changed);
        assert_eq!(absent.message, "disk 'data-1' does not exist");
    }

    #[tokio::test]
    async fn test_failed_operation_names_resource() {
        let disks = FakeDisks::default();
        let ops = FakeOperations::failing(8, "quota exceeded");
        let spec = disk_spec("data-1", DiskState::Present, 1, &[]);

        let err = Reconciler::new(&disks, &ops)
            .with_wait_policy(fast())
            .reconcile(&spec)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("failed to wait for disk 'data-1'"));
        assert!(matches!(
            err.root_cause(),
            ConvergeError::Operation(OperationError::Failed { code: 8, .. })
        ));
    }

    #[tokio::test]
    async fn test_restart_missing_instance_is_not_found() {
        let instances = FakeInstances::default();
        let ops = FakeOperations::default();
        let spec = instance_spec("web-1", InstanceState::Restarted);

        let err = Reconciler::new(&instances, &ops)
            .reconcile(&spec)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Reconciliation error: not found instance with name 'web-1'"
        );
        assert!(instances.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_restarted_stopped_instance_is_started() {
        let instances = FakeInstances::default();
        instances.insert(observed_instance("i1", "web-1", InstanceStatus::Stopped));
        let ops = FakeOperations::default();
        let spec = instance_spec("web-1", InstanceState::Restarted);

        let outcome = Reconciler::new(&instances, &ops)
            .with_wait_policy(fast())
            .reconcile(&spec)
            .await
            .expect("start");

        assert_eq!(outcome.message, "instance 'web-1' started");
        assert_eq!(instances.mutations(), ["start"]);
        assert_eq!(
            outcome.resource.map(|i| i.status),
            Some(InstanceStatus::Running)
        );
    }

    #[tokio::test]
    async fn test_stopped_instance_not_stopped_again() {
        let instances = FakeInstances::default();
        instances.insert(observed_instance("i1", "web-1", InstanceStatus::Stopped));
        let ops = FakeOperations::default();
        let spec = instance_spec("web-1", InstanceState::Stopped);

        let outcome = Reconciler::new(&instances, &ops)
            .reconcile(&spec)
            .await
            .expect("no-op");

        assert!(!outcome.changed);
        assert_eq!(outcome.message, "instance 'web-1' already stopped");
        assert!(instances.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_running_instance_stopped() {
        let instances = FakeInstances::default();
        instances.insert(observed_instance("i1", "web-1", InstanceStatus::Running));
        let ops = FakeOperations::default();
        let spec = instance_spec("web-1", InstanceState::Stopped);

        let outcome = Reconciler::new(&instances, &ops)
            .with_wait_policy(fast())
            .reconcile(&spec)
            .await
            .expect("stop");

        assert!(outcome.changed);
        assert_eq!(instances.mutations(), ["stop"]);
    }

    #[tokio::test]
    async fn test_cancelled_wait() {
        let disks = FakeDisks::default();
        let ops = FakeOperations::default();
        let (tx, rx) = watch::channel(true);
        let spec = disk_spec("data-1", DiskState::Present, 1, &[]);

        let err = Reconciler::new(&disks, &ops)
            .with_cancellation(rx)
            .reconcile(&spec)
            .await
            .unwrap_err();
        drop(tx);

        assert!(matches!(
            err.root_cause(),
            ConvergeError::Operation(OperationError::Cancelled { .. })
        ));
    }
}
