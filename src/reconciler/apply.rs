//! Whole-manifest application.
//!
//! Resources are converged one at a time: disks that should exist, then
//! instances in declaration order, then disks that should be gone. That way
//! an instance is created after its disks and deleted before them.

use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info};

use crate::cloud::{Disk, Instance, OperationApi, WaitPolicy};
use crate::config::{DiskSpec, DiskState, InstanceSpec, InstanceState, Manifest};
use crate::error::{ConvergeError, ReconcileError, Result};

use super::engine::Reconciler;
use super::kind::ResourceApi;
use super::locator::ResourceLocator;
use super::outcome::ReconcileOutcome;

/// Outcome of one manifest entry.
#[derive(Debug, Clone, Serialize)]
pub struct AppliedResource {
    /// Resource kind.
    pub kind: &'static str,
    /// Resource name.
    pub name: String,
    /// Reconciliation outcome.
    #[serde(flatten)]
    pub outcome: ReconcileOutcome<serde_json::Value>,
}

/// Result of applying a manifest.
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Outcomes of the entries converged before any failure.
    pub applied: Vec<AppliedResource>,
    /// The error that stopped the run.
    pub failure: Option<ConvergeError>,
}

impl ApplyReport {
    /// Returns true if every entry converged.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Number of entries that changed something.
    #[must_use]
    pub fn changed_count(&self) -> usize {
        self.applied.iter().filter(|a| a.outcome.changed).count()
    }
}

/// Applies every entry of a manifest.
pub struct ManifestRunner<'a, D, I, O>
where
    D: ResourceApi<Spec = DiskSpec, Resource = Disk>,
    I: ResourceApi<Spec = InstanceSpec, Resource = Instance>,
    O: OperationApi + ?Sized,
{
    disks: &'a D,
    instances: &'a I,
    operations: &'a O,
    wait_policy: WaitPolicy,
    cancel: Option<watch::Receiver<bool>>,
}

impl<'a, D, I, O> ManifestRunner<'a, D, I, O>
where
    D: ResourceApi<Spec = DiskSpec, Resource = Disk>,
    I: ResourceApi<Spec = InstanceSpec, Resource = Instance>,
    O: OperationApi + ?Sized,
{
    /// Creates a runner over the given services.
    #[must_use]
    pub fn new(disks: &'a D, instances: &'a I, operations: &'a O) -> Self {
        Self {
            disks,
            instances,
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

    /// Applies the manifest, stopping at the first error.
    pub async fn apply(&self, manifest: &Manifest) -> ApplyReport {
        info!("Applying manifest with {} resources", manifest.resource_count());
        let mut report = ApplyReport::default();

        if let Err(e) = self.apply_all(manifest, &mut report).await {
            error!("Apply stopped: {e}");
            report.failure = Some(e);
        }

        info!(
            "Apply finished: {} converged, {} changed",
            report.applied.len(),
            report.changed_count()
        );
        report
    }

    async fn apply_all(&self, manifest: &Manifest, report: &mut ApplyReport) -> Result<()> {
        let disks = self.reconciler(self.disks);
        let instances = self.reconciler(self.instances);

        for spec in manifest.disks.iter().filter(|d| d.state == DiskState::Present) {
            let outcome = disks.reconcile(spec).await?;
            report.applied.push(applied(D::KIND, &spec.name, outcome)?);
        }

        for spec in &manifest.instances {
            let spec = self.resolve_disks(spec).await?;
            let outcome = instances.reconcile(&spec).await?;
            report.applied.push(applied(I::KIND, &spec.name, outcome)?);
        }

        for spec in manifest.disks.iter().filter(|d| d.state == DiskState::Absent) {
            let outcome = disks.reconcile(spec).await?;
            report.applied.push(applied(D::KIND, &spec.name, outcome)?);
        }

        Ok(())
    }

    fn reconciler<A: ResourceApi>(&self, api: &'a A) -> Reconciler<'a, A, O> {
        let reconciler = Reconciler::new(api, self.operations).with_wait_policy(self.wait_policy);
        match &self.cancel {
            Some(cancel) => reconciler.with_cancellation(cancel.clone()),
            None => reconciler,
        }
    }

    /// Replaces disk names of a present instance with disk ids.
    async fn resolve_disks(&self, spec: &InstanceSpec) -> Result<InstanceSpec> {
        let mut resolved = spec.clone();
        if spec.state != InstanceState::Present {
            return Ok(resolved);
        }

        let locator = ResourceLocator::new(self.disks);
        let attached = resolved
            .boot_disk
            .iter_mut()
            .chain(resolved.secondary_disks.iter_mut())
            .filter(|d| d.disk_id.is_none());

        for disk in attached {
            let Some(disk_name) = disk.disk_name.clone() else {
                continue;
            };
            let found = locator
                .find(&spec.folder_id, &disk_name)
                .await
                .map_err(|e| resolve_error(&spec.name, e))?;
            let Some(found) = found else {
                return Err(resolve_error(
                    &spec.name,
                    ConvergeError::Reconcile(ReconcileError::NotFound {
                        kind: D::KIND.to_string(),
                        name: disk_name,
                    }),
                ));
            };
            disk.disk_id = Some(found.id);
        }

        Ok(resolved)
    }
}

fn applied<R: Serialize>(
    kind: &'static str,
    name: &str,
    outcome: ReconcileOutcome<R>,
) -> Result<AppliedResource> {
    let resource = outcome
        .resource
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| ConvergeError::internal(format!("Failed to serialize {kind} '{name}': {e}")))?;

    Ok(AppliedResource {
        kind,
        name: name.to_string(),
        outcome: ReconcileOutcome {
            changed: outcome.changed,
            message: outcome.message,
            resource,
            diff: outcome.diff,
        },
    })
}

fn resolve_error(instance: &str, source: ConvergeError) -> ConvergeError {
    ConvergeError::Reconcile(ReconcileError::step("instance", instance, "resolve disks of", source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::InstanceStatus;
    use crate::reconciler::testing::{
        FakeDisks, FakeInstances, FakeOperations, disk_spec, instance_spec, observed_disk,
        observed_instance,
    };
    use std::time::Duration;

    fn fast() -> WaitPolicy {
        WaitPolicy::default().with_intervals(Duration::from_millis(1), Duration::from_millis(2))
    }

    #[tokio::test]
    async fn test_disks_before_instances_and_names_resolved() {
        let disks = FakeDisks::default();
        let instances = FakeInstances::default();
        let ops = FakeOperations::default();

        let manifest = Manifest {
            disks: vec![
                disk_spec("old-1", DiskState::Absent, 1, &[]),
                disk_spec("boot-1", DiskState::Present, 10_737_418_240, &[]),
            ],
            instances: vec![instance_spec("web-1", InstanceState::Present)],
            ..Manifest::default()
        };
        disks.insert(observed_disk("d-old", "old-1", "1"));

        let report = ManifestRunner::new(&disks, &instances, &ops)
            .with_wait_policy(fast())
            .apply(&manifest)
            .await;

        assert!(report.is_success());
        let order: Vec<_> = report.applied.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(order, ["boot-1", "web-1", "old-1"]);
        assert_eq!(report.changed_count(), 3);
        assert_eq!(disks.mutations(), ["create", "delete"]);

        let created = instances.created_specs();
        let boot = created[0].boot_disk.as_ref().expect("boot disk");
        assert_eq!(boot.disk_id.as_deref(), Some("d-0"));
    }

    #[tokio::test]
    async fn test_stops_at_first_error() {
        let disks = FakeDisks::default();
        let instances = FakeInstances::default();
        let ops = FakeOperations::default();

        let manifest = Manifest {
            disks: vec![disk_spec("boot-1", DiskState::Present, 1, &[])],
            instances: vec![
                instance_spec("web-1", InstanceState::Stopped),
                instance_spec("web-2", InstanceState::Present),
            ],
            ..Manifest::default()
        };

        let report = ManifestRunner::new(&disks, &instances, &ops)
            .with_wait_policy(fast())
            .apply(&manifest)
            .await;

        assert_eq!(report.applied.len(), 1);
        let failure = report.failure.expect("stopped instance is missing");
        assert!(failure.to_string().contains("not found instance with name 'web-1'"));
        assert!(instances.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_missing_boot_disk_named() {
        let disks = FakeDisks::default();
        let instances = FakeInstances::default();
        instances.insert(observed_instance("i-x", "other", InstanceStatus::Running));
        let ops = FakeOperations::default();

        let manifest = Manifest {
            instances: vec![instance_spec("web-1", InstanceState::Present)],
            ..Manifest::default()
        };

        let report = ManifestRunner::new(&disks, &instances, &ops).apply(&manifest).await;
        let failure = report.failure.expect("boot disk is missing");
        assert_eq!(
            failure.to_string(),
            "Reconciliation error: failed to resolve disks of instance 'web-1': \
             Reconciliation error: not found disk with name 'boot-1'"
        );
    }

    #[test]
    fn test_applied_resource_shape() {
        let outcome = ReconcileOutcome::unchanged(
            String::from("disk 'data-1' already present"),
            Some(observed_disk("d1", "data-1", "1")),
        );
        let entry = applied("disk", "data-1", outcome).expect("serializable");
        let json = serde_json::to_value(&entry).expect("serializable");

        assert_eq!(json["kind"], "disk");
        assert_eq!(json["changed"], false);
        assert_eq!(json["msg"], "disk 'data-1' already present");
        assert_eq!(json["resource"]["id"], "d1");
    }
}
