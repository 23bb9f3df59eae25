//! Transition tables of the reconciler.
//!
//! Given a target lifecycle and what was observed, each table picks exactly
//! one [`Action`]. The tables are pure; the engine performs the calls.

use tracing::debug;

use crate::cloud::{Disk, InstanceStatus};
use crate::config::{DiskSpec, DiskState, InstanceState};

use super::diff::DiffEngine;

/// What the reconciler does for one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Create the resource.
    Create,
    /// Update the mutable fields.
    Update,
    /// Start a stopped instance.
    Start,
    /// Stop an instance.
    Stop,
    /// Restart an instance.
    Restart,
    /// Delete the resource.
    Delete,
    /// Nothing to do; the resource already matches.
    Nothing(Converged),
    /// The target needs an existing resource and there is none.
    RejectMissing,
}

/// Why no call is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Converged {
    /// Exists with the declared fields.
    Present,
    /// Exists and runs.
    Running,
    /// Exists and is stopped.
    Stopped,
    /// Does not exist.
    Absent,
}

impl Action {
    /// Returns true if the action issues a mutating call.
    #[must_use]
    pub const fn is_change(self) -> bool {
        !matches!(self, Self::Nothing(_) | Self::RejectMissing)
    }

    /// Verb used in error messages ("failed to create ...").
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Delete => "delete",
            Self::Nothing(_) | Self::RejectMissing => "inspect",
        }
    }

    /// Past tense used in outcome messages ("disk 'x' created").
    #[must_use]
    pub const fn past_tense(self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Update => "updated",
            Self::Start => "started",
            Self::Stop => "stopped",
            Self::Restart => "restarted",
            Self::Delete => "deleted",
            Self::Nothing(converged) => converged.describe(),
            Self::RejectMissing => "not found",
        }
    }
}

impl Converged {
    /// Phrase used in outcome messages.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Present => "already present",
            Self::Running => "already running",
            Self::Stopped => "already stopped",
            Self::Absent => "does not exist",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nothing(converged) => write!(f, "none ({})", converged.describe()),
            Self::RejectMissing => write!(f, "reject"),
            other => write!(f, "{}", other.verb()),
        }
    }
}

/// Picks the action for a disk.
#[must_use]
pub fn plan_disk(spec: &DiskSpec, observed: Option<&Disk>) -> Action {
    let action = match (spec.state, observed) {
        (DiskState::Present, None) => Action::Create,
        (DiskState::Present, Some(disk)) => {
            if DiffEngine::new().needs_update(spec, disk) {
                Action::Update
            } else {
                Action::Nothing(Converged::Present)
            }
        }
        (DiskState::Absent, None) => Action::Nothing(Converged::Absent),
        (DiskState::Absent, Some(_)) => Action::Delete,
    };
    debug!("Disk '{}' target {}: {action}", spec.name, spec.state);
    action
}

/// Picks the action for an instance from its target and observed status.
#[must_use]
pub fn plan_instance(target: InstanceState, observed: Option<InstanceStatus>) -> Action {
    let action = match (target, observed) {
        (InstanceState::Present, None) => Action::Create,
        (InstanceState::Present, Some(InstanceStatus::Stopped)) => Action::Start,
        (InstanceState::Present, Some(_)) => Action::Nothing(Converged::Running),
        (InstanceState::Restarted | InstanceState::Stopped, None) => Action::RejectMissing,
        (InstanceState::Restarted, Some(InstanceStatus::Stopped)) => Action::Start,
        (InstanceState::Restarted, Some(_)) => Action::Restart,
        (InstanceState::Stopped, Some(InstanceStatus::Stopped)) => Action::Nothing(Converged::Stopped),
        (InstanceState::Stopped, Some(_)) => Action::Stop,
        (InstanceState::Absent, None) => Action::Nothing(Converged::Absent),
        (InstanceState::Absent, Some(_)) => Action::Delete,
    };
    debug!("Instance target {target}, observed {observed:?}: {action}");
    action
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk_spec(state: DiskState) -> DiskSpec {
        let mut spec: DiskSpec = serde_yaml::from_str("name: data-1\nfolder_id: b1g\n").expect("valid disk");
        spec.state = state;
        spec.size = Some(20_000_000_000);
        spec
    }

    fn observed_disk(size: &str) -> Disk {
        Disk {
            id: String::from("d1"),
            size: size.to_string(),
            ..Disk::default()
        }
    }

    #[test]
    fn test_disk_table() {
        let present = disk_spec(DiskState::Present);
        let absent = disk_spec(DiskState::Absent);
        let same = observed_disk("20000000000");
        let smaller = observed_disk("10000000000");

        assert_eq!(plan_disk(&present, None), Action::Create);
        assert_eq!(plan_disk(&present, Some(&same)), Action::Nothing(Converged::Present));
        assert_eq!(plan_disk(&present, Some(&smaller)), Action::Update);
        assert_eq!(plan_disk(&absent, None), Action::Nothing(Converged::Absent));
        assert_eq!(plan_disk(&absent, Some(&same)), Action::Delete);
    }

    #[test]
    fn test_instance_present() {
        assert_eq!(plan_instance(InstanceState::Present, None), Action::Create);
        assert_eq!(
            plan_instance(InstanceState::Present, Some(InstanceStatus::Stopped)),
            Action::Start
        );
        assert_eq!(
            plan_instance(InstanceState::Present, Some(InstanceStatus::Running)),
            Action::Nothing(Converged::Running)
        );
        assert_eq!(
            plan_instance(InstanceState::Present, Some(InstanceStatus::Provisioning)),
            Action::Nothing(Converged::Running)
        );
    }

    #[test]
    fn test_instance_restarted() {
        assert_eq!(plan_instance(InstanceState::Restarted, None), Action::RejectMissing);
        assert_eq!(
            plan_instance(InstanceState::Restarted, Some(InstanceStatus::Stopped)),
            Action::Start
        );
        assert_eq!(
            plan_instance(InstanceState::Restarted, Some(InstanceStatus::Running)),
            Action::Restart
        );
    }

    #[test]
    fn test_instance_stopped_is_idempotent() {
        assert_eq!(plan_instance(InstanceState::Stopped, None), Action::RejectMissing);
        let action = plan_instance(InstanceState::Stopped, Some(InstanceStatus::Stopped));
        assert_eq!(action, Action::Nothing(Converged::Stopped));
        assert!(!action.is_change());
        assert_eq!(
            plan_instance(InstanceState::Stopped, Some(InstanceStatus::Running)),
            Action::Stop
        );
    }

    #[test]
    fn test_instance_absent() {
        assert_eq!(
            plan_instance(InstanceState::Absent, None),
            Action::Nothing(Converged::Absent)
        );
        assert_eq!(
            plan_instance(InstanceState::Absent, Some(InstanceStatus::Error)),
            Action::Delete
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(Action::Create.past_tense(), "created");
        assert_eq!(Action::Nothing(Converged::Absent).past_tense(), "does not exist");
        assert_eq!(Action::Restart.verb(), "restart");
    }
}
