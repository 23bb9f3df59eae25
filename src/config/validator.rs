//! Manifest validation.
//!
//! Per-field rules come from the `validator` derive on the spec types; this
//! module adds the cross-field rules (required-if, mutual exclusion, choice
//! lists, name syntax, duplicates) before anything reaches the API.

use crate::error::{ConfigError, ConvergeError, Result};
use std::collections::HashSet;
use tracing::debug;
use validator::Validate;

use super::spec::{
    AttachedDiskSpec, DiskSpec, DiskState, InstanceSpec, InstanceState, Manifest, Settings,
};

/// Block sizes accepted by the compute API.
const BLOCK_SIZES: &[u32] = &[4096, 8192, 16384, 32768, 65536, 131_072];

/// Platforms accepted for instances.
const KNOWN_PLATFORMS: &[&str] = &[
    "standard-v1",
    "standard-v2",
    "standard-v3",
    "highfreq-v3",
    "gpu-standard-v1",
    "gpu-standard-v2",
    "gpu-standard-v3",
    "standard-v3-t4",
];

/// Maximum number of labels per resource.
const MAX_LABELS: usize = 64;

/// Largest accepted growth factor of the operation poll interval.
const MAX_POLL_MULTIPLIER: f64 = 10.0;

/// Validator for manifests.
#[derive(Debug, Default)]
pub struct ConfigValidator {
    /// Known valid platforms.
    known_platforms: HashSet<String>,
}

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationIssue>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation problem.
#[derive(Debug)]
pub struct ValidationIssue {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator with the default platform list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            known_platforms: KNOWN_PLATFORMS.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Adds a platform to the known list.
    pub fn add_platform(&mut self, platform: impl Into<String>) {
        self.known_platforms.insert(platform.into());
    }

    /// Validates a manifest.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any rule fails.
    pub fn validate(&self, manifest: &Manifest) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        if let Err(errors) = manifest.validate() {
            result.errors.push(ValidationIssue {
                field: String::from("manifest"),
                message: errors.to_string().replace('\n', "; "),
            });
        }

        Self::validate_settings(&manifest.settings, &mut result);

        let mut seen = HashSet::new();
        for (i, disk) in manifest.disks.iter().enumerate() {
            Self::validate_disk(i, disk, &mut result);
            if !seen.insert(("disk", disk.folder_id.as_str(), disk.name.as_str())) {
                return Err(ConvergeError::Config(ConfigError::DuplicateName {
                    kind: String::from("disk"),
                    folder_id: disk.folder_id.clone(),
                    name: disk.name.clone(),
                }));
            }
        }
        for (i, instance) in manifest.instances.iter().enumerate() {
            self.validate_instance(i, instance, &mut result);
            if !seen.insert(("instance", instance.folder_id.as_str(), instance.name.as_str())) {
                return Err(ConvergeError::Config(ConfigError::DuplicateName {
                    kind: String::from("instance"),
                    folder_id: instance.folder_id.clone(),
                    name: instance.name.clone(),
                }));
            }
        }

        if manifest.resource_count() == 0 {
            result
                .warnings
                .push(String::from("Manifest declares no resources"));
        }

        if result.errors.is_empty() {
            debug!("Manifest validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(ConvergeError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }))
        }
    }

    /// Validates engine settings.
    fn validate_settings(settings: &Settings, result: &mut ValidationResult) {
        if settings.retry.per_call_timeout_secs == 0 {
            result.push("settings.retry.per_call_timeout_secs", "Per-call timeout must be positive");
        }

        for code in &settings.retry.retriable_codes {
            if !(100..=599).contains(code) {
                result.push(
                    "settings.retry.retriable_codes",
                    format!("{code} is not an HTTP status code"),
                );
            }
        }

        let multiplier = settings.wait.multiplier;
        if !multiplier.is_finite() || !(1.0..=MAX_POLL_MULTIPLIER).contains(&multiplier) {
            result.push(
                "settings.wait.multiplier",
                format!("Poll multiplier must be between 1.0 and {MAX_POLL_MULTIPLIER}"),
            );
        }

        if settings.wait.initial_interval_ms == 0 {
            result.push("settings.wait.initial_interval_ms", "Poll interval must be positive");
        }

        if settings.wait.initial_interval_ms > settings.wait.max_interval_ms {
            result.push(
                "settings.wait.max_interval_ms",
                "Maximum poll interval must not be below the initial interval",
            );
        }
    }

    /// Validates a single disk.
    fn validate_disk(index: usize, disk: &DiskSpec, result: &mut ValidationResult) {
        let prefix = format!("disks[{index}]");

        Self::validate_identity(&prefix, &disk.name, &disk.folder_id, result);
        Self::validate_labels(&prefix, disk.labels.len(), result);

        if disk.state == DiskState::Present {
            if disk.type_id.is_none() {
                result.push(format!("{prefix}.type_id"), format!("Disk '{}' needs type_id when present", disk.name));
            }
            if disk.zone_id.as_deref().is_none_or(str::is_empty) {
                result.push(format!("{prefix}.zone_id"), format!("Disk '{}' needs zone_id when present", disk.name));
            }
            match disk.size {
                None => result.push(format!("{prefix}.size"), format!("Disk '{}' needs size when present", disk.name)),
                Some(0) => result.push(format!("{prefix}.size"), "Disk size must be positive"),
                Some(_) => {}
            }
        }

        if disk.image_id.is_some() && disk.snapshot_id.is_some() {
            result.push(
                format!("{prefix}.image_id"),
                "image_id and snapshot_id are mutually exclusive",
            );
        }

        if !BLOCK_SIZES.contains(&disk.block_size) {
            result.push(
                format!("{prefix}.block_size"),
                format!("Block size {} is not one of {BLOCK_SIZES:?}", disk.block_size),
            );
        }
    }

    /// Validates a single instance.
    fn validate_instance(&self, index: usize, instance: &InstanceSpec, result: &mut ValidationResult) {
        let prefix = format!("instances[{index}]");

        Self::validate_identity(&prefix, &instance.name, &instance.folder_id, result);
        Self::validate_labels(&prefix, instance.labels.len(), result);

        if !self.known_platforms.contains(&instance.platform_id) {
            result.push(
                format!("{prefix}.platform_id"),
                format!("Unknown platform '{}'", instance.platform_id),
            );
        }

        if instance.state == InstanceState::Present {
            if instance.zone_id.as_deref().is_none_or(str::is_empty) {
                result.push(format!("{prefix}.zone_id"), format!("Instance '{}' needs zone_id when present", instance.name));
            }
            if instance.resources.is_none() {
                result.push(format!("{prefix}.resources"), format!("Instance '{}' needs resources when present", instance.name));
            }
            if instance.boot_disk.is_none() {
                result.push(format!("{prefix}.boot_disk"), format!("Instance '{}' needs boot_disk when present", instance.name));
            }
            if instance.network_interfaces.is_empty() {
                result.push(
                    format!("{prefix}.network_interfaces"),
                    format!("Instance '{}' needs at least one network interface when present", instance.name),
                );
            }
        }

        for (i, disk) in instance.attached_disks().enumerate() {
            Self::validate_attached_disk(&format!("{prefix}.disks[{i}]"), disk, result);
        }

        for (i, nic) in instance.network_interfaces.iter().enumerate() {
            if nic.subnet_id.is_empty() {
                result.push(format!("{prefix}.network_interfaces[{i}].subnet_id"), "Subnet id cannot be empty");
            }
        }

        if instance.maintenance_grace_period_secs.is_some() && instance.maintenance_policy.is_none() {
            result.warnings.push(format!(
                "{prefix}: maintenance_grace_period_secs has no effect without maintenance_policy"
            ));
        }
    }

    /// Validates that exactly one disk reference is set.
    fn validate_attached_disk(field: &str, disk: &AttachedDiskSpec, result: &mut ValidationResult) {
        match (&disk.disk_id, &disk.disk_name) {
            (Some(_), Some(_)) => result.push(field, "disk_id and disk_name are mutually exclusive"),
            (None, None) => result.push(field, "one of disk_id or disk_name is required"),
            _ => {}
        }
    }

    /// Validates name syntax and folder presence.
    fn validate_identity(prefix: &str, name: &str, folder_id: &str, result: &mut ValidationResult) {
        if !is_valid_name(name) {
            result.push(
                format!("{prefix}.name"),
                format!(
                    "Name '{name}' is invalid. Must start with a letter and contain lowercase letters, digits and hyphens."
                ),
            );
        }

        if folder_id.is_empty() {
            result.push(
                format!("{prefix}.folder_id"),
                format!("'{name}' has no folder_id and no defaults.folder_id is set"),
            );
        }
    }

    /// Validates the label count.
    fn validate_labels(prefix: &str, count: usize, result: &mut ValidationResult) {
        if count > MAX_LABELS {
            result.push(
                format!("{prefix}.labels"),
                format!("At most {MAX_LABELS} labels are allowed, found {count}"),
            );
        }
    }
}

impl ValidationResult {
    /// Records an error.
    fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Returns true if validation passed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Checks a resource name: 1-63 characters, a leading lowercase letter,
/// then lowercase letters, digits or hyphens, not ending with a hyphen.
fn is_valid_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    let (Some(first), Some(last)) = (bytes.first(), bytes.last()) else {
        return false;
    };

    name.len() <= 63
        && first.is_ascii_lowercase()
        && *last != b'-'
        && bytes
            .iter()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == b'-')
}
