//! Manifest specification types.
//!
//! This module defines the structs that map to the `converge.yaml` manifest.
//! Each resource entry is the full desired state for one remote resource.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use validator::Validate;

use crate::cloud::{RetryPolicy, WaitPolicy};

/// Default Yandex Cloud compute endpoint.
pub const DEFAULT_COMPUTE_ENDPOINT: &str = "https://compute.api.cloud.yandex.net";

/// Default Yandex Cloud operation endpoint.
pub const DEFAULT_OPERATION_ENDPOINT: &str = "https://operation.api.cloud.yandex.net";

/// Default Yandex Cloud IAM endpoint.
pub const DEFAULT_IAM_ENDPOINT: &str = "https://iam.api.cloud.yandex.net";

/// Default Yandex Cloud VPC endpoint.
pub const DEFAULT_VPC_ENDPOINT: &str = "https://vpc.api.cloud.yandex.net";

/// The root manifest structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Validate)]
pub struct Manifest {
    /// Values applied to every resource that leaves them unset.
    #[serde(default)]
    pub defaults: Defaults,
    /// Engine settings (retry, wait, endpoints).
    #[serde(default)]
    pub settings: Settings,
    /// Disks to converge.
    #[serde(default)]
    #[validate(nested)]
    pub disks: Vec<DiskSpec>,
    /// Instances to converge.
    #[serde(default)]
    #[validate(nested)]
    pub instances: Vec<InstanceSpec>,
}

/// Manifest-wide defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Defaults {
    /// Folder used when a resource does not name one.
    #[serde(default)]
    pub folder_id: Option<String>,
}

/// Engine settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Transport retry settings.
    #[serde(default)]
    pub retry: RetrySettings,
    /// Operation wait settings.
    #[serde(default)]
    pub wait: WaitSettings,
    /// API endpoints.
    #[serde(default)]
    pub endpoints: Endpoints,
}

/// Transport retry settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetrySettings {
    /// Additional attempts after the first one.
    #[serde(default = "default_max_retry_count")]
    pub max_retry_count: u32,
    /// Timeout of a single attempt, in seconds.
    #[serde(default = "default_per_call_timeout_secs")]
    pub per_call_timeout_secs: u64,
    /// HTTP statuses that are retried.
    #[serde(default = "default_retriable_codes")]
    pub retriable_codes: Vec<u16>,
    /// Base delay between attempts, in milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

/// Operation wait settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaitSettings {
    /// Delay before the first poll, in milliseconds.
    #[serde(default = "default_initial_interval_ms")]
    pub initial_interval_ms: u64,
    /// Upper bound of the poll interval, in milliseconds.
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
    /// Growth factor of the poll interval.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Overall wait timeout in seconds; unbounded when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Endpoints {
    /// Compute API base URL.
    #[serde(default = "default_compute_endpoint")]
    pub compute: String,
    /// Operation API base URL.
    #[serde(default = "default_operation_endpoint")]
    pub operation: String,
    /// IAM API base URL.
    #[serde(default = "default_iam_endpoint")]
    pub iam: String,
    /// VPC API base URL.
    #[serde(default = "default_vpc_endpoint")]
    pub vpc: String,
}

/// Target lifecycle of a disk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiskState {
    /// The disk exists with the declared mutable fields.
    #[default]
    Present,
    /// The disk does not exist.
    Absent,
}

/// Target lifecycle of an instance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InstanceState {
    /// The instance exists and runs.
    #[default]
    Present,
    /// The instance is restarted (or started when stopped).
    Restarted,
    /// The instance exists and is stopped.
    Stopped,
    /// The instance does not exist.
    Absent,
}

/// Disk types offered by the compute API.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DiskType {
    /// Network HDD.
    #[serde(rename = "network-hdd")]
    NetworkHdd,
    /// Network SSD.
    #[serde(rename = "network-ssd")]
    NetworkSsd,
    /// Ultra high-speed network SSD with three replicas.
    #[serde(rename = "network-ssd-io-m3")]
    NetworkSsdIoM3,
    /// Non-replicated network SSD.
    #[serde(rename = "network-ssd-nonreplicated")]
    NetworkSsdNonreplicated,
}

/// Where a new disk's contents come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiskSource {
    /// An image id.
    Image(String),
    /// A snapshot id.
    Snapshot(String),
}

/// Desired state of a disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct DiskSpec {
    /// Disk name, unique within the folder.
    #[validate(length(min = 1, max = 63))]
    pub name: String,
    /// Folder the disk lives in.
    #[serde(default)]
    pub folder_id: String,
    /// Target lifecycle.
    #[serde(default)]
    pub state: DiskState,
    /// Description.
    #[serde(default)]
    #[validate(length(max = 256))]
    pub description: String,
    /// Labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Disk type, required when present.
    #[serde(default)]
    pub type_id: Option<DiskType>,
    /// Availability zone, required when present.
    #[serde(default)]
    pub zone_id: Option<String>,
    /// Size in bytes, required when present.
    #[serde(default)]
    pub size: Option<u64>,
    /// Source image id.
    #[serde(default)]
    pub image_id: Option<String>,
    /// Source snapshot id.
    #[serde(default)]
    pub snapshot_id: Option<String>,
    /// Block size in bytes.
    #[serde(default = "default_block_size")]
    pub block_size: u32,
}

/// Desired state of an instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct InstanceSpec {
    /// Instance name, unique within the folder.
    #[validate(length(min = 1, max = 63))]
    pub name: String,
    /// Folder the instance lives in.
    #[serde(default)]
    pub folder_id: String,
    /// Target lifecycle.
    #[serde(default)]
    pub state: InstanceState,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Availability zone.
    #[serde(default)]
    pub zone_id: Option<String>,
    /// Hardware platform.
    #[serde(default = "default_platform_id")]
    pub platform_id: String,
    /// Compute resources.
    #[serde(default)]
    #[validate(nested)]
    pub resources: Option<ResourcesSpec>,
    /// Metadata key/value pairs (user-data, ssh-keys, ...).
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Metadata service access options.
    #[serde(default)]
    pub metadata_options: Option<MetadataOptionsSpec>,
    /// Boot disk attachment.
    #[serde(default)]
    pub boot_disk: Option<AttachedDiskSpec>,
    /// Secondary disk attachments.
    #[serde(default)]
    pub secondary_disks: Vec<AttachedDiskSpec>,
    /// Network interfaces.
    #[serde(default)]
    pub network_interfaces: Vec<NetworkInterfaceSpec>,
    /// Hostname.
    #[serde(default)]
    pub hostname: Option<String>,
    /// Service account attached to the instance.
    #[serde(default)]
    pub service_account_id: Option<String>,
    /// Network acceleration settings.
    #[serde(default)]
    pub network_settings: Option<NetworkSettingsSpec>,
    /// GPU cluster settings.
    #[serde(default)]
    pub gpu_settings: Option<GpuSettingsSpec>,
    /// Scheduling policy.
    #[serde(default)]
    pub scheduling_policy: Option<SchedulingPolicySpec>,
    /// Behaviour on host maintenance.
    #[serde(default)]
    pub maintenance_policy: Option<MaintenancePolicy>,
    /// Grace period before maintenance, in seconds.
    #[serde(default)]
    pub maintenance_grace_period_secs: Option<u64>,
}

/// Compute resources of an instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct ResourcesSpec {
    /// Memory in bytes.
    #[validate(range(min = 1))]
    pub memory: u64,
    /// Number of cores.
    #[validate(range(min = 1))]
    pub cores: u32,
    /// Baseline core performance, in percent.
    #[serde(default = "default_core_fraction")]
    #[validate(range(min = 1, max = 100))]
    pub core_fraction: u32,
    /// Number of GPUs.
    #[serde(default)]
    pub gpus: u32,
}

/// Metadata service access options.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct MetadataOptionsSpec {
    /// Expose the AWS-compatible v1 endpoint.
    #[serde(default = "default_true")]
    pub aws_v1_http_endpoint: bool,
    /// Expose IAM tokens on the AWS-compatible endpoint.
    #[serde(default)]
    pub aws_v1_http_token: bool,
    /// Expose the GCE-compatible endpoint.
    #[serde(default = "default_true")]
    pub gce_http_endpoint: bool,
    /// Expose IAM tokens on the GCE-compatible endpoint.
    #[serde(default = "default_true")]
    pub gce_http_token: bool,
}

/// Disk attachment mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiskMode {
    /// Read-only access.
    ReadOnly,
    /// Read/write access.
    #[default]
    ReadWrite,
}

/// A disk attached to an instance.
///
/// Exactly one of `disk_id` and `disk_name` must be set. A name is resolved
/// to an id in the instance's folder right before the instance is converged,
/// so a disk declared earlier in the same manifest can be attached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttachedDiskSpec {
    /// Access mode.
    #[serde(default)]
    pub mode: DiskMode,
    /// Device name inside the guest.
    #[serde(default)]
    pub device_name: Option<String>,
    /// Delete the disk together with the instance.
    #[serde(default)]
    pub auto_delete: Option<bool>,
    /// Id of the disk.
    #[serde(default)]
    pub disk_id: Option<String>,
    /// Name of the disk in the instance's folder.
    #[serde(default)]
    pub disk_name: Option<String>,
}

/// A network interface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkInterfaceSpec {
    /// Subnet the interface is attached to.
    pub subnet_id: String,
    /// IPv4 addressing.
    #[serde(default)]
    pub primary_v4_address: Option<PrimaryAddressSpec>,
    /// IPv6 addressing.
    #[serde(default)]
    pub primary_v6_address: Option<PrimaryAddressSpec>,
    /// Security groups.
    #[serde(default)]
    pub security_group_ids: Vec<String>,
}

/// Primary address of a network interface.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrimaryAddressSpec {
    /// Static internal address; assigned automatically when unset.
    #[serde(default)]
    pub address: Option<String>,
    /// Public NAT address.
    #[serde(default)]
    pub one_to_one_nat: Option<OneToOneNatSpec>,
    /// DNS records for the internal address.
    #[serde(default)]
    pub dns_records: Vec<DnsRecordSpec>,
}

/// One-to-one NAT configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OneToOneNatSpec {
    /// IP version of the public address.
    #[serde(default)]
    pub ip_version: IpVersion,
    /// Reserved public address; ephemeral when unset.
    #[serde(default)]
    pub address: Option<String>,
    /// DNS records for the public address.
    #[serde(default)]
    pub dns_records: Vec<DnsRecordSpec>,
}

/// IP version.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum IpVersion {
    /// IPv4.
    #[default]
    Ipv4,
    /// IPv6.
    Ipv6,
}

/// A DNS record bound to an address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DnsRecordSpec {
    /// Fully qualified domain name.
    pub fqdn: String,
    /// DNS zone; the internal zone when unset.
    #[serde(default)]
    pub dns_zone_id: Option<String>,
    /// Record TTL in seconds.
    #[serde(default)]
    pub ttl: Option<i64>,
    /// Also create a PTR record.
    #[serde(default)]
    pub ptr: Option<bool>,
}

/// Network acceleration settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct NetworkSettingsSpec {
    /// Network type.
    #[serde(default, rename = "type")]
    pub network_type: NetworkType,
}

/// Network acceleration type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NetworkType {
    /// Standard network.
    #[default]
    Standard,
    /// Software-accelerated network.
    SoftwareAccelerated,
    /// Hardware-accelerated network.
    HardwareAccelerated,
}

/// GPU cluster settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GpuSettingsSpec {
    /// GPU cluster to join.
    #[serde(default)]
    pub gpu_cluster_id: Option<String>,
}

/// Scheduling policy.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchedulingPolicySpec {
    /// Run as a preemptible instance.
    #[serde(default)]
    pub preemptible: bool,
}

/// Behaviour on host maintenance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum MaintenancePolicy {
    /// Live-migrate the instance.
    Migrate,
    /// Restart the instance.
    Restart,
}

impl DiskSpec {
    /// Returns the source of the disk contents, if any.
    #[must_use]
    pub fn source(&self) -> Option<DiskSource> {
        self.image_id
            .clone()
            .map(DiskSource::Image)
            .or_else(|| self.snapshot_id.clone().map(DiskSource::Snapshot))
    }
}

impl InstanceSpec {
    /// Iterates over every attached disk, boot disk first.
    pub fn attached_disks(&self) -> impl Iterator<Item = &AttachedDiskSpec> {
        self.boot_disk.iter().chain(self.secondary_disks.iter())
    }
}

impl Manifest {
    /// Returns the total number of declared resources.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.disks.len() + self.instances.len()
    }

    /// Returns true if any resource targets deletion.
    #[must_use]
    pub fn has_deletions(&self) -> bool {
        self.disks.iter().any(|d| d.state == DiskState::Absent)
            || self.instances.iter().any(|i| i.state == InstanceState::Absent)
    }
}

impl RetrySettings {
    /// Builds the transport retry policy.
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retry_count: self.max_retry_count,
            per_call_timeout: Duration::from_secs(self.per_call_timeout_secs),
            retriable_codes: self.retriable_codes.iter().copied().collect(),
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}

impl WaitSettings {
    /// Builds the operation wait policy.
    #[must_use]
    pub fn policy(&self) -> WaitPolicy {
        WaitPolicy {
            initial_interval: Duration::from_millis(self.initial_interval_ms),
            max_interval: Duration::from_millis(self.max_interval_ms),
            multiplier: self.multiplier,
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retry_count: default_max_retry_count(),
            per_call_timeout_secs: default_per_call_timeout_secs(),
            retriable_codes: default_retriable_codes(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            initial_interval_ms: default_initial_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
            multiplier: default_multiplier(),
            timeout_secs: None,
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            compute: default_compute_endpoint(),
            operation: default_operation_endpoint(),
            iam: default_iam_endpoint(),
            vpc: default_vpc_endpoint(),
        }
    }
}

impl std::fmt::Display for DiskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NetworkHdd => "network-hdd",
            Self::NetworkSsd => "network-ssd",
            Self::NetworkSsdIoM3 => "network-ssd-io-m3",
            Self::NetworkSsdNonreplicated => "network-ssd-nonreplicated",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for DiskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Absent => write!(f, "absent"),
        }
    }
}

impl std::fmt::Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Present => "present",
            Self::Restarted => "restarted",
            Self::Stopped => "stopped",
            Self::Absent => "absent",
        };
        write!(f, "{s}")
    }
}

const fn default_max_retry_count() -> u32 {
    3
}

const fn default_per_call_timeout_secs() -> u64 {
    10
}

fn default_retriable_codes() -> Vec<u16> {
    vec![503]
}

const fn default_retry_backoff_ms() -> u64 {
    1000
}

const fn default_initial_interval_ms() -> u64 {
    1000
}

const fn default_max_interval_ms() -> u64 {
    10_000
}

const fn default_multiplier() -> f64 {
    2.0
}

fn default_compute_endpoint() -> String {
    String::from(DEFAULT_COMPUTE_ENDPOINT)
}

fn default_operation_endpoint() -> String {
    String::from(DEFAULT_OPERATION_ENDPOINT)
}

fn default_iam_endpoint() -> String {
    String::from(DEFAULT_IAM_ENDPOINT)
}

fn default_vpc_endpoint() -> String {
    String::from(DEFAULT_VPC_ENDPOINT)
}

const fn default_block_size() -> u32 {
    4096
}

fn default_platform_id() -> String {
    String::from("standard-v3")
}

const fn default_core_fraction() -> u32 {
    100
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_source_prefers_image() {
        let yaml = r"
name: data-1
image_id: fd8abc
";
        let disk: DiskSpec = serde_yaml::from_str(yaml).expect("valid disk");
        assert_eq!(disk.source(), Some(DiskSource::Image(String::from("fd8abc"))));
        assert_eq!(disk.block_size, 4096);
        assert_eq!(disk.state, DiskState::Present);
    }

    #[test]
    fn test_disk_type_names() {
        let ty: DiskType = serde_yaml::from_str("network-ssd-io-m3").expect("valid type");
        assert_eq!(ty, DiskType::NetworkSsdIoM3);
        assert_eq!(ty.to_string(), "network-ssd-io-m3");
    }

    #[test]
    fn test_settings_defaults_build_policies() {
        let settings = Settings::default();
        let retry = settings.retry.policy();
        let wait = settings.wait.policy();

        assert_eq!(retry.max_retry_count, 3);
        assert_eq!(retry.per_call_timeout, Duration::from_secs(10));
        assert!(retry.retriable_codes.contains(&503));
        assert_eq!(wait.initial_interval, Duration::from_secs(1));
        assert!(wait.timeout.is_none());
    }
}
