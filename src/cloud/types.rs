//! Wire types of the compute, operation and VPC REST APIs.
//!
//! 64-bit integers travel as decimal strings in the REST gateway's JSON and
//! are kept that way on observed resources.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{
    AttachedDiskSpec, DiskSpec, DnsRecordSpec, InstanceSpec, MetadataOptionsSpec,
    NetworkInterfaceSpec, PrimaryAddressSpec,
};
use crate::error::{ConfigError, ConvergeError, Result};

// ============================================================================
// Operations
// ============================================================================

/// A long-running operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Operation identifier.
    pub id: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time.
    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,
    /// Whether the operation has finished. Never reverts once true.
    #[serde(default)]
    pub done: bool,
    /// Service-specific metadata, naming the affected resource.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    /// Failure payload of a finished operation.
    #[serde(default)]
    pub error: Option<OperationFailure>,
    /// Result payload of a finished operation.
    #[serde(default)]
    pub response: Option<serde_json::Value>,
}

/// Failure payload of an operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationFailure {
    /// Status code.
    #[serde(default)]
    pub code: i32,
    /// Error message.
    #[serde(default)]
    pub message: String,
}

impl Operation {
    /// Returns the resource id stored under `key` in the metadata.
    #[must_use]
    pub fn resource_id(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(key))
            .and_then(serde_json::Value::as_str)
            .filter(|id| !id.is_empty())
    }
}

// ============================================================================
// Disks
// ============================================================================

/// Status of a disk.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiskStatus {
    /// Being created.
    Creating,
    /// Ready to use.
    Ready,
    /// Failed.
    Error,
    /// Being deleted.
    Deleting,
    /// Any other value.
    #[default]
    #[serde(other)]
    Unknown,
}

/// A disk as returned by the API.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Disk {
    /// Disk id.
    pub id: String,
    /// Folder id.
    #[serde(default)]
    pub folder_id: String,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Name.
    #[serde(default)]
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Disk type.
    #[serde(default)]
    pub type_id: String,
    /// Availability zone.
    #[serde(default)]
    pub zone_id: String,
    /// Size in bytes, as a decimal string.
    #[serde(default)]
    pub size: String,
    /// Block size in bytes, as a decimal string.
    #[serde(default)]
    pub block_size: String,
    /// Current status.
    #[serde(default)]
    pub status: DiskStatus,
    /// Source image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_image_id: Option<String>,
    /// Source snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_snapshot_id: Option<String>,
    /// Instances the disk is attached to.
    #[serde(default)]
    pub instance_ids: Vec<String>,
}

/// A page of disks.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDisksResponse {
    /// Disks on this page.
    #[serde(default)]
    pub disks: Vec<Disk>,
    /// Token of the next page.
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Body of a disk create call.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateDiskRequest {
    /// Folder id.
    pub folder_id: String,
    /// Name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Labels.
    pub labels: BTreeMap<String, String>,
    /// Disk type.
    pub type_id: String,
    /// Availability zone.
    pub zone_id: String,
    /// Size in bytes.
    pub size: String,
    /// Block size in bytes.
    pub block_size: String,
    /// Source image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    /// Source snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
}

impl TryFrom<&DiskSpec> for CreateDiskRequest {
    type Error = ConvergeError;

    fn try_from(spec: &DiskSpec) -> Result<Self> {
        let type_id = spec
            .type_id
            .ok_or_else(|| missing(&spec.name, "type_id"))?;
        let zone_id = spec
            .zone_id
            .clone()
            .ok_or_else(|| missing(&spec.name, "zone_id"))?;
        let size = spec.size.ok_or_else(|| missing(&spec.name, "size"))?;

        Ok(Self {
            folder_id: spec.folder_id.clone(),
            name: spec.name.clone(),
            description: spec.description.clone(),
            labels: spec.labels.clone(),
            type_id: type_id.to_string(),
            zone_id,
            size: size.to_string(),
            block_size: spec.block_size.to_string(),
            image_id: spec.image_id.clone(),
            snapshot_id: spec.snapshot_id.clone(),
        })
    }
}

/// Field mask of a disk update.
pub const DISK_UPDATE_MASK: &str = "size,description,labels";

/// Body of a disk update call.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDiskRequest {
    /// Fields to update.
    pub update_mask: String,
    /// New description.
    pub description: String,
    /// New labels.
    pub labels: BTreeMap<String, String>,
    /// New size in bytes.
    pub size: String,
}

impl TryFrom<&DiskSpec> for UpdateDiskRequest {
    type Error = ConvergeError;

    fn try_from(spec: &DiskSpec) -> Result<Self> {
        let size = spec.size.ok_or_else(|| missing(&spec.name, "size"))?;
        Ok(Self {
            update_mask: String::from(DISK_UPDATE_MASK),
            description: spec.description.clone(),
            labels: spec.labels.clone(),
            size: size.to_string(),
        })
    }
}

// ============================================================================
// Instances
// ============================================================================

/// Status of an instance.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    /// Resources are being allocated.
    Provisioning,
    /// Running.
    Running,
    /// Being stopped.
    Stopping,
    /// Stopped.
    Stopped,
    /// Being started.
    Starting,
    /// Being restarted.
    Restarting,
    /// Being updated.
    Updating,
    /// Failed.
    Error,
    /// Crashed and will be restarted.
    Crashed,
    /// Being deleted.
    Deleting,
    /// Any other value.
    #[default]
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Provisioning => "PROVISIONING",
            Self::Running => "RUNNING",
            Self::Stopping => "STOPPING",
            Self::Stopped => "STOPPED",
            Self::Starting => "STARTING",
            Self::Restarting => "RESTARTING",
            Self::Updating => "UPDATING",
            Self::Error => "ERROR",
            Self::Crashed => "CRASHED",
            Self::Deleting => "DELETING",
            Self::Unknown => "UNKNOWN",
        };
        write!(f, "{s}")
    }
}

/// An instance as returned by the API.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    /// Instance id.
    pub id: String,
    /// Folder id.
    #[serde(default)]
    pub folder_id: String,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Name.
    #[serde(default)]
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Availability zone.
    #[serde(default)]
    pub zone_id: String,
    /// Hardware platform.
    #[serde(default)]
    pub platform_id: String,
    /// Allocated resources.
    #[serde(default)]
    pub resources: Option<InstanceResources>,
    /// Current status.
    #[serde(default)]
    pub status: InstanceStatus,
    /// Metadata key/value pairs.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Boot disk.
    #[serde(default)]
    pub boot_disk: Option<AttachedDisk>,
    /// Secondary disks.
    #[serde(default)]
    pub secondary_disks: Vec<AttachedDisk>,
    /// Network interfaces.
    #[serde(default)]
    pub network_interfaces: Vec<NetworkInterface>,
    /// Fully qualified domain name.
    #[serde(default)]
    pub fqdn: String,
    /// Service account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_id: Option<String>,
}

/// Resources allocated to an instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceResources {
    /// Memory in bytes.
    #[serde(default)]
    pub memory: String,
    /// Number of cores.
    #[serde(default)]
    pub cores: String,
    /// Baseline core performance, in percent.
    #[serde(default)]
    pub core_fraction: String,
    /// Number of GPUs.
    #[serde(default)]
    pub gpus: String,
}

/// A disk attached to an instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AttachedDisk {
    /// Access mode.
    #[serde(default)]
    pub mode: String,
    /// Device name.
    #[serde(default)]
    pub device_name: String,
    /// Deleted together with the instance.
    #[serde(default)]
    pub auto_delete: bool,
    /// Disk id.
    #[serde(default)]
    pub disk_id: String,
}

/// A network interface of an instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    /// Interface index.
    #[serde(default)]
    pub index: String,
    /// MAC address.
    #[serde(default)]
    pub mac_address: String,
    /// Subnet id.
    #[serde(default)]
    pub subnet_id: String,
    /// IPv4 address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_v4_address: Option<PrimaryAddress>,
    /// IPv6 address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_v6_address: Option<PrimaryAddress>,
    /// Security groups.
    #[serde(default)]
    pub security_group_ids: Vec<String>,
}

/// An assigned address.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryAddress {
    /// Internal address.
    #[serde(default)]
    pub address: String,
    /// Public NAT address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_to_one_nat: Option<OneToOneNat>,
}

/// An assigned public NAT address.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OneToOneNat {
    /// Public address.
    #[serde(default)]
    pub address: String,
    /// IP version.
    #[serde(default)]
    pub ip_version: String,
}

/// A page of instances.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInstancesResponse {
    /// Instances on this page.
    #[serde(default)]
    pub instances: Vec<Instance>,
    /// Token of the next page.
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Body of an instance create call.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstanceRequest {
    /// Folder id.
    pub folder_id: String,
    /// Name.
    pub name: String,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Labels.
    pub labels: BTreeMap<String, String>,
    /// Availability zone.
    pub zone_id: String,
    /// Hardware platform.
    pub platform_id: String,
    /// Compute resources.
    pub resources_spec: ResourcesBody,
    /// Metadata key/value pairs.
    pub metadata: BTreeMap<String, String>,
    /// Metadata service options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_options: Option<MetadataOptionsBody>,
    /// Boot disk.
    pub boot_disk_spec: AttachedDiskBody,
    /// Secondary disks.
    pub secondary_disk_specs: Vec<AttachedDiskBody>,
    /// Network interfaces.
    pub network_interface_specs: Vec<NetworkInterfaceBody>,
    /// Hostname.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// Scheduling policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduling_policy: Option<SchedulingPolicyBody>,
    /// Service account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_account_id: Option<String>,
    /// Network acceleration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_settings: Option<NetworkSettingsBody>,
    /// GPU cluster settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu_settings: Option<GpuSettingsBody>,
    /// Maintenance policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_policy: Option<String>,
    /// Maintenance grace period as a protobuf duration string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_grace_period: Option<String>,
}

/// Compute resources of a create call.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesBody {
    /// Memory in bytes.
    pub memory: String,
    /// Number of cores.
    pub cores: String,
    /// Baseline core performance, in percent.
    pub core_fraction: String,
    /// Number of GPUs.
    pub gpus: String,
}

/// Metadata service options of a create call.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MetadataOptionsBody {
    /// AWS-compatible v1 endpoint.
    pub aws_v1_http_endpoint: &'static str,
    /// IAM tokens on the AWS-compatible endpoint.
    pub aws_v1_http_token: &'static str,
    /// GCE-compatible endpoint.
    pub gce_http_endpoint: &'static str,
    /// IAM tokens on the GCE-compatible endpoint.
    pub gce_http_token: &'static str,
}

/// Disk attachment of a create call.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AttachedDiskBody {
    /// Access mode.
    pub mode: String,
    /// Device name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    /// Deleted together with the instance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_delete: Option<bool>,
    /// Disk id.
    pub disk_id: String,
}

/// Network interface of a create call.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterfaceBody {
    /// Subnet id.
    pub subnet_id: String,
    /// IPv4 addressing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_v4_address_spec: Option<PrimaryAddressBody>,
    /// IPv6 addressing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_v6_address_spec: Option<PrimaryAddressBody>,
    /// Security groups.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_group_ids: Vec<String>,
}

/// Address of a create call.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryAddressBody {
    /// Static internal address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Public NAT address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_to_one_nat_spec: Option<OneToOneNatBody>,
    /// DNS records.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dns_record_specs: Vec<DnsRecordBody>,
}

/// NAT address of a create call.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OneToOneNatBody {
    /// IP version.
    pub ip_version: String,
    /// Reserved public address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// DNS records.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dns_record_specs: Vec<DnsRecordBody>,
}

/// DNS record of a create call.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DnsRecordBody {
    /// Fully qualified domain name.
    pub fqdn: String,
    /// DNS zone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_zone_id: Option<String>,
    /// TTL in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,
    /// Create a PTR record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ptr: Option<bool>,
}

/// Scheduling policy of a create call.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct SchedulingPolicyBody {
    /// Preemptible instance.
    pub preemptible: bool,
}

/// Network settings of a create call.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NetworkSettingsBody {
    /// Network type.
    #[serde(rename = "type")]
    pub network_type: String,
}

/// GPU settings of a create call.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GpuSettingsBody {
    /// GPU cluster id.
    pub gpu_cluster_id: String,
}

impl TryFrom<&InstanceSpec> for CreateInstanceRequest {
    type Error = ConvergeError;

    fn try_from(spec: &InstanceSpec) -> Result<Self> {
        let zone_id = spec
            .zone_id
            .clone()
            .ok_or_else(|| missing(&spec.name, "zone_id"))?;
        let resources = spec
            .resources
            .as_ref()
            .ok_or_else(|| missing(&spec.name, "resources"))?;
        let boot_disk = spec
            .boot_disk
            .as_ref()
            .ok_or_else(|| missing(&spec.name, "boot_disk"))?;

        Ok(Self {
            folder_id: spec.folder_id.clone(),
            name: spec.name.clone(),
            description: spec.description.clone(),
            labels: spec.labels.clone(),
            zone_id,
            platform_id: spec.platform_id.clone(),
            resources_spec: ResourcesBody {
                memory: resources.memory.to_string(),
                cores: resources.cores.to_string(),
                core_fraction: resources.core_fraction.to_string(),
                gpus: resources.gpus.to_string(),
            },
            metadata: spec.metadata.clone(),
            metadata_options: spec.metadata_options.as_ref().map(MetadataOptionsBody::from),
            boot_disk_spec: AttachedDiskBody::resolve(&spec.name, boot_disk)?,
            secondary_disk_specs: spec
                .secondary_disks
                .iter()
                .map(|d| AttachedDiskBody::resolve(&spec.name, d))
                .collect::<Result<_>>()?,
            network_interface_specs: spec
                .network_interfaces
                .iter()
                .map(NetworkInterfaceBody::from)
                .collect(),
            hostname: spec.hostname.clone(),
            scheduling_policy: spec.scheduling_policy.map(|p| SchedulingPolicyBody {
                preemptible: p.preemptible,
            }),
            service_account_id: spec.service_account_id.clone(),
            network_settings: spec.network_settings.map(|n| NetworkSettingsBody {
                network_type: enum_name(&n.network_type),
            }),
            gpu_settings: spec
                .gpu_settings
                .as_ref()
                .and_then(|g| g.gpu_cluster_id.clone())
                .map(|gpu_cluster_id| GpuSettingsBody { gpu_cluster_id }),
            maintenance_policy: spec.maintenance_policy.as_ref().map(enum_name),
            maintenance_grace_period: spec.maintenance_grace_period_secs.map(|s| format!("{s}s")),
        })
    }
}

impl AttachedDiskBody {
    /// Builds an attachment; the disk must already be resolved to an id.
    fn resolve(instance: &str, disk: &AttachedDiskSpec) -> Result<Self> {
        let disk_id = disk.disk_id.clone().ok_or_else(|| {
            ConvergeError::Config(ConfigError::validation(
                format!(
                    "disk '{}' of instance '{instance}' was not resolved to an id",
                    disk.disk_name.as_deref().unwrap_or_default()
                ),
                "disk_id",
            ))
        })?;

        Ok(Self {
            mode: enum_name(&disk.mode),
            device_name: disk.device_name.clone(),
            auto_delete: disk.auto_delete,
            disk_id,
        })
    }
}

impl From<&MetadataOptionsSpec> for MetadataOptionsBody {
    fn from(options: &MetadataOptionsSpec) -> Self {
        Self {
            aws_v1_http_endpoint: enabled(options.aws_v1_http_endpoint),
            aws_v1_http_token: enabled(options.aws_v1_http_token),
            gce_http_endpoint: enabled(options.gce_http_endpoint),
            gce_http_token: enabled(options.gce_http_token),
        }
    }
}

impl From<&NetworkInterfaceSpec> for NetworkInterfaceBody {
    fn from(nic: &NetworkInterfaceSpec) -> Self {
        Self {
            subnet_id: nic.subnet_id.clone(),
            primary_v4_address_spec: nic.primary_v4_address.as_ref().map(PrimaryAddressBody::from),
            primary_v6_address_spec: nic.primary_v6_address.as_ref().map(PrimaryAddressBody::from),
            security_group_ids: nic.security_group_ids.clone(),
        }
    }
}

impl From<&PrimaryAddressSpec> for PrimaryAddressBody {
    fn from(address: &PrimaryAddressSpec) -> Self {
        Self {
            address: address.address.clone(),
            one_to_one_nat_spec: address.one_to_one_nat.as_ref().map(|nat| OneToOneNatBody {
                ip_version: enum_name(&nat.ip_version),
                address: nat.address.clone(),
                dns_record_specs: nat.dns_records.iter().map(DnsRecordBody::from).collect(),
            }),
            dns_record_specs: address.dns_records.iter().map(DnsRecordBody::from).collect(),
        }
    }
}

impl From<&DnsRecordSpec> for DnsRecordBody {
    fn from(record: &DnsRecordSpec) -> Self {
        Self {
            fqdn: record.fqdn.clone(),
            dns_zone_id: record.dns_zone_id.clone(),
            ttl: record.ttl.map(|t| t.to_string()),
            ptr: record.ptr,
        }
    }
}

// ============================================================================
// Lookups
// ============================================================================

/// An image as returned by the API.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// Image id.
    pub id: String,
    /// Folder id.
    #[serde(default)]
    pub folder_id: String,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Name.
    #[serde(default)]
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Image family.
    #[serde(default)]
    pub family: String,
    /// Storage size in bytes.
    #[serde(default)]
    pub storage_size: String,
    /// Minimum disk size in bytes.
    #[serde(default)]
    pub min_disk_size: String,
    /// Current status.
    #[serde(default)]
    pub status: String,
}

/// A subnet as returned by the API.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Subnet {
    /// Subnet id.
    pub id: String,
    /// Folder id.
    #[serde(default)]
    pub folder_id: String,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Name.
    #[serde(default)]
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Network id.
    #[serde(default)]
    pub network_id: String,
    /// Availability zone.
    #[serde(default)]
    pub zone_id: String,
    /// IPv4 CIDR blocks.
    #[serde(default)]
    pub v4_cidr_blocks: Vec<String>,
    /// IPv6 CIDR blocks.
    #[serde(default)]
    pub v6_cidr_blocks: Vec<String>,
}

/// A page of subnets.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSubnetsResponse {
    /// Subnets on this page.
    #[serde(default)]
    pub subnets: Vec<Subnet>,
    /// Token of the next page.
    #[serde(default)]
    pub next_page_token: Option<String>,
}

// ============================================================================
// Helpers
// ============================================================================

const fn enabled(flag: bool) -> &'static str {
    if flag { "ENABLED" } else { "DISABLED" }
}

/// Returns the wire name of a unit enum variant.
fn enum_name<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn missing(name: &str, field: &str) -> ConvergeError {
    ConvergeError::Config(ConfigError::validation(
        format!("'{name}' needs {field} to be created"),
        field,
    ))
}
