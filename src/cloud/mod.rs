//! Cloud API client module.
//!
//! This module provides the retrying REST client, the per-kind services
//! built on it and the long-running operation waiter.

mod auth;
mod client;
mod disk;
mod instance;
mod lookup;
mod operation;
mod retry;
mod sdk;
mod types;

pub use auth::TokenSource;
pub use client::ApiClient;
pub use disk::DiskService;
pub use instance::InstanceService;
pub use lookup::{ImageService, STANDARD_IMAGES_FOLDER, SubnetService};
pub use operation::{OperationApi, OperationService, OperationWaiter, WaitPolicy};
pub use retry::{RetryPolicy, UNAVAILABLE};
pub use sdk::CloudSdk;
pub use types::{
    AttachedDisk, AttachedDiskBody, CreateDiskRequest, CreateInstanceRequest, DISK_UPDATE_MASK,
    Disk, DiskStatus, DnsRecordBody, GpuSettingsBody, Image, Instance, InstanceResources,
    InstanceStatus, ListDisksResponse, ListInstancesResponse, ListSubnetsResponse,
    MetadataOptionsBody, NetworkInterface, NetworkInterfaceBody, NetworkSettingsBody, OneToOneNat,
    OneToOneNatBody, Operation, OperationFailure, PrimaryAddress, PrimaryAddressBody,
    ResourcesBody, SchedulingPolicyBody, Subnet, UpdateDiskRequest,
};
