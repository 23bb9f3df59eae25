//! Configuration module for the convergence engine.
//!
//! This module handles everything that happens before the core runs:
//! - Parsing and deserializing `converge.yaml`
//! - Validation of manifest values
//! - Resolving credentials

mod credentials;
mod parser;
mod spec;
mod validator;

pub use credentials::{
    Credentials, ENV_IAM_TOKEN, ENV_OAUTH_TOKEN, ENV_SERVICE_ACCOUNT_KEY_FILE, ServiceAccountKey,
};
pub use parser::{
    DEFAULT_MANIFEST_FILES, ENV_COMPUTE_ENDPOINT, ENV_FOLDER_ID, ENV_OPERATION_ENDPOINT,
    ManifestParser, find_manifest_file,
};
pub use spec::{
    AttachedDiskSpec, DEFAULT_COMPUTE_ENDPOINT, DEFAULT_IAM_ENDPOINT, DEFAULT_OPERATION_ENDPOINT,
    DEFAULT_VPC_ENDPOINT, Defaults, DiskMode, DiskSource, DiskSpec, DiskState, DiskType,
    DnsRecordSpec, Endpoints, GpuSettingsSpec, InstanceSpec, InstanceState, IpVersion,
    MaintenancePolicy, Manifest, MetadataOptionsSpec, NetworkInterfaceSpec, NetworkSettingsSpec,
    NetworkType, OneToOneNatSpec, PrimaryAddressSpec, ResourcesSpec, RetrySettings,
    SchedulingPolicySpec, Settings, WaitSettings,
};
pub use validator::{ConfigValidator, ValidationIssue, ValidationResult};
