//! Manifest parser for loading desired state from YAML.
//!
//! This module handles loading the manifest, applying manifest-wide
//! defaults and environment overrides, and loading a `.env` file.

use crate::error::{ConfigError, ConvergeError, Result};
use std::path::Path;
use tracing::{debug, info};

use super::spec::Manifest;

/// Environment override for `defaults.folder_id`.
pub const ENV_FOLDER_ID: &str = "CONVERGE_FOLDER_ID";

/// Environment override for `settings.endpoints.compute`.
pub const ENV_COMPUTE_ENDPOINT: &str = "CONVERGE_COMPUTE_ENDPOINT";

/// Environment override for `settings.endpoints.operation`.
pub const ENV_OPERATION_ENDPOINT: &str = "CONVERGE_OPERATION_ENDPOINT";

/// Manifest parser.
#[derive(Debug, Default)]
pub struct ManifestParser {
    /// Base path for resolving the `.env` file.
    base_path: Option<std::path::PathBuf>,
}

impl ManifestParser {
    /// Creates a new manifest parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads a manifest from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Manifest> {
        let path = path.as_ref();
        info!("Loading manifest from: {}", path.display());

        if !path.exists() {
            return Err(ConvergeError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ConvergeError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses a manifest from a YAML string and applies manifest defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<Manifest> {
        debug!("Parsing YAML manifest");

        let mut manifest: Manifest = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            ConvergeError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        Self::apply_defaults(&mut manifest);

        debug!(
            "Parsed manifest with {} disks and {} instances",
            manifest.disks.len(),
            manifest.instances.len()
        );
        Ok(manifest)
    }

    /// Loads a manifest with environment variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<Manifest> {
        let mut manifest = self.load_file(path)?;
        Self::apply_env_overrides(&mut manifest);
        Self::apply_defaults(&mut manifest);
        Ok(manifest)
    }

    /// Fills resource folders from `defaults.folder_id`.
    fn apply_defaults(manifest: &mut Manifest) {
        let Some(folder_id) = manifest.defaults.folder_id.clone() else {
            return;
        };

        for disk in manifest.disks.iter_mut().filter(|d| d.folder_id.is_empty()) {
            disk.folder_id.clone_from(&folder_id);
        }
        for instance in manifest.instances.iter_mut().filter(|i| i.folder_id.is_empty()) {
            instance.folder_id.clone_from(&folder_id);
        }
    }

    /// Applies environment variable overrides to the manifest.
    fn apply_env_overrides(manifest: &mut Manifest) {
        if let Ok(folder_id) = std::env::var(ENV_FOLDER_ID) {
            debug!("Overriding defaults.folder_id from environment");
            manifest.defaults.folder_id = Some(folder_id);
        }

        if let Ok(endpoint) = std::env::var(ENV_COMPUTE_ENDPOINT) {
            debug!("Overriding settings.endpoints.compute from environment");
            manifest.settings.endpoints.compute = endpoint;
        }

        if let Ok(endpoint) = std::env::var(ENV_OPERATION_ENDPOINT) {
            debug!("Overriding settings.endpoints.operation from environment");
            manifest.settings.endpoints.operation = endpoint;
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| std::path::PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                ConvergeError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Default manifest file names to search for.
pub const DEFAULT_MANIFEST_FILES: &[&str] = &["converge.yaml", "converge.yml"];

/// Finds the manifest in the given directory or its parents.
///
/// # Errors
///
/// Returns an error if no manifest is found.
pub fn find_manifest_file(start_dir: impl AsRef<Path>) -> Result<std::path::PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_MANIFEST_FILES {
            let manifest_path = current.join(filename);
            if manifest_path.exists() {
                info!("Found manifest: {}", manifest_path.display());
                return Ok(manifest_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(ConvergeError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_MANIFEST_FILES[0]),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DiskState, DiskType, InstanceState, IpVersion};
    use tempfile::TempDir;

    #[test]
    fn test_parse_minimal_manifest() {
        let yaml = r"
disks:
  - name: data-1
    folder_id: b1g-folder
";
        let manifest = ManifestParser::new()
            .parse_yaml(yaml, None)
            .expect("minimal manifest should parse");

        assert_eq!(manifest.disks.len(), 1);
        assert!(manifest.instances.is_empty());
        assert_eq!(manifest.disks[0].state, DiskState::Present);
        assert_eq!(manifest.settings.retry.max_retry_count, 3);
    }

    #[test]
    fn test_defaults_fill_folder() {
        let yaml = r"
defaults:
  folder_id: b1g-default
disks:
  - name: data-1
  - name: data-2
    folder_id: b1g-other
";
        let manifest = ManifestParser::new()
            .parse_yaml(yaml, None)
            .expect("manifest should parse");

        assert_eq!(manifest.disks[0].folder_id, "b1g-default");
        assert_eq!(manifest.disks[1].folder_id, "b1g-other");
    }

    #[test]
    fn test_parse_full_manifest() {
        let yaml = r##"
defaults:
  folder_id: b1g-folder
settings:
  retry:
    max_retry_count: 5
    retriable_codes: [503, 429]
  wait:
    initial_interval_ms: 500
    timeout_secs: 600
disks:
  - name: boot-1
    type_id: network-ssd
    zone_id: ru-central1-a
    size: 21474836480
    image_id: fd8kdq6d0p8sij7h5qe3
    labels:
      env: prod
instances:
  - name: web-1
    state: stopped
    zone_id: ru-central1-a
    resources:
      memory: 2147483648
      cores: 2
      core_fraction: 20
    boot_disk:
      disk_name: boot-1
      auto_delete: true
    network_interfaces:
      - subnet_id: e9b-subnet
        primary_v4_address:
          one_to_one_nat:
            ip_version: IPV4
            dns_records:
              - fqdn: web-1.example.com.
                ttl: 300
    metadata:
      user-data: "#cloud-config"
    maintenance_policy: MIGRATE
"##;
        let manifest = ManifestParser::new()
            .parse_yaml(yaml, None)
            .expect("full manifest should parse");

        assert_eq!(manifest.settings.retry.max_retry_count, 5);
        assert_eq!(manifest.settings.wait.timeout_secs, Some(600));

        let disk = &manifest.disks[0];
        assert_eq!(disk.type_id, Some(DiskType::NetworkSsd));
        assert_eq!(disk.size, Some(21_474_836_480));

        let instance = &manifest.instances[0];
        assert_eq!(instance.state, InstanceState::Stopped);
        assert_eq!(instance.folder_id, "b1g-folder");
        assert_eq!(instance.platform_id, "standard-v3");
        assert_eq!(
            instance.metadata.get("user-data").map(String::as_str),
            Some("#cloud-config")
        );
        let nat = instance.network_interfaces[0]
            .primary_v4_address
            .as_ref()
            .and_then(|a| a.one_to_one_nat.as_ref())
            .expect("nat should be set");
        assert_eq!(nat.ip_version, IpVersion::Ipv4);
        assert_eq!(nat.dns_records[0].ttl, Some(300));
        assert!(instance.network_interfaces[0].primary_v6_address.is_none());
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        let result = ManifestParser::new().parse_yaml("disks: [", None);
        assert!(matches!(
            result,
            Err(ConvergeError::Config(ConfigError::ParseError { .. }))
        ));
    }

    #[test]
    fn test_find_manifest_in_parent() {
        let temp = TempDir::new().expect("temp dir");
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).expect("create dirs");
        std::fs::write(temp.path().join("converge.yaml"), "disks: []\n").expect("write manifest");

        let found = find_manifest_file(&nested).expect("manifest should be found");
        assert_eq!(found, temp.path().join("converge.yaml"));

        let manifest = ManifestParser::new().load_file(&found).expect("manifest loads");
        assert_eq!(manifest.resource_count(), 0);
    }

    #[test]
    fn test_missing_file() {
        let temp = TempDir::new().expect("temp dir");
        let result = ManifestParser::new().load_file(temp.path().join("nope.yaml"));
        assert!(matches!(
            result,
            Err(ConvergeError::Config(ConfigError::FileNotFound { .. }))
        ));
    }
}
