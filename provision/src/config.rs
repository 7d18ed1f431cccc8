//! Stack configuration: component descriptors and YAML loading.
//!
//! Descriptors are immutable, independent records — relationships between
//! components are expressed only by handle-passing at build time, never by
//! references between descriptors. Conditional features are tagged
//! variants so builders handle both cases exhaustively instead of
//! null-checking.
//!
//! Loading follows validate-then-build: the file is parsed, then every
//! descriptor is checked, and the first problem aborts the run before any
//! resource is declared.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::path::Path;
use std::{fs, io};

use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading or validating a stack configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("configuration file `{0}` not found")]
    NotFound(String),

    /// The configuration file could not be read.
    #[error("failed to read `{path}`: {source}")]
    Io {
        /// Path that failed to read.
        path: String,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The file is not valid YAML for a stack configuration.
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// A descriptor field failed validation.
    #[error("invalid configuration: {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Whether the network gets a NAT gateway for private-subnet egress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NatGateway {
    /// Allocate an elastic IP and a NAT gateway in the first public
    /// subnet; route private subnets through it.
    Enabled,
    /// No NAT; private subnets have no default route.
    Disabled,
}

/// How the compute instance gets its public address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicAddress {
    /// Allocate and associate an elastic IP; it is the public address.
    Elastic,
    /// Use the address the instance is launched with.
    InstanceManaged,
}

/// Registry image retention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Keep only the newest images.
    Enabled {
        /// How many images to retain.
        max_images: u32,
    },
    /// Keep everything.
    Disabled,
}

/// Network component descriptor.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    /// VPC CIDR block.
    pub vpc_cidr: String,
    /// Availability zones to spread subnets across.
    pub availability_zones: Vec<String>,
    /// NAT gateway for private-subnet egress.
    pub nat_gateway: NatGateway,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            vpc_cidr: "10.0.0.0/16".to_string(),
            availability_zones: vec!["us-east-1a".to_string(), "us-east-1b".to_string()],
            nat_gateway: NatGateway::Enabled,
        }
    }
}

/// Object-store component descriptor.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectStoreConfig {
    /// Bucket name. Required; bucket names are globally scoped.
    pub bucket: String,
    /// Keep object versions.
    #[serde(default = "default_true")]
    pub versioning: bool,
    /// Server-side encryption at rest.
    #[serde(default = "default_true")]
    pub encryption: bool,
    /// Block all public access.
    #[serde(default = "default_true")]
    pub public_access_block: bool,
}

/// Registry component descriptor.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Repository name; defaults to `<project>-<environment>`.
    pub name: Option<String>,
    /// Scan images on push.
    pub image_scanning: bool,
    /// Image retention policy.
    pub lifecycle: Lifecycle,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            name: None,
            image_scanning: true,
            lifecycle: Lifecycle::Enabled { max_images: 10 },
        }
    }
}

/// Relational-store component descriptor.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database name. Required.
    pub name: String,
    /// Master password. Required; written to the secrets store under
    /// `/groundwork/<stack>/db_password`.
    pub password: String,
    /// Database engine.
    #[serde(default = "default_db_engine")]
    pub engine: String,
    /// Engine version; the provider's default when absent.
    #[serde(default)]
    pub engine_version: Option<String>,
    /// Instance class.
    #[serde(default = "default_db_class")]
    pub instance_class: String,
    /// Allocated storage in GiB.
    #[serde(default = "default_db_storage")]
    pub allocated_storage: u32,
    /// Storage type.
    #[serde(default = "default_db_storage_type")]
    pub storage_type: String,
    /// Standby replica in a second zone.
    #[serde(default)]
    pub multi_az: bool,
    /// Automated backup retention in days.
    #[serde(default = "default_db_backup_days")]
    pub backup_retention_days: u32,
    /// Skip the final snapshot on destroy.
    #[serde(default)]
    pub skip_final_snapshot: bool,
}

/// Compute component descriptor.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComputeConfig {
    /// Instance type.
    pub instance_type: String,
    /// Machine image id; a well-known default when absent.
    pub ami: Option<String>,
    /// SSH key pair name.
    pub key_pair: Option<String>,
    /// Launch with a public address on the instance itself.
    pub associate_public_ip: bool,
    /// How the public address is provided.
    pub public_address: PublicAddress,
    /// Container image tag the instance boots; `latest` when absent.
    pub image_tag: Option<String>,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            instance_type: "t3.micro".to_string(),
            ami: None,
            key_pair: None,
            associate_public_ip: true,
            public_address: PublicAddress::Elastic,
            image_tag: None,
        }
    }
}

/// Identity component descriptor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdentityConfig {
    /// Extra managed policy ARNs to attach to the instance role.
    pub additional_policy_arns: Vec<String>,
}

/// Whole-stack configuration: one descriptor per component plus the
/// stack-level scalars.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StackConfig {
    /// Stack name; prefixes every component name.
    pub stack: String,
    /// Deployment environment; defaults to the stack name.
    #[serde(default)]
    pub environment: Option<String>,
    /// Project name used in tags and derived names.
    #[serde(default)]
    pub project: Option<String>,
    /// When present, the DNS zone and certificate branch is taken.
    #[serde(default)]
    pub domain_name: Option<String>,
    /// Network descriptor.
    #[serde(default)]
    pub network: NetworkConfig,
    /// Object-store descriptor.
    pub object_store: ObjectStoreConfig,
    /// Registry descriptor.
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Relational-store descriptor.
    pub database: DatabaseConfig,
    /// Compute descriptor.
    #[serde(default)]
    pub compute: ComputeConfig,
    /// Identity descriptor.
    #[serde(default)]
    pub identity: IdentityConfig,
}

impl StackConfig {
    /// Load and validate a stack configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] when the file is missing or unreadable, the YAML
    /// does not describe a stack configuration, or any descriptor field
    /// fails validation.
    pub fn from_yaml(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(path.display().to_string()));
            }
            Err(error) => {
                return Err(ConfigError::Io {
                    path: path.display().to_string(),
                    source: error,
                });
            }
        };
        Self::from_yaml_str(&contents)
    }

    /// Parse and validate a stack configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] on malformed YAML or failed validation.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml::from_str(contents).map_err(|error| ConfigError::Parse(error.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Effective environment name.
    #[must_use]
    pub fn environment(&self) -> &str {
        self.environment.as_deref().unwrap_or(&self.stack)
    }

    /// Effective project name.
    #[must_use]
    pub fn project(&self) -> &str {
        self.project.as_deref().unwrap_or("groundwork")
    }

    /// Effective registry repository name.
    #[must_use]
    pub fn registry_name(&self) -> String {
        self.registry
            .name
            .clone()
            .unwrap_or_else(|| format!("{}-{}", self.project(), self.environment()))
    }

    /// Base tags merged into every taggable resource.
    #[must_use]
    pub fn base_tags(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("Environment".to_string(), self.environment().to_string()),
            ("ManagedBy".to_string(), "Groundwork".to_string()),
            ("Project".to_string(), self.project().to_string()),
        ])
    }

    /// Check every descriptor. The first problem aborts.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stack.trim().is_empty() {
            return Err(invalid("stack", "must not be empty"));
        }
        validate_cidr(&self.network.vpc_cidr)?;
        let zones = self.network.availability_zones.len();
        if !(1..=8).contains(&zones) {
            return Err(invalid(
                "network.availability_zones",
                format!("expected between 1 and 8 zones, got {zones}"),
            ));
        }
        if self.object_store.bucket.trim().is_empty() {
            return Err(invalid("object_store.bucket", "must not be empty"));
        }
        if self.database.name.trim().is_empty() {
            return Err(invalid("database.name", "must not be empty"));
        }
        if self.database.password.trim().is_empty() {
            return Err(invalid("database.password", "must not be empty"));
        }
        if self.database.allocated_storage == 0 {
            return Err(invalid("database.allocated_storage", "must be positive"));
        }
        if let Lifecycle::Enabled { max_images: 0 } = self.registry.lifecycle {
            return Err(invalid(
                "registry.lifecycle.max_images",
                "must be positive",
            ));
        }
        if let Some(domain) = &self.domain_name {
            if domain.trim().is_empty() || !domain.contains('.') {
                return Err(invalid("domain_name", "must be a fully-qualified name"));
            }
        }
        Ok(())
    }
}

fn validate_cidr(cidr: &str) -> Result<(), ConfigError> {
    let Some((address, prefix)) = cidr.split_once('/') else {
        return Err(invalid(
            "network.vpc_cidr",
            format!("`{cidr}` is not CIDR notation"),
        ));
    };
    if address.parse::<Ipv4Addr>().is_err() {
        return Err(invalid(
            "network.vpc_cidr",
            format!("`{address}` is not an IPv4 address"),
        ));
    }
    match prefix.parse::<u8>() {
        Ok(bits) if bits <= 28 => Ok(()),
        _ => Err(invalid(
            "network.vpc_cidr",
            format!("prefix `/{prefix}` leaves no room for subnets"),
        )),
    }
}

fn default_true() -> bool {
    true
}

fn default_db_engine() -> String {
    "postgres".to_string()
}

fn default_db_class() -> String {
    "db.t3.micro".to_string()
}

fn default_db_storage() -> u32 {
    20
}

fn default_db_storage_type() -> String {
    "gp3".to_string()
}

fn default_db_backup_days() -> u32 {
    7
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    const MINIMAL: &str = r"
stack: demo
object_store:
  bucket: demo-assets
database:
  name: appdb
  password: hunter2hunter2
";

    #[test]
    fn minimal_config_gets_defaults() {
        let config = StackConfig::from_yaml_str(MINIMAL).unwrap();
        assert_eq!(config.environment(), "demo");
        assert_eq!(config.network.vpc_cidr, "10.0.0.0/16");
        assert_eq!(config.network.nat_gateway, NatGateway::Enabled);
        assert_eq!(config.compute.public_address, PublicAddress::Elastic);
        assert_eq!(config.registry_name(), "groundwork-demo");
        assert_eq!(config.base_tags()["ManagedBy"], "Groundwork");
    }

    #[test]
    fn tagged_variants_parse_from_yaml() {
        let config = StackConfig::from_yaml_str(
            r"
stack: demo
network:
  nat_gateway: disabled
compute:
  public_address: instance_managed
registry:
  lifecycle:
    enabled:
      max_images: 5
object_store:
  bucket: demo-assets
database:
  name: appdb
  password: hunter2hunter2
",
        )
        .unwrap();
        assert_eq!(config.network.nat_gateway, NatGateway::Disabled);
        assert_eq!(config.compute.public_address, PublicAddress::InstanceManaged);
        assert_eq!(
            config.registry.lifecycle,
            Lifecycle::Enabled { max_images: 5 }
        );
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = StackConfig::from_yaml(&dir.path().join("missing.yaml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn empty_password_is_rejected() {
        let result = StackConfig::from_yaml_str(
            r"
stack: demo
object_store:
  bucket: demo-assets
database:
  name: appdb
  password: '  '
",
        );
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                field: "database.password",
                ..
            })
        ));
    }

    #[test]
    fn malformed_cidr_is_rejected() {
        let result = StackConfig::from_yaml_str(
            r"
stack: demo
network:
  vpc_cidr: not-a-cidr
object_store:
  bucket: demo-assets
database:
  name: appdb
  password: hunter2hunter2
",
        );
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                field: "network.vpc_cidr",
                ..
            })
        ));
    }
}
