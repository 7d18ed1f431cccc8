//! Object-store component: bucket plus its gated child resources.

use std::collections::BTreeMap;

use tracing::info;

use groundwork_core::{Output, Provisioner, ResourceSpec};

use crate::config::ObjectStoreConfig;
use crate::error::Result;

use super::tags_with_name;

/// Declared bucket and its outputs.
///
/// Versioning, encryption, and the public-access block are separate child
/// resources, each declared only when its descriptor flag is set.
pub struct ObjectStoreComponent {
    /// Bucket name.
    pub bucket_name: Output<String>,
    /// Bucket ARN.
    pub bucket_arn: Output<String>,
    /// Regional domain name of the bucket.
    pub bucket_domain_name: Output<String>,
}

impl ObjectStoreComponent {
    /// Declare the bucket and its enabled child resources.
    ///
    /// # Errors
    ///
    /// Never fails today; see the builder contract note on
    /// [`super::network::NetworkComponent::new`].
    pub fn new(
        name: &str,
        config: &ObjectStoreConfig,
        tags: &BTreeMap<String, String>,
        engine: &dyn Provisioner,
    ) -> Result<Self> {
        info!(component = %name, bucket = %config.bucket, "declaring object store");

        let bucket = engine.declare(
            ResourceSpec::new("s3/bucket", format!("{name}-bucket"))
                .parent(name)
                .prop("bucket", config.bucket.as_str())
                .prop("tags", tags_with_name(tags, &config.bucket)),
        );
        let bucket_name = bucket.attr_string("bucket");

        if config.versioning {
            engine.declare(
                ResourceSpec::new("s3/bucket-versioning", format!("{name}-versioning"))
                    .parent(name)
                    .prop("bucket", bucket_name.clone())
                    .prop("status", "Enabled"),
            );
        }
        if config.encryption {
            engine.declare(
                ResourceSpec::new("s3/bucket-encryption", format!("{name}-encryption"))
                    .parent(name)
                    .prop("bucket", bucket_name.clone())
                    .prop("sse_algorithm", "AES256"),
            );
        }
        if config.public_access_block {
            engine.declare(
                ResourceSpec::new(
                    "s3/public-access-block",
                    format!("{name}-public-access-block"),
                )
                .parent(name)
                .prop("bucket", bucket_name.clone())
                .prop("block_public_acls", true)
                .prop("block_public_policy", true)
                .prop("ignore_public_acls", true)
                .prop("restrict_public_buckets", true),
            );
        }

        Ok(Self {
            bucket_name,
            bucket_arn: bucket.attr_string("arn"),
            bucket_domain_name: bucket.attr_string("bucket_regional_domain_name"),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use groundwork_engine::SimulatedCloud;

    fn config(flags: bool) -> ObjectStoreConfig {
        ObjectStoreConfig {
            bucket: "demo-assets".to_string(),
            versioning: flags,
            encryption: flags,
            public_access_block: flags,
        }
    }

    #[tokio::test]
    async fn outputs_derive_from_the_configured_bucket() {
        let cloud = SimulatedCloud::new();
        let store =
            ObjectStoreComponent::new("demo-storage", &config(true), &BTreeMap::new(), &cloud)
                .unwrap();

        cloud.run().await.unwrap();
        assert_eq!(store.bucket_name.resolve().await, "demo-assets");
        assert_eq!(store.bucket_arn.resolve().await, "arn:aws:s3:::demo-assets");
    }

    #[tokio::test]
    async fn disabled_flags_declare_no_children() {
        let cloud = SimulatedCloud::new();
        ObjectStoreComponent::new("demo-storage", &config(false), &BTreeMap::new(), &cloud)
            .unwrap();

        assert_eq!(cloud.records().len(), 1);
    }
}
