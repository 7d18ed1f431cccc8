//! Registry component: image repository and optional retention policy.

use std::collections::BTreeMap;

use serde_json::json;
use tracing::info;

use groundwork_core::{Output, Provisioner, ResourceSpec};

use crate::config::{Lifecycle, RegistryConfig};
use crate::error::Result;

use super::tags_with_name;

/// Declared repository and its outputs.
pub struct RegistryComponent {
    /// Repository name.
    pub repository_name: Output<String>,
    /// Repository ARN.
    pub repository_arn: Output<String>,
    /// Repository URL images are pushed to and pulled from.
    pub repository_url: Output<String>,
}

impl RegistryComponent {
    /// Declare the repository and, when retention is enabled, its
    /// lifecycle policy.
    ///
    /// # Errors
    ///
    /// Never fails today; see the builder contract note on
    /// [`super::network::NetworkComponent::new`].
    pub fn new(
        name: &str,
        repository: &str,
        config: &RegistryConfig,
        tags: &BTreeMap<String, String>,
        engine: &dyn Provisioner,
    ) -> Result<Self> {
        info!(component = %name, repository, "declaring registry");

        let repo = engine.declare(
            ResourceSpec::new("ecr/repository", format!("{name}-repo"))
                .parent(name)
                .prop("name", repository)
                .prop("scan_on_push", config.image_scanning)
                .prop("tags", tags_with_name(tags, repository)),
        );
        let repository_name = repo.attr_string("name");

        if let Lifecycle::Enabled { max_images } = config.lifecycle {
            engine.declare(
                ResourceSpec::new("ecr/lifecycle-policy", format!("{name}-lifecycle"))
                    .parent(name)
                    .prop("repository", repository_name.clone())
                    .prop(
                        "policy",
                        json!({
                            "rules": [{
                                "rulePriority": 1,
                                "description": format!("keep the newest {max_images} images"),
                                "selection": {
                                    "tagStatus": "any",
                                    "countType": "imageCountMoreThan",
                                    "countNumber": max_images,
                                },
                                "action": { "type": "expire" },
                            }]
                        })
                        .to_string(),
                    ),
            );
        }

        Ok(Self {
            repository_name,
            repository_arn: repo.attr_string("arn"),
            repository_url: repo.attr_string("repository_url"),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use groundwork_engine::SimulatedCloud;

    #[tokio::test]
    async fn repository_url_points_at_the_registry() {
        let cloud = SimulatedCloud::new();
        let registry = RegistryComponent::new(
            "demo-registry",
            "demo-app",
            &RegistryConfig::default(),
            &BTreeMap::new(),
            &cloud,
        )
        .unwrap();

        cloud.run().await.unwrap();
        let url = registry.repository_url.resolve().await;
        assert!(url.ends_with("/demo-app"));
        assert_eq!(registry.repository_name.resolve().await, "demo-app");
    }

    #[tokio::test]
    async fn disabled_lifecycle_declares_no_policy() {
        let cloud = SimulatedCloud::new();
        RegistryComponent::new(
            "demo-registry",
            "demo-app",
            &RegistryConfig {
                lifecycle: Lifecycle::Disabled,
                ..RegistryConfig::default()
            },
            &BTreeMap::new(),
            &cloud,
        )
        .unwrap();

        assert_eq!(cloud.records().len(), 1);
    }
}
