//! Identity component: instance role, inline policy, instance profile.
//!
//! The inline policy names resources whose identifiers do not exist at
//! declaration time — the bucket, database, and repository ARNs arrive as
//! handles. The document is therefore a deferred composite: all ARNs are
//! joined, validated, and indexed by position once resolved (bucket ARNs
//! at the head, the database ARN next, the repository ARN last), and the
//! rendered JSON becomes a pending property of the role policy.

use std::collections::BTreeMap;

use serde_json::{Value, json};
use tracing::info;

use groundwork_core::{Output, Provisioner, ResourceSpec};

use crate::config::IdentityConfig;
use crate::error::Result;

use super::tags_with_name;

const REGISTRY_READ_ONLY_POLICY: &str =
    "arn:aws:iam::aws:policy/AmazonEC2ContainerRegistryReadOnly";
const SSM_CORE_POLICY: &str = "arn:aws:iam::aws:policy/AmazonSSMManagedInstanceCore";

/// Declared role, policy, and profile outputs.
pub struct IdentityComponent {
    /// Role ARN.
    pub role_arn: Output<String>,
    /// Role name.
    pub role_name: Output<String>,
    /// Instance profile ARN.
    pub instance_profile_arn: Output<String>,
    /// Instance profile name, attached to the compute instance.
    pub instance_profile_name: Output<String>,
}

impl IdentityComponent {
    /// Declare the role graph.
    ///
    /// `bucket_arns`, `database_arn`, and `registry_arn` are unresolved
    /// handles; only the joined policy document ever reads them.
    ///
    /// # Errors
    ///
    /// Never fails today; see the builder contract note on
    /// [`super::network::NetworkComponent::new`].
    pub fn new(
        name: &str,
        config: &IdentityConfig,
        bucket_arns: Vec<Output<String>>,
        database_arn: Output<String>,
        registry_arn: Output<String>,
        tags: &BTreeMap<String, String>,
        engine: &dyn Provisioner,
    ) -> Result<Self> {
        info!(component = %name, "declaring identity role");

        let bucket_count = bucket_arns.len();
        let mut joined = bucket_arns;
        joined.push(database_arn);
        joined.push(registry_arn);
        let policy = Output::all(joined)
            .map(move |arns| policy_document(&arns, bucket_count).to_string());

        let role = engine.declare(
            ResourceSpec::new("iam/role", format!("{name}-role"))
                .parent(name)
                .prop("name", format!("{name}-role"))
                .prop("assume_role_policy", assume_role_policy())
                .prop("tags", tags_with_name(tags, &format!("{name}-role"))),
        );
        let role_name = role.attr_string("name");

        engine.declare(
            ResourceSpec::new("iam/role-policy", format!("{name}-policy"))
                .parent(name)
                .prop("role", role_name.clone())
                .prop("policy", policy),
        );

        let managed = [
            ("registry-readonly", REGISTRY_READ_ONLY_POLICY),
            ("ssm-core", SSM_CORE_POLICY),
        ];
        for (label, policy_arn) in managed {
            engine.declare(
                ResourceSpec::new(
                    "iam/role-policy-attachment",
                    format!("{name}-{label}"),
                )
                .parent(name)
                .prop("role", role_name.clone())
                .prop("policy_arn", policy_arn),
            );
        }
        for (index, policy_arn) in config.additional_policy_arns.iter().enumerate() {
            engine.declare(
                ResourceSpec::new(
                    "iam/role-policy-attachment",
                    format!("{name}-extra-{index}"),
                )
                .parent(name)
                .prop("role", role_name.clone())
                .prop("policy_arn", policy_arn.as_str()),
            );
        }

        let profile = engine.declare(
            ResourceSpec::new("iam/instance-profile", format!("{name}-profile"))
                .parent(name)
                .prop("name", format!("{name}-profile"))
                .prop("role", role_name.clone())
                .prop("tags", tags_with_name(tags, &format!("{name}-profile"))),
        );

        Ok(Self {
            role_arn: role.attr_string("arn"),
            role_name,
            instance_profile_arn: profile.attr_string("arn"),
            instance_profile_name: profile.attr_string("name"),
        })
    }
}

fn assume_role_policy() -> String {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Principal": { "Service": "ec2.amazonaws.com" },
            "Action": "sts:AssumeRole",
        }]
    })
    .to_string()
}

/// Build the inline policy from the joined ARNs.
///
/// Validate-then-index: every resolved ARN is trimmed and dropped when
/// empty; the first `bucket_count` entries are bucket ARNs, then the
/// database ARN, then the repository ARN. A statement is emitted only for
/// the resources that survived validation; the secrets-store statement is
/// unconditional, so the document is never empty.
fn policy_document(arns: &[String], bucket_count: usize) -> Value {
    let mut statements = Vec::new();

    let buckets: Vec<&str> = arns
        .iter()
        .take(bucket_count)
        .map(|arn| arn.trim())
        .filter(|arn| !arn.is_empty())
        .collect();
    if !buckets.is_empty() {
        let mut resources = Vec::new();
        for bucket in buckets {
            resources.push(bucket.to_string());
            resources.push(format!("{bucket}/*"));
        }
        statements.push(json!({
            "Effect": "Allow",
            "Action": ["s3:GetObject", "s3:PutObject", "s3:DeleteObject", "s3:ListBucket"],
            "Resource": resources,
        }));
    }

    let database = arns.get(bucket_count).map_or("", |arn| arn.trim());
    if !database.is_empty() {
        statements.push(json!({
            "Effect": "Allow",
            "Action": ["rds:DescribeDBInstances"],
            "Resource": [database],
        }));
    }

    let registry = arns.get(bucket_count + 1).map_or("", |arn| arn.trim());
    if !registry.is_empty() {
        statements.push(json!({
            "Effect": "Allow",
            "Action": ["ecr:GetAuthorizationToken"],
            "Resource": ["*"],
        }));
        statements.push(json!({
            "Effect": "Allow",
            "Action": [
                "ecr:BatchCheckLayerAvailability",
                "ecr:GetDownloadUrlForLayer",
                "ecr:BatchGetImage",
                "ecr:DescribeRepositories",
                "ecr:DescribeImages",
                "ecr:ListImages",
            ],
            "Resource": [registry],
        }));
    }

    statements.push(json!({
        "Effect": "Allow",
        "Action": ["ssm:GetParameter", "ssm:GetParameters", "ssm:DescribeParameters"],
        "Resource": ["arn:aws:ssm:*:*:parameter/groundwork/*"],
    }));

    json!({ "Version": "2012-10-17", "Statement": statements })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use groundwork_engine::SimulatedCloud;

    #[test]
    fn bucket_statement_covers_bucket_and_objects() {
        let arns = vec![
            "arn:aws:s3:::demo-assets".to_string(),
            "arn:aws:rds:us-east-1:123456789012:db:demo-db".to_string(),
            "arn:aws:ecr:us-east-1:123456789012:repository/demo".to_string(),
        ];
        let document = policy_document(&arns, 1);
        let rendered = document.to_string();
        assert!(rendered.contains("arn:aws:s3:::demo-assets/*"));
        assert!(rendered.contains("rds:DescribeDBInstances"));
        assert!(rendered.contains("ecr:GetAuthorizationToken"));
    }

    #[test]
    fn blank_arns_are_dropped_but_secrets_statement_remains() {
        let arns = vec![" ".to_string(), String::new(), String::new()];
        let document = policy_document(&arns, 1);
        let statements = document["Statement"].as_array().unwrap();
        assert_eq!(statements.len(), 1);
        assert!(statements[0].to_string().contains("ssm:GetParameter"));
    }

    #[tokio::test]
    async fn policy_resolves_after_upstream_arns() {
        let cloud = SimulatedCloud::new();
        let identity = IdentityComponent::new(
            "demo-iam",
            &IdentityConfig::default(),
            vec![Output::ready("arn:aws:s3:::demo-assets".to_string())],
            Output::ready("arn:aws:rds:us-east-1:123456789012:db:demo".to_string()),
            Output::ready("arn:aws:ecr:us-east-1:123456789012:repository/demo".to_string()),
            &BTreeMap::new(),
            &cloud,
        )
        .unwrap();

        cloud.run().await.unwrap();
        assert_eq!(
            identity.instance_profile_name.resolve().await,
            "demo-iam-profile"
        );
        assert!(
            identity
                .role_arn
                .resolve()
                .await
                .ends_with("role/demo-iam-role")
        );
    }
}
