//! Compute component: instance, optional elastic IP, bootstrap wiring.

use std::collections::BTreeMap;

use tracing::info;

use groundwork_core::{Input, Output, Provisioner, ResourceSpec};

use crate::config::{ComputeConfig, PublicAddress};
use crate::error::{DeclareError, Result};

use super::tags_with_name;

/// Machine image used when the descriptor does not name one.
const DEFAULT_AMI: &str = "ami-0c101f26f147fa7fd";

/// Declared instance and its outputs.
pub struct ComputeComponent {
    /// Instance id.
    pub instance_id: Output<String>,
    /// The instance's reachable public address: the elastic IP when one
    /// is associated, otherwise the instance's own address.
    pub public_ip: Output<String>,
    /// Private address inside the VPC.
    pub private_ip: Output<String>,
    /// Elastic IP address; `None` when the descriptor chose the
    /// instance-managed address.
    pub elastic_ip: Option<Output<String>>,
}

impl ComputeComponent {
    /// Declare the instance graph.
    ///
    /// # Errors
    ///
    /// Rejects a descriptor that disables the instance's own public
    /// address without providing an elastic one — the instance would be
    /// unreachable and every downstream consumer of the public address
    /// (DNS above all) would break.
    #[allow(clippy::too_many_arguments)] // One upstream handle per dependency edge.
    pub fn new(
        name: &str,
        config: &ComputeConfig,
        subnet_id: Output<String>,
        security_group_id: Output<String>,
        instance_profile_name: Output<String>,
        user_data: Output<String>,
        tags: &BTreeMap<String, String>,
        engine: &dyn Provisioner,
    ) -> Result<Self> {
        if config.public_address == PublicAddress::InstanceManaged && !config.associate_public_ip {
            return Err(DeclareError::component(
                name,
                "public_address is instance_managed but associate_public_ip is false",
            ));
        }
        info!(component = %name, instance_type = %config.instance_type, "declaring compute");

        let elastic = match config.public_address {
            PublicAddress::Elastic => Some(engine.declare(
                ResourceSpec::new("ec2/eip", format!("{name}-eip"))
                    .parent(name)
                    .prop("domain", "vpc")
                    .prop("tags", tags_with_name(tags, &format!("{name}-eip"))),
            )),
            PublicAddress::InstanceManaged => None,
        };

        let ami = config.ami.as_deref().unwrap_or(DEFAULT_AMI);
        let mut spec = ResourceSpec::new("ec2/instance", format!("{name}-instance"))
            .parent(name)
            .prop("ami", ami)
            .prop("instance_type", config.instance_type.as_str())
            .prop("subnet_id", subnet_id)
            .prop(
                "vpc_security_group_ids",
                Input::list([Input::from(security_group_id)]),
            )
            .prop("iam_instance_profile", instance_profile_name)
            .prop("associate_public_ip", config.associate_public_ip)
            .prop("user_data", user_data)
            .prop("tags", tags_with_name(tags, &format!("{name}-instance")));
        if let Some(key_pair) = &config.key_pair {
            spec = spec.prop("key_name", key_pair.as_str());
        }
        let instance = engine.declare(spec);
        let instance_id = instance.attr_string("id");

        let elastic_ip = elastic.map(|eip| {
            engine.declare(
                ResourceSpec::new("ec2/eip-association", format!("{name}-eip-assoc"))
                    .parent(name)
                    .prop("instance_id", instance_id.clone())
                    .prop("allocation_id", eip.attr_string("id")),
            );
            eip.attr_string("public_ip")
        });

        let public_ip = elastic_ip
            .clone()
            .unwrap_or_else(|| instance.attr_string("public_ip"));

        Ok(Self {
            instance_id,
            public_ip,
            private_ip: instance.attr_string("private_ip"),
            elastic_ip,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use groundwork_engine::SimulatedCloud;

    fn declare(config: &ComputeConfig, cloud: &SimulatedCloud) -> Result<ComputeComponent> {
        ComputeComponent::new(
            "demo-server",
            config,
            Output::ready("subnet-a".to_string()),
            Output::ready("sg-1".to_string()),
            Output::ready("demo-iam-profile".to_string()),
            Output::ready("#!/bin/bash\n".to_string()),
            &BTreeMap::new(),
            cloud,
        )
    }

    #[tokio::test]
    async fn instance_managed_address_is_the_instances_own() {
        let cloud = SimulatedCloud::new();
        let compute = declare(
            &ComputeConfig {
                public_address: PublicAddress::InstanceManaged,
                ..ComputeConfig::default()
            },
            &cloud,
        )
        .unwrap();

        assert!(compute.elastic_ip.is_none());
        cloud.run().await.unwrap();
        // The engine assigns instance addresses from 203.0.113.0/24 and
        // elastic addresses from 198.51.100.0/24.
        assert!(compute.public_ip.resolve().await.starts_with("203.0.113."));
    }

    #[tokio::test]
    async fn elastic_address_wins_when_associated() {
        let cloud = SimulatedCloud::new();
        let compute = declare(&ComputeConfig::default(), &cloud).unwrap();

        cloud.run().await.unwrap();
        let elastic = compute.elastic_ip.unwrap().resolve().await;
        assert_eq!(compute.public_ip.resolve().await, elastic);
        assert!(elastic.starts_with("198.51.100."));
    }

    #[test]
    fn conflicting_address_flags_are_rejected() {
        let cloud = SimulatedCloud::new();
        let result = declare(
            &ComputeConfig {
                public_address: PublicAddress::InstanceManaged,
                associate_public_ip: false,
                ..ComputeConfig::default()
            },
            &cloud,
        );
        assert!(result.is_err());
        assert!(cloud.records().is_empty());
    }
}
