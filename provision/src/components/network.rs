//! Network component: VPC, subnets, gateways, route tables, security
//! groups.

use std::collections::BTreeMap;

use tracing::info;

use groundwork_core::{Input, Output, Provisioner, ResourceSpec};

use crate::config::{NatGateway, NetworkConfig};
use crate::error::{DeclareError, Result};

use super::tags_with_name;

/// Ports the compute security group accepts from anywhere.
const COMPUTE_INGRESS: [(u16, &str); 4] = [
    (22, "ssh"),
    (80, "http"),
    (443, "https"),
    (8000, "app"),
];

/// Declared network graph and its outputs.
///
/// One public and one private subnet per configured availability zone;
/// public subnets route through the internet gateway, private subnets
/// through the NAT gateway when one is enabled.
pub struct NetworkComponent {
    /// VPC id.
    pub vpc_id: Output<String>,
    /// Public subnet ids, in zone order.
    pub public_subnet_ids: Vec<Output<String>>,
    /// Private subnet ids, in zone order.
    pub private_subnet_ids: Vec<Output<String>>,
    /// Security group for compute instances.
    pub compute_security_group_id: Output<String>,
    /// Security group for the relational store.
    pub store_security_group_id: Output<String>,
    /// NAT gateway id; `None` when NAT is disabled.
    pub nat_gateway_id: Option<Output<String>>,
}

impl NetworkComponent {
    /// Declare the network graph.
    ///
    /// # Errors
    ///
    /// Rejects an empty availability-zone list: every other placement
    /// decision hangs off the first public subnet.
    pub fn new(
        name: &str,
        config: &NetworkConfig,
        tags: &BTreeMap<String, String>,
        engine: &dyn Provisioner,
    ) -> Result<Self> {
        if config.availability_zones.is_empty() {
            return Err(DeclareError::component(
                name,
                "at least one availability zone is required",
            ));
        }
        info!(component = %name, zones = config.availability_zones.len(), "declaring network");

        let vpc = engine.declare(
            ResourceSpec::new("ec2/vpc", format!("{name}-vpc"))
                .parent(name)
                .prop("cidr_block", config.vpc_cidr.as_str())
                .prop("enable_dns_hostnames", true)
                .prop("enable_dns_support", true)
                .prop("tags", tags_with_name(tags, &format!("{name}-vpc"))),
        );
        let vpc_id = vpc.attr_string("id");

        let igw = engine.declare(
            ResourceSpec::new("ec2/internet-gateway", format!("{name}-igw"))
                .parent(name)
                .prop("vpc_id", vpc_id.clone())
                .prop("tags", tags_with_name(tags, &format!("{name}-igw"))),
        );

        let base = subnet_base(&config.vpc_cidr);
        let mut public_subnets = Vec::new();
        let mut private_subnets = Vec::new();
        for (index, zone) in config.availability_zones.iter().enumerate() {
            let public_name = format!("{name}-public-{}", index + 1);
            public_subnets.push(engine.declare(
                ResourceSpec::new("ec2/subnet", &public_name)
                    .parent(name)
                    .prop("vpc_id", vpc_id.clone())
                    .prop("cidr_block", format!("{base}.{}.0/24", index + 1))
                    .prop("availability_zone", zone.as_str())
                    .prop("map_public_ip_on_launch", true)
                    .prop("tags", tags_with_name(tags, &public_name)),
            ));

            let private_name = format!("{name}-private-{}", index + 1);
            private_subnets.push(engine.declare(
                ResourceSpec::new("ec2/subnet", &private_name)
                    .parent(name)
                    .prop("vpc_id", vpc_id.clone())
                    .prop("cidr_block", format!("{base}.{}.0/24", index + 10))
                    .prop("availability_zone", zone.as_str())
                    .prop("tags", tags_with_name(tags, &private_name)),
            ));
        }
        let public_subnet_ids: Vec<Output<String>> = public_subnets
            .iter()
            .map(|subnet| subnet.attr_string("id"))
            .collect();
        let private_subnet_ids: Vec<Output<String>> = private_subnets
            .iter()
            .map(|subnet| subnet.attr_string("id"))
            .collect();

        let nat_gateway_id = match config.nat_gateway {
            NatGateway::Enabled => {
                let eip = engine.declare(
                    ResourceSpec::new("ec2/eip", format!("{name}-nat-eip"))
                        .parent(name)
                        .prop("domain", "vpc")
                        .prop("tags", tags_with_name(tags, &format!("{name}-nat-eip"))),
                );
                let nat = engine.declare(
                    ResourceSpec::new("ec2/nat-gateway", format!("{name}-nat"))
                        .parent(name)
                        .prop("allocation_id", eip.attr_string("id"))
                        .prop("subnet_id", public_subnet_ids[0].clone())
                        .prop("tags", tags_with_name(tags, &format!("{name}-nat"))),
                );
                Some(nat.attr_string("id"))
            }
            NatGateway::Disabled => None,
        };

        let public_rt = engine.declare(
            ResourceSpec::new("ec2/route-table", format!("{name}-public-rt"))
                .parent(name)
                .prop("vpc_id", vpc_id.clone())
                .prop("tags", tags_with_name(tags, &format!("{name}-public-rt"))),
        );
        engine.declare(
            ResourceSpec::new("ec2/route", format!("{name}-public-route"))
                .parent(name)
                .prop("route_table_id", public_rt.attr_string("id"))
                .prop("destination_cidr_block", "0.0.0.0/0")
                .prop("gateway_id", igw.attr_string("id")),
        );
        for (index, subnet_id) in public_subnet_ids.iter().enumerate() {
            engine.declare(
                ResourceSpec::new(
                    "ec2/route-table-association",
                    format!("{name}-public-rta-{}", index + 1),
                )
                .parent(name)
                .prop("subnet_id", subnet_id.clone())
                .prop("route_table_id", public_rt.attr_string("id")),
            );
        }

        if let Some(nat_id) = &nat_gateway_id {
            let private_rt = engine.declare(
                ResourceSpec::new("ec2/route-table", format!("{name}-private-rt"))
                    .parent(name)
                    .prop("vpc_id", vpc_id.clone())
                    .prop("tags", tags_with_name(tags, &format!("{name}-private-rt"))),
            );
            engine.declare(
                ResourceSpec::new("ec2/route", format!("{name}-private-route"))
                    .parent(name)
                    .prop("route_table_id", private_rt.attr_string("id"))
                    .prop("destination_cidr_block", "0.0.0.0/0")
                    .prop("nat_gateway_id", nat_id.clone()),
            );
            for (index, subnet_id) in private_subnet_ids.iter().enumerate() {
                engine.declare(
                    ResourceSpec::new(
                        "ec2/route-table-association",
                        format!("{name}-private-rta-{}", index + 1),
                    )
                    .parent(name)
                    .prop("subnet_id", subnet_id.clone())
                    .prop("route_table_id", private_rt.attr_string("id")),
                );
            }
        }

        let compute_sg = engine.declare(
            ResourceSpec::new("ec2/security-group", format!("{name}-compute-sg"))
                .parent(name)
                .prop("vpc_id", vpc_id.clone())
                .prop("description", "Compute instances")
                .prop("tags", tags_with_name(tags, &format!("{name}-compute-sg"))),
        );
        let compute_sg_id = compute_sg.attr_string("id");
        for (port, label) in COMPUTE_INGRESS {
            engine.declare(
                ResourceSpec::new(
                    "ec2/security-group-rule",
                    format!("{name}-compute-ingress-{label}"),
                )
                .parent(name)
                .prop("security_group_id", compute_sg_id.clone())
                .prop("type", "ingress")
                .prop("protocol", "tcp")
                .prop("from_port", port)
                .prop("to_port", port)
                .prop("cidr_blocks", Input::list([Input::from("0.0.0.0/0")])),
            );
        }
        engine.declare(
            ResourceSpec::new("ec2/security-group-rule", format!("{name}-compute-egress"))
                .parent(name)
                .prop("security_group_id", compute_sg_id.clone())
                .prop("type", "egress")
                .prop("protocol", "-1")
                .prop("from_port", 0_u16)
                .prop("to_port", 0_u16)
                .prop("cidr_blocks", Input::list([Input::from("0.0.0.0/0")])),
        );

        let store_sg = engine.declare(
            ResourceSpec::new("ec2/security-group", format!("{name}-store-sg"))
                .parent(name)
                .prop("vpc_id", vpc_id.clone())
                .prop("description", "Relational store")
                .prop("tags", tags_with_name(tags, &format!("{name}-store-sg"))),
        );
        let store_sg_id = store_sg.attr_string("id");
        engine.declare(
            ResourceSpec::new("ec2/security-group-rule", format!("{name}-store-ingress-db"))
                .parent(name)
                .prop("security_group_id", store_sg_id.clone())
                .prop("type", "ingress")
                .prop("protocol", "tcp")
                .prop("from_port", 5432_u16)
                .prop("to_port", 5432_u16)
                .prop("source_security_group_id", compute_sg_id.clone()),
        );
        engine.declare(
            ResourceSpec::new("ec2/security-group-rule", format!("{name}-store-egress"))
                .parent(name)
                .prop("security_group_id", store_sg_id.clone())
                .prop("type", "egress")
                .prop("protocol", "-1")
                .prop("from_port", 0_u16)
                .prop("to_port", 0_u16)
                .prop("cidr_blocks", Input::list([Input::from("0.0.0.0/0")])),
        );

        Ok(Self {
            vpc_id,
            public_subnet_ids,
            private_subnet_ids,
            compute_security_group_id: compute_sg_id,
            store_security_group_id: store_sg_id,
            nat_gateway_id,
        })
    }
}

/// First two octets of the VPC CIDR, so subnet blocks live inside it.
fn subnet_base(cidr: &str) -> String {
    let mut octets = cidr.split('.');
    match (octets.next(), octets.next()) {
        (Some(first), Some(second)) => format!("{first}.{second}"),
        _ => "10.0".to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use groundwork_engine::SimulatedCloud;

    fn config(nat: NatGateway) -> NetworkConfig {
        NetworkConfig {
            nat_gateway: nat,
            ..NetworkConfig::default()
        }
    }

    #[tokio::test]
    async fn declares_subnets_per_zone_inside_the_cidr() {
        let cloud = SimulatedCloud::new();
        let network = NetworkComponent::new(
            "demo-network",
            &config(NatGateway::Disabled),
            &BTreeMap::new(),
            &cloud,
        )
        .unwrap();

        assert_eq!(network.public_subnet_ids.len(), 2);
        assert_eq!(network.private_subnet_ids.len(), 2);

        cloud.run().await.unwrap();
        let records = cloud.records();
        let cidrs: Vec<_> = records
            .iter()
            .filter(|record| record.kind == "ec2/subnet")
            .map(|record| record.name.clone())
            .collect();
        assert_eq!(cidrs.len(), 4);
    }

    #[tokio::test]
    async fn nat_disabled_means_no_nat_output_and_no_private_route() {
        let cloud = SimulatedCloud::new();
        let network = NetworkComponent::new(
            "demo-network",
            &config(NatGateway::Disabled),
            &BTreeMap::new(),
            &cloud,
        )
        .unwrap();

        assert!(network.nat_gateway_id.is_none());
        assert!(
            cloud
                .records()
                .iter()
                .all(|record| record.kind != "ec2/nat-gateway")
        );
        assert!(
            cloud
                .records()
                .iter()
                .all(|record| record.name != "demo-network-private-rt")
        );
    }

    #[tokio::test]
    async fn nat_enabled_declares_eip_and_private_routes() {
        let cloud = SimulatedCloud::new();
        let network = NetworkComponent::new(
            "demo-network",
            &config(NatGateway::Enabled),
            &BTreeMap::new(),
            &cloud,
        )
        .unwrap();

        assert!(network.nat_gateway_id.is_some());
        cloud.verify_order().unwrap();
        cloud.run().await.unwrap();
        let nat_id = network.nat_gateway_id.unwrap().resolve().await;
        assert!(nat_id.starts_with("nat-"));
    }
}
