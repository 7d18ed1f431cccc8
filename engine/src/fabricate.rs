//! Deterministic attribute fabrication.
//!
//! Stand-in for the remote side of resource creation: given a kind, the
//! resolved desired-state properties, and a creation sequence number,
//! produce the attributes a real engine would report back. Desired-state
//! properties are echoed into the attribute map; computed identifiers use
//! the sequence number so repeated runs are reproducible. Addresses use
//! documentation address space (TEST-NET-2/3), which also guarantees an
//! elastic address never collides with an instance's own address.

use serde_json::{Value, json};

use groundwork_core::AttrMap;

const REGION: &str = "us-east-1";
const ACCOUNT: &str = "123456789012";

fn str_prop<'a>(props: &'a AttrMap, key: &str) -> Option<&'a str> {
    props.get(key).and_then(Value::as_str)
}

fn octet(sequence: u64) -> u64 {
    1 + sequence % 254
}

pub(crate) fn attributes(kind: &str, name: &str, props: &AttrMap, sequence: u64) -> AttrMap {
    let mut attrs = props.clone();

    let computed = match kind {
        "ec2/vpc" => {
            let id = format!("vpc-{sequence:06x}");
            json!({
                "id": id,
                "arn": format!("arn:aws:ec2:{REGION}:{ACCOUNT}:vpc/{id}"),
            })
        }
        "ec2/internet-gateway" => json!({ "id": format!("igw-{sequence:06x}") }),
        "ec2/subnet" => json!({ "id": format!("subnet-{sequence:06x}") }),
        "ec2/route-table" => json!({ "id": format!("rtb-{sequence:06x}") }),
        "ec2/route-table-association" => {
            json!({ "id": format!("rtbassoc-{sequence:06x}") })
        }
        "ec2/security-group" => json!({ "id": format!("sg-{sequence:06x}") }),
        "ec2/eip" => json!({
            "id": format!("eipalloc-{sequence:06x}"),
            "public_ip": format!("198.51.100.{}", octet(sequence)),
        }),
        "ec2/eip-association" => json!({ "id": format!("eipassoc-{sequence:06x}") }),
        "ec2/nat-gateway" => json!({ "id": format!("nat-{sequence:06x}") }),
        "ec2/instance" => {
            let mut instance = json!({
                "id": format!("i-{sequence:06x}"),
                "private_ip": format!("10.0.1.{}", 9 + octet(sequence)),
            });
            let public = props
                .get("associate_public_ip")
                .and_then(Value::as_bool)
                .unwrap_or(true);
            if public {
                instance["public_ip"] = json!(format!("203.0.113.{}", octet(sequence)));
            }
            instance
        }
        "s3/bucket" => {
            let bucket = str_prop(props, "bucket").unwrap_or(name).to_string();
            json!({
                "id": bucket,
                "bucket": bucket,
                "arn": format!("arn:aws:s3:::{bucket}"),
                "bucket_regional_domain_name":
                    format!("{bucket}.s3.{REGION}.amazonaws.com"),
            })
        }
        "rds/subnet-group" => {
            let group = str_prop(props, "name").unwrap_or(name).to_string();
            json!({
                "id": group,
                "name": group,
                "arn": format!("arn:aws:rds:{REGION}:{ACCOUNT}:subgrp:{group}"),
            })
        }
        "rds/instance" => {
            let identifier = str_prop(props, "identifier").unwrap_or(name).to_string();
            let port = props.get("port").and_then(Value::as_u64).unwrap_or(5432);
            let address = format!("{identifier}.{sequence:06x}.{REGION}.rds.amazonaws.com");
            json!({
                "id": format!("db-{sequence:06x}"),
                "arn": format!("arn:aws:rds:{REGION}:{ACCOUNT}:db:{identifier}"),
                "address": address,
                "port": port,
                "endpoint": format!("{address}:{port}"),
            })
        }
        "ecr/repository" => {
            let repository = str_prop(props, "name").unwrap_or(name).to_string();
            json!({
                "id": repository,
                "name": repository,
                "arn": format!("arn:aws:ecr:{REGION}:{ACCOUNT}:repository/{repository}"),
                "repository_url":
                    format!("{ACCOUNT}.dkr.ecr.{REGION}.amazonaws.com/{repository}"),
            })
        }
        "iam/role" => {
            let role = str_prop(props, "name").unwrap_or(name).to_string();
            json!({
                "id": role,
                "name": role,
                "arn": format!("arn:aws:iam::{ACCOUNT}:role/{role}"),
            })
        }
        "iam/instance-profile" => {
            let profile = str_prop(props, "name").unwrap_or(name).to_string();
            json!({
                "id": profile,
                "name": profile,
                "arn": format!("arn:aws:iam::{ACCOUNT}:instance-profile/{profile}"),
            })
        }
        "route53/zone" => json!({
            "id": format!("Z{sequence:08}"),
            "zone_id": format!("Z{sequence:08}"),
            "name_servers": [
                format!("ns-{}.awsdns.simulated", octet(sequence)),
                format!("ns-{}.awsdns.simulated", octet(sequence + 1)),
            ],
        }),
        "route53/record" => json!({
            "id": format!("rec-{sequence:06x}"),
            "fqdn": str_prop(props, "name").unwrap_or(name),
        }),
        "acm/certificate" => json!({
            "id": format!("cert-{sequence:06x}"),
            "arn": format!("arn:aws:acm:{REGION}:{ACCOUNT}:certificate/{sequence:012x}"),
        }),
        "ssm/parameter" => {
            let parameter = str_prop(props, "name").unwrap_or(name).to_string();
            json!({
                "id": parameter,
                "name": parameter,
                "arn": format!("arn:aws:ssm:{REGION}:{ACCOUNT}:parameter{parameter}"),
            })
        }
        _ => {
            let stem = kind.rsplit('/').next().unwrap_or(kind);
            json!({
                "id": format!("{stem}-{sequence:06x}"),
                "arn": format!("arn:aws:sim:{REGION}:{ACCOUNT}:{kind}/{name}"),
            })
        }
    };

    if let Value::Object(map) = computed {
        attrs.extend(map);
    }
    attrs
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    #[test]
    fn bucket_attributes_derive_from_configured_name() {
        let mut props = AttrMap::new();
        props.insert("bucket".into(), json!("assets-prod"));
        let attrs = attributes("s3/bucket", "storage-bucket", &props, 3);
        assert_eq!(attrs["arn"], json!("arn:aws:s3:::assets-prod"));
        assert_eq!(attrs["bucket"], json!("assets-prod"));
    }

    #[test]
    fn instance_without_public_address_has_none() {
        let mut props = AttrMap::new();
        props.insert("associate_public_ip".into(), json!(false));
        let attrs = attributes("ec2/instance", "server-instance", &props, 4);
        assert!(attrs.get("public_ip").is_none());
        assert!(attrs.get("private_ip").is_some());
    }

    #[test]
    fn database_endpoint_joins_address_and_port() {
        let mut props = AttrMap::new();
        props.insert("identifier".into(), json!("app-db"));
        let attrs = attributes("rds/instance", "database-db", &props, 9);
        let address = attrs["address"].as_str().unwrap();
        let endpoint = attrs["endpoint"].as_str().unwrap();
        assert_eq!(endpoint, format!("{address}:5432"));
    }

    #[test]
    fn desired_state_is_echoed() {
        let mut props = AttrMap::new();
        props.insert("cidr_block".into(), json!("10.0.1.0/24"));
        let attrs = attributes("ec2/subnet", "net-public-1", &props, 0);
        assert_eq!(attrs["cidr_block"], json!("10.0.1.0/24"));
        assert!(attrs["id"].as_str().unwrap().starts_with("subnet-"));
    }
}
