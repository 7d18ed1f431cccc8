//! End-to-end declaration scenarios against the in-memory engine.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

use std::collections::BTreeSet;

use pretty_assertions::assert_eq;
use serde_json::json;

use groundwork_engine::SimulatedCloud;
use groundwork_provision::outputs::{DNS_KEYS, REQUIRED_KEYS};
use groundwork_provision::{StackConfig, deploy};

const BARE_STACK: &str = r"
stack: demo
network:
  nat_gateway: disabled
compute:
  public_address: instance_managed
object_store:
  bucket: demo-assets
database:
  name: appdb
  password: hunter2hunter2
  skip_final_snapshot: true
";

const DOMAIN_STACK: &str = r"
stack: demo
domain_name: demo.example.com
object_store:
  bucket: demo-assets
database:
  name: appdb
  password: hunter2hunter2
";

#[tokio::test]
async fn bare_stack_exports_exactly_the_required_keys() {
    let config = StackConfig::from_yaml_str(BARE_STACK).unwrap();
    let cloud = SimulatedCloud::new();
    let components = deploy(&cloud, &config).unwrap();

    cloud.verify_order().unwrap();
    cloud.run().await.unwrap();

    let exports = cloud.resolved_exports().await;
    let keys: BTreeSet<&str> = exports.keys().map(String::as_str).collect();
    assert_eq!(keys, REQUIRED_KEYS.iter().copied().collect::<BTreeSet<_>>());
    for key in DNS_KEYS {
        assert!(!exports.contains_key(key));
    }

    // No elastic address: the exported public IP is the instance's own.
    assert!(components.compute.elastic_ip.is_none());
    let instance = cloud.created("demo-server-instance").unwrap();
    assert_eq!(exports["ec2_public_ip"], instance["public_ip"]);

    assert_eq!(exports["s3_bucket_name"], json!("demo-assets"));
    assert_eq!(
        exports["rds_endpoint"].as_str().unwrap(),
        format!("{}:5432", exports["rds_address"].as_str().unwrap())
    );
}

#[tokio::test]
async fn domain_stack_exports_dns_keys_and_points_at_the_instance() {
    let config = StackConfig::from_yaml_str(DOMAIN_STACK).unwrap();
    let cloud = SimulatedCloud::new();
    let components = deploy(&cloud, &config).unwrap();

    cloud.verify_order().unwrap();
    cloud.run().await.unwrap();

    let exports = cloud.resolved_exports().await;
    for key in REQUIRED_KEYS.iter().chain(DNS_KEYS.iter()) {
        assert!(exports.contains_key(*key), "missing export `{key}`");
    }
    assert_eq!(exports["domain_name"], json!("demo.example.com"));

    // The A record targets the resolved public address, which with the
    // default descriptor is the elastic IP.
    let record = cloud.created("demo-dns-a-demo.example.com").unwrap();
    let public_ip = components.compute.public_ip.resolve().await;
    assert_eq!(record["records"], json!([public_ip]));
    assert_eq!(record["ttl"], json!(300));
    assert!(public_ip.starts_with("198.51.100."));

    let zone = cloud.created("demo-dns-zone").unwrap();
    assert_eq!(exports["route53_zone_id"], zone["zone_id"]);
}

#[tokio::test]
async fn every_dependency_edge_points_backwards() {
    let config = StackConfig::from_yaml_str(DOMAIN_STACK).unwrap();
    let cloud = SimulatedCloud::new();
    deploy(&cloud, &config).unwrap();

    cloud.verify_order().unwrap();

    // The sequence genuinely carries cross-component edges, so the check
    // above is not vacuous.
    let records = cloud.records();
    let database = records
        .iter()
        .find(|record| record.kind == "rds/instance")
        .unwrap();
    assert!(database.depends_on.contains("demo-network-store-sg"));
    let policy = records
        .iter()
        .find(|record| record.kind == "iam/role-policy")
        .unwrap();
    assert!(policy.depends_on.contains("demo-database-db"));
    assert!(policy.depends_on.contains("demo-registry-repo"));
}

#[tokio::test]
async fn independent_components_read_no_foreign_handles() {
    let config = StackConfig::from_yaml_str(BARE_STACK).unwrap();
    let cloud = SimulatedCloud::new();
    deploy(&cloud, &config).unwrap();

    // The object store and registry are declared with zero upstream
    // dependencies: every edge they record stays inside the component.
    for prefix in ["demo-storage", "demo-registry"] {
        for record in cloud
            .records()
            .iter()
            .filter(|record| record.parent.as_deref() == Some(prefix))
        {
            for dependency in &record.depends_on {
                assert!(
                    dependency.starts_with(prefix),
                    "`{}` reaches outside its component to `{dependency}`",
                    record.name
                );
            }
        }
    }
}

#[test]
fn invalid_descriptor_aborts_before_any_declaration() {
    let config = StackConfig {
        stack: String::new(),
        ..StackConfig::from_yaml_str(BARE_STACK).unwrap()
    };
    let cloud = SimulatedCloud::new();
    assert!(deploy(&cloud, &config).is_err());
    assert!(cloud.records().is_empty());
}
