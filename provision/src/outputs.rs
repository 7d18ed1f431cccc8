//! Output aggregation.
//!
//! After orchestration the deployment's externally interesting attributes
//! are exported as one flat, named mapping. The required keys are always
//! present; the DNS keys exist exactly when the optional branch was
//! taken.

use groundwork_core::{Output, Provisioner};
use serde_json::Value;

use crate::stack::StackComponents;

/// Keys exported for every deployment.
pub const REQUIRED_KEYS: [&str; 8] = [
    "vpc_id",
    "s3_bucket_name",
    "rds_endpoint",
    "rds_address",
    "ecr_repository_url",
    "ecr_repository_name",
    "ec2_public_ip",
    "ec2_instance_id",
];

/// Keys exported only when the DNS branch was taken.
pub const DNS_KEYS: [&str; 2] = ["domain_name", "route53_zone_id"];

fn as_value(output: &Output<String>) -> Output<Value> {
    output.map(Value::String)
}

/// Register the deployment's exported outputs with the engine.
pub fn export(engine: &dyn Provisioner, components: &StackComponents) {
    engine.export("vpc_id", as_value(&components.network.vpc_id));
    engine.export("s3_bucket_name", as_value(&components.object_store.bucket_name));
    engine.export("rds_endpoint", as_value(&components.database.endpoint));
    engine.export("rds_address", as_value(&components.database.address));
    engine.export(
        "ecr_repository_url",
        as_value(&components.registry.repository_url),
    );
    engine.export(
        "ecr_repository_name",
        as_value(&components.registry.repository_name),
    );
    engine.export("ec2_public_ip", as_value(&components.compute.public_ip));
    engine.export("ec2_instance_id", as_value(&components.compute.instance_id));

    if let Some(dns) = &components.dns {
        engine.export(
            "domain_name",
            Output::ready(Value::String(dns.domain_name.clone())),
        );
        engine.export("route53_zone_id", as_value(&dns.zone.zone_id));
    }
}
