//! One builder per infrastructure kind.
//!
//! A builder is a parent/child grouping: its constructor declares the
//! component's resources (secondary resources included, as an internal
//! detail) under a shared parent name and exposes the component's outputs
//! as public fields. Constructors are synchronous and never wait on
//! resolution; they may fail only by rejecting their own inputs.
//!
//! Optional secondary resources (NAT gateway, elastic IP, lifecycle
//! policy, the DNS branch) follow the descriptor's tagged variants: when a
//! secondary resource is not created, the dependent output field is `None`
//! rather than some unrelated value.

use std::collections::BTreeMap;

use serde_json::{Value, json};

pub mod certificate;
pub mod compute;
pub mod database;
pub mod dns;
pub mod identity;
pub mod network;
pub mod object_store;
pub mod registry;
pub mod secret;

pub use certificate::CertificateComponent;
pub use compute::ComputeComponent;
pub use database::DatabaseComponent;
pub use dns::DnsZoneComponent;
pub use identity::IdentityComponent;
pub use network::NetworkComponent;
pub use object_store::ObjectStoreComponent;
pub use registry::RegistryComponent;
pub use secret::SecretParameter;

/// Base tags plus a `Name` tag, as a literal property value.
fn tags_with_name(base: &BTreeMap<String, String>, name: &str) -> Value {
    let mut tags = base.clone();
    tags.insert("Name".to_string(), name.to_string());
    json!(tags)
}
