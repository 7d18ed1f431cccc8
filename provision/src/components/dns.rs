//! DNS zone component, declared only when a domain name is configured.

use tracing::info;

use groundwork_core::{Input, Output, Provisioner, ResourceSpec};

use crate::error::Result;

/// Declared hosted zone.
pub struct DnsZoneComponent {
    component: String,
    /// Zone id.
    pub zone_id: Output<String>,
    /// Name servers delegated to the zone.
    pub name_servers: Output<serde_json::Value>,
}

impl DnsZoneComponent {
    /// Declare a hosted zone for `domain`.
    ///
    /// # Errors
    ///
    /// Never fails today; see the builder contract note on
    /// [`super::network::NetworkComponent::new`].
    pub fn new(name: &str, domain: &str, engine: &dyn Provisioner) -> Result<Self> {
        info!(component = %name, domain, "declaring DNS zone");
        let zone = engine.declare(
            ResourceSpec::new("route53/zone", format!("{name}-zone"))
                .parent(name)
                .prop("name", domain),
        );
        Ok(Self {
            component: name.to_string(),
            zone_id: zone.attr_string("zone_id"),
            name_servers: zone.attr("name_servers"),
        })
    }

    /// Point `record_name` at `target` with an `A` record.
    pub fn a_record(
        &self,
        record_name: &str,
        target: Output<String>,
        ttl: u32,
        engine: &dyn Provisioner,
    ) {
        engine.declare(
            ResourceSpec::new(
                "route53/record",
                format!("{}-a-{record_name}", self.component),
            )
            .parent(&self.component)
            .prop("zone_id", self.zone_id.clone())
            .prop("name", record_name)
            .prop("type", "A")
            .prop("ttl", ttl)
            .prop("records", Input::list([Input::from(target)])),
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use groundwork_engine::SimulatedCloud;

    #[tokio::test]
    async fn a_record_targets_the_given_address() {
        let cloud = SimulatedCloud::new();
        let zone = DnsZoneComponent::new("demo-dns", "demo.example.com", &cloud).unwrap();
        zone.a_record(
            "demo.example.com",
            Output::ready("203.0.113.10".to_string()),
            300,
            &cloud,
        );

        cloud.run().await.unwrap();
        assert!(zone.zone_id.resolve().await.starts_with('Z'));
        let record = cloud
            .records()
            .into_iter()
            .find(|record| record.kind == "route53/record")
            .unwrap();
        assert_eq!(record.name, "demo-dns-a-demo.example.com");
    }
}
