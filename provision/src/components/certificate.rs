//! Certificate component, the second half of the optional DNS branch.

use tracing::info;

use groundwork_core::{Output, Provisioner, ResourceSpec};

use crate::error::Result;

/// Declared DNS-validated certificate.
pub struct CertificateComponent {
    /// Certificate ARN.
    pub certificate_arn: Output<String>,
}

impl CertificateComponent {
    /// Declare a certificate for `domain`, validated through the given
    /// hosted zone.
    ///
    /// # Errors
    ///
    /// Never fails today; see the builder contract note on
    /// [`super::network::NetworkComponent::new`].
    pub fn new(
        name: &str,
        domain: &str,
        zone_id: Output<String>,
        engine: &dyn Provisioner,
    ) -> Result<Self> {
        info!(component = %name, domain, "declaring certificate");

        let certificate = engine.declare(
            ResourceSpec::new("acm/certificate", format!("{name}-cert"))
                .parent(name)
                .prop("domain_name", domain)
                .prop("validation_method", "DNS"),
        );
        let certificate_arn = certificate.attr_string("arn");

        engine.declare(
            ResourceSpec::new("acm/certificate-validation", format!("{name}-cert-validation"))
                .parent(name)
                .prop("certificate_arn", certificate_arn.clone())
                .prop("zone_id", zone_id),
        );

        Ok(Self { certificate_arn })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use groundwork_engine::SimulatedCloud;

    #[tokio::test]
    async fn validation_depends_on_certificate_and_zone() {
        let cloud = SimulatedCloud::new();
        let zone_id = Output::pending(
            async { "Z00000001".to_string() },
            std::collections::BTreeSet::from(["demo-dns-zone".to_string()]),
        );
        // The zone is not in this engine's ledger, so order verification
        // must flag the forward reference.
        CertificateComponent::new("demo-ssl", "demo.example.com", zone_id, &cloud).unwrap();
        assert!(cloud.verify_order().is_err());

        let cloud = SimulatedCloud::new();
        let zone = cloud.declare(ResourceSpec::new("route53/zone", "demo-dns-zone"));
        CertificateComponent::new(
            "demo-ssl",
            "demo.example.com",
            zone.attr_string("zone_id"),
            &cloud,
        )
        .unwrap();
        cloud.verify_order().unwrap();
    }
}
