//! Deployment orchestration.
//!
//! [`deploy`] is an explicit, hand-verified sequence — not a generic
//! topological sort. Each builder runs exactly once, synchronously, and
//! later builders receive earlier builders' output handles as inputs.
//! The sequence must respect every dependency edge; the engine's ledger
//! check (`verify_order`) exists so any future reordering that breaks an
//! edge is caught by a test instead of a deployment.
//!
//! Declaration order:
//!
//! 1. network
//! 2. object store, registry (network-independent)
//! 3. database-password secret
//! 4. relational store (private subnets + store security group)
//! 5. identity role (bucket, database, and repository ARN handles — the
//!    database ARN is unresolved here and stays a handle)
//! 6. bootstrap script (deferred composite)
//! 7. compute instance
//! 8. DNS zone + certificate, only when a domain is configured
//! 9. exports
//!
//! Any builder failure aborts the whole declaration immediately; nothing
//! is retained or rolled back here. Remote-side partial failure is the
//! engine's responsibility.

use groundwork_core::Provisioner;
use tracing::info;

use crate::bootstrap::{self, BootstrapParams};
use crate::components::{
    CertificateComponent, ComputeComponent, DatabaseComponent, DnsZoneComponent,
    IdentityComponent, NetworkComponent, ObjectStoreComponent, RegistryComponent,
    SecretParameter,
};
use crate::config::StackConfig;
use crate::error::Result;
use crate::outputs;

/// TTL of the `A` record pointing the domain at the instance.
const DNS_TTL: u32 = 300;

/// The optional DNS branch: zone plus certificate.
pub struct DnsBranch {
    /// Domain the branch was taken for.
    pub domain_name: String,
    /// Hosted zone.
    pub zone: DnsZoneComponent,
    /// DNS-validated certificate.
    pub certificate: CertificateComponent,
}

/// Every component of a declared deployment, in declaration order.
pub struct StackComponents {
    /// Network component.
    pub network: NetworkComponent,
    /// Object-store component.
    pub object_store: ObjectStoreComponent,
    /// Registry component.
    pub registry: RegistryComponent,
    /// Database-password secret.
    pub secret: SecretParameter,
    /// Relational-store component.
    pub database: DatabaseComponent,
    /// Identity component.
    pub identity: IdentityComponent,
    /// Compute component.
    pub compute: ComputeComponent,
    /// DNS zone and certificate; `None` when no domain is configured.
    pub dns: Option<DnsBranch>,
}

/// Declare the whole deployment against `engine`.
///
/// # Errors
///
/// The configuration's validation error, or the first builder rejection.
/// Either way the declaration aborts as a whole.
pub fn deploy(engine: &dyn Provisioner, config: &StackConfig) -> Result<StackComponents> {
    config.validate()?;
    let stack = &config.stack;
    let tags = config.base_tags();
    info!(stack = %stack, environment = %config.environment(), "declaring deployment");

    let network = NetworkComponent::new(
        &format!("{stack}-network"),
        &config.network,
        &tags,
        engine,
    )?;

    let object_store = ObjectStoreComponent::new(
        &format!("{stack}-storage"),
        &config.object_store,
        &tags,
        engine,
    )?;

    let registry = RegistryComponent::new(
        &format!("{stack}-registry"),
        &config.registry_name(),
        &config.registry,
        &tags,
        engine,
    )?;

    let secret = SecretParameter::db_password(stack, &config.database.password, engine)?;

    let database = DatabaseComponent::new(
        &format!("{stack}-database"),
        &config.database,
        &network.private_subnet_ids,
        network.store_security_group_id.clone(),
        &tags,
        engine,
    )?;

    let identity = IdentityComponent::new(
        &format!("{stack}-iam"),
        &config.identity,
        vec![object_store.bucket_arn.clone()],
        // Unresolved at this point; the policy document reads it later.
        database.instance_arn.clone(),
        registry.repository_arn.clone(),
        &tags,
        engine,
    )?;

    let user_data = bootstrap::script(
        registry.repository_url.clone(),
        object_store.bucket_name.clone(),
        database.address.clone(),
        BootstrapParams {
            stack: stack.clone(),
            database_name: database.database_name.clone(),
            image_tag: config.compute.image_tag.clone(),
        },
    );

    let compute = ComputeComponent::new(
        &format!("{stack}-server"),
        &config.compute,
        network.public_subnet_ids[0].clone(),
        network.compute_security_group_id.clone(),
        identity.instance_profile_name.clone(),
        user_data,
        &tags,
        engine,
    )?;

    let dns = match &config.domain_name {
        Some(domain) => {
            let zone = DnsZoneComponent::new(&format!("{stack}-dns"), domain, engine)?;
            zone.a_record(domain, compute.public_ip.clone(), DNS_TTL, engine);
            let certificate = CertificateComponent::new(
                &format!("{stack}-ssl"),
                domain,
                zone.zone_id.clone(),
                engine,
            )?;
            Some(DnsBranch {
                domain_name: domain.clone(),
                zone,
                certificate,
            })
        }
        None => None,
    };

    let components = StackComponents {
        network,
        object_store,
        registry,
        secret,
        database,
        identity,
        compute,
        dns,
    };
    outputs::export(engine, &components);
    Ok(components)
}
