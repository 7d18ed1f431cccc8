//! Relational-store component: subnet group and database instance.

use std::collections::BTreeMap;

use tracing::info;

use groundwork_core::{Input, Output, Provisioner, ResourceSpec};

use crate::config::DatabaseConfig;
use crate::error::Result;

use super::tags_with_name;

/// Master username baked into the instance and the bootstrap contract.
pub const DB_USER: &str = "dbadmin";

/// Declared database and its outputs.
pub struct DatabaseComponent {
    /// `address:port` endpoint.
    pub endpoint: Output<String>,
    /// Hostname without the port.
    pub address: Output<String>,
    /// Instance ARN.
    pub instance_arn: Output<String>,
    /// Instance id.
    pub instance_id: Output<String>,
    /// Database name, known at declaration time.
    pub database_name: String,
}

impl DatabaseComponent {
    /// Declare the subnet group and instance in the private subnets,
    /// reachable only through the store security group.
    ///
    /// # Errors
    ///
    /// Rejects an empty subnet set: the instance must land in the
    /// network's private subnets.
    pub fn new(
        name: &str,
        config: &DatabaseConfig,
        subnet_ids: &[Output<String>],
        security_group_id: Output<String>,
        tags: &BTreeMap<String, String>,
        engine: &dyn Provisioner,
    ) -> Result<Self> {
        if subnet_ids.is_empty() {
            return Err(crate::error::DeclareError::component(
                name,
                "at least one private subnet is required",
            ));
        }
        info!(component = %name, database = %config.name, "declaring relational store");

        let subnet_group = engine.declare(
            ResourceSpec::new("rds/subnet-group", format!("{name}-subnets"))
                .parent(name)
                .prop("name", format!("{name}-subnets"))
                .prop(
                    "subnet_ids",
                    Input::list(subnet_ids.iter().cloned().map(Input::from)),
                )
                .prop("tags", tags_with_name(tags, &format!("{name}-subnets"))),
        );

        let mut spec = ResourceSpec::new("rds/instance", format!("{name}-db"))
            .parent(name)
            .prop("identifier", format!("{name}-db"))
            .prop("engine", config.engine.as_str())
            .prop("instance_class", config.instance_class.as_str())
            .prop("allocated_storage", config.allocated_storage)
            .prop("storage_type", config.storage_type.as_str())
            .prop("db_name", config.name.as_str())
            .prop("username", DB_USER)
            .prop("password", config.password.as_str())
            .prop("port", 5432_u16)
            .prop("db_subnet_group_name", subnet_group.attr_string("name"))
            .prop(
                "vpc_security_group_ids",
                Input::list([Input::from(security_group_id)]),
            )
            .prop("multi_az", config.multi_az)
            .prop("backup_retention_period", config.backup_retention_days)
            .prop("skip_final_snapshot", config.skip_final_snapshot)
            .prop("tags", tags_with_name(tags, &format!("{name}-db")));
        if let Some(version) = &config.engine_version {
            spec = spec.prop("engine_version", version.as_str());
        }
        if !config.skip_final_snapshot {
            spec = spec.prop("final_snapshot_identifier", format!("{name}-final-snapshot"));
        }
        let instance = engine.declare(spec);

        Ok(Self {
            endpoint: instance.attr_string("endpoint"),
            address: instance.attr_string("address"),
            instance_arn: instance.attr_string("arn"),
            instance_id: instance.attr_string("id"),
            database_name: config.name.clone(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use groundwork_core::Output;
    use groundwork_engine::SimulatedCloud;

    fn config() -> DatabaseConfig {
        DatabaseConfig {
            name: "appdb".to_string(),
            password: "hunter2hunter2".to_string(),
            engine: "postgres".to_string(),
            engine_version: None,
            instance_class: "db.t3.micro".to_string(),
            allocated_storage: 20,
            storage_type: "gp3".to_string(),
            multi_az: false,
            backup_retention_days: 7,
            skip_final_snapshot: true,
        }
    }

    #[tokio::test]
    async fn endpoint_is_address_plus_port() {
        let cloud = SimulatedCloud::new();
        let database = DatabaseComponent::new(
            "demo-database",
            &config(),
            &[Output::ready("subnet-a".to_string())],
            Output::ready("sg-1".to_string()),
            &BTreeMap::new(),
            &cloud,
        )
        .unwrap();

        cloud.run().await.unwrap();
        let address = database.address.resolve().await;
        assert_eq!(
            database.endpoint.resolve().await,
            format!("{address}:5432")
        );
    }

    #[test]
    fn empty_subnet_set_is_rejected() {
        let cloud = SimulatedCloud::new();
        let result = DatabaseComponent::new(
            "demo-database",
            &config(),
            &[],
            Output::ready("sg-1".to_string()),
            &BTreeMap::new(),
            &cloud,
        );
        assert!(result.is_err());
        // Nothing was declared before the rejection.
        assert!(cloud.records().is_empty());
    }
}
