//! Secret parameter: the database password in the secrets store.
//!
//! The parameter name is a boot-time contract: the instance bootstrap
//! script reads `/groundwork/<stack>/db_password` to hand the container
//! its database credentials, so the name written here and the name the
//! script reads must never drift apart.

use tracing::info;

use groundwork_core::{Output, Provisioner, ResourceSpec};

use crate::error::Result;

/// Prefix under which all stack secrets are stored.
pub const SECRET_PREFIX: &str = "/groundwork";

/// The conventional name of the database-password secret for a stack.
#[must_use]
pub fn db_password_name(stack: &str) -> String {
    format!("{SECRET_PREFIX}/{stack}/db_password")
}

/// Declared secret parameter.
pub struct SecretParameter {
    /// Full parameter name.
    pub name: Output<String>,
}

impl SecretParameter {
    /// Write the database password under the conventional name.
    ///
    /// # Errors
    ///
    /// Never fails today; see the builder contract note on
    /// [`super::network::NetworkComponent::new`].
    pub fn db_password(stack: &str, password: &str, engine: &dyn Provisioner) -> Result<Self> {
        let parameter = db_password_name(stack);
        info!(parameter = %parameter, "declaring secret parameter");

        let resource = engine.declare(
            ResourceSpec::new("ssm/parameter", format!("{stack}-db-password"))
                .prop("name", parameter)
                .prop("type", "SecureString")
                .prop("value", password),
        );
        Ok(Self {
            name: resource.attr_string("name"),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use groundwork_engine::SimulatedCloud;

    #[tokio::test]
    async fn parameter_follows_the_naming_convention() {
        let cloud = SimulatedCloud::new();
        let secret = SecretParameter::db_password("demo", "hunter2hunter2", &cloud).unwrap();

        cloud.run().await.unwrap();
        assert_eq!(
            secret.name.resolve().await,
            "/groundwork/demo/db_password"
        );
    }
}
