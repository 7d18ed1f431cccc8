//! Instance bootstrap script, composed from unresolved handles.
//!
//! The script interpolates three values that do not exist until remote
//! resources are created — the registry URL, the bucket name, and the
//! database address — plus compile-time scalars. Because the three arrive
//! asynchronously and in no particular order, the script is a deferred
//! composite: [`script`] joins the handles and applies the pure
//! [`render`] exactly once, when all of them hold final values.
//!
//! The environment block the container receives is a boot-time contract
//! shared with the API crate's settings: `AWS_REGION`, `S3_BUCKET_NAME`,
//! `DB_HOST`, `DB_PORT`, `DB_NAME`, `DB_USER`, and `DB_PASSWORD` (read
//! from the secrets store by stack name).

use groundwork_core::Output;

use crate::components::database::DB_USER;
use crate::components::secret::db_password_name;

/// Compile-time inputs to the script, known before any declaration.
#[derive(Debug, Clone)]
pub struct BootstrapParams {
    /// Stack name; selects the database-password secret.
    pub stack: String,
    /// Database name handed to the container.
    pub database_name: String,
    /// Image tag to run; `latest` when absent.
    pub image_tag: Option<String>,
}

/// Join the three resource handles and render the script once all of
/// them have resolved, in whatever order they arrive.
pub fn script(
    registry_url: Output<String>,
    bucket_name: Output<String>,
    database_address: Output<String>,
    params: BootstrapParams,
) -> Output<String> {
    Output::all(vec![registry_url, bucket_name, database_address]).map(move |values| {
        match values.as_slice() {
            [registry, bucket, database] => render(registry, bucket, database, &params),
            // all() yields exactly as many values as inputs.
            _ => String::new(),
        }
    })
}

/// Render the bootstrap script from final values.
#[must_use]
pub fn render(
    registry_url: &str,
    bucket_name: &str,
    database_address: &str,
    params: &BootstrapParams,
) -> String {
    let image_tag = params.image_tag.as_deref().unwrap_or("latest");
    let secret_name = db_password_name(&params.stack);
    let database_name = &params.database_name;

    format!(
        r#"#!/bin/bash
exec > >(tee /var/log/bootstrap.log | logger -t bootstrap -s 2>/dev/console) 2>&1
set -x

yum update -y || true
yum install -y docker aws-cli || exit 1
systemctl enable --now docker || exit 1
usermod -aG docker ec2-user

AWS_REGION=$(curl -s http://169.254.169.254/latest/meta-data/placement/region)

aws ecr get-login-password --region "$AWS_REGION" \
  | docker login --username AWS --password-stdin {registry_url} || exit 1

DB_PASSWORD=$(aws ssm get-parameter --name {secret_name} --with-decryption \
  --query 'Parameter.Value' --output text 2>/dev/null || echo '')
if [ -z "$DB_PASSWORD" ]; then
  echo "WARNING: database password not found in the secrets store"
fi

docker pull {registry_url}:{image_tag} || exit 1
docker rm -f app 2>/dev/null || true
docker run -d --name app --restart unless-stopped -p 8000:8000 \
  -e AWS_REGION=$AWS_REGION \
  -e S3_BUCKET_NAME={bucket_name} \
  -e DB_HOST={database_address} \
  -e DB_PORT=5432 \
  -e DB_NAME={database_name} \
  -e DB_USER={DB_USER} \
  -e DB_PASSWORD="$DB_PASSWORD" \
  {registry_url}:{image_tag}
"#
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    fn params() -> BootstrapParams {
        BootstrapParams {
            stack: "demo".to_string(),
            database_name: "appdb".to_string(),
            image_tag: None,
        }
    }

    #[test]
    fn environment_block_carries_the_inputs_verbatim() {
        let rendered = render("r.example/repo", "b1", "db.local", &params());
        assert!(rendered.contains("S3_BUCKET_NAME=b1"));
        assert!(rendered.contains("DB_HOST=db.local"));
        assert!(rendered.contains("DB_NAME=appdb"));
        assert!(rendered.contains("DB_USER=dbadmin"));
        assert!(rendered.contains("--name /groundwork/demo/db_password"));
    }

    #[test]
    fn absent_image_tag_falls_back_to_latest() {
        let rendered = render("r.example/repo", "b1", "db.local", &params());
        assert!(rendered.contains("r.example/repo:latest"));
        assert!(!rendered.contains("None"));

        let tagged = render(
            "r.example/repo",
            "b1",
            "db.local",
            &BootstrapParams {
                image_tag: Some("v3".to_string()),
                ..params()
            },
        );
        assert!(tagged.contains("r.example/repo:v3"));
    }

    #[tokio::test]
    async fn script_resolves_from_final_values() {
        let registry = Output::ready("r.example/repo".to_string());
        let bucket = Output::ready("b1".to_string());
        let database = Output::ready("db.local".to_string());
        let rendered = script(registry, bucket, database, params()).resolve().await;
        assert!(rendered.starts_with("#!/bin/bash"));
        assert!(rendered.contains("DB_HOST=db.local"));
    }
}
