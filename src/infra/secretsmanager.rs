use anyhow::{Context, Result};

use crate::services::SecretStore;

/// Writes secret values to AWS Secrets Manager.
///
/// The secret must already exist; only `secretsmanager:PutSecretValue` is
/// needed.
pub struct SecretsManagerStore {
    client: aws_sdk_secretsmanager::Client,
}

impl SecretsManagerStore {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_secretsmanager::Client::new(config),
        }
    }
}

#[async_trait::async_trait]
impl SecretStore for SecretsManagerStore {
    #[tracing::instrument(skip(self, secret_string))]
    async fn put_secret_value(&self, secret_id: &str, secret_string: &str) -> Result<()> {
        let resp = self
            .client
            .put_secret_value()
            .secret_id(secret_id)
            .secret_string(secret_string)
            .send()
            .await
            .with_context(|| format!("Secrets Manager PutSecretValue failed for '{secret_id}'"))?;

        tracing::debug!(version_id = ?resp.version_id(), "Secret value written");
        Ok(())
    }
}
