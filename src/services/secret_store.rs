use anyhow::Result;

/// Writes a new value for an existing secret.
#[async_trait::async_trait]
pub trait SecretStore: Send + Sync {
    async fn put_secret_value(&self, secret_id: &str, secret_string: &str) -> Result<()>;
}
