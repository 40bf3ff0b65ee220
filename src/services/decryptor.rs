use anyhow::Result;
use serde_json::Value;

/// Decrypts an encrypted document into its JSON plaintext.
#[async_trait::async_trait]
pub trait Decryptor: Send + Sync {
    /// `input_type` is the declared source format (`yaml`, `json`, `dotenv`,
    /// ...). `kms_key` is passed through to the tool when set.
    async fn decrypt(&self, data: &[u8], input_type: &str, kms_key: Option<&str>) -> Result<Value>;
}
