use anyhow::Result;

/// Reads whole objects from a bucket-addressed store (e.g. S3).
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
}
