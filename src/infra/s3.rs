use anyhow::{Context, Result};

use crate::services::ObjectStore;

/// Fetches encrypted sources from S3.
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    /// Creates a store using the ambient AWS configuration already loaded by
    /// `aws_config::load_from_env`.
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(config),
        }
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3ObjectStore {
    #[tracing::instrument(skip(self))]
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("S3 GetObject failed for 's3://{bucket}/{key}'"))?;

        let body = resp
            .body
            .collect()
            .await
            .with_context(|| format!("reading body of 's3://{bucket}/{key}' failed"))?
            .into_bytes();

        tracing::debug!(bytes = body.len(), "Object fetched");
        Ok(body.to_vec())
    }
}
