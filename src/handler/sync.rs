//! The fetch → decrypt → remap → write pipeline run by Create and Update.

use serde_json::Value;
use tracing::{debug, info};

use super::Provider;
use crate::error::SyncError;
use crate::event::SecretProperties;
use crate::mapping::resolve_mappings;
use crate::services::{Decryptor, ObjectStore, SecretStore};

impl<O, D, S> Provider<O, D, S>
where
    O: ObjectStore,
    D: Decryptor,
    S: SecretStore,
{
    /// Runs the pipeline once. Each stage completes before the next starts.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncError`] naming the stage that failed. Individual
    /// mapping failures are not errors; those fields are written as `null`.
    #[tracing::instrument(
        skip(self, props),
        fields(secret_arn = %props.secret_arn, bucket = %props.s3_bucket, key = %props.s3_path)
    )]
    pub async fn sync_secret(&self, props: &SecretProperties) -> Result<(), SyncError> {
        info!("Getting object from S3");
        let ciphertext = self
            .object_store
            .get_object(&props.s3_bucket, &props.s3_path)
            .await
            .map_err(|source| SyncError::Fetch {
                bucket: props.s3_bucket.clone(),
                key: props.s3_path.clone(),
                source,
            })?;

        let file_type = props.file_type();
        info!(file_type, kms_key = ?props.kms_key_arn, "Decoding with sops");
        let document = self
            .decryptor
            .decrypt(&ciphertext, file_type, props.kms_key_arn.as_deref())
            .await
            .map_err(|source| SyncError::Decrypt {
                file_type: file_type.to_string(),
                source,
            })?;
        debug!("Successfully decoded secret data");

        let secret_string = build_secret_string(&document, props)
            .map_err(|source| SyncError::Encode {
                secret_id: props.secret_arn.clone(),
                source,
            })?;

        info!(
            whole_file = props.whole_file,
            "Writing decoded data to Secrets Manager"
        );
        self.secret_store
            .put_secret_value(&props.secret_arn, &secret_string)
            .await
            .map_err(|source| SyncError::Write {
                secret_id: props.secret_arn.clone(),
                source,
            })?;

        info!("Wrote data to Secrets Manager");
        Ok(())
    }
}

/// The secret string for a decrypted document.
///
/// Whole-file secrets take the document's `data` field verbatim (empty when
/// absent). Otherwise the mappings are resolved into a flat JSON object with
/// `null` for every field that could not be resolved.
///
/// # Errors
///
/// Returns an error if the resolved fields cannot be serialized.
pub fn build_secret_string(
    document: &Value,
    props: &SecretProperties,
) -> serde_json::Result<String> {
    if props.whole_file {
        let data = document.get("data").and_then(Value::as_str);
        return Ok(data.unwrap_or_default().to_string());
    }

    let resolved = resolve_mappings(document, &props.mappings);
    serde_json::to_string(&resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::parse_mappings;
    use serde_json::json;

    fn props(mappings: &str, whole_file: bool) -> SecretProperties {
        SecretProperties {
            kms_key_arn: None,
            s3_bucket: "bucket".to_string(),
            s3_path: "secrets.yaml".to_string(),
            mappings: parse_mappings(mappings).unwrap(),
            secret_arn: "arn:secret".to_string(),
            source_hash: None,
            file_type: None,
            whole_file,
        }
    }

    #[test]
    fn test_build_mapped_secret_string() {
        let doc = json!({"a": "abc", "nested": {"n": 1}});
        let mappings = r#"{
            "key": {"path": ["a"]},
            "obj": {"path": ["nested"], "encoding": "json"},
            "gone": {"path": ["z"]}
        }"#;
        let written = build_secret_string(&doc, &props(mappings, false)).unwrap();

        assert_eq!(written, r#"{"gone":null,"key":"abc","obj":"{\"n\": 1}"}"#);
    }

    #[test]
    fn test_build_whole_file_secret_string() {
        let doc = json!({"data": "line1\nline2\n"});
        let written = build_secret_string(&doc, &props("{}", true)).unwrap();
        assert_eq!(written, "line1\nline2\n");
    }

    #[test]
    fn test_build_whole_file_without_data_is_empty() {
        let doc = json!({"other": "x"});
        let written = build_secret_string(&doc, &props("{}", true)).unwrap();
        assert_eq!(written, "");
    }

    #[test]
    fn test_build_with_no_mappings_is_empty_object() {
        let doc = json!({"a": 1});
        let written = build_secret_string(&doc, &props("{}", false)).unwrap();
        assert_eq!(written, "{}");
    }
}
