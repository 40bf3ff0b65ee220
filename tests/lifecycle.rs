use serde_json::{Value, json};
use sops_secrets_provider::config::HandlerConfig;
use sops_secrets_provider::error::HandlerError;
use sops_secrets_provider::event::CustomResourceEvent;
use sops_secrets_provider::handler::Provider;
use sops_secrets_provider::services::{Decryptor, ObjectStore, SecretStore};
use std::sync::{Arc, Mutex};

const SECRET_ARN: &str = "arn:aws:secretsmanager:eu-west-1:123456789012:secret:app-AbCdEf";

/// Shared call log so the test can see the order of collaborator calls.
type CallLog = Arc<Mutex<Vec<String>>>;

struct RecordingStore {
    log: CallLog,
}

#[async_trait::async_trait]
impl ObjectStore for RecordingStore {
    async fn get_object(&self, bucket: &str, key: &str) -> anyhow::Result<Vec<u8>> {
        self.log
            .lock()
            .unwrap()
            .push(format!("get_object {bucket} {key}"));
        Ok(b"database: ENC[AES256_GCM,data:...]".to_vec())
    }
}

struct FixtureDecryptor {
    log: CallLog,
    plaintext: Value,
}

#[async_trait::async_trait]
impl Decryptor for FixtureDecryptor {
    async fn decrypt(
        &self,
        _data: &[u8],
        input_type: &str,
        kms_key: Option<&str>,
    ) -> anyhow::Result<Value> {
        self.log
            .lock()
            .unwrap()
            .push(format!("decrypt {input_type} {kms_key:?}"));
        Ok(self.plaintext.clone())
    }
}

struct RecordingSecrets {
    log: CallLog,
    written: Arc<Mutex<Option<(String, String)>>>,
}

#[async_trait::async_trait]
impl SecretStore for RecordingSecrets {
    async fn put_secret_value(&self, secret_id: &str, secret_string: &str) -> anyhow::Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("put_secret_value {secret_id}"));
        *self.written.lock().unwrap() = Some((secret_id.to_string(), secret_string.to_string()));
        Ok(())
    }
}

struct Harness {
    provider: Provider<RecordingStore, FixtureDecryptor, RecordingSecrets>,
    log: CallLog,
    written: Arc<Mutex<Option<(String, String)>>>,
}

fn harness() -> Harness {
    let log = CallLog::default();
    let written = Arc::new(Mutex::new(None));
    let plaintext: Value = serde_json::from_str(include_str!("fixtures/decrypted.json"))
        .expect("fixture is JSON");

    let provider = Provider::new(
        RecordingStore { log: log.clone() },
        FixtureDecryptor {
            log: log.clone(),
            plaintext,
        },
        RecordingSecrets {
            log: log.clone(),
            written: written.clone(),
        },
        HandlerConfig {
            sops_binary: "sops".into(),
            fail_on_sync_error: true,
        },
    );

    Harness {
        provider,
        log,
        written,
    }
}

fn create_event() -> CustomResourceEvent {
    serde_json::from_str(include_str!("fixtures/create_event.json"))
        .expect("fixture is an event")
}

fn calls(h: &Harness) -> Vec<String> {
    h.log.lock().unwrap().clone()
}

#[tokio::test]
async fn test_create_runs_pipeline_in_order() {
    let h = harness();
    let response = h.provider.on_event(&create_event()).await.unwrap();

    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({
            "PhysicalResourceId": format!("secretdata_{SECRET_ARN}"),
            "Data": {}
        })
    );
    assert_eq!(
        calls(&h),
        vec![
            "get_object cdk-assets assets/secrets.yaml".to_string(),
            "decrypt yaml None".to_string(),
            format!("put_secret_value {SECRET_ARN}"),
        ]
    );
}

#[tokio::test]
async fn test_create_writes_flat_document_with_every_field() {
    let h = harness();
    h.provider.on_event(&create_event()).await.unwrap();

    let (_, secret_string) = h.written.lock().unwrap().clone().unwrap();
    let secret: Value = serde_json::from_str(&secret_string).unwrap();

    assert_eq!(
        secret,
        json!({
            "db_user": "app",
            "db_password": "hunter2",
            "db_port": "5432",
            "replica": "db-replica-2",
            "api_keys": "{\"primary\": \"pk_live_1\", \"secondary\": \"pk_live_2\"}",
            "missing": null,
            "bad_encoding": null,
            "first_replica": "db-replica-1",
            "no_path": null
        })
    );
}

#[tokio::test]
async fn test_update_passes_kms_key_and_keeps_id() {
    let h = harness();
    let mut event = create_event();
    event.request_type = "Update".to_string();
    event.physical_resource_id = Some("secretdata_original".to_string());
    if let Some(props) = event.resource_properties.as_mut() {
        props["KMSKeyArn"] = json!("arn:aws:kms:eu-west-1:123456789012:key/abc");
        props["FileType"] = json!("json");
    }

    let response = h.provider.on_event(&event).await.unwrap();

    assert_eq!(response.physical_resource_id, "secretdata_original");
    let kms_call = r#"decrypt json Some("arn:aws:kms:eu-west-1:123456789012:key/abc")"#;
    assert!(calls(&h).contains(&kms_call.to_string()));
}

#[tokio::test]
async fn test_whole_file_writes_data_field() {
    let h = harness();
    let mut event = create_event();
    if let Some(props) = event.resource_properties.as_mut() {
        props["WholeFile"] = json!(true);
        props["Mappings"] = json!("{}");
    }

    h.provider.on_event(&event).await.unwrap();

    // json input type is implied and the fixture has no `data` field
    assert!(calls(&h).contains(&"decrypt json None".to_string()));
    let (_, secret_string) = h.written.lock().unwrap().clone().unwrap();
    assert_eq!(secret_string, "");
}

#[tokio::test]
async fn test_delete_touches_nothing() {
    let h = harness();
    let event: CustomResourceEvent = serde_json::from_value(json!({
        "RequestType": "Delete",
        "PhysicalResourceId": "abc123"
    }))
    .unwrap();

    let response = h.provider.on_event(&event).await.unwrap();

    assert_eq!(response.physical_resource_id, "abc123");
    assert!(response.data.is_empty());
    assert!(calls(&h).is_empty());
}

#[tokio::test]
async fn test_bogus_request_type_is_distinct_fatal_error() {
    let h = harness();
    let mut event = create_event();
    event.request_type = "Bogus".to_string();

    let err = h.provider.on_event(&event).await.unwrap_err();

    assert!(matches!(err, HandlerError::InvalidRequestType(_)));
    assert_eq!(err.error_type(), "InvalidRequestType");
    assert!(calls(&h).is_empty());
}
