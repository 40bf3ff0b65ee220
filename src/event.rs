//! Custom-resource event and response types.
//!
//! Only the fields the handler reads are modelled; everything else the
//! platform sends (`ServiceToken`, `ResponseURL`, `StackId`, ...) is ignored.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::error::HandlerError;
use crate::mapping::{Mappings, parse_mappings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Create => "Create",
            RequestType::Update => "Update",
            RequestType::Delete => "Delete",
        }
    }
}

impl FromStr for RequestType {
    type Err = HandlerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Create" => Ok(RequestType::Create),
            "Update" => Ok(RequestType::Update),
            "Delete" => Ok(RequestType::Delete),
            other => Err(HandlerError::InvalidRequestType(other.to_string())),
        }
    }
}

/// An incoming lifecycle event.
///
/// `ResourceProperties` stays untyped here so that a Delete carrying stale or
/// partial properties is still accepted.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceEvent {
    pub request_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_properties: Option<Value>,
}

impl CustomResourceEvent {
    /// Parses the request type.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::InvalidRequestType`] for anything other than
    /// `Create`, `Update` or `Delete`.
    pub fn request_type(&self) -> Result<RequestType, HandlerError> {
        self.request_type.parse()
    }

    /// Decodes and validates the resource properties.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::InvalidProperties`] when a required property
    /// is missing, `Mappings` is not a JSON object, or `WholeFile` is not a
    /// boolean. Individual mapping entries are not checked here.
    pub fn properties(&self) -> Result<SecretProperties, HandlerError> {
        let raw = self
            .resource_properties
            .clone()
            .ok_or_else(|| {
                HandlerError::InvalidProperties("ResourceProperties missing".to_string())
            })?;
        let raw: RawProperties = serde_json::from_value(raw)
            .map_err(|e| HandlerError::InvalidProperties(e.to_string()))?;
        raw.try_into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawProperties {
    #[serde(rename = "KMSKeyArn", default)]
    kms_key_arn: Option<String>,
    s3_bucket: String,
    s3_path: String,
    mappings: String,
    secret_arn: String,
    #[serde(default)]
    source_hash: Option<String>,
    #[serde(default)]
    file_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    whole_file: bool,
}

/// Resource properties for Create and Update.
#[derive(Debug, Clone, PartialEq)]
pub struct SecretProperties {
    pub kms_key_arn: Option<String>,
    pub s3_bucket: String,
    pub s3_path: String,
    pub mappings: Mappings,
    pub secret_arn: String,
    pub source_hash: Option<String>,
    pub file_type: Option<String>,
    pub whole_file: bool,
}

impl TryFrom<RawProperties> for SecretProperties {
    type Error = HandlerError;

    fn try_from(raw: RawProperties) -> Result<Self, Self::Error> {
        let mappings = parse_mappings(&raw.mappings)
            .map_err(|e| HandlerError::InvalidProperties(format!("Mappings: {e}")))?;

        Ok(Self {
            kms_key_arn: non_empty(raw.kms_key_arn),
            s3_bucket: raw.s3_bucket,
            s3_path: raw.s3_path,
            mappings,
            secret_arn: raw.secret_arn,
            source_hash: raw.source_hash,
            file_type: non_empty(raw.file_type),
            whole_file: raw.whole_file,
        })
    }
}

impl SecretProperties {
    /// The sops input type: explicit `FileType`, then `json` for whole-file
    /// secrets, then the extension of `S3Path`.
    pub fn file_type(&self) -> &str {
        if let Some(file_type) = &self.file_type {
            return file_type;
        }
        if self.whole_file {
            return "json";
        }
        self.s3_path
            .rsplit_once('.')
            .map_or(self.s3_path.as_str(), |(_, ext)| ext)
    }

    /// Physical id assigned on Create.
    pub fn physical_resource_id(&self) -> String {
        format!("secretdata_{}", self.secret_arn)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Accepts a JSON boolean or the strings `"true"` / `"false"`; the platform
/// stringifies every property.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(b),
        Some(Value::String(s)) if s == "true" => Ok(true),
        Some(Value::String(s)) if s == "false" => Ok(false),
        Some(other) => Err(serde::de::Error::custom(format!(
            "unexpected value when normalising boolean: {other}"
        ))),
    }
}

/// The value returned to the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceResponse {
    pub physical_resource_id: String,
    pub data: Map<String, Value>,
}

impl CustomResourceResponse {
    pub fn new(physical_resource_id: impl Into<String>) -> Self {
        Self {
            physical_resource_id: physical_resource_id.into(),
            data: Map::new(),
        }
    }
}
