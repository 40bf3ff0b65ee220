//! Error types for mapping resolution and lifecycle handling.
//!
//! Per-field errors ([`LookupError`], [`EncodingError`]) never escape the
//! mapping resolver. [`HandlerError`] is what the platform sees.

use thiserror::Error;

use crate::mapping::PathStep;

/// A path step could not be followed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("step {position} ({step}) not found")]
    Missing { position: usize, step: PathStep },

    #[error("step {position} ({step}) applied to a non-indexable {kind}")]
    NotIndexable {
        position: usize,
        step: PathStep,
        kind: &'static str,
    },
}

#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("unsupported encoding: {0}")]
    Unsupported(String),

    #[error("json serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// A stage of the fetch, decrypt, encode, write pipeline failed.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("fetching s3://{bucket}/{key} failed: {source:#}")]
    Fetch {
        bucket: String,
        key: String,
        source: anyhow::Error,
    },

    #[error("decrypting {file_type} document failed: {source:#}")]
    Decrypt {
        file_type: String,
        source: anyhow::Error,
    },

    #[error("encoding secret {secret_id} failed: {source}")]
    Encode {
        secret_id: String,
        source: serde_json::Error,
    },

    #[error("writing secret {secret_id} failed: {source:#}")]
    Write {
        secret_id: String,
        source: anyhow::Error,
    },
}

impl SyncError {
    /// Short stage name used in log fields.
    pub fn stage(&self) -> &'static str {
        match self {
            SyncError::Fetch { .. } => "fetch",
            SyncError::Decrypt { .. } => "decrypt",
            SyncError::Encode { .. } => "encode",
            SyncError::Write { .. } => "write",
        }
    }
}

/// Fatal errors surfaced to the orchestrating platform.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("invalid request type: {0}")]
    InvalidRequestType(String),

    #[error("invalid resource properties: {0}")]
    InvalidProperties(String),

    #[error("PhysicalResourceId is required for {0} requests")]
    MissingPhysicalResourceId(&'static str),

    #[error("secret sync failed: {0}")]
    Sync(#[from] SyncError),
}

impl HandlerError {
    /// Value reported as `errorType` to the Lambda runtime.
    pub fn error_type(&self) -> &'static str {
        match self {
            HandlerError::InvalidRequestType(_) => "InvalidRequestType",
            HandlerError::InvalidProperties(_) => "InvalidProperties",
            HandlerError::MissingPhysicalResourceId(_) => "MissingPhysicalResourceId",
            HandlerError::Sync(_) => "SyncFailed",
        }
    }
}

pub type Result<T> = std::result::Result<T, HandlerError>;
