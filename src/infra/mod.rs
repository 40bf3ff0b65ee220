//! AWS and sops backed implementations of the `crate::services` traits.

mod s3;
mod secretsmanager;
mod sops;

pub use s3::S3ObjectStore;
pub use secretsmanager::SecretsManagerStore;
pub use sops::{SopsDecryptor, sops_args};
