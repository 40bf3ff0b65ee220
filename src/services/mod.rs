//! Collaborator seams for the secret sync pipeline.
//!
//! [`ObjectStore`] fetches the encrypted source, [`Decryptor`] turns it into
//! a JSON document and [`SecretStore`] receives the flattened result. The
//! AWS and sops implementations live in `crate::infra`.

mod decryptor;
mod object_store;
mod secret_store;

pub use decryptor::Decryptor;
pub use object_store::ObjectStore;
pub use secret_store::SecretStore;
