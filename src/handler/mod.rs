//! Lifecycle dispatch for the custom resource.
//!
//! Create and Update run the same sync; Update keeps the existing physical
//! id. Delete never touches a collaborator.

mod sync;

pub use sync::build_secret_string;

use tracing::{error, info, warn};

use crate::config::HandlerConfig;
use crate::error::{HandlerError, Result, SyncError};
use crate::event::{CustomResourceEvent, CustomResourceResponse, RequestType};
use crate::services::{Decryptor, ObjectStore, SecretStore};

/// Explicit collaborator handles for one process lifetime.
pub struct Provider<O, D, S> {
    pub object_store: O,
    pub decryptor: D,
    pub secret_store: S,
    pub config: HandlerConfig,
}

impl<O, D, S> Provider<O, D, S>
where
    O: ObjectStore,
    D: Decryptor,
    S: SecretStore,
{
    pub fn new(object_store: O, decryptor: D, secret_store: S, config: HandlerConfig) -> Self {
        Self {
            object_store,
            decryptor,
            secret_store,
            config,
        }
    }

    /// Routes an event to the handler for its request type.
    ///
    /// # Errors
    ///
    /// [`HandlerError::InvalidRequestType`] for an unknown request type, plus
    /// whatever the selected handler returns.
    #[tracing::instrument(skip_all, fields(request_type = %event.request_type))]
    pub async fn on_event(&self, event: &CustomResourceEvent) -> Result<CustomResourceResponse> {
        let request_type = event.request_type()?;
        info!("Handling event");

        match request_type {
            RequestType::Create => self.on_create(event).await,
            RequestType::Update => self.on_update(event).await,
            RequestType::Delete => self.on_delete(event),
        }
    }

    pub async fn on_create(&self, event: &CustomResourceEvent) -> Result<CustomResourceResponse> {
        let props = event.properties()?;
        info!(
            secret_arn = %props.secret_arn,
            source_hash = ?props.source_hash,
            mappings = props.mappings.len(),
            "On create"
        );

        if let Err(e) = self.sync_secret(&props).await {
            self.sync_failed(e)?;
        }

        Ok(CustomResourceResponse::new(props.physical_resource_id()))
    }

    pub async fn on_update(&self, event: &CustomResourceEvent) -> Result<CustomResourceResponse> {
        let physical_resource_id = event
            .physical_resource_id
            .clone()
            .ok_or(HandlerError::MissingPhysicalResourceId(RequestType::Update.as_str()))?;

        let response = self.on_create(event).await?;
        Ok(CustomResourceResponse {
            physical_resource_id,
            ..response
        })
    }

    pub fn on_delete(&self, event: &CustomResourceEvent) -> Result<CustomResourceResponse> {
        let physical_resource_id = event
            .physical_resource_id
            .clone()
            .ok_or(HandlerError::MissingPhysicalResourceId(RequestType::Delete.as_str()))?;

        info!(physical_resource_id = %physical_resource_id, "On delete, nothing to remove");
        Ok(CustomResourceResponse::new(physical_resource_id))
    }

    /// Applies the configured policy to a failed sync.
    fn sync_failed(&self, e: SyncError) -> Result<()> {
        error!(stage = e.stage(), error = %e, "Secret sync failed");
        if self.config.fail_on_sync_error {
            return Err(e.into());
        }
        warn!("Reporting success despite sync failure");
        Ok(())
    }
}
