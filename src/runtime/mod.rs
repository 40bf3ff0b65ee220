//! Minimal client for the Lambda Runtime API.
//!
//! Invocations are pulled and answered one at a time:
//! `GET /invocation/next`, handle, then `POST /invocation/{id}/response` or
//! `/invocation/{id}/error`.

mod client;

pub use client::{Invocation, RuntimeClient};

use anyhow::{Context, Result};
use tracing::{Instrument, error, info, info_span};

use crate::event::CustomResourceEvent;
use crate::handler::Provider;
use crate::services::{Decryptor, ObjectStore, SecretStore};

/// Serves invocations until the runtime API connection fails.
///
/// # Errors
///
/// Returns an error only when talking to the runtime API itself fails;
/// handler failures are reported back as invocation errors.
pub async fn run<O, D, S>(client: &RuntimeClient, provider: &Provider<O, D, S>) -> Result<()>
where
    O: ObjectStore,
    D: Decryptor,
    S: SecretStore,
{
    info!(endpoint = %client.endpoint(), "Waiting for invocations");

    loop {
        let invocation = client
            .next_invocation()
            .await
            .context("fetching next invocation failed")?;

        let span = info_span!(
            "invocation",
            request_id = %invocation.request_id,
            deadline = ?invocation.deadline,
        );

        handle_invocation(client, provider, invocation)
            .instrument(span)
            .await?;
    }
}

async fn handle_invocation<O, D, S>(
    client: &RuntimeClient,
    provider: &Provider<O, D, S>,
    invocation: Invocation,
) -> Result<()>
where
    O: ObjectStore,
    D: Decryptor,
    S: SecretStore,
{
    let event: CustomResourceEvent = match serde_json::from_slice(&invocation.payload) {
        Ok(event) => event,
        Err(e) => {
            error!(error = %e, "Event payload is not a custom resource event");
            return client
                .post_error(&invocation.request_id, "InvalidEvent", &e.to_string())
                .await;
        }
    };

    match provider.on_event(&event).await {
        Ok(response) => {
            info!(physical_resource_id = %response.physical_resource_id, "Invocation succeeded");
            client
                .post_response(&invocation.request_id, &response)
                .await
        }
        Err(e) => {
            error!(error_type = e.error_type(), error = %e, "Unhandled error, failing");
            client
                .post_error(&invocation.request_id, e.error_type(), &e.to_string())
                .await
        }
    }
}
