//! Inventory pull: import the backend's authoritative device/port listing
//! into local records, and delete local records absent upstream.
//!
//! One upstream device failing to import aborts only that device's update;
//! top-level connectivity failure aborts the whole cycle.

mod access;
mod endpoint;

pub use access::pull_access_devices;
pub use endpoint::pull_endpoint_devices;

use std::sync::Arc;

use tracing::warn;

use oltsync_core::Result;

use crate::context::EngineContext;

/// Run a full pull cycle over every access service.
pub async fn run_pull(ctx: &Arc<EngineContext>) -> Result<()> {
    for service in ctx.store.list_services() {
        if let Err(e) = pull_access_devices(ctx, &service).await {
            warn!(service = %service.name, error = %e, "access device pull failed");
        }
        if let Err(e) = pull_endpoint_devices(ctx, &service).await {
            warn!(service = %service.name, error = %e, "endpoint device pull failed");
        }
    }
    Ok(())
}
