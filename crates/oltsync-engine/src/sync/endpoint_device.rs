//! Endpoint device (ONU) sync: a much smaller state machine.
//!
//! Enable or disable on the backend based on `admin_state` alone; there is
//! no controller step for endpoints.

use tracing::info;

use oltsync_core::model::AdminState;
use oltsync_core::{Progress, Result};

use crate::context::EngineContext;

pub async fn sync_endpoint_device(ctx: &EngineContext, endpoint_id: u32) -> Result<Progress> {
    let endpoint = ctx.store.get_endpoint(endpoint_id)?;

    // The parent chain may not have propagated from pull yet.
    let Ok(parent) = ctx.store.endpoint_parent_device(endpoint_id) else {
        return Ok(Progress::deferred(format!(
            "waiting for access device owning endpoint {}",
            endpoint.serial_number
        )));
    };
    let Some(backend_id) = endpoint.device_id.as_deref() else {
        return Ok(Progress::deferred(format!(
            "waiting for backend id of endpoint {}",
            endpoint.serial_number
        )));
    };

    let service = ctx.store.get_service(parent.service_id)?;
    let client = ctx.backend_client(&service)?;

    match endpoint.admin_state {
        AdminState::Enabled => {
            info!(serial = %endpoint.serial_number, backend_id, "enabling endpoint device");
            client.enable_device(backend_id).await?;
        }
        AdminState::Disabled => {
            info!(serial = %endpoint.serial_number, backend_id, "disabling endpoint device");
            client.disable_device(backend_id).await?;
        }
    }
    Ok(Progress::Complete)
}
