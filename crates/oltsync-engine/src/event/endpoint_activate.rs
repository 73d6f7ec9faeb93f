//! Endpoint activation events: hand a freshly activated endpoint to the
//! provisioning-policy (OSS) validator declared on its owning service.

use serde::Deserialize;
use tracing::{debug, info, warn};

use oltsync_core::model::EndpointDevice;
use oltsync_core::{EngineError, Result};

use crate::context::EngineContext;

#[derive(Debug, Deserialize)]
struct EndpointActivateEvent {
    status: String,
    serial_number: String,
}

pub(super) async fn handle(ctx: &EngineContext, value: &serde_json::Value) -> Result<()> {
    let event: EndpointActivateEvent = serde_json::from_value(value.clone())
        .map_err(|e| EngineError::validation(format!("malformed endpoint activate event: {e}")))?;

    if event.status != "activated" {
        debug!(status = %event.status, serial = %event.serial_number, "ignoring endpoint event");
        return Ok(());
    }

    let endpoint = find_endpoint(ctx, &event.serial_number).await?;
    let device = ctx.store.endpoint_parent_device(endpoint.meta.id)?;
    let service = ctx.store.get_service(device.service_id)?;

    let validators = service.validators();
    let Some(dependency) = validators.first() else {
        info!(
            service = %service.name,
            serial = %event.serial_number,
            "no validation dependency declared, skipping endpoint validation"
        );
        return Ok(());
    };
    if validators.len() > 1 {
        warn!(
            service = %service.name,
            count = validators.len(),
            "multiple validation dependencies, using the first"
        );
    }

    let hook = ctx.validators.get(&dependency.name).ok_or_else(|| {
        EngineError::inconsistent(format!(
            "no validation hook registered for dependency {}",
            dependency.name
        ))
    })?;
    info!(serial = %event.serial_number, dependency = %dependency.name, "validating endpoint");
    hook.validate_endpoint(value).await
}

/// Resolve the endpoint by serial, retrying briefly: the activation event
/// can arrive before the pull pass has imported the endpoint record.
async fn find_endpoint(ctx: &EngineContext, serial: &str) -> Result<EndpointDevice> {
    let mut attempted = 0;
    loop {
        if let Some(endpoint) = ctx.store.find_endpoint_by_serial(serial) {
            return Ok(endpoint);
        }
        attempted += 1;
        if attempted >= ctx.retry.attempts {
            return Err(EngineError::not_found("EndpointDevice", serial));
        }
        debug!(serial, attempted, "endpoint not present yet, retrying");
        tokio::time::sleep(ctx.retry.delay).await;
    }
}
