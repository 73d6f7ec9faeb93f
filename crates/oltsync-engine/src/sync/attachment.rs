//! Subscriber attachment sync: program the controller-side subscriber flow.

use tracing::{info, warn};

use oltsync_core::model::SubscriberAttachment;
use oltsync_core::{EngineError, Progress, Result};

use crate::context::EngineContext;

/// Push the subscriber flow for an attachment to the SDN controller and
/// record the returned handle.
///
/// Defers while the owning access device has no datapath id yet (its own
/// sync has not completed) or the endpoint association is still missing.
pub async fn sync_attachment(ctx: &EngineContext, attachment_id: u32) -> Result<Progress> {
    let attachment = ctx.store.get_attachment(attachment_id)?;
    let service = ctx.store.get_service(attachment.service_id)?;

    let Some(endpoint_id) = attachment.endpoint_id else {
        return Ok(Progress::deferred(format!(
            "waiting for endpoint association of attachment {}",
            attachment.name
        )));
    };
    let device = ctx.store.endpoint_parent_device(endpoint_id)?;
    let Some(dp_id) = device.dp_id.as_deref() else {
        return Ok(Progress::deferred(format!(
            "waiting for access device {} to be synchronized",
            device.name
        )));
    };

    let uni_port_id = attachment
        .uni_port_id
        .or_else(|| {
            attachment
                .westbound_property("uni_port_id")
                .and_then(|p| p.parse().ok())
        })
        .ok_or_else(|| {
            EngineError::validation(format!(
                "attachment {} carries no uni_port_id",
                attachment.name
            ))
        })?;

    info!(
        attachment = %attachment.name,
        dp_id,
        uni_port_id,
        c_tag = ?attachment.c_tag,
        "programming subscriber flow"
    );

    let controller = ctx.controller_client(&service)?;
    let handle = controller.add_subscriber_flow(dp_id, uni_port_id).await?;

    let mut attachment = ctx.store.get_attachment(attachment_id)?;
    attachment.backend_handle = Some(handle);
    ctx.store.save_attachment_quiet(attachment);
    Ok(Progress::Complete)
}

/// Remove the programmed flow, if any. Connection failures degrade to a
/// warning: the controller side is assumed already gone.
pub async fn delete_attachment(ctx: &EngineContext, attachment: &SubscriberAttachment) -> Result<()> {
    let Some(handle) = attachment.backend_handle.as_deref() else {
        return Ok(());
    };
    let service = ctx.store.get_service(attachment.service_id)?;
    let controller = ctx.controller_client(&service)?;
    match controller.remove_subscriber_flow(handle).await {
        Ok(()) => info!(attachment = %attachment.name, handle, "subscriber flow removed"),
        Err(e) if e.is_connection() => {
            warn!(attachment = %attachment.name, error = %e, "controller unreachable, assuming flow gone");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
