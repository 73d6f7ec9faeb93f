//! Workload lifecycle events: a freshly created controller workload means
//! its flow state is gone, so every attachment behind it must resync.

use serde::Deserialize;
use tracing::{debug, info};

use oltsync_core::{EngineError, Result};

use crate::context::EngineContext;

#[derive(Debug, Deserialize)]
struct WorkloadEvent {
    status: String,
    #[serde(default)]
    labels: Option<WorkloadLabels>,
}

#[derive(Debug, Deserialize)]
struct WorkloadLabels {
    xos_service: Option<String>,
}

pub(super) fn handle(ctx: &EngineContext, value: &serde_json::Value) -> Result<()> {
    let event: WorkloadEvent = serde_json::from_value(value.clone())
        .map_err(|e| EngineError::validation(format!("malformed workload event: {e}")))?;

    if event.status != "created" {
        debug!(status = %event.status, "ignoring workload event");
        return Ok(());
    }
    let Some(label) = event.labels.and_then(|l| l.xos_service) else {
        debug!("workload event carries no service label");
        return Ok(());
    };

    for service in ctx.store.list_services() {
        let controller_matches = service
            .controller()
            .is_some_and(|dep| dep.name.eq_ignore_ascii_case(&label));
        if !controller_matches {
            continue;
        }
        for attachment in ctx.store.attachments_for_service(service.meta.id) {
            info!(
                attachment = %attachment.name,
                service = %service.name,
                "controller workload recreated, invalidating attachment"
            );
            ctx.store
                .mark_attachment_dirty(attachment.meta.id, "resynchronize after workload restart")?;
        }
    }
    Ok(())
}
