//! Switch port up/down events: track access-device link status and raise
//! or clear the loss-of-signal alarm.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use oltsync_core::model::{Alarm, AlarmState, LinkStatus};
use oltsync_core::{EngineError, Result};

use crate::context::EngineContext;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PortLinkEvent {
    timestamp: String,
    device_id: String,
    port_id: String,
    enabled: bool,
}

pub(super) async fn handle(ctx: &EngineContext, value: &serde_json::Value) -> Result<()> {
    let event: PortLinkEvent = serde_json::from_value(value.clone())
        .map_err(|e| EngineError::validation(format!("malformed port link event: {e}")))?;

    let Some(device) = ctx
        .store
        .find_device_by_switch_port(&event.device_id, &event.port_id)
    else {
        debug!(
            switch = %event.device_id,
            port = %event.port_id,
            "port link event not for a known access device"
        );
        return Ok(());
    };

    let observed = if event.enabled {
        LinkStatus::Up
    } else {
        LinkStatus::Down
    };
    if device.link_status == observed {
        debug!(device = %device.name, status = ?observed, "link status unchanged");
        return Ok(());
    }

    let mut device = device;
    device.link_status = observed;
    let device = ctx.store.save_device_quiet(device);
    info!(device = %device.name, status = ?observed, "access device link status changed");

    let raised_at = DateTime::parse_from_rfc3339(&event.timestamp)
        .map_err(|e| {
            EngineError::validation(format!(
                "unparseable event timestamp {:?}: {e}",
                event.timestamp
            ))
        })?
        .with_timezone(&Utc);

    // Subscribers reachable through the device: PON ports, their endpoint
    // devices, their attachments.
    let mut affected = Vec::new();
    for endpoint in ctx.store.endpoints_for_device(device.meta.id) {
        for attachment in ctx.store.attachments_for_endpoint(endpoint.meta.id) {
            affected.push(attachment.name);
        }
    }

    let resource_id = device
        .device_id
        .clone()
        .unwrap_or_else(|| device.name.clone());
    let alarm = Alarm {
        id: Alarm::port_los_id(&resource_id),
        category: "ACCESS".into(),
        alarm_type: "ACCESS.PORT_LOS".into(),
        state: match observed {
            LinkStatus::Down => AlarmState::Raised,
            LinkStatus::Up => AlarmState::Cleared,
        },
        severity: "MAJOR".into(),
        resource_id,
        logical_device_id: device.dp_id.clone(),
        affected_subscribers: affected,
        switch_datapath_id: device.switch_datapath_id.clone(),
        switch_port: device.switch_port.clone(),
        device_name: device.name.clone(),
        raised_at,
        reported_at: Utc::now(),
    };
    ctx.alarms.emit(alarm).await
}
