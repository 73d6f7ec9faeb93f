//! Pull endpoint devices (ONUs) and their UNI ports.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use oltsync_client::{BackendDevice, DeviceBackendClient};
use oltsync_core::graph::AccessService;
use oltsync_core::model::{EndpointDevice, PonPort, UniPort};
use oltsync_core::{EngineError, Result};

use crate::context::EngineContext;

/// Import the upstream ONU inventory for one service.
pub async fn pull_endpoint_devices(ctx: &EngineContext, service: &AccessService) -> Result<()> {
    info!(service = %service.name, "pulling endpoint devices from backend");

    let client = ctx.backend_client(service)?;
    let devices = client.list_devices().await?;
    let onus: Vec<BackendDevice> = devices
        .into_iter()
        .filter(|d| d.device_type.contains("onu"))
        .collect();
    debug!(count = onus.len(), "received onu devices");

    let mut seen: HashSet<u32> = HashSet::new();
    for upstream in &onus {
        // A matched local record counts as present upstream even when the
        // import itself fails, keeping the deletion pass away from it.
        if let Some(existing) = upstream
            .serial_number
            .as_deref()
            .filter(|s| !s.is_empty())
            .and_then(|serial| ctx.store.find_endpoint_by_serial(serial))
        {
            seen.insert(existing.meta.id);
        }
        match import_endpoint(ctx, &client, upstream).await {
            Ok(Some(local_id)) => {
                seen.insert(local_id);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(serial = ?upstream.serial_number, error = %e, "skipping endpoint device update");
            }
        }
    }

    // Endpoint devices absent upstream and not mid-sync are deleted; the
    // store refuses while a subscriber attachment still references one.
    for local in ctx.store.list_endpoints() {
        if seen.contains(&local.meta.id) {
            continue;
        }
        if local.meta.is_dirty() {
            continue;
        }
        match ctx.store.remove_endpoint(local.meta.id) {
            Ok(()) => info!(serial = %local.serial_number, "deleted endpoint device absent upstream"),
            Err(e) => {
                warn!(serial = %local.serial_number, error = %e, "could not delete endpoint device");
            }
        }
    }
    Ok(())
}

async fn import_endpoint(
    ctx: &EngineContext,
    client: &DeviceBackendClient,
    upstream: &BackendDevice,
) -> Result<Option<u32>> {
    let serial = upstream
        .serial_number
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| EngineError::validation("upstream onu carries no serial number"))?;
    let proxy = upstream.proxy_address.as_ref().ok_or_else(|| {
        EngineError::validation(format!("onu {serial} carries no proxy address"))
    })?;

    // The owning OLT must already be known locally.
    let parent = ctx
        .store
        .find_device_by_backend_id(&proxy.device_id)
        .ok_or_else(|| EngineError::not_found("AccessDevice", proxy.device_id.clone()))?;

    let pon = match ctx.store.find_pon_port(parent.meta.id, proxy.channel_id) {
        Some(pon) => pon,
        None => ctx.store.upsert_pon_port(PonPort {
            port_no: proxy.channel_id,
            name: format!("PON {}", proxy.channel_id),
            device_id: parent.meta.id,
            ..Default::default()
        }),
    };

    let mut endpoint = match ctx.store.find_endpoint_by_serial(serial) {
        Some(existing) => {
            if existing.meta.is_dirty() {
                debug!(serial, "sync in flight, skipping endpoint mutation");
                pull_uni_ports(ctx, client, &existing, &upstream.id).await?;
                return Ok(Some(existing.meta.id));
            }
            existing
        }
        None => {
            debug!(serial, "endpoint device is new, creating it");
            EndpointDevice {
                serial_number: serial.to_string(),
                ..Default::default()
            }
        }
    };

    endpoint.vendor = upstream.vendor.clone().unwrap_or_default();
    endpoint.device_type = upstream.device_type.clone();
    endpoint.device_id = Some(upstream.id.clone());
    if let Some(state) = upstream.admin_state.as_deref() {
        endpoint.admin_state = state.parse()?;
    }
    endpoint.oper_status = upstream.oper_status.clone();
    endpoint.connect_status = upstream.connect_status.clone();
    if let Some(reason) = upstream.reason.clone() {
        endpoint.reason = reason;
    }
    endpoint.pon_port_id = pon.meta.id;

    let endpoint = ctx.store.save_endpoint(endpoint);
    pull_uni_ports(ctx, client, &endpoint, &upstream.id).await?;
    Ok(Some(endpoint.meta.id))
}

/// Refresh an endpoint's subscriber-facing ports.
async fn pull_uni_ports(
    ctx: &EngineContext,
    client: &DeviceBackendClient,
    endpoint: &EndpointDevice,
    backend_id: &str,
) -> Result<()> {
    let ports = client.device_ports(backend_id).await?;
    for port in ports {
        if port.port_type != "ETHERNET_UNI" {
            continue;
        }
        let admin_state = match port.admin_state.as_deref() {
            Some(state) => state.parse()?,
            None => Default::default(),
        };
        ctx.store.upsert_uni_port(UniPort {
            port_no: port.port_no,
            name: port.label.clone(),
            admin_state,
            oper_status: port.oper_status.clone(),
            endpoint_id: endpoint.meta.id,
            ..Default::default()
        });
    }
    Ok(())
}
