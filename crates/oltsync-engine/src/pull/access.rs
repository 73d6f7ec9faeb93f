//! Pull access devices (OLTs) and their NNI/PON ports.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use oltsync_client::{BackendDevice, DeviceBackendClient, LogicalDevice};
use oltsync_core::graph::AccessService;
use oltsync_core::helpers::datapath_id_to_of_id;
use oltsync_core::model::{AccessDevice, NniPort, PonPort};
use oltsync_core::{EngineError, Result};

use crate::context::EngineContext;

/// Import the upstream OLT inventory for one service.
///
/// Devices mid-sync (`enacted < updated`) keep their record untouched but
/// still get their ports refreshed; ports are independent of the pending
/// sync. After the import, local devices absent upstream are deleted unless
/// mid-sync.
pub async fn pull_access_devices(ctx: &EngineContext, service: &AccessService) -> Result<()> {
    info!(service = %service.name, "pulling access devices from backend");

    let client = ctx.backend_client(service)?;
    // Connectivity failure here aborts the whole cycle.
    let devices = client.list_devices().await?;
    let logical = client.list_logical_devices().await?;

    let olts: Vec<BackendDevice> = devices
        .into_iter()
        .filter(|d| d.device_type.contains("olt"))
        .collect();
    debug!(count = olts.len(), "received olt devices");

    let mut seen: HashSet<u32> = HashSet::new();
    for upstream in &olts {
        // A matched local record counts as present upstream even when the
        // import itself fails; the deletion pass must never act on a
        // device whose update was merely skipped.
        if let Some(local) = find_local(ctx, upstream) {
            seen.insert(local.meta.id);
        }
        match import_device(ctx, service, &client, upstream, &logical).await {
            Ok(Some(local_id)) => {
                seen.insert(local_id);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(device_id = %upstream.id, error = %e, "skipping access device update");
            }
        }
    }

    // Deletion pass: local devices absent upstream and not mid-sync.
    for local in ctx.store.devices_for_service(service.meta.id) {
        if seen.contains(&local.meta.id) {
            continue;
        }
        if local.meta.is_dirty() {
            debug!(device = %local.name, "absent upstream but sync in flight, keeping");
            continue;
        }
        match ctx.store.remove_device(local.meta.id) {
            Ok(()) => info!(device = %local.name, "deleted access device absent upstream"),
            Err(e) => warn!(device = %local.name, error = %e, "could not delete access device"),
        }
    }
    Ok(())
}

/// Import one upstream device. Returns the local record id, or `None` when
/// the update was refused (serial mismatch).
async fn import_device(
    ctx: &EngineContext,
    service: &AccessService,
    client: &DeviceBackendClient,
    upstream: &BackendDevice,
    logical: &[LogicalDevice],
) -> Result<Option<u32>> {
    let local = find_local(ctx, upstream);

    let mut device = match local {
        Some(local) => {
            if local.meta.is_dirty() {
                // An in-flight sync wins the race over any upstream state,
                // serial mismatches included; ports are still refreshed.
                debug!(device = %local.name, "sync in flight, skipping device mutation");
                pull_ports(ctx, client, &local, &upstream.id).await?;
                return Ok(Some(local.meta.id));
            }
            // Serial mismatch is a policy error, never a silent overwrite.
            if let (Some(local_serial), Some(up_serial)) =
                (local.serial_number.as_deref(), upstream.serial_number.as_deref())
            {
                if !up_serial.is_empty() && local_serial != up_serial {
                    ctx.store.mark_device_failed(
                        local.meta.id,
                        &format!(
                            "Serial number mismatch: local {local_serial}, upstream {up_serial}"
                        ),
                    )?;
                    warn!(device = %local.name, local_serial, up_serial, "serial number mismatch");
                    return Ok(Some(local.meta.id));
                }
            }
            local
        }
        None => {
            debug!(upstream_id = %upstream.id, "access device is new, creating it");
            new_local(service, upstream)
        }
    };

    device.device_type = upstream.device_type.clone();
    device.device_id = Some(upstream.id.clone());
    if let Some(state) = upstream.admin_state.as_deref() {
        device.admin_state = state.parse()?;
    }
    device.oper_status = upstream.oper_status.clone();
    // Empty upstream serials never overwrite a known local one.
    if device.serial_number.as_deref().unwrap_or("").is_empty() {
        if let Some(serial) = upstream.serial_number.as_deref() {
            if !serial.is_empty() {
                device.serial_number = Some(serial.to_string());
            }
        }
    }
    if let Some(ld) = logical.iter().find(|ld| ld.root_device_id == upstream.id) {
        device.of_id = Some(ld.id.clone());
        device.dp_id = Some(datapath_id_to_of_id(&ld.datapath_id)?);
    }

    let device = ctx.store.save_device(device);
    pull_ports(ctx, client, &device, &upstream.id).await?;
    Ok(Some(device.meta.id))
}

fn find_local(ctx: &EngineContext, upstream: &BackendDevice) -> Option<AccessDevice> {
    if let Some(host_and_port) = upstream.host_and_port.as_deref() {
        let (host, port) = host_and_port.split_once(':')?;
        let port: u16 = port.parse().ok()?;
        return ctx.store.find_device_by_host_port(host, port);
    }
    if let Some(mac) = upstream.mac_address.as_deref() {
        return ctx.store.find_device_by_mac(mac);
    }
    None
}

fn new_local(service: &AccessService, upstream: &BackendDevice) -> AccessDevice {
    let mut device = AccessDevice {
        name: upstream
            .serial_number
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| upstream.id.clone()),
        service_id: service.meta.id,
        ..Default::default()
    };
    match upstream.host_and_port.as_deref().and_then(|hp| {
        let (host, port) = hp.split_once(':')?;
        Some((host.to_string(), port.parse::<u16>().ok()?))
    }) {
        Some((host, port)) => {
            device.host = Some(host);
            device.port = Some(port);
        }
        None => device.mac_address = upstream.mac_address.clone(),
    }
    device
}

/// Refresh a device's NNI and PON ports from the backend listing.
async fn pull_ports(
    ctx: &EngineContext,
    client: &DeviceBackendClient,
    device: &AccessDevice,
    backend_id: &str,
) -> Result<()> {
    let ports = client.device_ports(backend_id).await?;
    let mut uplink = device.uplink;
    for port in ports {
        let admin_state = match port.admin_state.as_deref() {
            Some(state) => state.parse()?,
            None => Default::default(),
        };
        match port.port_type.as_str() {
            "ETHERNET_NNI" => {
                let nni = ctx.store.upsert_nni_port(NniPort {
                    port_no: port.port_no,
                    name: port.label.clone(),
                    admin_state,
                    oper_status: port.oper_status.clone(),
                    device_id: device.meta.id,
                    ..Default::default()
                });
                uplink = Some(nni.meta.id);
            }
            "PON_OLT" => {
                ctx.store.upsert_pon_port(PonPort {
                    port_no: port.port_no,
                    name: port.label.clone(),
                    admin_state,
                    oper_status: port.oper_status.clone(),
                    device_id: device.meta.id,
                    ..Default::default()
                });
            }
            other => {
                debug!(port_type = other, port_no = port.port_no, "ignoring port kind");
            }
        }
    }
    if uplink != device.uplink {
        let mut device = ctx
            .store
            .get_device(device.meta.id)
            .map_err(|_| EngineError::not_found("AccessDevice", device.name.clone()))?;
        device.uplink = uplink;
        ctx.store.save_device_quiet(device);
    }
    Ok(())
}
