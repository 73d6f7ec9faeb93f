//! Access device (OLT) sync state machine.
//!
//! `UNPROVISIONED -> PROVISIONED -> ACTIVATING -> ACTIVE`, with
//! `DISABLING -> DISABLED` on the disable side and `ERROR` as the terminal
//! failure state. Controller registration happens only for a device that
//! ends ENABLED and ACTIVE.

use tokio::time::sleep;
use tracing::{debug, info, warn};

use oltsync_client::{DeviceBackendClient, NewDevice};
use oltsync_core::graph::AccessService;
use oltsync_core::helpers::datapath_id_to_of_id;
use oltsync_core::model::{AccessDevice, AdminState};
use oltsync_core::{EngineError, Progress, Result};

use crate::context::EngineContext;

/// Drive one access device toward its desired state.
///
/// Precondition: a synchronized technology profile for the device's
/// technology (else `Deferred`). The device's addressing must validate.
pub async fn sync_access_device(ctx: &EngineContext, device_id: u32) -> Result<Progress> {
    let mut device = ctx.store.get_device(device_id)?;
    let service = ctx.store.get_service(device.service_id)?;

    info!(device = %device.name, admin_state = %device.admin_state, "syncing access device");

    if !ctx.store.has_enacted_profile(device.technology) {
        return Ok(Progress::deferred(format!(
            "waiting for technology profile {} to be synchronized",
            device.technology
        )));
    }
    device.validate()?;

    let client = ctx.backend_client(&service)?;

    if device.device_id.is_none() {
        pre_provision(ctx, &client, &mut device).await?;
    }

    match device.admin_state {
        AdminState::Enabled if !device.is_active() => {
            activate(ctx, &client, &mut device).await?;
        }
        AdminState::Disabled if device.is_active() => {
            // Deactivate and stop: no controller step on the disable side.
            let backend_id = backend_id(&device)?;
            client.disable_device(&backend_id).await?;
            device.oper_status = Some("DISABLING".into());
            ctx.store.save_device_quiet(device);
            return Ok(Progress::Complete);
        }
        _ => {
            debug!(device = %device.name, "device already in desired state");
        }
    }

    if device.admin_state == AdminState::Enabled && device.is_active() {
        register_with_controller(ctx, &service, &device).await?;
    }
    Ok(Progress::Complete)
}

/// Submit the device to the backend and record the returned identifiers.
async fn pre_provision(
    ctx: &EngineContext,
    client: &DeviceBackendClient,
    device: &mut AccessDevice,
) -> Result<()> {
    info!(device = %device.name, "pre-provisioning access device");

    let created = client
        .create_device(&NewDevice {
            device_type: device.device_type.clone(),
            host_and_port: device.host_and_port(),
            mac_address: device.mac_address.clone(),
        })
        .await?;

    if created.id.is_empty() {
        return Err(EngineError::inconsistent(format!(
            "backend returned an empty device id for {}; the device is probably already provisioned",
            device.name
        )));
    }
    device.device_id = Some(created.id);
    // Adopt the backend serial only while the local one is still empty.
    if device.serial_number.as_deref().unwrap_or("").is_empty() {
        if let Some(serial) = created.serial_number.filter(|s| !s.is_empty()) {
            device.serial_number = Some(serial);
        }
    }
    *device = ctx.store.save_device_quiet(device.clone());
    Ok(())
}

/// Enable the device and poll until it leaves ACTIVATING, with a fixed
/// attempt ceiling and inter-poll delay.
async fn activate(
    ctx: &EngineContext,
    client: &DeviceBackendClient,
    device: &mut AccessDevice,
) -> Result<()> {
    let backend_id = backend_id(device)?;
    client.enable_device(&backend_id).await?;

    device.meta.backend_status = "Waiting for device to be activated".into();
    // Quiet: an intermediate status must not retrigger the sync loop.
    *device = ctx.store.save_device_quiet(device.clone());

    let mut observed = client.get_device(&backend_id).await?;
    let mut attempted = 0;
    while observed.oper_status.as_deref() == Some("ACTIVATING")
        && attempted < ctx.poll.max_attempts
    {
        debug!(device = %device.name, attempted, "waiting for device to activate");
        sleep(ctx.poll.interval).await;
        observed = client.get_device(&backend_id).await?;
        attempted += 1;
    }

    if let Some(state) = observed.admin_state.as_deref() {
        device.admin_state = state.parse()?;
    }
    device.oper_status = observed.oper_status.clone();

    if !device.is_active() {
        // Terminal for this attempt only: the record stays dirty and the
        // next scheduled pass tries again.
        let message = format!(
            "it was not possible to activate access device {}",
            device.meta.id
        );
        device.meta.backend_status = message.clone();
        *device = ctx.store.save_device_quiet(device.clone());
        return Err(EngineError::transport(message));
    }

    resolve_logical_device(client, device).await?;
    *device = ctx.store.save_device_quiet(device.clone());
    Ok(())
}

/// Resolve `of_id`/`dp_id` from the logical-device listing, keyed by the
/// device's backend id.
async fn resolve_logical_device(
    client: &DeviceBackendClient,
    device: &mut AccessDevice,
) -> Result<()> {
    let backend_id = backend_id(device)?;
    let logical = client.list_logical_devices().await?;
    let ld = logical
        .iter()
        .find(|ld| ld.root_device_id == backend_id)
        .ok_or_else(|| {
            EngineError::not_found("logical device for access device", backend_id.clone())
        })?;
    device.of_id = Some(ld.id.clone());
    device.dp_id = Some(datapath_id_to_of_id(&ld.datapath_id)?);
    Ok(())
}

async fn register_with_controller(
    ctx: &EngineContext,
    service: &AccessService,
    device: &AccessDevice,
) -> Result<()> {
    let dp_id = device.dp_id.as_deref().ok_or_else(|| {
        EngineError::inconsistent(format!(
            "access device {} is active but carries no datapath id",
            device.name
        ))
    })?;
    let controller = ctx.controller_client(service)?;
    controller.register_device(dp_id, &device.name).await?;
    Ok(())
}

/// Disable and delete the device on the backend.
///
/// No-op when the device was never provisioned or already failed fatally.
/// Connection failures complete as a local no-op: the physical side is
/// assumed already gone or unreachable.
pub async fn delete_access_device(ctx: &EngineContext, device: &AccessDevice) -> Result<()> {
    let Some(backend_id) = device.device_id.as_deref() else {
        info!(device = %device.name, "never provisioned, nothing to delete upstream");
        return Ok(());
    };
    if device.meta.is_failed() {
        info!(device = %device.name, "device in error state, skipping upstream delete");
        return Ok(());
    }
    let service = ctx.store.get_service(device.service_id)?;
    let client = ctx.backend_client(&service)?;

    match client.disable_device(backend_id).await {
        Ok(()) => {}
        Err(e) if e.is_connection() => {
            warn!(device = %device.name, error = %e, "backend unreachable during disable, assuming device gone");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }
    match client.delete_device(backend_id).await {
        Ok(()) => {}
        Err(e) if e.is_connection() => {
            warn!(device = %device.name, error = %e, "backend unreachable during delete, assuming device gone");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }
    info!(device = %device.name, "deleted access device on backend");
    Ok(())
}

fn backend_id(device: &AccessDevice) -> Result<String> {
    device
        .device_id
        .clone()
        .ok_or_else(|| EngineError::inconsistent(format!("device {} has no backend id", device.name)))
}
