//! In-memory change-tracked record store.
//!
//! Version markers: every normal save bumps the record's `updated` marker
//! from a store-wide monotonic clock; `mark_enacted` copies `updated` into
//! `enacted`. A record is dirty while `enacted < updated`. Quiet saves
//! persist feedback fields without bumping `updated`, so intermediate
//! statuses written mid-sync do not retrigger the sync loop.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use oltsync_core::error::{EngineError, Result};
use oltsync_core::graph::AccessService;
use oltsync_core::model::{
    AccessDevice, DownstreamServiceInstance, EndpointDevice, Link, NniPort, PonPort,
    SubscriberAttachment, Technology, TechnologyProfile, UniPort, BACKEND_ERROR,
    BACKEND_IN_PROGRESS, BACKEND_OK,
};

/// First s-tag handed out under a device; siblings count up from here.
const S_TAG_BASE: u16 = 100;

#[derive(Default)]
struct StoreState {
    services: HashMap<u32, AccessService>,
    devices: HashMap<u32, AccessDevice>,
    endpoints: HashMap<u32, EndpointDevice>,
    nni_ports: HashMap<u32, NniPort>,
    pon_ports: HashMap<u32, PonPort>,
    uni_ports: HashMap<u32, UniPort>,
    attachments: HashMap<u32, SubscriberAttachment>,
    downstreams: HashMap<u32, DownstreamServiceInstance>,
    links: HashMap<u32, Link>,
    profiles: HashMap<u32, TechnologyProfile>,
    next_id: u32,
    clock: u64,
}

impl StoreState {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

/// The record store shared by all reconciliation paths.
#[derive(Default)]
pub struct RecordStore {
    state: RwLock<StoreState>,
    mutations: AtomicU64,
}

impl RecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total count of mutating operations performed; lets tests assert that
    /// an idempotent re-run performed zero writes.
    #[must_use]
    pub fn mutation_count(&self) -> u64 {
        self.mutations.load(Ordering::SeqCst)
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    // ── services ───────────────────────────────────────────────────────

    pub fn insert_service(&self, mut service: AccessService) -> AccessService {
        let mut state = self.write();
        if service.meta.id == 0 {
            service.meta.id = state.next_id();
        }
        service.meta.updated = state.tick();
        state.services.insert(service.meta.id, service.clone());
        service
    }

    pub fn get_service(&self, id: u32) -> Result<AccessService> {
        self.read()
            .services
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("AccessService", id.to_string()))
    }

    #[must_use]
    pub fn list_services(&self) -> Vec<AccessService> {
        let mut services: Vec<_> = self.read().services.values().cloned().collect();
        services.sort_by_key(|s| s.meta.id);
        services
    }

    // ── access devices ─────────────────────────────────────────────────

    /// Save desired state; bumps `updated` so the record becomes dirty.
    pub fn save_device(&self, mut device: AccessDevice) -> AccessDevice {
        let mut state = self.write();
        if device.meta.id == 0 {
            device.meta.id = state.next_id();
        }
        device.meta.updated = state.tick();
        state.devices.insert(device.meta.id, device.clone());
        device
    }

    /// Persist feedback fields without bumping `updated`.
    pub fn save_device_quiet(&self, mut device: AccessDevice) -> AccessDevice {
        let mut state = self.write();
        if device.meta.id == 0 {
            device.meta.id = state.next_id();
        }
        state.devices.insert(device.meta.id, device.clone());
        device
    }

    pub fn get_device(&self, id: u32) -> Result<AccessDevice> {
        self.read()
            .devices
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("AccessDevice", id.to_string()))
    }

    #[must_use]
    pub fn list_devices(&self) -> Vec<AccessDevice> {
        let mut devices: Vec<_> = self.read().devices.values().cloned().collect();
        devices.sort_by_key(|d| d.meta.id);
        devices
    }

    #[must_use]
    pub fn devices_for_service(&self, service_id: u32) -> Vec<AccessDevice> {
        let mut devices: Vec<_> = self
            .read()
            .devices
            .values()
            .filter(|d| d.service_id == service_id)
            .cloned()
            .collect();
        devices.sort_by_key(|d| d.meta.id);
        devices
    }

    #[must_use]
    pub fn find_device_by_host_port(&self, host: &str, port: u16) -> Option<AccessDevice> {
        self.read()
            .devices
            .values()
            .find(|d| d.host.as_deref() == Some(host) && d.port == Some(port))
            .cloned()
    }

    #[must_use]
    pub fn find_device_by_mac(&self, mac: &str) -> Option<AccessDevice> {
        self.read()
            .devices
            .values()
            .find(|d| d.mac_address.as_deref() == Some(mac))
            .cloned()
    }

    #[must_use]
    pub fn find_device_by_backend_id(&self, device_id: &str) -> Option<AccessDevice> {
        self.read()
            .devices
            .values()
            .find(|d| d.device_id.as_deref() == Some(device_id))
            .cloned()
    }

    /// Lookup by controller-assigned switch id and port, for link events.
    #[must_use]
    pub fn find_device_by_switch_port(&self, datapath_id: &str, port: &str) -> Option<AccessDevice> {
        self.read()
            .devices
            .values()
            .find(|d| {
                d.switch_datapath_id.as_deref() == Some(datapath_id)
                    && d.switch_port.as_deref() == Some(port)
            })
            .cloned()
    }

    pub fn mark_device_enacted(&self, id: u32) -> Result<()> {
        let mut state = self.write();
        let device = state
            .devices
            .get_mut(&id)
            .ok_or_else(|| EngineError::not_found("AccessDevice", id.to_string()))?;
        device.meta.enacted = Some(device.meta.updated);
        device.meta.backend_status = "OK".into();
        device.meta.backend_code = BACKEND_OK;
        Ok(())
    }

    /// Record a fatal failure. Also advances `enacted` so the record is not
    /// retried until something touches it again.
    pub fn mark_device_failed(&self, id: u32, status: &str) -> Result<()> {
        let mut state = self.write();
        let device = state
            .devices
            .get_mut(&id)
            .ok_or_else(|| EngineError::not_found("AccessDevice", id.to_string()))?;
        device.meta.backend_status = status.into();
        device.meta.backend_code = BACKEND_ERROR;
        device.meta.enacted = Some(device.meta.updated);
        Ok(())
    }

    pub fn flag_device_deleted(&self, id: u32) -> Result<()> {
        let mut state = self.write();
        let tick = state.tick();
        let device = state
            .devices
            .get_mut(&id)
            .ok_or_else(|| EngineError::not_found("AccessDevice", id.to_string()))?;
        device.meta.deleted = true;
        device.meta.updated = tick;
        Ok(())
    }

    /// Remove a device and everything under it: ports, endpoint devices and
    /// their UNI ports. Refused while any endpoint under the device is
    /// referenced by a subscriber attachment.
    pub fn remove_device(&self, id: u32) -> Result<()> {
        let mut state = self.write();
        if !state.devices.contains_key(&id) {
            return Err(EngineError::not_found("AccessDevice", id.to_string()));
        }
        let pon_ids: Vec<u32> = state
            .pon_ports
            .values()
            .filter(|p| p.device_id == id)
            .map(|p| p.meta.id)
            .collect();
        let endpoint_ids: Vec<u32> = state
            .endpoints
            .values()
            .filter(|e| pon_ids.contains(&e.pon_port_id))
            .map(|e| e.meta.id)
            .collect();
        let attached = state
            .attachments
            .values()
            .any(|a| a.endpoint_id.map_or(false, |e| endpoint_ids.contains(&e)));
        if attached {
            return Err(EngineError::validation(format!(
                "access device {id} still owns endpoint devices attached to a subscriber"
            )));
        }
        state
            .uni_ports
            .retain(|_, p| !endpoint_ids.contains(&p.endpoint_id));
        state.endpoints.retain(|eid, _| !endpoint_ids.contains(eid));
        state.pon_ports.retain(|_, p| p.device_id != id);
        state.nni_ports.retain(|_, p| p.device_id != id);
        state.devices.remove(&id);
        Ok(())
    }

    // ── endpoint devices ───────────────────────────────────────────────

    pub fn save_endpoint(&self, mut endpoint: EndpointDevice) -> EndpointDevice {
        let mut state = self.write();
        if endpoint.meta.id == 0 {
            endpoint.meta.id = state.next_id();
        }
        endpoint.meta.updated = state.tick();
        state.endpoints.insert(endpoint.meta.id, endpoint.clone());
        endpoint
    }

    pub fn save_endpoint_quiet(&self, mut endpoint: EndpointDevice) -> EndpointDevice {
        let mut state = self.write();
        if endpoint.meta.id == 0 {
            endpoint.meta.id = state.next_id();
        }
        state.endpoints.insert(endpoint.meta.id, endpoint.clone());
        endpoint
    }

    pub fn get_endpoint(&self, id: u32) -> Result<EndpointDevice> {
        self.read()
            .endpoints
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("EndpointDevice", id.to_string()))
    }

    #[must_use]
    pub fn find_endpoint_by_serial(&self, serial: &str) -> Option<EndpointDevice> {
        self.read()
            .endpoints
            .values()
            .find(|e| e.serial_number == serial)
            .cloned()
    }

    #[must_use]
    pub fn list_endpoints(&self) -> Vec<EndpointDevice> {
        let mut endpoints: Vec<_> = self.read().endpoints.values().cloned().collect();
        endpoints.sort_by_key(|e| e.meta.id);
        endpoints
    }

    #[must_use]
    pub fn endpoints_for_device(&self, device_id: u32) -> Vec<EndpointDevice> {
        let state = self.read();
        let pon_ids: Vec<u32> = state
            .pon_ports
            .values()
            .filter(|p| p.device_id == device_id)
            .map(|p| p.meta.id)
            .collect();
        let mut endpoints: Vec<_> = state
            .endpoints
            .values()
            .filter(|e| pon_ids.contains(&e.pon_port_id))
            .cloned()
            .collect();
        endpoints.sort_by_key(|e| e.meta.id);
        endpoints
    }

    /// The access device transitively owning an endpoint, via its PON port.
    pub fn endpoint_parent_device(&self, endpoint_id: u32) -> Result<AccessDevice> {
        let state = self.read();
        let endpoint = state
            .endpoints
            .get(&endpoint_id)
            .ok_or_else(|| EngineError::not_found("EndpointDevice", endpoint_id.to_string()))?;
        let pon = state.pon_ports.get(&endpoint.pon_port_id).ok_or_else(|| {
            EngineError::not_found("PonPort", endpoint.pon_port_id.to_string())
        })?;
        state
            .devices
            .get(&pon.device_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("AccessDevice", pon.device_id.to_string()))
    }

    pub fn mark_endpoint_enacted(&self, id: u32) -> Result<()> {
        let mut state = self.write();
        let endpoint = state
            .endpoints
            .get_mut(&id)
            .ok_or_else(|| EngineError::not_found("EndpointDevice", id.to_string()))?;
        endpoint.meta.enacted = Some(endpoint.meta.updated);
        endpoint.meta.backend_status = "OK".into();
        endpoint.meta.backend_code = BACKEND_OK;
        Ok(())
    }

    pub fn mark_endpoint_failed(&self, id: u32, status: &str) -> Result<()> {
        let mut state = self.write();
        let endpoint = state
            .endpoints
            .get_mut(&id)
            .ok_or_else(|| EngineError::not_found("EndpointDevice", id.to_string()))?;
        endpoint.meta.backend_status = status.into();
        endpoint.meta.backend_code = BACKEND_ERROR;
        endpoint.meta.enacted = Some(endpoint.meta.updated);
        Ok(())
    }

    /// Refused while any subscriber attachment references the endpoint.
    pub fn remove_endpoint(&self, id: u32) -> Result<()> {
        let mut state = self.write();
        if !state.endpoints.contains_key(&id) {
            return Err(EngineError::not_found("EndpointDevice", id.to_string()));
        }
        if state.attachments.values().any(|a| a.endpoint_id == Some(id)) {
            return Err(EngineError::validation(format!(
                "endpoint device {id} is referenced by a subscriber attachment"
            )));
        }
        state.uni_ports.retain(|_, p| p.endpoint_id != id);
        state.endpoints.remove(&id);
        Ok(())
    }

    // ── ports ──────────────────────────────────────────────────────────

    /// Upsert keyed on `(device_id, port_no)`.
    pub fn upsert_nni_port(&self, port: NniPort) -> NniPort {
        let mut state = self.write();
        let existing = state
            .nni_ports
            .values()
            .find(|p| p.device_id == port.device_id && p.port_no == port.port_no)
            .map(|p| p.meta.clone());
        let mut port = port;
        match existing {
            Some(meta) => port.meta = meta,
            None => port.meta.id = state.next_id(),
        }
        port.meta.updated = state.tick();
        state.nni_ports.insert(port.meta.id, port.clone());
        port
    }

    /// Upsert keyed on `(device_id, port_no)`; allocates an s-tag unique
    /// among siblings when the port is new and carries none.
    pub fn upsert_pon_port(&self, port: PonPort) -> PonPort {
        let mut state = self.write();
        let existing = state
            .pon_ports
            .values()
            .find(|p| p.device_id == port.device_id && p.port_no == port.port_no)
            .map(|p| (p.meta.clone(), p.s_tag));
        let mut port = port;
        match existing {
            Some((meta, s_tag)) => {
                port.meta = meta;
                if port.s_tag.is_none() {
                    port.s_tag = s_tag;
                }
            }
            None => {
                port.meta.id = state.next_id();
                if port.s_tag.is_none() {
                    let next = state
                        .pon_ports
                        .values()
                        .filter(|p| p.device_id == port.device_id)
                        .filter_map(|p| p.s_tag)
                        .max()
                        .map_or(S_TAG_BASE, |tag| tag + 1);
                    port.s_tag = Some(next);
                }
            }
        }
        port.meta.updated = state.tick();
        state.pon_ports.insert(port.meta.id, port.clone());
        port
    }

    /// Upsert keyed on `(endpoint_id, port_no)`.
    pub fn upsert_uni_port(&self, port: UniPort) -> UniPort {
        let mut state = self.write();
        let existing = state
            .uni_ports
            .values()
            .find(|p| p.endpoint_id == port.endpoint_id && p.port_no == port.port_no)
            .map(|p| p.meta.clone());
        let mut port = port;
        match existing {
            Some(meta) => port.meta = meta,
            None => port.meta.id = state.next_id(),
        }
        port.meta.updated = state.tick();
        state.uni_ports.insert(port.meta.id, port.clone());
        port
    }

    pub fn get_pon_port(&self, id: u32) -> Result<PonPort> {
        self.read()
            .pon_ports
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("PonPort", id.to_string()))
    }

    #[must_use]
    pub fn find_pon_port(&self, device_id: u32, port_no: u32) -> Option<PonPort> {
        self.read()
            .pon_ports
            .values()
            .find(|p| p.device_id == device_id && p.port_no == port_no)
            .cloned()
    }

    #[must_use]
    pub fn pon_ports_for_device(&self, device_id: u32) -> Vec<PonPort> {
        let mut ports: Vec<_> = self
            .read()
            .pon_ports
            .values()
            .filter(|p| p.device_id == device_id)
            .cloned()
            .collect();
        ports.sort_by_key(|p| p.meta.id);
        ports
    }

    #[must_use]
    pub fn uni_ports_for_endpoint(&self, endpoint_id: u32) -> Vec<UniPort> {
        let mut ports: Vec<_> = self
            .read()
            .uni_ports
            .values()
            .filter(|p| p.endpoint_id == endpoint_id)
            .cloned()
            .collect();
        ports.sort_by_key(|p| p.meta.id);
        ports
    }

    // ── subscriber attachments ─────────────────────────────────────────

    pub fn save_attachment(&self, mut attachment: SubscriberAttachment) -> SubscriberAttachment {
        let mut state = self.write();
        if attachment.meta.id == 0 {
            attachment.meta.id = state.next_id();
        }
        attachment.meta.updated = state.tick();
        state
            .attachments
            .insert(attachment.meta.id, attachment.clone());
        attachment
    }

    pub fn save_attachment_quiet(
        &self,
        mut attachment: SubscriberAttachment,
    ) -> SubscriberAttachment {
        let mut state = self.write();
        if attachment.meta.id == 0 {
            attachment.meta.id = state.next_id();
        }
        state
            .attachments
            .insert(attachment.meta.id, attachment.clone());
        attachment
    }

    pub fn get_attachment(&self, id: u32) -> Result<SubscriberAttachment> {
        self.read()
            .attachments
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("SubscriberAttachment", id.to_string()))
    }

    #[must_use]
    pub fn list_attachments(&self) -> Vec<SubscriberAttachment> {
        let mut attachments: Vec<_> = self.read().attachments.values().cloned().collect();
        attachments.sort_by_key(|a| a.meta.id);
        attachments
    }

    #[must_use]
    pub fn attachments_for_service(&self, service_id: u32) -> Vec<SubscriberAttachment> {
        let mut attachments: Vec<_> = self
            .read()
            .attachments
            .values()
            .filter(|a| a.service_id == service_id)
            .cloned()
            .collect();
        attachments.sort_by_key(|a| a.meta.id);
        attachments
    }

    #[must_use]
    pub fn attachments_for_endpoint(&self, endpoint_id: u32) -> Vec<SubscriberAttachment> {
        let mut attachments: Vec<_> = self
            .read()
            .attachments
            .values()
            .filter(|a| a.endpoint_id == Some(endpoint_id))
            .cloned()
            .collect();
        attachments.sort_by_key(|a| a.meta.id);
        attachments
    }

    pub fn mark_attachment_enacted(&self, id: u32) -> Result<()> {
        let mut state = self.write();
        let attachment = state
            .attachments
            .get_mut(&id)
            .ok_or_else(|| EngineError::not_found("SubscriberAttachment", id.to_string()))?;
        attachment.meta.enacted = Some(attachment.meta.updated);
        attachment.meta.backend_status = "OK".into();
        attachment.meta.backend_code = BACKEND_OK;
        Ok(())
    }

    pub fn mark_attachment_failed(&self, id: u32, status: &str) -> Result<()> {
        let mut state = self.write();
        let attachment = state
            .attachments
            .get_mut(&id)
            .ok_or_else(|| EngineError::not_found("SubscriberAttachment", id.to_string()))?;
        attachment.meta.backend_status = status.into();
        attachment.meta.backend_code = BACKEND_ERROR;
        attachment.meta.enacted = Some(attachment.meta.updated);
        Ok(())
    }

    /// Reset backend status and bump `updated` so the next pass re-syncs.
    pub fn mark_attachment_dirty(&self, id: u32, status: &str) -> Result<()> {
        let mut state = self.write();
        let tick = state.tick();
        let attachment = state
            .attachments
            .get_mut(&id)
            .ok_or_else(|| EngineError::not_found("SubscriberAttachment", id.to_string()))?;
        attachment.meta.backend_status = status.into();
        attachment.meta.backend_code = BACKEND_IN_PROGRESS;
        attachment.meta.updated = tick;
        Ok(())
    }

    pub fn flag_attachment_deleted(&self, id: u32) -> Result<()> {
        let mut state = self.write();
        let tick = state.tick();
        let attachment = state
            .attachments
            .get_mut(&id)
            .ok_or_else(|| EngineError::not_found("SubscriberAttachment", id.to_string()))?;
        attachment.meta.deleted = true;
        attachment.meta.updated = tick;
        Ok(())
    }

    /// Remove an attachment together with its links.
    pub fn remove_attachment(&self, id: u32) -> Result<()> {
        let mut state = self.write();
        if state.attachments.remove(&id).is_none() {
            return Err(EngineError::not_found("SubscriberAttachment", id.to_string()));
        }
        state.links.retain(|_, l| l.subscriber_id != id);
        Ok(())
    }

    // ── downstream instances and links ─────────────────────────────────

    pub fn save_downstream(
        &self,
        mut instance: DownstreamServiceInstance,
    ) -> DownstreamServiceInstance {
        let mut state = self.write();
        if instance.meta.id == 0 {
            instance.meta.id = state.next_id();
        }
        instance.meta.updated = state.tick();
        state.downstreams.insert(instance.meta.id, instance.clone());
        instance
    }

    pub fn get_downstream(&self, id: u32) -> Result<DownstreamServiceInstance> {
        self.read()
            .downstreams
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("DownstreamServiceInstance", id.to_string()))
    }

    pub fn remove_downstream(&self, id: u32) -> Result<()> {
        let mut state = self.write();
        state
            .downstreams
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| EngineError::not_found("DownstreamServiceInstance", id.to_string()))
    }

    pub fn save_link(&self, mut link: Link) -> Link {
        let mut state = self.write();
        if link.meta.id == 0 {
            link.meta.id = state.next_id();
        }
        link.meta.updated = state.tick();
        state.links.insert(link.meta.id, link.clone());
        link
    }

    /// Links pointing at an attachment, oldest first (ids are monotonic).
    #[must_use]
    pub fn links_for_subscriber(&self, attachment_id: u32) -> Vec<Link> {
        let mut links: Vec<_> = self
            .read()
            .links
            .values()
            .filter(|l| l.subscriber_id == attachment_id)
            .cloned()
            .collect();
        links.sort_by_key(|l| l.meta.id);
        links
    }

    pub fn remove_link(&self, id: u32) -> Result<()> {
        let mut state = self.write();
        state
            .links
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| EngineError::not_found("Link", id.to_string()))
    }

    // ── technology profiles ────────────────────────────────────────────

    /// Save a profile, enforcing the `(technology, profile_id)` unique key.
    pub fn save_profile(&self, mut profile: TechnologyProfile) -> Result<TechnologyProfile> {
        let mut state = self.write();
        let duplicate = state.profiles.values().any(|p| {
            p.technology == profile.technology
                && p.profile_id == profile.profile_id
                && p.meta.id != profile.meta.id
        });
        if duplicate {
            return Err(EngineError::validation(format!(
                "technology profile ({}, {}) already exists",
                profile.technology, profile.profile_id
            )));
        }
        if profile.meta.id == 0 {
            profile.meta.id = state.next_id();
        }
        profile.meta.updated = state.tick();
        state.profiles.insert(profile.meta.id, profile.clone());
        Ok(profile)
    }

    pub fn save_profile_quiet(&self, mut profile: TechnologyProfile) -> TechnologyProfile {
        let mut state = self.write();
        if profile.meta.id == 0 {
            profile.meta.id = state.next_id();
        }
        state.profiles.insert(profile.meta.id, profile.clone());
        profile
    }

    pub fn get_profile(&self, id: u32) -> Result<TechnologyProfile> {
        self.read()
            .profiles
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("TechnologyProfile", id.to_string()))
    }

    #[must_use]
    pub fn find_profile(&self, technology: Technology, profile_id: u32) -> Option<TechnologyProfile> {
        self.read()
            .profiles
            .values()
            .find(|p| p.technology == technology && p.profile_id == profile_id)
            .cloned()
    }

    /// Whether any profile for the technology has been synchronized; the
    /// device sync precondition.
    #[must_use]
    pub fn has_enacted_profile(&self, technology: Technology) -> bool {
        self.read()
            .profiles
            .values()
            .any(|p| p.technology == technology && !p.meta.is_dirty() && !p.meta.is_failed())
    }

    pub fn mark_profile_enacted(&self, id: u32) -> Result<()> {
        let mut state = self.write();
        let profile = state
            .profiles
            .get_mut(&id)
            .ok_or_else(|| EngineError::not_found("TechnologyProfile", id.to_string()))?;
        profile.meta.enacted = Some(profile.meta.updated);
        profile.meta.backend_status = "OK".into();
        profile.meta.backend_code = BACKEND_OK;
        Ok(())
    }

    pub fn mark_profile_failed(&self, id: u32, status: &str) -> Result<()> {
        let mut state = self.write();
        let profile = state
            .profiles
            .get_mut(&id)
            .ok_or_else(|| EngineError::not_found("TechnologyProfile", id.to_string()))?;
        profile.meta.backend_status = status.into();
        profile.meta.backend_code = BACKEND_ERROR;
        profile.meta.enacted = Some(profile.meta.updated);
        Ok(())
    }

    pub fn flag_profile_deleted(&self, id: u32) -> Result<()> {
        let mut state = self.write();
        let tick = state.tick();
        let profile = state
            .profiles
            .get_mut(&id)
            .ok_or_else(|| EngineError::not_found("TechnologyProfile", id.to_string()))?;
        profile.meta.deleted = true;
        profile.meta.updated = tick;
        Ok(())
    }

    pub fn remove_profile(&self, id: u32) -> Result<()> {
        let mut state = self.write();
        state
            .profiles
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| EngineError::not_found("TechnologyProfile", id.to_string()))
    }

    // ── dirty/deleted scans for the worker ─────────────────────────────

    #[must_use]
    pub fn dirty_profiles(&self) -> Vec<TechnologyProfile> {
        let mut records: Vec<_> = self
            .read()
            .profiles
            .values()
            .filter(|p| p.meta.is_dirty() && !p.meta.deleted)
            .cloned()
            .collect();
        records.sort_by_key(|p| p.meta.id);
        records
    }

    #[must_use]
    pub fn dirty_devices(&self) -> Vec<AccessDevice> {
        let mut records: Vec<_> = self
            .read()
            .devices
            .values()
            .filter(|d| d.meta.is_dirty() && !d.meta.deleted)
            .cloned()
            .collect();
        records.sort_by_key(|d| d.meta.id);
        records
    }

    #[must_use]
    pub fn dirty_endpoints(&self) -> Vec<EndpointDevice> {
        let mut records: Vec<_> = self
            .read()
            .endpoints
            .values()
            .filter(|e| e.meta.is_dirty() && !e.meta.deleted)
            .cloned()
            .collect();
        records.sort_by_key(|e| e.meta.id);
        records
    }

    #[must_use]
    pub fn dirty_attachments(&self) -> Vec<SubscriberAttachment> {
        let mut records: Vec<_> = self
            .read()
            .attachments
            .values()
            .filter(|a| a.meta.is_dirty() && !a.meta.deleted)
            .cloned()
            .collect();
        records.sort_by_key(|a| a.meta.id);
        records
    }

    #[must_use]
    pub fn deleted_devices(&self) -> Vec<AccessDevice> {
        let mut records: Vec<_> = self
            .read()
            .devices
            .values()
            .filter(|d| d.meta.deleted)
            .cloned()
            .collect();
        records.sort_by_key(|d| d.meta.id);
        records
    }

    #[must_use]
    pub fn deleted_attachments(&self) -> Vec<SubscriberAttachment> {
        let mut records: Vec<_> = self
            .read()
            .attachments
            .values()
            .filter(|a| a.meta.deleted)
            .cloned()
            .collect();
        records.sort_by_key(|a| a.meta.id);
        records
    }

    #[must_use]
    pub fn deleted_profiles(&self) -> Vec<TechnologyProfile> {
        let mut records: Vec<_> = self
            .read()
            .profiles
            .values()
            .filter(|p| p.meta.deleted)
            .cloned()
            .collect();
        records.sort_by_key(|p| p.meta.id);
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device_under(store: &RecordStore, service_id: u32) -> AccessDevice {
        store.save_device(AccessDevice {
            name: "olt1".into(),
            service_id,
            host: Some("10.0.0.1".into()),
            port: Some(50060),
            ..Default::default()
        })
    }

    #[test]
    fn test_save_bumps_updated_and_dirty_tracking() {
        let store = RecordStore::new();
        let device = device_under(&store, 1);
        assert!(device.meta.is_dirty());

        store.mark_device_enacted(device.meta.id).unwrap();
        let device = store.get_device(device.meta.id).unwrap();
        assert!(!device.meta.is_dirty());
        assert_eq!(device.meta.backend_code, BACKEND_OK);

        let device = store.save_device(device);
        assert!(device.meta.is_dirty());
    }

    #[test]
    fn test_quiet_save_does_not_dirty() {
        let store = RecordStore::new();
        let device = device_under(&store, 1);
        store.mark_device_enacted(device.meta.id).unwrap();

        let mut device = store.get_device(device.meta.id).unwrap();
        device.oper_status = Some("ACTIVATING".into());
        let device = store.save_device_quiet(device);
        assert!(!device.meta.is_dirty());
    }

    #[test]
    fn test_pon_port_s_tag_unique_per_device() {
        let store = RecordStore::new();
        let device = device_under(&store, 1);
        let p1 = store.upsert_pon_port(PonPort {
            port_no: 1,
            name: "pon-1".into(),
            device_id: device.meta.id,
            ..Default::default()
        });
        let p2 = store.upsert_pon_port(PonPort {
            port_no: 2,
            name: "pon-2".into(),
            device_id: device.meta.id,
            ..Default::default()
        });
        assert_ne!(p1.s_tag, p2.s_tag);

        // Re-upserting the same port keeps id and s_tag stable.
        let p1_again = store.upsert_pon_port(PonPort {
            port_no: 1,
            name: "pon-1-renamed".into(),
            device_id: device.meta.id,
            ..Default::default()
        });
        assert_eq!(p1_again.meta.id, p1.meta.id);
        assert_eq!(p1_again.s_tag, p1.s_tag);
        assert_eq!(p1_again.name, "pon-1-renamed");
    }

    #[test]
    fn test_remove_device_blocked_by_attachment() {
        let store = RecordStore::new();
        let device = device_under(&store, 1);
        let pon = store.upsert_pon_port(PonPort {
            port_no: 1,
            device_id: device.meta.id,
            ..Default::default()
        });
        let endpoint = store.save_endpoint(EndpointDevice {
            serial_number: "BRCM1234".into(),
            pon_port_id: pon.meta.id,
            ..Default::default()
        });
        store.save_attachment(SubscriberAttachment {
            name: "sub1".into(),
            endpoint_id: Some(endpoint.meta.id),
            ..Default::default()
        });

        assert!(store.remove_device(device.meta.id).is_err());
        assert!(store.remove_endpoint(endpoint.meta.id).is_err());
    }

    #[test]
    fn test_remove_device_cascades_ports_and_endpoints() {
        let store = RecordStore::new();
        let device = device_under(&store, 1);
        let pon = store.upsert_pon_port(PonPort {
            port_no: 1,
            device_id: device.meta.id,
            ..Default::default()
        });
        store.save_endpoint(EndpointDevice {
            serial_number: "BRCM1234".into(),
            pon_port_id: pon.meta.id,
            ..Default::default()
        });

        store.remove_device(device.meta.id).unwrap();
        assert!(store.find_endpoint_by_serial("BRCM1234").is_none());
        assert!(store.find_pon_port(device.meta.id, 1).is_none());
    }

    #[test]
    fn test_profile_unique_key() {
        let store = RecordStore::new();
        store
            .save_profile(TechnologyProfile {
                technology: Technology::Gpon,
                profile_id: 64,
                profile_value: "{}".into(),
                ..Default::default()
            })
            .unwrap();
        let duplicate = store.save_profile(TechnologyProfile {
            technology: Technology::Gpon,
            profile_id: 64,
            profile_value: "{}".into(),
            ..Default::default()
        });
        assert!(duplicate.is_err());
    }

    #[test]
    fn test_mark_failed_stops_retry() {
        let store = RecordStore::new();
        let device = device_under(&store, 1);
        store
            .mark_device_failed(device.meta.id, "Serial number mismatch")
            .unwrap();
        let device = store.get_device(device.meta.id).unwrap();
        assert!(device.meta.is_failed());
        assert!(!device.meta.is_dirty());
        assert!(store.dirty_devices().is_empty());
    }

    #[test]
    fn test_mark_dirty_resets_status() {
        let store = RecordStore::new();
        let attachment = store.save_attachment(SubscriberAttachment {
            name: "sub1".into(),
            ..Default::default()
        });
        store.mark_attachment_enacted(attachment.meta.id).unwrap();
        store
            .mark_attachment_dirty(attachment.meta.id, "resynchronize due to workload event")
            .unwrap();
        let attachment = store.get_attachment(attachment.meta.id).unwrap();
        assert!(attachment.meta.is_dirty());
        assert_eq!(attachment.meta.backend_code, BACKEND_IN_PROGRESS);
    }
}
