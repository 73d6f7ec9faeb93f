//! Subscriber attachment records and their downstream service chain.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::meta::RecordMeta;

/// A subscriber's point of attachment on the access network.
///
/// Created externally by a provisioning front end; the model policy resolves
/// its endpoint device and downstream chain, and sync programs the
/// controller-side subscriber flow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriberAttachment {
    pub meta: RecordMeta,
    pub name: String,
    /// Owning access service.
    pub service_id: u32,
    /// Resolved endpoint device, populated by the model policy.
    pub endpoint_id: Option<u32>,
    pub c_tag: Option<u16>,
    pub s_tag: Option<u16>,
    /// UNI port number used when programming the subscriber flow.
    pub uni_port_id: Option<u32>,
    /// Controller-side handle for the programmed flow.
    pub backend_handle: Option<String>,
    /// Count of inbound links deleted since creation; used to detect detach.
    pub link_deleted_count: u32,
    /// Westbound properties handed down by the provisioning front end
    /// (e.g. `onu_device` naming the ONU serial number).
    pub westbound: HashMap<String, String>,
}

impl SubscriberAttachment {
    /// Read a westbound property set by the provisioning front end.
    #[must_use]
    pub fn westbound_property(&self, name: &str) -> Option<&str> {
        self.westbound.get(name).map(String::as_str)
    }
}

/// A dependent service record provisioned per attachment (vCPE-equivalent).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownstreamServiceInstance {
    pub meta: RecordMeta,
    pub name: String,
    /// Name of the Downstream-capability dependency that produced this.
    pub owner_dependency: String,
}

/// Directed provider/subscriber association between two service instances.
///
/// Provider is a [`DownstreamServiceInstance`], subscriber is a
/// [`SubscriberAttachment`]. At most one live link per attachment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub meta: RecordMeta,
    pub provider_id: u32,
    pub subscriber_id: u32,
}
