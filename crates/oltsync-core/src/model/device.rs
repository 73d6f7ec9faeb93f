//! Access-network device records: OLTs, ONUs, and their ports.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::meta::RecordMeta;
use crate::error::{EngineError, Result};

/// Desired administrative state of a device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdminState {
    #[default]
    Enabled,
    Disabled,
}

impl FromStr for AdminState {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ENABLED" => Ok(Self::Enabled),
            "DISABLED" => Ok(Self::Disabled),
            other => Err(EngineError::validation(format!(
                "unrecognized admin state: {other}"
            ))),
        }
    }
}

impl fmt::Display for AdminState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enabled => write!(f, "ENABLED"),
            Self::Disabled => write!(f, "DISABLED"),
        }
    }
}

/// Access technology of an OLT, keyed against technology profiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Technology {
    #[default]
    Gpon,
    #[serde(rename = "xgs-pon")]
    Xgspon,
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpon => write!(f, "gpon"),
            Self::Xgspon => write!(f, "xgs-pon"),
        }
    }
}

/// Fabric-facing link status, driven by port-link events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    #[default]
    Up,
    Down,
}

/// An OLT: physical or virtual access device terminating PON ports.
///
/// Identity is either `host` + `port` or `mac_address`, never both.
/// Backend identifiers (`device_id`, `of_id`, `dp_id`, `serial_number`) are
/// feedback state filled in by pull and sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessDevice {
    pub meta: RecordMeta,
    pub name: String,
    /// Owning access service.
    pub service_id: u32,
    pub device_type: String,
    pub technology: Technology,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub mac_address: Option<String>,
    pub admin_state: AdminState,
    /// Free-form status mirrored from the backend (ACTIVE, ACTIVATING, ...).
    pub oper_status: Option<String>,
    /// Backend device id, set once pre-provisioned or discovered.
    pub device_id: Option<String>,
    /// Openflow logical-device id.
    pub of_id: Option<String>,
    /// Openflow datapath id, `of:`-prefixed 16-hex-digit form.
    pub dp_id: Option<String>,
    pub serial_number: Option<String>,
    pub link_status: LinkStatus,
    /// Controller-assigned switch id carrying this device's uplink.
    pub switch_datapath_id: Option<String>,
    /// Port on that switch.
    pub switch_port: Option<String>,
    /// Uplink NNI port record, once discovered.
    pub uplink: Option<u32>,
}

impl AccessDevice {
    /// Validate the mutually exclusive physical addressing.
    pub fn validate(&self) -> Result<()> {
        let has_host = self.host.is_some() || self.port.is_some();
        let has_mac = self.mac_address.is_some();
        if has_host && has_mac {
            return Err(EngineError::validation(format!(
                "access device {} declares both host/port and mac address",
                self.name
            )));
        }
        if !has_host && !has_mac {
            return Err(EngineError::validation(format!(
                "access device {} declares neither host/port nor mac address",
                self.name
            )));
        }
        if has_host && (self.host.is_none() || self.port.is_none()) {
            return Err(EngineError::validation(format!(
                "access device {} declares host without port (or vice versa)",
                self.name
            )));
        }
        Ok(())
    }

    /// `host:port` form submitted to the backend, when host-addressed.
    #[must_use]
    pub fn host_and_port(&self) -> Option<String> {
        match (&self.host, self.port) {
            (Some(host), Some(port)) => Some(format!("{host}:{port}")),
            _ => None,
        }
    }

    /// Whether the backend reports the device operationally active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.oper_status.as_deref() == Some("ACTIVE")
    }
}

/// An ONU: subscriber-premises unit attached to one PON port.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointDevice {
    pub meta: RecordMeta,
    /// Globally unique serial number, the natural key.
    pub serial_number: String,
    pub vendor: String,
    pub device_type: String,
    /// Backend device id.
    pub device_id: Option<String>,
    pub admin_state: AdminState,
    pub oper_status: Option<String>,
    pub connect_status: Option<String>,
    /// Free-text reason for the current state, operator-facing.
    pub reason: String,
    /// Owning PON port.
    pub pon_port_id: u32,
}

/// Uplink-facing (NNI) port on an access device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NniPort {
    pub meta: RecordMeta,
    pub port_no: u32,
    pub name: String,
    pub admin_state: AdminState,
    pub oper_status: Option<String>,
    pub device_id: u32,
}

/// PON-facing port on an access device, parent of endpoint devices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PonPort {
    pub meta: RecordMeta,
    pub port_no: u32,
    pub name: String,
    pub admin_state: AdminState,
    pub oper_status: Option<String>,
    pub device_id: u32,
    /// Auto-generated VLAN s-tag, unique among siblings under one device.
    pub s_tag: Option<u16>,
}

/// Subscriber-facing (UNI) port on an endpoint device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UniPort {
    pub meta: RecordMeta,
    pub port_no: u32,
    pub name: String,
    pub admin_state: AdminState,
    pub oper_status: Option<String>,
    pub endpoint_id: u32,
}
