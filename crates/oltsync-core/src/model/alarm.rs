//! Alarm records emitted on access-device link transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether the alarm condition is being raised or cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmState {
    Raised,
    Cleared,
}

/// Port loss-of-signal alarm for an access device.
///
/// Carries the set of subscriber names reachable through the device so a
/// downstream consumer can fan out notifications without walking the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alarm {
    /// Deterministic id derived from the backend device id.
    pub id: String,
    pub category: String,
    pub alarm_type: String,
    pub state: AlarmState,
    pub severity: String,
    /// Backend device id of the affected access device.
    pub resource_id: String,
    /// Openflow datapath id of the device, when known.
    pub logical_device_id: Option<String>,
    pub affected_subscribers: Vec<String>,
    pub switch_datapath_id: Option<String>,
    pub switch_port: Option<String>,
    pub device_name: String,
    /// When the triggering event was observed by the controller.
    pub raised_at: DateTime<Utc>,
    /// When this alarm record was produced.
    pub reported_at: DateTime<Utc>,
}

impl Alarm {
    /// Deterministic alarm id for a device's port loss-of-signal condition.
    #[must_use]
    pub fn port_los_id(device_id: &str) -> String {
        format!("oltsync.access.{device_id}.PORT_LOS")
    }
}
