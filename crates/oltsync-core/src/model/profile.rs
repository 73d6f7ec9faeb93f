//! Technology profile records pushed to the profile KV store.

use serde::{Deserialize, Serialize};

use super::device::Technology;
use super::meta::RecordMeta;

/// Opaque per-technology profile, keyed `(technology, profile_id)`.
///
/// Once synchronized the content is immutable; a correction requires
/// delete-then-recreate, never in-place modification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnologyProfile {
    pub meta: RecordMeta,
    pub technology: Technology,
    pub profile_id: u32,
    /// Opaque JSON document, validated but not interpreted.
    pub profile_value: String,
    /// Snapshot of the value at last successful sync, for the
    /// immutability check.
    pub synced_value: Option<String>,
}

impl TechnologyProfile {
    /// KV key under the configured prefix.
    #[must_use]
    pub fn kv_key(&self) -> String {
        format!("/{}/{}", self.technology, self.profile_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kv_key_layout() {
        let profile = TechnologyProfile {
            technology: Technology::Xgspon,
            profile_id: 64,
            ..Default::default()
        };
        assert_eq!(profile.kv_key(), "/xgs-pon/64");
    }
}
