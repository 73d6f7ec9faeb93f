//! Service graph: access services and their typed capability dependencies.
//!
//! Components never scan dependency names for substrings; they query by
//! [`Capability`] tag.

use serde::{Deserialize, Serialize};

use crate::model::RecordMeta;

/// What a dependency of an access service can do for the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Capability {
    /// An SDN controller exposing the netcfg and subscriber-flow APIs.
    Controller {
        rest_url: String,
        username: String,
        password: String,
    },
    /// A provisioning-policy (OSS) service that validates endpoint devices.
    Validation,
    /// A factory for downstream service instances (vCPE-equivalent).
    Downstream,
}

/// One declared dependency of an access service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDependency {
    /// Dependency name; matched against external identifiers such as the
    /// `xos_service` workload label.
    pub name: String,
    pub capability: Capability,
}

/// Top-level access service owning devices and attachments.
///
/// Carries the device-backend coordinates for its deployment, the way the
/// original kept backend endpoints on the service record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessService {
    pub meta: RecordMeta,
    pub name: String,
    /// Device-management backend endpoint, scheme optional.
    pub backend_url: String,
    pub dependencies: Vec<ServiceDependency>,
}

impl AccessService {
    /// The controller dependency, if one is declared.
    #[must_use]
    pub fn controller(&self) -> Option<&ServiceDependency> {
        self.dependencies
            .iter()
            .find(|d| matches!(d.capability, Capability::Controller { .. }))
    }

    /// All validation (OSS) dependencies, declaration order preserved.
    #[must_use]
    pub fn validators(&self) -> Vec<&ServiceDependency> {
        self.dependencies
            .iter()
            .filter(|d| matches!(d.capability, Capability::Validation))
            .collect()
    }

    /// All downstream-instance factories, declaration order preserved.
    #[must_use]
    pub fn downstreams(&self) -> Vec<&ServiceDependency> {
        self.dependencies
            .iter()
            .filter(|d| matches!(d.capability, Capability::Downstream))
            .collect()
    }
}
