//! Engine context: every collaborator handle, injected explicitly.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use oltsync_client::{DeviceBackendClient, ProfileKvClient, SdnControllerClient};
use oltsync_core::graph::{AccessService, Capability};
use oltsync_core::{EngineError, Result};
use oltsync_store::{AlarmSink, RecordStore};

/// Bounded activation poll: fixed attempt ceiling, fixed inter-poll delay.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        // 120 x 5s gives the device ten minutes to activate.
        Self {
            max_attempts: 120,
            interval: Duration::from_secs(5),
        }
    }
}

/// Bounded lookup retry for records that may not have propagated yet.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_secs(2),
        }
    }
}

/// Entry point of a provisioning-policy (OSS) service that validates an
/// endpoint device against the raw activation event payload.
#[async_trait]
pub trait ValidationHook: Send + Sync {
    async fn validate_endpoint(&self, payload: &serde_json::Value) -> Result<()>;
}

/// Validation hooks keyed by the dependency name that declares the
/// Validation capability.
#[derive(Default)]
pub struct ValidationRegistry {
    hooks: HashMap<String, Arc<dyn ValidationHook>>,
}

impl ValidationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, dependency: impl Into<String>, hook: Arc<dyn ValidationHook>) {
        self.hooks.insert(dependency.into(), hook);
    }

    #[must_use]
    pub fn get(&self, dependency: &str) -> Option<Arc<dyn ValidationHook>> {
        self.hooks.get(dependency).cloned()
    }
}

/// Shared collaborator handles for all reconciliation paths.
pub struct EngineContext {
    pub store: Arc<RecordStore>,
    pub alarms: Arc<dyn AlarmSink>,
    pub profile_kv: ProfileKvClient,
    pub validators: ValidationRegistry,
    pub poll: PollConfig,
    pub retry: RetryConfig,
}

impl EngineContext {
    /// Device-backend client for a service's deployment.
    pub fn backend_client(&self, service: &AccessService) -> Result<DeviceBackendClient> {
        Ok(DeviceBackendClient::new(&service.backend_url)?)
    }

    /// Controller client for the service's Controller-capability dependency.
    pub fn controller_client(&self, service: &AccessService) -> Result<SdnControllerClient> {
        for dependency in &service.dependencies {
            if let Capability::Controller {
                rest_url,
                username,
                password,
            } = &dependency.capability
            {
                return Ok(SdnControllerClient::new(rest_url, username, password)?);
            }
        }
        Err(EngineError::not_found(
            "Controller capability",
            service.name.clone(),
        ))
    }
}
