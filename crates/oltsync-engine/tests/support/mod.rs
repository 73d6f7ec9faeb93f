//! Shared fixtures for the engine integration tests.

use std::sync::Arc;
use std::time::Duration;

use oltsync_client::ProfileKvClient;
use oltsync_core::graph::{AccessService, Capability, ServiceDependency};
use oltsync_core::model::{
    AccessDevice, AdminState, EndpointDevice, PonPort, SubscriberAttachment, Technology,
    TechnologyProfile,
};
use oltsync_engine::context::{EngineContext, PollConfig, RetryConfig, ValidationRegistry};
use oltsync_store::{MemoryAlarmSink, RecordStore};

pub const CONTROLLER_DEP: &str = "onos-access";
pub const VALIDATION_DEP: &str = "oss-prov";
pub const DOWNSTREAM_DEP: &str = "vcpe";

pub struct Harness {
    pub ctx: Arc<EngineContext>,
    pub store: Arc<RecordStore>,
    pub alarms: Arc<MemoryAlarmSink>,
}

/// Context with test-sized poll/retry budgets and a dead profile KV
/// endpoint (tests that need the KV pass a live one).
pub fn harness() -> Harness {
    harness_with("http://127.0.0.1:1", ValidationRegistry::new())
}

pub fn harness_with(profile_kv_uri: &str, validators: ValidationRegistry) -> Harness {
    let store = Arc::new(RecordStore::new());
    let alarms = Arc::new(MemoryAlarmSink::new());
    let ctx = Arc::new(EngineContext {
        store: Arc::clone(&store),
        alarms: alarms.clone(),
        profile_kv: ProfileKvClient::new(profile_kv_uri).unwrap(),
        validators,
        poll: PollConfig {
            max_attempts: 3,
            interval: Duration::from_millis(1),
        },
        retry: RetryConfig {
            attempts: 3,
            delay: Duration::from_millis(1),
        },
    });
    Harness { ctx, store, alarms }
}

/// Service with one controller, one validation and one downstream
/// dependency, both HTTP endpoints pointed at `backend`/`controller`.
pub fn seed_service(store: &RecordStore, backend: &str, controller: &str) -> AccessService {
    store.insert_service(AccessService {
        name: "access".into(),
        backend_url: backend.into(),
        dependencies: vec![
            ServiceDependency {
                name: CONTROLLER_DEP.into(),
                capability: Capability::Controller {
                    rest_url: controller.into(),
                    username: "karaf".into(),
                    password: "karaf".into(),
                },
            },
            ServiceDependency {
                name: VALIDATION_DEP.into(),
                capability: Capability::Validation,
            },
            ServiceDependency {
                name: DOWNSTREAM_DEP.into(),
                capability: Capability::Downstream,
            },
        ],
        ..Default::default()
    })
}

pub fn seed_device(store: &RecordStore, service_id: u32) -> AccessDevice {
    store.save_device(AccessDevice {
        name: "olt-1".into(),
        service_id,
        device_type: "simulated_olt".into(),
        host: Some("172.17.0.1".into()),
        port: Some(50060),
        admin_state: AdminState::Enabled,
        ..Default::default()
    })
}

/// A profile for `technology` that already completed its sync.
pub fn seed_enacted_profile(store: &RecordStore, technology: Technology) -> TechnologyProfile {
    let profile = store
        .save_profile(TechnologyProfile {
            technology,
            profile_id: 64,
            profile_value: "{}".into(),
            synced_value: Some("{}".into()),
            ..Default::default()
        })
        .unwrap();
    store.mark_profile_enacted(profile.meta.id).unwrap();
    store.get_profile(profile.meta.id).unwrap()
}

pub fn seed_pon_port(store: &RecordStore, device_id: u32, port_no: u32) -> PonPort {
    store.upsert_pon_port(PonPort {
        port_no,
        name: format!("PON {port_no}"),
        device_id,
        ..Default::default()
    })
}

pub fn seed_endpoint(store: &RecordStore, pon_port_id: u32, serial: &str) -> EndpointDevice {
    store.save_endpoint(EndpointDevice {
        serial_number: serial.into(),
        vendor: "BRCM".into(),
        device_type: "simulated_onu".into(),
        device_id: Some(format!("backend-{serial}")),
        pon_port_id,
        ..Default::default()
    })
}

pub fn seed_attachment(
    store: &RecordStore,
    service_id: u32,
    serial: &str,
) -> SubscriberAttachment {
    store.save_attachment(SubscriberAttachment {
        name: format!("attachment-{serial}"),
        service_id,
        uni_port_id: Some(16),
        westbound: [("onu_device".to_string(), serial.to_string())]
            .into_iter()
            .collect(),
        ..Default::default()
    })
}
