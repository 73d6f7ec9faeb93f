//! Outbound sync state machine against mocked backend and controller.

mod support;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use oltsync_core::model::{AdminState, Technology, TechnologyProfile};
use oltsync_core::{EngineError, Progress};
use oltsync_engine::sync;

use support::{harness, seed_device, seed_enacted_profile, seed_service};

#[tokio::test]
async fn test_device_sync_defers_without_technology_profile() {
    let h = harness();
    let service = seed_service(&h.store, "http://127.0.0.1:1", "http://127.0.0.1:1");
    let device = seed_device(&h.store, service.meta.id);

    let progress = sync::sync_access_device(&h.ctx, device.meta.id)
        .await
        .unwrap();
    assert!(progress.is_deferred());
}

#[tokio::test]
async fn test_device_activation_provisions_enables_and_registers() {
    let h = harness();
    let backend = MockServer::start().await;
    let controller = MockServer::start().await;
    let service = seed_service(&h.store, &backend.uri(), &controller.uri());
    seed_enacted_profile(&h.store, Technology::Gpon);
    let device = seed_device(&h.store, service.meta.id);

    Mock::given(method("POST"))
        .and(path("/api/v1/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "dev-1",
            "serial_number": "OLT-SN-1"
        })))
        .expect(1)
        .mount(&backend)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/devices/dev-1/enable"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&backend)
        .await;
    // First observation is still ACTIVATING; the poll loop sees ACTIVE on
    // the second read.
    Mock::given(method("GET"))
        .and(path("/api/v1/devices/dev-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "dev-1",
            "type": "simulated_olt",
            "admin_state": "ENABLED",
            "oper_status": "ACTIVATING"
        })))
        .up_to_n_times(1)
        .mount(&backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/devices/dev-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "dev-1",
            "type": "simulated_olt",
            "admin_state": "ENABLED",
            "oper_status": "ACTIVE"
        })))
        .mount(&backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/logical_devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "id": "ld-1",
                "datapath_id": "55334486016",
                "root_device_id": "dev-1"
            }]
        })))
        .mount(&backend)
        .await;
    Mock::given(method("POST"))
        .and(path("/onos/v1/network/configuration/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&controller)
        .await;

    let progress = sync::sync_access_device(&h.ctx, device.meta.id)
        .await
        .unwrap();
    assert_eq!(progress, Progress::Complete);

    let device = h.store.get_device(device.meta.id).unwrap();
    assert_eq!(device.device_id.as_deref(), Some("dev-1"));
    assert_eq!(device.serial_number.as_deref(), Some("OLT-SN-1"));
    assert_eq!(device.oper_status.as_deref(), Some("ACTIVE"));
    assert_eq!(device.dp_id.as_deref(), Some("of:0000000ce2314000"));
}

#[tokio::test]
async fn test_device_activation_timeout_leaves_record_dirty() {
    let h = harness();
    let backend = MockServer::start().await;
    let service = seed_service(&h.store, &backend.uri(), "http://127.0.0.1:1");
    seed_enacted_profile(&h.store, Technology::Gpon);
    let mut device = seed_device(&h.store, service.meta.id);
    device.device_id = Some("dev-1".into());
    let device = h.store.save_device(device);

    Mock::given(method("POST"))
        .and(path("/api/v1/devices/dev-1/enable"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&backend)
        .await;
    // Never leaves ACTIVATING; the bounded poll gives up.
    Mock::given(method("GET"))
        .and(path("/api/v1/devices/dev-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "dev-1",
            "type": "simulated_olt",
            "admin_state": "ENABLED",
            "oper_status": "ACTIVATING"
        })))
        .mount(&backend)
        .await;

    let err = sync::sync_access_device(&h.ctx, device.meta.id)
        .await
        .unwrap_err();
    // Retryable: the next scheduled pass attempts activation again.
    assert!(err.is_retryable());
    match &err {
        EngineError::Transport { message } => {
            assert!(message.contains("not possible to activate"));
        }
        other => panic!("expected transport error, got {other:?}"),
    }

    let device = h.store.get_device(device.meta.id).unwrap();
    assert!(device.meta.is_dirty());
    assert!(!device.meta.is_failed());
    assert!(device.meta.backend_status.contains("not possible to activate"));
}

#[tokio::test]
async fn test_disabling_active_device_skips_controller() {
    let h = harness();
    let backend = MockServer::start().await;
    let controller = MockServer::start().await;
    let service = seed_service(&h.store, &backend.uri(), &controller.uri());
    seed_enacted_profile(&h.store, Technology::Gpon);
    let mut device = seed_device(&h.store, service.meta.id);
    device.device_id = Some("dev-1".into());
    device.admin_state = AdminState::Disabled;
    device.oper_status = Some("ACTIVE".into());
    let device = h.store.save_device(device);

    Mock::given(method("POST"))
        .and(path("/api/v1/devices/dev-1/disable"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&backend)
        .await;
    Mock::given(method("POST"))
        .and(path("/onos/v1/network/configuration/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&controller)
        .await;

    let progress = sync::sync_access_device(&h.ctx, device.meta.id)
        .await
        .unwrap();
    assert_eq!(progress, Progress::Complete);
    let device = h.store.get_device(device.meta.id).unwrap();
    assert_eq!(device.oper_status.as_deref(), Some("DISABLING"));
}

#[tokio::test]
async fn test_attachment_defers_until_device_has_datapath_id() {
    let h = harness();
    let service = seed_service(&h.store, "http://127.0.0.1:1", "http://127.0.0.1:1");
    let device = seed_device(&h.store, service.meta.id);
    let pon = support::seed_pon_port(&h.store, device.meta.id, 0);
    let endpoint = support::seed_endpoint(&h.store, pon.meta.id, "BRCM1234");
    let mut attachment = support::seed_attachment(&h.store, service.meta.id, "BRCM1234");
    attachment.endpoint_id = Some(endpoint.meta.id);
    let attachment = h.store.save_attachment(attachment);

    let progress = sync::sync_attachment(&h.ctx, attachment.meta.id)
        .await
        .unwrap();
    assert!(progress.is_deferred());
}

#[tokio::test]
async fn test_attachment_sync_stores_flow_handle() {
    let h = harness();
    let controller = MockServer::start().await;
    let service = seed_service(&h.store, "http://127.0.0.1:1", &controller.uri());
    let mut device = seed_device(&h.store, service.meta.id);
    device.dp_id = Some("of:0000000ce2314000".into());
    let device = h.store.save_device(device);
    let pon = support::seed_pon_port(&h.store, device.meta.id, 0);
    let endpoint = support::seed_endpoint(&h.store, pon.meta.id, "BRCM1234");
    let mut attachment = support::seed_attachment(&h.store, service.meta.id, "BRCM1234");
    attachment.endpoint_id = Some(endpoint.meta.id);
    let attachment = h.store.save_attachment(attachment);

    Mock::given(method("POST"))
        .and(path("/onos/olt/oltapp/of:0000000ce2314000/16"))
        .respond_with(ResponseTemplate::new(200).set_body_string("flow-1"))
        .expect(1)
        .mount(&controller)
        .await;

    let progress = sync::sync_attachment(&h.ctx, attachment.meta.id)
        .await
        .unwrap();
    assert_eq!(progress, Progress::Complete);
    let attachment = h.store.get_attachment(attachment.meta.id).unwrap();
    assert_eq!(attachment.backend_handle.as_deref(), Some("flow-1"));
}

#[tokio::test]
async fn test_profile_sync_writes_kv_and_snapshots_value() {
    let kv = MockServer::start().await;
    let h = support::harness_with(&kv.uri(), Default::default());
    let profile = h
        .store
        .save_profile(TechnologyProfile {
            technology: Technology::Xgspon,
            profile_id: 64,
            profile_value: "{\"num_gem_ports\": 1}".into(),
            ..Default::default()
        })
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/v3/kv/put"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&kv)
        .await;

    let progress = sync::sync_tech_profile(&h.ctx, profile.meta.id)
        .await
        .unwrap();
    assert_eq!(progress, Progress::Complete);
    let profile = h.store.get_profile(profile.meta.id).unwrap();
    assert_eq!(profile.synced_value, Some(profile.profile_value.clone()));
}

#[tokio::test]
async fn test_profile_content_change_after_sync_is_rejected() {
    let h = harness();
    let mut profile = seed_enacted_profile(&h.store, Technology::Gpon);
    profile.profile_value = "{\"changed\": true}".into();
    let profile = h.store.save_profile(profile).unwrap();

    let err = sync::sync_tech_profile(&h.ctx, profile.meta.id)
        .await
        .unwrap_err();
    match err {
        EngineError::Validation { message } => assert!(message.contains("immutable")),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_profile_with_invalid_json_is_rejected() {
    let h = harness();
    let profile = h
        .store
        .save_profile(TechnologyProfile {
            technology: Technology::Gpon,
            profile_id: 64,
            profile_value: "not json".into(),
            ..Default::default()
        })
        .unwrap();

    let err = sync::sync_tech_profile(&h.ctx, profile.meta.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation { .. }));
}
