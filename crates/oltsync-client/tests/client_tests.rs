//! Integration tests for the HTTP clients using wiremock.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use oltsync_client::{ClientError, DeviceBackendClient, NewDevice, ProfileKvClient, SdnControllerClient};

// ─── device backend ────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_devices() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "id": "test_id",
                    "type": "simulated_olt",
                    "host_and_port": "172.17.0.1:50060",
                    "admin_state": "ENABLED",
                    "oper_status": "ACTIVE"
                }
            ]
        })))
        .mount(&server)
        .await;

    let client = DeviceBackendClient::new(&server.uri()).unwrap();
    let devices = client.list_devices().await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].id, "test_id");
    assert_eq!(devices[0].device_type, "simulated_olt");
    assert_eq!(devices[0].host_and_port.as_deref(), Some("172.17.0.1:50060"));
}

#[tokio::test]
async fn test_list_devices_non_200_is_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/devices"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = DeviceBackendClient::new(&server.uri()).unwrap();
    let err = client.list_devices().await.unwrap_err();
    match err {
        ClientError::Status { status, .. } => assert_eq!(status, 500),
        other => panic!("expected status error, got {other:?}"),
    }
    assert!(!err.is_connection());
}

#[tokio::test]
async fn test_list_devices_connection_refused() {
    // Nothing listens on this port.
    let client = DeviceBackendClient::new("http://127.0.0.1:1").unwrap();
    let err = client.list_devices().await.unwrap_err();
    assert!(err.is_connection());
}

#[tokio::test]
async fn test_create_device_posts_host_and_port() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/devices"))
        .and(body_json(json!({
            "type": "simulated_olt",
            "host_and_port": "172.17.0.1:50060"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "123",
            "serial_number": "OLT-SN-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = DeviceBackendClient::new(&server.uri()).unwrap();
    let created = client
        .create_device(&NewDevice {
            device_type: "simulated_olt".into(),
            host_and_port: Some("172.17.0.1:50060".into()),
            mac_address: None,
        })
        .await
        .unwrap();
    assert_eq!(created.id, "123");
    assert_eq!(created.serial_number.as_deref(), Some("OLT-SN-1"));
}

#[tokio::test]
async fn test_device_lifecycle_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/devices/123/enable"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/devices/123/disable"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/devices/123/delete"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = DeviceBackendClient::new(&server.uri()).unwrap();
    client.enable_device("123").await.unwrap();
    client.disable_device("123").await.unwrap();
    client.delete_device("123").await.unwrap();
}

#[tokio::test]
async fn test_logical_devices_and_ports() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/logical_devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                { "id": "of_id", "datapath_id": "55334486016", "root_device_id": "test_id" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/devices/test_id/ports"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                { "label": "PON port", "port_no": 1, "type": "PON_OLT",
                  "admin_state": "ENABLED", "oper_status": "ACTIVE" },
                { "label": "NNI facing Ethernet port", "port_no": 2, "type": "ETHERNET_NNI",
                  "admin_state": "ENABLED", "oper_status": "ACTIVE" }
            ]
        })))
        .mount(&server)
        .await;

    let client = DeviceBackendClient::new(&server.uri()).unwrap();
    let logical = client.list_logical_devices().await.unwrap();
    assert_eq!(logical[0].root_device_id, "test_id");
    assert_eq!(logical[0].datapath_id, "55334486016");

    let ports = client.device_ports("test_id").await.unwrap();
    assert_eq!(ports.len(), 2);
    assert_eq!(ports[1].port_type, "ETHERNET_NNI");
}

// ─── sdn controller ────────────────────────────────────────────────────

#[tokio::test]
async fn test_register_device_body_and_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/onos/v1/network/configuration/"))
        .and(wiremock::matchers::header(
            "authorization",
            // karaf:karaf
            "Basic a2FyYWY6a2FyYWY=",
        ))
        .and(body_json(json!({
            "devices": {
                "of:0000000ce2314000": { "basic": { "name": "olt1" } }
            }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = SdnControllerClient::new(&server.uri(), "karaf", "karaf").unwrap();
    client
        .register_device("of:0000000ce2314000", "olt1")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_subscriber_flow_handle_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/onos/olt/oltapp/of:0000000ce2314000/16"))
        .respond_with(ResponseTemplate::new(200).set_body_string("flow-42"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/onos/olt/oltapp/flow-42"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = SdnControllerClient::new(&server.uri(), "karaf", "karaf").unwrap();
    let handle = client
        .add_subscriber_flow("of:0000000ce2314000", 16)
        .await
        .unwrap();
    assert_eq!(handle, "flow-42");
    client.remove_subscriber_flow(&handle).await.unwrap();
}

#[tokio::test]
async fn test_subscriber_flow_empty_body_falls_back_to_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/onos/olt/oltapp/of:0000000ce2314000/16"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = SdnControllerClient::new(&server.uri(), "karaf", "karaf").unwrap();
    let handle = client
        .add_subscriber_flow("of:0000000ce2314000", 16)
        .await
        .unwrap();
    assert_eq!(handle, "of:0000000ce2314000/16");
}

// ─── profile kv ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_profile_put_encodes_prefixed_key() {
    let server = MockServer::start().await;
    let key = BASE64.encode("service/voltha/technology_profiles/gpon/64");
    let value = BASE64.encode("{\"profile_type\":\"EPON\"}");
    Mock::given(method("POST"))
        .and(path("/v3/kv/put"))
        .and(body_json(json!({ "key": key, "value": value })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = ProfileKvClient::new(&server.uri()).unwrap();
    client
        .put("/gpon/64", "{\"profile_type\":\"EPON\"}")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_profile_delete_absent_is_ok() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/kv/deleterange"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "deleted": "0" })))
        .mount(&server)
        .await;

    let client = ProfileKvClient::new(&server.uri()).unwrap();
    client.delete("/gpon/64").await.unwrap();
}
