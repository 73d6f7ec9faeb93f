//! Device-management backend client (VOLTHA-style REST API).

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use oltsync_core::helpers::format_url;

use crate::error::{ClientError, ClientResult};

/// Fixed per-request timeout for all backend calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A physical or virtual device as reported by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendDevice {
    pub id: String,
    #[serde(rename = "type")]
    pub device_type: String,
    #[serde(default)]
    pub host_and_port: Option<String>,
    #[serde(default)]
    pub mac_address: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub admin_state: Option<String>,
    #[serde(default)]
    pub oper_status: Option<String>,
    #[serde(default)]
    pub connect_status: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    /// Present on ONU-kind devices: the OLT and PON channel they hang off.
    #[serde(default)]
    pub proxy_address: Option<ProxyAddress>,
}

/// ONU-to-OLT addressing as reported by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyAddress {
    pub device_id: String,
    #[serde(default)]
    pub channel_id: u32,
}

/// A device port as reported by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendPort {
    #[serde(default)]
    pub label: String,
    pub port_no: u32,
    #[serde(rename = "type")]
    pub port_type: String,
    #[serde(default)]
    pub admin_state: Option<String>,
    #[serde(default)]
    pub oper_status: Option<String>,
}

/// An openflow logical device as reported by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct LogicalDevice {
    pub id: String,
    /// Decimal datapath id, usually as a string.
    pub datapath_id: String,
    pub root_device_id: String,
}

/// Pre-provisioning request body.
#[derive(Debug, Clone, Serialize)]
pub struct NewDevice {
    #[serde(rename = "type")]
    pub device_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_and_port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
}

/// Pre-provisioning response.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedDevice {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub serial_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Items<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

/// REST client for the device-management backend.
#[derive(Debug, Clone)]
pub struct DeviceBackendClient {
    base_url: String,
    client: Client,
}

impl DeviceBackendClient {
    /// Build a client for the given endpoint (scheme optional).
    pub fn new(endpoint: &str) -> ClientResult<Self> {
        let base_url = format_url(endpoint);
        url::Url::parse(&base_url).map_err(|e| ClientError::InvalidUrl {
            message: format!("{base_url}: {e}"),
        })?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::from_reqwest("client build", e))?;
        Ok(Self { base_url, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{path}", self.base_url)
    }

    async fn get_items<T: serde::de::DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
    ) -> ClientResult<Vec<T>> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(operation, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                operation: operation.to_string(),
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        let items: Items<T> = response
            .json()
            .await
            .map_err(|e| ClientError::from_reqwest(operation, e))?;
        Ok(items.items)
    }

    /// `GET /devices`, the full upstream inventory.
    #[instrument(skip(self))]
    pub async fn list_devices(&self) -> ClientResult<Vec<BackendDevice>> {
        let devices = self.get_items("list devices", "devices").await?;
        debug!(count = devices.len(), "fetched backend devices");
        Ok(devices)
    }

    /// `GET /devices/{id}`.
    pub async fn get_device(&self, device_id: &str) -> ClientResult<BackendDevice> {
        let operation = "get device";
        let response = self
            .client
            .get(self.url(&format!("devices/{device_id}")))
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(operation, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                operation: operation.to_string(),
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        response
            .json()
            .await
            .map_err(|e| ClientError::from_reqwest(operation, e))
    }

    /// `GET /devices/{id}/ports`.
    pub async fn device_ports(&self, device_id: &str) -> ClientResult<Vec<BackendPort>> {
        self.get_items("list device ports", &format!("devices/{device_id}/ports"))
            .await
    }

    /// `GET /logical_devices`.
    pub async fn list_logical_devices(&self) -> ClientResult<Vec<LogicalDevice>> {
        self.get_items("list logical devices", "logical_devices").await
    }

    /// `GET /logical_devices/{id}/ports`.
    pub async fn logical_device_ports(&self, logical_id: &str) -> ClientResult<Vec<BackendPort>> {
        self.get_items(
            "list logical device ports",
            &format!("logical_devices/{logical_id}/ports"),
        )
        .await
    }

    /// `POST /devices`: pre-provision a device.
    #[instrument(skip(self))]
    pub async fn create_device(&self, device: &NewDevice) -> ClientResult<CreatedDevice> {
        let operation = "create device";
        let response = self
            .client
            .post(self.url("devices"))
            .json(device)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(operation, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                operation: operation.to_string(),
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        response
            .json()
            .await
            .map_err(|e| ClientError::from_reqwest(operation, e))
    }

    /// `POST /devices/{id}/enable`.
    pub async fn enable_device(&self, device_id: &str) -> ClientResult<()> {
        self.post_action("enable device", &format!("devices/{device_id}/enable"))
            .await
    }

    /// `POST /devices/{id}/disable`.
    pub async fn disable_device(&self, device_id: &str) -> ClientResult<()> {
        self.post_action("disable device", &format!("devices/{device_id}/disable"))
            .await
    }

    /// `DELETE /devices/{id}/delete`.
    pub async fn delete_device(&self, device_id: &str) -> ClientResult<()> {
        let operation = "delete device";
        let response = self
            .client
            .delete(self.url(&format!("devices/{device_id}/delete")))
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(operation, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                operation: operation.to_string(),
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }

    async fn post_action(&self, operation: &str, path: &str) -> ClientResult<()> {
        let response = self
            .client
            .post(self.url(path))
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(operation, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                operation: operation.to_string(),
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}
