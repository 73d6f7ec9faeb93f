//! SDN controller client (ONOS-style REST API, basic auth).

use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use tracing::{debug, info, instrument};

use oltsync_core::helpers::format_url;

use crate::error::{ClientError, ClientResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// REST client for the SDN controller.
#[derive(Debug, Clone)]
pub struct SdnControllerClient {
    base_url: String,
    username: String,
    password: String,
    client: Client,
}

impl SdnControllerClient {
    pub fn new(endpoint: &str, username: &str, password: &str) -> ClientResult<Self> {
        let base_url = format_url(endpoint);
        url::Url::parse(&base_url).map_err(|e| ClientError::InvalidUrl {
            message: format!("{base_url}: {e}"),
        })?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::from_reqwest("client build", e))?;
        Ok(Self {
            base_url,
            username: username.to_string(),
            password: password.to_string(),
            client,
        })
    }

    /// Push a device name into the controller's network configuration,
    /// keyed by the `of:`-prefixed datapath id.
    #[instrument(skip(self))]
    pub async fn register_device(&self, dp_id: &str, name: &str) -> ClientResult<()> {
        let operation = "register device";
        let body = json!({
            "devices": {
                dp_id: { "basic": { "name": name } }
            }
        });
        let response = self
            .client
            .post(format!("{}/onos/v1/network/configuration/", self.base_url))
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
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
        info!(dp_id, name, "registered device with controller");
        Ok(())
    }

    /// Program the subscriber flow for a UNI port; returns the handle used
    /// later to remove the flow.
    #[instrument(skip(self))]
    pub async fn add_subscriber_flow(&self, dp_id: &str, uni_port_id: u32) -> ClientResult<String> {
        let operation = "add subscriber flow";
        let response = self
            .client
            .post(format!(
                "{}/onos/olt/oltapp/{dp_id}/{uni_port_id}",
                self.base_url
            ))
            .basic_auth(&self.username, Some(&self.password))
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
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::from_reqwest(operation, e))?;
        let handle = body.trim();
        let handle = if handle.is_empty() {
            // No body: the path itself identifies the flow.
            format!("{dp_id}/{uni_port_id}")
        } else {
            handle.to_string()
        };
        debug!(dp_id, uni_port_id, handle, "subscriber flow programmed");
        Ok(handle)
    }

    /// Remove a previously programmed subscriber flow.
    #[instrument(skip(self))]
    pub async fn remove_subscriber_flow(&self, handle: &str) -> ClientResult<()> {
        let operation = "remove subscriber flow";
        let response = self
            .client
            .delete(format!("{}/onos/olt/oltapp/{handle}", self.base_url))
            .basic_auth(&self.username, Some(&self.password))
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
