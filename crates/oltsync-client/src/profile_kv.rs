//! Technology-profile KV client (etcd v3 JSON gateway).
//!
//! Key layout: `<prefix>/<technology>/<profile_id>`. The gateway encodes
//! keys and values as base64 inside JSON bodies.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use oltsync_core::helpers::format_url;

use crate::error::{ClientError, ClientResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default key prefix for technology profiles.
pub const DEFAULT_PREFIX: &str = "service/voltha/technology_profiles";

#[derive(Debug, Deserialize)]
struct DeleteResponse {
    #[serde(default)]
    deleted: Option<String>,
}

/// Client for the profile KV store.
#[derive(Debug, Clone)]
pub struct ProfileKvClient {
    base_url: String,
    prefix: String,
    client: Client,
}

impl ProfileKvClient {
    pub fn new(endpoint: &str) -> ClientResult<Self> {
        Self::with_prefix(endpoint, DEFAULT_PREFIX)
    }

    pub fn with_prefix(endpoint: &str, prefix: &str) -> ClientResult<Self> {
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
            prefix: prefix.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    /// `PUT` a profile value under `<prefix><key>`.
    #[instrument(skip(self, value))]
    pub async fn put(&self, key: &str, value: &str) -> ClientResult<()> {
        let operation = "profile kv put";
        let full_key = self.full_key(key);
        let body = json!({
            "key": BASE64.encode(&full_key),
            "value": BASE64.encode(value),
        });
        let response = self
            .client
            .post(format!("{}/v3/kv/put", self.base_url))
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
        info!(key = %full_key, "technology profile saved to kv store");
        Ok(())
    }

    /// Delete `<prefix><key>`; deleting an absent key succeeds.
    #[instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> ClientResult<()> {
        let operation = "profile kv delete";
        let full_key = self.full_key(key);
        let body = json!({ "key": BASE64.encode(&full_key) });
        let response = self
            .client
            .post(format!("{}/v3/kv/deleterange", self.base_url))
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
        let parsed: DeleteResponse = response
            .json()
            .await
            .map_err(|e| ClientError::from_reqwest(operation, e))?;
        match parsed.deleted.as_deref() {
            Some("0") | None => info!(key = %full_key, "technology profile was already absent"),
            Some(_) => info!(key = %full_key, "technology profile deleted from kv store"),
        }
        Ok(())
    }
}
