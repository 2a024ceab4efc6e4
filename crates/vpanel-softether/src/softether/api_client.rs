//! JSON-RPC client for the SoftEther VPN Server admin API.
//!
//! One HTTPS POST per call. The response id is compared with the request id
//! before anything else in the body is trusted.

use crate::softether::types::*;
use log::debug;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use url::Url;
use vpanel_core::{ProvisionError, ProvisionResult};

#[derive(Debug, Clone)]
pub struct SoftEtherApiClient {
    client: Client,
    endpoint: Url,
    admin_password: String,
    hub: String,
}

impl SoftEtherApiClient {
    pub fn new(config: &SoftEtherConfig) -> ProvisionResult<Self> {
        let endpoint = Url::parse(&config.server_url).map_err(|e| {
            ProvisionError::RemoteUnavailable(format!(
                "invalid SoftEther URL '{}': {}",
                config.server_url, e
            ))
        })?;
        let client = Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                ProvisionError::RemoteUnavailable(format!("failed to build HTTP client: {}", e))
            })?;
        Ok(Self {
            client,
            endpoint,
            admin_password: config.admin_password.clone(),
            hub: config.hub.clone(),
        })
    }

    pub fn hub(&self) -> &str {
        &self.hub
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Perform one correlated call and decode its `result`.
    pub async fn call<P, R>(&self, method: &str, params: P) -> ProvisionResult<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let request = RpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id: uuid::Uuid::new_v4().to_string(),
            method,
            params,
        };
        debug!("SoftEther {} request id={}", method, request.id);

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ADMIN_PASSWORD_HEADER, &self.admin_password)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProvisionError::RemoteUnavailable(format!("{} failed: {}", method, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProvisionError::RemoteUnavailable(format!(
                "{} answered HTTP {}",
                method, status
            )));
        }

        let body: RpcResponse = response.json().await.map_err(|e| {
            ProvisionError::RemoteUnavailable(format!(
                "{} returned an undecodable body: {}",
                method, e
            ))
        })?;
        debug!("SoftEther {} response id={}", method, body.id_text());

        unwrap_response(&request.id, method, body)
    }
}

/// Check correlation, then turn the envelope into a result.
pub fn unwrap_response<R: DeserializeOwned>(
    expected_id: &str,
    method: &str,
    body: RpcResponse,
) -> ProvisionResult<R> {
    let actual = body.id_text();
    if actual != expected_id {
        return Err(ProvisionError::CorrelationMismatch {
            expected: expected_id.to_string(),
            actual,
        });
    }
    if let Some(err) = body.error {
        return Err(ProvisionError::RemoteRejected {
            code: err.code,
            message: err.message,
        });
    }
    let result = body.result.ok_or_else(|| {
        ProvisionError::RemoteUnavailable(format!("{} returned no result", method))
    })?;
    serde_json::from_value(result).map_err(|e| {
        ProvisionError::RemoteUnavailable(format!(
            "{} returned an unexpected result: {}",
            method, e
        ))
    })
}
