//! Token deployment service contract and the HTTP relay implementation.
//!
//! Deployment is two-phase: `deploy` submits the transaction and hands back a
//! pending handle, and the handle's `wait` resolves once the network settles.

use crate::error::DeployError;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Parameters for one token deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployParams {
    pub name: String,
    pub symbol: String,
    pub token_admin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Result of a settled deployment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedDeployment {
    pub token_address: String,
}

/// Capability to wait for a submitted deployment to confirm.
#[async_trait]
pub trait Confirmation: Send + 'static {
    async fn wait(self: Box<Self>) -> Result<ConfirmedDeployment, DeployError>;
}

/// A submitted transaction not yet confirmed.
pub struct PendingDeployment {
    pub tx_hash: String,
    pub confirmation: Box<dyn Confirmation>,
}

impl std::fmt::Debug for PendingDeployment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingDeployment")
            .field("tx_hash", &self.tx_hash)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait TokenDeployer: Send + Sync + 'static {
    async fn deploy(&self, params: DeployParams) -> Result<PendingDeployment, DeployError>;
}

/// Client for a deploy relay that owns the wallet and builds transactions.
#[derive(Clone)]
pub struct RelayDeployer {
    http: reqwest::Client,
    base_url: Arc<str>,
    api_key: Option<Arc<str>>,
}

impl std::fmt::Debug for RelayDeployer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayDeployer")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Relay responses carry either the payload or an `error` string.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelayDeployResponse {
    tx_hash: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelayWaitResponse {
    token_address: Option<String>,
    error: Option<String>,
}

impl RelayDeployer {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: Option<Arc<str>>) -> Self {
        Self {
            http,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            api_key,
        }
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        authorized(
            self.http.post(format!("{}{}", self.base_url, path)),
            self.api_key.as_deref(),
        )
    }
}

fn authorized(request: reqwest::RequestBuilder, api_key: Option<&str>) -> reqwest::RequestBuilder {
    match api_key {
        Some(key) => request.bearer_auth(key),
        None => request,
    }
}

#[async_trait]
impl TokenDeployer for RelayDeployer {
    async fn deploy(&self, params: DeployParams) -> Result<PendingDeployment, DeployError> {
        let response = self
            .post("/deploy")
            .json(&params)
            .send()
            .await
            .map_err(|error| DeployError::Transport(error.to_string()))?;

        let status = response.status();
        let body: RelayDeployResponse = response
            .json()
            .await
            .map_err(|error| DeployError::Transport(format!("status {status}: {error}")))?;

        let tx_hash = match (body.tx_hash, body.error) {
            (_, Some(error)) => return Err(DeployError::Rejected(error)),
            (Some(tx_hash), None) if status.is_success() => tx_hash,
            _ => {
                return Err(DeployError::Transport(format!(
                    "status {status} without transaction hash"
                )));
            }
        };

        Ok(PendingDeployment {
            tx_hash: tx_hash.clone(),
            confirmation: Box::new(RelayConfirmation {
                http: self.http.clone(),
                url: format!("{}/transactions/{}/wait", self.base_url, tx_hash),
                api_key: self.api_key.clone(),
            }),
        })
    }
}

/// Long-polls the relay until the transaction settles.
struct RelayConfirmation {
    http: reqwest::Client,
    url: String,
    api_key: Option<Arc<str>>,
}

#[async_trait]
impl Confirmation for RelayConfirmation {
    async fn wait(self: Box<Self>) -> Result<ConfirmedDeployment, DeployError> {
        let response = authorized(self.http.post(&self.url), self.api_key.as_deref())
            .send()
            .await
            .map_err(|error| DeployError::Confirmation(error.to_string()))?;

        let status = response.status();
        let body: RelayWaitResponse = response
            .json()
            .await
            .map_err(|error| DeployError::Confirmation(format!("status {status}: {error}")))?;

        match (body.token_address, body.error) {
            (_, Some(error)) => Err(DeployError::Confirmation(error)),
            (Some(token_address), None) => Ok(ConfirmedDeployment { token_address }),
            (None, None) => Err(DeployError::Confirmation(format!(
                "status {status} without token address"
            ))),
        }
    }
}
