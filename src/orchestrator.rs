//! Deployment orchestrator: the per-request state machine.
//!
//! ```text
//! Parsed ─┬─> ImagePending ─┬─> ImageDone ───┬─> Deploying ─> Confirming ─┬─> Succeeded
//!         │                 └─> ImageFailed ─┤        │                   └─> Failed
//!         └──────────────────────────────────┘        └─────────────────────> Failed
//! ```
//!
//! Image failures degrade to a deployment without an image. Deploy and
//! confirmation failures are terminal and never retried.

use crate::command::DeployCommand;
use crate::config::LinksConfig;
use crate::deploy::{DeployParams, TokenDeployer};
use crate::error::DeployError;
use crate::feed::FeedClient;
use crate::ledger::{DeploymentLedger, DeploymentRecord};
use crate::reply;
use crate::storage::StorageUploader;
use crate::EventId;

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Request lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Parsed,
    ImagePending,
    ImageDone,
    ImageFailed,
    Deploying,
    Confirming,
    Succeeded,
    Failed,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Succeeded | Stage::Failed)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: Stage) -> bool {
        use Stage::*;
        matches!(
            (self, next),
            (Parsed, ImagePending)
                | (Parsed, Deploying)
                | (ImagePending, ImageDone)
                | (ImagePending, ImageFailed)
                | (ImageDone, Deploying)
                | (ImageFailed, Deploying)
                | (Deploying, Confirming)
                | (Deploying, Failed)
                | (Confirming, Succeeded)
                | (Confirming, Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Parsed => "parsed",
            Stage::ImagePending => "image_pending",
            Stage::ImageDone => "image_done",
            Stage::ImageFailed => "image_failed",
            Stage::Deploying => "deploying",
            Stage::Confirming => "confirming",
            Stage::Succeeded => "succeeded",
            Stage::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What happened to the logo for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageOutcome {
    NotRequested,
    Pinned,
    Failed,
}

/// Links and identifiers of a confirmed deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResult {
    pub token_address: String,
    pub tx_hash: String,
    pub explorer_link: String,
    pub tx_link: String,
}

/// One deploy request, owned by the task that drives it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRequest {
    pub source_event_id: EventId,
    /// Cast to reply to. `None` for manual deployments without a cast.
    pub reply_to: Option<String>,
    pub command: DeployCommand,
    pub image_uri: Option<String>,
    pub stage: Stage,
    pub result: Option<DeploymentResult>,
    pub error: Option<String>,
    /// Every stage visited, in order, starting with `Parsed`.
    pub trail: Vec<Stage>,
}

impl DeploymentRequest {
    pub fn new(source_event_id: impl Into<String>, command: DeployCommand) -> Self {
        let source_event_id = source_event_id.into();
        Self {
            reply_to: Some(source_event_id.clone()),
            source_event_id,
            command,
            image_uri: None,
            stage: Stage::Parsed,
            result: None,
            error: None,
            trail: vec![Stage::Parsed],
        }
    }

    pub fn without_reply(mut self) -> Self {
        self.reply_to = None;
        self
    }

    pub fn image_outcome(&self) -> ImageOutcome {
        match (&self.command.image_ref, &self.image_uri) {
            (None, _) => ImageOutcome::NotRequested,
            (Some(_), Some(_)) => ImageOutcome::Pinned,
            (Some(_), None) => ImageOutcome::Failed,
        }
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "illegal transition {} -> {}",
            self.stage,
            next
        );
        tracing::debug!(
            event_id = %self.source_event_id,
            from = %self.stage,
            to = %next,
            "deployment stage transition"
        );
        self.stage = next;
        self.trail.push(next);
    }

    fn fail(&mut self, error: &DeployError) {
        self.error = Some(error.to_string());
        self.advance(Stage::Failed);
    }
}

/// Collaborators and settings shared by every request.
#[derive(Clone)]
pub struct Orchestrator {
    deployer: Arc<dyn TokenDeployer>,
    uploader: StorageUploader,
    feed: Arc<dyn FeedClient>,
    ledger: DeploymentLedger,
    links: Arc<LinksConfig>,
    token_admin: Arc<str>,
    handle: Arc<str>,
    network: Arc<str>,
    confirmation_timeout: Option<Duration>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("token_admin", &self.token_admin)
            .field("confirmation_timeout", &self.confirmation_timeout)
            .finish_non_exhaustive()
    }
}

/// Identity and policy settings for [`Orchestrator::new`].
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub token_admin: String,
    pub handle: String,
    pub network: String,
    pub links: LinksConfig,
    pub confirmation_timeout: Option<Duration>,
}

impl Orchestrator {
    pub fn new(
        deployer: Arc<dyn TokenDeployer>,
        uploader: StorageUploader,
        feed: Arc<dyn FeedClient>,
        ledger: DeploymentLedger,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            deployer,
            uploader,
            feed,
            ledger,
            links: Arc::new(settings.links),
            token_admin: Arc::from(settings.token_admin),
            handle: Arc::from(settings.handle),
            network: Arc::from(settings.network),
            confirmation_timeout: settings.confirmation_timeout,
        }
    }

    pub fn ledger(&self) -> &DeploymentLedger {
        &self.ledger
    }

    /// Drive `request` to a terminal stage, sending the processing notice, an
    /// optional image-degradation notice, and exactly one final reply.
    pub async fn run(&self, mut request: DeploymentRequest) -> DeploymentRequest {
        let command = request.command.clone();
        tracing::info!(
            event_id = %request.source_event_id,
            token_name = %command.token_name,
            token_symbol = %command.token_symbol,
            has_image = command.image_ref.is_some(),
            "starting deployment"
        );

        self.notify(
            &request,
            reply::processing(&command, command.image_ref.is_some(), &self.network),
        )
        .await;

        if let Some(image_ref) = &command.image_ref {
            request.advance(Stage::ImagePending);
            match self.uploader.upload(image_ref).await {
                Ok(uri) => {
                    request.image_uri = Some(uri);
                    request.advance(Stage::ImageDone);
                }
                Err(error) => {
                    tracing::warn!(
                        event_id = %request.source_event_id,
                        %error,
                        "image upload failed, deploying without image"
                    );
                    request.advance(Stage::ImageFailed);
                    self.notify(&request, reply::image_failed()).await;
                }
            }
        }

        request.advance(Stage::Deploying);
        let params = DeployParams {
            name: command.token_name.clone(),
            symbol: command.token_symbol.clone(),
            token_admin: self.token_admin.to_string(),
            image: request.image_uri.clone(),
        };

        let pending = match self.deployer.deploy(params).await {
            Ok(pending) => pending,
            Err(error) => {
                tracing::error!(event_id = %request.source_event_id, %error, "deployment failed");
                request.fail(&error);
                self.finish(&request).await;
                return request;
            }
        };

        request.advance(Stage::Confirming);
        tracing::info!(
            event_id = %request.source_event_id,
            tx_hash = %pending.tx_hash,
            "waiting for transaction confirmation"
        );

        let confirmed = match self.confirmation_timeout {
            Some(deadline) => tokio::time::timeout(deadline, pending.confirmation.wait())
                .await
                .unwrap_or_else(|_| {
                    Err(DeployError::ConfirmationTimeout {
                        seconds: deadline.as_secs(),
                    })
                }),
            None => pending.confirmation.wait().await,
        };

        let confirmed = match confirmed {
            Ok(confirmed) => confirmed,
            Err(error) => {
                tracing::error!(
                    event_id = %request.source_event_id,
                    tx_hash = %pending.tx_hash,
                    %error,
                    "confirmation failed"
                );
                request.fail(&error);
                self.finish(&request).await;
                return request;
            }
        };

        let result = DeploymentResult {
            explorer_link: self.links.token_link(&confirmed.token_address),
            tx_link: self.links.tx_link(&pending.tx_hash),
            token_address: confirmed.token_address,
            tx_hash: pending.tx_hash,
        };

        self.ledger
            .record(DeploymentRecord {
                token_name: command.token_name.clone(),
                token_symbol: command.token_symbol.clone(),
                token_address: result.token_address.clone(),
                tx_hash: result.tx_hash.clone(),
                has_image: request.image_uri.is_some(),
                timestamp: chrono::Utc::now(),
            })
            .await;

        tracing::info!(
            event_id = %request.source_event_id,
            token_address = %result.token_address,
            tx_hash = %result.tx_hash,
            "token deployed"
        );

        request.result = Some(result);
        request.advance(Stage::Succeeded);

        self.finish(&request).await;
        request
    }

    async fn finish(&self, request: &DeploymentRequest) {
        if let Some(text) = reply::final_reply(request, &self.handle) {
            self.notify(request, text).await;
        }
    }

    /// Best-effort reply; failures are logged and swallowed.
    async fn notify(&self, request: &DeploymentRequest, text: String) {
        let Some(reply_to) = &request.reply_to else {
            return;
        };
        if let Err(error) = self.feed.publish_reply(reply_to, &text).await {
            tracing::warn!(
                event_id = %request.source_event_id,
                stage = %request.stage,
                %error,
                "failed to send reply"
            );
        }
    }
}
