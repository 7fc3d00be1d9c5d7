//! Event pipeline: seen-event gate, command dispatch, and task spawning.
//!
//! Everything up to the decision to reply runs synchronously on the intake
//! loop, so intake order is preserved and the seen-set is marked in the same
//! step that commits to a reply. All network work (chain reads, replies,
//! orchestration) is spawned so a slow collaborator never stalls intake.

use crate::chain::{self, ChainReader};
use crate::command::{self, DeployCommand, QueryCommand};
use crate::config::LinksConfig;
use crate::dedup::SeenEvents;
use crate::feed::FeedClient;
use crate::image::resolve_image;
use crate::intake::InboundStream;
use crate::ledger::DeploymentLedger;
use crate::orchestrator::{DeploymentRequest, Orchestrator};
use crate::reply::{self, QueryContext};
use crate::InboundEvent;

use futures::StreamExt as _;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// History entries shown in query replies.
const HISTORY_LIMIT: usize = 5;

/// What the pipeline decided for one inbound event.
#[derive(Debug)]
pub enum EventOutcome {
    /// Already handled under the same event id.
    Duplicate,
    /// Not addressed to the agent in a way it responds to.
    Ignored,
    /// A query is being answered.
    Answered {
        query: QueryCommand,
        task: JoinHandle<()>,
    },
    /// Looked like a deploy request but did not parse; a usage hint is being
    /// sent.
    Rejected { task: JoinHandle<()> },
    /// A deployment is in flight.
    Deploying { task: JoinHandle<DeploymentRequest> },
}

impl EventOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventOutcome::Duplicate => "duplicate",
            EventOutcome::Ignored => "ignored",
            EventOutcome::Answered { .. } => "answered",
            EventOutcome::Rejected { .. } => "rejected",
            EventOutcome::Deploying { .. } => "deploying",
        }
    }

    /// Wait for any spawned work. Returns the finished request for
    /// deployments.
    pub async fn finish(self) -> Option<DeploymentRequest> {
        let result = match self {
            EventOutcome::Duplicate | EventOutcome::Ignored => return None,
            EventOutcome::Answered { task, .. } | EventOutcome::Rejected { task } => {
                task.await.map(|()| None)
            }
            EventOutcome::Deploying { task } => task.await.map(Some),
        };
        result.unwrap_or_else(|error| {
            tracing::error!(%error, "pipeline task failed");
            None
        })
    }
}

/// Returned by [`Pipeline::deploy_direct`] when the cast was already handled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cast {0} was already processed")]
pub struct AlreadyProcessed(pub String);

/// Identity and display settings for [`Pipeline::new`].
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub handle: String,
    pub wallet: String,
    pub network: String,
    pub image_host_markers: Vec<String>,
    pub links: LinksConfig,
}

struct PipelineInner {
    seen: SeenEvents,
    orchestrator: Orchestrator,
    feed: Arc<dyn FeedClient>,
    chain: Arc<dyn ChainReader>,
    settings: PipelineSettings,
}

#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<PipelineInner>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("handle", &self.inner.settings.handle)
            .field("seen", &self.inner.seen)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn new(
        orchestrator: Orchestrator,
        seen: SeenEvents,
        feed: Arc<dyn FeedClient>,
        chain: Arc<dyn ChainReader>,
        mut settings: PipelineSettings,
    ) -> Self {
        settings.handle = settings.handle.trim_start_matches('@').to_string();
        Self {
            inner: Arc::new(PipelineInner {
                seen,
                orchestrator,
                feed,
                chain,
                settings,
            }),
        }
    }

    pub fn seen(&self) -> &SeenEvents {
        &self.inner.seen
    }

    pub fn ledger(&self) -> &DeploymentLedger {
        self.inner.orchestrator.ledger()
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.inner.settings
    }

    /// Consume an intake stream until it ends.
    pub async fn run(&self, mut events: InboundStream) {
        while let Some(event) = events.next().await {
            let event_id = event.event_id.clone();
            let outcome = self.handle_event(event);
            tracing::debug!(%event_id, outcome = outcome.as_str(), "event dispatched");
        }
        tracing::info!("intake stream closed");
    }

    /// Decide what to do with `event` and spawn the resulting work. Must be
    /// called from within a tokio runtime.
    pub fn handle_event(&self, event: InboundEvent) -> EventOutcome {
        let settings = &self.inner.settings;
        tracing::info!(
            event_id = %event.event_id,
            source = %event.source,
            author = %event.author_handle,
            text = %event.text,
            "inbound event"
        );

        if event.author_handle.eq_ignore_ascii_case(&settings.handle) {
            return EventOutcome::Ignored;
        }

        if self.inner.seen.contains(&event.event_id) {
            tracing::debug!(event_id = %event.event_id, "event already processed");
            return EventOutcome::Duplicate;
        }

        if let Some(query) = command::classify_query(&event.text, &settings.handle) {
            if !self.inner.seen.should_process(&event.event_id) {
                return EventOutcome::Duplicate;
            }
            tracing::info!(event_id = %event.event_id, %query, "answering query");
            let pipeline = self.clone();
            let task = tokio::spawn(async move { pipeline.answer(query, &event.event_id).await });
            return EventOutcome::Answered { query, task };
        }

        if !command::is_deploy_intent(&event.text) {
            return EventOutcome::Ignored;
        }

        let Some(parsed) = command::parse_deploy_command(&event.text) else {
            if !self.inner.seen.should_process(&event.event_id) {
                return EventOutcome::Duplicate;
            }
            tracing::info!(event_id = %event.event_id, "deploy command did not parse");
            let pipeline = self.clone();
            let task = tokio::spawn(async move {
                let text = reply::usage_hint(&pipeline.inner.settings.handle);
                pipeline.send(&event.event_id, &text).await;
            });
            return EventOutcome::Rejected { task };
        };

        if !self.inner.seen.should_process(&event.event_id) {
            return EventOutcome::Duplicate;
        }

        let image_ref = resolve_image(&event.attachments, &settings.image_host_markers);
        let request = DeploymentRequest::new(event.event_id, parsed.with_image(image_ref));
        EventOutcome::Deploying {
            task: self.spawn_deployment(request),
        }
    }

    /// Start a deployment outside the feed, e.g. from the HTTP API. Replies
    /// go to `cast_hash` when given, which is also gated by the seen-set.
    pub fn deploy_direct(
        &self,
        command: DeployCommand,
        cast_hash: Option<String>,
    ) -> Result<JoinHandle<DeploymentRequest>, AlreadyProcessed> {
        let request = match cast_hash {
            Some(hash) => {
                if !self.inner.seen.should_process(&hash) {
                    return Err(AlreadyProcessed(hash));
                }
                DeploymentRequest::new(hash, command)
            }
            None => DeploymentRequest::new(format!("manual-{}", uuid::Uuid::new_v4()), command)
                .without_reply(),
        };
        Ok(self.spawn_deployment(request))
    }

    fn spawn_deployment(&self, request: DeploymentRequest) -> JoinHandle<DeploymentRequest> {
        let orchestrator = self.inner.orchestrator.clone();
        tokio::spawn(async move { orchestrator.run(request).await })
    }

    async fn answer(&self, query: QueryCommand, event_id: &str) {
        let ctx = self.query_context(query).await;
        let text = reply::query(query, &ctx);
        self.send(event_id, &text).await;
    }

    /// Gather the live values `query` needs. Chain failures degrade to
    /// unavailable values.
    pub async fn query_context(&self, query: QueryCommand) -> QueryContext {
        let settings = &self.inner.settings;
        let ledger = self.ledger();

        let balance = if query.needs_balance() {
            match self.inner.chain.balance(&settings.wallet).await {
                Ok(wei) => Some(chain::format_eth(wei)),
                Err(error) => {
                    tracing::warn!(%error, "failed to read wallet balance");
                    None
                }
            }
        } else {
            None
        };

        let gas_price = if query.needs_gas_price() {
            match self.inner.chain.gas_price().await {
                Ok(wei) => Some(chain::format_gwei(wei)),
                Err(error) => {
                    tracing::warn!(%error, "failed to read gas price");
                    None
                }
            }
        } else {
            None
        };

        QueryContext {
            handle: settings.handle.clone(),
            wallet: settings.wallet.clone(),
            network: settings.network.clone(),
            balance,
            gas_price,
            recent: ledger.list(HISTORY_LIMIT).await,
            retained: ledger.count().await,
            total: ledger.total_recorded().await,
            wallet_link: settings.links.address_link(&settings.wallet),
        }
    }

    async fn send(&self, event_id: &str, text: &str) {
        if let Err(error) = self.inner.feed.publish_reply(event_id, text).await {
            tracing::warn!(%event_id, %error, "failed to send reply");
        }
    }
}
