//! Polling intake: periodically fetches recent mentions from the feed.

use crate::config::IntakeConfig;
use crate::error::FeedError;
use crate::feed::{BotIdentity, Cast, FeedClient};
use crate::intake::traits::{InboundStream, IntakeAdapter};
use crate::InboundEvent;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, mpsc};
use tokio_stream::wrappers::ReceiverStream;

/// Timing and paging for [`FeedPoller`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub first_delay: Duration,
    pub lookback: Duration,
    pub limit: u32,
}

impl From<&IntakeConfig> for PollSettings {
    fn from(config: &IntakeConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.poll_interval_secs),
            first_delay: Duration::from_secs(config.first_poll_delay_secs),
            lookback: Duration::from_secs(config.initial_lookback_secs),
            limit: config.poll_limit,
        }
    }
}

/// Lower bound on cast timestamps still worth forwarding. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermark(DateTime<Utc>);

impl Watermark {
    pub fn new(since: DateTime<Utc>) -> Self {
        Self(since)
    }

    pub fn since(&self) -> DateTime<Utc> {
        self.0
    }

    /// Casts without a timestamp are admitted; the seen-set catches repeats.
    pub fn admits(&self, cast: &Cast) -> bool {
        cast.timestamp.is_none_or(|timestamp| timestamp > self.0)
    }

    pub fn advance(&mut self, to: DateTime<Utc>) {
        if to > self.0 {
            self.0 = to;
        }
    }
}

/// One poll: fetch mentions, drop stale and self-authored casts, and advance
/// the watermark to `started_at` on success. Events come back oldest first.
pub async fn poll_once(
    feed: &dyn FeedClient,
    identity: &BotIdentity,
    watermark: &mut Watermark,
    limit: u32,
    started_at: DateTime<Utc>,
) -> Result<Vec<InboundEvent>, FeedError> {
    let casts = feed.fetch_mentions(identity, limit).await?;
    let mut events: Vec<InboundEvent> = casts
        .into_iter()
        .filter(|cast| watermark.admits(cast))
        .filter(|cast| !cast.author.username.eq_ignore_ascii_case(&identity.username))
        .map(|cast| cast.into_event("poller"))
        .collect();
    events.reverse();
    watermark.advance(started_at);
    Ok(events)
}

/// Feed polling adapter state.
pub struct FeedPoller {
    feed: Arc<dyn FeedClient>,
    settings: PollSettings,
    shutdown_tx: Arc<RwLock<Option<mpsc::Sender<()>>>>,
}

impl FeedPoller {
    pub fn new(feed: Arc<dyn FeedClient>, settings: PollSettings) -> Self {
        Self {
            feed,
            settings,
            shutdown_tx: Arc::new(RwLock::new(None)),
        }
    }
}

impl IntakeAdapter for FeedPoller {
    fn name(&self) -> &'static str {
        "poller"
    }

    async fn start(&self) -> crate::Result<InboundStream> {
        let identity = self.feed.lookup_identity().await?;
        tracing::info!(fid = identity.fid, username = %identity.username, "feed identity resolved");

        let (inbound_tx, inbound_rx) = mpsc::channel(256);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        *self.shutdown_tx.write().await = Some(shutdown_tx);

        let feed = self.feed.clone();
        let settings = self.settings;
        let lookback = chrono::Duration::from_std(settings.lookback).unwrap_or_default();
        let mut watermark = Watermark::new(Utc::now() - lookback);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(
                tokio::time::Instant::now() + settings.first_delay,
                settings.interval,
            );
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::info!("feed poller shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        let started_at = Utc::now();
                        let events = match poll_once(
                            feed.as_ref(),
                            &identity,
                            &mut watermark,
                            settings.limit,
                            started_at,
                        )
                        .await
                        {
                            Ok(events) => events,
                            Err(error) => {
                                tracing::warn!(%error, "mention poll failed");
                                continue;
                            }
                        };

                        tracing::debug!(count = events.len(), since = %watermark.since(), "mention poll complete");
                        for event in events {
                            if inbound_tx.send(event).await.is_err() {
                                tracing::warn!("poller receiver dropped, stopping");
                                return;
                            }
                        }
                    }
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(inbound_rx)))
    }

    async fn shutdown(&self) -> crate::Result<()> {
        if let Some(tx) = self.shutdown_tx.write().await.take() {
            let _ = tx.send(()).await;
        }
        Ok(())
    }
}
