//! Warpdeploy: a social-feed agent that deploys tokens on request.
//!
//! Mentions arrive through intake adapters (webhook push or feed polling),
//! pass through the seen-event gate and the command parser, and valid deploy
//! commands are driven through the deployment orchestrator on their own task.

pub mod api;
pub mod chain;
pub mod command;
pub mod config;
pub mod dedup;
pub mod deploy;
pub mod error;
pub mod feed;
pub mod image;
pub mod intake;
pub mod ledger;
pub mod orchestrator;
pub mod pipeline;
pub mod reply;
pub mod storage;
pub mod telemetry;

pub use error::{Error, Result};

use serde::{Deserialize, Serialize};

/// Feed item identifier (the cast hash). Unique and immutable per post.
pub type EventId = String;

/// Inbound feed item, normalized across intake modes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub event_id: EventId,
    pub author_handle: String,
    pub text: String,
    pub attachments: Vec<Attachment>,
    /// Which intake adapter produced the event (e.g. "webhook", "poller").
    pub source: String,
}

impl InboundEvent {
    pub fn new(
        event_id: impl Into<String>,
        author_handle: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            author_handle: author_handle.into(),
            text: text.into(),
            attachments: Vec::new(),
            source: "manual".into(),
        }
    }

    pub fn with_attachment(mut self, url: impl Into<String>) -> Self {
        self.attachments.push(Attachment { url: url.into() });
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

/// Post embed. Only the URL is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
}
