//! Webhook intake: the HTTP handler pushes events into this adapter's stream.
//!
//! The adapter does not own a server. The API's `/webhook` route holds a
//! [`WebhookIngress`] and hands decoded events to it.

use crate::dedup::SeenEvents;
use crate::error::IntakeError;
use crate::feed::Cast;
use crate::intake::traits::{InboundStream, IntakeAdapter};
use crate::InboundEvent;

use serde::Deserialize;
use tokio::sync::{Mutex, mpsc};
use tokio_stream::wrappers::ReceiverStream;

/// Webhook event type that carries a new cast.
pub const CAST_CREATED: &str = "cast.created";

const CHANNEL_CAPACITY: usize = 256;

/// Webhook adapter state.
pub struct WebhookAdapter {
    sender: mpsc::Sender<InboundEvent>,
    receiver: Mutex<Option<mpsc::Receiver<InboundEvent>>>,
}

impl WebhookAdapter {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            receiver: Mutex::new(Some(receiver)),
        }
    }

    /// Handle for the HTTP route. `seen` is only read, to acknowledge
    /// redeliveries without forwarding them.
    pub fn ingress(&self, seen: SeenEvents) -> WebhookIngress {
        WebhookIngress {
            sender: self.sender.clone(),
            seen,
        }
    }
}

impl Default for WebhookAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl IntakeAdapter for WebhookAdapter {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn start(&self) -> crate::Result<InboundStream> {
        let receiver = self
            .receiver
            .lock()
            .await
            .take()
            .ok_or(IntakeError::AlreadyStarted("webhook"))?;
        Ok(Box::pin(ReceiverStream::new(receiver)))
    }
}

/// What the route did with a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookAck {
    Forwarded,
    AlreadyProcessed,
    Ignored(&'static str),
}

#[derive(Deserialize)]
struct WebhookPayload {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

/// Decode a raw webhook body. Bodies that are not a well-formed
/// `cast.created` delivery are reported as ignored with a reason.
pub fn decode(body: &[u8]) -> Result<InboundEvent, &'static str> {
    let payload: WebhookPayload =
        serde_json::from_slice(body).map_err(|_| "malformed payload")?;
    if payload.kind != CAST_CREATED {
        return Err("unhandled event type");
    }
    let data = payload.data.ok_or("missing cast data")?;
    let cast: Cast = serde_json::from_value(data).map_err(|_| "malformed cast")?;
    Ok(cast.into_event("webhook"))
}

/// Sender side of the webhook adapter, shared with the HTTP route.
#[derive(Debug, Clone)]
pub struct WebhookIngress {
    sender: mpsc::Sender<InboundEvent>,
    seen: SeenEvents,
}

impl WebhookIngress {
    /// Decode `body` and forward it to the pipeline. Only a closed channel is
    /// an error; anything undecodable is acknowledged and dropped.
    pub async fn accept(&self, body: &[u8]) -> Result<WebhookAck, IntakeError> {
        let event = match decode(body) {
            Ok(event) => event,
            Err(reason) => {
                tracing::debug!(reason, "webhook delivery ignored");
                return Ok(WebhookAck::Ignored(reason));
            }
        };

        if self.seen.contains(&event.event_id) {
            tracing::debug!(event_id = %event.event_id, "webhook redelivery skipped");
            return Ok(WebhookAck::AlreadyProcessed);
        }

        self.sender
            .send(event)
            .await
            .map_err(|_| IntakeError::Closed)?;
        Ok(WebhookAck::Forwarded)
    }
}
