//! Social feed client: replies, identity lookup, and mention polling.

use crate::error::FeedError;
use crate::{Attachment, InboundEvent};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

/// The agent's own feed identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub fid: u64,
    pub username: String,
}

/// A feed post as delivered by both the webhook and the REST API.
#[derive(Debug, Clone, Deserialize)]
pub struct Cast {
    pub hash: String,
    pub text: String,
    pub author: CastAuthor,
    #[serde(default)]
    pub embeds: Vec<CastEmbed>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CastAuthor {
    #[serde(default)]
    pub username: String,
}

/// Embeds are either URLs or quoted casts; only URLs are kept.
#[derive(Debug, Clone, Deserialize)]
pub struct CastEmbed {
    #[serde(default)]
    pub url: Option<String>,
}

impl Cast {
    pub fn into_event(self, source: &str) -> InboundEvent {
        InboundEvent {
            event_id: self.hash,
            author_handle: self.author.username,
            text: self.text,
            attachments: self
                .embeds
                .into_iter()
                .filter_map(|embed| embed.url)
                .map(|url| Attachment { url })
                .collect(),
            source: source.to_string(),
        }
    }
}

/// Narrow contract the pipeline needs from the social feed.
#[async_trait]
pub trait FeedClient: Send + Sync + 'static {
    /// Post `text` as a reply to the cast `in_reply_to`.
    async fn publish_reply(&self, in_reply_to: &str, text: &str) -> Result<(), FeedError>;

    /// Resolve the agent's fid and username from its signer.
    async fn lookup_identity(&self) -> Result<BotIdentity, FeedError>;

    /// Recent casts mentioning the agent, newest first.
    async fn fetch_mentions(&self, identity: &BotIdentity, limit: u32)
    -> Result<Vec<Cast>, FeedError>;
}

/// Neynar REST client.
#[derive(Clone)]
pub struct NeynarClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Arc<str>,
    signer_uuid: Arc<str>,
}

impl std::fmt::Debug for NeynarClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NeynarClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct SignerResponse {
    fid: u64,
}

#[derive(Deserialize)]
struct BulkUsersResponse {
    users: Vec<CastAuthor>,
}

#[derive(Deserialize)]
struct NotificationsResponse {
    #[serde(default)]
    notifications: Vec<Notification>,
}

#[derive(Deserialize)]
struct Notification {
    #[serde(default)]
    cast: Option<Cast>,
}

impl NeynarClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Arc<str>,
        signer_uuid: Arc<str>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            signer_uuid,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, FeedError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::Api {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|error| FeedError::Decode(error.to_string()))
    }
}

#[async_trait]
impl FeedClient for NeynarClient {
    async fn publish_reply(&self, in_reply_to: &str, text: &str) -> Result<(), FeedError> {
        let response = self
            .http
            .post(self.url("/v2/farcaster/cast"))
            .header("x-api-key", &*self.api_key)
            .json(&serde_json::json!({
                "signer_uuid": &*self.signer_uuid,
                "text": text,
                "parent": in_reply_to,
            }))
            .send()
            .await?;

        Self::read_json::<serde_json::Value>(response).await?;
        Ok(())
    }

    async fn lookup_identity(&self) -> Result<BotIdentity, FeedError> {
        let response = self
            .http
            .get(self.url("/v2/farcaster/signer"))
            .header("x-api-key", &*self.api_key)
            .query(&[("signer_uuid", &*self.signer_uuid)])
            .send()
            .await?;
        let signer: SignerResponse = Self::read_json(response).await?;

        let response = self
            .http
            .get(self.url("/v2/farcaster/user/bulk"))
            .header("x-api-key", &*self.api_key)
            .query(&[("fids", signer.fid.to_string())])
            .send()
            .await?;
        let users: BulkUsersResponse = Self::read_json(response).await?;
        let username = users
            .users
            .into_iter()
            .next()
            .map(|user| user.username)
            .ok_or_else(|| FeedError::Decode(format!("no user for fid {}", signer.fid)))?;

        Ok(BotIdentity {
            fid: signer.fid,
            username,
        })
    }

    async fn fetch_mentions(
        &self,
        identity: &BotIdentity,
        limit: u32,
    ) -> Result<Vec<Cast>, FeedError> {
        let response = self
            .http
            .get(self.url("/v2/farcaster/notifications"))
            .header("x-api-key", &*self.api_key)
            .query(&[
                ("fid", identity.fid.to_string()),
                ("type", "mentions".to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await?;
        let page: NotificationsResponse = Self::read_json(response).await?;

        Ok(page
            .notifications
            .into_iter()
            .filter_map(|notification| notification.cast)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cast_converts_to_event_keeping_url_embeds_in_order() {
        let cast: Cast = serde_json::from_value(serde_json::json!({
            "hash": "0xabc",
            "text": "@bot deploy token name PEPE symbol PEPE",
            "author": { "username": "alice", "fid": 3 },
            "embeds": [
                { "url": "https://img.example/logo.png" },
                { "cast_id": { "fid": 1, "hash": "0xdef" } },
                { "url": "https://example.com/page" }
            ],
            "timestamp": "2026-01-02T03:04:05Z"
        }))
        .expect("cast should decode");

        assert_eq!(
            cast.timestamp.map(|t| t.to_rfc3339()),
            Some("2026-01-02T03:04:05+00:00".to_string())
        );

        let event = cast.into_event("poller");
        assert_eq!(event.event_id, "0xabc");
        assert_eq!(event.author_handle, "alice");
        assert_eq!(event.source, "poller");
        let urls: Vec<_> = event.attachments.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(urls, ["https://img.example/logo.png", "https://example.com/page"]);
    }

    #[test]
    fn cast_tolerates_missing_optional_fields() {
        let cast: Cast = serde_json::from_value(serde_json::json!({
            "hash": "0x1",
            "text": "gm",
            "author": {}
        }))
        .expect("minimal cast should decode");

        assert!(cast.embeds.is_empty());
        assert!(cast.timestamp.is_none());
        assert_eq!(cast.into_event("webhook").author_handle, "");
    }

    #[test]
    fn base_url_is_normalized() {
        let client = NeynarClient::new(
            reqwest::Client::new(),
            "https://api.neynar.com/",
            Arc::from("key"),
            Arc::from("signer"),
        );
        assert_eq!(
            client.url("/v2/farcaster/cast"),
            "https://api.neynar.com/v2/farcaster/cast"
        );
    }
}
