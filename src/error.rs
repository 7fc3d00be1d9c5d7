//! Top-level error types for Warpdeploy.

use std::sync::Arc;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error enum wrapping domain-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Intake(#[from] IntakeError),
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load config from {path}: {source}")]
    Load {
        path: String,
        source: Arc<config::ConfigError>,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("missing required config key: {0}")]
    MissingKey(String),
}

/// Social feed client errors. Reply failures are logged and never surfaced.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("feed API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("unexpected feed response: {0}")]
    Decode(String),
}

/// Image fetch and pinning errors. Non-fatal to a deployment.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to fetch image from {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("failed to pin image: {0}")]
    Pin(String),
}

/// Token deployment and confirmation errors. Terminal for a request.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("{0}")]
    Rejected(String),

    #[error("deploy request failed: {0}")]
    Transport(String),

    #[error("confirmation failed: {0}")]
    Confirmation(String),

    #[error("confirmation timed out after {seconds}s")]
    ConfirmationTimeout { seconds: u64 },
}

/// Chain RPC errors. Query replies render these as "N/A".
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("rpc request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("invalid rpc quantity: {0}")]
    InvalidQuantity(String),
}

/// Intake adapter errors.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("intake adapter {0} already started")]
    AlreadyStarted(&'static str),

    #[error("intake channel closed")]
    Closed,
}
