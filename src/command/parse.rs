//! Deploy command parser.
//!
//! The `name` and `symbol` captures are matched independently, so their order
//! in the post does not matter and surrounding words are ignored.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)name\s+([A-Za-z0-9]+)").expect("hardcoded name regex"));

static SYMBOL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)symbol\s+([A-Za-z0-9]+)").expect("hardcoded symbol regex")
});

/// A validated request to deploy a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployCommand {
    pub token_name: String,
    pub token_symbol: String,
    /// Source URL of the logo, when the post carried an image.
    pub image_ref: Option<String>,
}

impl DeployCommand {
    /// Build a command from explicit fields. Returns `None` unless both are
    /// non-empty and ASCII alphanumeric.
    pub fn new(token_name: impl Into<String>, token_symbol: impl Into<String>) -> Option<Self> {
        let token_name = token_name.into();
        let token_symbol = token_symbol.into();
        if !is_token(&token_name) || !is_token(&token_symbol) {
            return None;
        }
        Some(Self {
            token_name,
            token_symbol,
            image_ref: None,
        })
    }

    pub fn with_image(mut self, image_ref: Option<String>) -> Self {
        self.image_ref = image_ref;
        self
    }
}

fn is_token(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Extract a deploy command from post text. `None` is a validation failure.
pub fn parse_deploy_command(text: &str) -> Option<DeployCommand> {
    let token_name = NAME_REGEX.captures(text)?.get(1)?.as_str();
    let token_symbol = SYMBOL_REGEX.captures(text)?.get(1)?.as_str();
    DeployCommand::new(token_name, token_symbol)
}

/// Whether the post is trying to deploy at all (and so deserves a usage hint
/// when the grammar does not match).
pub fn is_deploy_intent(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("deploy") && lower.contains("token")
}
