//! Non-deploy query commands, dispatched through an ordered table.
//!
//! Each entry pairs a predicate over the lowercased post text with the query
//! it selects. The first matching entry wins; no match falls through to
//! deploy-command detection. Phrases match on word boundaries, so a token
//! named `Coffee` is not a question about fees.

use serde::{Deserialize, Serialize};

/// A recognized non-deploy command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryCommand {
    Help,
    About,
    Status,
    History,
    Gas,
    Balance,
    Protocol,
    HowToDeploy,
    Pricing,
    Unknown,
}

impl QueryCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryCommand::Help => "help",
            QueryCommand::About => "about",
            QueryCommand::Status => "status",
            QueryCommand::History => "history",
            QueryCommand::Gas => "gas",
            QueryCommand::Balance => "balance",
            QueryCommand::Protocol => "protocol",
            QueryCommand::HowToDeploy => "how_to_deploy",
            QueryCommand::Pricing => "pricing",
            QueryCommand::Unknown => "unknown",
        }
    }

    /// Whether answering needs live wallet balance.
    pub fn needs_balance(self) -> bool {
        matches!(self, QueryCommand::Status | QueryCommand::Balance)
    }

    /// Whether answering needs the live gas price.
    pub fn needs_gas_price(self) -> bool {
        matches!(self, QueryCommand::Status | QueryCommand::Gas)
    }
}

impl std::fmt::Display for QueryCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a predicate looks for in the lowercased text.
enum Matcher {
    /// Any of the fixed phrases.
    Any(&'static [&'static str]),
    /// Any of the phrases, with `{handle}` replaced by `@<handle>`.
    AnyWithHandle(&'static [&'static str]),
    /// Mentions the handle but is not a deploy request.
    MentionWithoutDeploy,
}

impl Matcher {
    fn matches(&self, lower: &str, handle: &str) -> bool {
        match self {
            Matcher::Any(phrases) => phrases.iter().any(|p| contains_phrase(lower, p)),
            Matcher::AnyWithHandle(phrases) => phrases.iter().any(|p| {
                let phrase = p.replace("{handle}", &format!("@{handle}"));
                contains_phrase(lower, &phrase)
            }),
            Matcher::MentionWithoutDeploy => {
                contains_phrase(lower, &format!("@{handle}")) && !lower.contains("deploy token")
            }
        }
    }
}

/// `phrase` occurs in `text` without running into a neighbouring word.
/// Edges of the phrase that are punctuation (`clanker?`) need no boundary.
fn contains_phrase(text: &str, phrase: &str) -> bool {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let open_start = phrase.chars().next().is_some_and(is_word);
    let open_end = phrase.chars().next_back().is_some_and(is_word);

    text.match_indices(phrase).any(|(start, matched)| {
        let before = text[..start].chars().next_back();
        let after = text[start + matched.len()..].chars().next();
        !(open_start && before.is_some_and(is_word)) && !(open_end && after.is_some_and(is_word))
    })
}

/// Priority-ordered dispatch table.
const QUERY_TABLE: &[(Matcher, QueryCommand)] = &[
    (Matcher::Any(&["help", "how to", "commands"]), QueryCommand::Help),
    (
        Matcher::AnyWithHandle(&["about", "what is {handle}", "who are you"]),
        QueryCommand::About,
    ),
    (Matcher::Any(&["status", "online", "working"]), QueryCommand::Status),
    (
        Matcher::Any(&["history", "recent", "deployed tokens"]),
        QueryCommand::History,
    ),
    (Matcher::Any(&["gas", "fee"]), QueryCommand::Gas),
    (Matcher::Any(&["balance", "wallet"]), QueryCommand::Balance),
    (
        Matcher::Any(&["what is clanker", "clanker?"]),
        QueryCommand::Protocol,
    ),
    (
        Matcher::Any(&["how do i deploy", "how to deploy"]),
        QueryCommand::HowToDeploy,
    ),
    (Matcher::Any(&["cost", "price", "how much"]), QueryCommand::Pricing),
    (Matcher::MentionWithoutDeploy, QueryCommand::Unknown),
];

/// Classify post text against the query table. `handle` is the agent's handle
/// without the leading `@`.
pub fn classify_query(text: &str, handle: &str) -> Option<QueryCommand> {
    let lower = text.to_lowercase();
    let handle = handle.trim_start_matches('@').to_lowercase();
    QUERY_TABLE
        .iter()
        .find(|(matcher, _)| matcher.matches(&lower, &handle))
        .map(|(_, query)| *query)
}
