//! Command grammar: deploy commands and the query table.

pub mod parse;
pub mod query;

pub use parse::{DeployCommand, is_deploy_intent, parse_deploy_command};
pub use query::{QueryCommand, classify_query};
