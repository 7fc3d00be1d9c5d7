//! HTTP API: webhook intake, health, history, and manual deployment.

mod deployments;
mod server;
mod state;
mod system;
mod webhook;

pub use server::{router, start_http_server};
pub use state::ApiState;
