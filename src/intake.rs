//! Intake adapters (webhook push and feed polling).

pub mod manager;
pub mod poller;
pub mod traits;
pub mod webhook;

pub use manager::IntakeManager;
pub use traits::{InboundStream, IntakeAdapter};
