//! Shared state for API handlers.

use crate::config::IntakeMode;
use crate::intake::webhook::WebhookIngress;
use crate::pipeline::Pipeline;

use std::time::Instant;

/// State shared across all API handlers.
pub struct ApiState {
    pub started_at: Instant,
    pub pipeline: Pipeline,
    /// Present when webhook intake is enabled.
    pub webhook: Option<WebhookIngress>,
    pub mode: IntakeMode,
}

impl ApiState {
    pub fn new(pipeline: Pipeline, webhook: Option<WebhookIngress>, mode: IntakeMode) -> Self {
        Self {
            started_at: Instant::now(),
            pipeline,
            webhook,
            mode,
        }
    }
}
