//! IntakeManager: fan-in for all intake adapters.

use crate::error::Result;
use crate::intake::traits::{InboundStream, IntakeAdapter, IntakeAdapterDyn};

use std::sync::Arc;

/// Owns the configured intake adapters and merges their streams.
#[derive(Default)]
pub struct IntakeManager {
    adapters: Vec<Arc<dyn IntakeAdapterDyn>>,
}

impl IntakeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter.
    pub fn register(&mut self, adapter: impl IntakeAdapter) {
        self.register_shared(Arc::new(adapter));
    }

    /// Register an adapter that other components also hold.
    pub fn register_shared(&mut self, adapter: Arc<dyn IntakeAdapterDyn>) {
        tracing::debug!(adapter = adapter.name(), "intake adapter registered");
        self.adapters.push(adapter);
    }

    pub fn adapter_names(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|adapter| adapter.name()).collect()
    }

    /// Start every adapter and merge their streams. Events from different
    /// adapters interleave in arrival order.
    pub async fn start(&self) -> Result<InboundStream> {
        let mut streams = Vec::with_capacity(self.adapters.len());
        for adapter in &self.adapters {
            let stream = adapter.start().await?;
            tracing::info!(adapter = adapter.name(), "intake adapter started");
            streams.push(stream);
        }
        Ok(Box::pin(futures::stream::select_all(streams)))
    }

    /// Stop every adapter, logging failures.
    pub async fn shutdown(&self) {
        for adapter in &self.adapters {
            if let Err(error) = adapter.shutdown().await {
                tracing::warn!(adapter = adapter.name(), %error, "intake adapter shutdown failed");
            }
        }
    }
}

impl std::fmt::Debug for IntakeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntakeManager")
            .field("adapters", &self.adapter_names())
            .finish()
    }
}
