//! Intake adapter trait and dynamic dispatch companion.

use crate::InboundEvent;
use crate::error::Result;

use futures::Stream;
use std::pin::Pin;

/// Inbound event stream type.
pub type InboundStream = Pin<Box<dyn Stream<Item = InboundEvent> + Send>>;

/// Static trait for intake adapters.
pub trait IntakeAdapter: Send + Sync + 'static {
    /// Unique name for this adapter.
    fn name(&self) -> &'static str;

    /// Start the adapter and return its inbound event stream.
    fn start(&self) -> impl std::future::Future<Output = Result<InboundStream>> + Send;

    /// Graceful shutdown. The stream ends once the adapter has stopped.
    fn shutdown(&self) -> impl std::future::Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }
}

/// Dynamic trait for runtime polymorphism.
/// Use this when you need `Arc<dyn IntakeAdapterDyn>` for storing different adapters.
pub trait IntakeAdapterDyn: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn start<'a>(
        &'a self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<InboundStream>> + Send + 'a>>;

    fn shutdown<'a>(&'a self) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>>;
}

/// Blanket implementation: any type implementing IntakeAdapter automatically implements IntakeAdapterDyn.
impl<T: IntakeAdapter> IntakeAdapterDyn for T {
    fn name(&self) -> &'static str {
        IntakeAdapter::name(self)
    }

    fn start<'a>(
        &'a self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<InboundStream>> + Send + 'a>> {
        Box::pin(IntakeAdapter::start(self))
    }

    fn shutdown<'a>(&'a self) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(IntakeAdapter::shutdown(self))
    }
}
