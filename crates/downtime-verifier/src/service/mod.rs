//! Application services: span registry, chain poller, reconciler and the
//! orchestrator that sequences them.

pub mod orchestrator;
pub mod poller;
pub mod reconciler;
pub mod registry;

pub use orchestrator::{OrchestratorDeps, VerificationOrchestrator};
pub use poller::ChainPoller;
pub use reconciler::DowntimeReconciler;
pub use registry::SpanRegistry;
