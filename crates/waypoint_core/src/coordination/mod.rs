//! Multi-agent coordination: the shared position registry and the
//! synchronous step-loop coordinator that drives intent, conflict
//! resolution, execution, knowledge broadcast, and termination.

mod registry;
mod simulation;

pub use registry::PositionRegistry;
pub use simulation::{Coordinator, RunOutcome, RunSummary, StepReport};
