pub mod checkpoint;
pub mod orchestrator;

pub use checkpoint::{Checkpoint, InFlightTask, TaskResult, CHECKPOINT_VERSION};
pub use orchestrator::Orchestrator;
