pub mod executor;
pub mod refiner;

pub use executor::Executor;
pub use refiner::{BeamRefiner, RefineOutcome};
