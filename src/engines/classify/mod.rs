pub mod classifier;
pub mod detectors;

pub use classifier::{PatternScore, TaskClassifier, CONFIDENT};
