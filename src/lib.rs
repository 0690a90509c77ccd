//! Evolutionary program search for grid transformation puzzles.
//!
//! Programs are short sequences of named grid primitives. A population of
//! candidate programs evolves against each task's worked examples under a
//! wall-clock budget, with beam refinement polishing every candidate and a
//! knowledge ledger recording each strict improvement. Cross-task memory
//! lives in a strategy bank keyed by detected task pattern.

pub mod config;
pub mod data;
pub mod engines;
pub mod error;
pub mod functions;
pub mod runner;
pub mod types;
pub mod utils;
