pub mod classify;
pub mod evaluation;
pub mod generation;
