use super::traits::ConfigSection;
use crate::error::GridmorphError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Candidates kept per depth of the beam.
    pub beam_width: usize,
    /// Steps the beam may append to a seed program.
    pub beam_depth: usize,
    /// Step count above which program execution is abandoned.
    pub max_steps: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            beam_width: 5,
            beam_depth: 3,
            max_steps: 20,
        }
    }
}

impl ConfigSection for SearchConfig {
    fn section_name() -> &'static str {
        "search"
    }

    fn validate(&self) -> Result<(), GridmorphError> {
        if self.beam_width == 0 {
            return Err(GridmorphError::Configuration(
                "Beam width must be at least 1".to_string(),
            ));
        }
        if self.beam_depth == 0 {
            return Err(GridmorphError::Configuration(
                "Beam depth must be at least 1".to_string(),
            ));
        }
        if self.max_steps == 0 || self.max_steps > 20 {
            return Err(GridmorphError::Configuration(
                "Execution step limit must be between 1 and 20".to_string(),
            ));
        }
        Ok(())
    }
}
