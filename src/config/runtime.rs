use super::traits::ConfigSection;
use crate::error::GridmorphError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub time_budget_hours: f64,
    /// Share of the budget spent training before solving starts.
    pub train_fraction: f64,
    /// Seconds reserved at the end of the budget for writing output.
    pub safety_buffer_secs: u64,
    pub checkpoint_every_generations: usize,
    pub checkpoint_every_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            time_budget_hours: 1.0,
            train_fraction: 0.6,
            safety_buffer_secs: 120,
            checkpoint_every_generations: 25,
            checkpoint_every_secs: 600,
        }
    }
}

impl ConfigSection for RuntimeConfig {
    fn section_name() -> &'static str {
        "runtime"
    }

    fn validate(&self) -> Result<(), GridmorphError> {
        if self.time_budget_hours <= 0.0 {
            return Err(GridmorphError::Configuration(
                "Time budget must be positive".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.train_fraction) || self.train_fraction == 0.0 {
            return Err(GridmorphError::Configuration(
                "Training fraction must be strictly between 0 and 1".to_string(),
            ));
        }
        if self.checkpoint_every_generations == 0 || self.checkpoint_every_secs == 0 {
            return Err(GridmorphError::Configuration(
                "Checkpoint intervals must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
