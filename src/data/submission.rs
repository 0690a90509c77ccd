use crate::error::Result;
use crate::types::Grid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Two candidate outputs for one test input. Either attempt matching the
/// hidden output counts as solved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptPair {
    pub attempt_1: Grid,
    pub attempt_2: Grid,
}

impl AttemptPair {
    /// Both attempts carry the same grid. Used when no second candidate
    /// distinct from the first is known.
    pub fn duplicated(grid: Grid) -> Self {
        Self {
            attempt_1: grid.clone(),
            attempt_2: grid,
        }
    }

    pub fn matches(&self, expected: &Grid) -> bool {
        self.attempt_1 == *expected || self.attempt_2 == *expected
    }
}

/// Task id to one attempt pair per test input, in test-input order. The
/// map is ordered so serialized submissions are byte-stable.
pub type Submission = BTreeMap<String, Vec<AttemptPair>>;

pub fn write_submission<P: AsRef<Path>>(path: P, submission: &Submission) -> Result<()> {
    let json = serde_json::to_string_pretty(submission)?;
    std::fs::write(path.as_ref(), json)?;
    Ok(())
}

pub fn read_submission<P: AsRef<Path>>(path: P) -> Result<Submission> {
    let content = std::fs::read_to_string(path.as_ref())?;
    Ok(serde_json::from_str(&content)?)
}
