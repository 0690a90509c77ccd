use crate::engines::generation::{BankSnapshot, EngineSnapshot, Genome};
use crate::error::{GridmorphError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Bumped whenever the serialized shape of genomes, ledger records, or
/// bank entries changes. Older files are rejected rather than guessed at.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Outcome of one task's training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub best: Option<Genome>,
    pub runner_up: Option<Genome>,
    /// Fitness of `best` on the task's full training set.
    pub fitness: f64,
    pub solved: bool,
    pub generations: usize,
}

/// Engine state of a task whose training run was interrupted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InFlightTask {
    pub task_id: String,
    pub engine: EngineSnapshot,
}

/// Crash-recovery snapshot of a run: the strategy bank, every finished
/// task's result, and the engine state of the task being trained when
/// the snapshot was taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub format_version: u32,
    pub created_at: String,
    pub bank: BankSnapshot,
    pub results: BTreeMap<String, TaskResult>,
    pub in_flight: Option<InFlightTask>,
}

impl Checkpoint {
    pub fn new(
        bank: BankSnapshot,
        results: BTreeMap<String, TaskResult>,
        in_flight: Option<InFlightTask>,
    ) -> Self {
        Self {
            format_version: CHECKPOINT_VERSION,
            created_at: chrono::Utc::now().to_rfc3339(),
            bank,
            results,
            in_flight,
        }
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = serde_json::to_string(self)?;
        std::fs::write(path.as_ref(), contents)?;
        log::debug!("Checkpoint written to {}", path.as_ref().display());
        Ok(())
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let checkpoint: Checkpoint = serde_json::from_str(&contents)?;
        if checkpoint.format_version != CHECKPOINT_VERSION {
            return Err(GridmorphError::Checkpoint(format!(
                "unsupported checkpoint format {} (expected {})",
                checkpoint.format_version, CHECKPOINT_VERSION
            )));
        }
        Ok(checkpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProgramStep;
    use tempfile::NamedTempFile;

    fn sample() -> Checkpoint {
        let mut results = BTreeMap::new();
        results.insert(
            "task_a".to_string(),
            TaskResult {
                best: Some(Genome::new(
                    vec![ProgramStep::new("flip_h", vec![])],
                    3,
                    1,
                )),
                runner_up: None,
                fitness: 1.0,
                solved: true,
                generations: 4,
            },
        );
        Checkpoint::new(BankSnapshot::default(), results, None)
    }

    #[test]
    fn test_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let checkpoint = sample();
        checkpoint.write(file.path()).unwrap();
        let loaded = Checkpoint::read(file.path()).unwrap();
        assert_eq!(loaded.format_version, CHECKPOINT_VERSION);
        assert_eq!(loaded.results, checkpoint.results);
        assert!(loaded.in_flight.is_none());
    }

    #[test]
    fn test_version_mismatch_is_a_hard_error() {
        let file = NamedTempFile::new().unwrap();
        let mut checkpoint = sample();
        checkpoint.format_version = CHECKPOINT_VERSION + 1;
        let contents = serde_json::to_string(&checkpoint).unwrap();
        std::fs::write(file.path(), contents).unwrap();
        let err = Checkpoint::read(file.path()).unwrap_err();
        assert!(matches!(err, GridmorphError::Checkpoint(_)));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let err = Checkpoint::read("/nonexistent/checkpoint.json").unwrap_err();
        assert!(matches!(err, GridmorphError::Io(_)));
    }
}
