use crate::error::{GridmorphError, Result};
use crate::types::Grid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// One worked example: an input grid and the expected output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainPair {
    pub input: Grid,
    pub output: Grid,
}

/// A held-out input. The output is present for scored datasets and absent
/// for blind ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPair {
    pub input: Grid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Grid>,
}

/// A single puzzle: worked examples plus the inputs to solve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub train: Vec<TrainPair>,
    #[serde(default)]
    pub test: Vec<TestPair>,
}

impl Task {
    pub fn validate(&self) -> Result<()> {
        if self.train.is_empty() {
            return Err(GridmorphError::TaskData(
                "task has no worked examples".to_string(),
            ));
        }
        if self.test.is_empty() {
            return Err(GridmorphError::TaskData("task has no test inputs".to_string()));
        }
        Ok(())
    }

    /// Whether every test pair carries a known output.
    pub fn has_solutions(&self) -> bool {
        self.test.iter().all(|pair| pair.output.is_some())
    }
}

/// Colors appearing anywhere in the worked examples, ascending. Search
/// layers enumerate color parameters from this set instead of all ten.
pub fn task_palette(pairs: &[TrainPair]) -> Vec<u8> {
    let mut seen = [false; (crate::types::MAX_COLOR as usize) + 1];
    for pair in pairs {
        for &color in pair.input.palette().iter().chain(pair.output.palette().iter()) {
            seen[color as usize] = true;
        }
    }
    (0..=crate::types::MAX_COLOR)
        .filter(|&c| seen[c as usize])
        .collect()
}

pub struct TaskLoader;

impl TaskLoader {
    /// Load a task file mapping task id to task body. Tasks that fail
    /// validation are skipped with a warning rather than failing the
    /// whole file; an unreadable or unparsable file is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<BTreeMap<String, Task>> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            GridmorphError::TaskData(format!("failed to open {}: {}", path.display(), e))
        })?;
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| {
                GridmorphError::TaskData(format!("failed to parse {}: {}", path.display(), e))
            })?;

        let mut tasks = BTreeMap::new();
        for (id, value) in raw {
            let task: Task = match serde_json::from_value(value) {
                Ok(task) => task,
                Err(e) => {
                    log::warn!("Skipping task {}: {}", id, e);
                    continue;
                }
            };
            match task.validate() {
                Ok(()) => {
                    tasks.insert(id, task);
                }
                Err(e) => log::warn!("Skipping task {}: {}", id, e),
            }
        }

        if tasks.is_empty() {
            return Err(GridmorphError::TaskData(format!(
                "no usable tasks in {}",
                path.display()
            )));
        }
        log::info!("Loaded {} tasks from {}", tasks.len(), path.display());
        Ok(tasks)
    }

    /// Attach known outputs from a solutions file (task id to one output
    /// grid per test input). Unknown ids and length mismatches are
    /// skipped with a warning.
    pub fn attach_solutions<P: AsRef<Path>>(
        tasks: &mut BTreeMap<String, Task>,
        path: P,
    ) -> Result<()> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            GridmorphError::TaskData(format!("failed to open {}: {}", path.display(), e))
        })?;
        let solutions: BTreeMap<String, Vec<Grid>> =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| {
                GridmorphError::TaskData(format!("failed to parse {}: {}", path.display(), e))
            })?;

        for (id, outputs) in solutions {
            let Some(task) = tasks.get_mut(&id) else {
                log::warn!("Solutions for unknown task {}", id);
                continue;
            };
            if outputs.len() != task.test.len() {
                log::warn!(
                    "Task {}: {} solutions for {} test inputs",
                    id,
                    outputs.len(),
                    task.test.len()
                );
                continue;
            }
            for (pair, output) in task.test.iter_mut().zip(outputs) {
                pair.output = Some(output);
            }
        }
        Ok(())
    }
}
