use crate::data::{ProgramCache, TrainPair};
use crate::functions::PrimitiveRegistry;
use crate::types::{grid_distance, Grid, ProgramStep, MAX_SIDE};
use std::sync::Arc;

/// Distance charged when a program fails to execute at all. Strictly
/// larger than any distance a produced grid can score, so executable
/// programs always rank ahead of broken ones.
pub fn failure_distance(expected: &Grid) -> u64 {
    expected.area() as u64 + 1 + (MAX_SIDE * MAX_SIDE) as u64
}

/// Runs programs against grids, memoizing prefix results.
///
/// Execution is all-or-nothing: an unknown primitive, a primitive error
/// or an intermediate grid outgrowing the task bounds makes the whole
/// program score as a failure, never an `Err`. Cloning is cheap; clones
/// share the registry and cache.
#[derive(Clone)]
pub struct Executor {
    registry: Arc<PrimitiveRegistry>,
    cache: Option<Arc<ProgramCache>>,
    max_steps: usize,
}

impl Executor {
    pub fn new(
        registry: Arc<PrimitiveRegistry>,
        cache: Option<Arc<ProgramCache>>,
        max_steps: usize,
    ) -> Self {
        Self {
            registry,
            cache,
            max_steps,
        }
    }

    pub fn registry(&self) -> &PrimitiveRegistry {
        &self.registry
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Execute `program` on `input`. Resumes from the longest memoized
    /// prefix and memoizes every prefix computed along the way.
    pub fn run(&self, program: &[ProgramStep], input: &Grid) -> Option<Grid> {
        if program.len() > self.max_steps {
            return None;
        }
        let mut start = 0;
        let mut current = input.clone();
        if let Some(cache) = &self.cache {
            for len in (1..=program.len()).rev() {
                if let Some(grid) = cache.get(input, &program[..len]) {
                    start = len;
                    current = grid;
                    break;
                }
            }
        }
        for len in start + 1..=program.len() {
            let step = &program[len - 1];
            let primitive = self.registry.get(&step.primitive)?;
            let next = match primitive.apply(&current, &step.params) {
                Ok(grid) => grid,
                Err(e) => {
                    log::debug!("Step {} failed: {}", step, e);
                    return None;
                }
            };
            if next.rows() > MAX_SIDE || next.cols() > MAX_SIDE {
                return None;
            }
            if let Some(cache) = &self.cache {
                cache.put(input, &program[..len], next.clone());
            }
            current = next;
        }
        Some(current)
    }

    /// Fraction of pairs the program reproduces exactly.
    pub fn fitness(&self, program: &[ProgramStep], pairs: &[TrainPair]) -> f64 {
        if pairs.is_empty() {
            return 0.0;
        }
        let solved = pairs
            .iter()
            .filter(|pair| {
                self.run(program, &pair.input)
                    .map_or(false, |out| out == pair.output)
            })
            .count();
        solved as f64 / pairs.len() as f64
    }

    /// Total cell-mismatch distance across pairs; lower is better, zero
    /// means every pair is reproduced exactly.
    pub fn distance(&self, program: &[ProgramStep], pairs: &[TrainPair]) -> u64 {
        pairs
            .iter()
            .map(|pair| match self.run(program, &pair.input) {
                Some(out) => grid_distance(&out, &pair.output),
                None => failure_distance(&pair.output),
            })
            .sum()
    }
}
