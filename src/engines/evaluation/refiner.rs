use super::executor::Executor;
use crate::data::{task_palette, TrainPair};
use crate::engines::classify::PatternScore;
use crate::functions::{GridPrimitive, ParamKind};
use crate::types::{canonical_program, Program, ProgramStep};
use crate::utils::Deadline;
use std::collections::HashSet;
use std::sync::Arc;

/// Result of one refinement call. `program` is never worse than the input
/// program on the given pairs.
#[derive(Debug, Clone)]
pub struct RefineOutcome {
    pub program: Program,
    pub distance: u64,
    pub solved: bool,
    pub expansions: usize,
}

struct Candidate {
    program: Program,
    distance: u64,
    key: String,
}

/// Bounded-width, bounded-depth local search over program extensions.
///
/// Starting from a seed program, each depth appends one primitive step
/// (with preset parameters) to every surviving candidate and keeps the
/// best `width` by total distance. Candidate ordering breaks distance
/// ties by program length, then by canonical program text, so refinement
/// is deterministic. The deadline is polled between expansions; on expiry
/// the best program found so far is returned.
pub struct BeamRefiner {
    executor: Executor,
    width: usize,
    max_depth: usize,
}

impl BeamRefiner {
    pub fn new(executor: Executor, width: usize, max_depth: usize) -> Self {
        Self {
            executor,
            width,
            max_depth,
        }
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Refine `program` against `pairs`. A confident pattern label
    /// narrows the primitive pool to biased primitives. The returned
    /// program never matches fewer pairs exactly than the seed does.
    pub fn refine(
        &self,
        program: &[ProgramStep],
        pairs: &[TrainPair],
        bias: Option<PatternScore>,
        deadline: Deadline,
    ) -> RefineOutcome {
        let base_distance = self.executor.distance(program, pairs);
        let mut best_program = program.to_vec();
        let mut best_distance = base_distance;
        let mut expansions = 0usize;

        if base_distance == 0 || self.width == 0 || self.max_depth == 0 || deadline.expired() {
            return RefineOutcome {
                program: best_program,
                distance: best_distance,
                solved: best_distance == 0,
                expansions,
            };
        }

        let pool = self.primitive_pool(bias);
        let palette = task_palette(pairs);
        let max_len = self.executor.max_steps();

        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(canonical_program(program));
        let mut beam = vec![Candidate {
            program: program.to_vec(),
            distance: base_distance,
            key: canonical_program(program),
        }];

        'search: for _depth in 0..self.max_depth {
            if deadline.expired() {
                break;
            }
            let mut next: Vec<Candidate> = Vec::new();
            for candidate in &beam {
                if candidate.program.len() >= max_len {
                    continue;
                }
                for primitive in &pool {
                    for params in param_presets(primitive.as_ref(), &palette) {
                        if deadline.expired() {
                            break 'search;
                        }
                        let mut extended = candidate.program.clone();
                        extended.push(ProgramStep::new(primitive.name(), params));
                        let key = canonical_program(&extended);
                        if !seen.insert(key.clone()) {
                            continue;
                        }
                        let distance = self.executor.distance(&extended, pairs);
                        expansions += 1;
                        if distance < best_distance {
                            best_distance = distance;
                            best_program = extended.clone();
                            if best_distance == 0 {
                                break 'search;
                            }
                        }
                        next.push(Candidate {
                            program: extended,
                            distance,
                            key,
                        });
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            next.sort_by(|a, b| {
                a.distance
                    .cmp(&b.distance)
                    .then(a.program.len().cmp(&b.program.len()))
                    .then(a.key.cmp(&b.key))
            });
            next.truncate(self.width);
            beam = next;
        }

        // A drop in distance can still trade an exactly matched pair
        // away. The seed stays unless the refined program matches at
        // least as many pairs exactly.
        if best_distance < base_distance
            && best_distance > 0
            && self.executor.fitness(&best_program, pairs) < self.executor.fitness(program, pairs)
        {
            best_program = program.to_vec();
            best_distance = base_distance;
        }

        RefineOutcome {
            program: best_program,
            distance: best_distance,
            solved: best_distance == 0,
            expansions,
        }
    }

    fn primitive_pool(&self, bias: Option<PatternScore>) -> Vec<Arc<dyn GridPrimitive>> {
        if let Some(score) = bias {
            if score.is_confident() {
                let biased = self.executor.registry().biased_toward(score.pattern);
                if !biased.is_empty() {
                    return biased;
                }
            }
        }
        self.executor.registry().searchable()
    }
}

/// Concrete parameter tuples worth trying for one primitive: palette
/// colors for color slots, small factors for counts, all four directions.
/// No-op tuples (equal color pair, all-ones counts) are dropped.
fn param_presets(primitive: &dyn GridPrimitive, palette: &[u8]) -> Vec<Vec<i32>> {
    let specs = primitive.params();
    if specs.is_empty() {
        return vec![vec![]];
    }
    let mut combos: Vec<Vec<i32>> = vec![vec![]];
    for spec in specs {
        let choices: Vec<i32> = match spec.kind {
            ParamKind::Color => palette.iter().map(|&c| c as i32).collect(),
            ParamKind::Count => vec![1, 2, 3],
            ParamKind::Direction => (0..crate::functions::Direction::COUNT).collect(),
        };
        let mut grown = Vec::with_capacity(combos.len() * choices.len());
        for prefix in &combos {
            for &choice in &choices {
                let mut next = prefix.clone();
                next.push(choice);
                grown.push(next);
            }
        }
        combos = grown;
    }
    combos.retain(|params| {
        let all_color = specs.iter().all(|s| s.kind == ParamKind::Color);
        if all_color && specs.len() == 2 && params[0] == params[1] {
            return false;
        }
        let counts: Vec<i32> = specs
            .iter()
            .zip(params)
            .filter(|(s, _)| s.kind == ParamKind::Count)
            .map(|(_, &p)| p)
            .collect();
        if !counts.is_empty() && counts.iter().all(|&c| c == 1) {
            return false;
        }
        true
    });
    combos
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ProgramCache;
    use crate::engines::classify::TaskClassifier;
    use crate::functions::PrimitiveRegistry;
    use crate::types::{Grid, TaskPattern};
    use std::time::Duration;

    fn refiner(width: usize, depth: usize) -> BeamRefiner {
        let executor = Executor::new(
            Arc::new(PrimitiveRegistry::new()),
            Some(Arc::new(ProgramCache::new(4096, Duration::from_secs(60)))),
            4,
        );
        BeamRefiner::new(executor, width, depth)
    }

    fn flip_pairs() -> Vec<TrainPair> {
        vec![
            TrainPair {
                input: Grid::from_rows(vec![vec![1, 0], vec![0, 1]]).unwrap(),
                output: Grid::from_rows(vec![vec![0, 1], vec![1, 0]]).unwrap(),
            },
            TrainPair {
                input: Grid::from_rows(vec![vec![2, 3], vec![0, 0]]).unwrap(),
                output: Grid::from_rows(vec![vec![3, 2], vec![0, 0]]).unwrap(),
            },
        ]
    }

    #[test]
    fn test_refiner_solves_single_step_task_from_empty_seed() {
        let refiner = refiner(8, 2);
        let outcome = refiner.refine(&[], &flip_pairs(), None, Deadline::unbounded());
        assert!(outcome.solved);
        assert_eq!(outcome.distance, 0);
        assert_eq!(outcome.program.len(), 1);
        assert_eq!(outcome.program[0].primitive, "flip_h");
    }

    #[test]
    fn test_zero_deadline_returns_seed_untouched() {
        let refiner = refiner(8, 3);
        let seed = vec![ProgramStep::new("rotate90", vec![])];
        let outcome = refiner.refine(
            &seed,
            &flip_pairs(),
            None,
            Deadline::after(Duration::ZERO),
        );
        assert_eq!(outcome.program, seed);
        assert_eq!(outcome.expansions, 0);
    }

    #[test]
    fn test_refined_program_never_regresses() {
        let refiner = refiner(4, 2);
        let pairs = flip_pairs();
        let seeds: Vec<Vec<ProgramStep>> = vec![
            vec![],
            vec![ProgramStep::new("rotate90", vec![])],
            vec![ProgramStep::new("recolor", vec![1, 2])],
            vec![ProgramStep::new("no_such", vec![])],
        ];
        for seed in seeds {
            let before = refiner.executor().distance(&seed, &pairs);
            let outcome = refiner.refine(&seed, &pairs, None, Deadline::unbounded());
            assert!(
                outcome.distance <= before,
                "seed {:?} regressed: {} -> {}",
                seed,
                before,
                outcome.distance
            );
        }
    }

    #[test]
    fn test_refiner_keeps_seed_when_distance_gain_loses_solved_pairs() {
        // The empty seed reproduces the first pair exactly. recolor(2,1)
        // cuts the total distance from six to two but breaks that exact
        // match, so the seed must survive refinement.
        let pairs = vec![
            TrainPair {
                input: Grid::from_rows(vec![vec![2]]).unwrap(),
                output: Grid::from_rows(vec![vec![2]]).unwrap(),
            },
            TrainPair {
                input: Grid::from_rows(vec![vec![2, 2, 2, 2, 2, 1]]).unwrap(),
                output: Grid::from_rows(vec![vec![1, 1, 1, 1, 1, 3]]).unwrap(),
            },
        ];
        let refiner = refiner(8, 1);
        let before = refiner.executor().fitness(&[], &pairs);
        assert_eq!(before, 0.5);
        let outcome = refiner.refine(&[], &pairs, None, Deadline::unbounded());
        assert!(outcome.program.is_empty());
        assert_eq!(outcome.distance, refiner.executor().distance(&[], &pairs));
        assert!(refiner.executor().fitness(&outcome.program, &pairs) >= before);
    }

    #[test]
    fn test_already_solved_seed_is_returned_unchanged() {
        let refiner = refiner(8, 2);
        let seed = vec![ProgramStep::new("flip_h", vec![])];
        let outcome = refiner.refine(&seed, &flip_pairs(), None, Deadline::unbounded());
        assert_eq!(outcome.program, seed);
        assert_eq!(outcome.expansions, 0);
        assert!(outcome.solved);
    }

    #[test]
    fn test_confident_bias_narrows_the_pool() {
        // Rotation task, classified confidently, solved with a rotation
        // primitive even though flips are also in the registry.
        let pairs = vec![TrainPair {
            input: Grid::from_rows(vec![vec![1, 2], vec![3, 4]]).unwrap(),
            output: Grid::from_rows(vec![vec![3, 1], vec![4, 2]]).unwrap(),
        }];
        let bias = TaskClassifier::primary(&pairs);
        assert_eq!(bias.pattern, TaskPattern::Rotation);
        let refiner = refiner(4, 1);
        let outcome = refiner.refine(&[], &pairs, Some(bias), Deadline::unbounded());
        assert!(outcome.solved);
        assert_eq!(outcome.program[0].primitive, "rotate90");
    }

    #[test]
    fn test_refinement_is_deterministic() {
        let pairs = flip_pairs();
        let a = refiner(6, 2).refine(&[], &pairs, None, Deadline::unbounded());
        let b = refiner(6, 2).refine(&[], &pairs, None, Deadline::unbounded());
        assert_eq!(a.program, b.program);
        assert_eq!(a.distance, b.distance);
    }

    #[test]
    fn test_param_presets_skip_noop_tuples() {
        let registry = PrimitiveRegistry::new();
        let recolor = registry.get("recolor").unwrap();
        let presets = param_presets(recolor.as_ref(), &[0, 1]);
        assert!(presets.contains(&vec![0, 1]));
        assert!(!presets.contains(&vec![1, 1]));
        let scale = registry.get("scale_up").unwrap();
        let presets = param_presets(scale.as_ref(), &[0, 1]);
        assert!(!presets.contains(&vec![1]));
        assert!(presets.contains(&vec![2]));
    }
}
