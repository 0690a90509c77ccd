use crate::config::AppConfig;
use crate::data::{
    write_submission, AttemptPair, ProgramCache, Submission, Task, TaskLoader, TrainPair,
};
use crate::engines::classify::TaskClassifier;
use crate::engines::evaluation::{BeamRefiner, Executor};
use crate::engines::generation::{
    ConsoleProgressCallback, EvolutionEngine, NullProgressCallback, StrategyBank,
};
use crate::error::Result;
use crate::functions::PrimitiveRegistry;
use crate::runner::checkpoint::{Checkpoint, InFlightTask, TaskResult};
use crate::types::{Program, TaskPattern};
use crate::utils::Deadline;
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Budget split, per-task scheduling, and submission assembly around the
/// evolution engine.
///
/// Training walks the tasks in id order, giving each an equal share of
/// the time left, and accumulates per-task results plus the strategy
/// bank. Solving walks them again under the remaining budget minus the
/// safety buffer and emits two attempts per test input, falling back to
/// the identity transform when no program is available.
pub struct Orchestrator {
    config: AppConfig,
    registry: Arc<PrimitiveRegistry>,
    cache: Arc<ProgramCache>,
    bank: StrategyBank,
    seed: u64,
}

impl Orchestrator {
    pub fn new(config: AppConfig, seed: u64) -> Self {
        let cache = Arc::new(ProgramCache::new(
            config.memory.cache_capacity,
            Duration::from_secs(config.memory.cache_ttl_secs),
        ));
        let bank = StrategyBank::new(config.memory.bank_capacity);
        Self {
            config,
            registry: Arc::new(PrimitiveRegistry::new()),
            cache,
            bank,
            seed,
        }
    }

    /// Train on every task, filling the bank and writing checkpoints. An
    /// existing checkpoint at the checkpoint path resumes the run.
    pub fn train(
        &mut self,
        input: &Path,
        output_dir: &Path,
        checkpoint: Option<&Path>,
    ) -> Result<()> {
        let started = Instant::now();
        let tasks = TaskLoader::load(input)?;
        std::fs::create_dir_all(output_dir)?;
        let checkpoint_path = self.checkpoint_path(checkpoint, output_dir);

        let (results, in_flight) = if checkpoint_path.exists() {
            let loaded = Checkpoint::read(&checkpoint_path)?;
            self.bank =
                StrategyBank::from_snapshot(loaded.bank, self.config.memory.bank_capacity);
            log::info!(
                "Resuming from checkpoint: {} tasks already trained",
                loaded.results.len()
            );
            (loaded.results, loaded.in_flight)
        } else {
            (BTreeMap::new(), None)
        };

        let deadline = self.buffered_deadline(started);
        let results = self.train_tasks(&tasks, deadline, results, in_flight, &checkpoint_path)?;
        let solved = results.values().filter(|r| r.solved).count();
        log::info!(
            "Training finished: {}/{} tasks solved, bank holds {} strategies",
            solved,
            tasks.len(),
            self.bank.len()
        );
        Ok(())
    }

    /// Solve from a checkpoint: re-refine each task's best programs under
    /// its share of the budget and write the submission.
    pub fn solve(&mut self, input: &Path, output_dir: &Path, checkpoint: &Path) -> Result<()> {
        let started = Instant::now();
        let loaded = Checkpoint::read(checkpoint)?;
        self.bank = StrategyBank::from_snapshot(loaded.bank, self.config.memory.bank_capacity);
        let tasks = TaskLoader::load(input)?;
        std::fs::create_dir_all(output_dir)?;

        let submission =
            self.solve_tasks(&tasks, &loaded.results, self.buffered_deadline(started));
        self.finish(&submission, output_dir)
    }

    /// Train then solve inside one budget, split by the configured
    /// training fraction.
    pub fn full(
        &mut self,
        input: &Path,
        output_dir: &Path,
        checkpoint: Option<&Path>,
    ) -> Result<()> {
        let started = Instant::now();
        let tasks = TaskLoader::load(input)?;
        std::fs::create_dir_all(output_dir)?;
        let checkpoint_path = self.checkpoint_path(checkpoint, output_dir);

        let train_end =
            started + self.budget().mul_f64(self.config.runtime.train_fraction);
        let results = self.train_tasks(
            &tasks,
            Deadline::at(train_end),
            BTreeMap::new(),
            None,
            &checkpoint_path,
        )?;

        let submission = self.solve_tasks(&tasks, &results, self.buffered_deadline(started));
        self.finish(&submission, output_dir)
    }

    fn finish(&self, submission: &Submission, output_dir: &Path) -> Result<()> {
        let path = output_dir.join("submission.json");
        write_submission(&path, submission)?;
        let stats = self.cache.stats();
        log::info!(
            "Submission for {} tasks written to {} (cache hit rate {:.2})",
            submission.len(),
            path.display(),
            stats.hit_rate()
        );
        Ok(())
    }

    fn train_tasks(
        &mut self,
        tasks: &BTreeMap<String, Task>,
        deadline: Deadline,
        mut results: BTreeMap<String, TaskResult>,
        mut in_flight: Option<InFlightTask>,
        checkpoint_path: &Path,
    ) -> Result<BTreeMap<String, TaskResult>> {
        let pending: Vec<(&String, &Task)> = tasks
            .iter()
            .filter(|(id, _)| !results.contains_key(id.as_str()))
            .collect();
        let checkpoint_wall = Duration::from_secs(self.config.runtime.checkpoint_every_secs);
        let mut last_checkpoint = Instant::now();

        for (index, (task_id, task)) in pending.iter().enumerate() {
            if deadline.expired() {
                log::info!(
                    "Training deadline reached with {} tasks left",
                    pending.len() - index
                );
                break;
            }
            let task_deadline = self.slice(deadline, (pending.len() - index) as u32);

            let mut engine = match in_flight.take() {
                Some(flight) if flight.task_id == **task_id => EvolutionEngine::from_snapshot(
                    self.config.evolution.clone(),
                    self.refiner(),
                    task.train.clone(),
                    flight.engine,
                    self.task_seed(task_id),
                ),
                other => {
                    in_flight = other;
                    EvolutionEngine::new(
                        self.config.evolution.clone(),
                        self.refiner(),
                        task.train.clone(),
                        self.bank_seeds(&task.train),
                        self.task_seed(task_id),
                    )
                }
            };

            let mut callback = ConsoleProgressCallback;
            while engine.generation() < self.config.evolution.max_generations
                && !task_deadline.expired()
                && !engine.train_solved()
            {
                engine.step(task_deadline, &mut callback);
                let on_generation = engine.generation()
                    % self.config.runtime.checkpoint_every_generations
                    == 0;
                if on_generation || last_checkpoint.elapsed() >= checkpoint_wall {
                    self.write_checkpoint(
                        checkpoint_path,
                        &results,
                        Some(InFlightTask {
                            task_id: (*task_id).clone(),
                            engine: engine.snapshot(),
                        }),
                    )?;
                    last_checkpoint = Instant::now();
                }
            }

            let summary = engine.summary();
            let result = TaskResult {
                best: engine.best_genome().map(|g| (*g).clone()),
                runner_up: engine.runner_up().cloned(),
                fitness: summary.best_fitness,
                solved: summary.solved,
                generations: summary.generations,
            };
            self.feed_bank(&task.train, &result);
            log::info!(
                "Task {}: fitness {:.3} after {} generations{}",
                task_id,
                result.fitness,
                result.generations,
                if result.solved { ", solved" } else { "" }
            );
            results.insert((*task_id).clone(), result);
        }

        self.write_checkpoint(checkpoint_path, &results, None)?;
        Ok(results)
    }

    fn solve_tasks(
        &self,
        tasks: &BTreeMap<String, Task>,
        results: &BTreeMap<String, TaskResult>,
        deadline: Deadline,
    ) -> Submission {
        let mut submission = Submission::new();
        for (index, (task_id, task)) in tasks.iter().enumerate() {
            if deadline.expired() {
                submission.insert(task_id.clone(), identity_attempts(task));
                continue;
            }
            let task_deadline = self.slice(deadline, (tasks.len() - index) as u32);
            let attempts = self.solve_one(task_id, task, results.get(task_id), task_deadline);
            submission.insert(task_id.clone(), attempts);
        }
        submission
    }

    /// One task's attempts: a short evolution run seeded with the trained
    /// best programs and bank strategies, refined against the full
    /// training set under the task's deadline.
    fn solve_one(
        &self,
        task_id: &str,
        task: &Task,
        trained: Option<&TaskResult>,
        deadline: Deadline,
    ) -> Vec<AttemptPair> {
        let primary = TaskClassifier::primary(&task.train);
        let mut seeds: Vec<(Program, TaskPattern)> = Vec::new();
        if let Some(result) = trained {
            if let Some(best) = &result.best {
                seeds.push((best.program.clone(), primary.pattern));
            }
            if let Some(runner_up) = &result.runner_up {
                seeds.push((runner_up.program.clone(), primary.pattern));
            }
        }
        seeds.extend(self.bank_seeds(&task.train));

        let mut engine = EvolutionEngine::new(
            self.config.evolution.clone(),
            self.refiner(),
            task.train.clone(),
            seeds,
            self.task_seed(task_id).wrapping_add(1),
        );
        let summary = engine.run(deadline, &mut NullProgressCallback);

        // A deadline can expire before the engine evaluates anything;
        // the trained programs still apply.
        let best = engine
            .best_genome()
            .map(|g| (*g).clone())
            .or_else(|| trained.and_then(|r| r.best.clone()));
        let runner_up = engine
            .runner_up()
            .cloned()
            .or_else(|| trained.and_then(|r| r.runner_up.clone()));

        if let Some(genome) = engine.best_genome() {
            if summary.best_fitness >= self.config.memory.bank_store_min_rate {
                self.bank
                    .store(primary.pattern, genome.program.clone(), summary.best_fitness);
            }
        }

        let executor = self.executor();
        task.test
            .iter()
            .map(|test| {
                let first = best
                    .as_ref()
                    .and_then(|g| executor.run(&g.program, &test.input));
                let second = runner_up
                    .as_ref()
                    .and_then(|g| executor.run(&g.program, &test.input));
                match (first, second) {
                    (Some(a), Some(b)) => AttemptPair {
                        attempt_1: a,
                        attempt_2: b,
                    },
                    (Some(a), None) => AttemptPair::duplicated(a),
                    (None, Some(b)) => AttemptPair::duplicated(b),
                    (None, None) => AttemptPair::duplicated(test.input.clone()),
                }
            })
            .collect()
    }

    /// Programs stored for the task's primary pattern, when the
    /// classifier is confident enough to trust it.
    fn bank_seeds(&self, pairs: &[TrainPair]) -> Vec<(Program, TaskPattern)> {
        if pairs.is_empty() {
            return Vec::new();
        }
        let primary = TaskClassifier::primary(pairs);
        if primary.confidence < self.config.memory.seed_threshold {
            return Vec::new();
        }
        self.bank
            .retrieve(primary.pattern, self.config.memory.seed_count)
            .into_iter()
            .map(|program| (program, primary.pattern))
            .collect()
    }

    fn feed_bank(&self, pairs: &[TrainPair], result: &TaskResult) {
        if result.fitness < self.config.memory.bank_store_min_rate {
            return;
        }
        if let Some(best) = &result.best {
            let primary = TaskClassifier::primary(pairs);
            self.bank
                .store(primary.pattern, best.program.clone(), result.fitness);
        }
    }

    fn write_checkpoint(
        &self,
        path: &Path,
        results: &BTreeMap<String, TaskResult>,
        in_flight: Option<InFlightTask>,
    ) -> Result<()> {
        Checkpoint::new(self.bank.snapshot(), results.clone(), in_flight).write(path)
    }

    fn executor(&self) -> Executor {
        Executor::new(
            self.registry.clone(),
            Some(self.cache.clone()),
            self.config.search.max_steps,
        )
    }

    fn refiner(&self) -> BeamRefiner {
        BeamRefiner::new(
            self.executor(),
            self.config.search.beam_width,
            self.config.search.beam_depth,
        )
    }

    fn budget(&self) -> Duration {
        Duration::from_secs_f64(self.config.runtime.time_budget_hours * 3600.0)
    }

    /// Deadline at the end of the budget, pulled in by the safety buffer
    /// reserved for writing output.
    fn buffered_deadline(&self, started: Instant) -> Deadline {
        let safety = Duration::from_secs(self.config.runtime.safety_buffer_secs);
        Deadline::at(started + self.budget()).less(safety)
    }

    /// Equal share of the time left for one of `remaining` tasks.
    fn slice(&self, deadline: Deadline, remaining: u32) -> Deadline {
        match deadline.remaining() {
            Some(left) => Deadline::at(Instant::now() + left / remaining.max(1)),
            None => Deadline::unbounded(),
        }
    }

    /// Stable per-task random seed, so task order never changes a task's
    /// search and runs are reproducible task by task.
    fn task_seed(&self, task_id: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        task_id.hash(&mut hasher);
        self.seed ^ hasher.finish()
    }

    fn checkpoint_path(&self, flag: Option<&Path>, output_dir: &Path) -> PathBuf {
        flag.map(Path::to_path_buf)
            .unwrap_or_else(|| output_dir.join("checkpoint.json"))
    }
}

fn identity_attempts(task: &Task) -> Vec<AttemptPair> {
    task.test
        .iter()
        .map(|test| AttemptPair::duplicated(test.input.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::types::Grid;

    fn flip_task() -> Task {
        let input = Grid::from_rows(vec![vec![1, 0], vec![0, 1]]).unwrap();
        let output = Grid::from_rows(vec![vec![0, 1], vec![1, 0]]).unwrap();
        Task {
            train: vec![TrainPair {
                input: input.clone(),
                output,
            }],
            test: vec![crate::data::TestPair {
                input,
                output: None,
            }],
        }
    }

    fn small_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.evolution.population_size = 20;
        config.evolution.max_generations = 10;
        config.evolution.max_program_len = 4;
        config.search.beam_width = 4;
        config.search.beam_depth = 2;
        config
    }

    #[test]
    fn test_solve_one_emits_two_attempts_per_test_input() {
        let orchestrator = Orchestrator::new(small_config(), 42);
        let task = flip_task();
        let attempts = orchestrator.solve_one("t1", &task, None, Deadline::unbounded());
        assert_eq!(attempts.len(), 1);
        let expected = Grid::from_rows(vec![vec![0, 1], vec![1, 0]]).unwrap();
        assert!(attempts[0].matches(&expected));
    }

    #[test]
    fn test_expired_deadline_falls_back_to_identity() {
        let orchestrator = Orchestrator::new(small_config(), 42);
        let task = flip_task();
        let attempts = orchestrator.solve_one(
            "t1",
            &task,
            None,
            Deadline::after(Duration::ZERO),
        );
        assert_eq!(attempts[0].attempt_1, task.test[0].input);
        assert_eq!(attempts[0].attempt_2, task.test[0].input);
    }

    #[test]
    fn test_trained_best_survives_expired_solve_deadline() {
        let orchestrator = Orchestrator::new(small_config(), 42);
        let task = flip_task();
        let trained = TaskResult {
            best: Some(crate::engines::generation::Genome::new(
                vec![crate::types::ProgramStep::new("flip_h", vec![])],
                0,
                1,
            )),
            runner_up: None,
            fitness: 1.0,
            solved: true,
            generations: 1,
        };
        let attempts = orchestrator.solve_one(
            "t1",
            &task,
            Some(&trained),
            Deadline::after(Duration::ZERO),
        );
        let expected = Grid::from_rows(vec![vec![0, 1], vec![1, 0]]).unwrap();
        assert!(attempts[0].matches(&expected));
    }

    #[test]
    fn test_buffered_deadline_reserves_the_safety_buffer() {
        let mut config = small_config();
        config.runtime.time_budget_hours = 1.0;
        config.runtime.safety_buffer_secs = 60;
        let orchestrator = Orchestrator::new(config, 7);
        let left = orchestrator
            .buffered_deadline(Instant::now())
            .remaining()
            .unwrap();
        assert!(left <= Duration::from_secs(3540));
        assert!(left > Duration::from_secs(3500));

        // A buffer longer than the whole budget leaves no solve time.
        let mut config = small_config();
        config.runtime.time_budget_hours = 1.0 / 3600.0;
        config.runtime.safety_buffer_secs = 300;
        let orchestrator = Orchestrator::new(config, 7);
        assert!(orchestrator.buffered_deadline(Instant::now()).expired());
    }

    #[test]
    fn test_task_seed_is_stable_and_distinct() {
        let orchestrator = Orchestrator::new(small_config(), 42);
        assert_eq!(orchestrator.task_seed("a"), orchestrator.task_seed("a"));
        assert_ne!(orchestrator.task_seed("a"), orchestrator.task_seed("b"));
    }
}
