use crate::config::EvolutionConfig;
use crate::data::{task_palette, TrainPair};
use crate::engines::classify::{PatternScore, TaskClassifier};
use crate::engines::evaluation::BeamRefiner;
use crate::engines::generation::{
    genome::Genome,
    ledger::{KnowledgeLedger, LedgerSnapshot, TraitReading, TraitTag},
    operators::{
        crossover, mutate, random_program, signature_distance, specialist_program,
        tournament_selection,
    },
};
use crate::functions::GridPrimitive;
use crate::types::{Program, TaskPattern};
use crate::utils::Deadline;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, RwLock};

/// Consecutive engine-best improvements required before selection
/// pressure is amplified.
const RATCHET_STREAK: usize = 3;

/// Share of the initial population built from pattern specialists when
/// the classifier is confident.
const SPECIALIST_SHARE: f64 = 0.25;

/// Hard ceiling on the effective per-position mutation rate after all
/// multipliers.
const MUTATION_RATE_CEILING: f64 = 0.9;

pub trait ProgressCallback: Send {
    fn on_generation_start(&mut self, generation: usize);
    fn on_generation_complete(&mut self, generation: usize, best_fitness: f64, ledger_commits: usize);
}

/// Per-generation metrics kept in the run history and checkpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generation: usize,
    pub best_fitness: f64,
    pub mean_fitness: f64,
    /// Distinct program signatures as a fraction of the population.
    pub diversity: f64,
    pub pressure: f64,
    pub ledger_commits: usize,
}

/// Serializable engine state. Training pairs and configuration are
/// supplied again on restore; the random stream is re-seeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub generation: usize,
    pub population: Vec<Genome>,
    pub best: Option<Genome>,
    pub runner_up: Option<Genome>,
    pub ledger: LedgerSnapshot,
    pub history: Vec<GenerationStats>,
    pub pressure: f64,
    pub improvement_streak: usize,
    pub generations_since_commit: usize,
    pub lineage_counter: u64,
}

/// Outcome of a finished run. `best_fitness` is measured on the full
/// training set, not the per-generation sample.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub generations: usize,
    pub best_fitness: f64,
    pub solved: bool,
}

/// Generational search over programs for a single task.
///
/// Each generation evaluates the population in parallel (every genome is
/// beam-refined against a fresh sample of training pairs, and the refined
/// program replaces the genome's own), then selects a parent pool and
/// reproduces sequentially through one seeded random stream. Strict
/// engine-best improvements are offered to the knowledge ledger; the best
/// genome itself is published as an atomically swapped snapshot.
pub struct EvolutionEngine {
    config: EvolutionConfig,
    refiner: BeamRefiner,
    pairs: Vec<TrainPair>,
    bias: Option<PatternScore>,
    palette: Vec<u8>,
    seeds: Vec<(Program, TaskPattern)>,
    ledger: KnowledgeLedger,
    population: Vec<Genome>,
    generation: usize,
    best: RwLock<Option<Arc<Genome>>>,
    runner_up: Option<Genome>,
    pressure: f64,
    improvement_streak: usize,
    generations_since_commit: usize,
    history: Vec<GenerationStats>,
    lineage_counter: u64,
    train_solved: bool,
    rng: StdRng,
}

impl EvolutionEngine {
    /// `seeds` are programs retrieved from the strategy bank, tagged with
    /// the pattern they were stored under; they join the initial
    /// population as specialists.
    pub fn new(
        config: EvolutionConfig,
        refiner: BeamRefiner,
        pairs: Vec<TrainPair>,
        seeds: Vec<(Program, TaskPattern)>,
        seed: u64,
    ) -> Self {
        let bias = if pairs.is_empty() {
            None
        } else {
            Some(TaskClassifier::primary(&pairs))
        };
        let palette = task_palette(&pairs);
        Self {
            config,
            refiner,
            pairs,
            bias,
            palette,
            seeds,
            ledger: KnowledgeLedger::new(),
            population: Vec::new(),
            generation: 0,
            best: RwLock::new(None),
            runner_up: None,
            pressure: 1.0,
            improvement_streak: 0,
            generations_since_commit: 0,
            history: Vec::new(),
            lineage_counter: 0,
            train_solved: false,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Rebuild an engine from a checkpoint snapshot. The random stream
    /// cannot be captured, so it is re-seeded from `seed` and the
    /// snapshot generation.
    pub fn from_snapshot(
        config: EvolutionConfig,
        refiner: BeamRefiner,
        pairs: Vec<TrainPair>,
        snapshot: EngineSnapshot,
        seed: u64,
    ) -> Self {
        let mut engine = Self::new(config, refiner, pairs, Vec::new(), seed);
        engine.rng = StdRng::seed_from_u64(seed ^ snapshot.generation as u64);
        engine.generation = snapshot.generation;
        engine.population = snapshot.population;
        engine.runner_up = snapshot.runner_up;
        engine.ledger = KnowledgeLedger::from_snapshot(snapshot.ledger);
        engine.history = snapshot.history;
        engine.pressure = snapshot.pressure;
        engine.improvement_streak = snapshot.improvement_streak;
        engine.generations_since_commit = snapshot.generations_since_commit;
        engine.lineage_counter = snapshot.lineage_counter;
        if let Some(best) = snapshot.best {
            engine.train_solved = engine.full_train_fitness(&best) == 1.0;
            *engine.best.write().unwrap() = Some(Arc::new(best));
        }
        engine
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            generation: self.generation,
            population: self.population.clone(),
            best: self.best_genome().map(|g| (*g).clone()),
            runner_up: self.runner_up.clone(),
            ledger: self.ledger.snapshot(),
            history: self.history.clone(),
            pressure: self.pressure,
            improvement_streak: self.improvement_streak,
            generations_since_commit: self.generations_since_commit,
            lineage_counter: self.lineage_counter,
        }
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn ledger(&self) -> &KnowledgeLedger {
        &self.ledger
    }

    pub fn history(&self) -> &[GenerationStats] {
        &self.history
    }

    pub fn population(&self) -> &[Genome] {
        &self.population
    }

    pub fn train_solved(&self) -> bool {
        self.train_solved
    }

    /// The best genome seen so far, as an immutable snapshot.
    pub fn best_genome(&self) -> Option<Arc<Genome>> {
        self.best.read().unwrap().clone()
    }

    /// The best genome whose program differs structurally from the best
    /// one, for a second submission attempt.
    pub fn runner_up(&self) -> Option<&Genome> {
        self.runner_up.as_ref()
    }

    /// Run generations until the deadline, the generation cap, or an
    /// exact solution on the full training set.
    pub fn run<C: ProgressCallback>(&mut self, deadline: Deadline, callback: &mut C) -> RunSummary {
        while self.generation < self.config.max_generations
            && !deadline.expired()
            && !self.train_solved
        {
            self.step(deadline, callback);
        }
        self.summary()
    }

    pub fn summary(&self) -> RunSummary {
        let best_fitness = self
            .best_genome()
            .map(|g| self.full_train_fitness(&g))
            .unwrap_or(0.0);
        RunSummary {
            generations: self.generation,
            best_fitness,
            solved: self.train_solved,
        }
    }

    /// One full Evaluate, Select, Reproduce cycle.
    pub fn step<C: ProgressCallback>(
        &mut self,
        deadline: Deadline,
        callback: &mut C,
    ) -> GenerationStats {
        if self.population.is_empty() {
            self.initialize_population();
        }
        callback.on_generation_start(self.generation);

        let commits_before = self.ledger.len();
        let scored = self.evaluate(deadline);
        let improved = self.absorb_scores(&scored);

        self.update_pressure(improved);
        if self.ledger.len() > commits_before {
            self.generations_since_commit = 0;
        } else {
            self.generations_since_commit += 1;
        }

        let stats = GenerationStats {
            generation: self.generation,
            best_fitness: self.best_fitness_value().unwrap_or(0.0),
            mean_fitness: mean_fitness(&scored),
            diversity: diversity(&self.population),
            pressure: self.pressure,
            ledger_commits: self.ledger.len(),
        };
        self.history.push(stats.clone());
        callback.on_generation_complete(self.generation, stats.best_fitness, stats.ledger_commits);

        if !deadline.expired() && !self.train_solved {
            let parents = self.select_parents(&scored);
            self.population = self.reproduce(&parents);
        }
        self.generation += 1;
        stats
    }

    /// Refine and score every genome in parallel against one fresh pair
    /// sample. The refined program replaces the genome's own, so search
    /// progress made here is inherited by the next generation.
    fn evaluate(&mut self, deadline: Deadline) -> Vec<(Genome, f64)> {
        let sample = self.sample_pairs();
        let refiner = &self.refiner;
        let bias = self.bias;
        let scored: Vec<(Genome, f64)> = self
            .population
            .par_iter()
            .map(|genome| {
                let outcome = refiner.refine(&genome.program, &sample, bias, deadline);
                let fitness = refiner.executor().fitness(&outcome.program, &sample);
                let evaluated = Genome {
                    program: outcome.program,
                    generation_born: genome.generation_born,
                    best_fitness: genome.best_fitness.max(fitness),
                    mutation_bias: genome.mutation_bias,
                    lineage: genome.lineage,
                    specialist: genome.specialist,
                };
                (evaluated, fitness)
            })
            .collect();
        self.population = scored.iter().map(|(g, _)| g.clone()).collect();
        scored
    }

    /// Update best and runner-up from this generation's scores and offer
    /// every strict engine-best improvement to the ledger. Returns
    /// whether the engine best improved.
    fn absorb_scores(&mut self, scored: &[(Genome, f64)]) -> bool {
        let before = self.best_fitness_value();
        for (genome, fitness) in scored {
            let current = self.best_fitness_value();
            if current.map_or(true, |best| *fitness > best) {
                let traits = self.trait_readings(genome);
                self.ledger.commit(
                    genome,
                    *fitness,
                    traits,
                    format!("generation {}", self.generation),
                );
                let previous = self.best.write().unwrap().replace(Arc::new(genome.clone()));
                if let Some(previous) = previous {
                    if previous.signature() != genome.signature() {
                        self.offer_runner_up((*previous).clone());
                    }
                }
                if *fitness == 1.0 && self.full_train_fitness(genome) == 1.0 {
                    self.train_solved = true;
                    log::info!(
                        "Training solved at generation {} by {}",
                        self.generation,
                        crate::types::canonical_program(&genome.program)
                    );
                }
            } else if self
                .best_genome()
                .map_or(false, |best| best.signature() != genome.signature())
            {
                let candidate_beats_runner_up = self
                    .runner_up
                    .as_ref()
                    .map_or(true, |r| *fitness > r.best_fitness);
                if candidate_beats_runner_up {
                    self.offer_runner_up(genome.clone());
                }
            }
        }
        // Resampling can promote a program structurally equal to the
        // stored runner-up; a duplicate second attempt is useless.
        if let (Some(best), Some(runner)) = (self.best_genome(), self.runner_up.as_ref()) {
            if best.signature() == runner.signature() {
                self.runner_up = None;
            }
        }
        let after = self.best_fitness_value();
        match (before, after) {
            (None, Some(_)) => true,
            (Some(b), Some(a)) => a > b,
            _ => false,
        }
    }

    fn offer_runner_up(&mut self, genome: Genome) {
        let better = self
            .runner_up
            .as_ref()
            .map_or(true, |r| genome.best_fitness > r.best_fitness);
        if better {
            self.runner_up = Some(genome);
        }
    }

    /// Amplification ratchet: a long enough improvement streak raises the
    /// pressure multiplier, any flat generation decays it back toward 1.
    /// Pressure only sharpens mutation and tournaments; recorded bests
    /// are untouched.
    fn update_pressure(&mut self, improved: bool) {
        if improved {
            self.improvement_streak += 1;
            if self.improvement_streak >= RATCHET_STREAK {
                self.pressure = (self.pressure * self.config.ratchet_factor)
                    .min(self.config.pressure_cap);
            }
        } else {
            self.improvement_streak = 0;
            self.pressure = (self.pressure * self.config.pressure_decay).max(1.0);
        }
    }

    /// Parent pool: elites by fitness, then tournament winners, then
    /// greedy picks maximizing signature distance to the pool so far.
    fn select_parents(&mut self, scored: &[(Genome, f64)]) -> Vec<Genome> {
        let target = self.config.population_size;
        let elite_count = self.elite_count();
        let tournament_count = ((target as f64 * self.config.tournament_fraction).round()
            as usize)
            .min(target - elite_count);

        let mut ranked: Vec<&(Genome, f64)> = scored.iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        let mut pool: Vec<Genome> = ranked
            .iter()
            .take(elite_count)
            .map(|(genome, _)| genome.clone())
            .collect();

        let tournament_size = self.sharpened_tournament_size(scored.len());
        for _ in 0..tournament_count {
            pool.push(tournament_selection(scored, tournament_size, &mut self.rng).clone());
        }

        while pool.len() < target {
            let pick = scored
                .iter()
                .map(|(genome, _)| genome)
                .max_by_key(|genome| {
                    pool.iter()
                        .map(|p| signature_distance(genome.signature(), p.signature()))
                        .min()
                        .unwrap_or(u32::MAX)
                })
                .cloned();
            match pick {
                Some(genome) => pool.push(genome),
                None => break,
            }
        }
        pool
    }

    /// Next population: the elite head of the pool copied unchanged, the
    /// remainder bred from uniform pool draws, split between crossover
    /// and mutation children.
    fn reproduce(&mut self, pool: &[Genome]) -> Vec<Genome> {
        let target = self.config.population_size;
        let born = self.generation + 1;
        let mut next: Vec<Genome> = pool.iter().take(self.elite_count()).cloned().collect();
        let searchable = self.refiner.executor().registry().searchable();

        while next.len() < target {
            if self.rng.gen::<f64>() < self.config.crossover_rate {
                let first = &pool[self.rng.gen_range(0..pool.len())];
                let second = &pool[self.rng.gen_range(0..pool.len())];
                if first.program.is_empty() || second.program.is_empty() {
                    // No cut exists, so the non-empty parent contributes a
                    // mutated copy instead.
                    let parent = if first.program.is_empty() { second } else { first };
                    let child = self.mutation_child(parent, &searchable, born);
                    next.push(child);
                    continue;
                }
                let (child1, child2) = crossover(
                    &first.program,
                    &second.program,
                    self.config.max_program_len,
                    &mut self.rng,
                );
                next.push(self.child_genome(child1, first, born));
                if next.len() < target {
                    next.push(self.child_genome(child2, second, born));
                }
            } else {
                let parent = &pool[self.rng.gen_range(0..pool.len())];
                let child = self.mutation_child(parent, &searchable, born);
                next.push(child);
            }
        }
        next.truncate(target);
        next
    }

    fn mutation_child(
        &mut self,
        parent: &Genome,
        pool: &[Arc<dyn GridPrimitive>],
        born: usize,
    ) -> Genome {
        let mut program = parent.program.clone();
        let rate = self.effective_mutation_rate(parent.mutation_bias);
        mutate(
            &mut program,
            rate,
            pool,
            &self.palette,
            self.config.max_program_len,
            &mut self.rng,
        );
        self.child_genome(program, parent, born)
    }

    fn initialize_population(&mut self) {
        let target = self.config.population_size;
        let mut population: Vec<Genome> = Vec::with_capacity(target);

        for (program, pattern) in self.seeds.clone() {
            if population.len() == target {
                break;
            }
            let lineage = self.next_lineage();
            population.push(Genome::new(program, 0, lineage).with_specialist(pattern));
        }

        if let Some(bias) = self.bias.filter(|b| b.is_confident()) {
            let quota = ((target as f64 * SPECIALIST_SHARE) as usize)
                .min(target - population.len());
            for _ in 0..quota {
                let lineage = self.next_lineage();
                let program = specialist_program(
                    bias.pattern,
                    self.refiner.executor().registry(),
                    &self.palette,
                    self.config.min_program_len,
                    self.config.max_program_len,
                    &mut self.rng,
                );
                population.push(Genome::new(program, 0, lineage).with_specialist(bias.pattern));
            }
        }

        let pool = self.refiner.executor().registry().searchable();
        while population.len() < target {
            let lineage = self.next_lineage();
            let program = random_program(
                &pool,
                &self.palette,
                self.config.min_program_len,
                self.config.max_program_len,
                &mut self.rng,
            );
            population.push(Genome::new(program, 0, lineage));
        }
        self.population = population;
    }

    fn sample_pairs(&mut self) -> Vec<TrainPair> {
        if self.pairs.len() <= self.config.sample_pairs {
            return self.pairs.clone();
        }
        self.pairs
            .choose_multiple(&mut self.rng, self.config.sample_pairs)
            .cloned()
            .collect()
    }

    fn full_train_fitness(&self, genome: &Genome) -> f64 {
        self.refiner.executor().fitness(&genome.program, &self.pairs)
    }

    fn best_fitness_value(&self) -> Option<f64> {
        self.best.read().unwrap().as_ref().map(|g| g.best_fitness)
    }

    fn trait_readings(&self, genome: &Genome) -> Vec<TraitReading> {
        let mut traits = Vec::new();
        if let Some(bias) = self.bias {
            traits.push(TraitReading {
                tag: TraitTag::from_pattern(bias.pattern),
                confidence: bias.confidence,
            });
        }
        let len = genome.program.len().max(1) as f64;
        let max_len = self.config.max_program_len.max(1) as f64;
        traits.push(TraitReading {
            tag: TraitTag::ShortProgram,
            confidence: (1.0 - (len - 1.0) / max_len).clamp(0.0, 1.0),
        });
        let with_params = genome
            .program
            .iter()
            .filter(|step| !step.params.is_empty())
            .count() as f64;
        traits.push(TraitReading {
            tag: TraitTag::ParamHeavy,
            confidence: with_params / len,
        });
        traits
    }

    fn child_genome(&mut self, program: Program, parent: &Genome, born: usize) -> Genome {
        let jitter = self.rng.gen_range(0.9..=1.1);
        Genome {
            program,
            generation_born: born,
            best_fitness: 0.0,
            mutation_bias: (parent.mutation_bias * jitter).clamp(0.5, 2.0),
            lineage: parent.lineage,
            specialist: parent.specialist,
        }
    }

    fn elite_count(&self) -> usize {
        let target = self.config.population_size;
        (((target as f64 * self.config.elite_fraction).ceil() as usize).max(1)).min(target)
    }

    fn effective_mutation_rate(&self, genome_bias: f64) -> f64 {
        let stagnation = if self.generations_since_commit >= self.config.stagnation_generations {
            self.config.stagnation_boost
        } else {
            1.0
        };
        (self.config.mutation_rate * self.pressure * stagnation * genome_bias)
            .min(MUTATION_RATE_CEILING)
    }

    fn sharpened_tournament_size(&self, population: usize) -> usize {
        let scaled = (self.config.tournament_size as f64 * self.pressure).round() as usize;
        scaled.clamp(2, population.max(2))
    }

    fn next_lineage(&mut self) -> u64 {
        self.lineage_counter += 1;
        self.lineage_counter
    }
}

fn mean_fitness(scored: &[(Genome, f64)]) -> f64 {
    if scored.is_empty() {
        return 0.0;
    }
    scored.iter().map(|(_, f)| f).sum::<f64>() / scored.len() as f64
}

fn diversity(population: &[Genome]) -> f64 {
    if population.is_empty() {
        return 0.0;
    }
    let distinct: HashSet<u64> = population.iter().map(|g| g.signature()).collect();
    distinct.len() as f64 / population.len() as f64
}
