use super::traits::ConfigSection;
use crate::error::GridmorphError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub population_size: usize,
    pub max_generations: usize,
    pub min_program_len: usize,
    pub max_program_len: usize,
    pub mutation_rate: f64,
    pub crossover_rate: f64,
    /// Fraction of the population copied unchanged each generation.
    pub elite_fraction: f64,
    /// Fraction of the parent pool filled by tournament winners; the
    /// remainder after elites and tournaments is filled by diversity
    /// picks.
    pub tournament_fraction: f64,
    pub tournament_size: usize,
    /// Training pairs sampled per generation for fitness scoring.
    pub sample_pairs: usize,
    pub ratchet_factor: f64,
    pub pressure_cap: f64,
    pub pressure_decay: f64,
    /// Generations without a ledger commit before the mutation rate is
    /// boosted.
    pub stagnation_generations: usize,
    pub stagnation_boost: f64,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 120,
            max_generations: 400,
            min_program_len: 1,
            max_program_len: 12,
            mutation_rate: 0.25,
            crossover_rate: 0.6,
            elite_fraction: 0.10,
            tournament_fraction: 0.70,
            tournament_size: 3,
            sample_pairs: 3,
            ratchet_factor: 1.1,
            pressure_cap: 3.0,
            pressure_decay: 0.9,
            stagnation_generations: 10,
            stagnation_boost: 1.5,
        }
    }
}

impl ConfigSection for EvolutionConfig {
    fn section_name() -> &'static str {
        "evolution"
    }

    fn validate(&self) -> Result<(), GridmorphError> {
        if self.population_size < 10 {
            return Err(GridmorphError::Configuration(
                "Population size must be at least 10".to_string(),
            ));
        }
        if self.max_generations == 0 {
            return Err(GridmorphError::Configuration(
                "Generation limit must be at least 1".to_string(),
            ));
        }
        if self.min_program_len == 0 || self.max_program_len < self.min_program_len {
            return Err(GridmorphError::Configuration(
                "Program length bounds must satisfy 1 <= min <= max".to_string(),
            ));
        }
        if self.max_program_len > 20 {
            return Err(GridmorphError::Configuration(
                "Programs longer than 20 steps are not supported".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(GridmorphError::Configuration(
                "Mutation rate must be between 0 and 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.crossover_rate) {
            return Err(GridmorphError::Configuration(
                "Crossover rate must be between 0 and 1".to_string(),
            ));
        }
        if self.elite_fraction < 0.0
            || self.tournament_fraction < 0.0
            || self.elite_fraction + self.tournament_fraction > 1.0
        {
            return Err(GridmorphError::Configuration(
                "Elite and tournament fractions must be non-negative and sum to at most 1"
                    .to_string(),
            ));
        }
        if self.tournament_size < 2 {
            return Err(GridmorphError::Configuration(
                "Tournament size must be at least 2".to_string(),
            ));
        }
        if self.sample_pairs == 0 {
            return Err(GridmorphError::Configuration(
                "At least one training pair must be sampled per generation".to_string(),
            ));
        }
        if self.ratchet_factor < 1.0 || self.pressure_cap < 1.0 {
            return Err(GridmorphError::Configuration(
                "Ratchet factor and pressure cap must be at least 1".to_string(),
            ));
        }
        if self.pressure_decay <= 0.0 || self.pressure_decay > 1.0 {
            return Err(GridmorphError::Configuration(
                "Pressure decay must be in (0, 1]".to_string(),
            ));
        }
        if self.stagnation_generations == 0 || self.stagnation_boost < 1.0 {
            return Err(GridmorphError::Configuration(
                "Stagnation response requires a positive window and a boost >= 1".to_string(),
            ));
        }
        Ok(())
    }
}
