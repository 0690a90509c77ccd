use crate::types::{program_signature, Program, TaskPattern};
use serde::{Deserialize, Serialize};

/// A candidate solution together with its evolutionary bookkeeping.
///
/// The genotype is the program itself: a flat sequence of primitive
/// steps. Keeping it linear makes the genetic operators trivial, since
/// crossover splices step ranges and mutation edits single steps. Any
/// sequence of valid steps is an executable candidate, so operators can
/// never produce a structurally invalid genome.
///
/// The remaining fields are metadata carried along for selection and
/// reporting. A genome is treated as immutable once evaluated; operators
/// and the engine always build new values instead of editing in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    pub program: Program,
    /// Generation this exact program first appeared in.
    pub generation_born: usize,
    /// Best fitness this genome has scored so far.
    pub best_fitness: f64,
    /// Per-genome multiplier on the engine's mutation rate, inherited
    /// with jitter and clamped to `0.5..=2.0`.
    pub mutation_bias: f64,
    /// Identifier shared with ancestors, for lineage tracking.
    pub lineage: u64,
    /// Pattern this genome was seeded for, if it came from the bank.
    pub specialist: Option<TaskPattern>,
}

impl Genome {
    pub fn new(program: Program, generation_born: usize, lineage: u64) -> Self {
        Self {
            program,
            generation_born,
            best_fitness: 0.0,
            mutation_bias: 1.0,
            lineage,
            specialist: None,
        }
    }

    pub fn with_specialist(mut self, pattern: TaskPattern) -> Self {
        self.specialist = Some(pattern);
        self
    }

    /// Structural signature of the program, for deduplication and
    /// diversity distance.
    pub fn signature(&self) -> u64 {
        program_signature(&self.program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProgramStep;

    #[test]
    fn test_signature_tracks_program_structure() {
        let a = Genome::new(vec![ProgramStep::new("flip_h", vec![])], 0, 1);
        let mut b = Genome::new(vec![ProgramStep::new("flip_h", vec![])], 5, 99);
        b.best_fitness = 0.7;
        // Metadata does not influence the signature.
        assert_eq!(a.signature(), b.signature());
        let c = Genome::new(vec![ProgramStep::new("flip_v", vec![])], 0, 1);
        assert_ne!(a.signature(), c.signature());
    }
}
