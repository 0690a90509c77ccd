use crate::engines::generation::genome::Genome;
use crate::types::TaskPattern;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Closed vocabulary of observations attached to ledger commits. One tag
/// per task pattern plus program-shape tags; free-form strings are not
/// representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TraitTag {
    Rotation,
    Symmetry,
    ColorRemap,
    Scaling,
    Tiling,
    BorderOnly,
    ObjectCount,
    Gravity,
    ShortProgram,
    ParamHeavy,
}

impl TraitTag {
    pub fn from_pattern(pattern: TaskPattern) -> Self {
        match pattern {
            TaskPattern::Rotation => TraitTag::Rotation,
            TaskPattern::Symmetry => TraitTag::Symmetry,
            TaskPattern::ColorRemap => TraitTag::ColorRemap,
            TaskPattern::Scaling => TraitTag::Scaling,
            TaskPattern::Tiling => TraitTag::Tiling,
            TaskPattern::BorderOnly => TraitTag::BorderOnly,
            TaskPattern::ObjectCount => TraitTag::ObjectCount,
            TaskPattern::Gravity => TraitTag::Gravity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitReading {
    pub tag: TraitTag,
    pub confidence: f64,
}

/// One accepted entry in the ledger. `fitness_delta` is always positive
/// and recorded bests never decrease across commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeCommit {
    pub id: u64,
    pub timestamp: String,
    pub fitness: f64,
    pub fitness_delta: f64,
    pub genome: Genome,
    pub traits: Vec<TraitReading>,
    pub note: String,
}

/// Serializable ledger state, embedded in checkpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub commits: Vec<KnowledgeCommit>,
    pub best: f64,
    pub next_id: u64,
}

/// Append-only log of strict fitness improvements.
///
/// `commit` is the only mutation and is serialized under a single mutex;
/// the recorded best is re-read inside the critical section, so two
/// racing offers of the same fitness can never both land. Rejected offers
/// leave no trace.
#[derive(Debug, Default)]
pub struct KnowledgeLedger {
    inner: Mutex<LedgerSnapshot>,
}

impl KnowledgeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self {
            inner: Mutex::new(snapshot),
        }
    }

    /// Offer an improvement. Accepted iff `fitness` strictly exceeds the
    /// recorded best; returns whether the commit was appended.
    pub fn commit(
        &self,
        genome: &Genome,
        fitness: f64,
        traits: Vec<TraitReading>,
        note: impl Into<String>,
    ) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if fitness <= inner.best {
            return false;
        }
        let delta = fitness - inner.best;
        let id = inner.next_id;
        inner.next_id += 1;
        inner.best = fitness;
        let note = note.into();
        log::debug!(
            "Ledger commit {}: fitness {:.4} (+{:.4}) {}",
            id,
            fitness,
            delta,
            note
        );
        inner.commits.push(KnowledgeCommit {
            id,
            timestamp: chrono::Utc::now().to_rfc3339(),
            fitness,
            fitness_delta: delta,
            genome: genome.clone(),
            traits,
            note,
        });
        true
    }

    pub fn best_fitness(&self) -> f64 {
        self.inner.lock().unwrap().best
    }

    pub fn commits(&self) -> Vec<KnowledgeCommit> {
        self.inner.lock().unwrap().commits.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.inner.lock().unwrap().clone()
    }

    /// Tags whose confidence is trending upward: the average over the
    /// recent half of the tag's readings exceeds the early-half average
    /// by more than `threshold`, over at least three commits carrying the
    /// tag. Returned ordered by trend size, then tag order.
    pub fn emergent_traits(&self, threshold: f64) -> Vec<(TraitTag, f64)> {
        let inner = self.inner.lock().unwrap();
        let mut series: Vec<(TraitTag, Vec<f64>)> = Vec::new();
        for commit in &inner.commits {
            for reading in &commit.traits {
                match series.iter_mut().find(|(tag, _)| *tag == reading.tag) {
                    Some((_, values)) => values.push(reading.confidence),
                    None => series.push((reading.tag, vec![reading.confidence])),
                }
            }
        }
        let mut trends: Vec<(TraitTag, f64)> = series
            .into_iter()
            .filter(|(_, values)| values.len() >= 3)
            .filter_map(|(tag, values)| {
                let mid = values.len() / 2;
                let early = values[..mid].iter().sum::<f64>() / mid as f64;
                let recent =
                    values[mid..].iter().sum::<f64>() / (values.len() - mid) as f64;
                let delta = recent - early;
                (delta > threshold).then_some((tag, delta))
            })
            .collect();
        trends.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        trends
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProgramStep;

    fn genome() -> Genome {
        Genome::new(vec![ProgramStep::new("flip_h", vec![])], 0, 1)
    }

    fn reading(tag: TraitTag, confidence: f64) -> Vec<TraitReading> {
        vec![TraitReading { tag, confidence }]
    }

    #[test]
    fn test_only_strict_improvements_are_committed() {
        let ledger = KnowledgeLedger::new();
        let offers = [0.4, 0.3, 0.5, 0.45, 0.6];
        let accepted: Vec<bool> = offers
            .iter()
            .map(|&f| ledger.commit(&genome(), f, vec![], "offer"))
            .collect();
        assert_eq!(accepted, vec![true, false, true, false, true]);
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.best_fitness(), 0.6);
    }

    #[test]
    fn test_equal_fitness_is_rejected() {
        let ledger = KnowledgeLedger::new();
        assert!(ledger.commit(&genome(), 0.5, vec![], ""));
        assert!(!ledger.commit(&genome(), 0.5, vec![], ""));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_deltas_are_positive_and_ids_sequential() {
        let ledger = KnowledgeLedger::new();
        for fitness in [0.2, 0.5, 0.9] {
            ledger.commit(&genome(), fitness, vec![], "");
        }
        let commits = ledger.commits();
        assert_eq!(
            commits.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert!(commits.iter().all(|c| c.fitness_delta > 0.0));
        assert!((commits[1].fitness_delta - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_emergent_traits_need_a_rising_trend() {
        let ledger = KnowledgeLedger::new();
        let steps = [
            (0.1, 0.2, 0.9),
            (0.2, 0.9, 0.8),
            (0.3, 0.9, 0.7),
            (0.4, 0.9, 0.6),
        ];
        for (fitness, rotation, short) in steps {
            ledger.commit(
                &genome(),
                fitness,
                vec![
                    TraitReading {
                        tag: TraitTag::Rotation,
                        confidence: rotation,
                    },
                    TraitReading {
                        tag: TraitTag::ShortProgram,
                        confidence: short,
                    },
                ],
                "",
            );
        }
        let trends = ledger.emergent_traits(0.1);
        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0].0, TraitTag::Rotation);
        // ShortProgram declined, so it must not appear even at threshold 0.
        assert!(ledger
            .emergent_traits(0.0)
            .iter()
            .all(|(tag, _)| *tag != TraitTag::ShortProgram));
    }

    #[test]
    fn test_emergent_traits_require_three_readings() {
        let ledger = KnowledgeLedger::new();
        ledger.commit(&genome(), 0.1, reading(TraitTag::Tiling, 0.1), "");
        ledger.commit(&genome(), 0.2, reading(TraitTag::Tiling, 0.9), "");
        assert!(ledger.emergent_traits(0.0).is_empty());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let ledger = KnowledgeLedger::new();
        ledger.commit(&genome(), 0.4, vec![], "first");
        let restored = KnowledgeLedger::from_snapshot(ledger.snapshot());
        assert_eq!(restored.best_fitness(), 0.4);
        assert_eq!(restored.len(), 1);
        // The restored ledger keeps rejecting non-improvements.
        assert!(!restored.commit(&genome(), 0.4, vec![], ""));
        assert!(restored.commit(&genome(), 0.5, vec![], ""));
        assert_eq!(restored.commits()[1].id, 1);
    }
}
