use super::detectors;
use crate::data::TrainPair;
use crate::types::TaskPattern;
use serde::{Deserialize, Serialize};

/// Confidence threshold above which a pattern label is trusted enough to
/// narrow the primitive pool.
pub const CONFIDENT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternScore {
    pub pattern: TaskPattern,
    pub confidence: f64,
}

impl PatternScore {
    pub fn is_confident(&self) -> bool {
        self.confidence >= CONFIDENT
    }
}

pub struct TaskClassifier;

impl TaskClassifier {
    /// Score every pattern against the worked examples and rank them,
    /// highest confidence first. Ties keep the fixed pattern declaration
    /// order, so the ranking is fully deterministic.
    pub fn classify(pairs: &[TrainPair]) -> Vec<PatternScore> {
        let mut ranked: Vec<PatternScore> = TaskPattern::ALL
            .iter()
            .map(|&pattern| PatternScore {
                pattern,
                confidence: Self::score(pattern, pairs),
            })
            .collect();
        ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        ranked
    }

    /// The top-ranked pattern.
    pub fn primary(pairs: &[TrainPair]) -> PatternScore {
        Self::classify(pairs)[0]
    }

    fn score(pattern: TaskPattern, pairs: &[TrainPair]) -> f64 {
        match pattern {
            TaskPattern::Rotation => detectors::detect_rotation(pairs),
            TaskPattern::Symmetry => detectors::detect_symmetry(pairs),
            TaskPattern::ColorRemap => detectors::detect_color_remap(pairs),
            TaskPattern::Scaling => detectors::detect_scaling(pairs),
            TaskPattern::Tiling => detectors::detect_tiling(pairs),
            TaskPattern::BorderOnly => detectors::detect_border_only(pairs),
            TaskPattern::ObjectCount => detectors::detect_object_count(pairs),
            TaskPattern::Gravity => detectors::detect_gravity(pairs),
        }
    }
}
