//! Per-pattern heuristics over the worked examples.
//!
//! Every detector returns a confidence in `[0, 1]`, the mean of per-pair
//! scores. A pair scores 1.0 when the pattern reproduces the output
//! exactly, a fractional value when only the cheap structural signal
//! matches, and 0.0 otherwise. Detectors are pure functions of the pairs,
//! so classification is deterministic.

use crate::data::TrainPair;
use crate::functions::geometry::{FlipHorizontal, FlipVertical, Rotate180, Rotate270, Rotate90, Transpose};
use crate::functions::morphology::Gravity;
use crate::functions::{Direction, GridPrimitive};
use crate::types::{Grid, MAX_COLOR};

fn mean_over_pairs<F: Fn(&TrainPair) -> f64>(pairs: &[TrainPair], score: F) -> f64 {
    if pairs.is_empty() {
        return 0.0;
    }
    pairs.iter().map(score).sum::<f64>() / pairs.len() as f64
}

fn transforms_into(primitive: &dyn GridPrimitive, input: &Grid, output: &Grid) -> bool {
    primitive.apply(input, &[]).map_or(false, |g| g == *output)
}

fn same_histogram(a: &Grid, b: &Grid) -> bool {
    a.color_counts() == b.color_counts()
}

/// Output is a quarter, half or three-quarter turn of the input.
pub fn detect_rotation(pairs: &[TrainPair]) -> f64 {
    mean_over_pairs(pairs, |pair| {
        if pair.output == pair.input {
            return 0.0;
        }
        let turns: [&dyn GridPrimitive; 3] = [&Rotate90, &Rotate180, &Rotate270];
        if turns.iter().any(|t| transforms_into(*t, &pair.input, &pair.output)) {
            1.0
        } else {
            0.0
        }
    })
}

/// Output is a mirror image or transposition of the input.
pub fn detect_symmetry(pairs: &[TrainPair]) -> f64 {
    mean_over_pairs(pairs, |pair| {
        if pair.output == pair.input {
            return 0.0;
        }
        let mirrors: [&dyn GridPrimitive; 3] = [&FlipHorizontal, &FlipVertical, &Transpose];
        if mirrors.iter().any(|m| transforms_into(*m, &pair.input, &pair.output)) {
            1.0
        } else {
            0.0
        }
    })
}

/// Cell-for-cell color substitution that is consistent within the pair.
fn color_map(input: &Grid, output: &Grid) -> Option<[Option<u8>; (MAX_COLOR as usize) + 1]> {
    if input.rows() != output.rows() || input.cols() != output.cols() {
        return None;
    }
    let mut map = [None; (MAX_COLOR as usize) + 1];
    for (a, b) in input.cells().iter().zip(output.cells()) {
        match map[*a as usize] {
            None => map[*a as usize] = Some(*b),
            Some(prev) if prev != *b => return None,
            _ => {}
        }
    }
    Some(map)
}

pub fn detect_color_remap(pairs: &[TrainPair]) -> f64 {
    mean_over_pairs(pairs, |pair| {
        match color_map(&pair.input, &pair.output) {
            Some(map) => {
                let identity = map
                    .iter()
                    .enumerate()
                    .all(|(color, mapped)| mapped.map_or(true, |m| m as usize == color));
                if identity {
                    0.0
                } else {
                    1.0
                }
            }
            None => 0.0,
        }
    })
}

fn axis_factor(input_len: usize, output_len: usize) -> Option<usize> {
    if input_len == 0 || output_len % input_len != 0 {
        None
    } else {
        Some(output_len / input_len)
    }
}

/// Output dimensions are a uniform integer multiple (or divisor) of the
/// input's; exact block-content matches score full confidence.
pub fn detect_scaling(pairs: &[TrainPair]) -> f64 {
    mean_over_pairs(pairs, |pair| {
        let (input, output) = (&pair.input, &pair.output);
        // Upscale: every cell becomes a k x k block.
        if let (Some(kr), Some(kc)) = (
            axis_factor(input.rows(), output.rows()),
            axis_factor(input.cols(), output.cols()),
        ) {
            if kr == kc && kr >= 2 {
                let exact = (0..output.rows()).all(|r| {
                    (0..output.cols()).all(|c| output.get(r, c) == input.get(r / kr, c / kr))
                });
                return if exact { 1.0 } else { 0.5 };
            }
        }
        // Downscale: the input is a k x k expansion of the output.
        if let (Some(kr), Some(kc)) = (
            axis_factor(output.rows(), input.rows()),
            axis_factor(output.cols(), input.cols()),
        ) {
            if kr == kc && kr >= 2 {
                let exact = (0..input.rows()).all(|r| {
                    (0..input.cols()).all(|c| input.get(r, c) == output.get(r / kr, c / kr))
                });
                return if exact { 1.0 } else { 0.5 };
            }
        }
        0.0
    })
}

/// Output repeats the input along one or both axes. Factors per axis may
/// differ, unlike scaling.
pub fn detect_tiling(pairs: &[TrainPair]) -> f64 {
    mean_over_pairs(pairs, |pair| {
        let (input, output) = (&pair.input, &pair.output);
        let (Some(down), Some(across)) = (
            axis_factor(input.rows(), output.rows()),
            axis_factor(input.cols(), output.cols()),
        ) else {
            return 0.0;
        };
        if down * across < 2 {
            return 0.0;
        }
        let exact = (0..output.rows()).all(|r| {
            (0..output.cols())
                .all(|c| output.get(r, c) == input.get(r % input.rows(), c % input.cols()))
        });
        if exact {
            1.0
        } else {
            0.5
        }
    })
}

/// Changes confined to the outermost ring, or a one-ring pad/strip.
pub fn detect_border_only(pairs: &[TrainPair]) -> f64 {
    mean_over_pairs(pairs, |pair| {
        let (input, output) = (&pair.input, &pair.output);
        if input.rows() == output.rows() && input.cols() == output.cols() {
            let mut changed = 0usize;
            for r in 0..input.rows() {
                for c in 0..input.cols() {
                    if input.get(r, c) != output.get(r, c) {
                        let on_border =
                            r == 0 || c == 0 || r == input.rows() - 1 || c == input.cols() - 1;
                        if !on_border {
                            return 0.0;
                        }
                        changed += 1;
                    }
                }
            }
            return if changed > 0 { 1.0 } else { 0.0 };
        }
        let padded = output.rows() == input.rows() + 2 && output.cols() == input.cols() + 2;
        let stripped =
            input.rows() >= 3 && output.rows() + 2 == input.rows() && output.cols() + 2 == input.cols();
        if padded || stripped {
            0.5
        } else {
            0.0
        }
    })
}

/// Output looks like a counting answer: a uniform block, or a drastic
/// summarization of the input.
pub fn detect_object_count(pairs: &[TrainPair]) -> f64 {
    mean_over_pairs(pairs, |pair| {
        if pair.output.palette().len() == 1 {
            1.0
        } else if pair.output.area() * 4 <= pair.input.area() {
            0.5
        } else {
            0.0
        }
    })
}

/// Cells rearranged as if slid toward one wall: same shape and color
/// histogram, ideally an exact directional slide.
pub fn detect_gravity(pairs: &[TrainPair]) -> f64 {
    mean_over_pairs(pairs, |pair| {
        let (input, output) = (&pair.input, &pair.output);
        if input.rows() != output.rows() || input.cols() != output.cols() {
            return 0.0;
        }
        if input == output || !same_histogram(input, output) {
            return 0.0;
        }
        for direction in 0..Direction::COUNT {
            if Gravity
                .apply(input, &[direction])
                .map_or(false, |g| g == *output)
            {
                return 1.0;
            }
        }
        0.3
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(input: Vec<Vec<u8>>, output: Vec<Vec<u8>>) -> TrainPair {
        TrainPair {
            input: Grid::from_rows(input).unwrap(),
            output: Grid::from_rows(output).unwrap(),
        }
    }

    #[test]
    fn test_rotation_detects_quarter_turn() {
        let pairs = vec![pair(vec![vec![1, 2], vec![3, 4]], vec![vec![3, 1], vec![4, 2]])];
        assert_eq!(detect_rotation(&pairs), 1.0);
        assert_eq!(detect_symmetry(&pairs), 0.0);
    }

    #[test]
    fn test_identity_pairs_carry_no_rotation_signal() {
        let pairs = vec![pair(vec![vec![1, 1], vec![1, 1]], vec![vec![1, 1], vec![1, 1]])];
        assert_eq!(detect_rotation(&pairs), 0.0);
    }

    #[test]
    fn test_color_remap_requires_consistency() {
        let consistent = vec![pair(vec![vec![1, 2, 1]], vec![vec![5, 2, 5]])];
        assert_eq!(detect_color_remap(&consistent), 1.0);
        // Same input color maps to two different outputs.
        let conflicting = vec![pair(vec![vec![1, 1]], vec![vec![5, 6]])];
        assert_eq!(detect_color_remap(&conflicting), 0.0);
        // Identity substitution is not a remap.
        let identity = vec![pair(vec![vec![1, 2]], vec![vec![1, 2]])];
        assert_eq!(detect_color_remap(&identity), 0.0);
    }

    #[test]
    fn test_scaling_full_confidence_needs_exact_blocks() {
        let exact = vec![pair(
            vec![vec![1, 2]],
            vec![vec![1, 1, 2, 2], vec![1, 1, 2, 2]],
        )];
        assert_eq!(detect_scaling(&exact), 1.0);
        let dims_only = vec![pair(
            vec![vec![1, 2]],
            vec![vec![9, 9, 9, 9], vec![9, 9, 9, 9]],
        )];
        assert_eq!(detect_scaling(&dims_only), 0.5);
    }

    #[test]
    fn test_tiling_allows_unequal_axis_factors() {
        let pairs = vec![pair(vec![vec![1, 2]], vec![vec![1, 2, 1, 2, 1, 2]])];
        assert_eq!(detect_tiling(&pairs), 1.0);
        // Uniform 2x scaling is not a tiling repeat.
        assert_eq!(detect_scaling(&pairs), 0.0);
    }

    #[test]
    fn test_border_only_rejects_interior_changes() {
        let border = vec![pair(
            vec![vec![0, 0, 0], vec![0, 5, 0], vec![0, 0, 0]],
            vec![vec![7, 7, 7], vec![7, 5, 7], vec![7, 7, 7]],
        )];
        assert_eq!(detect_border_only(&border), 1.0);
        let interior = vec![pair(
            vec![vec![0, 0, 0], vec![0, 5, 0], vec![0, 0, 0]],
            vec![vec![0, 0, 0], vec![0, 9, 0], vec![0, 0, 0]],
        )];
        assert_eq!(detect_border_only(&interior), 0.0);
    }

    #[test]
    fn test_object_count_favors_uniform_outputs() {
        let uniform = vec![pair(vec![vec![1, 0], vec![0, 2]], vec![vec![3, 3], vec![3, 3]])];
        assert_eq!(detect_object_count(&uniform), 1.0);
    }

    #[test]
    fn test_gravity_detects_downward_slide() {
        let pairs = vec![pair(
            vec![vec![5, 0], vec![0, 0]],
            vec![vec![0, 0], vec![5, 0]],
        )];
        assert_eq!(detect_gravity(&pairs), 1.0);
    }

    #[test]
    fn test_empty_pairs_score_zero_everywhere() {
        assert_eq!(detect_rotation(&[]), 0.0);
        assert_eq!(detect_gravity(&[]), 0.0);
        assert_eq!(detect_object_count(&[]), 0.0);
    }
}
