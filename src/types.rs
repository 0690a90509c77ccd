use crate::error::GridmorphError;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Largest side length accepted for task grids.
pub const MAX_SIDE: usize = 30;

/// Largest color index; cells hold values in `0..=MAX_COLOR`.
pub const MAX_COLOR: u8 = 9;

/// A rectangular grid of color indices.
///
/// Grids are immutable value types: every transformation produces a new
/// grid. Equality and hashing are structural, so grids can key caches and
/// deduplication sets directly. The JSON representation is a plain 2-D
/// array of integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<u8>>", into = "Vec<Vec<u8>>")]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<u8>,
}

impl Grid {
    /// Build a grid from row vectors. Rows must be non-empty, rectangular
    /// and contain only colors `0..=MAX_COLOR`.
    pub fn from_rows(rows: Vec<Vec<u8>>) -> Result<Self, GridmorphError> {
        if rows.is_empty() || rows[0].is_empty() {
            return Err(GridmorphError::InvalidGrid("grid has no cells".to_string()));
        }
        let cols = rows[0].len();
        let mut cells = Vec::with_capacity(rows.len() * cols);
        for row in &rows {
            if row.len() != cols {
                return Err(GridmorphError::InvalidGrid(format!(
                    "ragged grid: expected {} columns, found {}",
                    cols,
                    row.len()
                )));
            }
            for &cell in row {
                if cell > MAX_COLOR {
                    return Err(GridmorphError::InvalidGrid(format!(
                        "color {} out of range 0..={}",
                        cell, MAX_COLOR
                    )));
                }
                cells.push(cell);
            }
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            cells,
        })
    }

    /// Uniform grid of a single color.
    pub fn filled(rows: usize, cols: usize, color: u8) -> Self {
        Self {
            rows,
            cols,
            cells: vec![color; rows * cols],
        }
    }

    /// Build a grid cell-by-cell from a closure over (row, col).
    pub fn from_fn<F: FnMut(usize, usize) -> u8>(rows: usize, cols: usize, mut f: F) -> Self {
        let mut cells = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                cells.push(f(r, c));
            }
        }
        Self { rows, cols, cells }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn area(&self) -> usize {
        self.rows * self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> u8 {
        debug_assert!(row < self.rows && col < self.cols);
        self.cells[row * self.cols + col]
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Occurrences of each color, indexed by color value.
    pub fn color_counts(&self) -> [usize; (MAX_COLOR as usize) + 1] {
        let mut counts = [0usize; (MAX_COLOR as usize) + 1];
        for &cell in &self.cells {
            counts[cell as usize] += 1;
        }
        counts
    }

    /// Distinct colors present, ascending.
    pub fn palette(&self) -> Vec<u8> {
        let counts = self.color_counts();
        (0..=MAX_COLOR).filter(|&c| counts[c as usize] > 0).collect()
    }

    /// Most frequent color; ties resolve to the lowest color value.
    pub fn dominant_color(&self) -> u8 {
        let counts = self.color_counts();
        let mut best = 0u8;
        for color in 1..=MAX_COLOR {
            if counts[color as usize] > counts[best as usize] {
                best = color;
            }
        }
        best
    }

    /// Exact string encoding of dimensions and cells. Two grids share a
    /// fingerprint iff they are equal, so the encoding is safe as a cache
    /// key component.
    pub fn fingerprint(&self) -> String {
        let mut out = String::with_capacity(self.area() + 8);
        out.push_str(&format!("{}x{}:", self.rows, self.cols));
        for &cell in &self.cells {
            out.push((b'0' + cell) as char);
        }
        out
    }

    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        (0..self.rows)
            .map(|r| self.cells[r * self.cols..(r + 1) * self.cols].to_vec())
            .collect()
    }
}

impl TryFrom<Vec<Vec<u8>>> for Grid {
    type Error = GridmorphError;

    fn try_from(rows: Vec<Vec<u8>>) -> Result<Self, Self::Error> {
        let grid = Grid::from_rows(rows)?;
        if grid.rows > MAX_SIDE || grid.cols > MAX_SIDE {
            return Err(GridmorphError::InvalidGrid(format!(
                "grid {}x{} exceeds maximum side {}",
                grid.rows, grid.cols, MAX_SIDE
            )));
        }
        Ok(grid)
    }
}

impl From<Grid> for Vec<Vec<u8>> {
    fn from(grid: Grid) -> Self {
        grid.to_rows()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..self.rows {
            for c in 0..self.cols {
                write!(f, "{}", self.get(r, c))?;
            }
            if r + 1 < self.rows {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Cell-mismatch distance between a produced grid and the expected grid.
///
/// Equal shapes count differing cells; a shape mismatch costs the full
/// expected area plus one, plus the area difference, so any same-shape
/// result scores strictly better than any wrong-shape result.
pub fn grid_distance(produced: &Grid, expected: &Grid) -> u64 {
    if produced.rows() == expected.rows() && produced.cols() == expected.cols() {
        produced
            .cells()
            .iter()
            .zip(expected.cells())
            .filter(|(a, b)| a != b)
            .count() as u64
    } else {
        let gap = (produced.area() as i64 - expected.area() as i64).unsigned_abs();
        expected.area() as u64 + 1 + gap
    }
}

/// One step of a transformation program: a primitive name plus its
/// integer parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgramStep {
    pub primitive: String,
    pub params: Vec<i32>,
}

impl ProgramStep {
    pub fn new(primitive: impl Into<String>, params: Vec<i32>) -> Self {
        Self {
            primitive: primitive.into(),
            params,
        }
    }
}

impl fmt::Display for ProgramStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.primitive)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", p)?;
        }
        write!(f, ")")
    }
}

/// A transformation program: primitive invocations applied left to right.
///
/// Programs are the only solution representation in the engine. They stay
/// short (a configured maximum, well under the execution step guard) and
/// are compared structurally through [`canonical_program`] /
/// [`program_signature`].
pub type Program = Vec<ProgramStep>;

/// Canonical text form of a program, e.g. `rotate90();recolor(2,5)`.
/// Distinct programs always produce distinct canonical strings.
pub fn canonical_program(program: &[ProgramStep]) -> String {
    let mut out = String::new();
    for (i, step) in program.iter().enumerate() {
        if i > 0 {
            out.push(';');
        }
        out.push_str(&step.to_string());
    }
    out
}

/// Structural signature of a program, used for deduplication and diversity
/// distance, never for fitness comparison.
pub fn program_signature(program: &[ProgramStep]) -> u64 {
    let mut hasher = DefaultHasher::new();
    program.hash(&mut hasher);
    hasher.finish()
}

/// Task pattern labels produced by the classifier. Declaration order is
/// the deterministic tie-break order for ranked scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskPattern {
    Rotation,
    Symmetry,
    ColorRemap,
    Scaling,
    Tiling,
    BorderOnly,
    ObjectCount,
    Gravity,
}

impl TaskPattern {
    pub const ALL: [TaskPattern; 8] = [
        TaskPattern::Rotation,
        TaskPattern::Symmetry,
        TaskPattern::ColorRemap,
        TaskPattern::Scaling,
        TaskPattern::Tiling,
        TaskPattern::BorderOnly,
        TaskPattern::ObjectCount,
        TaskPattern::Gravity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPattern::Rotation => "rotation",
            TaskPattern::Symmetry => "symmetry",
            TaskPattern::ColorRemap => "color_remap",
            TaskPattern::Scaling => "scaling",
            TaskPattern::Tiling => "tiling",
            TaskPattern::BorderOnly => "border_only",
            TaskPattern::ObjectCount => "object_count",
            TaskPattern::Gravity => "gravity",
        }
    }
}

impl fmt::Display for TaskPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_rejects_ragged_input() {
        let result = Grid::from_rows(vec![vec![1, 2], vec![3]]);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_rows_rejects_bad_color() {
        let result = Grid::from_rows(vec![vec![1, 12]]);
        assert!(result.is_err());
    }

    #[test]
    fn test_try_from_rejects_oversized_grid() {
        let rows = vec![vec![0u8; MAX_SIDE + 1]; 2];
        assert!(Grid::try_from(rows).is_err());
    }

    #[test]
    fn test_fingerprint_is_injective_on_distinct_grids() {
        let a = Grid::from_rows(vec![vec![1, 0], vec![0, 1]]).unwrap();
        let b = Grid::from_rows(vec![vec![1, 0, 0, 1]]).unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_distance_counts_mismatched_cells() {
        let a = Grid::from_rows(vec![vec![1, 0], vec![0, 1]]).unwrap();
        let b = Grid::from_rows(vec![vec![0, 1], vec![1, 0]]).unwrap();
        assert_eq!(grid_distance(&a, &b), 4);
        assert_eq!(grid_distance(&a, &a), 0);
    }

    #[test]
    fn test_distance_penalizes_shape_mismatch() {
        let expected = Grid::from_rows(vec![vec![1, 0], vec![0, 1]]).unwrap();
        let wrong_shape = Grid::from_rows(vec![vec![1, 0, 0, 1]]).unwrap();
        assert!(grid_distance(&wrong_shape, &expected) > expected.area() as u64);
    }

    #[test]
    fn test_canonical_program_distinguishes_params() {
        let a = vec![ProgramStep::new("recolor", vec![1, 2])];
        let b = vec![ProgramStep::new("recolor", vec![1, 3])];
        assert_ne!(canonical_program(&a), canonical_program(&b));
        assert_ne!(program_signature(&a), program_signature(&b));
    }

    #[test]
    fn test_dominant_color_breaks_ties_low() {
        let g = Grid::from_rows(vec![vec![1, 2], vec![2, 1]]).unwrap();
        assert_eq!(g.dominant_color(), 1);
    }
}
