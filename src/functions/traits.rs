use crate::types::{Grid, TaskPattern, MAX_COLOR};
use anyhow::{bail, Result};

/// Kinds of integer parameters a primitive can take. The search layer uses
/// the kind to decide which concrete values are worth enumerating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// A color index in `0..=9`.
    Color,
    /// A small positive repetition or scale factor.
    Count,
    /// A cardinal direction, encoded as `0..=3` (up, down, left, right).
    Direction,
}

/// One positional parameter slot. `params` implementations return
/// promoted slice literals of these, which requires every field to
/// stay `Copy`.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
}

/// Cardinal directions for sliding transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const COUNT: i32 = 4;

    pub fn from_param(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Direction::Up),
            1 => Ok(Direction::Down),
            2 => Ok(Direction::Left),
            3 => Ok(Direction::Right),
            _ => bail!("direction {} out of range 0..=3", value),
        }
    }
}

/// Base trait for all grid transformations.
///
/// Implementations are stateless unit structs; all variation comes in
/// through the integer parameter list, which must match [`params`] in
/// length and kind. `apply` never mutates its input.
///
/// [`params`]: GridPrimitive::params
pub trait GridPrimitive: Send + Sync {
    /// Stable identifier used inside programs.
    fn name(&self) -> &'static str;

    /// Display name.
    fn ui_name(&self) -> &'static str;

    /// Parameter slots, in positional order.
    fn params(&self) -> &'static [ParamSpec] {
        &[]
    }

    /// Task patterns this primitive tends to solve.
    fn bias(&self) -> &'static [TaskPattern] {
        &[]
    }

    /// Whether the search may insert this primitive on its own. Defaults
    /// to true; fallback-only transforms opt out.
    fn searchable(&self) -> bool {
        true
    }

    /// Apply to a grid, producing a new grid.
    fn apply(&self, grid: &Grid, params: &[i32]) -> Result<Grid>;
}

/// Validate parameter count against the declared slots.
pub(crate) fn check_arity(name: &str, params: &[i32], arity: usize) -> Result<()> {
    if params.len() != arity {
        bail!("{}: expected {} parameters, got {}", name, arity, params.len());
    }
    Ok(())
}

/// Validate and narrow a color parameter.
pub(crate) fn color_param(name: &str, value: i32) -> Result<u8> {
    if !(0..=MAX_COLOR as i32).contains(&value) {
        bail!("{}: color {} out of range 0..={}", name, value, MAX_COLOR);
    }
    Ok(value as u8)
}

/// Reject results that would outgrow the task grid bounds.
pub(crate) fn check_output_side(name: &str, rows: usize, cols: usize) -> Result<()> {
    if rows > crate::types::MAX_SIDE || cols > crate::types::MAX_SIDE {
        bail!(
            "{}: result {}x{} exceeds maximum side {}",
            name,
            rows,
            cols,
            crate::types::MAX_SIDE
        );
    }
    Ok(())
}
