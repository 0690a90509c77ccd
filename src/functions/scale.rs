use crate::functions::traits::{
    check_arity, check_output_side, GridPrimitive, ParamKind, ParamSpec,
};
use crate::types::{Grid, TaskPattern};
use anyhow::{bail, Result};

/// Expands every cell into a `factor` × `factor` block.
pub struct ScaleUp;

impl GridPrimitive for ScaleUp {
    fn name(&self) -> &'static str {
        "scale_up"
    }
    fn ui_name(&self) -> &'static str {
        "Scale Up"
    }
    fn params(&self) -> &'static [ParamSpec] {
        &[ParamSpec {
            name: "factor",
            kind: ParamKind::Count,
        }]
    }
    fn bias(&self) -> &'static [TaskPattern] {
        &[TaskPattern::Scaling]
    }

    fn apply(&self, grid: &Grid, params: &[i32]) -> Result<Grid> {
        check_arity(self.name(), params, 1)?;
        if params[0] < 1 {
            bail!("{}: factor {} must be positive", self.name(), params[0]);
        }
        let factor = params[0] as usize;
        let (rows, cols) = (grid.rows() * factor, grid.cols() * factor);
        check_output_side(self.name(), rows, cols)?;
        Ok(Grid::from_fn(rows, cols, |r, c| {
            grid.get(r / factor, c / factor)
        }))
    }
}

/// Collapses each `factor` × `factor` block to its top-left cell. Both
/// dimensions must divide evenly.
pub struct ScaleDown;

impl GridPrimitive for ScaleDown {
    fn name(&self) -> &'static str {
        "scale_down"
    }
    fn ui_name(&self) -> &'static str {
        "Scale Down"
    }
    fn params(&self) -> &'static [ParamSpec] {
        &[ParamSpec {
            name: "factor",
            kind: ParamKind::Count,
        }]
    }
    fn bias(&self) -> &'static [TaskPattern] {
        &[TaskPattern::Scaling]
    }

    fn apply(&self, grid: &Grid, params: &[i32]) -> Result<Grid> {
        check_arity(self.name(), params, 1)?;
        if params[0] < 1 {
            bail!("{}: factor {} must be positive", self.name(), params[0]);
        }
        let factor = params[0] as usize;
        if grid.rows() % factor != 0 || grid.cols() % factor != 0 {
            bail!(
                "{}: {}x{} not divisible by {}",
                self.name(),
                grid.rows(),
                grid.cols(),
                factor
            );
        }
        Ok(Grid::from_fn(grid.rows() / factor, grid.cols() / factor, |r, c| {
            grid.get(r * factor, c * factor)
        }))
    }
}

/// Repeats the grid `across` times horizontally and `down` times
/// vertically.
pub struct Tile;

impl GridPrimitive for Tile {
    fn name(&self) -> &'static str {
        "tile"
    }
    fn ui_name(&self) -> &'static str {
        "Tile"
    }
    fn params(&self) -> &'static [ParamSpec] {
        &[
            ParamSpec {
                name: "across",
                kind: ParamKind::Count,
            },
            ParamSpec {
                name: "down",
                kind: ParamKind::Count,
            },
        ]
    }
    fn bias(&self) -> &'static [TaskPattern] {
        &[TaskPattern::Tiling]
    }

    fn apply(&self, grid: &Grid, params: &[i32]) -> Result<Grid> {
        check_arity(self.name(), params, 2)?;
        if params[0] < 1 || params[1] < 1 {
            bail!("{}: repeat counts must be positive", self.name());
        }
        let (across, down) = (params[0] as usize, params[1] as usize);
        let (rows, cols) = (grid.rows() * down, grid.cols() * across);
        check_output_side(self.name(), rows, cols)?;
        Ok(Grid::from_fn(rows, cols, |r, c| {
            grid.get(r % grid.rows(), c % grid.cols())
        }))
    }
}

/// Concatenates the grid with its left-right mirror image.
pub struct MirrorHorizontal;

impl GridPrimitive for MirrorHorizontal {
    fn name(&self) -> &'static str {
        "mirror_h"
    }
    fn ui_name(&self) -> &'static str {
        "Mirror Horizontal"
    }
    fn bias(&self) -> &'static [TaskPattern] {
        &[TaskPattern::Tiling, TaskPattern::Symmetry]
    }

    fn apply(&self, grid: &Grid, params: &[i32]) -> Result<Grid> {
        check_arity(self.name(), params, 0)?;
        let cols = grid.cols();
        check_output_side(self.name(), grid.rows(), cols * 2)?;
        Ok(Grid::from_fn(grid.rows(), cols * 2, |r, c| {
            if c < cols {
                grid.get(r, c)
            } else {
                grid.get(r, 2 * cols - 1 - c)
            }
        }))
    }
}

/// Stacks the grid above its top-bottom mirror image.
pub struct MirrorVertical;

impl GridPrimitive for MirrorVertical {
    fn name(&self) -> &'static str {
        "mirror_v"
    }
    fn ui_name(&self) -> &'static str {
        "Mirror Vertical"
    }
    fn bias(&self) -> &'static [TaskPattern] {
        &[TaskPattern::Tiling, TaskPattern::Symmetry]
    }

    fn apply(&self, grid: &Grid, params: &[i32]) -> Result<Grid> {
        check_arity(self.name(), params, 0)?;
        let rows = grid.rows();
        check_output_side(self.name(), rows * 2, grid.cols())?;
        Ok(Grid::from_fn(rows * 2, grid.cols(), |r, c| {
            if r < rows {
                grid.get(r, c)
            } else {
                grid.get(2 * rows - 1 - r, c)
            }
        }))
    }
}
