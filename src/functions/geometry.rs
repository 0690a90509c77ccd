use crate::functions::traits::{check_arity, GridPrimitive};
use crate::types::{Grid, TaskPattern};
use anyhow::Result;

pub struct Rotate90;

impl GridPrimitive for Rotate90 {
    fn name(&self) -> &'static str {
        "rotate90"
    }
    fn ui_name(&self) -> &'static str {
        "Rotate 90° Clockwise"
    }
    fn bias(&self) -> &'static [TaskPattern] {
        &[TaskPattern::Rotation]
    }

    fn apply(&self, grid: &Grid, params: &[i32]) -> Result<Grid> {
        check_arity(self.name(), params, 0)?;
        let (rows, cols) = (grid.rows(), grid.cols());
        Ok(Grid::from_fn(cols, rows, |r, c| grid.get(rows - 1 - c, r)))
    }
}

pub struct Rotate180;

impl GridPrimitive for Rotate180 {
    fn name(&self) -> &'static str {
        "rotate180"
    }
    fn ui_name(&self) -> &'static str {
        "Rotate 180°"
    }
    fn bias(&self) -> &'static [TaskPattern] {
        &[TaskPattern::Rotation]
    }

    fn apply(&self, grid: &Grid, params: &[i32]) -> Result<Grid> {
        check_arity(self.name(), params, 0)?;
        let (rows, cols) = (grid.rows(), grid.cols());
        Ok(Grid::from_fn(rows, cols, |r, c| {
            grid.get(rows - 1 - r, cols - 1 - c)
        }))
    }
}

pub struct Rotate270;

impl GridPrimitive for Rotate270 {
    fn name(&self) -> &'static str {
        "rotate270"
    }
    fn ui_name(&self) -> &'static str {
        "Rotate 90° Counter-Clockwise"
    }
    fn bias(&self) -> &'static [TaskPattern] {
        &[TaskPattern::Rotation]
    }

    fn apply(&self, grid: &Grid, params: &[i32]) -> Result<Grid> {
        check_arity(self.name(), params, 0)?;
        let (rows, cols) = (grid.rows(), grid.cols());
        Ok(Grid::from_fn(cols, rows, |r, c| grid.get(c, cols - 1 - r)))
    }
}

pub struct FlipHorizontal;

impl GridPrimitive for FlipHorizontal {
    fn name(&self) -> &'static str {
        "flip_h"
    }
    fn ui_name(&self) -> &'static str {
        "Flip Horizontal"
    }
    fn bias(&self) -> &'static [TaskPattern] {
        &[TaskPattern::Symmetry]
    }

    fn apply(&self, grid: &Grid, params: &[i32]) -> Result<Grid> {
        check_arity(self.name(), params, 0)?;
        let (rows, cols) = (grid.rows(), grid.cols());
        Ok(Grid::from_fn(rows, cols, |r, c| grid.get(r, cols - 1 - c)))
    }
}

pub struct FlipVertical;

impl GridPrimitive for FlipVertical {
    fn name(&self) -> &'static str {
        "flip_v"
    }
    fn ui_name(&self) -> &'static str {
        "Flip Vertical"
    }
    fn bias(&self) -> &'static [TaskPattern] {
        &[TaskPattern::Symmetry]
    }

    fn apply(&self, grid: &Grid, params: &[i32]) -> Result<Grid> {
        check_arity(self.name(), params, 0)?;
        let (rows, cols) = (grid.rows(), grid.cols());
        Ok(Grid::from_fn(rows, cols, |r, c| grid.get(rows - 1 - r, c)))
    }
}

pub struct Transpose;

impl GridPrimitive for Transpose {
    fn name(&self) -> &'static str {
        "transpose"
    }
    fn ui_name(&self) -> &'static str {
        "Transpose"
    }
    fn bias(&self) -> &'static [TaskPattern] {
        &[TaskPattern::Symmetry, TaskPattern::Rotation]
    }

    fn apply(&self, grid: &Grid, params: &[i32]) -> Result<Grid> {
        check_arity(self.name(), params, 0)?;
        let (rows, cols) = (grid.rows(), grid.cols());
        Ok(Grid::from_fn(cols, rows, |r, c| grid.get(c, r)))
    }
}
