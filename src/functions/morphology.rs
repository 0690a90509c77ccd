use crate::functions::traits::{
    check_arity, check_output_side, color_param, Direction, GridPrimitive, ParamKind, ParamSpec,
};
use crate::types::{Grid, TaskPattern};
use anyhow::{bail, Result};

/// Returns the input unchanged. Not searchable: it exists as the fallback
/// program and as a neutral crossover filler, inserting it during search
/// would only pad programs.
pub struct Identity;

impl GridPrimitive for Identity {
    fn name(&self) -> &'static str {
        "identity"
    }
    fn ui_name(&self) -> &'static str {
        "Identity"
    }
    fn searchable(&self) -> bool {
        false
    }

    fn apply(&self, grid: &Grid, params: &[i32]) -> Result<Grid> {
        check_arity(self.name(), params, 0)?;
        Ok(grid.clone())
    }
}

/// Crops to the bounding box of all non-background cells. A uniform grid
/// crops to itself.
pub struct CropToContent;

impl GridPrimitive for CropToContent {
    fn name(&self) -> &'static str {
        "crop_to_content"
    }
    fn ui_name(&self) -> &'static str {
        "Crop To Content"
    }
    fn bias(&self) -> &'static [TaskPattern] {
        &[TaskPattern::BorderOnly, TaskPattern::ObjectCount]
    }

    fn apply(&self, grid: &Grid, params: &[i32]) -> Result<Grid> {
        check_arity(self.name(), params, 0)?;
        let background = grid.dominant_color();
        let mut bounds: Option<(usize, usize, usize, usize)> = None;
        for r in 0..grid.rows() {
            for c in 0..grid.cols() {
                if grid.get(r, c) != background {
                    bounds = Some(match bounds {
                        None => (r, r, c, c),
                        Some((r0, r1, c0, c1)) => {
                            (r0.min(r), r1.max(r), c0.min(c), c1.max(c))
                        }
                    });
                }
            }
        }
        let Some((r0, r1, c0, c1)) = bounds else {
            return Ok(grid.clone());
        };
        Ok(Grid::from_fn(r1 - r0 + 1, c1 - c0 + 1, |r, c| {
            grid.get(r0 + r, c0 + c)
        }))
    }
}

/// Adds a one-cell frame of the given color around the grid.
pub struct PadBorder;

impl GridPrimitive for PadBorder {
    fn name(&self) -> &'static str {
        "pad_border"
    }
    fn ui_name(&self) -> &'static str {
        "Pad Border"
    }
    fn params(&self) -> &'static [ParamSpec] {
        &[ParamSpec {
            name: "color",
            kind: ParamKind::Color,
        }]
    }
    fn bias(&self) -> &'static [TaskPattern] {
        &[TaskPattern::BorderOnly]
    }

    fn apply(&self, grid: &Grid, params: &[i32]) -> Result<Grid> {
        check_arity(self.name(), params, 1)?;
        let color = color_param(self.name(), params[0])?;
        let (rows, cols) = (grid.rows() + 2, grid.cols() + 2);
        check_output_side(self.name(), rows, cols)?;
        Ok(Grid::from_fn(rows, cols, |r, c| {
            if r == 0 || c == 0 || r == rows - 1 || c == cols - 1 {
                color
            } else {
                grid.get(r - 1, c - 1)
            }
        }))
    }
}

/// Removes the outermost ring of cells.
pub struct StripBorder;

impl GridPrimitive for StripBorder {
    fn name(&self) -> &'static str {
        "strip_border"
    }
    fn ui_name(&self) -> &'static str {
        "Strip Border"
    }
    fn bias(&self) -> &'static [TaskPattern] {
        &[TaskPattern::BorderOnly]
    }

    fn apply(&self, grid: &Grid, params: &[i32]) -> Result<Grid> {
        check_arity(self.name(), params, 0)?;
        if grid.rows() < 3 || grid.cols() < 3 {
            bail!(
                "{}: {}x{} leaves no interior",
                self.name(),
                grid.rows(),
                grid.cols()
            );
        }
        Ok(Grid::from_fn(grid.rows() - 2, grid.cols() - 2, |r, c| {
            grid.get(r + 1, c + 1)
        }))
    }
}

/// Hollows out shapes: non-background cells keep their color only where
/// they touch the background or the grid edge.
pub struct Outline;

impl GridPrimitive for Outline {
    fn name(&self) -> &'static str {
        "outline"
    }
    fn ui_name(&self) -> &'static str {
        "Outline"
    }
    fn bias(&self) -> &'static [TaskPattern] {
        &[TaskPattern::BorderOnly, TaskPattern::ObjectCount]
    }

    fn apply(&self, grid: &Grid, params: &[i32]) -> Result<Grid> {
        check_arity(self.name(), params, 0)?;
        let background = grid.dominant_color();
        let (rows, cols) = (grid.rows(), grid.cols());
        Ok(Grid::from_fn(rows, cols, |r, c| {
            let cell = grid.get(r, c);
            if cell == background {
                return cell;
            }
            let on_edge = r == 0 || c == 0 || r == rows - 1 || c == cols - 1;
            let touches_background = (r > 0 && grid.get(r - 1, c) == background)
                || (r + 1 < rows && grid.get(r + 1, c) == background)
                || (c > 0 && grid.get(r, c - 1) == background)
                || (c + 1 < cols && grid.get(r, c + 1) == background);
            if on_edge || touches_background {
                cell
            } else {
                background
            }
        }))
    }
}

/// Slides non-background cells toward one wall, preserving their order
/// along each row or column.
pub struct Gravity;

impl GridPrimitive for Gravity {
    fn name(&self) -> &'static str {
        "gravity"
    }
    fn ui_name(&self) -> &'static str {
        "Gravity"
    }
    fn params(&self) -> &'static [ParamSpec] {
        &[ParamSpec {
            name: "direction",
            kind: ParamKind::Direction,
        }]
    }
    fn bias(&self) -> &'static [TaskPattern] {
        &[TaskPattern::Gravity]
    }

    fn apply(&self, grid: &Grid, params: &[i32]) -> Result<Grid> {
        check_arity(self.name(), params, 1)?;
        let direction = Direction::from_param(params[0])?;
        let background = grid.dominant_color();
        let (rows, cols) = (grid.rows(), grid.cols());
        let mut out = vec![vec![background; cols]; rows];

        match direction {
            Direction::Up | Direction::Down => {
                for c in 0..cols {
                    let falling: Vec<u8> = (0..rows)
                        .map(|r| grid.get(r, c))
                        .filter(|&cell| cell != background)
                        .collect();
                    let start = if direction == Direction::Up {
                        0
                    } else {
                        rows - falling.len()
                    };
                    for (i, &cell) in falling.iter().enumerate() {
                        out[start + i][c] = cell;
                    }
                }
            }
            Direction::Left | Direction::Right => {
                for (r, row) in out.iter_mut().enumerate() {
                    let falling: Vec<u8> = (0..cols)
                        .map(|c| grid.get(r, c))
                        .filter(|&cell| cell != background)
                        .collect();
                    let start = if direction == Direction::Left {
                        0
                    } else {
                        cols - falling.len()
                    };
                    for (i, &cell) in falling.iter().enumerate() {
                        row[start + i] = cell;
                    }
                }
            }
        }

        Ok(Grid::from_rows(out)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_returns_input_and_is_not_searchable() {
        let grid = Grid::from_rows(vec![vec![1, 2], vec![3, 4]]).unwrap();
        assert_eq!(Identity.apply(&grid, &[]).unwrap(), grid);
        assert!(!Identity.searchable());
    }

    #[test]
    fn test_crop_finds_bounding_box() {
        let grid = Grid::from_rows(vec![
            vec![0, 0, 0, 0],
            vec![0, 3, 0, 0],
            vec![0, 3, 5, 0],
            vec![0, 0, 0, 0],
        ])
        .unwrap();
        let out = CropToContent.apply(&grid, &[]).unwrap();
        assert_eq!(out.to_rows(), vec![vec![3, 0], vec![3, 5]]);
    }

    #[test]
    fn test_crop_of_uniform_grid_is_identity() {
        let grid = Grid::filled(3, 3, 4);
        assert_eq!(CropToContent.apply(&grid, &[]).unwrap(), grid);
    }

    #[test]
    fn test_pad_then_strip_restores_grid() {
        let grid = Grid::from_rows(vec![vec![1, 2], vec![3, 4]]).unwrap();
        let padded = PadBorder.apply(&grid, &[0]).unwrap();
        assert_eq!(padded.rows(), 4);
        assert_eq!(padded.get(0, 0), 0);
        assert_eq!(StripBorder.apply(&padded, &[]).unwrap(), grid);
    }

    #[test]
    fn test_strip_rejects_tiny_grids() {
        let grid = Grid::from_rows(vec![vec![1, 2], vec![3, 4]]).unwrap();
        assert!(StripBorder.apply(&grid, &[]).is_err());
    }

    #[test]
    fn test_outline_hollows_filled_rectangle() {
        let grid = Grid::from_rows(vec![
            vec![0, 0, 0, 0, 0],
            vec![0, 2, 2, 2, 0],
            vec![0, 2, 2, 2, 0],
            vec![0, 2, 2, 2, 0],
            vec![0, 0, 0, 0, 0],
        ])
        .unwrap();
        let out = Outline.apply(&grid, &[]).unwrap();
        assert_eq!(out.get(2, 2), 0);
        assert_eq!(out.get(1, 1), 2);
        assert_eq!(out.get(1, 2), 2);
    }

    #[test]
    fn test_gravity_down_stacks_cells() {
        let grid = Grid::from_rows(vec![
            vec![5, 0, 0],
            vec![0, 0, 3],
            vec![0, 0, 0],
        ])
        .unwrap();
        let out = Gravity.apply(&grid, &[1]).unwrap();
        assert_eq!(
            out.to_rows(),
            vec![vec![0, 0, 0], vec![0, 0, 0], vec![5, 0, 3]]
        );
    }

    #[test]
    fn test_gravity_preserves_stacking_order() {
        let grid = Grid::from_rows(vec![
            vec![5, 0],
            vec![0, 0],
            vec![3, 0],
        ])
        .unwrap();
        let out = Gravity.apply(&grid, &[1]).unwrap();
        assert_eq!(out.to_rows(), vec![vec![0, 0], vec![5, 0], vec![3, 0]]);
    }

    #[test]
    fn test_gravity_rejects_bad_direction() {
        let grid = Grid::filled(2, 2, 1);
        assert!(Gravity.apply(&grid, &[4]).is_err());
    }
}
