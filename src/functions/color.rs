use crate::functions::traits::{check_arity, color_param, GridPrimitive, ParamKind, ParamSpec};
use crate::types::{Grid, TaskPattern};
use anyhow::Result;

pub struct Recolor;

impl GridPrimitive for Recolor {
    fn name(&self) -> &'static str {
        "recolor"
    }
    fn ui_name(&self) -> &'static str {
        "Recolor"
    }
    fn params(&self) -> &'static [ParamSpec] {
        &[
            ParamSpec {
                name: "from",
                kind: ParamKind::Color,
            },
            ParamSpec {
                name: "to",
                kind: ParamKind::Color,
            },
        ]
    }
    fn bias(&self) -> &'static [TaskPattern] {
        &[TaskPattern::ColorRemap]
    }

    fn apply(&self, grid: &Grid, params: &[i32]) -> Result<Grid> {
        check_arity(self.name(), params, 2)?;
        let from = color_param(self.name(), params[0])?;
        let to = color_param(self.name(), params[1])?;
        Ok(Grid::from_fn(grid.rows(), grid.cols(), |r, c| {
            let cell = grid.get(r, c);
            if cell == from {
                to
            } else {
                cell
            }
        }))
    }
}

pub struct SwapColors;

impl GridPrimitive for SwapColors {
    fn name(&self) -> &'static str {
        "swap_colors"
    }
    fn ui_name(&self) -> &'static str {
        "Swap Colors"
    }
    fn params(&self) -> &'static [ParamSpec] {
        &[
            ParamSpec {
                name: "a",
                kind: ParamKind::Color,
            },
            ParamSpec {
                name: "b",
                kind: ParamKind::Color,
            },
        ]
    }
    fn bias(&self) -> &'static [TaskPattern] {
        &[TaskPattern::ColorRemap]
    }

    fn apply(&self, grid: &Grid, params: &[i32]) -> Result<Grid> {
        check_arity(self.name(), params, 2)?;
        let a = color_param(self.name(), params[0])?;
        let b = color_param(self.name(), params[1])?;
        Ok(Grid::from_fn(grid.rows(), grid.cols(), |r, c| {
            let cell = grid.get(r, c);
            if cell == a {
                b
            } else if cell == b {
                a
            } else {
                cell
            }
        }))
    }
}

/// Repaints the background (the dominant color) with a chosen color.
pub struct FillBackground;

impl GridPrimitive for FillBackground {
    fn name(&self) -> &'static str {
        "fill_background"
    }
    fn ui_name(&self) -> &'static str {
        "Fill Background"
    }
    fn params(&self) -> &'static [ParamSpec] {
        &[ParamSpec {
            name: "color",
            kind: ParamKind::Color,
        }]
    }
    fn bias(&self) -> &'static [TaskPattern] {
        &[TaskPattern::ColorRemap]
    }

    fn apply(&self, grid: &Grid, params: &[i32]) -> Result<Grid> {
        check_arity(self.name(), params, 1)?;
        let color = color_param(self.name(), params[0])?;
        let background = grid.dominant_color();
        Ok(Grid::from_fn(grid.rows(), grid.cols(), |r, c| {
            let cell = grid.get(r, c);
            if cell == background {
                color
            } else {
                cell
            }
        }))
    }
}

/// Collapses the grid to a uniform block of its dominant color.
pub struct MajorityFill;

impl GridPrimitive for MajorityFill {
    fn name(&self) -> &'static str {
        "majority_fill"
    }
    fn ui_name(&self) -> &'static str {
        "Majority Fill"
    }
    fn bias(&self) -> &'static [TaskPattern] {
        &[TaskPattern::ColorRemap, TaskPattern::ObjectCount]
    }

    fn apply(&self, grid: &Grid, params: &[i32]) -> Result<Grid> {
        check_arity(self.name(), params, 0)?;
        Ok(Grid::filled(grid.rows(), grid.cols(), grid.dominant_color()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Grid {
        Grid::from_rows(vec![vec![0, 0, 2], vec![0, 2, 1]]).unwrap()
    }

    #[test]
    fn test_recolor_replaces_only_matching_cells() {
        let out = Recolor.apply(&sample(), &[2, 5]).unwrap();
        assert_eq!(out.to_rows(), vec![vec![0, 0, 5], vec![0, 5, 1]]);
    }

    #[test]
    fn test_recolor_rejects_out_of_range_color() {
        assert!(Recolor.apply(&sample(), &[2, 10]).is_err());
        assert!(Recolor.apply(&sample(), &[-1, 3]).is_err());
    }

    #[test]
    fn test_swap_is_an_involution() {
        let grid = sample();
        let swapped = SwapColors.apply(&grid, &[0, 2]).unwrap();
        assert_eq!(swapped.to_rows(), vec![vec![2, 2, 0], vec![2, 0, 1]]);
        assert_eq!(SwapColors.apply(&swapped, &[0, 2]).unwrap(), grid);
    }

    #[test]
    fn test_fill_background_targets_dominant_color() {
        let out = FillBackground.apply(&sample(), &[7]).unwrap();
        assert_eq!(out.to_rows(), vec![vec![7, 7, 2], vec![7, 2, 1]]);
    }

    #[test]
    fn test_majority_fill_is_uniform() {
        let out = MajorityFill.apply(&sample(), &[]).unwrap();
        assert_eq!(out, Grid::filled(2, 3, 0));
    }
}
