//! Vector helpers and the wall-repulsion collaborator shared by every tier.

use bevy::prelude::*;

use crate::grid::{to_cell, ArenaGrid};

/// Unit vector, or zero for a zero-length input.
pub fn normalize(v: Vec2) -> Vec2 {
    v.normalize_or_zero()
}

/// Rotate a vector counter-clockwise by `angle` radians.
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    Vec2::from_angle(angle).rotate(v)
}

/// Push-away direction from walls in the 8-neighborhood of `pos`, each wall
/// weighted by inverse distance. Zero when no wall is adjacent.
pub fn wall_repulsion(grid: &ArenaGrid, pos: Vec2) -> Vec2 {
    let cell = to_cell(pos);
    let mut push = Vec2::ZERO;
    for dy in -1..=1 {
        for dx in -1..=1 {
            if (dx, dy) == (0, 0) || !grid.is_wall(cell.x + dx, cell.y + dy) {
                continue;
            }
            let offset = Vec2::new(dx as f32, dy as f32);
            push -= offset / offset.length_squared();
        }
    }
    normalize(push)
}

/// Blend a desired heading with wall repulsion (30/70) and normalize. The
/// base is left unscaled, so long headings dominate a unit repulsion.
pub fn wall_aware_velocity(base: Vec2, repulsion: Vec2) -> Vec2 {
    normalize(base * 0.3 + repulsion * 0.7)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{to_world_center, Cell};

    #[test]
    fn normalize_has_unit_length() {
        for v in [
            Vec2::new(3.0, 4.0),
            Vec2::new(-0.001, 0.0),
            Vec2::new(1e6, -1e6),
            Vec2::new(0.3, -7.2),
        ] {
            assert!((normalize(v).length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn normalize_zero_is_zero() {
        assert_eq!(normalize(Vec2::ZERO), Vec2::ZERO);
    }

    #[test]
    fn rotate_quarter_turn() {
        let r = rotate(Vec2::X, std::f32::consts::FRAC_PI_2);
        assert!((r - Vec2::Y).length() < 1e-5);
    }

    #[test]
    fn repulsion_points_away_from_corner() {
        let grid = ArenaGrid::bordered(10, 10).unwrap();
        let push = wall_repulsion(&grid, to_world_center(Cell::new(1, 1)));
        assert!(push.x > 0.0 && push.y > 0.0);
        assert!((push.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn repulsion_is_zero_in_open_floor() {
        let grid = ArenaGrid::bordered(10, 10).unwrap();
        assert_eq!(wall_repulsion(&grid, to_world_center(Cell::new(5, 5))), Vec2::ZERO);
    }

    #[test]
    fn long_heading_dominates_repulsion() {
        let v = wall_aware_velocity(Vec2::new(40.0, 0.0), Vec2::new(0.0, 1.0));
        assert!(v.x > v.y);
    }
}
