//! Arena lattice, world/cell conversion, and the map generator.
//!
//! The grid is built once per match and is query-only afterwards. Every agent
//! borrows it read-only, so it can be shared across parallel decisions.

use bevy::prelude::*;
use rand::Rng;

use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Size of a single cell in world units.
pub const CELL_SIZE: f32 = 20.0;

/// Smoothed-noise level above which an interior cell becomes a wall.
pub const WALL_THRESHOLD: f32 = 0.61;

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tile {
    Free,
    Wall,
}

impl Tile {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '#' => Some(Tile::Wall),
            '.' | ' ' => Some(Tile::Free),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Coordinate conversion
// ---------------------------------------------------------------------------

/// Cell containing a world position (floor division by the cell size).
pub fn to_cell(world: Vec2) -> Cell {
    Cell {
        x: (world.x / CELL_SIZE).floor() as i32,
        y: (world.y / CELL_SIZE).floor() as i32,
    }
}

/// World-space center of a cell.
pub fn to_world_center(cell: Cell) -> Vec2 {
    Vec2::new(
        cell.x as f32 * CELL_SIZE + CELL_SIZE / 2.0,
        cell.y as f32 * CELL_SIZE + CELL_SIZE / 2.0,
    )
}

// ---------------------------------------------------------------------------
// Arena grid resource
// ---------------------------------------------------------------------------

/// Wall/free lattice for one match. Border cells are always walls.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct ArenaGrid {
    width: usize,
    height: usize,
    tiles: Vec<Tile>,
}

impl ArenaGrid {
    /// Empty arena: walled border, free interior.
    pub fn bordered(width: usize, height: usize) -> Result<Self, EngineError> {
        if width == 0 || height == 0 {
            return Err(EngineError::EmptyGrid);
        }
        let tiles = (0..height)
            .flat_map(|y| {
                (0..width).map(move |x| {
                    if x == 0 || y == 0 || x == width - 1 || y == height - 1 {
                        Tile::Wall
                    } else {
                        Tile::Free
                    }
                })
            })
            .collect();
        Ok(Self {
            width,
            height,
            tiles,
        })
    }

    /// Parse an ASCII map (`#` wall, `.` or space free). Rows must be the
    /// same length and the border must be walled.
    pub fn parse(text: &str) -> Result<Self, EngineError> {
        let lines: Vec<&str> = text.lines().filter(|l| !l.is_empty()).collect();
        if lines.is_empty() {
            return Err(EngineError::EmptyGrid);
        }

        let height = lines.len();
        let width = lines[0].chars().count();
        if width == 0 {
            return Err(EngineError::EmptyGrid);
        }

        let mut tiles = Vec::with_capacity(width * height);
        for (y, line) in lines.iter().enumerate() {
            let found = line.chars().count();
            if found != width {
                return Err(EngineError::RaggedRow {
                    row: y,
                    expected: width,
                    found,
                });
            }
            for (x, ch) in line.chars().enumerate() {
                let tile = Tile::from_char(ch).ok_or(EngineError::UnknownTile { ch, x, y })?;
                let on_border = x == 0 || y == 0 || x == width - 1 || y == height - 1;
                if on_border && tile != Tile::Wall {
                    return Err(EngineError::OpenBorder { x, y });
                }
                tiles.push(tile);
            }
        }

        Ok(Self {
            width,
            height,
            tiles,
        })
    }

    /// Procedural arena: per-cell uniform noise, 3x3 mean smoothing, and a
    /// threshold on the interior.
    pub fn generate<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Result<Self, EngineError> {
        let mut grid = Self::bordered(size, size)?;
        let noise: Vec<f32> = (0..size * size).map(|_| rng.r#gen::<f32>()).collect();

        for y in 1..size.saturating_sub(1) {
            for x in 1..size.saturating_sub(1) {
                let mut sum = 0.0;
                let mut count = 0.0;
                for ny in y - 1..=y + 1 {
                    for nx in x - 1..=x + 1 {
                        sum += noise[ny * size + nx];
                        count += 1.0;
                    }
                }
                if sum / count > WALL_THRESHOLD {
                    grid.tiles[y * size + x] = Tile::Wall;
                }
            }
        }
        Ok(grid)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Tile at a cell, or None if out of bounds.
    pub fn tile_at(&self, cell: Cell) -> Option<Tile> {
        if !self.contains(cell) {
            return None;
        }
        self.tiles
            .get(cell.y as usize * self.width + cell.x as usize)
            .copied()
    }

    /// Out-of-bounds counts as a wall.
    pub fn is_wall(&self, x: i32, y: i32) -> bool {
        self.tile_at(Cell::new(x, y)) != Some(Tile::Free)
    }

    pub fn is_wall_cell(&self, cell: Cell) -> bool {
        self.is_wall(cell.x, cell.y)
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as usize) < self.width && (cell.y as usize) < self.height
    }

    /// Whether a world position lies on the lattice (finite and in range).
    pub fn contains_world(&self, p: Vec2) -> bool {
        p.is_finite() && p.x >= 0.0 && p.y >= 0.0 && self.contains(to_cell(p))
    }

    /// Whether the cell under a world position is free.
    pub fn is_free_at(&self, p: Vec2) -> bool {
        self.contains_world(p) && !self.is_wall_cell(to_cell(p))
    }

    /// Clamp a world position into the interior ring (inside the border walls).
    pub fn clamp_world(&self, p: Vec2) -> Vec2 {
        let max_x = (self.width as f32 - 1.0) * CELL_SIZE - 0.01;
        let max_y = (self.height as f32 - 1.0) * CELL_SIZE - 0.01;
        Vec2::new(
            p.x.clamp(CELL_SIZE, max_x.max(CELL_SIZE)),
            p.y.clamp(CELL_SIZE, max_y.max(CELL_SIZE)),
        )
    }

    /// Free cell closest to `target`, if the arena has any.
    pub fn nearest_free(&self, target: Cell) -> Option<Cell> {
        let (w, h) = (self.width as i32, self.height as i32);
        (0..h)
            .flat_map(|y| (0..w).map(move |x| Cell::new(x, y)))
            .filter(|c| !self.is_wall_cell(*c))
            .min_by_key(|c| (c.x - target.x).pow(2) + (c.y - target.y).pow(2))
    }

    /// Free 4-connected neighbors.
    pub fn free_neighbors4(&self, cell: Cell) -> Vec<Cell> {
        [(1, 0), (-1, 0), (0, 1), (0, -1)]
            .iter()
            .map(|(dx, dy)| cell.offset(*dx, *dy))
            .filter(|c| !self.is_wall_cell(*c))
            .collect()
    }

    /// Number of walls in the 8-neighborhood.
    pub fn wall_neighbors(&self, cell: Cell) -> usize {
        let mut count = 0;
        for dy in -1..=1 {
            for dx in -1..=1 {
                if (dx, dy) != (0, 0) && self.is_wall(cell.x + dx, cell.y + dy) {
                    count += 1;
                }
            }
        }
        count
    }

    /// Cell-stepped line of sight between two world points. Any wall cell on
    /// the sampled line blocks it.
    pub fn line_of_sight(&self, from: Vec2, to: Vec2) -> bool {
        let a = to_cell(from);
        let b = to_cell(to);
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let steps = dx.abs().max(dy.abs());
        if steps == 0 {
            return !self.is_wall_cell(a);
        }
        (0..=steps).all(|i| {
            let t = i as f32 / steps as f32;
            let x = a.x + (dx as f32 * t).round() as i32;
            let y = a.y + (dy as f32 * t).round() as i32;
            !self.is_wall(x, y)
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
