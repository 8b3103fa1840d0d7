//! Grid pathfinding: uniform-cost search for the lowest tier and a budgeted
//! A* with exclusions, temporary walls and bounded retries for the others.
//!
//! An empty path is the normal "no route" answer. Only positions off the
//! lattice are reported as errors.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use bevy::prelude::*;
use micromegas_tracing::prelude::{debug, imetric, span_fn, span_scope};
use pathfinding::prelude::dijkstra;

use crate::config::SearchSettings;
use crate::error::EngineError;
use crate::grid::{to_cell, to_world_center, ArenaGrid, Cell};

/// World-space waypoints (cell centers), root to goal.
pub type Path = Vec<Vec2>;

/// Cell blocked until `expires_at` (host milliseconds).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempWall {
    pub cell: Cell,
    pub expires_at: f64,
}

/// Tuning and per-call context for [`find_path`].
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub diagonal_cost: f32,
    pub heuristic_weight: f32,
    pub max_expansions: usize,
    pub max_retries: u32,
    pub temp_wall_ttl_ms: f64,
    /// Recently visited cells, skipped unless they are the goal.
    pub excluded: HashSet<Cell>,
    pub temp_walls: Vec<TempWall>,
    pub now_ms: f64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::from_settings(&SearchSettings::default())
    }
}

impl SearchOptions {
    pub fn from_settings(settings: &SearchSettings) -> Self {
        Self {
            diagonal_cost: settings.diagonal_cost,
            heuristic_weight: settings.heuristic_weight,
            max_expansions: settings.max_expansions,
            max_retries: settings.max_retries,
            temp_wall_ttl_ms: settings.temp_wall_ttl_ms,
            excluded: HashSet::new(),
            temp_walls: Vec::new(),
            now_ms: 0.0,
        }
    }

    pub fn at(mut self, now_ms: f64) -> Self {
        self.now_ms = now_ms;
        self
    }

    fn is_temp_wall(&self, cell: Cell) -> bool {
        self.temp_walls
            .iter()
            .any(|w| w.cell == cell && w.expires_at > self.now_ms)
    }

    fn blocked(&self, grid: &ArenaGrid, cell: Cell) -> bool {
        grid.is_wall_cell(cell) || self.is_temp_wall(cell)
    }
}

// ---------------------------------------------------------------------------
// Uniform-cost search
// ---------------------------------------------------------------------------

/// 4-connected, unit-cost search. Returns cells start-to-goal, or an empty
/// sequence when the goal is unreachable or equal to the start.
#[span_fn]
pub fn uniform_cost_path(grid: &ArenaGrid, from: Vec2, to: Vec2) -> Result<Vec<Cell>, EngineError> {
    let (start, goal) = endpoints(grid, from, to)?;
    if start == goal || grid.is_wall_cell(goal) {
        return Ok(Vec::new());
    }
    let result = dijkstra(
        &start,
        |cell| {
            grid.free_neighbors4(*cell)
                .into_iter()
                .map(|n| (n, 1u32))
        },
        |cell| *cell == goal,
    );
    Ok(result.map(|(cells, _cost)| cells).unwrap_or_default())
}

// ---------------------------------------------------------------------------
// A*
// ---------------------------------------------------------------------------

/// Search node. Parents are indices into the per-search arena.
#[derive(Debug, Clone, Copy)]
struct PathNode {
    cell: Cell,
    parent: Option<usize>,
    g: f32,
    h: f32,
}

impl PathNode {
    fn f(&self) -> f32 {
        self.g + self.h
    }
}

/// Frontier entry: lowest f first, then earliest insertion.
#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    f: f32,
    seq: u64,
    node: usize,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

enum SearchOutcome {
    Found(Vec<Cell>),
    /// Budget ran out; carries the path to the expanded node nearest the goal.
    Exhausted(Vec<Cell>),
    /// Frontier emptied without reaching the goal.
    Unreachable(Vec<Cell>),
}

const NEIGHBORS8: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (-1, 1),
    (1, -1),
    (-1, -1),
];

fn octile(a: Cell, b: Cell, diagonal_cost: f32) -> f32 {
    let dx = (a.x - b.x).abs() as f32;
    let dy = (a.y - b.y).abs() as f32;
    let (lo, hi) = if dx < dy { (dx, dy) } else { (dy, dx) };
    (hi - lo) + lo * diagonal_cost
}

fn reconstruct(nodes: &[PathNode], mut index: usize) -> Vec<Cell> {
    let mut cells = vec![nodes[index].cell];
    while let Some(parent) = nodes[index].parent {
        cells.push(nodes[parent].cell);
        index = parent;
    }
    cells.reverse();
    cells
}

fn search(grid: &ArenaGrid, start: Cell, goal: Cell, opts: &SearchOptions, budget: usize) -> SearchOutcome {
    let h0 = octile(start, goal, opts.diagonal_cost) * opts.heuristic_weight;
    let mut nodes = vec![PathNode {
        cell: start,
        parent: None,
        g: 0.0,
        h: h0,
    }];
    let mut open = BinaryHeap::new();
    let mut best_g: HashMap<Cell, f32> = HashMap::from([(start, 0.0)]);
    let mut closed: HashSet<Cell> = HashSet::new();
    let mut seq = 0u64;
    open.push(OpenEntry {
        f: nodes[0].f(),
        seq,
        node: 0,
    });

    let mut expansions = 0usize;
    let mut nearest = 0usize;

    while let Some(entry) = open.pop() {
        let current = nodes[entry.node];
        if !closed.insert(current.cell) {
            continue;
        }
        if current.cell == goal {
            return SearchOutcome::Found(reconstruct(&nodes, entry.node));
        }
        if current.h < nodes[nearest].h {
            nearest = entry.node;
        }
        expansions += 1;
        if expansions > budget {
            return SearchOutcome::Exhausted(reconstruct(&nodes, nearest));
        }

        for (dx, dy) in NEIGHBORS8 {
            let next = current.cell.offset(dx, dy);
            if closed.contains(&next) || opts.blocked(grid, next) {
                continue;
            }
            if next != goal && opts.excluded.contains(&next) {
                continue;
            }
            let diagonal = dx != 0 && dy != 0;
            if diagonal
                && (opts.blocked(grid, current.cell.offset(dx, 0))
                    || opts.blocked(grid, current.cell.offset(0, dy)))
            {
                continue;
            }
            let step = if diagonal { opts.diagonal_cost } else { 1.0 };
            let g = current.g + step;
            if best_g.get(&next).is_some_and(|known| g >= *known) {
                continue;
            }
            best_g.insert(next, g);
            nodes.push(PathNode {
                cell: next,
                parent: Some(entry.node),
                g,
                h: octile(next, goal, opts.diagonal_cost) * opts.heuristic_weight,
            });
            seq += 1;
            let node = nodes.len() - 1;
            open.push(OpenEntry {
                f: nodes[node].f(),
                seq,
                node,
            });
        }
    }

    SearchOutcome::Unreachable(reconstruct(&nodes, nearest))
}

/// Free neighbor of `start` to wall off before a retry: the one the greedy
/// heuristic favors, which is where the failed search kept pushing.
fn retry_blocker(grid: &ArenaGrid, start: Cell, goal: Cell, opts: &SearchOptions) -> Option<Cell> {
    NEIGHBORS8
        .iter()
        .map(|(dx, dy)| start.offset(*dx, *dy))
        .filter(|c| *c != goal && !opts.blocked(grid, *c))
        .min_by(|a, b| {
            octile(*a, goal, opts.diagonal_cost).total_cmp(&octile(*b, goal, opts.diagonal_cost))
        })
}

fn endpoints(grid: &ArenaGrid, from: Vec2, to: Vec2) -> Result<(Cell, Cell), EngineError> {
    for p in [from, to] {
        if !grid.contains_world(p) {
            return Err(EngineError::OutOfBounds { x: p.x, y: p.y });
        }
    }
    Ok((snap_to_floor(grid, to_cell(from)), snap_to_floor(grid, to_cell(to))))
}

/// Endpoints inside static walls move to the nearest free cell.
fn snap_to_floor(grid: &ArenaGrid, cell: Cell) -> Cell {
    if grid.is_wall_cell(cell) {
        grid.nearest_free(cell).unwrap_or(cell)
    } else {
        cell
    }
}

fn to_path(cells: &[Cell]) -> Path {
    cells.iter().map(|c| to_world_center(*c)).collect()
}

/// Budgeted A* with bounded retries. Each retry after an exhausted budget
/// walls off one cell next to the start and forgets the exclusion list.
pub fn find_path(grid: &ArenaGrid, from: Vec2, to: Vec2, options: &SearchOptions) -> Result<Path, EngineError> {
    span_scope!("find_path");
    let (start, goal) = endpoints(grid, from, to)?;
    if start == goal || options.blocked(grid, goal) {
        return Ok(Vec::new());
    }

    let mut opts = options.clone();
    for attempt in 0..=opts.max_retries {
        match search(grid, start, goal, &opts, opts.max_expansions) {
            SearchOutcome::Found(cells) => return Ok(to_path(&cells)),
            // Exclusions alone can seal a dead end; try once more without them.
            SearchOutcome::Unreachable(_) if !opts.excluded.is_empty() => {
                opts.excluded.clear();
            }
            SearchOutcome::Unreachable(_) => return Ok(Vec::new()),
            SearchOutcome::Exhausted(_) => {
                if attempt == opts.max_retries {
                    break;
                }
                let Some(blocker) = retry_blocker(grid, start, goal, &opts) else {
                    break;
                };
                debug!(
                    "search budget exhausted, retry {} with temp wall at ({}, {})",
                    attempt + 1,
                    blocker.x,
                    blocker.y
                );
                opts.temp_walls.push(TempWall {
                    cell: blocker,
                    expires_at: opts.now_ms + opts.temp_wall_ttl_ms,
                });
                opts.excluded.clear();
            }
        }
    }
    imetric!("search_gave_up", "count", 1);
    Ok(Vec::new())
}

/// Single bounded pass. Returns the full path when the goal is reached
/// within `budget` expansions, otherwise the partial path toward the
/// expanded cell nearest the goal.
pub fn bounded_path(grid: &ArenaGrid, from: Vec2, to: Vec2, budget: usize) -> Result<Path, EngineError> {
    let (start, goal) = endpoints(grid, from, to)?;
    let opts = SearchOptions::default();
    let cells = match search(grid, start, goal, &opts, budget) {
        SearchOutcome::Found(cells)
        | SearchOutcome::Exhausted(cells)
        | SearchOutcome::Unreachable(cells) => cells,
    };
    Ok(to_path(&cells))
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// Waypoint to steer toward: the one after the waypoint nearest `me`.
pub fn next_waypoint(path: &[Vec2], me: Vec2) -> Option<Vec2> {
    let nearest = path
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.distance_squared(me).total_cmp(&b.distance_squared(me)))
        .map(|(i, _)| i)?;
    path.get(nearest + 1).or(path.last()).copied()
}

/// Fraction of the path covered, measured as distance from its root.
pub fn path_progress(path: &[Vec2], me: Vec2) -> f32 {
    if path.len() < 2 {
        return 0.0;
    }
    let total: f32 = path.windows(2).map(|w| w[0].distance(w[1])).sum();
    if total <= f32::EPSILON {
        return 0.0;
    }
    me.distance(path[0]) / total
}

/// First three waypoints of each path, in order.
pub fn combine_paths(main: &[Vec2], secondary: &[Vec2]) -> Path {
    main.iter()
        .take(3)
        .chain(secondary.iter().take(3))
        .copied()
        .collect()
}
