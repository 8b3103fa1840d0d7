//! Behavior state machine for the elite tier.
//!
//! Once per tick the machine decides whether to reselect its state, checks
//! whether the agent is stuck, and asks the active state's strategy for a
//! path. Strategies cache their paths in [`BehaviorMemory`] and refresh them
//! on progress or at random; every cache is dropped on a state change.

use std::f32::consts::FRAC_PI_2;

use bevy::prelude::*;
use micromegas_tracing::prelude::{debug, info, span_scope};
use rand::Rng;

use super::memory::OpponentMemory;
use super::search::{combine_paths, find_path, next_waypoint, path_progress, Path, SearchOptions, TempWall};
use super::steering::{normalize, rotate};
use crate::config::BehaviorSettings;
use crate::error::EngineError;
use crate::grid::{to_cell, to_world_center, ArenaGrid};

/// Target drift that invalidates a cached attack path.
const RETARGET_DISTANCE: f32 = 60.0;
const COVER_RADIUS: i32 = 5;
const PATROL_REACH: f32 = 300.0;
const ZONE_JITTER: f32 = 40.0;
const FLANK_DISTANCE: f32 = 200.0;
const SUPPRESSION_DISTANCES: [f32; 3] = [80.0, 140.0, 200.0];
const SUPPRESSION_STEP: f32 = 15.0 * std::f32::consts::PI / 180.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BehaviorState {
    #[default]
    Patrol,
    Flanking,
    Attack,
    /// Cover and suppressive positioning.
    Cover,
}

impl BehaviorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patrol => "patrol",
            Self::Flanking => "flanking",
            Self::Attack => "attack",
            Self::Cover => "cover",
        }
    }
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

const CAMPING_DRAW: [(BehaviorState, f32); 3] = [
    (BehaviorState::Flanking, 0.6),
    (BehaviorState::Attack, 0.2),
    (BehaviorState::Cover, 0.2),
];

/// Everything the transition rule looks at.
#[derive(Debug, Clone, Copy)]
pub struct TransitionInput {
    pub current: BehaviorState,
    pub dwell_ms: f64,
    pub aggression: f32,
    pub suppression: f32,
    /// The opponent is currently camping.
    pub camping: bool,
    /// In attack without closing distance.
    pub attack_stalled: bool,
}

/// Draw weights for a dwell-time reselection.
pub fn state_weights(aggression: f32, suppression: f32) -> [(BehaviorState, f32); 4] {
    let effective = (aggression * (1.0 - suppression)).min(1.0);
    [
        (BehaviorState::Attack, (0.4 + 0.5 * effective).max(0.01)),
        (BehaviorState::Flanking, (0.3 + 0.4 * suppression).max(0.01)),
        (BehaviorState::Cover, (0.2 - 0.1 * effective + 0.3 * suppression).max(0.01)),
        (BehaviorState::Patrol, (0.1 - 0.05 * suppression).max(0.01)),
    ]
}

pub fn weighted_random<T: Copy, R: Rng + ?Sized>(choices: &[(T, f32)], rng: &mut R) -> Option<T> {
    let total: f32 = choices.iter().map(|(_, w)| w.max(0.0)).sum();
    if total <= 0.0 {
        return choices.first().map(|(c, _)| *c);
    }
    let mut roll = rng.r#gen::<f32>() * total;
    for (choice, weight) in choices {
        roll -= weight.max(0.0);
        if roll < 0.0 {
            return Some(*choice);
        }
    }
    choices.last().map(|(c, _)| *c)
}

/// State to (re)enter this tick, or `None` to stay put without resetting
/// the dwell clock. Heavy suppression forces cover over any draw.
pub fn next_state<R: Rng + ?Sized>(
    input: &TransitionInput,
    settings: &BehaviorSettings,
    rng: &mut R,
) -> Option<BehaviorState> {
    let dwell_limit = if input.attack_stalled {
        settings.stalled_dwell_ms
    } else {
        settings.dwell_ms
    };

    let drawn = if input.camping {
        weighted_random(&CAMPING_DRAW, rng)
    } else if input.dwell_ms > dwell_limit {
        weighted_random(&state_weights(input.aggression, input.suppression), rng)
    } else {
        None
    };

    if input.suppression > settings.cover_threshold {
        return (drawn.is_some() || input.current != BehaviorState::Cover).then_some(BehaviorState::Cover);
    }
    drawn
}

// ---------------------------------------------------------------------------
// Stuck detection
// ---------------------------------------------------------------------------

/// Flags an agent that has stayed near one spot for too long.
#[derive(Debug, Clone, Default)]
pub struct StuckTracker {
    anchor: Option<(Vec2, f64)>,
    last_handled: Option<f64>,
}

impl StuckTracker {
    /// Returns true at most once per cooldown, after the agent has stayed
    /// within the stuck radius of its anchor for the whole window.
    pub fn observe(&mut self, pos: Vec2, now_ms: f64, settings: &BehaviorSettings) -> bool {
        match self.anchor {
            Some((anchor, since)) if anchor.distance(pos) <= settings.stuck_radius => {
                let cooled = self
                    .last_handled
                    .is_none_or(|t| now_ms - t >= settings.stuck_cooldown_ms);
                if now_ms - since >= settings.stuck_window_ms && cooled {
                    self.last_handled = Some(now_ms);
                    self.anchor = Some((pos, now_ms));
                    return true;
                }
                false
            }
            _ => {
                self.anchor = Some((pos, now_ms));
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Per-tick view of the world handed to the state machine.
pub struct PlanContext<'a> {
    pub grid: &'a ArenaGrid,
    pub memory: &'a OpponentMemory,
    pub me: Vec2,
    /// Where to plan against: the predicted opponent position.
    pub target: Vec2,
    /// Last observed opponent position.
    pub opponent: Vec2,
    pub suppression: f32,
    pub now_ms: f64,
    /// Base search options, exclusions included.
    pub search: &'a SearchOptions,
}

/// State-machine bookkeeping owned by one agent.
#[derive(Debug, Clone)]
pub struct BehaviorMemory {
    state: BehaviorState,
    state_started_at: f64,
    /// Distance to the opponent when the state was (re)entered.
    entry_distance: f32,
    patrol_route: Option<Path>,
    flank_path: Option<Path>,
    attack_path: Option<(Path, Vec2)>,
    cover_path: Option<Path>,
    temp_walls: Vec<TempWall>,
    stuck: StuckTracker,
}

impl BehaviorMemory {
    pub fn new(now_ms: f64) -> Self {
        Self {
            state: BehaviorState::Patrol,
            state_started_at: now_ms,
            entry_distance: f32::INFINITY,
            patrol_route: None,
            flank_path: None,
            attack_path: None,
            cover_path: None,
            temp_walls: Vec::new(),
            stuck: StuckTracker::default(),
        }
    }

    pub fn state(&self) -> BehaviorState {
        self.state
    }

    pub fn dwell_ms(&self, now_ms: f64) -> f64 {
        now_ms - self.state_started_at
    }

    pub fn temp_walls(&self) -> &[TempWall] {
        &self.temp_walls
    }

    /// Force a state, as a reselection would.
    pub fn enter(&mut self, state: BehaviorState, now_ms: f64, distance: f32) {
        if state != self.state {
            info!("behavior {} -> {}", self.state.as_str(), state.as_str());
            self.clear_paths();
            self.state = state;
        }
        self.state_started_at = now_ms;
        self.entry_distance = distance;
    }

    fn clear_paths(&mut self) {
        self.patrol_route = None;
        self.flank_path = None;
        self.attack_path = None;
        self.cover_path = None;
    }

    fn current_path(&self) -> Option<&Path> {
        match self.state {
            BehaviorState::Patrol => self.patrol_route.as_ref(),
            BehaviorState::Flanking => self.flank_path.as_ref(),
            BehaviorState::Attack => self.attack_path.as_ref().map(|(p, _)| p),
            BehaviorState::Cover => self.cover_path.as_ref(),
        }
    }

    /// Run one tick of the state machine and return the path to follow.
    pub fn plan<R: Rng + ?Sized>(
        &mut self,
        ctx: &PlanContext,
        settings: &BehaviorSettings,
        rng: &mut R,
    ) -> Result<Path, EngineError> {
        span_scope!("behavior_plan");
        let now = ctx.now_ms;
        let distance = ctx.me.distance(ctx.opponent);
        let aggression = ctx.memory.aggression();
        let camp = ctx.memory.detect_camping();

        let dwell_ms = self.dwell_ms(now);
        let attack_stalled = self.state == BehaviorState::Attack
            && dwell_ms > settings.stalled_dwell_ms
            && distance >= self.entry_distance * 0.95;

        self.temp_walls.retain(|w| w.expires_at > now);
        if self.stuck.observe(ctx.me, now, settings) {
            self.break_out(ctx);
        } else {
            let input = TransitionInput {
                current: self.state,
                dwell_ms,
                aggression,
                suppression: ctx.suppression,
                camping: camp.is_camping,
                attack_stalled,
            };
            if let Some(next) = next_state(&input, settings, rng) {
                self.enter(next, now, distance);
            }
        }

        let mut opts = ctx.search.clone().at(now);
        opts.temp_walls.extend(self.temp_walls.iter().copied());
        let planner = Planner {
            ctx,
            opts,
            aggression: (aggression * (1.0 - ctx.suppression)).min(1.0),
        };

        match self.state {
            BehaviorState::Patrol => self.patrol(&planner, rng),
            BehaviorState::Flanking => self.flank(&planner, rng),
            BehaviorState::Attack => self.attack(&planner, settings, rng),
            BehaviorState::Cover => self.cover(&planner, rng),
        }
    }

    /// Wall off the cell toward the next waypoint and drop cached paths so
    /// the active state plans around it.
    fn break_out(&mut self, ctx: &PlanContext) {
        let toward = self
            .current_path()
            .and_then(|p| next_waypoint(p, ctx.me))
            .unwrap_or(ctx.target);
        let dir = normalize(toward - ctx.me);
        let here = to_cell(ctx.me);
        let blocked = here.offset(dir.x.round() as i32, dir.y.round() as i32);
        if blocked != here && !ctx.grid.is_wall_cell(blocked) {
            info!("agent stuck at ({}, {}), walling ({}, {})", here.x, here.y, blocked.x, blocked.y);
            self.temp_walls.push(TempWall {
                cell: blocked,
                expires_at: ctx.now_ms + ctx.search.temp_wall_ttl_ms,
            });
        }
        self.clear_paths();
    }

    // -----------------------------------------------------------------------
    // Strategies
    // -----------------------------------------------------------------------

    fn patrol<R: Rng + ?Sized>(&mut self, planner: &Planner, rng: &mut R) -> Result<Path, EngineError> {
        let stale = match &self.patrol_route {
            None => true,
            Some(route) => rng.gen_bool(0.05) || path_progress(route, planner.ctx.me) > 0.9,
        };
        if stale {
            self.patrol_route = Some(planner.observant_patrol(rng)?);
        }
        Ok(self.patrol_route.clone().unwrap_or_default())
    }

    fn flank<R: Rng + ?Sized>(&mut self, planner: &Planner, rng: &mut R) -> Result<Path, EngineError> {
        let stale = match &self.flank_path {
            None => true,
            Some(path) => rng.gen_bool(0.1) || path_progress(path, planner.ctx.me) > 0.8,
        };
        if stale {
            let mut path = planner.smart_flank(rng)?;
            if path.is_empty() {
                path = planner.observant_patrol(rng)?;
            }
            self.flank_path = Some(path);
        }
        Ok(self.flank_path.clone().unwrap_or_default())
    }

    fn attack<R: Rng + ?Sized>(
        &mut self,
        planner: &Planner,
        settings: &BehaviorSettings,
        rng: &mut R,
    ) -> Result<Path, EngineError> {
        let target = planner.ctx.target;
        let stale = match &self.attack_path {
            None => true,
            Some((path, aimed_at)) => {
                path_progress(path, planner.ctx.me) > 0.8 || aimed_at.distance(target) > RETARGET_DISTANCE
            }
        };
        if stale {
            let mut path = planner.rushed_attack(settings, rng)?;
            if path.is_empty() {
                path = planner.observant_patrol(rng)?;
            }
            self.attack_path = Some((path, target));
        }
        Ok(self.attack_path.as_ref().map(|(p, _)| p.clone()).unwrap_or_default())
    }

    fn cover<R: Rng + ?Sized>(&mut self, planner: &Planner, rng: &mut R) -> Result<Path, EngineError> {
        let stale = self.cover_path.is_none() || rng.gen_bool(0.2);
        if stale {
            self.cover_path = Some(planner.strategic_cover()?);
        }
        let arrived = self
            .cover_path
            .as_ref()
            .is_none_or(|p| p.is_empty() || path_progress(p, planner.ctx.me) > 0.9);
        if arrived {
            let mut path = planner.suppression_cone()?;
            if path.is_empty() {
                path = planner.observant_patrol(rng)?;
            }
            self.cover_path = Some(path);
        }
        Ok(self.cover_path.clone().unwrap_or_default())
    }
}

/// Path generation for one tick.
struct Planner<'a> {
    ctx: &'a PlanContext<'a>,
    opts: SearchOptions,
    /// Opponent aggression damped by suppression.
    aggression: f32,
}

impl Planner<'_> {
    fn route_from(&self, from: Vec2, goal: Vec2) -> Result<Path, EngineError> {
        find_path(self.ctx.grid, from, self.ctx.grid.clamp_world(goal), &self.opts)
    }

    fn route(&self, goal: Vec2) -> Result<Path, EngineError> {
        self.route_from(self.ctx.me, goal)
    }

    /// Cardinal points 300 units out plus jittered favorite-zone centers,
    /// favoring the zones 0.7 to 0.3. Empty when nothing is reachable.
    fn observant_patrol<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Path, EngineError> {
        let grid = self.ctx.grid;
        let me = self.ctx.me;
        let cardinal = [Vec2::X, Vec2::NEG_X, Vec2::Y, Vec2::NEG_Y].map(|d| (me + d * PATROL_REACH, 0.3));
        let strategic: Vec<(Vec2, f32)> = self
            .ctx
            .memory
            .favorite_zones()
            .iter()
            .map(|z| {
                let jitter = Vec2::new(
                    rng.gen_range(-ZONE_JITTER..ZONE_JITTER),
                    rng.gen_range(-ZONE_JITTER..ZONE_JITTER),
                );
                (z.center() + jitter, 0.7)
            })
            .collect();

        let mut routes = Vec::new();
        for (point, weight) in cardinal.into_iter().chain(strategic) {
            if !grid.is_free_at(point) {
                continue;
            }
            let path = find_path(grid, me, point, &self.opts)?;
            if !path.is_empty() {
                routes.push((path, weight));
            }
        }

        let weights: Vec<(usize, f32)> = routes.iter().enumerate().map(|(i, (_, w))| (i, *w)).collect();
        Ok(weighted_random(&weights, rng)
            .map(|i| routes.swap_remove(i).0)
            .unwrap_or_default())
    }

    /// Toward a free favorite zone, else 200 units to the side of the target.
    fn smart_flank<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Path, EngineError> {
        let grid = self.ctx.grid;
        let viable: Vec<Vec2> = self
            .ctx
            .memory
            .favorite_zones()
            .iter()
            .map(|z| z.center())
            .filter(|c| grid.is_free_at(*c))
            .collect();
        if !viable.is_empty() {
            let pick = viable[rng.gen_range(0..viable.len())];
            return self.route(pick);
        }
        let heading = self.ctx.target - self.ctx.me;
        let side = Vec2::from_angle(heading.y.atan2(heading.x) + FRAC_PI_2);
        self.route(self.ctx.target + side * FLANK_DISTANCE)
    }

    /// Rush through the target, overshooting by 50 to 100 units with
    /// aggression. Under fire the route tails into cover, otherwise it may
    /// open with a lateral feint.
    fn rushed_attack<R: Rng + ?Sized>(&self, settings: &BehaviorSettings, rng: &mut R) -> Result<Path, EngineError> {
        let me = self.ctx.me;
        let dir = normalize(self.ctx.target - me);
        let goal = self.ctx.target + dir * 50.0 * (1.0 + self.aggression);

        if self.ctx.suppression > 0.4 {
            let attack = self.route(goal)?;
            let Some(pivot) = attack.get(2).or(attack.last()).copied() else {
                return Ok(attack);
            };
            let cover = match nearby_cover(self.ctx.grid, pivot) {
                Some(cover) => self.route_from(pivot, cover)?,
                None => Vec::new(),
            };
            return Ok(combine_paths(&attack, &cover));
        }

        if rng.gen_bool(settings.feint_chance.clamp(0.0, 1.0) as f64) {
            let side = if rng.gen_bool(0.5) { FRAC_PI_2 } else { -FRAC_PI_2 };
            let feint = self.route(me + rotate(dir, side) * settings.feint_offset)?;
            if let Some(pivot) = feint.get(2).or(feint.last()).copied() {
                let attack = self.route_from(pivot, goal)?;
                if !attack.is_empty() {
                    debug!("attack opens with a feint");
                    return Ok(combine_paths(&feint, &attack));
                }
            }
        }
        self.route(goal)
    }

    /// Nearest wall-adjacent free cell around the agent or a favorite zone.
    fn strategic_cover(&self) -> Result<Path, EngineError> {
        let me = self.ctx.me;
        let best = std::iter::once(me)
            .chain(self.ctx.memory.favorite_zones().iter().map(|z| z.center()))
            .filter_map(|p| nearby_cover(self.ctx.grid, p))
            .min_by(|a, b| a.distance_squared(me).total_cmp(&b.distance_squared(me)));
        match best {
            Some(cover) => self.route(cover),
            None => Ok(Vec::new()),
        }
    }

    /// Firing points in a cone toward the opponent, best walled first.
    fn suppression_cone(&self) -> Result<Path, EngineError> {
        let grid = self.ctx.grid;
        let me = self.ctx.me;
        let heading = self.ctx.opponent - me;
        let base = heading.y.atan2(heading.x);

        let mut candidates: Vec<(Vec2, usize)> = Vec::new();
        for step in -2..=2 {
            let dir = Vec2::from_angle(base + step as f32 * SUPPRESSION_STEP);
            for distance in SUPPRESSION_DISTANCES {
                let point = me + dir * distance;
                if grid.is_free_at(point) {
                    candidates.push((point, grid.wall_neighbors(to_cell(point))));
                }
            }
        }
        candidates.sort_by(|a, b| b.1.cmp(&a.1));

        for (point, _) in candidates {
            let path = find_path(grid, me, point, &self.opts)?;
            if !path.is_empty() {
                return Ok(path);
            }
        }
        Ok(Vec::new())
    }
}

/// Nearest free cell with at least one wall neighbor within five cells.
pub fn nearby_cover(grid: &ArenaGrid, p: Vec2) -> Option<Vec2> {
    let center = to_cell(p);
    (-COVER_RADIUS..=COVER_RADIUS)
        .flat_map(|dy| (-COVER_RADIUS..=COVER_RADIUS).map(move |dx| center.offset(dx, dy)))
        .filter(|c| !grid.is_wall_cell(*c) && grid.wall_neighbors(*c) > 0)
        .map(to_world_center)
        .min_by(|a, b| a.distance_squared(p).total_cmp(&b.distance_squared(p)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Cell;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn settings() -> BehaviorSettings {
        BehaviorSettings::default()
    }

    fn input(current: BehaviorState, dwell_ms: f64, suppression: f32) -> TransitionInput {
        TransitionInput {
            current,
            dwell_ms,
            aggression: 0.5,
            suppression,
            camping: false,
            attack_stalled: false,
        }
    }

    #[test]
    fn heavy_suppression_forces_cover_over_any_draw() {
        let mut free_draw_picked_other = false;
        for seed in 0..200 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let calm = next_state(&input(BehaviorState::Patrol, 10_000.0, 0.0), &settings(), &mut rng);
            free_draw_picked_other |= calm != Some(BehaviorState::Cover);

            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let pinned = next_state(&input(BehaviorState::Patrol, 10_000.0, 0.8), &settings(), &mut rng);
            assert_eq!(pinned, Some(BehaviorState::Cover), "seed {seed}");
        }
        assert!(free_draw_picked_other);
    }

    #[test]
    fn staying_in_cover_does_not_reset_dwell() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(next_state(&input(BehaviorState::Cover, 100.0, 0.9), &settings(), &mut rng), None);
    }

    #[test]
    fn dwell_gates_reselection() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        assert_eq!(next_state(&input(BehaviorState::Attack, 3_500.0, 0.0), &settings(), &mut rng), None);
        let mut stalled = input(BehaviorState::Attack, 3_500.0, 0.0);
        stalled.attack_stalled = true;
        assert!(next_state(&stalled, &settings(), &mut rng).is_some());
    }

    #[test]
    fn camping_interrupts_dwell() {
        for seed in 0..50 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut camping = input(BehaviorState::Attack, 0.0, 0.0);
            camping.camping = true;
            let next = next_state(&camping, &settings(), &mut rng);
            assert!(matches!(
                next,
                Some(BehaviorState::Flanking | BehaviorState::Attack | BehaviorState::Cover)
            ));
        }
    }

    #[test]
    fn weights_shift_with_suppression() {
        let calm = state_weights(0.5, 0.0);
        let pinned = state_weights(0.5, 1.0);
        assert!((calm[0].1 - 0.65).abs() < 1e-6);
        assert!(pinned[2].1 > calm[2].1);
        assert!(pinned[3].1 < calm[3].1);
        assert!(state_weights(50.0, 0.0).iter().all(|(_, w)| *w >= 0.01));
    }

    #[test]
    fn weighted_random_respects_zero_weights() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let choices = [("a", 0.0), ("b", 1.0), ("c", 0.0)];
        for _ in 0..100 {
            assert_eq!(weighted_random(&choices, &mut rng), Some("b"));
        }
        assert_eq!(weighted_random::<&str, _>(&[], &mut rng), None);
    }

    #[test]
    fn stuck_tracker_fires_once_per_cooldown() {
        let s = settings();
        let mut tracker = StuckTracker::default();
        let p = Vec2::new(100.0, 100.0);
        assert!(!tracker.observe(p, 0.0, &s));
        assert!(!tracker.observe(p + Vec2::X * 10.0, 1_000.0, &s));
        assert!(tracker.observe(p, 3_000.0, &s));
        assert!(!tracker.observe(p, 6_500.0, &s));
        assert!(tracker.observe(p, 8_000.0, &s));
        // Moving away re-anchors.
        assert!(!tracker.observe(p + Vec2::X * 200.0, 20_000.0, &s));
    }

    #[test]
    fn nearby_cover_hugs_walls() {
        let grid = ArenaGrid::bordered(25, 25).unwrap();
        let cover = nearby_cover(&grid, to_world_center(Cell::new(4, 12))).unwrap();
        assert_eq!(to_cell(cover), Cell::new(1, 12));
        assert!(nearby_cover(&grid, to_world_center(Cell::new(12, 12))).is_none());
    }

    fn plan_once(state: BehaviorState, me: Vec2, opponent: Vec2, suppression: f32, seed: u64) -> Path {
        let grid = ArenaGrid::bordered(25, 25).unwrap();
        let mut memory = OpponentMemory::new();
        memory.record(opponent, Vec2::ZERO, None, 0.0);
        let search = SearchOptions::default();
        let ctx = PlanContext {
            grid: &grid,
            memory: &memory,
            me,
            target: opponent,
            opponent,
            suppression,
            now_ms: 100.0,
            search: &search,
        };
        let mut behavior = BehaviorMemory::new(0.0);
        behavior.enter(state, 0.0, me.distance(opponent));
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        behavior.plan(&ctx, &settings(), &mut rng).unwrap()
    }

    #[test]
    fn attack_paths_close_on_the_opponent() {
        let me = Vec2::new(50.0, 50.0);
        let opponent = Vec2::new(450.0, 450.0);
        for seed in 0..10 {
            let path = plan_once(BehaviorState::Attack, me, opponent, 0.0, seed);
            assert!(!path.is_empty());
            let last = *path.last().unwrap();
            assert!(last.distance(opponent) < me.distance(opponent));
        }
    }

    #[test]
    fn flanking_swings_to_the_side() {
        let me = Vec2::new(50.0, 50.0);
        let opponent = Vec2::new(450.0, 450.0);
        let path = plan_once(BehaviorState::Flanking, me, opponent, 0.0, 4);
        assert!(!path.is_empty());
        let goal = *path.last().unwrap();
        assert!((goal - me).dot(opponent - me) > 0.0);
    }

    #[test]
    fn cover_finds_a_reachable_spot() {
        let me = Vec2::new(250.0, 250.0);
        let opponent = Vec2::new(450.0, 250.0);
        let path = plan_once(BehaviorState::Cover, me, opponent, 0.9, 6);
        assert!(!path.is_empty());
    }

    #[test]
    fn camping_reselects_on_every_detected_tick() {
        let grid = ArenaGrid::bordered(25, 25).unwrap();
        let camper = Vec2::new(450.0, 450.0);
        let mut memory = OpponentMemory::new();
        for i in 0..15 {
            memory.record(camper, Vec2::ZERO, None, i as f64 * 600.0);
        }
        assert!(memory.detect_camping().is_camping);

        let search = SearchOptions::default();
        let me = Vec2::new(50.0, 50.0);
        let mut behavior = BehaviorMemory::new(0.0);
        behavior.enter(BehaviorState::Attack, 8_400.0, me.distance(camper));
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for now in [8_500.0, 8_600.0, 8_700.0] {
            let ctx = PlanContext {
                grid: &grid,
                memory: &memory,
                me,
                target: camper,
                opponent: camper,
                suppression: 0.0,
                now_ms: now,
                search: &search,
            };
            behavior.plan(&ctx, &settings(), &mut rng).unwrap();
            assert_eq!(behavior.dwell_ms(now), 0.0, "camper ignored at {now}");
            assert_ne!(behavior.state(), BehaviorState::Patrol);
        }
    }

    #[test]
    fn stuck_agent_walls_its_next_step_instead_of_reselecting() {
        let grid = ArenaGrid::bordered(25, 25).unwrap();
        let opponent = Vec2::new(450.0, 450.0);
        let mut memory = OpponentMemory::new();
        memory.record(opponent, Vec2::ZERO, None, 0.0);
        let search = SearchOptions::default();
        let me = Vec2::new(50.0, 50.0);

        for seed in 0..5 {
            let mut behavior = BehaviorMemory::new(0.0);
            behavior.enter(BehaviorState::Attack, 0.0, me.distance(opponent));
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let ctx_at = |now_ms| PlanContext {
                grid: &grid,
                memory: &memory,
                me,
                target: opponent,
                opponent,
                suppression: 0.0,
                now_ms,
                search: &search,
            };

            behavior.plan(&ctx_at(0.0), &settings(), &mut rng).unwrap();
            assert!(behavior.temp_walls().is_empty());

            // Past both the stuck window and the dwell limit.
            let path = behavior.plan(&ctx_at(5_000.0), &settings(), &mut rng).unwrap();
            assert_eq!(behavior.state(), BehaviorState::Attack);
            assert_eq!(behavior.dwell_ms(5_000.0), 5_000.0);

            let walls = behavior.temp_walls();
            assert_eq!(walls.len(), 1, "seed {seed}");
            let here = to_cell(me);
            let wall = walls[0].cell;
            assert!(wall != here && (wall.x - here.x).abs() <= 1 && (wall.y - here.y).abs() <= 1);
            assert!(walls[0].expires_at > 5_000.0);
            assert!(!path.is_empty(), "seed {seed}");
            assert!(path.iter().all(|p| to_cell(*p) != wall), "seed {seed}: path crosses {wall:?}");
        }
    }
}
