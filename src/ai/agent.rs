//! State owned by a single AI agent across ticks.

use std::collections::{HashSet, VecDeque};

use bevy::prelude::*;

use super::behavior::{BehaviorMemory, BehaviorState};
use super::memory::OpponentMemory;
use crate::grid::Cell;

/// Everything one agent remembers between decisions. Nothing here is shared
/// with other agents, so agents can be decided in any order or in parallel.
#[derive(Component, Debug, Clone, Default)]
pub struct AgentState {
    memory: Option<OpponentMemory>,
    behavior: Option<BehaviorMemory>,
    /// Low-pass filtered raw movement of the elite tier.
    pub smoothed_velocity: Vec2,
    engagement_start: Option<f64>,
    recent_cells: VecDeque<Cell>,
}

impl AgentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opponent memory, created on first access.
    pub fn memory_mut(&mut self) -> &mut OpponentMemory {
        self.memory.get_or_insert_with(OpponentMemory::new)
    }

    pub fn memory(&self) -> Option<&OpponentMemory> {
        self.memory.as_ref()
    }

    /// Both halves of the agent's memory, created on first access.
    pub fn minds(&mut self, now_ms: f64) -> (&mut OpponentMemory, &mut BehaviorMemory) {
        let memory = self.memory.get_or_insert_with(OpponentMemory::new);
        let behavior = self.behavior.get_or_insert_with(|| BehaviorMemory::new(now_ms));
        (memory, behavior)
    }

    pub fn behavior_state(&self) -> BehaviorState {
        self.behavior.as_ref().map(|b| b.state()).unwrap_or_default()
    }

    /// Milliseconds since the first engaged tick.
    pub fn engagement_ms(&mut self, now_ms: f64) -> f64 {
        now_ms - *self.engagement_start.get_or_insert(now_ms)
    }

    /// Note the cell the agent is standing in, keeping the last `keep` distinct
    /// entries.
    pub fn visit(&mut self, cell: Cell, keep: usize) {
        if self.recent_cells.back() == Some(&cell) {
            return;
        }
        self.recent_cells.push_back(cell);
        while self.recent_cells.len() > keep {
            self.recent_cells.pop_front();
        }
    }

    /// Recently visited cells other than `current`, for search exclusion.
    pub fn recent_cells_except(&self, current: Cell) -> HashSet<Cell> {
        self.recent_cells.iter().copied().filter(|c| *c != current).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_is_created_lazily_and_kept() {
        let mut agent = AgentState::new();
        assert!(agent.memory().is_none());
        agent.memory_mut().record(Vec2::ONE, Vec2::ZERO, None, 0.0);
        assert_eq!(agent.memory().map(|m| m.positions().len()), Some(1));
        let (memory, _) = agent.minds(10.0);
        assert_eq!(memory.positions().len(), 1);
    }

    #[test]
    fn engagement_clock_starts_on_first_query() {
        let mut agent = AgentState::new();
        assert_eq!(agent.engagement_ms(2_000.0), 0.0);
        assert_eq!(agent.engagement_ms(7_500.0), 5_500.0);
    }

    #[test]
    fn recent_cells_are_bounded() {
        let mut agent = AgentState::new();
        for x in 0..10 {
            agent.visit(Cell::new(x, 0), 4);
            agent.visit(Cell::new(x, 0), 4);
        }
        let recent = agent.recent_cells_except(Cell::new(9, 0));
        assert_eq!(recent.len(), 3);
        assert!(recent.contains(&Cell::new(6, 0)));
        assert!(!recent.contains(&Cell::new(5, 0)));
    }
}
