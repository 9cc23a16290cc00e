//! The partial-knowledge agent: senses, plans, moves, and trades facts.
//!
//! An agent never reads ground truth except through [`Agent::sense`]; all
//! planning runs against its own local map. Movement is deliberately
//! credulous: if the plan routes through a cell the map has never seen and
//! reality turns out to be an obstacle, the agent still moves there and the
//! mismatch is surfaced as an event, not prevented. That hazard is the
//! point of the model.

use std::collections::{BTreeMap, HashSet, VecDeque};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::coordination::PositionRegistry;
use crate::events::SimEvent;
use crate::grid::{Cell, Grid, LocalMap, Position};
use crate::id::AgentId;
use crate::search::{Heuristic, a_star};

/// One discovered cell of ground truth. Immutable once recorded.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
pub struct Fact {
    pub position: Position,
    pub symbol: Cell,
}

/// Where an agent is in its lifecycle
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Created,
    Sensing,
    Planning,
    /// Following a path that ends at the goal
    Moving,
    /// Following a fallback path toward the nearest reachable unknown cell
    Exploring,
    AtGoal,
    /// No path to the goal and no reachable unknown left
    Stuck,
}

/// A mobile agent with a private partial view of the grid
#[derive(Debug, Clone)]
pub struct Agent {
    id: AgentId,
    start: Position,
    goal: Position,
    sensor_radius: usize,
    position: Position,
    path: VecDeque<Position>,
    local_map: LocalMap,
    record: Vec<Fact>,
    seen: HashSet<Fact>,
    wait_count: u32,
    state: AgentState,
}

impl Agent {
    /// Create an agent and perform its initial sense of the surroundings
    pub fn new(
        id: AgentId,
        start: Position,
        goal: Position,
        sensor_radius: usize,
        grid: &Grid,
    ) -> Self {
        let mut agent = Self {
            id,
            start,
            goal,
            sensor_radius,
            position: start,
            path: VecDeque::new(),
            local_map: LocalMap::new(grid.rows(), grid.cols(), goal),
            record: Vec::new(),
            seen: HashSet::new(),
            wait_count: 0,
            state: AgentState::Created,
        };
        agent.record_fact(Fact {
            position: goal,
            symbol: Cell::Goal,
        });
        agent.sense(grid);
        agent
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn goal(&self) -> Position {
        self.goal
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn local_map(&self) -> &LocalMap {
        &self.local_map
    }

    pub fn record(&self) -> &[Fact] {
        &self.record
    }

    /// The next cell this agent intends to step onto, if any
    pub fn next_step(&self) -> Option<Position> {
        self.path.front().copied()
    }

    pub fn has_path(&self) -> bool {
        !self.path.is_empty()
    }

    pub fn planned_path(&self) -> impl Iterator<Item = Position> + '_ {
        self.path.iter().copied()
    }

    pub fn at_goal(&self) -> bool {
        self.position == self.goal
    }

    pub fn wait_count(&self) -> u32 {
        self.wait_count
    }

    /// Record one skipped turn; returns the new count
    pub fn register_wait(&mut self) -> u32 {
        self.wait_count += 1;
        self.wait_count
    }

    pub fn reset_wait(&mut self) {
        self.wait_count = 0;
    }

    fn record_fact(&mut self, fact: Fact) {
        if self.seen.insert(fact) {
            self.record.push(fact);
        }
    }

    /// Copy ground truth into the local map for every cell within the
    /// sensor radius (grid-bounds clipped), recording anything new.
    /// Idempotent while position and ground truth are unchanged.
    pub fn sense(&mut self, grid: &Grid) {
        let radius = self.sensor_radius as isize;
        for dr in -radius..=radius {
            for dc in -radius..=radius {
                let Some(row) = self.position.row.checked_add_signed(dr) else {
                    continue;
                };
                let Some(col) = self.position.col.checked_add_signed(dc) else {
                    continue;
                };
                let observed = Position::new(row, col);
                let Some(truth) = grid.get(observed) else {
                    continue;
                };
                self.local_map.set(observed, truth);
                self.record_fact(Fact {
                    position: observed,
                    symbol: truth,
                });
            }
        }
        if self.state == AgentState::Created {
            self.state = AgentState::Sensing;
        }
    }

    /// Plan a path to the goal on the local map. If the goal is
    /// unreachable, fall back to exploring toward the nearest reachable
    /// unknown cell; failing that too, the agent is stuck.
    pub fn plan(&mut self) {
        self.state = AgentState::Planning;
        tracing::debug!(
            agent = %self.id,
            from = %self.position,
            to = %self.goal,
            "planning path"
        );

        if let Some(path) = a_star(&self.local_map, self.position, self.goal, &Heuristic::Manhattan)
        {
            self.adopt_path(path, AgentState::Moving);
            tracing::debug!(agent = %self.id, steps = self.path.len(), "path to goal found");
            return;
        }

        tracing::debug!(agent = %self.id, "no path to goal; trying to explore unknowns");
        let mut unknowns = self.local_map.unknown_cells();
        unknowns.sort_by_key(|p| p.manhattan_distance(self.position));
        for target in unknowns {
            if let Some(path) = a_star(&self.local_map, self.position, target, &Heuristic::Manhattan)
            {
                self.adopt_path(path, AgentState::Exploring);
                tracing::debug!(agent = %self.id, target = %target, "exploring toward unknown");
                return;
            }
        }

        self.path.clear();
        self.state = if self.at_goal() {
            AgentState::AtGoal
        } else {
            tracing::debug!(agent = %self.id, "no reachable unknowns; agent is stuck");
            AgentState::Stuck
        };
    }

    fn adopt_path(&mut self, path: Vec<Position>, state: AgentState) {
        // the first entry is the current cell
        self.path = path.into_iter().skip(1).collect();
        self.state = if self.path.is_empty() && self.at_goal() {
            AgentState::AtGoal
        } else {
            state
        };
    }

    /// Update goal and plan again
    pub fn replan(&mut self, new_goal: Position) {
        self.goal = new_goal;
        self.plan();
    }

    /// Take one step along the planned path.
    ///
    /// The vacated cell is marked free in the local map, the new position
    /// is adopted even when ground truth there is an obstacle (yielding a
    /// [`SimEvent::RealityMismatch`]), the shared registry is updated, and
    /// the agent re-senses from where it landed.
    pub fn step(&mut self, grid: &Grid, registry: &mut PositionRegistry) -> Option<SimEvent> {
        let Some(next) = self.path.pop_front() else {
            tracing::debug!(agent = %self.id, "no path to follow");
            return None;
        };

        let believed = self.local_map.get(next).unwrap_or(Cell::Unknown);
        self.local_map.set(self.position, Cell::Free);

        let event = if grid.get(next) == Some(Cell::Obstacle) {
            tracing::warn!(
                agent = %self.id,
                position = %next,
                believed = ?believed,
                "phased through an obstacle the local map had not ruled out"
            );
            Some(SimEvent::RealityMismatch {
                agent: self.id,
                position: next,
                believed,
                actual: Cell::Obstacle,
            })
        } else {
            None
        };

        self.position = next;
        registry.update(self.id, next);
        tracing::debug!(agent = %self.id, position = %next, "moved");

        self.sense(grid);
        if self.at_goal() {
            self.state = AgentState::AtGoal;
        }
        event
    }

    /// The full fact record as a position-to-symbol mapping
    pub fn share(&self) -> BTreeMap<Position, Cell> {
        let mut facts = BTreeMap::new();
        for fact in &self.record {
            facts.insert(fact.position, fact.symbol);
        }
        facts
    }

    /// Adopt every fact whose cell is still unknown locally; replans if
    /// anything new was learned. Returns whether the map changed.
    pub fn receive(&mut self, facts: &BTreeMap<Position, Cell>) -> bool {
        let mut adopted = false;
        for (&position, &symbol) in facts {
            if self.local_map.absorb(position, symbol) {
                self.record_fact(Fact { position, symbol });
                adopted = true;
            }
        }
        if adopted {
            tracing::debug!(agent = %self.id, "received new facts; replanning");
            self.plan();
        }
        adopted
    }

    /// Rewrite the robot-marker overlay from the current global positions
    pub fn refresh_markers<I: IntoIterator<Item = Position>>(&mut self, positions: I) {
        self.local_map.clear_markers();
        for position in positions {
            self.local_map.stamp_marker(position);
        }
    }
}
