//! The shared position registry.
//!
//! Originally ambient global state; here an explicit object owned by the
//! coordinator and lent to agents during execution, so independent
//! simulations never observe each other.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::grid::Position;
use crate::id::AgentId;

/// Current position of every agent in one simulation, keyed by id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionRegistry {
    positions: BTreeMap<AgentId, Position>,
}

impl PositionRegistry {
    /// Seed the registry, normally with the agents' start positions
    pub fn new<I: IntoIterator<Item = (AgentId, Position)>>(entries: I) -> Self {
        Self {
            positions: entries.into_iter().collect(),
        }
    }

    /// Record an agent's new position. Written only by the moving agent
    /// during the execution phase.
    pub fn update(&mut self, agent: AgentId, position: Position) {
        self.positions.insert(agent, position);
    }

    pub fn get(&self, agent: AgentId) -> Option<Position> {
        self.positions.get(&agent).copied()
    }

    /// All entries in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = (AgentId, Position)> + '_ {
        self.positions.iter().map(|(id, pos)| (*id, *pos))
    }

    /// The id of an agent currently standing on `position`, other than
    /// `excluding` itself
    pub fn occupant(&self, position: Position, excluding: AgentId) -> Option<AgentId> {
        self.positions
            .iter()
            .find(|(id, p)| **id != excluding && **p == position)
            .map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
