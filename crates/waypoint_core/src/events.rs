//! Flagged occurrences surfaced to the reporting collaborator.
//!
//! None of these are errors: they are the anomalies and coordination
//! outcomes a run narrates while continuing. The serious one is
//! [`SimEvent::RealityMismatch`], the deliberate partial-observability
//! hazard where an agent walks onto an obstacle its local map had not
//! discovered.

use serde::{Deserialize, Serialize};

use crate::grid::{Cell, Position};
use crate::id::AgentId;

/// One flagged occurrence during a simulation step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    /// An agent moved onto a cell its local map believed passable but
    /// ground truth marks as an obstacle. The move stands; the mismatch is
    /// recorded, not prevented.
    RealityMismatch {
        agent: AgentId,
        position: Position,
        /// What the local map held for the cell at the moment of the move
        believed: Cell,
        actual: Cell,
    },

    /// An agent yielded a contested target cell to a lower-id agent
    PriorityWait {
        agent: AgentId,
        target: Position,
        yielded_to: AgentId,
    },

    /// An agent held position because its target cell was occupied
    OccupancyWait {
        agent: AgentId,
        target: Position,
        occupied_by: AgentId,
    },

    /// An agent entered its own goal cell despite another agent standing
    /// on it; goal entry is always exempt from the occupancy rule
    GoalEntryWhileOccupied { agent: AgentId, target: Position },

    /// An agent hit the wait threshold and was forced to replan
    ForcedReplan { agent: AgentId, waits: u32 },
}

impl SimEvent {
    /// The agent the event happened to
    pub fn agent(&self) -> AgentId {
        match self {
            SimEvent::RealityMismatch { agent, .. }
            | SimEvent::PriorityWait { agent, .. }
            | SimEvent::OccupancyWait { agent, .. }
            | SimEvent::GoalEntryWhileOccupied { agent, .. }
            | SimEvent::ForcedReplan { agent, .. } => *agent,
        }
    }

    pub fn is_reality_mismatch(&self) -> bool {
        matches!(self, SimEvent::RealityMismatch { .. })
    }
}
