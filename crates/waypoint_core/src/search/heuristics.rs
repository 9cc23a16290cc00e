//! Goal-distance estimators behind one closed interface.
//!
//! Every search variant takes a [`Heuristic`] value; the node-aware
//! variants (directional bias, learned) get what they need through the
//! arena and the map rather than through bespoke callback signatures.

use serde::{Deserialize, Serialize};

use crate::grid::{OccupancyView, Position};
use crate::search::arena::{NodeIdx, SearchArena};

/// L1 distance between two positions
pub fn manhattan(a: Position, b: Position) -> f64 {
    a.manhattan_distance(b) as f64
}

/// L2 distance between two positions
pub fn euclidean(a: Position, b: Position) -> f64 {
    a.euclidean_distance(b)
}

/// The closed set of goal-distance estimators
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Heuristic {
    /// L1 distance; admissible on a 4-connected grid
    Manhattan,
    /// L2 distance; admissible but weaker than Manhattan here
    Euclidean,
    /// Exact shortest-path length over an obstacle-free grid spanning the
    /// bounding box of node and goal, computed by an inner A* run
    RelaxedProblem,
    /// Linear combination of local obstacle density and L1 distance
    Learned {
        radius: usize,
        obstacle_weight: f64,
        distance_weight: f64,
    },
    /// L1 distance plus a fixed penalty when the last step changed
    /// direction relative to the one before it
    DirectionalBias,
}

impl Heuristic {
    /// The learned heuristic with its stock coefficients
    pub fn learned_default() -> Self {
        Self::Learned {
            radius: 3,
            obstacle_weight: 3.0,
            distance_weight: 1.0,
        }
    }

    /// Estimate remaining cost from `node` to `goal` over `map`
    pub fn estimate<M: OccupancyView>(
        &self,
        map: &M,
        arena: &SearchArena,
        node: NodeIdx,
        goal: Position,
    ) -> f64 {
        let position = arena.node(node).position;
        match self {
            Heuristic::Manhattan => manhattan(position, goal),
            Heuristic::Euclidean => euclidean(position, goal),
            Heuristic::RelaxedProblem => relaxed_problem(position, goal),
            Heuristic::Learned {
                radius,
                obstacle_weight,
                distance_weight,
            } => {
                let density = map.obstacle_density(position, *radius) as f64;
                obstacle_weight * density + distance_weight * manhattan(position, goal)
            }
            Heuristic::DirectionalBias => directional_bias(arena, node, goal),
        }
    }
}

/// Shortest-path length between `a` and `b` with every obstacle relaxed
/// away. The inner search uses plain Manhattan, so the recursion bottoms
/// out after one level.
fn relaxed_problem(a: Position, b: Position) -> f64 {
    let rows = a.row.max(b.row) + 1;
    let cols = a.col.max(b.col) + 1;
    let Ok(open) = crate::grid::Grid::open(rows, cols) else {
        return f64::INFINITY;
    };
    match crate::search::a_star(&open, a, b, &Heuristic::Manhattan) {
        Some(path) => (path.len() - 1) as f64,
        None => f64::INFINITY,
    }
}

/// Manhattan distance plus one when the step into `node` turned
fn directional_bias(arena: &SearchArena, node: NodeIdx, goal: Position) -> f64 {
    let (position, parent, grandparent) = arena.lookback(node);
    let mut h = manhattan(position, goal);
    if let (Some(p), Some(gp)) = (parent, grandparent) {
        let previous = p.direction_from(gp);
        let latest = position.direction_from(p);
        if previous != latest {
            h += 1.0;
        }
    }
    h
}
