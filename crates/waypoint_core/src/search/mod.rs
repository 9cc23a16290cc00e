//! Stateless grid search engine.
//!
//! Heuristic best-first search over any [`OccupancyView`]: A*, greedy
//! best-first, weighted and dynamically weighted A*, and an SMA*-style
//! bounded-memory variant, plus the heuristic family they share. Searches
//! allocate a per-call node arena and treat only obstacles as blocking;
//! unknown space is passable by design.
//!
//! [`OccupancyView`]: crate::grid::OccupancyView

mod algorithms;
mod arena;
mod heuristics;

pub use algorithms::{
    a_star, bounded_memory, dynamic_weighted_a_star, greedy_best_first, weighted_a_star,
};
pub use arena::{NodeIdx, SearchArena, SearchNode};
pub use heuristics::{Heuristic, euclidean, manhattan};
