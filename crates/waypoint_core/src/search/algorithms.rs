//! The best-first search family.
//!
//! All variants share one expansion loop and differ only in how they
//! combine path cost and heuristic into a frontier priority; the
//! bounded-memory variant additionally prunes its frontier. Every function
//! returns `Some(start..=goal)` or `None` — never an error.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use ordered_float::OrderedFloat;

use crate::grid::{OccupancyView, Position};
use crate::search::arena::{NodeIdx, SearchArena};
use crate::search::heuristics::{Heuristic, manhattan};

/// How a variant turns (g, h) into frontier priority
#[derive(Debug, Clone, Copy)]
enum CostPolicy {
    /// f = g + h
    AStar,
    /// f = h
    Greedy,
    /// f = g + weight * h
    Weighted(f64),
    /// f = g + (1 + h / span) * h, span fixed at the start-goal distance
    DynamicWeighted { span: f64 },
}

impl CostPolicy {
    fn priority(&self, g: f64, h: f64) -> f64 {
        match self {
            CostPolicy::AStar => g + h,
            CostPolicy::Greedy => h,
            CostPolicy::Weighted(weight) => g + weight * h,
            CostPolicy::DynamicWeighted { span } => {
                let ratio = if *span != 0.0 { h / span } else { 1.0 };
                g + (1.0 + ratio) * h
            }
        }
    }
}

/// A* search: optimal under an admissible heuristic
pub fn a_star<M: OccupancyView>(
    map: &M,
    start: Position,
    goal: Position,
    heuristic: &Heuristic,
) -> Option<Vec<Position>> {
    best_first(map, start, goal, heuristic, CostPolicy::AStar)
}

/// Greedy best-first search: expands purely by heuristic, not optimal
pub fn greedy_best_first<M: OccupancyView>(
    map: &M,
    start: Position,
    goal: Position,
    heuristic: &Heuristic,
) -> Option<Vec<Position>> {
    best_first(map, start, goal, heuristic, CostPolicy::Greedy)
}

/// Weighted A*: a weight above 1 trades optimality for speed
pub fn weighted_a_star<M: OccupancyView>(
    map: &M,
    start: Position,
    goal: Position,
    heuristic: &Heuristic,
    weight: f64,
) -> Option<Vec<Position>> {
    best_first(map, start, goal, heuristic, CostPolicy::Weighted(weight))
}

/// A* with a weight that decays toward 1 as the remaining Manhattan
/// distance shrinks, biasing exploration early and cost near the goal
pub fn dynamic_weighted_a_star<M: OccupancyView>(
    map: &M,
    start: Position,
    goal: Position,
) -> Option<Vec<Position>> {
    let span = manhattan(start, goal);
    best_first(
        map,
        start,
        goal,
        &Heuristic::Manhattan,
        CostPolicy::DynamicWeighted { span },
    )
}

fn best_first<M: OccupancyView>(
    map: &M,
    start: Position,
    goal: Position,
    heuristic: &Heuristic,
    policy: CostPolicy,
) -> Option<Vec<Position>> {
    let mut arena = SearchArena::new();
    let mut closed: HashSet<Position> = HashSet::new();
    // Min-heap on (priority, arena index); index order doubles as FIFO
    // insertion order, so ties resolve toward the earliest-generated node.
    let mut open: BinaryHeap<Reverse<(OrderedFloat<f64>, usize)>> = BinaryHeap::new();

    let root = arena.push(start, None);
    let h = heuristic.estimate(map, &arena, root, goal);
    let f = policy.priority(0.0, h);
    {
        let node = arena.node_mut(root);
        node.h = h;
        node.f = f;
    }
    open.push(Reverse((OrderedFloat(f), root.0)));

    while let Some(Reverse((_, raw))) = open.pop() {
        let current = NodeIdx(raw);
        let position = arena.node(current).position;
        if closed.contains(&position) {
            continue;
        }
        closed.insert(position);

        if position == goal {
            return Some(arena.reconstruct_path(current));
        }

        for next in map.passable_neighbors(position) {
            if closed.contains(&next) {
                continue;
            }
            let g = arena.node(current).g + 1.0;
            let child = arena.push(next, Some(current));
            let h = heuristic.estimate(map, &arena, child, goal);
            let f = policy.priority(g, h);
            let node = arena.node_mut(child);
            node.g = g;
            node.h = h;
            node.f = f;
            open.push(Reverse((OrderedFloat(f), child.0)));
        }
    }

    None
}

/// SMA*-style search: A* ordering under a frontier-size bound.
///
/// When the frontier grows past `max_nodes`, the node with the worst
/// priority (highest f, ties toward greater depth) is forgotten and its f
/// backed up to its parent as the minimum f among the parent's remaining
/// children, so the subtree can be regenerated later with an honest bound.
/// The frontier here is a plain vector scanned against live node costs:
/// backups must influence later evictions, and the bound keeps it small.
pub fn bounded_memory<M: OccupancyView>(
    map: &M,
    start: Position,
    goal: Position,
    heuristic: &Heuristic,
    max_nodes: usize,
) -> Option<Vec<Position>> {
    let mut arena = SearchArena::new();
    let mut closed: HashSet<Position> = HashSet::new();
    let mut open: Vec<NodeIdx> = Vec::new();

    let root = arena.push(start, None);
    let h = heuristic.estimate(map, &arena, root, goal);
    {
        let node = arena.node_mut(root);
        node.h = h;
        node.f = h;
    }
    open.push(root);

    while !open.is_empty() {
        if open.len() > max_nodes {
            forget_worst(&mut arena, &mut open);
        }

        // Pop the best: lowest f, ties toward the earliest-generated node
        let slot = open
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                let na = arena.node(**a);
                let nb = arena.node(**b);
                na.f.total_cmp(&nb.f).then(a.0.cmp(&(b.0)))
            })
            .map(|(slot, _)| slot)?;
        let current = open.remove(slot);

        let position = arena.node(current).position;
        if closed.contains(&position) {
            continue;
        }
        closed.insert(position);

        if position == goal {
            return Some(arena.reconstruct_path(current));
        }

        for next in map.passable_neighbors(position) {
            if closed.contains(&next) {
                continue;
            }
            let g = arena.node(current).g + 1.0;
            let child = arena.push(next, Some(current));
            let h = heuristic.estimate(map, &arena, child, goal);
            let node = arena.node_mut(child);
            node.g = g;
            node.h = h;
            node.f = g + h;
            open.push(child);
        }
    }

    None
}

/// Evict the worst frontier node and back its f up to its parent
fn forget_worst(arena: &mut SearchArena, open: &mut Vec<NodeIdx>) {
    let Some(slot) = open
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            let na = arena.node(**a);
            let nb = arena.node(**b);
            na.f.total_cmp(&nb.f)
                .then(na.depth.cmp(&nb.depth))
                .then(a.0.cmp(&b.0))
        })
        .map(|(slot, _)| slot)
    else {
        return;
    };
    let worst = open.remove(slot);

    if let Some(parent) = arena.node(worst).parent {
        let best_sibling = arena
            .node(parent)
            .children
            .iter()
            .filter(|child| **child != worst)
            .map(|child| arena.node(*child).f)
            .min_by(f64::total_cmp);
        if let Some(best) = best_sibling {
            let node = arena.node_mut(parent);
            node.f = node.f.max(best);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Cell, Grid};
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn grid_from(rows: &[&str]) -> Grid {
        let data: Vec<Vec<Cell>> = rows
            .iter()
            .map(|row| row.chars().map(|c| Cell::from_symbol(c).unwrap()).collect())
            .collect();
        Grid::new(data.len(), data[0].len(), data).unwrap()
    }

    fn assert_valid_path(grid: &Grid, path: &[Position], start: Position, goal: Position) {
        assert_eq!(*path.first().unwrap(), start);
        assert_eq!(*path.last().unwrap(), goal);
        for pair in path.windows(2) {
            assert!(
                pair[0].is_adjacent(pair[1]),
                "steps {} -> {} are not 4-adjacent",
                pair[0],
                pair[1]
            );
        }
        for step in path {
            assert_ne!(grid.get(*step), Some(Cell::Obstacle), "path crosses {step}");
        }
    }

    fn random_grid(rng: &mut StdRng, rows: usize, cols: usize) -> Grid {
        let data: Vec<Vec<Cell>> = (0..rows)
            .map(|r| {
                (0..cols)
                    .map(|c| {
                        let corner = (r == 0 && c == 0) || (r == rows - 1 && c == cols - 1);
                        if !corner && rng.gen_bool(0.25) {
                            Cell::Obstacle
                        } else {
                            Cell::Free
                        }
                    })
                    .collect()
            })
            .collect();
        Grid::new(rows, cols, data).unwrap()
    }

    #[test]
    fn test_a_star_three_by_three_scenario() {
        let grid = grid_from(&["000", "010", "000"]);
        let path = a_star(
            &grid,
            Position::new(0, 0),
            Position::new(2, 2),
            &Heuristic::Manhattan,
        )
        .unwrap();
        assert_eq!(
            path,
            vec![
                Position::new(0, 0),
                Position::new(0, 1),
                Position::new(0, 2),
                Position::new(1, 2),
                Position::new(2, 2),
            ]
        );
    }

    #[test]
    fn test_a_star_open_grid_matches_manhattan() {
        let grid = Grid::open(8, 11).unwrap();
        let start = Position::new(1, 2);
        let goal = Position::new(6, 9);
        let path = a_star(&grid, start, goal, &Heuristic::Manhattan).unwrap();
        assert_eq!(path.len() - 1, start.manhattan_distance(goal));
        assert_valid_path(&grid, &path, start, goal);
    }

    #[test]
    fn test_a_star_start_equals_goal() {
        let grid = Grid::open(3, 3).unwrap();
        let p = Position::new(1, 1);
        assert_eq!(a_star(&grid, p, p, &Heuristic::Manhattan), Some(vec![p]));
    }

    #[test]
    fn test_a_star_no_path_returns_none() {
        let grid = grid_from(&["010", "111", "000"]);
        assert_eq!(
            a_star(
                &grid,
                Position::new(0, 0),
                Position::new(2, 2),
                &Heuristic::Manhattan
            ),
            None
        );
    }

    #[test]
    fn test_all_variants_agree_on_endpoints_and_validity() {
        let grid = grid_from(&["00000", "01110", "00010", "01010", "00000"]);
        let start = Position::new(0, 0);
        let goal = Position::new(4, 4);

        let paths = [
            a_star(&grid, start, goal, &Heuristic::Manhattan),
            greedy_best_first(&grid, start, goal, &Heuristic::Manhattan),
            weighted_a_star(&grid, start, goal, &Heuristic::Manhattan, 1.5),
            weighted_a_star(&grid, start, goal, &Heuristic::Manhattan, 3.0),
            dynamic_weighted_a_star(&grid, start, goal),
            bounded_memory(&grid, start, goal, &Heuristic::Manhattan, 50),
        ];
        for path in paths {
            assert_valid_path(&grid, &path.unwrap(), start, goal);
        }
    }

    #[test]
    fn test_suboptimal_variants_never_beat_a_star() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..40 {
            let grid = random_grid(&mut rng, 9, 9);
            let start = Position::new(0, 0);
            let goal = Position::new(8, 8);

            let Some(optimal) = a_star(&grid, start, goal, &Heuristic::Manhattan) else {
                // unreachable goal: every complete variant must agree
                assert_eq!(
                    greedy_best_first(&grid, start, goal, &Heuristic::Manhattan),
                    None
                );
                assert_eq!(
                    weighted_a_star(&grid, start, goal, &Heuristic::Manhattan, 2.0),
                    None
                );
                continue;
            };

            let greedy = greedy_best_first(&grid, start, goal, &Heuristic::Manhattan).unwrap();
            let weighted = weighted_a_star(&grid, start, goal, &Heuristic::Manhattan, 2.0).unwrap();
            assert!(greedy.len() >= optimal.len());
            assert!(weighted.len() >= optimal.len());
            assert_valid_path(&grid, &greedy, start, goal);
            assert_valid_path(&grid, &weighted, start, goal);
        }
    }

    #[test]
    fn test_bounded_memory_with_roomy_bound_matches_a_star_cost() {
        let mut rng = StdRng::seed_from_u64(0xb0b);
        for _ in 0..25 {
            let grid = random_grid(&mut rng, 7, 7);
            let start = Position::new(0, 0);
            let goal = Position::new(6, 6);
            let bound = grid.free_cell_count();

            let optimal = a_star(&grid, start, goal, &Heuristic::Manhattan);
            let bounded = bounded_memory(&grid, start, goal, &Heuristic::Manhattan, bound);
            match (optimal, bounded) {
                (Some(a), Some(b)) => assert_eq!(a.len(), b.len()),
                (None, None) => {}
                (a, b) => panic!("disagreement: a_star={a:?} bounded={b:?}"),
            }
        }
    }

    #[test]
    fn test_bounded_memory_survives_tight_bound() {
        let grid = Grid::open(6, 6).unwrap();
        let start = Position::new(0, 0);
        let goal = Position::new(5, 5);
        let path = bounded_memory(&grid, start, goal, &Heuristic::Manhattan, 4).unwrap();
        assert_valid_path(&grid, &path, start, goal);
    }

    #[test]
    fn test_dynamic_weight_decays_toward_cost_uniform() {
        // remaining ratio 1 at the start, 0 at the goal
        let policy = CostPolicy::DynamicWeighted { span: 10.0 };
        assert_eq!(policy.priority(0.0, 10.0), 20.0);
        assert_eq!(policy.priority(8.0, 2.0), 8.0 + 1.2 * 2.0);
        assert_eq!(policy.priority(10.0, 0.0), 10.0);

        // degenerate zero-span search still terminates
        let zero = CostPolicy::DynamicWeighted { span: 0.0 };
        assert_eq!(zero.priority(0.0, 3.0), 6.0);
    }

    #[test]
    fn test_directional_bias_prefers_straight_runs() {
        let grid = Grid::open(5, 5).unwrap();
        let start = Position::new(0, 0);
        let goal = Position::new(0, 4);
        let path = a_star(&grid, start, goal, &Heuristic::DirectionalBias).unwrap();
        // a straight corridor run should come back without detours
        assert_eq!(path.len() - 1, 4);
        assert!(path.iter().all(|p| p.row == 0));
    }

    #[test]
    fn test_unknown_cells_are_planned_through() {
        use crate::grid::LocalMap;
        // entirely unknown local map except the goal: optimism routes
        // straight through unsensed space
        let map = LocalMap::new(4, 4, Position::new(3, 3));
        let path = a_star(
            &map,
            Position::new(0, 0),
            Position::new(3, 3),
            &Heuristic::Manhattan,
        )
        .unwrap();
        assert_eq!(path.len() - 1, 6);
    }
}
