//! Grid primitives: positions, cell symbols, ground truth, and per-agent
//! local maps.
//!
//! The ground-truth [`Grid`] is immutable after construction and owned by
//! whoever drives the simulation; agents never read it directly except
//! through sensing. Each agent instead plans against its own [`LocalMap`],
//! which starts fully unknown (bar the goal) and only ever gains knowledge.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{CoreError, Result};

/// Neighbor expansion order shared by every search variant: right, left,
/// down, up. The order is part of the tie-breaking contract.
pub const NEIGHBOR_OFFSETS: [(isize, isize); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

/// A zero-based (row, col) grid coordinate
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// L1 distance to `other`
    pub fn manhattan_distance(&self, other: Position) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }

    /// L2 distance to `other`
    pub fn euclidean_distance(&self, other: Position) -> f64 {
        let dr = self.row.abs_diff(other.row) as f64;
        let dc = self.col.abs_diff(other.col) as f64;
        (dr * dr + dc * dc).sqrt()
    }

    /// Signed unit offset of the step that led from `from` to `self`
    pub fn direction_from(&self, from: Position) -> (isize, isize) {
        (
            self.row as isize - from.row as isize,
            self.col as isize - from.col as isize,
        )
    }

    /// True if `other` is exactly one 4-adjacent step away
    pub fn is_adjacent(&self, other: Position) -> bool {
        self.manhattan_distance(other) == 1
    }

    fn offset(&self, delta: (isize, isize)) -> Option<Position> {
        let row = self.row.checked_add_signed(delta.0)?;
        let col = self.col.checked_add_signed(delta.1)?;
        Some(Position::new(row, col))
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// One cell's content as an agent can know it
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Cell {
    Free,
    Obstacle,
    RobotMarker,
    Goal,
    #[default]
    Unknown,
}

impl Cell {
    /// The single-character wire symbol used by environment files and
    /// renderers: `0 1 R G ?`
    pub fn symbol(&self) -> char {
        match self {
            Cell::Free => '0',
            Cell::Obstacle => '1',
            Cell::RobotMarker => 'R',
            Cell::Goal => 'G',
            Cell::Unknown => '?',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Cell> {
        match symbol {
            '0' => Some(Cell::Free),
            '1' => Some(Cell::Obstacle),
            'R' => Some(Cell::RobotMarker),
            'G' => Some(Cell::Goal),
            '?' => Some(Cell::Unknown),
            _ => None,
        }
    }

    /// Only obstacles block movement; unknown space is optimistically
    /// treated as passable, which is what lets an agent plan through a cell
    /// it has never sensed.
    pub fn is_passable(&self) -> bool {
        !matches!(self, Cell::Obstacle)
    }
}

/// Read access shared by the ground truth and agent local maps, so the
/// search engine can run against either.
pub trait OccupancyView {
    fn rows(&self) -> usize;
    fn cols(&self) -> usize;

    /// Cell content, or `None` outside the grid
    fn cell(&self, position: Position) -> Option<Cell>;

    fn in_bounds(&self, position: Position) -> bool {
        position.row < self.rows() && position.col < self.cols()
    }

    /// In-bounds, non-obstacle neighbors in the fixed expansion order
    fn passable_neighbors(&self, position: Position) -> SmallVec<[Position; 4]> {
        let mut neighbors = SmallVec::new();
        for delta in NEIGHBOR_OFFSETS {
            let Some(next) = position.offset(delta) else {
                continue;
            };
            match self.cell(next) {
                Some(cell) if cell.is_passable() => neighbors.push(next),
                _ => {}
            }
        }
        neighbors
    }

    /// Count of obstacle cells within Chebyshev `radius` of `position`
    fn obstacle_density(&self, position: Position, radius: usize) -> usize {
        let r = radius as isize;
        let mut count = 0;
        for dr in -r..=r {
            for dc in -r..=r {
                if let Some(p) = position.offset((dr, dc)) {
                    if self.cell(p) == Some(Cell::Obstacle) {
                        count += 1;
                    }
                }
            }
        }
        count
    }
}

/// The complete, real grid. Never directly visible to an agent; only the
/// sensing path reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Build a ground-truth grid from row-major cell data. The environment
    /// supplies only free and obstacle cells; anything else is rejected.
    pub fn new(rows: usize, cols: usize, data: Vec<Vec<Cell>>) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(CoreError::EmptyGrid { rows, cols });
        }
        if data.len() != rows {
            return Err(CoreError::GridShapeMismatch {
                declared_rows: rows,
                declared_cols: cols,
                found_rows: data.len(),
                bad_row: None,
            });
        }
        if let Some((index, row)) = data.iter().enumerate().find(|(_, row)| row.len() != cols) {
            return Err(CoreError::GridShapeMismatch {
                declared_rows: rows,
                declared_cols: cols,
                found_rows: data.len(),
                bad_row: Some((index, row.len())),
            });
        }

        let mut cells = Vec::with_capacity(rows * cols);
        for (r, row) in data.into_iter().enumerate() {
            for (c, cell) in row.into_iter().enumerate() {
                if !matches!(cell, Cell::Free | Cell::Obstacle) {
                    return Err(CoreError::InvalidGroundTruthSymbol {
                        position: Position::new(r, c),
                        symbol: cell.symbol(),
                    });
                }
                cells.push(cell);
            }
        }
        Ok(Self { rows, cols, cells })
    }

    /// An obstacle-free grid, used by the relaxed-problem heuristic
    pub fn open(rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(CoreError::EmptyGrid { rows, cols });
        }
        Ok(Self {
            rows,
            cols,
            cells: vec![Cell::Free; rows * cols],
        })
    }

    #[inline]
    fn index(&self, position: Position) -> usize {
        position.row * self.cols + position.col
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, position: Position) -> Option<Cell> {
        if position.row < self.rows && position.col < self.cols {
            Some(self.cells[self.index(position)])
        } else {
            None
        }
    }

    /// Total number of free cells, used to size memory bounds in tests
    pub fn free_cell_count(&self) -> usize {
        self.cells.iter().filter(|c| **c == Cell::Free).count()
    }
}

impl OccupancyView for Grid {
    fn rows(&self) -> usize {
        self.rows
    }

    fn cols(&self) -> usize {
        self.cols
    }

    fn cell(&self, position: Position) -> Option<Cell> {
        self.get(position)
    }
}

/// What the environment collaborator hands the core: dimensions, ground
/// truth, agent starts, and the single goal. Validated as a whole before
/// any simulation state is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentSpec {
    pub rows: usize,
    pub cols: usize,
    /// Row-major ground truth, free and obstacle cells only
    pub cells: Vec<Vec<Cell>>,
    pub agent_starts: Vec<Position>,
    pub goal: Position,
}

impl EnvironmentSpec {
    /// Validate and convert into a ground-truth grid plus placements.
    /// Every malformed-input case is fatal here, before any step runs.
    pub fn into_grid(self) -> Result<(Grid, Vec<Position>, Position)> {
        let grid = Grid::new(self.rows, self.cols, self.cells)?;

        if self.agent_starts.is_empty() {
            return Err(CoreError::NoAgents);
        }
        for (i, start) in self.agent_starts.iter().enumerate() {
            match grid.get(*start) {
                None => {
                    return Err(CoreError::out_of_bounds(
                        format!("agent {i} start"),
                        *start,
                        grid.rows,
                        grid.cols,
                    ));
                }
                Some(Cell::Obstacle) => {
                    return Err(CoreError::on_obstacle(format!("agent {i} start"), *start));
                }
                Some(_) => {}
            }
        }
        match grid.get(self.goal) {
            None => {
                return Err(CoreError::out_of_bounds(
                    "goal",
                    self.goal,
                    grid.rows,
                    grid.cols,
                ));
            }
            Some(Cell::Obstacle) => {
                return Err(CoreError::on_obstacle("goal", self.goal));
            }
            Some(_) => {}
        }

        Ok((grid, self.agent_starts, self.goal))
    }
}

/// An agent's private, partially known view of the grid.
///
/// Cells move from unknown to known through sensing and received facts and
/// never revert; robot markers are a volatile overlay rewritten by the
/// coordinator's refresh phase each step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalMap {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl LocalMap {
    /// A fully unknown map with the goal cell pre-seeded
    pub fn new(rows: usize, cols: usize, goal: Position) -> Self {
        let mut map = Self {
            rows,
            cols,
            cells: vec![Cell::Unknown; rows * cols],
        };
        map.set(goal, Cell::Goal);
        map
    }

    #[inline]
    fn index(&self, position: Position) -> usize {
        position.row * self.cols + position.col
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, position: Position) -> Option<Cell> {
        if position.row < self.rows && position.col < self.cols {
            Some(self.cells[self.index(position)])
        } else {
            None
        }
    }

    /// Unconditional write, used by sensing (ground truth wins) and by the
    /// vacated-cell bookkeeping in movement. Out-of-bounds writes are a
    /// no-op.
    pub fn set(&mut self, position: Position, cell: Cell) {
        if position.row < self.rows && position.col < self.cols {
            let idx = self.index(position);
            self.cells[idx] = cell;
        }
    }

    /// Adopt a fact only if the cell is still unknown. Returns whether the
    /// map changed.
    pub fn absorb(&mut self, position: Position, cell: Cell) -> bool {
        match self.get(position) {
            Some(Cell::Unknown) => {
                self.set(position, cell);
                true
            }
            _ => false,
        }
    }

    /// Clear every robot marker back to free space
    pub fn clear_markers(&mut self) {
        for cell in &mut self.cells {
            if *cell == Cell::RobotMarker {
                *cell = Cell::Free;
            }
        }
    }

    /// Stamp a robot marker at `position`
    pub fn stamp_marker(&mut self, position: Position) {
        self.set(position, Cell::RobotMarker);
    }

    /// Every still-unknown position in row-major order
    pub fn unknown_cells(&self) -> Vec<Position> {
        let mut unknown = Vec::new();
        for row in 0..self.rows {
            for col in 0..self.cols {
                let p = Position::new(row, col);
                if self.get(p) == Some(Cell::Unknown) {
                    unknown.push(p);
                }
            }
        }
        unknown
    }

    /// Count of cells whose content is known
    pub fn known_count(&self) -> usize {
        self.cells.iter().filter(|c| **c != Cell::Unknown).count()
    }

    /// Symbol rows for the rendering collaborator, one string per grid row
    pub fn render_rows(&self) -> Vec<String> {
        self.cells
            .chunks(self.cols)
            .map(|row| row.iter().map(Cell::symbol).collect())
            .collect()
    }
}

impl OccupancyView for LocalMap {
    fn rows(&self) -> usize {
        self.rows
    }

    fn cols(&self) -> usize {
        self.cols
    }

    fn cell(&self, position: Position) -> Option<Cell> {
        self.get(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn open_rows(rows: usize, cols: usize) -> Vec<Vec<Cell>> {
        vec![vec![Cell::Free; cols]; rows]
    }

    #[test]
    fn test_distances() {
        let a = Position::new(0, 0);
        let b = Position::new(3, 4);
        assert_eq!(a.manhattan_distance(b), 7);
        assert!((a.euclidean_distance(b) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_neighbor_order_is_right_left_down_up() {
        let grid = Grid::open(3, 3).unwrap();
        let neighbors = grid.passable_neighbors(Position::new(1, 1));
        assert_eq!(
            neighbors.as_slice(),
            &[
                Position::new(1, 2),
                Position::new(1, 0),
                Position::new(2, 1),
                Position::new(0, 1),
            ]
        );
    }

    #[test]
    fn test_neighbors_clip_bounds_and_obstacles() {
        let mut data = open_rows(2, 2);
        data[0][1] = Cell::Obstacle;
        let grid = Grid::new(2, 2, data).unwrap();
        let neighbors = grid.passable_neighbors(Position::new(0, 0));
        assert_eq!(neighbors.as_slice(), &[Position::new(1, 0)]);
    }

    #[test]
    fn test_grid_rejects_shape_mismatch() {
        let err = Grid::new(2, 2, open_rows(3, 2)).unwrap_err();
        assert!(matches!(err, CoreError::GridShapeMismatch { .. }));

        let mut ragged = open_rows(2, 2);
        ragged[1].push(Cell::Free);
        let err = Grid::new(2, 2, ragged).unwrap_err();
        assert!(matches!(
            err,
            CoreError::GridShapeMismatch {
                bad_row: Some((1, 3)),
                ..
            }
        ));
    }

    #[test]
    fn test_grid_rejects_derived_symbols() {
        let mut data = open_rows(2, 2);
        data[0][0] = Cell::Goal;
        let err = Grid::new(2, 2, data).unwrap_err();
        assert!(matches!(err, CoreError::InvalidGroundTruthSymbol { .. }));
    }

    #[test]
    fn test_environment_spec_validation() {
        let spec = EnvironmentSpec {
            rows: 2,
            cols: 2,
            cells: open_rows(2, 2),
            agent_starts: vec![Position::new(0, 0)],
            goal: Position::new(5, 5),
        };
        let err = spec.into_grid().unwrap_err();
        assert!(matches!(err, CoreError::PositionOutOfBounds { .. }));

        let mut cells = open_rows(2, 2);
        cells[1][1] = Cell::Obstacle;
        let spec = EnvironmentSpec {
            rows: 2,
            cols: 2,
            cells,
            agent_starts: vec![Position::new(0, 0)],
            goal: Position::new(1, 1),
        };
        let err = spec.into_grid().unwrap_err();
        assert!(matches!(err, CoreError::PositionOnObstacle { .. }));
    }

    #[test]
    fn test_local_map_starts_unknown_with_goal() {
        let map = LocalMap::new(2, 2, Position::new(1, 1));
        assert_eq!(map.get(Position::new(0, 0)), Some(Cell::Unknown));
        assert_eq!(map.get(Position::new(1, 1)), Some(Cell::Goal));
        assert_eq!(map.known_count(), 1);
    }

    #[test]
    fn test_absorb_only_fills_unknowns() {
        let mut map = LocalMap::new(2, 2, Position::new(1, 1));
        assert!(map.absorb(Position::new(0, 0), Cell::Obstacle));
        assert!(!map.absorb(Position::new(0, 0), Cell::Free));
        assert_eq!(map.get(Position::new(0, 0)), Some(Cell::Obstacle));
        assert!(!map.absorb(Position::new(1, 1), Cell::Free));
    }

    #[test]
    fn test_marker_refresh_cycle() {
        let mut map = LocalMap::new(2, 3, Position::new(0, 0));
        map.stamp_marker(Position::new(1, 1));
        assert_eq!(map.get(Position::new(1, 1)), Some(Cell::RobotMarker));
        map.clear_markers();
        assert_eq!(map.get(Position::new(1, 1)), Some(Cell::Free));
    }

    #[test]
    fn test_render_rows_uses_wire_symbols() {
        let mut map = LocalMap::new(2, 2, Position::new(0, 1));
        map.set(Position::new(0, 0), Cell::Free);
        map.set(Position::new(1, 0), Cell::Obstacle);
        assert_eq!(map.render_rows(), vec!["0G".to_string(), "1?".to_string()]);
    }

    #[test]
    fn test_symbol_round_trip() {
        for cell in [
            Cell::Free,
            Cell::Obstacle,
            Cell::RobotMarker,
            Cell::Goal,
            Cell::Unknown,
        ] {
            assert_eq!(Cell::from_symbol(cell.symbol()), Some(cell));
        }
        assert_eq!(Cell::from_symbol('x'), None);
    }
}
