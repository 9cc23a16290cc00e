use miette::Diagnostic;
use thiserror::Error;

use crate::grid::Position;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Error, Diagnostic, Debug)]
pub enum CoreError {
    #[error("Grid shape mismatch")]
    #[diagnostic(
        code(waypoint_core::grid_shape_mismatch),
        help("The environment declared {declared_rows}x{declared_cols} but the cell data does not match")
    )]
    GridShapeMismatch {
        declared_rows: usize,
        declared_cols: usize,
        found_rows: usize,
        /// Index and length of the first row that disagrees with the declared width, if any
        bad_row: Option<(usize, usize)>,
    },

    #[error("Grid dimensions must be non-zero")]
    #[diagnostic(
        code(waypoint_core::empty_grid),
        help("Both row and column counts must be at least 1")
    )]
    EmptyGrid { rows: usize, cols: usize },

    #[error("Ground truth may only contain free and obstacle cells")]
    #[diagnostic(
        code(waypoint_core::invalid_ground_truth),
        help("Robot markers, goals, and unknowns are derived state; the environment supplies only '0' and '1'")
    )]
    InvalidGroundTruthSymbol { position: Position, symbol: char },

    #[error("{what} position is out of bounds")]
    #[diagnostic(
        code(waypoint_core::position_out_of_bounds),
        help("Grid is {rows}x{cols}; coordinates are zero-based (row, col)")
    )]
    PositionOutOfBounds {
        what: String,
        position: Position,
        rows: usize,
        cols: usize,
    },

    #[error("{what} position lies on an obstacle")]
    #[diagnostic(
        code(waypoint_core::position_on_obstacle),
        help("Agent starts and the goal must be placed on free cells of the ground truth")
    )]
    PositionOnObstacle { what: String, position: Position },

    #[error("No agent start positions were supplied")]
    #[diagnostic(
        code(waypoint_core::no_agents),
        help("The environment must provide at least one agent start position")
    )]
    NoAgents,

    #[error("Too many agents")]
    #[diagnostic(
        code(waypoint_core::too_many_agents),
        help("The simulation supports at most {max} agents; {requested} starts were supplied")
    )]
    TooManyAgents { requested: usize, max: usize },

    #[error("Configuration error")]
    #[diagnostic(
        code(waypoint_core::configuration_error),
        help("Field '{field}' has invalid value '{value}': {reason}")
    )]
    ConfigurationError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration could not be parsed")]
    #[diagnostic(
        code(waypoint_core::configuration_parse_failed),
        help("The configuration must be valid TOML")
    )]
    ConfigurationParseFailed {
        #[source]
        cause: Box<toml::de::Error>,
    },
}

// Helper constructors for the common construction-time failures
impl CoreError {
    pub fn out_of_bounds(
        what: impl Into<String>,
        position: Position,
        rows: usize,
        cols: usize,
    ) -> Self {
        Self::PositionOutOfBounds {
            what: what.into(),
            position,
            rows,
            cols,
        }
    }

    pub fn on_obstacle(what: impl Into<String>, position: Position) -> Self {
        Self::PositionOnObstacle {
            what: what.into(),
            position,
        }
    }

    pub fn config_error(
        field: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::ConfigurationError {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<toml::de::Error> for CoreError {
    fn from(cause: toml::de::Error) -> Self {
        Self::ConfigurationParseFailed {
            cause: Box::new(cause),
        }
    }
}
