//! Simulation configuration.
//!
//! All knobs have the stock defaults and can be overridden from a TOML
//! document. The core never touches the filesystem; callers read the file
//! and hand the text to [`SimulationConfig::from_toml_str`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::search::Heuristic;

/// Top-level configuration for one simulation run
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SimulationConfig {
    /// Safety valve: the run is declared incomplete past this many steps
    pub max_steps: u32,

    /// Skipped turns an agent tolerates before it is forced to replan
    pub wait_threshold: u32,

    /// Chebyshev radius of each agent's sensor
    pub sensor_radius: usize,

    /// Upper bound on simultaneous agents
    pub max_agents: usize,

    /// Search-engine tuning shared by ad-hoc searches
    pub search: SearchConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_steps: 100,
            wait_threshold: 2,
            sensor_radius: 1,
            max_agents: 4,
            search: SearchConfig::default(),
        }
    }
}

/// Tuning for the search variants that take parameters
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SearchConfig {
    /// Heuristic inflation for weighted A*; above 1 trades optimality for
    /// speed
    pub weight: f64,

    /// Frontier-size bound for the bounded-memory search
    pub frontier_bound: usize,

    /// Neighborhood radius of the learned heuristic's density term
    pub learned_radius: usize,

    /// Coefficient on local obstacle density in the learned heuristic
    pub learned_obstacle_weight: f64,

    /// Coefficient on Manhattan distance in the learned heuristic
    pub learned_distance_weight: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            weight: 1.5,
            frontier_bound: 50,
            learned_radius: 3,
            learned_obstacle_weight: 3.0,
            learned_distance_weight: 1.0,
        }
    }
}

impl SearchConfig {
    /// The learned heuristic as configured
    pub fn learned_heuristic(&self) -> Heuristic {
        Heuristic::Learned {
            radius: self.learned_radius,
            obstacle_weight: self.learned_obstacle_weight,
            distance_weight: self.learned_distance_weight,
        }
    }
}

impl SimulationConfig {
    /// Parse a configuration from TOML text and validate it
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_steps == 0 {
            return Err(CoreError::config_error(
                "max_steps",
                self.max_steps,
                "must be at least 1",
            ));
        }
        if self.wait_threshold == 0 {
            return Err(CoreError::config_error(
                "wait_threshold",
                self.wait_threshold,
                "must be at least 1",
            ));
        }
        if self.max_agents == 0 {
            return Err(CoreError::config_error(
                "max_agents",
                self.max_agents,
                "must be at least 1",
            ));
        }
        if !self.search.weight.is_finite() || self.search.weight < 1.0 {
            return Err(CoreError::config_error(
                "search.weight",
                self.search.weight,
                "must be a finite value of at least 1.0",
            ));
        }
        if self.search.frontier_bound == 0 {
            return Err(CoreError::config_error(
                "search.frontier_bound",
                self.search.frontier_bound,
                "must be at least 1",
            ));
        }
        Ok(())
    }
}
