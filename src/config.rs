use std::time::Duration;

use thiserror::Error;

use crate::cost::Heuristic;
use crate::grid::Capability;
use crate::grid::Cell;
use crate::grid::Connectivity;

/// Requests that are rejected before any search starts.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvalidRequest {
    #[error("Start {0} is out of bounds")]
    StartOutOfBounds(Cell),
    #[error("Goal {0} is out of bounds")]
    GoalOutOfBounds(Cell),
    #[error("Start {0} is not passable")]
    StartBlocked(Cell),
    #[error("Goal {0} is not passable")]
    GoalBlocked(Cell),
    #[error("Cell {0} is out of bounds")]
    CellOutOfBounds(Cell),
    #[error("Invalid configuration: {field} {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },
    #[error("{engine} does not support {connectivity} grids")]
    UnsupportedConnectivity {
        engine: String,
        connectivity: Connectivity,
    },
    #[error("{engine} does not support {operation}")]
    UnsupportedOperation {
        engine: String,
        operation: &'static str,
    },
    #[error("{engine} needs every cell to cost the same")]
    UnsupportedTerrainCosts { engine: String },
    #[error("Terrain cost {cost} at {cell} must be finite and at least 1")]
    InvalidTerrainCost { cell: Cell, cost: f64 },
}

/// Knobs shared by every engine.
///
/// Each engine reads the fields it cares about and ignores the rest.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchConfig {
    pub heuristic: Heuristic,
    /// Heuristic inflation for weighted A* and the incremental engines.
    pub weight: f64,
    /// First inflation used by anytime engines.
    pub epsilon_start: f64,
    /// Multiplies epsilon after every anytime round.
    pub epsilon_decay: f64,
    pub max_rounds: usize,
    pub max_iterations: usize,
    /// Deepest path IDA* explores. Defaults to the number of cells.
    pub max_depth: Option<usize>,
    pub time_budget: Option<Duration>,
    pub connectivity: Connectivity,
    pub capability: Capability,
    pub cluster_size: usize,
    pub step_size: f64,
    pub goal_bias: f64,
    pub rewire_radius: f64,
    pub seed: u64,
    /// Iterations between `TraceSink::checkpoint` calls.
    pub batch_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            heuristic: Heuristic::Octile,
            weight: 1.0,
            epsilon_start: 2.5,
            epsilon_decay: 0.5,
            max_rounds: 16,
            max_iterations: 1_000_000,
            max_depth: None,
            time_budget: None,
            connectivity: Connectivity::Eight,
            capability: Capability::Ground,
            cluster_size: 8,
            step_size: 2.0,
            goal_bias: 0.1,
            rewire_radius: 3.0,
            seed: 0,
            batch_size: 256,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), InvalidRequest> {
        let invalid = |field, reason| Err(InvalidRequest::InvalidConfig { field, reason });

        if !(self.weight >= 1.0) || !self.weight.is_finite() {
            return invalid("weight", "must be a finite number >= 1");
        }
        if !(self.epsilon_start >= 1.0) || !self.epsilon_start.is_finite() {
            return invalid("epsilon_start", "must be a finite number >= 1");
        }
        if !(self.epsilon_decay > 0.0 && self.epsilon_decay < 1.0) {
            return invalid("epsilon_decay", "must be within (0, 1)");
        }
        if self.max_rounds == 0 {
            return invalid("max_rounds", "must be positive");
        }
        if self.max_iterations == 0 {
            return invalid("max_iterations", "must be positive");
        }
        if self.max_depth == Some(0) {
            return invalid("max_depth", "must be positive");
        }
        if self.cluster_size < 2 {
            return invalid("cluster_size", "must be at least 2");
        }
        if !(self.step_size >= 1.0) || !self.step_size.is_finite() {
            return invalid("step_size", "must be a finite number >= 1");
        }
        if !(0.0..=1.0).contains(&self.goal_bias) {
            return invalid("goal_bias", "must be within [0, 1]");
        }
        if !(self.rewire_radius >= 0.0) || !self.rewire_radius.is_finite() {
            return invalid("rewire_radius", "must be a finite number >= 0");
        }
        if self.batch_size == 0 {
            return invalid("batch_size", "must be positive");
        }
        Ok(())
    }
}
