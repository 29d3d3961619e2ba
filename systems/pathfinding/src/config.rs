//! Tunable limits and costs of the pathfinder.

use serde::Deserialize;
use thiserror::Error;

/// Limits and step costs applied to every search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PathfinderConfig {
    /// Maximum number of nodes a single search may allocate.
    pub node_capacity: usize,
    /// Closed nodes after which a search without a distance cap stops.
    pub closed_budget: usize,
    /// Cost of a step along a row or column.
    pub straight_cost: u32,
    /// Cost of a diagonal step.
    pub diagonal_cost: u32,
    /// Extra cost of entering a cell whose top occupant blocks the mover.
    pub blocking_occupant_cost: u32,
    /// Extra cost of entering a cell covered by a harmful field.
    pub hazard_cost: u32,
}

impl Default for PathfinderConfig {
    fn default() -> Self {
        Self {
            node_capacity: 512,
            closed_budget: 100,
            straight_cost: 10,
            diagonal_cost: 25,
            blocking_occupant_cost: 30,
            hazard_cost: 180,
        }
    }
}

impl PathfinderConfig {
    /// Largest pool addressable by the node index type.
    pub const MAX_NODE_CAPACITY: usize = u16::MAX as usize + 1;

    /// Checks the settings for values a search cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_capacity == 0 || self.node_capacity > Self::MAX_NODE_CAPACITY {
            return Err(ConfigError::NodeCapacity {
                capacity: self.node_capacity,
            });
        }
        if self.closed_budget == 0 {
            return Err(ConfigError::ZeroClosedBudget);
        }
        if self.straight_cost == 0 || self.diagonal_cost == 0 {
            return Err(ConfigError::ZeroStepCost);
        }
        Ok(())
    }
}

/// Reasons a pathfinder configuration may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The pool cannot hold the root node or exceeds the index range.
    #[error(
        "node capacity must lie within 1..={}, got {capacity}",
        PathfinderConfig::MAX_NODE_CAPACITY
    )]
    NodeCapacity {
        /// Rejected capacity.
        capacity: usize,
    },
    /// Searches without a distance cap would never expand a node.
    #[error("closed node budget must be positive")]
    ZeroClosedBudget,
    /// Free steps would make every path equally cheap.
    #[error("step costs must be positive")]
    ZeroStepCost,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(PathfinderConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_pool_outside_index_range() {
        let empty = PathfinderConfig {
            node_capacity: 0,
            ..PathfinderConfig::default()
        };
        let huge = PathfinderConfig {
            node_capacity: PathfinderConfig::MAX_NODE_CAPACITY + 1,
            ..PathfinderConfig::default()
        };
        assert!(matches!(empty.validate(), Err(ConfigError::NodeCapacity { capacity: 0 })));
        assert!(matches!(huge.validate(), Err(ConfigError::NodeCapacity { .. })));
    }

    #[test]
    fn rejects_free_steps() {
        let config = PathfinderConfig {
            diagonal_cost: 0,
            ..PathfinderConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroStepCost));
    }
}
