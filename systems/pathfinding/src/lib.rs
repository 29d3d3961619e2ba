#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Bounded best-first pathfinder over the Overworld spatial index.
//!
//! Searches run on a single floor, expand nodes in order of accumulated cost
//! and keep every node in a fixed-capacity pool, so the work done by one call
//! is bounded by the pool size and either the closed-node budget or the
//! caller's search distance cap. After the first expansion each node only
//! considers the neighbors that continue away from its parent, following a
//! fixed pruning table.

mod condition;
mod config;
mod nodes;

use overworld_core::{CellFlags, Direction, FindPathParams, Occupant, Position};
use overworld_world::{query, Cell, World};
use tracing::debug;

pub use condition::{PathCondition, TargetCondition};
pub use config::{ConfigError, PathfinderConfig};

use nodes::{NodeIndex, NodePool};

/// Neighbor offsets considered by the root node.
const ALL_NEIGHBORS: [(i32, i32); 8] = [
    (-1, 0),
    (0, 1),
    (1, 0),
    (0, -1),
    (-1, -1),
    (1, -1),
    (1, 1),
    (-1, 1),
];

/// Neighbor offsets considered by a node, indexed by the direction in which
/// its parent lies. The first three entries are the orthogonal candidates.
const PRUNED_NEIGHBORS: [[(i32, i32); 5]; 8] = [
    // North
    [(-1, 0), (0, 1), (1, 0), (1, 1), (-1, 1)],
    // East
    [(-1, 0), (0, 1), (0, -1), (-1, -1), (-1, 1)],
    // South
    [(-1, 0), (1, 0), (0, -1), (-1, -1), (1, -1)],
    // West
    [(0, 1), (1, 0), (0, -1), (1, -1), (1, 1)],
    // SouthWest
    [(1, 0), (0, -1), (-1, -1), (1, -1), (1, 1)],
    // SouthEast
    [(-1, 0), (0, -1), (-1, -1), (1, -1), (-1, 1)],
    // NorthWest
    [(0, 1), (1, 0), (1, -1), (1, 1), (-1, 1)],
    // NorthEast
    [(-1, 0), (0, 1), (-1, -1), (1, 1), (-1, 1)],
];

/// Route produced by a successful search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    /// Steps from the start to the destination.
    pub directions: Vec<Direction>,
    /// Cell the route ends on.
    pub destination: Position,
    /// Accumulated cost of the route.
    pub cost: u32,
}

/// Bookkeeping of the most recent search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Nodes allocated from the pool.
    pub nodes_allocated: usize,
    /// Nodes closed when the search stopped.
    pub closed: usize,
    /// Neighbor offsets examined across every expansion.
    pub neighbors_examined: usize,
    /// Reports whether the search ran out of pool space.
    pub pool_exhausted: bool,
}

/// Pathfinder reusing its node pool between searches.
#[derive(Debug)]
pub struct Pathfinder {
    config: PathfinderConfig,
    nodes: NodePool,
    last_search: SearchStats,
}

impl Default for Pathfinder {
    fn default() -> Self {
        Self::from_valid_config(PathfinderConfig::default())
    }
}

impl Pathfinder {
    /// Creates a pathfinder with the default limits and costs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pathfinder with the provided limits and costs.
    pub fn with_config(config: PathfinderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: PathfinderConfig) -> Self {
        Self {
            nodes: NodePool::new(config.node_capacity),
            config,
            last_search: SearchStats::default(),
        }
    }

    /// Limits and costs used by every search.
    #[must_use]
    pub fn config(&self) -> &PathfinderConfig {
        &self.config
    }

    /// Bookkeeping of the most recent search.
    #[must_use]
    pub fn last_search(&self) -> SearchStats {
        self.last_search
    }

    /// Searches for a route from `start` to a cell accepted by `condition`.
    ///
    /// Returns the route to the first exact match, or to the last fallback
    /// match once the search runs out of budget, nodes or open cells.
    /// Returns `None` when nothing matched.
    pub fn find_path<C>(
        &mut self,
        world: &World,
        mover: &dyn Occupant,
        start: Position,
        condition: &C,
        params: &FindPathParams,
    ) -> Option<Path>
    where
        C: PathCondition + ?Sized,
    {
        self.last_search = SearchStats::default();
        if !start.has_valid_floor() {
            return None;
        }

        self.nodes.reset(start.x(), start.y());
        let mut best_match_dist = 0;
        let mut found: Option<NodeIndex> = None;
        let mut pool_exhausted = false;
        let mut neighbors_examined = 0;

        while params.max_search_dist != 0 || self.nodes.closed() < self.config.closed_budget {
            let Some(current) = self.nodes.best_open() else {
                break;
            };
            let node = self.nodes.node(current);
            let position = Position::new(node.x, node.y, start.z());

            if condition.matches(world, start, position, params, &mut best_match_dist) {
                found = Some(current);
                if best_match_dist == 0 {
                    break;
                }
            }

            for &(dx, dy) in neighbors(&self.nodes, node, params.allow_diagonal) {
                neighbors_examined += 1;
                let Some(neighbor) = position.offset(dx, dy) else {
                    continue;
                };
                if params.max_search_dist != 0
                    && (start.distance_x(neighbor) > params.max_search_dist
                        || start.distance_y(neighbor) > params.max_search_dist)
                {
                    continue;
                }
                if params.keep_distance && !condition.is_in_range(start, neighbor, params) {
                    continue;
                }

                let known = self.nodes.find(neighbor.x(), neighbor.y());
                let cell = if known.is_some() {
                    query::cell(world, neighbor)
                } else {
                    let Some(cell) = walkable_cell(world, mover, neighbor) else {
                        continue;
                    };
                    Some(cell)
                };
                let step = if dx != 0 && dy != 0 {
                    self.config.diagonal_cost
                } else {
                    self.config.straight_cost
                };
                let extra = cell.map_or(0, |cell| self.cell_cost(world, mover, neighbor, cell));
                let f = node.f.saturating_add(step).saturating_add(extra);

                match known {
                    Some(index) => {
                        if self.nodes.node(index).f > f {
                            self.nodes.reopen(index, current, f);
                        }
                    }
                    None => {
                        if self
                            .nodes
                            .create_open(Some(current), neighbor.x(), neighbor.y(), f)
                            .is_none()
                        {
                            pool_exhausted = true;
                            break;
                        }
                    }
                }
            }

            if pool_exhausted {
                debug!(
                    capacity = self.config.node_capacity,
                    matched = found.is_some(),
                    "path search ran out of nodes"
                );
                break;
            }
            self.nodes.close(current);
        }

        self.last_search = SearchStats {
            nodes_allocated: self.nodes.len(),
            closed: self.nodes.closed(),
            neighbors_examined,
            pool_exhausted,
        };

        let Some(found) = found else {
            debug!(%start, nodes = self.nodes.len(), "no path found");
            return None;
        };
        let path = self.reconstruct(found, start.z());
        debug!(
            %start,
            destination = %path.destination,
            steps = path.directions.len(),
            cost = path.cost,
            nodes = self.nodes.len(),
            "path found"
        );
        Some(path)
    }

    fn cell_cost(&self, world: &World, mover: &dyn Occupant, position: Position, cell: &Cell) -> u32 {
        let mut cost = 0;
        if let Some((_, top)) = query::top_visible_occupant(world, position, mover) {
            if !(top.is_pushable() && mover.can_push_occupants()) {
                cost += self.config.blocking_occupant_cost;
            }
        }
        if let Some(hazard) = cell.hazard() {
            if !mover.is_immune_to(hazard) && !mover.tolerates_hazard(hazard) {
                cost += self.config.hazard_cost;
            }
        }
        cost
    }

    fn reconstruct(&self, found: NodeIndex, z: u8) -> Path {
        let end = self.nodes.node(found);
        let mut directions = Vec::new();
        let mut child = end;
        while let Some(parent) = child.parent.map(|index| self.nodes.node(index)) {
            let dx = i32::from(child.x) - i32::from(parent.x);
            let dy = i32::from(child.y) - i32::from(parent.y);
            match Direction::from_offset(dx, dy) {
                Some(direction) => directions.push(direction),
                None => debug_assert!(false, "parent link spans ({dx}, {dy})"),
            }
            child = parent;
        }
        directions.reverse();
        Path {
            directions,
            destination: Position::new(end.x, end.y, z),
            cost: end.f,
        }
    }
}

/// Neighbor offsets expanded from `node`.
fn neighbors(pool: &NodePool, node: nodes::Node, allow_diagonal: bool) -> &'static [(i32, i32)] {
    let Some(parent) = node.parent.map(|index| pool.node(index)) else {
        return &ALL_NEIGHBORS;
    };
    let offset_x = i32::from(parent.x) - i32::from(node.x);
    let offset_y = i32::from(parent.y) - i32::from(node.y);
    let parent_side = if offset_y == 0 {
        if offset_x == -1 {
            Direction::West
        } else {
            Direction::East
        }
    } else if !allow_diagonal || offset_x == 0 {
        if offset_y == -1 {
            Direction::North
        } else {
            Direction::South
        }
    } else if offset_y == -1 {
        if offset_x == -1 {
            Direction::NorthWest
        } else {
            Direction::NorthEast
        }
    } else if offset_x == -1 {
        Direction::SouthWest
    } else {
        Direction::SouthEast
    };
    let count = if allow_diagonal { 5 } else { 3 };
    &PRUNED_NEIGHBORS[parent_side as usize][..count]
}

/// Cell at `position` if `mover` may plan a step onto it.
fn walkable_cell<'w>(world: &'w World, mover: &dyn Occupant, position: Position) -> Option<&'w Cell> {
    let cell = query::cell(world, position)?;
    if !cell.has_ground() || cell.has_flag(CellFlags::BLOCKS_PATH) {
        return None;
    }
    if !mover.is_player() && cell.has_flag(CellFlags::PROTECTION_ZONE | CellFlags::FLOOR_CHANGE) {
        return None;
    }
    Some(cell)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pruning_table_rows_follow_the_parent_side() {
        let expected: [[(i32, i32); 5]; 8] = [
            [(-1, 0), (0, 1), (1, 0), (1, 1), (-1, 1)],
            [(-1, 0), (0, 1), (0, -1), (-1, -1), (-1, 1)],
            [(-1, 0), (1, 0), (0, -1), (-1, -1), (1, -1)],
            [(0, 1), (1, 0), (0, -1), (1, -1), (1, 1)],
            [(1, 0), (0, -1), (-1, -1), (1, -1), (1, 1)],
            [(-1, 0), (0, -1), (-1, -1), (1, -1), (-1, 1)],
            [(0, 1), (1, 0), (1, -1), (1, 1), (-1, 1)],
            [(-1, 0), (0, 1), (-1, -1), (1, 1), (-1, 1)],
        ];
        for (side, row) in Direction::ALL.iter().zip(expected.iter()) {
            assert_eq!(&PRUNED_NEIGHBORS[*side as usize], row, "{side:?} row");
        }
        assert_eq!(
            ALL_NEIGHBORS,
            [(-1, 0), (0, 1), (1, 0), (0, -1), (-1, -1), (1, -1), (1, 1), (-1, 1)]
        );
    }

    #[test]
    fn expansion_uses_the_row_of_the_parent_side() {
        let mut pool = NodePool::new(8);
        pool.reset(5, 5);
        let root = pool.node(0);
        assert_eq!(neighbors(&pool, root, true), &ALL_NEIGHBORS[..]);

        let east = pool.create_open(Some(0), 6, 5, 10).expect("room");
        let south_east = pool.create_open(Some(0), 6, 6, 25).expect("room");
        let north = pool.create_open(Some(0), 5, 4, 10).expect("room");

        let west_row = &PRUNED_NEIGHBORS[Direction::West as usize];
        assert_eq!(neighbors(&pool, pool.node(east), true), &west_row[..]);
        assert_eq!(neighbors(&pool, pool.node(east), false), &west_row[..3]);
        assert_eq!(
            neighbors(&pool, pool.node(south_east), true),
            &PRUNED_NEIGHBORS[Direction::NorthWest as usize][..]
        );
        assert_eq!(
            neighbors(&pool, pool.node(south_east), false),
            &PRUNED_NEIGHBORS[Direction::North as usize][..3]
        );
        assert_eq!(
            neighbors(&pool, pool.node(north), true),
            &PRUNED_NEIGHBORS[Direction::South as usize][..]
        );
    }

    #[test]
    fn pruning_table_never_steps_back_onto_the_parent() {
        for (side, offsets) in Direction::ALL.iter().zip(PRUNED_NEIGHBORS.iter()) {
            let parent = side.offset();
            assert!(
                offsets.iter().all(|offset| *offset != parent),
                "{side:?} table revisits the parent"
            );
        }
    }

    #[test]
    fn orthogonal_prefix_of_each_table_is_orthogonal_for_row_and_column_parents() {
        for side in [Direction::North, Direction::East, Direction::South, Direction::West] {
            let offsets = &PRUNED_NEIGHBORS[side as usize][..3];
            assert!(offsets.iter().all(|(dx, dy)| *dx == 0 || *dy == 0), "{side:?}");
        }
    }

    #[test]
    fn root_expands_every_direction() {
        let covered: Vec<Direction> = ALL_NEIGHBORS
            .iter()
            .filter_map(|(dx, dy)| Direction::from_offset(*dx, *dy))
            .collect();
        assert_eq!(covered.len(), Direction::ALL.len());
        for direction in Direction::ALL {
            assert!(covered.contains(&direction));
        }
    }
}
