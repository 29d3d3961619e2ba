//! Spectator queries over the leaf grid.
//!
//! A query converts a rectangle around a center cell into a rectangle of
//! leaves, widened by the vertical band it covers so lower floors are seen
//! with their perspective offset, and then walks that rectangle through the
//! south and east neighbor links of each leaf.

use overworld_core::{OccupantId, Position, MAX_FLOOR, SURFACE_FLOOR};
use rustc_hash::FxHashSet;

use crate::tree::{LeafIndex, SpatialTree, FLOOR_SIZE};

/// Rectangle around a center cell expressed as reach in each direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SpectatorRange {
    west: i32,
    east: i32,
    north: i32,
    south: i32,
}

impl SpectatorRange {
    /// Largest reach that still fits inside the coordinate space.
    pub const MAX_REACH: i32 = u16::MAX as i32;

    /// Creates a range reaching the provided number of cells in each
    /// direction. Negative reaches are treated as zero and reaches beyond
    /// [`Self::MAX_REACH`] are clamped to it.
    #[must_use]
    pub fn new(west: i32, east: i32, north: i32, south: i32) -> Self {
        Self {
            west: west.clamp(0, Self::MAX_REACH),
            east: east.clamp(0, Self::MAX_REACH),
            north: north.clamp(0, Self::MAX_REACH),
            south: south.clamp(0, Self::MAX_REACH),
        }
    }

    /// Range reaching `x` cells west and east and `y` cells north and south.
    #[must_use]
    pub fn symmetric(x: i32, y: i32) -> Self {
        Self::new(x, x, y, y)
    }

    /// Range covering only the center column and row.
    #[must_use]
    pub const fn point() -> Self {
        Self {
            west: 0,
            east: 0,
            north: 0,
            south: 0,
        }
    }

    /// Cells covered west of the center.
    #[must_use]
    pub const fn west(&self) -> i32 {
        self.west
    }

    /// Cells covered east of the center.
    #[must_use]
    pub const fn east(&self) -> i32 {
        self.east
    }

    /// Cells covered north of the center.
    #[must_use]
    pub const fn north(&self) -> i32 {
        self.north
    }

    /// Cells covered south of the center.
    #[must_use]
    pub const fn south(&self) -> i32 {
        self.south
    }
}

/// Ordered set of occupants returned by a spectator query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Spectators {
    ids: Vec<OccupantId>,
    seen: FxHashSet<OccupantId>,
}

impl Spectators {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterates over the spectators in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = OccupantId> + '_ {
        self.ids.iter().copied()
    }

    /// Number of spectators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Reports whether the query matched nobody.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Reports whether the occupant is part of the set.
    #[must_use]
    pub fn contains(&self, occupant: OccupantId) -> bool {
        self.seen.contains(&occupant)
    }

    /// Appends every spectator of `other` that is not already present.
    pub fn merge(&mut self, other: &Spectators) {
        for occupant in other.iter() {
            self.push(occupant);
        }
    }

    /// Consumes the set, yielding the ids in discovery order.
    #[must_use]
    pub fn into_vec(self) -> Vec<OccupantId> {
        self.ids
    }

    pub(crate) fn push(&mut self, occupant: OccupantId) {
        if self.seen.insert(occupant) {
            self.ids.push(occupant);
        }
    }
}

/// Inclusive floor band observed from `center`.
///
/// Underground floors see two floors up and down. The surface sees every
/// surface floor, and the two lowest surface floors additionally peek into
/// the first underground floors.
#[must_use]
pub fn floor_band(center: Position, multi_floor: bool) -> (u8, u8) {
    let z = center.z();
    if !multi_floor {
        return (z, z);
    }
    if z > SURFACE_FLOOR {
        (z.saturating_sub(2), z.saturating_add(2).min(MAX_FLOOR))
    } else if z == SURFACE_FLOOR - 1 {
        (0, SURFACE_FLOOR + 1)
    } else if z == SURFACE_FLOOR {
        (0, SURFACE_FLOOR + 2)
    } else {
        (0, SURFACE_FLOOR)
    }
}

pub(crate) struct SpectatorQuery {
    pub(crate) center: Position,
    pub(crate) multi_floor: bool,
    pub(crate) players_only: bool,
    pub(crate) range: SpectatorRange,
}

impl SpectatorQuery {
    /// Walks the leaves touched by the query and collects every occupant
    /// whose projected position falls inside the range.
    pub(crate) fn collect<F>(&self, tree: &SpatialTree, position_of: F) -> Spectators
    where
        F: Fn(OccupantId) -> Option<Position>,
    {
        let mut spectators = Spectators::new();
        let center = self.center;
        let (min_z, max_z) = floor_band(center, self.multi_floor);

        let center_x = i32::from(center.x());
        let center_y = i32::from(center.y());
        let center_z = i32::from(center.z());
        let min_x = center_x - self.range.west;
        let max_x = center_x + self.range.east;
        let min_y = center_y - self.range.north;
        let max_y = center_y + self.range.south;

        let min_offset = center_z - i32::from(max_z);
        let max_offset = center_z - i32::from(min_z);
        let Some(extent) = tree.extent() else {
            return spectators;
        };
        let start_x = align(clamp_coordinate(min_x + min_offset)).max(i32::from(extent.min_x));
        let start_y = align(clamp_coordinate(min_y + min_offset)).max(i32::from(extent.min_y));
        let end_x = align(clamp_coordinate(max_x + max_offset)).min(i32::from(extent.max_x));
        let end_y = align(clamp_coordinate(max_y + max_offset)).min(i32::from(extent.max_y));

        let step = i32::from(FLOOR_SIZE);
        let mut row_leaf = leaf_at(tree, start_x, start_y);
        let mut row = start_y;
        while row <= end_y {
            let mut leaf = row_leaf;
            let mut column = start_x;
            while column <= end_x {
                match leaf {
                    Some(index) => {
                        let current = tree.leaf(index);
                        let candidates = if self.players_only {
                            current.players()
                        } else {
                            current.occupants()
                        };
                        for &occupant in candidates {
                            let Some(position) = position_of(occupant) else {
                                debug_assert!(false, "leaf lists unregistered {occupant:?}");
                                continue;
                            };
                            if position.z() < min_z || position.z() > max_z {
                                continue;
                            }
                            let offset_z = center_z - i32::from(position.z());
                            let x = i32::from(position.x());
                            let y = i32::from(position.y());
                            if min_y + offset_z > y
                                || max_y + offset_z < y
                                || min_x + offset_z > x
                                || max_x + offset_z < x
                            {
                                continue;
                            }
                            spectators.push(occupant);
                        }
                        leaf = current.east();
                    }
                    None => leaf = leaf_at(tree, column + step, row),
                }
                column += step;
            }

            row_leaf = match row_leaf {
                Some(index) => tree.leaf(index).south(),
                None => leaf_at(tree, start_x, row + step),
            };
            row += step;
        }

        spectators
    }
}

fn clamp_coordinate(value: i32) -> i32 {
    value.clamp(0, i32::from(u16::MAX))
}

fn align(value: i32) -> i32 {
    value - value % i32::from(FLOOR_SIZE)
}

fn leaf_at(tree: &SpatialTree, x: i32, y: i32) -> Option<LeafIndex> {
    let x = u16::try_from(x).ok()?;
    let y = u16::try_from(y).ok()?;
    tree.leaf_at(x, y)
}
