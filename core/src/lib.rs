#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Overworld spatial engine.
//!
//! This crate defines the value types that connect the authoritative world,
//! the pure query systems and the adapters. The world owns cells and the
//! occupant registry, mutates them through its operations and reports every
//! mutation as an [`Event`]. Systems such as the pathfinder and the
//! line-of-sight engine only read the world and answer with plain values.

use std::{
    fmt,
    ops::{BitOr, BitOrAssign},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of vertical layers tracked for every column of the map.
pub const MAP_LAYERS: u8 = 16;

/// Highest valid floor index.
pub const MAX_FLOOR: u8 = MAP_LAYERS - 1;

/// Ground-level floor. Floors with a larger index are underground.
pub const SURFACE_FLOOR: u8 = 7;

/// Location of a single cell expressed as column, row and floor.
///
/// Rows grow southward, columns grow eastward and floors grow downward, so
/// floor `7` is ground level and floor `8` is the first underground layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    x: u16,
    y: u16,
    z: u8,
}

impl Position {
    /// Creates a new position.
    #[must_use]
    pub const fn new(x: u16, y: u16, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Column of the position.
    #[must_use]
    pub const fn x(&self) -> u16 {
        self.x
    }

    /// Row of the position.
    #[must_use]
    pub const fn y(&self) -> u16 {
        self.y
    }

    /// Floor of the position.
    #[must_use]
    pub const fn z(&self) -> u8 {
        self.z
    }

    /// Reports whether the floor index lies within the tracked layers.
    #[must_use]
    pub const fn has_valid_floor(&self) -> bool {
        self.z <= MAX_FLOOR
    }

    /// Reports whether the position lies in the underground band.
    #[must_use]
    pub const fn is_underground(&self) -> bool {
        self.z > SURFACE_FLOOR
    }

    /// Returns the same column and row on another floor.
    #[must_use]
    pub const fn with_z(self, z: u8) -> Self {
        Self { z, ..self }
    }

    /// Shifts the position horizontally, returning `None` when the result
    /// leaves the coordinate space.
    #[must_use]
    pub fn offset(self, dx: i32, dy: i32) -> Option<Self> {
        let x = u16::try_from(i32::from(self.x) + dx).ok()?;
        let y = u16::try_from(i32::from(self.y) + dy).ok()?;
        Some(Self { x, y, z: self.z })
    }

    /// Position reached by taking one step in the provided direction.
    #[must_use]
    pub fn step(self, direction: Direction) -> Option<Self> {
        let (dx, dy) = direction.offset();
        self.offset(dx, dy)
    }

    /// Absolute column difference between two positions.
    #[must_use]
    pub const fn distance_x(self, other: Position) -> u16 {
        self.x.abs_diff(other.x)
    }

    /// Absolute row difference between two positions.
    #[must_use]
    pub const fn distance_y(self, other: Position) -> u16 {
        self.y.abs_diff(other.y)
    }

    /// Absolute floor difference between two positions.
    #[must_use]
    pub const fn distance_z(self, other: Position) -> u8 {
        self.z.abs_diff(other.z)
    }

    /// Largest of the column and row differences.
    #[must_use]
    pub fn chebyshev_distance(self, other: Position) -> u16 {
        self.distance_x(other).max(self.distance_y(other))
    }

    /// Reports whether both positions share a floor and touch, diagonals
    /// included. A position is adjacent to itself.
    #[must_use]
    pub fn is_adjacent(self, other: Position) -> bool {
        self.z == other.z && self.distance_x(other) <= 1 && self.distance_y(other) <= 1
    }

    /// Column and row packed into a single key, column in the high half.
    #[must_use]
    pub const fn packed_xy(self) -> u32 {
        ((self.x as u32) << 16) | self.y as u32
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Compass directions an occupant can face or step toward.
///
/// The declaration order is significant: it indexes the pathfinder's
/// neighbor pruning table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Toward decreasing rows.
    North,
    /// Toward increasing columns.
    East,
    /// Toward increasing rows.
    South,
    /// Toward decreasing columns.
    West,
    /// Toward decreasing columns and increasing rows.
    SouthWest,
    /// Toward increasing columns and increasing rows.
    SouthEast,
    /// Toward decreasing columns and decreasing rows.
    NorthWest,
    /// Toward increasing columns and decreasing rows.
    NorthEast,
}

impl Direction {
    /// Every direction in declaration order.
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
        Direction::SouthWest,
        Direction::SouthEast,
        Direction::NorthWest,
        Direction::NorthEast,
    ];

    /// Column and row delta of a single step.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
            Self::SouthWest => (-1, 1),
            Self::SouthEast => (1, 1),
            Self::NorthWest => (-1, -1),
            Self::NorthEast => (1, -1),
        }
    }

    /// Reports whether the direction changes both column and row.
    #[must_use]
    pub const fn is_diagonal(self) -> bool {
        matches!(
            self,
            Self::SouthWest | Self::SouthEast | Self::NorthWest | Self::NorthEast
        )
    }

    /// Resolves a unit step into its direction. Returns `None` for the zero
    /// step and for deltas longer than one cell.
    #[must_use]
    pub fn from_offset(dx: i32, dy: i32) -> Option<Self> {
        match (dx, dy) {
            (0, -1) => Some(Self::North),
            (1, 0) => Some(Self::East),
            (0, 1) => Some(Self::South),
            (-1, 0) => Some(Self::West),
            (-1, 1) => Some(Self::SouthWest),
            (1, 1) => Some(Self::SouthEast),
            (-1, -1) => Some(Self::NorthWest),
            (1, -1) => Some(Self::NorthEast),
            _ => None,
        }
    }
}

/// Unique identifier assigned to an occupant by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OccupantId(u32);

impl OccupantId {
    /// Creates a new occupant identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Damaging field types that may cover a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HazardKind {
    /// Burning field.
    Fire,
    /// Electrified field.
    Energy,
    /// Poisonous field.
    Poison,
}

/// Property bits carried by items and cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellFlags(u16);

impl CellFlags {
    /// No properties.
    pub const NONE: Self = Self(0);
    /// Occupants cannot walk onto the cell.
    pub const BLOCKS_PATH: Self = Self(1 << 0);
    /// Projectiles and sight lines stop at the cell.
    pub const BLOCKS_PROJECTILE: Self = Self(1 << 1);
    /// Stepping onto the cell moves the occupant to another floor.
    pub const FLOOR_CHANGE: Self = Self(1 << 2);
    /// Combat is disabled on the cell.
    pub const PROTECTION_ZONE: Self = Self(1 << 3);
    /// Item is drawn above occupants and counts toward the stack prefix.
    pub const ALWAYS_ON_TOP: Self = Self(1 << 4);

    /// Reconstructs flags from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Raw bit representation.
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Reports whether every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: CellFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Reports whether any bit of `other` is set.
    #[must_use]
    pub const fn intersects(self, other: CellFlags) -> bool {
        self.0 & other.0 != 0
    }

    /// Reports whether no bit is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Combination of both flag sets.
    #[must_use]
    pub const fn union(self, other: CellFlags) -> Self {
        Self(self.0 | other.0)
    }
}

impl BitOr for CellFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for CellFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Item lying on a cell, either as its ground or stacked on top of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    kind: u16,
    flags: CellFlags,
    hazard: Option<HazardKind>,
}

impl Item {
    /// Creates an item of the provided kind with the given properties.
    #[must_use]
    pub const fn new(kind: u16, flags: CellFlags) -> Self {
        Self {
            kind,
            flags,
            hazard: None,
        }
    }

    /// Plain walkable ground of the provided kind.
    #[must_use]
    pub const fn ground(kind: u16) -> Self {
        Self::new(kind, CellFlags::NONE)
    }

    /// Marks the item as a damaging field.
    #[must_use]
    pub const fn with_hazard(self, hazard: HazardKind) -> Self {
        Self {
            hazard: Some(hazard),
            ..self
        }
    }

    /// Kind identifier of the item.
    #[must_use]
    pub const fn kind(&self) -> u16 {
        self.kind
    }

    /// Properties carried by the item.
    #[must_use]
    pub const fn flags(&self) -> CellFlags {
        self.flags
    }

    /// Damaging field type, if the item is one.
    #[must_use]
    pub const fn hazard(&self) -> Option<HazardKind> {
        self.hazard
    }

    /// Reports whether the item is drawn above occupants.
    #[must_use]
    pub const fn is_always_on_top(&self) -> bool {
        self.flags.contains(CellFlags::ALWAYS_ON_TOP)
    }
}

/// Capabilities the spatial core queries from the entities it tracks.
///
/// The world never inspects concrete entity types. Everything it needs for
/// visibility, push costs, hazard costs and eviction goes through this
/// interface; the defaults describe an ordinary visible, immovable creature.
pub trait Occupant: fmt::Debug {
    /// Reports whether the occupant is controlled by a player.
    fn is_player(&self) -> bool;

    /// Reports whether other occupants may shove this one aside.
    fn is_pushable(&self) -> bool {
        false
    }

    /// Reports whether this occupant shoves pushable occupants out of its way.
    fn can_push_occupants(&self) -> bool {
        false
    }

    /// Reports whether the hazard deals no damage to this occupant.
    fn is_immune_to(&self, _hazard: HazardKind) -> bool {
        false
    }

    /// Reports whether the occupant walks over the hazard anyway, for example
    /// because it already suffers from it.
    fn tolerates_hazard(&self, _hazard: HazardKind) -> bool {
        false
    }

    /// Reports whether the occupant is hidden from ordinary observers.
    fn is_invisible(&self) -> bool {
        false
    }

    /// Reports whether the occupant perceives invisible occupants.
    fn sees_invisible(&self) -> bool {
        false
    }

    /// Position a player is moved to when its cell disappears.
    fn fallback_position(&self) -> Option<Position> {
        None
    }
}

/// Plain-data [`Occupant`] used by adapters and tests.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OccupantProfile {
    /// Player-controlled occupant.
    pub player: bool,
    /// May be shoved aside by pushing occupants.
    pub pushable: bool,
    /// Shoves pushable occupants aside.
    pub pushes_occupants: bool,
    /// Hazards that deal no damage.
    pub immunities: Vec<HazardKind>,
    /// Hazards the occupant walks over despite the damage.
    pub tolerated: Vec<HazardKind>,
    /// Hidden from ordinary observers.
    pub invisible: bool,
    /// Perceives invisible occupants.
    pub sees_invisible: bool,
    /// Relocation target used when the occupied cell is removed.
    pub fallback: Option<Position>,
}

impl OccupantProfile {
    /// Profile of a player with no special capabilities.
    #[must_use]
    pub fn player() -> Self {
        Self {
            player: true,
            ..Self::default()
        }
    }

    /// Profile of a non-player creature with no special capabilities.
    #[must_use]
    pub fn creature() -> Self {
        Self::default()
    }
}

impl Occupant for OccupantProfile {
    fn is_player(&self) -> bool {
        self.player
    }

    fn is_pushable(&self) -> bool {
        self.pushable
    }

    fn can_push_occupants(&self) -> bool {
        self.pushes_occupants
    }

    fn is_immune_to(&self, hazard: HazardKind) -> bool {
        self.immunities.contains(&hazard)
    }

    fn tolerates_hazard(&self, hazard: HazardKind) -> bool {
        self.tolerated.contains(&hazard)
    }

    fn is_invisible(&self) -> bool {
        self.invisible
    }

    fn sees_invisible(&self) -> bool {
        self.sees_invisible
    }

    fn fallback_position(&self) -> Option<Position> {
        self.fallback
    }
}

/// Reports whether `observer` perceives `target`.
///
/// Occupants always perceive themselves; callers compare identities before
/// asking.
#[must_use]
pub fn can_perceive(observer: &dyn Occupant, target: &dyn Occupant) -> bool {
    !target.is_invisible() || observer.sees_invisible()
}

/// Tuning knobs of a single path search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindPathParams {
    /// Caps the column and row distance from the start. Zero disables the cap
    /// and falls back to the closed-node budget.
    pub max_search_dist: u16,
    /// Smallest acceptable distance to the target.
    pub min_target_dist: i32,
    /// Largest acceptable distance to the target.
    pub max_target_dist: i32,
    /// Allows diagonal steps after the first expansion.
    pub allow_diagonal: bool,
    /// Rejects intermediate cells that leave the target band.
    pub keep_distance: bool,
    /// Accepts cells on every side of the target instead of the approach side only.
    pub full_path_search: bool,
    /// Requires an unobstructed line from the matched cell to the target.
    pub clear_sight: bool,
}

impl Default for FindPathParams {
    fn default() -> Self {
        Self {
            max_search_dist: 0,
            min_target_dist: -1,
            max_target_dist: -1,
            allow_diagonal: true,
            keep_distance: false,
            full_path_search: true,
            clear_sight: true,
        }
    }
}

/// Resolution applied when a cell is stored into an occupied slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplacePolicy {
    /// Moves the incoming ground and items into the existing cell.
    Merge,
    /// Leaves the existing cell untouched and drops the incoming one.
    KeepExisting,
}

/// How a cell store request was resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellSetOutcome {
    /// The slot was empty and now holds the incoming cell.
    Inserted,
    /// The incoming contents were folded into the existing cell.
    Merged,
    /// The existing cell won and the incoming one was dropped.
    Discarded,
}

/// Reasons an occupant placement or move may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum PlacementError {
    /// The floor index lies outside the tracked layers.
    #[error("floor index is outside the tracked layers")]
    OutOfBounds,
    /// No cell exists at the requested position.
    #[error("no cell exists at the requested position")]
    MissingCell,
    /// The occupant is not registered with the world.
    #[error("occupant is not registered with the world")]
    UnknownOccupant,
}

/// Client-side stack indices of a moved occupant as seen by one observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObserverStack {
    /// Player that observed the move.
    pub observer: OccupantId,
    /// Index within the old cell, `None` when the observer could not see the
    /// occupant there.
    pub old_stack: Option<u32>,
    /// Index within the new cell, `None` when the observer cannot see the
    /// occupant there.
    pub new_stack: Option<u32>,
}

/// Events broadcast by the world after processing an operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A cell store request was resolved.
    CellSet {
        /// Slot that received the request.
        position: Position,
        /// Resolution of the request.
        outcome: CellSetOutcome,
    },
    /// A cell was cleared from its slot.
    CellRemoved {
        /// Slot that was cleared.
        position: Position,
        /// Number of items, ground included, released with the cell.
        items_released: usize,
    },
    /// An occupant entered the world.
    OccupantPlaced {
        /// Identifier assigned to the occupant.
        occupant: OccupantId,
        /// Cell the occupant entered.
        position: Position,
    },
    /// An occupant moved between two cells.
    OccupantMoved {
        /// Identifier of the moved occupant.
        occupant: OccupantId,
        /// Cell the occupant left.
        from: Position,
        /// Cell the occupant entered.
        to: Position,
        /// Reports whether the move was a teleport rather than a walk.
        teleport: bool,
        /// Facing after the move.
        facing: Direction,
        /// Every player spectator of either cell with its stack indices.
        observers: Vec<ObserverStack>,
        /// Every spectator of either cell, players included.
        spectators: Vec<OccupantId>,
    },
    /// An occupant left the world.
    OccupantRemoved {
        /// Identifier of the removed occupant.
        occupant: OccupantId,
        /// Cell the occupant left.
        from: Position,
    },
    /// A player was relocated because its cell was removed.
    OccupantRelocated {
        /// Identifier of the relocated player.
        occupant: OccupantId,
        /// Removed cell.
        from: Position,
        /// Fallback cell the player now occupies.
        to: Position,
    },
    /// An occupant was dropped from the world because its cell was removed.
    OccupantEvicted {
        /// Identifier of the evicted occupant.
        occupant: OccupantId,
        /// Removed cell.
        from: Position,
    },
}

#[cfg(test)]
mod tests {
    use super::{
        can_perceive, CellFlags, Direction, FindPathParams, OccupantProfile, Position,
    };
    use serde::{de::DeserializeOwned, Serialize};

    #[test]
    fn distances_match_expectation() {
        let origin = Position::new(10, 10, 7);
        let destination = Position::new(14, 7, 5);
        assert_eq!(origin.distance_x(destination), 4);
        assert_eq!(origin.distance_y(destination), 3);
        assert_eq!(origin.distance_z(destination), 2);
        assert_eq!(origin.chebyshev_distance(destination), 4);
        assert_eq!(destination.chebyshev_distance(origin), 4);
    }

    #[test]
    fn offset_rejects_leaving_the_coordinate_space() {
        let corner = Position::new(0, u16::MAX, 7);
        assert_eq!(corner.offset(-1, 0), None);
        assert_eq!(corner.offset(0, 1), None);
        assert_eq!(corner.offset(1, -1), Some(Position::new(1, u16::MAX - 1, 7)));
    }

    #[test]
    fn direction_offsets_resolve_back_to_direction() {
        for direction in Direction::ALL {
            let (dx, dy) = direction.offset();
            assert_eq!(Direction::from_offset(dx, dy), Some(direction));
            assert_eq!(direction.is_diagonal(), dx != 0 && dy != 0);
        }
        assert_eq!(Direction::from_offset(0, 0), None);
        assert_eq!(Direction::from_offset(2, 0), None);
    }

    #[test]
    fn packed_xy_places_column_in_high_half() {
        let position = Position::new(0x1234, 0xabcd, 3);
        assert_eq!(position.packed_xy(), 0x1234_abcd);
    }

    #[test]
    fn floor_bands_split_at_ground_level() {
        assert!(!Position::new(0, 0, 7).is_underground());
        assert!(Position::new(0, 0, 8).is_underground());
        assert!(Position::new(0, 0, 15).has_valid_floor());
        assert!(!Position::new(0, 0, 16).has_valid_floor());
    }

    #[test]
    fn cell_flags_combine() {
        let mut flags = CellFlags::BLOCKS_PATH | CellFlags::FLOOR_CHANGE;
        assert!(flags.contains(CellFlags::BLOCKS_PATH));
        assert!(!flags.contains(CellFlags::BLOCKS_PATH | CellFlags::BLOCKS_PROJECTILE));
        assert!(flags.intersects(CellFlags::BLOCKS_PATH | CellFlags::BLOCKS_PROJECTILE));
        flags |= CellFlags::BLOCKS_PROJECTILE;
        assert!(flags.contains(CellFlags::BLOCKS_PATH | CellFlags::BLOCKS_PROJECTILE));
        assert!(CellFlags::NONE.is_empty());
    }

    #[test]
    fn invisible_targets_need_a_perceptive_observer() {
        let hidden = OccupantProfile {
            invisible: true,
            ..OccupantProfile::creature()
        };
        let plain = OccupantProfile::player();
        let seer = OccupantProfile {
            sees_invisible: true,
            ..OccupantProfile::player()
        };
        assert!(!can_perceive(&plain, &hidden));
        assert!(can_perceive(&seer, &hidden));
        assert!(can_perceive(&plain, &seer));
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn find_path_params_round_trip_through_bincode() {
        let params = FindPathParams {
            max_search_dist: 12,
            min_target_dist: 2,
            max_target_dist: 4,
            keep_distance: true,
            ..FindPathParams::default()
        };
        assert_round_trip(&params);
    }
}
