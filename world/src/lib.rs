#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative spatial index of the Overworld engine.
//!
//! The world maps every `(x, y, z)` position to at most one [`Cell`] through a
//! quadrant tree of 8×8 leaves, keeps the inverse bookkeeping between cells,
//! leaves and the occupant registry consistent, and answers spectator
//! queries. Mutating operations report what happened by pushing [`Event`]s.

mod cell;
mod config;
mod leaf;
mod movement;
mod spectators;
mod tree;

use overworld_core::{
    CellSetOutcome, Direction, Event, Item, Occupant, OccupantId, PlacementError, Position,
    ReplacePolicy,
};
use rustc_hash::FxHashMap;
use tracing::warn;

pub use cell::Cell;
pub use config::{ConfigError, WorldConfig};
pub use movement::MoveOutcome;
pub use spectators::{floor_band, SpectatorRange, Spectators};

use spectators::SpectatorQuery;
use tree::{LeafIndex, SpatialTree};

const INITIAL_FACING: Direction = Direction::South;

#[derive(Debug)]
struct OccupantEntry {
    occupant: Box<dyn Occupant>,
    position: Position,
    facing: Direction,
    is_player: bool,
}

/// Represents the authoritative Overworld spatial state.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    tree: SpatialTree,
    occupants: FxHashMap<OccupantId, OccupantEntry>,
    next_occupant: u32,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Creates an empty world using the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::from_valid_config(WorldConfig::default())
    }

    /// Creates an empty world using the provided configuration.
    pub fn with_config(config: WorldConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: WorldConfig) -> Self {
        Self {
            config,
            tree: SpatialTree::new(),
            occupants: FxHashMap::default(),
            next_occupant: 1,
        }
    }

    /// Configuration the world was created with.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Resolves the leaf covering `(x, y)`, creating it and linking it to
    /// its existing neighbors when it does not exist yet.
    pub fn ensure_leaf(&mut self, x: u16, y: u16) -> LeafView<'_> {
        let index = self.tree.ensure_leaf(x, y);
        LeafView {
            tree: &self.tree,
            index,
        }
    }

    /// Stores `cell` at `position`.
    ///
    /// An empty slot takes the cell as is. An occupied slot is resolved by
    /// `policy`: [`ReplacePolicy::Merge`] folds the incoming ground and items
    /// into the existing cell so the occupants registered there stay
    /// attached, [`ReplacePolicy::KeepExisting`] drops the incoming cell.
    /// Positions below the last floor are rejected without mutation.
    pub fn set_cell(
        &mut self,
        position: Position,
        mut cell: Cell,
        policy: ReplacePolicy,
        out_events: &mut Vec<Event>,
    ) {
        if !position.has_valid_floor() {
            warn!(%position, "rejected cell outside the tracked floors");
            return;
        }

        cell.detach_occupants();
        let index = self.tree.ensure_leaf(position.x(), position.y());
        let Some(slot) = self.tree.leaf_mut(index).ensure_slot(position) else {
            return;
        };
        let outcome = if let Some(existing) = slot.as_deref_mut() {
            match policy {
                ReplacePolicy::Merge => {
                    existing.absorb(cell);
                    CellSetOutcome::Merged
                }
                ReplacePolicy::KeepExisting => CellSetOutcome::Discarded,
            }
        } else {
            *slot = Some(Box::new(cell));
            CellSetOutcome::Inserted
        };
        out_events.push(Event::CellSet { position, outcome });
    }

    /// Clears the cell at `position`.
    ///
    /// Occupants are evicted first: players move to their own fallback
    /// position or the configured one, everybody else leaves the world.
    /// Items are released afterwards and the slot is emptied last. Returns
    /// `None` when no cell exists at the position.
    pub fn remove_cell(
        &mut self,
        position: Position,
        out_events: &mut Vec<Event>,
    ) -> Option<RemovedCell> {
        if !position.has_valid_floor() {
            warn!(%position, "rejected removal outside the tracked floors");
            return None;
        }

        let index = self.tree.leaf_at(position.x(), position.y())?;
        let residents = self.tree.leaf(index).cell(position)?.occupants().to_vec();

        let mut relocated = Vec::new();
        let mut evicted = Vec::new();
        for occupant in residents {
            match self.fallback_for(occupant, position) {
                Some(to) => {
                    let _ = self.transfer(occupant, to);
                    out_events.push(Event::OccupantRelocated {
                        occupant,
                        from: position,
                        to,
                    });
                    relocated.push(occupant);
                }
                None => {
                    let _ = self.detach(occupant);
                    out_events.push(Event::OccupantEvicted {
                        occupant,
                        from: position,
                    });
                    evicted.push(occupant);
                }
            }
        }

        let cell = self.tree.leaf_mut(index).slot_mut(position)?.take()?;
        let items = cell.into_items();
        out_events.push(Event::CellRemoved {
            position,
            items_released: items.len(),
        });
        Some(RemovedCell {
            relocated,
            evicted,
            items,
        })
    }

    /// Registers an occupant standing on the cell at `position`.
    pub fn place_occupant(
        &mut self,
        occupant: Box<dyn Occupant>,
        position: Position,
        out_events: &mut Vec<Event>,
    ) -> Result<OccupantId, PlacementError> {
        if !position.has_valid_floor() {
            return Err(PlacementError::OutOfBounds);
        }
        let index = self
            .tree
            .leaf_at(position.x(), position.y())
            .ok_or(PlacementError::MissingCell)?;
        let leaf = self.tree.leaf_mut(index);
        let cell = leaf
            .cell_mut(position)
            .ok_or(PlacementError::MissingCell)?;

        let id = OccupantId::new(self.next_occupant);
        self.next_occupant = self.next_occupant.wrapping_add(1);
        let is_player = occupant.is_player();
        cell.push_occupant(id);
        leaf.add_occupant(id, is_player);
        let _ = self.occupants.insert(
            id,
            OccupantEntry {
                occupant,
                position,
                facing: INITIAL_FACING,
                is_player,
            },
        );
        out_events.push(Event::OccupantPlaced {
            occupant: id,
            position,
        });
        Ok(id)
    }

    /// Removes an occupant from the world, handing its capabilities back.
    pub fn remove_occupant(
        &mut self,
        occupant: OccupantId,
        out_events: &mut Vec<Event>,
    ) -> Option<Box<dyn Occupant>> {
        let (entry, from) = self.detach(occupant)?;
        out_events.push(Event::OccupantRemoved { occupant, from });
        Some(entry)
    }

    fn fallback_for(&self, occupant: OccupantId, removed: Position) -> Option<Position> {
        let entry = self.occupants.get(&occupant)?;
        if !entry.is_player {
            return None;
        }
        let candidates = [entry.occupant.fallback_position(), self.config.fallback_position];
        let fallback = candidates.into_iter().flatten().find(|candidate| {
            *candidate != removed && query::cell(self, *candidate).is_some()
        });
        if fallback.is_none() {
            warn!(
                occupant = occupant.get(),
                %removed,
                "no fallback cell for player, evicting"
            );
        }
        fallback
    }

    /// Unlinks the occupant from its cell, its leaf and the registry.
    fn detach(&mut self, occupant: OccupantId) -> Option<(Box<dyn Occupant>, Position)> {
        let entry = self.occupants.remove(&occupant)?;
        let position = entry.position;
        match self.tree.leaf_at(position.x(), position.y()) {
            Some(index) => {
                let leaf = self.tree.leaf_mut(index);
                let removed = leaf
                    .cell_mut(position)
                    .is_some_and(|cell| cell.remove_occupant(occupant));
                debug_assert!(removed, "{occupant:?} missing from its cell at {position}");
                leaf.remove_occupant(occupant, entry.is_player);
            }
            None => debug_assert!(false, "{occupant:?} registered outside every leaf"),
        }
        Some((entry.occupant, position))
    }

    /// Moves a registered occupant into the cell at `to`, keeping the cell,
    /// leaf and registry bookkeeping in step. Reports whether the occupant
    /// crossed into another leaf.
    fn transfer(&mut self, occupant: OccupantId, to: Position) -> bool {
        let Some(entry) = self.occupants.get_mut(&occupant) else {
            return false;
        };
        let from = entry.position;
        let is_player = entry.is_player;
        entry.position = to;

        let from_leaf = self.tree.leaf_at(from.x(), from.y());
        let to_leaf = self.tree.leaf_at(to.x(), to.y());
        debug_assert!(from_leaf.is_some() && to_leaf.is_some());

        if let Some(index) = from_leaf {
            let removed = self
                .tree
                .leaf_mut(index)
                .cell_mut(from)
                .is_some_and(|cell| cell.remove_occupant(occupant));
            debug_assert!(removed, "{occupant:?} missing from its cell at {from}");
        }

        let crossed = from_leaf != to_leaf;
        if crossed {
            if let Some(index) = from_leaf {
                self.tree.leaf_mut(index).remove_occupant(occupant, is_player);
            }
            if let Some(index) = to_leaf {
                self.tree.leaf_mut(index).add_occupant(occupant, is_player);
            }
        }

        if let Some(index) = to_leaf {
            if let Some(cell) = self.tree.leaf_mut(index).cell_mut(to) {
                cell.push_occupant(occupant);
            }
        }
        crossed
    }

    fn spectators(
        &self,
        center: Position,
        multi_floor: bool,
        players_only: bool,
        range: SpectatorRange,
    ) -> Spectators {
        let query = SpectatorQuery {
            center,
            multi_floor,
            players_only,
            range,
        };
        query.collect(&self.tree, |occupant| {
            self.occupants.get(&occupant).map(|entry| entry.position)
        })
    }
}

/// What a cell removal released.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemovedCell {
    /// Players moved to a fallback cell.
    pub relocated: Vec<OccupantId>,
    /// Occupants dropped from the world.
    pub evicted: Vec<OccupantId>,
    /// Ground followed by the stacked items, bottom to top.
    pub items: Vec<Item>,
}

/// Read-only view of a leaf of the spatial tree.
#[derive(Clone, Copy, Debug)]
pub struct LeafView<'a> {
    tree: &'a SpatialTree,
    index: LeafIndex,
}

impl<'a> LeafView<'a> {
    /// Column and row of the leaf's north-west corner.
    #[must_use]
    pub fn origin(&self) -> (u16, u16) {
        self.tree.leaf(self.index).origin()
    }

    /// Every occupant standing inside the leaf's footprint.
    #[must_use]
    pub fn occupants(&self) -> &'a [OccupantId] {
        self.tree.leaf(self.index).occupants()
    }

    /// Player-controlled occupants standing inside the leaf's footprint.
    #[must_use]
    pub fn players(&self) -> &'a [OccupantId] {
        self.tree.leaf(self.index).players()
    }

    /// Linked leaf directly south, if it exists.
    #[must_use]
    pub fn south(&self) -> Option<LeafView<'a>> {
        self.tree.leaf(self.index).south().map(|index| LeafView {
            tree: self.tree,
            index,
        })
    }

    /// Linked leaf directly east, if it exists.
    #[must_use]
    pub fn east(&self) -> Option<LeafView<'a>> {
        self.tree.leaf(self.index).east().map(|index| LeafView {
            tree: self.tree,
            index,
        })
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use overworld_core::{can_perceive, Direction, Occupant, OccupantId, Position};

    use super::{Cell, LeafView, SpectatorRange, Spectators, World};

    /// Retrieves the cell stored at `position`. Missing leaves, floors and
    /// cells all read as absent.
    #[must_use]
    pub fn cell(world: &World, position: Position) -> Option<&Cell> {
        if !position.has_valid_floor() {
            return None;
        }
        let index = world.tree.leaf_at(position.x(), position.y())?;
        world.tree.leaf(index).cell(position)
    }

    /// Finds occupants within a symmetric rectangle around `center`.
    ///
    /// A zero range matches only occupants projected onto the center column
    /// and row.
    #[must_use]
    pub fn find_spectators(
        world: &World,
        center: Position,
        multi_floor: bool,
        players_only: bool,
        range_x: i32,
        range_y: i32,
    ) -> Spectators {
        find_spectators_in(
            world,
            center,
            multi_floor,
            players_only,
            SpectatorRange::symmetric(range_x, range_y),
        )
    }

    /// Finds occupants within an arbitrary rectangle around `center`.
    #[must_use]
    pub fn find_spectators_in(
        world: &World,
        center: Position,
        multi_floor: bool,
        players_only: bool,
        range: SpectatorRange,
    ) -> Spectators {
        if !center.has_valid_floor() {
            return Spectators::new();
        }
        world.spectators(center, multi_floor, players_only, range)
    }

    /// Capabilities of a registered occupant.
    #[must_use]
    pub fn occupant(world: &World, occupant: OccupantId) -> Option<&dyn Occupant> {
        world
            .occupants
            .get(&occupant)
            .map(|entry| entry.occupant.as_ref())
    }

    /// Cached position of a registered occupant.
    #[must_use]
    pub fn occupant_position(world: &World, occupant: OccupantId) -> Option<Position> {
        world.occupants.get(&occupant).map(|entry| entry.position)
    }

    /// Facing of a registered occupant.
    #[must_use]
    pub fn occupant_facing(world: &World, occupant: OccupantId) -> Option<Direction> {
        world.occupants.get(&occupant).map(|entry| entry.facing)
    }

    /// Number of registered occupants.
    #[must_use]
    pub fn occupant_count(world: &World) -> usize {
        world.occupants.len()
    }

    /// Number of leaves created so far.
    #[must_use]
    pub fn leaf_count(world: &World) -> usize {
        world.tree.leaf_count()
    }

    /// Leaf covering `(x, y)`, if it was created.
    #[must_use]
    pub fn leaf(world: &World, x: u16, y: u16) -> Option<LeafView<'_>> {
        let index = world.tree.leaf_at(x, y)?;
        Some(LeafView {
            tree: &world.tree,
            index,
        })
    }

    /// Newest occupant on the cell that `observer` perceives.
    #[must_use]
    pub fn top_visible_occupant<'w>(
        world: &'w World,
        position: Position,
        observer: &dyn Occupant,
    ) -> Option<(OccupantId, &'w dyn Occupant)> {
        let cell = cell(world, position)?;
        cell.occupants().iter().rev().find_map(|id| {
            let target = occupant(world, *id)?;
            can_perceive(observer, target).then_some((*id, target))
        })
    }

    /// Index of `occupant` within the client-side stack of the cell at
    /// `position` as drawn for `observer`.
    ///
    /// The ground and always-on-top items come first, followed by the
    /// perceivable occupants from newest to oldest. Returns `None` when the
    /// observer cannot perceive the occupant or it does not stand there.
    #[must_use]
    pub fn client_stack_index(
        world: &World,
        position: Position,
        occupant: OccupantId,
        observer: OccupantId,
    ) -> Option<u32> {
        let cell = cell(world, position)?;
        let viewer = self::occupant(world, observer)?;
        let sees = |id: OccupantId| {
            id == observer || self::occupant(world, id).is_some_and(|t| can_perceive(viewer, t))
        };
        if !sees(occupant) {
            return None;
        }

        let slot = cell.occupants().iter().position(|id| *id == occupant)?;
        let newer = cell.occupants()[slot + 1..]
            .iter()
            .filter(|id| sees(**id))
            .count();
        let index = usize::from(cell.has_ground()) + cell.top_item_count() + newer;
        Some(u32::try_from(index).unwrap_or(u32::MAX))
    }
}
