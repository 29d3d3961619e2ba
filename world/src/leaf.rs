//! Leaf buckets of the spatial tree and the floors they own.

use overworld_core::{OccupantId, Position, MAP_LAYERS};

use crate::{
    cell::Cell,
    tree::{LeafIndex, FLOOR_MASK, FLOOR_SIZE},
};

const FLOOR_CELLS: usize = (FLOOR_SIZE as usize) * (FLOOR_SIZE as usize);

/// Dense grid of cell slots for one layer of a leaf.
#[derive(Debug)]
pub(crate) struct Floor {
    cells: Box<[Option<Box<Cell>>]>,
}

impl Floor {
    fn new() -> Self {
        Self {
            cells: (0..FLOOR_CELLS).map(|_| None).collect(),
        }
    }

    fn slot_index(x: u16, y: u16) -> usize {
        usize::from(x & FLOOR_MASK) * usize::from(FLOOR_SIZE) + usize::from(y & FLOOR_MASK)
    }

    pub(crate) fn cell(&self, x: u16, y: u16) -> Option<&Cell> {
        self.cells[Self::slot_index(x, y)].as_deref()
    }

    pub(crate) fn slot_mut(&mut self, x: u16, y: u16) -> &mut Option<Box<Cell>> {
        &mut self.cells[Self::slot_index(x, y)]
    }
}

/// Smallest bucket of the spatial tree.
///
/// Covers an aligned `FLOOR_SIZE` square on every floor and keeps the
/// occupants currently standing inside that footprint, with players tracked
/// in a second list so player-only queries never scan creatures.
#[derive(Debug)]
pub(crate) struct Leaf {
    origin: (u16, u16),
    floors: [Option<Box<Floor>>; MAP_LAYERS as usize],
    occupants: Vec<OccupantId>,
    players: Vec<OccupantId>,
    south: Option<LeafIndex>,
    east: Option<LeafIndex>,
}

impl Leaf {
    pub(crate) fn new(x: u16, y: u16) -> Self {
        Self {
            origin: (x & !FLOOR_MASK, y & !FLOOR_MASK),
            floors: std::array::from_fn(|_| None),
            occupants: Vec::new(),
            players: Vec::new(),
            south: None,
            east: None,
        }
    }

    pub(crate) fn origin(&self) -> (u16, u16) {
        self.origin
    }

    pub(crate) fn cell(&self, position: Position) -> Option<&Cell> {
        self.floors
            .get(usize::from(position.z()))?
            .as_deref()?
            .cell(position.x(), position.y())
    }

    pub(crate) fn cell_mut(&mut self, position: Position) -> Option<&mut Cell> {
        self.floors
            .get_mut(usize::from(position.z()))?
            .as_deref_mut()?
            .slot_mut(position.x(), position.y())
            .as_deref_mut()
    }

    /// Slot for the position, creating the floor when it does not exist yet.
    pub(crate) fn ensure_slot(&mut self, position: Position) -> Option<&mut Option<Box<Cell>>> {
        let floor = self.floors.get_mut(usize::from(position.z()))?;
        let floor = floor.get_or_insert_with(|| Box::new(Floor::new()));
        Some(floor.slot_mut(position.x(), position.y()))
    }

    /// Slot for the position if its floor exists.
    pub(crate) fn slot_mut(&mut self, position: Position) -> Option<&mut Option<Box<Cell>>> {
        let floor = self.floors.get_mut(usize::from(position.z()))?.as_deref_mut()?;
        Some(floor.slot_mut(position.x(), position.y()))
    }

    pub(crate) fn occupants(&self) -> &[OccupantId] {
        &self.occupants
    }

    pub(crate) fn players(&self) -> &[OccupantId] {
        &self.players
    }

    pub(crate) fn add_occupant(&mut self, occupant: OccupantId, is_player: bool) {
        self.occupants.push(occupant);
        if is_player {
            self.players.push(occupant);
        }
    }

    pub(crate) fn remove_occupant(&mut self, occupant: OccupantId, is_player: bool) {
        let removed = remove_id(&mut self.occupants, occupant);
        debug_assert!(removed, "occupant {occupant:?} missing from its leaf");
        if is_player {
            let removed = remove_id(&mut self.players, occupant);
            debug_assert!(removed, "player {occupant:?} missing from its leaf");
        }
    }

    pub(crate) fn south(&self) -> Option<LeafIndex> {
        self.south
    }

    pub(crate) fn east(&self) -> Option<LeafIndex> {
        self.east
    }

    pub(crate) fn set_south(&mut self, leaf: Option<LeafIndex>) {
        self.south = leaf;
    }

    pub(crate) fn set_east(&mut self, leaf: Option<LeafIndex>) {
        self.east = leaf;
    }
}

fn remove_id(list: &mut Vec<OccupantId>, occupant: OccupantId) -> bool {
    match list.iter().position(|id| *id == occupant) {
        Some(index) => {
            let _ = list.swap_remove(index);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overworld_core::Item;

    #[test]
    fn origin_is_aligned_to_floor_size() {
        let leaf = Leaf::new(21, 34);
        assert_eq!(leaf.origin(), (16, 32));
    }

    #[test]
    fn floors_are_created_lazily() {
        let mut leaf = Leaf::new(0, 0);
        let position = Position::new(3, 5, 9);
        assert!(leaf.slot_mut(position).is_none());

        let slot = leaf.ensure_slot(position).expect("valid floor");
        *slot = Some(Box::new(Cell::with_ground(Item::ground(4))));

        assert!(leaf.cell(position).is_some());
        assert!(leaf.cell(position.with_z(8)).is_none());
        assert!(leaf.ensure_slot(position.with_z(16)).is_none());
    }

    #[test]
    fn player_membership_tracks_both_lists() {
        let mut leaf = Leaf::new(0, 0);
        leaf.add_occupant(OccupantId::new(1), true);
        leaf.add_occupant(OccupantId::new(2), false);
        assert_eq!(leaf.occupants().len(), 2);
        assert_eq!(leaf.players(), &[OccupantId::new(1)]);

        leaf.remove_occupant(OccupantId::new(1), true);
        assert_eq!(leaf.occupants(), &[OccupantId::new(2)]);
        assert!(leaf.players().is_empty());
    }
}
