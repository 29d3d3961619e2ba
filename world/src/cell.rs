//! Contents of a single map location.

use overworld_core::{CellFlags, HazardKind, Item, OccupantId};

/// Ground, stacked items and occupants of one `(x, y, z)` location.
///
/// Items are stored bottom to top. Occupants are stored in arrival order;
/// the newest occupant is drawn first. Occupants can only be attached by the
/// world; a cell handed to the world is stored without the occupants a
/// clone may have copied.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cell {
    ground: Option<Item>,
    items: Vec<Item>,
    occupants: Vec<OccupantId>,
    zone: CellFlags,
}

impl Cell {
    /// Creates a cell without ground, items or zone flags.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cell standing on the provided ground.
    #[must_use]
    pub fn with_ground(ground: Item) -> Self {
        Self {
            ground: Some(ground),
            ..Self::default()
        }
    }

    /// Stacks an item on top of the cell while building it.
    #[must_use]
    pub fn with_item(mut self, item: Item) -> Self {
        self.items.push(item);
        self
    }

    /// Adds cell-level flags such as [`CellFlags::PROTECTION_ZONE`].
    #[must_use]
    pub fn with_zone(mut self, zone: CellFlags) -> Self {
        self.zone |= zone;
        self
    }

    /// Ground item, if any.
    #[must_use]
    pub fn ground(&self) -> Option<&Item> {
        self.ground.as_ref()
    }

    /// Reports whether the cell has ground to stand on.
    #[must_use]
    pub fn has_ground(&self) -> bool {
        self.ground.is_some()
    }

    /// Stacked items ordered bottom to top.
    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Occupants in arrival order.
    #[must_use]
    pub fn occupants(&self) -> &[OccupantId] {
        &self.occupants
    }

    /// Cell-level flags, excluding those contributed by items.
    #[must_use]
    pub fn zone(&self) -> CellFlags {
        self.zone
    }

    /// Union of the zone flags and the flags of every item, ground included.
    #[must_use]
    pub fn flags(&self) -> CellFlags {
        let mut flags = self.zone;
        if let Some(ground) = &self.ground {
            flags |= ground.flags();
        }
        for item in &self.items {
            flags |= item.flags();
        }
        flags
    }

    /// Reports whether any flag in `flag` is present.
    #[must_use]
    pub fn has_flag(&self, flag: CellFlags) -> bool {
        self.flags().intersects(flag)
    }

    /// Hazard of the topmost damaging field on the cell.
    #[must_use]
    pub fn hazard(&self) -> Option<HazardKind> {
        self.items
            .iter()
            .rev()
            .chain(self.ground.iter())
            .find_map(Item::hazard)
    }

    /// Number of stacked items drawn above occupants.
    #[must_use]
    pub fn top_item_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.is_always_on_top())
            .count()
    }

    /// Replaces the ground, returning the previous one.
    pub fn set_ground(&mut self, ground: Item) -> Option<Item> {
        self.ground.replace(ground)
    }

    /// Stacks an item on top of the cell.
    pub fn add_item(&mut self, item: Item) {
        self.items.push(item);
    }

    /// Removes and returns the topmost stacked item.
    pub fn pop_item(&mut self) -> Option<Item> {
        self.items.pop()
    }

    pub(crate) fn push_occupant(&mut self, occupant: OccupantId) {
        self.occupants.push(occupant);
    }

    pub(crate) fn remove_occupant(&mut self, occupant: OccupantId) -> bool {
        match self.occupants.iter().position(|id| *id == occupant) {
            Some(index) => {
                let _ = self.occupants.remove(index);
                true
            }
            None => false,
        }
    }

    /// Drops occupant ids copied along with a cloned cell. Only the world
    /// attaches occupants to stored cells.
    pub(crate) fn detach_occupants(&mut self) {
        self.occupants.clear();
    }

    /// Folds the ground, items and zone of `incoming` into this cell.
    ///
    /// Incoming items land on top of the existing stack in their original
    /// order and incoming ground replaces the existing ground. Occupants
    /// registered here are untouched and those listed by `incoming` are
    /// ignored.
    pub(crate) fn absorb(&mut self, incoming: Cell) {
        let Cell {
            ground,
            items,
            occupants: _,
            zone,
        } = incoming;
        self.items.extend(items);
        if let Some(ground) = ground {
            let _ = self.ground.replace(ground);
        }
        self.zone |= zone;
    }

    /// Consumes the cell, yielding its ground followed by its items.
    pub(crate) fn into_items(self) -> Vec<Item> {
        let mut released = Vec::with_capacity(self.items.len() + 1);
        released.extend(self.ground);
        released.extend(self.items);
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_merge_zone_ground_and_items() {
        let cell = Cell::with_ground(Item::new(100, CellFlags::FLOOR_CHANGE))
            .with_item(Item::new(200, CellFlags::BLOCKS_PROJECTILE))
            .with_zone(CellFlags::PROTECTION_ZONE);

        let flags = cell.flags();
        assert!(flags.contains(CellFlags::FLOOR_CHANGE));
        assert!(flags.contains(CellFlags::BLOCKS_PROJECTILE));
        assert!(flags.contains(CellFlags::PROTECTION_ZONE));
        assert!(!cell.has_flag(CellFlags::BLOCKS_PATH));
    }

    #[test]
    fn hazard_reports_topmost_field() {
        let cell = Cell::with_ground(Item::ground(1))
            .with_item(Item::new(2, CellFlags::NONE).with_hazard(HazardKind::Poison))
            .with_item(Item::new(3, CellFlags::NONE).with_hazard(HazardKind::Fire))
            .with_item(Item::new(4, CellFlags::NONE));

        assert_eq!(cell.hazard(), Some(HazardKind::Fire));
        assert_eq!(Cell::with_ground(Item::ground(1)).hazard(), None);
    }

    #[test]
    fn absorb_stacks_incoming_items_and_replaces_ground() {
        let mut existing = Cell::with_ground(Item::ground(1)).with_item(Item::ground(10));
        existing.push_occupant(OccupantId::new(7));
        let incoming = Cell::with_ground(Item::ground(2))
            .with_item(Item::ground(20))
            .with_item(Item::ground(21))
            .with_zone(CellFlags::PROTECTION_ZONE);

        existing.absorb(incoming);

        assert_eq!(existing.ground().map(Item::kind), Some(2));
        let kinds: Vec<u16> = existing.items().iter().map(Item::kind).collect();
        assert_eq!(kinds, vec![10, 20, 21]);
        assert_eq!(existing.occupants(), &[OccupantId::new(7)]);
        assert!(existing.zone().contains(CellFlags::PROTECTION_ZONE));
    }

    #[test]
    fn absorb_keeps_existing_ground_when_incoming_has_none() {
        let mut existing = Cell::with_ground(Item::ground(1));
        existing.absorb(Cell::new().with_item(Item::ground(5)));
        assert_eq!(existing.ground().map(Item::kind), Some(1));
        assert_eq!(existing.items().len(), 1);
    }

    #[test]
    fn absorb_ignores_occupants_of_the_incoming_cell() {
        let mut incoming = Cell::with_ground(Item::ground(2));
        incoming.push_occupant(OccupantId::new(9));
        let mut existing = Cell::with_ground(Item::ground(1));

        existing.absorb(incoming);

        assert!(existing.occupants().is_empty());
    }

    #[test]
    fn top_item_count_ignores_regular_items() {
        let cell = Cell::with_ground(Item::ground(1))
            .with_item(Item::new(2, CellFlags::ALWAYS_ON_TOP))
            .with_item(Item::ground(3));
        assert_eq!(cell.top_item_count(), 1);
    }
}
