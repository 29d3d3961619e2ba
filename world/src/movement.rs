//! Occupant movement between cells.

use overworld_core::{Direction, Event, ObserverStack, OccupantId, PlacementError, Position};

use crate::{query, World};

/// Summary of a completed move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Reports whether the move was classified as a teleport.
    pub teleport: bool,
    /// Facing of the occupant after the move.
    pub facing: Direction,
    /// Reports whether the occupant changed leaves.
    pub crossed_leaf: bool,
}

impl World {
    /// Moves a registered occupant onto the cell at `destination`.
    ///
    /// The move counts as a teleport when forced, when the destination has
    /// no ground, or when it is not a neighboring cell on the same floor.
    /// Every player watching either cell receives its stack index of the
    /// occupant before and after the move through [`Event::OccupantMoved`].
    pub fn move_occupant(
        &mut self,
        occupant: OccupantId,
        destination: Position,
        force_teleport: bool,
        out_events: &mut Vec<Event>,
    ) -> Result<MoveOutcome, PlacementError> {
        if !destination.has_valid_floor() {
            return Err(PlacementError::OutOfBounds);
        }
        let (from, facing) = self
            .occupants
            .get(&occupant)
            .map(|entry| (entry.position, entry.facing))
            .ok_or(PlacementError::UnknownOccupant)?;
        let target = query::cell(self, destination).ok_or(PlacementError::MissingCell)?;
        let teleport = force_teleport || !target.has_ground() || !from.is_adjacent(destination);

        let viewport = self.config.viewport();
        let mut spectators = self.spectators(from, true, false, viewport);
        spectators.merge(&self.spectators(destination, true, false, viewport));

        let snapshots: Vec<(OccupantId, Option<u32>)> = spectators
            .iter()
            .filter(|id| self.occupants.get(id).is_some_and(|entry| entry.is_player))
            .map(|observer| {
                (
                    observer,
                    query::client_stack_index(self, from, occupant, observer),
                )
            })
            .collect();

        let crossed_leaf = self.transfer(occupant, destination);
        let facing = facing_after(from, destination, teleport, facing);
        if let Some(entry) = self.occupants.get_mut(&occupant) {
            entry.facing = facing;
        }

        let observers = snapshots
            .into_iter()
            .map(|(observer, old_stack)| ObserverStack {
                observer,
                old_stack,
                new_stack: query::client_stack_index(self, destination, occupant, observer),
            })
            .collect();
        out_events.push(Event::OccupantMoved {
            occupant,
            from,
            to: destination,
            teleport,
            facing,
            observers,
            spectators: spectators.into_vec(),
        });

        Ok(MoveOutcome {
            teleport,
            facing,
            crossed_leaf,
        })
    }
}

/// Facing after moving from `from` to `to`.
///
/// Walks resolve the row change before the column change, teleports resolve
/// the column change first. A move that changes neither keeps `current`.
pub(crate) fn facing_after(
    from: Position,
    to: Position,
    teleport: bool,
    current: Direction,
) -> Direction {
    let vertical = match to.y().cmp(&from.y()) {
        std::cmp::Ordering::Less => Some(Direction::North),
        std::cmp::Ordering::Greater => Some(Direction::South),
        std::cmp::Ordering::Equal => None,
    };
    let horizontal = match to.x().cmp(&from.x()) {
        std::cmp::Ordering::Less => Some(Direction::West),
        std::cmp::Ordering::Greater => Some(Direction::East),
        std::cmp::Ordering::Equal => None,
    };
    let resolved = if teleport {
        horizontal.or(vertical)
    } else {
        vertical.or(horizontal)
    };
    resolved.unwrap_or(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_prefer_rows() {
        let from = Position::new(10, 10, 7);
        assert_eq!(
            facing_after(from, Position::new(11, 9, 7), false, Direction::South),
            Direction::North
        );
        assert_eq!(
            facing_after(from, Position::new(9, 11, 7), false, Direction::North),
            Direction::South
        );
        assert_eq!(
            facing_after(from, Position::new(9, 10, 7), false, Direction::North),
            Direction::West
        );
    }

    #[test]
    fn teleports_prefer_columns() {
        let from = Position::new(10, 10, 7);
        assert_eq!(
            facing_after(from, Position::new(30, 2, 7), true, Direction::South),
            Direction::East
        );
        assert_eq!(
            facing_after(from, Position::new(10, 2, 7), true, Direction::South),
            Direction::North
        );
    }

    #[test]
    fn vertical_only_moves_keep_facing() {
        let from = Position::new(10, 10, 7);
        assert_eq!(
            facing_after(from, Position::new(10, 10, 6), true, Direction::West),
            Direction::West
        );
    }
}
