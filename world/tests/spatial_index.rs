use overworld_core::{
    CellFlags, Event, Item, OccupantProfile, PlacementError, Position, ReplacePolicy,
};
use overworld_world::{query, Cell, World, WorldConfig};

fn floor_cell() -> Cell {
    Cell::with_ground(Item::ground(102))
}

#[test]
fn set_then_get_returns_the_stored_cell_and_remove_clears_it() {
    let mut world = World::new();
    let mut events = Vec::new();
    let position = Position::new(32_000, 31_999, 9);
    let cell = floor_cell()
        .with_item(Item::new(1987, CellFlags::BLOCKS_PROJECTILE))
        .with_zone(CellFlags::PROTECTION_ZONE);

    world.set_cell(position, cell.clone(), ReplacePolicy::Merge, &mut events);
    assert_eq!(query::cell(&world, position), Some(&cell));
    assert_eq!(query::cell(&world, position.with_z(8)), None);

    let removed = world
        .remove_cell(position, &mut events)
        .expect("cell was stored");
    assert_eq!(removed.items.len(), 2, "ground and item released");
    assert_eq!(query::cell(&world, position), None);
    assert!(world.remove_cell(position, &mut events).is_none());
}

#[test]
fn neighbor_links_resolve_in_every_creation_order() {
    let origins: [(u16, u16); 4] = [(64, 64), (72, 64), (64, 72), (72, 72)];
    let orders: [[usize; 4]; 4] = [[0, 1, 2, 3], [3, 2, 1, 0], [1, 3, 0, 2], [2, 0, 3, 1]];

    for order in orders {
        let mut world = World::new();
        for slot in order {
            let (x, y) = origins[slot];
            let _ = world.ensure_leaf(x, y);
        }

        let north_west = query::leaf(&world, 64, 64).expect("leaf created");
        let east = north_west.east().expect("east link");
        let south = north_west.south().expect("south link");
        assert_eq!(east.origin(), (72, 64), "order {order:?}");
        assert_eq!(south.origin(), (64, 72), "order {order:?}");
        assert_eq!(
            east.south().map(|leaf| leaf.origin()),
            Some((72, 72)),
            "order {order:?}"
        );
        assert_eq!(
            south.east().map(|leaf| leaf.origin()),
            Some((72, 72)),
            "order {order:?}"
        );
    }
}

#[test]
fn ensure_leaf_is_idempotent() {
    let mut world = World::new();
    let origin = world.ensure_leaf(1234, 4321).origin();
    assert_eq!(origin, (1232, 4320));
    assert_eq!(world.ensure_leaf(1239, 4327).origin(), origin);
    assert_eq!(query::leaf_count(&world), 1);
}

#[test]
fn removing_a_cell_relocates_players_and_evicts_creatures() {
    let fallback = Position::new(500, 500, 7);
    let config = WorldConfig {
        fallback_position: Some(fallback),
        ..WorldConfig::default()
    };
    let mut world = World::with_config(config).expect("valid config");
    let mut events = Vec::new();
    let doomed = Position::new(100, 100, 7);
    world.set_cell(doomed, floor_cell(), ReplacePolicy::Merge, &mut events);
    world.set_cell(fallback, floor_cell(), ReplacePolicy::Merge, &mut events);

    let player = world
        .place_occupant(Box::new(OccupantProfile::player()), doomed, &mut events)
        .expect("cell exists");
    let creature = world
        .place_occupant(Box::new(OccupantProfile::creature()), doomed, &mut events)
        .expect("cell exists");
    events.clear();

    let removed = world
        .remove_cell(doomed, &mut events)
        .expect("cell was stored");

    assert_eq!(removed.relocated, vec![player]);
    assert_eq!(removed.evicted, vec![creature]);
    assert_eq!(query::occupant_position(&world, player), Some(fallback));
    assert_eq!(query::occupant_position(&world, creature), None);
    assert_eq!(
        query::cell(&world, fallback).map(|cell| cell.occupants().to_vec()),
        Some(vec![player])
    );
    assert_eq!(
        query::leaf(&world, 100, 100).map(|leaf| leaf.occupants().len()),
        Some(0),
        "old leaf keeps no stale ids"
    );
    assert!(matches!(
        events.as_slice(),
        [
            Event::OccupantRelocated { .. },
            Event::OccupantEvicted { .. },
            Event::CellRemoved {
                items_released: 1,
                ..
            }
        ]
    ));
}

#[test]
fn personal_fallback_wins_over_configured_one() {
    let configured = Position::new(10, 10, 7);
    let personal = Position::new(20, 20, 6);
    let mut world = World::with_config(WorldConfig {
        fallback_position: Some(configured),
        ..WorldConfig::default()
    })
    .expect("valid config");
    let mut events = Vec::new();
    let doomed = Position::new(0, 0, 7);
    for position in [doomed, configured, personal] {
        world.set_cell(position, floor_cell(), ReplacePolicy::Merge, &mut events);
    }

    let player = world
        .place_occupant(
            Box::new(OccupantProfile {
                fallback: Some(personal),
                ..OccupantProfile::player()
            }),
            doomed,
            &mut events,
        )
        .expect("cell exists");

    let _ = world.remove_cell(doomed, &mut events);

    assert_eq!(query::occupant_position(&world, player), Some(personal));
}

#[test]
fn players_without_a_reachable_fallback_are_evicted() {
    let mut world = World::new();
    let mut events = Vec::new();
    let doomed = Position::new(0, 0, 7);
    world.set_cell(doomed, floor_cell(), ReplacePolicy::Merge, &mut events);
    let player = world
        .place_occupant(
            Box::new(OccupantProfile {
                fallback: Some(Position::new(9, 9, 7)),
                ..OccupantProfile::player()
            }),
            doomed,
            &mut events,
        )
        .expect("cell exists");

    let removed = world
        .remove_cell(doomed, &mut events)
        .expect("cell was stored");

    assert_eq!(removed.evicted, vec![player]);
    assert_eq!(query::occupant_count(&world), 0);
}

#[test]
fn invalid_world_config_is_rejected() {
    let config = WorldConfig {
        viewport_y: 0,
        ..WorldConfig::default()
    };
    assert!(World::with_config(config).is_err());
}

#[test]
fn moving_an_unknown_occupant_fails() {
    let mut world = World::new();
    let mut events = Vec::new();
    let position = Position::new(1, 1, 7);
    world.set_cell(position, floor_cell(), ReplacePolicy::Merge, &mut events);
    let id = world
        .place_occupant(Box::new(OccupantProfile::creature()), position, &mut events)
        .expect("cell exists");
    let _ = world.remove_occupant(id, &mut events);

    assert_eq!(
        world.move_occupant(id, position, false, &mut events),
        Err(PlacementError::UnknownOccupant)
    );
}
