#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system answering whether projectiles and sight lines connect two
//! positions of the world.
//!
//! Floors grow downward: the ground of the cell at `z` is what an occupant on
//! floor `z` stands on, and the ground of the cell at `z - 1` is its ceiling.
//! A sight line may change floors only through columns where the floor it
//! crosses has no ground. Missing cells are transparent.

use overworld_core::{CellFlags, Position, MAX_FLOOR, SURFACE_FLOOR};
use overworld_world::{query, World};

/// Largest floor difference a sight line may bridge.
pub const MAX_FLOOR_DELTA: u8 = 2;

/// Reports whether a sight line connects `from` with `to`.
///
/// `floor_penalty` bounds how many floors the eye may sink below `from` when
/// the source stands over a hole, and how far the line may climb above
/// `from` to pass over an obstacle. The line succeeds only when it ends
/// exactly on `to`.
#[must_use]
pub fn can_see(world: &World, from: Position, to: Position, floor_penalty: u8) -> bool {
    if from == to {
        return true;
    }
    if from.distance_z(to) > MAX_FLOOR_DELTA || from.is_underground() != to.is_underground() {
        return false;
    }

    let (band_top, band_bottom) = band_limits(from);
    let ceiling = from.z().saturating_sub(floor_penalty).max(band_top);

    let mut z = from.z();
    let mut sunk = 0;
    while sunk < floor_penalty && z < band_bottom && !has_ground(world, from.with_z(z)) {
        z += 1;
        sunk += 1;
    }

    let mut cursor = from.with_z(z);
    for point in Line::new(from, to) {
        cursor = step_toward(world, cursor, to.z());
        let next = Position::new(point.0, point.1, cursor.z());
        if (point.0, point.1) != (to.x(), to.y()) && blocks(world, next) {
            let Some(raised) = climb_over(world, cursor, next, ceiling) else {
                return false;
            };
            cursor = raised;
            continue;
        }
        cursor = next;
    }

    while cursor.z() != to.z() {
        let settled = step_toward(world, cursor, to.z());
        if settled == cursor {
            break;
        }
        cursor = settled;
    }

    cursor == to
}

/// Reports whether a straight line on one floor connects `from` with `to`.
///
/// With `floor_check` set, positions on different floors never connect;
/// otherwise the line is traced on the floor of `from`. The line is cast in
/// both directions and either one being unobstructed suffices.
#[must_use]
pub fn is_sight_clear(world: &World, from: Position, to: Position, floor_check: bool) -> bool {
    if floor_check && from.z() != to.z() {
        return false;
    }
    let target = to.with_z(from.z());
    is_line_clear(world, from, target) || is_line_clear(world, target, from)
}

/// Reports whether an item thrown from `from` can land on `to`.
///
/// The horizontal reach shrinks by one cell per floor of difference. With
/// `check_line` unset only the reach is validated.
#[must_use]
pub fn can_throw_to(
    world: &World,
    from: Position,
    to: Position,
    check_line: bool,
    range_x: u16,
    range_y: u16,
) -> bool {
    if from.is_underground() != to.is_underground() {
        return false;
    }
    let delta_z = from.distance_z(to);
    if delta_z > MAX_FLOOR_DELTA {
        return false;
    }
    let delta_z = u16::from(delta_z);
    if from.distance_x(to).saturating_sub(delta_z) > range_x
        || from.distance_y(to).saturating_sub(delta_z) > range_y
    {
        return false;
    }
    !check_line || can_see(world, from, to, MAX_FLOOR_DELTA)
}

fn is_line_clear(world: &World, from: Position, to: Position) -> bool {
    Line::new(from, to)
        .filter(|point| *point != (to.x(), to.y()))
        .all(|(x, y)| !blocks(world, Position::new(x, y, from.z())))
}

/// Lowest and highest floor index of the band containing `position`.
fn band_limits(position: Position) -> (u8, u8) {
    if position.is_underground() {
        (SURFACE_FLOOR + 1, MAX_FLOOR)
    } else {
        (0, SURFACE_FLOOR)
    }
}

fn has_ground(world: &World, position: Position) -> bool {
    query::cell(world, position).is_some_and(|cell| cell.has_ground())
}

fn blocks(world: &World, position: Position) -> bool {
    query::cell(world, position).is_some_and(|cell| cell.has_flag(CellFlags::BLOCKS_PROJECTILE))
}

/// Moves the cursor one floor toward `target_z` when the floor in between is
/// open at the cursor's column.
fn step_toward(world: &World, cursor: Position, target_z: u8) -> Position {
    let z = cursor.z();
    if target_z > z {
        if !has_ground(world, cursor) {
            return cursor.with_z(z + 1);
        }
    } else if target_z < z {
        let above = cursor.with_z(z - 1);
        if !has_ground(world, above) {
            return above;
        }
    }
    cursor
}

/// Lifts a blocked step one floor, rising through the open ceiling of the
/// column the line leaves.
fn climb_over(
    world: &World,
    cursor: Position,
    blocked: Position,
    ceiling: u8,
) -> Option<Position> {
    let z = cursor.z();
    if z <= ceiling {
        return None;
    }
    if has_ground(world, cursor.with_z(z - 1)) {
        return None;
    }
    let raised = blocked.with_z(z - 1);
    (!blocks(world, raised)).then_some(raised)
}

/// Horizontal points strictly after the start of a line, ending on its
/// target column and row.
///
/// Each point is the start plus the delta scaled by `i / steps` and rounded
/// half away from zero, where `steps` is the larger axis delta.
#[derive(Debug)]
struct Line {
    origin: (i32, i32),
    delta: (i32, i32),
    steps: i32,
    next: i32,
}

impl Line {
    fn new(from: Position, to: Position) -> Self {
        let delta = (
            i32::from(to.x()) - i32::from(from.x()),
            i32::from(to.y()) - i32::from(from.y()),
        );
        Self {
            origin: (i32::from(from.x()), i32::from(from.y())),
            delta,
            steps: delta.0.abs().max(delta.1.abs()),
            next: 1,
        }
    }
}

impl Iterator for Line {
    type Item = (u16, u16);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.steps {
            return None;
        }
        let i = self.next;
        self.next += 1;
        let x = self.origin.0 + scale(self.delta.0, i, self.steps);
        let y = self.origin.1 + scale(self.delta.1, i, self.steps);
        Some((u16::try_from(x).ok()?, u16::try_from(y).ok()?))
    }
}

fn scale(delta: i32, i: i32, steps: i32) -> i32 {
    let numerator = 2 * i64::from(delta) * i64::from(i);
    let steps = i64::from(steps);
    let rounded = if numerator >= 0 {
        (numerator + steps) / (2 * steps)
    } else {
        -((-numerator + steps) / (2 * steps))
    };
    // |rounded| <= |delta|
    rounded as i32
}
