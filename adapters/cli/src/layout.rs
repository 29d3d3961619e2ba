//! ASCII layouts loaded into a fresh world.
//!
//! Each character is one cell, the first line being row zero. A line of the
//! form `floor N` switches the floor of the rows that follow and restarts the
//! row count; rows before the first such line land on the surface floor.
//!
//! | glyph | cell |
//! |-------|------|
//! | ` `   | no cell |
//! | `.`   | ground |
//! | `#`   | ground under a wall |
//! | `~`   | ground covered by a fire field |
//! | `z`   | ground inside a protection zone |
//! | `o`   | open hole without ground |
//! | `@`   | ground with a player |
//! | `c`   | ground with a creature |
//! | `p`   | ground with a pushable creature |

use overworld_core::{
    CellFlags, HazardKind, Item, OccupantProfile, PlacementError, Position, ReplacePolicy,
};
use overworld_world::{Cell, ConfigError, World, WorldConfig};
use thiserror::Error;
use tracing::debug;

const SURFACE_FLOOR: u8 = 7;
const FLOOR_HEADER: &str = "floor ";

const GROUND_KIND: u16 = 102;
const WALL_KIND: u16 = 1284;
const FIRE_FIELD_KIND: u16 = 1487;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tile {
    Ground,
    Wall,
    Fire,
    Sanctuary,
    Hole,
    Player,
    Creature,
    Pushable,
}

impl Tile {
    fn from_glyph(glyph: char) -> Option<Self> {
        let tile = match glyph {
            '.' => Self::Ground,
            '#' => Self::Wall,
            '~' => Self::Fire,
            'z' => Self::Sanctuary,
            'o' => Self::Hole,
            '@' => Self::Player,
            'c' => Self::Creature,
            'p' => Self::Pushable,
            _ => return None,
        };
        Some(tile)
    }

    fn cell(self) -> Cell {
        let ground = Cell::with_ground(Item::ground(GROUND_KIND));
        match self {
            Self::Ground | Self::Player | Self::Creature | Self::Pushable => ground,
            Self::Wall => ground.with_item(Item::new(
                WALL_KIND,
                CellFlags::BLOCKS_PATH | CellFlags::BLOCKS_PROJECTILE,
            )),
            Self::Fire => ground
                .with_item(Item::new(FIRE_FIELD_KIND, CellFlags::NONE).with_hazard(HazardKind::Fire)),
            Self::Sanctuary => ground.with_zone(CellFlags::PROTECTION_ZONE),
            Self::Hole => Cell::new(),
        }
    }

    fn occupant(self) -> Option<OccupantProfile> {
        match self {
            Self::Player => Some(OccupantProfile::player()),
            Self::Creature => Some(OccupantProfile::creature()),
            Self::Pushable => Some(OccupantProfile {
                pushable: true,
                ..OccupantProfile::creature()
            }),
            _ => None,
        }
    }
}

/// Cells described by a layout file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Layout {
    tiles: Vec<(Position, Tile)>,
}

impl Layout {
    /// Parses a layout, rejecting glyphs and floors the world cannot hold.
    pub(crate) fn parse(source: &str) -> Result<Self, LayoutError> {
        let mut tiles = Vec::new();
        let mut floor = SURFACE_FLOOR;
        let mut row: usize = 0;

        for (index, line) in source.lines().enumerate() {
            let line_number = index + 1;
            if let Some(value) = line.trim().strip_prefix(FLOOR_HEADER) {
                floor = parse_floor(value.trim(), line_number)?;
                row = 0;
                continue;
            }

            let y = u16::try_from(row).map_err(|_| LayoutError::TooLarge { line: line_number })?;
            for (column, glyph) in line.trim_end().chars().enumerate() {
                if glyph == ' ' {
                    continue;
                }
                let tile = Tile::from_glyph(glyph).ok_or(LayoutError::UnknownGlyph {
                    glyph,
                    line: line_number,
                    column: column + 1,
                })?;
                let x = u16::try_from(column)
                    .map_err(|_| LayoutError::TooLarge { line: line_number })?;
                tiles.push((Position::new(x, y, floor), tile));
            }
            row += 1;
        }

        if tiles.is_empty() {
            return Err(LayoutError::Empty);
        }
        Ok(Self { tiles })
    }

    /// Number of cells the layout describes.
    pub(crate) fn cell_count(&self) -> usize {
        self.tiles.len()
    }

    /// Builds a world holding every cell and occupant of the layout.
    pub(crate) fn build(&self, config: WorldConfig) -> Result<World, LayoutError> {
        let mut world = World::with_config(config)?;
        let mut events = Vec::new();
        for (position, tile) in &self.tiles {
            world.set_cell(*position, tile.cell(), ReplacePolicy::KeepExisting, &mut events);
        }
        for (position, tile) in &self.tiles {
            if let Some(profile) = tile.occupant() {
                let _ = world
                    .place_occupant(Box::new(profile), *position, &mut events)
                    .map_err(|source| LayoutError::Placement {
                        position: *position,
                        source,
                    })?;
            }
        }
        debug!(cells = self.tiles.len(), events = events.len(), "layout built");
        Ok(world)
    }
}

fn parse_floor(value: &str, line: usize) -> Result<u8, LayoutError> {
    let floor = value
        .parse::<u8>()
        .map_err(|_| LayoutError::InvalidFloor {
            value: value.to_owned(),
            line,
        })?;
    if !Position::new(0, 0, floor).has_valid_floor() {
        return Err(LayoutError::InvalidFloor {
            value: value.to_owned(),
            line,
        });
    }
    Ok(floor)
}

/// Reasons a layout cannot be loaded.
#[derive(Debug, Error)]
pub(crate) enum LayoutError {
    /// The layout contains no cells.
    #[error("layout contains no cells")]
    Empty,
    /// A glyph has no cell meaning.
    #[error("unknown glyph '{glyph}' at line {line}, column {column}")]
    UnknownGlyph {
        /// Offending character.
        glyph: char,
        /// One-based line number.
        line: usize,
        /// One-based column number.
        column: usize,
    },
    /// A floor header names a floor outside the tracked range.
    #[error("invalid floor '{value}' at line {line}")]
    InvalidFloor {
        /// Text following the header.
        value: String,
        /// One-based line number.
        line: usize,
    },
    /// Rows or columns exceed the coordinate space.
    #[error("layout exceeds the coordinate space at line {line}")]
    TooLarge {
        /// One-based line number.
        line: usize,
    },
    /// The world settings were rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// An occupant could not be placed on its cell.
    #[error("could not place occupant at {position}")]
    Placement {
        /// Cell the occupant was meant to stand on.
        position: Position,
        /// Rejection reported by the world.
        #[source]
        source: PlacementError,
    },
}

#[cfg(test)]
mod tests {
    use overworld_core::CellFlags;
    use overworld_world::query;

    use super::*;

    #[test]
    fn glyphs_map_to_cells_on_the_surface_floor() {
        let layout = Layout::parse("#.~\nzo@\n").expect("layout parses");
        let world = layout.build(WorldConfig::default()).expect("world builds");

        let wall = query::cell(&world, Position::new(0, 0, 7)).expect("wall cell");
        assert!(wall.has_flag(CellFlags::BLOCKS_PATH));
        assert!(wall.has_flag(CellFlags::BLOCKS_PROJECTILE));
        let fire = query::cell(&world, Position::new(2, 0, 7)).expect("fire cell");
        assert_eq!(fire.hazard(), Some(HazardKind::Fire));
        let zone = query::cell(&world, Position::new(0, 1, 7)).expect("zone cell");
        assert!(zone.has_flag(CellFlags::PROTECTION_ZONE));
        let hole = query::cell(&world, Position::new(1, 1, 7)).expect("hole cell");
        assert!(!hole.has_ground());
        assert_eq!(query::occupant_count(&world), 1);
    }

    #[test]
    fn floor_headers_restart_rows() {
        let layout = Layout::parse("..\nfloor 6\n  .\n").expect("layout parses");
        let world = layout.build(WorldConfig::default()).expect("world builds");

        assert_eq!(layout.cell_count(), 3);
        assert!(query::cell(&world, Position::new(2, 0, 6)).is_some());
        assert!(query::cell(&world, Position::new(2, 0, 7)).is_none());
    }

    #[test]
    fn rejects_unknown_glyphs_with_their_location() {
        let error = Layout::parse("..\n.x\n").expect_err("unknown glyph");
        assert!(matches!(
            error,
            LayoutError::UnknownGlyph {
                glyph: 'x',
                line: 2,
                column: 2
            }
        ));
    }

    #[test]
    fn rejects_floors_outside_the_tracked_range() {
        let error = Layout::parse("floor 16\n.\n").expect_err("floor out of range");
        assert!(matches!(error, LayoutError::InvalidFloor { line: 1, .. }));
    }

    #[test]
    fn rejects_layouts_without_cells() {
        assert!(matches!(Layout::parse("\n  \n"), Err(LayoutError::Empty)));
    }
}
