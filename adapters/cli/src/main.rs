#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that loads an ASCII layout and answers path, sight
//! and spectator queries against it.

mod layout;
mod settings;

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use overworld_core::{FindPathParams, OccupantProfile, Position};
use overworld_system_line_of_sight::can_see;
use overworld_system_pathfinding::{Pathfinder, TargetCondition};
use overworld_world::{query, World};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{layout::Layout, settings::Settings};

const DEFAULT_LOG_FILTER: &str = "overworld=info";

#[derive(Debug, Parser)]
#[command(
    name = "overworld",
    about = "Query paths, sight lines and spectators on an ASCII layout"
)]
struct Cli {
    /// Layout file describing the cells to load.
    #[arg(long, short)]
    layout: PathBuf,
    /// TOML file with optional `[world]` and `[pathfinder]` tables.
    #[arg(long, short)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Searches a route between two cells of one floor.
    Path {
        /// Start cell as `x,y,z`.
        #[arg(long, value_parser = parse_position)]
        from: Position,
        /// Target cell as `x,y,z`.
        #[arg(long, value_parser = parse_position)]
        to: Position,
        /// Smallest acceptable distance to the target.
        #[arg(long, default_value_t = 0)]
        min_distance: i32,
        /// Largest acceptable distance to the target.
        #[arg(long, default_value_t = 0)]
        max_distance: i32,
        /// Caps the column and row distance from the start; zero uses the
        /// closed-node budget instead.
        #[arg(long, default_value_t = 0)]
        max_search: u16,
        /// Forbids diagonal steps after the first one.
        #[arg(long)]
        orthogonal: bool,
        /// Requires a clear line from the destination to the target.
        #[arg(long)]
        clear_sight: bool,
        /// Plans as a player, who may cross protection zones.
        #[arg(long)]
        player: bool,
    },
    /// Tests whether one cell can see another.
    Sight {
        /// Eye position as `x,y,z`.
        #[arg(long, value_parser = parse_position)]
        from: Position,
        /// Observed position as `x,y,z`.
        #[arg(long, value_parser = parse_position)]
        to: Position,
        /// Floors the eye may sink through open holes, and floors the line
        /// may climb above the eye to clear an obstacle.
        #[arg(long, default_value_t = 0)]
        floor_penalty: u8,
    },
    /// Lists occupants that observe a cell.
    Spectators {
        /// Observed position as `x,y,z`.
        #[arg(long, value_parser = parse_position)]
        at: Position,
        /// Horizontal reach; defaults to the configured viewport.
        #[arg(long)]
        range_x: Option<i32>,
        /// Vertical reach; defaults to the configured viewport.
        #[arg(long)]
        range_y: Option<i32>,
        /// Only reports players.
        #[arg(long)]
        players_only: bool,
        /// Only inspects the floor of the observed position.
        #[arg(long)]
        single_floor: bool,
    },
}

fn parse_position(value: &str) -> Result<Position, String> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    let [x, y, z] = parts.as_slice() else {
        return Err(format!("expected x,y,z but got '{value}'"));
    };
    let x = x.parse().map_err(|_| format!("invalid column '{x}'"))?;
    let y = y.parse().map_err(|_| format!("invalid row '{y}'"))?;
    let z = z.parse().map_err(|_| format!("invalid floor '{z}'"))?;
    Ok(Position::new(x, y, z))
}

fn install_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Entry point for the Overworld command-line interface.
fn main() -> Result<()> {
    install_tracing();
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let source = fs::read_to_string(&cli.layout)
        .with_context(|| format!("failed to read layout {}", cli.layout.display()))?;
    let layout = Layout::parse(&source)
        .with_context(|| format!("invalid layout {}", cli.layout.display()))?;
    let world = layout.build(settings.world)?;
    info!(
        cells = layout.cell_count(),
        occupants = query::occupant_count(&world),
        leaves = query::leaf_count(&world),
        "layout loaded"
    );

    match cli.command {
        Command::Path {
            from,
            to,
            min_distance,
            max_distance,
            max_search,
            orthogonal,
            clear_sight,
            player,
        } => {
            let params = FindPathParams {
                max_search_dist: max_search,
                min_target_dist: min_distance,
                max_target_dist: max_distance,
                allow_diagonal: !orthogonal,
                clear_sight,
                ..FindPathParams::default()
            };
            let mover = if player {
                OccupantProfile::player()
            } else {
                OccupantProfile::creature()
            };
            let mut pathfinder = Pathfinder::with_config(settings.pathfinder)?;
            run_path(&mut pathfinder, &world, &mover, from, to, &params);
        }
        Command::Sight {
            from,
            to,
            floor_penalty,
        } => {
            let verdict = if can_see(&world, from, to, floor_penalty) {
                "visible"
            } else {
                "blocked"
            };
            println!("{from} -> {to}: {verdict}");
        }
        Command::Spectators {
            at,
            range_x,
            range_y,
            players_only,
            single_floor,
        } => {
            let range_x = range_x.unwrap_or_else(|| i32::from(settings.world.viewport_x));
            let range_y = range_y.unwrap_or_else(|| i32::from(settings.world.viewport_y));
            let spectators =
                query::find_spectators(&world, at, !single_floor, players_only, range_x, range_y);
            println!("{} spectators of {at}", spectators.len());
            for occupant in spectators.iter() {
                let Some(position) = query::occupant_position(&world, occupant) else {
                    continue;
                };
                let role = match query::occupant(&world, occupant) {
                    Some(profile) if profile.is_player() => "player",
                    _ => "creature",
                };
                println!("  #{} {role} at {position}", occupant.get());
            }
        }
    }
    Ok(())
}

fn run_path(
    pathfinder: &mut Pathfinder,
    world: &World,
    mover: &OccupantProfile,
    from: Position,
    to: Position,
    params: &FindPathParams,
) {
    let result = pathfinder.find_path(world, mover, from, &TargetCondition::new(to), params);
    let stats = pathfinder.last_search();
    info!(
        nodes = stats.nodes_allocated,
        closed = stats.closed,
        examined = stats.neighbors_examined,
        pool_exhausted = stats.pool_exhausted,
        "search finished"
    );
    match result {
        Some(path) => {
            let steps: Vec<String> = path
                .directions
                .iter()
                .map(|direction| format!("{direction:?}"))
                .collect();
            println!(
                "path {from} -> {}: cost {}, {} steps",
                path.destination,
                path.cost,
                steps.len()
            );
            if !steps.is_empty() {
                println!("  {}", steps.join(" "));
            }
        }
        None => println!("no path {from} -> {to}"),
    }
}
