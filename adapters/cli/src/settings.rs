//! Optional TOML settings for the world and the pathfinder.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use overworld_system_pathfinding::PathfinderConfig;
use overworld_world::WorldConfig;
use serde::Deserialize;

/// Settings file contents; missing tables fall back to the defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Settings {
    /// World construction parameters.
    pub(crate) world: WorldConfig,
    /// Search limits and step costs.
    pub(crate) pathfinder: PathfinderConfig,
}

impl Settings {
    /// Reads and validates the settings stored at `path`.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid settings in {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        let settings: Self = toml::from_str(contents).context("failed to parse settings toml")?;
        settings.world.validate()?;
        settings.pathfinder.validate()?;
        Ok(settings)
    }
}
