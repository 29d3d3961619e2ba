//! Tunable parameters of the world.

use overworld_core::Position;
use serde::Deserialize;
use thiserror::Error;

use crate::spectators::SpectatorRange;

const DEFAULT_VIEWPORT_X: u16 = 11;
const DEFAULT_VIEWPORT_Y: u16 = 11;

/// Settings applied when a world is constructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Horizontal reach of movement notifications in cells.
    pub viewport_x: u16,
    /// Vertical reach of movement notifications in cells.
    pub viewport_y: u16,
    /// Cell players are moved to when their cell is removed and they do not
    /// provide a fallback of their own.
    pub fallback_position: Option<Position>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            viewport_x: DEFAULT_VIEWPORT_X,
            viewport_y: DEFAULT_VIEWPORT_Y,
            fallback_position: None,
        }
    }
}

impl WorldConfig {
    /// Checks the settings for values the world cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.viewport_x == 0 || self.viewport_y == 0 {
            return Err(ConfigError::EmptyViewport {
                x: self.viewport_x,
                y: self.viewport_y,
            });
        }
        if let Some(position) = self.fallback_position {
            if !position.has_valid_floor() {
                return Err(ConfigError::FallbackOutOfBounds { position });
            }
        }
        Ok(())
    }

    /// Symmetric spectator range covering the configured viewport.
    #[must_use]
    pub fn viewport(&self) -> SpectatorRange {
        SpectatorRange::symmetric(i32::from(self.viewport_x), i32::from(self.viewport_y))
    }
}

/// Reasons a configuration may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Movement notifications would never reach anyone.
    #[error("viewport must be non-empty, got {x}x{y}")]
    EmptyViewport {
        /// Configured horizontal reach.
        x: u16,
        /// Configured vertical reach.
        y: u16,
    },
    /// The fallback cell lies outside the tracked floors.
    #[error("fallback position {position} is outside the tracked floors")]
    FallbackOutOfBounds {
        /// Rejected fallback.
        position: Position,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = WorldConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.viewport(), SpectatorRange::symmetric(11, 11));
    }

    #[test]
    fn rejects_empty_viewport() {
        let config = WorldConfig {
            viewport_x: 0,
            ..WorldConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyViewport { x: 0, y: 11 })
        ));
    }

    #[test]
    fn rejects_fallback_below_the_last_floor() {
        let config = WorldConfig {
            fallback_position: Some(Position::new(1, 1, 16)),
            ..WorldConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::FallbackOutOfBounds { .. })
        ));
    }
}
