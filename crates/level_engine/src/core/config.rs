//! # Engine and World Configuration
//!
//! Settings that shape a world before anything is placed in it: the cell
//! size of its spatial grid, how locator hitboxes are ordered for drawing,
//! and how fast time passes. [`EngineConfig`] wraps the per-world defaults
//! together with the log filter used by hosts such as the sandbox app.

use serde::{Serialize, Deserialize};

use crate::engine::EngineError;

// Re-export from the config module for compatibility
pub use crate::config::{Config, ConfigError};

/// How locator hitboxes are ordered when a region is enumerated for drawing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DrawMode {
    /// Ordered by draw priority, then by hitbox id. Cell buckets keep this
    /// order incrementally.
    #[default]
    Flat,
    /// Objects lower on screen (greater y) are drawn over those above them
    Over,
    /// Objects higher on screen (smaller y) are drawn over those below them
    Under,
}

/// # World Configuration
///
/// Grid geometry and time scaling for one world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    /// Width of one grid cell
    pub cell_width: f64,
    /// Height of one grid cell
    pub cell_height: f64,
    /// Locator ordering used by cell buckets and draw enumeration
    pub draw_mode: DrawMode,
    /// Time factor of the world; the world only steps while this is positive
    pub time_factor: f64,
}

impl LevelConfig {
    /// Create a configuration with the given cell size
    pub fn new(cell_width: f64, cell_height: f64) -> Self {
        Self {
            cell_width,
            cell_height,
            ..Self::default()
        }
    }

    /// Set the draw mode
    pub fn with_draw_mode(mut self, draw_mode: DrawMode) -> Self {
        self.draw_mode = draw_mode;
        self
    }

    /// Set the time factor
    pub fn with_time_factor(mut self, time_factor: f64) -> Self {
        self.time_factor = time_factor;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.cell_width > 0.0 && self.cell_height > 0.0)
            || !self.cell_width.is_finite()
            || !self.cell_height.is_finite()
        {
            return Err(EngineError::InvalidCellSize {
                width: self.cell_width,
                height: self.cell_height,
            });
        }
        if !(self.time_factor >= 0.0) || !self.time_factor.is_finite() {
            return Err(EngineError::InvalidTimeFactor(self.time_factor));
        }
        Ok(())
    }
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            cell_width: 256.0,
            cell_height: 256.0,
            draw_mode: DrawMode::Flat,
            time_factor: 1.0,
        }
    }
}

/// # Engine Configuration
///
/// Engine-wide behavior plus the defaults applied to new worlds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Log filter handed to `env_logger` by hosts
    pub log_level: String,
    /// Defaults for worlds created with [`Engine::create_default_state`](crate::Engine::create_default_state)
    pub level: LevelConfig,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            level: LevelConfig::default(),
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set the default world configuration
    pub fn with_level(mut self, level: LevelConfig) -> Self {
        self.level = level;
        self
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), EngineError> {
        self.level.validate()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for EngineConfig {}
