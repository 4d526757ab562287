//! # Core Engine Module
//!
//! Shared configuration for the engine and the worlds it hosts.
//!
//! ## Organization
//!
//! - **Config**: grid geometry, draw ordering and time scaling per world,
//!   plus engine-wide settings such as the log filter

pub mod config;

// Re-export foundation modules for convenience
pub use crate::foundation;

// Re-export commonly used config types
pub use config::{
    DrawMode,
    EngineConfig,
    LevelConfig,
    Config,
    ConfigError,
};
