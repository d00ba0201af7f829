//! Configuration system for the arena kernel.
//!
//! Supports YAML configuration files with sensible defaults.

use crate::hazard::HazardConfig;
use crate::safe_zone::SafeZoneConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub arena: ArenaConfig,
    pub shield: ShieldConfig,
    #[serde(default)]
    pub hazard: HazardConfig,
    #[serde(default)]
    pub safe_zone: SafeZoneConfig,
    pub logging: LoggingConfig,
}

/// Playfield and economy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// Grid width in cells
    pub columns: i32,
    /// Grid height in cells
    pub rows: i32,
    /// Spatial index bucket edge; at least the largest query radius
    pub bucket_size: i32,
    /// Body length of a freshly spawned agent
    pub initial_length: usize,
    /// Obstacles scattered at session start
    pub obstacle_count: usize,
    /// Food items kept on the field
    pub food_count: usize,
    /// Base reward for eating food
    pub food_score: i32,
    /// Segments gained per food
    pub food_growth: u32,
    /// Base reward for opening a chest
    pub chest_score: i32,
    /// Base penalty for dying
    pub death_penalty: i32,
    /// Seed for the arena RNG
    pub seed: u64,
}

/// Shield economy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShieldConfig {
    /// Score spent to buy a shield
    pub cost: i32,
    /// Ticks a bought shield lasts
    pub duration: u32,
    /// Ticks before another shield can be bought
    pub cooldown: u32,
    /// Ticks of shield granted at spawn
    pub spawn_duration: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Ticks between summary lines
    pub stats_interval: u64,
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            arena: ArenaConfig::default(),
            shield: ShieldConfig::default(),
            hazard: HazardConfig::default(),
            safe_zone: SafeZoneConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            columns: 40,
            rows: 30,
            bucket_size: 2,
            initial_length: 5,
            obstacle_count: 12,
            food_count: 10,
            food_score: 10,
            food_growth: 1,
            chest_score: 50,
            death_penalty: 10,
            seed: 42,
        }
    }
}

impl Default for ShieldConfig {
    fn default() -> Self {
        Self {
            cost: 20,
            duration: 5,
            cooldown: 30,
            spawn_duration: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            stats_interval: 50,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        let arena = &self.arena;
        if arena.columns <= 0 || arena.rows <= 0 {
            return Err("arena columns and rows must be > 0".to_string());
        }
        if arena.bucket_size < 1 {
            return Err("bucket_size must be >= 1".to_string());
        }
        if arena.initial_length == 0 {
            return Err("initial_length must be > 0".to_string());
        }

        let hazard = &self.hazard;
        if !(0.0..=1.0).contains(&hazard.initial_trigger_probability) {
            return Err("hazard.initial_trigger_probability must be in [0, 1]".to_string());
        }
        if !(0.0..=1.0).contains(&hazard.probability_increment) {
            return Err("hazard.probability_increment must be in [0, 1]".to_string());
        }
        if !(0.0..=1.0).contains(&hazard.fair_top_fraction) {
            return Err("hazard.fair_top_fraction must be in [0, 1]".to_string());
        }
        if hazard.active_duration_min > hazard.active_duration_max {
            return Err("hazard active duration range is empty".to_string());
        }
        if hazard.inner_ring_radius > hazard.outer_ring_radius {
            return Err("hazard inner_ring_radius cannot exceed outer_ring_radius".to_string());
        }
        if hazard.lethal_size < 1 || hazard.lethal_size > arena.columns.min(arena.rows) {
            return Err("hazard.lethal_size must fit inside the arena".to_string());
        }

        self.safe_zone.validate(arena.columns, arena.rows)
    }
}
