//! # VORTEX ARENA
//!
//! Simulation kernel for a tick-based multiplayer snake arena.
//!
//! ## Features
//!
//! - **Spatial index**: bucketed grid answering "what is near this cell"
//! - **Collision resolver**: shield- and hazard-aware, one ordered event list per pass
//! - **Vortex hazard**: four-state field with fair placement and symmetric pull
//! - **Safe zone**: analytic, monotonic shrink schedule reproducible from any tick
//! - **Reproducible**: seeded random number generation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vortex_arena::{Arena, Config};
//! use vortex_arena::arena::wander_intents;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let mut arena = Arena::new(Config::default());
//! for i in 0..4 {
//!     arena.spawn_agent(format!("agent-{}", i));
//! }
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(7);
//! for _ in 0..300 {
//!     let intents = wander_intents(&arena, &mut rng);
//!     let report = arena.step(&intents);
//!     for death in &report.deaths {
//!         println!("tick {}: agent {} died", report.tick, death.agent);
//!     }
//! }
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use vortex_arena::Config;
//!
//! let mut config = Config::default();
//! config.hazard.trigger_start_tick = 40;
//! config.safe_zone.warning_ticks = 15;
//! assert!(config.validate().is_ok());
//! ```
//!
//! ## Status frames
//!
//! ```rust
//! use vortex_arena::{Arena, Config};
//! use vortex_arena::snapshot::StatusFrame;
//!
//! let arena = Arena::new(Config::default());
//! let bytes = StatusFrame::capture(&arena).to_bytes().unwrap();
//! let frame = StatusFrame::from_bytes(&bytes).unwrap();
//! assert_eq!(frame.tick, 0);
//! ```

pub mod agent;
pub mod arena;
pub mod collision;
pub mod config;
pub mod events;
pub mod geometry;
pub mod grid;
pub mod hazard;
pub mod query;
pub mod safe_zone;
pub mod snapshot;

// Re-export main types
pub use agent::{Agent, AgentId};
pub use arena::{Arena, Intent, TickReport};
pub use collision::{CollisionEvent, CollisionResolver};
pub use config::Config;
pub use events::{EventSink, KernelEvent, NullSink};
pub use geometry::{Bounds, Cell, Direction};
pub use grid::{GridItem, ItemId, ItemKind, SpatialIndex};
pub use hazard::{HazardField, HazardReport, HazardState, ZoneType};
pub use safe_zone::{SafeZoneScheduler, SafeZoneStatus};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run a quick benchmark: `agents` wandering agents for `ticks` ticks
pub fn benchmark(ticks: u64, agents: usize) -> BenchmarkResult {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::time::Instant;

    let config = Config::default();
    let mut rng = ChaCha8Rng::seed_from_u64(config.arena.seed);
    let mut arena = Arena::new(config);
    for i in 0..agents {
        arena.spawn_agent(format!("agent-{}", i));
    }
    let spawned = arena.live_count();

    let start = Instant::now();
    let mut deaths = 0;
    for _ in 0..ticks {
        let intents = arena::wander_intents(&arena, &mut rng);
        deaths += arena.step(&intents).deaths.len();
    }
    let elapsed = start.elapsed();

    BenchmarkResult {
        ticks,
        initial_agents: spawned,
        final_agents: arena.live_count(),
        deaths,
        elapsed_secs: elapsed.as_secs_f64(),
        ticks_per_second: ticks as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
    }
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub ticks: u64,
    pub initial_agents: usize,
    pub final_agents: usize,
    pub deaths: usize,
    pub elapsed_secs: f64,
    pub ticks_per_second: f64,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Ticks: {}", self.ticks)?;
        writeln!(f, "Agents: {} -> {}", self.initial_agents, self.final_agents)?;
        writeln!(f, "Deaths: {}", self.deaths)?;
        writeln!(f, "Time: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Speed: {:.1} ticks/s", self.ticks_per_second)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_quick_match() {
        let mut arena = Arena::new(Config::default());
        arena.spawn_agent("solo");
        arena.run(100, |_| std::collections::HashMap::new());
        assert_eq!(arena.tick(), 100);
    }

    #[test]
    fn test_benchmark() {
        let result = benchmark(100, 4);
        assert_eq!(result.ticks, 100);
        assert!(result.ticks_per_second > 0.0);
        assert!(result.final_agents <= result.initial_agents);
    }
}
