//! Vortex hazard: a time-limited field with a lethal core and two effect rings.
//!
//! - `placement` picks an anchor that is remote and fair across agents
//! - `field` runs the INACTIVE -> WARNING -> ACTIVE -> COOLDOWN cycle

pub mod field;
pub mod placement;

pub use field::{HazardField, HazardStatus, HazardUpdate};
pub use placement::{find_fair_anchor, rank_candidates, PlacementCandidate};

use crate::geometry::{Cell, Direction};
use serde::{Deserialize, Serialize};

/// Hazard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HazardConfig {
    /// Enable the hazard at all
    pub enabled: bool,
    /// First tick at which a trigger roll may happen
    pub trigger_start_tick: u64,
    /// Trigger probability after a reset
    pub initial_trigger_probability: f64,
    /// Added to the probability after every failed attempt
    pub probability_increment: f64,
    /// Ticks between placement and activation
    pub warning_duration: u32,
    /// Active duration is drawn uniformly from this inclusive range
    pub active_duration_min: u32,
    pub active_duration_max: u32,
    /// Ticks between deactivation and the next INACTIVE phase
    pub cooldown_duration: u32,
    /// Edge length of the square lethal block
    pub lethal_size: i32,
    /// Chebyshev radius of the inner ring
    pub inner_ring_radius: i32,
    /// Chebyshev radius of the outer ring
    pub outer_ring_radius: i32,
    pub inner_ring_score_multiplier: f64,
    pub outer_ring_score_multiplier: f64,
    /// Pickup spawn rate multiplier inside the field
    pub pickup_spawn_multiplier: f64,
    /// Free shield handed to agents caught in the field at deactivation
    pub cooldown_shield_duration: u32,
    /// Fraction of candidates (ranked by remoteness) kept for the fairness pass
    pub fair_top_fraction: f64,
}

impl Default for HazardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trigger_start_tick: 80,
            initial_trigger_probability: 0.1,
            probability_increment: 0.05,
            warning_duration: 5,
            active_duration_min: 25,
            active_duration_max: 30,
            cooldown_duration: 4,
            lethal_size: 2,
            inner_ring_radius: 4,
            outer_ring_radius: 7,
            inner_ring_score_multiplier: 2.5,
            outer_ring_score_multiplier: 1.5,
            pickup_spawn_multiplier: 3.0,
            cooldown_shield_duration: 4,
            fair_top_fraction: 0.2,
        }
    }
}

/// Lifecycle state. The discriminant is the numeric state code reported to remote agents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HazardState {
    Inactive = 0,
    Warning = 1,
    Active = 2,
    Cooldown = 3,
}

impl HazardState {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<HazardState> {
        match code {
            0 => Some(HazardState::Inactive),
            1 => Some(HazardState::Warning),
            2 => Some(HazardState::Active),
            3 => Some(HazardState::Cooldown),
            _ => None,
        }
    }
}

/// Classification of a cell relative to the hazard
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneType {
    Outside,
    OuterRing,
    InnerRing,
    /// Part of the lethal block; kills through shields
    Lethal,
}

/// One-cell pull toward the anchor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullVector {
    pub direction: Direction,
    pub magnitude: u32,
}

/// Where the hazard sits. Frozen from WARNING entry until COOLDOWN ends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardGeometry {
    pub anchor: Cell,
    pub lethal: Vec<Cell>,
    pub inner_radius: i32,
    pub outer_radius: i32,
}

impl HazardGeometry {
    /// Square lethal block of `size` cells extending right and down from `anchor`
    pub fn new(anchor: Cell, size: i32, inner_radius: i32, outer_radius: i32) -> Self {
        Self {
            anchor,
            lethal: lethal_block(anchor, size),
            inner_radius,
            outer_radius,
        }
    }

    /// Concentric classification; lethal membership wins over ring radii
    pub fn classify(&self, position: Cell) -> ZoneType {
        if self.lethal.contains(&position) {
            return ZoneType::Lethal;
        }
        let distance = position.chebyshev(self.anchor);
        if distance <= self.inner_radius {
            ZoneType::InnerRing
        } else if distance <= self.outer_radius {
            ZoneType::OuterRing
        } else {
            ZoneType::Outside
        }
    }
}

/// Cells of a `size` x `size` block anchored at its top-left corner
pub fn lethal_block(anchor: Cell, size: i32) -> Vec<Cell> {
    let size = size.max(1);
    let mut cells = Vec::with_capacity((size * size) as usize);
    for dx in 0..size {
        for dy in 0..size {
            cells.push(Cell::new(anchor.x + dx, anchor.y + dy));
        }
    }
    cells
}

/// Symmetric pull: step along the axis with the larger offset, toward the anchor.
///
/// Ties go to the vertical axis. No pull when standing on the anchor.
pub fn symmetric_pull(position: Cell, anchor: Cell) -> Option<PullVector> {
    let dx = (position.x - anchor.x).abs();
    let dy = (position.y - anchor.y).abs();
    if dx == 0 && dy == 0 {
        return None;
    }

    let horizontal = if position.x > anchor.x { Direction::Left } else { Direction::Right };
    let vertical = if position.y > anchor.y { Direction::Up } else { Direction::Down };

    Some(PullVector {
        direction: if dx > dy { horizontal } else { vertical },
        magnitude: 1,
    })
}

/// Plain-number hazard description for remote agents and replays.
///
/// All geometry fields are zero while INACTIVE.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardReport {
    pub state_code: u8,
    pub ticks_remaining: u32,
    pub anchor_x: i32,
    pub anchor_y: i32,
    pub inner_radius: i32,
    pub outer_radius: i32,
    pub lethal_size: i32,
}

impl HazardReport {
    pub fn inactive() -> Self {
        Self {
            state_code: HazardState::Inactive.code(),
            ticks_remaining: 0,
            anchor_x: 0,
            anchor_y: 0,
            inner_radius: 0,
            outer_radius: 0,
            lethal_size: 0,
        }
    }

    pub fn state(&self) -> HazardState {
        HazardState::from_code(self.state_code).unwrap_or(HazardState::Inactive)
    }

    /// Rebuild the geometry, if the report carries one
    pub fn geometry(&self) -> Option<HazardGeometry> {
        if self.state() == HazardState::Inactive {
            return None;
        }
        Some(HazardGeometry::new(
            Cell::new(self.anchor_x, self.anchor_y),
            self.lethal_size,
            self.inner_radius,
            self.outer_radius,
        ))
    }

    /// Same answer as [`HazardField::classify`] at the tick the report was taken
    pub fn classify(&self, position: Cell) -> ZoneType {
        self.geometry().map_or(ZoneType::Outside, |g| g.classify(position))
    }

    /// Same answer as [`HazardField::calculate_pull`]
    pub fn pull(&self, position: Cell) -> Option<PullVector> {
        if self.state() != HazardState::Active || self.classify(position) == ZoneType::Outside {
            return None;
        }
        symmetric_pull(position, Cell::new(self.anchor_x, self.anchor_y))
    }
}
