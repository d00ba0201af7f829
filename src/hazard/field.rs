//! Hazard lifecycle: INACTIVE -> WARNING -> ACTIVE -> COOLDOWN -> INACTIVE.

use super::placement::find_fair_anchor;
use super::{symmetric_pull, HazardConfig, HazardGeometry, HazardReport, HazardState, PullVector, ZoneType};
use crate::agent::AgentId;
use crate::events::{EventSink, KernelEvent};
use crate::geometry::Cell;
use crate::query::EntityQuery;
use rand::Rng;

/// What a call to [`HazardField::update`] did
#[derive(Debug, Clone, PartialEq)]
pub enum HazardUpdate {
    /// Nothing changed state
    Idle,
    /// Trigger roll or placement failed; probability raised
    Escalated { probability: f64 },
    /// Placed and entered WARNING
    Warning(HazardGeometry),
    /// Entered ACTIVE for `duration` ticks
    Activated { duration: u32 },
    /// Entered COOLDOWN. The orchestrator should grant the listed agents a free shield.
    Deactivated { shielded: Vec<AgentId>, shield_duration: u32 },
    /// Back to INACTIVE, geometry discarded
    CooldownEnded,
}

/// Snapshot of the field's internal state
#[derive(Debug, Clone, PartialEq)]
pub struct HazardStatus {
    pub state: HazardState,
    pub ticks_remaining: u32,
    pub geometry: Option<HazardGeometry>,
    pub trigger_probability: f64,
}

/// The hazard state machine.
///
/// It only reads the world through [`EntityQuery`]; consequences such as
/// shields or deaths are returned to the caller.
pub struct HazardField {
    config: HazardConfig,
    columns: i32,
    rows: i32,
    state: HazardState,
    ticks_remaining: u32,
    trigger_probability: f64,
    geometry: Option<HazardGeometry>,
    sink: Box<dyn EventSink>,
}

impl HazardField {
    pub fn new(config: &HazardConfig, columns: i32, rows: i32, sink: Box<dyn EventSink>) -> Self {
        Self {
            config: config.clone(),
            columns,
            rows,
            state: HazardState::Inactive,
            ticks_remaining: 0,
            trigger_probability: config.initial_trigger_probability,
            geometry: None,
            sink,
        }
    }

    #[inline]
    pub fn state(&self) -> HazardState {
        self.state
    }

    #[inline]
    pub fn geometry(&self) -> Option<&HazardGeometry> {
        self.geometry.as_ref()
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn config(&self) -> &HazardConfig {
        &self.config
    }

    /// Advance the state machine by one tick
    pub fn update<Q, R>(&mut self, tick: u64, query: &Q, rng: &mut R) -> HazardUpdate
    where
        Q: EntityQuery + ?Sized,
        R: Rng + ?Sized,
    {
        if !self.config.enabled {
            return HazardUpdate::Idle;
        }

        match self.state {
            HazardState::Inactive => self.handle_inactive(tick, query, rng),
            HazardState::Warning => self.handle_warning(rng),
            HazardState::Active => self.handle_active(query),
            HazardState::Cooldown => self.handle_cooldown(),
        }
    }

    fn escalate(&mut self) -> HazardUpdate {
        self.trigger_probability = (self.trigger_probability + self.config.probability_increment).min(1.0);
        HazardUpdate::Escalated {
            probability: self.trigger_probability,
        }
    }

    fn handle_inactive<Q, R>(&mut self, tick: u64, query: &Q, rng: &mut R) -> HazardUpdate
    where
        Q: EntityQuery + ?Sized,
        R: Rng + ?Sized,
    {
        if tick < self.config.trigger_start_tick {
            return HazardUpdate::Idle;
        }

        if !rng.gen_bool(self.trigger_probability.clamp(0.0, 1.0)) {
            return self.escalate();
        }

        let Some(candidate) = find_fair_anchor(
            query,
            self.columns,
            self.rows,
            self.config.lethal_size,
            self.config.fair_top_fraction,
        ) else {
            let update = self.escalate();
            log::debug!(
                "[Hazard] no clear anchor at tick {}, probability now {:.3}",
                tick,
                self.trigger_probability
            );
            return update;
        };

        let geometry = HazardGeometry::new(
            candidate.anchor,
            self.config.lethal_size,
            self.config.inner_ring_radius,
            self.config.outer_ring_radius,
        );
        self.state = HazardState::Warning;
        self.ticks_remaining = self.config.warning_duration.max(1);
        self.trigger_probability = self.config.initial_trigger_probability;
        self.geometry = Some(geometry.clone());

        log::info!("[Hazard] warning at {} (tick {})", geometry.anchor, tick);
        self.sink.emit(KernelEvent::HazardWarning(geometry.clone()));
        HazardUpdate::Warning(geometry)
    }

    fn handle_warning<R: Rng + ?Sized>(&mut self, rng: &mut R) -> HazardUpdate {
        self.ticks_remaining = self.ticks_remaining.saturating_sub(1);
        if self.ticks_remaining > 0 {
            return HazardUpdate::Idle;
        }

        let (min, max) = (self.config.active_duration_min, self.config.active_duration_max);
        let duration = rng.gen_range(min.min(max)..=max.max(min)).max(1);
        self.state = HazardState::Active;
        self.ticks_remaining = duration;

        log::info!("[Hazard] active for {} ticks", duration);
        if let Some(geometry) = &self.geometry {
            self.sink.emit(KernelEvent::HazardActivated {
                geometry: geometry.clone(),
                duration,
            });
        }
        HazardUpdate::Activated { duration }
    }

    fn handle_active<Q: EntityQuery + ?Sized>(&mut self, query: &Q) -> HazardUpdate {
        self.ticks_remaining = self.ticks_remaining.saturating_sub(1);
        if self.ticks_remaining > 0 {
            return HazardUpdate::Idle;
        }

        // Agents caught in the field at deactivation earn a free shield
        let shielded: Vec<AgentId> = query
            .live_agents()
            .into_iter()
            .filter(|a| self.classify(a.head()) != ZoneType::Outside)
            .map(|a| a.id)
            .collect();

        self.state = HazardState::Cooldown;
        self.ticks_remaining = self.config.cooldown_duration.max(1);

        log::info!("[Hazard] deactivated, {} agents shielded", shielded.len());
        self.sink.emit(KernelEvent::HazardDeactivated {
            shielded: shielded.clone(),
        });
        HazardUpdate::Deactivated {
            shielded,
            shield_duration: self.config.cooldown_shield_duration,
        }
    }

    fn handle_cooldown(&mut self) -> HazardUpdate {
        self.ticks_remaining = self.ticks_remaining.saturating_sub(1);
        if self.ticks_remaining > 0 {
            return HazardUpdate::Idle;
        }

        self.state = HazardState::Inactive;
        self.geometry = None;

        log::info!("[Hazard] cooldown complete");
        self.sink.emit(KernelEvent::HazardCooldownEnded);
        HazardUpdate::CooldownEnded
    }

    /// Zone of `position`. Everything is outside while no geometry exists.
    pub fn classify(&self, position: Cell) -> ZoneType {
        if !self.config.enabled || self.state == HazardState::Inactive {
            return ZoneType::Outside;
        }
        self.geometry.as_ref().map_or(ZoneType::Outside, |g| g.classify(position))
    }

    /// Pull for a head at `position`; only while ACTIVE and inside the rings
    pub fn calculate_pull(&self, position: Cell) -> Option<PullVector> {
        if !self.config.enabled || self.state != HazardState::Active {
            return None;
        }
        let geometry = self.geometry.as_ref()?;
        if geometry.classify(position) == ZoneType::Outside {
            return None;
        }
        symmetric_pull(position, geometry.anchor)
    }

    /// Multiplier applied by scoring to both rewards and penalties
    pub fn score_multiplier(&self, position: Cell) -> f64 {
        match self.classify(position) {
            ZoneType::InnerRing => self.config.inner_ring_score_multiplier,
            ZoneType::OuterRing => self.config.outer_ring_score_multiplier,
            _ => 1.0,
        }
    }

    /// True anywhere the field has an effect, lethal block included
    pub fn is_position_in_field(&self, position: Cell) -> bool {
        self.classify(position) != ZoneType::Outside
    }

    /// Multiplier for pickup spawn weight at `position`
    pub fn pickup_spawn_multiplier(&self, position: Cell) -> f64 {
        if self.is_position_in_field(position) {
            self.config.pickup_spawn_multiplier
        } else {
            1.0
        }
    }

    pub fn status(&self) -> HazardStatus {
        HazardStatus {
            state: self.state,
            ticks_remaining: self.ticks_remaining,
            geometry: self.geometry.clone(),
            trigger_probability: self.trigger_probability,
        }
    }

    /// Plain-number description; zeros when disabled or inactive
    pub fn report(&self) -> HazardReport {
        match (&self.geometry, self.state) {
            (Some(geometry), state) if self.config.enabled && state != HazardState::Inactive => HazardReport {
                state_code: state.code(),
                ticks_remaining: self.ticks_remaining,
                anchor_x: geometry.anchor.x,
                anchor_y: geometry.anchor.y,
                inner_radius: geometry.inner_radius,
                outer_radius: geometry.outer_radius,
                lethal_size: self.config.lethal_size.max(1),
            },
            _ => HazardReport::inactive(),
        }
    }

    /// Back to a fresh INACTIVE field
    pub fn reset(&mut self) {
        self.state = HazardState::Inactive;
        self.ticks_remaining = 0;
        self.trigger_probability = self.config.initial_trigger_probability;
        self.geometry = None;
    }

    /// Force a placement at `anchor` and enter WARNING, bypassing the trigger roll
    pub fn place_at(&mut self, anchor: Cell) {
        let geometry = HazardGeometry::new(
            anchor,
            self.config.lethal_size,
            self.config.inner_ring_radius,
            self.config.outer_ring_radius,
        );
        self.state = HazardState::Warning;
        self.ticks_remaining = self.config.warning_duration.max(1);
        self.geometry = Some(geometry.clone());
        self.sink.emit(KernelEvent::HazardWarning(geometry));
    }
}

impl std::fmt::Debug for HazardField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HazardField")
            .field("state", &self.state)
            .field("ticks_remaining", &self.ticks_remaining)
            .field("trigger_probability", &self.trigger_probability)
            .field("geometry", &self.geometry)
            .finish()
    }
}
