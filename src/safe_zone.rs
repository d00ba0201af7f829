//! Shrinking safe zone.
//!
//! The playable rectangle shrinks through a schedule of events grouped into
//! game phases. Each event fixes its target from the bounds at its start tick
//! (floor half of the excess comes off the low side, the rest off the high
//! side) and every intermediate frame is a pure function of the elapsed ticks,
//! so a remote agent can reproduce any frame from the schedule alone.

use crate::events::{EventSink, KernelEvent};
use crate::geometry::{Bounds, Cell};
use serde::{Deserialize, Serialize};

/// Coarse game phases; each may carry shrink events
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GamePhase {
    Early,
    Mid,
    Late,
}

/// A scheduled shrink toward a `target_width` x `target_height` rectangle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShrinkEvent {
    pub start_tick: u64,
    pub duration: u64,
    pub target_width: i32,
    pub target_height: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseConfig {
    pub phase: GamePhase,
    pub start_tick: u64,
    #[serde(default)]
    pub shrink_events: Vec<ShrinkEvent>,
}

/// Safe-zone configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafeZoneConfig {
    pub enabled: bool,
    /// Bounds at the start of every session
    pub initial_bounds: Bounds,
    /// Warning is raised this many ticks before a shrink starts
    pub warning_ticks: u64,
    pub phases: Vec<PhaseConfig>,
}

impl Default for SafeZoneConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_bounds: Bounds::full(40, 30),
            warning_ticks: 10,
            phases: vec![
                PhaseConfig {
                    phase: GamePhase::Early,
                    start_tick: 0,
                    shrink_events: Vec::new(),
                },
                PhaseConfig {
                    phase: GamePhase::Mid,
                    start_tick: 81,
                    shrink_events: vec![ShrinkEvent {
                        start_tick: 81,
                        duration: 20,
                        target_width: 34,
                        target_height: 26,
                    }],
                },
                PhaseConfig {
                    phase: GamePhase::Late,
                    start_tick: 201,
                    shrink_events: vec![
                        ShrinkEvent {
                            start_tick: 201,
                            duration: 20,
                            target_width: 24,
                            target_height: 18,
                        },
                        ShrinkEvent {
                            start_tick: 231,
                            duration: 15,
                            target_width: 16,
                            target_height: 12,
                        },
                    ],
                },
            ],
        }
    }
}

impl SafeZoneConfig {
    /// Phase in effect at `tick`
    pub fn phase_at(&self, tick: u64) -> Option<GamePhase> {
        self.phases
            .iter()
            .filter(|p| p.start_tick <= tick)
            .max_by_key(|p| p.start_tick)
            .map(|p| p.phase)
    }

    /// All shrink events in start order
    pub fn schedule(&self) -> Vec<ShrinkEvent> {
        let mut events: Vec<ShrinkEvent> = self.phases.iter().flat_map(|p| p.shrink_events.iter().copied()).collect();
        events.sort_by_key(|e| e.start_tick);
        events
    }

    pub fn validate(&self, columns: i32, rows: i32) -> Result<(), String> {
        let b = self.initial_bounds;
        if b.width() <= 0 || b.height() <= 0 {
            return Err("safe_zone.initial_bounds must be non-empty".to_string());
        }
        if !Bounds::full(columns, rows).encloses(&b) {
            return Err("safe_zone.initial_bounds must lie inside the arena".to_string());
        }
        for phase in &self.phases {
            for event in &phase.shrink_events {
                if event.start_tick < phase.start_tick {
                    return Err(format!(
                        "shrink event at tick {} starts before its phase {:?}",
                        event.start_tick, phase.phase
                    ));
                }
                if event.target_width <= 0 || event.target_height <= 0 {
                    return Err(format!("shrink event at tick {} has an empty target", event.start_tick));
                }
                if event.target_width > b.width() || event.target_height > b.height() {
                    return Err(format!(
                        "shrink event at tick {} targets a rectangle larger than the initial bounds",
                        event.start_tick
                    ));
                }
            }
        }
        let events = self.schedule();
        for pair in events.windows(2) {
            if pair[1].start_tick < pair[0].start_tick + pair[0].duration {
                return Err(format!(
                    "shrink event at tick {} overlaps the one at tick {}",
                    pair[1].start_tick, pair[0].start_tick
                ));
            }
        }
        Ok(())
    }
}

/// A started shrink, fully determined at its start tick
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShrinkPlan {
    pub start_tick: u64,
    pub duration: u64,
    pub origin: Bounds,
    pub target: Bounds,
    /// Cells removed from each side: left, top, right, bottom
    pub sides: [i32; 4],
    /// Unified step count driving every side
    pub steps: i32,
}

impl ShrinkPlan {
    /// Plan a shrink of `origin` toward the event's target size.
    ///
    /// A target larger than `origin` on an axis leaves that axis untouched.
    pub fn new(origin: Bounds, event: &ShrinkEvent) -> Self {
        let total_x = (origin.width() - event.target_width).max(0);
        let total_y = (origin.height() - event.target_height).max(0);
        let (left, right) = (total_x / 2, total_x - total_x / 2);
        let (top, bottom) = (total_y / 2, total_y - total_y / 2);

        let target = Bounds::new(
            origin.x_min + left,
            origin.y_min + top,
            origin.x_max - right,
            origin.y_max - bottom,
        );
        let sides = [left, top, right, bottom];
        let steps = sides.iter().copied().max().unwrap_or(0);

        Self {
            start_tick: event.start_tick,
            duration: event.duration,
            origin,
            target,
            sides,
            steps,
        }
    }

    #[inline]
    pub fn end_tick(&self) -> u64 {
        self.start_tick + self.duration
    }

    /// Unified step reached after `elapsed` ticks
    pub fn step_at(&self, elapsed: u64) -> i32 {
        if self.duration == 0 || elapsed >= self.duration {
            return self.steps;
        }
        ((elapsed as u128 * self.steps as u128) / self.duration as u128) as i32
    }

    /// Bounds after `elapsed` ticks.
    ///
    /// The side with the most to remove moves from the first step; a side
    /// with less joins once its remaining distance equals the leader's, so all
    /// sides arrive together. At or past the end this is exactly `target`.
    pub fn bounds_at(&self, elapsed: u64) -> Bounds {
        if self.duration == 0 || elapsed >= self.duration {
            return self.target;
        }
        let step = self.step_at(elapsed);
        let shrink = |required: i32| (step - (self.steps - required)).clamp(0, required);
        let [left, top, right, bottom] = self.sides;

        Bounds::new(
            self.origin.x_min + shrink(left),
            self.origin.y_min + shrink(top),
            self.origin.x_max - shrink(right),
            self.origin.y_max - shrink(bottom),
        )
    }
}

/// Notification payload for a real change of the rectangle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundsChange {
    pub previous: Bounds,
    pub current: Bounds,
}

/// An upcoming (or running) shrink with its precomputed result
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledShrink {
    pub start_tick: u64,
    pub target: Bounds,
}

/// What a remote agent needs to plan around the zone
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeZoneForecast {
    pub current: Bounds,
    pub next: Option<ScheduledShrink>,
    pub last: Option<ScheduledShrink>,
}

/// Status for rendering, remote agents and replays
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeZoneStatus {
    pub enabled: bool,
    pub current_bounds: Bounds,
    pub warning: bool,
    pub shrinking: bool,
    pub next_shrink_tick: Option<u64>,
    pub target_bounds: Option<Bounds>,
}

impl SafeZoneStatus {
    /// Same answer as [`SafeZoneScheduler::is_position_safe`] when the status was taken
    pub fn is_position_safe(&self, position: Cell) -> bool {
        !self.enabled || self.current_bounds.contains(position)
    }
}

/// Drives the safe-zone schedule tick by tick
pub struct SafeZoneScheduler {
    enabled: bool,
    initial: Bounds,
    current: Bounds,
    warning_ticks: u64,
    events: Vec<ShrinkEvent>,
    /// Index of the first event not yet started
    next_event: usize,
    active: Option<ShrinkPlan>,
    /// End tick of the last finished plan
    last_end: Option<u64>,
    warning: bool,
    sink: Box<dyn EventSink>,
}

impl SafeZoneScheduler {
    pub fn new(config: &SafeZoneConfig, sink: Box<dyn EventSink>) -> Self {
        Self {
            enabled: config.enabled,
            initial: config.initial_bounds,
            current: config.initial_bounds,
            warning_ticks: config.warning_ticks,
            events: config.schedule(),
            next_event: 0,
            active: None,
            last_end: None,
            warning: false,
            sink,
        }
    }

    /// Advance to `tick`. Returns the change when the rectangle actually moved.
    pub fn update(&mut self, tick: u64) -> Option<BoundsChange> {
        if !self.enabled {
            return None;
        }
        let previous = self.current;

        loop {
            if self.active.is_none() {
                let due = self
                    .events
                    .get(self.next_event)
                    .copied()
                    .filter(|e| e.start_tick <= tick);
                let Some(mut event) = due else { break };
                // Keeps its scheduled clock when updated late, but never overlaps the previous plan
                if let Some(last_end) = self.last_end {
                    event.start_tick = event.start_tick.max(last_end);
                }
                self.next_event += 1;
                self.start(event);
            }

            let Some(plan) = self.active else { break };
            let elapsed = tick.saturating_sub(plan.start_tick);
            self.current = plan.bounds_at(elapsed);
            if elapsed >= plan.duration {
                self.active = None;
                self.last_end = Some(plan.end_tick());
                log::info!("[SafeZone] shrink complete, bounds {}", self.current);
                // A follow-up event may already be due
                continue;
            }
            break;
        }

        self.warning = self
            .next_start_tick()
            .map_or(false, |start| start > tick && start - tick <= self.warning_ticks);

        if self.current == previous {
            return None;
        }
        let change = BoundsChange {
            previous,
            current: self.current,
        };
        self.sink.emit(KernelEvent::SafeZoneBoundsChanged {
            previous,
            current: self.current,
        });
        Some(change)
    }

    fn start(&mut self, event: ShrinkEvent) {
        let plan = ShrinkPlan::new(self.current, &event);
        log::info!(
            "[SafeZone] shrinking {}x{} -> {}x{} over {} ticks, target {}",
            self.current.width(),
            self.current.height(),
            plan.target.width(),
            plan.target.height(),
            plan.duration,
            plan.target
        );
        self.sink.emit(KernelEvent::SafeZoneShrinkStarted {
            start_tick: plan.start_tick,
            target: plan.target,
        });
        self.active = Some(plan);
    }

    /// Start tick of the first event that has not begun yet
    pub fn next_start_tick(&self) -> Option<u64> {
        self.events.get(self.next_event).map(|e| e.start_tick)
    }

    #[inline]
    pub fn is_position_safe(&self, position: Cell) -> bool {
        !self.enabled || self.current.contains(position)
    }

    #[inline]
    pub fn current_bounds(&self) -> Bounds {
        self.current
    }

    #[inline]
    pub fn is_shrinking(&self) -> bool {
        self.active.is_some()
    }

    /// Warning flag as of the last [`SafeZoneScheduler::update`]
    #[inline]
    pub fn is_warning(&self) -> bool {
        self.warning
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn active_plan(&self) -> Option<&ShrinkPlan> {
        self.active.as_ref()
    }

    pub fn status(&self, tick: u64) -> SafeZoneStatus {
        let next_shrink_tick = self.next_start_tick();
        let warning = self.enabled
            && next_shrink_tick.map_or(false, |start| start > tick && start - tick <= self.warning_ticks);
        SafeZoneStatus {
            enabled: self.enabled,
            current_bounds: self.current,
            warning,
            shrinking: self.enabled && self.active.is_some(),
            next_shrink_tick,
            target_bounds: self.active.map(|p| p.target),
        }
    }

    /// Running or next shrink plus the final destination, chained analytically.
    ///
    /// Every event not yet started is chained, even one already overdue, since
    /// [`SafeZoneScheduler::update`] still applies it.
    pub fn forecast(&self) -> SafeZoneForecast {
        let mut upcoming = Vec::new();
        let mut bounds = self.current;
        if let Some(plan) = &self.active {
            upcoming.push(ScheduledShrink {
                start_tick: plan.start_tick,
                target: plan.target,
            });
            bounds = plan.target;
        }
        for event in self.events.iter().skip(self.next_event) {
            let plan = ShrinkPlan::new(bounds, event);
            bounds = plan.target;
            upcoming.push(ScheduledShrink {
                start_tick: event.start_tick,
                target: plan.target,
            });
        }

        SafeZoneForecast {
            current: self.current,
            next: upcoming.first().copied(),
            last: upcoming.last().copied(),
        }
    }

    /// Restore the initial rectangle and rewind the schedule
    pub fn reset(&mut self) {
        self.current = self.initial;
        self.next_event = 0;
        self.active = None;
        self.last_end = None;
        self.warning = false;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

impl std::fmt::Debug for SafeZoneScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafeZoneScheduler")
            .field("enabled", &self.enabled)
            .field("current", &self.current)
            .field("next_event", &self.next_event)
            .field("active", &self.active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullSink;
    use std::sync::mpsc;

    fn scenario_event() -> ShrinkEvent {
        ShrinkEvent {
            start_tick: 81,
            duration: 20,
            target_width: 34,
            target_height: 26,
        }
    }

    #[test]
    fn test_scenario_target() {
        let plan = ShrinkPlan::new(Bounds::full(40, 30), &scenario_event());
        assert_eq!(plan.target, Bounds::new(3, 2, 36, 27));
        assert_eq!(plan.bounds_at(20), Bounds::new(3, 2, 36, 27));
        assert_eq!(plan.bounds_at(0), Bounds::full(40, 30));
    }

    #[test]
    fn test_area_is_monotonic() {
        let plan = ShrinkPlan::new(Bounds::full(40, 30), &scenario_event());
        let mut last = plan.bounds_at(0);
        for elapsed in 1..=20 {
            let b = plan.bounds_at(elapsed);
            assert!(b.area() <= last.area());
            assert!(last.encloses(&b));
            last = b;
        }
    }

    #[test]
    fn test_leading_axis_moves_first() {
        let plan = ShrinkPlan::new(Bounds::full(40, 30), &scenario_event());
        assert_eq!(plan.steps, 3);
        // Step 1: only x has moved
        let early = plan.bounds_at(7);
        assert_eq!(plan.step_at(7), 1);
        assert_eq!(early, Bounds::new(1, 0, 38, 29));
        // Step 2: y joined
        assert_eq!(plan.bounds_at(14), Bounds::new(2, 1, 37, 28));
    }

    #[test]
    fn test_odd_split() {
        let event = ShrinkEvent {
            start_tick: 0,
            duration: 10,
            target_width: 35,
            target_height: 30,
        };
        let plan = ShrinkPlan::new(Bounds::full(40, 30), &event);
        assert_eq!(plan.target, Bounds::new(2, 0, 36, 29));
        assert_eq!(plan.target.width(), 35);
    }

    #[test]
    fn test_growth_is_clamped() {
        let event = ShrinkEvent {
            start_tick: 0,
            duration: 10,
            target_width: 50,
            target_height: 20,
        };
        let origin = Bounds::new(5, 5, 24, 24);
        let plan = ShrinkPlan::new(origin, &event);
        assert_eq!(plan.target.width(), 20);
        assert_eq!(plan.target.height(), 20);
        assert_eq!(plan.target, origin);
    }

    #[test]
    fn test_zero_duration_snaps() {
        let event = ShrinkEvent {
            start_tick: 5,
            duration: 0,
            target_width: 20,
            target_height: 10,
        };
        let plan = ShrinkPlan::new(Bounds::full(40, 30), &event);
        assert_eq!(plan.bounds_at(0), plan.target);
    }

    #[test]
    fn test_scheduler_runs_scenario() {
        let (tx, rx) = mpsc::channel();
        let config = SafeZoneConfig {
            phases: vec![PhaseConfig {
                phase: GamePhase::Mid,
                start_tick: 81,
                shrink_events: vec![scenario_event()],
            }],
            ..Default::default()
        };
        let mut zone = SafeZoneScheduler::new(&config, Box::new(tx));

        let mut changes = 0;
        for tick in 0..=120 {
            if zone.update(tick).is_some() {
                changes += 1;
            }
            if tick == 75 {
                assert!(zone.status(tick).warning);
                assert!(zone.is_warning());
            }
            if tick == 90 {
                assert!(zone.is_shrinking());
            }
        }

        assert_eq!(zone.current_bounds(), Bounds::new(3, 2, 36, 27));
        assert!(!zone.is_shrinking());
        assert!(zone.is_position_safe(Cell::new(3, 2)));
        assert!(!zone.is_position_safe(Cell::new(2, 2)));

        let events: Vec<KernelEvent> = rx.try_iter().collect();
        let notified = events
            .iter()
            .filter(|e| matches!(e, KernelEvent::SafeZoneBoundsChanged { .. }))
            .count();
        assert_eq!(notified, changes);
        assert_eq!(changes, 3);
    }

    #[test]
    fn test_no_notification_without_change() {
        let mut zone = SafeZoneScheduler::new(&SafeZoneConfig::default(), Box::new(NullSink));
        for tick in 0..81 {
            assert!(zone.update(tick).is_none());
        }
        // Start tick: elapsed 0 leaves bounds untouched
        assert!(zone.update(81).is_none());
        assert!(zone.is_shrinking());
    }

    #[test]
    fn test_late_update_reproduces_frame() {
        let mut stepped = SafeZoneScheduler::new(&SafeZoneConfig::default(), Box::new(NullSink));
        let mut jumped = SafeZoneScheduler::new(&SafeZoneConfig::default(), Box::new(NullSink));
        for tick in 0..=95 {
            stepped.update(tick);
        }
        jumped.update(95);
        assert_eq!(stepped.current_bounds(), jumped.current_bounds());
    }

    #[test]
    fn test_forecast_chains_targets() {
        let zone = SafeZoneScheduler::new(&SafeZoneConfig::default(), Box::new(NullSink));
        let forecast = zone.forecast();
        let next = forecast.next.unwrap();
        let last = forecast.last.unwrap();

        assert_eq!(next.start_tick, 81);
        assert_eq!(next.target, Bounds::new(3, 2, 36, 27));
        assert_eq!(last.start_tick, 231);
        assert_eq!(last.target.width(), 16);
        assert_eq!(last.target.height(), 12);
        assert!(next.target.encloses(&last.target));
    }

    #[test]
    fn test_forecast_matches_lagging_update() {
        let mut zone = SafeZoneScheduler::new(&SafeZoneConfig::default(), Box::new(NullSink));
        zone.update(0);
        let last = zone.forecast().last.unwrap();

        // First update long after every event has ended
        zone.update(400);
        assert_eq!(zone.current_bounds(), last.target);
        assert!(zone.forecast().last.is_none());
    }

    #[test]
    fn test_reset_and_disable() {
        let mut zone = SafeZoneScheduler::new(&SafeZoneConfig::default(), Box::new(NullSink));
        for tick in 0..=101 {
            zone.update(tick);
        }
        assert_ne!(zone.current_bounds(), Bounds::full(40, 30));

        zone.reset();
        assert_eq!(zone.current_bounds(), Bounds::full(40, 30));
        assert_eq!(zone.next_start_tick(), Some(81));

        zone.set_enabled(false);
        assert!(zone.is_position_safe(Cell::new(-5, -5)));
        assert!(zone.update(101).is_none());
        assert!(!zone.status(75).warning);
    }

    #[test]
    fn test_status_round_trip() {
        let mut zone = SafeZoneScheduler::new(&SafeZoneConfig::default(), Box::new(NullSink));
        for tick in 0..=95 {
            zone.update(tick);
        }
        let status = zone.status(95);
        assert!(status.shrinking);
        assert_eq!(status.target_bounds, Some(Bounds::new(3, 2, 36, 27)));
        for x in -1..41 {
            for y in -1..31 {
                let cell = Cell::new(x, y);
                assert_eq!(status.is_position_safe(cell), zone.is_position_safe(cell));
            }
        }
    }

    #[test]
    fn test_config_validation() {
        let config = SafeZoneConfig::default();
        assert!(config.validate(40, 30).is_ok());
        assert_eq!(config.phase_at(0), Some(GamePhase::Early));
        assert_eq!(config.phase_at(100), Some(GamePhase::Mid));
        assert_eq!(config.phase_at(250), Some(GamePhase::Late));

        let mut overlapping = SafeZoneConfig::default();
        overlapping.phases[1].shrink_events.push(ShrinkEvent {
            start_tick: 90,
            duration: 5,
            target_width: 30,
            target_height: 20,
        });
        assert!(overlapping.validate(40, 30).is_err());
    }
}
