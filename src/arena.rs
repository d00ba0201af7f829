//! Arena orchestrator - drives one tick of the kernel.
//!
//! The arena is the single writer: it owns the agents, the spatial index and
//! the pickups, and applies the consequences the read-only components report.

use crate::agent::{Agent, AgentError, AgentId};
use crate::collision::{CollisionEvent, CollisionResolver};
use crate::config::Config;
use crate::events::{EventSink, KernelEvent, NullSink};
use crate::geometry::{Bounds, Cell, Direction};
use crate::grid::{ItemId, ItemKind, SpatialIndex};
use crate::hazard::{HazardField, HazardUpdate, ZoneType};
use crate::query::WorldView;
use crate::safe_zone::{BoundsChange, SafeZoneScheduler};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, VecDeque};

/// One agent's already-resolved decision for a tick
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Intent {
    /// `None` keeps the current heading
    pub direction: Option<Direction>,
    /// Try to buy a shield before moving
    pub activate_shield: bool,
}

impl Intent {
    pub fn turn(direction: Direction) -> Self {
        Self {
            direction: Some(direction),
            activate_shield: false,
        }
    }
}

/// Why an agent died
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeathCause {
    Collision(CollisionEvent),
    OutsideSafeZone,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Death {
    pub agent: AgentId,
    pub position: Cell,
    pub cause: DeathCause,
}

/// Everything that happened during one [`Arena::step`]
#[derive(Clone, Debug)]
pub struct TickReport {
    pub tick: u64,
    pub hazard: HazardUpdate,
    pub bounds_change: Option<BoundsChange>,
    pub first_pass: Vec<CollisionEvent>,
    pub second_pass: Vec<CollisionEvent>,
    pub pulled: Vec<AgentId>,
    pub deaths: Vec<Death>,
}

/// The simulation arena
pub struct Arena {
    config: Config,
    agents: Vec<Agent>,
    /// Segment items per agent, head first, mirroring the body
    segments: HashMap<AgentId, VecDeque<ItemId>>,
    index: SpatialIndex,
    pickups: HashMap<ItemId, ItemKind>,
    resolver: CollisionResolver,
    hazard: HazardField,
    safe_zone: SafeZoneScheduler,
    sink: Box<dyn EventSink>,
    tick: u64,
    next_agent_id: AgentId,
    rng: ChaCha8Rng,
    seed: u64,
}

impl Arena {
    /// Create an arena seeded from the config, dropping all notifications
    pub fn new(config: Config) -> Self {
        Self::with_sink(config, NullSink)
    }

    /// Create an arena whose components all report into clones of `sink`
    pub fn with_sink<S: EventSink + Clone + 'static>(config: Config, sink: S) -> Self {
        let seed = config.arena.seed;
        let columns = config.arena.columns;
        let rows = config.arena.rows;

        let mut arena = Self {
            agents: Vec::new(),
            segments: HashMap::new(),
            index: SpatialIndex::new(config.arena.bucket_size),
            pickups: HashMap::new(),
            resolver: CollisionResolver::new(columns, rows),
            hazard: HazardField::new(&config.hazard, columns, rows, Box::new(sink.clone())),
            safe_zone: SafeZoneScheduler::new(&config.safe_zone, Box::new(sink.clone())),
            sink: Box::new(sink),
            tick: 0,
            next_agent_id: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            config,
        };
        arena.scatter_obstacles();
        arena
    }

    #[inline]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.iter_mut().find(|a| a.id == id)
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn hazard(&self) -> &HazardField {
        &self.hazard
    }

    pub fn hazard_mut(&mut self) -> &mut HazardField {
        &mut self.hazard
    }

    pub fn safe_zone(&self) -> &SafeZoneScheduler {
        &self.safe_zone
    }

    pub fn safe_zone_mut(&mut self) -> &mut SafeZoneScheduler {
        &mut self.safe_zone
    }

    /// Agents alive and not dying
    pub fn live_count(&self) -> usize {
        self.agents.iter().filter(|a| a.is_active()).count()
    }

    /// Pickups currently on the field
    pub fn pickup_count(&self, kind: ItemKind) -> usize {
        self.pickups.values().filter(|&&k| k == kind).count()
    }

    /// Register an agent built elsewhere. Its id is kept as given.
    pub fn add_agent(&mut self, agent: Agent) -> AgentId {
        let id = agent.id;
        let ids = agent
            .body()
            .iter()
            .map(|&cell| self.index.insert(cell, ItemKind::Segment))
            .collect();
        self.segments.insert(id, ids);
        self.next_agent_id = self.next_agent_id.max(id + 1);
        self.agents.push(agent);
        id
    }

    /// Spawn an agent in a random free straight run inside the safe zone
    pub fn spawn_agent(&mut self, name: impl Into<String>) -> Option<AgentId> {
        let length = self.config.arena.initial_length;
        let bounds = self.safe_zone.current_bounds();

        for _ in 0..256 {
            let head = Cell::new(
                self.rng.gen_range(bounds.x_min..=bounds.x_max),
                self.rng.gen_range(bounds.y_min..=bounds.y_max),
            );
            let direction = Direction::ALL[self.rng.gen_range(0..Direction::ALL.len())];
            let behind = direction.opposite();

            let mut cell = head;
            let mut clear = true;
            for _ in 0..length {
                if !bounds.contains(cell) || !self.index.items_at(cell).is_empty() {
                    clear = false;
                    break;
                }
                cell = cell.step(behind);
            }
            // Leave room ahead of the head
            if !clear || !bounds.contains(head.step(direction)) {
                continue;
            }

            let id = self.next_agent_id;
            let agent = Agent::new(id, name, head, direction, length, self.config.shield.spawn_duration);
            return Some(self.add_agent(agent));
        }
        log::warn!("[Arena] no room to spawn an agent");
        None
    }

    pub fn add_obstacle(&mut self, cell: Cell) -> ItemId {
        self.index.insert(cell, ItemKind::Obstacle)
    }

    /// Place a pickup (food, key or chest)
    pub fn add_pickup(&mut self, cell: Cell, kind: ItemKind) -> ItemId {
        let id = self.index.insert(cell, kind);
        self.pickups.insert(id, kind);
        id
    }

    fn scatter_obstacles(&mut self) {
        let (columns, rows) = (self.config.arena.columns, self.config.arena.rows);
        for _ in 0..self.config.arena.obstacle_count {
            let cell = Cell::new(self.rng.gen_range(0..columns), self.rng.gen_range(0..rows));
            if self.index.items_at(cell).is_empty() {
                self.add_obstacle(cell);
            }
        }
    }

    /// Directions whose next cell is free, safe and not lethal.
    ///
    /// A cheap helper for scripted agents; it ignores other agents' moves.
    pub fn safe_directions(&self, id: AgentId) -> Vec<Direction> {
        let Some(agent) = self.agent(id) else {
            return Vec::new();
        };
        let head = agent.head();
        Direction::ALL
            .into_iter()
            .filter(|&d| agent.len() < 2 || d != agent.direction().opposite())
            .filter(|&d| {
                let next = head.step(d);
                self.safe_zone.is_position_safe(next)
                    && Bounds::full(self.config.arena.columns, self.config.arena.rows).contains(next)
                    && self.hazard.classify(next) != ZoneType::Lethal
                    && !self
                        .index
                        .is_occupied(next, &[ItemKind::Obstacle, ItemKind::Segment, ItemKind::Chest])
            })
            .collect()
    }

    /// Run one tick.
    ///
    /// Order: hazard, safe zone, decisions and movement, first collision pass,
    /// tail settle, hazard pull, second collision pass, safe-zone deaths,
    /// shield and death-animation countdowns, pickup respawn.
    pub fn step(&mut self, intents: &HashMap<AgentId, Intent>) -> TickReport {
        let tick = self.tick;

        let hazard = {
            let view = WorldView::new(&self.agents, &self.index);
            self.hazard.update(tick, &view, &mut self.rng)
        };
        if let HazardUpdate::Deactivated {
            shielded,
            shield_duration,
        } = &hazard
        {
            for id in shielded {
                if let Some(agent) = self.agent_mut(*id) {
                    agent.grant_free_shield(*shield_duration);
                }
            }
        }

        let bounds_change = self.safe_zone.update(tick);
        if let Some(change) = bounds_change {
            self.clear_pickups_outside(change.current);
        }

        self.apply_decisions(intents);

        let mut deaths = Vec::new();
        let first_pass = self.detect(|_| true);
        self.apply_collisions(&first_pass, &mut deaths);

        self.settle_tails();

        let pulled = self.apply_pull();
        let second_pass = if pulled.is_empty() {
            Vec::new()
        } else {
            self.detect(|a| pulled.contains(&a.id))
        };
        self.apply_collisions(&second_pass, &mut deaths);

        self.kill_outside_safe_zone(&mut deaths);
        self.tick_timers();
        self.respawn_food();

        self.tick += 1;

        TickReport {
            tick,
            hazard,
            bounds_change,
            first_pass,
            second_pass,
            pulled,
            deaths,
        }
    }

    /// Run `ticks` steps, asking `decide` for every tick's intents
    pub fn run<F>(&mut self, ticks: u64, mut decide: F) -> Vec<TickReport>
    where
        F: FnMut(&Arena) -> HashMap<AgentId, Intent>,
    {
        let mut reports = Vec::with_capacity(ticks as usize);
        for _ in 0..ticks {
            let intents = decide(self);
            reports.push(self.step(&intents));
        }
        reports
    }

    fn apply_decisions(&mut self, intents: &HashMap<AgentId, Intent>) {
        let shield = self.config.shield.clone();
        for agent in self.agents.iter_mut().filter(|a| a.is_active()) {
            let intent = intents.get(&agent.id).copied().unwrap_or_default();
            if intent.activate_shield && agent.activate_shield(shield.duration, shield.cost, shield.cooldown) {
                log::debug!("[Arena] agent {} bought a shield", agent.id);
            }
            if let Some(head) = agent.advance(intent.direction) {
                let id = self.index.insert(head, ItemKind::Segment);
                self.segments.entry(agent.id).or_default().push_front(id);
            }
        }
    }

    fn detect<P: Fn(&Agent) -> bool>(&self, include: P) -> Vec<CollisionEvent> {
        let live: Vec<&Agent> = self.agents.iter().filter(|a| a.is_active() && include(a)).collect();
        self.resolver
            .detect_collisions(&live, &self.agents, &self.index, Some(&self.hazard))
    }

    fn apply_collisions(&mut self, events: &[CollisionEvent], deaths: &mut Vec<Death>) {
        for event in events {
            match *event {
                CollisionEvent::Pickup { agent, position, kind } => self.collect(agent, position, kind),
                fatal => {
                    if let Some(death) = self.kill(fatal.agent(), DeathCause::Collision(fatal)) {
                        deaths.push(death);
                    }
                }
            }
        }
    }

    fn collect(&mut self, id: AgentId, position: Cell, kind: ItemKind) {
        let Some(item) = self
            .index
            .items_at(position)
            .into_iter()
            .find(|i| i.kind == kind && self.pickups.contains_key(&i.id))
        else {
            // Already taken by someone else this tick
            return;
        };
        self.index.remove(item.id);
        self.pickups.remove(&item.id);

        let multiplier = self.hazard.score_multiplier(position);
        let arena = &self.config.arena;
        let (food_score, food_growth, chest_score) = (arena.food_score, arena.food_growth, arena.chest_score);
        let Some(agent) = self.agent_mut(id) else {
            return;
        };
        match kind {
            ItemKind::Food => {
                agent.add_score((food_score as f64 * multiplier).round() as i32);
                agent.grow(food_growth);
            }
            ItemKind::Key => agent.set_holds_key(true),
            ItemKind::Chest => {
                agent.add_score((chest_score as f64 * multiplier).round() as i32);
                agent.set_holds_key(false);
            }
            ItemKind::Segment | ItemKind::Obstacle => {}
        }
    }

    fn kill(&mut self, id: AgentId, cause: DeathCause) -> Option<Death> {
        let penalty = self.config.arena.death_penalty;
        let position = self.agent(id)?.head();
        let multiplier = self.hazard.score_multiplier(position);

        let agent = self.agent_mut(id)?;
        if !agent.kill() {
            return None;
        }
        agent.add_score(-(penalty as f64 * multiplier).round() as i32);

        log::debug!("[Arena] agent {} died at {}: {:?}", id, position, cause);
        self.sink.emit(KernelEvent::AgentDied { agent: id, position });
        Some(Death {
            agent: id,
            position,
            cause,
        })
    }

    fn settle_tails(&mut self) {
        for agent in self.agents.iter_mut() {
            if agent.settle_tail().is_some() {
                if let Some(id) = self.segments.get_mut(&agent.id).and_then(|s| s.pop_back()) {
                    self.index.remove(id);
                }
            }
        }
    }

    /// Pull every live, non-immune agent one cell toward the hazard anchor
    fn apply_pull(&mut self) -> Vec<AgentId> {
        let mut pulled = Vec::new();
        for agent in self.agents.iter_mut().filter(|a| a.is_active() && !a.hazard_immune) {
            let Some(pull) = self.hazard.calculate_pull(agent.head()) else {
                continue;
            };
            let target = agent.head().step(pull.direction);
            match agent.force_reposition(target) {
                Ok(vacated) => {
                    let segments = self.segments.entry(agent.id).or_default();
                    segments.push_front(self.index.insert(target, ItemKind::Segment));
                    if vacated.is_some() {
                        if let Some(id) = segments.pop_back() {
                            self.index.remove(id);
                        }
                    }
                    pulled.push(agent.id);
                }
                Err(AgentError::SelfOverlap(cell)) => {
                    log::debug!("[Arena] pull of agent {} into own body at {} skipped", agent.id, cell);
                }
                Err(e) => log::warn!("[Arena] pull rejected: {}", e),
            }
        }
        pulled
    }

    fn kill_outside_safe_zone(&mut self, deaths: &mut Vec<Death>) {
        let outside: Vec<AgentId> = self
            .agents
            .iter()
            .filter(|a| a.is_active() && !self.safe_zone.is_position_safe(a.head()))
            .map(|a| a.id)
            .collect();
        for id in outside {
            if let Some(death) = self.kill(id, DeathCause::OutsideSafeZone) {
                deaths.push(death);
            }
        }
    }

    fn tick_timers(&mut self) {
        let mut gone = Vec::new();
        for agent in self.agents.iter_mut() {
            agent.tick_shield();
            if agent.tick_dying() {
                gone.push(agent.id);
            }
        }
        for id in gone {
            for item in self.segments.remove(&id).unwrap_or_default() {
                self.index.remove(item);
            }
        }
    }

    fn clear_pickups_outside(&mut self, bounds: Bounds) {
        let outside: Vec<ItemId> = self
            .pickups
            .keys()
            .copied()
            .filter(|id| self.index.get(*id).map_or(true, |item| !bounds.contains(item.position)))
            .collect();
        for id in &outside {
            self.index.remove(*id);
            self.pickups.remove(id);
        }
        if !outside.is_empty() {
            log::debug!("[Arena] removed {} pickups outside {}", outside.len(), bounds);
        }
    }

    /// Top food back up, favouring cells inside the hazard field
    fn respawn_food(&mut self) {
        let bounds = self.safe_zone.current_bounds();
        let top = if self.hazard.is_enabled() && self.hazard.geometry().is_some() {
            self.config.hazard.pickup_spawn_multiplier.max(1.0)
        } else {
            1.0
        };
        let mut missing = self
            .config
            .arena
            .food_count
            .saturating_sub(self.pickup_count(ItemKind::Food));

        let mut attempts = 0;
        while missing > 0 && attempts < 64 {
            attempts += 1;
            let cell = Cell::new(
                self.rng.gen_range(bounds.x_min..=bounds.x_max),
                self.rng.gen_range(bounds.y_min..=bounds.y_max),
            );
            if !self.index.items_at(cell).is_empty() || self.hazard.classify(cell) == ZoneType::Lethal {
                continue;
            }
            let weight = self.hazard.pickup_spawn_multiplier(cell) / top;
            if !self.rng.gen_bool(weight.clamp(0.0, 1.0)) {
                continue;
            }
            self.add_pickup(cell, ItemKind::Food);
            missing -= 1;
        }
    }

    /// Start a new session: agents and pickups cleared, zone and hazard rewound
    pub fn restart(&mut self) {
        self.agents.clear();
        self.segments.clear();
        self.pickups.clear();
        self.index.clear();
        self.hazard.reset();
        self.safe_zone.reset();
        self.tick = 0;
        self.scatter_obstacles();
        log::info!("[Arena] session restarted");
    }
}

/// Random moves among [`Arena::safe_directions`] for every live agent.
///
/// Agents with no safe direction keep their heading.
pub fn wander_intents<R: Rng + ?Sized>(arena: &Arena, rng: &mut R) -> HashMap<AgentId, Intent> {
    arena
        .agents()
        .iter()
        .filter(|a| a.is_active())
        .map(|a| {
            let options = arena.safe_directions(a.id);
            let intent = options
                .choose(rng)
                .map_or_else(Intent::default, |&d| Intent::turn(d));
            (a.id, intent)
        })
        .collect()
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("tick", &self.tick)
            .field("agents", &self.agents.len())
            .field("items", &self.index.len())
            .field("hazard", &self.hazard)
            .field("safe_zone", &self.safe_zone)
            .finish()
    }
}
