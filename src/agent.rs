//! Agents: snakes made of an ordered, contiguous run of cells.

use crate::geometry::{Cell, Direction};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Unique agent identifier
pub type AgentId = u32;

/// Ticks an agent spends in its death animation before it is gone
pub const DEATH_ANIMATION_TICKS: u32 = 3;

/// Shield bookkeeping
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shield {
    pub active: bool,
    pub remaining: u32,
    pub cooldown: u32,
    /// Shield granted at spawn rather than bought
    pub spawn: bool,
    /// A bought shield costs the agent its next move
    pub just_activated: bool,
}

/// Rejected mutation of an agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    NotActive(AgentId),
    NotAdjacent { head: Cell, target: Cell },
    SelfOverlap(Cell),
}

impl std::fmt::Display for AgentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotActive(id) => write!(f, "agent {} is dead or dying", id),
            Self::NotAdjacent { head, target } => {
                write!(f, "cannot move head from {} to non-adjacent {}", head, target)
            }
            Self::SelfOverlap(cell) => write!(f, "new head {} overlaps own body", cell),
        }
    }
}

impl std::error::Error for AgentError {}

/// A controlled snake
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,

    /// Head at the front, tail at the back
    body: VecDeque<Cell>,
    direction: Direction,

    pub score: i32,
    shield: Shield,
    /// Exempt from hazard pull (lethal cells still kill)
    pub hazard_immune: bool,
    holds_key: bool,

    pending_growth: u32,
    /// Set by `advance`; the tail is vacated when the tick settles
    tail_pending: bool,

    alive: bool,
    dying: bool,
    dying_ticks: u32,
}

impl Agent {
    /// Spawn an agent with its head at `head`, laid out behind it against `direction`.
    pub fn new(id: AgentId, name: impl Into<String>, head: Cell, direction: Direction, length: usize, spawn_shield: u32) -> Self {
        let behind = direction.opposite();
        let mut body = VecDeque::with_capacity(length.max(1));
        let mut cell = head;
        for _ in 0..length.max(1) {
            body.push_back(cell);
            cell = cell.step(behind);
        }

        Self {
            id,
            name: name.into(),
            body,
            direction,
            score: 0,
            shield: Shield {
                active: spawn_shield > 0,
                remaining: spawn_shield,
                cooldown: 0,
                spawn: spawn_shield > 0,
                just_activated: false,
            },
            hazard_immune: false,
            holds_key: false,
            pending_growth: 0,
            tail_pending: false,
            alive: true,
            dying: false,
            dying_ticks: 0,
        }
    }

    /// Build an agent from an explicit head-to-tail body
    pub fn from_body(id: AgentId, body: Vec<Cell>, direction: Direction) -> Self {
        let head = body.first().copied().unwrap_or(Cell::new(0, 0));
        let mut agent = Self::new(id, format!("agent-{}", id), head, direction, 1, 0);
        agent.body = body.into_iter().collect();
        if agent.body.is_empty() {
            agent.body.push_back(head);
        }
        agent
    }

    #[inline]
    pub fn head(&self) -> Cell {
        self.body[0]
    }

    #[inline]
    pub fn tail(&self) -> Cell {
        self.body[self.body.len() - 1]
    }

    #[inline]
    pub fn body(&self) -> &VecDeque<Cell> {
        &self.body
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.body.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[inline]
    pub fn occupies(&self, cell: Cell) -> bool {
        self.body.contains(&cell)
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    #[inline]
    pub fn is_dying(&self) -> bool {
        self.dying
    }

    /// Alive and not playing its death animation
    #[inline]
    pub fn is_active(&self) -> bool {
        self.alive && !self.dying
    }

    #[inline]
    pub fn is_shield_active(&self) -> bool {
        self.shield.active
    }

    #[inline]
    pub fn shield(&self) -> Shield {
        self.shield
    }

    #[inline]
    pub fn holds_key(&self) -> bool {
        self.holds_key
    }

    pub fn set_holds_key(&mut self, holds: bool) {
        self.holds_key = holds;
    }

    /// True when the tail cell will be vacated as this tick settles
    #[inline]
    pub fn tail_retracts(&self) -> bool {
        self.tail_pending
    }

    /// Apply a movement decision. `None` keeps the current heading.
    ///
    /// The new head is pushed immediately; the tail stays in place until
    /// [`Agent::settle_tail`] so simultaneous moves see each other's tails.
    /// Returns the new head, or `None` if the agent did not move.
    pub fn advance(&mut self, decision: Option<Direction>) -> Option<Cell> {
        if !self.is_active() {
            return None;
        }

        if self.shield.just_activated && !self.shield.spawn {
            self.shield.just_activated = false;
            self.shield.remaining = self.shield.remaining.saturating_sub(1);
            return None;
        }

        if let Some(dir) = decision {
            // Reversing into the neck is ignored
            if !(self.body.len() > 1 && dir == self.direction.opposite()) {
                self.direction = dir;
            }
        }

        let new_head = self.head().step(self.direction);
        self.body.push_front(new_head);

        if self.pending_growth > 0 {
            self.pending_growth -= 1;
            self.tail_pending = false;
        } else {
            self.tail_pending = true;
        }
        Some(new_head)
    }

    /// Vacate the tail cell left over from `advance`
    pub fn settle_tail(&mut self) -> Option<Cell> {
        if !self.tail_pending {
            return None;
        }
        self.tail_pending = false;
        if self.body.len() > 1 {
            self.body.pop_back()
        } else {
            None
        }
    }

    /// Move the head one cell to `new_head` without growing.
    ///
    /// Used for the hazard pull sub-step. The target must be edge-adjacent to
    /// the current head and must not land on the agent's own body (the tail is
    /// released first). Returns the vacated tail cell.
    pub fn force_reposition(&mut self, new_head: Cell) -> Result<Option<Cell>, AgentError> {
        if !self.is_active() {
            return Err(AgentError::NotActive(self.id));
        }
        let head = self.head();
        if !head.is_adjacent(new_head) {
            return Err(AgentError::NotAdjacent { head, target: new_head });
        }

        let keep = self.body.len().saturating_sub(1).max(1);
        if self.body.iter().take(keep).any(|&c| c == new_head) && self.body.len() > 1 {
            return Err(AgentError::SelfOverlap(new_head));
        }

        self.settle_tail();
        self.body.push_front(new_head);
        let vacated = if self.body.len() > 1 { self.body.pop_back() } else { None };

        let (dx, dy) = (new_head.x - head.x, new_head.y - head.y);
        if let Some(dir) = Direction::ALL.into_iter().find(|d| d.offset() == (dx, dy)) {
            self.direction = dir;
        }
        Ok(vacated)
    }

    /// Queue `segments` extra cells of growth
    pub fn grow(&mut self, segments: u32) {
        self.pending_growth += segments;
    }

    pub fn add_score(&mut self, delta: i32) {
        self.score += delta;
    }

    /// Buy a shield. Fails while one is active, on cooldown, or unaffordable.
    pub fn activate_shield(&mut self, duration: u32, cost: i32, cooldown: u32) -> bool {
        if self.shield.active || self.shield.cooldown > 0 || self.score < cost {
            return false;
        }
        self.score -= cost;
        self.shield = Shield {
            active: true,
            remaining: duration,
            cooldown,
            spawn: false,
            just_activated: true,
        };
        true
    }

    /// Grant a shield that costs nothing, starts no cooldown and does not skip a move
    pub fn grant_free_shield(&mut self, duration: u32) {
        if !self.is_active() {
            return;
        }
        self.shield.active = true;
        self.shield.remaining = self.shield.remaining.max(duration);
        self.shield.just_activated = false;
    }

    /// Count shield duration and cooldown down by one tick
    pub fn tick_shield(&mut self) {
        if self.shield.active {
            if self.shield.remaining > 0 {
                self.shield.remaining -= 1;
            }
            if self.shield.remaining == 0 {
                self.shield.active = false;
                self.shield.spawn = false;
            }
        } else if self.shield.cooldown > 0 {
            self.shield.cooldown -= 1;
        }
    }

    /// Start the death animation. Returns false if already dead or dying.
    pub fn kill(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.dying = true;
        self.dying_ticks = DEATH_ANIMATION_TICKS;
        self.tail_pending = false;
        self.shield.active = false;
        true
    }

    /// Advance the death animation; returns true when the agent is finally gone
    pub fn tick_dying(&mut self) -> bool {
        if !self.dying {
            return false;
        }
        self.dying_ticks = self.dying_ticks.saturating_sub(1);
        if self.dying_ticks == 0 {
            self.dying = false;
            self.alive = false;
            return true;
        }
        false
    }

    /// Body cells are contiguous and distinct
    pub fn is_valid(&self) -> bool {
        let contiguous = self
            .body
            .iter()
            .zip(self.body.iter().skip(1))
            .all(|(a, b)| a.is_adjacent(*b));
        let unique = self
            .body
            .iter()
            .enumerate()
            .all(|(i, c)| !self.body.iter().skip(i + 1).any(|o| o == c));
        contiguous && unique
    }
}
