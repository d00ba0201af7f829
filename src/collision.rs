//! Per-tick collision detection.
//!
//! The resolver only reads agents, the spatial index and the hazard field. It
//! returns one ordered list of events per pass; the arena applies them.

use crate::agent::{Agent, AgentId};
use crate::geometry::{Bounds, Cell};
use crate::grid::{ItemKind, SpatialIndex};
use crate::hazard::{HazardField, HazardState, ZoneType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What an agent's head ran into
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CollisionEvent {
    /// Head left the grid
    Wall { agent: AgentId, position: Cell },
    Obstacle { agent: AgentId, position: Cell },
    /// Head landed on another agent's head
    AgentHead { agent: AgentId, other: AgentId, position: Cell },
    /// Head landed on a body cell; `other` may be the agent itself
    AgentBody { agent: AgentId, other: AgentId, position: Cell },
    /// Head landed in the lethal block of an active hazard
    Hazard { agent: AgentId, position: Cell },
    /// Chest reached without a key
    LockedChest { agent: AgentId, position: Cell },
    Pickup { agent: AgentId, position: Cell, kind: ItemKind },
}

impl CollisionEvent {
    pub fn agent(&self) -> AgentId {
        match *self {
            Self::Wall { agent, .. }
            | Self::Obstacle { agent, .. }
            | Self::AgentHead { agent, .. }
            | Self::AgentBody { agent, .. }
            | Self::Hazard { agent, .. }
            | Self::LockedChest { agent, .. }
            | Self::Pickup { agent, .. } => agent,
        }
    }

    pub fn position(&self) -> Cell {
        match *self {
            Self::Wall { position, .. }
            | Self::Obstacle { position, .. }
            | Self::AgentHead { position, .. }
            | Self::AgentBody { position, .. }
            | Self::Hazard { position, .. }
            | Self::LockedChest { position, .. }
            | Self::Pickup { position, .. } => position,
        }
    }

    #[inline]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Pickup { .. })
    }
}

/// Resolves head positions against walls, items, agents and the hazard
#[derive(Clone, Copy, Debug)]
pub struct CollisionResolver {
    grid: Bounds,
}

impl CollisionResolver {
    pub fn new(columns: i32, rows: i32) -> Self {
        Self {
            grid: Bounds::full(columns, rows),
        }
    }

    /// Evaluate every live agent's head.
    ///
    /// `live` are the agents being moved this pass; `all` is the full roster,
    /// dying agents included, whose bodies still block. Each agent gets at most
    /// one fatal event. Fatal events come first, each class in roster order.
    pub fn detect_collisions(
        &self,
        live: &[&Agent],
        all: &[Agent],
        index: &SpatialIndex,
        hazard: Option<&HazardField>,
    ) -> Vec<CollisionEvent> {
        let mut fatal: Vec<CollisionEvent> = Vec::new();
        let mut pickups: Vec<CollisionEvent> = Vec::new();
        let mut marked: HashSet<AgentId> = HashSet::new();
        let moving: HashSet<AgentId> = live.iter().map(|a| a.id).collect();

        for agent in live {
            if !agent.is_active() {
                continue;
            }
            let head = agent.head();

            if let Some(event) = self.check_static(agent, head, index, hazard) {
                marked.insert(agent.id);
                fatal.push(event);
                continue;
            }

            let agent_hits = self.check_agents(agent, head, all, &moving, hazard);
            for event in &agent_hits {
                if marked.insert(event.agent()) {
                    fatal.push(*event);
                }
            }
            if agent_hits.iter().any(|e| e.agent() == agent.id) {
                continue;
            }

            for item in index.items_at(head) {
                let collectable = match item.kind {
                    ItemKind::Food => true,
                    ItemKind::Key => !agent.holds_key(),
                    ItemKind::Chest => agent.holds_key(),
                    ItemKind::Segment | ItemKind::Obstacle => false,
                };
                if collectable {
                    pickups.push(CollisionEvent::Pickup {
                        agent: agent.id,
                        position: head,
                        kind: item.kind,
                    });
                }
            }
        }

        fatal.extend(pickups);
        fatal
    }

    /// Lethal block, wall, obstacle and locked chest, in that order
    fn check_static(
        &self,
        agent: &Agent,
        head: Cell,
        index: &SpatialIndex,
        hazard: Option<&HazardField>,
    ) -> Option<CollisionEvent> {
        // Lethal cells ignore shields and immunity
        if let Some(field) = hazard {
            if field.state() == HazardState::Active && field.classify(head) == ZoneType::Lethal {
                return Some(CollisionEvent::Hazard {
                    agent: agent.id,
                    position: head,
                });
            }
        }

        if !self.grid.contains(head) {
            return Some(CollisionEvent::Wall {
                agent: agent.id,
                position: head,
            });
        }

        let items = index.items_at(head);
        if items.iter().any(|i| i.kind == ItemKind::Obstacle) {
            return Some(CollisionEvent::Obstacle {
                agent: agent.id,
                position: head,
            });
        }
        if !agent.holds_key() && items.iter().any(|i| i.kind == ItemKind::Chest) {
            return Some(CollisionEvent::LockedChest {
                agent: agent.id,
                position: head,
            });
        }
        None
    }

    /// Head-to-head and body overlaps.
    ///
    /// The verdict for `agent` depends only on the roster, never on which
    /// agents already received events this pass. An unshielded head owner that
    /// is not in `moving` is not evaluated on its own, so its event is returned
    /// here as well.
    fn check_agents(
        &self,
        agent: &Agent,
        head: Cell,
        all: &[Agent],
        moving: &HashSet<AgentId>,
        hazard: Option<&HazardField>,
    ) -> Vec<CollisionEvent> {
        let ghost = hazard.map_or(false, |f| f.state() == HazardState::Active && f.is_position_in_field(head));
        let mut own: Option<CollisionEvent> = None;
        let mut bystanders = Vec::new();

        for other in all {
            if !other.is_alive() {
                continue;
            }

            if other.id == agent.id {
                // Shields and the field never let a body overlap itself
                let hits_self = agent.body().iter().skip(1).any(|&c| c == head);
                let retracting = head == agent.tail() && agent.tail_retracts();
                if hits_self && !retracting {
                    own.get_or_insert(CollisionEvent::AgentBody {
                        agent: agent.id,
                        other: agent.id,
                        position: head,
                    });
                }
                continue;
            }

            if other.is_active() && other.head() == head {
                if !agent.is_shield_active() {
                    own.get_or_insert(CollisionEvent::AgentHead {
                        agent: agent.id,
                        other: other.id,
                        position: head,
                    });
                }
                if !other.is_shield_active() && !moving.contains(&other.id) {
                    bystanders.push(CollisionEvent::AgentHead {
                        agent: other.id,
                        other: agent.id,
                        position: head,
                    });
                }
                continue;
            }

            // Dying bodies, heads included, still block
            if !other.occupies(head) {
                continue;
            }
            let retracting = head == other.tail() && other.tail_retracts() && other.is_active();
            if agent.is_shield_active() || ghost || retracting {
                continue;
            }
            own.get_or_insert(CollisionEvent::AgentBody {
                agent: agent.id,
                other: other.id,
                position: head,
            });
        }

        own.into_iter().chain(bystanders).collect()
    }
}

/// Register every body cell of `agents` in `index` as a segment
pub fn index_segments(index: &mut SpatialIndex, agents: &[Agent]) {
    for agent in agents.iter().filter(|a| a.is_alive()) {
        for &cell in agent.body() {
            index.insert(cell, ItemKind::Segment);
        }
    }
}
