//! Read-only view of the world handed to kernel components.

use crate::agent::Agent;
use crate::geometry::Cell;
use crate::grid::{ItemKind, SpatialIndex};

/// Entity lookups the hazard placement search relies on
pub trait EntityQuery {
    /// Agents that are alive and not dying
    fn live_agents(&self) -> Vec<&Agent>;

    /// Every agent, including dead and dying ones
    fn all_agents(&self) -> Vec<&Agent>;

    /// Check whether `position` holds any item of `kinds`
    fn is_position_occupied(&self, position: Cell, kinds: &[ItemKind]) -> bool;
}

/// Borrowed agents plus the spatial index they are registered in
#[derive(Clone, Copy)]
pub struct WorldView<'a> {
    pub agents: &'a [Agent],
    pub index: &'a SpatialIndex,
}

impl<'a> WorldView<'a> {
    pub fn new(agents: &'a [Agent], index: &'a SpatialIndex) -> Self {
        Self { agents, index }
    }
}

impl EntityQuery for WorldView<'_> {
    fn live_agents(&self) -> Vec<&Agent> {
        self.agents.iter().filter(|a| a.is_active()).collect()
    }

    fn all_agents(&self) -> Vec<&Agent> {
        self.agents.iter().collect()
    }

    fn is_position_occupied(&self, position: Cell, kinds: &[ItemKind]) -> bool {
        if self.index.is_occupied(position, kinds) {
            return true;
        }
        // Agents not registered in the index still count as occupying their cells
        kinds.contains(&ItemKind::Segment) && self.agents.iter().any(|a| a.is_alive() && a.occupies(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Direction;

    #[test]
    fn test_world_view() {
        let mut index = SpatialIndex::new(2);
        index.insert(Cell::new(1, 1), ItemKind::Obstacle);
        let mut dead = Agent::new(2, "b", Cell::new(10, 10), Direction::Up, 2, 0);
        dead.kill();
        let agents = vec![Agent::new(1, "a", Cell::new(5, 5), Direction::Right, 3, 0), dead];
        let view = WorldView::new(&agents, &index);

        assert_eq!(view.live_agents().len(), 1);
        assert_eq!(view.all_agents().len(), 2);
        assert!(view.is_position_occupied(Cell::new(1, 1), &[ItemKind::Obstacle]));
        assert!(view.is_position_occupied(Cell::new(4, 5), &[ItemKind::Segment]));
        assert!(!view.is_position_occupied(Cell::new(4, 5), &[ItemKind::Obstacle]));
    }
}
