use crate::state::{GoalKind, WorldState};

/// Cost estimate used by best-first frontiers.
pub trait Heuristic {
    fn h(&self, state: &WorldState) -> usize;

    /// Priority of `state`; lower pops first.
    fn f(&self, state: &WorldState) -> usize;

    fn name(&self) -> String;
}

/// Manhattan estimate for a reduced state: agent to goal for agent goals,
/// agent to box plus box to goal for box goals. Walls and other entities
/// are ignored.
pub fn manhattan(state: &WorldState) -> usize {
    let (Some(goal), Some(agent)) = (state.goals().first(), state.agents().first()) else {
        return 0;
    };
    let distance = match (goal.kind, state.boxes().next()) {
        (GoalKind::Box(_), Some(entity)) => {
            agent.pos.distance(&entity.pos) + entity.pos.distance(&goal.pos)
        }
        _ => agent.pos.distance(&goal.pos),
    };
    distance as usize
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AStar;

impl Heuristic for AStar {
    fn h(&self, state: &WorldState) -> usize {
        manhattan(state)
    }

    fn f(&self, state: &WorldState) -> usize {
        state.g() + self.h(state)
    }

    fn name(&self) -> String {
        "A* evaluation".to_string()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WeightedAStar {
    pub weight: usize,
}

impl Default for WeightedAStar {
    fn default() -> Self {
        Self { weight: 5 }
    }
}

impl Heuristic for WeightedAStar {
    fn h(&self, state: &WorldState) -> usize {
        manhattan(state)
    }

    fn f(&self, state: &WorldState) -> usize {
        state.g() + self.weight * self.h(state)
    }

    fn name(&self) -> String {
        format!("WA*({}) evaluation", self.weight)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Greedy;

impl Heuristic for Greedy {
    fn h(&self, state: &WorldState) -> usize {
        manhattan(state)
    }

    fn f(&self, state: &WorldState) -> usize {
        self.h(state)
    }

    fn name(&self) -> String {
        "greedy evaluation".to_string()
    }
}
