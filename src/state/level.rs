use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::infra::{Color, Position};
use crate::state::{AgentId, Goal};

/// Static level geometry shared read-only by every world state of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    pub name: String,
    rows: usize,
    cols: usize,
    walls: Vec<bool>,
    colors: BTreeMap<char, Color>,
    goals: Vec<Goal>,
    initial_agents: BTreeMap<AgentId, Position>,
    fingerprint: u64,
}

impl Level {
    pub fn new(
        name: impl Into<String>,
        rows: usize,
        cols: usize,
        walls: Vec<bool>,
        colors: BTreeMap<char, Color>,
        goals: Vec<Goal>,
        initial_agents: BTreeMap<AgentId, Position>,
    ) -> Self {
        let mut hasher = DefaultHasher::new();
        rows.hash(&mut hasher);
        cols.hash(&mut hasher);
        walls.hash(&mut hasher);
        colors.hash(&mut hasher);
        goals.hash(&mut hasher);
        Self {
            name: name.into(),
            rows,
            cols,
            walls,
            colors,
            goals,
            initial_agents,
            fingerprint: hasher.finish(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub(crate) fn index(&self, pos: Position) -> Option<usize> {
        if pos.row < 0 || pos.col < 0 {
            return None;
        }
        let (row, col) = (pos.row as usize, pos.col as usize);
        (row < self.rows && col < self.cols).then(|| row * self.cols + col)
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        self.index(pos).is_some()
    }

    /// Out-of-bounds cells count as walls.
    pub fn is_wall(&self, pos: Position) -> bool {
        self.index(pos).is_none_or(|idx| self.walls[idx])
    }

    pub fn color_of(&self, symbol: char) -> Option<Color> {
        self.colors.get(&symbol).copied()
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn agent_ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.initial_agents.keys().copied()
    }

    pub fn num_agents(&self) -> usize {
        self.initial_agents.len()
    }

    pub fn initial_location(&self, agent: AgentId) -> Option<Position> {
        self.initial_agents.get(&agent).copied()
    }

    /// Orthogonal neighbours of `pos` that are not walls.
    pub fn open_neighbor_count(&self, pos: Position) -> usize {
        pos.neighbors()
            .iter()
            .filter(|neighbor| !self.is_wall(**neighbor))
            .count()
    }

    pub(crate) fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}
