use std::collections::BTreeMap;

use crate::infra::{Action, Position};
use crate::state::AgentId;

/// One agent's actions, index-aligned with its position after each action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentPath {
    pub actions: Vec<Action>,
    pub locations: Vec<Position>,
}

/// Every planned agent's path, in agent order.
pub type Schedule = BTreeMap<AgentId, AgentPath>;

impl AgentPath {
    pub fn new(actions: Vec<Action>, locations: Vec<Position>) -> Self {
        debug_assert_eq!(actions.len(), locations.len());
        Self { actions, locations }
    }

    /// `steps` no-ops standing on `pos`.
    pub fn waiting(pos: Position, steps: usize) -> Self {
        Self::new(vec![Action::NoOp; steps], vec![pos; steps])
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Action at step `t`; a finished path keeps idling.
    pub fn action_at(&self, t: usize) -> Action {
        self.actions.get(t).copied().unwrap_or(Action::NoOp)
    }

    /// Position after step `t`; a finished path stays frozen on its last
    /// cell, an empty one on `initial`.
    pub fn location_at(&self, t: usize, initial: Position) -> Position {
        self.locations
            .get(t)
            .or(self.locations.last())
            .copied()
            .unwrap_or(initial)
    }

    /// Position before step `t`.
    pub fn previous_location(&self, t: usize, initial: Position) -> Position {
        match t {
            0 => initial,
            _ => self.location_at(t - 1, initial),
        }
    }

    /// Where the box moved at step `t` ends up, if that step moves one.
    pub fn box_target_at(&self, t: usize) -> Option<Position> {
        let location = self.locations.get(t)?;
        self.action_at(t).box_destination(*location)
    }

    pub fn end_location(&self, initial: Position) -> Position {
        self.locations.last().copied().unwrap_or(initial)
    }

    pub fn append(&mut self, mut other: AgentPath) {
        self.actions.append(&mut other.actions);
        self.locations.append(&mut other.locations);
    }

    /// Idles at the current end of the path until it is `len` steps long.
    pub fn pad_to(&mut self, len: usize, initial: Position) {
        if len > self.len() {
            let pos = self.end_location(initial);
            let missing = len - self.len();
            self.append(AgentPath::waiting(pos, missing));
        }
    }

    /// Inserts `steps` no-ops before step `index`, standing where the agent
    /// is at that moment.
    pub fn insert_wait(&mut self, index: usize, steps: usize, initial: Position) {
        let index = index.min(self.len());
        let pos = self.previous_location(index, initial);
        self.splice(index, index, AgentPath::waiting(pos, steps));
    }

    /// Replaces steps `from..to` with `replacement`.
    pub fn splice(&mut self, from: usize, to: usize, replacement: AgentPath) {
        self.actions.splice(from..to, replacement.actions);
        self.locations.splice(from..to, replacement.locations);
    }
}
