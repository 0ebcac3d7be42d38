//! The hospital action catalog.
//!
//! Every action carries a fixed agent displacement and, for push/pull, a box
//! displacement. `Push(a, b)` moves the agent in direction `a` into the box
//! cell and the box in direction `b`. `Pull(a, b)` moves the agent in
//! direction `a` while the box, found on the side opposite to `b`, follows
//! into the cell the agent left.

use std::fmt;

use crate::infra::{Direction, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    NoOp,
    Move,
    Push,
    Pull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Deltas {
    pub agent_row: i32,
    pub agent_col: i32,
    pub box_row: i32,
    pub box_col: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    NoOp,
    Move(Direction),
    Push(Direction, Direction),
    Pull(Direction, Direction),
}

use Direction::{E, N, S, W};

impl Action {
    /// All 29 actions: `NoOp`, 4 moves, 12 pushes and 12 pulls, covering
    /// every box direction except the one straight back into the agent.
    pub const ALL: [Action; 29] = [
        Action::NoOp,
        Action::Move(N),
        Action::Move(S),
        Action::Move(E),
        Action::Move(W),
        Action::Push(S, S),
        Action::Push(N, N),
        Action::Push(E, E),
        Action::Push(W, W),
        Action::Push(E, N),
        Action::Push(E, S),
        Action::Push(W, N),
        Action::Push(W, S),
        Action::Push(N, E),
        Action::Push(S, E),
        Action::Push(N, W),
        Action::Push(S, W),
        Action::Pull(N, N),
        Action::Pull(S, S),
        Action::Pull(E, E),
        Action::Pull(W, W),
        Action::Pull(W, S),
        Action::Pull(W, N),
        Action::Pull(E, N),
        Action::Pull(E, S),
        Action::Pull(S, W),
        Action::Pull(N, W),
        Action::Pull(S, E),
        Action::Pull(N, E),
    ];

    pub fn kind(self) -> ActionKind {
        match self {
            Action::NoOp => ActionKind::NoOp,
            Action::Move(_) => ActionKind::Move,
            Action::Push(..) => ActionKind::Push,
            Action::Pull(..) => ActionKind::Pull,
        }
    }

    pub fn deltas(self) -> Deltas {
        let (agent_row, agent_col, box_row, box_col) = match self {
            Action::NoOp => (0, 0, 0, 0),
            Action::Move(d) => {
                let (r, c) = d.delta();
                (r, c, 0, 0)
            }
            Action::Push(a, b) | Action::Pull(a, b) => {
                let (ar, ac) = a.delta();
                let (br, bc) = b.delta();
                (ar, ac, br, bc)
            }
        };
        Deltas {
            agent_row,
            agent_col,
            box_row,
            box_col,
        }
    }

    /// Wire name understood by the server, e.g. `Push(E,N)`.
    pub fn name(self) -> &'static str {
        match self {
            Action::NoOp => "NoOp",
            Action::Move(N) => "Move(N)",
            Action::Move(S) => "Move(S)",
            Action::Move(E) => "Move(E)",
            Action::Move(W) => "Move(W)",
            Action::Push(N, N) => "Push(N,N)",
            Action::Push(N, E) => "Push(N,E)",
            Action::Push(N, W) => "Push(N,W)",
            Action::Push(S, S) => "Push(S,S)",
            Action::Push(S, E) => "Push(S,E)",
            Action::Push(S, W) => "Push(S,W)",
            Action::Push(E, E) => "Push(E,E)",
            Action::Push(E, N) => "Push(E,N)",
            Action::Push(E, S) => "Push(E,S)",
            Action::Push(W, W) => "Push(W,W)",
            Action::Push(W, N) => "Push(W,N)",
            Action::Push(W, S) => "Push(W,S)",
            Action::Pull(N, N) => "Pull(N,N)",
            Action::Pull(N, E) => "Pull(N,E)",
            Action::Pull(N, W) => "Pull(N,W)",
            Action::Pull(S, S) => "Pull(S,S)",
            Action::Pull(S, E) => "Pull(S,E)",
            Action::Pull(S, W) => "Pull(S,W)",
            Action::Pull(E, E) => "Pull(E,E)",
            Action::Pull(E, N) => "Pull(E,N)",
            Action::Pull(E, S) => "Pull(E,S)",
            Action::Pull(W, W) => "Pull(W,W)",
            Action::Pull(W, N) => "Pull(W,N)",
            Action::Pull(W, S) => "Pull(W,S)",
            // Box moving straight back into the agent, not part of the catalog.
            Action::Push(..) | Action::Pull(..) => "Invalid",
        }
    }

    pub fn is_move(self) -> bool {
        matches!(self, Action::Move(_))
    }

    pub fn moves_box(self) -> bool {
        matches!(self, Action::Push(..) | Action::Pull(..))
    }

    /// The action that undoes this one: moves walk back, pushes become pulls
    /// and pulls become pushes with both directions reversed.
    pub fn reversed(self) -> Action {
        match self {
            Action::NoOp => Action::NoOp,
            Action::Move(d) => Action::Move(d.opposite()),
            Action::Push(a, b) => Action::Pull(a.opposite(), b.opposite()),
            Action::Pull(a, b) => Action::Push(a.opposite(), b.opposite()),
        }
    }

    /// Single move from `from` to an adjacent `to`, `NoOp` otherwise.
    pub fn move_between(from: Position, to: Position) -> Action {
        Direction::between(from, to).map_or(Action::NoOp, Action::Move)
    }

    /// Cell the agent occupies after applying this action from `agent`.
    pub fn agent_destination(self, agent: Position) -> Position {
        let d = self.deltas();
        agent.offset(d.agent_row, d.agent_col)
    }

    /// Cell the moved box is taken from, given the agent's position before
    /// the action.
    pub fn box_source(self, agent_before: Position) -> Option<Position> {
        let d = self.deltas();
        match self.kind() {
            ActionKind::Push => Some(agent_before.offset(d.agent_row, d.agent_col)),
            ActionKind::Pull => Some(agent_before.offset(-d.box_row, -d.box_col)),
            ActionKind::NoOp | ActionKind::Move => None,
        }
    }

    /// Cell the moved box occupies after the action, given the agent's
    /// position *after* the action. `None` for actions that move no box.
    pub fn box_destination(self, agent_after: Position) -> Option<Position> {
        let d = self.deltas();
        match self.kind() {
            ActionKind::Push => Some(agent_after.offset(d.box_row, d.box_col)),
            ActionKind::Pull => Some(agent_after.offset(-d.agent_row, -d.agent_col)),
            ActionKind::NoOp | ActionKind::Move => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_is_distinct_and_well_formed() {
        let names: HashSet<&str> = Action::ALL.iter().map(|a| a.name()).collect();
        assert_eq!(names.len(), Action::ALL.len());

        for action in Action::ALL {
            let d = action.deltas();
            for delta in [d.agent_row, d.agent_col, d.box_row, d.box_col] {
                assert!((-1..=1).contains(&delta), "{action} has delta {delta}");
            }
            if let Action::Push(a, b) | Action::Pull(a, b) = action {
                assert_ne!(a.opposite(), b, "{action} would move the box into the agent");
            }
        }
    }

    #[test]
    fn test_catalog_counts() {
        let count = |kind| Action::ALL.iter().filter(|a| a.kind() == kind).count();
        assert_eq!(count(ActionKind::NoOp), 1);
        assert_eq!(count(ActionKind::Move), 4);
        assert_eq!(count(ActionKind::Push), 12);
        assert_eq!(count(ActionKind::Pull), 12);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(Action::Push(E, N).to_string(), "Push(E,N)");
        assert_eq!(Action::Pull(S, W).name(), "Pull(S,W)");
        assert_eq!(Action::Move(N).name(), "Move(N)");
    }

    #[test]
    fn test_reversed_push_is_pull() {
        assert_eq!(Action::Push(S, S).reversed(), Action::Pull(N, N));
        assert_eq!(Action::Push(E, N).reversed(), Action::Pull(W, S));
        assert_eq!(Action::Pull(N, W).reversed(), Action::Push(S, E));
        assert_eq!(Action::Move(E).reversed(), Action::Move(W));
        for action in Action::ALL {
            assert_eq!(action.reversed().reversed(), action);
        }
    }

    #[test]
    fn test_box_destination() {
        let agent_after = Position::new(2, 2);
        assert_eq!(
            Action::Push(E, S).box_destination(agent_after),
            Some(Position::new(3, 2))
        );
        // Pull(N, N): agent went north, box follows into the cell below.
        assert_eq!(
            Action::Pull(N, N).box_destination(agent_after),
            Some(Position::new(3, 2))
        );
        assert_eq!(
            Action::Pull(W, S).box_destination(agent_after),
            Some(Position::new(2, 3))
        );
        assert_eq!(Action::Move(E).box_destination(agent_after), None);
    }

    #[test]
    fn test_box_source() {
        let agent = Position::new(2, 2);
        assert_eq!(Action::Push(E, S).box_source(agent), Some(Position::new(2, 3)));
        // Pull(W, S): box comes from the north and ends where the agent stood.
        assert_eq!(Action::Pull(W, S).box_source(agent), Some(Position::new(1, 2)));
        assert_eq!(Action::NoOp.box_source(agent), None);
    }
}
