use crate::infra::{Color, Position};

/// Agents are numbered `0-9` by the level; the number doubles as their slot
/// in a joint action.
pub type AgentId = usize;
pub type BoxId = usize;
pub type GoalId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Agent {
    pub id: AgentId,
    pub color: Color,
    pub pos: Position,
}

impl Agent {
    pub fn new(id: AgentId, color: Color, pos: Position) -> Self {
        Self { id, color, pos }
    }

    pub fn symbol(&self) -> char {
        agent_symbol(self.id)
    }
}

pub fn agent_symbol(id: AgentId) -> char {
    char::from_digit(id as u32, 10).unwrap_or('?')
}

/// A movable box. Two boxes compare equal when letter, color and position
/// match, whatever their ids.
#[derive(Debug, Clone, Copy)]
pub struct BoxEntity {
    pub id: BoxId,
    pub letter: char,
    pub color: Color,
    pub pos: Position,
}

impl BoxEntity {
    pub fn new(id: BoxId, letter: char, color: Color, pos: Position) -> Self {
        Self {
            id,
            letter,
            color,
            pos,
        }
    }
}

impl PartialEq for BoxEntity {
    fn eq(&self, other: &Self) -> bool {
        (self.color, self.pos, self.letter) == (other.color, other.pos, other.letter)
    }
}

impl Eq for BoxEntity {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GoalKind {
    /// Agent with this number must end on the cell.
    Agent(AgentId),
    /// A box with this letter must end on the cell.
    Box(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Goal {
    pub id: GoalId,
    pub kind: GoalKind,
    pub pos: Position,
}

impl Goal {
    pub fn new(id: GoalId, kind: GoalKind, pos: Position) -> Self {
        Self { id, kind, pos }
    }

    pub fn symbol(&self) -> char {
        match self.kind {
            GoalKind::Agent(agent) => agent_symbol(agent),
            GoalKind::Box(letter) => letter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_equality_ignores_id() {
        let a = BoxEntity::new(0, 'A', Color::Red, Position::new(1, 1));
        let b = BoxEntity::new(7, 'A', Color::Red, Position::new(1, 1));
        let c = BoxEntity::new(0, 'B', Color::Red, Position::new(1, 1));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_symbols() {
        assert_eq!(Agent::new(3, Color::Blue, Position::new(0, 0)).symbol(), '3');
        let goal = Goal::new(0, GoalKind::Box('C'), Position::new(2, 2));
        assert_eq!(goal.symbol(), 'C');
    }
}
