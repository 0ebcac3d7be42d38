use crate::infra::{Action, Schedule};
use crate::state::AgentId;

/// Interleaves per-agent paths into `length` joint actions, one slot per
/// agent in `agents` order. Missing or finished paths idle.
pub fn merge(schedule: &Schedule, agents: &[AgentId], length: usize) -> Vec<Vec<Action>> {
    (0..length)
        .map(|t| {
            agents
                .iter()
                .map(|agent| schedule.get(agent).map_or(Action::NoOp, |path| path.action_at(t)))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::Direction::{E, N, S};
    use crate::infra::{AgentPath, Position};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_shorter_paths_are_padded() {
        let mut schedule = Schedule::new();
        schedule.insert(
            0,
            AgentPath::new(
                vec![Action::Move(E), Action::Push(E, N), Action::Move(S)],
                vec![Position::new(1, 2), Position::new(1, 3), Position::new(2, 3)],
            ),
        );
        schedule.insert(2, AgentPath::new(vec![Action::Move(N)], vec![Position::new(1, 5)]));

        let plan = merge(&schedule, &[0, 1, 2], 3);
        assert_eq!(
            plan,
            vec![
                vec![Action::Move(E), Action::NoOp, Action::Move(N)],
                vec![Action::Push(E, N), Action::NoOp, Action::NoOp],
                vec![Action::Move(S), Action::NoOp, Action::NoOp],
            ]
        );
    }

    #[test]
    fn test_truncates_to_length() {
        let mut schedule = Schedule::new();
        schedule.insert(0, AgentPath::waiting(Position::new(1, 1), 5));
        assert_eq!(merge(&schedule, &[0], 2).len(), 2);
        assert!(merge(&schedule, &[0], 0).is_empty());
    }
}
