//! Pairwise scan of a merged schedule for interactions that cannot execute
//! as planned.

use std::fmt;

use indexmap::IndexMap;

use crate::infra::{Action, ActionKind, AgentPath, Position, Schedule};
use crate::state::{AgentId, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictKind {
    TwoAgentsSameLocation,
    AgentThroughAgent,
    AgentThroughStaticAgent,
    StaticAgentThroughAgent,
    TwoBoxesSameLocation,
    BoxThroughAgent,
    AgentThroughBox,
    FirstBoxThroughSecondAgentPrev,
    SecondBoxThroughFirstAgentPrev,
}

impl ConflictKind {
    pub fn name(self) -> &'static str {
        match self {
            ConflictKind::TwoAgentsSameLocation => "two_agents_same_location",
            ConflictKind::AgentThroughAgent => "agent_through_agent",
            ConflictKind::AgentThroughStaticAgent => "agent_through_static_agent",
            ConflictKind::StaticAgentThroughAgent => "static_agent_through_agent",
            ConflictKind::TwoBoxesSameLocation => "two_boxes_same_location",
            ConflictKind::BoxThroughAgent => "box_through_agent",
            ConflictKind::AgentThroughBox => "agent_through_box",
            ConflictKind::FirstBoxThroughSecondAgentPrev => "first_box_through_second_agent_prev",
            ConflictKind::SecondBoxThroughFirstAgentPrev => "second_box_through_first_agent_prev",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conflict {
    pub index: usize,
    /// Where the first agent of the pair stands after the step.
    pub location: Position,
    pub kind: ConflictKind,
}

/// `first -> second -> conflicts`, in discovery order.
pub type ConflictMap = IndexMap<AgentId, IndexMap<AgentId, Vec<Conflict>>>;

/// One agent's view of a single timestep.
#[derive(Debug, Clone, Copy)]
struct Step {
    action: Action,
    location: Position,
    previous: Position,
    box_target: Option<Position>,
}

impl Step {
    fn at(path: &AgentPath, initial: Position, t: usize) -> Self {
        let action = path.action_at(t);
        let location = path.location_at(t, initial);
        Self {
            action,
            location,
            previous: path.previous_location(t, initial),
            box_target: action.box_destination(location),
        }
    }
}

/// Classifies what goes wrong when `first` and `second` execute their step
/// together. The first matching rule wins.
fn classify(first: &Step, second: &Step) -> Option<ConflictKind> {
    use ActionKind::{Move, NoOp};

    match (first.action.kind(), second.action.kind()) {
        (Move, Move) => {
            if first.location == second.location {
                Some(ConflictKind::TwoAgentsSameLocation)
            } else if first.location == second.previous || second.location == first.previous {
                Some(ConflictKind::AgentThroughAgent)
            } else {
                None
            }
        }
        (Move, NoOp) => {
            (first.location == second.location).then_some(ConflictKind::AgentThroughStaticAgent)
        }
        (NoOp, Move) => {
            (first.location == second.location).then_some(ConflictKind::StaticAgentThroughAgent)
        }
        _ => match (first.box_target, second.box_target) {
            (Some(first_box), None) => {
                (first_box == second.location).then_some(ConflictKind::BoxThroughAgent)
            }
            (None, Some(second_box)) => {
                (first.location == second_box).then_some(ConflictKind::AgentThroughBox)
            }
            (Some(first_box), Some(second_box)) => {
                if first_box == second_box {
                    Some(ConflictKind::TwoBoxesSameLocation)
                } else if first.location == second_box {
                    Some(ConflictKind::AgentThroughBox)
                } else if first_box == second.location {
                    Some(ConflictKind::BoxThroughAgent)
                } else if first_box == second.previous {
                    Some(ConflictKind::FirstBoxThroughSecondAgentPrev)
                } else if first.previous == second_box {
                    Some(ConflictKind::SecondBoxThroughFirstAgentPrev)
                } else {
                    None
                }
            }
            (None, None) => None,
        },
    }
}

/// Scans every timestep and every ordered pair of agents. Each interaction
/// is recorded twice, once under `[first][second]` as `first` sees it and
/// once under `[second][first]`. Paths shorter than the longest one idle on
/// their last cell.
pub fn detect_conflicts(level: &Level, schedule: &Schedule) -> ConflictMap {
    let horizon = schedule.values().map(AgentPath::len).max().unwrap_or(0);
    let agents: Vec<(AgentId, &AgentPath, Position)> = schedule
        .iter()
        .filter_map(|(id, path)| {
            let initial = level
                .initial_location(*id)
                .or_else(|| path.locations.first().copied())?;
            Some((*id, path, initial))
        })
        .collect();

    let mut conflicts = ConflictMap::new();
    for t in 0..horizon {
        let steps: Vec<Step> = agents
            .iter()
            .map(|(_, path, initial)| Step::at(path, *initial, t))
            .collect();

        for (i, (first, _, _)) in agents.iter().enumerate() {
            for (j, (second, _, _)) in agents.iter().enumerate() {
                if i == j {
                    continue;
                }
                let Some(kind) = classify(&steps[i], &steps[j]) else {
                    continue;
                };
                let conflict = Conflict {
                    index: t,
                    location: steps[i].location,
                    kind,
                };
                tracing::debug!(
                    "Conflict between agent {} and agent {} at {}, index {} of type {}",
                    first,
                    second,
                    conflict.location,
                    t,
                    kind
                );
                conflicts
                    .entry(*first)
                    .or_default()
                    .entry(*second)
                    .or_default()
                    .push(conflict);
            }
        }
    }
    conflicts
}

/// First conflict of the first conflicting pair.
pub fn first_conflict(conflicts: &ConflictMap) -> Option<(AgentId, AgentId, Conflict)> {
    conflicts.iter().find_map(|(first, others)| {
        others.iter().find_map(|(second, list)| {
            list.first().map(|conflict| (*first, *second, *conflict))
        })
    })
}

/// First conflict `second` has with `first`, i.e. the other side's view of
/// the pair.
pub fn mirrored_conflict(conflicts: &ConflictMap, first: AgentId, second: AgentId) -> Option<Conflict> {
    conflicts.get(&second)?.get(&first)?.first().copied()
}

/// Recorded conflicts, both views included.
pub fn conflict_count(conflicts: &ConflictMap) -> usize {
    conflicts
        .values()
        .flat_map(|others| others.values())
        .map(Vec::len)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::Direction::{E, N, S, W};
    use crate::state::parse_level;
    use pretty_assertions::assert_eq;

    const OPEN: &str = "\
#domain
hospital
#levelname
open
#colors
blue: 0, A
red: 1, B
#initial
+++++++
+0    +
+   1 +
+++++++
#goal
+++++++
+     +
+     +
+++++++
#end
";

    fn level() -> std::rc::Rc<Level> {
        std::rc::Rc::clone(parse_level(OPEN).unwrap().level())
    }

    fn path(steps: &[(Action, (i32, i32))]) -> AgentPath {
        AgentPath::new(
            steps.iter().map(|(a, _)| *a).collect(),
            steps.iter().map(|(_, (r, c))| Position::new(*r, *c)).collect(),
        )
    }

    #[test]
    fn test_follower_moves_into_previous_cell() {
        // 0 walks east along row 1; 1 steps up into (1,4) and moves on
        // exactly when 0 enters (1,4).
        let mut schedule = Schedule::new();
        schedule.insert(
            0,
            path(&[
                (Action::Move(E), (1, 2)),
                (Action::Move(E), (1, 3)),
                (Action::NoOp, (1, 3)),
                (Action::Move(E), (1, 4)),
            ]),
        );
        schedule.insert(
            1,
            path(&[
                (Action::NoOp, (2, 4)),
                (Action::NoOp, (2, 4)),
                (Action::Move(N), (1, 4)),
                (Action::Move(E), (1, 5)),
            ]),
        );

        let conflicts = detect_conflicts(&level(), &schedule);
        assert_eq!(conflicts[&0][&1].len(), 1);
        assert_eq!(conflict_count(&conflicts), 2);
        assert_eq!(
            first_conflict(&conflicts),
            Some((
                0,
                1,
                Conflict {
                    index: 3,
                    location: Position::new(1, 4),
                    kind: ConflictKind::AgentThroughAgent,
                }
            ))
        );
        assert_eq!(
            mirrored_conflict(&conflicts, 0, 1),
            Some(Conflict {
                index: 3,
                location: Position::new(1, 5),
                kind: ConflictKind::AgentThroughAgent,
            })
        );
    }

    #[test]
    fn test_same_destination() {
        let mut schedule = Schedule::new();
        schedule.insert(0, path(&[(Action::Move(E), (1, 2)), (Action::Move(E), (1, 3))]));
        schedule.insert(1, path(&[(Action::Move(W), (2, 3)), (Action::Move(N), (1, 3))]));
        let conflicts = detect_conflicts(&level(), &schedule);
        assert_eq!(
            conflicts[&0][&1],
            vec![Conflict {
                index: 1,
                location: Position::new(1, 3),
                kind: ConflictKind::TwoAgentsSameLocation,
            }]
        );
    }

    #[test]
    fn test_moving_into_finished_agent() {
        // 1 finished after one step; its frozen position blocks 0.
        let mut schedule = Schedule::new();
        schedule.insert(
            0,
            path(&[
                (Action::Move(E), (1, 2)),
                (Action::Move(E), (1, 3)),
                (Action::Move(E), (1, 4)),
            ]),
        );
        schedule.insert(1, path(&[(Action::Move(N), (1, 4))]));
        let conflicts = detect_conflicts(&level(), &schedule);
        let kinds: Vec<_> = conflicts[&0][&1].iter().map(|c| (c.index, c.kind)).collect();
        assert_eq!(kinds, vec![(2, ConflictKind::AgentThroughStaticAgent)]);
        let kinds: Vec<_> = conflicts[&1][&0].iter().map(|c| (c.index, c.kind)).collect();
        assert_eq!(kinds, vec![(2, ConflictKind::StaticAgentThroughAgent)]);
    }

    #[test]
    fn test_agent_walks_into_pushed_box() {
        let mut schedule = Schedule::new();
        schedule.insert(0, path(&[(Action::Move(E), (1, 2)), (Action::Move(E), (1, 3))]));
        // 1 pushes the box at (2,3) north into (1,3).
        schedule.insert(1, path(&[(Action::NoOp, (2, 4)), (Action::Push(W, N), (2, 3))]));
        let conflicts = detect_conflicts(&level(), &schedule);
        assert_eq!(conflict_count(&conflicts), 2);
        assert_eq!(
            conflicts[&0][&1][0],
            Conflict {
                index: 1,
                location: Position::new(1, 3),
                kind: ConflictKind::AgentThroughBox,
            }
        );
        // The pusher sees its box running into the walker.
        assert_eq!(
            conflicts[&1][&0][0],
            Conflict {
                index: 1,
                location: Position::new(2, 3),
                kind: ConflictKind::BoxThroughAgent,
            }
        );
    }

    #[test]
    fn test_box_lands_on_moving_agent() {
        let mut schedule = Schedule::new();
        schedule.insert(0, path(&[(Action::NoOp, (1, 1)), (Action::Push(E, E), (1, 2))]));
        schedule.insert(1, path(&[(Action::Move(W), (2, 3)), (Action::Move(W), (2, 2))]));
        assert_eq!(conflict_count(&detect_conflicts(&level(), &schedule)), 0);

        schedule.insert(1, path(&[(Action::Move(W), (2, 3)), (Action::Move(N), (1, 3))]));
        let conflicts = detect_conflicts(&level(), &schedule);
        let kinds: Vec<_> = conflicts[&0][&1].iter().map(|c| (c.index, c.kind)).collect();
        assert_eq!(kinds, vec![(1, ConflictKind::BoxThroughAgent)]);
    }

    #[test]
    fn test_two_boxes_same_cell() {
        let mut schedule = Schedule::new();
        schedule.insert(0, path(&[(Action::Push(E, E), (1, 2))]));
        schedule.insert(1, path(&[(Action::Push(W, N), (2, 3))]));
        let conflicts = detect_conflicts(&level(), &schedule);
        assert_eq!(
            conflicts[&0][&1].first().map(|c| c.kind),
            Some(ConflictKind::TwoBoxesSameLocation)
        );
    }

    #[test]
    fn test_box_lands_on_previous_cell() {
        // 0 pushes its box south into (2,3) just as 1 leaves that cell
        // pushing its own box east.
        let mut schedule = Schedule::new();
        schedule.insert(0, path(&[(Action::Move(E), (1, 2)), (Action::Push(E, S), (1, 3))]));
        schedule.insert(1, path(&[(Action::Move(W), (2, 3)), (Action::Push(E, E), (2, 4))]));

        let conflicts = detect_conflicts(&level(), &schedule);
        assert_eq!(
            conflicts[&0][&1],
            vec![Conflict {
                index: 1,
                location: Position::new(1, 3),
                kind: ConflictKind::FirstBoxThroughSecondAgentPrev,
            }]
        );
        assert_eq!(
            conflicts[&1][&0],
            vec![Conflict {
                index: 1,
                location: Position::new(2, 4),
                kind: ConflictKind::SecondBoxThroughFirstAgentPrev,
            }]
        );
    }

    #[test]
    fn test_conflict_free_schedule() {
        let mut schedule = Schedule::new();
        schedule.insert(0, path(&[(Action::Move(E), (1, 2))]));
        schedule.insert(1, path(&[(Action::Move(E), (2, 5))]));
        let conflicts = detect_conflicts(&level(), &schedule);
        assert!(conflicts.is_empty());
        assert_eq!(first_conflict(&conflicts), None);
    }
}
