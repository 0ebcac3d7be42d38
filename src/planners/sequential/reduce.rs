use std::rc::Rc;

use crate::infra::Position;
use crate::state::{Agent, BoxEntity, Goal, WorldState};

/// Single-agent copy of `master` holding only `agent`, the optional box and
/// `goal`. Walls, colors and marks are shared with the master; `g` is the
/// agent's committed plan length so that marks are judged at the right time.
pub fn reduced_state(
    master: &WorldState,
    agent: &Agent,
    entity: Option<&BoxEntity>,
    goal: &Goal,
    g: usize,
) -> WorldState {
    WorldState::from_parts(
        Rc::clone(master.level()),
        vec![*agent],
        entity.into_iter().copied().collect(),
        vec![*goal],
        Rc::clone(master.marks()),
        g,
    )
}

/// Writes a solved subgoal back into the master: the agent stands on its
/// final cell, the delivered box leaves the board and the goal cell is
/// claimed from `locked_from` on.
pub fn commit(
    master: &mut WorldState,
    agent: &Agent,
    entity: Option<&BoxEntity>,
    goal: &Goal,
    end: Position,
    locked_from: usize,
) {
    master.move_agent(agent.id, end);
    if let Some(entity) = entity {
        master.remove_box(entity.id);
    }
    master.mark(goal.pos, locked_from);
    tracing::debug!(
        "Committed goal {} at {}: agent {} now at {}, cell locked from {}",
        goal.symbol(),
        goal.pos,
        agent.id,
        end,
        locked_from
    );
}
