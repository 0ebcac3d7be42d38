//! Boxes of another color standing on a freshly planned path.
//!
//! Sub-problems only contain the matched agent and box, so a sub-plan can
//! walk straight through boxes the agent is not allowed to move. When that
//! happens early in the plan, an agent of the box's color is sent to drag or
//! shove the box off the path before the blocked agent sets out.

use std::collections::HashSet;

use crate::infra::{Action, AgentPath, Direction, PlanError, Position, Schedule};
use crate::planners::search::SubSearch;
use crate::planners::sequential::matcher::{best_agent_for_box, load};
use crate::planners::sequential::reduce::reduced_state;
use crate::state::{Agent, AgentId, BoxEntity, BoxId, Goal, GoalKind, WorldState};

/// Blocking boxes further into the plan are left for conflict repair.
const DEADLOCK_HORIZON: usize = 10;

/// Corridors scanned around a blocking box, in order.
const CLEARING_DIRECTIONS: [Direction; 4] = [Direction::S, Direction::N, Direction::E, Direction::W];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deadlock {
    /// Step of the blocked plan that enters the box's cell.
    pub index: usize,
    pub blocker: BoxEntity,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub mover: AgentId,
    pub box_position: Position,
}

/// First box on `path` other than the one being delivered. Only a box of a
/// foreign color within the horizon counts as a deadlock.
pub fn find_deadlock(
    master: &WorldState,
    agent: &Agent,
    delivered: Option<BoxId>,
    path: &AgentPath,
) -> Result<Option<Deadlock>, PlanError> {
    for (index, location) in path.locations.iter().enumerate() {
        let Some(blocker) = master.box_at(*location) else {
            continue;
        };
        if Some(blocker.id) == delivered {
            continue;
        }
        if blocker.color == agent.color {
            return Err(PlanError::UnsupportedDeadlock {
                agent: agent.id,
                position: *location,
            });
        }
        if index > DEADLOCK_HORIZON {
            return Ok(None);
        }
        tracing::debug!(
            "Agent {} runs into box {} at {} (index {})",
            agent.id,
            blocker.letter,
            location,
            index
        );
        return Ok(Some(Deadlock {
            index,
            blocker: *blocker,
        }));
    }
    Ok(None)
}

/// Sends the best agent of the blocker's color to clear it off `locked_path`,
/// then schedules `locked_path` after the clearing is done. Updates the
/// master with where the mover and the box end up.
pub fn resolve_deadlock(
    master: &mut WorldState,
    schedule: &mut Schedule,
    search: &mut SubSearch,
    locked: &Agent,
    locked_path: AgentPath,
    deadlock: &Deadlock,
) -> Result<Resolution, PlanError> {
    let blocker = deadlock.blocker;
    let unresolvable = PlanError::UnresolvableDeadlock {
        agent: locked.id,
        position: blocker.pos,
    };
    let mover = best_agent_for_box(master, &blocker, schedule).ok_or_else(|| unresolvable.clone())?;
    tracing::debug!("Agent {} will solve deadlock at {}", mover.id, blocker.pos);

    let mover_start = load(schedule, mover.id);
    let locked_cells: HashSet<Position> = locked_path.locations.iter().copied().collect();

    let (clearing, box_position) = if mover.pos.is_adjacent(&blocker.pos) {
        let snapshot = master.at_time(mover_start);
        adjacent_clearing(&snapshot, mover.pos, blocker.pos, &locked_cells)
            .ok_or_else(|| unresolvable.clone())?
    } else {
        let goal = Goal::new(0, GoalKind::Agent(mover.id), blocker.pos);
        let approach = search.solve(reduced_state(master, &mover, None, &goal, mover_start))?;
        pull_clear(approach, mover.pos, blocker.pos, &locked_cells).ok_or(unresolvable)?
    };

    let clearing_len = clearing.len();
    let mover_path = schedule.entry(mover.id).or_default();
    mover_path.append(clearing);
    let mover_end = mover_path.end_location(mover.pos);
    let mover_done = mover_path.len();

    let locked_entry = schedule.entry(locked.id).or_default();
    let wait = clearing_len.max(mover_done.saturating_sub(locked_entry.len()));
    let waiting_at = locked_entry.end_location(locked.pos);
    locked_entry.append(AgentPath::waiting(waiting_at, wait));
    locked_entry.append(locked_path);

    master.move_agent(mover.id, mover_end);
    master.move_box(blocker.id, box_position);
    tracing::debug!(
        "Agent {} waits {} steps while agent {} moves box {} to {}",
        locked.id,
        wait,
        mover.id,
        blocker.letter,
        box_position
    );

    Ok(Resolution {
        mover: mover.id,
        box_position,
    })
}

/// Two-cell corridor next to the box that the mover can use right away:
/// pull the box onto its own cell when the corridor starts there, push it
/// down the corridor otherwise.
fn adjacent_clearing(
    snapshot: &WorldState,
    mover: Position,
    blocker: Position,
    locked: &HashSet<Position>,
) -> Option<(AgentPath, Position)> {
    for direction in CLEARING_DIRECTIONS {
        let near = blocker.step(direction);
        let far = near.step(direction);
        let near_ok = (snapshot.is_free(near) || near == mover) && !locked.contains(&near);
        let far_ok = snapshot.is_free(far) && !locked.contains(&far);
        if !(near_ok && far_ok) {
            continue;
        }

        if near == mover {
            let path = AgentPath::new(vec![Action::Pull(direction, direction)], vec![far]);
            return Some((path, near));
        }
        let Some(approach) = Direction::between(mover, blocker) else {
            continue;
        };
        let path = AgentPath::new(
            vec![Action::Push(approach, direction), Action::Push(direction, direction)],
            vec![blocker, near],
        );
        return Some((path, far));
    }
    None
}

/// Walks up to the box along `approach` (minus the step onto the box) and
/// then drags the box back along the same cells until it is off the locked
/// path.
fn pull_clear(
    mut approach: AgentPath,
    start: Position,
    blocker: Position,
    locked: &HashSet<Position>,
) -> Option<(AgentPath, Position)> {
    approach.actions.pop();
    approach.locations.pop();

    let trail: Vec<Position> = std::iter::once(start)
        .chain(approach.locations.iter().copied())
        .collect();
    let mut k = trail.len() - 1;
    let mut box_position = blocker;
    let mut pulls = AgentPath::default();

    while locked.contains(&box_position) {
        if k == 0 {
            return None;
        }
        let (from, to) = (trail[k], trail[k - 1]);
        let agent_direction = Direction::between(from, to)?;
        let box_direction = Direction::between(box_position, from)?;
        pulls.actions.push(Action::Pull(agent_direction, box_direction));
        pulls.locations.push(to);
        box_position = from;
        k -= 1;
    }

    approach.append(pulls);
    Some((approach, box_position))
}
