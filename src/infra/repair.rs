//! Local rewrites of a single agent's path that remove one conflict:
//! waiting, stepping aside, and backing off along the path already walked.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::infra::{Action, AgentPath, Conflict, ConflictKind, Position, Schedule};
use crate::state::{AgentId, WorldState};

/// What a backtrack keeps stepping away from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Follow {
    /// The leader is walking onto the target's own cells.
    Agent,
    /// The leader is walking onto the cells the target's box went through.
    Box,
}

/// A sidestep that does not come back: the agent leaves through `cell` and
/// walks around the leader's parked cell to rejoin its path after step
/// `resume`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Bypass {
    cell: Position,
    walk: Vec<Position>,
    resume: usize,
}

/// Where a path ends and from which step on it stays there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Parked {
    cell: Position,
    since: usize,
}

impl Parked {
    fn of(path: &AgentPath, start: Position) -> Self {
        let cell = path.end_location(start);
        let since = path
            .locations
            .iter()
            .rposition(|pos| *pos != cell)
            .map_or(0, |t| t + 1);
        Self { cell, since }
    }
}

/// Applies repairs against the level's initial layout.
pub struct Repairer<'a> {
    initial: &'a WorldState,
}

impl<'a> Repairer<'a> {
    pub fn new(initial: &'a WorldState) -> Self {
        Self { initial }
    }

    fn initial_location(&self, agent: AgentId) -> Option<Position> {
        self.initial
            .level()
            .initial_location(agent)
            .or_else(|| self.initial.agent(agent).map(|a| a.pos))
    }

    /// Rewrites one path of `schedule` so that `conflict`, as `leader` sees
    /// it, goes away with `target` yielding. Box conflicts make the box mover
    /// wait, which may be the leader. Returns the agent whose path changed.
    pub fn repair(
        &self,
        schedule: &mut Schedule,
        target: AgentId,
        leader: AgentId,
        conflict: &Conflict,
    ) -> AgentId {
        let (target, leader, delay) = match conflict.kind {
            ConflictKind::TwoBoxesSameLocation => (target, leader, 3),
            ConflictKind::BoxThroughAgent => (leader, target, 2),
            ConflictKind::FirstBoxThroughSecondAgentPrev => (leader, target, 1),
            ConflictKind::SecondBoxThroughFirstAgentPrev => (target, leader, 1),
            _ => (target, leader, 0),
        };
        let (Some(target_start), Some(leader_start)) =
            (self.initial_location(target), self.initial_location(leader))
        else {
            return target;
        };

        let index = conflict.index;
        let leader_path = schedule.get(&leader).cloned().unwrap_or_default();
        let path = schedule.entry(target).or_default();
        path.pad_to(index + 1, target_start);

        if delay > 0 {
            tracing::debug!("Agent {} will wait {} steps at index {}", target, delay, index);
            path.insert_wait(index, delay, target_start);
            return target;
        }

        let ghost = conflict.kind == ConflictKind::AgentThroughAgent;
        let cells = self.sidestep_cells(path, &leader_path, index, ghost, target_start, leader_start);
        let parked = Parked::of(&leader_path, leader_start);
        if let Some(bypass) = self.bypass(path, index, ghost, &cells, target_start, parked) {
            tracing::debug!(
                "Agent {} will step aside to {} and walk around agent {}",
                target,
                bypass.cell,
                leader
            );
            walk_around(path, index, ghost, &bypass, target_start);
        } else if let Some(cell) = cells.first() {
            tracing::debug!("Agent {} will sidestep to {}", target, cell);
            sidestep(path, index, ghost, *cell, target_start);
        } else if conflict.kind == ConflictKind::AgentThroughBox {
            tracing::debug!("Agent {} will backtrack with boxes", target);
            backtrack(path, &leader_path, index, false, Follow::Box, target_start, leader_start);
        } else {
            tracing::debug!("Agent {} will backtrack", target);
            backtrack(path, &leader_path, index, ghost, Follow::Agent, target_start, leader_start);
        }
        target
    }

    /// Free neighbours of where the target stands before the conflict,
    /// excluding the conflict cell, the cell it came from and anything the
    /// leader ever walks on.
    fn sidestep_cells(
        &self,
        path: &AgentPath,
        leader: &AgentPath,
        index: usize,
        ghost: bool,
        target_start: Position,
        leader_start: Position,
    ) -> Vec<Position> {
        let start = detour_index(index, ghost);
        let here = path.previous_location(start, target_start);
        let came_from = match start {
            0 => target_start,
            _ => path.previous_location(start - 1, target_start),
        };
        let conflict_cell = leader.location_at(index, leader_start);
        let leader_cells: HashSet<Position> = leader.locations.iter().copied().collect();

        here.neighbors()
            .into_iter()
            .filter(|cell| *cell != conflict_cell && *cell != came_from)
            .filter(|cell| !leader_cells.contains(cell))
            .filter(|cell| self.initial.is_free(*cell))
            .collect()
    }

    /// Coming back from a sidestep is pointless when the leader parks for
    /// good on a cell the target would still cross afterwards. Looks for a
    /// side cell from which the target can walk around the parked leader to
    /// the first cell of its path past it.
    fn bypass(
        &self,
        path: &AgentPath,
        index: usize,
        ghost: bool,
        cells: &[Position],
        target_start: Position,
        parked: Parked,
    ) -> Option<Bypass> {
        let start = detour_index(index, ghost);
        let here = path.previous_location(start, target_start);
        let waits = sidestep_waits(ghost);

        // Last visit of the parked cell and when a plain sidestep gets there.
        let last = (start..path.len()).rev().find(|s| path.locations[*s] == parked.cell);
        let arrival = match last {
            Some(s) => s + waits + 2,
            None if here == parked.cell => start + waits + 1,
            None => return None,
        };
        if arrival < parked.since {
            return None;
        }

        let resume = last.map_or(start, |s| s + 1);
        let rejoin = *path.locations.get(resume)?;
        if path.actions[start..=resume].iter().any(|action| action.moves_box()) {
            return None;
        }

        cells.iter().find_map(|cell| {
            let walk = self.shortest_walk(*cell, rejoin, parked.cell)?;
            Some(Bypass {
                cell: *cell,
                walk,
                resume,
            })
        })
    }

    /// Breadth-first walk over the initial layout from `from` to `to` that
    /// never enters `avoid`. Returns the cells entered after `from`.
    fn shortest_walk(&self, from: Position, to: Position, avoid: Position) -> Option<Vec<Position>> {
        let level = self.initial.level();
        let passable = |pos: Position| {
            pos != avoid && !level.is_wall(pos) && self.initial.box_at(pos).is_none()
        };

        let mut came_from: HashMap<Position, Position> = HashMap::new();
        let mut queue = VecDeque::from([from]);
        while let Some(current) = queue.pop_front() {
            if current == to {
                let mut walk = Vec::new();
                let mut cell = current;
                while cell != from {
                    walk.push(cell);
                    cell = *came_from.get(&cell)?;
                }
                walk.reverse();
                return Some(walk);
            }
            for next in current.neighbors() {
                if next != from && passable(next) && !came_from.contains_key(&next) {
                    came_from.insert(next, current);
                    queue.push_back(next);
                }
            }
        }
        None
    }
}

/// Agent-through-agent conflicts are already committed one step earlier.
fn detour_index(index: usize, ghost: bool) -> usize {
    if ghost { index.saturating_sub(1) } else { index }
}

fn sidestep_waits(ghost: bool) -> usize {
    if ghost { 3 } else { 2 }
}

/// Step into `cell`, wait there, and come back before resuming.
fn sidestep(path: &mut AgentPath, index: usize, ghost: bool, cell: Position, start: Position) {
    let index = detour_index(index, ghost);
    let here = path.previous_location(index, start);
    let waits = sidestep_waits(ghost);

    let mut detour = AgentPath::new(vec![Action::move_between(here, cell)], vec![cell]);
    detour.append(AgentPath::waiting(cell, waits));
    detour.append(AgentPath::new(vec![Action::move_between(cell, here)], vec![here]));
    path.splice(index, index, detour);
}

/// Step into the bypass cell, wait there, then walk around to the rest of
/// the path, dropping the steps the walk replaces.
fn walk_around(path: &mut AgentPath, index: usize, ghost: bool, bypass: &Bypass, start: Position) {
    let index = detour_index(index, ghost);
    let here = path.previous_location(index, start);

    let mut detour = AgentPath::new(vec![Action::move_between(here, bypass.cell)], vec![bypass.cell]);
    detour.append(AgentPath::waiting(bypass.cell, sidestep_waits(ghost)));
    let mut at = bypass.cell;
    for next in &bypass.walk {
        detour.append(AgentPath::new(vec![Action::move_between(at, *next)], vec![*next]));
        at = *next;
    }
    path.splice(index, bypass.resume + 1, detour);
}

/// Undo already executed steps for as long as the leader keeps arriving on
/// the tracked cell, wait, then replay the undone steps.
fn backtrack(
    path: &mut AgentPath,
    leader: &AgentPath,
    index: usize,
    ghost: bool,
    follow: Follow,
    start: Position,
    leader_start: Position,
) {
    let from = detour_index(index, ghost);
    let tracked = |step: usize| match follow {
        Follow::Agent => Some(path.location_at(step, start)),
        Follow::Box => path.box_target_at(step),
    };

    let mut up = index;
    let mut down = from;
    let mut retreat = AgentPath::default();
    while down > 0 && tracked(down) == Some(leader.location_at(up, leader_start)) {
        up += 1;
        down -= 1;
        retreat.actions.push(path.action_at(down).reversed());
        retreat.locations.push(path.previous_location(down, start));
    }

    let waits = if down == 0 { 2 } else { 1 };
    let rest = retreat
        .locations
        .last()
        .copied()
        .unwrap_or_else(|| path.previous_location(from, start));
    retreat.append(AgentPath::waiting(rest, waits));
    retreat.append(AgentPath::new(
        path.actions[down..from].to_vec(),
        path.locations[down..from].to_vec(),
    ));
    path.splice(from, from, retreat);
}
