//! Goal-by-goal planning: every goal is solved as an isolated single-agent
//! sub-problem, the sub-plans are stitched per agent, and the resulting
//! schedule is cleaned up by the conflict tree before merging.

mod deadlock;
mod matcher;
mod merge;
mod reduce;

use std::collections::HashSet;

pub use deadlock::{Deadlock, Resolution, find_deadlock, resolve_deadlock};
pub use matcher::{Match, best_agent_for_box, load, match_goal};
pub use merge::merge;
pub use reduce::{commit, reduced_state};

use crate::config::PlannerConfig;
use crate::infra::{
    Action, AgentPath, CBS, PlanError, PlanObserver, Schedule, conflict_count, detect_conflicts,
};
use crate::planners::search::SubSearch;
use crate::state::{AgentId, Goal, GoalId, WorldState};

/// Goals with fewer open neighbours than this are tried later.
const MIN_OPEN_NEIGHBORS: usize = 3;

pub struct SequentialPlanner<'o, O: PlanObserver> {
    config: PlannerConfig,
    search: SubSearch,
    observer: &'o mut O,
}

impl<'o, O: PlanObserver> SequentialPlanner<'o, O> {
    pub fn new(config: PlannerConfig, observer: &'o mut O) -> Self {
        let search = SubSearch::new(config.frontier(), config.expansion_seed, config.memory_guard());
        Self {
            config,
            search,
            observer,
        }
    }

    /// Plans the whole level and returns one joint action per timestep,
    /// agents in id order.
    pub fn plan(&mut self, initial: &WorldState) -> Result<Vec<Vec<Action>>, PlanError> {
        tracing::info!("Starting {}.", self.search.frontier_name());
        let mut master = initial.clone();
        let mut schedule = Schedule::new();

        self.solve_goals(&mut master, &mut schedule)?;

        let goal_agents: Vec<AgentId> = schedule.keys().copied().collect();
        let longest = schedule.values().map(AgentPath::len).max().unwrap_or(0);
        for agent in master.agents() {
            schedule
                .entry(agent.id)
                .or_insert_with(|| AgentPath::waiting(agent.pos, longest));
        }

        let conflicts = detect_conflicts(initial.level(), &schedule);
        self.observer.on_conflicts_detected(conflict_count(&conflicts));
        let resolved = CBS::new(initial, self.config.max_ct_nodes).run(schedule)?;

        let length = goal_agents
            .iter()
            .filter_map(|agent| resolved.get(agent))
            .map(AgentPath::len)
            .max()
            .unwrap_or(0);
        let agents: Vec<AgentId> = initial.level().agent_ids().collect();
        let plan = merge(&resolved, &agents, length);
        self.observer.on_plan_ready(&plan);
        Ok(plan)
    }

    /// Works through the goals in level order. Goals without a matched box
    /// go to the back once, goals in cramped cells are retried once before
    /// those.
    fn solve_goals(&mut self, master: &mut WorldState, schedule: &mut Schedule) -> Result<(), PlanError> {
        let mut worklist: Vec<Goal> = master.goals().to_vec();
        let mut seen: HashSet<GoalId> = HashSet::new();
        let mut cursor = 0;

        while cursor < worklist.len() {
            let goal = worklist[cursor];
            cursor += 1;
            let found = match_goal(master, &goal, schedule);

            if found.entity.is_none() && !seen.contains(&goal.id) {
                tracing::debug!("Deferring goal {} at {}", goal.symbol(), goal.pos);
                seen.insert(goal.id);
                worklist.push(goal);
                continue;
            }

            if master.level().open_neighbor_count(goal.pos) < MIN_OPEN_NEIGHBORS
                && !seen.contains(&goal.id)
            {
                tracing::debug!("Goal {} at {} is cramped, retrying later", goal.symbol(), goal.pos);
                let at = worklist.len().saturating_sub(seen.len()).max(cursor);
                seen.insert(goal.id);
                worklist.insert(at, goal);
                continue;
            }

            self.solve_goal(master, schedule, found)?;
        }
        Ok(())
    }

    fn solve_goal(&mut self, master: &mut WorldState, schedule: &mut Schedule, found: Match) -> Result<(), PlanError> {
        let goal = found.goal;
        let Some(agent) = found.agent else {
            let reason = match found.entity {
                Some(entity) => PlanError::NoAgentForBox {
                    letter: entity.letter,
                    position: entity.pos,
                }
                .to_string(),
                None => "no entity left to satisfy it".to_string(),
            };
            self.observer.on_goal_skipped(&goal, &reason);
            return Ok(());
        };
        self.observer.on_goal_selected(&goal, Some(agent.id));

        let entity = found.entity.as_ref();
        let g = load(schedule, agent.id);
        let reduced = reduced_state(master, &agent, entity, &goal, g);
        if reduced.is_subgoal_state() {
            commit(master, &agent, entity, &goal, agent.pos, g);
            self.observer.on_goal_solved(&goal, agent.id, 0);
            return Ok(());
        }

        let path = match self.search.solve(reduced) {
            Ok(path) => path,
            Err(err) => return self.skip_or_abort(&goal, err),
        };
        let steps = path.len();
        let end = path.end_location(agent.pos);

        let deadlock = match find_deadlock(master, &agent, entity.map(|e| e.id), &path) {
            Ok(deadlock) => deadlock,
            Err(err) => return self.skip_or_abort(&goal, err),
        };
        match deadlock {
            Some(deadlock) => {
                match resolve_deadlock(master, schedule, &mut self.search, &agent, path, &deadlock) {
                    Ok(resolution) => self.observer.on_deadlock_resolved(
                        agent.id,
                        resolution.mover,
                        deadlock.blocker.pos,
                    ),
                    Err(err) => return self.skip_or_abort(&goal, err),
                }
            }
            None => schedule.entry(agent.id).or_default().append(path),
        }

        commit(master, &agent, entity, &goal, end, load(schedule, agent.id));
        self.observer.on_goal_solved(&goal, agent.id, steps);
        Ok(())
    }

    fn skip_or_abort(&mut self, goal: &Goal, err: PlanError) -> Result<(), PlanError> {
        if err.is_fatal() {
            tracing::warn!("Aborting at goal {}: {}", goal.symbol(), err);
            return Err(err);
        }
        self.observer.on_goal_skipped(goal, &err.to_string());
        Ok(())
    }
}
