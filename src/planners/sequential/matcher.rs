use crate::infra::Schedule;
use crate::state::{Agent, AgentId, BoxEntity, Goal, GoalKind, WorldState};

/// A goal paired with the entities chosen to satisfy it.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub goal: Goal,
    /// Box to deliver; always `None` for agent goals.
    pub entity: Option<BoxEntity>,
    pub agent: Option<Agent>,
}

/// Steps already committed for `agent`.
pub fn load(schedule: &Schedule, agent: AgentId) -> usize {
    schedule.get(&agent).map_or(0, |path| path.len())
}

/// Distance to `target` plus the agent's committed plan length, so busy
/// agents lose against idle ones. The first agent wins ties.
fn cheapest_agent<'a>(
    agents: impl Iterator<Item = &'a Agent>,
    target: &BoxEntity,
    schedule: &Schedule,
) -> Option<Agent> {
    agents
        .filter(|agent| agent.color == target.color)
        .min_by_key(|agent| agent.pos.distance(&target.pos) as usize + load(schedule, agent.id))
        .copied()
}

pub fn best_agent_for_box(master: &WorldState, entity: &BoxEntity, schedule: &Schedule) -> Option<Agent> {
    cheapest_agent(master.agents().iter(), entity, schedule)
}

pub fn match_goal(master: &WorldState, goal: &Goal, schedule: &Schedule) -> Match {
    match goal.kind {
        GoalKind::Agent(id) => Match {
            goal: *goal,
            entity: None,
            agent: master.agent(id).copied(),
        },
        GoalKind::Box(letter) => {
            let entity = master
                .boxes()
                .filter(|entity| entity.letter == letter)
                .min_by_key(|entity| entity.pos.distance(&goal.pos))
                .copied();
            let agent = entity.and_then(|entity| best_agent_for_box(master, &entity, schedule));
            Match {
                goal: *goal,
                entity,
                agent,
            }
        }
    }
}
