use tracing::{info, warn};

use crate::infra::{Action, Position};
use crate::state::{AgentId, Goal, WorldState};

/// Trait for observing planning and execution events
pub trait PlanObserver {
    /// Called once the level has been parsed
    fn on_level_loaded(&mut self, name: &str, state: &WorldState);

    /// Called when the orchestrator picks up a goal
    fn on_goal_selected(&mut self, goal: &Goal, agent: Option<AgentId>);

    /// Called when a goal's sub-plan has been committed
    fn on_goal_solved(&mut self, goal: &Goal, agent: AgentId, steps: usize);

    /// Called when a goal is dropped without a plan
    fn on_goal_skipped(&mut self, goal: &Goal, reason: &str);

    /// Called when a blocking box was cleared by another agent
    fn on_deadlock_resolved(&mut self, locked: AgentId, mover: AgentId, position: Position) {
        let _ = (locked, mover, position);
    }

    /// Called with the number of conflicts found in the combined schedule
    fn on_conflicts_detected(&mut self, count: usize);

    /// Called with the final joint plan
    fn on_plan_ready(&mut self, plan: &[Vec<Action>]);

    /// Called after every joint action sent to the server
    fn on_action_sent(&mut self, step: usize, line: &str, response: &str) {
        let _ = (step, line, response);
    }

    /// Called when the run ends
    fn on_finished(&mut self, solved: bool, steps: usize);
}

pub struct DefaultObserver;

impl PlanObserver for DefaultObserver {
    fn on_level_loaded(&mut self, name: &str, state: &WorldState) {
        info!("Level {} loaded", name);
        info!("- size: {}x{}", state.level().rows(), state.level().cols());
        info!("- agents: {}", state.agents().len());
        info!("- boxes: {}", state.boxes().count());
        info!("- goals: {}", state.goals().len());
    }

    fn on_goal_selected(&mut self, goal: &Goal, agent: Option<AgentId>) {
        match agent {
            Some(agent) => info!("Solving goal {} at {} with agent {}", goal.symbol(), goal.pos, agent),
            None => info!("Solving goal {} at {}", goal.symbol(), goal.pos),
        }
    }

    fn on_goal_solved(&mut self, goal: &Goal, agent: AgentId, steps: usize) {
        info!("Goal {} solved by agent {} in {} steps", goal.symbol(), agent, steps);
    }

    fn on_goal_skipped(&mut self, goal: &Goal, reason: &str) {
        warn!("Skipping goal {} at {}: {}", goal.symbol(), goal.pos, reason);
    }

    fn on_deadlock_resolved(&mut self, locked: AgentId, mover: AgentId, position: Position) {
        info!("Deadlock solved: agent {} cleared {} for agent {}", mover, position, locked);
    }

    fn on_conflicts_detected(&mut self, count: usize) {
        info!("Found {} conflicts", count);
    }

    fn on_plan_ready(&mut self, plan: &[Vec<Action>]) {
        info!("Found solution of length {}.", plan.len());
    }

    fn on_finished(&mut self, solved: bool, steps: usize) {
        if solved {
            info!("Level finished after {} joint actions", steps);
        } else {
            warn!("Unable to solve level.");
        }
    }
}
