use std::collections::HashSet;
use std::rc::Rc;
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::infra::{AgentPath, MemoryGuard, PlanError};
use crate::planners::search::Frontier;
use crate::state::WorldState;

const STATUS_INTERVAL: usize = 1000;

/// Graph search over reduced states. The frontier and the expansion rng
/// are reused across every subgoal of a run.
pub struct SubSearch {
    frontier: Box<dyn Frontier>,
    rng: StdRng,
    memory: MemoryGuard,
}

impl SubSearch {
    pub fn new(frontier: Box<dyn Frontier>, seed: u64, memory: MemoryGuard) -> Self {
        Self {
            frontier,
            rng: StdRng::seed_from_u64(seed),
            memory,
        }
    }

    pub fn frontier_name(&self) -> String {
        self.frontier.name()
    }

    /// Searches until the state's single goal is satisfied and returns the
    /// path of the agent in slot 0.
    pub fn solve(&mut self, initial: WorldState) -> Result<AgentPath, PlanError> {
        let start = Instant::now();
        let mut explored: HashSet<Rc<WorldState>> = HashSet::new();
        let mut iterations = 0usize;

        self.frontier.clear();
        self.frontier.add(Rc::new(initial));

        let result = loop {
            iterations += 1;
            if iterations % STATUS_INTERVAL == 0 {
                self.log_status(&explored, start);
                if let Some(used_mb) = self.memory.exceeded() {
                    break Err(PlanError::MemoryLimitExceeded {
                        used_mb,
                        max_mb: self.memory.max_mb(),
                    });
                }
            }

            let Some(state) = self.frontier.pop() else {
                break Err(PlanError::SearchExhausted);
            };

            if state.is_subgoal_state() {
                let (actions, locations) = state.extract_plan_with_locations();
                break Ok(AgentPath::new(actions, locations));
            }

            explored.insert(Rc::clone(&state));
            for child in state.expand(&mut self.rng) {
                if !self.frontier.contains(&child) && !explored.contains(&child) {
                    self.frontier.add(Rc::new(child));
                }
            }
        };

        self.log_status(&explored, start);
        self.frontier.clear();
        result
    }

    fn log_status(&self, explored: &HashSet<Rc<WorldState>>, start: Instant) {
        let expanded = explored.len();
        let frontier = self.frontier.size();
        tracing::debug!(
            "#Expanded: {:8}, #Frontier: {:8}, #Generated: {:8}, Time: {:.3} s, Memory: {:.2}/{:.2} MB",
            expanded,
            frontier,
            expanded + frontier,
            start.elapsed().as_secs_f64(),
            self.memory.usage_mb(),
            self.memory.max_mb()
        );
    }
}
