use std::fmt;

use crate::infra::MemoryGuard;
use crate::planners::search::{
    AStar, BestFirstFrontier, BfsFrontier, DfsFrontier, Frontier, Greedy, WeightedAStar,
};

/// Frontier used by every sub-search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Strategy {
    Bfs,
    Dfs,
    #[default]
    Astar,
    Wastar,
    Greedy,
}

impl Strategy {
    pub fn frontier(self, weight: usize) -> Box<dyn Frontier> {
        match self {
            Strategy::Bfs => Box::new(BfsFrontier::new()),
            Strategy::Dfs => Box::new(DfsFrontier::new()),
            Strategy::Astar => Box::new(BestFirstFrontier::new(AStar)),
            Strategy::Wastar => Box::new(BestFirstFrontier::new(WeightedAStar { weight })),
            Strategy::Greedy => Box::new(BestFirstFrontier::new(Greedy)),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Bfs => "bfs",
            Strategy::Dfs => "dfs",
            Strategy::Astar => "astar",
            Strategy::Wastar => "wastar",
            Strategy::Greedy => "greedy",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannerConfig {
    /// Soft ceiling checked by sub-searches, in MB.
    pub max_memory_mb: f64,
    pub strategy: Strategy,
    /// Weight of the weighted A* heuristic.
    pub weight: usize,
    /// Seeds the successor shuffle so runs are reproducible.
    pub expansion_seed: u64,
    /// Conflict tree nodes expanded before giving up.
    pub max_ct_nodes: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_memory_mb: 2048.0,
            strategy: Strategy::default(),
            weight: 5,
            expansion_seed: 1,
            max_ct_nodes: 1000,
        }
    }
}

impl PlannerConfig {
    pub fn memory_guard(&self) -> MemoryGuard {
        MemoryGuard::new(self.max_memory_mb)
    }

    pub fn frontier(&self) -> Box<dyn Frontier> {
        self.strategy.frontier(self.weight)
    }
}
