mod frontier;
mod graph_search;
mod heuristic;

pub use frontier::{BestFirstFrontier, BfsFrontier, DfsFrontier, Frontier};
pub use graph_search::SubSearch;
pub use heuristic::{AStar, Greedy, Heuristic, WeightedAStar, manhattan};
