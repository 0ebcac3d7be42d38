pub mod client;
pub mod config;
pub mod infra;
pub mod planners;
pub mod state;

// Re-export commonly used types for convenience
pub use client::Client;
pub use config::{PlannerConfig, Strategy};
pub use infra::{Action, DefaultObserver, PlanError, PlanObserver, Position};
pub use planners::sequential::SequentialPlanner;
pub use state::{WorldState, parse_level};
