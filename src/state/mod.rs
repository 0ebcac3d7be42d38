mod entities;
mod level;
mod parser;
mod world_state;

pub use entities::{Agent, AgentId, BoxEntity, BoxId, Goal, GoalId, GoalKind, agent_symbol};
pub use level::Level;
pub use parser::parse_level;
pub use world_state::{Marks, WorldState};
