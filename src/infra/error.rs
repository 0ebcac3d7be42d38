use crate::infra::{Position, UnknownColor};
use crate::state::AgentId;

/// Failures of the planning pipeline. The binary maps all of them to
/// "level unsolved".
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanError {
    #[error("frontier exhausted without reaching the subgoal")]
    SearchExhausted,

    #[error("maximum memory usage exceeded ({used_mb:.2} MB > {max_mb:.2} MB)")]
    MemoryLimitExceeded { used_mb: f64, max_mb: f64 },

    #[error("agent {agent} is blocked by a box of its own color at {position}")]
    UnsupportedDeadlock { agent: AgentId, position: Position },

    #[error("box blocking agent {agent} at {position} cannot be cleared")]
    UnresolvableDeadlock { agent: AgentId, position: Position },

    #[error("conflicts still unresolved after expanding {expanded} conflict tree nodes")]
    UnresolvedConflicts { expanded: usize },

    #[error("no agent can move box '{letter}' at {position}")]
    NoAgentForBox { letter: char, position: Position },
}

impl PlanError {
    /// Errors after which continuing with other goals is pointless.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PlanError::MemoryLimitExceeded { .. } | PlanError::UnresolvedConflicts { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LevelError {
    #[error("missing section {0}")]
    MissingSection(&'static str),

    #[error("invalid color line '{0}'")]
    InvalidColorLine(String),

    #[error(transparent)]
    UnknownColor(#[from] UnknownColor),

    #[error("'{0}' has no color assigned")]
    Uncolored(char),

    #[error("unexpected symbol '{symbol}' at {position}")]
    InvalidSymbol { symbol: char, position: Position },

    #[error("goal grid is {goal_rows}x{goal_cols} but initial grid is {rows}x{cols}")]
    GridMismatch {
        rows: usize,
        cols: usize,
        goal_rows: usize,
        goal_cols: usize,
    },

    #[error("level has no agents")]
    NoAgents,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("I/O error talking to the server: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse level: {0}")]
    Level(#[from] LevelError),

    #[error("server closed the connection")]
    ServerClosed,
}
