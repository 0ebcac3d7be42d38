use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::infra::{
    Conflict, ConflictMap, PlanError, Repairer, Schedule, conflict_count, detect_conflicts,
    first_conflict, mirrored_conflict,
};
use crate::state::{AgentId, WorldState};

// ============================================================================
// Conflict tree nodes
// ============================================================================

/// A full schedule together with the conflicts it still contains.
#[derive(Clone, Debug)]
struct CtNode {
    id: usize,
    parent: Option<usize>,
    children: Vec<usize>,
    target: Option<AgentId>,
    leader: Option<AgentId>,
    schedule: Schedule,
    conflicts: ConflictMap,
    cost: usize,
}

/// Heap handle; lower cost first, older node first among equals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Open {
    cost: usize,
    id: usize,
}

impl Ord for Open {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: lower (cost, id) has higher priority
        (other.cost, other.id).cmp(&(self.cost, self.id))
    }
}

impl PartialOrd for Open {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ============================================================================
// CBS
// ============================================================================

/// Best-first search over repaired schedules.
///
/// Each expansion picks the first conflict of the first conflicting pair and
/// branches on which of the two agents yields. Each branch is repaired from
/// the leader's view of the conflict. The search stops at the first
/// conflict-free child, so the result is not guaranteed to be the cheapest.
pub struct CBS<'a> {
    initial: &'a WorldState,
    max_nodes: usize,
    nodes: Vec<CtNode>,
}

impl<'a> CBS<'a> {
    pub fn new(initial: &'a WorldState, max_nodes: usize) -> Self {
        Self {
            initial,
            max_nodes,
            nodes: Vec::new(),
        }
    }

    pub fn run(&mut self, schedule: Schedule) -> Result<Schedule, PlanError> {
        self.nodes.clear();
        let conflicts = detect_conflicts(self.initial.level(), &schedule);
        tracing::debug!("CBS: Root has {} conflicts", conflict_count(&conflicts));
        self.nodes.push(CtNode {
            id: 0,
            parent: None,
            children: Vec::new(),
            target: None,
            leader: None,
            schedule,
            conflicts,
            cost: 0,
        });

        let mut open = BinaryHeap::new();
        open.push(Open { cost: 0, id: 0 });
        let mut nodes_expanded = 0;

        while let Some(Open { id, cost }) = open.pop() {
            if self.nodes[id].conflicts.is_empty() {
                tracing::info!("CBS: Solution found after expanding {} nodes", nodes_expanded);
                return Ok(self.take_schedule(id));
            }

            nodes_expanded += 1;
            if nodes_expanded > self.max_nodes {
                tracing::warn!("CBS: Timeout - expanded {} nodes", nodes_expanded - 1);
                return Err(PlanError::UnresolvedConflicts {
                    expanded: nodes_expanded - 1,
                });
            }

            let Some((first, second, conflict)) = first_conflict(&self.nodes[id].conflicts) else {
                continue;
            };
            tracing::debug!(
                "CBS: Expanding node {} (cost {}): {} between agents {} and {} at {} (index {})",
                id,
                cost,
                conflict.kind,
                first,
                second,
                conflict.location,
                conflict.index
            );

            let mirrored = mirrored_conflict(&self.nodes[id].conflicts, first, second)
                .unwrap_or(conflict);
            let left = self.child(id, second, first, &conflict);
            let right = self.child(id, first, second, &mirrored);

            let left_done = self.nodes[left].conflicts.is_empty();
            let right_done = self.nodes[right].conflicts.is_empty();
            let solved = match (left_done, right_done) {
                (true, true) if self.nodes[right].cost < self.nodes[left].cost => Some(right),
                (true, _) => Some(left),
                (false, true) => Some(right),
                (false, false) => None,
            };
            if let Some(solved) = solved {
                tracing::info!(
                    "CBS: Solution found after expanding {} nodes (cost {})",
                    nodes_expanded,
                    self.nodes[solved].cost
                );
                return Ok(self.take_schedule(solved));
            }

            for child in [left, right] {
                tracing::debug!(
                    "CBS: Pushed node {} with cost {} and {} conflicts",
                    child,
                    self.nodes[child].cost,
                    conflict_count(&self.nodes[child].conflicts)
                );
                open.push(Open {
                    cost: self.nodes[child].cost,
                    id: child,
                });
            }
        }

        tracing::warn!("CBS: No solution found after expanding {} nodes", nodes_expanded);
        Err(PlanError::UnresolvedConflicts {
            expanded: nodes_expanded,
        })
    }

    /// Repairs `conflict` in a copy of the parent's schedule with `target`
    /// yielding to `leader`, and stores the result as a new node.
    fn child(&mut self, parent: usize, target: AgentId, leader: AgentId, conflict: &Conflict) -> usize {
        let mut schedule = self.nodes[parent].schedule.clone();
        let repaired = Repairer::new(self.initial).repair(&mut schedule, target, leader, conflict);

        let before = self.nodes[parent]
            .schedule
            .get(&repaired)
            .map_or(0, |path| path.len());
        let after = schedule.get(&repaired).map_or(0, |path| path.len());
        let cost = self.nodes[parent].cost + after.saturating_sub(before);
        let conflicts = detect_conflicts(self.initial.level(), &schedule);

        let id = self.nodes.len();
        self.nodes.push(CtNode {
            id,
            parent: Some(parent),
            children: Vec::new(),
            target: Some(target),
            leader: Some(leader),
            schedule,
            conflicts,
            cost,
        });
        self.nodes[parent].children.push(id);
        id
    }

    fn take_schedule(&mut self, id: usize) -> Schedule {
        self.log_path(id);
        std::mem::take(&mut self.nodes[id].schedule)
    }

    /// Logs the chain of repairs that led from the root to `id`.
    fn log_path(&self, id: usize) {
        let mut current = Some(id);
        while let Some(node) = current.and_then(|id| self.nodes.get(id)) {
            tracing::debug!(
                "CBS: node {} (cost {}, {} children) target {:?} leader {:?}",
                node.id,
                node.cost,
                node.children.len(),
                node.target,
                node.leader
            );
            current = node.parent;
        }
    }

    pub fn nodes_created(&self) -> usize {
        self.nodes.len()
    }
}
