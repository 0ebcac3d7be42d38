use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet, VecDeque};
use std::rc::Rc;

use crate::planners::search::Heuristic;
use crate::state::WorldState;

/// Open set of a graph search.
pub trait Frontier {
    fn add(&mut self, state: Rc<WorldState>);
    fn pop(&mut self) -> Option<Rc<WorldState>>;
    fn is_empty(&self) -> bool;
    fn size(&self) -> usize;
    fn contains(&self, state: &WorldState) -> bool;
    fn clear(&mut self);
    fn name(&self) -> String;
}

// ============================================================================
// FIFO / LIFO
// ============================================================================

#[derive(Default)]
pub struct BfsFrontier {
    queue: VecDeque<Rc<WorldState>>,
    set: HashSet<Rc<WorldState>>,
}

impl BfsFrontier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Frontier for BfsFrontier {
    fn add(&mut self, state: Rc<WorldState>) {
        self.set.insert(Rc::clone(&state));
        self.queue.push_back(state);
    }

    fn pop(&mut self) -> Option<Rc<WorldState>> {
        let state = self.queue.pop_front()?;
        self.set.remove(&*state);
        Some(state)
    }

    fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn size(&self) -> usize {
        self.queue.len()
    }

    fn contains(&self, state: &WorldState) -> bool {
        self.set.contains(state)
    }

    fn clear(&mut self) {
        self.queue.clear();
        self.set.clear();
    }

    fn name(&self) -> String {
        "breadth-first search".to_string()
    }
}

#[derive(Default)]
pub struct DfsFrontier {
    stack: Vec<Rc<WorldState>>,
    set: HashSet<Rc<WorldState>>,
}

impl DfsFrontier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Frontier for DfsFrontier {
    fn add(&mut self, state: Rc<WorldState>) {
        self.set.insert(Rc::clone(&state));
        self.stack.push(state);
    }

    fn pop(&mut self) -> Option<Rc<WorldState>> {
        let state = self.stack.pop()?;
        self.set.remove(&*state);
        Some(state)
    }

    fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    fn size(&self) -> usize {
        self.stack.len()
    }

    fn contains(&self, state: &WorldState) -> bool {
        self.set.contains(state)
    }

    fn clear(&mut self) {
        self.stack.clear();
        self.set.clear();
    }

    fn name(&self) -> String {
        "depth-first search".to_string()
    }
}

// ============================================================================
// Best-first
// ============================================================================

struct Entry {
    priority: usize,
    sequence: u64,
    state: Rc<WorldState>,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on (priority, insertion order)
        (other.priority, other.sequence).cmp(&(self.priority, self.sequence))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        (self.priority, self.sequence) == (other.priority, other.sequence)
    }
}

impl Eq for Entry {}

/// Pops the state with the lowest `f`, oldest first among equals.
pub struct BestFirstFrontier<H: Heuristic> {
    heuristic: H,
    heap: BinaryHeap<Entry>,
    set: HashSet<Rc<WorldState>>,
    sequence: u64,
}

impl<H: Heuristic> BestFirstFrontier<H> {
    pub fn new(heuristic: H) -> Self {
        Self {
            heuristic,
            heap: BinaryHeap::new(),
            set: HashSet::new(),
            sequence: 0,
        }
    }
}

impl<H: Heuristic> Frontier for BestFirstFrontier<H> {
    fn add(&mut self, state: Rc<WorldState>) {
        let priority = self.heuristic.f(&state);
        self.sequence += 1;
        self.set.insert(Rc::clone(&state));
        self.heap.push(Entry {
            priority,
            sequence: self.sequence,
            state,
        });
    }

    fn pop(&mut self) -> Option<Rc<WorldState>> {
        let Entry { state, .. } = self.heap.pop()?;
        self.set.remove(&*state);
        Some(state)
    }

    fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    fn size(&self) -> usize {
        self.heap.len()
    }

    fn contains(&self, state: &WorldState) -> bool {
        self.set.contains(state)
    }

    fn clear(&mut self) {
        self.heap.clear();
        self.set.clear();
        self.sequence = 0;
    }

    fn name(&self) -> String {
        format!("best-first search using {}", self.heuristic.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{Action, Direction};
    use crate::planners::search::{AStar, Greedy};
    use crate::state::parse_level;

    const LEVEL: &str = "\
#domain
hospital
#levelname
f
#colors
blue: 0
#initial
++++++
+0   +
++++++
#goal
++++++
+   0+
++++++
#end
";

    fn states() -> (Rc<WorldState>, Rc<WorldState>, Rc<WorldState>) {
        let root = Rc::new(parse_level(LEVEL).unwrap());
        let east = Rc::new(root.result(&[Action::Move(Direction::E)]));
        let noop = Rc::new(root.result(&[Action::NoOp]));
        (root, east, noop)
    }

    #[test]
    fn test_bfs_is_fifo_and_dfs_is_lifo() {
        let (root, east, _) = states();
        let mut bfs = BfsFrontier::new();
        let mut dfs = DfsFrontier::new();
        for frontier in [&mut bfs as &mut dyn Frontier, &mut dfs] {
            frontier.add(Rc::clone(&root));
            frontier.add(Rc::clone(&east));
            assert_eq!(frontier.size(), 2);
            assert!(frontier.contains(&east));
        }
        assert_eq!(bfs.pop().map(|s| s.g()), Some(0));
        assert_eq!(dfs.pop().map(|s| s.g()), Some(1));
        assert!(!dfs.contains(&east));
        dfs.clear();
        assert!(dfs.is_empty());
    }

    #[test]
    fn test_best_first_orders_by_f() {
        let (root, east, _) = states();
        let mut frontier = BestFirstFrontier::new(Greedy);
        frontier.add(Rc::clone(&root));
        frontier.add(Rc::clone(&east));
        // east is one step closer to the goal
        assert_eq!(frontier.pop().map(|s| s.g()), Some(1));
        assert_eq!(frontier.pop().map(|s| s.g()), Some(0));
        assert!(frontier.pop().is_none());
    }

    #[test]
    fn test_best_first_ties_pop_oldest_first() {
        let (root, east, noop) = states();
        // f(root) = 0 + 3, f(east) = 1 + 2, f(noop) = 1 + 3
        let mut frontier = BestFirstFrontier::new(AStar);
        frontier.add(Rc::clone(&east));
        frontier.add(Rc::clone(&root));
        frontier.add(noop);
        assert_eq!(frontier.pop().map(|s| s.agents()[0].pos), Some(east.agents()[0].pos));
        assert_eq!(frontier.pop().map(|s| s.g()), Some(0));
        assert_eq!(frontier.pop().map(|s| s.g()), Some(1));
    }
}
