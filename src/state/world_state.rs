use std::cell::OnceCell;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::infra::{Action, ActionKind, Color, Position};
use crate::state::{Agent, AgentId, BoxEntity, BoxId, Goal, GoalKind, Level};

/// Goal cells already claimed by a committed sub-solution, keyed to the
/// absolute timestep from which they stay occupied.
pub type Marks = HashMap<Position, usize>;

/// A snapshot of every dynamic entity plus the link back to the state it was
/// generated from.
///
/// The level, the box board and the marks are shared between parent and
/// children and only copied when a transition actually changes them.
#[derive(Clone)]
pub struct WorldState {
    level: Rc<Level>,
    agents: Vec<Agent>,
    board: Rc<Vec<Option<BoxId>>>,
    boxes: BTreeMap<BoxId, BoxEntity>,
    goals: Rc<Vec<Goal>>,
    marks: Rc<Marks>,
    g: usize,
    parent: Option<Rc<WorldState>>,
    joint_action: Option<Vec<Action>>,
    hash: OnceCell<u64>,
}

impl WorldState {
    /// Root state with every goal of the level.
    pub fn new(level: Rc<Level>, agents: Vec<Agent>, boxes: Vec<BoxEntity>) -> Self {
        let goals = level.goals().to_vec();
        Self::from_parts(level, agents, boxes, goals, Rc::new(Marks::new()), 0)
    }

    /// Builds a root state from explicit entities. Agents are kept in id
    /// order so that their slot in a joint action is deterministic.
    pub(crate) fn from_parts(
        level: Rc<Level>,
        mut agents: Vec<Agent>,
        boxes: Vec<BoxEntity>,
        goals: Vec<Goal>,
        marks: Rc<Marks>,
        g: usize,
    ) -> Self {
        agents.sort_by_key(|agent| agent.id);
        let mut board = vec![None; level.rows() * level.cols()];
        let mut box_map = BTreeMap::new();
        for entity in boxes {
            if let Some(idx) = level.index(entity.pos) {
                board[idx] = Some(entity.id);
            }
            box_map.insert(entity.id, entity);
        }
        Self {
            level,
            agents,
            board: Rc::new(board),
            boxes: box_map,
            goals: Rc::new(goals),
            marks,
            g,
            parent: None,
            joint_action: None,
            hash: OnceCell::new(),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn level(&self) -> &Rc<Level> {
        &self.level
    }

    pub fn g(&self) -> usize {
        self.g
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.iter().find(|agent| agent.id == id)
    }

    pub fn agent_at(&self, pos: Position) -> Option<&Agent> {
        self.agents.iter().find(|agent| agent.pos == pos)
    }

    pub fn boxes(&self) -> impl Iterator<Item = &BoxEntity> {
        self.boxes.values()
    }

    pub fn box_by_id(&self, id: BoxId) -> Option<&BoxEntity> {
        self.boxes.get(&id)
    }

    pub fn box_at(&self, pos: Position) -> Option<&BoxEntity> {
        let idx = self.level.index(pos)?;
        self.board[idx].and_then(|id| self.boxes.get(&id))
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn goal(&self, id: usize) -> Option<&Goal> {
        self.goals.iter().find(|goal| goal.id == id)
    }

    pub fn marks(&self) -> &Rc<Marks> {
        &self.marks
    }

    pub fn joint_action(&self) -> Option<&[Action]> {
        self.joint_action.as_deref()
    }

    // ========================================================================
    // Legality
    // ========================================================================

    /// A cell is free when it is inside the grid, holds no wall, box or
    /// agent, and any goal mark on it lies strictly in the future.
    pub fn is_free(&self, pos: Position) -> bool {
        if self.level.is_wall(pos) || self.box_at(pos).is_some() || self.agent_at(pos).is_some() {
            return false;
        }
        self.marks.get(&pos).is_none_or(|&locked_from| self.g < locked_from)
    }

    /// Whether the agent in joint-action slot `slot` may perform `action`.
    pub fn is_applicable(&self, slot: usize, action: Action) -> bool {
        let Some(agent) = self.agents.get(slot) else {
            return false;
        };
        let destination = action.agent_destination(agent.pos);
        match action.kind() {
            ActionKind::NoOp => true,
            ActionKind::Move => self.is_free(destination),
            ActionKind::Push => {
                self.movable_box(agent.color, action.box_source(agent.pos))
                    && action
                        .box_destination(destination)
                        .is_some_and(|target| self.is_free(target))
            }
            ActionKind::Pull => {
                self.is_free(destination)
                    && self.movable_box(agent.color, action.box_source(agent.pos))
            }
        }
    }

    fn movable_box(&self, color: Color, pos: Option<Position>) -> bool {
        pos.and_then(|pos| self.box_at(pos))
            .is_some_and(|entity| entity.color == color)
    }

    /// Two agents claiming the same cell, or the same box, in one step.
    fn is_conflicting(&self, joint_action: &[Action]) -> bool {
        let mut claimed = HashSet::new();
        let mut moved_boxes = HashSet::new();
        for (agent, action) in self.agents.iter().zip(joint_action) {
            if *action == Action::NoOp {
                continue;
            }
            let destination = action.agent_destination(agent.pos);
            if !claimed.insert(destination) {
                return true;
            }
            if let Some(target) = action.box_destination(destination) {
                if !claimed.insert(target) {
                    return true;
                }
            }
            if let Some(source) = action.box_source(agent.pos) {
                if !moved_boxes.insert(source) {
                    return true;
                }
            }
        }
        false
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Applies one action per agent. The caller guarantees that the joint
    /// action is applicable and conflict free.
    pub fn result(self: &Rc<Self>, joint_action: &[Action]) -> WorldState {
        let mut next = WorldState {
            level: Rc::clone(&self.level),
            agents: self.agents.clone(),
            board: Rc::clone(&self.board),
            boxes: self.boxes.clone(),
            goals: Rc::clone(&self.goals),
            marks: Rc::clone(&self.marks),
            g: self.g + 1,
            parent: Some(Rc::clone(self)),
            joint_action: Some(joint_action.to_vec()),
            hash: OnceCell::new(),
        };

        for (slot, action) in joint_action.iter().enumerate() {
            let Some(before) = next.agents.get(slot).map(|agent| agent.pos) else {
                continue;
            };
            let after = action.agent_destination(before);
            let moved = action
                .box_source(before)
                .and_then(|source| next.box_at(source).map(|entity| entity.id));
            if let (Some(id), Some(target)) = (moved, action.box_destination(after)) {
                next.place_box(id, target);
            }
            next.agents[slot].pos = after;
        }
        next
    }

    /// Every conflict-free successor, in a shuffled order drawn from `rng`.
    pub fn expand<R: Rng + ?Sized>(self: &Rc<Self>, rng: &mut R) -> Vec<WorldState> {
        let applicable: Vec<Vec<Action>> = (0..self.agents.len())
            .map(|slot| {
                Action::ALL
                    .into_iter()
                    .filter(|action| self.is_applicable(slot, *action))
                    .collect()
            })
            .collect();

        let mut children = Vec::new();
        let mut indices = vec![0usize; applicable.len()];
        let mut joint_action = vec![Action::NoOp; applicable.len()];
        loop {
            for (slot, choices) in applicable.iter().enumerate() {
                joint_action[slot] = choices[indices[slot]];
            }
            if !self.is_conflicting(&joint_action) {
                children.push(self.result(&joint_action));
            }

            // Odometer over the per-agent choices.
            let mut done = true;
            for slot in 0..indices.len() {
                if indices[slot] + 1 < applicable[slot].len() {
                    indices[slot] += 1;
                    done = false;
                    break;
                }
                indices[slot] = 0;
            }
            if done {
                break;
            }
        }

        children.shuffle(rng);
        children
    }

    // ========================================================================
    // Goals
    // ========================================================================

    pub fn is_satisfied(&self, goal: &Goal) -> bool {
        match goal.kind {
            GoalKind::Agent(id) => self.agent(id).is_some_and(|agent| agent.pos == goal.pos),
            GoalKind::Box(letter) => self
                .box_at(goal.pos)
                .is_some_and(|entity| entity.letter == letter),
        }
    }

    pub fn is_goal_state(&self) -> bool {
        self.goals.iter().all(|goal| self.is_satisfied(goal))
    }

    /// Reduced states carry exactly one goal; it decides the search.
    pub fn is_subgoal_state(&self) -> bool {
        self.goals.first().is_some_and(|goal| self.is_satisfied(goal))
    }

    // ========================================================================
    // Plan extraction
    // ========================================================================

    /// Joint actions from the root of this state's chain down to it.
    pub fn extract_plan(&self) -> Vec<Vec<Action>> {
        let mut plan = Vec::with_capacity(self.g);
        let mut state = self;
        while let (Some(joint_action), Some(parent)) = (&state.joint_action, &state.parent) {
            plan.push(joint_action.clone());
            state = parent;
        }
        plan.reverse();
        plan
    }

    /// Actions of the agent in slot 0 together with its position after each
    /// of them.
    pub fn extract_plan_with_locations(&self) -> (Vec<Action>, Vec<Position>) {
        let mut actions = Vec::with_capacity(self.g);
        let mut locations = Vec::with_capacity(self.g);
        let mut state = self;
        while let (Some(joint_action), Some(parent)) = (&state.joint_action, &state.parent) {
            actions.push(joint_action.first().copied().unwrap_or(Action::NoOp));
            if let Some(agent) = state.agents.first() {
                locations.push(agent.pos);
            }
            state = parent;
        }
        actions.reverse();
        locations.reverse();
        (actions, locations)
    }

    // ========================================================================
    // In-place edits of a master state
    // ========================================================================

    pub(crate) fn move_agent(&mut self, id: AgentId, pos: Position) {
        if let Some(agent) = self.agents.iter_mut().find(|agent| agent.id == id) {
            agent.pos = pos;
            self.hash = OnceCell::new();
        }
    }

    pub(crate) fn move_box(&mut self, id: BoxId, pos: Position) {
        if self.boxes.contains_key(&id) {
            self.place_box(id, pos);
            self.hash = OnceCell::new();
        }
    }

    pub(crate) fn remove_box(&mut self, id: BoxId) -> Option<BoxEntity> {
        let entity = self.boxes.remove(&id)?;
        if let Some(idx) = self.level.index(entity.pos) {
            let board = Rc::make_mut(&mut self.board);
            if board[idx] == Some(id) {
                board[idx] = None;
            }
        }
        self.hash = OnceCell::new();
        Some(entity)
    }

    /// Detached copy of this state as seen at timestep `g`, so that marks are
    /// judged against that moment.
    pub(crate) fn at_time(&self, g: usize) -> WorldState {
        let mut state = self.clone();
        state.g = g;
        state.parent = None;
        state.joint_action = None;
        state
    }

    /// Locks `pos` from timestep `from` on.
    pub(crate) fn mark(&mut self, pos: Position, from: usize) {
        Rc::make_mut(&mut self.marks).insert(pos, from);
    }

    fn place_box(&mut self, id: BoxId, target: Position) {
        let Some(entity) = self.boxes.get_mut(&id) else {
            return;
        };
        let board = Rc::make_mut(&mut self.board);
        if let Some(idx) = self.level.index(entity.pos) {
            if board[idx] == Some(id) {
                board[idx] = None;
            }
        }
        if let Some(idx) = self.level.index(target) {
            board[idx] = Some(id);
        }
        entity.pos = target;
    }

    // ========================================================================
    // Identity
    // ========================================================================

    /// Boxes by cell, letter and color; ids are not part of a state's identity.
    fn box_signature(&self) -> Vec<(Position, char, Color)> {
        let mut signature: Vec<_> = self
            .boxes
            .values()
            .map(|entity| (entity.pos, entity.letter, entity.color))
            .collect();
        signature.sort_unstable();
        signature
    }

    fn fingerprint(&self) -> u64 {
        *self.hash.get_or_init(|| {
            let mut hasher = DefaultHasher::new();
            self.level.fingerprint().hash(&mut hasher);
            self.agents.hash(&mut hasher);
            self.box_signature().hash(&mut hasher);
            self.goals.hash(&mut hasher);
            hasher.finish()
        })
    }
}

impl PartialEq for WorldState {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint() == other.fingerprint()
            && self.agents == other.agents
            && self.goals == other.goals
            && self.box_signature() == other.box_signature()
            && (Rc::ptr_eq(&self.level, &other.level) || self.level == other.level)
    }
}

impl Eq for WorldState {}

impl Hash for WorldState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fingerprint().hash(state);
    }
}

impl Drop for WorldState {
    // Unlink long parent chains iteratively instead of recursively.
    fn drop(&mut self) {
        let mut parent = self.parent.take();
        while let Some(rc) = parent {
            match Rc::try_unwrap(rc) {
                Ok(mut state) => parent = state.parent.take(),
                Err(_) => break,
            }
        }
    }
}

impl fmt::Debug for WorldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorldState")
            .field("g", &self.g)
            .field("agents", &self.agents)
            .field("boxes", &self.boxes.values().collect::<Vec<_>>())
            .field("goals", &self.goals)
            .finish()
    }
}

impl fmt::Display for WorldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.level.rows() as i32 {
            for col in 0..self.level.cols() as i32 {
                let pos = Position::new(row, col);
                let symbol = if self.level.is_wall(pos) {
                    '+'
                } else if let Some(agent) = self.agent_at(pos) {
                    agent.symbol()
                } else if let Some(entity) = self.box_at(pos) {
                    entity.letter
                } else {
                    ' '
                };
                write!(f, "{symbol}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::Direction::{E, N, S, W};
    use crate::state::parse_level;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const TWO_AGENTS: &str = "\
#domain
hospital
#levelname
two
#colors
blue: 0, A
red: 1
#initial
++++++
+0 A +
+  1 +
++++++
#goal
++++++
+    +
+  A +
++++++
#end
";

    fn root() -> Rc<WorldState> {
        Rc::new(parse_level(TWO_AGENTS).unwrap())
    }

    fn hash_of(state: &WorldState) -> u64 {
        let mut hasher = DefaultHasher::new();
        state.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_is_free() {
        let state = root();
        assert!(state.is_free(Position::new(1, 2)));
        assert!(!state.is_free(Position::new(0, 0)), "wall");
        assert!(!state.is_free(Position::new(1, 3)), "box");
        assert!(!state.is_free(Position::new(2, 3)), "agent");
        assert!(!state.is_free(Position::new(9, 9)), "outside");
    }

    #[test]
    fn test_marked_cell_is_free_only_before_its_time() {
        let mut state = (*root()).clone();
        state.mark(Position::new(1, 2), 2);
        assert!(state.is_free(Position::new(1, 2)));
        let later = WorldState::from_parts(
            Rc::clone(state.level()),
            state.agents().to_vec(),
            state.boxes().copied().collect(),
            state.goals().to_vec(),
            Rc::clone(state.marks()),
            2,
        );
        assert!(!later.is_free(Position::new(1, 2)));
        assert!(!state.at_time(5).is_free(Position::new(1, 2)));
        assert_eq!(state.at_time(5).g(), 5);
    }

    #[test]
    fn test_applicability() {
        let state = root();
        // Agent 0 at (1,1), its box at (1,3).
        assert!(state.is_applicable(0, Action::Move(E)));
        assert!(!state.is_applicable(0, Action::Move(N)));
        assert!(!state.is_applicable(0, Action::Push(E, E)), "no box next to agent");
        // Agent 1 at (2,3) sits below the blue box but is red.
        assert!(!state.is_applicable(1, Action::Push(N, N)));
        assert!(!state.is_applicable(1, Action::Pull(S, N)));
    }

    #[test]
    fn test_push_and_pull_results() {
        let state = root();
        let step = Rc::new(state.result(&[Action::Move(E), Action::NoOp]));
        assert!(step.is_applicable(0, Action::Push(E, E)));
        let pushed = step.result(&[Action::Push(E, E), Action::NoOp]);
        assert_eq!(pushed.agent(0).map(|a| a.pos), Some(Position::new(1, 3)));
        assert_eq!(pushed.box_at(Position::new(1, 4)).map(|b| b.letter), Some('A'));
        assert!(pushed.box_at(Position::new(1, 3)).is_none());

        let pushed = Rc::new(pushed);
        let pulled = pushed.result(&[Action::Pull(W, W), Action::NoOp]);
        assert_eq!(pulled.agent(0).map(|a| a.pos), Some(Position::new(1, 2)));
        assert_eq!(pulled.box_at(Position::new(1, 3)).map(|b| b.letter), Some('A'));
        assert_eq!(pulled.g(), 3);
    }

    #[test]
    fn test_expand_never_shares_destinations() {
        let mut rng = StdRng::seed_from_u64(1);
        let state = root();
        let children = state.expand(&mut rng);
        assert!(!children.is_empty());
        for child in &children {
            let joint = child.joint_action().unwrap();
            let mut cells = HashSet::new();
            for (agent, action) in state.agents().iter().zip(joint) {
                if *action == Action::NoOp {
                    continue;
                }
                let destination = action.agent_destination(agent.pos);
                assert!(cells.insert(destination), "shared destination in {joint:?}");
                if let Some(target) = action.box_destination(destination) {
                    assert!(cells.insert(target), "shared box destination in {joint:?}");
                }
            }
        }
    }

    #[test]
    fn test_expand_is_reproducible_for_a_seed() {
        let state = root();
        let first: Vec<_> = state
            .expand(&mut StdRng::seed_from_u64(7))
            .iter()
            .map(|child| child.joint_action().unwrap().to_vec())
            .collect();
        let second: Vec<_> = state
            .expand(&mut StdRng::seed_from_u64(7))
            .iter()
            .map(|child| child.joint_action().unwrap().to_vec())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_equal_states_hash_equal() {
        let state = root();
        let a = state.result(&[Action::Move(E), Action::NoOp]);
        let b = state.result(&[Action::Move(E), Action::NoOp]);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));

        let c = state.result(&[Action::Move(S), Action::NoOp]);
        assert_ne!(a, c);
        assert_ne!(hash_of(&a), hash_of(&c));
    }

    #[test]
    fn test_box_ids_do_not_affect_identity() {
        let state = root();
        let mut renamed = (*state).clone();
        let entity = renamed.remove_box(0).unwrap();
        let mut boxes: Vec<BoxEntity> = renamed.boxes().copied().collect();
        boxes.push(BoxEntity::new(42, entity.letter, entity.color, entity.pos));
        let renamed = WorldState::from_parts(
            Rc::clone(state.level()),
            state.agents().to_vec(),
            boxes,
            state.goals().to_vec(),
            Rc::clone(state.marks()),
            0,
        );
        assert_eq!(*state, renamed);
        assert_eq!(hash_of(&state), hash_of(&renamed));
    }

    #[test]
    fn test_plan_length_matches_g() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut state = root();
        for _ in 0..4 {
            let next = state.expand(&mut rng).into_iter().next().unwrap();
            state = Rc::new(next);
        }
        let (actions, locations) = state.extract_plan_with_locations();
        assert_eq!(actions.len(), state.g());
        assert_eq!(locations.len(), state.g());
        assert_eq!(state.extract_plan().len(), 4);
        assert_eq!(locations.last().copied(), state.agent(0).map(|a| a.pos));
    }

    #[test]
    fn test_goal_checks() {
        let state = root();
        assert!(!state.is_goal_state());
        let mut moved = (*state).clone();
        moved.move_box(0, Position::new(2, 3));
        moved.move_agent(1, Position::new(2, 1));
        assert!(moved.is_goal_state());
        assert!(moved.is_subgoal_state());
    }

    #[test]
    fn test_display_renders_grid() {
        let rendered = root().to_string();
        assert_eq!(rendered.lines().nth(1), Some("+0 A +"));
        assert_eq!(rendered.lines().nth(2), Some("+  1 +"));
    }
}
