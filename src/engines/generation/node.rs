use crate::types::{Arity, FunctionalFn, NodeId, TerminalFn};
use std::fmt;
use std::sync::Arc;

/// What a node computes from. A node never changes kind after construction.
pub enum NodeKind<I> {
    Terminal {
        evaluator: TerminalFn<I>,
    },
    Functional {
        evaluator: FunctionalFn,
        arity: Arity,
        children: Vec<Node<I>>,
    },
}

/// Id-addressed expression tree vertex.
///
/// Children are owned exclusively by their parent. All surgery is done by
/// id: a subtree moves between trees only by being cloned (which hands out
/// fresh ids) and attached, never by sharing.
pub struct Node<I> {
    id: NodeId,
    name: Arc<str>,
    kind: NodeKind<I>,
}

impl<I> Node<I> {
    pub fn new_terminal(name: impl Into<Arc<str>>, evaluator: TerminalFn<I>) -> Self {
        Self {
            id: NodeId::fresh(),
            name: name.into(),
            kind: NodeKind::Terminal { evaluator },
        }
    }

    pub fn new_functional(name: impl Into<Arc<str>>, arity: Arity, evaluator: FunctionalFn) -> Self {
        Self {
            id: NodeId::fresh(),
            name: name.into(),
            kind: NodeKind::Functional {
                evaluator,
                arity,
                children: Vec::new(),
            },
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &NodeKind<I> {
        &self.kind
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, NodeKind::Terminal { .. })
    }

    /// Arity bounds, `None` for terminals.
    pub fn arity(&self) -> Option<Arity> {
        match &self.kind {
            NodeKind::Functional { arity, .. } => Some(*arity),
            NodeKind::Terminal { .. } => None,
        }
    }

    pub fn children(&self) -> &[Node<I>] {
        match &self.kind {
            NodeKind::Functional { children, .. } => children,
            NodeKind::Terminal { .. } => &[],
        }
    }

    fn children_vec_mut(&mut self) -> Option<&mut Vec<Node<I>>> {
        match &mut self.kind {
            NodeKind::Functional { children, .. } => Some(children),
            NodeKind::Terminal { .. } => None,
        }
    }

    /// Whether another child can be attached without breaking `max`.
    pub fn has_capacity(&self) -> bool {
        match &self.kind {
            NodeKind::Functional { arity, children, .. } => arity.has_room(children.len()),
            NodeKind::Terminal { .. } => false,
        }
    }

    pub fn push_child(&mut self, child: Node<I>) -> bool {
        let len = self.children().len();
        self.insert_child(len, child)
    }

    /// Inserts `child` at `index` (clamped to the end). Fails on terminals
    /// and on nodes already holding `max` children.
    pub fn insert_child(&mut self, index: usize, child: Node<I>) -> bool {
        if !self.has_capacity() {
            return false;
        }
        match self.children_vec_mut() {
            Some(children) => {
                let index = index.min(children.len());
                children.insert(index, child);
                true
            }
            None => false,
        }
    }

    /// Runs the tree against one input. Children are evaluated strictly left
    /// to right; evaluator failures propagate unchanged.
    pub fn execute(&self, input: &I) -> anyhow::Result<f64> {
        match &self.kind {
            NodeKind::Terminal { evaluator } => evaluator(input),
            NodeKind::Functional { evaluator, children, .. } => {
                let values = children
                    .iter()
                    .map(|child| child.execute(input))
                    .collect::<anyhow::Result<Vec<f64>>>()?;
                evaluator(&values)
            }
        }
    }

    /// 1 for a terminal, otherwise one more than the deepest child.
    pub fn depth(&self) -> usize {
        1 + self.children().iter().map(Node::depth).max().unwrap_or(0)
    }

    /// Number of vertices in the subtree.
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(Node::size).sum::<usize>()
    }

    pub fn node_by_id(&self, id: NodeId) -> Option<&Node<I>> {
        if self.id == id {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.node_by_id(id))
    }

    pub fn node_by_id_mut(&mut self, id: NodeId) -> Option<&mut Node<I>> {
        if self.id == id {
            return Some(self);
        }
        self.children_vec_mut()?
            .iter_mut()
            .find_map(|child| child.node_by_id_mut(id))
    }

    /// Clone of the subtree rooted at `id`, searched depth-first from (and
    /// including) this node.
    pub fn child_by_id(&self, id: NodeId) -> Option<Node<I>> {
        self.node_by_id(id).cloned()
    }

    /// Direct parent of the node carrying `id`. Direct children are checked
    /// before descending; this node's own id never matches.
    pub fn parent_by_child_id(&self, id: NodeId) -> Option<&Node<I>> {
        if self.children().iter().any(|child| child.id == id) {
            return Some(self);
        }
        self.children()
            .iter()
            .filter(|child| !child.is_terminal())
            .find_map(|child| child.parent_by_child_id(id))
    }

    pub fn parent_by_child_id_mut(&mut self, id: NodeId) -> Option<&mut Node<I>> {
        if self.children().iter().any(|child| child.id == id) {
            return Some(self);
        }
        self.children_vec_mut()?
            .iter_mut()
            .filter(|child| !child.is_terminal())
            .find_map(|child| child.parent_by_child_id_mut(id))
    }

    /// Puts `node` in the slot currently held by the descendant `id`.
    /// Returns `false` when no descendant carries that id.
    pub fn set_child_by_id(&mut self, node: Node<I>, id: NodeId) -> bool {
        let Some(siblings) = self
            .parent_by_child_id_mut(id)
            .and_then(Node::children_vec_mut)
        else {
            return false;
        };
        match siblings.iter_mut().find(|child| child.id == id) {
            Some(slot) => {
                *slot = node;
                true
            }
            None => false,
        }
    }

    /// Detaches the descendant `id` from its parent. Arity is not checked
    /// here; callers consult the parent's `min` first.
    pub fn remove_child_by_id(&mut self, id: NodeId) -> Option<Node<I>> {
        let siblings = self
            .parent_by_child_id_mut(id)
            .and_then(Node::children_vec_mut)?;
        let position = siblings.iter().position(|child| child.id == id)?;
        Some(siblings.remove(position))
    }

    pub fn reset_ids(&mut self) {
        self.id = NodeId::fresh();
        if let Some(children) = self.children_vec_mut() {
            children.iter_mut().for_each(Node::reset_ids);
        }
    }

    /// Pre-order ids of every terminal in the subtree.
    pub fn terminal_node_ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids, true);
        ids
    }

    /// Pre-order ids of every functional node, starting with this one.
    pub fn functional_node_ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids, false);
        ids
    }

    fn collect_ids(&self, ids: &mut Vec<NodeId>, terminals: bool) {
        if self.is_terminal() == terminals {
            ids.push(self.id);
        }
        for child in self.children() {
            child.collect_ids(ids, terminals);
        }
    }

    /// Same names, kinds, arities and child order; ids are ignored.
    pub fn structurally_eq(&self, other: &Node<I>) -> bool {
        self.name == other.name
            && self.is_terminal() == other.is_terminal()
            && self.arity() == other.arity()
            && self.children().len() == other.children().len()
            && self
                .children()
                .iter()
                .zip(other.children())
                .all(|(a, b)| a.structurally_eq(b))
    }
}

/// Deep copy. Every vertex of the copy receives a fresh id.
impl<I> Clone for Node<I> {
    fn clone(&self) -> Self {
        let kind = match &self.kind {
            NodeKind::Terminal { evaluator } => NodeKind::Terminal {
                evaluator: Arc::clone(evaluator),
            },
            NodeKind::Functional {
                evaluator,
                arity,
                children,
            } => NodeKind::Functional {
                evaluator: Arc::clone(evaluator),
                arity: *arity,
                children: children.iter().map(Node::clone).collect(),
            },
        };
        Self {
            id: NodeId::fresh(),
            name: Arc::clone(&self.name),
            kind,
        }
    }
}

/// Prefix notation: `( name c1 c2 … )` for functional nodes, bare `name`
/// for terminals.
impl<I> fmt::Display for Node<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Terminal { .. } => f.write_str(&self.name),
            NodeKind::Functional { children, .. } => {
                write!(f, "( {}", self.name)?;
                for child in children {
                    write!(f, " {}", child)?;
                }
                f.write_str(" )")
            }
        }
    }
}

impl<I> fmt::Debug for Node<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("arity", &self.arity())
            .field("children", &self.children())
            .finish()
    }
}
