use crate::engines::generation::node::Node;
use crate::error::Result;
use crate::functions::registry::Palette;
use crate::types::{NodeId, OrganismId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One candidate solution: an expression tree plus its score.
///
/// `fitness` is `None` until the organism has been evaluated, which keeps
/// "never scored" apart from a genuine score of zero.
pub struct Organism<I> {
    id: OrganismId,
    root: Node<I>,
    fitness: Option<f64>,
}

impl<I> Organism<I> {
    pub fn new(root: Node<I>) -> Self {
        Self {
            id: OrganismId::fresh(),
            root,
            fitness: None,
        }
    }

    pub fn id(&self) -> OrganismId {
        self.id
    }

    pub fn root(&self) -> &Node<I> {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Node<I> {
        &mut self.root
    }

    pub fn into_root(self) -> Node<I> {
        self.root
    }

    pub fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = Some(fitness);
    }

    pub fn clear_fitness(&mut self) {
        self.fitness = None;
    }

    pub fn execute(&self, input: &I) -> anyhow::Result<f64> {
        self.root.execute(input)
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    pub fn size(&self) -> usize {
        self.root.size()
    }

    pub fn child_by_id(&self, id: NodeId) -> Option<Node<I>> {
        self.root.child_by_id(id)
    }

    pub fn set_child_by_id(&mut self, node: Node<I>, id: NodeId) -> bool {
        self.root.set_child_by_id(node, id)
    }

    /// `None` for the root's own id: the root has no parent.
    pub fn parent_by_child_id(&self, id: NodeId) -> Option<&Node<I>> {
        self.root.parent_by_child_id(id)
    }

    pub fn parent_by_child_id_mut(&mut self, id: NodeId) -> Option<&mut Node<I>> {
        self.root.parent_by_child_id_mut(id)
    }

    pub fn terminal_node_ids(&self) -> Vec<NodeId> {
        self.root.terminal_node_ids()
    }

    pub fn functional_node_ids(&self) -> Vec<NodeId> {
        self.root.functional_node_ids()
    }

    /// Regenerates the organism id and every node id in the tree.
    pub fn reset_ids(&mut self) {
        self.id = OrganismId::fresh();
        self.root.reset_ids();
    }

    pub fn to_snapshot(&self) -> OrganismSnapshot {
        OrganismSnapshot {
            id: self.id,
            fitness: self.fitness,
            expression: self.root.to_string(),
        }
    }
}

impl<I: 'static> Organism<I> {
    /// Rebuilds an organism from a snapshot; it gets a fresh id but keeps
    /// the recorded fitness.
    pub fn from_snapshot(snapshot: &OrganismSnapshot, palette: &Palette<I>) -> Result<Self> {
        let mut organism = Self::new(Node::parse(&snapshot.expression, palette)?);
        organism.fitness = snapshot.fitness;
        Ok(organism)
    }
}

/// Copies the tree and keeps the fitness. The copy has a new organism id
/// and fresh, pairwise distinct node ids.
impl<I> Clone for Organism<I> {
    fn clone(&self) -> Self {
        let mut clone = Self {
            id: OrganismId::fresh(),
            root: self.root.clone(),
            fitness: self.fitness,
        };
        clone.reset_ids();
        clone
    }
}

impl<I> fmt::Display for Organism<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.root, f)
    }
}

impl<I> fmt::Debug for Organism<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Organism")
            .field("id", &self.id)
            .field("fitness", &self.fitness)
            .field("expression", &self.root.to_string())
            .finish()
    }
}

/// Serializable view of an organism.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganismSnapshot {
    pub id: OrganismId,
    pub fitness: Option<f64>,
    pub expression: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palette() -> Palette<(f64, f64)> {
        let mut palette = Palette::new().with_arithmetic();
        palette
            .add_terminal("x", |p: &(f64, f64)| Ok(p.0))
            .add_terminal("y", |p: &(f64, f64)| Ok(p.1));
        palette
    }

    fn organism(text: &str) -> Organism<(f64, f64)> {
        Organism::new(Node::parse(text, &palette()).unwrap())
    }

    #[test]
    fn test_new_organism_is_unscored() {
        assert_eq!(organism("( + x y )").fitness(), None);
    }

    #[test]
    fn test_clone_keeps_fitness_and_renews_ids() {
        let mut original = organism("( + x ( * y y ) )");
        original.set_fitness(0.25);
        let copy = original.clone();

        assert_ne!(copy.id(), original.id());
        assert_eq!(copy.fitness(), Some(0.25));
        assert!(copy.root().structurally_eq(original.root()));
        let original_ids = original.functional_node_ids();
        assert!(copy
            .functional_node_ids()
            .iter()
            .all(|id| !original_ids.contains(id)));
    }

    #[test]
    fn test_forwards_tree_operations() {
        let mut subject = organism("( + x ( * y y ) )");
        let root_id = subject.root().id();
        let product_id = subject.functional_node_ids()[1];

        assert!(subject.parent_by_child_id(root_id).is_none());
        assert_eq!(subject.parent_by_child_id(product_id).unwrap().id(), root_id);
        assert_eq!(subject.terminal_node_ids().len(), 3);
        assert_eq!(subject.execute(&(2.0, 3.0)).unwrap(), 11.0);

        let replacement = Node::parse("x", &palette()).unwrap();
        assert!(subject.set_child_by_id(replacement, product_id));
        assert_eq!(subject.to_string(), "( + x x )");
    }

    #[test]
    fn test_reset_ids_renews_organism_id() {
        let mut subject = organism("( - x y )");
        let before = subject.id();
        subject.reset_ids();
        assert_ne!(subject.id(), before);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut subject = organism("( - x y )");
        subject.set_fitness(3.5);

        let json = serde_json::to_string(&subject.to_snapshot()).unwrap();
        let snapshot: OrganismSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snapshot.expression, "( - x y )");

        let restored = Organism::from_snapshot(&snapshot, &palette()).unwrap();
        assert_eq!(restored.fitness(), Some(3.5));
        assert!(restored.root().structurally_eq(subject.root()));
    }
}
