use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_ORGANISM_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a tree vertex. Every clone or reset hands out a new one,
/// so two live trees never share an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    pub fn fresh() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Identity of an organism, regenerated whenever the organism is cloned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrganismId(u64);

impl OrganismId {
    pub fn fresh() -> Self {
        Self(NEXT_ORGANISM_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for OrganismId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "o{}", self.0)
    }
}

/// Inclusive bounds on the number of children of a functional node.
/// `max == None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arity {
    pub min: usize,
    pub max: Option<usize>,
}

impl Arity {
    pub fn exact(count: usize) -> Self {
        Self { min: count, max: Some(count) }
    }

    pub fn range(min: usize, max: usize) -> Self {
        Self { min, max: Some(max) }
    }

    pub fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    pub fn is_valid(&self) -> bool {
        self.max.map_or(true, |max| self.min <= max)
    }

    pub fn allows(&self, count: usize) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }

    /// Whether one more child still fits.
    pub fn has_room(&self, count: usize) -> bool {
        self.max.map_or(true, |max| count < max)
    }
}

/// Leaf evaluator: maps the runtime input of a training case to a value.
pub type TerminalFn<I> = Arc<dyn Fn(&I) -> anyhow::Result<f64> + Send + Sync>;

/// Functional evaluator: maps the ordered child values to a value.
pub type FunctionalFn = Arc<dyn Fn(&[f64]) -> anyhow::Result<f64> + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_ids_are_distinct() {
        let a = NodeId::fresh();
        let b = NodeId::fresh();
        assert_ne!(a, b);
        assert_ne!(OrganismId::fresh(), OrganismId::fresh());
    }

    #[test]
    fn test_arity_bounds() {
        let binary = Arity::exact(2);
        assert!(binary.allows(2));
        assert!(!binary.allows(3));
        assert!(!binary.has_room(2));

        let variadic = Arity::at_least(1);
        assert!(variadic.allows(50));
        assert!(variadic.has_room(50));
        assert!(!variadic.allows(0));

        assert!(!Arity::range(3, 1).is_valid());
    }
}
