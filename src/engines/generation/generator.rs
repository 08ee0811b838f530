use crate::engines::generation::node::Node;
use crate::engines::generation::organism::Organism;
use crate::error::Result;
use crate::functions::registry::Palette;
use rand::Rng;

/// Extra children allowed above `min` when a functional node has no `max`.
pub const UNBOUNDED_ARITY_SPREAD: usize = 2;

/// Grow-method tree builder over a palette.
pub struct TreeGenerator<'a, I> {
    palette: &'a Palette<I>,
    max_depth: usize,
}

impl<'a, I: 'static> TreeGenerator<'a, I> {
    pub fn new(palette: &'a Palette<I>, max_depth: usize) -> Result<Self> {
        palette.validate()?;
        Ok(Self { palette, max_depth })
    }

    /// Random subtree rooted at `depth`.
    ///
    /// Depth 0 always yields a functional node, depths up to `max_depth`
    /// pick uniformly among every prototype, deeper levels only terminals.
    pub fn generate_node<R: Rng>(&self, depth: usize, rng: &mut R) -> Node<I> {
        let functional = self.palette.functional();
        let terminal = self.palette.terminal();

        let prototype = if depth == 0 {
            &functional[rng.gen_range(0..functional.len())]
        } else if depth <= self.max_depth {
            let index = rng.gen_range(0..functional.len() + terminal.len());
            if index < functional.len() {
                &functional[index]
            } else {
                &terminal[index - functional.len()]
            }
        } else {
            &terminal[rng.gen_range(0..terminal.len())]
        };

        let mut node = prototype.clone();
        if let Some(arity) = node.arity() {
            let upper = arity.max.unwrap_or(arity.min + UNBOUNDED_ARITY_SPREAD);
            let count = rng.gen_range(arity.min..=upper);
            for _ in 0..count {
                let child = self.generate_node(depth + 1, rng);
                node.push_child(child);
            }
        }
        node
    }

    pub fn generate_organism<R: Rng>(&self, rng: &mut R) -> Organism<I> {
        Organism::new(self.generate_node(0, rng))
    }

    pub fn generate_population<R: Rng>(&self, size: usize, rng: &mut R) -> Vec<Organism<I>> {
        (0..size).map(|_| self.generate_organism(rng)).collect()
    }
}
