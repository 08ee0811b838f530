use crate::config::EvolutionConfig;
use crate::engines::generation::generator::TreeGenerator;
use crate::engines::generation::organism::Organism;
use crate::types::NodeId;
use rand::seq::SliceRandom;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Swap a non-root subtree for a freshly grown one.
    Replacement,
    /// Grow a new child under a functional node with spare capacity.
    Addition,
    /// Splice a non-root subtree out of its parent.
    Deletion,
}

impl MutationKind {
    pub const ALL: [MutationKind; 3] = [
        MutationKind::Replacement,
        MutationKind::Addition,
        MutationKind::Deletion,
    ];

    fn index(self) -> usize {
        match self {
            MutationKind::Replacement => 0,
            MutationKind::Addition => 1,
            MutationKind::Deletion => 2,
        }
    }
}

/// Applies one of the three mutation kinds, retrying each kind a bounded
/// number of times and falling through to the kinds not yet tried.
#[derive(Debug, Clone)]
pub struct Mutator {
    rates: [f64; 3],
    attempt_limit: usize,
    mixed_placement: bool,
}

impl Mutator {
    pub fn new(config: &EvolutionConfig) -> Self {
        Self {
            rates: [
                config.mutation_replacement_rate,
                config.mutation_addition_rate,
                config.mutation_deletion_rate,
            ],
            attempt_limit: config.mutation_attempt_limit.max(1),
            mixed_placement: config.mutation_add_mixed_placement,
        }
    }

    /// Draws a kind with probability proportional to its rate.
    pub fn choose_kind<R: Rng>(&self, rng: &mut R) -> MutationKind {
        let total: f64 = self.rates.iter().sum();
        if total <= 0.0 {
            return MutationKind::ALL[rng.gen_range(0..MutationKind::ALL.len())];
        }
        let mut draw = rng.gen_range(0.0..total);
        for (kind, rate) in MutationKind::ALL.iter().zip(self.rates) {
            if draw < rate {
                return *kind;
            }
            draw -= rate;
        }
        MutationKind::Deletion
    }

    /// Mutates `organism` in place. Returns the kind that succeeded, or
    /// `None` when every kind ran out of attempts and the tree is unchanged.
    pub fn mutate<I: 'static, R: Rng>(
        &self,
        organism: &mut Organism<I>,
        generator: &TreeGenerator<'_, I>,
        rng: &mut R,
    ) -> Option<MutationKind> {
        let mut attempted = [false; 3];
        let mut kind = self.choose_kind(rng);

        loop {
            attempted[kind.index()] = true;
            for _ in 0..self.attempt_limit {
                if self.apply(kind, organism, generator, rng) {
                    organism.clear_fitness();
                    return Some(kind);
                }
            }
            log::trace!("{:?} exhausted on {}", kind, organism);

            kind = *MutationKind::ALL
                .iter()
                .find(|candidate| !attempted[candidate.index()])?;
        }
    }

    /// One attempt of `kind`. `false` leaves the tree untouched.
    pub fn apply<I: 'static, R: Rng>(
        &self,
        kind: MutationKind,
        organism: &mut Organism<I>,
        generator: &TreeGenerator<'_, I>,
        rng: &mut R,
    ) -> bool {
        match kind {
            MutationKind::Replacement => replace(organism, generator, rng),
            MutationKind::Addition => add(organism, generator, self.mixed_placement, rng),
            MutationKind::Deletion => delete(organism, rng),
        }
    }
}

fn non_root_ids<I>(organism: &Organism<I>) -> Vec<NodeId> {
    let root = organism.root().id();
    organism
        .functional_node_ids()
        .into_iter()
        .chain(organism.terminal_node_ids())
        .filter(|&id| id != root)
        .collect()
}

fn replace<I: 'static, R: Rng>(
    organism: &mut Organism<I>,
    generator: &TreeGenerator<'_, I>,
    rng: &mut R,
) -> bool {
    let Some(&target) = non_root_ids(organism).choose(rng) else {
        return false;
    };
    let subtree = generator.generate_node(1, rng);
    organism.set_child_by_id(subtree, target)
}

fn add<I: 'static, R: Rng>(
    organism: &mut Organism<I>,
    generator: &TreeGenerator<'_, I>,
    mixed_placement: bool,
    rng: &mut R,
) -> bool {
    let Some(&target) = organism.functional_node_ids().choose(rng) else {
        return false;
    };
    let has_capacity = organism
        .root()
        .node_by_id(target)
        .map_or(false, |node| node.has_capacity());
    if !has_capacity {
        return false;
    }

    let subtree = generator.generate_node(1, rng);
    let Some(node) = organism.root_mut().node_by_id_mut(target) else {
        return false;
    };
    let position = if mixed_placement {
        rng.gen_range(0..=node.children().len())
    } else {
        node.children().len()
    };
    node.insert_child(position, subtree)
}

fn delete<I, R: Rng>(organism: &mut Organism<I>, rng: &mut R) -> bool {
    let Some(&target) = non_root_ids(organism).choose(rng) else {
        return false;
    };
    let removable = organism
        .parent_by_child_id(target)
        .and_then(|parent| parent.arity().map(|arity| parent.children().len() > arity.min))
        .unwrap_or(false);
    if !removable {
        return false;
    }
    organism.root_mut().remove_child_by_id(target).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::generation::node::Node;
    use crate::functions::registry::Palette;
    use crate::types::Arity;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn palette() -> Palette<f64> {
        let mut palette = Palette::new().with_arithmetic();
        palette
            .add_functional("sum", Arity::range(1, 3), |v: &[f64]| Ok(v.iter().sum()))
            .unwrap();
        palette.add_terminal("x", |x: &f64| Ok(*x)).add_constant(2.0);
        palette
    }

    fn only(kind: MutationKind) -> Mutator {
        let mut config = EvolutionConfig {
            mutation_replacement_rate: 0.0,
            mutation_addition_rate: 0.0,
            mutation_deletion_rate: 0.0,
            ..Default::default()
        };
        match kind {
            MutationKind::Replacement => config.mutation_replacement_rate = 1.0,
            MutationKind::Addition => config.mutation_addition_rate = 1.0,
            MutationKind::Deletion => config.mutation_deletion_rate = 1.0,
        }
        Mutator::new(&config)
    }

    fn check_arity(node: &Node<f64>) {
        if let Some(arity) = node.arity() {
            assert!(arity.allows(node.children().len()), "{}", node);
        }
        node.children().iter().for_each(check_arity);
    }

    #[test]
    fn test_choose_kind_follows_rates() {
        let mut rng = StdRng::seed_from_u64(0);
        for kind in MutationKind::ALL {
            let mutator = only(kind);
            for _ in 0..10 {
                assert_eq!(mutator.choose_kind(&mut rng), kind);
            }
        }
    }

    #[test]
    fn test_addition_respects_max() {
        let palette = palette();
        let generator = TreeGenerator::new(&palette, 2).unwrap();
        let mutator = only(MutationKind::Addition);
        let mut rng = StdRng::seed_from_u64(8);

        let mut full = Organism::new(Node::parse("( sum x x x )", &palette).unwrap());
        let before = full.to_string();
        assert!(!mutator.apply(MutationKind::Addition, &mut full, &generator, &mut rng));
        assert_eq!(full.to_string(), before);

        let mut open = Organism::new(Node::parse("( sum x )", &palette).unwrap());
        assert!(mutator.apply(MutationKind::Addition, &mut open, &generator, &mut rng));
        assert_eq!(open.root().children().len(), 2);
        check_arity(open.root());
    }

    #[test]
    fn test_deletion_respects_min() {
        let palette = palette();
        let generator = TreeGenerator::new(&palette, 2).unwrap();
        let mutator = only(MutationKind::Deletion);
        let mut rng = StdRng::seed_from_u64(8);

        let mut binary = Organism::new(Node::parse("( + x 2 )", &palette).unwrap());
        assert!(!mutator.apply(MutationKind::Deletion, &mut binary, &generator, &mut rng));

        let mut variadic = Organism::new(Node::parse("( sum x 2 )", &palette).unwrap());
        assert!(mutator.apply(MutationKind::Deletion, &mut variadic, &generator, &mut rng));
        assert_eq!(variadic.root().children().len(), 1);
        assert!(!mutator.apply(MutationKind::Deletion, &mut variadic, &generator, &mut rng));
    }

    #[test]
    fn test_replacement_keeps_root() {
        let palette = palette();
        let generator = TreeGenerator::new(&palette, 2).unwrap();
        let mutator = only(MutationKind::Replacement);
        let mut rng = StdRng::seed_from_u64(13);

        for _ in 0..20 {
            let mut organism = Organism::new(Node::parse("( * ( + x 2 ) x )", &palette).unwrap());
            let root = organism.root().id();
            assert_eq!(mutator.mutate(&mut organism, &generator, &mut rng), Some(MutationKind::Replacement));
            assert_eq!(organism.root().id(), root);
            assert_eq!(organism.root().name(), "*");
            check_arity(organism.root());
        }
    }

    #[test]
    fn test_exhausted_kinds_fall_through() {
        let palette = palette();
        let generator = TreeGenerator::new(&palette, 2).unwrap();
        let mutator = only(MutationKind::Deletion);
        let mut rng = StdRng::seed_from_u64(1);

        // deletion and addition are impossible on a full binary tree
        let mut organism = Organism::new(Node::parse("( + x 2 )", &palette).unwrap());
        organism.set_fitness(4.0);
        assert_eq!(mutator.mutate(&mut organism, &generator, &mut rng), Some(MutationKind::Replacement));
        assert_eq!(organism.fitness(), None);
    }

    #[test]
    fn test_single_terminal_is_left_unchanged() {
        let palette = palette();
        let generator = TreeGenerator::new(&palette, 2).unwrap();
        let mutator = Mutator::new(&EvolutionConfig::default());
        let mut rng = StdRng::seed_from_u64(1);

        let mut organism = Organism::new(Node::parse("x", &palette).unwrap());
        organism.set_fitness(1.5);
        assert_eq!(mutator.mutate(&mut organism, &generator, &mut rng), None);
        assert_eq!(organism.to_string(), "x");
        assert_eq!(organism.fitness(), Some(1.5));
    }
}
