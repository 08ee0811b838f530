use crate::engines::generation::organism::Organism;
use crate::types::NodeId;
use rand::seq::SliceRandom;
use rand::Rng;

/// Smallest distance from 1.0 a selection weight is computed over, so a
/// fitness of exactly 1 does not produce an infinite weight.
pub const SELECTION_EPSILON: f64 = 1e-9;

/// Resamples spent on finding a second, different parent before falling
/// back to a uniform pick among the other candidates.
pub const PAIR_RESAMPLE_LIMIT: usize = 32;

/// Roulette weight of a fitness: `1 / |1 - fitness|`. Unscored organisms
/// are weighed as if they scored 0.
pub fn selection_weight(fitness: Option<f64>) -> f64 {
    let fitness = fitness.unwrap_or(0.0);
    let distance = (1.0 - fitness).abs();
    if !distance.is_finite() {
        return 0.0;
    }
    1.0 / distance.max(SELECTION_EPSILON)
}

/// Fitness-proportionate selection over a frozen copy of the candidates.
pub struct MatingPool<I> {
    candidates: Vec<Organism<I>>,
    cumulative: Vec<f64>,
    total: f64,
}

impl<I> MatingPool<I> {
    /// Clones the first `rank_limit` organisms of a ranked population, or all
    /// of them when no limit is given.
    pub fn new(ranked: &[Organism<I>], rank_limit: Option<usize>) -> Self {
        let take = rank_limit.map_or(ranked.len(), |limit| limit.min(ranked.len()));
        let candidates: Vec<Organism<I>> = ranked[..take].to_vec();

        let mut total = 0.0;
        let cumulative = candidates
            .iter()
            .map(|organism| {
                total += selection_weight(organism.fitness());
                total
            })
            .collect();

        Self {
            candidates,
            cumulative,
            total,
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn candidates(&self) -> &[Organism<I>] {
        &self.candidates
    }

    /// Index of the first candidate whose running weight exceeds a uniform
    /// draw in `[0, total)`. Uniform when every weight is zero.
    pub fn select_index<R: Rng>(&self, rng: &mut R) -> Option<usize> {
        if self.candidates.is_empty() {
            return None;
        }
        if self.total <= 0.0 || !self.total.is_finite() {
            return Some(rng.gen_range(0..self.candidates.len()));
        }
        let draw = rng.gen_range(0.0..self.total);
        let index = self
            .cumulative
            .iter()
            .position(|&running| running > draw)
            .unwrap_or(self.candidates.len() - 1);
        Some(index)
    }

    pub fn select<R: Rng>(&self, rng: &mut R) -> Option<&Organism<I>> {
        self.select_index(rng).map(|index| &self.candidates[index])
    }

    /// Two parents with different ids. A pool of one returns that organism
    /// twice.
    pub fn select_pair<R: Rng>(&self, rng: &mut R) -> Option<(&Organism<I>, &Organism<I>)> {
        let first = self.select_index(rng)?;
        if self.candidates.len() == 1 {
            return Some((&self.candidates[first], &self.candidates[first]));
        }

        let first_id = self.candidates[first].id();
        for _ in 0..PAIR_RESAMPLE_LIMIT {
            let second = self.select_index(rng)?;
            if self.candidates[second].id() != first_id {
                return Some((&self.candidates[first], &self.candidates[second]));
            }
        }

        let mut second = rng.gen_range(0..self.candidates.len() - 1);
        if second >= first {
            second += 1;
        }
        Some((&self.candidates[first], &self.candidates[second]))
    }
}

/// Crossover point in `organism`: a terminal with `terminal_probability`,
/// otherwise a non-root functional node. Falls back to terminals when the
/// root is the only functional node.
fn crossover_point<I, R: Rng>(
    organism: &Organism<I>,
    terminal_probability: f64,
    rng: &mut R,
) -> Option<NodeId> {
    let root = organism.root().id();
    let use_terminals = rng.gen::<f64>() < terminal_probability;
    let mut ids = if use_terminals {
        organism.terminal_node_ids()
    } else {
        organism
            .functional_node_ids()
            .into_iter()
            .filter(|&id| id != root)
            .collect()
    };
    if ids.is_empty() {
        ids = organism.terminal_node_ids();
    }
    ids.choose(rng).copied()
}

/// Child of `recipient` with one subtree replaced by a copy of a subtree
/// of `donor`. The recipient's root is never the replaced point; a
/// single-node recipient comes back as a plain copy. The child is unscored
/// and has fresh ids.
pub fn crossover<I, R: Rng>(
    recipient: &Organism<I>,
    donor: &Organism<I>,
    terminal_probability: f64,
    rng: &mut R,
) -> Organism<I> {
    let mut child = recipient.clone();
    child.clear_fitness();

    let target = crossover_point(&child, terminal_probability, rng);
    let source = crossover_point(donor, terminal_probability, rng);

    if let (Some(target), Some(source)) = (target, source) {
        if let Some(subtree) = donor.child_by_id(source) {
            if !child.set_child_by_id(subtree, target) {
                log::trace!("Crossover could not splice at {} in {}; kept as copy", target, child);
            }
        }
    }

    child.reset_ids();
    child
}
