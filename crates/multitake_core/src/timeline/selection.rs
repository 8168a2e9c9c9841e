//! Candidate selection policies.
//!
//! The scheduler owns exactly one policy for its lifetime. Stateful policies
//! (the RNG, the round-robin cursor) advance once per cut point, in cut point
//! order, so a given seed always yields the same schedule.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Picks one take out of a non-empty candidate set.
pub trait SelectionPolicy: Send {
    /// Return one element of `candidates`.
    ///
    /// `candidates` holds take indices in take order and is never empty.
    /// `cut_index` is the position of the cut point being served.
    fn select(&mut self, candidates: &[usize], cut_index: usize) -> usize;

    /// Policy name for logging.
    fn name(&self) -> &'static str;
}

/// Uniform random choice from a seeded RNG.
pub struct RandomSelection {
    rng: StdRng,
}

impl RandomSelection {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl SelectionPolicy for RandomSelection {
    fn select(&mut self, candidates: &[usize], _cut_index: usize) -> usize {
        candidates[self.rng.random_range(0..candidates.len())]
    }

    fn name(&self) -> &'static str {
        "random"
    }
}

/// Cycles through the candidate set, one step per cut point.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: usize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectionPolicy for RoundRobin {
    fn select(&mut self, candidates: &[usize], _cut_index: usize) -> usize {
        let chosen = candidates[self.cursor % candidates.len()];
        self.cursor = self.cursor.wrapping_add(1);
        chosen
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}

/// Always the candidate at a fixed position (clamped to the last one).
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedIndex {
    position: usize,
}

impl FixedIndex {
    pub fn new(position: usize) -> Self {
        Self { position }
    }
}

impl SelectionPolicy for FixedIndex {
    fn select(&mut self, candidates: &[usize], _cut_index: usize) -> usize {
        candidates[self.position.min(candidates.len() - 1)]
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Selection policy as named in settings and on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    #[default]
    Random,
    RoundRobin,
    Fixed,
}

impl SelectionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionStrategy::Random => "random",
            SelectionStrategy::RoundRobin => "round_robin",
            SelectionStrategy::Fixed => "fixed",
        }
    }

    /// Parse a user-supplied name. Accepts `-` or `_` in `round-robin`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "random" => Some(SelectionStrategy::Random),
            "round_robin" => Some(SelectionStrategy::RoundRobin),
            "fixed" => Some(SelectionStrategy::Fixed),
            _ => None,
        }
    }
}

/// Build a boxed policy for the scheduler.
pub fn create_policy(
    strategy: SelectionStrategy,
    seed: u64,
    fixed_index: usize,
) -> Box<dyn SelectionPolicy> {
    match strategy {
        SelectionStrategy::Random => Box::new(RandomSelection::new(seed)),
        SelectionStrategy::RoundRobin => Box::new(RoundRobin::new()),
        SelectionStrategy::Fixed => Box::new(FixedIndex::new(fixed_index)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn picks(policy: &mut dyn SelectionPolicy, candidates: &[usize], n: usize) -> Vec<usize> {
        (0..n).map(|i| policy.select(candidates, i)).collect()
    }

    #[test]
    fn random_is_reproducible_for_a_seed() {
        let candidates = [0, 2, 3, 5];
        let a = picks(&mut RandomSelection::new(7), &candidates, 32);
        let b = picks(&mut RandomSelection::new(7), &candidates, 32);
        assert_eq!(a, b);
        assert!(a.iter().all(|c| candidates.contains(c)));
    }

    #[test]
    fn random_eventually_uses_every_candidate() {
        let candidates = [1, 4];
        let chosen = picks(&mut RandomSelection::new(11), &candidates, 64);
        assert!(chosen.contains(&1));
        assert!(chosen.contains(&4));
    }

    #[test]
    fn round_robin_cycles() {
        let mut policy = RoundRobin::new();
        assert_eq!(picks(&mut policy, &[3, 5, 8], 5), vec![3, 5, 8, 3, 5]);
    }

    #[test]
    fn fixed_index_clamps_to_last_candidate() {
        let mut policy = FixedIndex::new(4);
        assert_eq!(policy.select(&[2, 6], 0), 6);
        let mut first = FixedIndex::new(0);
        assert_eq!(first.select(&[2, 6], 0), 2);
    }

    #[test]
    fn strategy_parses_user_names() {
        assert_eq!(
            SelectionStrategy::parse("round-robin"),
            Some(SelectionStrategy::RoundRobin)
        );
        assert_eq!(SelectionStrategy::parse(" Random "), Some(SelectionStrategy::Random));
        assert_eq!(SelectionStrategy::parse("shuffle"), None);
    }

    #[test]
    fn factory_honors_strategy() {
        assert_eq!(create_policy(SelectionStrategy::Random, 1, 0).name(), "random");
        assert_eq!(
            create_policy(SelectionStrategy::RoundRobin, 1, 0).name(),
            "round_robin"
        );
        assert_eq!(create_policy(SelectionStrategy::Fixed, 1, 0).name(), "fixed");
    }
}
