use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::Scheduler;
use crate::config::SchedulerKind;
use crate::engine::State;

/// Uniform random picks; new states are appended
#[derive(Debug)]
pub struct RandomScheduler {
    rng: ChaCha8Rng,
}

impl RandomScheduler {
    /// Seeded for reproducible runs, or from the OS when `seed` is `None`
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_os_rng(),
        };
        Self { rng }
    }
}

impl Scheduler for RandomScheduler {
    fn pick<'s>(&mut self, states: &'s [State]) -> Option<(&'s State, usize)> {
        if states.is_empty() {
            return None;
        }
        let index = self.rng.random_range(0..states.len());
        Some((&states[index], index))
    }

    fn insert(&mut self, states: &mut Vec<State>, state: State) {
        states.push(state);
    }

    fn kind(&self) -> SchedulerKind {
        SchedulerKind::Random
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::testing::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let pool = states(&[0, 1, 2, 3, 4]);
        let mut a = RandomScheduler::new(Some(42));
        let mut b = RandomScheduler::new(Some(42));
        let run_a: Vec<usize> = (0..20).map(|_| a.pick(&pool).unwrap().1).collect();
        let run_b: Vec<usize> = (0..20).map(|_| b.pick(&pool).unwrap().1).collect();
        assert_eq!(run_a, run_b);
    }

    #[test]
    fn test_picks_in_range() {
        let pool = states(&[0, 1, 2]);
        let mut scheduler = RandomScheduler::new(None);
        for _ in 0..50 {
            assert!(scheduler.pick(&pool).unwrap().1 < pool.len());
        }
    }

    #[test]
    fn test_single_state() {
        let pool = states(&[9]);
        let mut scheduler = RandomScheduler::new(Some(1));
        assert_eq!(scheduler.pick(&pool).unwrap().0.id.0, 9);
    }
}
