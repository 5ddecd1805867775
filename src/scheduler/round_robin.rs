use super::{cyclic_pick, cyclic_removed, Scheduler};
use crate::config::SchedulerKind;
use crate::engine::State;

/// Cycles through the active states; new states are appended
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: usize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for RoundRobin {
    fn pick<'s>(&mut self, states: &'s [State]) -> Option<(&'s State, usize)> {
        cyclic_pick(&mut self.counter, states)
    }

    fn insert(&mut self, states: &mut Vec<State>, state: State) {
        states.push(state);
    }

    fn removed(&mut self, index: usize) {
        cyclic_removed(&mut self.counter, index);
    }

    fn kind(&self) -> SchedulerKind {
        SchedulerKind::RoundRobin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::testing::*;

    #[test]
    fn test_cycles_in_order() {
        let pool = states(&[0, 1, 2]);
        let mut scheduler = RoundRobin::new();
        let picked: Vec<usize> = (0..6)
            .map(|_| scheduler.pick(&pool).unwrap().1)
            .collect();
        assert_eq!(picked, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn test_cursor_resets_when_pool_shrinks() {
        let mut pool = states(&[0, 1, 2]);
        let mut scheduler = RoundRobin::new();
        scheduler.pick(&pool);
        scheduler.pick(&pool);
        pool.truncate(1);
        assert_eq!(scheduler.pick(&pool).unwrap().1, 0);
    }

    #[test]
    fn test_removal_before_cursor_skips_nobody() {
        let mut pool = states(&[0, 1, 2, 3]);
        let mut scheduler = RoundRobin::new();
        assert_eq!(scheduler.pick(&pool).unwrap().0.id.0, 0);
        assert_eq!(scheduler.pick(&pool).unwrap().0.id.0, 1);

        pool.remove(1);
        scheduler.removed(1);
        assert_eq!(scheduler.pick(&pool).unwrap().0.id.0, 2);
        assert_eq!(scheduler.pick(&pool).unwrap().0.id.0, 3);
    }

    #[test]
    fn test_removal_after_cursor_keeps_it() {
        let mut pool = states(&[0, 1, 2]);
        let mut scheduler = RoundRobin::new();
        scheduler.pick(&pool);
        pool.remove(2);
        scheduler.removed(2);
        assert_eq!(scheduler.pick(&pool).unwrap().0.id.0, 1);
    }

    #[test]
    fn test_insert_appends() {
        let mut pool = states(&[0, 1]);
        let mut scheduler = RoundRobin::new();
        scheduler.insert(&mut pool, state(2));
        assert_eq!(ids(&pool), vec![0, 1, 2]);
    }
}
