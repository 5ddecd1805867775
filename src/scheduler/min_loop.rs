use super::Scheduler;
use crate::config::SchedulerKind;
use crate::engine::State;

/// Prefers the state with the fewest loop back-edges; ties go to the earliest state
#[derive(Debug, Default)]
pub struct MinLoop;

impl MinLoop {
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for MinLoop {
    fn pick<'s>(&mut self, states: &'s [State]) -> Option<(&'s State, usize)> {
        // min_by_key keeps the last of equal keys, so compare on (iterations, index)
        states
            .iter()
            .enumerate()
            .min_by_key(|(index, state)| (state.loop_iterations, *index))
            .map(|(index, state)| (state, index))
    }

    fn insert(&mut self, states: &mut Vec<State>, state: State) {
        states.push(state);
    }

    fn kind(&self) -> SchedulerKind {
        SchedulerKind::MinLoop
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::testing::*;

    #[test]
    fn test_picks_fewest_iterations() {
        let mut pool = states(&[0, 1, 2]);
        pool[0].loop_iterations = 3;
        pool[1].loop_iterations = 1;
        pool[2].loop_iterations = 2;
        let mut scheduler = MinLoop::new();
        assert_eq!(scheduler.pick(&pool).unwrap().1, 1);
    }

    #[test]
    fn test_ties_pick_first() {
        let mut pool = states(&[0, 1, 2]);
        pool[0].loop_iterations = 2;
        let mut scheduler = MinLoop::new();
        assert_eq!(scheduler.pick(&pool).unwrap().1, 1);
    }
}
