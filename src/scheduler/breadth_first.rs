use super::{cyclic_pick, cyclic_removed, Scheduler};
use crate::config::SchedulerKind;
use crate::engine::State;

/// Cyclic picks with new states placed at the front
///
/// The cursor is bumped on insert so the state it pointed at is still the next one picked.
#[derive(Debug, Default)]
pub struct BreadthFirst {
    counter: usize,
}

impl BreadthFirst {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for BreadthFirst {
    fn pick<'s>(&mut self, states: &'s [State]) -> Option<(&'s State, usize)> {
        cyclic_pick(&mut self.counter, states)
    }

    fn insert(&mut self, states: &mut Vec<State>, state: State) {
        states.insert(0, state);
        self.counter += 1;
    }

    fn removed(&mut self, index: usize) {
        cyclic_removed(&mut self.counter, index);
    }

    fn kind(&self) -> SchedulerKind {
        SchedulerKind::BreadthFirst
    }
}
