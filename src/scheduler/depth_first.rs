use super::Scheduler;
use crate::config::SchedulerKind;
use crate::engine::State;

/// Always runs the last state; a fork is slotted just below it
///
/// After a branch the parent (last) keeps running its `then` side while the `else` sibling
/// waits directly underneath, so paths are completed one at a time.
#[derive(Debug, Default)]
pub struct DepthFirst;

impl DepthFirst {
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for DepthFirst {
    fn pick<'s>(&mut self, states: &'s [State]) -> Option<(&'s State, usize)> {
        let index = states.len().checked_sub(1)?;
        Some((&states[index], index))
    }

    fn insert(&mut self, states: &mut Vec<State>, state: State) {
        match states.len() {
            0 => states.push(state),
            len => states.insert(len - 1, state),
        }
    }

    fn kind(&self) -> SchedulerKind {
        SchedulerKind::DepthFirst
    }
}
