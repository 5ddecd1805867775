//! Scheduling strategies for active exploration states
//!
//! The engine keeps its active states in one `Vec`. A [`Scheduler`] decides which of them
//! runs next and where a freshly forked state is placed:
//! - Round-robin: cyclic cursor, append
//! - Random: uniform pick from a seedable ChaCha8 stream, append
//! - Depth-first: last state, insert second-to-last
//! - Breadth-first: cyclic cursor, insert at the front
//! - Min-loop: fewest loop back-edges taken, append

pub mod breadth_first;
pub mod depth_first;
pub mod min_loop;
pub mod random;
pub mod round_robin;

pub use breadth_first::BreadthFirst;
pub use depth_first::DepthFirst;
pub use min_loop::MinLoop;
pub use random::RandomScheduler;
pub use round_robin::RoundRobin;

use crate::config::SchedulerKind;
use crate::engine::State;

/// Picks the next state to step and places newly forked states
pub trait Scheduler {
    /// Choose a state, returning it with its position; `None` when there is nothing to run
    fn pick<'s>(&mut self, states: &'s [State]) -> Option<(&'s State, usize)>;

    /// Add a new state to the collection
    fn insert(&mut self, states: &mut Vec<State>, state: State);

    /// The state at `index` was taken out of the collection
    fn removed(&mut self, _index: usize) {}

    fn kind(&self) -> SchedulerKind;
}

/// Build the strategy named by `kind`
///
/// `seed` only affects the random scheduler.
pub fn create_scheduler(kind: SchedulerKind, seed: Option<u64>) -> Box<dyn Scheduler> {
    match kind {
        SchedulerKind::RoundRobin => Box::new(RoundRobin::new()),
        SchedulerKind::Random => Box::new(RandomScheduler::new(seed)),
        SchedulerKind::DepthFirst => Box::new(DepthFirst::new()),
        SchedulerKind::BreadthFirst => Box::new(BreadthFirst::new()),
        SchedulerKind::MinLoop => Box::new(MinLoop::new()),
    }
}

/// Shared cursor logic of the cyclic strategies
pub(crate) fn cyclic_pick<'s>(
    counter: &mut usize,
    states: &'s [State],
) -> Option<(&'s State, usize)> {
    if *counter >= states.len() {
        *counter = 0;
    }
    let index = *counter;
    let state = states.get(index)?;
    *counter += 1;
    Some((state, index))
}

/// Keep a cyclic cursor on the same state after an earlier one is removed
pub(crate) fn cyclic_removed(counter: &mut usize, index: usize) {
    if index < *counter {
        *counter -= 1;
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::engine::{State, StateId};
    use crate::memory::SymbolicMemory;

    pub fn states(ids: &[usize]) -> Vec<State> {
        ids.iter().map(|id| state(*id)).collect()
    }

    pub fn state(id: usize) -> State {
        State::new(StateId(id), SymbolicMemory::new())
    }

    pub fn ids(states: &[State]) -> Vec<usize> {
        states.iter().map(|s| s.id.0).collect()
    }
}
