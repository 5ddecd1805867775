//! Path exploration engine
//!
//! The engine owns the active states, the shared [`TypeRegistry`] and the frame arena. It is
//! driven cooperatively: [`Engine::start`] seeds one state at the function entry, and every
//! [`Engine::step`] advances a single state by one instruction, as chosen by the scheduler.
//! Finished states are checked by [`Engine::finish`].
//!
//! Loop policy: a jump to a block that is an ancestor of the current block is a back-edge.
//! With `loop_bound = 0` every back-edge is cut off (the state stops following that edge);
//! with `loop_bound = k` a state may re-enter each loop header at most `k` times.

pub mod state;

pub use state::{BlockFrame, FrameArena, FrameId, State, StateId};

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use log::{debug, info, trace, warn};
use z3::ast::{Bool, Dynamic};

use crate::config::EngineConfig;
use crate::ir::{BlockId, Function, InstrKind};
use crate::memory::{SymbolicMemory, TypeRegistry};
use crate::report::{
    AbandonReason, AbandonedState, ExplorationReport, ExplorationStatistics, FailedState,
    PathReport,
};
use crate::scheduler::{create_scheduler, Scheduler};
use crate::solver::ConstraintSolver;
use crate::translate::{translate, Control, TranslationContext};

/// Reasons `start` refuses a function without creating a state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalSignal {
    /// Package initialisers are not explored
    InitFunction,
    /// The function has no body
    ExternalFunction,
    /// The function has a body with no blocks
    EmptyFunction,
}

impl fmt::Display for TerminalSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalSignal::InitFunction => write!(f, "init function"),
            TerminalSignal::ExternalFunction => write!(f, "external function"),
            TerminalSignal::EmptyFunction => write!(f, "function without blocks"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started(StateId),
    Terminal(TerminalSignal),
}

/// What one call to [`Engine::step`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// One instruction executed or one exhausted frame popped
    Advanced(StateId),
    /// A branch split `parent` and created `child`
    Forked { parent: StateId, child: StateId },
    /// The state's frame stack emptied and it moved to the result set
    Retired(StateId),
    /// Translation failed; the state moved to the failed set
    Failed(StateId),
    /// Nothing to run
    Idle,
    /// The step or time budget ran out; all active states were abandoned
    BudgetExhausted,
}

pub struct Engine<'p> {
    config: EngineConfig,
    scheduler: Box<dyn Scheduler>,
    registry: TypeRegistry,
    arena: FrameArena,
    function: Option<&'p Function>,
    signal: Option<TerminalSignal>,
    active: Vec<State>,
    retired: Vec<State>,
    failed: Vec<FailedState>,
    abandoned: Vec<AbandonedState>,
    stubbed: BTreeMap<InstrKind, usize>,
    stats: ExplorationStatistics,
    next_id: usize,
    started_at: Option<Instant>,
}

impl<'p> Engine<'p> {
    pub fn new(config: EngineConfig) -> Self {
        let scheduler = create_scheduler(config.scheduler, config.seed);
        Self::with_scheduler(config, scheduler)
    }

    /// Build an engine around a caller-provided scheduler
    pub fn with_scheduler(config: EngineConfig, scheduler: Box<dyn Scheduler>) -> Self {
        let stats = ExplorationStatistics::new(scheduler.kind());
        Self {
            config,
            scheduler,
            registry: TypeRegistry::new(),
            arena: FrameArena::new(),
            function: None,
            signal: None,
            active: Vec::new(),
            retired: Vec::new(),
            failed: Vec::new(),
            abandoned: Vec::new(),
            stubbed: BTreeMap::new(),
            stats,
            next_id: 0,
            started_at: None,
        }
    }

    fn fresh_id(&mut self) -> StateId {
        let id = StateId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Seed exploration of `function` with one state at the entry block
    pub fn start(&mut self, function: &'p Function) -> StartOutcome {
        self.function = Some(function);
        self.started_at = Some(Instant::now());

        let signal = if function.name == "init" {
            Some(TerminalSignal::InitFunction)
        } else if function.is_external() {
            Some(TerminalSignal::ExternalFunction)
        } else if function.block_count() == 0 {
            Some(TerminalSignal::EmptyFunction)
        } else {
            None
        };
        if let Some(signal) = signal {
            info!("not exploring {}: {}", function.name, signal);
            self.signal = Some(signal);
            return StartOutcome::Terminal(signal);
        }

        let mut memory = SymbolicMemory::new();
        for param in &function.params {
            memory.add_variable(&param.name, &param.ty, &mut self.registry);
        }

        let entry_len = function.block(BlockId(0)).map_or(0, |b| b.len());
        let id = self.fresh_id();
        let mut state = State::new(id, memory);
        state
            .frames
            .push(self.arena.alloc(BlockFrame::new(BlockId(0), entry_len, None)));
        self.active.push(state);
        self.stats.states_created += 1;
        self.stats.max_active_states = self.stats.max_active_states.max(1);

        debug!(
            "exploring {} ({} blocks, {} params)",
            function.name,
            function.block_count(),
            function.params.len()
        );
        StartOutcome::Started(id)
    }

    pub fn has_next(&self) -> bool {
        !self.active.is_empty()
    }

    fn budget_exceeded(&self) -> Option<AbandonReason> {
        let budget = &self.config.budget;
        if budget.max_steps.is_some_and(|max| self.stats.steps >= max) {
            return Some(AbandonReason::StepLimit);
        }
        let elapsed = self.started_at.map(|t| t.elapsed());
        if let (Some(timeout), Some(elapsed)) = (budget.timeout, elapsed) {
            if elapsed >= timeout {
                return Some(AbandonReason::Timeout);
            }
        }
        None
    }

    fn release_frames(&mut self, state: &mut State) {
        for frame in state.frames.drain(..) {
            self.arena.release(frame);
        }
    }

    fn abandon_all(&mut self, reason: AbandonReason) {
        let states: Vec<State> = self.active.drain(..).collect();
        warn!("abandoning {} active states: {}", states.len(), reason);
        for mut state in states {
            self.release_frames(&mut state);
            self.abandoned.push(AbandonedState {
                state: state.id,
                reason: reason.clone(),
            });
        }
    }

    /// Remove one active state without aborting the run
    ///
    /// Returns false when no active state has that id.
    pub fn abandon(&mut self, id: StateId, reason: impl Into<String>) -> bool {
        let Some(index) = self.active.iter().position(|s| s.id == id) else {
            return false;
        };
        let mut state = self.take_active(index);
        self.release_frames(&mut state);
        let reason = AbandonReason::Requested(reason.into());
        warn!("abandoning state {}: {}", id, reason);
        self.abandoned.push(AbandonedState { state: id, reason });
        true
    }

    /// Take a state out of the active set, keeping the scheduler in step
    fn take_active(&mut self, index: usize) -> State {
        self.scheduler.removed(index);
        self.active.remove(index)
    }

    fn retire(&mut self, index: usize) -> StateId {
        let mut state = self.take_active(index);
        self.release_frames(&mut state);
        trace!(
            "state {} retired with {} constraints",
            state.id,
            state.constraints.len()
        );
        let id = state.id;
        self.retired.push(state);
        id
    }

    fn push_frame(&mut self, index: usize, function: &Function, target: BlockId, from: BlockId) {
        if let Some(block) = function.block(target) {
            let frame = self
                .arena
                .alloc(BlockFrame::new(target, block.len(), Some(from)));
            self.active[index].frames.push(frame);
        }
    }

    /// Pop the innermost frame of a state
    fn pop_frame(&mut self, index: usize) {
        if let Some(frame) = self.active[index].frames.pop() {
            self.arena.release(frame);
        }
    }

    /// Move the cursor of the innermost frame, popping it when the block is done
    fn advance(&mut self, index: usize) {
        let Some(top) = self.active[index].top() else {
            return;
        };
        let Some((id, frame)) = self.arena.make_mut(top) else {
            return;
        };
        frame.advance();
        let exhausted = frame.is_exhausted();
        if let Some(slot) = self.active[index].frames.last_mut() {
            *slot = id;
        }
        if exhausted {
            self.pop_frame(index);
        }
    }

    fn jump(&mut self, index: usize, function: &Function, from: BlockId, target: BlockId) {
        if function.is_back_edge(from, target) {
            let bound = self.config.loop_bound;
            let state = &mut self.active[index];
            state.loop_iterations += 1;
            let count = state.loop_counts.entry(target).or_insert(0);
            if *count >= bound {
                self.stats.loop_cutoffs += 1;
                debug!(
                    "state {}: cut back-edge {} -> {} after {} re-entries",
                    state.id, from, target, count
                );
                return;
            }
            *count += 1;
        }
        self.push_frame(index, function, target, from);
    }

    fn fork(
        &mut self,
        index: usize,
        function: &Function,
        from: BlockId,
        condition: Bool,
        then_block: BlockId,
        else_block: BlockId,
    ) -> StepOutcome {
        let at_cap = self
            .config
            .budget
            .max_active_states
            .is_some_and(|cap| self.active.len() >= cap);

        let child_id = self.fresh_id();
        let mut child = self.active[index].fork(child_id);
        for frame in &child.frames {
            self.arena.retain(*frame);
        }

        let parent_id = self.active[index].id;
        self.active[index].constraints.push(condition.clone());
        self.push_frame(index, function, then_block, from);
        child.constraints.push(condition.not());
        if let Some(block) = function.block(else_block) {
            let frame = self
                .arena
                .alloc(BlockFrame::new(else_block, block.len(), Some(from)));
            child.frames.push(frame);
        }
        self.stats.forks += 1;
        debug!(
            "fork at block {}: {} -> {}, {} -> {}",
            from, parent_id, then_block, child_id, else_block
        );

        if self.active[index].is_finished() {
            self.retire(index);
        }

        if at_cap {
            self.release_frames(&mut child);
            warn!("state {} abandoned: {}", child_id, AbandonReason::StateLimit);
            self.abandoned.push(AbandonedState {
                state: child_id,
                reason: AbandonReason::StateLimit,
            });
        } else {
            self.stats.states_created += 1;
            self.scheduler.insert(&mut self.active, child);
            self.stats.max_active_states = self.stats.max_active_states.max(self.active.len());
        }

        StepOutcome::Forked {
            parent: parent_id,
            child: child_id,
        }
    }

    /// Advance one state by one instruction
    pub fn step(&mut self) -> StepOutcome {
        let Some(function) = self.function else {
            return StepOutcome::Idle;
        };
        if self.active.is_empty() {
            return StepOutcome::Idle;
        }
        if let Some(reason) = self.budget_exceeded() {
            self.abandon_all(reason);
            return StepOutcome::BudgetExhausted;
        }

        let Some((_, index)) = self.scheduler.pick(&self.active) else {
            return StepOutcome::Idle;
        };
        self.stats.steps += 1;
        let id = self.active[index].id;

        let Some(top) = self.active[index].top() else {
            return StepOutcome::Retired(self.retire(index));
        };
        let Some(frame) = self.arena.get(top).copied() else {
            return StepOutcome::Retired(self.retire(index));
        };
        let instruction = function
            .block(frame.block)
            .and_then(|block| block.instructions.get(frame.cursor));
        let Some(instruction) = instruction.filter(|_| !frame.is_exhausted()) else {
            self.pop_frame(index);
            if self.active[index].is_finished() {
                return StepOutcome::Retired(self.retire(index));
            }
            return StepOutcome::Advanced(id);
        };

        let result = {
            let state = &mut self.active[index];
            let mut ctx = TranslationContext::new(
                &mut state.memory,
                &mut self.registry,
                function,
                frame.incoming,
            );
            translate(instruction, &mut ctx)
        };
        let translation = match result {
            Ok(translation) => translation,
            Err(error) => {
                warn!("state {} failed at '{}': {}", id, instruction, error);
                let mut state = self.take_active(index);
                self.release_frames(&mut state);
                self.failed.push(FailedState {
                    state: id,
                    error,
                    instruction: instruction.to_string(),
                });
                return StepOutcome::Failed(id);
            }
        };
        trace!("state {} @{}:{}: {}", id, frame.block, frame.cursor, instruction);

        self.advance(index);

        match translation.control {
            Control::Continue => self.active[index].constraints.push(translation.constraint),
            Control::Stub(kind) => {
                debug!("state {}: {} is not modeled", id, kind);
                *self.stubbed.entry(kind).or_insert(0) += 1;
            }
            Control::Jump(target) => self.jump(index, function, frame.block, target),
            Control::Branch {
                then_block,
                else_block,
            } => {
                return self.fork(
                    index,
                    function,
                    frame.block,
                    translation.constraint,
                    then_block,
                    else_block,
                );
            }
        }

        if self.active[index].is_finished() {
            return StepOutcome::Retired(self.retire(index));
        }
        StepOutcome::Advanced(id)
    }

    /// Step until no active state remains
    pub fn run(&mut self) {
        while self.has_next() {
            if self.step() == StepOutcome::BudgetExhausted {
                break;
            }
        }
    }

    /// Check every retired state and assemble the report
    ///
    /// States still active are abandoned first.
    pub fn finish(&mut self, solver: &mut dyn ConstraintSolver) -> ExplorationReport {
        if !self.active.is_empty() {
            self.abandon_all(AbandonReason::Requested("unfinished".to_string()));
        }

        let queries_before = solver.queries();
        let retired = std::mem::take(&mut self.retired);
        let function = self.function;
        let paths: Vec<PathReport> = retired
            .iter()
            .map(|state| {
                let observe = function.map(|f| observed(f, state)).unwrap_or_default();
                PathReport {
                    state: state.id,
                    constraints: state.constraints.len(),
                    loop_iterations: state.loop_iterations,
                    verdict: solver.check_path(&state.constraints, &observe),
                }
            })
            .collect();

        let mut statistics = self.stats.clone();
        statistics.solver_queries = solver.queries() - queries_before;
        statistics.elapsed_time = self.started_at.map(|t| t.elapsed()).unwrap_or_default();

        let report = ExplorationReport {
            function: function.map(|f| f.name.clone()).unwrap_or_default(),
            signal: self.signal,
            paths,
            failed: std::mem::take(&mut self.failed),
            abandoned: std::mem::take(&mut self.abandoned),
            stubbed: std::mem::take(&mut self.stubbed),
            statistics,
        };
        info!(
            "{}: {} paths, {} satisfiable, {} failed, {} abandoned",
            report.function,
            report.paths.len(),
            report.satisfiable().count(),
            report.failed.len(),
            report.abandoned.len()
        );
        report
    }

    /// Start, run and finish in one call
    pub fn explore(
        &mut self,
        function: &'p Function,
        solver: &mut dyn ConstraintSolver,
    ) -> ExplorationReport {
        if let StartOutcome::Started(_) = self.start(function) {
            self.run();
        }
        self.finish(solver)
    }

    pub fn active(&self) -> &[State] {
        &self.active
    }

    pub fn retired(&self) -> &[State] {
        &self.retired
    }

    pub fn failed(&self) -> &[FailedState] {
        &self.failed
    }

    pub fn abandoned(&self) -> &[AbandonedState] {
        &self.abandoned
    }

    pub fn stubbed(&self) -> &BTreeMap<InstrKind, usize> {
        &self.stubbed
    }

    pub fn statistics(&self) -> &ExplorationStatistics {
        &self.stats
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn arena(&self) -> &FrameArena {
        &self.arena
    }

    pub fn signal(&self) -> Option<TerminalSignal> {
        self.signal
    }
}

/// Values worth reading back from a model: the parameters, then the returned values
fn observed(function: &Function, state: &State) -> Vec<(String, Dynamic)> {
    let mut values: Vec<(String, Dynamic)> = function
        .params
        .iter()
        .filter_map(|p| {
            state
                .memory
                .get(&p.name)
                .map(|v| (p.name.clone(), v.value.clone()))
        })
        .collect();
    let mut i = 0;
    while let Some(var) = state.memory.get(&format!("$ret{}", i)) {
        values.push((format!("$ret{}", i), var.value.clone()));
        i += 1;
    }
    values
}
