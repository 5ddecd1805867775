//! Exploration results and statistics

use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::SchedulerKind;
use crate::engine::{StateId, TerminalSignal};
use crate::error::TranslateError;
use crate::ir::InstrKind;
use crate::solver::PathVerdict;

/// One retired state and the solver's verdict on its path condition
#[derive(Debug, Clone)]
pub struct PathReport {
    pub state: StateId,
    /// Number of constraints on the path
    pub constraints: usize,
    pub loop_iterations: u32,
    pub verdict: PathVerdict,
}

/// A state removed because one of its instructions failed to translate
#[derive(Debug, Clone)]
pub struct FailedState {
    pub state: StateId,
    pub error: TranslateError,
    /// Listing text of the offending instruction
    pub instruction: String,
}

/// Why a state stopped before finishing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbandonReason {
    /// The step budget ran out
    StepLimit,
    /// The wall-clock budget ran out
    Timeout,
    /// A fork would have exceeded the active-state cap
    StateLimit,
    /// Removed through `Engine::abandon`
    Requested(String),
}

impl std::fmt::Display for AbandonReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbandonReason::StepLimit => write!(f, "step limit reached"),
            AbandonReason::Timeout => write!(f, "timeout"),
            AbandonReason::StateLimit => write!(f, "active-state limit reached"),
            AbandonReason::Requested(reason) => write!(f, "{}", reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AbandonedState {
    pub state: StateId,
    pub reason: AbandonReason,
}

/// Statistics from one exploration run
#[derive(Debug, Clone, Default)]
pub struct ExplorationStatistics {
    /// Scheduler used for the run
    pub scheduler: SchedulerKind,
    /// Time between `start` and `finish`
    pub elapsed_time: Duration,
    /// Number of `step` calls that did work
    pub steps: u64,
    /// Number of two-way branches that forked a state
    pub forks: u64,
    /// Number of states ever created (the initial one included)
    pub states_created: u64,
    /// Largest number of simultaneously active states
    pub max_active_states: usize,
    /// Number of back-edges cut off
    pub loop_cutoffs: u64,
    /// Number of solver checks
    pub solver_queries: u64,
}

impl ExplorationStatistics {
    pub fn new(scheduler: SchedulerKind) -> Self {
        Self {
            scheduler,
            ..Default::default()
        }
    }

    /// Get the fraction of steps that forked (0.0 to 1.0)
    pub fn fork_rate(&self) -> f64 {
        if self.steps == 0 {
            0.0
        } else {
            self.forks as f64 / self.steps as f64
        }
    }

    /// Get steps executed per second
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed_time.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.steps as f64 / secs
        }
    }

    /// Format statistics as a human-readable string
    pub fn format_summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!("Scheduler: {}\n", self.scheduler));
        s.push_str(&format!("Time: {:.2?}\n", self.elapsed_time));
        s.push_str(&format!("Steps: {}\n", self.steps));
        s.push_str(&format!("Throughput: {:.0} steps/sec\n", self.throughput()));
        s.push_str(&format!("States created: {}\n", self.states_created));
        s.push_str(&format!("Max active states: {}\n", self.max_active_states));

        if self.forks > 0 {
            s.push_str(&format!("Forks: {}\n", self.forks));
            s.push_str(&format!("Fork rate: {:.2}%\n", self.fork_rate() * 100.0));
        }
        if self.loop_cutoffs > 0 {
            s.push_str(&format!("Loop cutoffs: {}\n", self.loop_cutoffs));
        }
        if self.solver_queries > 0 {
            s.push_str(&format!("Solver queries: {}\n", self.solver_queries));
        }

        s
    }
}

/// Everything an exploration run produced
#[derive(Debug, Clone)]
pub struct ExplorationReport {
    pub function: String,
    /// Set when `start` refused the function
    pub signal: Option<TerminalSignal>,
    pub paths: Vec<PathReport>,
    pub failed: Vec<FailedState>,
    pub abandoned: Vec<AbandonedState>,
    /// Unmodeled instruction kinds encountered, with counts
    pub stubbed: BTreeMap<InstrKind, usize>,
    pub statistics: ExplorationStatistics,
}

impl ExplorationReport {
    pub fn satisfiable(&self) -> impl Iterator<Item = &PathReport> {
        self.paths
            .iter()
            .filter(|p| matches!(p.verdict, PathVerdict::Sat(_)))
    }

    pub fn unsatisfiable(&self) -> impl Iterator<Item = &PathReport> {
        self.paths
            .iter()
            .filter(|p| matches!(p.verdict, PathVerdict::Unsat(_)))
    }

    pub fn unknown(&self) -> impl Iterator<Item = &PathReport> {
        self.paths
            .iter()
            .filter(|p| matches!(p.verdict, PathVerdict::Unknown(_)))
    }

    /// Look up the report of one path
    pub fn path(&self, state: StateId) -> Option<&PathReport> {
        self.paths.iter().find(|p| p.state == state)
    }
}

impl std::fmt::Display for ExplorationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Function: {}", self.function)?;
        if let Some(signal) = &self.signal {
            writeln!(f, "Not explored: {}", signal)?;
            return Ok(());
        }

        writeln!(
            f,
            "Paths: {} ({} satisfiable, {} unsatisfiable, {} unknown)",
            self.paths.len(),
            self.satisfiable().count(),
            self.unsatisfiable().count(),
            self.unknown().count()
        )?;
        for path in &self.paths {
            match &path.verdict {
                PathVerdict::Sat(values) => {
                    let model = values
                        .iter()
                        .map(|(name, value)| format!("{} = {}", name, value))
                        .collect::<Vec<_>>()
                        .join(", ");
                    writeln!(f, "  {} sat [{}]", path.state, model)?;
                }
                PathVerdict::Unsat(core) => {
                    writeln!(f, "  {} unsat, core {:?}", path.state, core)?;
                }
                PathVerdict::Unknown(reason) => {
                    writeln!(f, "  {} unknown ({})", path.state, reason)?;
                }
            }
        }

        if !self.failed.is_empty() {
            writeln!(f, "Failed states: {}", self.failed.len())?;
            for failed in &self.failed {
                writeln!(
                    f,
                    "  {} at '{}': {}",
                    failed.state, failed.instruction, failed.error
                )?;
            }
        }
        if !self.abandoned.is_empty() {
            writeln!(f, "Abandoned states: {}", self.abandoned.len())?;
            for abandoned in &self.abandoned {
                writeln!(f, "  {}: {}", abandoned.state, abandoned.reason)?;
            }
        }
        if !self.stubbed.is_empty() {
            let kinds = self
                .stubbed
                .iter()
                .map(|(kind, count)| format!("{} x{}", kind, count))
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(f, "Unmodeled instructions: {}", kinds)?;
        }

        write!(f, "{}", self.statistics.format_summary())
    }
}
