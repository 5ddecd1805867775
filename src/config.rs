//! Configuration types for exploration runs

use crate::solver::SolverConfig;
use std::time::Duration;

/// Scheduling strategy selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SchedulerKind {
    /// Cycle through the active states in order
    #[default]
    RoundRobin,
    /// Uniformly random pick
    Random,
    /// Always continue the newest state
    DepthFirst,
    /// New states go to the front, picks cycle like round-robin
    BreadthFirst,
    /// Prefer the state that has taken the fewest loop back-edges
    MinLoop,
}

impl SchedulerKind {
    pub const ALL: [SchedulerKind; 5] = [
        SchedulerKind::RoundRobin,
        SchedulerKind::Random,
        SchedulerKind::DepthFirst,
        SchedulerKind::BreadthFirst,
        SchedulerKind::MinLoop,
    ];
}

impl std::fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerKind::RoundRobin => write!(f, "round-robin"),
            SchedulerKind::Random => write!(f, "random"),
            SchedulerKind::DepthFirst => write!(f, "dfs"),
            SchedulerKind::BreadthFirst => write!(f, "bfs"),
            SchedulerKind::MinLoop => write!(f, "min-loop"),
        }
    }
}

impl std::str::FromStr for SchedulerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "round-robin" | "rr" => Ok(SchedulerKind::RoundRobin),
            "random" | "rand" => Ok(SchedulerKind::Random),
            "dfs" | "depth-first" => Ok(SchedulerKind::DepthFirst),
            "bfs" | "breadth-first" => Ok(SchedulerKind::BreadthFirst),
            "min-loop" | "minloop" => Ok(SchedulerKind::MinLoop),
            _ => Err(format!(
                "Unknown scheduler: '{}'. Valid options: round-robin, random, dfs, bfs, min-loop",
                s
            )),
        }
    }
}

/// Limits that stop an exploration run early
///
/// Running out of steps or time abandons every remaining active state; the active-state cap
/// abandons individual forks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Budget {
    pub max_steps: Option<u64>,
    pub max_active_states: Option<usize>,
    pub timeout: Option<Duration>,
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            max_steps: Some(1_000_000),
            max_active_states: Some(10_000),
            timeout: None,
        }
    }
}

impl Budget {
    /// No limits at all
    pub fn unlimited() -> Self {
        Self {
            max_steps: None,
            max_active_states: None,
            timeout: None,
        }
    }

    pub fn with_max_steps(mut self, steps: u64) -> Self {
        self.max_steps = Some(steps);
        self
    }

    pub fn with_max_active_states(mut self, states: usize) -> Self {
        self.max_active_states = Some(states);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Configuration for one engine run
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub scheduler: SchedulerKind,
    /// Seed for the random scheduler (None = seeded from the OS)
    pub seed: Option<u64>,
    pub budget: Budget,
    /// How many times a state may re-enter one loop header; 0 cuts every back-edge
    pub loop_bound: u32,
    pub solver: SolverConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerKind::default(),
            seed: None,
            budget: Budget::default(),
            loop_bound: 0,
            solver: SolverConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_scheduler(mut self, scheduler: SchedulerKind) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_seed_option(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_loop_bound(mut self, bound: u32) -> Self {
        self.loop_bound = bound;
        self
    }

    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }
}
