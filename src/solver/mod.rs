//! Constraint solving for finished paths
//!
//! [`ConstraintSolver`] is the capability the engine needs from an SMT backend; [`Z3Solver`]
//! provides it over one Z3 session. Paths are checked one at a time, each inside its own
//! push/pop scope, with every constraint tracked so an unsatisfiable path reports which of
//! its constraints conflict.

use std::time::Duration;

use log::debug;
use z3::ast::{Bool, Dynamic};
use z3::{Model, Params, SatResult, Solver};

/// Configuration for the SMT solver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverConfig {
    /// Timeout per query (None means no timeout)
    pub timeout: Option<Duration>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl SolverConfig {
    /// Create a config with no timeout
    pub fn no_timeout() -> Self {
        Self { timeout: None }
    }

    /// Create a config with a specific timeout in seconds
    pub fn with_timeout_secs(secs: u64) -> Self {
        Self {
            timeout: Some(Duration::from_secs(secs)),
        }
    }

    /// Create a config with a specific timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// Create a Z3 solver with the given configuration
pub fn create_solver_with_config(cfg: &SolverConfig) -> Solver {
    let solver = Solver::new();
    if let Some(timeout) = cfg.timeout {
        let mut params = Params::new();
        params.set_u32("timeout", timeout.as_millis() as u32);
        solver.set_params(&params);
    }
    solver
}

/// A named soft constraint
#[derive(Debug, Clone)]
pub struct Assumption {
    pub name: String,
    pub expr: Bool,
}

impl Assumption {
    pub fn new(name: impl Into<String>, expr: Bool) -> Self {
        Self {
            name: name.into(),
            expr,
        }
    }
}

/// Result of checking one path condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathVerdict {
    /// Satisfiable; the observed values in one witness model, as `(name, value)` pairs
    Sat(Vec<(String, String)>),
    /// Unsatisfiable; indices of the constraints in the unsat core
    Unsat(Vec<usize>),
    /// The solver gave up, with its reason
    Unknown(String),
}

impl PathVerdict {
    pub fn is_sat(&self) -> bool {
        matches!(self, PathVerdict::Sat(_))
    }
}

/// Result of checking soft assumptions against hard constraints
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssumptionVerdict {
    Sat,
    /// Names of the assumptions in the unsat core
    Unsat(Vec<String>),
    Unknown(String),
}

const TRACK_PREFIX: &str = "__c";
const ASSUME_PREFIX: &str = "__a";

/// SMT capabilities used to decide path feasibility
pub trait ConstraintSolver {
    fn assert(&mut self, constraint: &Bool);

    /// Assert `constraint` under a label that can show up in an unsat core
    fn assert_tracked(&mut self, constraint: &Bool, label: &str);

    fn check(&mut self) -> SatResult;

    fn check_assumptions(&mut self, assumptions: &[Bool]) -> SatResult;

    /// Model of the last satisfiable check
    fn model(&self) -> Option<Model>;

    fn push(&mut self);

    fn pop(&mut self);

    /// Labels or assumptions of the last unsatisfiable check
    fn unsat_core(&self) -> Vec<Bool>;

    fn reason_unknown(&self) -> String;

    /// Number of satisfiability checks issued so far
    fn queries(&self) -> u64;

    /// Check a conjunction of constraints in a fresh scope
    ///
    /// On SAT the `observe` values are evaluated in the model; on UNSAT the core is reported
    /// as constraint indices.
    fn check_path(&mut self, constraints: &[Bool], observe: &[(String, Dynamic)]) -> PathVerdict {
        self.push();
        for (i, constraint) in constraints.iter().enumerate() {
            self.assert_tracked(constraint, &format!("{}{}", TRACK_PREFIX, i));
        }

        let verdict = match self.check() {
            SatResult::Sat => {
                let values = self
                    .model()
                    .map(|model| {
                        observe
                            .iter()
                            .filter_map(|(name, value)| {
                                model
                                    .eval(value, true)
                                    .map(|v| (name.clone(), v.to_string()))
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                PathVerdict::Sat(values)
            }
            SatResult::Unsat => {
                let mut core: Vec<usize> = self
                    .unsat_core()
                    .iter()
                    .filter_map(|label| {
                        label
                            .to_string()
                            .strip_prefix(TRACK_PREFIX)
                            .and_then(|i| i.parse().ok())
                    })
                    .collect();
                core.sort_unstable();
                PathVerdict::Unsat(core)
            }
            SatResult::Unknown => PathVerdict::Unknown(self.reason_unknown()),
        };

        self.pop();
        verdict
    }

    /// Check hard constraints together with named soft assumptions
    fn check_with_assumptions(&mut self, hard: &[Bool], soft: &[Assumption]) -> AssumptionVerdict {
        self.push();
        for constraint in hard {
            self.assert(constraint);
        }
        let labels: Vec<Bool> = soft
            .iter()
            .enumerate()
            .map(|(i, assumption)| {
                let label = Bool::new_const(format!("{}{}", ASSUME_PREFIX, i));
                self.assert(&label.implies(&assumption.expr));
                label
            })
            .collect();

        let verdict = match self.check_assumptions(&labels) {
            SatResult::Sat => AssumptionVerdict::Sat,
            SatResult::Unsat => {
                let core: Vec<String> = self.unsat_core().iter().map(|b| b.to_string()).collect();
                AssumptionVerdict::Unsat(
                    soft.iter()
                        .zip(&labels)
                        .filter(|(_, label)| core.contains(&label.to_string()))
                        .map(|(assumption, _)| assumption.name.clone())
                        .collect(),
                )
            }
            SatResult::Unknown => AssumptionVerdict::Unknown(self.reason_unknown()),
        };

        self.pop();
        verdict
    }
}

/// [`ConstraintSolver`] over a single Z3 session
pub struct Z3Solver {
    solver: Solver,
    queries: u64,
}

impl Z3Solver {
    pub fn new(config: &SolverConfig) -> Self {
        Self {
            solver: create_solver_with_config(config),
            queries: 0,
        }
    }
}

impl Default for Z3Solver {
    fn default() -> Self {
        Self::new(&SolverConfig::default())
    }
}

impl ConstraintSolver for Z3Solver {
    fn assert(&mut self, constraint: &Bool) {
        self.solver.assert(constraint);
    }

    fn assert_tracked(&mut self, constraint: &Bool, label: &str) {
        self.solver
            .assert_and_track(constraint, &Bool::new_const(label));
    }

    fn check(&mut self) -> SatResult {
        self.queries += 1;
        let result = self.solver.check();
        debug!("solver check #{}: {:?}", self.queries, result);
        result
    }

    fn check_assumptions(&mut self, assumptions: &[Bool]) -> SatResult {
        self.queries += 1;
        let result = self.solver.check_assumptions(assumptions);
        debug!(
            "solver check #{} with {} assumptions: {:?}",
            self.queries,
            assumptions.len(),
            result
        );
        result
    }

    fn model(&self) -> Option<Model> {
        self.solver.get_model()
    }

    fn push(&mut self) {
        self.solver.push();
    }

    fn pop(&mut self) {
        self.solver.pop(1);
    }

    fn unsat_core(&self) -> Vec<Bool> {
        self.solver.get_unsat_core()
    }

    fn reason_unknown(&self) -> String {
        self.solver
            .get_reason_unknown()
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn queries(&self) -> u64 {
        self.queries
    }
}
