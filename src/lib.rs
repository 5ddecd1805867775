//! Symbolic execution of SSA-form functions
//!
//! A function listing is parsed into [`ir::Program`], then an [`engine::Engine`] explores its
//! paths: each instruction becomes an SMT constraint over Z3 terms, two-way branches fork the
//! exploration state, and a [`scheduler::Scheduler`] decides which state runs next. Finished
//! paths are checked with a [`solver::ConstraintSolver`].

pub mod config;
pub mod engine;
pub mod error;
pub mod ir;
pub mod memory;
pub mod parser;
pub mod report;
pub mod scheduler;
pub mod solver;
pub mod translate;

use std::path::Path;

pub use config::{Budget, EngineConfig, SchedulerKind};
pub use engine::{Engine, StartOutcome, StepOutcome, TerminalSignal};
pub use error::{Error, Result, TranslateError};
pub use report::ExplorationReport;

use ir::{Function, Program};

/// Read and parse a listing file
pub fn load_program(path: &Path) -> Result<Program> {
    let content = std::fs::read_to_string(path)?;
    Ok(parser::parse_program_string(
        &content,
        path.display().to_string(),
    )?)
}

/// Look up a function by name, listing the available ones on failure
pub fn find_function<'a>(program: &'a Program, name: &str) -> Result<&'a Function> {
    program.function(name).ok_or_else(|| Error::UnknownFunction {
        name: name.to_string(),
        available: program.function_names().collect::<Vec<_>>().join(", "),
    })
}
