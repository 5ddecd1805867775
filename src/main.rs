use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;

use ssa_symex::config::{Budget, EngineConfig, SchedulerKind};
use ssa_symex::engine::Engine;
use ssa_symex::ir::Function;
use ssa_symex::solver::{SolverConfig, Z3Solver};
use ssa_symex::{find_function, load_program};

// --- Command Line Arguments ---

#[derive(Parser)]
#[command(name = "symex")]
#[command(about = "symex - symbolic execution of SSA listings")]
#[command(version)]
#[command(subcommand_required = true)]
#[command(arg_required_else_help = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

/// CLI scheduler selection
#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliScheduler {
    /// Cycle through active states in order
    RoundRobin,
    /// Pick a random active state
    Random,
    /// Continue the newest state first
    Dfs,
    /// Run new states after the ones already waiting
    Bfs,
    /// Prefer states with the fewest loop back-edges
    MinLoop,
}

impl From<CliScheduler> for SchedulerKind {
    fn from(cli: CliScheduler) -> Self {
        match cli {
            CliScheduler::RoundRobin => SchedulerKind::RoundRobin,
            CliScheduler::Random => SchedulerKind::Random,
            CliScheduler::Dfs => SchedulerKind::DepthFirst,
            CliScheduler::Bfs => SchedulerKind::BreadthFirst,
            CliScheduler::MinLoop => SchedulerKind::MinLoop,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Explore the paths of one function, or of every function in the listing
    Run {
        /// Path to the SSA listing
        file: PathBuf,
        /// Function to explore (all functions if not specified)
        #[arg(long, short)]
        function: Option<String>,

        // --- Scheduling ---
        /// Scheduling strategy
        #[arg(long, value_enum, default_value = "round-robin")]
        scheduler: CliScheduler,
        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        // --- Budgets ---
        /// Maximum number of engine steps
        #[arg(long, default_value = "1000000")]
        max_steps: u64,
        /// Maximum number of simultaneously active states
        #[arg(long, default_value = "10000")]
        max_states: usize,
        /// Timeout in seconds for the exploration
        #[arg(long)]
        timeout: Option<u64>,
        /// Times each loop header may be re-entered (0 cuts every back-edge)
        #[arg(long, default_value = "0")]
        loop_bound: u32,

        // --- Solver ---
        /// Solver timeout in seconds
        #[arg(long, default_value = "30")]
        solver_timeout: u64,

        /// Enable verbose output
        #[arg(long, short)]
        verbose: bool,
    },
    /// List the functions of a listing
    Functions {
        /// Path to the SSA listing
        file: PathBuf,
    },
    /// Print a parsed listing back
    Show {
        /// Path to the SSA listing
        file: PathBuf,
        /// Only print this function
        #[arg(long, short)]
        function: Option<String>,
    },
}

/// Options for an exploration run
struct RunOptions {
    function: Option<String>,
    config: EngineConfig,
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_module("ssa_symex", level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .init();
}

// --- Exploration ---

fn explore_function(function: &Function, options: &RunOptions) {
    let mut engine = Engine::new(options.config.clone());
    let mut solver = Z3Solver::new(&options.config.solver);
    let report = engine.explore(function, &mut solver);

    print!("{}", report);
    println!();
}

fn run_listing(path: &Path, options: &RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    let program = load_program(path)?;

    match &options.function {
        Some(name) => explore_function(find_function(&program, name)?, options),
        None => {
            for function in &program.functions {
                explore_function(function, options);
            }
        }
    }

    Ok(())
}

fn list_functions(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let program = load_program(path)?;
    for function in &program.functions {
        if function.is_external() {
            println!("{} (external)", function.name);
        } else {
            println!(
                "{} ({} params, {} blocks, {} instructions)",
                function.name,
                function.params.len(),
                function.block_count(),
                function.instruction_count()
            );
        }
    }
    Ok(())
}

fn show_listing(path: &Path, function: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let program = load_program(path)?;
    match function {
        Some(name) => print!("{}", find_function(&program, name)?),
        None => {
            for function in &program.functions {
                print!("{}", function);
            }
        }
    }
    Ok(())
}

fn main() {
    let args = Args::parse();

    let result = match args.command {
        Commands::Run {
            file,
            function,
            scheduler,
            seed,
            max_steps,
            max_states,
            timeout,
            loop_bound,
            solver_timeout,
            verbose,
        } => {
            init_logging(verbose);

            let mut budget = Budget::unlimited()
                .with_max_steps(max_steps)
                .with_max_active_states(max_states);
            if let Some(secs) = timeout {
                budget = budget.with_timeout(Duration::from_secs(secs));
            }

            let config = EngineConfig::default()
                .with_scheduler(scheduler.into())
                .with_seed_option(seed)
                .with_budget(budget)
                .with_loop_bound(loop_bound)
                .with_solver(SolverConfig::with_timeout_secs(solver_timeout));

            let options = RunOptions { function, config };
            run_listing(&file, &options)
        }
        Commands::Functions { file } => {
            init_logging(false);
            list_functions(&file)
        }
        Commands::Show { file, function } => {
            init_logging(false);
            show_listing(&file, function.as_deref())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
