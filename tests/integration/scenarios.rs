use std::path::PathBuf;

use ssa_symex::config::{Budget, EngineConfig, SchedulerKind};
use ssa_symex::engine::{Engine, StartOutcome, State, TerminalSignal};
use ssa_symex::ir::Program;
use ssa_symex::report::AbandonReason;
use ssa_symex::solver::{Assumption, AssumptionVerdict, PathVerdict, SolverConfig, Z3Solver};
use ssa_symex::{find_function, load_program};
use z3::ast::BV;

fn listing(name: &str) -> Program {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join(name);
    load_program(&path).unwrap_or_else(|e| panic!("failed to load {}: {}", name, e))
}

fn solver() -> Z3Solver {
    Z3Solver::new(&SolverConfig::no_timeout())
}

/// Whether the path condition of `state` admits the given integer parameter values
fn admits(state: &State, values: &[(&str, i64)]) -> bool {
    let soft: Vec<Assumption> = values
        .iter()
        .map(|(name, value)| {
            let var = state.memory.get(name).unwrap().value.as_bv().unwrap();
            Assumption::new(*name, var.eq(&BV::from_i64(*value, 64)))
        })
        .collect();
    solver().check_with_assumptions(&state.constraints, &soft) == AssumptionVerdict::Sat
}

#[test]
fn test_max_paths_split_on_comparison() {
    let program = listing("max.ssa");
    let function = find_function(&program, "max").unwrap();
    let mut engine = Engine::new(EngineConfig::default());

    assert!(matches!(engine.start(function), StartOutcome::Started(_)));
    engine.run();

    let retired = engine.retired();
    assert_eq!(retired.len(), 2);
    assert!(engine.failed().is_empty());

    let greater: Vec<_> = retired.iter().filter(|s| admits(s, &[("a", 1), ("b", 0)])).collect();
    let equal: Vec<_> = retired.iter().filter(|s| admits(s, &[("a", 0), ("b", 0)])).collect();
    assert_eq!(greater.len(), 1);
    assert_eq!(equal.len(), 1);
    assert_ne!(greater[0].id, equal[0].id);

    let report = engine.finish(&mut solver());
    assert_eq!(report.satisfiable().count(), 2);
}

#[test]
fn test_max_return_values_follow_branch() {
    let program = listing("max.ssa");
    let mut engine = Engine::new(EngineConfig::default());
    let report = engine.explore(find_function(&program, "max").unwrap(), &mut solver());

    let mut returned: Vec<String> = report
        .paths
        .iter()
        .map(|path| match &path.verdict {
            PathVerdict::Sat(values) => values
                .iter()
                .find(|(name, _)| name == "$ret0")
                .map(|(_, value)| value.clone())
                .unwrap(),
            other => panic!("expected sat, got {:?}", other),
        })
        .collect();
    returned.sort();
    assert_eq!(returned, vec!["#x0000000000000001", "#x0000000000000002"]);
}

#[test]
fn test_index_has_single_unbounded_path() {
    let program = listing("index.ssa");
    let mut engine = Engine::new(EngineConfig::default());
    let report = engine.explore(find_function(&program, "index").unwrap(), &mut solver());

    assert_eq!(report.paths.len(), 1);
    assert!(report.paths[0].verdict.is_sat());
    assert_eq!(report.statistics.forks, 0);
    assert!(report.failed.is_empty());
}

#[test]
fn test_index_admits_negative_index() {
    let program = listing("index.ssa");
    let mut engine = Engine::new(EngineConfig::default());
    engine.start(find_function(&program, "index").unwrap());
    engine.run();

    let state = &engine.retired()[0];
    assert!(admits(state, &[("i", -1)]));
    assert!(admits(state, &[("i", 1 << 40)]));
}

#[test]
fn test_loop_back_edge_is_not_reentered() {
    let program = listing("loop.ssa");
    let mut engine = Engine::new(EngineConfig::default());
    let report = engine.explore(find_function(&program, "count").unwrap(), &mut solver());

    assert_eq!(report.paths.len(), 2);
    assert_eq!(report.statistics.loop_cutoffs, 1);
    assert_eq!(report.statistics.forks, 1);
    assert!(report.abandoned.is_empty());
}

#[test]
fn test_loop_bound_unrolls() {
    let program = listing("loop.ssa");
    let config = EngineConfig::default().with_loop_bound(3);
    let mut engine = Engine::new(config);
    let report = engine.explore(find_function(&program, "count").unwrap(), &mut solver());

    assert_eq!(report.paths.len(), 5);
    assert_eq!(report.statistics.forks, 4);
    assert_eq!(
        report.paths.iter().map(|p| p.loop_iterations).max(),
        Some(4)
    );
}

#[test]
fn test_struct_fields_give_four_quadrants() {
    let program = listing("point.ssa");
    let mut engine = Engine::new(EngineConfig::default());
    let report = engine.explore(find_function(&program, "quadrant").unwrap(), &mut solver());

    assert_eq!(report.paths.len(), 4);
    assert_eq!(report.satisfiable().count(), 4);
}

#[test]
fn test_contradictory_path_is_unsat() {
    let program = listing("contradiction.ssa");
    let mut engine = Engine::new(EngineConfig::default());
    let report = engine.explore(find_function(&program, "never").unwrap(), &mut solver());

    assert_eq!(report.paths.len(), 3);
    assert_eq!(report.satisfiable().count(), 2);
    let unsat: Vec<_> = report.unsatisfiable().collect();
    assert_eq!(unsat.len(), 1);
    match &unsat[0].verdict {
        PathVerdict::Unsat(core) => assert!(!core.is_empty()),
        other => panic!("expected unsat, got {:?}", other),
    }
}

#[test]
fn test_complex_equality() {
    let program = listing("complex.ssa");
    let mut engine = Engine::new(EngineConfig::default());
    let report = engine.explore(find_function(&program, "same").unwrap(), &mut solver());

    assert_eq!(report.paths.len(), 2);
    assert_eq!(report.satisfiable().count(), 2);
}

#[test]
fn test_calls_and_unmodeled_instructions() {
    let program = listing("calls.ssa");
    let mut engine = Engine::new(EngineConfig::default());
    let report = engine.explore(find_function(&program, "lookup").unwrap(), &mut solver());

    assert!(report.failed.is_empty());
    assert_eq!(report.paths.len(), 3);
    assert_eq!(report.satisfiable().count(), 3);
    assert_eq!(report.stubbed.values().sum::<usize>(), 1);
}

#[test]
fn test_functions_that_are_not_explored() {
    let program = listing("calls.ssa");

    let mut engine = Engine::new(EngineConfig::default());
    let report = engine.explore(find_function(&program, "hash").unwrap(), &mut solver());
    assert_eq!(report.signal, Some(TerminalSignal::ExternalFunction));
    assert!(report.paths.is_empty());

    let mut engine = Engine::new(EngineConfig::default());
    let report = engine.explore(find_function(&program, "init").unwrap(), &mut solver());
    assert_eq!(report.signal, Some(TerminalSignal::InitFunction));
    assert_eq!(report.statistics.steps, 0);
}

#[test]
fn test_all_schedulers_agree_on_paths() {
    let program = listing("point.ssa");
    let function = find_function(&program, "quadrant").unwrap();
    for kind in SchedulerKind::ALL {
        let config = EngineConfig::default().with_scheduler(kind).with_seed(3);
        let mut engine = Engine::new(config);
        let report = engine.explore(function, &mut solver());
        assert_eq!(report.paths.len(), 4, "scheduler {}", kind);
        assert_eq!(report.statistics.forks, 3, "scheduler {}", kind);
    }
}

#[test]
fn test_depth_first_finishes_a_path_before_siblings() {
    let program = listing("point.ssa");
    let config = EngineConfig::default().with_scheduler(SchedulerKind::DepthFirst);
    let mut engine = Engine::new(config);
    engine.start(find_function(&program, "quadrant").unwrap());
    while engine.retired().is_empty() {
        engine.step();
    }
    // the first finished path leaves exactly the siblings forked along the way
    assert_eq!(engine.active().len(), 2);
}

#[test]
fn test_step_budget() {
    let program = listing("point.ssa");
    let config = EngineConfig::default().with_budget(Budget::unlimited().with_max_steps(8));
    let mut engine = Engine::new(config);
    let report = engine.explore(find_function(&program, "quadrant").unwrap(), &mut solver());

    assert_eq!(report.statistics.steps, 8);
    assert!(!report.abandoned.is_empty());
    assert!(report
        .abandoned
        .iter()
        .all(|a| a.reason == AbandonReason::StepLimit));
}
