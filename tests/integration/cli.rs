use std::path::PathBuf;
use std::process::{Command, Output};

fn testdata(name: &str) -> PathBuf {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join(name);
    if !path.exists() {
        panic!("Test listing not found: {:?}", path);
    }
    path
}

fn symex(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_symex"))
        .args(args)
        .output()
        .expect("Failed to execute symex")
}

#[test]
fn test_run_single_function() {
    let listing = testdata("max.ssa");
    let output = symex(&["run", listing.to_str().unwrap(), "--function", "max"]);

    assert!(
        output.status.success(),
        "Command failed with status: {:?}",
        output.status
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Function: max"));
    assert!(stdout.contains("Paths: 2 (2 satisfiable, 0 unsatisfiable, 0 unknown)"));
    assert!(stdout.contains("Forks: 1"));
}

#[test]
fn test_run_every_function() {
    let listing = testdata("calls.ssa");
    let output = symex(&["run", listing.to_str().unwrap(), "--scheduler", "dfs"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Function: hash"));
    assert!(stdout.contains("Not explored: external function"));
    assert!(stdout.contains("Not explored: init function"));
    assert!(stdout.contains("Function: lookup"));
    assert!(stdout.contains("Scheduler: dfs"));
    assert!(stdout.contains("Unmodeled instructions: MakeSlice x1"));
}

#[test]
fn test_run_with_loop_bound() {
    let listing = testdata("loop.ssa");
    let output = symex(&[
        "run",
        listing.to_str().unwrap(),
        "--loop-bound",
        "2",
        "--scheduler",
        "min-loop",
    ]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Paths: 4"));
    assert!(stdout.contains("Loop cutoffs: 1"));
}

#[test]
fn test_unknown_function_fails() {
    let listing = testdata("max.ssa");
    let output = symex(&["run", listing.to_str().unwrap(), "--function", "min"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown function 'min'. Available: max"));
}

#[test]
fn test_functions_listing() {
    let listing = testdata("calls.ssa");
    let output = symex(&["functions", listing.to_str().unwrap()]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "hash (external)");
    assert_eq!(lines[1], "init (0 params, 1 blocks, 1 instructions)");
    assert!(lines[2].starts_with("lookup (2 params, 4 blocks"));
}

#[test]
fn test_show_round_trips() {
    let listing = testdata("point.ssa");
    let output = symex(&["show", listing.to_str().unwrap()]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("func quadrant(p *Point) int\n0:\n"));
    assert!(stdout.contains("    t0 *int = &p.x [#0]\n"));
    assert!(stdout.contains("    if t2 goto 1 else 4\n"));
}

#[test]
fn test_missing_file_fails() {
    let output = symex(&["run", "/nonexistent/listing.ssa"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error: I/O error"));
}
