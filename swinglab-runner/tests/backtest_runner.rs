mod common;

use common::{config_in, first_breakout, list_files, SYMBOLS};
use std::fs;
use swinglab_core::engine::{EngineError, GuardrailKind};
use swinglab_core::fingerprint::ExecutionMode;
use swinglab_runner::output::RunSummary;
use swinglab_runner::runner::{
    CANDIDATES_DIR, DIAGNOSTICS_FILE, EQUITY_FILE, POSITIONS_FILE, SUMMARY_FILE, TRADES_FILE,
};
use swinglab_runner::{execute, RunError};

#[test]
fn identical_inputs_write_byte_identical_runs() {
    let tmp = tempfile::tempdir().unwrap();
    let a = config_in(tmp.path(), "a", "run_a", "");
    let b = config_in(tmp.path(), "b", "run_b", "");

    let result_a = execute(&a).unwrap();
    let result_b = execute(&b).unwrap();
    assert_eq!(result_a.run_id(), result_b.run_id());
    assert!(!result_a.outcome.trades.is_empty(), "fixture should trade");

    let dir_a = tmp.path().join("run_a");
    let dir_b = tmp.path().join("run_b");
    let files = list_files(&dir_a);
    assert_eq!(files, list_files(&dir_b));
    for file in &files {
        assert_eq!(
            fs::read(dir_a.join(file)).unwrap(),
            fs::read(dir_b.join(file)).unwrap(),
            "{} differs",
            file.display()
        );
    }
}

#[test]
fn run_directory_holds_every_table_and_a_valid_summary() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_in(tmp.path(), "run", "out", "");
    let result = execute(&config).unwrap();

    let dir = tmp.path().join("out");
    for file in [TRADES_FILE, POSITIONS_FILE, EQUITY_FILE, DIAGNOSTICS_FILE, SUMMARY_FILE] {
        assert!(dir.join(file).is_file(), "missing {file}");
    }
    assert!(!dir.join(CANDIDATES_DIR).exists());

    let summary: RunSummary =
        serde_json::from_slice(&fs::read(dir.join(SUMMARY_FILE)).unwrap()).unwrap();
    assert_eq!(summary, result.summary);
    assert_eq!(summary.schema_version, 1);
    assert_eq!(summary.universe_size, SYMBOLS.len());
    assert_eq!(summary.provenance.code_revision, "test-revision");
    assert_eq!(summary.provenance.execution_mode, ExecutionMode::Backtest);
    assert_eq!(summary.provenance.run_id.as_str().len(), 64);
    summary.provenance.verify().unwrap();

    let equity = fs::read_to_string(dir.join(EQUITY_FILE)).unwrap();
    assert_eq!(equity.lines().count(), 1 + summary.metrics.trading_days);
    assert!(equity.starts_with("date,cash,positions_value,equity,open_positions\n"));
}

#[test]
fn first_breakout_enters_on_the_next_open() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_in(tmp.path(), "run", "out", "");
    let result = execute(&config).unwrap();

    let first = &result.outcome.trades[0];
    assert_eq!(first.symbol, "AAA");
    assert_eq!(first.date, first_breakout().succ_opt().unwrap());
    assert_eq!(first.price, 52.0);
}

#[test]
fn guardrail_breach_aborts_without_writing() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_in(
        tmp.path(),
        "run",
        "out",
        "[guardrails]\nmax_concurrent_positions = 0\n",
    );

    match execute(&config) {
        Err(RunError::Engine(EngineError::Guardrail(v))) => {
            assert_eq!(v.kind, GuardrailKind::MaxConcurrentPositions);
            assert_eq!(v.date, first_breakout());
            assert_eq!(v.symbol, "AAA");
        }
        other => panic!("expected guardrail abort, got {other:?}"),
    }
    assert!(!tmp.path().join("out").exists());
}

#[test]
fn missing_history_file_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = config_in(tmp.path(), "run", "out", "");
    config.data.path = tmp.path().join("nope.csv");
    assert!(matches!(execute(&config), Err(RunError::History(_))));
    assert!(!tmp.path().join("out").exists());
}

#[test]
fn rerun_replaces_the_whole_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_in(tmp.path(), "run", "out", "");
    let dir = tmp.path().join("out");

    execute(&config).unwrap();
    fs::write(dir.join("stale.txt"), "left over").unwrap();
    execute(&config).unwrap();

    assert!(!dir.join("stale.txt").exists());
    assert!(dir.join(SUMMARY_FILE).is_file());
    let siblings: Vec<_> = fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with('.'))
        .collect();
    assert!(siblings.is_empty(), "leftover staging dirs: {siblings:?}");
}

#[test]
fn debug_capture_writes_one_candidate_table_per_day() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = config_in(tmp.path(), "run", "out", "");
    config.backtest.debug_candidates = true;
    let result = execute(&config).unwrap();

    let dir = tmp.path().join("out").join(CANDIDATES_DIR);
    let tables = list_files(&dir);
    assert_eq!(tables.len(), result.summary.metrics.trading_days);

    let breakout = fs::read_to_string(dir.join(format!("{}.csv", first_breakout()))).unwrap();
    let mut lines = breakout.lines();
    assert!(lines.next().unwrap().starts_with("symbol,direction"));
    let row = lines.next().unwrap();
    assert!(row.starts_with("AAA,long,"), "unexpected row {row}");
    assert!(lines.next().is_none());
}

#[test]
fn debug_capture_changes_the_run_id() {
    let tmp = tempfile::tempdir().unwrap();
    let plain = config_in(tmp.path(), "plain", "plain", "");
    let mut debug = plain.clone();
    debug.backtest.output_dir = tmp.path().join("debug");
    debug.backtest.debug_candidates = true;

    let a = execute(&plain).unwrap();
    let b = execute(&debug).unwrap();
    assert_ne!(a.run_id(), b.run_id());
    assert_eq!(a.outcome.trades, b.outcome.trades);
}
