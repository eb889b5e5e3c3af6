//! Parity between the standalone scan and the simulator's embedded scan.

mod common;

use common::*;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use swinglab_core::candidates::{scan_universe, CandidateProvider, PivotBreakout};
use swinglab_core::domain::{Bar, CandidateRow, Direction};
use swinglab_core::engine::{simulate, EngineConfig, TradingMode};
use swinglab_core::parity::{compare, CandidateTable, ParityError};
use chrono::NaiveDate;

/// Three quiet sessions, then a breakout above the range on day 3.
fn breakout_store() -> swinglab_core::history::HistoryStore {
    let mut bars = Vec::new();
    for sym in ["AAA", "BBB"] {
        for i in 0..3 {
            bars.push(bar(sym, i, 100.0, 101.0, 99.0, 100.0));
        }
    }
    bars.push(bar("AAA", 3, 101.0, 106.0, 103.0, 105.0));
    bars.push(bar("BBB", 3, 100.0, 100.5, 99.5, 100.0));
    // Falling through the range on day 4 for the short side.
    bars.push(bar("AAA", 4, 105.0, 105.5, 104.0, 105.0));
    bars.push(bar("BBB", 4, 97.0, 97.5, 94.0, 95.0));
    store(bars)
}

#[test]
fn breakout_day_produces_matching_tables() {
    let store = breakout_store();
    let provider = PivotBreakout::new(3);
    let symbols = universe(&["BBB", "AAA"]);

    let result = compare(&provider, &store, &symbols, day(3), &[Direction::Long]).unwrap();
    assert_eq!(result.rows, 1);
    assert_eq!(result.table.rows[0][0], "AAA");
    assert_eq!(result.table.rows[0][1], "long");
    assert_eq!(result.table.rows[0][4], "99.000000");
}

#[test]
fn every_session_matches_with_both_directions() {
    let store = breakout_store();
    let provider = PivotBreakout::new(3);
    let symbols = universe(&["AAA", "BBB", "ZZZ"]);
    let both = TradingMode::LongShort.directions();

    for date in store.trading_days(day(0), day(4)) {
        let result = compare(&provider, &store, &symbols, date, both);
        assert!(result.is_ok(), "parity failed on {date}: {result:?}");
    }
}

#[test]
fn simulator_capture_equals_standalone_scan() {
    let store = breakout_store();
    let provider = PivotBreakout::new(3);
    let symbols = universe(&["AAA", "BBB"]);
    let config = EngineConfig {
        trading_mode: TradingMode::LongShort,
        ..EngineConfig::default()
    };

    let out = simulate(&config, &store, &symbols, &provider, day(0), day(4), true).unwrap();
    assert_eq!(out.candidate_snapshots.len(), 5);

    for snap in &out.candidate_snapshots {
        let standalone =
            scan_universe(&provider, &store, &symbols, snap.date, config.trading_mode.directions());
        assert_eq!(
            CandidateTable::from_rows(&snap.rows),
            CandidateTable::from_rows(&standalone),
            "embedded scan diverged on {}",
            snap.date
        );
    }
    // Raw rows include the breakout even though the entry filter decides later.
    assert!(out.candidate_snapshots[3].rows.iter().any(|r| r.symbol == "AAA"));
}

/// Returns a different stop on every call, so the two paths never agree.
struct Drifting {
    calls: AtomicU64,
}

impl CandidateProvider for Drifting {
    fn name(&self) -> &str {
        "drifting"
    }

    fn params(&self) -> BTreeMap<String, f64> {
        BTreeMap::new()
    }

    fn candidate_for(
        &self,
        symbol: &str,
        history: &[Bar],
        as_of: NaiveDate,
        direction: Direction,
    ) -> Option<CandidateRow> {
        let close = history.last().filter(|b| b.date == as_of)?.close;
        let n = self.calls.fetch_add(1, Ordering::SeqCst) as f64;
        Some(CandidateRow {
            symbol: symbol.to_string(),
            direction,
            as_of,
            reference_price: Some(close),
            stop: Some(close - 1.0 - n * 0.01),
            r1: Some(close + 1.0),
            r2: Some(close + 2.0),
            metadata: BTreeMap::new(),
        })
    }
}

#[test]
fn nondeterministic_provider_is_a_hard_failure() {
    let store = breakout_store();
    let provider = Drifting {
        calls: AtomicU64::new(0),
    };
    let symbols = universe(&["AAA", "BBB"]);

    match compare(&provider, &store, &symbols, day(2), &[Direction::Long]) {
        Err(ParityError::Mismatch(report)) => {
            assert!(report.schema_match);
            assert_eq!(report.standalone_rows, 2);
            assert_eq!(report.embedded_rows, 2);
            assert_eq!(report.cell_diffs.len(), 2);
            assert!(report.cell_diffs.iter().all(|d| d.column == "stop"));
            assert!(report.to_string().contains("drifting"));
        }
        other => panic!("expected mismatch, got {other:?}"),
    }
}
