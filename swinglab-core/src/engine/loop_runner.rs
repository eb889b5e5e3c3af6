//! Day-by-day event loop: the heart of the simulator.
//!
//! Five phases per trading day, strictly sequential:
//! 1. Fill pending next-open entries (drop those without a bar or past the
//!    kill switch)
//! 2. Evaluate open positions: stop → R1 trim → R2 target → time stop
//! 3. Scan the universe through the embedded candidate path
//! 4. Size, guard and enter accepted candidates (queue or fill at close)
//! 5. Mark to market: equity point, position snapshots, diagnostics
//!
//! Open positions and new candidates are both processed in symbol order, so
//! identical inputs always replay to identical outputs.

use super::config::{ConfigError, EngineConfig, EntryModel};
use super::error::{EngineError, SkipReason};
use super::exits::{evaluate_session, ExitRules};
use super::guardrails::{EntryCheck, GuardrailViolation};
use super::scan::scan_day;
use super::sizing::risk_qty;
use super::state::{CandidateSnapshot, EngineState, PendingEntry, SimulationOutcome};
use crate::candidates::CandidateProvider;
use crate::domain::{
    Candidate, DiagnosticsRow, EquityPoint, FillEvent, FillReason, FillType, Portfolio, Position,
    PositionSnapshot,
};
use crate::history::HistoryStore;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Trim, drop blanks, sort and deduplicate a symbol list.
pub fn normalize_universe(universe: &[String]) -> Vec<String> {
    universe
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Per-session scratch: counters, symbols touched and fills, in order.
struct Session {
    date: NaiveDate,
    diag: DiagnosticsRow,
    touched: BTreeSet<String>,
    fills: Vec<FillEvent>,
}

impl Session {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            diag: DiagnosticsRow::new(date),
            touched: BTreeSet::new(),
            fills: Vec::new(),
        }
    }

    fn record(&mut self, fill: FillEvent, state: &mut EngineState) {
        state.portfolio.cash += fill.cash_delta();
        match fill.fill_type {
            FillType::Entry => self.diag.entries_filled += 1,
            FillType::Trim => self.diag.trims += 1,
            FillType::Exit => self.diag.exits += 1,
        }
        self.touched.insert(fill.symbol.clone());
        self.fills.push(fill);
    }

    fn skip(&mut self, reason: SkipReason) {
        reason.tally(&mut self.diag);
    }
}

/// Run one simulation over `[start, end]`.
///
/// Returns the full in-memory result or the first fatal error. Nothing is
/// written anywhere; persistence belongs to the caller.
pub fn simulate(
    config: &EngineConfig,
    store: &HistoryStore,
    universe: &[String],
    provider: &dyn CandidateProvider,
    start: NaiveDate,
    end: NaiveDate,
    capture_candidates: bool,
) -> Result<SimulationOutcome, EngineError> {
    config.validate()?;
    if start > end {
        return Err(ConfigError::InvalidDateRange { start, end }.into());
    }
    let universe = normalize_universe(universe);
    if universe.is_empty() {
        return Err(ConfigError::EmptyUniverse.into());
    }
    let trading_days = store.trading_days(start, end);
    if trading_days.is_empty() {
        return Err(ConfigError::NoTradingDays { start, end }.into());
    }

    info!(
        days = trading_days.len(),
        symbols = universe.len(),
        scanner = provider.name(),
        entry_model = %config.entry_model,
        "starting simulation"
    );

    let rules = ExitRules {
        max_hold_days: config.max_hold_days,
        trim_pct: config.trim_pct,
    };
    let directions = config.trading_mode.directions();
    let mut state = EngineState::new(config.initial_cash);

    let mut trades = Vec::new();
    let mut positions = Vec::new();
    let mut equity_curve = Vec::with_capacity(trading_days.len());
    let mut diagnostics = Vec::with_capacity(trading_days.len());
    let mut candidate_snapshots = Vec::new();

    for &day in &trading_days {
        let mut session = Session::new(day);

        fill_pending(config, &mut state, store, &mut session);
        manage_positions(&mut state, store, &rules, &mut session);

        let scan = scan_day(provider, store, &universe, day, directions);
        session.diag.symbols_scanned = scan.symbols_scanned;
        session.diag.symbols_missing_bar = scan.symbols_missing_bar;
        session.diag.candidates_total = scan.rows.len();
        session.diag.candidates_valid = scan.accepted.len();
        for skip in scan.skips() {
            session.skip(skip);
        }

        enter_candidates(config, &mut state, store, &scan.accepted, &mut session)?;

        if capture_candidates {
            candidate_snapshots.push(CandidateSnapshot {
                date: day,
                rows: scan.rows,
            });
        }

        let marks = state.marks();
        let equity = state.verify_equity(&marks);
        for pos in state.portfolio.positions.values() {
            positions.push(PositionSnapshot::capture(
                day,
                pos,
                Portfolio::mark_for(pos, &marks),
            ));
        }
        equity_curve.push(EquityPoint {
            date: day,
            cash: state.portfolio.cash,
            positions_value: state.portfolio.positions_value(&marks),
            equity,
            open_positions: state.portfolio.positions.len(),
        });

        debug!(
            date = %day,
            fills = session.fills.len(),
            candidates = session.diag.candidates_valid,
            open = state.portfolio.positions.len(),
            pending = state.pending.len(),
            equity,
            "session settled"
        );

        trades.append(&mut session.fills);
        diagnostics.push(session.diag);
    }

    let unfilled_entries = state.pending.len();
    if unfilled_entries > 0 {
        warn!(
            unfilled_entries,
            "entries accepted on the last session never filled"
        );
    }

    let outcome = SimulationOutcome {
        trading_days,
        trades,
        positions,
        equity_curve,
        diagnostics,
        candidate_snapshots,
        final_cash: state.portfolio.cash,
        open_positions: state.portfolio.positions.into_values().collect(),
        unfilled_entries,
    };

    info!(
        trades = outcome.trades.len(),
        open_positions = outcome.open_positions.len(),
        final_equity = outcome.final_equity(),
        "simulation complete"
    );

    Ok(outcome)
}

/// Phase 1: consume every pending entry exactly once. Nothing opens on or
/// after the kill-switch date, even if it was accepted before.
fn fill_pending(
    config: &EngineConfig,
    state: &mut EngineState,
    store: &HistoryStore,
    session: &mut Session,
) {
    let pending = std::mem::take(&mut state.pending);
    let killed = config.guardrails.kill_switch_active(session.date);
    for (symbol, entry) in pending {
        if killed {
            debug!(
                symbol = %symbol,
                accepted_on = %entry.accepted_on,
                "dropping pending entry: kill switch active"
            );
            session.skip(SkipReason::KillSwitch);
            continue;
        }
        match store.get_bar(&symbol, session.date) {
            Some(bar) => {
                let id = state.id_gen.next_position_id();
                let position = Position::open(id, &entry.candidate, session.date, bar.open, entry.qty);
                let fill = entry_fill(&position, FillReason::NextOpen);
                state.portfolio.positions.insert(symbol, position);
                session.record(fill, state);
            }
            None => {
                warn!(
                    symbol = %symbol,
                    accepted_on = %entry.accepted_on,
                    date = %session.date,
                    "dropping pending entry: no bar on fill day"
                );
                session.skip(SkipReason::PendingWithoutBar);
            }
        }
    }
}

/// Phase 2: evaluate every open position that has a bar today.
fn manage_positions(
    state: &mut EngineState,
    store: &HistoryStore,
    rules: &ExitRules,
    session: &mut Session,
) {
    let symbols: Vec<String> = state.portfolio.positions.keys().cloned().collect();
    for symbol in symbols {
        // No bar: the position carries forward unchanged.
        let Some(bar) = store.get_bar(&symbol, session.date) else {
            continue;
        };
        state.last_close.insert(symbol.clone(), bar.close);

        let Some(position) = state.portfolio.positions.get_mut(&symbol) else {
            continue;
        };
        let fills = evaluate_session(position, bar, rules);
        let closed = position.is_closed();

        for fill in fills {
            session.record(fill, state);
        }
        if closed {
            state.portfolio.positions.remove(&symbol);
            state.last_close.remove(&symbol);
        }
    }
}

/// Phase 4: accept, size, guard and enter validated candidates.
fn enter_candidates(
    config: &EngineConfig,
    state: &mut EngineState,
    store: &HistoryStore,
    candidates: &[Candidate],
    session: &mut Session,
) -> Result<(), GuardrailViolation> {
    if candidates.is_empty() {
        return Ok(());
    }
    let mut marks = state.marks();
    let equity = state.verify_equity(&marks);

    for candidate in candidates {
        if config.guardrails.kill_switch_active(session.date) {
            session.skip(SkipReason::KillSwitch);
            continue;
        }
        if state.is_held_or_pending(&candidate.symbol) {
            session.skip(SkipReason::AlreadyHeld);
            continue;
        }
        let close_fill = match config.entry_model {
            EntryModel::NextOpen => None,
            EntryModel::SameClose => match store.get_bar(&candidate.symbol, session.date) {
                Some(bar) => Some(bar.close),
                None => {
                    session.skip(SkipReason::MissingBar);
                    continue;
                }
            },
        };

        let qty = risk_qty(equity, config.risk_per_trade_pct, candidate.risk_per_share());
        if qty == 0 {
            session.skip(SkipReason::ZeroQuantity);
            continue;
        }

        config.guardrails.check(&EntryCheck {
            date: session.date,
            symbol: &candidate.symbol,
            qty,
            reference_price: candidate.reference_price,
            risk_per_share: candidate.risk_per_share(),
            open_positions: state.committed_positions(),
            entries_today: session.diag.entries_placed,
            symbols_touched_today: &session.touched,
            gross_exposure: state.committed_exposure(&marks),
            equity,
        })?;

        session.diag.entries_placed += 1;
        session.touched.insert(candidate.symbol.clone());

        match close_fill {
            None => {
                state.pending.insert(
                    candidate.symbol.clone(),
                    PendingEntry {
                        candidate: candidate.clone(),
                        qty,
                        accepted_on: session.date,
                    },
                );
            }
            Some(price) => {
                let id = state.id_gen.next_position_id();
                let position = Position::open(id, candidate, session.date, price, qty);
                let fill = entry_fill(&position, FillReason::SameClose);
                marks.insert(candidate.symbol.clone(), price);
                state.last_close.insert(candidate.symbol.clone(), price);
                state
                    .portfolio
                    .positions
                    .insert(candidate.symbol.clone(), position);
                session.record(fill, state);
            }
        }
    }
    Ok(())
}

fn entry_fill(position: &Position, reason: FillReason) -> FillEvent {
    FillEvent {
        date: position.entry_date,
        symbol: position.symbol.clone(),
        direction: position.direction,
        fill_type: FillType::Entry,
        reason,
        price: position.entry_price,
        qty: position.original_qty,
        remaining_qty: position.remaining_qty,
        pnl: 0.0,
        position_id: position.id,
        hold_days: 0,
    }
}
