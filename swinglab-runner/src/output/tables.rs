//! CSV rendering with fixed columns and a fixed sort.
//!
//! Every table is re-sorted here even when the engine already produced it in
//! order. Prices, cash and PnL are written with 4 decimals.

use swinglab_core::domain::{DiagnosticsRow, EquityPoint, FillEvent, PositionSnapshot};
use swinglab_core::parity::CandidateTable;
use swinglab_core::rounding::{format_dp, MONEY_DP};

use super::OutputError;

pub const TRADE_COLUMNS: [&str; 11] = [
    "date",
    "symbol",
    "direction",
    "fill_type",
    "reason",
    "price",
    "qty",
    "remaining_qty",
    "pnl",
    "position_id",
    "hold_days",
];

pub const POSITION_COLUMNS: [&str; 16] = [
    "date",
    "symbol",
    "position_id",
    "direction",
    "entry_date",
    "entry_price",
    "original_qty",
    "remaining_qty",
    "stop",
    "r1",
    "r2",
    "hold_days",
    "r1_trimmed",
    "mark_price",
    "market_value",
    "unrealized_pnl",
];

pub const EQUITY_COLUMNS: [&str; 5] = ["date", "cash", "positions_value", "equity", "open_positions"];

pub const DIAGNOSTIC_COLUMNS: [&str; 15] = [
    "date",
    "symbols_scanned",
    "symbols_missing_bar",
    "candidates_total",
    "candidates_valid",
    "candidates_invalid",
    "entries_placed",
    "entries_filled",
    "pending_dropped",
    "trims",
    "exits",
    "skipped_existing",
    "skipped_zero_qty",
    "skipped_kill_switch",
    "skipped_missing_bar",
];

fn m(value: f64) -> String {
    format_dp(value, MONEY_DP)
}

fn render<R>(header: &[&str], rows: R) -> Result<Vec<u8>, OutputError>
where
    R: IntoIterator<Item = Vec<String>>,
{
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(header)?;
    for row in rows {
        wtr.write_record(&row)?;
    }
    wtr.into_inner()
        .map_err(|e| OutputError::Csv(csv::Error::from(e.into_error())))
}

/// Sorted by date, symbol, position id, event type.
pub fn render_trades(trades: &[FillEvent]) -> Result<Vec<u8>, OutputError> {
    let mut sorted: Vec<&FillEvent> = trades.iter().collect();
    sorted.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    render(
        &TRADE_COLUMNS,
        sorted.into_iter().map(|t| {
            vec![
                t.date.to_string(),
                t.symbol.clone(),
                t.direction.to_string(),
                t.fill_type.to_string(),
                t.reason.to_string(),
                m(t.price),
                t.qty.to_string(),
                t.remaining_qty.to_string(),
                m(t.pnl),
                t.position_id.to_string(),
                t.hold_days.to_string(),
            ]
        }),
    )
}

/// Sorted by date, symbol, position id.
pub fn render_positions(positions: &[PositionSnapshot]) -> Result<Vec<u8>, OutputError> {
    let mut sorted: Vec<&PositionSnapshot> = positions.iter().collect();
    sorted.sort_by(|a, b| {
        (a.date, a.symbol.as_str(), a.position_id).cmp(&(b.date, b.symbol.as_str(), b.position_id))
    });
    render(
        &POSITION_COLUMNS,
        sorted.into_iter().map(|p| {
            vec![
                p.date.to_string(),
                p.symbol.clone(),
                p.position_id.to_string(),
                p.direction.to_string(),
                p.entry_date.to_string(),
                m(p.entry_price),
                p.original_qty.to_string(),
                p.remaining_qty.to_string(),
                m(p.stop),
                m(p.r1),
                m(p.r2),
                p.hold_days.to_string(),
                p.r1_trimmed.to_string(),
                m(p.mark_price),
                m(p.market_value),
                m(p.unrealized_pnl),
            ]
        }),
    )
}

pub fn render_equity(points: &[EquityPoint]) -> Result<Vec<u8>, OutputError> {
    let mut sorted: Vec<&EquityPoint> = points.iter().collect();
    sorted.sort_by_key(|p| p.date);
    render(
        &EQUITY_COLUMNS,
        sorted.into_iter().map(|p| {
            vec![
                p.date.to_string(),
                m(p.cash),
                m(p.positions_value),
                m(p.equity),
                p.open_positions.to_string(),
            ]
        }),
    )
}

pub fn render_diagnostics(rows: &[DiagnosticsRow]) -> Result<Vec<u8>, OutputError> {
    let mut sorted: Vec<&DiagnosticsRow> = rows.iter().collect();
    sorted.sort_by_key(|d| d.date);
    render(
        &DIAGNOSTIC_COLUMNS,
        sorted.into_iter().map(|d| {
            let counts = [
                d.symbols_scanned,
                d.symbols_missing_bar,
                d.candidates_total,
                d.candidates_valid,
                d.candidates_invalid,
                d.entries_placed,
                d.entries_filled,
                d.pending_dropped,
                d.trims,
                d.exits,
                d.skipped_existing,
                d.skipped_zero_qty,
                d.skipped_kill_switch,
                d.skipped_missing_bar,
            ];
            std::iter::once(d.date.to_string())
                .chain(counts.iter().map(usize::to_string))
                .collect()
        }),
    )
}

/// Canonical candidate table, already sorted and rounded by the parity module.
pub fn render_candidates(table: &CandidateTable) -> Result<Vec<u8>, OutputError> {
    let header: Vec<&str> = table.columns.iter().map(String::as_str).collect();
    render(&header, table.rows.iter().cloned())
}
