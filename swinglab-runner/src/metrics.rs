//! Summary metrics: pure functions over the simulation outcome.
//!
//! The equity series used here is the initial cash followed by one point per
//! trading day, so a loss on the first session still counts as drawdown.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use swinglab_core::domain::{FillEvent, FillType, PositionId};
use swinglab_core::engine::SimulationOutcome;
use swinglab_core::rounding::{money, ratio};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Aggregate statistics of one run, already rounded for output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub trading_days: usize,
    pub initial_cash: f64,
    pub final_cash: f64,
    pub final_equity: f64,
    pub total_return: f64,
    pub max_drawdown: f64,
    pub sharpe: f64,
    pub realized_pnl: f64,
    pub entries: usize,
    pub trims: usize,
    pub exits: usize,
    /// Fill count per reason name, e.g. `stop_loss`.
    pub fills_by_reason: BTreeMap<String, usize>,
    pub closed_positions: usize,
    pub win_rate: f64,
    pub open_positions_at_end: usize,
    pub unfilled_entries: usize,
}

impl SummaryMetrics {
    pub fn compute(outcome: &SimulationOutcome, initial_cash: f64) -> Self {
        let equity: Vec<f64> = std::iter::once(initial_cash)
            .chain(outcome.equity_curve.iter().map(|p| p.equity))
            .collect();

        let count = |kind: FillType| outcome.trades.iter().filter(|t| t.fill_type == kind).count();
        let mut fills_by_reason = BTreeMap::new();
        for fill in &outcome.trades {
            *fills_by_reason.entry(fill.reason.to_string()).or_insert(0) += 1;
        }
        let closed = closed_position_pnl(&outcome.trades);

        Self {
            trading_days: outcome.trading_days.len(),
            initial_cash: money(initial_cash),
            final_cash: money(outcome.final_cash),
            final_equity: money(outcome.final_equity()),
            total_return: ratio(total_return(&equity)),
            max_drawdown: ratio(max_drawdown(&equity)),
            sharpe: ratio(sharpe_ratio(&equity)),
            realized_pnl: money(realized_pnl(&outcome.trades)),
            entries: count(FillType::Entry),
            trims: count(FillType::Trim),
            exits: count(FillType::Exit),
            fills_by_reason,
            closed_positions: closed.len(),
            win_rate: ratio(win_rate(&closed)),
            open_positions_at_end: outcome.open_positions.len(),
            unfilled_entries: outcome.unfilled_entries,
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// (final - initial) / initial.
pub fn total_return(equity: &[f64]) -> f64 {
    match (equity.first(), equity.last()) {
        (Some(&initial), Some(&last)) if equity.len() >= 2 && initial > 0.0 => {
            (last - initial) / initial
        }
        _ => 0.0,
    }
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let Some(&first) = equity.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &eq in equity {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            max_dd = max_dd.min((eq - peak) / peak);
        }
    }
    max_dd
}

/// Annualized Sharpe ratio from daily returns, zero risk-free rate.
///
/// Returns 0.0 with fewer than two returns or zero variance.
pub fn sharpe_ratio(equity: &[f64]) -> f64 {
    let returns = daily_returns(equity);
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(&returns) / std * TRADING_DAYS_PER_YEAR.sqrt()
}

pub fn realized_pnl(trades: &[FillEvent]) -> f64 {
    trades
        .iter()
        .filter(|t| t.fill_type != FillType::Entry)
        .map(|t| t.pnl)
        .sum()
}

/// Total realized PnL per fully closed position, in position id order.
pub fn closed_position_pnl(trades: &[FillEvent]) -> Vec<f64> {
    let mut pnl: BTreeMap<PositionId, f64> = BTreeMap::new();
    let mut closed = Vec::new();
    for fill in trades {
        *pnl.entry(fill.position_id).or_insert(0.0) += fill.pnl;
        if fill.fill_type == FillType::Exit {
            closed.push(fill.position_id);
        }
    }
    closed.sort();
    closed.iter().filter_map(|id| pnl.get(id).copied()).collect()
}

/// Fraction of closed positions with positive total PnL.
pub fn win_rate(closed_pnl: &[f64]) -> f64 {
    if closed_pnl.is_empty() {
        return 0.0;
    }
    closed_pnl.iter().filter(|&&p| p > 0.0).count() as f64 / closed_pnl.len() as f64
}

pub fn daily_returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
