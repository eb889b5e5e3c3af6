//! Per-session position evaluation: stop, R1 trim, R2 target, time stop.
//!
//! Priority within one session:
//! 1. Stop-loss breach → exit everything at the stop (at the open if the
//!    session gapped through it). Nothing else runs.
//! 2. R1 reached, not yet trimmed → trim `floor(original * trim_pct)` at R1.
//! 3. R2 reached → exit the remainder at R2.
//! 4. `hold_days >= max_hold_days` → exit the remainder at the close.

use super::sizing::trim_qty;
use crate::domain::{Bar, FillEvent, FillReason, FillType, Position};

#[derive(Debug, Clone, Copy)]
pub struct ExitRules {
    pub max_hold_days: u32,
    pub trim_pct: f64,
}

/// Evaluate `position` against today's `bar`, mutating it and returning the
/// fills in the order they happened. The caller removes the position once
/// `is_closed()` and applies each fill's cash delta.
pub fn evaluate_session(position: &mut Position, bar: &Bar, rules: &ExitRules) -> Vec<FillEvent> {
    debug_assert_eq!(position.symbol, bar.symbol);
    position.hold_days += 1;
    let mut fills = Vec::new();

    if position.stop_breached(bar) {
        let (price, qty) = (position.stop_fill_price(bar), position.remaining_qty);
        fills.push(reduce(position, bar, FillType::Exit, FillReason::StopLoss, price, qty));
        return fills;
    }

    if !position.r1_trimmed && position.r1_reached(bar) {
        position.r1_trimmed = true;
        let qty = trim_qty(position.original_qty, rules.trim_pct).min(position.remaining_qty);
        if qty > 0 {
            let price = position.r1;
            fills.push(reduce(position, bar, FillType::Trim, FillReason::R1Trim, price, qty));
        }
    }

    if position.is_closed() {
        return fills;
    }

    if position.r2_reached(bar) {
        let (price, qty) = (position.r2, position.remaining_qty);
        fills.push(reduce(position, bar, FillType::Exit, FillReason::R2Target, price, qty));
    } else if position.hold_days >= rules.max_hold_days {
        let qty = position.remaining_qty;
        fills.push(reduce(position, bar, FillType::Exit, FillReason::TimeStop, bar.close, qty));
    }

    fills
}

fn reduce(
    position: &mut Position,
    bar: &Bar,
    fill_type: FillType,
    reason: FillReason,
    price: f64,
    qty: u64,
) -> FillEvent {
    let qty = position.reduce(qty);
    FillEvent {
        date: bar.date,
        symbol: position.symbol.clone(),
        direction: position.direction,
        fill_type,
        reason,
        price,
        qty,
        remaining_qty: position.remaining_qty,
        pnl: position.pnl_for(price, qty),
        position_id: position.id,
        hold_days: position.hold_days,
    }
}
