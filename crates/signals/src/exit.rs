use papertrade_core::{Candle, ExitReason, Side};

/// The slice of an open position the exit rules need.
#[derive(Debug, Clone)]
pub struct OpenPositionView {
    pub side: Side,
    pub stop: f64,
    /// Highest high (long) or lowest low (short) since entry, including
    /// the current bar.
    pub extreme_since_entry: f64,
    /// Bars elapsed since entry.
    pub bars_since_entry: i64,
    /// Bars elapsed since the extreme was last improved.
    pub bars_since_extreme: i64,
}

/// Exit rule parameters.
#[derive(Debug, Clone, Copy)]
pub struct ExitParams {
    pub atr_stop_multiplier: f64,
    pub time_stop_bars: i64,
}

impl Default for ExitParams {
    fn default() -> Self {
        Self {
            atr_stop_multiplier: 2.0,
            time_stop_bars: 40,
        }
    }
}

/// Outcome of evaluating the exit predicates on one bar.
#[derive(Debug, Clone, PartialEq)]
pub enum ExitDecision {
    /// Close the position at `price` for `reason`.
    Exit { reason: ExitReason, price: f64 },
    /// Ratchet the protective stop; not an exit by itself.
    UpdateStop { stop: f64 },
    Hold,
}

/// Evaluates the exit predicates in order; the first match wins.
///
/// 1. Stop hit: for a long, `low <= stop` (mirrored for shorts); the fill
///    is assumed at the stop price.
/// 2. Trailing stop: a new extreme since entry moves the stop to
///    `extreme -/+ multiplier * ATR`, only ever tightening.
/// 3. Time stop: exit at the close after `time_stop_bars` bars without a
///    new extreme.
#[must_use]
pub fn evaluate_exit(
    position: &OpenPositionView,
    bar: &Candle,
    atr: f64,
    params: &ExitParams,
) -> ExitDecision {
    let low = bar.low_f64();
    let high = bar.high_f64();
    let close = bar.close_f64();

    match position.side {
        Side::Long => {
            if low <= position.stop {
                return ExitDecision::Exit {
                    reason: ExitReason::Stop,
                    price: position.stop,
                };
            }
            if !atr.is_nan() {
                let trailed = position.extreme_since_entry - params.atr_stop_multiplier * atr;
                if trailed > position.stop {
                    return ExitDecision::UpdateStop { stop: trailed };
                }
            }
        }
        Side::Short => {
            if high >= position.stop {
                return ExitDecision::Exit {
                    reason: ExitReason::Stop,
                    price: position.stop,
                };
            }
            if !atr.is_nan() {
                let trailed = position.extreme_since_entry + params.atr_stop_multiplier * atr;
                if trailed < position.stop {
                    return ExitDecision::UpdateStop { stop: trailed };
                }
            }
        }
    }

    if position.bars_since_entry >= params.time_stop_bars
        && position.bars_since_extreme >= params.time_stop_bars
    {
        return ExitDecision::Exit {
            reason: ExitReason::Time,
            price: close,
        };
    }

    ExitDecision::Hold
}
