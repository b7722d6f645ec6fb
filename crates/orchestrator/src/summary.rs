use serde_json::json;

/// What happened to one symbol during a cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymbolOutcome {
    pub data_error: bool,
    pub signal_fired: bool,
    pub opened: bool,
    pub closed: bool,
    pub validator_rejected: bool,
}

/// Counters for one completed cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleSummary {
    pub symbols_processed: usize,
    pub data_errors: usize,
    pub signals_fired: usize,
    pub trades_opened: usize,
    pub trades_closed: usize,
    pub validator_rejections: usize,
    pub timeouts: usize,
    pub wall_time_ms: u64,
}

impl CycleSummary {
    pub fn absorb(&mut self, outcome: &SymbolOutcome) {
        self.symbols_processed += 1;
        self.data_errors += usize::from(outcome.data_error);
        self.signals_fired += usize::from(outcome.signal_fired);
        self.trades_opened += usize::from(outcome.opened);
        self.trades_closed += usize::from(outcome.closed);
        self.validator_rejections += usize::from(outcome.validator_rejected);
    }

    #[must_use]
    pub fn to_payload(&self) -> serde_json::Value {
        json!({
            "symbols": self.symbols_processed,
            "data_errors": self.data_errors,
            "signals": self.signals_fired,
            "opened": self.trades_opened,
            "closed": self.trades_closed,
            "rejections": self.validator_rejections,
            "timeouts": self.timeouts,
            "wall_time_ms": self.wall_time_ms,
        })
    }
}
