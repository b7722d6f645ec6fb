//! Realized volatility for the kill-switch.
//!
//! Sigma is the standard deviation of close-to-close log returns over a
//! short trailing window. The baseline is the median of that rolling series
//! over a long history; abnormal volatility is sigma exceeding a multiple
//! of the baseline.

/// Standard deviation of log returns over the last `window` bars of
/// `closes`. Returns NaN when there is not enough data.
#[must_use]
pub fn realized_vol(closes: &[f64], window: usize) -> f64 {
    let series = rolling_realized_vol(closes, window);
    series.last().copied().unwrap_or(f64::NAN)
}

/// Rolling realized volatility, same length as `closes`, NaN while the
/// window is unsatisfied.
#[must_use]
pub fn rolling_realized_vol(closes: &[f64], window: usize) -> Vec<f64> {
    let n = closes.len();
    let mut out = vec![f64::NAN; n];
    if window < 2 || n < 2 {
        return out;
    }

    let mut returns = vec![f64::NAN; n];
    for i in 1..n {
        if closes[i] > 0.0 && closes[i - 1] > 0.0 {
            returns[i] = (closes[i] / closes[i - 1]).ln();
        }
    }

    for i in window..n {
        let slice = &returns[i + 1 - window..=i];
        if slice.iter().any(|r| r.is_nan()) {
            continue;
        }
        let mean = slice.iter().sum::<f64>() / window as f64;
        let variance = slice.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / window as f64;
        out[i] = variance.sqrt();
    }
    out
}

fn median(values: &mut Vec<f64>) -> f64 {
    values.retain(|v| !v.is_nan());
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Result of the abnormal-volatility check.
#[derive(Debug, Clone, Copy)]
pub struct KillSwitchCheck {
    pub sigma: f64,
    pub baseline_median: f64,
    pub triggered: bool,
}

impl KillSwitchCheck {
    /// Compares the latest short-window sigma against the median of the
    /// rolling sigma series over `baseline_closes` (the long history,
    /// which should end with the same bars as `closes`).
    ///
    /// With insufficient history the check never triggers.
    #[must_use]
    pub fn evaluate(
        baseline_closes: &[f64],
        window: usize,
        sigma_multiplier: f64,
    ) -> Self {
        let series = rolling_realized_vol(baseline_closes, window);
        let sigma = series.last().copied().unwrap_or(f64::NAN);
        let mut history: Vec<f64> = series;
        let baseline_median = median(&mut history);

        let triggered = !sigma.is_nan()
            && !baseline_median.is_nan()
            && baseline_median > 0.0
            && sigma > sigma_multiplier * baseline_median;

        Self {
            sigma,
            baseline_median,
            triggered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calm_closes(count: usize) -> Vec<f64> {
        (0..count)
            .map(|i| 100.0 * (1.0 + 0.0005 * ((i % 5) as f64 - 2.0)))
            .collect()
    }

    #[test]
    fn test_rolling_vol_warmup() {
        let closes = calm_closes(20);
        let out = rolling_realized_vol(&closes, 12);
        for v in out.iter().take(12) {
            assert!(v.is_nan());
        }
        assert!(!out[12].is_nan());
        assert!(out[12] >= 0.0);
    }

    #[test]
    fn test_flat_series_is_zero_vol() {
        let closes = vec![100.0; 30];
        assert_eq!(realized_vol(&closes, 12), 0.0);
    }

    #[test]
    fn test_median_even_and_odd() {
        let mut odd = vec![3.0, 1.0, 2.0];
        assert_eq!(median(&mut odd), 2.0);
        let mut even = vec![4.0, 1.0, 3.0, 2.0];
        assert_eq!(median(&mut even), 2.5);
        let mut with_nan = vec![f64::NAN, 5.0];
        assert_eq!(median(&mut with_nan), 5.0);
    }

    #[test]
    fn test_kill_switch_triggers_on_spike() {
        // Long calm history, then a violent final stretch.
        let mut closes = calm_closes(300);
        for i in 0..12 {
            let swing = if i % 2 == 0 { 1.08 } else { 0.93 };
            let prev = *closes.last().unwrap();
            closes.push(prev * swing);
        }

        let check = KillSwitchCheck::evaluate(&closes, 12, 3.0);
        assert!(check.triggered, "sigma {} median {}", check.sigma, check.baseline_median);
    }

    #[test]
    fn test_kill_switch_quiet_market_stays_off() {
        let closes = calm_closes(300);
        let check = KillSwitchCheck::evaluate(&closes, 12, 3.0);
        assert!(!check.triggered);
    }

    #[test]
    fn test_insufficient_history_never_triggers() {
        let closes = vec![100.0, 101.0, 102.0];
        let check = KillSwitchCheck::evaluate(&closes, 12, 3.0);
        assert!(!check.triggered);
        assert!(check.sigma.is_nan());
    }
}
