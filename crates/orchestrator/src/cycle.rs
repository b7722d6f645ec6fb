//! The per-cycle driver.

use crate::killswitch::KillSwitchState;
use crate::nav::NavEngine;
use crate::summary::{CycleSummary, SymbolOutcome};
use crate::validator::{validate, RejectReason, ValidationContext};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use papertrade_agents::{
    reconcile, Advisor, AdvisorContext, Consultant, DecisionRationale, FinalDecision,
    MarketContext, Proposal, ReviewOutcome, VolatilityBand,
};
use papertrade_broker::{BrokerError, OpenRequest, PaperBroker};
use papertrade_core::{
    AppConfig, Candle, EventAction, EventRecord, EventTag, ExchangeAdapter, ExitReason, Regime,
    Side, Timeframe,
};
use papertrade_data::models::{FeatureRow, PositionRow};
use papertrade_data::{
    CandleRepository, DatabaseClient, EventRepository, FeatureRepository, PositionRepository,
    TradeRepository,
};
use papertrade_indicators::{warmup_bars, FeatureFrame};
use papertrade_sentiment::SentimentService;
use papertrade_signals::entry::EntryParams;
use papertrade_signals::exit::ExitParams;
use papertrade_signals::sizing::SizingParams;
use papertrade_signals::{
    check_entry, classify_regime, evaluate_exit, position_size, ExitDecision, KillSwitchCheck,
    OpenPositionView,
};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use uuid::Uuid;

/// Advisor and consultant wired to the same transport.
pub struct AgentPair {
    pub advisor: Advisor,
    pub consultant: Consultant,
}

/// Drives one cycle across the symbol universe. All dependencies are
/// explicit; the only process-wide state is the pool and the sentiment
/// cache handed in at construction.
pub struct CycleRunner {
    config: AppConfig,
    timeframe: Timeframe,
    sizing: SizingParams,
    candles: CandleRepository,
    features: FeatureRepository,
    positions: PositionRepository,
    trades: TradeRepository,
    events: EventRepository,
    nav_engine: NavEngine,
    killswitch: KillSwitchState,
    exchange: Arc<dyn ExchangeAdapter>,
    sentiment: Arc<SentimentService>,
    agents: Option<AgentPair>,
    broker: PaperBroker,
}

impl CycleRunner {
    /// Builds the runner from the shared pool and adapters.
    ///
    /// # Errors
    /// Returns an error if the configured timeframe or risk fractions do
    /// not parse.
    pub fn new(
        db: DatabaseClient,
        config: AppConfig,
        exchange: Arc<dyn ExchangeAdapter>,
        sentiment: Arc<SentimentService>,
        agents: Option<AgentPair>,
    ) -> Result<Self> {
        let timeframe: Timeframe = config.trading.timeframe.parse()?;
        let sizing = SizingParams {
            risk_per_trade: Decimal::from_f64(config.risk.risk_per_trade)
                .context("risk_per_trade does not parse")?,
            max_exposure_per_symbol: Decimal::from_f64(config.risk.max_exposure_per_symbol)
                .context("max_exposure_per_symbol does not parse")?,
        };

        let pool = db.pool().clone();
        Ok(Self {
            timeframe,
            sizing,
            candles: CandleRepository::new(pool.clone()),
            features: FeatureRepository::new(pool.clone()),
            positions: PositionRepository::new(pool.clone()),
            trades: TradeRepository::new(pool.clone()),
            events: EventRepository::new(pool.clone()),
            nav_engine: NavEngine {
                candles: CandleRepository::new(pool.clone()),
                positions: PositionRepository::new(pool.clone()),
                trades: TradeRepository::new(pool.clone()),
                nav: papertrade_data::NavRepository::new(pool.clone()),
                store: papertrade_data::ConfigRepository::new(pool.clone()),
                timeframe,
            },
            killswitch: KillSwitchState::new(papertrade_data::ConfigRepository::new(pool)),
            exchange,
            sentiment,
            agents,
            broker: PaperBroker::new(db),
            config,
        })
    }

    #[must_use]
    pub fn nav_engine(&self) -> &NavEngine {
        &self.nav_engine
    }

    /// Runs one full cycle: per-symbol pipelines in parallel under a
    /// cycle deadline, then a single NAV snapshot.
    ///
    /// # Errors
    /// Returns an error only when the cycle cannot run at all (no NAV
    /// baseline, persistence down); per-symbol failures are absorbed into
    /// the summary.
    pub async fn run_once(self: Arc<Self>, now: DateTime<Utc>) -> Result<CycleSummary> {
        let started = std::time::Instant::now();

        let nav = match self.nav_engine.nav.latest().await? {
            Some(row) => row.nav_usd,
            None => self.nav_engine.starting_cash().await?,
        };

        self.events
            .append(&EventRecord::info(EventTag::Cycle).with_action(EventAction::StartCycle))
            .await?;

        let deadline = Duration::from_secs_f64(
            self.config.trading.cycle_seconds as f64 * self.config.trading.deadline_fraction,
        );
        let mut tasks = JoinSet::new();
        for symbol in self.config.trading.symbols.clone() {
            let runner = Arc::clone(&self);
            let decision_id = Uuid::new_v4();
            tasks.spawn(async move {
                let result = tokio::time::timeout(
                    deadline,
                    runner.process_symbol(&symbol, nav, decision_id, now),
                )
                .await;
                (symbol, decision_id, result)
            });
        }

        let mut summary = CycleSummary::default();
        while let Some(joined) = tasks.join_next().await {
            let (symbol, decision_id, result) = match joined {
                Ok(tuple) => tuple,
                Err(e) => {
                    tracing::error!("symbol task panicked: {e}");
                    summary.data_errors += 1;
                    continue;
                }
            };
            match result {
                Err(_elapsed) => {
                    summary.symbols_processed += 1;
                    summary.timeouts += 1;
                    tracing::warn!(%symbol, "symbol pipeline exceeded the cycle deadline");
                    let _ = self
                        .events
                        .append(
                            &EventRecord::new(
                                papertrade_core::EventLevel::Warn,
                                vec![EventTag::Cycle],
                            )
                            .with_symbol(&symbol)
                            .with_timeframe(self.timeframe)
                            .with_action(EventAction::CycleTimeout)
                            .with_decision_id(decision_id),
                        )
                        .await;
                }
                Ok(Err(e)) => {
                    summary.symbols_processed += 1;
                    summary.data_errors += 1;
                    tracing::error!(%symbol, "symbol pipeline failed: {e:#}");
                    let _ = self
                        .events
                        .append(
                            &EventRecord::error(EventTag::Cycle)
                                .with_symbol(&symbol)
                                .with_timeframe(self.timeframe)
                                .with_action(EventAction::ProcessError)
                                .with_decision_id(decision_id)
                                .with_payload(json!({ "error": format!("{e:#}") })),
                        )
                        .await;
                }
                Ok(Ok(outcome)) => summary.absorb(&outcome),
            }
        }

        // Snapshot after all pipelines, stamped at arrival so the series
        // stays strictly monotonic even for partial cycles.
        let nav_row = self.nav_engine.snapshot(Utc::now()).await?;
        summary.wall_time_ms = started.elapsed().as_millis() as u64;

        self.events
            .append(
                &EventRecord::info(EventTag::Cycle)
                    .with_action(EventAction::EndCycle)
                    .with_payload(summary.to_payload()),
            )
            .await?;
        tracing::info!(
            nav = %nav_row.nav_usd,
            opened = summary.trades_opened,
            closed = summary.trades_closed,
            "cycle complete in {}ms",
            summary.wall_time_ms
        );
        Ok(summary)
    }

    /// Fixed-interval loop until the shutdown flag flips. A cycle in
    /// progress completes; missed ticks are skipped, never replayed.
    pub async fn run_forever(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker =
            tokio::time::interval(Duration::from_secs(self.config.trading.cycle_seconds));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = Arc::clone(&self).run_once(Utc::now()).await {
                        tracing::error!("cycle failed: {e:#}");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("shutdown requested, stopping cycle loop");
                        break;
                    }
                }
            }
        }
    }

    async fn process_symbol(
        &self,
        symbol: &str,
        nav: Decimal,
        decision_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SymbolOutcome> {
        let mut outcome = SymbolOutcome::default();
        let tf = self.timeframe;

        if self.killswitch.paused(symbol).await? {
            tracing::debug!(symbol, "symbol paused pending operator reset");
            return Ok(outcome);
        }

        // Ingest. Only closed bars count; the exchange hands back the
        // forming bar as well.
        let mut fetched = self
            .exchange
            .fetch_ohlcv(symbol, tf, self.config.trading.fetch_limit)
            .await?;
        fetched.retain(|candle| candle.close_ts() <= now);
        let inserted = self.candles.insert_batch(&fetched).await?;

        let newest = match fetched.last() {
            Some(candle) => candle.clone(),
            None => self
                .candles
                .latest(symbol, tf)
                .await?
                .context("no candles available")?,
        };
        if now - newest.close_ts() > tf.duration() * 2 {
            self.events
                .append(
                    &EventRecord::new(papertrade_core::EventLevel::Warn, vec![EventTag::Risk])
                        .with_symbol(symbol)
                        .with_timeframe(tf)
                        .with_action(EventAction::StaleData)
                        .with_decision_id(decision_id)
                        .with_payload(json!({
                            "newest_close": newest.close_ts().to_rfc3339(),
                            "lag_secs": (now - newest.close_ts()).num_seconds(),
                        })),
                )
                .await?;
            outcome.data_error = true;
            return Ok(outcome);
        }

        // Features for everything new this cycle.
        let bars = self
            .candles
            .recent(symbol, tf, self.config.trading.fetch_limit as i64)
            .await?;
        if bars.is_empty() {
            return Ok(outcome);
        }
        let frame = FeatureFrame::compute(&bars);
        let new_rows = (inserted as usize).clamp(1, bars.len());
        let feature_rows: Vec<FeatureRow> = (bars.len() - new_rows..bars.len())
            .map(|i| {
                FeatureRow::from_snapshot(symbol, tf.as_str(), bars[i].ts, &frame.snapshot(i))
            })
            .collect();
        self.features.upsert_batch(&feature_rows).await?;
        self.events
            .append(
                &EventRecord::info(EventTag::Features)
                    .with_symbol(symbol)
                    .with_timeframe(tf)
                    .with_decision_id(decision_id)
                    .with_payload(json!({ "bars": bars.len(), "new": inserted })),
            )
            .await?;

        let i = bars.len() - 1;
        let last_bar = bars[i].clone();
        let atr = frame.atr14[i];

        let regime = classify_regime(&frame, i);
        self.events
            .append(
                &EventRecord::info(EventTag::Signal)
                    .with_symbol(symbol)
                    .with_timeframe(tf)
                    .with_action(match regime {
                        Regime::Trend => EventAction::RegimeTrend,
                        Regime::Chop => EventAction::RegimeChop,
                    })
                    .with_decision_id(decision_id),
            )
            .await?;

        // Kill-switch: evaluate fresh, flatten on trigger.
        let ks = &self.config.risk.kill_switch;
        let mut kill_active = self.killswitch.active(symbol, now).await?;
        if !kill_active {
            let since = now - chrono::Duration::days(ks.baseline_days);
            let history = self.candles.since(symbol, tf, since).await?;
            let closes: Vec<f64> = history.iter().map(Candle::close_f64).collect();
            let check = KillSwitchCheck::evaluate(&closes, ks.vol_window_bars, ks.sigma_multiplier);
            if check.triggered {
                let until = now + tf.duration() * ks.block_bars as i32;
                self.killswitch.engage(symbol, until).await?;
                kill_active = true;
                self.events
                    .append(
                        &EventRecord::new(
                            papertrade_core::EventLevel::Warn,
                            vec![EventTag::Risk],
                        )
                        .with_symbol(symbol)
                        .with_timeframe(tf)
                        .with_action(EventAction::KillSwitch)
                        .with_decision_id(decision_id)
                        .with_payload(json!({
                            "sigma": check.sigma,
                            "baseline_median": check.baseline_median,
                            "blocked_until": until.to_rfc3339(),
                        })),
                    )
                    .await?;

                if let Some(position) = self.positions.get(symbol).await? {
                    self.close_position(&position, &last_bar, ExitReason::Kill, decision_id, now)
                        .await?;
                    outcome.closed = true;
                }
                return Ok(outcome);
            }
        }

        // Invariant: the position table and the open-trade ledger must
        // agree exactly.
        let position = self.positions.get(symbol).await?;
        let open_trades = self.trades.open_trades(symbol).await?;
        let consistent = match (&position, open_trades.as_slice()) {
            (Some(position), [trade]) => position.trade_id == Some(trade.id),
            (None, []) => true,
            _ => false,
        };
        if !consistent {
            tracing::error!(
                symbol,
                positions = position.is_some() as usize,
                open_trades = open_trades.len(),
                "position table and trade ledger disagree, flattening and pausing"
            );
            self.events
                .append(
                    &EventRecord::error(EventTag::Risk)
                        .with_symbol(symbol)
                        .with_timeframe(tf)
                        .with_action(EventAction::Invariant)
                        .with_decision_id(decision_id)
                        .with_payload(json!({
                            "position": position.is_some(),
                            "open_trades": open_trades.len(),
                        })),
                )
                .await?;
            for trade in &open_trades {
                if let Err(e) = self
                    .broker
                    .close_trade(
                        trade.id,
                        last_bar.close,
                        last_bar.high,
                        last_bar.low,
                        ExitReason::Invariant,
                        now,
                    )
                    .await
                {
                    tracing::error!(symbol, trade_id = trade.id, "defensive close failed: {e}");
                }
            }
            self.positions.delete(symbol).await?;
            self.killswitch.pause(symbol).await?;
            outcome.data_error = true;
            return Ok(outcome);
        }

        // Manage an open position; an exit or a held position both end
        // the pipeline here (entries need a flat book).
        if let Some(position) = position {
            outcome.closed = self
                .manage_position(&position, &bars, &frame, decision_id, now)
                .await?;
            return Ok(outcome);
        }

        // Warm-up gate: no signals until the slowest indicator has history.
        if bars.len() < warmup_bars() {
            return Ok(outcome);
        }

        let entry_params = EntryParams {
            rvol_threshold: self.config.risk.rvol_threshold,
            atr_stop_multiplier: self.config.risk.atr_stop_multiplier,
            enable_shorts: self.config.trading.enable_shorts,
        };
        let Some(signal) = check_entry(&frame, &bars, i, regime, &entry_params) else {
            self.events
                .append(
                    &EventRecord::info(EventTag::Proposal)
                        .with_symbol(symbol)
                        .with_timeframe(tf)
                        .with_action(EventAction::SkipNoSignal)
                        .with_decision_id(decision_id),
                )
                .await?;
            return Ok(outcome);
        };
        outcome.signal_fired = true;

        let cooldown_active = self.cooldown_active(symbol, now).await?;

        // Sentiment (cached within the refresh window).
        let sentiment = self.sentiment.snapshot(symbol, now).await?;
        self.events
            .append(
                &EventRecord::info(EventTag::Sentiment)
                    .with_symbol(symbol)
                    .with_timeframe(tf)
                    .with_decision_id(decision_id)
                    .with_payload(json!({
                        "sent_24h": sentiment.sent_24h,
                        "sent_7d": sentiment.sent_7d,
                        "sent_trend": sentiment.sent_trend,
                        "burst": sentiment.burst,
                    })),
            )
            .await?;

        let entry_price = last_bar.close;
        let stop_price =
            Decimal::from_f64(signal.stop).context("stop price does not fit a decimal")?;
        let qty = position_size(nav, entry_price, stop_price, &self.sizing);
        let Some(qty) = qty else {
            self.reject(symbol, decision_id, RejectReason::QtyZero).await?;
            outcome.validator_rejected = true;
            return Ok(outcome);
        };

        // Advisor -> consultant -> reconciliation.
        let features_snapshot = frame.snapshot(i);
        let (proposal, review, review_outcome) = match &self.agents {
            Some(agents) => {
                let ctx = AdvisorContext {
                    symbol: symbol.to_string(),
                    regime,
                    signal_side: signal.side,
                    features: features_snapshot.clone(),
                    sentiment: Some(sentiment.clone()),
                    position: None,
                    risk_per_trade: self.config.risk.risk_per_trade,
                    max_exposure: self.config.risk.max_exposure_per_symbol,
                };
                let proposal = match agents.advisor.propose(&ctx).await {
                    Ok(proposal) => proposal,
                    Err(e) => {
                        self.events
                            .append(
                                &EventRecord::new(
                                    papertrade_core::EventLevel::Warn,
                                    vec![EventTag::Proposal],
                                )
                                .with_symbol(symbol)
                                .with_timeframe(tf)
                                .with_action(EventAction::AdvisorFail)
                                .with_decision_id(decision_id)
                                .with_payload(json!({ "error": e.to_string() })),
                            )
                            .await?;
                        return Ok(outcome);
                    }
                };
                self.events
                    .append(
                        &EventRecord::info(EventTag::Proposal)
                            .with_symbol(symbol)
                            .with_timeframe(tf)
                            .with_decision_id(decision_id)
                            .with_payload(
                                serde_json::to_value(&proposal).unwrap_or_else(|_| json!({})),
                            ),
                    )
                    .await?;

                // The advisor may only refine the deterministic signal; a
                // flat or contrary side is a decline.
                if proposal.side.to_side() != Some(signal.side) {
                    self.events
                        .append(
                            &EventRecord::info(EventTag::Proposal)
                                .with_symbol(symbol)
                                .with_timeframe(tf)
                                .with_action(EventAction::SkipNoSignal)
                                .with_decision_id(decision_id)
                                .with_payload(json!({ "advisor_declined": true })),
                        )
                        .await?;
                    return Ok(outcome);
                }

                let market_context = MarketContext {
                    regime,
                    sentiment_24h: sentiment.sent_24h,
                    sentiment_trend: sentiment.sent_trend,
                    volatility_band: VolatilityBand::from_atr_pct(
                        atr / last_bar.close_f64().max(f64::MIN_POSITIVE),
                    ),
                };
                let result = agents.consultant.review(&proposal, &market_context).await;
                let action = if result.auto_approved {
                    EventAction::ConsultantAutoApprove
                } else {
                    match result.review.recommendation {
                        papertrade_agents::Recommendation::Approve => {
                            EventAction::ConsultantApprove
                        }
                        papertrade_agents::Recommendation::Reject => EventAction::ConsultantReject,
                        papertrade_agents::Recommendation::Modify => EventAction::ConsultantModify,
                    }
                };
                self.events
                    .append(
                        &EventRecord::info(EventTag::Consultant)
                            .with_symbol(symbol)
                            .with_timeframe(tf)
                            .with_action(action)
                            .with_decision_id(decision_id)
                            .with_payload(
                                serde_json::to_value(&result.review)
                                    .unwrap_or_else(|_| json!({})),
                            ),
                    )
                    .await?;

                let review_outcome =
                    reconcile(&result.review, signal.side, signal.entry, signal.atr, qty);
                (proposal, Some(result.review), review_outcome)
            }
            None => (
                Proposal::deterministic(symbol, signal.side, self.config.risk.atr_stop_multiplier),
                None,
                ReviewOutcome::Approve,
            ),
        };

        let (final_qty, final_stop, decision) = match review_outcome {
            ReviewOutcome::Approve => (qty, stop_price, FinalDecision::Executed),
            ReviewOutcome::Reject { concerns } => {
                tracing::info!(symbol, ?concerns, "consultant rejected the proposal");
                return Ok(outcome);
            }
            ReviewOutcome::Modify {
                stop,
                qty: modified_qty,
                ..
            } => (
                modified_qty.unwrap_or(qty),
                stop.unwrap_or(stop_price),
                FinalDecision::ExecutedModified {
                    stop,
                    qty: modified_qty,
                },
            ),
        };

        // Risk validator, re-checking caps on whatever the consultant
        // left us with.
        let validation = ValidationContext {
            regime,
            side: signal.side,
            qty: final_qty,
            entry: entry_price,
            stop: final_stop,
            nav,
            max_exposure_per_symbol: self.sizing.max_exposure_per_symbol,
            risk_per_trade: self.sizing.risk_per_trade,
            position_exists: false,
            kill_switch_active: kill_active,
            cooldown_active,
            paused: false,
            schema_valid: proposal.validate().is_ok(),
        };
        if let Err(reason) = validate(&validation) {
            self.reject(symbol, decision_id, reason).await?;
            outcome.validator_rejected = true;
            return Ok(outcome);
        }

        // Execute.
        let rationale = DecisionRationale {
            decision_id,
            regime,
            indicators: features_snapshot,
            sentiment: Some(sentiment),
            proposal,
            review,
            decision,
        };
        let request = OpenRequest {
            symbol: symbol.to_string(),
            side: signal.side,
            qty: final_qty,
            reference: entry_price,
            bar_high: last_bar.high,
            bar_low: last_bar.low,
            stop: final_stop,
            ts: now,
            decision_id,
            rationale: rationale.to_json(),
        };
        match self.broker.open_trade(&request).await {
            Ok(report) => {
                self.events
                    .append(
                        &EventRecord::info(EventTag::Trade)
                            .with_symbol(symbol)
                            .with_timeframe(tf)
                            .with_action(match signal.side {
                                Side::Long => EventAction::OpenLong,
                                Side::Short => EventAction::OpenShort,
                            })
                            .with_decision_id(decision_id)
                            .with_trade_id(report.trade_id)
                            .with_payload(json!({
                                "qty": final_qty.to_string(),
                                "fill_price": report.fill_price.to_string(),
                                "fees": report.fees.to_string(),
                                "slippage_bps": report.slippage_bps.to_string(),
                                "stop": final_stop.to_string(),
                            })),
                    )
                    .await?;
                outcome.opened = true;
            }
            Err(BrokerError::PositionExists { .. }) => {
                self.reject(symbol, decision_id, RejectReason::PositionExists)
                    .await?;
                outcome.validator_rejected = true;
            }
            Err(e) => return Err(e.into()),
        }

        Ok(outcome)
    }

    /// Evaluates the exit rules on an open position. Returns true when the
    /// position was closed.
    async fn manage_position(
        &self,
        position: &PositionRow,
        bars: &[Candle],
        frame: &FeatureFrame,
        decision_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let i = bars.len() - 1;
        let bar = &bars[i];
        let atr = frame.atr14[i];
        let side = position
            .parsed_side()
            .with_context(|| format!("position for {} has unknown side", position.symbol))?;

        let held: Vec<&Candle> = bars
            .iter()
            .filter(|candle| candle.ts >= position.opened_ts)
            .collect();
        let bars_since_entry = held.len().saturating_sub(1) as i64;

        let (extreme, extreme_index) = match side {
            Side::Long => held.iter().enumerate().fold(
                (f64::NEG_INFINITY, 0usize),
                |(best, at), (index, candle)| {
                    let high = candle.high_f64();
                    if high > best {
                        (high, index)
                    } else {
                        (best, at)
                    }
                },
            ),
            Side::Short => held.iter().enumerate().fold(
                (f64::INFINITY, 0usize),
                |(best, at), (index, candle)| {
                    let low = candle.low_f64();
                    if low < best {
                        (low, index)
                    } else {
                        (best, at)
                    }
                },
            ),
        };
        let bars_since_extreme = held.len().saturating_sub(1).saturating_sub(extreme_index) as i64;

        let fallback_stop = || {
            let avg = position.avg_price.to_f64().unwrap_or(0.0);
            avg - side.sign_f64() * self.config.risk.atr_stop_multiplier * atr.abs()
        };
        let stop = position
            .stop
            .and_then(|stop| stop.to_f64())
            .unwrap_or_else(fallback_stop);

        let view = OpenPositionView {
            side,
            stop,
            extreme_since_entry: extreme,
            bars_since_entry,
            bars_since_extreme,
        };
        let exit_params = ExitParams {
            atr_stop_multiplier: self.config.risk.atr_stop_multiplier,
            time_stop_bars: self.config.risk.time_stop_bars,
        };

        match evaluate_exit(&view, bar, atr, &exit_params) {
            ExitDecision::Exit { reason, price } => {
                let reference = if reason == ExitReason::Stop {
                    position.stop.unwrap_or(
                        Decimal::from_f64(price).context("exit price does not fit a decimal")?,
                    )
                } else {
                    Decimal::from_f64(price).context("exit price does not fit a decimal")?
                };
                let trade_id = position
                    .trade_id
                    .context("open position carries no trade id")?;
                let report = self
                    .broker
                    .close_trade(trade_id, reference, bar.high, bar.low, reason, now)
                    .await?;
                self.events
                    .append(
                        &EventRecord::info(EventTag::Exit)
                            .with_symbol(&position.symbol)
                            .with_timeframe(self.timeframe)
                            .with_action(exit_action(reason))
                            .with_decision_id(decision_id)
                            .with_trade_id(trade_id)
                            .with_payload(json!({
                                "fill_price": report.fill_price.to_string(),
                                "pnl": report.pnl.to_string(),
                                "exit_fees": report.exit_fees.to_string(),
                                "reason": reason.as_str(),
                            })),
                    )
                    .await?;
                Ok(true)
            }
            ExitDecision::UpdateStop { stop } => {
                let stop = Decimal::from_f64(stop).context("stop does not fit a decimal")?;
                self.positions
                    .update_stop(&position.symbol, stop, now)
                    .await?;
                self.events
                    .append(
                        &EventRecord::info(EventTag::Trade)
                            .with_symbol(&position.symbol)
                            .with_timeframe(self.timeframe)
                            .with_action(EventAction::StopUpdate)
                            .with_decision_id(decision_id)
                            .with_trade_id(position.trade_id.unwrap_or_default())
                            .with_payload(json!({ "stop": stop.to_string() })),
                    )
                    .await?;
                Ok(false)
            }
            ExitDecision::Hold => Ok(false),
        }
    }

    /// Closes a position outside the exit rules (kill-switch flatten).
    async fn close_position(
        &self,
        position: &PositionRow,
        bar: &Candle,
        reason: ExitReason,
        decision_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let Some(trade_id) = position.trade_id else {
            // Orphan row; the invariant pass will pause the symbol.
            self.positions.delete(&position.symbol).await?;
            return Ok(());
        };
        let report = self
            .broker
            .close_trade(trade_id, bar.close, bar.high, bar.low, reason, now)
            .await?;
        self.events
            .append(
                &EventRecord::info(EventTag::Exit)
                    .with_symbol(&position.symbol)
                    .with_timeframe(self.timeframe)
                    .with_action(exit_action(reason))
                    .with_decision_id(decision_id)
                    .with_trade_id(trade_id)
                    .with_payload(json!({
                        "fill_price": report.fill_price.to_string(),
                        "pnl": report.pnl.to_string(),
                        "reason": reason.as_str(),
                    })),
            )
            .await?;
        Ok(())
    }

    /// True within the post-stop-out re-entry suppression window.
    async fn cooldown_active(&self, symbol: &str, now: DateTime<Utc>) -> Result<bool> {
        let Some(trade) = self.trades.last_closed(symbol).await? else {
            return Ok(false);
        };
        if trade.parsed_reason() != Some(ExitReason::Stop) {
            return Ok(false);
        }
        let Some(exit_ts) = trade.exit_ts else {
            return Ok(false);
        };
        Ok(now - exit_ts < self.timeframe.duration() * self.config.risk.cooldown_bars as i32)
    }

    async fn reject(&self, symbol: &str, decision_id: Uuid, reason: RejectReason) -> Result<()> {
        tracing::info!(symbol, reason = reason.as_str(), "entry rejected");
        self.events
            .append(
                &EventRecord::info(EventTag::Validation)
                    .with_symbol(symbol)
                    .with_timeframe(self.timeframe)
                    .with_action(EventAction::ValidationReject)
                    .with_decision_id(decision_id)
                    .with_payload(json!({ "reason": reason.as_str() })),
            )
            .await
    }
}

const fn exit_action(reason: ExitReason) -> EventAction {
    match reason {
        ExitReason::Stop => EventAction::ExitStop,
        ExitReason::Time => EventAction::ExitTime,
        ExitReason::Kill => EventAction::ExitKill,
        ExitReason::Invariant => EventAction::Invariant,
    }
}
