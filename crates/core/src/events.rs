//! Event-log vocabulary and the append-only event record.
//!
//! The relational `event_log` is the canonical audit surface. Tags and
//! actions are closed vocabularies; every event emitted while processing a
//! symbol in one cycle carries that cycle's decision id.

use crate::types::Timeframe;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity of an event-log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventLevel {
    Info,
    Warn,
    Error,
}

impl EventLevel {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }

    /// Parses from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "INFO" => Some(Self::Info),
            "WARN" => Some(Self::Warn),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Closed tag vocabulary for event-log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventTag {
    Cycle,
    Data,
    Features,
    Signal,
    Sentiment,
    Proposal,
    Consultant,
    Validation,
    Trade,
    Exit,
    Risk,
    Reflection,
    Qa,
    Error,
}

impl EventTag {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cycle => "CYCLE",
            Self::Data => "DATA",
            Self::Features => "FEATURES",
            Self::Signal => "SIGNAL",
            Self::Sentiment => "SENTIMENT",
            Self::Proposal => "PROPOSAL",
            Self::Consultant => "CONSULTANT",
            Self::Validation => "VALIDATION",
            Self::Trade => "TRADE",
            Self::Exit => "EXIT",
            Self::Risk => "RISK",
            Self::Reflection => "REFLECTION",
            Self::Qa => "QA",
            Self::Error => "ERROR",
        }
    }

    /// Parses from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "CYCLE" => Some(Self::Cycle),
            "DATA" => Some(Self::Data),
            "FEATURES" => Some(Self::Features),
            "SIGNAL" => Some(Self::Signal),
            "SENTIMENT" => Some(Self::Sentiment),
            "PROPOSAL" => Some(Self::Proposal),
            "CONSULTANT" => Some(Self::Consultant),
            "VALIDATION" => Some(Self::Validation),
            "TRADE" => Some(Self::Trade),
            "EXIT" => Some(Self::Exit),
            "RISK" => Some(Self::Risk),
            "REFLECTION" => Some(Self::Reflection),
            "QA" => Some(Self::Qa),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Closed action vocabulary for event-log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventAction {
    StartCycle,
    EndCycle,
    CycleTimeout,
    InitializeNav,
    RegimeTrend,
    RegimeChop,
    SkipNoSignal,
    AdvisorFail,
    ConsultantApprove,
    ConsultantReject,
    ConsultantModify,
    ConsultantAutoApprove,
    ValidationReject,
    OpenLong,
    OpenShort,
    ExitStop,
    ExitTime,
    ExitKill,
    StopUpdate,
    StaleData,
    KillSwitch,
    Invariant,
    ProcessError,
}

impl EventAction {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StartCycle => "START_CYCLE",
            Self::EndCycle => "END_CYCLE",
            Self::CycleTimeout => "CYCLE_TIMEOUT",
            Self::InitializeNav => "INITIALIZE_NAV",
            Self::RegimeTrend => "REGIME_TREND",
            Self::RegimeChop => "REGIME_CHOP",
            Self::SkipNoSignal => "SKIP_NO_SIGNAL",
            Self::AdvisorFail => "ADVISOR_FAIL",
            Self::ConsultantApprove => "CONSULTANT_APPROVE",
            Self::ConsultantReject => "CONSULTANT_REJECT",
            Self::ConsultantModify => "CONSULTANT_MODIFY",
            Self::ConsultantAutoApprove => "CONSULTANT_AUTO_APPROVE",
            Self::ValidationReject => "VALIDATION_REJECT",
            Self::OpenLong => "OPEN_LONG",
            Self::OpenShort => "OPEN_SHORT",
            Self::ExitStop => "EXIT_STOP",
            Self::ExitTime => "EXIT_TIME",
            Self::ExitKill => "EXIT_KILL",
            Self::StopUpdate => "STOP_UPDATE",
            Self::StaleData => "STALE_DATA",
            Self::KillSwitch => "KILL_SWITCH",
            Self::Invariant => "INVARIANT",
            Self::ProcessError => "PROCESS_ERROR",
        }
    }
}

/// One append-only event-log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub ts: DateTime<Utc>,
    pub level: EventLevel,
    pub tags: Vec<EventTag>,
    pub symbol: Option<String>,
    pub timeframe: Option<Timeframe>,
    pub action: Option<EventAction>,
    pub decision_id: Option<Uuid>,
    pub trade_id: Option<i64>,
    pub payload: Option<serde_json::Value>,
}

impl EventRecord {
    /// Creates a new record stamped with the current time.
    #[must_use]
    pub fn new(level: EventLevel, tags: Vec<EventTag>) -> Self {
        Self {
            ts: Utc::now(),
            level,
            tags,
            symbol: None,
            timeframe: None,
            action: None,
            decision_id: None,
            trade_id: None,
            payload: None,
        }
    }

    /// Shorthand for an INFO record with a single tag.
    #[must_use]
    pub fn info(tag: EventTag) -> Self {
        Self::new(EventLevel::Info, vec![tag])
    }

    /// Shorthand for an ERROR record tagged with `tag` and `ERROR`.
    #[must_use]
    pub fn error(tag: EventTag) -> Self {
        Self::new(EventLevel::Error, vec![tag, EventTag::Error])
    }

    #[must_use]
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    #[must_use]
    pub fn with_timeframe(mut self, timeframe: Timeframe) -> Self {
        self.timeframe = Some(timeframe);
        self
    }

    #[must_use]
    pub fn with_action(mut self, action: EventAction) -> Self {
        self.action = Some(action);
        self
    }

    #[must_use]
    pub fn with_decision_id(mut self, decision_id: Uuid) -> Self {
        self.decision_id = Some(decision_id);
        self
    }

    #[must_use]
    pub fn with_trade_id(mut self, trade_id: i64) -> Self {
        self.trade_id = Some(trade_id);
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_roundtrip() {
        for tag in [
            EventTag::Cycle,
            EventTag::Data,
            EventTag::Features,
            EventTag::Signal,
            EventTag::Sentiment,
            EventTag::Proposal,
            EventTag::Consultant,
            EventTag::Validation,
            EventTag::Trade,
            EventTag::Exit,
            EventTag::Risk,
            EventTag::Reflection,
            EventTag::Qa,
            EventTag::Error,
        ] {
            assert_eq!(EventTag::parse(tag.as_str()), Some(tag));
        }
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(EventLevel::parse("info"), Some(EventLevel::Info));
        assert_eq!(EventLevel::parse("WARN"), Some(EventLevel::Warn));
        assert_eq!(EventLevel::parse("fatal"), None);
    }

    #[test]
    fn test_builder_carries_decision_id() {
        let decision_id = Uuid::new_v4();
        let record = EventRecord::info(EventTag::Signal)
            .with_symbol("BTC/USD")
            .with_action(EventAction::RegimeTrend)
            .with_decision_id(decision_id);

        assert_eq!(record.symbol.as_deref(), Some("BTC/USD"));
        assert_eq!(record.action, Some(EventAction::RegimeTrend));
        assert_eq!(record.decision_id, Some(decision_id));
        assert!(record.trade_id.is_none());
    }

    #[test]
    fn test_error_record_tags() {
        let record = EventRecord::error(EventTag::Cycle);
        assert_eq!(record.level, EventLevel::Error);
        assert_eq!(record.tags, vec![EventTag::Cycle, EventTag::Error]);
    }
}
