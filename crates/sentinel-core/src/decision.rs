//! Decision ladder
//!
//! Maps a deterministic score plus raw signals to a coarse decision. The
//! ladder is an ordered list of rungs and the first rung whose guard holds
//! wins, so a new critical override is added by inserting a rung.

use serde::{Deserialize, Serialize};

use crate::models::*;

pub const ENFORCE_THRESHOLD: f64 = 80.0;
pub const HIGH_RISK_THRESHOLD: f64 = 60.0;
pub const MONITOR_THRESHOLD: f64 = 30.0;

/// Score boundaries between decisions, used for confidence estimation
pub const DECISION_BOUNDARIES: [f64; 3] =
    [MONITOR_THRESHOLD, HIGH_RISK_THRESHOLD, ENFORCE_THRESHOLD];

/// Result of walking the ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedDecision {
    pub decision: Decision,
    pub needs_escalation: bool,
    pub rule: DecisionRule,
}

/// Conditions that force enforcement regardless of score
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CriticalCondition {
    SanctionedAddress,
    /// Health factor below 1.05 while market volatility is above 70
    LiquidationUnderVolatility,
    /// At least one protocol contract is paused
    ProtocolPaused,
}

impl CriticalCondition {
    pub fn describe(&self) -> &'static str {
        match self {
            CriticalCondition::SanctionedAddress => "interaction with a sanctioned address",
            CriticalCondition::LiquidationUnderVolatility => {
                "health factor near liquidation during high market volatility"
            }
            CriticalCondition::ProtocolPaused => "protocol contracts are paused",
        }
    }
}

/// Guard of a single rung
#[derive(Debug, Clone, Copy)]
enum Guard {
    Critical,
    ScoreAtLeast(f64),
    AmbiguousScoreAtLeast(f64),
    Always,
}

struct Rung {
    guard: Guard,
    rule: DecisionRule,
    decision: Decision,
    escalate: bool,
}

static LADDER: [Rung; 6] = [
    Rung {
        guard: Guard::Critical,
        rule: DecisionRule::CriticalOverride,
        decision: Decision::EnforceAction,
        escalate: false,
    },
    Rung {
        guard: Guard::ScoreAtLeast(ENFORCE_THRESHOLD),
        rule: DecisionRule::VeryHighScore,
        decision: Decision::EnforceAction,
        escalate: false,
    },
    Rung {
        guard: Guard::AmbiguousScoreAtLeast(HIGH_RISK_THRESHOLD),
        rule: DecisionRule::AmbiguousHighScore,
        decision: Decision::RequestSeverityAnalysis,
        escalate: true,
    },
    Rung {
        guard: Guard::ScoreAtLeast(HIGH_RISK_THRESHOLD),
        rule: DecisionRule::HighScore,
        decision: Decision::EnforceAction,
        escalate: false,
    },
    Rung {
        guard: Guard::ScoreAtLeast(MONITOR_THRESHOLD),
        rule: DecisionRule::MediumScore,
        decision: Decision::Monitor,
        escalate: false,
    },
    Rung {
        guard: Guard::Always,
        rule: DecisionRule::LowScore,
        decision: Decision::NoAction,
        escalate: false,
    },
];

/// Map a risk score to a decision and whether it needs escalation.
pub fn decide(
    score: f64,
    signals: &WalletSignals,
    protocol: &ProtocolHealthIndicators,
    market: &MarketVolatilityFlags,
) -> MappedDecision {
    let critical = !critical_conditions(signals, protocol, market).is_empty();

    let rung = LADDER
        .iter()
        .find(|rung| match rung.guard {
            Guard::Critical => critical,
            Guard::ScoreAtLeast(threshold) => score >= threshold,
            Guard::AmbiguousScoreAtLeast(threshold) => {
                score >= threshold && has_positive_signals(signals) && has_negative_signals(signals)
            }
            Guard::Always => true,
        })
        .unwrap_or(&LADDER[LADDER.len() - 1]);

    MappedDecision {
        decision: rung.decision,
        needs_escalation: rung.escalate,
        rule: rung.rule,
    }
}

/// Critical conditions that currently hold, in evaluation order
pub fn critical_conditions(
    signals: &WalletSignals,
    protocol: &ProtocolHealthIndicators,
    market: &MarketVolatilityFlags,
) -> Vec<CriticalCondition> {
    let mut conditions = Vec::new();

    if signals.suspicious_patterns.sanctioned_address_interaction {
        conditions.push(CriticalCondition::SanctionedAddress);
    }

    if signals
        .health_factor()
        .is_some_and(|hf| hf < 1.05 && market.volatility_index > 70.0)
    {
        conditions.push(CriticalCondition::LiquidationUnderVolatility);
    }

    if !protocol.paused_contracts.is_empty() {
        conditions.push(CriticalCondition::ProtocolPaused);
    }

    conditions
}

/// Reputation signals that argue for a legitimate user
pub fn has_positive_signals(signals: &WalletSignals) -> bool {
    signals.ens().is_some()
        || signals.has_gitcoin_passport
        || signals.age_in_days > 365
        || signals.has_strong_reputation()
}

/// Behavioral signals that argue for a bad actor
pub fn has_negative_signals(signals: &WalletSignals) -> bool {
    let patterns = &signals.suspicious_patterns;
    patterns.mixer_interaction
        || patterns.rapid_draining
        || patterns.unusual_activity
        || patterns.new_wallet_high_value
}
