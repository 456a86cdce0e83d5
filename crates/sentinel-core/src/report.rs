//! Human-readable report synthesis
//!
//! Reasoning, confidence, recommendations and flags for a decision. Flags
//! and recommendations are derived from the final decision plus the raw
//! signals, never recomputed from a fused score.

use serde::{Deserialize, Serialize};

use crate::decision::{critical_conditions, decide, MappedDecision, DECISION_BOUNDARIES};
use crate::models::*;
use crate::scoring::{score_breakdown, ScoreBreakdown};

/// Outcome of the deterministic stage alone
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleAssessment {
    pub risk_score: f64,
    pub breakdown: ScoreBreakdown,
    pub decision: Decision,
    pub needs_escalation: bool,
    pub rule: DecisionRule,
}

/// Run the scorer and the decision ladder over a request.
pub fn assess_rules(input: &AgentInput) -> RuleAssessment {
    let breakdown = score_breakdown(input);
    let risk_score = breakdown.total();
    let MappedDecision {
        decision,
        needs_escalation,
        rule,
    } = decide(
        risk_score,
        &input.wallet_signals,
        &input.protocol_health,
        &input.market_volatility,
    );

    RuleAssessment {
        risk_score,
        breakdown,
        decision,
        needs_escalation,
        rule,
    }
}

/// Confidence of a deterministic decision.
///
/// Scores close to a decision boundary are the least trustworthy.
pub fn rule_based_confidence(risk_score: f64) -> f64 {
    let distance = DECISION_BOUNDARIES
        .iter()
        .map(|boundary| (risk_score - boundary).abs())
        .fold(f64::INFINITY, f64::min);

    if distance >= 10.0 {
        90.0
    } else if distance >= 5.0 {
        75.0
    } else {
        60.0
    }
}

/// Explain a deterministic decision from the signals that drove it.
pub fn rule_based_reasoning(risk_score: f64, input: &AgentInput) -> String {
    let signals = &input.wallet_signals;
    let protocol = &input.protocol_health;
    let market = &input.market_volatility;

    let mut parts = vec![format!("Risk Score: {risk_score:.1}/100.")];

    for condition in critical_conditions(signals, protocol, market) {
        parts.push(format!("Critical: {}.", condition.describe()));
    }

    if signals.age_in_days < 30 {
        parts.push(format!("New wallet ({} days old).", signals.age_in_days));
    }

    if let Some(hf) = signals.health_factor().filter(|hf| *hf < 1.5) {
        parts.push(format!("Health factor {hf:.2} - liquidation risk."));
    }

    if signals.suspicious_patterns.rapid_draining {
        parts.push("Rapid asset drainage detected.".to_string());
    }
    if signals.suspicious_patterns.mixer_interaction {
        parts.push("Privacy mixer interaction found.".to_string());
    }

    if market.volatility_index > 70.0 {
        parts.push(format!(
            "High market volatility ({}/100).",
            market.volatility_index
        ));
    }

    if protocol.default_rate > 5.0 {
        parts.push(format!(
            "Elevated protocol default rate ({}%).",
            protocol.default_rate
        ));
    }

    if signals.has_gitcoin_passport {
        parts.push("Gitcoin Passport verified.".to_string());
    }
    if let Some(ens) = signals.ens() {
        parts.push(format!("ENS: {ens}."));
    }

    parts.join(" ")
}

/// Actionable recommendations for the final decision
pub fn recommendations(decision: Decision, signals: &WalletSignals) -> Vec<String> {
    let mut recs: Vec<String> = Vec::new();
    let patterns = &signals.suspicious_patterns;
    let hf = signals.health_factor();

    match decision {
        Decision::NoAction => {
            recs.push("Continue normal monitoring".into());
            if hf.is_some_and(|hf| hf < 2.0) {
                recs.push("Monitor health factor - currently safe but could improve".into());
            }
        }
        Decision::Monitor => {
            recs.push("Increase monitoring frequency to hourly".into());
            if hf.is_some_and(|hf| hf < 1.5) {
                recs.push("Set alert for health factor < 1.2".into());
            }
            if patterns.unusual_activity {
                recs.push("Watch for continued unusual transaction patterns".into());
            }
            recs.push("Review again in 24 hours".into());
        }
        Decision::RequestSeverityAnalysis => {
            recs.push("Escalate to human review or advanced severity analysis".into());
            recs.push("Gather additional context on flagged behaviors".into());
            if patterns.mixer_interaction {
                recs.push(
                    "Investigate mixer usage - potentially legitimate privacy concern".into(),
                );
            }
        }
        Decision::EnforceAction => {
            recs.push("IMMEDIATE: Notify wallet owner".into());
            if hf.is_some_and(|hf| hf < 1.2) {
                recs.push("IMMEDIATE: Suggest collateral top-up".into());
                recs.push("IMMEDIATE: Prepare liquidation if health factor < 1.0".into());
            }
            if patterns.rapid_draining {
                recs.push("URGENT: Investigate potential compromise".into());
                recs.push("Consider temporary position freeze".into());
            }
        }
    }

    // Compliance trigger, whichever stage produced the decision
    if patterns.sanctioned_address_interaction {
        recs.push("IMMEDIATE: Freeze position pending compliance review".into());
    }

    recs
}

/// Flag tokens, ordered age, suspicious patterns, health factor, market, reputation
pub fn flags(signals: &WalletSignals, market: &MarketVolatilityFlags) -> Vec<String> {
    let mut flags: Vec<&'static str> = Vec::new();
    let patterns = &signals.suspicious_patterns;

    if signals.age_in_days < 7 {
        flags.push("VERY_NEW_WALLET");
    } else if signals.age_in_days < 30 {
        flags.push("NEW_WALLET");
    }

    if patterns.rapid_draining {
        flags.push("RAPID_DRAINAGE");
    }
    if patterns.mixer_interaction {
        flags.push("MIXER_INTERACTION");
    }
    if patterns.unusual_activity {
        flags.push("UNUSUAL_ACTIVITY");
    }
    if patterns.sanctioned_address_interaction {
        flags.push("SANCTIONED_ADDRESS");
    }

    if let Some(hf) = signals.health_factor() {
        if hf < 1.1 {
            flags.push("CRITICAL_HEALTH_FACTOR");
        } else if hf < 1.3 {
            flags.push("LOW_HEALTH_FACTOR");
        } else if hf < 1.5 {
            flags.push("DECLINING_HEALTH_FACTOR");
        }
    }

    if market.volatility_index > 70.0 {
        flags.push("HIGH_MARKET_VOLATILITY");
    }
    if market.flash_crash_detected {
        flags.push("FLASH_CRASH_ACTIVE");
    }

    if signals.has_gitcoin_passport {
        flags.push("GITCOIN_VERIFIED");
    }
    if signals.ens().is_some() {
        flags.push("HAS_ENS");
    }

    flags.into_iter().map(String::from).collect()
}
