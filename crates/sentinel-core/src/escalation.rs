//! Escalation policy
//!
//! Everything about the secondary reasoning pass that does not involve I/O:
//! building the context sent to the provider, validating what comes back,
//! the conservative fallback records, the non-bypassable safety override and
//! score fusion. The provider call itself lives in the server crate.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{VerdictError, VerdictResult};
use crate::models::*;
use crate::scoring::clamp_score;

/// Deterministic scores above this can never end in anything but enforcement
pub const CRITICAL_BASE_SCORE: f64 = 85.0;

/// Confidence ceiling once the safety override has replaced a decision
pub const OVERRIDE_CONFIDENCE_CAP: f64 = 70.0;

pub const RULE_WEIGHT: f64 = 0.4;
pub const ESCALATION_WEIGHT: f64 = 0.6;

pub const UNCONFIGURED_CONFIDENCE: f64 = 60.0;
pub const FAILURE_CONFIDENCE: f64 = 50.0;

pub const OVERRIDE_NOTE: &str = " [OVERRIDE: Critical risk detected by rule-based engine]";

/// Structured verdict returned by a reasoning provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Verdict {
    /// Risk score (0-100)
    pub risk_score: f64,
    /// Free-text category (legitimate, privacy-focused, high-risk, Sybil, compromised)
    pub classification: String,
    pub decision: Decision,
    pub reasoning: String,
    /// Confidence (0-100)
    pub confidence: f64,
}

impl Verdict {
    /// Parse a raw provider response body.
    pub fn parse(body: &str) -> VerdictResult<Self> {
        let value: Value =
            serde_json::from_str(body.trim()).map_err(|e| VerdictError::NotJson(e.to_string()))?;
        Self::from_value(&value)
    }

    /// Validate a JSON value against the five-field response schema.
    ///
    /// Any deviation is an error: the caller falls back rather than guessing.
    pub fn from_value(value: &Value) -> VerdictResult<Self> {
        let object = value.as_object().ok_or(VerdictError::NotAnObject)?;

        let field = |name: &'static str| object.get(name).ok_or(VerdictError::MissingField(name));

        let risk_score = bounded_number(field("risk_score")?, "risk_score")?;
        let confidence = bounded_number(field("confidence")?, "confidence")?;

        let classification = field("classification")?
            .as_str()
            .ok_or(VerdictError::WrongType("classification"))?
            .to_string();
        let reasoning = field("reasoning")?
            .as_str()
            .ok_or(VerdictError::WrongType("reasoning"))?
            .to_string();

        let token = field("decision")?
            .as_str()
            .ok_or(VerdictError::WrongType("decision"))?;
        let decision = Decision::from_token(token.trim())
            .ok_or_else(|| VerdictError::UnknownDecision(token.to_string()))?;

        Ok(Self {
            risk_score,
            classification,
            decision,
            reasoning,
            confidence,
        })
    }

    /// Conservative policy used when no provider is configured.
    pub fn unconfigured(base_score: f64) -> Self {
        let (decision, reasoning) = if base_score >= 75.0 {
            (
                Decision::EnforceAction,
                "High risk score detected. Reasoning provider unavailable - using conservative approach.",
            )
        } else if base_score >= 50.0 {
            (
                Decision::Monitor,
                "Elevated risk. Reasoning provider unavailable - defaulting to monitoring.",
            )
        } else {
            (Decision::NoAction, "Risk within acceptable range.")
        };

        Self {
            risk_score: base_score,
            classification: "Automated fallback".to_string(),
            decision,
            reasoning: reasoning.to_string(),
            confidence: UNCONFIGURED_CONFIDENCE,
        }
    }

    /// Conservative record substituted when the provider call fails.
    pub fn failure(base_score: f64, cause: &str) -> Self {
        Self {
            risk_score: base_score,
            classification: "Error fallback".to_string(),
            decision: Decision::Monitor,
            reasoning: format!("Escalation analysis failed: {cause}. Defaulting to monitor."),
            confidence: FAILURE_CONFIDENCE,
        }
    }
}

fn bounded_number(value: &Value, field: &'static str) -> VerdictResult<f64> {
    let number = value.as_f64().ok_or(VerdictError::WrongType(field))?;
    if !(0.0..=100.0).contains(&number) {
        return Err(VerdictError::OutOfRange { field, value: number });
    }
    Ok(number)
}

/// A verdict merged with the deterministic score under the safety constraints
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Fused risk score (0-100)
    pub risk_score: f64,
    pub decision: Decision,
    pub reasoning: String,
    pub confidence: f64,
    pub classification: String,
    pub override_applied: bool,
}

/// Weighted fusion of deterministic and escalated scores
pub fn fuse_scores(base_score: f64, escalated_score: f64) -> f64 {
    clamp_score(RULE_WEIGHT * base_score + ESCALATION_WEIGHT * escalated_score)
}

/// Apply the safety override and fuse scores.
///
/// When the deterministic score is critical and the verdict tries to settle
/// for less than enforcement, the decision is forced back, the reasoning is
/// annotated, confidence is capped, and the fused score is floored at the
/// deterministic score.
pub fn resolve(base_score: f64, verdict: Verdict) -> Resolution {
    let Verdict {
        risk_score,
        classification,
        mut decision,
        mut reasoning,
        confidence,
    } = verdict;

    let mut confidence = confidence.clamp(0.0, 100.0);
    let mut fused = fuse_scores(base_score, risk_score);
    let mut override_applied = false;

    if base_score > CRITICAL_BASE_SCORE && decision != Decision::EnforceAction {
        decision = Decision::EnforceAction;
        reasoning.push_str(OVERRIDE_NOTE);
        confidence = confidence.min(OVERRIDE_CONFIDENCE_CAP);
        fused = fused.max(clamp_score(base_score));
        override_applied = true;
    }

    Resolution {
        risk_score: fused,
        decision,
        reasoning,
        confidence,
        classification,
        override_applied,
    }
}

// =============================================================================
// Provider Context
// =============================================================================

/// Everything the reasoning provider is told about a request
#[derive(Debug, Clone)]
pub struct EscalationContext {
    /// Truncated wallet address, never the full identity
    pub wallet_hash: String,
    pub base_score: f64,
    pub prompt: String,
}

impl EscalationContext {
    pub fn build(input: &AgentInput, base_score: f64) -> Self {
        let wallet_hash = wallet_hash(&input.wallet_signals.wallet_address);
        let prompt = build_prompt(input, base_score, &wallet_hash);
        Self {
            wallet_hash,
            base_score,
            prompt,
        }
    }
}

fn wallet_hash(address: &str) -> String {
    let prefix: String = address.chars().take(10).collect();
    format!("{prefix}...")
}

/// Reputation signals listed for the provider
pub fn positive_indicators(signals: &WalletSignals) -> Vec<String> {
    let mut indicators = Vec::new();
    if let Some(ens) = signals.ens() {
        indicators.push(format!("ENS name: {ens}"));
    }
    if signals.has_gitcoin_passport {
        indicators.push("Has Gitcoin Passport".to_string());
    }
    if signals.age_in_days > 180 {
        indicators.push(format!("Wallet age: {} days (established)", signals.age_in_days));
    }
    if let Some(reputation) = signals.on_chain_reputation.filter(|r| *r > 70.0) {
        indicators.push(format!("On-chain reputation: {reputation}/100"));
    }
    indicators
}

/// Risk signals listed for the provider
pub fn negative_indicators(signals: &WalletSignals) -> Vec<String> {
    let patterns = &signals.suspicious_patterns;
    let mut indicators = Vec::new();
    if patterns.mixer_interaction {
        indicators.push("Tornado Cash / mixer interaction detected".to_string());
    }
    if patterns.rapid_draining {
        indicators.push("Rapid asset drainage pattern".to_string());
    }
    if patterns.unusual_activity {
        indicators.push("Unusual transaction activity spike".to_string());
    }
    if patterns.new_wallet_high_value {
        indicators.push("New wallet with unusually high value".to_string());
    }
    indicators
}

fn situation(signals: &WalletSignals) -> String {
    let mut parts = Vec::new();

    let velocity = &signals.transaction_velocity;
    parts.push(format!(
        "Transaction velocity: {} (24h), {} (7d), {} (30d)",
        velocity.last_24h, velocity.last_7d, velocity.last_30d
    ));

    if let Some(position) = &signals.lending_borrowing {
        parts.push(format!(
            "DeFi Position: ${:.2} borrowed, HF: {:.2}",
            position.total_borrowed, position.health_factor
        ));
    }

    if signals.days_since_last_activity > 0 {
        parts.push(format!(
            "Last activity: {} days ago",
            signals.days_since_last_activity
        ));
    }

    parts.join("\n")
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.join(", ")
    }
}

fn build_prompt(input: &AgentInput, base_score: f64, wallet_hash: &str) -> String {
    let signals = &input.wallet_signals;
    let market = &input.market_volatility;
    let protocol = &input.protocol_health;

    let sentiment = serde_json::to_value(market.market_sentiment)
        .ok()
        .and_then(|v| v.as_str().map(String::from))
        .unwrap_or_default();

    format!(
        r#"You are an expert DeFi risk analyst. Analyze the following wallet situation and provide a nuanced assessment.

## Wallet Context
Address Hash: {wallet_hash}
Age: {age} days
Balance: ${balance:.2}
Transaction History: {transactions} transactions

## Risk Signals
- Positive Indicators: {positive}
- Negative Indicators: {negative}

## Current Situation
{situation}

## Market Context
Volatility Index: {volatility}/100
Market Sentiment: {sentiment}
Flash Crash: {flash_crash}

## Protocol Health
TVL: ${tvl:.2}
Default Rate: {default_rate}%
Recent Liquidations (24h): {liquidations}

## Rule-Based Risk Score
{base_score:.1}/100

## Your Task
1. Assess the TRUE risk level (0-100)
2. Determine if this is:
   - Legitimate user exhibiting normal behavior
   - Privacy-focused user (not malicious)
   - High-risk borrower
   - Potential threat/Sybil attack
   - Victim of compromise
3. Recommend ONE of:
   - NO_ACTION (safe, continue normal operations)
   - MONITOR (elevated risk, watch closely)
   - REQUEST_SEVERITY_ANALYSIS (need more data)
   - ENFORCE_ACTION (immediate protective action)
4. Provide clear reasoning in 2-3 sentences

## Response Format (JSON only, no other text):
{{
  "risk_score": <number 0-100>,
  "classification": "<type>",
  "decision": "<NO_ACTION|MONITOR|REQUEST_SEVERITY_ANALYSIS|ENFORCE_ACTION>",
  "reasoning": "<explanation>",
  "confidence": <number 0-100>
}}"#,
        age = signals.age_in_days,
        balance = signals.current_balance.total_usd,
        transactions = signals.total_transactions,
        positive = join_or_none(&positive_indicators(signals)),
        negative = join_or_none(&negative_indicators(signals)),
        situation = situation(signals),
        volatility = market.volatility_index,
        flash_crash = if market.flash_crash_detected { "Yes" } else { "No" },
        tvl = protocol.total_value_locked,
        default_rate = protocol.default_rate,
        liquidations = protocol.liquidation_events_24h,
    )
}
