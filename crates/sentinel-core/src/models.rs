//! Signal and decision models for wallet risk analysis
//!
//! These models describe everything the pipeline knows about a single
//! analysis request: the wallet's behavior, the health of the lending
//! protocol it sits in, the state of the market, and the final decision.
//! None of them outlive one call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::ScoreBreakdown;

// =============================================================================
// Wallet Signals
// =============================================================================

/// Behavioral signals for the wallet under review.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletSignals {
    /// Wallet address (hex or base58, opaque to the pipeline)
    pub wallet_address: String,

    /// First on-chain appearance (unix seconds)
    pub first_seen_timestamp: i64,

    /// Wallet age in days
    pub age_in_days: u32,

    /// Lifetime transaction count
    pub total_transactions: u64,

    /// Average transactions per day over the wallet's lifetime
    pub average_transactions_per_day: f64,

    /// Last activity (unix seconds)
    #[serde(default)]
    pub last_activity_timestamp: i64,

    /// Days since the wallet last transacted
    #[serde(default)]
    pub days_since_last_activity: u32,

    pub current_balance: CurrentBalance,

    pub portfolio_value: PortfolioValue,

    pub transaction_velocity: TransactionVelocity,

    #[serde(default)]
    pub unique_contracts_interacted: u32,

    #[serde(default)]
    pub unique_addresses_interacted: u32,

    #[serde(default)]
    pub suspicious_patterns: SuspiciousPatterns,

    /// DeFi protocols the wallet has used
    #[serde(default)]
    pub defi_protocols: Vec<DeFiProtocol>,

    /// Open lending/borrowing position, if any
    #[serde(default)]
    pub lending_borrowing: Option<LendingPosition>,

    /// Off-chain credit score (0-1000)
    #[serde(default)]
    pub credit_score: Option<f64>,

    /// On-chain reputation (0-100)
    #[serde(default)]
    pub on_chain_reputation: Option<f64>,

    #[serde(default)]
    pub ens_name: Option<String>,

    /// Holds a proof-of-attendance badge
    #[serde(default)]
    pub has_poap: bool,

    /// Holds an identity verification (Gitcoin Passport) badge
    #[serde(default)]
    pub has_gitcoin_passport: bool,
}

impl WalletSignals {
    /// ENS name that is actually set. An empty string counts as absent.
    pub fn ens(&self) -> Option<&str> {
        self.ens_name.as_deref().filter(|name| !name.is_empty())
    }

    /// Health factor of the lending position, if one exists
    pub fn health_factor(&self) -> Option<f64> {
        self.lending_borrowing.as_ref().map(|p| p.health_factor)
    }

    /// On-chain reputation above the trusted threshold
    pub fn has_strong_reputation(&self) -> bool {
        self.on_chain_reputation.is_some_and(|r| r > 70.0)
    }
}

/// Transaction counts over rolling windows
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionVelocity {
    pub last_24h: u64,
    pub last_7d: u64,
    pub last_30d: u64,
}

/// Current wallet balances in USD terms
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CurrentBalance {
    /// Native asset (ETH, MATIC, ...)
    pub native: f64,
    /// USDC, USDT, DAI, ...
    pub stablecoins: f64,
    pub total_usd: f64,
}

/// Portfolio breakdown in USD
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PortfolioValue {
    pub tokens: f64,
    pub nfts: f64,
    pub defi: f64,
    pub total_usd: f64,
}

/// Independent suspicious-behavior flags
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuspiciousPatterns {
    #[serde(default)]
    pub rapid_draining: bool,
    #[serde(default)]
    pub unusual_activity: bool,
    #[serde(default)]
    pub new_wallet_high_value: bool,
    #[serde(default)]
    pub mixer_interaction: bool,
    #[serde(default)]
    pub sanctioned_address_interaction: bool,
}

/// A DeFi protocol the wallet interacted with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeFiProtocol {
    pub protocol_name: String,
    pub interaction_count: u32,
    pub total_value_locked: f64,
    /// Last interaction (unix seconds)
    pub last_interaction: i64,
}

/// Lending/borrowing position
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LendingPosition {
    pub total_borrowed: f64,
    pub total_collateral: f64,
    /// Collateral value over borrowed value. Below 1.0 the position can be liquidated.
    pub health_factor: f64,
}

// =============================================================================
// Protocol Health
// =============================================================================

/// System-wide health of the lending protocol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolHealthIndicators {
    pub total_value_locked: f64,
    pub total_active_users: u64,
    /// Utilization rate (0-100%)
    pub system_utilization_rate: f64,
    pub liquidity_depth: LiquidityDepth,
    /// Percentage of loans in default
    pub default_rate: f64,
    pub average_health_factor: f64,
    pub liquidation_events_24h: u32,
    #[serde(default)]
    pub pegs_stability: Vec<PegStability>,
    /// False when oracle prices are stale
    #[serde(default = "default_oracle_freshness")]
    pub oracle_freshness: bool,
    /// Oracle price deviation (%)
    #[serde(default)]
    pub oracle_deviation: f64,
    #[serde(default)]
    pub paused_contracts: Vec<String>,
    #[serde(default)]
    pub recent_upgrades: Vec<RecentUpgrade>,
}

fn default_oracle_freshness() -> bool {
    true
}

impl Default for ProtocolHealthIndicators {
    fn default() -> Self {
        Self {
            total_value_locked: 0.0,
            total_active_users: 0,
            system_utilization_rate: 0.0,
            liquidity_depth: LiquidityDepth::default(),
            default_rate: 0.0,
            average_health_factor: 0.0,
            liquidation_events_24h: 0,
            pegs_stability: Vec::new(),
            oracle_freshness: default_oracle_freshness(),
            oracle_deviation: 0.0,
            paused_contracts: Vec::new(),
            recent_upgrades: Vec::new(),
        }
    }
}

/// Liquidity available at each withdrawal horizon
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LiquidityDepth {
    /// Immediate
    pub tier1: f64,
    /// Within one hour
    pub tier2: f64,
    /// Within 24 hours
    pub tier3: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PegStability {
    pub asset: String,
    pub target_price: f64,
    pub current_price: f64,
    /// Deviation from peg (%)
    pub deviation: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentUpgrade {
    pub contract: String,
    pub timestamp: i64,
    pub audited: bool,
}

// =============================================================================
// Market Conditions
// =============================================================================

/// Market-wide volatility and event flags
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketVolatilityFlags {
    /// Volatility index (0-100)
    pub volatility_index: f64,
    pub market_sentiment: MarketSentiment,
    #[serde(default)]
    pub asset_volatility: Vec<AssetVolatility>,
    #[serde(default)]
    pub flash_crash_detected: bool,
    #[serde(default)]
    pub black_swan_event: bool,
    #[serde(default)]
    pub regulatory_news: bool,
    #[serde(default)]
    pub gas_price: Option<GasPrice>,
    #[serde(default)]
    pub network_congestion: NetworkCongestion,
    /// A liquidation cascade is underway
    #[serde(default)]
    pub large_liquidations_in_progress: bool,
    /// Estimated cascade size in USD
    #[serde(default)]
    pub estimated_liquidation_cascade: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketSentiment {
    ExtremeFear,
    Fear,
    #[default]
    Neutral,
    Greed,
    ExtremeGreed,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NetworkCongestion {
    Low,
    #[default]
    Medium,
    High,
    Extreme,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetVolatility {
    pub asset: String,
    /// 24h price change (%)
    pub price_24h_change: f64,
    /// 7d price change (%)
    pub price_7d_change: f64,
    /// 30d standard deviation
    pub volatility_30d: f64,
    pub volume_24h: f64,
    /// Volume change vs average (%)
    pub volume_change: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GasPrice {
    pub current: f64,
    pub average_7d: f64,
    /// Percentile (0-100)
    pub percentile: f64,
}

// =============================================================================
// Request
// =============================================================================

/// Context about who asked for the analysis and why
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestMetadata {
    pub request_id: String,
    /// Request time (unix seconds)
    pub timestamp: i64,
    pub request_type: RequestType,
    pub requested_by: String,
    #[serde(default)]
    pub urgency: Urgency,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestType {
    NewLoan,
    PositionReview,
    ScheduledCheck,
    #[default]
    ManualReview,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
}

/// Complete input to the decision pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentInput {
    pub wallet_signals: WalletSignals,
    pub protocol_health: ProtocolHealthIndicators,
    pub market_volatility: MarketVolatilityFlags,
    pub metadata: RequestMetadata,
}

// =============================================================================
// Decision Output
// =============================================================================

/// The action the protocol should take for the wallet
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// Safe, continue normal operations
    NoAction,
    /// Elevated risk, watch closely
    Monitor,
    /// Ambiguous, needs the richer reasoning pass
    RequestSeverityAnalysis,
    /// Immediate protective action
    EnforceAction,
}

impl Decision {
    /// Wire token, e.g. `ENFORCE_ACTION`
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::NoAction => "NO_ACTION",
            Decision::Monitor => "MONITOR",
            Decision::RequestSeverityAnalysis => "REQUEST_SEVERITY_ANALYSIS",
            Decision::EnforceAction => "ENFORCE_ACTION",
        }
    }

    /// Parse a wire token. Unknown tokens yield `None`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "NO_ACTION" => Some(Decision::NoAction),
            "MONITOR" => Some(Decision::Monitor),
            "REQUEST_SEVERITY_ANALYSIS" => Some(Decision::RequestSeverityAnalysis),
            "ENFORCE_ACTION" => Some(Decision::EnforceAction),
            _ => None,
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final output of one analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutput {
    pub decision: Decision,

    /// Confidence in the decision (0-100)
    pub confidence: f64,

    pub reasoning: String,

    /// Risk score (0-100, higher = riskier)
    pub risk_score: f64,

    pub recommendations: Vec<String>,

    pub flags: Vec<String>,

    pub timestamp: DateTime<Utc>,

    pub metadata: OutputMetadata,
}

/// Audit trail for how a decision was reached
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputMetadata {
    pub request_id: String,

    pub processing_time_ms: f64,

    /// Whether the escalation stage ran
    pub escalation_used: bool,

    /// Score from the deterministic stage, kept even when escalation replaced the primary score
    pub rule_based_score: f64,

    /// Fused score produced by the escalation stage
    pub escalated_score: Option<f64>,

    /// Score the escalated verdict carried before fusion with `rule_based_score`
    pub verdict_score: Option<f64>,

    /// Where the escalated verdict came from
    pub escalation_source: Option<EscalationSource>,

    /// Category the escalation stage assigned (legitimate, Sybil, ...)
    pub classification: Option<String>,

    /// The non-bypassable critical override replaced the escalated decision
    pub safety_override: bool,

    /// Rung of the decision ladder that matched
    pub decision_rule: DecisionRule,

    pub score_breakdown: ScoreBreakdown,
}

/// Origin of an escalation verdict
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EscalationSource {
    /// Fresh verdict from the live reasoning provider
    Provider,
    /// Provider verdict served from the fingerprint cache
    Cached,
    /// No provider configured, conservative policy from the base score
    Unconfigured,
    /// Provider failed (transport, timeout or schema), conservative record used
    Failure,
}

/// Rungs of the decision ladder
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionRule {
    CriticalOverride,
    VeryHighScore,
    AmbiguousHighScore,
    HighScore,
    MediumScore,
    LowScore,
}

// =============================================================================
// Presentation Models
// =============================================================================

/// Output as handed to downstream collaborators, numbers rounded to 2 decimals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReport {
    pub decision: Decision,
    pub confidence: f64,
    pub reasoning: String,
    pub risk_score: f64,
    pub recommendations: Vec<String>,
    pub flags: Vec<String>,
    /// Unix seconds
    pub timestamp: i64,
    pub metadata: ReportMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub request_id: String,
    pub processing_time_ms: f64,
    pub escalation_used: bool,
    pub rule_based_score: f64,
    pub escalated_score: Option<f64>,
    pub verdict_score: Option<f64>,
    pub escalation_source: Option<EscalationSource>,
    pub classification: Option<String>,
    pub safety_override: bool,
    pub decision_rule: DecisionRule,
}

/// Round to 2 decimal places for presentation
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl AgentOutput {
    /// Presentation copy of this output. Internal values stay full precision.
    pub fn to_report(&self) -> AgentReport {
        AgentReport {
            decision: self.decision,
            confidence: round2(self.confidence),
            reasoning: self.reasoning.clone(),
            risk_score: round2(self.risk_score),
            recommendations: self.recommendations.clone(),
            flags: self.flags.clone(),
            timestamp: self.timestamp.timestamp(),
            metadata: ReportMetadata {
                request_id: self.metadata.request_id.clone(),
                processing_time_ms: round2(self.metadata.processing_time_ms),
                escalation_used: self.metadata.escalation_used,
                rule_based_score: round2(self.metadata.rule_based_score),
                escalated_score: self.metadata.escalated_score.map(round2),
                verdict_score: self.metadata.verdict_score.map(round2),
                escalation_source: self.metadata.escalation_source,
                classification: self.metadata.classification.clone(),
                safety_override: self.metadata.safety_override,
                decision_rule: self.metadata.decision_rule,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_tokens() {
        for decision in [
            Decision::NoAction,
            Decision::Monitor,
            Decision::RequestSeverityAnalysis,
            Decision::EnforceAction,
        ] {
            assert_eq!(Decision::from_token(decision.as_str()), Some(decision));
            let json = serde_json::to_string(&decision).unwrap();
            assert_eq!(json, format!("\"{}\"", decision.as_str()));
        }
        assert_eq!(Decision::from_token("FREEZE"), None);
        assert_eq!(Decision::from_token("monitor"), None);
    }

    #[test]
    fn test_empty_ens_is_absent() {
        let mut signals = WalletSignals::default();
        assert_eq!(signals.ens(), None);
        signals.ens_name = Some(String::new());
        assert_eq!(signals.ens(), None);
        signals.ens_name = Some("alice.eth".to_string());
        assert_eq!(signals.ens(), Some("alice.eth"));
    }

    #[test]
    fn test_protocol_defaults_from_sparse_json() {
        let protocol: ProtocolHealthIndicators = serde_json::from_value(serde_json::json!({
            "total_value_locked": 1.0e9,
            "total_active_users": 10000,
            "system_utilization_rate": 50.0,
            "liquidity_depth": { "tier1": 1.0e6, "tier2": 1.0e7, "tier3": 1.0e8 },
            "default_rate": 2.0,
            "average_health_factor": 2.0,
            "liquidation_events_24h": 0
        }))
        .unwrap();

        assert!(protocol.oracle_freshness);
        assert!(protocol.paused_contracts.is_empty());
        assert_eq!(protocol.oracle_deviation, 0.0);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(42.456), 42.46);
        assert_eq!(round2(42.454), 42.45);
        assert_eq!(round2(100.0), 100.0);
    }
}
