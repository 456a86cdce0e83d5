//! Deterministic risk scoring
//!
//! The score is a plain sum of independent, individually bounded terms,
//! clamped to [0, 100] at the end. Several large penalties together can
//! exceed the ceiling before the clamp; that saturation is accepted in
//! exchange for every point being traceable to one rule.

use serde::{Deserialize, Serialize};

use crate::models::*;

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

/// Velocity ratio used when there is no 30-day baseline to compare against
pub const NEUTRAL_VELOCITY_RATIO: f64 = 1.0;

/// Per-factor contributions to the risk score, before clamping
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ScoreBreakdown {
    /// [-10, +20]
    pub wallet_age: f64,
    /// [-5, +25]
    pub balance: f64,
    /// [0, +35]
    pub transaction_velocity: f64,
    /// [0, +140]
    pub suspicious_patterns: f64,
    /// [-55, 0]
    pub reputation: f64,
    /// [0, +50]
    pub defi_health: f64,
    /// [0, +115]
    pub protocol_health: f64,
    /// [0, +130]
    pub market_volatility: f64,
}

impl ScoreBreakdown {
    /// Unclamped sum of all terms
    pub fn raw_total(&self) -> f64 {
        self.wallet_age
            + self.balance
            + self.transaction_velocity
            + self.suspicious_patterns
            + self.reputation
            + self.defi_health
            + self.protocol_health
            + self.market_volatility
    }

    /// Final risk score, clamped to [0, 100]
    pub fn total(&self) -> f64 {
        clamp_score(self.raw_total())
    }
}

/// Clamp any score into [0, 100]. NaN collapses to 0.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return MIN_SCORE;
    }
    score.clamp(MIN_SCORE, MAX_SCORE)
}

/// Calculate the deterministic risk score (0-100) for a request.
pub fn score(input: &AgentInput) -> f64 {
    score_breakdown(input).total()
}

/// Evaluate every scoring term for a request.
pub fn score_breakdown(input: &AgentInput) -> ScoreBreakdown {
    let signals = &input.wallet_signals;

    ScoreBreakdown {
        wallet_age: score_wallet_age(signals),
        balance: score_balance(signals),
        transaction_velocity: score_transaction_velocity(signals),
        suspicious_patterns: score_suspicious_patterns(&signals.suspicious_patterns),
        reputation: score_reputation(signals),
        defi_health: score_defi_health(signals),
        protocol_health: score_protocol_health(&input.protocol_health),
        market_volatility: score_market_volatility(&input.market_volatility),
    }
}

fn score_wallet_age(signals: &WalletSignals) -> f64 {
    match signals.age_in_days {
        0..=6 => 20.0,
        7..=29 => 10.0,
        30..=89 => 5.0,
        age if age > 365 => -10.0,
        _ => 0.0,
    }
}

fn score_balance(signals: &WalletSignals) -> f64 {
    let mut score = 0.0;
    let total_balance = signals.current_balance.total_usd;

    if total_balance < 100.0 {
        score += 15.0;
    } else if total_balance < 1000.0 {
        score += 5.0;
    }

    // New wallet sitting on a lot of value
    if signals.age_in_days < 30 && total_balance > 50_000.0 {
        score += 10.0;
    }

    if signals.age_in_days > 365 && signals.portfolio_value.total_usd > 100_000.0 {
        score -= 5.0;
    }

    score
}

fn score_transaction_velocity(signals: &WalletSignals) -> f64 {
    let mut score = 0.0;
    let ratio = velocity_ratio(&signals.transaction_velocity, signals.age_in_days);

    if ratio > 5.0 {
        score += 25.0;
    } else if ratio > 3.0 {
        score += 15.0;
    } else if ratio > 2.0 {
        score += 10.0;
    }

    // Dormant wallets are also suspicious for active protocols
    if signals.days_since_last_activity > 90 {
        score += 10.0;
    }

    score
}

/// Last-24h transaction count relative to the 30-day daily average.
///
/// Returns [`NEUTRAL_VELOCITY_RATIO`] for brand-new wallets and when there is
/// no 30-day activity to divide by.
pub fn velocity_ratio(velocity: &TransactionVelocity, age_in_days: u32) -> f64 {
    if age_in_days == 0 || velocity.last_30d == 0 {
        return NEUTRAL_VELOCITY_RATIO;
    }

    let avg_daily = velocity.last_30d as f64 / 30.0;
    velocity.last_24h as f64 / avg_daily
}

fn score_suspicious_patterns(patterns: &SuspiciousPatterns) -> f64 {
    let mut score = 0.0;

    if patterns.rapid_draining {
        score += 30.0;
    }
    if patterns.mixer_interaction {
        score += 25.0;
    }
    if patterns.new_wallet_high_value {
        score += 20.0;
    }
    if patterns.unusual_activity {
        score += 15.0;
    }
    if patterns.sanctioned_address_interaction {
        score += 50.0;
    }

    score
}

/// Reputation only ever lowers risk.
fn score_reputation(signals: &WalletSignals) -> f64 {
    let mut score = 0.0;

    if signals.ens().is_some() {
        score -= 10.0;
    }
    if signals.has_gitcoin_passport {
        score -= 15.0;
    }
    if signals.has_poap {
        score -= 5.0;
    }
    if signals.has_strong_reputation() {
        score -= 10.0;
    }
    if signals.credit_score.is_some_and(|c| c > 700.0) {
        score -= 15.0;
    }

    score
}

fn score_defi_health(signals: &WalletSignals) -> f64 {
    let Some(health_factor) = signals.health_factor() else {
        return 0.0;
    };

    if health_factor < 1.05 {
        50.0
    } else if health_factor < 1.1 {
        40.0
    } else if health_factor < 1.2 {
        30.0
    } else if health_factor < 1.5 {
        20.0
    } else if health_factor < 2.0 {
        10.0
    } else {
        0.0
    }
}

fn score_protocol_health(protocol: &ProtocolHealthIndicators) -> f64 {
    let mut score = 0.0;

    if protocol.default_rate > 10.0 {
        score += 25.0;
    } else if protocol.default_rate > 5.0 {
        score += 15.0;
    }

    if protocol.liquidation_events_24h > 20 {
        score += 20.0;
    } else if protocol.liquidation_events_24h > 10 {
        score += 10.0;
    }

    // Emergency pause
    if !protocol.paused_contracts.is_empty() {
        score += 30.0;
    }

    if !protocol.oracle_freshness {
        score += 25.0;
    }
    if protocol.oracle_deviation > 5.0 {
        score += 15.0;
    }

    score
}

fn score_market_volatility(market: &MarketVolatilityFlags) -> f64 {
    let mut score = 0.0;

    if market.volatility_index > 80.0 {
        score += 30.0;
    } else if market.volatility_index > 70.0 {
        score += 25.0;
    } else if market.volatility_index > 50.0 {
        score += 15.0;
    }

    if market.flash_crash_detected {
        score += 30.0;
    }
    if market.black_swan_event {
        score += 40.0;
    }
    if market.large_liquidations_in_progress {
        score += 20.0;
    }
    if market.network_congestion == NetworkCongestion::Extreme {
        score += 10.0;
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals_aged(age_in_days: u32) -> WalletSignals {
        WalletSignals {
            wallet_address: "0x742d35cc6634c0532925a3b844bc454e4438f44e".to_string(),
            age_in_days,
            current_balance: CurrentBalance {
                native: 2.0,
                stablecoins: 3_000.0,
                total_usd: 8_000.0,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_wallet_age_tiers() {
        assert_eq!(score_wallet_age(&signals_aged(0)), 20.0);
        assert_eq!(score_wallet_age(&signals_aged(6)), 20.0);
        assert_eq!(score_wallet_age(&signals_aged(7)), 10.0);
        assert_eq!(score_wallet_age(&signals_aged(29)), 10.0);
        assert_eq!(score_wallet_age(&signals_aged(89)), 5.0);
        assert_eq!(score_wallet_age(&signals_aged(90)), 0.0);
        assert_eq!(score_wallet_age(&signals_aged(365)), 0.0);
        assert_eq!(score_wallet_age(&signals_aged(366)), -10.0);
    }

    #[test]
    fn test_balance_terms_are_additive() {
        let mut signals = signals_aged(10);
        signals.current_balance.total_usd = 60_000.0;
        assert_eq!(score_balance(&signals), 10.0);

        signals.current_balance.total_usd = 50.0;
        assert_eq!(score_balance(&signals), 15.0);

        let mut mature = signals_aged(500);
        mature.current_balance.total_usd = 500.0;
        mature.portfolio_value.total_usd = 150_000.0;
        assert_eq!(score_balance(&mature), 0.0);
    }

    #[test]
    fn test_velocity_ratio_spike() {
        let velocity = TransactionVelocity {
            last_24h: 150,
            last_7d: 300,
            last_30d: 450,
        };
        assert!((velocity_ratio(&velocity, 45) - 10.0).abs() < 1e-9);

        let mut signals = signals_aged(45);
        signals.transaction_velocity = velocity;
        assert_eq!(score_transaction_velocity(&signals), 25.0);
    }

    #[test]
    fn test_velocity_ratio_zero_baseline_is_neutral() {
        let velocity = TransactionVelocity {
            last_24h: 40,
            last_7d: 40,
            last_30d: 0,
        };
        assert_eq!(velocity_ratio(&velocity, 100), NEUTRAL_VELOCITY_RATIO);

        let velocity = TransactionVelocity {
            last_24h: 40,
            last_7d: 40,
            last_30d: 40,
        };
        assert_eq!(velocity_ratio(&velocity, 0), NEUTRAL_VELOCITY_RATIO);
    }

    #[test]
    fn test_dormant_wallet_penalty() {
        let mut signals = signals_aged(400);
        signals.days_since_last_activity = 91;
        assert_eq!(score_transaction_velocity(&signals), 10.0);
    }

    #[test]
    fn test_all_suspicious_patterns_sum_uncapped() {
        let patterns = SuspiciousPatterns {
            rapid_draining: true,
            unusual_activity: true,
            new_wallet_high_value: true,
            mixer_interaction: true,
            sanctioned_address_interaction: true,
        };
        assert_eq!(score_suspicious_patterns(&patterns), 140.0);
    }

    #[test]
    fn test_reputation_floor() {
        let mut signals = signals_aged(500);
        signals.ens_name = Some("vitalik.eth".to_string());
        signals.has_gitcoin_passport = true;
        signals.has_poap = true;
        signals.on_chain_reputation = Some(85.0);
        signals.credit_score = Some(780.0);
        assert_eq!(score_reputation(&signals), -55.0);

        signals.on_chain_reputation = Some(70.0);
        signals.credit_score = Some(700.0);
        assert_eq!(score_reputation(&signals), -30.0);
    }

    #[test]
    fn test_defi_health_tiers() {
        let tiers = [
            (1.04, 50.0),
            (1.08, 40.0),
            (1.15, 30.0),
            (1.45, 20.0),
            (1.99, 10.0),
            (2.0, 0.0),
            (2.8, 0.0),
        ];
        for (health_factor, expected) in tiers {
            let mut signals = signals_aged(100);
            signals.lending_borrowing = Some(LendingPosition {
                total_borrowed: 10_000.0,
                total_collateral: 10_000.0 * health_factor,
                health_factor,
            });
            assert_eq!(score_defi_health(&signals), expected, "hf {health_factor}");
        }
        assert_eq!(score_defi_health(&signals_aged(100)), 0.0);
    }

    #[test]
    fn test_protocol_health_maximum() {
        let protocol = ProtocolHealthIndicators {
            default_rate: 12.0,
            liquidation_events_24h: 30,
            paused_contracts: vec!["LendingPool".to_string()],
            oracle_freshness: false,
            oracle_deviation: 6.5,
            ..Default::default()
        };
        assert_eq!(score_protocol_health(&protocol), 115.0);
        assert_eq!(score_protocol_health(&ProtocolHealthIndicators::default()), 0.0);
    }

    #[test]
    fn test_market_volatility_maximum() {
        let market = MarketVolatilityFlags {
            volatility_index: 95.0,
            flash_crash_detected: true,
            black_swan_event: true,
            large_liquidations_in_progress: true,
            network_congestion: NetworkCongestion::Extreme,
            ..Default::default()
        };
        assert_eq!(score_market_volatility(&market), 130.0);

        let calm = MarketVolatilityFlags {
            volatility_index: 50.0,
            network_congestion: NetworkCongestion::High,
            ..Default::default()
        };
        assert_eq!(score_market_volatility(&calm), 0.0);
    }

    #[test]
    fn test_total_is_clamped() {
        let breakdown = ScoreBreakdown {
            suspicious_patterns: 140.0,
            market_volatility: 130.0,
            ..Default::default()
        };
        assert_eq!(breakdown.raw_total(), 270.0);
        assert_eq!(breakdown.total(), 100.0);

        let breakdown = ScoreBreakdown {
            wallet_age: -10.0,
            reputation: -55.0,
            ..Default::default()
        };
        assert_eq!(breakdown.total(), 0.0);
        assert_eq!(clamp_score(f64::NAN), 0.0);
    }
}
