//! Analysis pipeline
//!
//! Scorer, decision ladder, then the escalation pass only when the ladder
//! asks for it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use sentinel_core::{
    assess_rules, flags, recommendations, rule_based_confidence, rule_based_reasoning, AgentInput,
    AgentOutput, Decision, OutputMetadata, RuleAssessment,
};

use crate::assessor;
use crate::cache::VerdictCache;
use crate::config::AppConfig;
use crate::error::Result;
use crate::reasoner::EscalationReasoner;

pub struct Orchestrator {
    reasoner: EscalationReasoner,
}

impl Orchestrator {
    pub fn new(reasoner: EscalationReasoner) -> Self {
        Self { reasoner }
    }

    /// Wire the pipeline from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let assessor = assessor::from_config(&config.escalation)?;
        let cache = config
            .cache
            .enabled
            .then(|| VerdictCache::new(&config.cache));
        let timeout = Duration::from_secs(config.escalation.timeout_seconds);

        tracing::info!(
            assessor = %assessor.name(),
            cache_enabled = cache.is_some(),
            timeout_seconds = config.escalation.timeout_seconds,
            "Escalation reasoner configured"
        );

        Ok(Self::new(EscalationReasoner::new(assessor, cache, timeout)))
    }

    pub fn reasoner(&self) -> &EscalationReasoner {
        &self.reasoner
    }

    /// Deterministic stage only
    pub fn score(&self, input: &AgentInput) -> RuleAssessment {
        assess_rules(input)
    }

    /// Run the full pipeline over one request.
    pub async fn analyze(&self, input: &AgentInput) -> AgentOutput {
        let started = Instant::now();
        let signals = &input.wallet_signals;

        let assessment = assess_rules(input);
        let base_score = assessment.risk_score;

        tracing::info!(
            request_id = %input.metadata.request_id,
            risk_score = base_score,
            decision = %assessment.decision,
            rule = ?assessment.rule,
            "Rule-based assessment"
        );

        let escalate = assessment.needs_escalation
            || assessment.decision == Decision::RequestSeverityAnalysis;

        let (decision, risk_score, reasoning, confidence, metadata) = if escalate {
            let outcome = self.reasoner.escalate(input, base_score).await;

            tracing::info!(
                request_id = %input.metadata.request_id,
                decision = %outcome.decision,
                verdict_score = outcome.verdict_score,
                fused_score = outcome.risk_score,
                source = ?outcome.source,
                safety_override = outcome.override_applied,
                "Escalation complete"
            );

            let metadata = OutputMetadata {
                request_id: input.metadata.request_id.clone(),
                processing_time_ms: 0.0,
                escalation_used: true,
                rule_based_score: base_score,
                escalated_score: Some(outcome.risk_score),
                verdict_score: Some(outcome.verdict_score),
                escalation_source: Some(outcome.source),
                classification: Some(outcome.classification),
                safety_override: outcome.override_applied,
                decision_rule: assessment.rule,
                score_breakdown: assessment.breakdown,
            };
            (
                outcome.decision,
                outcome.risk_score,
                outcome.reasoning,
                outcome.confidence,
                metadata,
            )
        } else {
            let metadata = OutputMetadata {
                request_id: input.metadata.request_id.clone(),
                processing_time_ms: 0.0,
                escalation_used: false,
                rule_based_score: base_score,
                escalated_score: None,
                verdict_score: None,
                escalation_source: None,
                classification: None,
                safety_override: false,
                decision_rule: assessment.rule,
                score_breakdown: assessment.breakdown,
            };
            (
                assessment.decision,
                base_score,
                rule_based_reasoning(base_score, input),
                rule_based_confidence(base_score),
                metadata,
            )
        };

        let recommendations = recommendations(decision, signals);
        let flags = flags(signals, &input.market_volatility);

        AgentOutput {
            decision,
            confidence: confidence.clamp(0.0, 100.0),
            reasoning,
            risk_score: risk_score.clamp(0.0, 100.0),
            recommendations,
            flags,
            timestamp: Utc::now(),
            metadata: OutputMetadata {
                processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
                ..metadata
            },
        }
    }
}

/// Shared handle used by the tool surface
pub type SharedOrchestrator = Arc<Orchestrator>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessor::{Assessor, FallbackAssessor};
    use crate::config::EscalationConfig;
    use async_trait::async_trait;
    use sentinel_core::{
        DecisionRule, EscalationContext, EscalationSource, LendingPosition, MarketSentiment,
        Verdict,
    };

    struct LenientAssessor;

    #[async_trait]
    impl Assessor for LenientAssessor {
        fn name(&self) -> &str {
            "lenient"
        }

        fn source(&self) -> EscalationSource {
            EscalationSource::Provider
        }

        async fn assess(&self, _context: &EscalationContext) -> Result<Verdict> {
            Ok(Verdict {
                risk_score: 20.0,
                classification: "Legitimate user".into(),
                decision: Decision::NoAction,
                reasoning: "Nothing to see.".into(),
                confidence: 80.0,
            })
        }
    }

    fn orchestrator(assessor: Arc<dyn Assessor>) -> Orchestrator {
        Orchestrator::new(EscalationReasoner::new(
            assessor,
            None,
            Duration::from_secs(5),
        ))
    }

    fn low_risk() -> AgentInput {
        let mut input = AgentInput::default();
        input.metadata.request_id = "req-low".into();
        let w = &mut input.wallet_signals;
        w.wallet_address = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e".into();
        w.age_in_days = 850;
        w.total_transactions = 2400;
        w.average_transactions_per_day = 2.8;
        w.days_since_last_activity = 1;
        w.transaction_velocity.last_24h = 3;
        w.transaction_velocity.last_7d = 20;
        w.transaction_velocity.last_30d = 85;
        w.unique_contracts_interacted = 120;
        w.lending_borrowing = Some(LendingPosition {
            total_borrowed: 10_000.0,
            total_collateral: 35_000.0,
            health_factor: 3.2,
        });
        w.on_chain_reputation = Some(88.0);
        w.ens_name = Some("alice.eth".into());
        w.has_gitcoin_passport = true;
        input.market_volatility.volatility_index = 25.0;
        input.market_volatility.market_sentiment = MarketSentiment::Neutral;
        input
    }

    /// Young wallet with mixer history and elevated velocity but a strong reputation
    fn ambiguous() -> AgentInput {
        let mut input = AgentInput::default();
        input.metadata.request_id = "req-ambiguous".into();
        let w = &mut input.wallet_signals;
        w.wallet_address = "0x1234567890abcdef1234567890abcdef12345678".into();
        w.age_in_days = 45;
        w.total_transactions = 600;
        w.current_balance.total_usd = 5_000.0;
        w.transaction_velocity.last_24h = 40;
        w.transaction_velocity.last_7d = 150;
        w.transaction_velocity.last_30d = 400;
        w.suspicious_patterns.mixer_interaction = true;
        w.suspicious_patterns.unusual_activity = true;
        w.lending_borrowing = Some(LendingPosition {
            total_borrowed: 50_000.0,
            total_collateral: 70_000.0,
            health_factor: 1.4,
        });
        w.on_chain_reputation = Some(78.0);
        w.has_gitcoin_passport = true;
        input.market_volatility.volatility_index = 55.0;
        input
    }

    #[tokio::test]
    async fn test_low_risk_skips_escalation() {
        let output = orchestrator(Arc::new(LenientAssessor)).analyze(&low_risk()).await;

        assert_eq!(output.decision, Decision::NoAction);
        assert!(!output.metadata.escalation_used);
        assert_eq!(output.metadata.escalated_score, None);
        assert_eq!(output.metadata.verdict_score, None);
        assert_eq!(output.metadata.decision_rule, DecisionRule::LowScore);
        assert_eq!(output.metadata.request_id, "req-low");
        assert!(output.confidence >= 60.0);
        assert!(output.recommendations.contains(&"Continue normal monitoring".to_string()));
        assert!(output.flags.contains(&"GITCOIN_VERIFIED".to_string()));
        assert!(output.flags.contains(&"HAS_ENS".to_string()));
    }

    #[tokio::test]
    async fn test_ambiguous_case_uses_fallback_without_provider() {
        let input = ambiguous();
        let base = assess_rules(&input);
        assert_eq!(base.risk_score, 65.0);
        assert_eq!(base.decision, Decision::RequestSeverityAnalysis);

        let output = orchestrator(Arc::new(FallbackAssessor)).analyze(&input).await;

        assert!(output.metadata.escalation_used);
        assert_eq!(output.metadata.rule_based_score, base.risk_score);
        assert_eq!(
            output.metadata.escalation_source,
            Some(EscalationSource::Unconfigured)
        );
        assert_eq!(output.confidence, 60.0);
        assert_eq!(output.decision, Decision::Monitor);
        assert!((output.risk_score - 65.0).abs() < 1e-9);
        assert_eq!(
            output.metadata.classification.as_deref(),
            Some("Automated fallback")
        );
    }

    #[tokio::test]
    async fn test_escalated_verdict_is_adopted() {
        let mut input = ambiguous();
        input.market_volatility.volatility_index = 75.0;

        let base = assess_rules(&input);
        assert_eq!(base.risk_score, 75.0);
        assert!(base.needs_escalation);

        let output = orchestrator(Arc::new(LenientAssessor)).analyze(&input).await;

        assert!(output.metadata.escalation_used);
        assert_eq!(output.decision, Decision::NoAction);
        assert!((output.risk_score - 42.0).abs() < 1e-9);
        assert_eq!(output.confidence, 80.0);
        assert_eq!(output.reasoning, "Nothing to see.");
        assert_eq!(output.metadata.rule_based_score, 75.0);
        assert!((output.metadata.escalated_score.unwrap() - 42.0).abs() < 1e-9);
        assert_eq!(output.metadata.verdict_score, Some(20.0));
        assert_eq!(
            output.metadata.escalation_source,
            Some(EscalationSource::Provider)
        );
        assert_eq!(
            output.metadata.classification.as_deref(),
            Some("Legitimate user")
        );
        assert!(!output.metadata.safety_override);
        assert_eq!(output.metadata.decision_rule, DecisionRule::AmbiguousHighScore);
        assert_eq!(output.recommendations[0], "Continue normal monitoring");

        let report = output.to_report();
        assert_eq!(report.risk_score, 42.0);
        assert_eq!(report.metadata.verdict_score, Some(20.0));
    }

    #[tokio::test]
    async fn test_sanctioned_wallet_is_enforced() {
        let mut input = low_risk();
        input.wallet_signals.suspicious_patterns.sanctioned_address_interaction = true;

        let output = orchestrator(Arc::new(LenientAssessor)).analyze(&input).await;

        assert_eq!(output.decision, Decision::EnforceAction);
        assert!(output.flags.contains(&"SANCTIONED_ADDRESS".to_string()));
        assert!(output
            .recommendations
            .iter()
            .any(|r| r.to_lowercase().contains("freeze")));
    }

    #[tokio::test]
    async fn test_very_high_score_enforces_without_escalation() {
        let mut input = ambiguous();
        let w = &mut input.wallet_signals;
        w.age_in_days = 3;
        w.on_chain_reputation = None;
        w.has_gitcoin_passport = false;
        w.suspicious_patterns.rapid_draining = true;
        w.transaction_velocity.last_24h = 150;
        w.transaction_velocity.last_30d = 450;
        input.market_volatility.volatility_index = 85.0;
        input.market_volatility.flash_crash_detected = true;

        let output = orchestrator(Arc::new(LenientAssessor)).analyze(&input).await;

        assert_eq!(output.decision, Decision::EnforceAction);
        assert_eq!(output.risk_score, 100.0);
        assert!(!output.metadata.escalation_used);
        assert_eq!(output.metadata.decision_rule, DecisionRule::VeryHighScore);
        assert_eq!(output.confidence, 90.0);
        assert!(output
            .recommendations
            .contains(&"URGENT: Investigate potential compromise".to_string()));
        assert_eq!(
            &output.flags[..3],
            &["VERY_NEW_WALLET", "RAPID_DRAINAGE", "MIXER_INTERACTION"]
        );
    }

    #[tokio::test]
    async fn test_output_bounds_and_report() {
        let output = orchestrator(Arc::new(FallbackAssessor)).analyze(&ambiguous()).await;
        assert!((0.0..=100.0).contains(&output.risk_score));
        assert!((0.0..=100.0).contains(&output.confidence));
        assert!(output.metadata.processing_time_ms >= 0.0);

        let report = output.to_report();
        assert_eq!(report.metadata.request_id, "req-ambiguous");
        assert_eq!(report.timestamp, output.timestamp.timestamp());
    }

    #[test]
    fn test_from_config_without_key_uses_fallback() {
        let config = AppConfig {
            escalation: EscalationConfig {
                api_key: String::new(),
                ..Default::default()
            },
            ..Default::default()
        };
        let orchestrator = Orchestrator::from_config(&config).unwrap();
        assert_eq!(orchestrator.reasoner().assessor_name(), "fallback");
        assert!(orchestrator.reasoner().cache().is_some());
    }
}
