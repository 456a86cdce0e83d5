//! Escalation Reasoner
//!
//! Runs the secondary reasoning pass for ambiguous or high-stakes cases.
//! Provider failures never leave this module: every path ends in a verdict
//! that has been through the safety override and score fusion.

use std::sync::Arc;
use std::time::Duration;

use sentinel_core::{resolve, AgentInput, Decision, EscalationContext, EscalationSource, Verdict};

use crate::assessor::Assessor;
use crate::cache::{fingerprint, VerdictCache};
use crate::error::SentinelError;

/// Final result of the escalation stage
#[derive(Debug, Clone, PartialEq)]
pub struct EscalationOutcome {
    /// Fused risk score (0-100)
    pub risk_score: f64,
    pub decision: Decision,
    pub reasoning: String,
    pub confidence: f64,
    pub classification: String,
    pub source: EscalationSource,
    pub override_applied: bool,
    /// Score the verdict itself carried, before fusion
    pub verdict_score: f64,
}

pub struct EscalationReasoner {
    assessor: Arc<dyn Assessor>,
    cache: Option<VerdictCache>,
    timeout: Duration,
}

impl EscalationReasoner {
    pub fn new(
        assessor: Arc<dyn Assessor>,
        cache: Option<VerdictCache>,
        timeout: Duration,
    ) -> Self {
        Self {
            assessor,
            cache,
            timeout,
        }
    }

    pub fn assessor_name(&self) -> &str {
        self.assessor.name()
    }

    pub fn cache(&self) -> Option<&VerdictCache> {
        self.cache.as_ref()
    }

    /// Escalate a request whose deterministic score is `base_score`.
    pub async fn escalate(&self, input: &AgentInput, base_score: f64) -> EscalationOutcome {
        let context = EscalationContext::build(input, base_score);
        let (verdict, source) = self.verdict_for(&context).await;
        let verdict_score = verdict.risk_score;
        let resolution = resolve(base_score, verdict);

        if resolution.override_applied {
            tracing::warn!(
                wallet = %context.wallet_hash,
                base_score,
                "Escalated decision overridden by critical rule-based score"
            );
        }

        EscalationOutcome {
            risk_score: resolution.risk_score,
            decision: resolution.decision,
            reasoning: resolution.reasoning,
            confidence: resolution.confidence,
            classification: resolution.classification,
            source,
            override_applied: resolution.override_applied,
            verdict_score,
        }
    }

    async fn verdict_for(&self, context: &EscalationContext) -> (Verdict, EscalationSource) {
        let live = self.assessor.source() == EscalationSource::Provider;
        let key = fingerprint(&context.prompt);

        if live {
            if let Some(cache) = &self.cache {
                if let Some(verdict) = cache.get(&key).await {
                    tracing::debug!(wallet = %context.wallet_hash, "Verdict cache hit");
                    return (verdict, EscalationSource::Cached);
                }
            }
        }

        let result = match tokio::time::timeout(self.timeout, self.assessor.assess(context)).await {
            Ok(result) => result,
            Err(_) => Err(SentinelError::Timeout(self.timeout.as_secs())),
        };

        match result {
            Ok(verdict) => {
                if live {
                    if let Some(cache) = &self.cache {
                        cache.insert(key, verdict.clone()).await;
                    }
                }
                (verdict, self.assessor.source())
            }
            Err(e) => {
                tracing::warn!(
                    wallet = %context.wallet_hash,
                    assessor = %self.assessor.name(),
                    error = %e,
                    "Escalation failed, using conservative fallback"
                );
                (
                    Verdict::failure(context.base_score, &e.summary()),
                    EscalationSource::Failure,
                )
            }
        }
    }
}
