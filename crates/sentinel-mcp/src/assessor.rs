//! Reasoning provider capability
//!
//! The escalation pass talks to exactly one `Assessor`, picked from
//! configuration: the live provider when an API key is set, otherwise the
//! conservative fallback policy.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use sentinel_core::{EscalationContext, EscalationSource, Verdict};
use serde_json::{json, Value};

use crate::config::EscalationConfig;
use crate::error::{truncate_body, Result, SentinelError};

/// Produces a structured verdict for an escalation context
#[async_trait]
pub trait Assessor: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Where verdicts from this assessor come from
    fn source(&self) -> EscalationSource;

    async fn assess(&self, context: &EscalationContext) -> Result<Verdict>;
}

/// Build the assessor selected by configuration.
pub fn from_config(config: &EscalationConfig) -> Result<Arc<dyn Assessor>> {
    if config.provider_configured() {
        Ok(Arc::new(ProviderAssessor::new(config)?))
    } else {
        Ok(Arc::new(FallbackAssessor))
    }
}

// =============================================================================
// Fallback
// =============================================================================

/// Conservative policy mapped purely from the deterministic score
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackAssessor;

#[async_trait]
impl Assessor for FallbackAssessor {
    fn name(&self) -> &str {
        "fallback"
    }

    fn source(&self) -> EscalationSource {
        EscalationSource::Unconfigured
    }

    async fn assess(&self, context: &EscalationContext) -> Result<Verdict> {
        Ok(Verdict::unconfigured(context.base_score))
    }
}

// =============================================================================
// Live Provider
// =============================================================================

/// HTTP client for an OpenAI-compatible chat completions API
pub struct ProviderAssessor {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
    temperature: f64,
}

impl ProviderAssessor {
    pub fn new(config: &EscalationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| SentinelError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
            "response_format": { "type": "json_object" }
        })
    }
}

#[async_trait]
impl Assessor for ProviderAssessor {
    fn name(&self) -> &str {
        &self.model
    }

    fn source(&self) -> EscalationSource {
        EscalationSource::Provider
    }

    async fn assess(&self, context: &EscalationContext) -> Result<Verdict> {
        let url = format!("{}/chat/completions", self.api_url);

        tracing::debug!(
            wallet = %context.wallet_hash,
            model = %self.model,
            "Requesting escalation verdict"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(&context.prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SentinelError::ProviderStatus {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SentinelError::MalformedResponse(e.to_string()))?;

        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                SentinelError::MalformedResponse("missing choices[0].message.content".into())
            })?;

        Ok(Verdict::parse(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_core::{AgentInput, Decision};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_config(api_url: String) -> EscalationConfig {
        EscalationConfig {
            api_key: "sk-test".to_string(),
            api_url,
            model: "gpt-4".to_string(),
            temperature: 0.1,
            timeout_seconds: 5,
        }
    }

    fn context(base_score: f64) -> EscalationContext {
        let mut input = AgentInput::default();
        input.wallet_signals.wallet_address = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e".into();
        EscalationContext::build(&input, base_score)
    }

    fn completion(content: &str) -> Value {
        json!({
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content }
            }]
        })
    }

    #[tokio::test]
    async fn test_fallback_assessor_uses_base_score() {
        let verdict = FallbackAssessor.assess(&context(80.0)).await.unwrap();
        assert_eq!(verdict.decision, Decision::EnforceAction);
        assert_eq!(verdict.confidence, 60.0);
        assert_eq!(FallbackAssessor.source(), EscalationSource::Unconfigured);
    }

    #[tokio::test]
    async fn test_provider_parses_verdict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                r#"{"risk_score": 58, "classification": "Privacy-focused user",
                    "decision": "MONITOR", "reasoning": "Reputation offsets mixer use.", "confidence": 72}"#,
            )))
            .expect(1)
            .mount(&server)
            .await;

        let assessor = ProviderAssessor::new(&provider_config(server.uri())).unwrap();
        let verdict = assessor.assess(&context(66.0)).await.unwrap();
        assert_eq!(verdict.decision, Decision::Monitor);
        assert_eq!(verdict.risk_score, 58.0);
        assert_eq!(verdict.classification, "Privacy-focused user");
    }

    #[tokio::test]
    async fn test_provider_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let assessor = ProviderAssessor::new(&provider_config(server.uri())).unwrap();
        let err = assessor.assess(&context(66.0)).await.unwrap_err();
        assert!(matches!(err, SentinelError::ProviderStatus { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_provider_schema_violation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                r#"{"risk_score": 58, "decision": "IGNORE", "classification": "x",
                    "reasoning": "y", "confidence": 72}"#,
            )))
            .mount(&server)
            .await;

        let assessor = ProviderAssessor::new(&provider_config(server.uri())).unwrap();
        let err = assessor.assess(&context(66.0)).await.unwrap_err();
        assert!(matches!(err, SentinelError::InvalidVerdict(_)));
    }

    #[tokio::test]
    async fn test_provider_missing_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let assessor = ProviderAssessor::new(&provider_config(server.uri())).unwrap();
        let err = assessor.assess(&context(66.0)).await.unwrap_err();
        assert!(matches!(err, SentinelError::MalformedResponse(_)));
    }

    #[test]
    fn test_selection_by_config() {
        let live = from_config(&provider_config("http://localhost:1".into())).unwrap();
        assert_eq!(live.source(), EscalationSource::Provider);

        let unconfigured = from_config(&EscalationConfig {
            api_key: String::new(),
            ..provider_config("http://localhost:1".into())
        })
        .unwrap();
        assert_eq!(unconfigured.source(), EscalationSource::Unconfigured);
    }
}
