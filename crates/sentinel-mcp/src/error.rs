//! Error types for the Sentinel MCP server

use sentinel_core::VerdictError;
use thiserror::Error;

/// Unified error type for the MCP server
#[derive(Error, Debug)]
pub enum SentinelError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Reasoning provider returned status {status}: {body}")]
    ProviderStatus { status: u16, body: String },

    #[error("Reasoning provider timed out after {0}s")]
    Timeout(u64),

    #[error("Reasoning provider response malformed: {0}")]
    MalformedResponse(String),

    #[error("Invalid verdict: {0}")]
    InvalidVerdict(#[from] VerdictError),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for SentinelError {
    fn from(e: reqwest::Error) -> Self {
        SentinelError::Http(e.to_string())
    }
}

impl SentinelError {
    /// Short description safe to hand downstream. Never includes provider
    /// response text.
    pub fn summary(&self) -> String {
        match self {
            SentinelError::Http(_) => "provider transport error".to_string(),
            SentinelError::ProviderStatus { status, .. } => {
                format!("provider returned status {status}")
            }
            SentinelError::Timeout(secs) => format!("provider timed out after {secs}s"),
            SentinelError::MalformedResponse(_) => "malformed provider response".to_string(),
            SentinelError::InvalidVerdict(_) => "provider verdict failed validation".to_string(),
            SentinelError::InvalidParameter(_) => "invalid parameter".to_string(),
            SentinelError::Serialization(_) => "serialization error".to_string(),
            SentinelError::Config(_) => "configuration error".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SentinelError>;

/// Upper bound on provider body text kept for logs
pub const MAX_LOGGED_BODY_CHARS: usize = 256;

/// Truncate provider response text before it is kept anywhere
pub fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_LOGGED_BODY_CHARS {
        body.to_string()
    } else {
        let head: String = body.chars().take(MAX_LOGGED_BODY_CHARS).collect();
        format!("{head}...")
    }
}

/// Validate a wallet address before analysis
pub fn validate_wallet(address: &str) -> Result<()> {
    if address.trim().is_empty() {
        return Err(SentinelError::InvalidParameter(
            "Wallet address cannot be empty".into(),
        ));
    }
    if address.len() > 128 {
        return Err(SentinelError::InvalidParameter(
            "Wallet address too long".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_wallet() {
        assert!(validate_wallet("0x742d35Cc6634C0532925a3b844Bc454e4438f44e").is_ok());
        assert!(validate_wallet("").is_err());
        assert!(validate_wallet("   ").is_err());
        assert!(validate_wallet(&"a".repeat(200)).is_err());
    }

    #[test]
    fn test_summary_omits_provider_body() {
        let err = SentinelError::ProviderStatus {
            status: 401,
            body: "Incorrect API key provided: sk-live-SECRET1234".into(),
        };
        assert_eq!(err.summary(), "provider returned status 401");

        let err: SentinelError = VerdictError::UnknownDecision("FREEZE everything".into()).into();
        assert!(!err.summary().contains("FREEZE"));
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("short"), "short");
        let long = "x".repeat(10_000);
        assert_eq!(truncate_body(&long).len(), MAX_LOGGED_BODY_CHARS + 3);
    }

    #[test]
    fn test_verdict_error_converts() {
        let err: SentinelError = VerdictError::MissingField("decision").into();
        assert_eq!(
            err.to_string(),
            "Invalid verdict: Verdict is missing field: decision"
        );
    }
}
