//! Error types for Sentinel Core

use thiserror::Error;

/// Ways an escalation verdict can violate its response schema
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VerdictError {
    #[error("Verdict is not valid JSON: {0}")]
    NotJson(String),

    #[error("Verdict is not a JSON object")]
    NotAnObject,

    #[error("Verdict is missing field: {0}")]
    MissingField(&'static str),

    #[error("Verdict field has wrong type: {0}")]
    WrongType(&'static str),

    #[error("Verdict field {field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("Unknown decision token: {0}")]
    UnknownDecision(String),
}

pub type VerdictResult<T> = Result<T, VerdictError>;
