//! # Sentinel Core
//!
//! Deterministic half of Wallet Risk Sentinel: the signal model, the additive
//! risk scorer, the decision ladder, the escalation policy and the report
//! synthesis used to explain a decision.
//!
//! Nothing in this crate performs I/O. The reasoning provider call and the
//! orchestration around it live in `sentinel-mcp`.

pub mod decision;
pub mod error;
pub mod escalation;
pub mod models;
pub mod report;
pub mod scoring;

pub use decision::*;
pub use error::*;
pub use escalation::*;
pub use models::*;
pub use report::*;
pub use scoring::*;
