//! # riskwatch-action
//!
//! Pure lookup from segment to recommended action.
//!
//! - **ActionTable**: the configured `segment → (action, reason template)` rules
//! - **ReasonTemplate**: reason text with `{segment}`, `{score}` and
//!   `{confidence}` placeholders
//! - **ActionDeriver**: a table checked against a segment table so every
//!   segment has exactly one rule
//!
//! The action label depends only on the segment. The reason may embed the
//! score and confidence of the record being explained.

#![deny(unsafe_code)]

pub mod deriver;
pub mod rules;
pub mod template;

pub use deriver::{ActionContext, ActionDeriver};
pub use rules::{ActionRule, ActionTable};
pub use template::ReasonTemplate;
