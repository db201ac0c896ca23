//! External-solver drivers.
//!
//! The Alloy analyzer runs as a subprocess with its output parsed back
//! into diagnostics; Z3 runs in-process when the `z3-verification` feature
//! is enabled and degrades to a "not available" diagnostic otherwise.
//! Driver failures are structured values, never panics.

pub mod alloy;
pub mod z3;

use std::error::Error;
use std::fmt::Display;

/// Failure at a solver boundary: missing binary, bad exit, or timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyError {
    pub stage: &'static str,
    pub message: String,
}

impl VerifyError {
    pub fn new(stage: &'static str, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

impl Display for VerifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.message)
    }
}

impl Error for VerifyError {}
