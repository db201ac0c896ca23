//! Shared diagnostic shape emitted by every pass.
//!
//! Each pass keeps its own error type (scope errors, type errors,
//! exhaustiveness errors); the pipeline converts them all into
//! [`Diagnostic`] values for callers, so the distinct error classes never
//! collapse into plain strings.

use std::fmt::Display;

use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::ast::nodes::SourceLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Location shape exposed to callers; mirrors the analysis API contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticLocation {
    pub file: String,
    pub line: usize,
    pub col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl From<&SourceLocation> for DiagnosticLocation {
    fn from(location: &SourceLocation) -> Self {
        Self {
            file: location.file.clone(),
            line: location.line,
            col: location.col,
            end_line: location.end_line,
            end_col: location.end_col,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub location: DiagnosticLocation,
    pub severity: Severity,
    pub node_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_patterns: Option<Vec<String>>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, location: &SourceLocation, node_type: &str) -> Self {
        Self {
            message: message.into(),
            location: location.into(),
            severity: Severity::Error,
            node_type: node_type.to_string(),
            suggestion: None,
            missing_patterns: None,
        }
    }

    pub fn warning(message: impl Into<String>, location: &SourceLocation, node_type: &str) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(message, location, node_type)
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
        };
        write!(
            f,
            "{severity}: {} ({}:{}:{})",
            self.message, self.location.file, self.location.line, self.location.col
        )
    }
}
