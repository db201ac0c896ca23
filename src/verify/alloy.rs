//! Driver for the Alloy Analyzer.
//!
//! Runs `java -jar <alloy.jar>` over a generated model and parses the
//! analyzer's output with narrow regexes for assertion verdicts. The jar
//! is located explicitly or through the `ALLOY_JAR` environment variable;
//! every failure mode (no java, no jar, timeout, bad exit) comes back as a
//! structured [`VerifyError`].

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::analysis::diagnostics::{Diagnostic, DiagnosticLocation, Severity};

use super::VerifyError;

const ALLOY_TIMEOUT: Duration = Duration::from_secs(30);

static VIOLATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Assertion\s+(\w+)\s+(?:may be violated|is invalid)").expect("static regex")
});
static VALID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Assertion\s+(\w+)\s+is valid").expect("static regex"));

/// Verdict for a single assertion in the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionVerdict {
    pub assertion: String,
    pub holds: bool,
}

impl AssertionVerdict {
    /// Map a verdict to the diagnostic shape used by the rest of the
    /// toolchain. Alloy output has no source positions.
    pub fn to_diagnostic(&self, file: &str) -> Diagnostic {
        let (severity, message) = if self.holds {
            (
                Severity::Warning,
                format!("Assertion {} is valid within scope", self.assertion),
            )
        } else {
            (
                Severity::Error,
                format!("Assertion {} may be violated", self.assertion),
            )
        };
        Diagnostic {
            message,
            location: DiagnosticLocation {
                file: file.to_string(),
                ..Default::default()
            },
            severity,
            node_type: "alloy_assertion".into(),
            suggestion: None,
            missing_patterns: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlloyRunner {
    jar: Option<PathBuf>,
    timeout: Duration,
}

impl Default for AlloyRunner {
    fn default() -> Self {
        Self::new(None)
    }
}

impl AlloyRunner {
    pub fn new(jar: Option<PathBuf>) -> Self {
        let jar = jar.or_else(|| std::env::var_os("ALLOY_JAR").map(PathBuf::from));
        Self {
            jar,
            timeout: ALLOY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_available(&self) -> bool {
        self.jar.as_ref().is_some_and(|jar| jar.exists())
    }

    /// Analyze a model, returning one verdict per assertion the analyzer
    /// reported on.
    pub fn analyze(&self, model: &str) -> Result<Vec<AssertionVerdict>, VerifyError> {
        let Some(jar) = &self.jar else {
            return Err(VerifyError::new(
                "alloy",
                "no analyzer jar configured (set ALLOY_JAR)",
            ));
        };

        let mut model_file = tempfile::Builder::new()
            .suffix(".als")
            .tempfile()
            .map_err(|e| VerifyError::new("alloy", format!("failed to write model: {e}")))?;
        model_file
            .write_all(model.as_bytes())
            .map_err(|e| VerifyError::new("alloy", format!("failed to write model: {e}")))?;

        let mut child = Command::new("java")
            .arg("-jar")
            .arg(jar)
            .arg(model_file.path())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| VerifyError::new("alloy", format!("failed to launch java: {e}")))?;

        let started = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) => {
                    if started.elapsed() > self.timeout {
                        let _ = child.kill();
                        return Err(VerifyError::new(
                            "alloy",
                            format!("timeout after {}s", self.timeout.as_secs()),
                        ));
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    return Err(VerifyError::new("alloy", format!("wait failed: {e}")));
                }
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| VerifyError::new("alloy", format!("failed to read output: {e}")))?;
        let combined = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        debug!("alloy analyzer produced {} bytes of output", combined.len());

        Ok(Self::parse_output(&combined))
    }

    pub fn parse_output(output: &str) -> Vec<AssertionVerdict> {
        let mut verdicts = vec![];
        for capture in VIOLATION_RE.captures_iter(output) {
            verdicts.push(AssertionVerdict {
                assertion: capture[1].to_string(),
                holds: false,
            });
        }
        for capture in VALID_RE.captures_iter(output) {
            verdicts.push(AssertionVerdict {
                assertion: capture[1].to_string(),
                holds: true,
            });
        }
        verdicts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_violation_and_valid() {
        let output = "\
Executing \"check S300GuiltyImpliesElements for 5 but 4 Int\"
Assertion S300GuiltyImpliesElements is valid.
Executing \"check S300NoElementsNoGuilt for 5 but 4 Int\"
Assertion S300NoElementsNoGuilt may be violated.
";
        let verdicts = AlloyRunner::parse_output(output);
        assert_eq!(verdicts.len(), 2);

        let valid = verdicts.iter().find(|v| v.holds).unwrap();
        assert_eq!(valid.assertion, "S300GuiltyImpliesElements");

        let violated = verdicts.iter().find(|v| !v.holds).unwrap();
        assert_eq!(violated.assertion, "S300NoElementsNoGuilt");
    }

    #[test]
    fn test_verdict_to_diagnostic() {
        let verdict = AssertionVerdict {
            assertion: "X".into(),
            holds: false,
        };
        let diagnostic = verdict.to_diagnostic("model.als");
        assert_eq!(diagnostic.severity, Severity::Error);
        assert!(diagnostic.message.contains("may be violated"));
    }

    #[test]
    fn test_missing_jar_is_structured_failure() {
        let runner = AlloyRunner::new(None);
        if runner.is_available() {
            return; // environment happens to define ALLOY_JAR
        }
        let result = runner.analyze("sig A {}");
        assert!(result.is_err());
    }
}
