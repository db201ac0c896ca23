//! End-to-end pipeline: parse, build, and run the analysis passes in
//! order, accumulating diagnostics without ever aborting mid-way. IO
//! failures are wrapped as [`BoundaryError`]s naming the stage that
//! failed; no raw errors cross this surface.

use std::error::Error;
use std::fmt::Display;
use std::path::Path;

use log::debug;

use crate::analysis::diagnostics::{Diagnostic, DiagnosticLocation, Severity};
use crate::analysis::{check, exhaustiveness, infer, scope};
use crate::ast::nodes::{Expression, ModuleNode};
use crate::ast::build;
use crate::parser::parse;

/// Failure at an IO or subprocess boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryError {
    pub stage: &'static str,
    pub message: String,
}

impl BoundaryError {
    pub fn new(stage: &'static str, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

impl Display for BoundaryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} stage failed: {}", self.stage, self.message)
    }
}

impl Error for BoundaryError {}

/// Outcome of a pipeline run. `module` is present whenever the parser
/// produced a tree; `success` is false iff any error-severity diagnostic
/// was collected.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub module: ModuleNode,
    pub type_info: crate::analysis::TypeInferenceResult,
    pub scopes: crate::analysis::ScopeAnalysisResult,
    pub diagnostics: Vec<Diagnostic>,
    pub success: bool,
}

/// Run the full front-end over in-memory source text.
pub fn run(source: &str, file: &str) -> PipelineResult {
    let mut diagnostics = vec![];

    let parsed = parse(source, file);
    for error in &parsed.errors {
        diagnostics.push(Diagnostic {
            message: error.message.clone(),
            location: DiagnosticLocation {
                file: file.to_string(),
                line: error.span.line,
                col: error.span.col,
                end_line: error.span.end_line,
                end_col: error.span.end_col,
            },
            severity: Severity::Error,
            node_type: "source_file".into(),
            suggestion: None,
            missing_patterns: None,
        });
    }

    let module = build(&parsed.tree, file);
    debug!(
        "built module with {} statutes, {} structs, {} functions",
        module.statutes.len(),
        module.type_defs.len(),
        module.function_defs.len()
    );

    let scopes = scope::analyze(&module);
    for error in &scopes.errors {
        diagnostics.push(Diagnostic {
            message: error.message.clone(),
            location: (&error.location).into(),
            severity: error.severity,
            node_type: "identifier".into(),
            suggestion: None,
            missing_patterns: None,
        });
    }

    let type_info = infer::infer(&module);
    let checked = check::check(&module, &type_info);
    for error in &checked.errors {
        diagnostics.push(Diagnostic {
            message: error.message.clone(),
            location: (&error.location).into(),
            severity: error.severity,
            node_type: "expression".into(),
            suggestion: None,
            missing_patterns: None,
        });
    }

    let (_, exhaustiveness_errors) = exhaustiveness::check(&module, &type_info);
    for error in &exhaustiveness_errors {
        diagnostics.push(Diagnostic {
            message: error.message.clone(),
            location: (&error.location).into(),
            severity: Severity::Error,
            node_type: "match_expression".into(),
            suggestion: Some("add arms for the missing patterns, or a wildcard arm".into()),
            missing_patterns: Some(error.missing_patterns.clone()),
        });
    }

    for lint in section_number_lints(&module) {
        diagnostics.push(lint);
    }

    let success = !diagnostics.iter().any(|d| d.severity == Severity::Error);
    PipelineResult {
        module,
        type_info,
        scopes,
        diagnostics,
        success,
    }
}

/// Read a file and run the pipeline over it.
pub fn run_file(path: impl AsRef<Path>) -> Result<PipelineResult, BoundaryError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)
        .map_err(|e| BoundaryError::new("parser", format!("{}: {e}", path.display())))?;
    Ok(run(&source, &path.to_string_lossy()))
}

/// Section numbers across statutes should be unique; a duplicate is a
/// lint, not a parse error.
fn section_number_lints(module: &ModuleNode) -> Vec<Diagnostic> {
    let mut seen: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    let mut lints = vec![];

    for statute in &module.statutes {
        if let Some(previous_line) = seen.insert(&statute.section_number, statute.location.line) {
            lints.push(Diagnostic {
                message: format!(
                    "Duplicate section number \"{}\" (also declared at line {previous_line})",
                    statute.section_number
                ),
                location: (&statute.location).into(),
                severity: Severity::Warning,
                node_type: "statute_block".into(),
                suggestion: None,
                missing_patterns: None,
            });
        }
    }

    lints
}

// =========================================================================
// Assertion evaluation (test harness only)
// =========================================================================

/// Outcome of evaluating one `assert` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssertionOutcome {
    Passed,
    Failed { message: String },
    /// The condition touches something non-constant.
    Indeterminate,
}

/// Constant value produced by the small assertion evaluator.
#[derive(Debug, Clone, PartialEq)]
enum ConstValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

/// Evaluate the module's assertions by constant folding. Anything that is
/// not a closed constant expression is reported as indeterminate; there is
/// no general evaluator.
pub fn evaluate_assertions(module: &ModuleNode) -> Vec<AssertionOutcome> {
    module
        .assertions
        .iter()
        .map(|assert| match eval_const(&assert.condition) {
            Some(ConstValue::Bool(true)) => AssertionOutcome::Passed,
            Some(ConstValue::Bool(false)) => AssertionOutcome::Failed {
                message: assert
                    .message
                    .as_ref()
                    .map(|m| m.value.clone())
                    .unwrap_or_else(|| "assertion failed".into()),
            },
            _ => AssertionOutcome::Indeterminate,
        })
        .collect()
}

fn eval_const(expression: &Expression) -> Option<ConstValue> {
    match expression {
        Expression::Int(lit) => Some(ConstValue::Int(lit.value)),
        Expression::Float(lit) => Some(ConstValue::Float(lit.value)),
        Expression::Bool(lit) => Some(ConstValue::Bool(lit.value)),
        Expression::Str(lit) => Some(ConstValue::Str(lit.value.clone())),
        Expression::Unary(unary) => {
            let operand = eval_const(&unary.operand)?;
            match (unary.operator.as_str(), operand) {
                ("!", ConstValue::Bool(b)) | ("not", ConstValue::Bool(b)) => {
                    Some(ConstValue::Bool(!b))
                }
                ("-", ConstValue::Int(v)) => Some(ConstValue::Int(-v)),
                ("-", ConstValue::Float(v)) => Some(ConstValue::Float(-v)),
                _ => None,
            }
        }
        Expression::Binary(binary) => {
            let left = eval_const(&binary.left)?;
            let right = eval_const(&binary.right)?;
            eval_binary(&binary.operator, left, right)
        }
        _ => None,
    }
}

fn eval_binary(operator: &str, left: ConstValue, right: ConstValue) -> Option<ConstValue> {
    use ConstValue::*;

    match (operator, &left, &right) {
        ("&&" | "and", Bool(a), Bool(b)) => return Some(Bool(*a && *b)),
        ("||" | "or", Bool(a), Bool(b)) => return Some(Bool(*a || *b)),
        ("+", Str(a), Str(b)) => return Some(Str(format!("{a}{b}"))),
        ("==", _, _) => return Some(Bool(left == right)),
        ("!=", _, _) => return Some(Bool(left != right)),
        _ => {}
    }

    let as_float = |v: &ConstValue| match v {
        Int(i) => Some(*i as f64),
        Float(f) => Some(*f),
        _ => None,
    };

    match (operator, &left, &right) {
        ("+", Int(a), Int(b)) => Some(Int(a + b)),
        ("-", Int(a), Int(b)) => Some(Int(a - b)),
        ("*", Int(a), Int(b)) => Some(Int(a * b)),
        ("/", Int(a), Int(b)) if *b != 0 => Some(Int(a / b)),
        ("%", Int(a), Int(b)) if *b != 0 => Some(Int(a % b)),
        ("+", _, _) => Some(Float(as_float(&left)? + as_float(&right)?)),
        ("-", _, _) => Some(Float(as_float(&left)? - as_float(&right)?)),
        ("*", _, _) => Some(Float(as_float(&left)? * as_float(&right)?)),
        ("/", _, _) => Some(Float(as_float(&left)? / as_float(&right)?)),
        ("<", _, _) => Some(Bool(as_float(&left)? < as_float(&right)?)),
        (">", _, _) => Some(Bool(as_float(&left)? > as_float(&right)?)),
        ("<=", _, _) => Some(Bool(as_float(&left)? <= as_float(&right)?)),
        (">=", _, _) => Some(Bool(as_float(&left)? >= as_float(&right)?)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_module_succeeds() {
        let result = run(
            "fn f(b: bool) -> int { match b { case true => 1, case false => 0 } }",
            "<test>",
        );
        assert!(result.success, "diagnostics: {:?}", result.diagnostics);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_all_passes_contribute_diagnostics() {
        let source = r#"
int bad := ;
int y := missing;
int z := "text";
fn f(b: bool) -> int { match b { case true => 1 } }
"#;
        let result = run(source, "<test>");
        assert!(!result.success);

        let kinds: Vec<&str> = result
            .diagnostics
            .iter()
            .map(|d| d.node_type.as_str())
            .collect();
        assert!(kinds.contains(&"source_file"), "kinds: {kinds:?}");
        assert!(kinds.contains(&"identifier"), "kinds: {kinds:?}");
        assert!(kinds.contains(&"expression"), "kinds: {kinds:?}");
        assert!(kinds.contains(&"match_expression"), "kinds: {kinds:?}");
    }

    #[test]
    fn test_exhaustiveness_diagnostic_carries_witnesses() {
        let result = run(
            "fn f(b: bool) -> int { match b { case true => 1 } }",
            "<test>",
        );
        let diagnostic = result
            .diagnostics
            .iter()
            .find(|d| d.node_type == "match_expression")
            .unwrap();
        assert_eq!(
            diagnostic.missing_patterns,
            Some(vec!["false".to_string()])
        );
    }

    #[test]
    fn test_duplicate_sections_are_warnings() {
        let source = r#"
statute "1" "A" { elements { actus_reus a := "x"; } }
statute "1" "B" { elements { actus_reus b := "y"; } }
"#;
        let result = run(source, "<test>");
        assert!(result.success);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].severity, Severity::Warning);
    }

    #[test]
    fn test_missing_file_is_boundary_error() {
        let error = run_file("/nonexistent/path.yh").unwrap_err();
        assert_eq!(error.stage, "parser");
    }

    #[test]
    fn test_assertion_evaluation() {
        let result = run(
            r#"
assert 1 + 1 == 2;
assert 2 > 3, "arithmetic is broken";
assert some_variable == 1;
"#,
            "<test>",
        );
        let outcomes = evaluate_assertions(&result.module);

        assert_eq!(outcomes[0], AssertionOutcome::Passed);
        assert_eq!(
            outcomes[1],
            AssertionOutcome::Failed {
                message: "arithmetic is broken".into()
            }
        );
        assert_eq!(outcomes[2], AssertionOutcome::Indeterminate);
    }
}
