//! Match exhaustiveness checking via the pattern-matrix usefulness
//! algorithm ("Warnings for pattern matching", Maranget 2007).
//!
//! Concrete patterns are normalised to abstract patterns (wildcard,
//! literal, constructor, guarded). For each match expression with
//! exhaustiveness enabled, the arms form a matrix; a wildcard is useful
//! against that matrix exactly when some value is uncovered, and the
//! recursion produces witnesses naming the missing constructors.

use std::fmt::Display;

use crate::ast::nodes::*;

use super::infer::{TypeAnnotation, TypeInferenceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    /// Matches all values; bindings normalise here too.
    Wildcard,
    /// A constant value, compared on (kind, value).
    Literal,
    /// Struct or enum-variant tag with ordered sub-patterns.
    Constructor,
    /// Arm with a guard: covers at most its pattern, never counts toward
    /// exhaustiveness.
    Guarded,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AbstractPattern {
    pub kind: PatternKind,
    /// Literal rendering or constructor tag; empty for wildcards.
    pub value: String,
    pub children: Vec<AbstractPattern>,
}

impl AbstractPattern {
    pub fn wildcard() -> Self {
        Self {
            kind: PatternKind::Wildcard,
            value: String::new(),
            children: vec![],
        }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            kind: PatternKind::Literal,
            value: value.into(),
            children: vec![],
        }
    }

    pub fn constructor(tag: impl Into<String>, children: Vec<AbstractPattern>) -> Self {
        Self {
            kind: PatternKind::Constructor,
            value: tag.into(),
            children,
        }
    }

    pub fn guarded() -> Self {
        Self {
            kind: PatternKind::Guarded,
            value: String::new(),
            children: vec![],
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.kind == PatternKind::Wildcard
    }

    fn key(&self) -> (PatternKind, &str) {
        (self.kind, self.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct PatternRow {
    patterns: Vec<AbstractPattern>,
    arm_index: usize,
}

/// Matrix of abstract patterns: rows are arms, columns pattern positions.
/// Each column carries the type of the values it matches, so finite
/// constructor sets survive specialization into sub-patterns.
#[derive(Debug, Clone, PartialEq)]
struct PatternMatrix {
    rows: Vec<PatternRow>,
    column_types: Vec<TypeAnnotation>,
}

impl PatternMatrix {
    fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn has_empty_row(&self) -> bool {
        self.rows.iter().any(|row| row.patterns.is_empty())
    }

    /// Keep rows whose column matches `ctor`; wildcards expand to wildcard
    /// children of the constructor's arity, matching constructors expose
    /// their sub-patterns. The column's type is replaced by the
    /// constructor's field types.
    fn specialize(
        &self,
        col: usize,
        ctor: &AbstractPattern,
        child_types: &[TypeAnnotation],
    ) -> PatternMatrix {
        let arity = ctor.children.len().max(child_types.len());
        let mut rows = vec![];

        for row in &self.rows {
            let Some(pattern) = row.patterns.get(col) else {
                continue;
            };

            if pattern.is_wildcard() {
                let mut patterns = row.patterns[..col].to_vec();
                patterns.extend(std::iter::repeat(AbstractPattern::wildcard()).take(arity));
                patterns.extend_from_slice(&row.patterns[col + 1..]);
                rows.push(PatternRow {
                    patterns,
                    arm_index: row.arm_index,
                });
            } else if pattern.key() == ctor.key() {
                let mut patterns = row.patterns[..col].to_vec();
                let mut children = pattern.children.clone();
                children.resize(arity, AbstractPattern::wildcard());
                patterns.extend(children);
                patterns.extend_from_slice(&row.patterns[col + 1..]);
                rows.push(PatternRow {
                    patterns,
                    arm_index: row.arm_index,
                });
            }
        }

        let mut column_types = self.column_types[..col].to_vec();
        for i in 0..arity {
            column_types.push(
                child_types
                    .get(i)
                    .cloned()
                    .unwrap_or_else(TypeAnnotation::unknown),
            );
        }
        column_types.extend_from_slice(&self.column_types[col + 1..]);

        PatternMatrix { rows, column_types }
    }

    /// Keep only rows with a wildcard in the column, stripping that column.
    fn default_matrix(&self, col: usize) -> PatternMatrix {
        let mut rows = vec![];
        for row in &self.rows {
            let Some(pattern) = row.patterns.get(col) else {
                continue;
            };
            if pattern.is_wildcard() {
                let mut patterns = row.patterns[..col].to_vec();
                patterns.extend_from_slice(&row.patterns[col + 1..]);
                rows.push(PatternRow {
                    patterns,
                    arm_index: row.arm_index,
                });
            }
        }

        let mut column_types = self.column_types[..col].to_vec();
        column_types.extend_from_slice(&self.column_types[col + 1..]);

        PatternMatrix { rows, column_types }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExhaustivenessResult {
    pub match_id: NodeId,
    pub is_exhaustive: bool,
    pub missing_patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExhaustivenessError {
    pub message: String,
    pub location: SourceLocation,
    pub missing_patterns: Vec<String>,
}

impl Display for ExhaustivenessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}:{}:{})",
            self.message, self.location.file, self.location.line, self.location.col
        )
    }
}

impl std::error::Error for ExhaustivenessError {}

pub struct ExhaustivenessChecker<'a> {
    module: &'a ModuleNode,
    type_info: &'a TypeInferenceResult,
    pub results: Vec<ExhaustivenessResult>,
    pub errors: Vec<ExhaustivenessError>,
}

impl<'a> ExhaustivenessChecker<'a> {
    pub fn new(module: &'a ModuleNode, type_info: &'a TypeInferenceResult) -> Self {
        Self {
            module,
            type_info,
            results: vec![],
            errors: vec![],
        }
    }

    pub fn check(mut self) -> (Vec<ExhaustivenessResult>, Vec<ExhaustivenessError>) {
        let mut matches = vec![];
        collect_matches_in_module(self.module, &mut matches);
        for match_expr in matches {
            self.check_match(match_expr);
        }
        (self.results, self.errors)
    }

    /// Decide coverage for one match expression.
    pub fn check_match(&mut self, match_expr: &MatchExpr) {
        if !match_expr.ensure_exhaustiveness {
            return;
        }

        let scrutinee_type = match &match_expr.scrutinee {
            Some(scrutinee) => self.type_info.get_type(scrutinee.id()),
            None => TypeAnnotation::unknown(),
        };

        let rows = match_expr
            .arms
            .iter()
            .enumerate()
            .map(|(i, arm)| PatternRow {
                patterns: vec![self.extract(&arm.pattern, arm.guard.is_some(), &scrutinee_type)],
                arm_index: i,
            })
            .collect();
        let matrix = PatternMatrix {
            rows,
            column_types: vec![scrutinee_type.clone()],
        };

        let missing = self.check_usefulness(&matrix);
        let result = ExhaustivenessResult {
            match_id: match_expr.id,
            is_exhaustive: missing.is_none(),
            missing_patterns: missing.unwrap_or_default(),
        };

        if !result.is_exhaustive {
            let mut shown = result
                .missing_patterns
                .iter()
                .take(5)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ");
            if result.missing_patterns.len() > 5 {
                shown.push_str(", …");
            }
            self.errors.push(ExhaustivenessError {
                message: format!("Non-exhaustive match: patterns not covered: {shown}"),
                location: match_expr.location.clone(),
                missing_patterns: result.missing_patterns.clone(),
            });
        }

        self.results.push(result);
    }

    /// Normalise a concrete pattern. A binding that names a variant of the
    /// scrutinee's enum type is a constructor, not a catch-all.
    pub fn extract(
        &self,
        pattern: &Pattern,
        has_guard: bool,
        scrutinee_type: &TypeAnnotation,
    ) -> AbstractPattern {
        if has_guard {
            return AbstractPattern::guarded();
        }
        self.extract_unguarded(pattern, scrutinee_type)
    }

    fn extract_unguarded(
        &self,
        pattern: &Pattern,
        scrutinee_type: &TypeAnnotation,
    ) -> AbstractPattern {
        match pattern {
            Pattern::Wildcard(_) => AbstractPattern::wildcard(),
            Pattern::Binding(binding) => {
                let is_variant = self
                    .module
                    .enum_def(&scrutinee_type.type_name)
                    .is_some_and(|def| def.variants().contains(&binding.name.as_str()));
                if is_variant {
                    AbstractPattern::constructor(&binding.name, vec![])
                } else {
                    AbstractPattern::wildcard()
                }
            }
            Pattern::Literal(literal) => match literal.literal.as_ref() {
                Expression::Bool(lit) => AbstractPattern::literal(lit.value.to_string()),
                Expression::Int(lit) => AbstractPattern::literal(lit.value.to_string()),
                Expression::Str(lit) => AbstractPattern::literal(format!("\"{}\"", lit.value)),
                Expression::Float(lit) => AbstractPattern::literal(lit.value.to_string()),
                other => AbstractPattern::literal(render_literal(other)),
            },
            Pattern::Struct(struct_pattern) => {
                // Sub-patterns are laid out in the struct's declared field
                // order; unmentioned fields are wildcards.
                let layout = self.type_info.struct_defs.get(&struct_pattern.type_name);
                let children = match layout {
                    Some(fields) => fields
                        .iter()
                        .map(|(field_name, field_type)| {
                            struct_pattern
                                .fields
                                .iter()
                                .find(|fp| &fp.name == field_name)
                                .and_then(|fp| fp.pattern.as_ref())
                                .map(|sub| self.extract_unguarded(sub, field_type))
                                .unwrap_or_else(AbstractPattern::wildcard)
                        })
                        .collect(),
                    None => struct_pattern
                        .fields
                        .iter()
                        .map(|fp| {
                            fp.pattern
                                .as_ref()
                                .map(|sub| {
                                    self.extract_unguarded(sub, &TypeAnnotation::unknown())
                                })
                                .unwrap_or_else(AbstractPattern::wildcard)
                        })
                        .collect(),
                };
                AbstractPattern::constructor(&struct_pattern.type_name, children)
            }
        }
    }

    /// Finite constructor sets: bool (two literals), module enum-structs
    /// (their variants), and product structs (a single constructor whose
    /// fields become new columns). Infinite types such as int and string
    /// have no finite set and fall through to the default matrix.
    fn type_constructors(
        &self,
        type_ann: &TypeAnnotation,
    ) -> Vec<(AbstractPattern, Vec<TypeAnnotation>)> {
        if type_ann.is_array || type_ann.is_optional {
            return vec![];
        }
        if type_ann.type_name == "bool" {
            return vec![
                (AbstractPattern::literal("true"), vec![]),
                (AbstractPattern::literal("false"), vec![]),
            ];
        }
        let Some(def) = self.module.struct_def(&type_ann.type_name) else {
            return vec![];
        };
        if def.is_enum() {
            return def
                .variants()
                .iter()
                .map(|variant| (AbstractPattern::constructor(*variant, vec![]), vec![]))
                .collect();
        }
        if let Some(fields) = self.type_info.struct_defs.get(&type_ann.type_name) {
            let child_types: Vec<TypeAnnotation> =
                fields.iter().map(|(_, t)| t.clone()).collect();
            let children = vec![AbstractPattern::wildcard(); child_types.len()];
            return vec![(
                AbstractPattern::constructor(&def.name, children),
                child_types,
            )];
        }
        vec![]
    }

    /// Returns `None` when the matrix covers all values of the first
    /// column's type, otherwise witnesses naming uncovered constructors.
    fn check_usefulness(&self, matrix: &PatternMatrix) -> Option<Vec<String>> {
        // Empty matrix: the remaining value space is uncovered.
        if matrix.is_empty() {
            return Some(vec!["_".into()]);
        }
        // A row of width zero matches everything.
        if matrix.has_empty_row() {
            return None;
        }

        let col = 0;
        let column_type = matrix
            .column_types
            .first()
            .cloned()
            .unwrap_or_else(TypeAnnotation::unknown);
        let constructors = self.type_constructors(&column_type);

        if constructors.is_empty() {
            // Infinite or unknown type: coverage can only come from
            // wildcard rows, so only the default matrix matters. Witnesses
            // found through it stand for "anything else".
            let default = matrix.default_matrix(col);
            let witnesses = self.check_usefulness(&default)?;
            return Some(
                witnesses
                    .into_iter()
                    .map(|w| if w == "_" { w } else { format!("_{w}") })
                    .collect(),
            );
        }

        // The type's constructor set is complete: enumerating it covers the
        // whole value space, so no separate default pass is needed.
        let mut missing = vec![];
        for (ctor, child_types) in &constructors {
            let specialized = matrix.specialize(col, ctor, child_types);
            if let Some(sub_missing) = self.check_usefulness(&specialized) {
                if ctor.children.is_empty() {
                    missing.push(ctor.value.clone());
                } else {
                    // Product constructor: name the constructor once per
                    // distinct uncovered shape.
                    let shapes = sub_missing.join(", ");
                    missing.push(format!("{} {{ {shapes} }}", ctor.value));
                }
            }
        }

        if missing.is_empty() {
            None
        } else {
            Some(missing)
        }
    }
}

fn render_literal(expression: &Expression) -> String {
    match expression {
        Expression::Money(money) => format!("{}{}", money.currency.symbol(), money.amount),
        Expression::Percent(percent) => format!("{}%", percent.value),
        Expression::Date(date) => date.value.to_string(),
        Expression::Duration(duration) => duration.value.to_string(),
        _ => "?".into(),
    }
}

/// Collect every match expression in the module, including nested ones.
fn collect_matches_in_module<'a>(module: &'a ModuleNode, out: &mut Vec<&'a MatchExpr>) {
    for function_def in &module.function_defs {
        collect_matches_in_block(&function_def.body, out);
    }
    for statute in &module.statutes {
        for element in &statute.elements {
            collect_matches(&element.description, out);
        }
    }
    for variable in &module.variables {
        if let Some(value) = &variable.value {
            collect_matches(value, out);
        }
    }
    for assert in &module.assertions {
        collect_matches(&assert.condition, out);
    }
}

fn collect_matches_in_block<'a>(block: &'a Block, out: &mut Vec<&'a MatchExpr>) {
    for statement in &block.statements {
        match statement {
            Statement::VariableDecl(decl) => {
                if let Some(value) = &decl.value {
                    collect_matches(value, out);
                }
            }
            Statement::Assignment(assignment) => {
                collect_matches(&assignment.target, out);
                collect_matches(&assignment.value, out);
            }
            Statement::Return(ret) => {
                if let Some(value) = &ret.value {
                    collect_matches(value, out);
                }
            }
            Statement::Pass(_) => {}
            Statement::Expression(stmt) => collect_matches(&stmt.expression, out),
        }
    }
}

fn collect_matches<'a>(expression: &'a Expression, out: &mut Vec<&'a MatchExpr>) {
    match expression {
        Expression::Match(match_expr) => {
            out.push(match_expr);
            if let Some(scrutinee) = &match_expr.scrutinee {
                collect_matches(scrutinee, out);
            }
            for arm in &match_expr.arms {
                if let Some(guard) = &arm.guard {
                    collect_matches(guard, out);
                }
                collect_matches(&arm.body, out);
            }
        }
        Expression::FieldAccess(access) => collect_matches(&access.base, out),
        Expression::IndexAccess(access) => {
            collect_matches(&access.base, out);
            collect_matches(&access.index, out);
        }
        Expression::Call(call) => {
            collect_matches(&call.callee, out);
            for arg in &call.args {
                collect_matches(arg, out);
            }
        }
        Expression::Binary(binary) => {
            collect_matches(&binary.left, out);
            collect_matches(&binary.right, out);
        }
        Expression::Unary(unary) => collect_matches(&unary.operand, out),
        Expression::StructLiteral(literal) => {
            for field in &literal.field_values {
                collect_matches(&field.value, out);
            }
        }
        _ => {}
    }
}

/// Run exhaustiveness checking with a previously computed inference result.
pub fn check(
    module: &ModuleNode,
    type_info: &TypeInferenceResult,
) -> (Vec<ExhaustivenessResult>, Vec<ExhaustivenessError>) {
    ExhaustivenessChecker::new(module, type_info).check()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::infer::infer;
    use crate::ast::build;
    use crate::parser::parse;

    fn check_source(source: &str) -> (Vec<ExhaustivenessResult>, Vec<ExhaustivenessError>) {
        let result = parse(source, "<test>");
        assert!(result.is_valid(), "parse errors: {:?}", result.errors);
        let module = build(&result.tree, "<test>");
        let info = infer(&module);
        check(&module, &info)
    }

    #[test]
    fn test_bool_match_exhaustive() {
        let (results, errors) =
            check_source("fn f(b: bool) -> int { match b { case true => 1, case false => 0 } }");
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert_eq!(results.len(), 1);
        assert!(results[0].is_exhaustive);
        assert!(results[0].missing_patterns.is_empty());
    }

    #[test]
    fn test_bool_match_missing_false() {
        let (results, errors) =
            check_source("fn f(b: bool) -> int { match b { case true => 1 } }");
        assert_eq!(errors.len(), 1);
        assert_eq!(results[0].missing_patterns, vec!["false"]);
        assert!(errors[0].message.contains("false"));
    }

    #[test]
    fn test_enum_match_missing_variant() {
        let (results, _) = check_source(
            "struct Color { red, green, blue }\nfn f(c: Color) -> int { match c { case red => 1, case green => 2 } }",
        );
        assert!(!results[0].is_exhaustive);
        assert_eq!(results[0].missing_patterns, vec!["blue"]);
    }

    #[test]
    fn test_enum_match_all_variants() {
        let (results, errors) = check_source(
            "struct Color { red, green, blue }\nfn f(c: Color) -> int { match c { case red => 1, case green => 2, case blue => 3 } }",
        );
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert!(results[0].is_exhaustive);
    }

    #[test]
    fn test_wildcard_covers_everything() {
        let (results, errors) = check_source(
            "struct Color { red, green, blue }\nfn f(c: Color) -> int { match c { case red => 1, case _ => 0 } }",
        );
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert!(results[0].is_exhaustive);
    }

    #[test]
    fn test_guarded_arm_does_not_count() {
        let (results, _) = check_source(
            "fn f(b: bool) -> int { match b { case true => 1, case false if g() => 0 } }",
        );
        assert!(!results[0].is_exhaustive);
        assert_eq!(results[0].missing_patterns, vec!["false"]);
    }

    #[test]
    fn test_int_match_needs_wildcard() {
        let (results, _) =
            check_source("fn f(n: int) -> int { match n { case 0 => 1, case 1 => 2 } }");
        assert!(!results[0].is_exhaustive);

        let (results, errors) = check_source(
            "fn f(n: int) -> int { match n { case 0 => 1, case 1 => 2, case _ => 0 } }",
        );
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert!(results[0].is_exhaustive);
    }

    #[test]
    fn test_binding_pattern_covers_infinite_type() {
        let (results, errors) =
            check_source("fn f(n: int) -> int { match n { case 0 => 1, case x => x } }");
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert!(results[0].is_exhaustive);
    }

    #[test]
    fn test_witness_added_as_arm_makes_match_exhaustive() {
        // The missing witness for a bool match with only `true` is `false`;
        // adding that arm completes coverage.
        let (results, _) =
            check_source("fn f(b: bool) -> int { match b { case true => 1 } }");
        assert_eq!(results[0].missing_patterns, vec!["false"]);

        let (results, errors) = check_source(
            "fn f(b: bool) -> int { match b { case true => 1, case false => pass } }",
        );
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert!(results[0].is_exhaustive);
    }

    #[test]
    fn test_nested_match_is_checked() {
        let (results, _) = check_source(
            "fn f(a: bool, b: bool) -> int { match a { case true => match b { case true => 1 }, case _ => 0 } }",
        );
        // Outer match is exhaustive, inner match misses `false`.
        assert_eq!(results.len(), 2);
        let inner = results.iter().find(|r| !r.is_exhaustive).unwrap();
        assert_eq!(inner.missing_patterns, vec!["false"]);
    }

    #[test]
    fn test_struct_pattern_exhaustiveness() {
        let (results, errors) = check_source(
            "struct Flag { value: bool }\nfn f(x: Flag) -> int { match x { case Flag { value: true } => 1, case Flag { value: false } => 0 } }",
        );
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert!(results[0].is_exhaustive, "results: {results:?}");
    }
}
