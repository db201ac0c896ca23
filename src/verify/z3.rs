//! In-process Z3 driver.
//!
//! Pattern reachability and exhaustiveness are posed as SAT questions over
//! a small constraint IR that is deliberately independent of the AST, so
//! the solver layer never grows a dependency on syntax. When the crate is
//! built without the `z3-verification` feature every solver entry point
//! reports "z3 not available" and callers assume arms are reachable.

use std::collections::HashMap;

use crate::analysis::diagnostics::{Diagnostic, DiagnosticLocation, Severity};
use crate::ast::nodes::*;

/// Default solver timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Boolean-valued constraint over integer and boolean variables.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    BoolLit(bool),
    BoolVar(String),
    Not(Box<Constraint>),
    And(Vec<Constraint>),
    Or(Vec<Constraint>),
    /// Comparison of two integer terms.
    Cmp(CmpOp, Term, Term),
    /// Equality between a boolean variable and a boolean literal.
    BoolEq(String, bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Integer-valued term.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Var(String),
    Lit(i64),
}

impl Constraint {
    pub fn and(constraints: Vec<Constraint>) -> Constraint {
        Constraint::And(constraints)
    }

    pub fn not(constraint: Constraint) -> Constraint {
        Constraint::Not(Box::new(constraint))
    }

    pub fn eq_int(var: impl Into<String>, value: i64) -> Constraint {
        Constraint::Cmp(CmpOp::Eq, Term::Var(var.into()), Term::Lit(value))
    }
}

/// Either a satisfying model or the named assertions of an unsat core.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Counterexample {
    pub model: Option<HashMap<String, String>>,
    pub unsat_core: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SatisfiabilityResult {
    /// `None` when the solver is unavailable or answered unknown.
    pub satisfiable: Option<bool>,
    pub counterexample: Option<Counterexample>,
}

/// Translate a match pattern into a constraint over the scrutinee.
///
/// Integers compare against an integer variable named after the scrutinee;
/// bools against a boolean variable; enum variants against the variant's
/// index in its definition. Wildcards and bindings are unconstrained.
/// Returns `None` for patterns with no solver encoding (strings, structs).
pub fn pattern_constraint(
    pattern: &Pattern,
    scrutinee: &str,
    enum_def: Option<&StructDef>,
) -> Option<Constraint> {
    match pattern {
        Pattern::Wildcard(_) => Some(Constraint::BoolLit(true)),
        Pattern::Binding(binding) => {
            if let Some(def) = enum_def {
                if let Some(index) = def.variants().iter().position(|v| *v == binding.name) {
                    return Some(Constraint::eq_int(scrutinee, index as i64));
                }
            }
            Some(Constraint::BoolLit(true))
        }
        Pattern::Literal(literal) => match literal.literal.as_ref() {
            Expression::Int(lit) => Some(Constraint::eq_int(scrutinee, lit.value)),
            Expression::Bool(lit) => Some(Constraint::BoolEq(scrutinee.into(), lit.value)),
            _ => None,
        },
        Pattern::Struct(_) => None,
    }
}

/// Pure structural validation of statute elements; needs no solver.
///
/// Checks element-name uniqueness within each statute, duplicate section
/// numbers across the module, and penalty range sanity.
pub fn verify_statute_elements(module: &ModuleNode) -> Vec<Diagnostic> {
    let mut diagnostics = vec![];

    let mut sections: HashMap<&str, &SourceLocation> = HashMap::new();
    for statute in &module.statutes {
        if let Some(previous) = sections.insert(&statute.section_number, &statute.location) {
            diagnostics.push(Diagnostic {
                message: format!(
                    "Duplicate section number \"{}\" (also declared at line {})",
                    statute.section_number, previous.line
                ),
                location: (&statute.location).into(),
                severity: Severity::Warning,
                node_type: "statute_block".into(),
                suggestion: None,
                missing_patterns: None,
            });
        }

        let mut seen = HashMap::new();
        for element in &statute.elements {
            if let Some(previous) = seen.insert(element.name.as_str(), &element.location) {
                diagnostics.push(Diagnostic {
                    message: format!(
                        "Duplicate element name '{}' in section {} (also declared at line {})",
                        element.name, statute.section_number, previous.line
                    ),
                    location: (&element.location).into(),
                    severity: Severity::Error,
                    node_type: "element_entry".into(),
                    suggestion: None,
                    missing_patterns: None,
                });
            }
        }

        if let Some(penalty) = &statute.penalty {
            if let (Some(min), Some(max)) = (&penalty.imprisonment_min, &penalty.imprisonment_max)
            {
                if min.value.total_days() > max.value.total_days() {
                    diagnostics.push(Diagnostic {
                        message: format!(
                            "Imprisonment minimum exceeds maximum in section {}",
                            statute.section_number
                        ),
                        location: (&penalty.location).into(),
                        severity: Severity::Error,
                        node_type: "penalty_block".into(),
                        suggestion: None,
                        missing_patterns: None,
                    });
                }
            }
            if let (Some(min), Some(max)) = (&penalty.fine_min, &penalty.fine_max) {
                if min.amount > max.amount {
                    diagnostics.push(Diagnostic {
                        message: format!(
                            "Fine minimum exceeds maximum in section {}",
                            statute.section_number
                        ),
                        location: (&penalty.location).into(),
                        severity: Severity::Error,
                        node_type: "penalty_block".into(),
                        suggestion: None,
                        missing_patterns: None,
                    });
                }
            }
        }
    }

    diagnostics
}

/// The diagnostic every solver entry point returns when Z3 is absent.
pub fn unavailable_diagnostic() -> Diagnostic {
    Diagnostic {
        message: "z3 not available".into(),
        location: DiagnosticLocation::default(),
        severity: Severity::Warning,
        node_type: "z3".into(),
        suggestion: Some("build with the z3-verification feature".into()),
        missing_patterns: None,
    }
}

#[derive(Debug, Clone)]
pub struct Z3Driver {
    pub timeout_ms: u64,
}

impl Default for Z3Driver {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

#[cfg(feature = "z3-verification")]
mod backend {
    use super::*;
    use z3::ast::{Ast, Bool, Int};
    use z3::{Config, Context, SatResult, Solver};

    struct Vars<'ctx> {
        ints: HashMap<String, Int<'ctx>>,
        bools: HashMap<String, Bool<'ctx>>,
    }

    impl<'ctx> Vars<'ctx> {
        fn new() -> Self {
            Self {
                ints: HashMap::new(),
                bools: HashMap::new(),
            }
        }

        fn int(&mut self, ctx: &'ctx Context, name: &str) -> Int<'ctx> {
            self.ints
                .entry(name.to_string())
                .or_insert_with(|| Int::new_const(ctx, name))
                .clone()
        }

        fn bool(&mut self, ctx: &'ctx Context, name: &str) -> Bool<'ctx> {
            self.bools
                .entry(name.to_string())
                .or_insert_with(|| Bool::new_const(ctx, name))
                .clone()
        }
    }

    fn term<'ctx>(ctx: &'ctx Context, vars: &mut Vars<'ctx>, t: &Term) -> Int<'ctx> {
        match t {
            Term::Var(name) => vars.int(ctx, name),
            Term::Lit(value) => Int::from_i64(ctx, *value),
        }
    }

    fn translate<'ctx>(
        ctx: &'ctx Context,
        vars: &mut Vars<'ctx>,
        constraint: &Constraint,
    ) -> Bool<'ctx> {
        match constraint {
            Constraint::BoolLit(value) => Bool::from_bool(ctx, *value),
            Constraint::BoolVar(name) => vars.bool(ctx, name),
            Constraint::Not(inner) => translate(ctx, vars, inner).not(),
            Constraint::And(parts) => {
                let translated: Vec<Bool> =
                    parts.iter().map(|p| translate(ctx, vars, p)).collect();
                let refs: Vec<&Bool> = translated.iter().collect();
                Bool::and(ctx, &refs)
            }
            Constraint::Or(parts) => {
                let translated: Vec<Bool> =
                    parts.iter().map(|p| translate(ctx, vars, p)).collect();
                let refs: Vec<&Bool> = translated.iter().collect();
                Bool::or(ctx, &refs)
            }
            Constraint::Cmp(op, left, right) => {
                let left = term(ctx, vars, left);
                let right = term(ctx, vars, right);
                match op {
                    CmpOp::Eq => left._eq(&right),
                    CmpOp::Ne => left._eq(&right).not(),
                    CmpOp::Lt => left.lt(&right),
                    CmpOp::Le => left.le(&right),
                    CmpOp::Gt => left.gt(&right),
                    CmpOp::Ge => left.ge(&right),
                }
            }
            Constraint::BoolEq(name, value) => {
                vars.bool(ctx, name)._eq(&Bool::from_bool(ctx, *value))
            }
        }
    }

    fn extract_model(
        model: &z3::Model,
        vars: &Vars,
    ) -> HashMap<String, String> {
        let mut values = HashMap::new();
        for (name, var) in &vars.ints {
            if let Some(value) = model.eval(var, true).and_then(|v| v.as_i64()) {
                values.insert(name.clone(), value.to_string());
            }
        }
        for (name, var) in &vars.bools {
            if let Some(value) = model.eval(var, true).and_then(|v| v.as_bool()) {
                values.insert(name.clone(), value.to_string());
            }
        }
        values
    }

    impl Z3Driver {
        pub fn is_available(&self) -> bool {
            true
        }

        fn config(&self) -> Config {
            let mut cfg = Config::new();
            cfg.set_param_value("timeout", &self.timeout_ms.to_string());
            cfg
        }

        /// SAT of the conjunction, with a model on SAT and named core
        /// members on UNSAT.
        pub fn check_satisfiability(&self, constraints: &[Constraint]) -> SatisfiabilityResult {
            let cfg = self.config();
            let ctx = Context::new(&cfg);
            let solver = Solver::new(&ctx);
            let mut vars = Vars::new();

            for (i, constraint) in constraints.iter().enumerate() {
                let translated = translate(&ctx, &mut vars, constraint);
                let tracker = Bool::new_const(&ctx, format!("c{i}"));
                solver.assert_and_track(&translated, &tracker);
            }

            match solver.check() {
                SatResult::Sat => {
                    let model = solver.get_model().map(|m| extract_model(&m, &vars));
                    SatisfiabilityResult {
                        satisfiable: Some(true),
                        counterexample: Some(Counterexample {
                            model,
                            unsat_core: vec![],
                        }),
                    }
                }
                SatResult::Unsat => {
                    let core = solver
                        .get_unsat_core()
                        .iter()
                        .map(|b| b.to_string())
                        .collect();
                    SatisfiabilityResult {
                        satisfiable: Some(false),
                        counterexample: Some(Counterexample {
                            model: None,
                            unsat_core: core,
                        }),
                    }
                }
                SatResult::Unknown => SatisfiabilityResult::default(),
            }
        }

        /// A pattern is reachable when it is satisfiable together with the
        /// negation of every earlier pattern.
        pub fn check_pattern_reachable(
            &self,
            pattern: &Constraint,
            previous: &[Constraint],
        ) -> Option<bool> {
            let mut constraints = vec![pattern.clone()];
            for p in previous {
                constraints.push(Constraint::not(p.clone()));
            }
            self.check_satisfiability(&constraints).satisfiable
        }

        /// Exhaustive when "no pattern matches" is unsatisfiable.
        pub fn check_exhaustiveness(
            &self,
            patterns: &[Constraint],
            type_constraint: Option<&Constraint>,
        ) -> Option<bool> {
            let mut constraints = vec![];
            if let Some(tc) = type_constraint {
                constraints.push(tc.clone());
            }
            for p in patterns {
                constraints.push(Constraint::not(p.clone()));
            }
            self.check_satisfiability(&constraints)
                .satisfiable
                .map(|sat| !sat)
        }

        /// Up to `k` distinct models via the blocking-clause loop.
        pub fn enumerate_models(
            &self,
            constraints: &[Constraint],
            k: usize,
        ) -> Vec<HashMap<String, String>> {
            let cfg = self.config();
            let ctx = Context::new(&cfg);
            let solver = Solver::new(&ctx);
            let mut vars = Vars::new();

            for constraint in constraints {
                let translated = translate(&ctx, &mut vars, constraint);
                solver.assert(&translated);
            }

            let mut models = vec![];
            while models.len() < k {
                if solver.check() != SatResult::Sat {
                    break;
                }
                let Some(model) = solver.get_model() else {
                    break;
                };

                let values = extract_model(&model, &vars);

                // Block this assignment so the next check yields a new one.
                let mut blockers: Vec<Bool> = vec![];
                for (name, var) in &vars.ints {
                    if let Some(value) = values.get(name).and_then(|v| v.parse::<i64>().ok()) {
                        blockers.push(var._eq(&Int::from_i64(&ctx, value)).not());
                    }
                }
                for (name, var) in &vars.bools {
                    if let Some(value) = values.get(name).and_then(|v| v.parse::<bool>().ok()) {
                        blockers.push(var._eq(&Bool::from_bool(&ctx, value)).not());
                    }
                }
                models.push(values);

                if blockers.is_empty() {
                    break;
                }
                let refs: Vec<&Bool> = blockers.iter().collect();
                solver.assert(&Bool::or(&ctx, &refs));
            }

            models
        }
    }
}

#[cfg(not(feature = "z3-verification"))]
mod backend {
    use super::*;

    impl Z3Driver {
        pub fn is_available(&self) -> bool {
            false
        }

        pub fn check_satisfiability(&self, _constraints: &[Constraint]) -> SatisfiabilityResult {
            SatisfiabilityResult::default()
        }

        /// Without the solver, arms are assumed reachable.
        pub fn check_pattern_reachable(
            &self,
            _pattern: &Constraint,
            _previous: &[Constraint],
        ) -> Option<bool> {
            None
        }

        pub fn check_exhaustiveness(
            &self,
            _patterns: &[Constraint],
            _type_constraint: Option<&Constraint>,
        ) -> Option<bool> {
            None
        }

        pub fn enumerate_models(
            &self,
            _constraints: &[Constraint],
            _k: usize,
        ) -> Vec<HashMap<String, String>> {
            vec![]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build;
    use crate::parser::parse;

    fn module_for(source: &str) -> ModuleNode {
        let result = parse(source, "<test>");
        assert!(result.is_valid(), "parse errors: {:?}", result.errors);
        build(&result.tree, "<test>")
    }

    #[test]
    fn test_duplicate_element_names() {
        let module = module_for(
            r#"statute "1" "T" { elements { actus_reus a := "x"; mens_rea a := "y"; } }"#,
        );
        let diagnostics = verify_statute_elements(&module);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Error);
        assert!(diagnostics[0].message.contains("Duplicate element name 'a'"));
    }

    #[test]
    fn test_duplicate_section_numbers_is_lint() {
        let module = module_for(
            r#"
statute "1" "A" { elements { actus_reus a := "x"; } }
statute "1" "B" { elements { actus_reus b := "y"; } }
"#,
        );
        let diagnostics = verify_statute_elements(&module);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
    }

    #[test]
    fn test_penalty_range_violation() {
        let module = module_for(
            r#"statute "1" "T" { penalty { fine := $500 to $100; } }"#,
        );
        let diagnostics = verify_statute_elements(&module);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("Fine minimum exceeds maximum"));
    }

    #[test]
    fn test_pattern_constraints() {
        let module = module_for(
            "struct Color { red, green, blue }\nfn f(c: Color) -> int { match c { case red => 1, case x if x == c => 2, case _ => 0 } }",
        );
        let enum_def = module.enum_def("Color").unwrap();

        let Statement::Expression(stmt) = &module.function_defs[0].body.statements[0] else {
            panic!("expected expression statement");
        };
        let Expression::Match(match_expr) = &stmt.expression else {
            panic!("expected match");
        };

        let first = pattern_constraint(&match_expr.arms[0].pattern, "c", Some(enum_def));
        assert_eq!(first, Some(Constraint::eq_int("c", 0)));

        let wildcard = pattern_constraint(&match_expr.arms[2].pattern, "c", Some(enum_def));
        assert_eq!(wildcard, Some(Constraint::BoolLit(true)));
    }

    #[test]
    fn test_unavailable_reports_diagnostic() {
        let diagnostic = unavailable_diagnostic();
        assert!(diagnostic.message.contains("z3 not available"));
    }

    #[cfg(not(feature = "z3-verification"))]
    #[test]
    fn test_reachability_assumed_without_solver() {
        let driver = Z3Driver::default();
        assert!(!driver.is_available());
        assert_eq!(
            driver.check_pattern_reachable(&Constraint::BoolLit(true), &[]),
            None
        );
    }

    #[cfg(feature = "z3-verification")]
    #[test]
    fn test_pattern_reachability_with_solver() {
        let driver = Z3Driver::default();

        // `x == 1` is unreachable after `x == 1` already matched.
        let pattern = Constraint::eq_int("x", 1);
        let reachable = driver.check_pattern_reachable(&pattern, &[Constraint::eq_int("x", 1)]);
        assert_eq!(reachable, Some(false));

        // ...but reachable after `x == 2`.
        let reachable = driver.check_pattern_reachable(&pattern, &[Constraint::eq_int("x", 2)]);
        assert_eq!(reachable, Some(true));
    }

    #[cfg(feature = "z3-verification")]
    #[test]
    fn test_enumerate_models_is_bounded() {
        let driver = Z3Driver::default();
        let constraints = [Constraint::Cmp(
            CmpOp::Ge,
            Term::Var("x".into()),
            Term::Lit(0),
        )];
        let models = driver.enumerate_models(&constraints, 3);
        assert_eq!(models.len(), 3);
    }
}
