//! Alloy model generation for bounded model checking.
//!
//! Structs become `sig` declarations, functions become `pred`s, and each
//! statute becomes an offense sig whose Bool fields mirror its elements,
//! with a fact tying `guilty` to their conjunction. Paired `run`/`check`
//! commands let the Alloy Analyzer search for instances and
//! counterexamples; the default scope is `for 5 but 4 Int`.

use chrono::Datelike;

use crate::ast::nodes::*;

use super::{Emitter, TranspileTarget, Transpiler};

const SCOPE: &str = "for 5 but 4 Int";

#[derive(Debug, Default)]
pub struct AlloyTranspiler;

impl Transpiler for AlloyTranspiler {
    fn target(&self) -> TranspileTarget {
        TranspileTarget::Alloy
    }

    fn transpile(&self, module: &ModuleNode) -> String {
        let mut out = Emitter::new();

        out.emit("-- Alloy specification generated from Yuho");
        out.emit("-- Formal verification model for legal statutes");
        out.blank();

        self.emit_builtins(&mut out);

        for struct_def in &module.type_defs {
            self.emit_struct(&mut out, struct_def);
            out.blank();
        }

        for function_def in &module.function_defs {
            self.emit_function(&mut out, function_def);
            out.blank();
        }

        for statute in &module.statutes {
            self.emit_statute(&mut out, statute);
        }

        self.emit_commands(&mut out, module);

        out.finish()
    }
}

impl AlloyTranspiler {
    fn emit_builtins(&self, out: &mut Emitter) {
        out.emit("-- Built-in types");
        out.emit("sig Bool {}");
        out.emit("one sig True, False extends Bool {}");
        out.blank();
        out.emit("sig Money {");
        out.indent();
        out.emit("amount: Int");
        out.dedent();
        out.emit("}");
        out.blank();
        out.emit("sig Duration {");
        out.indent();
        out.emit("years: Int,");
        out.emit("months: Int,");
        out.emit("days: Int");
        out.dedent();
        out.emit("}");
        out.blank();
        out.emit("sig Percent {");
        out.indent();
        out.emit("value: Int");
        out.dedent();
        out.emit("}");
        out.blank();
        out.emit("-- Percent must be 0-100");
        out.emit("fact PercentRange {");
        out.indent();
        out.emit("all p: Percent | p.value >= 0 and p.value <= 100");
        out.dedent();
        out.emit("}");
        out.blank();
    }

    fn emit_struct(&self, out: &mut Emitter, struct_def: &StructDef) {
        out.emit(format!("-- Type: {}", struct_def.name));

        if struct_def.is_enum() {
            let variants: Vec<String> = struct_def
                .variants()
                .iter()
                .map(|v| safe_name(v))
                .collect();
            out.emit(format!("abstract sig {} {{}}", struct_def.name));
            out.emit(format!(
                "one sig {} extends {} {{}}",
                variants.join(", "),
                struct_def.name
            ));
            return;
        }

        out.emit(format!("sig {} {{", struct_def.name));
        out.indent();
        let count = struct_def.fields.len();
        for (i, field) in struct_def.fields.iter().enumerate() {
            let field_type = field
                .type_annotation
                .as_ref()
                .map(|t| type_to_alloy(t))
                .unwrap_or_else(|| struct_def.name.clone());
            let comma = if i + 1 < count { "," } else { "" };
            out.emit(format!("{}: {field_type}{comma}", safe_name(&field.name)));
        }
        out.dedent();
        out.emit("}");
    }

    fn emit_function(&self, out: &mut Emitter, function_def: &FunctionDef) {
        out.emit(format!("-- Function: {}", function_def.name));

        let params: Vec<String> = function_def
            .params
            .iter()
            .map(|p| format!("{}: {}", safe_name(&p.name), type_to_alloy(&p.type_annotation)))
            .collect();

        out.emit(format!(
            "pred {}[{}] {{",
            safe_name(&function_def.name),
            params.join(", ")
        ));
        out.indent();

        let mut emitted = 0;
        for statement in &function_def.body.statements {
            match statement {
                Statement::Return(ret) => {
                    if let Some(value) = &ret.value {
                        // Return values have no predicate meaning; the body
                        // is approximated and the result kept as a comment.
                        out.emit(format!("-- return: {}", expr_to_alloy(value)));
                        emitted += 1;
                    }
                }
                Statement::Expression(stmt) => {
                    out.emit(expr_to_alloy(&stmt.expression));
                    emitted += 1;
                }
                Statement::VariableDecl(decl) => {
                    let type_name = type_to_alloy(&decl.type_annotation);
                    match &decl.value {
                        Some(value) => out.emit(format!(
                            "some {}: {type_name} | {} = {}",
                            safe_name(&decl.name),
                            safe_name(&decl.name),
                            expr_to_alloy(value)
                        )),
                        None => out.emit(format!("some {}: {type_name}", safe_name(&decl.name))),
                    }
                    emitted += 1;
                }
                _ => {}
            }
        }
        if emitted == 0 {
            out.emit("some univ");
        }

        out.dedent();
        out.emit("}");
    }

    fn emit_statute(&self, out: &mut Emitter, statute: &StatuteNode) {
        let title = statute
            .title
            .as_ref()
            .map(|t| t.value.clone())
            .unwrap_or_else(|| statute.section_number.clone());
        let name = statute_name(&statute.section_number);

        out.emit(format!(
            "-- Statute: Section {} - {title}",
            statute.section_number
        ));
        out.emit(format!("sig {name}Offense {{"));
        out.indent();
        for element in &statute.elements {
            out.emit(format!("{}: Bool,", safe_name(&element.name)));
        }
        out.emit("guilty: Bool");
        out.dedent();
        out.emit("}");
        out.blank();

        // Guilt is exactly the conjunction of the elements.
        out.emit(format!("fact {name}ElementRequirements {{"));
        out.indent();
        out.emit(format!("all o: {name}Offense |"));
        out.indent();
        out.emit(format!(
            "o.guilty = True iff ({})",
            element_conjunction(statute, "True")
        ));
        out.dedent();
        out.dedent();
        out.emit("}");
        out.blank();

        for element in &statute.elements {
            if let Expression::Match(match_expr) = &element.description {
                out.emit(format!("-- Element: {}", element.name));
                out.emit(format!(
                    "fact {name}_{} {{",
                    safe_name(&element.name)
                ));
                out.indent();
                self.emit_match_constraint(out, match_expr);
                out.dedent();
                out.emit("}");
                out.blank();
            }
        }
    }

    /// A match expression becomes a disjunction over its arms.
    fn emit_match_constraint(&self, out: &mut Emitter, match_expr: &MatchExpr) {
        if match_expr.arms.is_empty() {
            out.emit("some univ");
            return;
        }

        let disjuncts: Vec<String> = match_expr
            .arms
            .iter()
            .map(|arm| {
                let body = expr_to_alloy(&arm.body);
                if matches!(arm.pattern, Pattern::Wildcard(_)) && arm.guard.is_none() {
                    format!("({body})")
                } else {
                    let pattern = pattern_to_alloy(&arm.pattern);
                    let guard = arm
                        .guard
                        .as_ref()
                        .map(|g| expr_to_alloy(g))
                        .unwrap_or_else(|| "some univ".into());
                    format!("({pattern} and {guard} implies {body})")
                }
            })
            .collect();

        out.emit(disjuncts.join(" or\n    "));
    }

    fn emit_commands(&self, out: &mut Emitter, module: &ModuleNode) {
        out.emit("-- =====================================================================");
        out.emit("-- Verification commands for bounded model checking");
        out.emit("-- =====================================================================");
        out.blank();
        out.emit("-- Run commands search for satisfying instances; check commands search");
        out.emit("-- for counterexamples to the paired assertion. In the Alloy Analyzer a");
        out.emit("-- green checkmark means the assertion holds within scope, a red X is a");
        out.emit("-- counterexample (click to inspect it).");
        out.blank();

        for statute in &module.statutes {
            let name = statute_name(&statute.section_number);
            let sig = format!("{name}Offense");

            out.emit(format!("run show{name}Instance {{"));
            out.indent();
            out.emit(format!("some o: {sig} | o.guilty = True"));
            out.dedent();
            out.emit(format!("}} {SCOPE}"));
            out.blank();

            out.emit(format!("run show{name}GuiltyScenario {{"));
            out.indent();
            out.emit(format!(
                "some o: {sig} | {}",
                element_conjunction(statute, "True")
            ));
            out.dedent();
            out.emit(format!("}} {SCOPE}"));
            out.blank();

            out.emit(format!("run show{name}InnocentScenario {{"));
            out.indent();
            out.emit(format!("some o: {sig} | o.guilty = False"));
            out.dedent();
            out.emit(format!("}} {SCOPE}"));
            out.blank();

            out.emit(format!("assert {name}GuiltyImpliesElements {{"));
            out.indent();
            out.emit(format!(
                "all o: {sig} | o.guilty = True implies ({})",
                element_conjunction(statute, "True")
            ));
            out.dedent();
            out.emit("}");
            out.emit(format!("check {name}GuiltyImpliesElements {SCOPE}"));
            out.blank();

            out.emit(format!("assert {name}ElementsImplyGuilty {{"));
            out.indent();
            out.emit(format!(
                "all o: {sig} | ({}) implies o.guilty = True",
                element_conjunction(statute, "True")
            ));
            out.dedent();
            out.emit("}");
            out.emit(format!("check {name}ElementsImplyGuilty {SCOPE}"));
            out.blank();

            if !statute.elements.is_empty() {
                out.emit(format!("assert {name}NoElementsNoGuilt {{"));
                out.indent();
                out.emit(format!(
                    "all o: {sig} | ({}) implies o.guilty = False",
                    element_conjunction(statute, "False")
                ));
                out.dedent();
                out.emit("}");
                out.emit(format!("check {name}NoElementsNoGuilt {SCOPE}"));
                out.blank();
            }
        }
    }
}

fn element_conjunction(statute: &StatuteNode, value: &str) -> String {
    if statute.elements.is_empty() {
        return format!("o.guilty = {value}");
    }
    statute
        .elements
        .iter()
        .map(|e| format!("o.{} = {value}", safe_name(&e.name)))
        .collect::<Vec<_>>()
        .join(" and ")
}

fn type_to_alloy(type_node: &TypeNode) -> String {
    match type_node {
        TypeNode::Builtin(builtin) => match builtin.name.as_str() {
            "int" => "Int".into(),
            // Alloy has no floats; model them as Int.
            "float" => "Int".into(),
            "bool" => "Bool".into(),
            "string" => "String".into(),
            "money" => "Money".into(),
            "percent" => "Percent".into(),
            // Dates are modelled as day counts.
            "date" => "Int".into(),
            "duration" => "Duration".into(),
            "void" => "none".into(),
            _ => "univ".into(),
        },
        TypeNode::Named(named) => named.name.clone(),
        TypeNode::Optional(optional) => format!("lone {}", type_to_alloy(&optional.inner)),
        TypeNode::Array(array) => format!("set {}", type_to_alloy(&array.element_type)),
        TypeNode::Generic(generic) => generic.base.clone(),
    }
}

fn expr_to_alloy(expression: &Expression) -> String {
    match expression {
        Expression::Int(lit) => lit.value.to_string(),
        // Truncated: Alloy has no floats.
        Expression::Float(lit) => (lit.value as i64).to_string(),
        Expression::Bool(lit) => if lit.value { "True" } else { "False" }.into(),
        Expression::Str(lit) => format!("\"{}\"", lit.value),
        Expression::Money(lit) => lit.amount.with_scale(0).to_string(),
        Expression::Percent(lit) => lit.value.to_string(),
        Expression::Date(lit) => lit.value.num_days_from_ce().to_string(),
        Expression::Duration(lit) => lit.value.total_days().to_string(),
        Expression::Identifier(identifier) => safe_name(&identifier.name),
        Expression::FieldAccess(access) => format!(
            "{}.{}",
            expr_to_alloy(&access.base),
            safe_name(&access.field_name)
        ),
        Expression::IndexAccess(access) => format!(
            "{}[{}]",
            expr_to_alloy(&access.base),
            expr_to_alloy(&access.index)
        ),
        Expression::Call(call) => {
            let args: Vec<String> = call.args.iter().map(expr_to_alloy).collect();
            format!("{}[{}]", expr_to_alloy(&call.callee), args.join(", "))
        }
        Expression::Binary(binary) => format!(
            "({} {} {})",
            expr_to_alloy(&binary.left),
            operator_to_alloy(&binary.operator),
            expr_to_alloy(&binary.right)
        ),
        Expression::Unary(unary) => match unary.operator.as_str() {
            "!" | "not" => format!("not {}", expr_to_alloy(&unary.operand)),
            other => format!("({other}{})", expr_to_alloy(&unary.operand)),
        },
        Expression::Match(_) => "some univ".into(),
        Expression::StructLiteral(literal) => literal
            .struct_name
            .clone()
            .unwrap_or_else(|| "univ".into()),
        Expression::Pass(_) => "none".into(),
    }
}

fn pattern_to_alloy(pattern: &Pattern) -> String {
    match pattern {
        Pattern::Wildcard(_) => "some univ".into(),
        Pattern::Binding(binding) => format!("some {}", safe_name(&binding.name)),
        Pattern::Literal(literal) => expr_to_alloy(&literal.literal),
        Pattern::Struct(struct_pattern) => {
            let fields: Vec<String> = struct_pattern
                .fields
                .iter()
                .map(|f| format!("some s.{}", safe_name(&f.name)))
                .collect();
            if fields.is_empty() {
                format!("some {}", struct_pattern.type_name)
            } else {
                format!(
                    "some s: {} | {}",
                    struct_pattern.type_name,
                    fields.join(" and ")
                )
            }
        }
    }
}

fn operator_to_alloy(operator: &str) -> &str {
    match operator {
        "+" => "add",
        "-" => "sub",
        "*" => "mul",
        "/" => "div",
        "==" => "=",
        "&&" | "and" => "and",
        "||" | "or" => "or",
        other => other,
    }
}

/// Sanitise an identifier for Alloy: alphanumerics and underscores only.
fn safe_name(name: &str) -> String {
    let mut safe: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    if safe.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        safe.insert(0, 'S');
    }
    safe
}

/// Section numbers become capitalised sig prefixes (`300` -> `S300`).
fn statute_name(section_number: &str) -> String {
    safe_name(section_number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build;
    use crate::parser::parse;

    fn render(source: &str) -> String {
        let result = parse(source, "<test>");
        assert!(result.is_valid(), "parse errors: {:?}", result.errors);
        let module = build(&result.tree, "<test>");
        AlloyTranspiler::default().transpile(&module)
    }

    #[test]
    fn test_guilty_iff_elements() {
        let model = render(
            r#"
statute "300" "Murder" {
    elements {
        actus_reus a := "the act";
        mens_rea b := "the intent";
    }
}
"#,
        );

        assert!(model.contains("sig S300Offense {"));
        assert!(model.contains("a: Bool,"));
        assert!(model.contains("b: Bool,"));
        assert!(model.contains("guilty: Bool"));
        assert!(model.contains("o.guilty = True iff (o.a = True and o.b = True)"));
        assert!(model.contains("assert S300GuiltyImpliesElements {"));
        assert!(model.contains("check S300GuiltyImpliesElements for 5 but 4 Int"));
        assert!(model.contains("assert S300ElementsImplyGuilty {"));
        assert!(model.contains("check S300ElementsImplyGuilty for 5 but 4 Int"));
        assert!(model.contains("assert S300NoElementsNoGuilt {"));
        assert!(model.contains("check S300NoElementsNoGuilt for 5 but 4 Int"));
    }

    #[test]
    fn test_run_commands() {
        let model = render(r#"statute "1" "Test" { elements { actus_reus x := "x"; } }"#);
        assert!(model.contains("run showS1Instance {"));
        assert!(model.contains("run showS1GuiltyScenario {"));
        assert!(model.contains("run showS1InnocentScenario {"));
    }

    #[test]
    fn test_percent_range_fact() {
        let model = render("");
        assert!(model.contains("fact PercentRange {"));
        assert!(model.contains("all p: Percent | p.value >= 0 and p.value <= 100"));
    }

    #[test]
    fn test_struct_to_sig() {
        let model = render("struct Person { name: string, age: int }");
        assert!(model.contains("sig Person {"));
        assert!(model.contains("name: String,"));
        assert!(model.contains("age: Int"));
    }

    #[test]
    fn test_enum_to_abstract_sig() {
        let model = render("struct Color { red, green, blue }");
        assert!(model.contains("abstract sig Color {}"));
        assert!(model.contains("one sig red, green, blue extends Color {}"));
    }

    #[test]
    fn test_function_to_pred() {
        let model = render("fn is_adult(age: int) -> bool { return age >= 18; }");
        assert!(model.contains("pred is_adult[age: Int] {"));
        assert!(model.contains("-- return: (age >= 18)"));
    }

    #[test]
    fn test_match_element_becomes_disjunctive_fact() {
        let model = render(
            r#"
struct Intent { direct, oblique }
statute "300" "Murder" {
    elements {
        mens_rea intention := match kind {
            case direct => TRUE,
            case _ => FALSE
        };
    }
}
"#,
        );
        assert!(model.contains("fact S300_intention {"));
        assert!(model.contains(" or\n"));
    }
}
