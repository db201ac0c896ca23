//! Controlled-natural-language rendering of a module.
//!
//! Statutes come out the way they read in a penal code: a SECTION heading,
//! definitions, the elements of the offence, the penalty clause and
//! lettered illustrations. Operators, durations, money amounts and
//! percentages are rendered in long form.

use crate::ast::format_money;
use crate::ast::nodes::*;

use super::{Emitter, TranspileTarget, Transpiler};

#[derive(Debug, Default)]
pub struct EnglishTranspiler;

impl Transpiler for EnglishTranspiler {
    fn target(&self) -> TranspileTarget {
        TranspileTarget::English
    }

    fn transpile(&self, module: &ModuleNode) -> String {
        let mut out = Emitter::new();

        for import in &module.imports {
            self.render_import(&mut out, import);
        }
        for referencing in &module.references {
            out.emit(format!("Reference: {}", referencing.path));
        }
        if !module.imports.is_empty() || !module.references.is_empty() {
            out.blank();
        }

        if !module.type_defs.is_empty() {
            out.emit("TYPE DEFINITIONS");
            out.emit("=".repeat(50));
            out.blank();
            for struct_def in &module.type_defs {
                self.render_struct(&mut out, struct_def);
                out.blank();
            }
        }

        if !module.function_defs.is_empty() {
            out.emit("FUNCTIONS");
            out.emit("=".repeat(50));
            out.blank();
            for function_def in &module.function_defs {
                self.render_function(&mut out, function_def);
                out.blank();
            }
        }

        for statute in &module.statutes {
            self.render_statute(&mut out, statute);
            out.blank();
        }

        if !module.variables.is_empty() {
            out.emit("DECLARATIONS");
            out.emit("=".repeat(50));
            out.blank();
            for variable in &module.variables {
                self.render_variable(&mut out, variable);
            }
        }

        out.finish()
    }
}

impl EnglishTranspiler {
    fn render_import(&self, out: &mut Emitter, import: &ImportNode) {
        if import.wildcard {
            out.emit(format!("Reference: All definitions from \"{}\"", import.path));
        } else if !import.imported_names.is_empty() {
            out.emit(format!(
                "Reference: {} from \"{}\"",
                import.imported_names.join(", "),
                import.path
            ));
        } else {
            out.emit(format!("Reference: \"{}\"", import.path));
        }
    }

    fn render_struct(&self, out: &mut Emitter, struct_def: &StructDef) {
        out.emit(format!("Type \"{}\" consists of:", struct_def.name));
        for field in &struct_def.fields {
            match &field.type_annotation {
                Some(type_node) => out.emit(format!(
                    "- {}: {}",
                    field.name,
                    type_node.display_name()
                )),
                None => out.emit(format!("- {} (alternative)", field.name)),
            }
        }
    }

    fn render_function(&self, out: &mut Emitter, function_def: &FunctionDef) {
        let params: Vec<String> = function_def
            .params
            .iter()
            .map(|p| format!("{} ({})", p.name, p.type_annotation.display_name()))
            .collect();
        let returning = match &function_def.return_type {
            Some(t) => format!(" returning {}", t.display_name()),
            None => String::new(),
        };

        out.emit(format!(
            "Function \"{}\"({}){}:",
            function_def.name,
            params.join(", "),
            returning
        ));
        out.indent();
        for statement in &function_def.body.statements {
            self.render_statement(out, statement);
        }
        out.dedent();
    }

    fn render_variable(&self, out: &mut Emitter, decl: &VariableDecl) {
        let type_str = decl.type_annotation.display_name();
        match &decl.value {
            Some(value) => out.emit(format!(
                "Let {} be a {type_str} with value {}.",
                decl.name,
                self.expr_to_english(value)
            )),
            None => out.emit(format!("Let {} be a {type_str}.", decl.name)),
        }
    }

    fn render_statement(&self, out: &mut Emitter, statement: &Statement) {
        match statement {
            Statement::VariableDecl(decl) => self.render_variable(out, decl),
            Statement::Assignment(assignment) => out.emit(format!(
                "Set {} to {}.",
                self.expr_to_english(&assignment.target),
                self.expr_to_english(&assignment.value)
            )),
            Statement::Return(ret) => match &ret.value {
                Some(value) => out.emit(format!("Return {}.", self.expr_to_english(value))),
                None => out.emit("Return."),
            },
            Statement::Pass(_) => out.emit("(No action)"),
            Statement::Expression(stmt) => match &stmt.expression {
                Expression::Match(match_expr) => self.render_match(out, match_expr),
                other => out.emit(format!("{}.", self.expr_to_english(other))),
            },
        }
    }

    fn render_statute(&self, out: &mut Emitter, statute: &StatuteNode) {
        let title = statute
            .title
            .as_ref()
            .map(|t| t.value.clone())
            .unwrap_or_else(|| statute.section_number.clone());
        out.emit(format!("SECTION {}: {title}", statute.section_number));
        out.emit("=".repeat(60));
        out.blank();

        if !statute.definitions.is_empty() {
            out.emit("Definitions:");
            for definition in &statute.definitions {
                out.emit(format!(
                    "\"{}\" means {}",
                    definition.term, definition.definition.value
                ));
            }
            out.blank();
        }

        if !statute.elements.is_empty() {
            out.emit("Elements of the offence:");
            for (i, element) in statute.elements.iter().enumerate() {
                self.render_element(out, element, i + 1);
            }
            out.blank();
        }

        if let Some(penalty) = &statute.penalty {
            self.render_penalty(out, penalty);
            out.blank();
        }

        if !statute.illustrations.is_empty() {
            out.emit("Illustrations:");
            out.blank();
            for (i, illustration) in statute.illustrations.iter().enumerate() {
                let label = illustration
                    .label
                    .clone()
                    .unwrap_or_else(|| format!("({})", (b'a' + (i as u8 % 26)) as char));
                out.emit(format!("{label} {}", illustration.description.value));
            }
            out.blank();
        }
    }

    fn render_element(&self, out: &mut Emitter, element: &ElementNode, index: usize) {
        let label = format!(
            "{index}. {} ({})",
            element.element_type.label(),
            element.name
        );
        match &element.description {
            Expression::Str(text) => out.emit(format!("{label}: {}", text.value)),
            Expression::Match(match_expr) => {
                out.emit(format!("{label}:"));
                out.indent();
                self.render_match(out, match_expr);
                out.dedent();
            }
            other => out.emit(format!("{label}: {}", self.expr_to_english(other))),
        }
    }

    fn render_penalty(&self, out: &mut Emitter, penalty: &PenaltyNode) {
        out.emit("Penalty:");

        let mut parts = vec![];
        if penalty.imprisonment_min.is_some() || penalty.imprisonment_max.is_some() {
            match (&penalty.imprisonment_min, &penalty.imprisonment_max) {
                (Some(min), Some(max)) => parts.push(format!(
                    "imprisonment for a term of not less than {} and not more than {}",
                    min.value, max.value
                )),
                (None, Some(max)) => parts.push(format!(
                    "imprisonment for a term which may extend to {}",
                    max.value
                )),
                (Some(min), None) => parts.push(format!(
                    "imprisonment for a term of not less than {}",
                    min.value
                )),
                (None, None) => {}
            }
        }
        if penalty.fine_min.is_some() || penalty.fine_max.is_some() {
            match (&penalty.fine_min, &penalty.fine_max) {
                (Some(min), Some(max)) => parts.push(format!(
                    "a fine of not less than {} and not more than {}",
                    format_money(min.currency, &min.amount),
                    format_money(max.currency, &max.amount)
                )),
                (None, Some(max)) => parts.push(format!(
                    "a fine which may extend to {}",
                    format_money(max.currency, &max.amount)
                )),
                (Some(min), None) => parts.push(format!(
                    "a fine of not less than {}",
                    format_money(min.currency, &min.amount)
                )),
                (None, None) => {}
            }
        }

        match parts.len() {
            0 => out.emit("Penalty to be determined."),
            1 => out.emit(format!("Shall be punished with {}.", parts[0])),
            _ => out.emit(format!(
                "Shall be punished with {}, or with {}, or with both.",
                parts[0], parts[1]
            )),
        }

        if let Some(supplementary) = &penalty.supplementary {
            out.blank();
            out.emit(format!("Additionally: {}", supplementary.value));
        }
    }

    fn render_match(&self, out: &mut Emitter, match_expr: &MatchExpr) {
        if let Some(scrutinee) = &match_expr.scrutinee {
            out.emit(format!("Based on {}:", self.expr_to_english(scrutinee)));
        }

        let last = match_expr.arms.len().saturating_sub(1);
        for (i, arm) in match_expr.arms.iter().enumerate() {
            let guard = match &arm.guard {
                Some(guard) => format!(", provided that {}", self.expr_to_english(guard)),
                None => String::new(),
            };
            let body = self.expr_to_english(&arm.body);

            let is_trailing_wildcard =
                i == last && matches!(arm.pattern, Pattern::Wildcard(_)) && arm.guard.is_none();
            if is_trailing_wildcard {
                out.emit(format!("Otherwise: {body}"));
            } else {
                out.emit(format!(
                    "If {}{guard}: {body}",
                    self.pattern_to_english(&arm.pattern)
                ));
            }
        }
    }

    fn pattern_to_english(&self, pattern: &Pattern) -> String {
        match pattern {
            Pattern::Wildcard(_) => "anything".into(),
            Pattern::Binding(binding) => binding.name.clone(),
            Pattern::Literal(literal) => self.expr_to_english(&literal.literal),
            Pattern::Struct(struct_pattern) => {
                let fields: Vec<String> = struct_pattern
                    .fields
                    .iter()
                    .map(|f| match &f.pattern {
                        Some(sub) => format!("{} is {}", f.name, self.pattern_to_english(sub)),
                        None => f.name.clone(),
                    })
                    .collect();
                if fields.is_empty() {
                    format!("a {}", struct_pattern.type_name)
                } else {
                    format!("a {} where {}", struct_pattern.type_name, fields.join(" and "))
                }
            }
        }
    }

    fn expr_to_english(&self, expression: &Expression) -> String {
        match expression {
            Expression::Int(lit) => lit.value.to_string(),
            Expression::Float(lit) => lit.value.to_string(),
            Expression::Bool(lit) => if lit.value { "true" } else { "false" }.into(),
            Expression::Str(lit) => format!("\"{}\"", lit.value),
            Expression::Money(lit) => format_money(lit.currency, &lit.amount),
            Expression::Percent(lit) => format!("{}%", lit.value),
            Expression::Date(lit) => lit.value.to_string(),
            Expression::Duration(lit) => lit.value.to_string(),
            Expression::Identifier(identifier) => identifier.name.clone(),
            Expression::FieldAccess(access) => format!(
                "{}.{}",
                self.expr_to_english(&access.base),
                access.field_name
            ),
            Expression::IndexAccess(access) => format!(
                "{}[{}]",
                self.expr_to_english(&access.base),
                self.expr_to_english(&access.index)
            ),
            Expression::Call(call) => {
                let args: Vec<String> =
                    call.args.iter().map(|a| self.expr_to_english(a)).collect();
                format!("{}({})", self.expr_to_english(&call.callee), args.join(", "))
            }
            Expression::Binary(binary) => format!(
                "{} {} {}",
                self.expr_to_english(&binary.left),
                operator_to_english(&binary.operator),
                self.expr_to_english(&binary.right)
            ),
            Expression::Unary(unary) => match unary.operator.as_str() {
                "!" | "not" => format!("not {}", self.expr_to_english(&unary.operand)),
                "-" => format!("negative {}", self.expr_to_english(&unary.operand)),
                other => format!("{other}{}", self.expr_to_english(&unary.operand)),
            },
            Expression::Match(match_expr) => {
                let scrutinee = match_expr
                    .scrutinee
                    .as_ref()
                    .map(|s| self.expr_to_english(s))
                    .unwrap_or_else(|| "the circumstances".into());
                format!("a determination based on {scrutinee}")
            }
            Expression::StructLiteral(literal) => {
                let name = literal.struct_name.clone().unwrap_or_else(|| "value".into());
                let fields: Vec<String> = literal
                    .field_values
                    .iter()
                    .map(|f| format!("{} = {}", f.name, self.expr_to_english(&f.value)))
                    .collect();
                if fields.is_empty() {
                    format!("a {name}")
                } else {
                    format!("a {name} with {}", fields.join(", "))
                }
            }
            Expression::Pass(_) => "(no action)".into(),
        }
    }
}

fn operator_to_english(operator: &str) -> &str {
    match operator {
        "+" => "plus",
        "-" => "minus",
        "*" => "times",
        "/" => "divided by",
        "%" => "modulo",
        "==" => "equals",
        "!=" => "does not equal",
        "<" => "is less than",
        ">" => "is greater than",
        "<=" => "is at most",
        ">=" => "is at least",
        "&&" | "and" => "and",
        "||" | "or" => "or",
        other => other,
    }
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
        EnglishTranspiler::default().transpile(&module)
    }

    #[test]
    fn test_statute_sections() {
        let text = render(
            r#"
statute "378" "Theft" {
    definitions { "property" := "movable property of any kind"; }
    elements {
        actus_reus taking := "moves property out of possession";
    }
    penalty {
        imprisonment := 2 years 3 days;
        fine := S$10,000;
    }
    illustrations { "A takes a ring belonging to Z."; }
}
"#,
        );

        assert!(text.contains("SECTION 378: Theft"));
        assert!(text.contains("\"property\" means movable property of any kind"));
        assert!(text.contains("Elements of the offence:"));
        assert!(text.contains("1. Actus reus (taking): moves property out of possession"));
        assert!(text.contains(
            "Shall be punished with imprisonment for a term which may extend to 2 years and 3 days, or with a fine which may extend to S$10,000.00, or with both."
        ));
        assert!(text.contains("(a) A takes a ring belonging to Z."));
    }

    #[test]
    fn test_match_arm_rendering() {
        let text = render(
            "fn f(n: int) -> int { match n { case 0 => 1, case x if x > 0 => 2, case _ => 3 } }",
        );

        assert!(text.contains("Based on n:"));
        assert!(text.contains("If 0: 1"));
        assert!(text.contains("If x, provided that x is greater than 0: 2"));
        assert!(text.contains("Otherwise: 3"));
    }

    #[test]
    fn test_function_signature() {
        let text = render("fn is_adult(age: int) -> bool { return age >= 18; }");
        assert!(text.contains("Function \"is_adult\"(age (int)) returning bool:"));
        assert!(text.contains("Return age is at least 18."));
    }

    #[test]
    fn test_imports_and_references() {
        let text = render("import \"penal_code\" from *;\nreferencing \"Penal Code 1871\";");
        assert!(text.contains("Reference: All definitions from \"penal_code\""));
        assert!(text.contains("Reference: Penal Code 1871"));
    }

    #[test]
    fn test_type_definition() {
        let text = render("struct Color { red, green, blue }");
        assert!(text.contains("Type \"Color\" consists of:"));
        assert!(text.contains("- red (alternative)"));
    }
}
