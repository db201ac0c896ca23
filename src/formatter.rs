//! Canonical source formatting.
//!
//! Renders an AST back into Yuho source with a fixed style: four-space
//! indentation, one declaration per line, canonical literal spellings.
//! Formatting is idempotent: re-parsing formatted output and formatting it
//! again reproduces the same text byte for byte.

use crate::ast::format_money;
use crate::ast::nodes::*;
use crate::parser::parse;

pub trait Format {
    fn format(&self, ctx: &mut FormatterContext);
}

#[derive(Debug, Default)]
pub struct FormatterContext {
    pub output: String,
    indent_level: usize,
}

impl FormatterContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&mut self, text: &str) {
        self.output.push_str(text);
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent_level {
            self.output.push_str("    ");
        }
        self.output.push_str(text);
        self.output.push('\n');
    }

    fn blank(&mut self) {
        self.output.push('\n');
    }

    fn indent(&mut self) {
        self.indent_level += 1;
    }

    fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }
}

/// Format a whole module.
pub fn format_module(module: &ModuleNode) -> String {
    let mut ctx = FormatterContext::new();
    module.format(&mut ctx);
    ctx.output
}

/// Parse source text and render it in canonical style. Unparseable input
/// comes back unchanged.
pub fn format_source(source: &str, file: &str) -> String {
    let result = parse(source, file);
    if !result.is_valid() {
        return source.to_string();
    }
    let module = crate::ast::build(&result.tree, file);
    format_module(&module)
}

impl Format for ModuleNode {
    fn format(&self, ctx: &mut FormatterContext) {
        let mut wrote = false;

        for import in &self.imports {
            let names = if import.wildcard {
                " from *".to_string()
            } else if import.imported_names.is_empty() {
                String::new()
            } else {
                format!(" from {}", import.imported_names.join(", "))
            };
            ctx.line(&format!("import \"{}\"{names};", escape(&import.path)));
            wrote = true;
        }
        for referencing in &self.references {
            ctx.line(&format!("referencing \"{}\";", escape(&referencing.path)));
            wrote = true;
        }

        for struct_def in &self.type_defs {
            if wrote {
                ctx.blank();
            }
            struct_def.format(ctx);
            wrote = true;
        }
        for variable in &self.variables {
            if wrote {
                ctx.blank();
            }
            ctx.line(&format_variable_decl(variable));
            wrote = true;
        }
        for function_def in &self.function_defs {
            if wrote {
                ctx.blank();
            }
            function_def.format(ctx);
            wrote = true;
        }
        for statute in &self.statutes {
            if wrote {
                ctx.blank();
            }
            statute.format(ctx);
            wrote = true;
        }
        for assert in &self.assertions {
            if wrote {
                ctx.blank();
            }
            let message = assert
                .message
                .as_ref()
                .map(|m| format!(", \"{}\"", escape(&m.value)))
                .unwrap_or_default();
            ctx.line(&format!(
                "assert {}{message};",
                format_expression(&assert.condition)
            ));
            wrote = true;
        }
    }
}

impl Format for StructDef {
    fn format(&self, ctx: &mut FormatterContext) {
        let params = if self.type_params.is_empty() {
            String::new()
        } else {
            format!("<{}>", self.type_params.join(", "))
        };
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|field| match &field.type_annotation {
                Some(type_node) => format!("{}: {}", field.name, type_node.display_name()),
                None => field.name.clone(),
            })
            .collect();
        ctx.line(&format!(
            "struct {}{params} {{ {} }}",
            self.name,
            fields.join(", ")
        ));
    }
}

impl Format for FunctionDef {
    fn format(&self, ctx: &mut FormatterContext) {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| format!("{}: {}", p.name, p.type_annotation.display_name()))
            .collect();
        let returns = self
            .return_type
            .as_ref()
            .map(|t| format!(" -> {}", t.display_name()))
            .unwrap_or_default();

        ctx.line(&format!("fn {}({}){returns} {{", self.name, params.join(", ")));
        ctx.indent();
        for statement in &self.body.statements {
            statement.format(ctx);
        }
        ctx.dedent();
        ctx.line("}");
    }
}

impl Format for Statement {
    fn format(&self, ctx: &mut FormatterContext) {
        match self {
            Statement::VariableDecl(decl) => ctx.line(&format_variable_decl(decl)),
            Statement::Assignment(assignment) => ctx.line(&format!(
                "{} = {};",
                format_expression(&assignment.target),
                format_expression(&assignment.value)
            )),
            Statement::Return(ret) => match &ret.value {
                Some(value) => ctx.line(&format!("return {};", format_expression(value))),
                None => ctx.line("return;"),
            },
            Statement::Pass(_) => ctx.line("pass;"),
            Statement::Expression(stmt) => {
                ctx.line(&format!("{};", format_expression(&stmt.expression)))
            }
        }
    }
}

impl Format for StatuteNode {
    fn format(&self, ctx: &mut FormatterContext) {
        let title = self
            .title
            .as_ref()
            .map(|t| format!(" \"{}\"", escape(&t.value)))
            .unwrap_or_default();
        ctx.line(&format!(
            "statute \"{}\"{title} {{",
            escape(&self.section_number)
        ));
        ctx.indent();

        if !self.definitions.is_empty() {
            ctx.line("definitions {");
            ctx.indent();
            for definition in &self.definitions {
                ctx.line(&format!(
                    "\"{}\" := \"{}\";",
                    escape(&definition.term),
                    escape(&definition.definition.value)
                ));
            }
            ctx.dedent();
            ctx.line("}");
        }

        if !self.elements.is_empty() {
            ctx.line("elements {");
            ctx.indent();
            for element in &self.elements {
                ctx.line(&format!(
                    "{} {} := {};",
                    element.element_type.keyword(),
                    element.name,
                    format_expression(&element.description)
                ));
            }
            ctx.dedent();
            ctx.line("}");
        }

        if let Some(penalty) = &self.penalty {
            ctx.line("penalty {");
            ctx.indent();
            match (&penalty.imprisonment_min, &penalty.imprisonment_max) {
                (Some(min), Some(max)) => ctx.line(&format!(
                    "imprisonment := {} to {};",
                    format_duration(&min.value),
                    format_duration(&max.value)
                )),
                (None, Some(max)) => {
                    ctx.line(&format!("imprisonment := {};", format_duration(&max.value)))
                }
                _ => {}
            }
            match (&penalty.fine_min, &penalty.fine_max) {
                (Some(min), Some(max)) => ctx.line(&format!(
                    "fine := {} to {};",
                    format_money(min.currency, &min.amount),
                    format_money(max.currency, &max.amount)
                )),
                (None, Some(max)) => ctx.line(&format!(
                    "fine := {};",
                    format_money(max.currency, &max.amount)
                )),
                _ => {}
            }
            if let Some(supplementary) = &penalty.supplementary {
                ctx.line(&format!(
                    "supplementary := \"{}\";",
                    escape(&supplementary.value)
                ));
            }
            ctx.dedent();
            ctx.line("}");
        }

        if !self.illustrations.is_empty() {
            ctx.line("illustrations {");
            ctx.indent();
            for illustration in &self.illustrations {
                let label = illustration
                    .label
                    .as_ref()
                    .map(|l| format!("{l} "))
                    .unwrap_or_default();
                ctx.line(&format!(
                    "{label}\"{}\";",
                    escape(&illustration.description.value)
                ));
            }
            ctx.dedent();
            ctx.line("}");
        }

        ctx.dedent();
        ctx.line("}");
    }
}

fn format_variable_decl(decl: &VariableDecl) -> String {
    match &decl.value {
        Some(value) => format!(
            "{} {} := {};",
            decl.type_annotation.display_name(),
            decl.name,
            format_expression(value)
        ),
        None => format!("{} {};", decl.type_annotation.display_name(), decl.name),
    }
}

/// Binding strength for minimal-parentheses rendering.
fn precedence(expression: &Expression) -> u8 {
    match expression {
        Expression::Binary(binary) => match binary.operator.as_str() {
            "||" | "or" => 1,
            "&&" | "and" => 2,
            "==" | "!=" | "<" | ">" | "<=" | ">=" => 3,
            "+" | "-" => 4,
            "*" | "/" | "%" => 5,
            _ => 1,
        },
        Expression::Unary(_) => 6,
        _ => 7,
    }
}

fn format_operand(operand: &Expression, parent: u8, is_right: bool) -> String {
    let own = precedence(operand);
    let needs_parens = own < parent || (own == parent && is_right);
    if needs_parens {
        format!("({})", format_expression(operand))
    } else {
        format_expression(operand)
    }
}

pub fn format_expression(expression: &Expression) -> String {
    match expression {
        Expression::Int(lit) => lit.value.to_string(),
        Expression::Float(lit) => {
            let text = lit.value.to_string();
            if text.contains('.') {
                text
            } else {
                format!("{text}.0")
            }
        }
        Expression::Bool(lit) => if lit.value { "TRUE" } else { "FALSE" }.into(),
        Expression::Str(lit) => format!("\"{}\"", escape(&lit.value)),
        Expression::Money(lit) => format_money(lit.currency, &lit.amount),
        Expression::Percent(lit) => format!("{}%", lit.value),
        Expression::Date(lit) => lit.value.to_string(),
        Expression::Duration(lit) => format_duration(&lit.value),
        Expression::Identifier(identifier) => identifier.name.clone(),
        Expression::FieldAccess(access) => format!(
            "{}.{}",
            format_operand(&access.base, 7, false),
            access.field_name
        ),
        Expression::IndexAccess(access) => format!(
            "{}[{}]",
            format_operand(&access.base, 7, false),
            format_expression(&access.index)
        ),
        Expression::Call(call) => {
            let args: Vec<String> = call.args.iter().map(format_expression).collect();
            format!(
                "{}({})",
                format_operand(&call.callee, 7, false),
                args.join(", ")
            )
        }
        Expression::Binary(binary) => {
            let prec = precedence(expression);
            format!(
                "{} {} {}",
                format_operand(&binary.left, prec, false),
                binary.operator,
                format_operand(&binary.right, prec, true)
            )
        }
        Expression::Unary(unary) => {
            let operand = format_operand(&unary.operand, 6, false);
            if unary.operator == "not" {
                format!("not {operand}")
            } else {
                format!("{}{operand}", unary.operator)
            }
        }
        Expression::Match(match_expr) => format_match(match_expr),
        Expression::StructLiteral(literal) => {
            let name = literal.struct_name.clone().unwrap_or_default();
            let fields: Vec<String> = literal
                .field_values
                .iter()
                .map(|f| format!("{} := {}", f.name, format_expression(&f.value)))
                .collect();
            format!("{name} {{ {} }}", fields.join(", "))
        }
        Expression::Pass(_) => "pass".into(),
    }
}

fn format_match(match_expr: &MatchExpr) -> String {
    let scrutinee = match_expr
        .scrutinee
        .as_ref()
        .map(|s| format!("{} ", format_expression(s)))
        .unwrap_or_default();

    let arms: Vec<String> = match_expr
        .arms
        .iter()
        .map(|arm| {
            let guard = arm
                .guard
                .as_ref()
                .map(|g| format!(" if {}", format_expression(g)))
                .unwrap_or_default();
            format!(
                "case {}{guard} => {}",
                format_pattern(&arm.pattern),
                format_expression(&arm.body)
            )
        })
        .collect();

    format!("match {scrutinee}{{ {} }}", arms.join(", "))
}

fn format_pattern(pattern: &Pattern) -> String {
    match pattern {
        Pattern::Wildcard(_) => "_".into(),
        Pattern::Binding(binding) => binding.name.clone(),
        Pattern::Literal(literal) => format_expression(&literal.literal),
        Pattern::Struct(struct_pattern) => {
            let fields: Vec<String> = struct_pattern
                .fields
                .iter()
                .map(|f| match &f.pattern {
                    Some(sub) => format!("{}: {}", f.name, format_pattern(sub)),
                    None => f.name.clone(),
                })
                .collect();
            format!("{} {{ {} }}", struct_pattern.type_name, fields.join(", "))
        }
    }
}

fn format_duration(duration: &crate::ast::DurationValue) -> String {
    let units = [
        (duration.years, "year", "years"),
        (duration.months, "month", "months"),
        (duration.days, "day", "days"),
        (duration.hours, "hour", "hours"),
        (duration.minutes, "minute", "minutes"),
        (duration.seconds, "second", "seconds"),
    ];

    let parts: Vec<String> = units
        .iter()
        .filter(|(count, _, _)| *count != 0)
        .map(|(count, singular, plural)| {
            if count.abs() == 1 {
                format!("{count} {singular}")
            } else {
                format!("{count} {plural}")
            }
        })
        .collect();

    if parts.is_empty() {
        "0 days".into()
    } else {
        parts.join(" ")
    }
}

/// Re-apply the escape sequences the builder processed.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            '\r' => escaped.push_str("\\r"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_layout() {
        let source = "struct Color{red,green,blue}\nint   x:=1+2*3;";
        let formatted = format_source(source, "<test>");

        assert!(formatted.contains("struct Color { red, green, blue }"));
        assert!(formatted.contains("int x := 1 + 2 * 3;"));
    }

    #[test]
    fn test_parentheses_preserved_where_needed() {
        let formatted = format_source("int x := (1 + 2) * 3;", "<test>");
        assert!(formatted.contains("int x := (1 + 2) * 3;"));

        let formatted = format_source("int y := 1 + 2 + 3;", "<test>");
        assert!(formatted.contains("int y := 1 + 2 + 3;"));
    }

    #[test]
    fn test_format_is_idempotent() {
        let source = r#"
struct Intent { direct, oblique }
fn f(b: bool) -> int { match b { case TRUE => 1, case _ => 0 } }
statute "378" "Theft" {
    definitions { "property" := "movable property"; }
    elements {
        actus_reus taking := "moves property";
    }
    penalty { imprisonment := 1 year to 3 years; fine := S$10,000; }
    illustrations { a "A takes a ring."; }
}
assert 1 + 1 == 2, "sanity";
"#;
        let once = format_source(source, "<test>");
        let twice = format_source(&once, "<test>");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_string_escapes_round_trip() {
        let source = r#"string s := "line\nbreak \"quoted\"";"#;
        let once = format_source(source, "<test>");
        assert!(once.contains(r#""line\nbreak \"quoted\"""#));
        assert_eq!(format_source(&once, "<test>"), once);
    }

    #[test]
    fn test_unparseable_input_is_returned_unchanged() {
        let source = "int x := @@@;";
        assert_eq!(format_source(source, "<test>"), source);
    }
}
