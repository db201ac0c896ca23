//! Mermaid flowchart generation.
//!
//! Each statute becomes a chain from a start stadium node through its
//! elements to a terminal penalty node; match expressions become decision
//! diamonds with edge-labelled outcomes joining at a merge circle, with
//! optional subgraphs around nested matches. Labels are truncated at 50
//! characters and escaped for Mermaid's label syntax.

use crate::ast::format_money;
use crate::ast::nodes::*;

use super::{Emitter, TranspileTarget, Transpiler};

const MAX_LABEL: usize = 50;

#[derive(Debug)]
pub struct MermaidTranspiler {
    pub direction: &'static str,
    pub use_subgraphs: bool,
    node_counter: std::cell::Cell<usize>,
    subgraph_counter: std::cell::Cell<usize>,
}

impl Default for MermaidTranspiler {
    fn default() -> Self {
        Self {
            direction: "TD",
            use_subgraphs: true,
            node_counter: std::cell::Cell::new(0),
            subgraph_counter: std::cell::Cell::new(0),
        }
    }
}

impl MermaidTranspiler {
    pub fn left_to_right() -> Self {
        Self {
            direction: "LR",
            ..Self::default()
        }
    }
}

impl Transpiler for MermaidTranspiler {
    fn target(&self) -> TranspileTarget {
        TranspileTarget::Mermaid
    }

    fn transpile(&self, module: &ModuleNode) -> String {
        self.node_counter.set(0);
        self.subgraph_counter.set(0);

        let mut out = Emitter::new();
        out.emit(format!("flowchart {}", self.direction));

        for statute in &module.statutes {
            self.render_statute(&mut out, statute);
        }
        for function_def in &module.function_defs {
            self.render_function(&mut out, function_def);
        }

        out.finish()
    }
}

impl MermaidTranspiler {
    fn next_node(&self, prefix: &str) -> String {
        let n = self.node_counter.get() + 1;
        self.node_counter.set(n);
        format!("{prefix}{n}")
    }

    fn next_subgraph(&self) -> String {
        let n = self.subgraph_counter.get() + 1;
        self.subgraph_counter.set(n);
        format!("sub_{n}")
    }

    fn render_statute(&self, out: &mut Emitter, statute: &StatuteNode) {
        let title = statute
            .title
            .as_ref()
            .map(|t| t.value.clone())
            .unwrap_or_else(|| statute.section_number.clone());

        out.emit(format!("    %% Statute: {}", escape(&title)));
        let start = self.next_node("N");
        out.emit(format!("    {start}([Section {}])", statute.section_number));

        let mut prev = start;
        for element in &statute.elements {
            match &element.description {
                Expression::Match(match_expr) => {
                    let entry = self.next_node("N");
                    out.emit(format!("    {entry}[/{}/]", escape(&element.name)));
                    out.emit(format!("    {prev} --> {entry}"));
                    prev = self.render_match(out, match_expr, &entry, 1, &element.name);
                }
                description => {
                    let node = self.next_node("N");
                    let label = format!("{}: {}", element.name, describe(description));
                    out.emit(format!("    {node}[{}]", escape(&label)));
                    out.emit(format!("    {prev} --> {node}"));
                    prev = node;
                }
            }
        }

        if let Some(penalty) = &statute.penalty {
            let node = self.next_node("P");
            out.emit(format!(
                "    {node}[[\"{}\"]]",
                escape(&penalty_label(penalty))
            ));
            out.emit(format!("    {prev} --> {node}"));
        }
    }

    fn render_function(&self, out: &mut Emitter, function_def: &FunctionDef) {
        let mut matches = vec![];
        collect_matches_in_block(&function_def.body, &mut matches);
        if matches.is_empty() {
            return;
        }

        out.emit(format!("    %% Function: {}", function_def.name));
        let params: Vec<&str> = function_def.params.iter().map(|p| p.name.as_str()).collect();
        let start = self.next_node("F");
        out.emit(format!(
            "    {start}([{}({})])",
            escape(&function_def.name),
            params.join(", ")
        ));

        let mut prev = start;
        for match_expr in matches {
            prev = self.render_match(out, match_expr, &prev, 1, &function_def.name);
        }
    }

    /// Emit a decision diamond with one edge per arm and a merge circle;
    /// returns the merge node id.
    fn render_match(
        &self,
        out: &mut Emitter,
        match_expr: &MatchExpr,
        from: &str,
        depth: usize,
        context: &str,
    ) -> String {
        let indent = "    ".repeat(depth);
        let nested = depth > 1;

        let subgraph = if nested && self.use_subgraphs {
            let id = self.next_subgraph();
            out.emit(format!(
                "{indent}subgraph {id}[\"{}\"]",
                escape(&format!("within {context}"))
            ));
            Some(id)
        } else {
            None
        };

        let scrutinee_label = match_expr
            .scrutinee
            .as_ref()
            .map(|s| describe(s))
            .unwrap_or_else(|| "which case applies?".into());
        let decision = self.next_node("D");
        out.emit(format!(
            "{indent}{decision}{{{{{}}}}}",
            escape(&scrutinee_label)
        ));
        out.emit(format!("{indent}{from} --> {decision}"));

        let merge = self.next_node("M");
        for arm in &match_expr.arms {
            let outcome = self.render_arm(out, arm, &decision, depth);
            out.emit(format!("{indent}{outcome} --> {merge}"));
        }
        out.emit(format!("{indent}{merge}((*))"));

        if let Some(_id) = subgraph {
            out.emit(format!("{indent}end"));
        }

        merge
    }

    /// Returns the arm's outcome node id.
    fn render_arm(&self, out: &mut Emitter, arm: &MatchArm, from: &str, depth: usize) -> String {
        let indent = "    ".repeat(depth);
        let pattern_label = pattern_label(&arm.pattern);

        let (edge_source, edge_taken) = match &arm.guard {
            Some(guard) => {
                // Guards get their own diamond with a Yes edge.
                let guard_node = self.next_node("G");
                out.emit(format!(
                    "{indent}{guard_node}{{{{{}}}}}",
                    escape(&describe(guard))
                ));
                out.emit(format!(
                    "{indent}{from} -->|\"{}\"| {guard_node}",
                    escape(&pattern_label)
                ));
                (guard_node, "\"Yes\"".to_string())
            }
            None => (from.to_string(), format!("\"{}\"", escape(&pattern_label))),
        };

        match &arm.body {
            Expression::Match(nested) => {
                let connector = self.next_node("C");
                out.emit(format!("{indent}{connector}((...))"));
                out.emit(format!("{indent}{edge_source} -->|{edge_taken}| {connector}"));
                self.render_match(out, nested, &connector, depth + 1, &pattern_label)
            }
            body => {
                let outcome = self.next_node("O");
                out.emit(format!("{indent}{outcome}[\"{}\"]", escape(&describe(body))));
                out.emit(format!("{indent}{edge_source} -->|{edge_taken}| {outcome}"));
                outcome
            }
        }
    }
}

/// Escape and truncate a label for Mermaid's bracket syntax.
fn escape(text: &str) -> String {
    let mut escaped: String = text
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('[', "(")
        .replace(']', ")")
        .replace('{', "(")
        .replace('}', ")");
    if escaped.chars().count() > MAX_LABEL {
        escaped = escaped.chars().take(MAX_LABEL - 1).collect();
        escaped.push('…');
    }
    escaped
}

fn describe(expression: &Expression) -> String {
    match expression {
        Expression::Int(lit) => lit.value.to_string(),
        Expression::Float(lit) => lit.value.to_string(),
        Expression::Bool(lit) => if lit.value { "TRUE" } else { "FALSE" }.into(),
        Expression::Str(lit) => lit.value.clone(),
        Expression::Money(lit) => format_money(lit.currency, &lit.amount),
        Expression::Percent(lit) => format!("{}%", lit.value),
        Expression::Date(lit) => lit.value.to_string(),
        Expression::Duration(lit) => lit.value.to_string(),
        Expression::Identifier(identifier) => identifier.name.clone(),
        Expression::FieldAccess(access) => {
            format!("{}.{}", describe(&access.base), access.field_name)
        }
        Expression::IndexAccess(access) => {
            format!("{}[{}]", describe(&access.base), describe(&access.index))
        }
        Expression::Call(call) => {
            let args: Vec<String> = call.args.iter().map(describe).collect();
            format!("{}({})", describe(&call.callee), args.join(", "))
        }
        Expression::Binary(binary) => format!(
            "{} {} {}",
            describe(&binary.left),
            binary.operator,
            describe(&binary.right)
        ),
        Expression::Unary(unary) => format!("{}{}", unary.operator, describe(&unary.operand)),
        Expression::Match(_) => "nested decision".into(),
        Expression::StructLiteral(literal) => match &literal.struct_name {
            Some(name) => format!("new {name}"),
            None => "new value".into(),
        },
        Expression::Pass(_) => "no action".into(),
    }
}

fn pattern_label(pattern: &Pattern) -> String {
    match pattern {
        Pattern::Wildcard(_) => "otherwise".into(),
        Pattern::Binding(binding) => binding.name.clone(),
        Pattern::Literal(literal) => describe(&literal.literal),
        Pattern::Struct(struct_pattern) => {
            let fields: Vec<String> = struct_pattern
                .fields
                .iter()
                .map(|f| f.name.clone())
                .collect();
            format!("{}({})", struct_pattern.type_name, fields.join(", "))
        }
    }
}

fn penalty_label(penalty: &PenaltyNode) -> String {
    let mut parts = vec![];
    if let Some(max) = &penalty.imprisonment_max {
        parts.push(format!("Imprisonment up to {}", max.value));
    }
    if let Some(max) = &penalty.fine_max {
        parts.push(format!(
            "Fine up to {}",
            format_money(max.currency, &max.amount)
        ));
    }
    if parts.is_empty() {
        "Penalty".into()
    } else {
        parts.join(" / ")
    }
}

fn collect_matches_in_block<'a>(block: &'a Block, out: &mut Vec<&'a MatchExpr>) {
    for statement in &block.statements {
        let expression = match statement {
            Statement::VariableDecl(decl) => decl.value.as_ref(),
            Statement::Return(ret) => ret.value.as_ref(),
            Statement::Expression(stmt) => Some(&stmt.expression),
            Statement::Assignment(assignment) => Some(&assignment.value),
            Statement::Pass(_) => None,
        };
        if let Some(Expression::Match(match_expr)) = expression {
            out.push(match_expr);
        }
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
        MermaidTranspiler::default().transpile(&module)
    }

    #[test]
    fn test_statute_flow() {
        let chart = render(
            r#"
statute "378" "Theft" {
    elements { actus_reus taking := "moves property"; }
    penalty { imprisonment := 3 years; }
}
"#,
        );

        assert!(chart.starts_with("flowchart TD"));
        assert!(chart.contains("([Section 378])"));
        assert!(chart.contains("taking: moves property"));
        assert!(chart.contains("Imprisonment up to 3 years"));
    }

    #[test]
    fn test_match_becomes_decision_diamond() {
        let chart = render(
            "fn f(n: int) -> int { match n { case 0 => 1, case x if x > 0 => 2, case _ => 3 } }",
        );

        assert!(chart.contains("{{n}}"));
        assert!(chart.contains("-->|\"0\"|"));
        assert!(chart.contains("-->|\"otherwise\"|"));
        // Guarded arm goes through its own diamond with a Yes edge.
        assert!(chart.contains("{{x &gt; 0}}"));
        assert!(chart.contains("-->|\"Yes\"|"));
        assert!(chart.contains("((*))"));
    }

    #[test]
    fn test_long_labels_truncated() {
        let long = "x".repeat(80);
        let chart = render(&format!(
            r#"statute "1" "T" {{ elements {{ actus_reus a := "{long}"; }} }}"#
        ));
        assert!(!chart.contains(&long));
        assert!(chart.contains('…'));
    }

    #[test]
    fn test_quotes_escaped() {
        assert_eq!(escape("say \"hi\" <now>"), "say &quot;hi&quot; &lt;now&gt;");
    }

    #[test]
    fn test_nested_match_gets_subgraph() {
        let chart = render(
            "fn f(a: bool, b: bool) -> int { match a { case true => match b { case true => 1, case _ => 0 }, case _ => 2 } }",
        );
        assert!(chart.contains("subgraph sub_1"));
        assert!(chart.contains("((...))"));
        assert!(chart.contains("end"));
    }
}
