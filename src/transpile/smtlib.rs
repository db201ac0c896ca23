//! SMT-LIB2 constraint system for the Z3 solver.
//!
//! Parallel to the Alloy model: a sort per struct (enum-structs become
//! datatypes), an uninterpreted `Intent` sort with three distinct
//! constants, and per-statute Bool variables for each element plus a
//! `conviction` variable constrained to their conjunction. Penalty bounds
//! are asserted on integer variables measured in days (imprisonment) and
//! cents (fines).

use bigdecimal::BigDecimal;

use crate::ast::nodes::*;

use super::{Emitter, TranspileTarget, Transpiler};

#[derive(Debug, Default)]
pub struct SmtLibTranspiler;

impl Transpiler for SmtLibTranspiler {
    fn target(&self) -> TranspileTarget {
        TranspileTarget::Z3
    }

    fn transpile(&self, module: &ModuleNode) -> String {
        let mut out = Emitter::new();

        out.emit("; SMT-LIB constraint system generated from Yuho");
        out.emit("(set-logic ALL)");
        out.blank();

        self.emit_intent_sort(&mut out);

        for struct_def in &module.type_defs {
            self.emit_struct(&mut out, struct_def);
            out.blank();
        }

        for statute in &module.statutes {
            self.emit_statute(&mut out, statute);
        }

        out.emit("(check-sat)");
        out.emit("(get-model)");

        out.finish()
    }
}

impl SmtLibTranspiler {
    /// The three classical grades of intent, kept abstract.
    fn emit_intent_sort(&self, out: &mut Emitter) {
        out.emit("; Mens rea intent grades");
        out.emit("(declare-sort Intent 0)");
        out.emit("(declare-const direct_intent Intent)");
        out.emit("(declare-const oblique_intent Intent)");
        out.emit("(declare-const no_intent Intent)");
        out.emit("(assert (distinct direct_intent oblique_intent no_intent))");
        out.blank();
    }

    fn emit_struct(&self, out: &mut Emitter, struct_def: &StructDef) {
        if struct_def.is_enum() {
            let variants: Vec<String> = struct_def
                .variants()
                .iter()
                .map(|v| smt_name(v))
                .collect();
            out.emit(format!("; Enum type {}", struct_def.name));
            out.emit(format!(
                "(declare-datatypes () (({} {})))",
                struct_def.name,
                variants.join(" ")
            ));
            return;
        }

        out.emit(format!("; Struct type {}", struct_def.name));
        out.emit(format!("(declare-sort {} 0)", struct_def.name));
        for field in &struct_def.fields {
            let sort = field
                .type_annotation
                .as_ref()
                .map(type_to_sort)
                .unwrap_or_else(|| struct_def.name.clone());
            out.emit(format!(
                "(declare-fun {}_{} ({}) {sort})",
                struct_def.name,
                smt_name(&field.name),
                struct_def.name
            ));
        }
    }

    fn emit_statute(&self, out: &mut Emitter, statute: &StatuteNode) {
        let prefix = smt_name(&statute.section_number);
        let title = statute
            .title
            .as_ref()
            .map(|t| t.value.clone())
            .unwrap_or_default();

        out.emit(format!("; Section {} {title}", statute.section_number));

        let element_vars: Vec<String> = statute
            .elements
            .iter()
            .map(|e| format!("s{prefix}_{}", smt_name(&e.name)))
            .collect();
        for var in &element_vars {
            out.emit(format!("(declare-const {var} Bool)"));
        }

        let conviction = format!("s{prefix}_conviction");
        out.emit(format!("(declare-const {conviction} Bool)"));

        if element_vars.is_empty() {
            out.emit(format!("(assert (= {conviction} false))"));
        } else {
            out.emit(format!(
                "(assert (= {conviction} (and {})))",
                element_vars.join(" ")
            ));
        }

        if let Some(penalty) = &statute.penalty {
            self.emit_penalty(out, &prefix, penalty);
        }
        out.blank();
    }

    fn emit_penalty(&self, out: &mut Emitter, prefix: &str, penalty: &PenaltyNode) {
        if penalty.imprisonment_min.is_some() || penalty.imprisonment_max.is_some() {
            let var = format!("s{prefix}_imprisonment_days");
            out.emit(format!("(declare-const {var} Int)"));
            out.emit(format!("(assert (>= {var} 0))"));
            if let Some(min) = &penalty.imprisonment_min {
                out.emit(format!("(assert (>= {var} {}))", min.value.total_days()));
            }
            if let Some(max) = &penalty.imprisonment_max {
                out.emit(format!("(assert (<= {var} {}))", max.value.total_days()));
            }
        }

        if penalty.fine_min.is_some() || penalty.fine_max.is_some() {
            let var = format!("s{prefix}_fine_cents");
            out.emit(format!("(declare-const {var} Int)"));
            out.emit(format!("(assert (>= {var} 0))"));
            if let Some(min) = &penalty.fine_min {
                out.emit(format!("(assert (>= {var} {}))", to_cents(&min.amount)));
            }
            if let Some(max) = &penalty.fine_max {
                out.emit(format!("(assert (<= {var} {}))", to_cents(&max.amount)));
            }
        }
    }
}

fn type_to_sort(type_node: &TypeNode) -> String {
    match type_node {
        TypeNode::Builtin(builtin) => match builtin.name.as_str() {
            "int" | "date" | "duration" | "money" | "percent" => "Int".into(),
            "float" => "Real".into(),
            "bool" => "Bool".into(),
            "string" => "String".into(),
            _ => "Int".into(),
        },
        TypeNode::Named(named) => named.name.clone(),
        TypeNode::Optional(optional) => type_to_sort(&optional.inner),
        TypeNode::Array(_) => "Int".into(),
        TypeNode::Generic(generic) => generic.base.clone(),
    }
}

/// Money amounts are integers in cents.
fn to_cents(amount: &BigDecimal) -> i64 {
    let cents = amount * BigDecimal::from(100);
    cents
        .with_scale(0)
        .to_string()
        .parse()
        .unwrap_or(i64::MAX)
}

fn smt_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
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
        SmtLibTranspiler::default().transpile(&module)
    }

    #[test]
    fn test_intent_sort() {
        let text = render("");
        assert!(text.contains("(declare-sort Intent 0)"));
        assert!(text.contains("(assert (distinct direct_intent oblique_intent no_intent))"));
    }

    #[test]
    fn test_conviction_is_element_conjunction() {
        let text = render(
            r#"statute "300" "Murder" { elements { actus_reus act := "a"; mens_rea intent := "b"; } }"#,
        );
        assert!(text.contains("(declare-const s300_act Bool)"));
        assert!(text.contains("(declare-const s300_intent Bool)"));
        assert!(text.contains("(assert (= s300_conviction (and s300_act s300_intent)))"));
    }

    #[test]
    fn test_penalty_bounds_in_days_and_cents() {
        let text = render(
            r#"statute "1" "Test" { penalty { imprisonment := 1 year to 2 years; fine := $10.50 to $100; } }"#,
        );
        assert!(text.contains("(assert (>= s1_imprisonment_days 365))"));
        assert!(text.contains("(assert (<= s1_imprisonment_days 730))"));
        assert!(text.contains("(assert (>= s1_fine_cents 1050))"));
        assert!(text.contains("(assert (<= s1_fine_cents 10000))"));
    }

    #[test]
    fn test_enum_datatype() {
        let text = render("struct Color { red, green, blue }");
        assert!(text.contains("(declare-datatypes () ((Color red green blue)))"));
    }
}
