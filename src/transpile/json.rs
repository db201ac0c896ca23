//! JSON and JSON-LD dumps of the AST.
//!
//! The emission is a one-to-one fold of the module: deterministic for a
//! given AST, with source locations included on demand. JSON-LD wraps the
//! same data with a `@context` for semantic-web consumers.

use serde_json::{json, Map, Value};

use crate::ast::format_money;
use crate::ast::nodes::*;

use super::{TranspileTarget, Transpiler};

#[derive(Debug, Default)]
pub struct JsonTranspiler {
    pub include_locations: bool,
}

impl Transpiler for JsonTranspiler {
    fn target(&self) -> TranspileTarget {
        TranspileTarget::Json
    }

    fn transpile(&self, module: &ModuleNode) -> String {
        serde_json::to_string_pretty(&self.module_value(module))
            .unwrap_or_else(|_| "{}".to_string())
    }
}

#[derive(Debug, Default)]
pub struct JsonLdTranspiler {
    pub include_locations: bool,
}

impl Transpiler for JsonLdTranspiler {
    fn target(&self) -> TranspileTarget {
        TranspileTarget::JsonLd
    }

    fn transpile(&self, module: &ModuleNode) -> String {
        let inner = JsonTranspiler {
            include_locations: self.include_locations,
        };
        let mut value = inner.module_value(module);
        if let Value::Object(object) = &mut value {
            object.insert(
                "@context".into(),
                json!({
                    "@vocab": "https://yuho.dev/vocab#",
                    "statutes": { "@container": "@list" },
                    "sectionNumber": "https://yuho.dev/vocab#sectionNumber",
                }),
            );
            object.insert("@type".into(), json!("Module"));
        }
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
    }
}

impl JsonTranspiler {
    pub fn module_value(&self, module: &ModuleNode) -> Value {
        let mut object = Map::new();
        object.insert(
            "imports".into(),
            module.imports.iter().map(|i| self.import_value(i)).collect(),
        );
        object.insert(
            "type_defs".into(),
            module
                .type_defs
                .iter()
                .map(|s| self.struct_value(s))
                .collect(),
        );
        object.insert(
            "function_defs".into(),
            module
                .function_defs
                .iter()
                .map(|f| self.function_value(f))
                .collect(),
        );
        object.insert(
            "statutes".into(),
            module
                .statutes
                .iter()
                .map(|s| self.statute_value(s))
                .collect(),
        );
        object.insert(
            "variables".into(),
            module
                .variables
                .iter()
                .map(|v| self.variable_value(v))
                .collect(),
        );
        object.insert(
            "references".into(),
            module
                .references
                .iter()
                .map(|r| self.with_location(json!({ "path": r.path }), &r.location))
                .collect(),
        );
        object.insert(
            "assertions".into(),
            module
                .assertions
                .iter()
                .map(|a| {
                    self.with_location(
                        json!({
                            "condition": self.expr_value(&a.condition),
                            "message": a.message.as_ref().map(|m| m.value.clone()),
                        }),
                        &a.location,
                    )
                })
                .collect(),
        );

        let value = Value::Object(object);
        self.with_location(value, &module.location)
    }

    fn with_location(&self, mut value: Value, location: &SourceLocation) -> Value {
        if !self.include_locations {
            return value;
        }
        if let Value::Object(object) = &mut value {
            object.insert(
                "source_location".into(),
                json!({
                    "file": location.file,
                    "line": location.line,
                    "col": location.col,
                    "end_line": location.end_line,
                    "end_col": location.end_col,
                    "start_byte": location.start_byte,
                    "end_byte": location.end_byte,
                }),
            );
        }
        value
    }

    fn import_value(&self, import: &ImportNode) -> Value {
        self.with_location(
            json!({
                "path": import.path,
                "imported_names": import.imported_names,
                "wildcard": import.wildcard,
            }),
            &import.location,
        )
    }

    fn struct_value(&self, struct_def: &StructDef) -> Value {
        let fields: Vec<Value> = struct_def
            .fields
            .iter()
            .map(|field| {
                self.with_location(
                    json!({
                        "name": field.name,
                        "type": field.type_annotation.as_ref().map(|t| t.display_name()),
                    }),
                    &field.location,
                )
            })
            .collect();

        self.with_location(
            json!({
                "name": struct_def.name,
                "type_params": struct_def.type_params,
                "fields": fields,
                "is_enum": struct_def.is_enum(),
            }),
            &struct_def.location,
        )
    }

    fn function_value(&self, function_def: &FunctionDef) -> Value {
        let params: Vec<Value> = function_def
            .params
            .iter()
            .map(|p| {
                json!({
                    "name": p.name,
                    "type": p.type_annotation.display_name(),
                })
            })
            .collect();

        self.with_location(
            json!({
                "name": function_def.name,
                "params": params,
                "return_type": function_def.return_type.as_ref().map(|t| t.display_name()),
                "body": self.block_value(&function_def.body),
            }),
            &function_def.location,
        )
    }

    fn statute_value(&self, statute: &StatuteNode) -> Value {
        let definitions: Vec<Value> = statute
            .definitions
            .iter()
            .map(|d| {
                self.with_location(
                    json!({ "term": d.term, "definition": d.definition.value }),
                    &d.location,
                )
            })
            .collect();
        let elements: Vec<Value> = statute
            .elements
            .iter()
            .map(|e| {
                self.with_location(
                    json!({
                        "element_type": e.element_type.keyword(),
                        "name": e.name,
                        "description": self.expr_value(&e.description),
                    }),
                    &e.location,
                )
            })
            .collect();
        let illustrations: Vec<Value> = statute
            .illustrations
            .iter()
            .map(|i| {
                self.with_location(
                    json!({ "label": i.label, "description": i.description.value }),
                    &i.location,
                )
            })
            .collect();

        self.with_location(
            json!({
                "section_number": statute.section_number,
                "title": statute.title.as_ref().map(|t| t.value.clone()),
                "definitions": definitions,
                "elements": elements,
                "penalty": statute.penalty.as_ref().map(|p| self.penalty_value(p)),
                "illustrations": illustrations,
            }),
            &statute.location,
        )
    }

    fn penalty_value(&self, penalty: &PenaltyNode) -> Value {
        let duration = |d: &DurationLit| {
            json!({
                "years": d.value.years,
                "months": d.value.months,
                "days": d.value.days,
                "hours": d.value.hours,
                "minutes": d.value.minutes,
                "seconds": d.value.seconds,
            })
        };
        let money = |m: &MoneyLit| {
            json!({
                "currency": m.currency.code(),
                "amount": m.amount.to_string(),
            })
        };

        self.with_location(
            json!({
                "imprisonment_min": penalty.imprisonment_min.as_ref().map(duration),
                "imprisonment_max": penalty.imprisonment_max.as_ref().map(duration),
                "fine_min": penalty.fine_min.as_ref().map(money),
                "fine_max": penalty.fine_max.as_ref().map(money),
                "supplementary": penalty.supplementary.as_ref().map(|s| s.value.clone()),
            }),
            &penalty.location,
        )
    }

    fn variable_value(&self, decl: &VariableDecl) -> Value {
        self.with_location(
            json!({
                "type": decl.type_annotation.display_name(),
                "name": decl.name,
                "value": decl.value.as_ref().map(|v| self.expr_value(v)),
            }),
            &decl.location,
        )
    }

    fn block_value(&self, block: &Block) -> Value {
        let statements: Vec<Value> = block
            .statements
            .iter()
            .map(|s| self.statement_value(s))
            .collect();
        json!({ "statements": statements })
    }

    fn statement_value(&self, statement: &Statement) -> Value {
        let value = match statement {
            Statement::VariableDecl(decl) => {
                let mut v = self.variable_value(decl);
                if let Value::Object(o) = &mut v {
                    o.insert("node_type".into(), json!("variable_declaration"));
                }
                return v;
            }
            Statement::Assignment(assignment) => json!({
                "node_type": "assignment",
                "target": self.expr_value(&assignment.target),
                "value": self.expr_value(&assignment.value),
            }),
            Statement::Return(ret) => json!({
                "node_type": "return",
                "value": ret.value.as_ref().map(|v| self.expr_value(v)),
            }),
            Statement::Pass(_) => json!({ "node_type": "pass" }),
            Statement::Expression(stmt) => json!({
                "node_type": "expression_statement",
                "expression": self.expr_value(&stmt.expression),
            }),
        };
        self.with_location(value, statement.location())
    }

    fn expr_value(&self, expression: &Expression) -> Value {
        let value = match expression {
            Expression::Int(lit) => json!({ "node_type": "int", "value": lit.value }),
            Expression::Float(lit) => json!({ "node_type": "float", "value": lit.value }),
            Expression::Bool(lit) => json!({ "node_type": "bool", "value": lit.value }),
            Expression::Str(lit) => json!({ "node_type": "string", "value": lit.value }),
            Expression::Money(lit) => json!({
                "node_type": "money",
                "currency": lit.currency.code(),
                "amount": lit.amount.to_string(),
                "display": format_money(lit.currency, &lit.amount),
            }),
            Expression::Percent(lit) => json!({
                "node_type": "percent",
                "value": lit.value.to_string(),
            }),
            Expression::Date(lit) => json!({
                "node_type": "date",
                "value": lit.value.to_string(),
            }),
            Expression::Duration(lit) => json!({
                "node_type": "duration",
                "years": lit.value.years,
                "months": lit.value.months,
                "days": lit.value.days,
                "hours": lit.value.hours,
                "minutes": lit.value.minutes,
                "seconds": lit.value.seconds,
            }),
            Expression::Identifier(identifier) => json!({
                "node_type": "identifier",
                "name": identifier.name,
            }),
            Expression::FieldAccess(access) => json!({
                "node_type": "field_access",
                "base": self.expr_value(&access.base),
                "field": access.field_name,
            }),
            Expression::IndexAccess(access) => json!({
                "node_type": "index_access",
                "base": self.expr_value(&access.base),
                "index": self.expr_value(&access.index),
            }),
            Expression::Call(call) => json!({
                "node_type": "call",
                "callee": self.expr_value(&call.callee),
                "args": call.args.iter().map(|a| self.expr_value(a)).collect::<Vec<_>>(),
            }),
            Expression::Binary(binary) => json!({
                "node_type": "binary",
                "operator": binary.operator,
                "left": self.expr_value(&binary.left),
                "right": self.expr_value(&binary.right),
            }),
            Expression::Unary(unary) => json!({
                "node_type": "unary",
                "operator": unary.operator,
                "operand": self.expr_value(&unary.operand),
            }),
            Expression::Match(match_expr) => json!({
                "node_type": "match",
                "scrutinee": match_expr.scrutinee.as_ref().map(|s| self.expr_value(s)),
                "ensure_exhaustiveness": match_expr.ensure_exhaustiveness,
                "arms": match_expr
                    .arms
                    .iter()
                    .map(|arm| json!({
                        "pattern": self.pattern_value(&arm.pattern),
                        "guard": arm.guard.as_ref().map(|g| self.expr_value(g)),
                        "body": self.expr_value(&arm.body),
                    }))
                    .collect::<Vec<_>>(),
            }),
            Expression::StructLiteral(literal) => json!({
                "node_type": "struct_literal",
                "struct_name": literal.struct_name,
                "fields": literal
                    .field_values
                    .iter()
                    .map(|f| json!({ "name": f.name, "value": self.expr_value(&f.value) }))
                    .collect::<Vec<_>>(),
            }),
            Expression::Pass(_) => json!({ "node_type": "pass" }),
        };
        self.with_location(value, expression.location())
    }

    fn pattern_value(&self, pattern: &Pattern) -> Value {
        match pattern {
            Pattern::Wildcard(_) => json!({ "node_type": "wildcard_pattern" }),
            Pattern::Binding(binding) => json!({
                "node_type": "binding_pattern",
                "name": binding.name,
            }),
            Pattern::Literal(literal) => json!({
                "node_type": "literal_pattern",
                "literal": self.expr_value(&literal.literal),
            }),
            Pattern::Struct(struct_pattern) => json!({
                "node_type": "struct_pattern",
                "type_name": struct_pattern.type_name,
                "fields": struct_pattern
                    .fields
                    .iter()
                    .map(|f| json!({
                        "name": f.name,
                        "pattern": f.pattern.as_ref().map(|p| self.pattern_value(p)),
                    }))
                    .collect::<Vec<_>>(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build;
    use crate::parser::parse;

    const SOURCE: &str = r#"
struct Color { red, green, blue }
fn f(b: bool) -> int { return 1; }
statute "300" "Murder" {
    elements {
        actus_reus act := "causes death";
        mens_rea intent := "intends death";
    }
    penalty { imprisonment := 10 years; }
}
statute "378" "Theft" {
    elements { actus_reus taking := "takes property"; }
}
"#;

    fn module() -> ModuleNode {
        let result = parse(SOURCE, "<test>");
        assert!(result.is_valid(), "parse errors: {:?}", result.errors);
        build(&result.tree, "<test>")
    }

    #[test]
    fn test_round_trip_structure() {
        let module = module();
        let text = JsonTranspiler::default().transpile(&module);
        let value: Value = serde_json::from_str(&text).unwrap();

        let statutes = value["statutes"].as_array().unwrap();
        assert_eq!(statutes.len(), module.statutes.len());

        let sections: Vec<&str> = statutes
            .iter()
            .map(|s| s["section_number"].as_str().unwrap())
            .collect();
        assert_eq!(sections, vec!["300", "378"]);

        let type_names: Vec<&str> = value["type_defs"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(type_names, vec!["Color"]);

        let function_names: Vec<&str> = value["function_defs"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["name"].as_str().unwrap())
            .collect();
        assert_eq!(function_names, vec!["f"]);

        let element_names: Vec<&str> = statutes[0]["elements"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["name"].as_str().unwrap())
            .collect();
        assert_eq!(element_names, vec!["act", "intent"]);
    }

    #[test]
    fn test_deterministic_output() {
        let module = module();
        let first = JsonTranspiler::default().transpile(&module);
        let second = JsonTranspiler::default().transpile(&module);
        assert_eq!(first, second);
    }

    #[test]
    fn test_locations_are_optional() {
        let module = module();
        let without = JsonTranspiler::default().transpile(&module);
        assert!(!without.contains("source_location"));

        let with = JsonTranspiler {
            include_locations: true,
        }
        .transpile(&module);
        assert!(with.contains("source_location"));
    }

    #[test]
    fn test_jsonld_context() {
        let module = module();
        let text = JsonLdTranspiler::default().transpile(&module);
        let value: Value = serde_json::from_str(&text).unwrap();
        assert!(value["@context"].is_object());
        assert_eq!(value["@type"], "Module");
    }
}
