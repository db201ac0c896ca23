//! Type checking over the inference side table.
//!
//! Validates declarations, assignments, operator operand kinds, call
//! arities and argument types, return conformance, match guards and arm
//! coherence, and struct literal fields. Opaque types (`unknown`, `pass`)
//! are compatible with everything so one failure does not cascade.

use std::fmt::Display;

use crate::ast::nodes::*;

use super::diagnostics::Severity;
use super::infer::{TypeAnnotation, TypeInference, TypeInferenceResult};

#[derive(Debug, Clone, PartialEq)]
pub struct TypeErrorInfo {
    pub message: String,
    pub severity: Severity,
    pub location: SourceLocation,
}

impl Display for TypeErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}:{}:{})",
            self.message, self.location.file, self.location.line, self.location.col
        )
    }
}

impl std::error::Error for TypeErrorInfo {}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeCheckResult {
    pub errors: Vec<TypeErrorInfo>,
}

impl TypeCheckResult {
    pub fn is_valid(&self) -> bool {
        !self
            .errors
            .iter()
            .any(|e| e.severity == Severity::Error)
    }
}

/// Compatibility: exact name match, opaque wildcard, `T?` accepts `T`, and
/// int widens to float.
pub fn types_compatible(expected: &TypeAnnotation, actual: &TypeAnnotation) -> bool {
    if expected.is_opaque() || actual.is_opaque() {
        return true;
    }
    if expected == actual {
        return true;
    }
    if expected.is_optional
        && !actual.is_optional
        && expected.type_name == actual.type_name
        && expected.is_array == actual.is_array
    {
        return true;
    }
    expected.type_name == "float" && actual.type_name == "int" && !actual.is_array
}

pub struct TypeChecker<'a> {
    type_info: &'a TypeInferenceResult,
    errors: Vec<TypeErrorInfo>,
    /// Declared return type of the function being checked.
    current_return: Option<TypeAnnotation>,
}

impl<'a> TypeChecker<'a> {
    pub fn new(type_info: &'a TypeInferenceResult) -> Self {
        Self {
            type_info,
            errors: vec![],
            current_return: None,
        }
    }

    pub fn check_module(mut self, module: &ModuleNode) -> TypeCheckResult {
        for function_def in &module.function_defs {
            self.check_function(function_def);
        }
        for statute in &module.statutes {
            for element in &statute.elements {
                self.check_expression(&element.description);
            }
            self.check_penalty_ranges(statute);
        }
        for variable in &module.variables {
            self.check_variable_decl(variable);
        }
        for assert in &module.assertions {
            self.check_expression(&assert.condition);
        }

        TypeCheckResult {
            errors: self.errors,
        }
    }

    fn error(&mut self, message: String, location: &SourceLocation) {
        self.errors.push(TypeErrorInfo {
            message,
            severity: Severity::Error,
            location: location.clone(),
        });
    }

    fn warning(&mut self, message: String, location: &SourceLocation) {
        self.errors.push(TypeErrorInfo {
            message,
            severity: Severity::Warning,
            location: location.clone(),
        });
    }

    fn type_of(&self, expression: &Expression) -> TypeAnnotation {
        self.type_info.get_type(expression.id())
    }

    fn check_function(&mut self, function_def: &FunctionDef) {
        let declared = function_def
            .return_type
            .as_ref()
            .map(TypeInference::annotation_of)
            .unwrap_or_else(|| TypeAnnotation::simple("void"));

        let previous = self.current_return.replace(declared);
        self.check_block(&function_def.body);
        self.current_return = previous;
    }

    fn check_block(&mut self, block: &Block) {
        for statement in &block.statements {
            self.check_statement(statement);
        }
    }

    fn check_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::VariableDecl(decl) => self.check_variable_decl(decl),
            Statement::Assignment(assignment) => {
                self.check_expression(&assignment.target);
                self.check_expression(&assignment.value);

                let target = self.type_of(&assignment.target);
                let value = self.type_of(&assignment.value);
                if !types_compatible(&target, &value) {
                    self.error(
                        format!("Cannot assign '{value}' to target of type '{target}'"),
                        &assignment.location,
                    );
                }
            }
            Statement::Return(ret) => self.check_return(ret),
            Statement::Pass(_) => {}
            Statement::Expression(stmt) => self.check_expression(&stmt.expression),
        }
    }

    fn check_variable_decl(&mut self, decl: &VariableDecl) {
        let declared = TypeInference::annotation_of(&decl.type_annotation);
        if let Some(value) = &decl.value {
            self.check_expression(value);
            let actual = self.type_of(value);
            if !types_compatible(&declared, &actual) {
                self.error(
                    format!(
                        "Cannot initialize variable '{}' of type '{declared}' with value of type '{actual}'",
                        decl.name
                    ),
                    &decl.location,
                );
            }
        }
    }

    fn check_return(&mut self, ret: &ReturnStmt) {
        let Some(expected) = self.current_return.clone() else {
            return;
        };

        match &ret.value {
            Some(value) => {
                self.check_expression(value);
                let actual = self.type_of(value);
                if !types_compatible(&expected, &actual) {
                    self.error(
                        format!("Return type mismatch: expected '{expected}', got '{actual}'"),
                        &ret.location,
                    );
                }
            }
            None => {
                if expected.type_name != "void" {
                    self.error(
                        format!("Missing return value: function returns '{expected}'"),
                        &ret.location,
                    );
                }
            }
        }
    }

    fn check_expression(&mut self, expression: &Expression) {
        match expression {
            Expression::Binary(binary) => self.check_binary(binary),
            Expression::Unary(unary) => self.check_expression(&unary.operand),
            Expression::FieldAccess(access) => self.check_expression(&access.base),
            Expression::IndexAccess(access) => {
                self.check_expression(&access.base);
                self.check_expression(&access.index);
            }
            Expression::Call(call) => self.check_call(call),
            Expression::Match(match_expr) => self.check_match(match_expr),
            Expression::StructLiteral(literal) => self.check_struct_literal(literal),
            _ => {}
        }
    }

    fn check_binary(&mut self, binary: &BinaryExpr) {
        self.check_expression(&binary.left);
        self.check_expression(&binary.right);

        let left = self.type_of(&binary.left);
        let right = self.type_of(&binary.right);
        if left.is_opaque() || right.is_opaque() {
            return;
        }

        match binary.operator.as_str() {
            "&&" | "||" | "and" | "or" => {
                for (side, type_ann) in [("left", &left), ("right", &right)] {
                    if type_ann.type_name != "bool" {
                        self.error(
                            format!(
                                "Logical operator '{}' requires bool operands, {side} operand is '{type_ann}'",
                                binary.operator
                            ),
                            &binary.location,
                        );
                    }
                }
            }
            "==" | "!=" | "<" | ">" | "<=" | ">=" => {
                if !types_compatible(&left, &right) && !types_compatible(&right, &left) {
                    self.error(
                        format!(
                            "Cannot compare '{left}' with '{right}' using '{}'",
                            binary.operator
                        ),
                        &binary.location,
                    );
                }
            }
            "+" => {
                let string_concat = left.type_name == "string" && right.type_name == "string";
                if !string_concat && !(left.is_numeric() && right.is_numeric()) {
                    self.error(
                        format!("Operator '+' cannot combine '{left}' and '{right}'"),
                        &binary.location,
                    );
                }
            }
            "-" | "*" | "/" | "%" => {
                if !(left.is_numeric() && right.is_numeric()) {
                    self.error(
                        format!(
                            "Operator '{}' cannot combine '{left}' and '{right}'",
                            binary.operator
                        ),
                        &binary.location,
                    );
                }
            }
            _ => {}
        }
    }

    fn check_call(&mut self, call: &FunctionCall) {
        self.check_expression(&call.callee);
        for arg in &call.args {
            self.check_expression(arg);
        }

        let Expression::Identifier(identifier) = call.callee.as_ref() else {
            return;
        };
        let Some((params, _)) = self.type_info.function_sigs.get(&identifier.name) else {
            return;
        };

        if params.len() != call.args.len() {
            self.error(
                format!(
                    "Function '{}' expects {} argument(s), got {}",
                    identifier.name,
                    params.len(),
                    call.args.len()
                ),
                &call.location,
            );
            return;
        }

        let params = params.clone();
        for (i, (param, arg)) in params.iter().zip(&call.args).enumerate() {
            let actual = self.type_of(arg);
            if !types_compatible(param, &actual) {
                self.error(
                    format!(
                        "Argument {} of '{}' expects '{param}', got '{actual}'",
                        i + 1,
                        identifier.name
                    ),
                    arg.location(),
                );
            }
        }
    }

    fn check_match(&mut self, match_expr: &MatchExpr) {
        if let Some(scrutinee) = &match_expr.scrutinee {
            self.check_expression(scrutinee);
        }

        let mut first_arm_type: Option<TypeAnnotation> = None;
        for arm in &match_expr.arms {
            if let Some(guard) = &arm.guard {
                self.check_expression(guard);
                let guard_type = self.type_of(guard);
                if !guard_type.is_opaque() && guard_type.type_name != "bool" {
                    self.error(
                        format!("Match guard must be bool, got '{guard_type}'"),
                        guard.location(),
                    );
                }
            }

            self.check_expression(&arm.body);
            let body_type = self.type_of(&arm.body);
            if body_type.is_opaque() {
                continue;
            }

            match &first_arm_type {
                None => first_arm_type = Some(body_type),
                Some(expected) => {
                    // Later arms may still be reachable, so a mismatch is
                    // only a warning.
                    if !types_compatible(expected, &body_type)
                        && !types_compatible(&body_type, expected)
                    {
                        self.warning(
                            format!(
                                "Match arms have mismatched types: '{expected}' and '{body_type}'"
                            ),
                            &arm.location,
                        );
                    }
                }
            }
        }
    }

    fn check_struct_literal(&mut self, literal: &StructLiteral) {
        for field in &literal.field_values {
            self.check_expression(&field.value);
        }

        let Some(struct_name) = &literal.struct_name else {
            return;
        };
        let Some(fields) = self.type_info.struct_defs.get(struct_name) else {
            return;
        };
        let fields = fields.clone();

        for assignment in &literal.field_values {
            match fields.iter().find(|(name, _)| name == &assignment.name) {
                Some((_, expected)) => {
                    let actual = self.type_of(&assignment.value);
                    if !types_compatible(expected, &actual) {
                        self.error(
                            format!(
                                "Field '{}' of '{struct_name}' expects '{expected}', got '{actual}'",
                                assignment.name
                            ),
                            &assignment.location,
                        );
                    }
                }
                None => {
                    self.error(
                        format!("Struct '{struct_name}' has no field '{}'", assignment.name),
                        &assignment.location,
                    );
                }
            }
        }
    }

    /// Penalty ranges are lint-level: min must not exceed max.
    fn check_penalty_ranges(&mut self, statute: &StatuteNode) {
        let Some(penalty) = &statute.penalty else {
            return;
        };

        if let (Some(min), Some(max)) = (&penalty.imprisonment_min, &penalty.imprisonment_max) {
            if min.value.total_days() > max.value.total_days() {
                self.warning(
                    format!(
                        "Imprisonment range of section {} has minimum ({}) above maximum ({})",
                        statute.section_number, min.value, max.value
                    ),
                    &penalty.location,
                );
            }
        }
        if let (Some(min), Some(max)) = (&penalty.fine_min, &penalty.fine_max) {
            if min.amount > max.amount {
                self.warning(
                    format!(
                        "Fine range of section {} has minimum above maximum",
                        statute.section_number
                    ),
                    &penalty.location,
                );
            }
        }
    }
}

/// Run the type checker with a previously computed inference result.
pub fn check(module: &ModuleNode, type_info: &TypeInferenceResult) -> TypeCheckResult {
    TypeChecker::new(type_info).check_module(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::infer::infer;
    use crate::ast::build;
    use crate::parser::parse;

    fn check_source(source: &str) -> TypeCheckResult {
        let result = parse(source, "<test>");
        assert!(result.is_valid(), "parse errors: {:?}", result.errors);
        let module = build(&result.tree, "<test>");
        let info = infer(&module);
        check(&module, &info)
    }

    #[test]
    fn test_incompatible_initializer() {
        let result = check_source("int x := \"text\";");
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].message.contains("initialize variable 'x'"));
    }

    #[test]
    fn test_int_widens_to_float() {
        let result = check_source("float x := 3;");
        assert!(result.is_valid(), "errors: {:?}", result.errors);
    }

    #[test]
    fn test_optional_accepts_inner() {
        let result = check_source("int? x := 3;");
        assert!(result.is_valid(), "errors: {:?}", result.errors);
    }

    #[test]
    fn test_arity_mismatch() {
        let result =
            check_source("fn g(a: int) -> int { return a; }\nfn f() -> int { return g(1, 2); }");
        assert!(!result.is_valid());
        assert!(result.errors[0]
            .message
            .contains("expects 1 argument(s), got 2"));
    }

    #[test]
    fn test_argument_type_mismatch() {
        let result = check_source(
            "fn g(a: int) -> int { return a; }\nfn f() -> int { return g(\"x\"); }",
        );
        assert!(!result.is_valid());
        assert!(result.errors[0].message.contains("expects 'int', got 'string'"));
    }

    #[test]
    fn test_return_type_mismatch() {
        let result = check_source("fn f() -> int { return \"x\"; }");
        assert!(!result.is_valid());
        assert!(result.errors[0].message.contains("Return type mismatch"));
    }

    #[test]
    fn test_missing_return_value() {
        let result = check_source("fn f() -> int { return; }");
        assert!(!result.is_valid());
        assert!(result.errors[0].message.contains("Missing return value"));
    }

    #[test]
    fn test_logical_operand_kinds() {
        let result = check_source("fn f(a: int) -> bool { return a && TRUE; }");
        assert!(!result.is_valid());
        assert!(result.errors[0].message.contains("requires bool operands"));
    }

    #[test]
    fn test_guard_must_be_bool() {
        let result =
            check_source("fn f(x: int) -> int { match x { case n if n + 1 => 1, case _ => 0 } }");
        assert!(!result.is_valid());
        assert!(result.errors[0].message.contains("Match guard must be bool"));
    }

    #[test]
    fn test_arm_type_mismatch_is_warning() {
        let result =
            check_source("fn f(b: bool) -> int { match b { case TRUE => 1, case _ => \"x\" } }");
        assert!(result.is_valid());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].severity, Severity::Warning);
    }

    #[test]
    fn test_struct_literal_fields() {
        let result = check_source(
            "struct Person { name: string, age: int }\nPerson p := Person { name := \"A\", age := \"old\" };",
        );
        assert!(!result.is_valid());
        assert!(result.errors[0].message.contains("expects 'int', got 'string'"));
    }

    #[test]
    fn test_penalty_range_lint() {
        let result = check_source(
            r#"statute "1" "Test" { penalty { imprisonment := 10 years to 1 year; } }"#,
        );
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].severity, Severity::Warning);
        assert!(result.errors[0].message.contains("minimum"));
    }

    #[test]
    fn test_string_concatenation() {
        let result = check_source("fn f(a: string, b: string) -> string { return a + b; }");
        assert!(result.is_valid(), "errors: {:?}", result.errors);
    }
}
