//! Type inference.
//!
//! Annotates every expression with an inferred [`TypeAnnotation`], recorded
//! in a side table keyed by node id. Struct layouts and function signatures
//! are collected in a first pass so forward references infer correctly.
//! Unresolvable expressions get the opaque `unknown` type, which the type
//! checker treats as compatible with anything to avoid cascade errors.

use std::collections::HashMap;
use std::fmt::Display;

use crate::ast::nodes::*;

/// Inferred type of an expression. Generic types are tracked by constructor
/// name only and otherwise treated as opaque.
#[derive(Debug, Clone)]
pub struct TypeAnnotation {
    pub type_name: String,
    pub is_optional: bool,
    pub is_array: bool,
    pub element_type: Option<Box<TypeAnnotation>>,
}

impl TypeAnnotation {
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            type_name: name.into(),
            is_optional: false,
            is_array: false,
            element_type: None,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            is_optional: true,
            ..Self::simple(name)
        }
    }

    pub fn array(element: TypeAnnotation) -> Self {
        Self {
            type_name: "array".into(),
            is_optional: false,
            is_array: true,
            element_type: Some(Box::new(element)),
        }
    }

    pub fn unknown() -> Self {
        Self::simple("unknown")
    }

    pub fn is_unknown(&self) -> bool {
        self.type_name == "unknown"
    }

    /// The placeholder type of `pass` expressions.
    pub fn is_pass(&self) -> bool {
        self.type_name == "pass"
    }

    pub fn is_opaque(&self) -> bool {
        self.is_unknown() || self.is_pass()
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self.type_name.as_str(),
            "int" | "float" | "money" | "percent" | "duration"
        ) && !self.is_array
    }
}

impl PartialEq for TypeAnnotation {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name
            && self.is_optional == other.is_optional
            && self.is_array == other.is_array
    }
}

impl Eq for TypeAnnotation {}

impl Display for TypeAnnotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_array {
            match &self.element_type {
                Some(element) => write!(f, "[{element}]"),
                None => f.write_str("[unknown]"),
            }
        } else if self.is_optional {
            write!(f, "{}?", self.type_name)
        } else {
            f.write_str(&self.type_name)
        }
    }
}

/// Function signature: parameter types plus return type.
pub type FunctionSignature = (Vec<TypeAnnotation>, TypeAnnotation);

/// Inference output: per-node types plus the collected layouts.
#[derive(Debug, Clone, Default)]
pub struct TypeInferenceResult {
    node_types: HashMap<NodeId, TypeAnnotation>,
    /// Struct name -> ordered (field name, field type) pairs.
    pub struct_defs: HashMap<String, Vec<(String, TypeAnnotation)>>,
    pub function_sigs: HashMap<String, FunctionSignature>,
    pub variable_types: HashMap<String, TypeAnnotation>,
}

impl TypeInferenceResult {
    pub fn get_type(&self, node: NodeId) -> TypeAnnotation {
        self.node_types
            .get(&node)
            .cloned()
            .unwrap_or_else(TypeAnnotation::unknown)
    }

    pub fn set_type(&mut self, node: NodeId, type_ann: TypeAnnotation) {
        self.node_types.insert(node, type_ann);
    }

    pub fn struct_field(&self, struct_name: &str, field: &str) -> Option<&TypeAnnotation> {
        self.struct_defs
            .get(struct_name)?
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, t)| t)
    }
}

pub struct TypeInference {
    result: TypeInferenceResult,
    scopes: Vec<HashMap<String, TypeAnnotation>>,
}

impl Default for TypeInference {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeInference {
    pub fn new() -> Self {
        Self {
            result: TypeInferenceResult::default(),
            scopes: vec![HashMap::new()],
        }
    }

    pub fn infer_module(mut self, module: &ModuleNode) -> TypeInferenceResult {
        // First pass: struct layouts and function signatures.
        for struct_def in &module.type_defs {
            let fields = struct_def
                .fields
                .iter()
                .map(|field| {
                    let type_ann = match &field.type_annotation {
                        Some(t) => Self::annotation_of(t),
                        // Enum variants carry their enum's type.
                        None => TypeAnnotation::simple(&struct_def.name),
                    };
                    (field.name.clone(), type_ann)
                })
                .collect();
            self.result
                .struct_defs
                .insert(struct_def.name.clone(), fields);
        }
        for function_def in &module.function_defs {
            let params = function_def
                .params
                .iter()
                .map(|p| Self::annotation_of(&p.type_annotation))
                .collect();
            let return_type = function_def
                .return_type
                .as_ref()
                .map(Self::annotation_of)
                .unwrap_or_else(|| TypeAnnotation::simple("void"));
            self.result
                .function_sigs
                .insert(function_def.name.clone(), (params, return_type));
        }
        for variable in &module.variables {
            self.result.variable_types.insert(
                variable.name.clone(),
                Self::annotation_of(&variable.type_annotation),
            );
        }

        // Second pass: full traversal.
        for function_def in &module.function_defs {
            self.infer_function(function_def);
        }
        for statute in &module.statutes {
            for element in &statute.elements {
                self.infer_expression(&element.description);
            }
        }
        for variable in &module.variables {
            self.infer_variable_decl(variable);
        }
        for assert in &module.assertions {
            self.infer_expression(&assert.condition);
        }

        self.result
    }

    /// Convert a syntactic type annotation into an inference annotation.
    pub fn annotation_of(type_node: &TypeNode) -> TypeAnnotation {
        match type_node {
            TypeNode::Builtin(builtin) => TypeAnnotation::simple(&builtin.name),
            TypeNode::Named(named) => TypeAnnotation::simple(&named.name),
            TypeNode::Optional(optional) => TypeAnnotation {
                is_optional: true,
                ..Self::annotation_of(&optional.inner)
            },
            TypeNode::Array(array) => {
                TypeAnnotation::array(Self::annotation_of(&array.element_type))
            }
            TypeNode::Generic(generic) => TypeAnnotation::simple(&generic.base),
        }
    }

    fn bind(&mut self, name: &str, type_ann: TypeAnnotation) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), type_ann);
        }
    }

    fn lookup(&self, name: &str) -> Option<TypeAnnotation> {
        for scope in self.scopes.iter().rev() {
            if let Some(type_ann) = scope.get(name) {
                return Some(type_ann.clone());
            }
        }
        self.result.variable_types.get(name).cloned()
    }

    fn infer_function(&mut self, function_def: &FunctionDef) {
        self.scopes.push(HashMap::new());
        for param in &function_def.params {
            self.bind(&param.name, Self::annotation_of(&param.type_annotation));
        }
        self.infer_block(&function_def.body);
        self.scopes.pop();

        let return_type = function_def
            .return_type
            .as_ref()
            .map(Self::annotation_of)
            .unwrap_or_else(|| TypeAnnotation::simple("void"));
        self.result.set_type(function_def.id, return_type);
    }

    fn infer_block(&mut self, block: &Block) {
        for statement in &block.statements {
            self.infer_statement(statement);
        }
    }

    fn infer_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::VariableDecl(decl) => self.infer_variable_decl(decl),
            Statement::Assignment(assignment) => {
                self.infer_expression(&assignment.target);
                self.infer_expression(&assignment.value);
            }
            Statement::Return(ret) => {
                if let Some(value) = &ret.value {
                    self.infer_expression(value);
                }
            }
            Statement::Pass(_) => {}
            Statement::Expression(stmt) => {
                self.infer_expression(&stmt.expression);
            }
        }
    }

    fn infer_variable_decl(&mut self, decl: &VariableDecl) {
        let declared = Self::annotation_of(&decl.type_annotation);
        if let Some(value) = &decl.value {
            self.infer_expression(value);
        }

        self.bind(&decl.name, declared.clone());
        self.result
            .variable_types
            .insert(decl.name.clone(), declared.clone());
        self.result.set_type(decl.id, declared);
    }

    pub fn infer_expression(&mut self, expression: &Expression) -> TypeAnnotation {
        let inferred = match expression {
            Expression::Int(_) => TypeAnnotation::simple("int"),
            Expression::Float(_) => TypeAnnotation::simple("float"),
            Expression::Bool(_) => TypeAnnotation::simple("bool"),
            Expression::Str(_) => TypeAnnotation::simple("string"),
            Expression::Money(_) => TypeAnnotation::simple("money"),
            Expression::Percent(_) => TypeAnnotation::simple("percent"),
            Expression::Date(_) => TypeAnnotation::simple("date"),
            Expression::Duration(_) => TypeAnnotation::simple("duration"),
            Expression::Pass(_) => TypeAnnotation::simple("pass"),
            Expression::Identifier(identifier) => self.infer_identifier(identifier),
            Expression::FieldAccess(access) => self.infer_field_access(access),
            Expression::IndexAccess(access) => {
                let base = self.infer_expression(&access.base);
                self.infer_expression(&access.index);
                if base.is_array {
                    base.element_type
                        .map(|e| *e)
                        .unwrap_or_else(TypeAnnotation::unknown)
                } else {
                    TypeAnnotation::unknown()
                }
            }
            Expression::Call(call) => self.infer_call(call),
            Expression::Binary(binary) => self.infer_binary(binary),
            Expression::Unary(unary) => self.infer_unary(unary),
            Expression::Match(match_expr) => self.infer_match(match_expr),
            Expression::StructLiteral(literal) => {
                for field in &literal.field_values {
                    self.infer_expression(&field.value);
                }
                match &literal.struct_name {
                    Some(name) => TypeAnnotation::simple(name),
                    None => TypeAnnotation::unknown(),
                }
            }
        };

        self.result.set_type(expression.id(), inferred.clone());
        inferred
    }

    fn infer_identifier(&mut self, identifier: &Identifier) -> TypeAnnotation {
        if let Some(type_ann) = self.lookup(&identifier.name) {
            return type_ann;
        }
        if self.result.struct_defs.contains_key(&identifier.name) {
            // A struct type used as a value (enum variant access base).
            return TypeAnnotation::simple(&identifier.name);
        }
        if identifier.name == "TRUE" || identifier.name == "FALSE" {
            return TypeAnnotation::simple("bool");
        }
        TypeAnnotation::unknown()
    }

    fn infer_field_access(&mut self, access: &FieldAccess) -> TypeAnnotation {
        let base = self.infer_expression(&access.base);

        if let Some(field_type) = self.result.struct_field(&base.type_name, &access.field_name) {
            return field_type.clone();
        }
        // Enum-variant style access (`Color.red`) takes the base's type.
        TypeAnnotation::simple(&base.type_name)
    }

    fn infer_call(&mut self, call: &FunctionCall) -> TypeAnnotation {
        for arg in &call.args {
            self.infer_expression(arg);
        }
        self.infer_expression(&call.callee);

        let callee_name = match call.callee.as_ref() {
            Expression::Identifier(identifier) => Some(identifier.name.as_str()),
            _ => None,
        };

        callee_name
            .and_then(|name| self.result.function_sigs.get(name))
            .map(|(_, return_type)| return_type.clone())
            .unwrap_or_else(TypeAnnotation::unknown)
    }

    fn infer_binary(&mut self, binary: &BinaryExpr) -> TypeAnnotation {
        let left = self.infer_expression(&binary.left);
        let right = self.infer_expression(&binary.right);

        match binary.operator.as_str() {
            "==" | "!=" | "<" | ">" | "<=" | ">=" | "&&" | "||" | "and" | "or" => {
                TypeAnnotation::simple("bool")
            }
            "+" | "-" | "*" | "/" | "%" => {
                if left.type_name == "string" || right.type_name == "string" {
                    // String concatenation.
                    TypeAnnotation::simple("string")
                } else if left.type_name == "float" || right.type_name == "float" {
                    TypeAnnotation::simple("float")
                } else if left.type_name == "money" || right.type_name == "money" {
                    TypeAnnotation::simple("money")
                } else if left.type_name == "duration" || right.type_name == "duration" {
                    TypeAnnotation::simple("duration")
                } else {
                    TypeAnnotation::simple("int")
                }
            }
            _ => TypeAnnotation::unknown(),
        }
    }

    fn infer_unary(&mut self, unary: &UnaryExpr) -> TypeAnnotation {
        let operand = self.infer_expression(&unary.operand);
        match unary.operator.as_str() {
            "!" | "not" => TypeAnnotation::simple("bool"),
            // Negation preserves the numeric operand type.
            _ => operand,
        }
    }

    fn infer_match(&mut self, match_expr: &MatchExpr) -> TypeAnnotation {
        let scrutinee_type = match_expr
            .scrutinee
            .as_ref()
            .map(|scrutinee| self.infer_expression(scrutinee));

        let mut arm_types = vec![];
        for arm in &match_expr.arms {
            self.scopes.push(HashMap::new());
            if let Some(scrutinee_type) = &scrutinee_type {
                self.bind_pattern(&arm.pattern, scrutinee_type);
            }
            if let Some(guard) = &arm.guard {
                self.infer_expression(guard);
            }
            let body_type = self.infer_expression(&arm.body);
            self.result.set_type(arm.id, body_type.clone());
            arm_types.push(body_type);
            self.scopes.pop();
        }

        // The common arm type: first non-placeholder wins.
        arm_types
            .iter()
            .find(|t| !t.is_opaque())
            .or_else(|| arm_types.first())
            .cloned()
            .unwrap_or_else(TypeAnnotation::unknown)
    }

    /// Bindings take the scrutinee's type within their arm.
    fn bind_pattern(&mut self, pattern: &Pattern, scrutinee_type: &TypeAnnotation) {
        match pattern {
            Pattern::Binding(binding) => self.bind(&binding.name, scrutinee_type.clone()),
            Pattern::Struct(struct_pattern) => {
                for field in &struct_pattern.fields {
                    if let Some(sub) = &field.pattern {
                        let field_type = self
                            .result
                            .struct_field(&struct_pattern.type_name, &field.name)
                            .cloned()
                            .unwrap_or_else(TypeAnnotation::unknown);
                        self.bind_pattern(sub, &field_type);
                    }
                }
            }
            Pattern::Wildcard(_) | Pattern::Literal(_) => {}
        }
    }
}

/// Run type inference over a module.
pub fn infer(module: &ModuleNode) -> TypeInferenceResult {
    TypeInference::new().infer_module(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build;
    use crate::parser::parse;

    fn infer_source(source: &str) -> (ModuleNode, TypeInferenceResult) {
        let result = parse(source, "<test>");
        assert!(result.is_valid(), "parse errors: {:?}", result.errors);
        let module = build(&result.tree, "<test>");
        let info = infer(&module);
        (module, info)
    }

    fn first_return_type(module: &ModuleNode, info: &TypeInferenceResult) -> TypeAnnotation {
        let Statement::Return(ret) = &module.function_defs[0].body.statements[0] else {
            panic!("expected return statement");
        };
        info.get_type(ret.value.as_ref().unwrap().id())
    }

    #[test]
    fn test_literal_types() {
        let (module, info) = infer_source("money m := $5;");
        let value = module.variables[0].value.as_ref().unwrap();
        assert_eq!(info.get_type(value.id()), TypeAnnotation::simple("money"));
    }

    #[test]
    fn test_binary_numeric_widening() {
        let (module, info) =
            infer_source("fn f(a: int, b: float) -> float { return a + b; }");
        assert_eq!(
            first_return_type(&module, &info),
            TypeAnnotation::simple("float")
        );
    }

    #[test]
    fn test_money_arithmetic_stays_money() {
        let (module, info) = infer_source("fn f(m: money) -> money { return m * 2; }");
        assert_eq!(
            first_return_type(&module, &info),
            TypeAnnotation::simple("money")
        );
    }

    #[test]
    fn test_comparison_is_bool() {
        let (module, info) = infer_source("fn f(a: int) -> bool { return a < 3; }");
        assert_eq!(
            first_return_type(&module, &info),
            TypeAnnotation::simple("bool")
        );
    }

    #[test]
    fn test_field_access_on_struct() {
        let (module, info) = infer_source(
            "struct Person { name: string, age: int }\nfn f(p: Person) -> int { return p.age; }",
        );
        assert_eq!(
            first_return_type(&module, &info),
            TypeAnnotation::simple("int")
        );
    }

    #[test]
    fn test_unresolved_identifier_is_unknown() {
        let (module, info) = infer_source("int y := mystery;");
        let value = module.variables[0].value.as_ref().unwrap();
        assert!(info.get_type(value.id()).is_unknown());
    }

    #[test]
    fn test_call_return_type() {
        let (module, info) = infer_source(
            "fn g() -> string { return \"x\"; }\nfn f() -> string { return g(); }",
        );
        let Statement::Return(ret) = &module.function_defs[1].body.statements[0] else {
            panic!("expected return");
        };
        assert_eq!(
            info.get_type(ret.value.as_ref().unwrap().id()),
            TypeAnnotation::simple("string")
        );
    }

    #[test]
    fn test_match_takes_first_concrete_arm_type() {
        let (module, info) = infer_source(
            "fn f(b: bool) -> int { match b { case TRUE => pass, case FALSE => 3 } }",
        );
        let Statement::Expression(stmt) = &module.function_defs[0].body.statements[0] else {
            panic!("expected expression statement");
        };
        assert_eq!(
            info.get_type(stmt.expression.id()),
            TypeAnnotation::simple("int")
        );
    }
}
