//! Read-only traversal over the AST.
//!
//! The [`Visitor`] trait has one method per syntactic category; default
//! implementations recurse into all structural children via the `walk_*`
//! free functions, so an analysis only overrides the nodes it cares about.

use super::nodes::*;

pub trait Visitor: Sized {
    fn visit_module(&mut self, module: &ModuleNode) {
        walk_module(self, module);
    }

    fn visit_import(&mut self, _import: &ImportNode) {}

    fn visit_referencing(&mut self, _referencing: &ReferencingStmt) {}

    fn visit_assert(&mut self, assert: &AssertStmt) {
        self.visit_expression(&assert.condition);
    }

    fn visit_struct_def(&mut self, struct_def: &StructDef) {
        walk_struct_def(self, struct_def);
    }

    fn visit_field_def(&mut self, field_def: &FieldDef) {
        if let Some(type_node) = &field_def.type_annotation {
            self.visit_type(type_node);
        }
    }

    fn visit_function_def(&mut self, function_def: &FunctionDef) {
        walk_function_def(self, function_def);
    }

    fn visit_statute(&mut self, statute: &StatuteNode) {
        walk_statute(self, statute);
    }

    fn visit_element(&mut self, element: &ElementNode) {
        self.visit_expression(&element.description);
    }

    fn visit_block(&mut self, block: &Block) {
        walk_block(self, block);
    }

    fn visit_statement(&mut self, statement: &Statement) {
        walk_statement(self, statement);
    }

    fn visit_variable_decl(&mut self, decl: &VariableDecl) {
        walk_variable_decl(self, decl);
    }

    fn visit_expression(&mut self, expression: &Expression) {
        walk_expression(self, expression);
    }

    fn visit_match_arm(&mut self, arm: &MatchArm) {
        walk_match_arm(self, arm);
    }

    fn visit_pattern(&mut self, pattern: &Pattern) {
        walk_pattern(self, pattern);
    }

    fn visit_type(&mut self, type_node: &TypeNode) {
        walk_type(self, type_node);
    }
}

pub fn walk_module<V: Visitor>(v: &mut V, module: &ModuleNode) {
    for import in &module.imports {
        v.visit_import(import);
    }
    for referencing in &module.references {
        v.visit_referencing(referencing);
    }
    for struct_def in &module.type_defs {
        v.visit_struct_def(struct_def);
    }
    for function_def in &module.function_defs {
        v.visit_function_def(function_def);
    }
    for statute in &module.statutes {
        v.visit_statute(statute);
    }
    for variable in &module.variables {
        v.visit_variable_decl(variable);
    }
    for assert in &module.assertions {
        v.visit_assert(assert);
    }
}

pub fn walk_struct_def<V: Visitor>(v: &mut V, struct_def: &StructDef) {
    for field in &struct_def.fields {
        v.visit_field_def(field);
    }
}

pub fn walk_function_def<V: Visitor>(v: &mut V, function_def: &FunctionDef) {
    for param in &function_def.params {
        v.visit_type(&param.type_annotation);
    }
    if let Some(return_type) = &function_def.return_type {
        v.visit_type(return_type);
    }
    v.visit_block(&function_def.body);
}

pub fn walk_statute<V: Visitor>(v: &mut V, statute: &StatuteNode) {
    for element in &statute.elements {
        v.visit_element(element);
    }
}

pub fn walk_block<V: Visitor>(v: &mut V, block: &Block) {
    for statement in &block.statements {
        v.visit_statement(statement);
    }
}

pub fn walk_statement<V: Visitor>(v: &mut V, statement: &Statement) {
    match statement {
        Statement::VariableDecl(decl) => v.visit_variable_decl(decl),
        Statement::Assignment(assignment) => {
            v.visit_expression(&assignment.target);
            v.visit_expression(&assignment.value);
        }
        Statement::Return(ret) => {
            if let Some(value) = &ret.value {
                v.visit_expression(value);
            }
        }
        Statement::Pass(_) => {}
        Statement::Expression(stmt) => v.visit_expression(&stmt.expression),
    }
}

pub fn walk_variable_decl<V: Visitor>(v: &mut V, decl: &VariableDecl) {
    v.visit_type(&decl.type_annotation);
    if let Some(value) = &decl.value {
        v.visit_expression(value);
    }
}

pub fn walk_expression<V: Visitor>(v: &mut V, expression: &Expression) {
    match expression {
        Expression::Int(_)
        | Expression::Float(_)
        | Expression::Bool(_)
        | Expression::Str(_)
        | Expression::Money(_)
        | Expression::Percent(_)
        | Expression::Date(_)
        | Expression::Duration(_)
        | Expression::Identifier(_)
        | Expression::Pass(_) => {}
        Expression::FieldAccess(access) => v.visit_expression(&access.base),
        Expression::IndexAccess(access) => {
            v.visit_expression(&access.base);
            v.visit_expression(&access.index);
        }
        Expression::Call(call) => {
            v.visit_expression(&call.callee);
            for arg in &call.args {
                v.visit_expression(arg);
            }
        }
        Expression::Binary(binary) => {
            v.visit_expression(&binary.left);
            v.visit_expression(&binary.right);
        }
        Expression::Unary(unary) => v.visit_expression(&unary.operand),
        Expression::Match(match_expr) => {
            if let Some(scrutinee) = &match_expr.scrutinee {
                v.visit_expression(scrutinee);
            }
            for arm in &match_expr.arms {
                v.visit_match_arm(arm);
            }
        }
        Expression::StructLiteral(literal) => {
            for field in &literal.field_values {
                v.visit_expression(&field.value);
            }
        }
    }
}

pub fn walk_match_arm<V: Visitor>(v: &mut V, arm: &MatchArm) {
    v.visit_pattern(&arm.pattern);
    if let Some(guard) = &arm.guard {
        v.visit_expression(guard);
    }
    v.visit_expression(&arm.body);
}

pub fn walk_pattern<V: Visitor>(v: &mut V, pattern: &Pattern) {
    match pattern {
        Pattern::Wildcard(_) | Pattern::Binding(_) => {}
        Pattern::Literal(literal) => v.visit_expression(&literal.literal),
        Pattern::Struct(struct_pattern) => {
            for field in &struct_pattern.fields {
                if let Some(sub) = &field.pattern {
                    v.visit_pattern(sub);
                }
            }
        }
    }
}

pub fn walk_type<V: Visitor>(v: &mut V, type_node: &TypeNode) {
    match type_node {
        TypeNode::Builtin(_) | TypeNode::Named(_) => {}
        TypeNode::Optional(optional) => v.visit_type(&optional.inner),
        TypeNode::Array(array) => v.visit_type(&array.element_type),
        TypeNode::Generic(generic) => {
            for arg in &generic.type_args {
                v.visit_type(arg);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build;
    use crate::parser::parse;

    struct MatchCounter {
        matches: usize,
        identifiers: Vec<String>,
    }

    impl Visitor for MatchCounter {
        fn visit_expression(&mut self, expression: &Expression) {
            match expression {
                Expression::Match(_) => self.matches += 1,
                Expression::Identifier(id) => self.identifiers.push(id.name.clone()),
                _ => {}
            }
            walk_expression(self, expression);
        }
    }

    #[test]
    fn test_visitor_reaches_nested_expressions() {
        let result = parse(
            "fn f(b: bool) -> int { match b { case TRUE => g(x), case _ => 0 } }",
            "<test>",
        );
        let module = build(&result.tree, "<test>");

        let mut counter = MatchCounter {
            matches: 0,
            identifiers: vec![],
        };
        counter.visit_module(&module);

        assert_eq!(counter.matches, 1);
        assert_eq!(counter.identifiers, vec!["b", "g", "x"]);
    }
}
