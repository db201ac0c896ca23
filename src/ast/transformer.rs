//! Immutable tree-rewriting substrate.
//!
//! A [`Transformer`] method returns `Some(replacement)` to rewrite a node
//! and `None` to leave it alone. The `walk_*` defaults recurse into
//! children and rebuild a parent only when at least one child actually
//! changed, so untouched subtrees are shared, not copied. The identity
//! transformer therefore returns the module unchanged.

use super::nodes::*;

pub trait Transformer: Sized {
    fn transform_module(&mut self, module: &ModuleNode) -> Option<ModuleNode> {
        walk_module(self, module)
    }

    fn transform_function_def(&mut self, function_def: &FunctionDef) -> Option<FunctionDef> {
        walk_function_def(self, function_def)
    }

    fn transform_statute(&mut self, statute: &StatuteNode) -> Option<StatuteNode> {
        walk_statute(self, statute)
    }

    fn transform_block(&mut self, block: &Block) -> Option<Block> {
        walk_block(self, block)
    }

    fn transform_statement(&mut self, statement: &Statement) -> Option<Statement> {
        walk_statement(self, statement)
    }

    fn transform_expression(&mut self, expression: &Expression) -> Option<Expression> {
        walk_expression(self, expression)
    }

    fn transform_match_arm(&mut self, arm: &MatchArm) -> Option<MatchArm> {
        walk_match_arm(self, arm)
    }

    fn transform_pattern(&mut self, pattern: &Pattern) -> Option<Pattern> {
        walk_pattern(self, pattern)
    }

    fn transform_type(&mut self, type_node: &TypeNode) -> Option<TypeNode> {
        walk_type(self, type_node)
    }
}

/// Run a transformer over a module, returning the (possibly shared) result.
pub fn apply<T: Transformer>(transformer: &mut T, module: &ModuleNode) -> ModuleNode {
    transformer
        .transform_module(module)
        .unwrap_or_else(|| module.clone())
}

/// Transform each item of a list; `Some` only when at least one changed.
fn transform_vec<T: Clone>(
    items: &[T],
    mut transform: impl FnMut(&T) -> Option<T>,
) -> Option<Vec<T>> {
    let transformed: Vec<Option<T>> = items.iter().map(&mut transform).collect();
    if transformed.iter().all(|t| t.is_none()) {
        return None;
    }
    Some(
        transformed
            .into_iter()
            .zip(items)
            .map(|(new, old)| new.unwrap_or_else(|| old.clone()))
            .collect(),
    )
}

pub fn walk_module<T: Transformer>(t: &mut T, module: &ModuleNode) -> Option<ModuleNode> {
    let function_defs = transform_vec(&module.function_defs, |f| t.transform_function_def(f));
    let statutes = transform_vec(&module.statutes, |s| t.transform_statute(s));
    let variables = transform_vec(&module.variables, |v| walk_variable_decl(t, v));
    let assertions = transform_vec(&module.assertions, |a| {
        t.transform_expression(&a.condition).map(|condition| AssertStmt {
            condition,
            ..a.clone()
        })
    });

    if function_defs.is_none() && statutes.is_none() && variables.is_none() && assertions.is_none()
    {
        return None;
    }

    Some(ModuleNode {
        function_defs: function_defs.unwrap_or_else(|| module.function_defs.clone()),
        statutes: statutes.unwrap_or_else(|| module.statutes.clone()),
        variables: variables.unwrap_or_else(|| module.variables.clone()),
        assertions: assertions.unwrap_or_else(|| module.assertions.clone()),
        ..module.clone()
    })
}

pub fn walk_function_def<T: Transformer>(
    t: &mut T,
    function_def: &FunctionDef,
) -> Option<FunctionDef> {
    let body = t.transform_block(&function_def.body)?;
    Some(FunctionDef {
        body,
        ..function_def.clone()
    })
}

pub fn walk_statute<T: Transformer>(t: &mut T, statute: &StatuteNode) -> Option<StatuteNode> {
    let elements = transform_vec(&statute.elements, |e| {
        t.transform_expression(&e.description)
            .map(|description| ElementNode {
                description,
                ..e.clone()
            })
    })?;
    Some(StatuteNode {
        elements,
        ..statute.clone()
    })
}

pub fn walk_block<T: Transformer>(t: &mut T, block: &Block) -> Option<Block> {
    let statements = transform_vec(&block.statements, |s| t.transform_statement(s))?;
    Some(Block {
        statements,
        ..block.clone()
    })
}

fn walk_variable_decl<T: Transformer>(t: &mut T, decl: &VariableDecl) -> Option<VariableDecl> {
    let type_annotation = t.transform_type(&decl.type_annotation);
    let value = match &decl.value {
        Some(value) => t.transform_expression(value).map(Some),
        None => None,
    };

    if type_annotation.is_none() && value.is_none() {
        return None;
    }

    Some(VariableDecl {
        type_annotation: type_annotation.unwrap_or_else(|| decl.type_annotation.clone()),
        value: value.unwrap_or_else(|| decl.value.clone()),
        ..decl.clone()
    })
}

pub fn walk_statement<T: Transformer>(t: &mut T, statement: &Statement) -> Option<Statement> {
    match statement {
        Statement::VariableDecl(decl) => {
            walk_variable_decl(t, decl).map(Statement::VariableDecl)
        }
        Statement::Assignment(assignment) => {
            let target = t.transform_expression(&assignment.target);
            let value = t.transform_expression(&assignment.value);
            if target.is_none() && value.is_none() {
                return None;
            }
            Some(Statement::Assignment(AssignmentStmt {
                target: target.unwrap_or_else(|| assignment.target.clone()),
                value: value.unwrap_or_else(|| assignment.value.clone()),
                ..assignment.clone()
            }))
        }
        Statement::Return(ret) => {
            let value = t.transform_expression(ret.value.as_ref()?)?;
            Some(Statement::Return(ReturnStmt {
                value: Some(value),
                ..ret.clone()
            }))
        }
        Statement::Pass(_) => None,
        Statement::Expression(stmt) => {
            let expression = t.transform_expression(&stmt.expression)?;
            Some(Statement::Expression(ExpressionStmt {
                expression,
                ..stmt.clone()
            }))
        }
    }
}

pub fn walk_expression<T: Transformer>(t: &mut T, expression: &Expression) -> Option<Expression> {
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
        | Expression::Pass(_) => None,
        Expression::FieldAccess(access) => {
            let base = t.transform_expression(&access.base)?;
            Some(Expression::FieldAccess(FieldAccess {
                base: Box::new(base),
                ..access.clone()
            }))
        }
        Expression::IndexAccess(access) => {
            let base = t.transform_expression(&access.base);
            let index = t.transform_expression(&access.index);
            if base.is_none() && index.is_none() {
                return None;
            }
            Some(Expression::IndexAccess(IndexAccess {
                base: Box::new(base.unwrap_or_else(|| (*access.base).clone())),
                index: Box::new(index.unwrap_or_else(|| (*access.index).clone())),
                ..access.clone()
            }))
        }
        Expression::Call(call) => {
            let callee = t.transform_expression(&call.callee);
            let args = transform_vec(&call.args, |a| t.transform_expression(a));
            if callee.is_none() && args.is_none() {
                return None;
            }
            Some(Expression::Call(FunctionCall {
                callee: Box::new(callee.unwrap_or_else(|| (*call.callee).clone())),
                args: args.unwrap_or_else(|| call.args.clone()),
                ..call.clone()
            }))
        }
        Expression::Binary(binary) => {
            let left = t.transform_expression(&binary.left);
            let right = t.transform_expression(&binary.right);
            if left.is_none() && right.is_none() {
                return None;
            }
            Some(Expression::Binary(BinaryExpr {
                left: Box::new(left.unwrap_or_else(|| (*binary.left).clone())),
                right: Box::new(right.unwrap_or_else(|| (*binary.right).clone())),
                ..binary.clone()
            }))
        }
        Expression::Unary(unary) => {
            let operand = t.transform_expression(&unary.operand)?;
            Some(Expression::Unary(UnaryExpr {
                operand: Box::new(operand),
                ..unary.clone()
            }))
        }
        Expression::Match(match_expr) => {
            let scrutinee = match &match_expr.scrutinee {
                Some(scrutinee) => t.transform_expression(scrutinee).map(Box::new).map(Some),
                None => None,
            };
            let arms = transform_vec(&match_expr.arms, |a| t.transform_match_arm(a));
            if scrutinee.is_none() && arms.is_none() {
                return None;
            }
            Some(Expression::Match(MatchExpr {
                scrutinee: scrutinee.unwrap_or_else(|| match_expr.scrutinee.clone()),
                arms: arms.unwrap_or_else(|| match_expr.arms.clone()),
                ..match_expr.clone()
            }))
        }
        Expression::StructLiteral(literal) => {
            let field_values = transform_vec(&literal.field_values, |f| {
                t.transform_expression(&f.value).map(|value| FieldAssignment {
                    value,
                    ..f.clone()
                })
            })?;
            Some(Expression::StructLiteral(StructLiteral {
                field_values,
                ..literal.clone()
            }))
        }
    }
}

pub fn walk_match_arm<T: Transformer>(t: &mut T, arm: &MatchArm) -> Option<MatchArm> {
    let pattern = t.transform_pattern(&arm.pattern);
    let guard = match &arm.guard {
        Some(guard) => t.transform_expression(guard).map(Some),
        None => None,
    };
    let body = t.transform_expression(&arm.body);

    if pattern.is_none() && guard.is_none() && body.is_none() {
        return None;
    }

    Some(MatchArm {
        pattern: pattern.unwrap_or_else(|| arm.pattern.clone()),
        guard: guard.unwrap_or_else(|| arm.guard.clone()),
        body: body.unwrap_or_else(|| arm.body.clone()),
        ..arm.clone()
    })
}

pub fn walk_pattern<T: Transformer>(t: &mut T, pattern: &Pattern) -> Option<Pattern> {
    match pattern {
        Pattern::Wildcard(_) | Pattern::Binding(_) => None,
        Pattern::Literal(literal) => {
            let inner = t.transform_expression(&literal.literal)?;
            Some(Pattern::Literal(LiteralPattern {
                literal: Box::new(inner),
                ..literal.clone()
            }))
        }
        Pattern::Struct(struct_pattern) => {
            let fields = transform_vec(&struct_pattern.fields, |f| {
                let sub = t.transform_pattern(f.pattern.as_ref()?)?;
                Some(FieldPattern {
                    pattern: Some(sub),
                    ..f.clone()
                })
            })?;
            Some(Pattern::Struct(StructPattern {
                fields,
                ..struct_pattern.clone()
            }))
        }
    }
}

pub fn walk_type<T: Transformer>(t: &mut T, type_node: &TypeNode) -> Option<TypeNode> {
    match type_node {
        TypeNode::Builtin(_) | TypeNode::Named(_) => None,
        TypeNode::Optional(optional) => {
            let inner = t.transform_type(&optional.inner)?;
            Some(TypeNode::Optional(OptionalType {
                inner: Box::new(inner),
                ..optional.clone()
            }))
        }
        TypeNode::Array(array) => {
            let element_type = t.transform_type(&array.element_type)?;
            Some(TypeNode::Array(ArrayType {
                element_type: Box::new(element_type),
                ..array.clone()
            }))
        }
        TypeNode::Generic(generic) => {
            let type_args = transform_vec(&generic.type_args, |a| t.transform_type(a))?;
            Some(TypeNode::Generic(GenericType {
                type_args,
                ..generic.clone()
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build;
    use crate::parser::parse;

    struct Identity;
    impl Transformer for Identity {}

    /// Folds `<int> + <int>` into a single integer literal.
    struct ConstantFolder;

    impl Transformer for ConstantFolder {
        fn transform_expression(&mut self, expression: &Expression) -> Option<Expression> {
            let rewritten = walk_expression(self, expression);
            let current = rewritten.as_ref().unwrap_or(expression);

            if let Expression::Binary(binary) = current {
                if binary.operator == "+" {
                    if let (Expression::Int(left), Expression::Int(right)) =
                        (binary.left.as_ref(), binary.right.as_ref())
                    {
                        return Some(Expression::Int(IntLit {
                            value: left.value + right.value,
                            id: binary.id,
                            location: binary.location.clone(),
                        }));
                    }
                }
            }

            rewritten
        }
    }

    fn module_for(source: &str) -> ModuleNode {
        let result = parse(source, "<test>");
        build(&result.tree, "<test>")
    }

    #[test]
    fn test_identity_transform_returns_equal_module() {
        let module = module_for(
            r#"
struct Color { red, green, blue }
fn f(b: bool) -> int { match b { case TRUE => 1 + 2, case _ => 0 } }
statute "300" "Murder" {
    elements { mens_rea intent := "intention"; }
}
"#,
        );

        assert!(Identity.transform_module(&module).is_none());
        assert_eq!(apply(&mut Identity, &module), module);
    }

    #[test]
    fn test_constant_folding_rebuilds_changed_path_only() {
        let module = module_for("fn f() -> int { return 1 + 2 + 3; }");
        let folded = apply(&mut ConstantFolder, &module);

        let Statement::Return(ret) = &folded.function_defs[0].body.statements[0] else {
            panic!("expected return statement");
        };
        let Some(Expression::Int(int_lit)) = &ret.value else {
            panic!("expected folded integer, got {:?}", ret.value);
        };
        assert_eq!(int_lit.value, 6);
    }
}
