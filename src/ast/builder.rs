//! Folds a concrete syntax tree into the typed AST.
//!
//! The builder is deterministic and total: malformed or missing subtrees
//! become placeholder nodes (`Pass` expressions, the builtin `void` type)
//! rather than errors, so the analysis passes always have a module to work
//! with. Literal normalization happens here: money amounts lose their comma
//! separators and gain a currency tag, dates are parsed as ISO-8601,
//! duration components are aggregated per unit, and string escapes are
//! processed.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::parser::{SyntaxKind, SyntaxNode};

use super::literal::{Currency, DurationValue};
use super::nodes::*;

pub struct AstBuilder {
    file: String,
    next_id: NodeId,
}

impl AstBuilder {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            next_id: 0,
        }
    }

    /// Build a [`ModuleNode`] from the root of a parse tree.
    pub fn build(mut self, root: &SyntaxNode) -> ModuleNode {
        let location = self.loc(root);
        let id = self.fresh();

        let mut module = ModuleNode {
            imports: vec![],
            type_defs: vec![],
            function_defs: vec![],
            statutes: vec![],
            variables: vec![],
            references: vec![],
            assertions: vec![],
            id,
            location,
        };

        for child in root.child_nodes() {
            match child.kind {
                SyntaxKind::ImportStatement => module.imports.push(self.build_import(child)),
                SyntaxKind::ReferencingStatement => {
                    module.references.push(self.build_referencing(child))
                }
                SyntaxKind::AssertStatement => module.assertions.push(self.build_assert(child)),
                SyntaxKind::StructDefinition => module.type_defs.push(self.build_struct_def(child)),
                SyntaxKind::FunctionDefinition => {
                    module.function_defs.push(self.build_function_def(child))
                }
                SyntaxKind::StatuteBlock => module.statutes.push(self.build_statute(child)),
                SyntaxKind::VariableDeclaration => {
                    module.variables.push(self.build_variable_decl(child))
                }
                // Error subtrees contribute nothing to the AST.
                _ => {}
            }
        }

        module
    }

    fn fresh(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn loc(&self, node: &SyntaxNode) -> SourceLocation {
        SourceLocation::from_span(&node.span, &self.file)
    }

    // =====================================================================
    // Top-level declarations
    // =====================================================================

    fn build_import(&mut self, node: &SyntaxNode) -> ImportNode {
        let path = node
            .child_by_field("path")
            .map(|n| self.string_value(n))
            .unwrap_or_default();

        let imported_names: Vec<String> = node
            .children_of_kind(SyntaxKind::Identifier)
            .iter()
            .map(|n| n.text().to_string())
            .collect();
        let wildcard = node
            .children_of_kind(SyntaxKind::Operator)
            .iter()
            .any(|n| n.text() == "*");

        ImportNode {
            path,
            imported_names,
            wildcard,
            id: self.fresh(),
            location: self.loc(node),
        }
    }

    fn build_referencing(&mut self, node: &SyntaxNode) -> ReferencingStmt {
        let path = node
            .child_by_field("path")
            .map(|n| self.string_value(n))
            .unwrap_or_default();

        ReferencingStmt {
            path,
            id: self.fresh(),
            location: self.loc(node),
        }
    }

    fn build_assert(&mut self, node: &SyntaxNode) -> AssertStmt {
        let condition = match node.child_by_field("condition") {
            Some(n) => self.build_expression(n),
            None => self.bool_placeholder(node, true),
        };
        let message = node
            .child_by_field("message")
            .map(|n| self.build_string_lit(n));

        AssertStmt {
            condition,
            message,
            id: self.fresh(),
            location: self.loc(node),
        }
    }

    fn build_struct_def(&mut self, node: &SyntaxNode) -> StructDef {
        let name = node
            .child_by_field("name")
            .map(|n| n.text().to_string())
            .unwrap_or_default();

        let type_params = node
            .child_of_kind(SyntaxKind::TypeParameters)
            .map(|tp| {
                tp.children_of_kind(SyntaxKind::Identifier)
                    .iter()
                    .map(|n| n.text().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let fields = node
            .children_of_kind(SyntaxKind::FieldDefinition)
            .iter()
            .map(|n| self.build_field_def(n))
            .collect();

        StructDef {
            name,
            type_params,
            fields,
            id: self.fresh(),
            location: self.loc(node),
        }
    }

    fn build_field_def(&mut self, node: &SyntaxNode) -> FieldDef {
        let name = node
            .child_by_field("name")
            .map(|n| n.text().to_string())
            .unwrap_or_default();
        let type_annotation = node.child_by_field("type").map(|n| self.build_type(n));

        FieldDef {
            name,
            type_annotation,
            id: self.fresh(),
            location: self.loc(node),
        }
    }

    fn build_function_def(&mut self, node: &SyntaxNode) -> FunctionDef {
        let name = node
            .child_by_field("name")
            .map(|n| n.text().to_string())
            .unwrap_or_default();

        let params = node
            .child_of_kind(SyntaxKind::ParameterList)
            .map(|list| {
                list.children_of_kind(SyntaxKind::Parameter)
                    .iter()
                    .map(|n| self.build_param_def(n))
                    .collect()
            })
            .unwrap_or_default();

        let return_type = node.child_by_field("return_type").map(|n| self.build_type(n));

        let body = match node.child_of_kind(SyntaxKind::Block) {
            Some(block) => self.build_block(block),
            None => Block {
                statements: vec![],
                id: self.fresh(),
                location: self.loc(node),
            },
        };

        FunctionDef {
            name,
            params,
            return_type,
            body,
            id: self.fresh(),
            location: self.loc(node),
        }
    }

    fn build_param_def(&mut self, node: &SyntaxNode) -> ParamDef {
        let name = node
            .child_by_field("name")
            .map(|n| n.text().to_string())
            .unwrap_or_default();
        let type_annotation = match node.child_by_field("type") {
            Some(n) => self.build_type(n),
            None => self.void_type(node),
        };

        ParamDef {
            name,
            type_annotation,
            id: self.fresh(),
            location: self.loc(node),
        }
    }

    // =====================================================================
    // Statements
    // =====================================================================

    fn build_block(&mut self, node: &SyntaxNode) -> Block {
        let statements = node
            .child_nodes()
            .filter_map(|child| self.build_statement(child))
            .collect();

        Block {
            statements,
            id: self.fresh(),
            location: self.loc(node),
        }
    }

    fn build_statement(&mut self, node: &SyntaxNode) -> Option<Statement> {
        match node.kind {
            SyntaxKind::VariableDeclaration => {
                Some(Statement::VariableDecl(self.build_variable_decl(node)))
            }
            SyntaxKind::AssignmentStatement => {
                let target = match node.child_by_field("target") {
                    Some(n) => self.build_expression(n),
                    None => self.pass_placeholder(node),
                };
                let value = match node.child_by_field("value") {
                    Some(n) => self.build_expression(n),
                    None => self.pass_placeholder(node),
                };
                Some(Statement::Assignment(AssignmentStmt {
                    target,
                    value,
                    id: self.fresh(),
                    location: self.loc(node),
                }))
            }
            SyntaxKind::ReturnStatement => {
                let value = node.child_by_field("value").map(|n| self.build_expression(n));
                Some(Statement::Return(ReturnStmt {
                    value,
                    id: self.fresh(),
                    location: self.loc(node),
                }))
            }
            SyntaxKind::PassStatement => Some(Statement::Pass(PassStmt {
                id: self.fresh(),
                location: self.loc(node),
            })),
            SyntaxKind::ExpressionStatement => {
                let expression = match node.child_nodes().next() {
                    Some(n) => self.build_expression(n),
                    None => self.pass_placeholder(node),
                };
                Some(Statement::Expression(ExpressionStmt {
                    expression,
                    id: self.fresh(),
                    location: self.loc(node),
                }))
            }
            SyntaxKind::Error => None,
            _ => {
                let expression = self.build_expression(node);
                Some(Statement::Expression(ExpressionStmt {
                    expression,
                    id: self.fresh(),
                    location: self.loc(node),
                }))
            }
        }
    }

    fn build_variable_decl(&mut self, node: &SyntaxNode) -> VariableDecl {
        let type_annotation = match node.child_by_field("type") {
            Some(n) => self.build_type(n),
            None => self.void_type(node),
        };
        let name = node
            .child_by_field("name")
            .map(|n| n.text().to_string())
            .unwrap_or_default();
        let value = node.child_by_field("value").map(|n| self.build_expression(n));

        VariableDecl {
            type_annotation,
            name,
            value,
            id: self.fresh(),
            location: self.loc(node),
        }
    }

    // =====================================================================
    // Expressions
    // =====================================================================

    pub(crate) fn build_expression(&mut self, node: &SyntaxNode) -> Expression {
        match node.kind {
            SyntaxKind::IntegerLiteral => Expression::Int(IntLit {
                value: node.text().parse().unwrap_or_default(),
                id: self.fresh(),
                location: self.loc(node),
            }),
            SyntaxKind::FloatLiteral => Expression::Float(FloatLit {
                value: node.text().parse().unwrap_or_default(),
                id: self.fresh(),
                location: self.loc(node),
            }),
            SyntaxKind::BooleanLiteral => Expression::Bool(BoolLit {
                value: matches!(node.text(), "TRUE" | "true"),
                id: self.fresh(),
                location: self.loc(node),
            }),
            SyntaxKind::StringLiteral => Expression::Str(self.build_string_lit(node)),
            SyntaxKind::MoneyLiteral => Expression::Money(self.build_money(node)),
            SyntaxKind::PercentLiteral => {
                let value = node
                    .child_of_kind(SyntaxKind::IntegerLiteral)
                    .and_then(|n| BigDecimal::from_str(n.text()).ok())
                    .unwrap_or_default();
                Expression::Percent(PercentLit {
                    value,
                    id: self.fresh(),
                    location: self.loc(node),
                })
            }
            SyntaxKind::DateLiteral => {
                let value = NaiveDate::parse_from_str(node.text(), "%Y-%m-%d")
                    .unwrap_or_default();
                Expression::Date(DateLit {
                    value,
                    id: self.fresh(),
                    location: self.loc(node),
                })
            }
            SyntaxKind::DurationLiteral => Expression::Duration(self.build_duration(node)),
            SyntaxKind::Identifier => Expression::Identifier(Identifier {
                name: node.text().to_string(),
                id: self.fresh(),
                location: self.loc(node),
            }),
            SyntaxKind::FieldAccess => {
                let base = match node.child_by_field("base") {
                    Some(n) => self.build_expression(n),
                    None => self.pass_placeholder(node),
                };
                let field_name = node
                    .child_by_field("field")
                    .map(|n| n.text().to_string())
                    .unwrap_or_default();
                Expression::FieldAccess(FieldAccess {
                    base: Box::new(base),
                    field_name,
                    id: self.fresh(),
                    location: self.loc(node),
                })
            }
            SyntaxKind::IndexAccess => {
                let base = match node.child_by_field("base") {
                    Some(n) => self.build_expression(n),
                    None => self.pass_placeholder(node),
                };
                let index = match node.child_by_field("index") {
                    Some(n) => self.build_expression(n),
                    None => self.pass_placeholder(node),
                };
                Expression::IndexAccess(IndexAccess {
                    base: Box::new(base),
                    index: Box::new(index),
                    id: self.fresh(),
                    location: self.loc(node),
                })
            }
            SyntaxKind::FunctionCall => {
                let callee = match node.child_by_field("callee") {
                    Some(n) => self.build_expression(n),
                    None => self.pass_placeholder(node),
                };
                let args = node
                    .child_of_kind(SyntaxKind::ArgumentList)
                    .map(|list| {
                        list.child_nodes()
                            .map(|n| self.build_expression(n))
                            .collect()
                    })
                    .unwrap_or_default();
                Expression::Call(FunctionCall {
                    callee: Box::new(callee),
                    args,
                    id: self.fresh(),
                    location: self.loc(node),
                })
            }
            SyntaxKind::BinaryExpression => {
                let left = match node.child_by_field("left") {
                    Some(n) => self.build_expression(n),
                    None => self.pass_placeholder(node),
                };
                let operator = node
                    .child_by_field("operator")
                    .map(|n| n.text().to_string())
                    .unwrap_or_else(|| "?".into());
                let right = match node.child_by_field("right") {
                    Some(n) => self.build_expression(n),
                    None => self.pass_placeholder(node),
                };
                Expression::Binary(BinaryExpr {
                    left: Box::new(left),
                    operator,
                    right: Box::new(right),
                    id: self.fresh(),
                    location: self.loc(node),
                })
            }
            SyntaxKind::UnaryExpression => {
                let operator = node
                    .child_by_field("operator")
                    .map(|n| n.text().to_string())
                    .unwrap_or_else(|| "?".into());
                let operand = match node.child_by_field("operand") {
                    Some(n) => self.build_expression(n),
                    None => self.pass_placeholder(node),
                };
                Expression::Unary(UnaryExpr {
                    operator,
                    operand: Box::new(operand),
                    id: self.fresh(),
                    location: self.loc(node),
                })
            }
            SyntaxKind::ParenthesizedExpression => match node.child_nodes().next() {
                Some(inner) => self.build_expression(inner),
                None => self.pass_placeholder(node),
            },
            SyntaxKind::MatchExpression => Expression::Match(self.build_match_expr(node)),
            SyntaxKind::StructLiteral => {
                let struct_name = node
                    .child_by_field("type_name")
                    .map(|n| n.text().to_string());
                let field_values = node
                    .children_of_kind(SyntaxKind::FieldAssignment)
                    .iter()
                    .map(|n| self.build_field_assignment(n))
                    .collect();
                Expression::StructLiteral(StructLiteral {
                    struct_name,
                    field_values,
                    id: self.fresh(),
                    location: self.loc(node),
                })
            }
            SyntaxKind::PassExpression => self.pass_placeholder(node),
            _ => {
                // Unknown nodes with a single meaningful child are unwrapped
                // transparently; anything else becomes a placeholder.
                let meaningful: Vec<&SyntaxNode> = node.child_nodes().collect();
                if meaningful.len() == 1 {
                    self.build_expression(meaningful[0])
                } else {
                    self.pass_placeholder(node)
                }
            }
        }
    }

    fn build_field_assignment(&mut self, node: &SyntaxNode) -> FieldAssignment {
        let name = node
            .child_by_field("name")
            .map(|n| n.text().to_string())
            .unwrap_or_default();
        let value = match node.child_by_field("value") {
            Some(n) => self.build_expression(n),
            None => self.pass_placeholder(node),
        };

        FieldAssignment {
            name,
            value,
            id: self.fresh(),
            location: self.loc(node),
        }
    }

    fn build_string_lit(&mut self, node: &SyntaxNode) -> StringLit {
        let raw = node.text();
        let value = unescape::unescape(raw).unwrap_or_else(|| raw.to_string());

        StringLit {
            value,
            id: self.fresh(),
            location: self.loc(node),
        }
    }

    fn build_money(&mut self, node: &SyntaxNode) -> MoneyLit {
        let symbol = node
            .child_of_kind(SyntaxKind::CurrencySymbol)
            .map(|n| n.text().to_string())
            .unwrap_or_else(|| "$".into());
        let currency = Currency::from_symbol(&symbol).unwrap_or(Currency::USD);

        let amount_text = node
            .child_of_kind(SyntaxKind::MoneyAmount)
            .map(|n| n.text().replace(',', ""))
            .unwrap_or_else(|| "0".into());
        let amount = BigDecimal::from_str(&amount_text).unwrap_or_default();

        MoneyLit {
            currency,
            amount,
            id: self.fresh(),
            location: self.loc(node),
        }
    }

    fn build_duration(&mut self, node: &SyntaxNode) -> DurationLit {
        let mut value = DurationValue::default();

        let children: Vec<&SyntaxNode> = node.child_nodes().collect();
        let mut i = 0;
        while i < children.len() {
            if children[i].kind == SyntaxKind::IntegerLiteral {
                let count: i64 = children[i].text().parse().unwrap_or_default();
                if let Some(unit) = children.get(i + 1) {
                    if unit.kind == SyntaxKind::DurationUnit {
                        match unit.text() {
                            "year" | "years" => value.years += count,
                            "month" | "months" => value.months += count,
                            "day" | "days" => value.days += count,
                            "hour" | "hours" => value.hours += count,
                            "minute" | "minutes" => value.minutes += count,
                            "second" | "seconds" => value.seconds += count,
                            _ => {}
                        }
                        i += 1;
                    }
                }
            }
            i += 1;
        }

        DurationLit {
            value,
            id: self.fresh(),
            location: self.loc(node),
        }
    }

    // =====================================================================
    // Match expressions and patterns
    // =====================================================================

    fn build_match_expr(&mut self, node: &SyntaxNode) -> MatchExpr {
        let scrutinee = node
            .child_by_field("scrutinee")
            .map(|n| Box::new(self.build_expression(n)));

        let arms = node
            .children_of_kind(SyntaxKind::MatchArm)
            .iter()
            .map(|n| self.build_match_arm(n))
            .collect();

        MatchExpr {
            scrutinee,
            arms,
            ensure_exhaustiveness: true,
            id: self.fresh(),
            location: self.loc(node),
        }
    }

    fn build_match_arm(&mut self, node: &SyntaxNode) -> MatchArm {
        let pattern = match node.child_by_field("pattern") {
            Some(n) => self.build_pattern(n),
            None => Pattern::Wildcard(WildcardPattern {
                id: self.fresh(),
                location: self.loc(node),
            }),
        };
        let guard = node.child_by_field("guard").map(|n| self.build_expression(n));
        let body = match node.child_by_field("body") {
            Some(n) => self.build_expression(n),
            None => self.pass_placeholder(node),
        };

        MatchArm {
            pattern,
            guard,
            body,
            id: self.fresh(),
            location: self.loc(node),
        }
    }

    fn build_pattern(&mut self, node: &SyntaxNode) -> Pattern {
        match node.kind {
            SyntaxKind::WildcardPattern => Pattern::Wildcard(WildcardPattern {
                id: self.fresh(),
                location: self.loc(node),
            }),
            SyntaxKind::LiteralPattern => {
                let literal = match node.child_nodes().next() {
                    Some(n) => self.build_expression(n),
                    None => self.pass_placeholder(node),
                };
                Pattern::Literal(LiteralPattern {
                    literal: Box::new(literal),
                    id: self.fresh(),
                    location: self.loc(node),
                })
            }
            SyntaxKind::BindingPattern | SyntaxKind::Identifier => {
                let name = node.text().to_string();
                if name == "_" {
                    Pattern::Wildcard(WildcardPattern {
                        id: self.fresh(),
                        location: self.loc(node),
                    })
                } else {
                    Pattern::Binding(BindingPattern {
                        name,
                        id: self.fresh(),
                        location: self.loc(node),
                    })
                }
            }
            SyntaxKind::StructPattern => {
                let type_name = node
                    .child_by_field("type_name")
                    .map(|n| n.text().to_string())
                    .unwrap_or_default();
                let fields = node
                    .children_of_kind(SyntaxKind::FieldPattern)
                    .iter()
                    .map(|n| self.build_field_pattern(n))
                    .collect();
                Pattern::Struct(StructPattern {
                    type_name,
                    fields,
                    id: self.fresh(),
                    location: self.loc(node),
                })
            }
            _ => Pattern::Wildcard(WildcardPattern {
                id: self.fresh(),
                location: self.loc(node),
            }),
        }
    }

    fn build_field_pattern(&mut self, node: &SyntaxNode) -> FieldPattern {
        let name = node
            .child_by_field("name")
            .map(|n| n.text().to_string())
            .unwrap_or_default();
        let pattern = node.child_by_field("pattern").map(|n| self.build_pattern(n));

        FieldPattern {
            name,
            pattern,
            id: self.fresh(),
            location: self.loc(node),
        }
    }

    // =====================================================================
    // Types
    // =====================================================================

    fn build_type(&mut self, node: &SyntaxNode) -> TypeNode {
        match node.kind {
            SyntaxKind::BuiltinType => TypeNode::Builtin(BuiltinType {
                name: node.text().to_string(),
                id: self.fresh(),
                location: self.loc(node),
            }),
            SyntaxKind::NamedType | SyntaxKind::Identifier => TypeNode::Named(NamedType {
                name: node.text().to_string(),
                id: self.fresh(),
                location: self.loc(node),
            }),
            SyntaxKind::OptionalType => {
                let inner = match node.child_nodes().next() {
                    Some(n) => self.build_type(n),
                    None => self.void_type(node),
                };
                TypeNode::Optional(OptionalType {
                    inner: Box::new(inner),
                    id: self.fresh(),
                    location: self.loc(node),
                })
            }
            SyntaxKind::ArrayType => {
                let element = match node.child_nodes().next() {
                    Some(n) => self.build_type(n),
                    None => self.void_type(node),
                };
                TypeNode::Array(ArrayType {
                    element_type: Box::new(element),
                    id: self.fresh(),
                    location: self.loc(node),
                })
            }
            SyntaxKind::GenericType => {
                let mut children = node.child_nodes();
                let base = children
                    .next()
                    .map(|n| n.text().to_string())
                    .unwrap_or_default();
                let type_args = children.map(|n| self.build_type(n)).collect();
                TypeNode::Generic(GenericType {
                    base,
                    type_args,
                    id: self.fresh(),
                    location: self.loc(node),
                })
            }
            _ => self.void_type(node),
        }
    }

    // =====================================================================
    // Statutes
    // =====================================================================

    fn build_statute(&mut self, node: &SyntaxNode) -> StatuteNode {
        let section_number = node
            .child_by_field("section_number")
            .map(|n| self.string_value(n))
            .unwrap_or_default();
        let title = node.child_by_field("title").map(|n| self.build_string_lit(n));

        let mut definitions = vec![];
        let mut elements = vec![];
        let mut penalty = None;
        let mut illustrations = vec![];

        for child in node.child_nodes() {
            match child.kind {
                SyntaxKind::DefinitionsBlock => {
                    for entry in child.children_of_kind(SyntaxKind::DefinitionEntry) {
                        definitions.push(self.build_definition_entry(entry));
                    }
                }
                SyntaxKind::ElementsBlock => {
                    for entry in child.children_of_kind(SyntaxKind::ElementEntry) {
                        elements.push(self.build_element(entry));
                    }
                }
                SyntaxKind::PenaltyBlock => penalty = Some(self.build_penalty(child)),
                SyntaxKind::IllustrationsBlock => {
                    for entry in child.children_of_kind(SyntaxKind::IllustrationEntry) {
                        illustrations.push(self.build_illustration(entry));
                    }
                }
                _ => {}
            }
        }

        StatuteNode {
            section_number,
            title,
            definitions,
            elements,
            penalty,
            illustrations,
            id: self.fresh(),
            location: self.loc(node),
        }
    }

    fn build_definition_entry(&mut self, node: &SyntaxNode) -> DefinitionEntry {
        let term = node
            .child_by_field("term")
            .map(|n| self.string_value(n))
            .unwrap_or_default();
        let definition = match node.child_by_field("definition") {
            Some(n) => self.build_string_lit(n),
            None => self.empty_string_lit(node),
        };

        DefinitionEntry {
            term,
            definition,
            id: self.fresh(),
            location: self.loc(node),
        }
    }

    fn build_element(&mut self, node: &SyntaxNode) -> ElementNode {
        let element_type = node
            .child_by_field("element_type")
            .and_then(|n| ElementType::from_keyword(n.text()))
            .unwrap_or(ElementType::ActusReus);
        let name = node
            .child_by_field("name")
            .map(|n| n.text().to_string())
            .unwrap_or_default();
        let description = match node.child_by_field("description") {
            Some(n) => self.build_expression(n),
            None => Expression::Str(self.empty_string_lit(node)),
        };

        ElementNode {
            element_type,
            name,
            description,
            id: self.fresh(),
            location: self.loc(node),
        }
    }

    fn build_penalty(&mut self, node: &SyntaxNode) -> PenaltyNode {
        let mut imprisonment_min = None;
        let mut imprisonment_max = None;
        let mut fine_min = None;
        let mut fine_max = None;
        let mut supplementary = None;

        for child in node.child_nodes() {
            match child.kind {
                SyntaxKind::ImprisonmentClause => {
                    if let Some(range) = child.child_of_kind(SyntaxKind::DurationRange) {
                        let durations = range.children_of_kind(SyntaxKind::DurationLiteral);
                        if durations.len() >= 2 {
                            imprisonment_min = Some(self.build_duration(durations[0]));
                            imprisonment_max = Some(self.build_duration(durations[1]));
                        }
                    } else if let Some(single) =
                        child.child_of_kind(SyntaxKind::DurationLiteral)
                    {
                        imprisonment_max = Some(self.build_duration(single));
                    }
                }
                SyntaxKind::FineClause => {
                    if let Some(range) = child.child_of_kind(SyntaxKind::MoneyRange) {
                        let moneys = range.children_of_kind(SyntaxKind::MoneyLiteral);
                        if moneys.len() >= 2 {
                            fine_min = Some(self.build_money(moneys[0]));
                            fine_max = Some(self.build_money(moneys[1]));
                        }
                    } else if let Some(single) = child.child_of_kind(SyntaxKind::MoneyLiteral) {
                        fine_max = Some(self.build_money(single));
                    }
                }
                SyntaxKind::SupplementaryClause => {
                    supplementary = child
                        .child_of_kind(SyntaxKind::StringLiteral)
                        .map(|n| self.build_string_lit(n));
                }
                _ => {}
            }
        }

        PenaltyNode {
            imprisonment_min,
            imprisonment_max,
            fine_min,
            fine_max,
            supplementary,
            id: self.fresh(),
            location: self.loc(node),
        }
    }

    fn build_illustration(&mut self, node: &SyntaxNode) -> IllustrationNode {
        let label = node.child_by_field("label").map(|n| n.text().to_string());
        let description = match node.child_by_field("description") {
            Some(n) => self.build_string_lit(n),
            None => self.empty_string_lit(node),
        };

        IllustrationNode {
            label,
            description,
            id: self.fresh(),
            location: self.loc(node),
        }
    }

    // =====================================================================
    // Placeholders
    // =====================================================================

    fn pass_placeholder(&mut self, node: &SyntaxNode) -> Expression {
        Expression::Pass(PassExpr {
            id: self.fresh(),
            location: self.loc(node),
        })
    }

    fn bool_placeholder(&mut self, node: &SyntaxNode, value: bool) -> Expression {
        Expression::Bool(BoolLit {
            value,
            id: self.fresh(),
            location: self.loc(node),
        })
    }

    fn void_type(&mut self, node: &SyntaxNode) -> TypeNode {
        TypeNode::Builtin(BuiltinType {
            name: "void".into(),
            id: self.fresh(),
            location: self.loc(node),
        })
    }

    fn empty_string_lit(&mut self, node: &SyntaxNode) -> StringLit {
        StringLit {
            value: String::new(),
            id: self.fresh(),
            location: self.loc(node),
        }
    }

    /// Unescaped contents of a string-literal leaf.
    fn string_value(&self, node: &SyntaxNode) -> String {
        let raw = node.text();
        unescape::unescape(raw).unwrap_or_else(|| raw.to_string())
    }
}

/// Convenience entry point: build the AST for an already-parsed file.
pub fn build(root: &SyntaxNode, file: &str) -> ModuleNode {
    AstBuilder::new(file).build(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn module_for(source: &str) -> ModuleNode {
        let result = parse(source, "<test>");
        assert!(result.is_valid(), "parse errors: {:?}", result.errors);
        build(&result.tree, "<test>")
    }

    #[test]
    fn test_money_normalization() {
        let module = module_for("money m := $1,000.50;");
        let decl = &module.variables[0];
        let Some(Expression::Money(money)) = &decl.value else {
            panic!("expected money literal, got {:?}", decl.value);
        };

        assert_eq!(money.currency, Currency::USD);
        assert_eq!(money.amount, BigDecimal::from_str("1000.50").unwrap());
    }

    #[test]
    fn test_duration_aggregation() {
        let module = module_for("duration d := 1 year 2 months 15 days;");
        let Some(Expression::Duration(duration)) = &module.variables[0].value else {
            panic!("expected duration literal");
        };

        assert_eq!(
            duration.value,
            DurationValue {
                years: 1,
                months: 2,
                days: 15,
                hours: 0,
                minutes: 0,
                seconds: 0,
            }
        );
    }

    #[test]
    fn test_string_escapes() {
        let module = module_for(r#"string s := "line\nbreak \"quoted\"";"#);
        let Some(Expression::Str(string)) = &module.variables[0].value else {
            panic!("expected string literal");
        };
        assert_eq!(string.value, "line\nbreak \"quoted\"");
    }

    #[test]
    fn test_date_literal() {
        let module = module_for("date d := 2020-01-31;");
        let Some(Expression::Date(date)) = &module.variables[0].value else {
            panic!("expected date literal");
        };
        assert_eq!(
            date.value,
            NaiveDate::from_ymd_opt(2020, 1, 31).unwrap()
        );
    }

    #[test]
    fn test_enum_struct_classification() {
        let module = module_for("struct Color { red, green, blue }");
        let def = &module.type_defs[0];
        assert!(def.is_enum());
        assert_eq!(def.variants(), vec!["red", "green", "blue"]);

        let module = module_for("struct Person { name: string, age: int }");
        assert!(!module.type_defs[0].is_enum());
    }

    #[test]
    fn test_statute_shape() {
        let module = module_for(
            r#"
statute "378" "Theft" {
    elements {
        actus_reus taking := "moves property out of possession";
        mens_rea dishonesty := "intends to take dishonestly";
    }
    penalty {
        imprisonment := 3 years;
    }
}
"#,
        );

        let statute = &module.statutes[0];
        assert_eq!(statute.section_number, "378");
        assert_eq!(statute.title.as_ref().unwrap().value, "Theft");
        assert_eq!(statute.elements.len(), 2);
        assert_eq!(statute.elements[0].element_type, ElementType::ActusReus);

        let penalty = statute.penalty.as_ref().unwrap();
        assert!(penalty.imprisonment_min.is_none());
        assert_eq!(penalty.imprisonment_max.as_ref().unwrap().value.years, 3);
    }

    #[test]
    fn test_child_locations_inside_parent() {
        let module = module_for("fn f(x: int) -> int { return x + 1; }");
        let func = &module.function_defs[0];
        let module_loc = &module.location;

        assert!(func.location.start_byte >= module_loc.start_byte);
        assert!(func.location.end_byte <= module_loc.end_byte);

        let Statement::Return(ret) = &func.body.statements[0] else {
            panic!("expected return");
        };
        assert!(ret.location.start_byte >= func.location.start_byte);
        assert!(ret.location.end_byte <= func.location.end_byte);
    }

    #[test]
    fn test_match_arms_and_guard() {
        let module = module_for(
            "fn f(n: int) -> int { match n { case 0 => 1 case x if x > 0 => 2 case _ => 3 } }",
        );
        let Statement::Expression(stmt) = &module.function_defs[0].body.statements[0] else {
            panic!("expected expression statement");
        };
        let Expression::Match(match_expr) = &stmt.expression else {
            panic!("expected match");
        };

        assert!(match_expr.scrutinee.is_some());
        assert!(match_expr.ensure_exhaustiveness);
        assert_eq!(match_expr.arms.len(), 3);
        assert!(matches!(match_expr.arms[0].pattern, Pattern::Literal(_)));
        assert!(match_expr.arms[1].guard.is_some());
        assert!(matches!(match_expr.arms[2].pattern, Pattern::Wildcard(_)));
    }
}
