//! Typed, immutable AST for Yuho modules.
//!
//! Every node carries a [`NodeId`] assigned at construction and a
//! [`SourceLocation`]. Analysis results live in side tables keyed by node
//! id, never on the nodes themselves.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::lexer::Span;

use super::literal::{Currency, DurationValue};

/// Identity of an AST node, unique within its module.
pub type NodeId = u32;

/// Full source position of a node. Lines and columns are 1-indexed, byte
/// offsets are 0-indexed into the original UTF-8 source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: usize,
    pub col: usize,
    pub end_line: usize,
    pub end_col: usize,
    pub start_byte: usize,
    pub end_byte: usize,
}

impl SourceLocation {
    pub fn from_span(span: &Span, file: &str) -> Self {
        Self {
            file: file.to_string(),
            line: span.line,
            col: span.col,
            end_line: span.end_line,
            end_col: span.end_col,
            start_byte: span.start_byte,
            end_byte: span.end_byte,
        }
    }
}

// =========================================================================
// Types
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum TypeNode {
    Builtin(BuiltinType),
    Named(NamedType),
    Optional(OptionalType),
    Array(ArrayType),
    Generic(GenericType),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuiltinType {
    pub name: String,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedType {
    pub name: String,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionalType {
    pub inner: Box<TypeNode>,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayType {
    pub element_type: Box<TypeNode>,
    pub id: NodeId,
    pub location: SourceLocation,
}

/// Type constructor application. Treated as opaque by inference: only the
/// constructor name is tracked.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericType {
    pub base: String,
    pub type_args: Vec<TypeNode>,
    pub id: NodeId,
    pub location: SourceLocation,
}

impl TypeNode {
    pub fn id(&self) -> NodeId {
        match self {
            TypeNode::Builtin(n) => n.id,
            TypeNode::Named(n) => n.id,
            TypeNode::Optional(n) => n.id,
            TypeNode::Array(n) => n.id,
            TypeNode::Generic(n) => n.id,
        }
    }

    pub fn location(&self) -> &SourceLocation {
        match self {
            TypeNode::Builtin(n) => &n.location,
            TypeNode::Named(n) => &n.location,
            TypeNode::Optional(n) => &n.location,
            TypeNode::Array(n) => &n.location,
            TypeNode::Generic(n) => &n.location,
        }
    }

    /// Human-readable rendering used by diagnostics and transpilers.
    pub fn display_name(&self) -> String {
        match self {
            TypeNode::Builtin(n) => n.name.clone(),
            TypeNode::Named(n) => n.name.clone(),
            TypeNode::Optional(n) => format!("{}?", n.inner.display_name()),
            TypeNode::Array(n) => format!("[{}]", n.element_type.display_name()),
            TypeNode::Generic(n) => {
                let args: Vec<String> = n.type_args.iter().map(|a| a.display_name()).collect();
                format!("{}<{}>", n.base, args.join(", "))
            }
        }
    }
}

// =========================================================================
// Literals
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct IntLit {
    pub value: i64,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FloatLit {
    pub value: f64,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoolLit {
    pub value: bool,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringLit {
    pub value: String,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoneyLit {
    pub currency: Currency,
    pub amount: BigDecimal,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PercentLit {
    pub value: BigDecimal,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DateLit {
    pub value: NaiveDate,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DurationLit {
    pub value: DurationValue,
    pub id: NodeId,
    pub location: SourceLocation,
}

// =========================================================================
// Expressions
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Int(IntLit),
    Float(FloatLit),
    Bool(BoolLit),
    Str(StringLit),
    Money(MoneyLit),
    Percent(PercentLit),
    Date(DateLit),
    Duration(DurationLit),
    Identifier(Identifier),
    FieldAccess(FieldAccess),
    IndexAccess(IndexAccess),
    Call(FunctionCall),
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Match(MatchExpr),
    StructLiteral(StructLiteral),
    /// Placeholder with no computational meaning.
    Pass(PassExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldAccess {
    pub base: Box<Expression>,
    pub field_name: String,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexAccess {
    pub base: Box<Expression>,
    pub index: Box<Expression>,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub callee: Box<Expression>,
    pub args: Vec<Expression>,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub left: Box<Expression>,
    pub operator: String,
    pub right: Box<Expression>,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub operator: String,
    pub operand: Box<Expression>,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchExpr {
    pub scrutinee: Option<Box<Expression>>,
    pub arms: Vec<MatchArm>,
    pub ensure_exhaustiveness: bool,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub guard: Option<Expression>,
    pub body: Expression,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructLiteral {
    pub struct_name: Option<String>,
    pub field_values: Vec<FieldAssignment>,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldAssignment {
    pub name: String,
    pub value: Expression,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PassExpr {
    pub id: NodeId,
    pub location: SourceLocation,
}

impl Expression {
    pub fn id(&self) -> NodeId {
        match self {
            Expression::Int(n) => n.id,
            Expression::Float(n) => n.id,
            Expression::Bool(n) => n.id,
            Expression::Str(n) => n.id,
            Expression::Money(n) => n.id,
            Expression::Percent(n) => n.id,
            Expression::Date(n) => n.id,
            Expression::Duration(n) => n.id,
            Expression::Identifier(n) => n.id,
            Expression::FieldAccess(n) => n.id,
            Expression::IndexAccess(n) => n.id,
            Expression::Call(n) => n.id,
            Expression::Binary(n) => n.id,
            Expression::Unary(n) => n.id,
            Expression::Match(n) => n.id,
            Expression::StructLiteral(n) => n.id,
            Expression::Pass(n) => n.id,
        }
    }

    pub fn location(&self) -> &SourceLocation {
        match self {
            Expression::Int(n) => &n.location,
            Expression::Float(n) => &n.location,
            Expression::Bool(n) => &n.location,
            Expression::Str(n) => &n.location,
            Expression::Money(n) => &n.location,
            Expression::Percent(n) => &n.location,
            Expression::Date(n) => &n.location,
            Expression::Duration(n) => &n.location,
            Expression::Identifier(n) => &n.location,
            Expression::FieldAccess(n) => &n.location,
            Expression::IndexAccess(n) => &n.location,
            Expression::Call(n) => &n.location,
            Expression::Binary(n) => &n.location,
            Expression::Unary(n) => &n.location,
            Expression::Match(n) => &n.location,
            Expression::StructLiteral(n) => &n.location,
            Expression::Pass(n) => &n.location,
        }
    }
}

// =========================================================================
// Patterns
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Wildcard(WildcardPattern),
    Binding(BindingPattern),
    Literal(LiteralPattern),
    Struct(StructPattern),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WildcardPattern {
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BindingPattern {
    pub name: String,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiteralPattern {
    pub literal: Box<Expression>,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructPattern {
    pub type_name: String,
    pub fields: Vec<FieldPattern>,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldPattern {
    pub name: String,
    pub pattern: Option<Pattern>,
    pub id: NodeId,
    pub location: SourceLocation,
}

impl Pattern {
    pub fn id(&self) -> NodeId {
        match self {
            Pattern::Wildcard(n) => n.id,
            Pattern::Binding(n) => n.id,
            Pattern::Literal(n) => n.id,
            Pattern::Struct(n) => n.id,
        }
    }

    pub fn location(&self) -> &SourceLocation {
        match self {
            Pattern::Wildcard(n) => &n.location,
            Pattern::Binding(n) => &n.location,
            Pattern::Literal(n) => &n.location,
            Pattern::Struct(n) => &n.location,
        }
    }
}

// =========================================================================
// Statements
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    VariableDecl(VariableDecl),
    Assignment(AssignmentStmt),
    Return(ReturnStmt),
    Pass(PassStmt),
    Expression(ExpressionStmt),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    pub type_annotation: TypeNode,
    pub name: String,
    pub value: Option<Expression>,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentStmt {
    pub target: Expression,
    pub value: Expression,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub value: Option<Expression>,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PassStmt {
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStmt {
    pub expression: Expression,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub id: NodeId,
    pub location: SourceLocation,
}

impl Statement {
    pub fn id(&self) -> NodeId {
        match self {
            Statement::VariableDecl(n) => n.id,
            Statement::Assignment(n) => n.id,
            Statement::Return(n) => n.id,
            Statement::Pass(n) => n.id,
            Statement::Expression(n) => n.id,
        }
    }

    pub fn location(&self) -> &SourceLocation {
        match self {
            Statement::VariableDecl(n) => &n.location,
            Statement::Assignment(n) => &n.location,
            Statement::Return(n) => &n.location,
            Statement::Pass(n) => &n.location,
            Statement::Expression(n) => &n.location,
        }
    }
}

// =========================================================================
// Top-level declarations
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ImportNode {
    pub path: String,
    pub imported_names: Vec<String>,
    pub wildcard: bool,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferencingStmt {
    pub path: String,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssertStmt {
    pub condition: Expression,
    pub message: Option<StringLit>,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub name: String,
    pub type_params: Vec<String>,
    pub fields: Vec<FieldDef>,
    pub id: NodeId,
    pub location: SourceLocation,
}

/// A struct member. A field with no type annotation is an enum variant; a
/// struct containing only such fields is a sum type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub type_annotation: Option<TypeNode>,
    pub id: NodeId,
    pub location: SourceLocation,
}

impl StructDef {
    pub fn is_enum(&self) -> bool {
        !self.fields.is_empty() && self.fields.iter().all(|f| f.type_annotation.is_none())
    }

    pub fn variants(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.type_annotation.is_none())
            .map(|f| f.name.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDef {
    pub name: String,
    pub type_annotation: TypeNode,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<ParamDef>,
    pub return_type: Option<TypeNode>,
    pub body: Block,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    ActusReus,
    MensRea,
    Circumstance,
}

impl ElementType {
    pub fn from_keyword(text: &str) -> Option<ElementType> {
        match text {
            "actus_reus" => Some(ElementType::ActusReus),
            "mens_rea" => Some(ElementType::MensRea),
            "circumstance" => Some(ElementType::Circumstance),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            ElementType::ActusReus => "actus_reus",
            ElementType::MensRea => "mens_rea",
            ElementType::Circumstance => "circumstance",
        }
    }

    /// Label used in prose output.
    pub fn label(&self) -> &'static str {
        match self {
            ElementType::ActusReus => "Actus reus",
            ElementType::MensRea => "Mens rea",
            ElementType::Circumstance => "Circumstance",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionEntry {
    pub term: String,
    pub definition: StringLit,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementNode {
    pub element_type: ElementType,
    pub name: String,
    pub description: Expression,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PenaltyNode {
    pub imprisonment_min: Option<DurationLit>,
    pub imprisonment_max: Option<DurationLit>,
    pub fine_min: Option<MoneyLit>,
    pub fine_max: Option<MoneyLit>,
    pub supplementary: Option<StringLit>,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IllustrationNode {
    pub label: Option<String>,
    pub description: StringLit,
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatuteNode {
    pub section_number: String,
    pub title: Option<StringLit>,
    pub definitions: Vec<DefinitionEntry>,
    pub elements: Vec<ElementNode>,
    pub penalty: Option<PenaltyNode>,
    pub illustrations: Vec<IllustrationNode>,
    pub id: NodeId,
    pub location: SourceLocation,
}

/// Root of a module AST. Owns all nodes; declaration lists preserve source
/// order within each category.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleNode {
    pub imports: Vec<ImportNode>,
    pub type_defs: Vec<StructDef>,
    pub function_defs: Vec<FunctionDef>,
    pub statutes: Vec<StatuteNode>,
    pub variables: Vec<VariableDecl>,
    pub references: Vec<ReferencingStmt>,
    pub assertions: Vec<AssertStmt>,
    pub id: NodeId,
    pub location: SourceLocation,
}

impl ModuleNode {
    /// Look up an enum-style struct definition by name.
    pub fn enum_def(&self, name: &str) -> Option<&StructDef> {
        self.type_defs
            .iter()
            .find(|s| s.name == name && s.is_enum())
    }

    pub fn struct_def(&self, name: &str) -> Option<&StructDef> {
        self.type_defs.iter().find(|s| s.name == name)
    }

    pub fn function_def(&self, name: &str) -> Option<&FunctionDef> {
        self.function_defs.iter().find(|f| f.name == name)
    }
}
