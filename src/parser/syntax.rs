use crate::lexer::{Span, Token};

/// Node kinds of the concrete syntax tree. One kind per grammar rule, plus
/// leaf kinds for the token classes the AST builder cares about and an
/// `Error` kind for recovered subtrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    SourceFile,

    ImportStatement,
    ReferencingStatement,
    AssertStatement,
    StructDefinition,
    TypeParameters,
    FieldDefinition,
    FunctionDefinition,
    ParameterList,
    Parameter,
    StatuteBlock,
    DefinitionsBlock,
    DefinitionEntry,
    ElementsBlock,
    ElementEntry,
    PenaltyBlock,
    ImprisonmentClause,
    FineClause,
    SupplementaryClause,
    DurationRange,
    MoneyRange,
    IllustrationsBlock,
    IllustrationEntry,

    Block,
    VariableDeclaration,
    AssignmentStatement,
    ReturnStatement,
    PassStatement,
    ExpressionStatement,

    BinaryExpression,
    UnaryExpression,
    FieldAccess,
    IndexAccess,
    FunctionCall,
    ArgumentList,
    ParenthesizedExpression,
    MatchExpression,
    MatchArm,
    StructLiteral,
    FieldAssignment,
    PassExpression,

    WildcardPattern,
    LiteralPattern,
    BindingPattern,
    StructPattern,
    FieldPattern,

    BuiltinType,
    NamedType,
    OptionalType,
    ArrayType,
    GenericType,

    Identifier,
    IntegerLiteral,
    FloatLiteral,
    BooleanLiteral,
    StringLiteral,
    MoneyLiteral,
    CurrencySymbol,
    MoneyAmount,
    PercentLiteral,
    DateLiteral,
    DurationLiteral,
    DurationUnit,
    Operator,
    ElementType,

    Error,
}

impl SyntaxKind {
    /// Name used in diagnostics (`node_type` field).
    pub fn name(&self) -> &'static str {
        match self {
            SyntaxKind::SourceFile => "source_file",
            SyntaxKind::ImportStatement => "import_statement",
            SyntaxKind::ReferencingStatement => "referencing_statement",
            SyntaxKind::AssertStatement => "assert_statement",
            SyntaxKind::StructDefinition => "struct_definition",
            SyntaxKind::TypeParameters => "type_parameters",
            SyntaxKind::FieldDefinition => "field_definition",
            SyntaxKind::FunctionDefinition => "function_definition",
            SyntaxKind::ParameterList => "parameter_list",
            SyntaxKind::Parameter => "parameter",
            SyntaxKind::StatuteBlock => "statute_block",
            SyntaxKind::DefinitionsBlock => "definitions_block",
            SyntaxKind::DefinitionEntry => "definition_entry",
            SyntaxKind::ElementsBlock => "elements_block",
            SyntaxKind::ElementEntry => "element_entry",
            SyntaxKind::PenaltyBlock => "penalty_block",
            SyntaxKind::ImprisonmentClause => "imprisonment_clause",
            SyntaxKind::FineClause => "fine_clause",
            SyntaxKind::SupplementaryClause => "supplementary_clause",
            SyntaxKind::DurationRange => "duration_range",
            SyntaxKind::MoneyRange => "money_range",
            SyntaxKind::IllustrationsBlock => "illustrations_block",
            SyntaxKind::IllustrationEntry => "illustration_entry",
            SyntaxKind::Block => "block",
            SyntaxKind::VariableDeclaration => "variable_declaration",
            SyntaxKind::AssignmentStatement => "assignment_statement",
            SyntaxKind::ReturnStatement => "return_statement",
            SyntaxKind::PassStatement => "pass_statement",
            SyntaxKind::ExpressionStatement => "expression_statement",
            SyntaxKind::BinaryExpression => "binary_expression",
            SyntaxKind::UnaryExpression => "unary_expression",
            SyntaxKind::FieldAccess => "field_access",
            SyntaxKind::IndexAccess => "index_access",
            SyntaxKind::FunctionCall => "function_call",
            SyntaxKind::ArgumentList => "argument_list",
            SyntaxKind::ParenthesizedExpression => "parenthesized_expression",
            SyntaxKind::MatchExpression => "match_expression",
            SyntaxKind::MatchArm => "match_arm",
            SyntaxKind::StructLiteral => "struct_literal",
            SyntaxKind::FieldAssignment => "field_assignment",
            SyntaxKind::PassExpression => "pass_expression",
            SyntaxKind::WildcardPattern => "wildcard_pattern",
            SyntaxKind::LiteralPattern => "literal_pattern",
            SyntaxKind::BindingPattern => "binding_pattern",
            SyntaxKind::StructPattern => "struct_pattern",
            SyntaxKind::FieldPattern => "field_pattern",
            SyntaxKind::BuiltinType => "builtin_type",
            SyntaxKind::NamedType => "named_type",
            SyntaxKind::OptionalType => "optional_type",
            SyntaxKind::ArrayType => "array_type",
            SyntaxKind::GenericType => "generic_type",
            SyntaxKind::Identifier => "identifier",
            SyntaxKind::IntegerLiteral => "integer_literal",
            SyntaxKind::FloatLiteral => "float_literal",
            SyntaxKind::BooleanLiteral => "boolean_literal",
            SyntaxKind::StringLiteral => "string_literal",
            SyntaxKind::MoneyLiteral => "money_literal",
            SyntaxKind::CurrencySymbol => "currency_symbol",
            SyntaxKind::MoneyAmount => "money_amount",
            SyntaxKind::PercentLiteral => "percent_literal",
            SyntaxKind::DateLiteral => "date_literal",
            SyntaxKind::DurationLiteral => "duration_literal",
            SyntaxKind::DurationUnit => "duration_unit",
            SyntaxKind::Operator => "operator",
            SyntaxKind::ElementType => "element_type",
            SyntaxKind::Error => "error",
        }
    }
}

/// A child edge of a [`SyntaxNode`], optionally labelled with the grammar
/// field it fills (`base`, `condition`, `section_number`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxChild {
    pub field: Option<&'static str>,
    pub node: SyntaxNode,
}

/// Concrete parse tree node. Inner nodes own their ordered children; leaves
/// carry the token text.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    pub kind: SyntaxKind,
    pub span: Span,
    pub text: Option<String>,
    pub children: Vec<SyntaxChild>,
}

impl SyntaxNode {
    pub fn leaf(kind: SyntaxKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            span,
            text: Some(text.into()),
            children: vec![],
        }
    }

    pub fn new(kind: SyntaxKind, span: Span, children: Vec<SyntaxChild>) -> Self {
        Self {
            kind,
            span,
            text: None,
            children,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty() && self.text.is_some()
    }

    /// Text of a leaf, or empty for inner nodes.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    pub fn child_by_field(&self, field: &str) -> Option<&SyntaxNode> {
        self.children
            .iter()
            .find(|c| c.field == Some(field))
            .map(|c| &c.node)
    }

    pub fn child_of_kind(&self, kind: SyntaxKind) -> Option<&SyntaxNode> {
        self.children
            .iter()
            .find(|c| c.node.kind == kind)
            .map(|c| &c.node)
    }

    pub fn children_of_kind(&self, kind: SyntaxKind) -> Vec<&SyntaxNode> {
        self.children
            .iter()
            .filter(|c| c.node.kind == kind)
            .map(|c| &c.node)
            .collect()
    }

    pub fn child_nodes(&self) -> impl Iterator<Item = &SyntaxNode> {
        self.children.iter().map(|c| &c.node)
    }
}

/// Convenience constructor for leaves taken directly from tokens.
pub fn token_leaf(kind: SyntaxKind, token: &Token) -> SyntaxNode {
    SyntaxNode::leaf(kind, token.to_string(), token.span())
}
