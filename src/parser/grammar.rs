//! Recursive-descent grammar over the token stream.
//!
//! Each production returns a [`SyntaxNode`]; a failed top-level declaration
//! or block statement records its error and resynchronises at the next `;`,
//! `}` or declaration keyword, leaving an `Error` subtree in place so later
//! passes still see the remainder of the file.

use crate::lexer::{Span, Terminal, Token};

use super::{
    syntax::{token_leaf, SyntaxChild, SyntaxKind, SyntaxNode},
    ParseError, ParseState,
};

const DURATION_UNITS: &[&str] = &[
    "year", "years", "month", "months", "day", "days", "hour", "hours", "minute", "minutes",
    "second", "seconds",
];

const BUILTIN_TYPES: &[&str] = &[
    "int", "float", "bool", "string", "money", "percent", "date", "duration", "void",
];

type Parsed = Result<SyntaxNode, ParseError>;

pub struct Parser {
    state: ParseState,
    /// Set while parsing a match scrutinee, where `ident {` must start the
    /// arm block rather than a struct literal.
    no_struct_literal: bool,
}

fn child(node: SyntaxNode) -> SyntaxChild {
    SyntaxChild { field: None, node }
}

fn field(name: &'static str, node: SyntaxNode) -> SyntaxChild {
    SyntaxChild {
        field: Some(name),
        node,
    }
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            state: ParseState::new(tokens),
            no_struct_literal: false,
        }
    }

    /// Parse a whole source file. The root node's byte span always covers
    /// the full input, even when the file is empty or ends in an error.
    pub fn parse_source_file(mut self, source: &str) -> (SyntaxNode, Vec<ParseError>) {
        let mut children = vec![];

        while !self.state.is_at_end() {
            let before = self.state.get_index();
            match self.parse_top_level() {
                Ok(node) => children.push(child(node)),
                Err(error) => {
                    self.state.add_error(error);
                    children.push(child(self.recover(before, true)));
                }
            }
        }

        let line_count = source.lines().count().max(1);
        let last_line_len = source.lines().last().map(|l| l.chars().count()).unwrap_or(0);
        let span = Span {
            line: 1,
            col: 1,
            end_line: line_count,
            end_col: last_line_len + 1,
            start_byte: 0,
            end_byte: source.len(),
        };

        let tree = SyntaxNode::new(SyntaxKind::SourceFile, span, children);
        (tree, self.state.errors)
    }

    /// Skip tokens until a synchronisation point, wrapping everything
    /// consumed in an `Error` node. Always makes progress.
    fn recover(&mut self, from: usize, top_level: bool) -> SyntaxNode {
        self.state.set_index(from);
        let start = self.state.span();

        let mut consumed = 0;
        let mut depth = 0usize;
        while let Some(token) = self.state.peek() {
            if consumed > 0 && depth == 0 && top_level && Self::starts_top_level(token) {
                break;
            }
            let token = self.state.next().unwrap();
            consumed += 1;
            match token {
                Token::Terminal {
                    terminal: Terminal::LBrace,
                    ..
                } => depth += 1,
                Token::Terminal {
                    terminal: Terminal::RBrace,
                    ..
                } => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                    if depth == 0 && top_level {
                        break;
                    }
                }
                Token::Terminal {
                    terminal: Terminal::Semicolon,
                    ..
                } if depth == 0 => break,
                _ => {}
            }
        }

        let span = start.merge(&self.state.prev_span());
        SyntaxNode::new(SyntaxKind::Error, span, vec![])
    }

    fn starts_top_level(token: &Token) -> bool {
        matches!(
            token,
            Token::Terminal {
                terminal: Terminal::ImportKeyword
                    | Terminal::ReferencingKeyword
                    | Terminal::AssertKeyword
                    | Terminal::StructKeyword
                    | Terminal::FnKeyword
                    | Terminal::StatuteKeyword,
                ..
            }
        )
    }

    fn parse_top_level(&mut self) -> Parsed {
        let Some(token) = self.state.peek().cloned() else {
            return Err(ParseError::eof("a declaration"));
        };

        match token {
            Token::Terminal { terminal, .. } => match terminal {
                Terminal::ImportKeyword => self.parse_import(),
                Terminal::ReferencingKeyword => self.parse_referencing(),
                Terminal::AssertKeyword => self.parse_assert(),
                Terminal::StructKeyword => self.parse_struct_def(),
                Terminal::FnKeyword => self.parse_function_def(),
                Terminal::StatuteKeyword => self.parse_statute(),
                _ => self.parse_variable_declaration(),
            },
            _ => self.parse_variable_declaration(),
        }
    }

    // =====================================================================
    // Top-level declarations
    // =====================================================================

    fn parse_import(&mut self) -> Parsed {
        let start = self.state.span();
        self.state.expect(Terminal::ImportKeyword)?;

        let (path, path_span) = self.state.expect_string("import path")?;
        let mut children = vec![field(
            "path",
            SyntaxNode::leaf(SyntaxKind::StringLiteral, path, path_span),
        )];

        if self.state.eat(Terminal::FromKeyword).is_some() {
            if let Some(star) = self.state.eat(Terminal::Times) {
                children.push(child(token_leaf(SyntaxKind::Operator, &star)));
            } else {
                loop {
                    let (name, span) = self.state.expect_id("an imported name")?;
                    children.push(child(SyntaxNode::leaf(SyntaxKind::Identifier, name, span)));
                    if self.state.eat(Terminal::Comma).is_none() {
                        break;
                    }
                }
            }
        }

        self.state.expect(Terminal::Semicolon)?;
        let span = start.merge(&self.state.prev_span());
        Ok(SyntaxNode::new(SyntaxKind::ImportStatement, span, children))
    }

    fn parse_referencing(&mut self) -> Parsed {
        let start = self.state.span();
        self.state.expect(Terminal::ReferencingKeyword)?;
        let (path, path_span) = self.state.expect_string("a referenced source")?;
        self.state.expect(Terminal::Semicolon)?;

        let span = start.merge(&self.state.prev_span());
        Ok(SyntaxNode::new(
            SyntaxKind::ReferencingStatement,
            span,
            vec![field(
                "path",
                SyntaxNode::leaf(SyntaxKind::StringLiteral, path, path_span),
            )],
        ))
    }

    fn parse_assert(&mut self) -> Parsed {
        let start = self.state.span();
        self.state.expect(Terminal::AssertKeyword)?;

        let condition = self.parse_expression()?;
        let mut children = vec![field("condition", condition)];

        if self.state.eat(Terminal::Comma).is_some() {
            let (message, span) = self.state.expect_string("an assertion message")?;
            children.push(field(
                "message",
                SyntaxNode::leaf(SyntaxKind::StringLiteral, message, span),
            ));
        }

        self.state.expect(Terminal::Semicolon)?;
        let span = start.merge(&self.state.prev_span());
        Ok(SyntaxNode::new(SyntaxKind::AssertStatement, span, children))
    }

    fn parse_struct_def(&mut self) -> Parsed {
        let start = self.state.span();
        self.state.expect(Terminal::StructKeyword)?;

        let (name, name_span) = self.state.expect_id("a struct name")?;
        let mut children = vec![field(
            "name",
            SyntaxNode::leaf(SyntaxKind::Identifier, name, name_span),
        )];

        if self.state.at_terminal(Terminal::LessThan) {
            children.push(child(self.parse_type_parameters()?));
        }

        self.state.expect(Terminal::LBrace)?;
        while !self.state.at_terminal(Terminal::RBrace) {
            children.push(child(self.parse_field_definition()?));
            if self.state.eat(Terminal::Comma).is_none() {
                break;
            }
        }
        self.state.expect(Terminal::RBrace)?;

        let span = start.merge(&self.state.prev_span());
        Ok(SyntaxNode::new(SyntaxKind::StructDefinition, span, children))
    }

    fn parse_type_parameters(&mut self) -> Parsed {
        let start = self.state.span();
        self.state.expect(Terminal::LessThan)?;

        let mut children = vec![];
        loop {
            let (name, span) = self.state.expect_id("a type parameter")?;
            children.push(child(SyntaxNode::leaf(SyntaxKind::Identifier, name, span)));
            if self.state.eat(Terminal::Comma).is_none() {
                break;
            }
        }
        self.state.expect(Terminal::GreaterThan)?;

        let span = start.merge(&self.state.prev_span());
        Ok(SyntaxNode::new(SyntaxKind::TypeParameters, span, children))
    }

    /// A `name: type` field, or a bare `name` denoting an enum variant.
    fn parse_field_definition(&mut self) -> Parsed {
        let start = self.state.span();
        let (name, name_span) = self.state.expect_id("a field name")?;
        let mut children = vec![field(
            "name",
            SyntaxNode::leaf(SyntaxKind::Identifier, name, name_span),
        )];

        if self.state.eat(Terminal::Colon).is_some() {
            children.push(field("type", self.parse_type()?));
        }

        let span = start.merge(&self.state.prev_span());
        Ok(SyntaxNode::new(SyntaxKind::FieldDefinition, span, children))
    }

    fn parse_function_def(&mut self) -> Parsed {
        let start = self.state.span();
        self.state.expect(Terminal::FnKeyword)?;

        let (name, name_span) = self.state.expect_id("a function name")?;
        let mut children = vec![field(
            "name",
            SyntaxNode::leaf(SyntaxKind::Identifier, name, name_span),
        )];

        children.push(child(self.parse_parameter_list()?));

        if self.state.eat(Terminal::SmallRightArrow).is_some() {
            children.push(field("return_type", self.parse_type()?));
        }

        children.push(child(self.parse_block()?));

        let span = start.merge(&self.state.prev_span());
        Ok(SyntaxNode::new(
            SyntaxKind::FunctionDefinition,
            span,
            children,
        ))
    }

    fn parse_parameter_list(&mut self) -> Parsed {
        let start = self.state.span();
        self.state.expect(Terminal::LParen)?;

        let mut children = vec![];
        while !self.state.at_terminal(Terminal::RParen) {
            let param_start = self.state.span();
            let (name, name_span) = self.state.expect_id("a parameter name")?;
            self.state.expect(Terminal::Colon)?;
            let type_node = self.parse_type()?;
            let span = param_start.merge(&self.state.prev_span());

            children.push(child(SyntaxNode::new(
                SyntaxKind::Parameter,
                span,
                vec![
                    field(
                        "name",
                        SyntaxNode::leaf(SyntaxKind::Identifier, name, name_span),
                    ),
                    field("type", type_node),
                ],
            )));

            if self.state.eat(Terminal::Comma).is_none() {
                break;
            }
        }
        self.state.expect(Terminal::RParen)?;

        let span = start.merge(&self.state.prev_span());
        Ok(SyntaxNode::new(SyntaxKind::ParameterList, span, children))
    }

    // =====================================================================
    // Statutes
    // =====================================================================

    fn parse_statute(&mut self) -> Parsed {
        let start = self.state.span();
        self.state.expect(Terminal::StatuteKeyword)?;

        let (section, section_span) = self.state.expect_string("a section number")?;
        let mut children = vec![field(
            "section_number",
            SyntaxNode::leaf(SyntaxKind::StringLiteral, section, section_span),
        )];

        if let Some(Token::Str { .. }) = self.state.peek() {
            let (title, title_span) = self.state.expect_string("a title")?;
            children.push(field(
                "title",
                SyntaxNode::leaf(SyntaxKind::StringLiteral, title, title_span),
            ));
        }

        self.state.expect(Terminal::LBrace)?;
        while !self.state.at_terminal(Terminal::RBrace) {
            let Some(token) = self.state.peek().cloned() else {
                return Err(ParseError::eof("a statute block"));
            };
            let block = match token {
                Token::Terminal {
                    terminal: Terminal::DefinitionsKeyword,
                    ..
                } => self.parse_definitions_block()?,
                Token::Terminal {
                    terminal: Terminal::ElementsKeyword,
                    ..
                } => self.parse_elements_block()?,
                Token::Terminal {
                    terminal: Terminal::PenaltyKeyword,
                    ..
                } => self.parse_penalty_block()?,
                Token::Terminal {
                    terminal: Terminal::IllustrationsKeyword,
                    ..
                } => self.parse_illustrations_block()?,
                token => {
                    return Err(ParseError {
                        message: format!(
                            "expected 'definitions', 'elements', 'penalty' or 'illustrations', found '{token}'"
                        ),
                        span: token.span(),
                    });
                }
            };
            children.push(child(block));
        }
        self.state.expect(Terminal::RBrace)?;

        let span = start.merge(&self.state.prev_span());
        Ok(SyntaxNode::new(SyntaxKind::StatuteBlock, span, children))
    }

    fn parse_definitions_block(&mut self) -> Parsed {
        let start = self.state.span();
        self.state.expect(Terminal::DefinitionsKeyword)?;
        self.state.expect(Terminal::LBrace)?;

        let mut children = vec![];
        while !self.state.at_terminal(Terminal::RBrace) {
            let entry_start = self.state.span();
            let (term, term_span) = self.state.expect_string("a defined term")?;
            self.state.expect(Terminal::Walrus)?;
            let (definition, def_span) = self.state.expect_string("a definition")?;
            self.state.expect(Terminal::Semicolon)?;

            let span = entry_start.merge(&self.state.prev_span());
            children.push(child(SyntaxNode::new(
                SyntaxKind::DefinitionEntry,
                span,
                vec![
                    field(
                        "term",
                        SyntaxNode::leaf(SyntaxKind::StringLiteral, term, term_span),
                    ),
                    field(
                        "definition",
                        SyntaxNode::leaf(SyntaxKind::StringLiteral, definition, def_span),
                    ),
                ],
            )));
        }
        self.state.expect(Terminal::RBrace)?;

        let span = start.merge(&self.state.prev_span());
        Ok(SyntaxNode::new(SyntaxKind::DefinitionsBlock, span, children))
    }

    fn parse_elements_block(&mut self) -> Parsed {
        let start = self.state.span();
        self.state.expect(Terminal::ElementsKeyword)?;
        self.state.expect(Terminal::LBrace)?;

        let mut children = vec![];
        while !self.state.at_terminal(Terminal::RBrace) {
            children.push(child(self.parse_element_entry()?));
        }
        self.state.expect(Terminal::RBrace)?;

        let span = start.merge(&self.state.prev_span());
        Ok(SyntaxNode::new(SyntaxKind::ElementsBlock, span, children))
    }

    fn parse_element_entry(&mut self) -> Parsed {
        let start = self.state.span();

        let Some(token) = self.state.peek().cloned() else {
            return Err(ParseError::eof("an element entry"));
        };
        let element_type = match token {
            Token::Terminal {
                terminal:
                    terminal @ (Terminal::ActusReus | Terminal::MensRea | Terminal::Circumstance),
                span,
            } => {
                self.state.next();
                SyntaxNode::leaf(SyntaxKind::ElementType, terminal.lexeme(), span)
            }
            token => {
                return Err(ParseError {
                    message: format!(
                        "expected 'actus_reus', 'mens_rea' or 'circumstance', found '{token}'"
                    ),
                    span: token.span(),
                });
            }
        };

        let (name, name_span) = self.state.expect_id("an element name")?;
        self.state.expect(Terminal::Walrus)?;
        let description = self.parse_expression()?;
        self.state.expect(Terminal::Semicolon)?;

        let span = start.merge(&self.state.prev_span());
        Ok(SyntaxNode::new(
            SyntaxKind::ElementEntry,
            span,
            vec![
                field("element_type", element_type),
                field(
                    "name",
                    SyntaxNode::leaf(SyntaxKind::Identifier, name, name_span),
                ),
                field("description", description),
            ],
        ))
    }

    fn parse_penalty_block(&mut self) -> Parsed {
        let start = self.state.span();
        self.state.expect(Terminal::PenaltyKeyword)?;
        self.state.expect(Terminal::LBrace)?;

        let mut children = vec![];
        while !self.state.at_terminal(Terminal::RBrace) {
            let Some(token) = self.state.peek().cloned() else {
                return Err(ParseError::eof("a penalty clause"));
            };
            let clause = match token {
                Token::Terminal {
                    terminal: Terminal::ImprisonmentKeyword,
                    ..
                } => self.parse_imprisonment_clause()?,
                Token::Terminal {
                    terminal: Terminal::FineKeyword,
                    ..
                } => self.parse_fine_clause()?,
                Token::Terminal {
                    terminal: Terminal::SupplementaryKeyword,
                    ..
                } => self.parse_supplementary_clause()?,
                token => {
                    return Err(ParseError {
                        message: format!(
                            "expected 'imprisonment', 'fine' or 'supplementary', found '{token}'"
                        ),
                        span: token.span(),
                    });
                }
            };
            children.push(child(clause));
        }
        self.state.expect(Terminal::RBrace)?;

        let span = start.merge(&self.state.prev_span());
        Ok(SyntaxNode::new(SyntaxKind::PenaltyBlock, span, children))
    }

    fn parse_imprisonment_clause(&mut self) -> Parsed {
        let start = self.state.span();
        self.state.expect(Terminal::ImprisonmentKeyword)?;
        self.state.expect(Terminal::Walrus)?;

        let first = self.parse_duration_literal()?;
        let node = if self.state.eat(Terminal::ToKeyword).is_some() {
            let second = self.parse_duration_literal()?;
            let span = first.span.merge(&second.span);
            SyntaxNode::new(
                SyntaxKind::DurationRange,
                span,
                vec![child(first), child(second)],
            )
        } else {
            first
        };
        self.state.expect(Terminal::Semicolon)?;

        let span = start.merge(&self.state.prev_span());
        Ok(SyntaxNode::new(
            SyntaxKind::ImprisonmentClause,
            span,
            vec![child(node)],
        ))
    }

    fn parse_fine_clause(&mut self) -> Parsed {
        let start = self.state.span();
        self.state.expect(Terminal::FineKeyword)?;
        self.state.expect(Terminal::Walrus)?;

        let first = self.parse_money_literal()?;
        let node = if self.state.eat(Terminal::ToKeyword).is_some() {
            let second = self.parse_money_literal()?;
            let span = first.span.merge(&second.span);
            SyntaxNode::new(
                SyntaxKind::MoneyRange,
                span,
                vec![child(first), child(second)],
            )
        } else {
            first
        };
        self.state.expect(Terminal::Semicolon)?;

        let span = start.merge(&self.state.prev_span());
        Ok(SyntaxNode::new(
            SyntaxKind::FineClause,
            span,
            vec![child(node)],
        ))
    }

    fn parse_supplementary_clause(&mut self) -> Parsed {
        let start = self.state.span();
        self.state.expect(Terminal::SupplementaryKeyword)?;
        self.state.expect(Terminal::Walrus)?;
        let (text, text_span) = self.state.expect_string("supplementary text")?;
        self.state.expect(Terminal::Semicolon)?;

        let span = start.merge(&self.state.prev_span());
        Ok(SyntaxNode::new(
            SyntaxKind::SupplementaryClause,
            span,
            vec![child(SyntaxNode::leaf(
                SyntaxKind::StringLiteral,
                text,
                text_span,
            ))],
        ))
    }

    fn parse_illustrations_block(&mut self) -> Parsed {
        let start = self.state.span();
        self.state.expect(Terminal::IllustrationsKeyword)?;
        self.state.expect(Terminal::LBrace)?;

        let mut children = vec![];
        while !self.state.at_terminal(Terminal::RBrace) {
            let entry_start = self.state.span();
            let mut entry_children = vec![];

            if let Some(Token::Id { .. }) = self.state.peek() {
                let (label, span) = self.state.expect_id("an illustration label")?;
                entry_children.push(field(
                    "label",
                    SyntaxNode::leaf(SyntaxKind::Identifier, label, span),
                ));
            }

            let (description, desc_span) = self.state.expect_string("an illustration")?;
            entry_children.push(field(
                "description",
                SyntaxNode::leaf(SyntaxKind::StringLiteral, description, desc_span),
            ));
            self.state.expect(Terminal::Semicolon)?;

            let span = entry_start.merge(&self.state.prev_span());
            children.push(child(SyntaxNode::new(
                SyntaxKind::IllustrationEntry,
                span,
                entry_children,
            )));
        }
        self.state.expect(Terminal::RBrace)?;

        let span = start.merge(&self.state.prev_span());
        Ok(SyntaxNode::new(
            SyntaxKind::IllustrationsBlock,
            span,
            children,
        ))
    }

    // =====================================================================
    // Statements
    // =====================================================================

    fn parse_block(&mut self) -> Parsed {
        let start = self.state.span();
        self.state.expect(Terminal::LBrace)?;

        let mut children = vec![];
        while !self.state.at_terminal(Terminal::RBrace) {
            if self.state.is_at_end() {
                return Err(ParseError::eof("a block"));
            }
            let before = self.state.get_index();
            match self.parse_statement() {
                Ok(node) => children.push(child(node)),
                Err(error) => {
                    self.state.add_error(error);
                    children.push(child(self.recover(before, false)));
                }
            }
        }
        self.state.expect(Terminal::RBrace)?;

        let span = start.merge(&self.state.prev_span());
        Ok(SyntaxNode::new(SyntaxKind::Block, span, children))
    }

    fn parse_statement(&mut self) -> Parsed {
        let Some(token) = self.state.peek().cloned() else {
            return Err(ParseError::eof("a statement"));
        };

        match token {
            Token::Terminal {
                terminal: Terminal::ReturnKeyword,
                ..
            } => self.parse_return_statement(),
            Token::Terminal {
                terminal: Terminal::PassKeyword,
                ..
            } if self
                .state
                .peek_at(1)
                .is_some_and(|t| t.is_terminal(Terminal::Semicolon)) =>
            {
                let start = self.state.span();
                self.state.next();
                self.state.next();
                let span = start.merge(&self.state.prev_span());
                Ok(SyntaxNode::new(SyntaxKind::PassStatement, span, vec![]))
            }
            _ => {
                if self.at_variable_declaration() {
                    self.parse_variable_declaration()
                } else {
                    self.parse_expression_or_assignment()
                }
            }
        }
    }

    /// A statement is a variable declaration iff a type followed by a name
    /// and `:=` parses from the current position.
    fn at_variable_declaration(&mut self) -> bool {
        let index = self.state.get_index();
        let looks_like = self.parse_type().is_ok()
            && self.state.expect_id("a name").is_ok()
            && self.state.at_terminal(Terminal::Walrus);
        self.state.set_index(index);
        looks_like
    }

    fn parse_variable_declaration(&mut self) -> Parsed {
        let start = self.state.span();

        let type_node = self.parse_type()?;
        let (name, name_span) = self.state.expect_id("a variable name")?;
        self.state.expect(Terminal::Walrus)?;
        let value = self.parse_expression()?;
        self.state.expect(Terminal::Semicolon)?;

        let span = start.merge(&self.state.prev_span());
        Ok(SyntaxNode::new(
            SyntaxKind::VariableDeclaration,
            span,
            vec![
                field("type", type_node),
                field(
                    "name",
                    SyntaxNode::leaf(SyntaxKind::Identifier, name, name_span),
                ),
                field("value", value),
            ],
        ))
    }

    fn parse_return_statement(&mut self) -> Parsed {
        let start = self.state.span();
        self.state.expect(Terminal::ReturnKeyword)?;

        let mut children = vec![];
        if !self.state.at_terminal(Terminal::Semicolon) {
            children.push(field("value", self.parse_expression()?));
        }
        self.state.expect(Terminal::Semicolon)?;

        let span = start.merge(&self.state.prev_span());
        Ok(SyntaxNode::new(SyntaxKind::ReturnStatement, span, children))
    }

    fn parse_expression_or_assignment(&mut self) -> Parsed {
        let start = self.state.span();
        let expr = self.parse_expression()?;

        if self.state.eat(Terminal::Assign).is_some() {
            let value = self.parse_expression()?;
            self.state.expect(Terminal::Semicolon)?;
            let span = start.merge(&self.state.prev_span());
            return Ok(SyntaxNode::new(
                SyntaxKind::AssignmentStatement,
                span,
                vec![field("target", expr), field("value", value)],
            ));
        }

        // The final expression of a block may omit its semicolon.
        if !self.state.at_terminal(Terminal::RBrace) {
            self.state.expect(Terminal::Semicolon)?;
        }
        let span = start.merge(&self.state.prev_span());
        Ok(SyntaxNode::new(
            SyntaxKind::ExpressionStatement,
            span,
            vec![child(expr)],
        ))
    }

    // =====================================================================
    // Types
    // =====================================================================

    fn parse_type(&mut self) -> Parsed {
        let start = self.state.span();

        let mut node = if self.state.at_terminal(Terminal::LBracket) {
            self.state.next();
            let element = self.parse_type()?;
            self.state.expect(Terminal::RBracket)?;
            let span = start.merge(&self.state.prev_span());
            SyntaxNode::new(SyntaxKind::ArrayType, span, vec![child(element)])
        } else {
            let (name, name_span) = self.state.expect_id("a type name")?;
            let kind = if BUILTIN_TYPES.contains(&name.as_str()) {
                SyntaxKind::BuiltinType
            } else {
                SyntaxKind::NamedType
            };
            let base = SyntaxNode::leaf(kind, name, name_span);

            if kind == SyntaxKind::NamedType && self.state.at_terminal(Terminal::LessThan) {
                self.state.next();
                let mut children = vec![child(base)];
                loop {
                    children.push(child(self.parse_type()?));
                    if self.state.eat(Terminal::Comma).is_none() {
                        break;
                    }
                }
                self.state.expect(Terminal::GreaterThan)?;
                let span = start.merge(&self.state.prev_span());
                SyntaxNode::new(SyntaxKind::GenericType, span, children)
            } else {
                base
            }
        };

        while self.state.eat(Terminal::QuestionMark).is_some() {
            let span = start.merge(&self.state.prev_span());
            node = SyntaxNode::new(SyntaxKind::OptionalType, span, vec![child(node)]);
        }

        Ok(node)
    }

    // =====================================================================
    // Expressions
    // =====================================================================

    pub fn parse_expression(&mut self) -> Parsed {
        self.parse_logical_or()
    }

    fn binary_node(left: SyntaxNode, operator: SyntaxNode, right: SyntaxNode) -> SyntaxNode {
        let span = left.span.merge(&right.span);
        SyntaxNode::new(
            SyntaxKind::BinaryExpression,
            span,
            vec![
                field("left", left),
                field("operator", operator),
                field("right", right),
            ],
        )
    }

    fn eat_operator(&mut self, terminals: &[Terminal]) -> Option<SyntaxNode> {
        for terminal in terminals {
            if let Some(token) = self.state.eat(*terminal) {
                return Some(token_leaf(SyntaxKind::Operator, &token));
            }
        }
        None
    }

    fn parse_logical_or(&mut self) -> Parsed {
        let mut left = self.parse_logical_and()?;
        while let Some(op) = self.eat_operator(&[Terminal::DoublePipe, Terminal::OrKeyword]) {
            let right = self.parse_logical_and()?;
            left = Self::binary_node(left, op, right);
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Parsed {
        let mut left = self.parse_comparison()?;
        while let Some(op) = self.eat_operator(&[Terminal::DoubleAmpersand, Terminal::AndKeyword]) {
            let right = self.parse_comparison()?;
            left = Self::binary_node(left, op, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Parsed {
        let mut left = self.parse_additive()?;
        while let Some(op) = self.eat_operator(&[
            Terminal::Equal,
            Terminal::NotEqual,
            Terminal::LessEqual,
            Terminal::GreaterEqual,
            Terminal::LessThan,
            Terminal::GreaterThan,
        ]) {
            let right = self.parse_additive()?;
            left = Self::binary_node(left, op, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Parsed {
        let mut left = self.parse_multiplicative()?;
        while let Some(op) = self.eat_operator(&[Terminal::Plus, Terminal::Minus]) {
            let right = self.parse_multiplicative()?;
            left = Self::binary_node(left, op, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Parsed {
        let mut left = self.parse_unary()?;
        while let Some(op) =
            self.eat_operator(&[Terminal::Times, Terminal::Divide, Terminal::Modulo])
        {
            let right = self.parse_unary()?;
            left = Self::binary_node(left, op, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Parsed {
        let start = self.state.span();
        if let Some(op) = self.eat_operator(&[
            Terminal::Minus,
            Terminal::ExclamationMark,
            Terminal::NotKeyword,
        ]) {
            let operand = self.parse_unary()?;
            let span = start.merge(&operand.span);
            return Ok(SyntaxNode::new(
                SyntaxKind::UnaryExpression,
                span,
                vec![field("operator", op), field("operand", operand)],
            ));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Parsed {
        let mut node = self.parse_primary()?;

        loop {
            if self.state.eat(Terminal::Dot).is_some() {
                let (name, name_span) = self.state.expect_id("a field name")?;
                let span = node.span.merge(&name_span);
                node = SyntaxNode::new(
                    SyntaxKind::FieldAccess,
                    span,
                    vec![
                        field("base", node),
                        field(
                            "field",
                            SyntaxNode::leaf(SyntaxKind::Identifier, name, name_span.clone()),
                        ),
                    ],
                );
            } else if self.state.at_terminal(Terminal::LBracket) {
                self.state.next();
                let index = self.parse_expression()?;
                self.state.expect(Terminal::RBracket)?;
                let span = node.span.merge(&self.state.prev_span());
                node = SyntaxNode::new(
                    SyntaxKind::IndexAccess,
                    span,
                    vec![field("base", node), field("index", index)],
                );
            } else if self.state.at_terminal(Terminal::LParen) {
                let args = self.parse_argument_list()?;
                let span = node.span.merge(&self.state.prev_span());
                node = SyntaxNode::new(
                    SyntaxKind::FunctionCall,
                    span,
                    vec![field("callee", node), child(args)],
                );
            } else {
                break;
            }
        }

        Ok(node)
    }

    fn parse_argument_list(&mut self) -> Parsed {
        let start = self.state.span();
        self.state.expect(Terminal::LParen)?;

        let mut children = vec![];
        while !self.state.at_terminal(Terminal::RParen) {
            children.push(child(self.parse_expression()?));
            if self.state.eat(Terminal::Comma).is_none() {
                break;
            }
        }
        self.state.expect(Terminal::RParen)?;

        let span = start.merge(&self.state.prev_span());
        Ok(SyntaxNode::new(SyntaxKind::ArgumentList, span, children))
    }

    fn parse_primary(&mut self) -> Parsed {
        let Some(token) = self.state.peek().cloned() else {
            return Err(ParseError::eof("an expression"));
        };

        match token {
            Token::Terminal { terminal, span } => match terminal {
                Terminal::LParen => {
                    let start = span;
                    self.state.next();
                    let inner = self.parse_expression()?;
                    self.state.expect(Terminal::RParen)?;
                    let span = start.merge(&self.state.prev_span());
                    Ok(SyntaxNode::new(
                        SyntaxKind::ParenthesizedExpression,
                        span,
                        vec![child(inner)],
                    ))
                }
                Terminal::MatchKeyword => self.parse_match_expression(),
                Terminal::PassKeyword => {
                    self.state.next();
                    Ok(SyntaxNode::new(SyntaxKind::PassExpression, span, vec![]))
                }
                Terminal::True | Terminal::False => {
                    self.state.next();
                    Ok(SyntaxNode::leaf(
                        SyntaxKind::BooleanLiteral,
                        terminal.lexeme(),
                        span,
                    ))
                }
                _ => Err(ParseError {
                    message: format!("expected an expression, found '{}'", terminal.lexeme()),
                    span,
                }),
            },
            Token::Integer { .. } => {
                if self.at_duration_literal() {
                    self.parse_duration_literal()
                } else {
                    let token = self.state.next().unwrap();
                    Ok(token_leaf(SyntaxKind::IntegerLiteral, &token))
                }
            }
            Token::Float { .. } => {
                let token = self.state.next().unwrap();
                Ok(token_leaf(SyntaxKind::FloatLiteral, &token))
            }
            Token::Str { .. } => {
                // Leaf text is the raw contents, without the quotes the
                // token would print with.
                let Some(Token::Str { value, span }) = self.state.next() else {
                    unreachable!()
                };
                Ok(SyntaxNode::leaf(SyntaxKind::StringLiteral, value, span))
            }
            Token::Money { .. } => self.parse_money_literal(),
            Token::Percent { .. } => {
                let token = self.state.next().unwrap();
                let Token::Percent { value, span } = token else {
                    unreachable!()
                };
                Ok(SyntaxNode::new(
                    SyntaxKind::PercentLiteral,
                    span.clone(),
                    vec![child(SyntaxNode::leaf(
                        SyntaxKind::IntegerLiteral,
                        value,
                        span,
                    ))],
                ))
            }
            Token::Date { .. } => {
                let token = self.state.next().unwrap();
                Ok(token_leaf(SyntaxKind::DateLiteral, &token))
            }
            Token::Id { .. } => {
                let looks_like_struct_literal = !self.no_struct_literal
                    && self
                        .state
                        .peek_at(1)
                        .is_some_and(|t| t.is_terminal(Terminal::LBrace));
                if looks_like_struct_literal {
                    self.parse_struct_literal()
                } else {
                    let token = self.state.next().unwrap();
                    Ok(token_leaf(SyntaxKind::Identifier, &token))
                }
            }
        }
    }

    fn at_duration_literal(&self) -> bool {
        matches!(self.state.peek(), Some(Token::Integer { .. }))
            && matches!(
                self.state.peek_at(1),
                Some(Token::Id { value, .. }) if DURATION_UNITS.contains(&value.as_str())
            )
    }

    fn parse_duration_literal(&mut self) -> Parsed {
        let start = self.state.span();
        let mut children = vec![];

        while self.at_duration_literal() {
            let count = self.state.next().unwrap();
            children.push(child(token_leaf(SyntaxKind::IntegerLiteral, &count)));
            let Some(Token::Id { value, span }) = self.state.next() else {
                unreachable!()
            };
            children.push(child(SyntaxNode::leaf(
                SyntaxKind::DurationUnit,
                value,
                span,
            )));
        }

        if children.is_empty() {
            return Err(ParseError {
                message: "expected a duration such as '2 years'".into(),
                span: self.state.span(),
            });
        }

        let span = start.merge(&self.state.prev_span());
        Ok(SyntaxNode::new(SyntaxKind::DurationLiteral, span, children))
    }

    fn parse_money_literal(&mut self) -> Parsed {
        match self.state.peek() {
            Some(Token::Money { .. }) => {
                let Some(Token::Money {
                    currency,
                    amount,
                    span,
                }) = self.state.next()
                else {
                    unreachable!()
                };
                Ok(SyntaxNode::new(
                    SyntaxKind::MoneyLiteral,
                    span.clone(),
                    vec![
                        child(SyntaxNode::leaf(
                            SyntaxKind::CurrencySymbol,
                            currency,
                            span.clone(),
                        )),
                        child(SyntaxNode::leaf(SyntaxKind::MoneyAmount, amount, span)),
                    ],
                ))
            }
            Some(token) => Err(ParseError {
                message: format!("expected a money amount, found '{token}'"),
                span: token.span(),
            }),
            None => Err(ParseError::eof("a money amount")),
        }
    }

    fn parse_struct_literal(&mut self) -> Parsed {
        let start = self.state.span();
        let (name, name_span) = self.state.expect_id("a struct name")?;
        let mut children = vec![field(
            "type_name",
            SyntaxNode::leaf(SyntaxKind::Identifier, name, name_span),
        )];

        self.state.expect(Terminal::LBrace)?;
        while !self.state.at_terminal(Terminal::RBrace) {
            let entry_start = self.state.span();
            let (field_name, field_span) = self.state.expect_id("a field name")?;
            if self.state.eat(Terminal::Walrus).is_none() {
                self.state.expect(Terminal::Colon)?;
            }
            let value = self.parse_expression()?;

            let span = entry_start.merge(&self.state.prev_span());
            children.push(child(SyntaxNode::new(
                SyntaxKind::FieldAssignment,
                span,
                vec![
                    field(
                        "name",
                        SyntaxNode::leaf(SyntaxKind::Identifier, field_name, field_span),
                    ),
                    field("value", value),
                ],
            )));

            if self.state.eat(Terminal::Comma).is_none() {
                break;
            }
        }
        self.state.expect(Terminal::RBrace)?;

        let span = start.merge(&self.state.prev_span());
        Ok(SyntaxNode::new(SyntaxKind::StructLiteral, span, children))
    }

    // =====================================================================
    // Match expressions and patterns
    // =====================================================================

    fn parse_match_expression(&mut self) -> Parsed {
        let start = self.state.span();
        self.state.expect(Terminal::MatchKeyword)?;

        let mut children = vec![];
        if !self.state.at_terminal(Terminal::LBrace) {
            let previous = self.no_struct_literal;
            self.no_struct_literal = true;
            let scrutinee = self.parse_expression();
            self.no_struct_literal = previous;
            children.push(field("scrutinee", scrutinee?));
        }

        self.state.expect(Terminal::LBrace)?;
        while !self.state.at_terminal(Terminal::RBrace) {
            if self.state.is_at_end() {
                return Err(ParseError::eof("a match expression"));
            }
            children.push(child(self.parse_match_arm()?));
            self.state.eat(Terminal::Comma);
        }
        self.state.expect(Terminal::RBrace)?;

        let span = start.merge(&self.state.prev_span());
        Ok(SyntaxNode::new(SyntaxKind::MatchExpression, span, children))
    }

    fn parse_match_arm(&mut self) -> Parsed {
        let start = self.state.span();
        self.state.eat(Terminal::CaseKeyword);

        let pattern = self.parse_pattern()?;
        let mut children = vec![field("pattern", pattern)];

        if self.state.eat(Terminal::IfKeyword).is_some() {
            children.push(field("guard", self.parse_expression()?));
        }

        self.state.expect(Terminal::BigRightArrow)?;
        children.push(field("body", self.parse_expression()?));

        let span = start.merge(&self.state.prev_span());
        Ok(SyntaxNode::new(SyntaxKind::MatchArm, span, children))
    }

    fn parse_pattern(&mut self) -> Parsed {
        let Some(token) = self.state.peek().cloned() else {
            return Err(ParseError::eof("a pattern"));
        };

        match token {
            Token::Terminal {
                terminal: Terminal::Underscore,
                span,
            } => {
                self.state.next();
                Ok(SyntaxNode::new(SyntaxKind::WildcardPattern, span, vec![]))
            }
            Token::Terminal {
                terminal: terminal @ (Terminal::True | Terminal::False),
                span,
            } => {
                self.state.next();
                let literal = SyntaxNode::leaf(
                    SyntaxKind::BooleanLiteral,
                    terminal.lexeme(),
                    span.clone(),
                );
                Ok(SyntaxNode::new(
                    SyntaxKind::LiteralPattern,
                    span,
                    vec![child(literal)],
                ))
            }
            Token::Integer { .. }
            | Token::Float { .. }
            | Token::Str { .. }
            | Token::Money { .. }
            | Token::Percent { .. }
            | Token::Date { .. } => {
                let start = self.state.span();
                let literal = self.parse_primary()?;
                let span = start.merge(&self.state.prev_span());
                Ok(SyntaxNode::new(
                    SyntaxKind::LiteralPattern,
                    span,
                    vec![child(literal)],
                ))
            }
            Token::Id { .. } => {
                if self
                    .state
                    .peek_at(1)
                    .is_some_and(|t| t.is_terminal(Terminal::LBrace))
                {
                    self.parse_struct_pattern()
                } else {
                    let Some(Token::Id { value, span }) = self.state.next() else {
                        unreachable!()
                    };
                    Ok(SyntaxNode::leaf(SyntaxKind::BindingPattern, value, span))
                }
            }
            token => Err(ParseError {
                message: format!("expected a pattern, found '{token}'"),
                span: token.span(),
            }),
        }
    }

    fn parse_struct_pattern(&mut self) -> Parsed {
        let start = self.state.span();
        let (name, name_span) = self.state.expect_id("a struct name")?;
        let mut children = vec![field(
            "type_name",
            SyntaxNode::leaf(SyntaxKind::Identifier, name, name_span),
        )];

        self.state.expect(Terminal::LBrace)?;
        while !self.state.at_terminal(Terminal::RBrace) {
            let entry_start = self.state.span();
            let (field_name, field_span) = self.state.expect_id("a field name")?;
            let mut entry_children = vec![field(
                "name",
                SyntaxNode::leaf(SyntaxKind::Identifier, field_name, field_span),
            )];

            if self.state.eat(Terminal::Colon).is_some() {
                entry_children.push(field("pattern", self.parse_pattern()?));
            }

            let span = entry_start.merge(&self.state.prev_span());
            children.push(child(SyntaxNode::new(
                SyntaxKind::FieldPattern,
                span,
                entry_children,
            )));

            if self.state.eat(Terminal::Comma).is_none() {
                break;
            }
        }
        self.state.expect(Terminal::RBrace)?;

        let span = start.merge(&self.state.prev_span());
        Ok(SyntaxNode::new(SyntaxKind::StructPattern, span, children))
    }
}
