use crate::lexer::{Span, Terminal, Token};

use super::ParseError;

/// Cursor over the lexed token stream. Supports single-token lookahead plus
/// index save/restore for the few places the grammar needs backtracking.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseState {
    tokens: Vec<Token>,
    index: usize,
    pub errors: Vec<ParseError>,
}

impl ParseState {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            index: 0,
            errors: vec![],
        }
    }

    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    pub fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.index + offset)
    }

    pub fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).cloned();
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    pub fn is_at_end(&self) -> bool {
        self.index >= self.tokens.len()
    }

    pub fn get_index(&self) -> usize {
        self.index
    }

    pub fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub fn add_error(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    /// Span of the most recently consumed token.
    pub fn prev_span(&self) -> Span {
        if self.index == 0 {
            return Span::default();
        }
        self.tokens
            .get(self.index - 1)
            .map(|t| t.span())
            .unwrap_or_default()
    }

    /// Span of the upcoming token, or of the last token when at EOF.
    pub fn span(&self) -> Span {
        match self.peek() {
            Some(token) => token.span(),
            None => self
                .tokens
                .last()
                .map(|t| t.span())
                .unwrap_or_default(),
        }
    }

    pub fn at_terminal(&self, terminal: Terminal) -> bool {
        self.peek().is_some_and(|t| t.is_terminal(terminal))
    }

    /// Consume the next token if it is the given terminal.
    pub fn eat(&mut self, terminal: Terminal) -> Option<Token> {
        if self.at_terminal(terminal) {
            self.next()
        } else {
            None
        }
    }

    /// Consume the next token or produce a [`ParseError`] naming the
    /// expected terminal.
    pub fn expect(&mut self, terminal: Terminal) -> Result<Token, ParseError> {
        match self.peek() {
            Some(token) if token.is_terminal(terminal) => Ok(self.next().unwrap()),
            Some(token) => Err(ParseError {
                message: format!("expected '{}', found '{token}'", terminal.lexeme()),
                span: token.span(),
            }),
            None => Err(ParseError {
                message: format!("expected '{}', hit end of input", terminal.lexeme()),
                span: self.span(),
            }),
        }
    }

    /// Consume an identifier token.
    pub fn expect_id(&mut self, what: &str) -> Result<(String, Span), ParseError> {
        match self.peek() {
            Some(Token::Id { .. }) => {
                let Some(Token::Id { value, span }) = self.next() else {
                    unreachable!()
                };
                Ok((value, span))
            }
            Some(token) => Err(ParseError {
                message: format!("expected {what}, found '{token}'"),
                span: token.span(),
            }),
            None => Err(ParseError {
                message: format!("expected {what}, hit end of input"),
                span: self.span(),
            }),
        }
    }

    /// Consume a string literal token, returning its raw contents.
    pub fn expect_string(&mut self, what: &str) -> Result<(String, Span), ParseError> {
        match self.peek() {
            Some(Token::Str { .. }) => {
                let Some(Token::Str { value, span }) = self.next() else {
                    unreachable!()
                };
                Ok((value, span))
            }
            Some(token) => Err(ParseError {
                message: format!("expected {what}, found '{token}'"),
                span: token.span(),
            }),
            None => Err(ParseError {
                message: format!("expected {what}, hit end of input"),
                span: self.span(),
            }),
        }
    }
}

impl From<Vec<Token>> for ParseState {
    fn from(value: Vec<Token>) -> Self {
        Self::new(value)
    }
}
