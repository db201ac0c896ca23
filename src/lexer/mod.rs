//! Lexer for Yuho source text.
//!
//! Produces a flat token stream with precise source spans. Terminals are
//! matched longest-first against a static table; identifiers, numbers,
//! strings and money amounts have dedicated scanners. Unknown characters are
//! reported and skipped so that the parser still sees the rest of the input.

mod lexmap;
mod token;

pub use lexmap::*;
pub use token::*;

use std::{error::Error, fmt::Display};

use once_cell::sync::Lazy;

macro_rules! terminal {
    ($map:ident, $name:ident, $value:expr) => {
        $map.insert($value, Terminal::$name);
    };
}

static LEX_MAP: Lazy<LexMap> = Lazy::new(|| {
    let mut m = LexMap::default();

    terminal!(m, StructKeyword, "struct");
    terminal!(m, FnKeyword, "fn");
    terminal!(m, MatchKeyword, "match");
    terminal!(m, CaseKeyword, "case");
    terminal!(m, IfKeyword, "if");
    terminal!(m, PassKeyword, "pass");
    terminal!(m, ReturnKeyword, "return");
    terminal!(m, StatuteKeyword, "statute");
    terminal!(m, DefinitionsKeyword, "definitions");
    terminal!(m, ElementsKeyword, "elements");
    terminal!(m, PenaltyKeyword, "penalty");
    terminal!(m, IllustrationsKeyword, "illustrations");
    terminal!(m, ImportKeyword, "import");
    terminal!(m, FromKeyword, "from");
    terminal!(m, ReferencingKeyword, "referencing");
    terminal!(m, AssertKeyword, "assert");
    terminal!(m, ActusReus, "actus_reus");
    terminal!(m, MensRea, "mens_rea");
    terminal!(m, Circumstance, "circumstance");
    terminal!(m, ImprisonmentKeyword, "imprisonment");
    terminal!(m, FineKeyword, "fine");
    terminal!(m, SupplementaryKeyword, "supplementary");
    terminal!(m, ToKeyword, "to");
    terminal!(m, AndKeyword, "and");
    terminal!(m, OrKeyword, "or");
    terminal!(m, NotKeyword, "not");
    terminal!(m, True, "TRUE");
    terminal!(m, False, "FALSE");
    terminal!(m, True, "true");
    terminal!(m, False, "false");
    terminal!(m, Underscore, "_");
    terminal!(m, Walrus, ":=");
    terminal!(m, Assign, "=");
    terminal!(m, Equal, "==");
    terminal!(m, NotEqual, "!=");
    terminal!(m, LessEqual, "<=");
    terminal!(m, GreaterEqual, ">=");
    terminal!(m, LessThan, "<");
    terminal!(m, GreaterThan, ">");
    terminal!(m, DoubleAmpersand, "&&");
    terminal!(m, DoublePipe, "||");
    terminal!(m, ExclamationMark, "!");
    terminal!(m, Plus, "+");
    terminal!(m, Minus, "-");
    terminal!(m, Times, "*");
    terminal!(m, Divide, "/");
    terminal!(m, Modulo, "%");
    terminal!(m, Dot, ".");
    terminal!(m, Comma, ",");
    terminal!(m, Semicolon, ";");
    terminal!(m, Colon, ":");
    terminal!(m, QuestionMark, "?");
    terminal!(m, LParen, "(");
    terminal!(m, RParen, ")");
    terminal!(m, LBrace, "{");
    terminal!(m, RBrace, "}");
    terminal!(m, LBracket, "[");
    terminal!(m, RBracket, "]");
    terminal!(m, BigRightArrow, "=>");
    terminal!(m, SmallRightArrow, "->");

    m
});

/// Currency prefixes spelled with letters; the single-character symbols are
/// handled directly by the scanner.
const WORD_CURRENCIES: &[&str] = &["S", "US", "A", "C", "CHF"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

impl Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}:{}",
            self.message, self.span.line, self.span.col
        )
    }
}

impl Error for LexError {}

/// Position snapshot used to build token spans.
#[derive(Debug, Clone, Copy)]
struct Mark {
    line: usize,
    col: usize,
    byte: usize,
}

#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    input: &'a str,
    chars: Vec<(usize, char)>,
    index: usize,
    line: usize,
    col: usize,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().collect(),
            index: 0,
            line: 1,
            col: 1,
            tokens: vec![],
            errors: vec![],
        }
    }

    /// Lex the whole input. Unknown characters are recorded as errors and
    /// skipped, so a token stream is always produced.
    pub fn lex(mut self) -> (Vec<Token>, Vec<LexError>) {
        loop {
            self.eat_trivia();
            let Some(next) = self.peek() else {
                break;
            };

            match next {
                'a'..='z' | 'A'..='Z' | '_' => self.lex_alphanumeric(),
                '0'..='9' => self.lex_numeric(),
                '"' => self.lex_string(),
                '$' | '€' | '£' | '¥' | '₹' => self.lex_money_symbol(),
                _ => self.lex_special(),
            }
        }

        (self.tokens, self.errors)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.index).map(|(_, c)| *c)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).map(|(_, c)| *c)
    }

    fn byte_pos(&self) -> usize {
        self.chars
            .get(self.index)
            .map(|(b, _)| *b)
            .unwrap_or(self.input.len())
    }

    fn advance(&mut self) -> Option<char> {
        let (_, c) = *self.chars.get(self.index)?;
        self.index += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn advance_if(&mut self, func: impl FnOnce(char) -> bool) -> Option<char> {
        match self.peek() {
            Some(c) if func(c) => self.advance(),
            _ => None,
        }
    }

    fn mark(&self) -> Mark {
        Mark {
            line: self.line,
            col: self.col,
            byte: self.byte_pos(),
        }
    }

    fn span_from(&self, mark: Mark) -> Span {
        Span {
            line: mark.line,
            col: mark.col,
            end_line: self.line,
            end_col: self.col,
            start_byte: mark.byte,
            end_byte: self.byte_pos(),
        }
    }

    fn eat_trivia(&mut self) {
        loop {
            while self.advance_if(|c| c.is_whitespace()).is_some() {}
            if self.peek() == Some('/') && self.peek_at(1) == Some('/') {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
                continue;
            }
            break;
        }
    }

    fn lex_alphanumeric(&mut self) {
        let mark = self.mark();
        let mut word = String::new();

        while let Some(c) = self.advance_if(|c| c.is_alphanumeric() || c == '_') {
            word.push(c);
        }

        // Letter-spelled currency prefixes: `S$10`, `US$10`, `CHF10`.
        if WORD_CURRENCIES.contains(&word.as_str()) {
            if self.peek() == Some('$') {
                self.advance();
                word.push('$');
                self.lex_money_amount(word, mark);
                return;
            }
            if word == "CHF" && self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.lex_money_amount(word, mark);
                return;
            }
        }

        let span = self.span_from(mark);
        match LEX_MAP.get(word.as_str()) {
            Some(terminal) => self.tokens.push(terminal.to_token(span)),
            None => self.tokens.push(Token::Id { value: word, span }),
        }
    }

    fn lex_numeric(&mut self) {
        let mark = self.mark();
        let mut digits = String::new();

        while let Some(c) = self.advance_if(|c| c.is_ascii_digit()) {
            digits.push(c);
        }

        // ISO-8601 date: exactly YYYY-MM-DD with no intervening whitespace.
        if digits.len() == 4 && self.looks_like_date_tail() {
            let mut text = digits;
            for _ in 0..6 {
                text.push(self.advance().unwrap_or_default());
            }
            let span = self.span_from(mark);
            self.tokens.push(Token::Date { value: text, span });
            return;
        }

        let mut is_float = false;
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            digits.push(self.advance().unwrap_or_default());
            while let Some(c) = self.advance_if(|c| c.is_ascii_digit()) {
                digits.push(c);
            }
        }

        if self.peek() == Some('%') {
            self.advance();
            let span = self.span_from(mark);
            self.tokens.push(Token::Percent {
                value: digits,
                span,
            });
            return;
        }

        let span = self.span_from(mark);
        if is_float {
            match digits.parse::<f64>() {
                Ok(value) => self.tokens.push(Token::Float { value, span }),
                Err(_) => self.errors.push(LexError {
                    message: format!("failed to parse float literal '{digits}'"),
                    span,
                }),
            }
        } else {
            match digits.parse::<i64>() {
                Ok(value) => self.tokens.push(Token::Integer { value, span }),
                Err(_) => self.errors.push(LexError {
                    message: format!("integer literal '{digits}' out of range"),
                    span,
                }),
            }
        }
    }

    fn looks_like_date_tail(&self) -> bool {
        self.peek() == Some('-')
            && self.peek_at(1).is_some_and(|c| c.is_ascii_digit())
            && self.peek_at(2).is_some_and(|c| c.is_ascii_digit())
            && self.peek_at(3) == Some('-')
            && self.peek_at(4).is_some_and(|c| c.is_ascii_digit())
            && self.peek_at(5).is_some_and(|c| c.is_ascii_digit())
            && !self.peek_at(6).is_some_and(|c| c.is_ascii_digit())
    }

    fn lex_string(&mut self) {
        let mark = self.mark();
        self.advance(); // opening quote

        let mut value = String::new();
        loop {
            match self.advance() {
                Some('"') => {
                    let span = self.span_from(mark);
                    self.tokens.push(Token::Str { value, span });
                    return;
                }
                Some('\\') => {
                    value.push('\\');
                    if let Some(escaped) = self.advance() {
                        value.push(escaped);
                    }
                }
                Some(c) => value.push(c),
                None => {
                    let span = self.span_from(mark);
                    self.errors.push(LexError {
                        message: "unterminated string literal".into(),
                        span,
                    });
                    return;
                }
            }
        }
    }

    fn lex_money_symbol(&mut self) {
        let mark = self.mark();
        let symbol = self.advance().unwrap_or_default().to_string();
        self.lex_money_amount(symbol, mark);
    }

    fn lex_money_amount(&mut self, currency: String, mark: Mark) {
        let mut amount = String::new();

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                amount.push(c);
                self.advance();
            } else if c == ',' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) {
                amount.push(c);
                self.advance();
            } else if c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) {
                amount.push(c);
                self.advance();
            } else {
                break;
            }
        }

        let span = self.span_from(mark);
        if amount.is_empty() {
            self.errors.push(LexError {
                message: format!("expected amount after currency symbol '{currency}'"),
                span,
            });
            return;
        }

        self.tokens.push(Token::Money {
            currency,
            amount,
            span,
        });
    }

    fn lex_special(&mut self) {
        let mark = self.mark();
        let mut read = String::new();

        while let Some(c) = self.peek() {
            read.push(c);
            if !LEX_MAP.can_match(read.as_str()) {
                read.pop();
                break;
            }
            self.advance();
        }

        if read.is_empty() {
            // No terminal starts with this character.
            let offending = self.advance().unwrap_or_default();
            let span = self.span_from(mark);
            self.errors.push(LexError {
                message: format!("unexpected character '{offending}'"),
                span,
            });
            return;
        }

        let span = self.span_from(mark);
        match LEX_MAP.get(read.as_str()) {
            Some(terminal) => self.tokens.push(terminal.to_token(span)),
            None => {
                self.errors.push(LexError {
                    message: format!("failed to lex '{read}'"),
                    span,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_kinds(input: &str) -> Vec<Token> {
        let (tokens, errors) = Lexer::new(input).lex();
        assert!(errors.is_empty(), "unexpected lex errors: {errors:?}");
        tokens
    }

    #[test]
    fn test_lex_declaration() {
        let tokens = lex_kinds("int x := 5;");

        assert_eq!(tokens.len(), 5);
        assert!(matches!(&tokens[0], Token::Id { value, .. } if value == "int"));
        assert!(matches!(&tokens[1], Token::Id { value, .. } if value == "x"));
        assert!(tokens[2].is_terminal(Terminal::Walrus));
        assert!(matches!(tokens[3], Token::Integer { value: 5, .. }));
        assert!(tokens[4].is_terminal(Terminal::Semicolon));
    }

    #[test]
    fn test_lex_money_variants() {
        let tokens = lex_kinds("$1,000.50 S$10 US$3 CHF500");

        let expected = [("$", "1,000.50"), ("S$", "10"), ("US$", "3"), ("CHF", "500")];
        assert_eq!(tokens.len(), expected.len());
        for (token, (currency, amount)) in tokens.iter().zip(expected) {
            assert!(
                matches!(token, Token::Money { currency: c, amount: a, .. }
                    if c == currency && a == amount),
                "unexpected token {token:?}"
            );
        }
    }

    #[test]
    fn test_lex_date_vs_subtraction() {
        let tokens = lex_kinds("2020-01-31");
        assert_eq!(tokens.len(), 1);
        assert!(matches!(&tokens[0], Token::Date { value, .. } if value == "2020-01-31"));

        let tokens = lex_kinds("2020 - 1");
        assert_eq!(tokens.len(), 3);
        assert!(tokens[1].is_terminal(Terminal::Minus));
    }

    #[test]
    fn test_lex_percent_and_modulo() {
        let tokens = lex_kinds("50% 7 % 2");
        assert!(matches!(&tokens[0], Token::Percent { value, .. } if value == "50"));
        assert!(tokens[2].is_terminal(Terminal::Modulo));
    }

    #[test]
    fn test_lex_string_with_escapes() {
        let tokens = lex_kinds(r#""he said \"hi\"""#);
        assert_eq!(tokens.len(), 1);
        assert!(matches!(&tokens[0], Token::Str { value, .. } if value == r#"he said \"hi\""#));
    }

    #[test]
    fn test_lex_match_tokens() {
        let tokens = lex_kinds("match b { case TRUE => 1 }");
        assert!(tokens[0].is_terminal(Terminal::MatchKeyword));
        assert!(tokens[3].is_terminal(Terminal::CaseKeyword));
        assert!(tokens[4].is_terminal(Terminal::True));
        assert!(tokens[5].is_terminal(Terminal::BigRightArrow));
    }

    #[test]
    fn test_unknown_character_is_recovered() {
        let (tokens, errors) = Lexer::new("int @ x").lex();
        assert_eq!(errors.len(), 1);
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn test_spans_track_bytes() {
        let (tokens, _) = Lexer::new("ab cd").lex();
        let span = tokens[1].span();
        assert_eq!((span.start_byte, span.end_byte), (3, 5));
        assert_eq!((span.line, span.col), (1, 4));
    }
}
