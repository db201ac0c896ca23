use std::fmt::Display;

/// Source region covered by a token or syntax node. Lines and columns are
/// 1-indexed, byte offsets are 0-indexed into the original UTF-8 source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub col: usize,
    pub end_line: usize,
    pub end_col: usize,
    pub start_byte: usize,
    pub end_byte: usize,
}

impl Span {
    pub fn merge(&self, other: &Span) -> Span {
        Span {
            line: self.line,
            col: self.col,
            end_line: other.end_line,
            end_col: other.end_col,
            start_byte: self.start_byte,
            end_byte: other.end_byte,
        }
    }
}

/// Terminal symbols recognised via the lexer's terminal table. Keywords and
/// punctuation carry no value, so they are listed separately from the valued
/// tokens and converted with [`Terminal::to_token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Terminal {
    StructKeyword,
    FnKeyword,
    MatchKeyword,
    CaseKeyword,
    IfKeyword,
    PassKeyword,
    ReturnKeyword,
    StatuteKeyword,
    DefinitionsKeyword,
    ElementsKeyword,
    PenaltyKeyword,
    IllustrationsKeyword,
    ImportKeyword,
    FromKeyword,
    ReferencingKeyword,
    AssertKeyword,
    ActusReus,
    MensRea,
    Circumstance,
    ImprisonmentKeyword,
    FineKeyword,
    SupplementaryKeyword,
    ToKeyword,
    AndKeyword,
    OrKeyword,
    NotKeyword,
    True,
    False,
    Walrus,
    Assign,
    Equal,
    NotEqual,
    LessEqual,
    GreaterEqual,
    LessThan,
    GreaterThan,
    DoubleAmpersand,
    DoublePipe,
    ExclamationMark,
    Plus,
    Minus,
    Times,
    Divide,
    Modulo,
    Dot,
    Comma,
    Semicolon,
    Colon,
    QuestionMark,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    BigRightArrow,
    SmallRightArrow,
    Underscore,
}

impl Terminal {
    pub fn to_token(self, span: Span) -> Token {
        Token::Terminal {
            terminal: self,
            span,
        }
    }

    /// The concrete spelling of this terminal, used in expected-token
    /// messages.
    pub fn lexeme(&self) -> &'static str {
        match self {
            Terminal::StructKeyword => "struct",
            Terminal::FnKeyword => "fn",
            Terminal::MatchKeyword => "match",
            Terminal::CaseKeyword => "case",
            Terminal::IfKeyword => "if",
            Terminal::PassKeyword => "pass",
            Terminal::ReturnKeyword => "return",
            Terminal::StatuteKeyword => "statute",
            Terminal::DefinitionsKeyword => "definitions",
            Terminal::ElementsKeyword => "elements",
            Terminal::PenaltyKeyword => "penalty",
            Terminal::IllustrationsKeyword => "illustrations",
            Terminal::ImportKeyword => "import",
            Terminal::FromKeyword => "from",
            Terminal::ReferencingKeyword => "referencing",
            Terminal::AssertKeyword => "assert",
            Terminal::ActusReus => "actus_reus",
            Terminal::MensRea => "mens_rea",
            Terminal::Circumstance => "circumstance",
            Terminal::ImprisonmentKeyword => "imprisonment",
            Terminal::FineKeyword => "fine",
            Terminal::SupplementaryKeyword => "supplementary",
            Terminal::ToKeyword => "to",
            Terminal::AndKeyword => "and",
            Terminal::OrKeyword => "or",
            Terminal::NotKeyword => "not",
            Terminal::True => "TRUE",
            Terminal::False => "FALSE",
            Terminal::Walrus => ":=",
            Terminal::Assign => "=",
            Terminal::Equal => "==",
            Terminal::NotEqual => "!=",
            Terminal::LessEqual => "<=",
            Terminal::GreaterEqual => ">=",
            Terminal::LessThan => "<",
            Terminal::GreaterThan => ">",
            Terminal::DoubleAmpersand => "&&",
            Terminal::DoublePipe => "||",
            Terminal::ExclamationMark => "!",
            Terminal::Plus => "+",
            Terminal::Minus => "-",
            Terminal::Times => "*",
            Terminal::Divide => "/",
            Terminal::Modulo => "%",
            Terminal::Dot => ".",
            Terminal::Comma => ",",
            Terminal::Semicolon => ";",
            Terminal::Colon => ":",
            Terminal::QuestionMark => "?",
            Terminal::LParen => "(",
            Terminal::RParen => ")",
            Terminal::LBrace => "{",
            Terminal::RBrace => "}",
            Terminal::LBracket => "[",
            Terminal::RBracket => "]",
            Terminal::BigRightArrow => "=>",
            Terminal::SmallRightArrow => "->",
            Terminal::Underscore => "_",
        }
    }
}

/// A lexed token with its source span.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Terminal { terminal: Terminal, span: Span },
    Id { value: String, span: Span },
    Integer { value: i64, span: Span },
    Float { value: f64, span: Span },
    /// Raw string contents without the surrounding quotes; escape sequences
    /// are processed later by the AST builder.
    Str { value: String, span: Span },
    /// Currency symbol plus the raw amount text (commas preserved).
    Money {
        currency: String,
        amount: String,
        span: Span,
    },
    Percent { value: String, span: Span },
    /// ISO-8601 date text (`YYYY-MM-DD`).
    Date { value: String, span: Span },
}

impl Token {
    pub fn span(&self) -> Span {
        match self {
            Token::Terminal { span, .. }
            | Token::Id { span, .. }
            | Token::Integer { span, .. }
            | Token::Float { span, .. }
            | Token::Str { span, .. }
            | Token::Money { span, .. }
            | Token::Percent { span, .. }
            | Token::Date { span, .. } => span.clone(),
        }
    }

    pub fn is_terminal(&self, terminal: Terminal) -> bool {
        matches!(self, Token::Terminal { terminal: t, .. } if *t == terminal)
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Terminal { terminal, .. } => f.write_str(terminal.lexeme()),
            Token::Id { value, .. } => f.write_str(value),
            Token::Integer { value, .. } => write!(f, "{value}"),
            Token::Float { value, .. } => write!(f, "{value}"),
            Token::Str { value, .. } => write!(f, "\"{value}\""),
            Token::Money {
                currency, amount, ..
            } => write!(f, "{currency}{amount}"),
            Token::Percent { value, .. } => write!(f, "{value}%"),
            Token::Date { value, .. } => f.write_str(value),
        }
    }
}
