//! Parser for Yuho source text.
//!
//! Produces a concrete syntax tree with typed node kinds, field-addressable
//! children and byte offsets. Local errors are recovered: the tree always
//! covers the whole input, with `Error` subtrees standing in for regions
//! that failed to parse.

use colored::Colorize;
use std::{error::Error, fmt::Display, path::Path};

mod grammar;
mod parse_state;
pub mod syntax;

pub use self::parse_state::*;
pub use self::syntax::{SyntaxChild, SyntaxKind, SyntaxNode};

use crate::lexer::{Lexer, Span};

use self::grammar::Parser;

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn eof(item: &str) -> ParseError {
        ParseError {
            message: format!("hit end of input while parsing {item}"),
            span: Span::default(),
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} at {}:{}",
            "parse error:".red(),
            self.message,
            self.span.line,
            self.span.col
        )
    }
}

impl Error for ParseError {}

/// Result of parsing one source file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    pub tree: SyntaxNode,
    pub errors: Vec<ParseError>,
    pub source: String,
    pub file: String,
}

impl ParseResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parse source text into a concrete syntax tree. A leading UTF-8 BOM is
/// stripped before lexing.
pub fn parse(source: &str, file: &str) -> ParseResult {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);

    let (tokens, lex_errors) = Lexer::new(source).lex();
    let (tree, mut errors) = Parser::new(tokens).parse_source_file(source);

    // Lexical errors surface through the same channel as parse errors.
    for lex_error in lex_errors {
        errors.push(ParseError {
            message: lex_error.message,
            span: lex_error.span,
        });
    }
    errors.sort_by_key(|e| (e.span.start_byte, e.span.end_byte));

    ParseResult {
        tree,
        errors,
        source: source.to_string(),
        file: file.to_string(),
    }
}

/// Read a file as UTF-8 and parse it.
pub fn parse_file(path: impl AsRef<Path>) -> std::io::Result<ParseResult> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)?;
    Ok(parse(&source, &path.to_string_lossy()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_source_has_no_errors() {
        for source in ["", "   \n\t  ", "// only a comment\n"] {
            let result = parse(source, "<test>");
            assert!(result.is_valid(), "expected no errors for {source:?}");
            assert_eq!(result.tree.kind, SyntaxKind::SourceFile);
            assert!(result.tree.children.is_empty());
        }
    }

    #[test]
    fn test_root_span_covers_input() {
        let source = "int x := 5;\nint y := x + 1;\n";
        let result = parse(source, "<test>");
        assert_eq!(result.tree.span.start_byte, 0);
        assert_eq!(result.tree.span.end_byte, source.len());
    }

    #[test]
    fn test_parse_variable_declaration() {
        let result = parse("int x := 5;", "<test>");
        assert!(result.is_valid());

        let decl = &result.tree.children[0].node;
        assert_eq!(decl.kind, SyntaxKind::VariableDeclaration);
        assert_eq!(decl.child_by_field("name").unwrap().text(), "x");
        assert_eq!(
            decl.child_by_field("type").unwrap().kind,
            SyntaxKind::BuiltinType
        );
        assert_eq!(
            decl.child_by_field("value").unwrap().kind,
            SyntaxKind::IntegerLiteral
        );
    }

    #[test]
    fn test_parse_function_with_match() {
        let source = "fn f(b: bool) -> int { match b { TRUE => 1, FALSE => 0 }; }";
        let result = parse(source, "<test>");
        assert!(result.is_valid(), "errors: {:?}", result.errors);

        let func = &result.tree.children[0].node;
        assert_eq!(func.kind, SyntaxKind::FunctionDefinition);
        assert_eq!(func.child_by_field("name").unwrap().text(), "f");

        let block = func.child_of_kind(SyntaxKind::Block).unwrap();
        let stmt = &block.children[0].node;
        assert_eq!(stmt.kind, SyntaxKind::ExpressionStatement);
        let match_expr = &stmt.children[0].node;
        assert_eq!(match_expr.kind, SyntaxKind::MatchExpression);
        assert_eq!(
            match_expr.children_of_kind(SyntaxKind::MatchArm).len(),
            2
        );
    }

    #[test]
    fn test_parse_statute() {
        let source = r#"
statute "300" "Murder" {
    definitions {
        "culpable homicide" := "causing death with intent";
    }
    elements {
        actus_reus act := "causes the death of a person";
        mens_rea intent := "intention to cause death";
    }
    penalty {
        imprisonment := 1 year to 10 years;
        fine := $1,000 to $10,000;
    }
    illustrations {
        a "A shoots Z with the intention of killing him.";
    }
}
"#;
        let result = parse(source, "<test>");
        assert!(result.is_valid(), "errors: {:?}", result.errors);

        let statute = &result.tree.children[0].node;
        assert_eq!(statute.kind, SyntaxKind::StatuteBlock);
        assert_eq!(
            statute.child_by_field("section_number").unwrap().text(),
            "300"
        );
        assert_eq!(statute.child_by_field("title").unwrap().text(), "Murder");
        assert!(statute.child_of_kind(SyntaxKind::DefinitionsBlock).is_some());
        assert!(statute.child_of_kind(SyntaxKind::PenaltyBlock).is_some());

        let elements = statute.child_of_kind(SyntaxKind::ElementsBlock).unwrap();
        assert_eq!(elements.children_of_kind(SyntaxKind::ElementEntry).len(), 2);
    }

    #[test]
    fn test_operator_precedence() {
        let result = parse("int x := 1 + 2 * 3;", "<test>");
        let decl = &result.tree.children[0].node;
        let value = decl.child_by_field("value").unwrap();

        assert_eq!(value.kind, SyntaxKind::BinaryExpression);
        assert_eq!(value.child_by_field("operator").unwrap().text(), "+");

        let right = value.child_by_field("right").unwrap();
        assert_eq!(right.kind, SyntaxKind::BinaryExpression);
        assert_eq!(right.child_by_field("operator").unwrap().text(), "*");
    }

    #[test]
    fn test_recovery_keeps_later_declarations() {
        let source = "int x := ;\nint y := 2;";
        let result = parse(source, "<test>");

        assert!(!result.is_valid());
        let kinds: Vec<_> = result.tree.child_nodes().map(|n| n.kind).collect();
        assert!(kinds.contains(&SyntaxKind::Error));
        assert!(kinds.contains(&SyntaxKind::VariableDeclaration));
    }

    #[test]
    fn test_truncated_input_reports_error() {
        let source = "statute \"300\" \"Murder\" { elements {";
        let result = parse(source, "<test>");
        assert!(!result.errors.is_empty());
        assert_eq!(result.tree.span.end_byte, source.len());
    }

    #[test]
    fn test_child_spans_inside_parent() {
        let source = "fn f(b: bool) -> int { return 1; }";
        let result = parse(source, "<test>");

        fn check(node: &SyntaxNode) {
            for child in node.child_nodes() {
                assert!(child.span.start_byte >= node.span.start_byte);
                assert!(child.span.end_byte <= node.span.end_byte);
                check(child);
            }
        }
        check(&result.tree);
    }
}
