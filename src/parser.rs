//! Parsing of source text into a tree-sitter tree plus its token stream.

use thiserror::Error;
use tracing::debug;
use tree_sitter::{Node, Parser, Tree};

use crate::dialect::Dialect;

/// Longest token text quoted in an error message.
const MAX_QUOTED_TOKEN: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
/// Byte range of a node or token, with the rows it starts and ends on.
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub start_row: usize,
    pub end_row: usize,
}

impl Span {
    pub fn of(node: Node<'_>) -> Self {
        Self {
            start: node.start_byte(),
            end: node.end_byte(),
            start_row: node.start_position().row,
            end_row: node.end_position().row,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Whether a file reads as an ES module or as a classic script.
pub enum ModuleKind {
    Module,
    Script,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: &'static str,
    pub span: Span,
}

impl Token {
    pub fn is_comment(&self) -> bool {
        matches!(self.kind, "comment" | "html_comment")
    }
}

#[derive(Debug, Clone, Default)]
/// Every leaf of the syntax tree in source order, comments included.
pub struct TokenStream {
    tokens: Vec<Token>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Which sides of a span share a line with another token.
pub struct LineNeighbours {
    pub before: bool,
    pub after: bool,
}

impl TokenStream {
    /// Tokens lying entirely within `start..end`.
    pub fn within(&self, start: usize, end: usize) -> &[Token] {
        let first = self.tokens.partition_point(|t| t.span.start < start);
        let last = self.tokens.partition_point(|t| t.span.end <= end).max(first);
        &self.tokens[first..last]
    }

    /// First token at or after `offset` that is not a comment.
    pub fn next_significant(&self, offset: usize) -> Option<&Token> {
        let first = self.tokens.partition_point(|t| t.span.start < offset);
        self.tokens[first..].iter().find(|t| !t.is_comment())
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Looks at the tokens right outside of `span` and reports whether they sit on the line where
    /// `span` starts (before) or ends (after).
    pub fn line_neighbours(&self, span: Span) -> LineNeighbours {
        let first_inside = self.tokens.partition_point(|t| t.span.end <= span.start);
        let before = first_inside
            .checked_sub(1)
            .map(|ix| self.tokens[ix].span.end_row == span.start_row)
            .unwrap_or(false);

        let first_after = self.tokens.partition_point(|t| t.span.start < span.end);
        let after = self
            .tokens
            .get(first_after)
            .map(|t| t.span.start_row == span.end_row)
            .unwrap_or(false);

        LineNeighbours { before, after }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorCause {
    #[error("unexpected token `{0}`")]
    UnexpectedToken(String),
    #[error("unterminated {0} literal")]
    UnterminatedLiteral(&'static str),
    #[error("missing `{0}`")]
    MissingToken(&'static str),
    #[error("{feature} is not enabled for this dialect")]
    Unsupported { feature: &'static str },
    #[error("{0}")]
    Grammar(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{line}:{column}: {cause}")]
/// Malformed or unsupported syntax, located at a 1-based line and column.
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub cause: ParseErrorCause,
}

/// One file's text with its parsed tree and tokens.
pub struct SourceUnit<'a> {
    text: &'a str,
    module_kind: ModuleKind,
    tree: Tree,
    tokens: TokenStream,
}

impl std::fmt::Debug for SourceUnit<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceUnit")
            .field("len", &self.text.len())
            .field("module_kind", &self.module_kind)
            .field("tokens", &self.tokens.len())
            .finish()
    }
}

impl<'a> SourceUnit<'a> {
    /// Parse `text` with the grammar selected by `dialect`.
    pub fn parse(text: &'a str, dialect: Dialect) -> Result<Self, ParseError> {
        let mut parser = Parser::new();
        parser
            .set_language(&dialect.grammar().language())
            .map_err(|err| ParseError {
                line: 1,
                column: 1,
                cause: ParseErrorCause::Grammar(err.to_string()),
            })?;

        let tree = parser.parse(text, None).ok_or_else(|| ParseError {
            line: 1,
            column: 1,
            cause: ParseErrorCause::Grammar("parser produced no tree".to_owned()),
        })?;

        let root = tree.root_node();
        if root.has_error() {
            return Err(first_syntax_error(text, root));
        }
        check_dialect(text, root, dialect)?;

        let module_kind = detect_module_kind(root);
        let tokens = collect_tokens(root);
        debug!(
            grammar = ?dialect.grammar(),
            ?module_kind,
            tokens = tokens.len(),
            "parsed source unit"
        );

        Ok(Self {
            text,
            module_kind,
            tree,
            tokens,
        })
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn module_kind(&self) -> ModuleKind {
        self.module_kind
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn tokens(&self) -> &TokenStream {
        &self.tokens
    }
}

/// Pre-order walk over `root`. `visit` returns whether the children of a node should be walked.
fn walk_preorder<'t>(root: Node<'t>, mut visit: impl FnMut(Node<'t>) -> bool) {
    let mut cursor = root.walk();
    loop {
        if visit(cursor.node()) && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

fn location(text: &str, byte: usize) -> (usize, usize) {
    let byte = byte.min(text.len());
    let before = &text[..byte];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|ix| ix + 1).unwrap_or(0);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

fn error_at(text: &str, byte: usize, cause: ParseErrorCause) -> ParseError {
    let (line, column) = location(text, byte);
    ParseError {
        line,
        column,
        cause,
    }
}

fn first_syntax_error(text: &str, root: Node<'_>) -> ParseError {
    let mut found = None;
    walk_preorder(root, |node| {
        if found.is_some() {
            return false;
        }
        if node.is_error() || node.is_missing() {
            found = Some(node);
            return false;
        }
        node.has_error()
    });

    let Some(node) = found else {
        return error_at(
            text,
            root.start_byte(),
            ParseErrorCause::UnexpectedToken(String::new()),
        );
    };

    if node.is_missing() {
        return error_at(
            text,
            node.start_byte(),
            ParseErrorCause::MissingToken(node.kind()),
        );
    }

    let erroneous = &text[node.start_byte()..node.end_byte()];
    let cause = match unterminated_literal(erroneous) {
        Some(literal) => ParseErrorCause::UnterminatedLiteral(literal),
        None => {
            let mut leaf = node;
            while let Some(child) = leaf.child(0) {
                leaf = child;
            }
            let token = &text[leaf.start_byte()..leaf.end_byte()];
            let token = if token.is_empty() { erroneous } else { token };
            ParseErrorCause::UnexpectedToken(token.chars().take(MAX_QUOTED_TOKEN).collect())
        }
    };
    error_at(text, node.start_byte(), cause)
}

fn unterminated_literal(erroneous: &str) -> Option<&'static str> {
    if erroneous.starts_with("/*") && !erroneous.contains("*/") {
        return Some("comment");
    }
    let quote = erroneous.chars().next()?;
    let literal = match quote {
        '"' | '\'' => "string",
        '`' => "template",
        _ => return None,
    };
    let rest = &erroneous[quote.len_utf8()..];
    let closed = match literal {
        "string" => rest
            .lines()
            .next()
            .map(|line| line.contains(quote))
            .unwrap_or(false),
        _ => rest.contains(quote),
    };
    (!closed).then_some(literal)
}

const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "function_expression",
    "function",
    "generator_function",
    "generator_function_declaration",
    "arrow_function",
    "method_definition",
    "class_static_block",
];

fn inside_function(node: Node<'_>) -> bool {
    let mut current = node.parent();
    while let Some(parent) = current {
        if FUNCTION_KINDS.contains(&parent.kind()) {
            return true;
        }
        current = parent.parent();
    }
    false
}

fn disabled_feature(node: Node<'_>, dialect: Dialect) -> Option<&'static str> {
    match node.kind() {
        "jsx_element" | "jsx_self_closing_element" if !dialect.jsx => Some("JSX"),
        "decorator" if !dialect.decorators => Some("decorator syntax"),
        "optional_chain" if !dialect.optional_chaining => Some("optional chaining"),
        "call_expression" if !dialect.dynamic_import => node
            .child_by_field_name("function")
            .filter(|callee| callee.kind() == "import")
            .map(|_| "dynamic import"),
        "await_expression" if !dialect.top_level_await && !inside_function(node) => {
            Some("top-level await")
        }
        _ => None,
    }
}

fn check_dialect(text: &str, root: Node<'_>, dialect: Dialect) -> Result<(), ParseError> {
    if dialect == Dialect::all() {
        return Ok(());
    }
    let mut unsupported = None;
    walk_preorder(root, |node| {
        if unsupported.is_some() {
            return false;
        }
        if let Some(feature) = disabled_feature(node, dialect) {
            unsupported = Some((node.start_byte(), feature));
            return false;
        }
        true
    });

    match unsupported {
        Some((byte, feature)) => Err(error_at(
            text,
            byte,
            ParseErrorCause::Unsupported { feature },
        )),
        None => Ok(()),
    }
}

fn detect_module_kind(root: Node<'_>) -> ModuleKind {
    let mut cursor = root.walk();
    let is_module = root
        .named_children(&mut cursor)
        .any(|child| matches!(child.kind(), "import_statement" | "export_statement"));
    if is_module {
        ModuleKind::Module
    } else {
        ModuleKind::Script
    }
}

fn collect_tokens(root: Node<'_>) -> TokenStream {
    let mut tokens = vec![];
    walk_preorder(root, |node| {
        if node.child_count() == 0 {
            tokens.push(Token {
                kind: node.kind(),
                span: Span::of(node),
            });
            return false;
        }
        true
    });
    TokenStream { tokens }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::{ModuleKind, ParseErrorCause, SourceUnit, Span};
    use crate::dialect::Dialect;

    #[test]
    fn parser_empty_string() {
        let unit = SourceUnit::parse("", Dialect::all()).unwrap();
        assert!(unit.tokens().is_empty());
        assert_eq!(unit.module_kind(), ModuleKind::Script);
    }

    #[test]
    fn parser_detects_module_from_content() {
        let module = indoc! {r#"
            import fs from "fs";
            const path = require("path");
        "#};
        let unit = SourceUnit::parse(module, Dialect::javascript()).unwrap();
        assert_eq!(unit.module_kind(), ModuleKind::Module);

        let script = "const path = require('path');\n";
        let unit = SourceUnit::parse(script, Dialect::javascript()).unwrap();
        assert_eq!(unit.module_kind(), ModuleKind::Script);
    }

    #[test]
    fn parser_tolerates_return_outside_function() {
        let test_code = "if (done) return;\nconsole.log(1);\n";
        assert!(SourceUnit::parse(test_code, Dialect::javascript()).is_ok());
    }

    #[test]
    fn parser_accepts_typed_markup() {
        let test_code = indoc! {r#"
            @Component({ selector: "app" })
            class App {
                render(props: Props): JSX.Element {
                    return <div onClick={() => console.log(props?.id)}>{props.name}</div>;
                }
            }
            const mod = await import("./lazy");
        "#};
        assert!(SourceUnit::parse(test_code, Dialect::all()).is_ok());
    }

    #[test]
    fn parser_reports_unexpected_token_location() {
        let test_code = "const a = 1;\nconst = 2;\n";
        let err = SourceUnit::parse(test_code, Dialect::javascript()).unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn parser_rejects_types_in_javascript() {
        let test_code = "let count: number = 1;\n";
        assert!(SourceUnit::parse(test_code, Dialect::javascript()).is_err());
        assert!(SourceUnit::parse(test_code, Dialect::typescript()).is_ok());
    }

    #[test]
    fn parser_rejects_disabled_extensions() {
        let no_jsx = Dialect {
            jsx: false,
            ..Dialect::javascript()
        };
        let err = SourceUnit::parse("const el = <br />;\n", no_jsx).unwrap_err();
        assert_eq!(err.cause, ParseErrorCause::Unsupported { feature: "JSX" });
        assert_eq!((err.line, err.column), (1, 12));

        let no_await = Dialect {
            top_level_await: false,
            ..Dialect::javascript()
        };
        let err = SourceUnit::parse("await ready();\n", no_await).unwrap_err();
        assert_eq!(
            err.cause,
            ParseErrorCause::Unsupported {
                feature: "top-level await"
            }
        );
        assert!(SourceUnit::parse("async function f() { await ready(); }\n", no_await).is_ok());

        let no_chaining = Dialect {
            optional_chaining: false,
            ..Dialect::javascript()
        };
        let err = SourceUnit::parse("a?.b;\n", no_chaining).unwrap_err();
        assert_eq!(
            err.cause,
            ParseErrorCause::Unsupported {
                feature: "optional chaining"
            }
        );
    }

    #[test]
    fn token_stream_line_neighbours() {
        let test_code = "a(); b();\nc();\n";
        let unit = SourceUnit::parse(test_code, Dialect::javascript()).unwrap();

        let second = Span {
            start: 5,
            end: 9,
            start_row: 0,
            end_row: 0,
        };
        let neighbours = unit.tokens().line_neighbours(second);
        assert!(neighbours.before);
        assert!(!neighbours.after);

        let third = Span {
            start: 10,
            end: 14,
            start_row: 1,
            end_row: 1,
        };
        let neighbours = unit.tokens().line_neighbours(third);
        assert!(!neighbours.before);
        assert!(!neighbours.after);
    }

    #[test]
    fn token_stream_lookups() {
        let test_code = "a(b, /* c */ d);
// tail
e;
";
        let unit = SourceUnit::parse(test_code, Dialect::javascript()).unwrap();
        let tokens = unit.tokens();

        let kinds: Vec<_> = tokens.within(2, 14).iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec!["identifier", ",", "comment", "identifier"]);

        let next = tokens.next_significant(16).unwrap();
        assert_eq!(&test_code[next.span.start..next.span.end], "e");
    }
}
