//! Code generation from a rewritten `SyntaxTree`.
//!
//! The original text is copied verbatim between nodes; only removed and replaced nodes change the
//! output. An untouched tree generates its source exactly.

use petgraph::stable_graph::NodeIndex;
use thiserror::Error;

use crate::{
    graph::{starts_continuation, NodeKind, NodeState, Replacement, SyntaxTree},
    parser::{Span, TokenStream},
};

const PLACEHOLDER: &str = "void 0";
const PARENTHESIZED_PLACEHOLDER: &str = "(void 0)";
const EMPTY_BLOCK: &str = "{}";

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Source range left out of the output, with the text generated in its place.
struct Cut {
    start: usize,
    end: usize,
    insert: &'static str,
}

impl Cut {
    fn omit(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            insert: "",
        }
    }

    fn replace(start: usize, end: usize, insert: &'static str) -> Self {
        Self { start, end, insert }
    }
}

/// Code generation from the `SyntaxTree`.
pub struct CodeGenerator<'t, 'a> {
    syntax_tree: &'t SyntaxTree<'a>,
    tokens: &'t TokenStream,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodeGeneratorError {
    #[error("Missing root node in the syntax tree")]
    RootNodeMissingInSyntaxTree,
    #[error("Removed node inside {kind:?} has no removal rule")]
    UnexpectedRemoval { kind: NodeKind },
    #[error("Edits overlap at byte {offset}")]
    OverlappingEdit { offset: usize },
    #[error("Span {start}..{end} is outside of the source text")]
    SpanOutOfBounds { start: usize, end: usize },
    #[error("Hoisted node is missing from the syntax tree")]
    DanglingHoist,
}

impl<'t, 'a> CodeGenerator<'t, 'a> {
    pub fn new(syntax_tree: &'t SyntaxTree<'a>, tokens: &'t TokenStream) -> Self {
        Self {
            syntax_tree,
            tokens,
        }
    }

    pub fn generate(self) -> Result<String, CodeGeneratorError> {
        let root_node_ix = self
            .syntax_tree
            .root_node()
            .ok_or(CodeGeneratorError::RootNodeMissingInSyntaxTree)?;

        let source = self.syntax_tree.source();
        let mut output = String::with_capacity(source.len());
        // The root owns the whole file, including whitespace around its first and last token.
        self.emit(root_node_ix, 0, source.len(), &mut output)?;
        Ok(output)
    }

    fn slice(&self, start: usize, end: usize) -> Result<&'a str, CodeGeneratorError> {
        self.syntax_tree
            .source()
            .get(start..end)
            .ok_or(CodeGeneratorError::SpanOutOfBounds { start, end })
    }

    fn emit(
        &self,
        node_ix: NodeIndex,
        start: usize,
        end: usize,
        output: &mut String,
    ) -> Result<(), CodeGeneratorError> {
        let tree = self.syntax_tree;
        let node = tree.node(node_ix);
        match node.state {
            NodeState::Kept => {}
            NodeState::Removed => {
                let kind = node
                    .parent
                    .map(|parent| tree.kind(parent))
                    .unwrap_or(node.kind);
                return Err(CodeGeneratorError::UnexpectedRemoval { kind });
            }
            NodeState::Replaced(replacement) => {
                output.push_str(self.replacement_text(node_ix, replacement));
                return Ok(());
            }
            NodeState::Hoisted(descendant) => {
                if !tree.contains(descendant) {
                    return Err(CodeGeneratorError::DanglingHoist);
                }
                let span = tree.node(descendant).span;
                return self.emit(descendant, span.start, span.end, output);
            }
        }

        if let Some(enclosure) = node.enclosure {
            output.push_str(enclosure.prefix);
        }

        let children = tree.children(node_ix);
        let mut cuts = self.removal_cuts(node_ix, &children)?.into_iter().peekable();
        let mut cursor = start;
        for &child_ix in &children {
            let child = tree.node(child_ix);
            if child.state == NodeState::Removed {
                continue;
            }
            while let Some(cut) = cuts.next_if(|cut| cut.start < child.span.end) {
                self.apply_cut(&cut, end, &mut cursor, output)?;
            }

            if child.span.start < cursor {
                if child.kind == NodeKind::Comment && child.span.end <= cursor {
                    continue;
                }
                return Err(CodeGeneratorError::OverlappingEdit {
                    offset: child.span.start,
                });
            }
            output.push_str(self.slice(cursor, child.span.start)?);
            self.emit(child_ix, child.span.start, child.span.end, output)?;
            cursor = child.span.end;
        }
        for cut in cuts {
            self.apply_cut(&cut, end, &mut cursor, output)?;
        }

        if cursor < end {
            output.push_str(self.slice(cursor, end)?);
        }
        if let Some(enclosure) = node.enclosure {
            output.push_str(enclosure.suffix);
        }
        Ok(())
    }

    fn apply_cut(
        &self,
        cut: &Cut,
        end: usize,
        cursor: &mut usize,
        output: &mut String,
    ) -> Result<(), CodeGeneratorError> {
        let cut_start = cut.start.max(*cursor);
        let cut_end = cut.end.min(end);
        if cut_start < cut_end {
            output.push_str(self.slice(*cursor, cut_start)?);
            output.push_str(cut.insert);
            *cursor = cut_end;
        }
        Ok(())
    }

    /// Byte ranges dropped from the output for the removed children of `parent_ix`, by start.
    fn removal_cuts(
        &self,
        parent_ix: NodeIndex,
        children: &[NodeIndex],
    ) -> Result<Vec<Cut>, CodeGeneratorError> {
        let tree = self.syntax_tree;
        let kind = tree.kind(parent_ix);
        let mut cuts = vec![];
        let mut position = 0;
        while position < children.len() {
            if tree.node(children[position]).state != NodeState::Removed {
                position += 1;
                continue;
            }
            if kind.holds_statement_list() {
                let (cut, next) = self.statement_cut(children, position);
                cuts.push(cut);
                position = next;
            } else if kind == NodeKind::SequenceExpression {
                cuts.extend(self.operand_cuts(children, position));
                position += 1;
            } else {
                return Err(CodeGeneratorError::UnexpectedRemoval { kind });
            }
        }
        cuts.sort_by_key(|cut| cut.start);
        Ok(cuts)
    }

    /// Removed statements following each other on one line are cut as a single run.
    fn statement_cut(&self, children: &[NodeIndex], position: usize) -> (Cut, usize) {
        let tree = self.syntax_tree;
        let mut last = position;
        while let Some(&next) = children.get(last + 1) {
            let next = tree.node(next);
            if next.state != NodeState::Removed
                || next.span.start_row != tree.node(children[last]).span.end_row
            {
                break;
            }
            last += 1;
        }

        let first = tree.node(children[position]).span;
        let run = Span {
            start: first.start,
            end: tree.node(children[last]).span.end,
            start_row: first.start_row,
            end_row: tree.node(children[last]).span.end_row,
        };

        let source = tree.source();
        let continues = self
            .tokens
            .next_significant(run.end)
            .is_some_and(|token| starts_continuation(&source[token.span.start..]));
        let cut = if continues && tree.previous_statement_is_open(children[position]) {
            // Keep the statement boundary the removed run provided.
            Cut::replace(run.start, run.end, ";")
        } else {
            let (start, end) = self.statement_extent(run);
            Cut::omit(start, end)
        };
        (cut, last + 1)
    }

    /// A statement alone on its lines takes the lines with it. Otherwise only the statement and
    /// the blanks separating it from the code it shares a line with are dropped.
    fn statement_extent(&self, span: Span) -> (usize, usize) {
        let source = self.syntax_tree.source();
        let neighbours = self.tokens.line_neighbours(span);

        let head = &source[..span.start];
        let tail = &source[span.end..];
        let blanks_before = head.len() - head.trim_end_matches(is_blank).len();
        let blanks_after = tail.len() - tail.trim_start_matches(is_blank).len();
        let trailing_end = span.end + blanks_after;

        if neighbours.after {
            return (span.start, trailing_end);
        }
        if neighbours.before {
            return (span.start - blanks_before, trailing_end);
        }

        let line_start = source[..span.start].rfind('\n').map_or(0, |ix| ix + 1);
        let rest = &source[trailing_end..];
        let line_end = if rest.starts_with("\r\n") {
            trailing_end + 2
        } else if rest.starts_with('\n') {
            trailing_end + 1
        } else {
            trailing_end
        };
        (line_start, line_end)
    }

    /// A removed operand takes the comma that separates it from the next kept operand, or from the
    /// previous one when it was last. Comments next to the comma stay.
    fn operand_cuts(&self, children: &[NodeIndex], position: usize) -> Vec<Cut> {
        let tree = self.syntax_tree;
        let source = tree.source();
        let removed = tree.node(children[position]).span;
        let is_kept_operand = |ix: &&NodeIndex| {
            let node = tree.node(**ix);
            node.kind != NodeKind::Comment && node.state != NodeState::Removed
        };

        if let Some(next) = children[position + 1..].iter().find(is_kept_operand) {
            let next_start = tree.node(*next).span.start;
            let between = self.tokens.within(removed.end, next_start);
            let Some(comma) = between.iter().find(|t| t.kind == ",") else {
                return vec![Cut::omit(removed.start, next_start)];
            };
            if let Some(comment) = between
                .iter()
                .find(|t| t.is_comment() && t.span.end <= comma.span.start)
            {
                return vec![
                    Cut::omit(removed.start, comment.span.start),
                    Cut::omit(comma.span.start, comma.span.end),
                ];
            }
            let end = between
                .iter()
                .find(|t| t.is_comment() && t.span.start >= comma.span.end)
                .map_or(next_start, |comment| comment.span.start);
            return vec![Cut::omit(removed.start, end)];
        }

        if let Some(previous) = children[..position].iter().rev().find(is_kept_operand) {
            let previous_end = tree.node(*previous).span.end;
            let between = self.tokens.within(previous_end, removed.start);
            let Some(comma) = between.iter().rev().find(|t| t.kind == ",") else {
                return vec![Cut::omit(previous_end, removed.end)];
            };
            if between
                .iter()
                .any(|t| t.is_comment() && t.span.start >= comma.span.end)
            {
                let head = &source[..removed.start];
                let start = head.trim_end_matches(is_blank).len();
                return vec![
                    Cut::omit(comma.span.start, comma.span.end),
                    Cut::omit(start, removed.end),
                ];
            }
            let start = if between.iter().any(|t| t.is_comment()) {
                comma.span.start
            } else {
                previous_end
            };
            return vec![Cut::omit(start, removed.end)];
        }
        vec![Cut::omit(removed.start, removed.end)]
    }

    fn replacement_text(&self, node_ix: NodeIndex, replacement: Replacement) -> &'static str {
        match replacement {
            Replacement::EmptyBlock => EMPTY_BLOCK,
            Replacement::Placeholder if self.binds_tighter_than_unary(node_ix) => {
                PARENTHESIZED_PLACEHOLDER
            }
            Replacement::Placeholder => PLACEHOLDER,
        }
    }

    /// Positions where `void 0` has to be parenthesized to keep the surrounding expression intact.
    fn binds_tighter_than_unary(&self, node_ix: NodeIndex) -> bool {
        let tree = self.syntax_tree;
        let node = tree.node(node_ix);
        let Some(parent) = node.parent else {
            return false;
        };
        match (tree.kind(parent), node.field) {
            (NodeKind::MemberExpression | NodeKind::SubscriptExpression, Some("object")) => true,
            (NodeKind::CallExpression, Some("function")) => true,
            (NodeKind::NewExpression, Some("constructor")) => true,
            (NodeKind::NonNullExpression, _) => true,
            (NodeKind::BinaryExpression, Some("left")) => self.operator_of(parent) == Some("**"),
            _ => false,
        }
    }

    fn operator_of(&self, binary: NodeIndex) -> Option<&'a str> {
        let tree = self.syntax_tree;
        let left = tree.child_by_field(binary, "left")?;
        let right = tree.child_by_field(binary, "right")?;
        let between = tree
            .source()
            .get(tree.node(left).span.end..tree.node(right).span.start)?;
        Some(between.trim())
    }
}
