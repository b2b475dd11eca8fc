//! Removes matched calls from a syntax tree according to the position they occupy.
//!
//! The context of a matched call is classified once, looking through any parentheses around it:
//!
//! 1. Expression statement: the statement is deleted from its statement list, or becomes `{}` when it
//!    is the only body of an `if`/loop/label.
//! 2. Operand of a sequence expression: the operand is dropped; the sequence is settled after the
//!    walk, since later operands can be removed as well.
//! 3. Anywhere else: the call is replaced by `void 0`.

use indexmap::IndexSet;
use petgraph::stable_graph::NodeIndex;
use tracing::debug;

use crate::{
    graph::{starts_continuation, Enclosure, NodeKind, NodeState, Replacement, SyntaxTree},
    matcher::CallMatcher,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementSlot {
    /// Element of a program, block or switch case body.
    List,
    /// Sole body of a compound statement.
    Single,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Syntactic role of the position a matched call occupies.
pub enum ParentRole {
    StatementHolder {
        statement: NodeIndex,
        slot: StatementSlot,
    },
    SequenceHolder {
        sequence: NodeIndex,
        operand: NodeIndex,
    },
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RemovalStats {
    pub removed: usize,
}

impl RemovalStats {
    pub fn modified(&self) -> bool {
        self.removed > 0
    }
}

pub struct NodeRemover<'m> {
    matcher: &'m CallMatcher,
    touched_sequences: IndexSet<NodeIndex>,
    stats: RemovalStats,
}

impl<'m> NodeRemover<'m> {
    pub fn new(matcher: &'m CallMatcher) -> Self {
        Self {
            matcher,
            touched_sequences: IndexSet::new(),
            stats: RemovalStats::default(),
        }
    }

    /// Removes every matched call in a single pre-order pass.
    pub fn rewrite(mut self, tree: &mut SyntaxTree<'_>) -> RemovalStats {
        if self.matcher.targets().is_empty() {
            return self.stats;
        }
        let Some(root) = tree.root_node() else {
            return self.stats;
        };

        let mut stack = vec![root];
        while let Some(node_ix) = stack.pop() {
            if !tree.contains(node_ix) || !tree.node(node_ix).is_kept() {
                continue;
            }
            if tree.kind(node_ix) == NodeKind::CallExpression {
                let result = self.matcher.match_call(tree, node_ix);
                if result.hit {
                    let role = classify(tree, node_ix);
                    debug!(member = ?result.member_name, ?role, "removing call");
                    self.apply(tree, node_ix, role);
                    continue;
                }
            }
            stack.extend(tree.children(node_ix).into_iter().rev());
        }

        for sequence in std::mem::take(&mut self.touched_sequences) {
            settle_sequence(tree, sequence);
        }
        self.stats
    }

    fn apply(&mut self, tree: &mut SyntaxTree<'_>, call: NodeIndex, role: ParentRole) {
        match role {
            ParentRole::StatementHolder {
                statement,
                slot: StatementSlot::List,
            } => tree.remove(statement),
            ParentRole::StatementHolder {
                statement,
                slot: StatementSlot::Single,
            } => tree.replace(statement, Replacement::EmptyBlock),
            ParentRole::SequenceHolder { sequence, operand } => {
                tree.remove(operand);
                self.touched_sequences.insert(sequence);
            }
            ParentRole::Other => tree.replace(call, Replacement::Placeholder),
        }
        self.stats.removed += 1;
    }
}

/// Classifies the position of `call`. Parentheses around the call do not change its role.
pub fn classify(tree: &SyntaxTree<'_>, call: NodeIndex) -> ParentRole {
    let mut target = call;
    let mut parent = tree.parent(call);
    while let Some(parent_ix) = parent {
        if tree.kind(parent_ix) != NodeKind::ParenthesizedExpression {
            break;
        }
        target = parent_ix;
        parent = tree.parent(parent_ix);
    }
    let Some(parent) = parent else {
        return ParentRole::Other;
    };

    match tree.kind(parent) {
        NodeKind::ExpressionStatement => match statement_slot(tree, parent) {
            Some(slot) => ParentRole::StatementHolder {
                statement: parent,
                slot,
            },
            None => ParentRole::Other,
        },
        NodeKind::SequenceExpression => ParentRole::SequenceHolder {
            sequence: parent,
            operand: target,
        },
        _ => ParentRole::Other,
    }
}

fn statement_slot(tree: &SyntaxTree<'_>, statement: NodeIndex) -> Option<StatementSlot> {
    let holder = tree.parent(statement)?;
    let field = tree.node(statement).field;
    let kind = tree.kind(holder);

    if kind.holds_statement_list() {
        // `case value:` is an expression slot, the statements follow it.
        return (field != Some("value")).then_some(StatementSlot::List);
    }
    let single = match kind {
        NodeKind::IfStatement => field == Some("consequence"),
        NodeKind::ElseClause => true,
        NodeKind::WhileStatement
        | NodeKind::DoStatement
        | NodeKind::ForStatement
        | NodeKind::ForInStatement
        | NodeKind::LabeledStatement
        | NodeKind::WithStatement => field == Some("body"),
        _ => false,
    };
    single.then_some(StatementSlot::Single)
}

/// Final shape of a sequence some operands were removed from.
fn settle_sequence(tree: &mut SyntaxTree<'_>, sequence: NodeIndex) {
    if !tree.contains(sequence) || !tree.node(sequence).is_kept() {
        return;
    }
    let operands = tree.operands(sequence);
    let kept: Vec<_> = operands
        .iter()
        .copied()
        .filter(|operand| tree.node(*operand).state != NodeState::Removed)
        .collect();
    let Some(&first_kept) = kept.first() else {
        tree.replace(sequence, Replacement::Placeholder);
        return;
    };
    let Some(parent) = tree.parent(sequence) else {
        return;
    };

    match tree.kind(parent) {
        NodeKind::ExpressionStatement if operands.first() != Some(&first_kept) => {
            // The statement now starts with a different token.
            let text = tree.text(first_kept);
            let parenthesize = reads_as_declaration(text);
            let guard = starts_continuation(if parenthesize { "(" } else { text })
                && tree.previous_statement_is_open(parent);
            let enclosure = match (guard, parenthesize) {
                (true, true) => Enclosure::new(";(", ")"),
                (true, false) => Enclosure::new(";", ""),
                (false, true) => Enclosure::new("(", ")"),
                (false, false) => return,
            };
            tree.enclose(sequence, enclosure);
        }
        NodeKind::ParenthesizedExpression if kept.len() == 1 => {
            if is_callee(tree, parent) && is_member_access(tree, first_kept) {
                // `(0, obj.method)()` calls the method without `obj` as `this`.
                tree.enclose(sequence, Enclosure::new("0, ", ""));
            } else if can_drop_parentheses(tree, parent, first_kept) {
                tree.hoist(parent, sequence);
            }
        }
        _ => {}
    }
}

/// Whether the outermost parentheses around `parens` are the callee of a call or tagged template.
fn is_callee(tree: &SyntaxTree<'_>, parens: NodeIndex) -> bool {
    let mut outer = parens;
    while let Some(parent) = tree.parent(outer) {
        match tree.kind(parent) {
            NodeKind::ParenthesizedExpression => outer = parent,
            NodeKind::CallExpression => return tree.node(outer).field == Some("function"),
            _ => return false,
        }
    }
    false
}

fn is_member_access(tree: &SyntaxTree<'_>, operand: NodeIndex) -> bool {
    match tree.kind(operand) {
        NodeKind::MemberExpression | NodeKind::SubscriptExpression => true,
        NodeKind::ParenthesizedExpression => tree
            .operands(operand)
            .first()
            .is_some_and(|inner| is_member_access(tree, *inner)),
        _ => false,
    }
}

/// Operands that read the same with or without surrounding parentheses.
fn is_simple_value(tree: &SyntaxTree<'_>, node: NodeIndex) -> bool {
    matches!(
        tree.kind(node),
        NodeKind::Identifier
            | NodeKind::StringLiteral
            | NodeKind::TemplateString
            | NodeKind::CallExpression
            | NodeKind::MemberExpression
            | NodeKind::SubscriptExpression
            | NodeKind::ParenthesizedExpression
            | NodeKind::Other(
                "number"
                    | "true"
                    | "false"
                    | "null"
                    | "undefined"
                    | "this"
                    | "array"
                    | "regex"
            )
    )
}

/// Statements starting with these tokens would not parse as expressions.
fn reads_as_declaration(text: &str) -> bool {
    text.starts_with('{')
        || ["function", "class", "async", "let"]
            .iter()
            .any(|keyword| text.starts_with(keyword))
}

/// Positions where a parenthesized expression can be replaced by its content.
fn is_loose_position(tree: &SyntaxTree<'_>, parens: NodeIndex) -> bool {
    let field = tree.node(parens).field;
    let Some(parent) = tree.parent(parens) else {
        return false;
    };
    match tree.kind(parent) {
        NodeKind::ExpressionStatement => true,
        NodeKind::Other("assignment_expression" | "augmented_assignment_expression") => {
            field == Some("right")
        }
        NodeKind::Other("variable_declarator" | "pair" | "return_statement") => {
            field != Some("name") && field != Some("key")
        }
        NodeKind::Other("arguments" | "array" | "template_substitution" | "jsx_expression") => true,
        _ => false,
    }
}

fn can_drop_parentheses(tree: &SyntaxTree<'_>, parens: NodeIndex, operand: NodeIndex) -> bool {
    if tree.kind(parens) != NodeKind::ParenthesizedExpression || !tree.node(parens).is_kept() {
        return false;
    }
    // Comments inside the parentheses but around the sequence would be lost.
    if tree.children(parens).len() != 1 {
        return false;
    }
    if !is_simple_value(tree, operand) || !is_loose_position(tree, parens) {
        return false;
    }
    if tree.parent(parens).map(|parent| tree.kind(parent)) == Some(NodeKind::ExpressionStatement)
        && reads_as_declaration(tree.text(operand))
    {
        return false;
    }
    // `return(a, b)` must not become `returnb`.
    let start = tree.node(parens).span.start;
    let glued = tree.source()[..start]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$');
    !glued
}
