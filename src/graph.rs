use petgraph::{
    stable_graph::{NodeIndex, StableDiGraph},
    visit::{Dfs, EdgeRef},
    Direction,
};
use tree_sitter::TreeCursor;

use crate::parser::{SourceUnit, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Grammar node kinds the engine looks at. Everything else is carried as `Other`.
pub enum NodeKind {
    Program,
    StatementBlock,
    SwitchCase,
    SwitchDefault,
    ExpressionStatement,
    IfStatement,
    ElseClause,
    WhileStatement,
    DoStatement,
    ForStatement,
    ForInStatement,
    LabeledStatement,
    WithStatement,
    CallExpression,
    NewExpression,
    MemberExpression,
    SubscriptExpression,
    SequenceExpression,
    ParenthesizedExpression,
    BinaryExpression,
    NonNullExpression,
    Identifier,
    PropertyIdentifier,
    StringLiteral,
    EscapeSequence,
    TemplateString,
    Comment,
    Other(&'static str),
}

impl NodeKind {
    pub fn from_grammar(kind: &'static str) -> Self {
        match kind {
            "program" => Self::Program,
            "statement_block" => Self::StatementBlock,
            "switch_case" => Self::SwitchCase,
            "switch_default" => Self::SwitchDefault,
            "expression_statement" => Self::ExpressionStatement,
            "if_statement" => Self::IfStatement,
            "else_clause" => Self::ElseClause,
            "while_statement" => Self::WhileStatement,
            "do_statement" => Self::DoStatement,
            "for_statement" => Self::ForStatement,
            "for_in_statement" => Self::ForInStatement,
            "labeled_statement" => Self::LabeledStatement,
            "with_statement" => Self::WithStatement,
            "call_expression" => Self::CallExpression,
            "new_expression" => Self::NewExpression,
            "member_expression" => Self::MemberExpression,
            "subscript_expression" => Self::SubscriptExpression,
            "sequence_expression" => Self::SequenceExpression,
            "parenthesized_expression" => Self::ParenthesizedExpression,
            "binary_expression" => Self::BinaryExpression,
            "non_null_expression" => Self::NonNullExpression,
            "identifier" => Self::Identifier,
            "property_identifier" => Self::PropertyIdentifier,
            "string" => Self::StringLiteral,
            "escape_sequence" => Self::EscapeSequence,
            "template_string" => Self::TemplateString,
            "comment" | "html_comment" => Self::Comment,
            other => Self::Other(other),
        }
    }

    /// Containers whose children form a list of statements.
    pub fn holds_statement_list(self) -> bool {
        matches!(
            self,
            Self::Program | Self::StatementBlock | Self::SwitchCase | Self::SwitchDefault
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Text generated in place of a node.
pub enum Replacement {
    /// `void 0`
    Placeholder,
    /// `{}`
    EmptyBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Text generated around a kept node.
pub struct Enclosure {
    pub prefix: &'static str,
    pub suffix: &'static str,
}

impl Enclosure {
    pub const fn new(prefix: &'static str, suffix: &'static str) -> Self {
        Self { prefix, suffix }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Kept,
    /// Deleted from its container.
    Removed,
    Replaced(Replacement),
    /// Generates as the given descendant.
    Hoisted(NodeIndex),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    /// Field name the node occupies in its parent, if the grammar names one.
    pub field: Option<&'static str>,
    pub span: Span,
    pub parent: Option<NodeIndex>,
    pub state: NodeState,
    pub enclosure: Option<Enclosure>,
}

impl SyntaxNode {
    pub fn is_kept(&self) -> bool {
        self.state == NodeState::Kept
    }
}

/// Arena of syntax nodes addressed by stable indices. Edge weights order siblings.
#[derive(Debug)]
pub struct SyntaxTree<'a> {
    source: &'a str,
    graph: StableDiGraph<SyntaxNode, u32>,
    root_node: Option<NodeIndex>,
    next_ordinal: u32,
}

impl<'a> AsRef<StableDiGraph<SyntaxNode, u32>> for SyntaxTree<'a> {
    fn as_ref(&self) -> &StableDiGraph<SyntaxNode, u32> {
        &self.graph
    }
}

impl<'a> SyntaxTree<'a> {
    pub fn new(source: &'a str) -> Self {
        SyntaxTree {
            source,
            graph: StableDiGraph::new(),
            root_node: None,
            next_ordinal: 0,
        }
    }

    /// Builds the arena for a parsed unit.
    pub fn from_unit(unit: &SourceUnit<'a>) -> Self {
        let mut syntax_tree = SyntaxTree::new(unit.text());
        let mut graph_builder = GraphBuilder::new(&mut syntax_tree);
        graph_builder.visit_unit(unit);
        syntax_tree
    }

    fn add_node(&mut self, node: SyntaxNode) -> NodeIndex {
        self.graph.add_node(node)
    }

    fn add_edge(&mut self, source: NodeIndex, target: NodeIndex) {
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        self.graph.add_edge(source, target, ordinal);
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn root_node(&self) -> Option<NodeIndex> {
        self.root_node
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn contains(&self, ix: NodeIndex) -> bool {
        self.graph.contains_node(ix)
    }

    pub fn node(&self, ix: NodeIndex) -> &SyntaxNode {
        &self.graph[ix]
    }

    pub fn kind(&self, ix: NodeIndex) -> NodeKind {
        self.graph[ix].kind
    }

    pub fn parent(&self, ix: NodeIndex) -> Option<NodeIndex> {
        self.graph[ix].parent
    }

    /// Original source text covered by the node.
    pub fn text(&self, ix: NodeIndex) -> &'a str {
        let span = self.graph[ix].span;
        &self.source[span.start..span.end]
    }

    /// Children in source order.
    pub fn children(&self, ix: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(ix, Direction::Outgoing)
            .map(|edge| (*edge.weight(), edge.target()))
            .collect();
        edges.sort_unstable_by_key(|(ordinal, _)| *ordinal);
        edges.into_iter().map(|(_, child)| child).collect()
    }

    pub fn child_by_field(&self, ix: NodeIndex, field: &str) -> Option<NodeIndex> {
        self.children(ix)
            .into_iter()
            .find(|child| self.graph[*child].field == Some(field))
    }

    /// Children that are not comments.
    pub fn operands(&self, ix: NodeIndex) -> Vec<NodeIndex> {
        self.children(ix)
            .into_iter()
            .filter(|child| self.graph[*child].kind != NodeKind::Comment)
            .collect()
    }

    pub fn descendants(&self, ix: NodeIndex) -> Vec<NodeIndex> {
        let mut dfs = Dfs::new(&self.graph, ix);
        let mut descendants = vec![];
        while let Some(next) = dfs.next(&self.graph) {
            if next != ix {
                descendants.push(next);
            }
        }
        descendants
    }

    /// Deletes the node from its container. Its subtree is dropped from the arena.
    pub fn remove(&mut self, ix: NodeIndex) {
        self.prune_descendants(ix);
        self.graph[ix].state = NodeState::Removed;
    }

    /// Replaces the node and its subtree with generated text.
    pub fn replace(&mut self, ix: NodeIndex, replacement: Replacement) {
        self.prune_descendants(ix);
        self.graph[ix].state = NodeState::Replaced(replacement);
    }

    /// Makes `ix` generate as one of its descendants.
    pub fn hoist(&mut self, ix: NodeIndex, descendant: NodeIndex) {
        self.graph[ix].state = NodeState::Hoisted(descendant);
    }

    pub fn enclose(&mut self, ix: NodeIndex, enclosure: Enclosure) {
        self.graph[ix].enclosure = Some(enclosure);
    }

    /// Whether the closest kept statement before `statement` in its list can run on into the next
    /// line, so that a line starting with `(` or `[` would continue it.
    pub fn previous_statement_is_open(&self, statement: NodeIndex) -> bool {
        let Some(holder) = self.parent(statement) else {
            return false;
        };
        if !self.kind(holder).holds_statement_list() {
            return false;
        }
        let siblings = self.children(holder);
        let Some(position) = siblings.iter().position(|ix| *ix == statement) else {
            return false;
        };
        let previous = siblings[..position].iter().rev().find(|ix| {
            let node = &self.graph[**ix];
            node.kind != NodeKind::Comment && node.state != NodeState::Removed
        });
        let Some(&previous) = previous else {
            return false;
        };
        // `case value:` ends with its colon.
        if self.graph[previous].field == Some("value") {
            return false;
        }

        let text = self.text(previous).trim_end();
        if text.ends_with(';') {
            return false;
        }
        if text.ends_with('}') {
            return matches!(
                self.kind(previous),
                NodeKind::ExpressionStatement
                    | NodeKind::Other(
                        "lexical_declaration"
                            | "variable_declaration"
                            | "export_statement"
                            | "type_alias_declaration"
                    )
            );
        }
        true
    }

    fn prune_descendants(&mut self, ix: NodeIndex) {
        for descendant in self.descendants(ix) {
            self.graph.remove_node(descendant);
        }
    }
}

/// Whether a statement starting with `text` would continue an open statement on the line before.
pub fn starts_continuation(text: &str) -> bool {
    matches!(
        text.chars().next(),
        Some('(' | '[' | '`' | '+' | '-' | '/' | '<')
    )
}

/// Walks a tree-sitter tree and inserts its named nodes into a `SyntaxTree`.
pub struct GraphBuilder<'s, 'a> {
    syntax_tree: &'s mut SyntaxTree<'a>,
    current_node: Option<NodeIndex>,
}

impl<'s, 'a> GraphBuilder<'s, 'a> {
    pub fn new(syntax_tree: &'s mut SyntaxTree<'a>) -> Self {
        Self {
            syntax_tree,
            current_node: None,
        }
    }

    pub fn visit_unit(&mut self, unit: &SourceUnit<'a>) {
        let mut cursor = unit.tree().root_node().walk();
        self.visit(&mut cursor);
    }

    fn visit(&mut self, cursor: &mut TreeCursor<'_>) {
        let node = cursor.node();
        // Punctuation and keywords are regenerated from the source text.
        if !node.is_named() {
            return;
        }

        let kind = NodeKind::from_grammar(node.kind());
        // `a, b, c` nests to the right; keep every operand under the outermost sequence.
        if kind == NodeKind::SequenceExpression
            && self
                .current_node
                .is_some_and(|parent| self.syntax_tree.kind(parent) == NodeKind::SequenceExpression)
        {
            self.visit_children(cursor);
            return;
        }

        let node_index = self.syntax_tree.add_node(SyntaxNode {
            kind,
            field: cursor.field_name(),
            span: Span::of(node),
            parent: self.current_node,
            state: NodeState::Kept,
            enclosure: None,
        });

        let parent_node = self.current_node;
        match parent_node {
            Some(parent_node) => self.syntax_tree.add_edge(parent_node, node_index),
            None => self.syntax_tree.root_node = Some(node_index),
        }

        self.current_node = Some(node_index);
        self.visit_children(cursor);
        self.current_node = parent_node;
    }

    fn visit_children(&mut self, cursor: &mut TreeCursor<'_>) {
        if !cursor.goto_first_child() {
            return;
        }
        loop {
            self.visit(cursor);
            if !cursor.goto_next_sibling() {
                break;
            }
        }
        cursor.goto_parent();
    }
}

#[cfg(test)]
mod tests {
    use crate::{dialect::Dialect, parser::SourceUnit};

    use super::{starts_continuation, NodeKind, NodeState, Replacement, SyntaxTree};

    fn node_kinds(tree: &SyntaxTree<'_>) -> Vec<NodeKind> {
        let root = tree.root_node().unwrap();
        let mut kinds = vec![tree.kind(root)];
        kinds.extend(tree.descendants(root).into_iter().map(|ix| tree.kind(ix)));
        kinds
    }

    #[test]
    fn graph_program_statement_call() {
        let test_code = "console.log(x);";
        let unit = SourceUnit::parse(test_code, Dialect::javascript()).unwrap();
        let tree = SyntaxTree::from_unit(&unit);

        // program -> expression_statement -> call -> member -> (identifier, property)
        //                                         |-> arguments -> identifier
        assert_eq!(tree.node_count(), 8);
        assert_eq!(
            node_kinds(&tree),
            vec![
                NodeKind::Program,
                NodeKind::ExpressionStatement,
                NodeKind::CallExpression,
                NodeKind::MemberExpression,
                NodeKind::Identifier,
                NodeKind::PropertyIdentifier,
                NodeKind::Other("arguments"),
                NodeKind::Identifier,
            ]
        );
    }

    #[test]
    fn graph_children_keep_source_order_and_parent() {
        let test_code = "first();\nsecond();\nthird();\n";
        let unit = SourceUnit::parse(test_code, Dialect::javascript()).unwrap();
        let tree = SyntaxTree::from_unit(&unit);
        let root = tree.root_node().unwrap();

        let statements: Vec<_> = tree.children(root).into_iter().map(|ix| tree.text(ix)).collect();
        assert_eq!(statements, vec!["first();", "second();", "third();"]);
        for child in tree.children(root) {
            assert_eq!(tree.parent(child), Some(root));
        }
    }

    #[test]
    fn graph_flattens_sequences() {
        let test_code = "a = (b(), c(), d);";
        let unit = SourceUnit::parse(test_code, Dialect::javascript()).unwrap();
        let tree = SyntaxTree::from_unit(&unit);
        let root = tree.root_node().unwrap();

        let sequence = tree
            .descendants(root)
            .into_iter()
            .find(|ix| tree.kind(*ix) == NodeKind::SequenceExpression)
            .unwrap();
        let operands: Vec<_> = tree
            .operands(sequence)
            .into_iter()
            .map(|ix| tree.text(ix))
            .collect();
        assert_eq!(operands, vec!["b()", "c()", "d"]);
        assert_eq!(
            tree.descendants(root)
                .into_iter()
                .filter(|ix| tree.kind(*ix) == NodeKind::SequenceExpression)
                .count(),
            1
        );
    }

    #[test]
    fn graph_replace_prunes_subtree() {
        let test_code = "f(g(1, 2));";
        let unit = SourceUnit::parse(test_code, Dialect::javascript()).unwrap();
        let mut tree = SyntaxTree::from_unit(&unit);
        let root = tree.root_node().unwrap();
        let inner = tree
            .descendants(root)
            .into_iter()
            .find(|ix| tree.text(*ix) == "g(1, 2)")
            .unwrap();

        let before = tree.node_count();
        let pruned = tree.descendants(inner).len();
        tree.replace(inner, Replacement::Placeholder);

        assert_eq!(tree.node_count(), before - pruned);
        assert!(tree.descendants(inner).is_empty());
        assert_eq!(
            tree.node(inner).state,
            NodeState::Replaced(Replacement::Placeholder)
        );
    }

    #[test]
    fn graph_previous_statement_is_open() {
        let test_code = "a = b\nc();\nlet d = 1;\ne();\nconst f = () => {}\ng();\n";
        let unit = SourceUnit::parse(test_code, Dialect::javascript()).unwrap();
        let tree = SyntaxTree::from_unit(&unit);
        let statements = tree.children(tree.root_node().unwrap());

        let open: Vec<_> = statements
            .iter()
            .map(|ix| tree.previous_statement_is_open(*ix))
            .collect();
        assert_eq!(open, vec![false, true, false, false, false, true]);
    }

    #[test]
    fn continuation_tokens() {
        assert!(starts_continuation("(function () {})()"));
        assert!(starts_continuation("[1, 2].forEach(f)"));
        assert!(starts_continuation("`tpl`"));
        assert!(!starts_continuation("run()"));
        assert!(!starts_continuation(""));
    }
}
