//! Decides whether a call expression targets one of the diagnostic members of the receiver.

use indexmap::IndexSet;
use petgraph::stable_graph::NodeIndex;

use crate::graph::{NodeKind, SyntaxTree};

/// The global object whose members are removed unless configured otherwise.
pub const DEFAULT_RECEIVER: &str = "console";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Ordered set of member names to remove. Membership is exact and case sensitive.
pub struct TargetNames {
    names: IndexSet<String>,
}

impl TargetNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a comma separated list, e.g. `"log, warn,error"`.
    pub fn from_list(list: &str) -> Self {
        list.split(',').collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for TargetNames {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let names = iter
            .into_iter()
            .map(|name| name.as_ref().trim().to_owned())
            .filter(|name| !name.is_empty())
            .collect();
        Self { names }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchResult {
    pub hit: bool,
    pub member_name: Option<String>,
}

impl MatchResult {
    fn miss() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone)]
pub struct CallMatcher {
    receiver: String,
    targets: TargetNames,
}

impl CallMatcher {
    pub fn new(receiver: impl Into<String>, targets: TargetNames) -> Self {
        Self {
            receiver: receiver.into(),
            targets,
        }
    }

    pub fn targets(&self) -> &TargetNames {
        &self.targets
    }

    /// Matches a call expression node. Tagged templates share the grammar node with calls and are
    /// rejected here.
    pub fn match_call(&self, tree: &SyntaxTree<'_>, call: NodeIndex) -> MatchResult {
        if tree.kind(call) != NodeKind::CallExpression {
            return MatchResult::miss();
        }
        let tagged = tree
            .child_by_field(call, "arguments")
            .map_or(true, |arguments| tree.kind(arguments) == NodeKind::TemplateString);
        if tagged {
            return MatchResult::miss();
        }
        match tree.child_by_field(call, "function") {
            Some(callee) => self.matches(tree, callee),
            None => MatchResult::miss(),
        }
    }

    /// Matches `receiver.member`, `receiver?.member`, `receiver["member"]` and
    /// `receiver?.["member"]` where `member` is a target name.
    pub fn matches(&self, tree: &SyntaxTree<'_>, callee: NodeIndex) -> MatchResult {
        let member_name = match tree.kind(callee) {
            NodeKind::MemberExpression => tree
                .child_by_field(callee, "property")
                .filter(|property| tree.kind(*property) == NodeKind::PropertyIdentifier)
                .map(|property| tree.text(property).to_owned()),
            NodeKind::SubscriptExpression => tree
                .child_by_field(callee, "index")
                .and_then(|index| string_literal_value(tree, index)),
            _ => None,
        };
        let Some(member_name) = member_name else {
            return MatchResult::miss();
        };

        let receiver_matches = tree
            .child_by_field(callee, "object")
            .is_some_and(|object| {
                tree.kind(object) == NodeKind::Identifier && tree.text(object) == self.receiver
            });

        if receiver_matches && self.targets.contains(&member_name) {
            MatchResult {
                hit: true,
                member_name: Some(member_name),
            }
        } else {
            MatchResult::miss()
        }
    }
}

/// Value of a plain string literal. Literals with escape sequences are not resolved.
fn string_literal_value(tree: &SyntaxTree<'_>, node: NodeIndex) -> Option<String> {
    if tree.kind(node) != NodeKind::StringLiteral {
        return None;
    }
    let escaped = tree
        .descendants(node)
        .into_iter()
        .any(|child| tree.kind(child) == NodeKind::EscapeSequence);
    if escaped {
        return None;
    }
    let text = tree.text(node);
    let quote = text.chars().next()?;
    text.strip_prefix(quote)
        .and_then(|rest| rest.strip_suffix(quote))
        .map(str::to_owned)
}
