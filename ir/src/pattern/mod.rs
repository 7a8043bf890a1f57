//! Subgraph matching.
//!
//! [`SubgraphMatcher`] finds occurrences of a small pattern graph inside a
//! larger graph. Pattern placeholders are wildcards that bind whatever value
//! (node or literal) sits in the corresponding position; every other pattern
//! node must map onto a distinct graph node with the same kind and target.

pub mod matcher;

use std::collections::BTreeMap;

use bon::bon;

use crate::node::NodeId;
use crate::types::Argument;

pub use matcher::SubgraphMatcher;

// =============================================================================
// Options
// =============================================================================

/// How literal arguments are compared during matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[derive(strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum LiteralMatching {
    /// Literals must have the same type and value (default).
    #[default]
    Exact,
    /// Any literal position matches anything; placeholders still bind.
    Ignore,
}

/// Matcher configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatcherOptions {
    /// Anchor the match at the pattern's output node instead of its returned values.
    pub match_output: bool,
    /// Pattern placeholders only match graph placeholders.
    pub match_placeholder: bool,
    /// Drop matches sharing non-placeholder graph nodes with an earlier match.
    pub remove_overlapping_matches: bool,
    pub literals: LiteralMatching,
}

impl Default for MatcherOptions {
    fn default() -> Self {
        Self {
            match_output: false,
            match_placeholder: false,
            remove_overlapping_matches: true,
            literals: LiteralMatching::Exact,
        }
    }
}

#[bon]
impl MatcherOptions {
    #[builder]
    pub fn builder(
        #[builder(default = false)] match_output: bool,
        #[builder(default = false)] match_placeholder: bool,
        #[builder(default = true)] remove_overlapping_matches: bool,
        #[builder(default)] literals: LiteralMatching,
    ) -> Self {
        Self { match_output, match_placeholder, remove_overlapping_matches, literals }
    }

    /// Options for literal-insensitive matching, everything else default.
    pub fn ignoring_literals() -> Self {
        Self { literals: LiteralMatching::Ignore, ..Self::default() }
    }
}

// =============================================================================
// Match result
// =============================================================================

/// One occurrence of a pattern inside a graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InternalMatch {
    /// Pattern nodes the search started from.
    pub anchors: Vec<NodeId>,
    /// Pattern node → bound graph value.
    ///
    /// Non-placeholder pattern nodes always map to [`Argument::Node`];
    /// placeholders may also bind literals.
    pub nodes_map: BTreeMap<NodeId, Argument>,
    /// Values bound to the pattern placeholders, in pattern order.
    pub placeholder_nodes: Vec<Argument>,
    /// Graph nodes standing in for the pattern's returned values.
    pub returning_nodes: Vec<NodeId>,
}

impl InternalMatch {
    pub fn new(anchors: Vec<NodeId>) -> Self {
        Self { anchors, ..Default::default() }
    }

    /// Graph node bound to pattern node `pattern_node`, if it is a node.
    pub fn graph_node(&self, pattern_node: NodeId) -> Option<NodeId> {
        self.nodes_map.get(&pattern_node).and_then(Argument::as_node)
    }

    /// Whether some pattern node is already bound to `graph_node`.
    pub fn binds_graph_node(&self, graph_node: NodeId) -> bool {
        self.nodes_map.values().any(|value| value.as_node() == Some(graph_node))
    }

    /// All graph nodes bound by this match (placeholders included).
    pub fn matched_graph_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes_map.values().filter_map(Argument::as_node)
    }
}
