//! Backtracking subgraph isomorphism.

use std::collections::{HashMap, HashSet};

use snafu::{OptionExt, ensure};

use crate::error::*;
use crate::graph::Graph;
use crate::node::{Node, NodeId};
use crate::op::OpKind;
use crate::pattern::{InternalMatch, LiteralMatching, MatcherOptions};
use crate::schema::resolve_arguments;
use crate::types::Argument;

/// Matches one pattern graph against arbitrary target graphs.
#[derive(Debug)]
pub struct SubgraphMatcher<'p> {
    pattern: &'p Graph,
    options: MatcherOptions,
    placeholders: Vec<NodeId>,
    /// Pattern nodes other than placeholders and the output.
    interior: Vec<NodeId>,
    returning_nodes: Vec<NodeId>,
    anchors: Vec<NodeId>,
}

/// (pattern anchor, graph candidates in program order)
type Candidates = Vec<(NodeId, Vec<NodeId>)>;

impl<'p> SubgraphMatcher<'p> {
    /// Prepare a matcher for `pattern`.
    ///
    /// The pattern must have an output node and no dead code: every node other
    /// than the output needs at least one user.
    pub fn new(pattern: &'p Graph, options: MatcherOptions) -> Result<Self> {
        let output = pattern.output_node().context(MissingOutputSnafu)?;
        for node in pattern.nodes() {
            ensure!(
                node.op == OpKind::Output || !node.users.is_empty(),
                DeadPatternNodeSnafu { name: node.name.clone() }
            );
        }

        let returning_nodes: Vec<_> = pattern[output].input_nodes().into_vec();
        let anchors = if options.match_output {
            vec![output]
        } else {
            // Returned values also consumed inside the pattern are reached from other anchors.
            returning_nodes.iter().copied().filter(|&n| pattern[n].users.len() == 1).collect()
        };

        let interior = pattern
            .nodes()
            .filter(|n| !matches!(n.op, OpKind::Placeholder | OpKind::Output))
            .map(Node::id)
            .collect();

        Ok(Self { pattern, options, placeholders: pattern.placeholders(), interior, returning_nodes, anchors })
    }

    pub fn pattern(&self) -> &Graph {
        self.pattern
    }

    pub fn options(&self) -> &MatcherOptions {
        &self.options
    }

    /// Find all matches of the pattern in `graph`.
    ///
    /// Matches whose interior nodes leak values outside the match are dropped,
    /// and so are overlapping matches when the options ask for it.
    pub fn find_matches(&self, graph: &Graph) -> Vec<InternalMatch> {
        let candidates: Candidates = self
            .anchors
            .iter()
            .map(|&anchor| {
                let nodes = graph.nodes().filter(|gn| self.nodes_are_equal(anchor, gn)).map(Node::id).collect();
                (anchor, nodes)
            })
            .collect();

        if candidates.is_empty() || candidates.iter().any(|(_, nodes)| nodes.is_empty()) {
            tracing::trace!(anchors = self.anchors.len(), "no candidates for some pattern anchor");
            return Vec::new();
        }

        let mut found = Vec::new();
        let mut current = InternalMatch::new(self.anchors.clone());
        self.backtrack(graph, &candidates, 0, &mut current, &mut found);

        let total = found.len();
        found.retain(|m| self.is_contained(graph, m));
        let contained = found.len();
        if self.options.remove_overlapping_matches {
            found = self.remove_overlapping(found);
        }
        tracing::debug!(total, contained, kept = found.len(), "subgraph matching finished");
        found
    }

    fn backtrack(
        &self,
        graph: &Graph,
        candidates: &Candidates,
        index: usize,
        current: &mut InternalMatch,
        found: &mut Vec<InternalMatch>,
    ) {
        if index == candidates.len() {
            if let Some(complete) = self.complete(current) {
                found.push(complete);
            }
            return;
        }

        let (anchor, nodes) = &candidates[index];
        let saved = current.nodes_map.clone();
        for &gn in nodes {
            if self.match_nodes(graph, *anchor, gn, current) {
                self.backtrack(graph, candidates, index + 1, current, found);
            }
            current.nodes_map.clone_from(&saved);
        }
    }

    /// Fill in placeholder and returning bindings of a full anchor assignment.
    ///
    /// Every interior pattern node must be bound to a graph node. With literals
    /// ignored, a pattern node compared against a graph literal stays unbound;
    /// such a match cannot be replaced and is dropped here.
    fn complete(&self, current: &InternalMatch) -> Option<InternalMatch> {
        if let Some(&unbound) = self.interior.iter().find(|&&pn| current.graph_node(pn).is_none()) {
            tracing::trace!(node = %self.pattern[unbound].name, "discarding match with unbound pattern node");
            return None;
        }
        let placeholder_nodes: Option<Vec<_>> =
            self.placeholders.iter().map(|pn| current.nodes_map.get(pn).cloned()).collect();
        let returning_nodes: Option<Vec<_>> = self.returning_nodes.iter().map(|&pn| current.graph_node(pn)).collect();
        match (placeholder_nodes, returning_nodes) {
            (Some(placeholder_nodes), Some(returning_nodes)) => {
                Some(InternalMatch { placeholder_nodes, returning_nodes, ..current.clone() })
            }
            _ => {
                tracing::trace!("discarding match with unbound placeholder or returning node");
                None
            }
        }
    }

    // =========================================================================
    // Node and argument comparison
    // =========================================================================

    fn nodes_are_equal(&self, pn: NodeId, gn: &Node) -> bool {
        let pn = &self.pattern[pn];
        if !self.options.match_placeholder && pn.op == OpKind::Placeholder {
            return true;
        }
        if pn.op != gn.op {
            return false;
        }
        match pn.op {
            OpKind::Placeholder | OpKind::Output => true,
            // Stored parameters are all tensors; their values never take part in matching.
            OpKind::GetAttr => true,
            OpKind::CallFunction => pn.target == gn.target,
        }
    }

    fn match_nodes(&self, graph: &Graph, pn: NodeId, gn: NodeId, current: &mut InternalMatch) -> bool {
        if let Some(bound) = current.nodes_map.get(&pn) {
            return bound.as_node() == Some(gn);
        }
        if current.binds_graph_node(gn) || !self.nodes_are_equal(pn, &graph[gn]) {
            return false;
        }

        let snapshot = current.nodes_map.clone();
        current.nodes_map.insert(pn, Argument::Node(gn));
        let pattern_node = &self.pattern[pn];
        if pattern_node.op == OpKind::Placeholder {
            return true;
        }

        let matched = match comparable_arguments(pattern_node, &graph[gn]) {
            Some((pattern_args, graph_args)) => {
                pattern_args.len() == graph_args.len()
                    && pattern_args.iter().zip(&graph_args).all(|(pa, ga)| self.match_args(graph, pa, ga, current))
            }
            None => false,
        };
        if !matched {
            current.nodes_map = snapshot;
        }
        matched
    }

    fn match_args(&self, graph: &Graph, pattern_arg: &Argument, graph_arg: &Argument, current: &mut InternalMatch) -> bool {
        if let (Argument::Node(pn), Argument::Node(gn)) = (pattern_arg, graph_arg) {
            return self.match_nodes(graph, *pn, *gn, current);
        }
        if let (Some(pattern_items), Some(graph_items)) = (pattern_arg.as_sequence(), graph_arg.as_sequence()) {
            return pattern_items.len() == graph_items.len()
                && pattern_items.iter().zip(graph_items).all(|(pa, ga)| self.match_args(graph, pa, ga, current));
        }
        self.match_literals(pattern_arg, graph_arg, current) || self.options.literals == LiteralMatching::Ignore
    }

    /// Compare positions where at least one side is not a node.
    fn match_literals(&self, pattern_arg: &Argument, graph_arg: &Argument, current: &mut InternalMatch) -> bool {
        match (pattern_arg, graph_arg) {
            (Argument::Node(_), Argument::Node(_)) => false,
            (Argument::Node(pn), value) => {
                if self.pattern[*pn].op != OpKind::Placeholder {
                    return false;
                }
                match current.nodes_map.get(pn) {
                    Some(bound) => bound == value,
                    None => {
                        current.nodes_map.insert(*pn, value.clone());
                        true
                    }
                }
            }
            (_, Argument::Node(_)) => false,
            // Derived equality is type-sensitive: Int(1) != Float(1.0).
            (pattern_value, graph_value) => pattern_value == graph_value,
        }
    }

    // =========================================================================
    // Post-filtering
    // =========================================================================

    /// Interior matched nodes may only be used inside the match.
    fn is_contained(&self, graph: &Graph, m: &InternalMatch) -> bool {
        let interior: HashMap<NodeId, NodeId> = m
            .nodes_map
            .iter()
            .filter(|(pn, _)| self.pattern[**pn].op != OpKind::Placeholder)
            .filter_map(|(pn, value)| value.as_node().map(|gn| (gn, *pn)))
            .collect();

        interior.iter().all(|(gn, pn)| {
            self.returning_nodes.contains(pn) || graph[*gn].users.iter().all(|user| interior.contains_key(user))
        })
    }

    fn remove_overlapping(&self, matches: Vec<InternalMatch>) -> Vec<InternalMatch> {
        let mut claimed = HashSet::new();
        let mut kept = Vec::with_capacity(matches.len());
        for m in matches {
            let owned: Vec<NodeId> = m
                .nodes_map
                .iter()
                .filter(|(pn, _)| !matches!(self.pattern[**pn].op, OpKind::Placeholder | OpKind::Output))
                .filter_map(|(_, value)| value.as_node())
                .collect();
            if owned.iter().any(|gn| claimed.contains(gn)) {
                tracing::trace!(anchors = ?m.anchors, "dropping overlapping match");
                continue;
            }
            claimed.extend(owned);
            kept.push(m);
        }
        kept
    }
}

/// Argument lists to compare position by position.
///
/// When the call shapes differ (argument count or keyword keys) both sides are
/// resolved against the pattern operator's schema; without a schema the nodes
/// cannot be compared.
fn comparable_arguments(pattern: &Node, graph: &Node) -> Option<(Vec<Argument>, Vec<Argument>)> {
    let same_shape = pattern.args.len() == graph.args.len() && pattern.kwargs.same_keys(&graph.kwargs);
    if same_shape {
        let flatten = |node: &Node| node.args.iter().chain(node.kwargs.values()).cloned().collect::<Vec<_>>();
        return Some((flatten(pattern), flatten(graph)));
    }
    let schema = pattern.operator()?.schema()?;
    Some((
        resolve_arguments(&pattern.args, &pattern.kwargs, schema),
        resolve_arguments(&graph.args, &graph.kwargs, schema),
    ))
}
