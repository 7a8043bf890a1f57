//! Filtered subgraph replacement.
//!
//! Every accepted match of a pattern is replaced by a fresh copy of a
//! replacement graph: replacement placeholders are bound to the values the
//! match bound to the pattern placeholders, the copy is spliced in before the
//! first user of the matched outputs, those users are rewired to the copy, and
//! the matched nodes are erased.

use std::collections::{BTreeMap, HashMap};

use snafu::{OptionExt, ensure};

use crate::error::*;
use crate::graph::Graph;
use crate::module::GraphModule;
use crate::node::NodeId;
use crate::op::OpKind;
use crate::pattern::{InternalMatch, LiteralMatching, MatcherOptions, SubgraphMatcher};
use crate::types::Argument;

/// Predicate deciding whether a structural match is replaced.
///
/// Called with the match, the graph being rewritten and the pattern graph,
/// before any replacement happens.
pub type MatchFilter = dyn Fn(&InternalMatch, &Graph, &Graph) -> bool;

/// Record of one performed replacement.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplacedPattern {
    /// First pattern anchor of the match.
    pub anchor: NodeId,
    /// Pattern node → graph value, after rewiring through earlier replacements.
    pub nodes_map: BTreeMap<NodeId, Argument>,
    /// Nodes copied in from the replacement graph, in replacement order.
    pub replacements: Vec<NodeId>,
}

/// Replace every filtered match of `pattern` in `module` with `replacement`.
///
/// Parameters read by the replacement that `module` does not store yet are
/// copied over. The module is recompiled afterwards.
pub fn replace_pattern_with_filters(
    module: &mut GraphModule,
    pattern: &Graph,
    replacement: &GraphModule,
    filters: &[&MatchFilter],
    literals: LiteralMatching,
) -> Result<Vec<ReplacedPattern>> {
    let options = MatcherOptions::builder().literals(literals).build();
    let matcher = SubgraphMatcher::new(pattern, options)?;

    let matches: Vec<_> = matcher
        .find_matches(&module.graph)
        .into_iter()
        .filter(|m| {
            let accepted = filters.iter().all(|filter| filter(m, &module.graph, pattern));
            if !accepted {
                tracing::debug!(anchors = ?m.anchors, "match rejected by filter");
            }
            accepted
        })
        .collect();

    let replacement_graph = &replacement.graph;
    let replacement_placeholders = replacement_graph.placeholders();
    // Matched returning node → node that replaced it.
    let mut changed: HashMap<NodeId, NodeId> = HashMap::new();
    let mut replaced = Vec::with_capacity(matches.len());

    for mut m in matches {
        ensure!(
            m.placeholder_nodes.len() == replacement_placeholders.len(),
            PlaceholderCountMismatchSnafu { matched: m.placeholder_nodes.len(), replacement: replacement_placeholders.len() }
        );

        let mut val_map: HashMap<NodeId, Argument> = HashMap::new();
        for (index, &rn) in replacement_placeholders.iter().enumerate() {
            let mut bound = m.placeholder_nodes[index].clone();
            if let Argument::Node(gn) = bound
                && let Some(&current) = changed.get(&gn)
            {
                bound = Argument::Node(current);
                m.placeholder_nodes[index] = bound.clone();
                for value in m.nodes_map.values_mut() {
                    if value.as_node() == Some(gn) {
                        *value = bound.clone();
                    }
                }
            }
            val_map.insert(rn, bound);
        }

        let anchor = m.anchors.first().copied().context(IncompleteMatchSnafu { name: "<no anchor>" })?;
        // Resolved before the graph is touched so an incomplete match fails cleanly.
        let erased = pattern
            .nodes()
            .rev()
            .filter(|pn| !matches!(pn.op(), OpKind::Placeholder | OpKind::Output))
            .map(|pn| m.graph_node(pn.id()).context(IncompleteMatchSnafu { name: pn.name().to_string() }))
            .collect::<Result<Vec<_>>>()?;
        let first_user = module
            .graph
            .nodes()
            .find(|n| m.returning_nodes.iter().any(|&r| module.graph[r].users.contains(&n.id())))
            .map(|n| n.id())
            .context(ReturningNodesWithoutUsersSnafu { anchor: pattern[anchor].name.clone() })?;

        let copied = module.graph.inserting_before(first_user, |g| g.graph_copy(replacement_graph, &mut val_map))??;
        let copied: Vec<Argument> = match copied {
            Argument::Tuple(items) | Argument::List(items) => items,
            single => vec![single],
        };
        ensure!(
            copied.len() == m.returning_nodes.len(),
            ReturnCountMismatchSnafu { matched: m.returning_nodes.len(), replacement: copied.len() }
        );

        for (&gn, value) in m.returning_nodes.iter().zip(&copied) {
            let new = value.as_node().context(NonNodeReplacementSnafu {
                name: module.graph[gn].name().to_string(),
                value: value.to_string(),
            })?;
            module.graph.replace_all_uses_with(gn, new);
            changed.insert(gn, new);
        }

        for gn in erased {
            module.graph.erase_node(gn)?;
        }

        let replacements = replacement_graph
            .nodes()
            .filter(|rn| !matches!(rn.op(), OpKind::Placeholder | OpKind::Output))
            .filter_map(|rn| val_map.get(&rn.id()).and_then(Argument::as_node))
            .collect();
        tracing::debug!(anchor = %pattern[anchor].name(), "replaced pattern match");
        replaced.push(ReplacedPattern { anchor, nodes_map: m.nodes_map, replacements });
    }

    copy_missing_parameters(module, replacement);
    module.recompile()?;
    Ok(replaced)
}

/// Replace every match of `pattern` with `replacement`, without filters.
pub fn replace_pattern(
    module: &mut GraphModule,
    pattern: &Graph,
    replacement: &GraphModule,
) -> Result<Vec<ReplacedPattern>> {
    replace_pattern_with_filters(module, pattern, replacement, &[], LiteralMatching::Exact)
}

fn copy_missing_parameters(module: &mut GraphModule, replacement: &GraphModule) {
    for node in replacement.graph.nodes().filter(|n| n.op() == OpKind::GetAttr) {
        let Some(name) = node.target().as_name() else { continue };
        if module.params.contains(name) {
            continue;
        }
        if let Ok(tensor) = replacement.params.get(name) {
            tracing::trace!(attr = name, "copying replacement parameter");
            module.params.insert(name, tensor.clone());
        }
    }
}
