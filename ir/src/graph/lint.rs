//! Structural validation.

use std::collections::{HashMap, HashSet};

use snafu::ensure;

use crate::error::*;
use crate::graph::Graph;
use crate::op::OpKind;

impl Graph {
    /// Check the structural invariants every pass must preserve:
    ///
    /// - `users` lists mirror argument references exactly;
    /// - inputs are defined before use;
    /// - node names are unique;
    /// - at most one output node, and it is the last node.
    pub fn lint(&self) -> Result<()> {
        let positions: HashMap<_, _> = self.nodes().enumerate().map(|(pos, node)| (node.id, pos)).collect();
        let mut names = HashSet::new();
        let mut output_seen = None;

        for (pos, node) in self.nodes().enumerate() {
            ensure!(names.insert(node.name.as_str()), DuplicateNameSnafu { name: node.name.clone() });

            if node.op == OpKind::Output {
                if let Some(previous) = output_seen {
                    return DuplicateOutputSnafu { name: self[previous].name.clone() }.fail();
                }
                output_seen = Some(node.id);
            } else if let Some(output) = output_seen {
                return OutputNotLastSnafu { name: self[output].name.clone() }.fail();
            }

            for input in node.input_nodes() {
                let input_pos = positions.get(&input).copied();
                let Some(input_pos) = input_pos else {
                    return UnknownNodeSnafu { id: input }.fail();
                };
                let input_node = &self[input];
                ensure!(
                    input_pos < pos,
                    UseBeforeDefinitionSnafu { node: node.name.clone(), input: input_node.name.clone() }
                );
                ensure!(
                    input_node.users.contains(&node.id),
                    MissingUserEdgeSnafu { input: input_node.name.clone(), user: node.name.clone() }
                );
            }

            for &user in &node.users {
                let references = self.node(user).is_some_and(|u| u.input_nodes().contains(&node.id));
                ensure!(
                    references,
                    StaleUserEdgeSnafu {
                        input: node.name.clone(),
                        user: self.node(user).map_or_else(|| user.to_string(), |u| u.name.clone()),
                    }
                );
            }
        }
        Ok(())
    }
}
