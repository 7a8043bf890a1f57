//! Dead-code elimination.

use crate::graph::Graph;
use crate::node::Node;
use crate::op::OpKind;

/// Graph inputs, the output and in-place calls are never removed, even when
/// unused: an in-place call's effect is read through its mutated argument.
fn is_impure(node: &Node) -> bool {
    match node.op {
        OpKind::Placeholder | OpKind::Output => true,
        OpKind::CallFunction => node.operator().is_some_and(|op| op.packet.is_inplace()),
        OpKind::GetAttr => false,
    }
}

impl Graph {
    /// Remove every side-effect-free node without users.
    ///
    /// Walks program order backwards so whole dead chains disappear in one
    /// call. Returns `true` if anything was removed.
    pub fn eliminate_dead_code(&mut self) -> bool {
        let mut removed = 0usize;
        for id in self.node_ids().into_iter().rev() {
            let node = &self[id];
            if is_impure(node) || !node.users.is_empty() {
                continue;
            }
            tracing::trace!(node.name = %node.name, "dce: erasing unused node");
            if self.erase_node(id).is_ok() {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::debug!(removed, "dead code eliminated");
        }
        removed > 0
    }
}
