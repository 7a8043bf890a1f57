//! Graph nodes.

use smallvec::SmallVec;

use crate::op::{OpKind, Operator, Target};
use crate::types::{Argument, Kwargs};

/// Stable handle of a node inside its [`Graph`](crate::Graph).
///
/// Handles are never reused: erasing a node retires its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("#{_0}")]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Module that produced a node, as recorded while tracing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleScope {
    /// Dotted module path, e.g. `backbone.conv1`.
    pub path: String,
    /// Module class name, e.g. `Conv2d`.
    pub type_name: String,
}

/// Auxiliary annotations attached to a node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeMeta {
    /// Enclosing module stack, outermost first: `(key, scope)`.
    pub module_stack: Vec<(String, ModuleScope)>,
    /// Concrete shape of the value seen while tracing, when known.
    pub shape: Option<Vec<usize>>,
}

/// A single operation record.
///
/// Fields are read-only from outside the crate: every structural mutation goes
/// through [`Graph`](crate::Graph) so that `users` stays in sync with the
/// arguments of other nodes.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) op: OpKind,
    pub(crate) target: Target,
    pub(crate) args: Vec<Argument>,
    pub(crate) kwargs: Kwargs,
    /// Nodes that reference this one, in first-use order.
    pub(crate) users: Vec<NodeId>,
    pub meta: NodeMeta,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn op(&self) -> OpKind {
        self.op
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Called operator, for `call_function` nodes.
    pub fn operator(&self) -> Option<Operator> {
        match self.op {
            OpKind::CallFunction => self.target.as_operator(),
            _ => None,
        }
    }

    /// Whether this node is a call to exactly `op` (packet and overload).
    pub fn is_call_to(&self, op: Operator) -> bool {
        self.operator() == Some(op)
    }

    pub fn args(&self) -> &[Argument] {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<&Argument> {
        self.args.get(index)
    }

    pub fn kwargs(&self) -> &Kwargs {
        &self.kwargs
    }

    pub fn users(&self) -> &[NodeId] {
        &self.users
    }

    /// Distinct nodes referenced by args and kwargs, in first-reference order.
    pub fn input_nodes(&self) -> SmallVec<[NodeId; 4]> {
        let mut inputs: SmallVec<[NodeId; 4]> = SmallVec::new();
        let mut push = |id: NodeId| {
            if !inputs.contains(&id) {
                inputs.push(id);
            }
        };
        self.args.iter().for_each(|arg| arg.for_each_node(&mut push));
        self.kwargs.values().for_each(|arg| arg.for_each_node(&mut push));
        inputs
    }

    /// Innermost recorded module scope, if any.
    pub fn innermost_scope(&self) -> Option<&ModuleScope> {
        self.meta.module_stack.last().map(|(_, scope)| scope)
    }
}
