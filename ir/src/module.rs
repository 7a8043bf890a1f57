//! Graph plus the parameters and calling convention it runs with.

use snafu::{OptionExt, ensure};

use crate::error::*;
use crate::graph::Graph;
use crate::node::NodeId;
use crate::op::OpKind;
use crate::params::{ParameterStore, Tensor};
use crate::pytree::TreeSpec;

/// Executable unit handed between passes.
///
/// Passes mutate [`graph`](Self::graph) and [`params`](Self::params) in place
/// and finish with [`recompile`](Self::recompile), which validates the result
/// and refreshes [`code`](Self::code).
#[derive(Debug, Clone)]
pub struct GraphModule {
    pub graph: Graph,
    pub params: ParameterStore,
    pub in_spec: TreeSpec,
    code: String,
}

impl GraphModule {
    /// Wrap `graph` and compile it once.
    pub fn new(graph: Graph, params: ParameterStore, in_spec: TreeSpec) -> Result<Self> {
        let mut module = Self { graph, params, in_spec, code: String::new() };
        module.recompile()?;
        Ok(module)
    }

    /// Textual listing produced by the last [`recompile`](Self::recompile).
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Tensor stored under `name`.
    pub fn get_parameter(&self, name: &str) -> Result<&Tensor> {
        self.params.get(name)
    }

    /// Store `value` under `name`, replacing any previous tensor.
    pub fn set_parameter(&mut self, name: impl Into<String>, value: Tensor) {
        self.params.insert(name, value);
    }

    /// Tensor read by a `get_attr` node.
    pub fn attr_of(&self, node: NodeId) -> Result<&Tensor> {
        let node = self.graph.node(node).context(UnknownNodeSnafu { id: node })?;
        let name = match (node.op(), node.target().as_name()) {
            (OpKind::GetAttr, Some(name)) => name,
            _ => return NotAttributeSnafu { name: node.name().to_string() }.fail(),
        };
        self.params.get(name)
    }

    /// Validate the graph and regenerate [`code`](Self::code).
    ///
    /// Fails if the graph breaks a structural invariant, lacks an output, or
    /// reads an attribute that is not stored.
    pub fn recompile(&mut self) -> Result<()> {
        self.graph.lint()?;
        self.graph.output_node().context(MissingOutputSnafu)?;
        for node in self.graph.nodes().filter(|n| n.op() == OpKind::GetAttr) {
            let name = node.target().as_name().unwrap_or_default();
            ensure!(self.params.contains(name), MissingParameterSnafu { name });
        }
        self.code = self.graph.to_string();
        tracing::trace!(nodes = self.graph.len(), "recompiled graph module");
        Ok(())
    }
}
