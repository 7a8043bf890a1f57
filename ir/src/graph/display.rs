//! Textual graph listing.
//!
//! ```text
//! graph():
//!     %x : [num_users=1] = placeholder[target=x]
//!     %conv_weight : [num_users=1] = get_attr[target=conv.weight]
//!     %convolution_default : [num_users=1] = call_function[target=aten.convolution.default](args = (%x, %conv_weight, None, [1, 1], [0, 0], [1, 1], False, [0, 0], 1), kwargs = {})
//!     return convolution_default
//! ```

use std::fmt::{self, Write};

use crate::graph::Graph;
use crate::op::OpKind;
use crate::types::Argument;

impl Graph {
    /// Render an argument with node references shown as `%name`.
    pub fn format_argument(&self, arg: &Argument) -> String {
        match arg {
            Argument::Node(id) => match self.node(*id) {
                Some(node) => format!("%{}", node.name),
                None => format!("%<erased {id}>"),
            },
            Argument::Tuple(items) if items.len() == 1 => format!("({},)", self.format_argument(&items[0])),
            Argument::Tuple(items) => format!("({})", self.format_arguments(items)),
            Argument::List(items) => format!("[{}]", self.format_arguments(items)),
            literal => literal.to_string(),
        }
    }

    fn format_arguments(&self, items: &[Argument]) -> String {
        itertools::join(items.iter().map(|item| self.format_argument(item)), ", ")
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "graph():")?;
        for node in self.nodes() {
            let mut line = String::new();
            match node.op {
                OpKind::Output => {
                    let value = node.args.first().map(|arg| self.format_argument(arg)).unwrap_or_default();
                    write!(line, "return {}", value.replace('%', ""))?;
                }
                OpKind::Placeholder | OpKind::GetAttr => {
                    write!(line, "%{} : [num_users={}] = {}[target={}]", node.name, node.users.len(), node.op, node.target)?;
                }
                OpKind::CallFunction => {
                    let args = match node.args.len() {
                        1 => format!("({},)", self.format_argument(&node.args[0])),
                        _ => format!("({})", self.format_arguments(&node.args)),
                    };
                    let kwargs = itertools::join(
                        node.kwargs.iter().map(|(key, value)| format!("{key}: {}", self.format_argument(value))),
                        ", ",
                    );
                    write!(
                        line,
                        "%{} : [num_users={}] = call_function[target={}](args = {args}, kwargs = {{{kwargs}}})",
                        node.name,
                        node.users.len(),
                        node.target,
                    )?;
                }
            }
            writeln!(f, "    {line}")?;
        }
        Ok(())
    }
}
