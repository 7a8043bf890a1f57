//! Literal-to-placeholder promotion.
//!
//! Rewrites `x + 3` into `x + arg1` with a new input `arg1`, so that a pattern
//! and its replacement can be matched and substituted across different literal
//! values. Pattern and replacement must contain the same literals in the same
//! traversal order for their new inputs to line up.

use snafu::ResultExt;
use tessera_ir::{Argument, GraphModule, NodeId, OpKind};

use crate::error::*;

/// Replace every literal positional argument of every non-placeholder node
/// with a new placeholder.
///
/// New placeholders are named `arg{n}` (`n` continues the placeholder count)
/// and follow the last existing placeholder in node-then-argument order; the
/// input spec gains one positional leaf per promoted literal. Keyword arguments
/// are left alone.
pub fn promote_literals_to_inputs(mut module: GraphModule) -> Result<GraphModule> {
    let placeholders = module.graph.placeholders();
    let mut count = placeholders.len();
    let mut anchor: Option<NodeId> = placeholders.last().copied();
    let mut promoted = 0usize;

    for id in module.graph.node_ids() {
        let node = &module.graph[id];
        if node.op() == OpKind::Placeholder || !node.args().iter().any(Argument::is_literal) {
            continue;
        }

        let mut new_args = Vec::with_capacity(node.args().len());
        for arg in node.args().to_vec() {
            if !arg.is_literal() {
                new_args.push(arg);
                continue;
            }
            let name = format!("arg{count}");
            let placeholder = match anchor {
                Some(after) => module.graph.inserting_after(after, |g| g.placeholder(&name)),
                None => {
                    let first = module.graph.node_ids()[0];
                    module.graph.inserting_before(first, |g| g.placeholder(&name))
                }
            }
            .context(GraphSnafu)?;
            module.in_spec.push_positional_leaf().context(GraphSnafu)?;
            tracing::trace!(placeholder = %name, literal = %arg, node = %module.graph[id].name(), "promoted literal");

            anchor = Some(placeholder);
            count += 1;
            promoted += 1;
            new_args.push(placeholder.into());
        }
        module.graph.set_args(id, new_args);
    }

    module.recompile().context(GraphSnafu)?;
    tracing::info!(promoted, "literal promotion finished");
    Ok(module)
}
