//! Decomposed reference graphs for pattern matching.

use snafu::ResultExt;
use tessera_ir::{Argument, GraphModule, NodeId, Tensor, Tracer};

use crate::config::TraceOptions;
use crate::error::*;

/// Trace `pattern` over `example_inputs` into a decomposed, operator-level
/// module ready to be used as a match pattern or replacement.
///
/// Inputs are named `arg0`, `arg1`, ... The callable receives the tracer, the
/// input nodes and `options`, and returns the value to output. Dead code is
/// eliminated before the module is compiled.
pub fn build_decomposed_graph<F>(pattern: F, example_inputs: &[Tensor], options: &TraceOptions) -> Result<GraphModule>
where
    F: FnOnce(&mut Tracer, &[NodeId], &TraceOptions) -> tessera_ir::Result<Argument>,
{
    let mut tracer = Tracer::new();
    let inputs: Vec<NodeId> =
        example_inputs.iter().enumerate().map(|(i, example)| tracer.input(&format!("arg{i}"), example)).collect();

    let outputs = pattern(&mut tracer, &inputs, options).context(GraphSnafu)?;
    let mut module = tracer.finish(outputs).context(GraphSnafu)?;
    module.graph.eliminate_dead_code();
    module.recompile().context(GraphSnafu)?;
    Ok(module)
}
