//! Training dropout → evaluation no-op replacement.
//!
//! Exported graphs keep the decomposed training-mode dropout
//!
//! ```text
//! empty_like = aten.empty_like.default(x)
//! mask       = aten.bernoulli_.float(empty_like, 1 - p)
//! scaled     = aten.div_.Scalar(mask, 1 - p)
//! out        = aten.mul.Tensor(x, scaled)
//! ```
//!
//! which must become the identity for evaluation. The pattern is traced with a
//! fixed `p` and matched ignoring literals so any probability is caught.
//! [`is_dropout_filter`] additionally requires a match to cover all four
//! operations.

use ndarray::{ArrayD, IxDyn};
use snafu::ResultExt;
use tessera_ir::{
    Argument, Graph, GraphModule, InternalMatch, LiteralMatching, MatchFilter, NodeId, Operator, Tracer,
    replace_pattern_with_filters,
};

use crate::config::TraceOptions;
use crate::error::*;
use crate::pattern_graph::build_decomposed_graph;

/// Operations of the decomposed training dropout.
const DROPOUT_OPS: [Operator; 4] =
    [Operator::EMPTY_LIKE, Operator::BERNOULLI_FLOAT, Operator::DIV_SCALAR, Operator::MUL_TENSOR];

/// Probability the reference patterns are traced with.
const PATTERN_PROBABILITY: f64 = 0.5;

/// Accept only matches whose graph nodes call every dropout operation.
pub fn is_dropout_filter(m: &InternalMatch, original: &Graph, _pattern: &Graph) -> bool {
    let mut missing = DROPOUT_OPS.to_vec();
    for node in m.matched_graph_nodes() {
        if let Some(op) = original.node(node).and_then(|n| n.operator()) {
            missing.retain(|required| *required != op);
        }
    }
    missing.is_empty()
}

/// Replace every training-mode dropout in `module` with the identity.
///
/// Returns the number of replaced dropouts; the module is recompiled.
pub fn replace_training_dropout_with_eval_noop(module: &mut GraphModule) -> Result<usize> {
    let example_inputs = [ArrayD::<f32>::zeros(IxDyn(&[1]))];
    let match_pattern = build_decomposed_graph(traced_dropout(true), &example_inputs, &TraceOptions::default())?;
    let replacement = build_decomposed_graph(traced_dropout(false), &example_inputs, &TraceOptions::default())?;

    let filter: &MatchFilter = &is_dropout_filter;
    let replaced =
        replace_pattern_with_filters(module, &match_pattern.graph, &replacement, &[filter], LiteralMatching::Ignore)
            .context(GraphSnafu)?;

    tracing::info!(replaced = replaced.len(), "training dropout replaced with identity");
    Ok(replaced.len())
}

/// Dropout over the single pattern input; `p` and `training` may be
/// overridden through the trace options.
fn traced_dropout(training: bool) -> impl Fn(&mut Tracer, &[NodeId], &TraceOptions) -> tessera_ir::Result<Argument> {
    move |t, inputs, options| {
        let p = options.number("p", PATTERN_PROBABILITY);
        let out = t.dropout(inputs[0], p, options.flag("training", training))?;
        Ok(out.into())
    }
}
