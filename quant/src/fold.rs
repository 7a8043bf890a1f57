//! Folding batch normalization into the preceding convolution.
//!
//! ```text
//! Before:                          After:
//!   conv ─► bn ─► getitem[0] ─► a    conv' ─► a
//!              └► getitem[1] ─► b    bn ─► getitem[1] ─► b   (only if b exists)
//! ```
//!
//! `conv'` reads the fused weight (stored in place of the original) and a
//! fused bias. The normalization and its accessors are left for dead-code
//! elimination.

use snafu::{OptionExt, ResultExt};
use tessera_ir::{Argument, GraphModule, NodeId, OpPacket, Operator, Tensor, resolve_arguments};

use crate::config::{FoldOptions, LiveStatsPolicy};
use crate::error::*;
use crate::fusion::fuse_affine_params;

/// Schema positions shared by both batch-norm variants.
const BN_WEIGHT: usize = 1;
const BN_BIAS: usize = 2;
const BN_RUNNING_MEAN: usize = 3;
const BN_RUNNING_VAR: usize = 4;
const CONV_WEIGHT: usize = 1;
const CONV_BIAS: usize = 2;
const CONV_TRANSPOSED: usize = 6;

/// Position of `eps` in the resolved arguments of a batch-norm variant.
fn eps_index(op: Option<Operator>) -> Option<usize> {
    match op? {
        Operator::BATCH_NORM_NO_TRAINING => Some(6),
        Operator::BATCH_NORM => Some(7),
        _ => None,
    }
}

/// Fold normalization `bn` into convolution `conv` in place.
///
/// Overwrites the stored weight of `conv_weight` with the fused weight and
/// stores the fused bias under the bias attribute; a bias-less convolution
/// gets a new `<weight>_bias` attribute read right before it. Users of
/// `bn`'s element 0 are redirected to `conv`.
pub fn fold_bn_weights_into_conv_node(
    module: &mut GraphModule,
    conv: NodeId,
    conv_weight: NodeId,
    conv_bias: Option<NodeId>,
    bn: NodeId,
) -> Result<()> {
    let conv_name = module.graph[conv].name().to_string();
    let bn_node = &module.graph[bn];
    let bn_name = bn_node.name().to_string();

    let eps_at = eps_index(bn_node.operator())
        .context(UnexpectedNormalizationSnafu { target: bn_node.target().to_string() })?;
    let schema = bn_node.operator().and_then(|op| op.schema()).context(UnexpectedNormalizationSnafu {
        target: bn_node.target().to_string(),
    })?;
    let bn_args = resolve_arguments(bn_node.args(), bn_node.kwargs(), schema);

    let transposed = module.graph[conv]
        .arg(CONV_TRANSPOSED)
        .and_then(Argument::as_bool)
        .context(MissingConvArgumentSnafu { conv: &conv_name, name: "transposed", index: CONV_TRANSPOSED })?;
    let weight = module.attr_of(conv_weight).context(GraphSnafu)?;
    let bias = conv_bias.map(|b| module.attr_of(b)).transpose().context(GraphSnafu)?;

    let scale = tensor_arg(module, &bn_name, "weight", &bn_args[BN_WEIGHT])?;
    let shift = tensor_arg(module, &bn_name, "bias", &bn_args[BN_BIAS])?;
    let running_mean = tensor_arg(module, &bn_name, "running_mean", &bn_args[BN_RUNNING_MEAN])?
        .context(MissingStatisticSnafu { node: &bn_name, name: "running mean" })?;
    let running_var = tensor_arg(module, &bn_name, "running_var", &bn_args[BN_RUNNING_VAR])?
        .context(MissingStatisticSnafu { node: &bn_name, name: "running variance" })?;
    let eps = bn_args[eps_at]
        .as_f64()
        .context(InvalidEpsSnafu { node: &bn_name, value: bn_args[eps_at].to_string() })?;

    let (fused_weight, fused_bias) =
        fuse_affine_params(weight, bias, running_mean, running_var, eps, scale, shift, transposed)?;

    let weight_attr = attr_name(module, conv_weight)?;
    module.set_parameter(weight_attr.clone(), fused_weight);

    let bias_attr = match conv_bias {
        Some(bias) => attr_name(module, bias)?,
        None => {
            let bias_attr = format!("{weight_attr}_bias");
            let bias_node =
                module.graph.inserting_before(conv, |g| g.get_attr(&bias_attr)).context(GraphSnafu)?;
            module.graph.set_arg(conv, CONV_BIAS, bias_node.into());
            bias_attr
        }
    };
    module.set_parameter(bias_attr, fused_bias);

    // Only element 0 is algebraically replaced by the folded convolution.
    for accessor in primary_accessors(module, bn) {
        module.graph.replace_all_uses_with(accessor, conv);
    }

    tracing::debug!(conv = %conv_name, bn = %bn_name, transposed, eps, "folded normalization into convolution");
    Ok(())
}

/// Fold every eligible conv → batch norm pair with options from the environment.
///
/// See [`fold_normalization_into_linear_with`].
pub fn fold_normalization_into_linear(module: &mut GraphModule) -> Result<usize> {
    fold_normalization_into_linear_with(module, &FoldOptions::from_env())
}

/// Fold every eligible conv → batch norm pair, then run dead-code
/// elimination and recompile. Returns the number of folded pairs.
///
/// A pair is eligible when the normalization reads a convolution that feeds
/// nothing else and its element 0 is still consumed; the latter makes a second
/// run a no-op.
pub fn fold_normalization_into_linear_with(module: &mut GraphModule, options: &FoldOptions) -> Result<usize> {
    let mut folded = 0usize;

    for bn in module.graph.node_ids() {
        let Some(node) = module.graph.node(bn) else { continue };
        let accepted = match node.operator() {
            Some(Operator::BATCH_NORM_NO_TRAINING) => true,
            Some(Operator::BATCH_NORM) => options.include_training_variant,
            _ => false,
        };
        if !accepted {
            continue;
        }
        let Some(conv) = node.arg(0).and_then(Argument::as_node) else { continue };
        let conv_node = &module.graph[conv];
        if !conv_node.is_call_to(Operator::CONVOLUTION) {
            continue;
        }
        if conv_node.users() != [bn] {
            tracing::debug!(conv = %conv_node.name(), "convolution output has other users, not folding");
            continue;
        }
        if primary_accessors(module, bn).iter().all(|&a| module.graph[a].users().is_empty()) {
            tracing::trace!(bn = %node.name(), "normalization output already unused");
            continue;
        }

        let conv_weight = conv_node.arg(CONV_WEIGHT).and_then(Argument::as_node).context(MissingConvArgumentSnafu {
            conv: conv_node.name(),
            name: "weight",
            index: CONV_WEIGHT,
        })?;
        let conv_bias = match conv_node.arg(CONV_BIAS) {
            Some(Argument::Node(bias)) => Some(*bias),
            Some(Argument::None) | None => None,
            Some(_) => {
                return MissingConvArgumentSnafu { conv: conv_node.name(), name: "bias", index: CONV_BIAS }.fail();
            }
        };

        let live = live_secondary_users(module, bn);
        if live > 0 {
            let name = node.name().to_string();
            match options.live_statistics {
                LiveStatsPolicy::Keep => {
                    tracing::warn!(bn = %name, users = live, "folding normalization whose statistics are still used");
                }
                LiveStatsPolicy::Skip => {
                    tracing::debug!(bn = %name, users = live, "skipping normalization with live statistics");
                    continue;
                }
                LiveStatsPolicy::Error => {
                    return LiveNormalizationStatisticsSnafu { node: name, users: live }.fail();
                }
            }
        }

        fold_bn_weights_into_conv_node(module, conv, conv_weight, conv_bias, bn)?;
        folded += 1;
    }

    module.graph.eliminate_dead_code();
    module.recompile().context(GraphSnafu)?;
    tracing::info!(folded, "normalization folding finished");
    Ok(folded)
}

/// `getitem(bn, 0)` users of `bn`.
fn primary_accessors(module: &GraphModule, bn: NodeId) -> Vec<NodeId> {
    module.graph[bn]
        .users()
        .iter()
        .copied()
        .filter(|&user| {
            let user = &module.graph[user];
            user.operator().is_some_and(|op| op.packet == OpPacket::Getitem) && user.arg(1) == Some(&Argument::Int(0))
        })
        .collect()
}

/// Consumers of anything other than element 0 of `bn`.
fn live_secondary_users(module: &GraphModule, bn: NodeId) -> usize {
    let primary = primary_accessors(module, bn);
    module.graph[bn]
        .users()
        .iter()
        .filter(|user| !primary.contains(user))
        .map(|&user| {
            let node = &module.graph[user];
            match node.operator() {
                Some(op) if op.packet == OpPacket::Getitem => node.users().len(),
                _ => 1,
            }
        })
        .sum()
}

fn attr_name(module: &GraphModule, node: NodeId) -> Result<String> {
    let node = &module.graph[node];
    let name = node.target().as_name().context(NotTensorArgumentSnafu {
        node: node.name(),
        name: "target",
        value: node.target().to_string(),
    })?;
    Ok(name.to_string())
}

/// Tensor behind a resolved normalization argument; `None` stays absent.
fn tensor_arg<'m>(module: &'m GraphModule, node: &str, name: &str, value: &Argument) -> Result<Option<&'m Tensor>> {
    match value {
        Argument::None => Ok(None),
        Argument::Node(id) => module.attr_of(*id).map(Some).context(GraphSnafu),
        other => NotTensorArgumentSnafu { node, name, value: other.to_string() }.fail(),
    }
}
