//! Overload canonicalization for quantize/dequantize call sites.
//!
//! Patterns traced from reference code and graphs produced by a converter may
//! call the same quantization primitive through different overloads. Rewriting
//! both sides to the overload-free identity lets them match.

use tessera_ir::{Graph, OpKind, OpPacket, Operator, Target};

/// Overload → canonical identity.
pub static CANONICAL_OVERLOADS: [(Operator, Operator); 9] = [
    (Operator::QUANTIZE_PER_TENSOR, Operator::packet(OpPacket::QuantizePerTensor)),
    (Operator::DEQUANTIZE_PER_TENSOR, Operator::packet(OpPacket::DequantizePerTensor)),
    (Operator::QUANTIZE_PER_TENSOR_TENSOR, Operator::packet(OpPacket::QuantizePerTensor)),
    (Operator::DEQUANTIZE_PER_TENSOR_TENSOR, Operator::packet(OpPacket::DequantizePerTensor)),
    (Operator::QUANTIZE_PER_TENSOR_TENSOR2, Operator::packet(OpPacket::QuantizePerTensor)),
    (Operator::DEQUANTIZE_PER_TENSOR_TENSOR2, Operator::packet(OpPacket::DequantizePerTensor)),
    (Operator::QUANTIZE_PER_CHANNEL, Operator::packet(OpPacket::QuantizePerChannel)),
    (Operator::DEQUANTIZE_PER_CHANNEL, Operator::packet(OpPacket::DequantizePerChannel)),
    (Operator::CLAMP_TENSOR, Operator::packet(OpPacket::Clamp)),
];

/// Canonical identity of `op`, or `None` if it is not in the table.
pub fn canonical_overload(op: Operator) -> Option<Operator> {
    CANONICAL_OVERLOADS.iter().find(|(from, _)| *from == op).map(|(_, to)| *to)
}

/// Retarget every call listed in [`CANONICAL_OVERLOADS`] to its overload-free
/// identity. Returns the number of retargeted nodes.
pub fn canonicalize_overloads(graph: &mut Graph) -> usize {
    let mut rewritten = 0usize;
    for id in graph.node_ids() {
        let node = &graph[id];
        if node.op() != OpKind::CallFunction {
            continue;
        }
        let Some(canonical) = node.operator().and_then(canonical_overload) else { continue };
        tracing::trace!(node = %node.name(), from = %node.target(), to = %canonical, "canonicalizing overload");
        graph.set_target(id, Target::Op(canonical));
        rewritten += 1;
    }
    tracing::debug!(rewritten, "overload canonicalization finished");
    rewritten
}
