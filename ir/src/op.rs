//! Node kinds and operator identities.
//!
//! An [`Operator`] is a packet (the operation family, e.g. `aten.convolution`)
//! plus an optional [`Overload`] (e.g. `.default`). Only overloads carry an
//! argument schema; an overload-free packet is the canonical identity used by
//! patterns that should match every overload of that operation.

use std::fmt;

use crate::schema::{self, ArgSpec};

/// Kind of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::Display, strum::IntoStaticStr, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum OpKind {
    /// Graph input.
    Placeholder,
    /// Read of a stored parameter by attribute name.
    GetAttr,
    /// Call of an [`Operator`].
    CallFunction,
    /// Graph result; always the last node.
    Output,
}

/// Operation family, independent of overload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::Display, strum::IntoStaticStr, strum::EnumIter)]
pub enum OpPacket {
    #[strum(serialize = "aten.convolution")]
    Convolution,
    #[strum(serialize = "aten._native_batch_norm_legit_no_training")]
    NativeBatchNormNoTraining,
    #[strum(serialize = "aten._native_batch_norm_legit")]
    NativeBatchNorm,
    #[strum(serialize = "aten.empty_like")]
    EmptyLike,
    #[strum(serialize = "aten.bernoulli_")]
    BernoulliInplace,
    #[strum(serialize = "aten.div_")]
    DivInplace,
    #[strum(serialize = "aten.mul")]
    Mul,
    #[strum(serialize = "aten.add")]
    Add,
    #[strum(serialize = "aten.sub")]
    Sub,
    #[strum(serialize = "aten.relu")]
    Relu,
    #[strum(serialize = "aten.clamp")]
    Clamp,
    #[strum(serialize = "quantized_decomposed.quantize_per_tensor")]
    QuantizePerTensor,
    #[strum(serialize = "quantized_decomposed.dequantize_per_tensor")]
    DequantizePerTensor,
    #[strum(serialize = "quantized_decomposed.quantize_per_channel")]
    QuantizePerChannel,
    #[strum(serialize = "quantized_decomposed.dequantize_per_channel")]
    DequantizePerChannel,
    /// Tuple element accessor (`result[i]`) for multi-output operators.
    #[strum(serialize = "getitem")]
    Getitem,
}

impl OpPacket {
    /// Unqualified operation name, e.g. `convolution` for `aten.convolution`.
    pub fn base_name(self) -> &'static str {
        let qualified: &'static str = self.into();
        qualified.rsplit('.').next().unwrap_or(qualified)
    }

    /// Whether calls mutate their first argument in place.
    pub fn is_inplace(self) -> bool {
        matches!(self, OpPacket::BernoulliInplace | OpPacket::DivInplace)
    }
}

/// Overload variant of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::Display, strum::IntoStaticStr, strum::EnumIter)]
pub enum Overload {
    #[strum(serialize = "default")]
    Default,
    /// aten `.Tensor` overload (tensor second operand).
    #[strum(serialize = "Tensor")]
    Tensor,
    /// aten `.Scalar` overload (scalar second operand).
    #[strum(serialize = "Scalar")]
    Scalar,
    /// aten `.float` overload (float probability).
    #[strum(serialize = "float")]
    Float,
    /// Quantize `.tensor` overload: scale and zero point given as tensors.
    #[strum(serialize = "tensor")]
    QParamTensor,
    /// Quantize `.tensor2` overload: quantization range also given as tensors.
    #[strum(serialize = "tensor2")]
    QParamTensor2,
}

/// Identity of a called operation: packet plus optional overload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Operator {
    pub packet: OpPacket,
    pub overload: Option<Overload>,
}

impl Operator {
    pub const CONVOLUTION: Operator = Operator::overload(OpPacket::Convolution, Overload::Default);
    pub const BATCH_NORM_NO_TRAINING: Operator =
        Operator::overload(OpPacket::NativeBatchNormNoTraining, Overload::Default);
    pub const BATCH_NORM: Operator = Operator::overload(OpPacket::NativeBatchNorm, Overload::Default);
    pub const EMPTY_LIKE: Operator = Operator::overload(OpPacket::EmptyLike, Overload::Default);
    pub const BERNOULLI_FLOAT: Operator = Operator::overload(OpPacket::BernoulliInplace, Overload::Float);
    pub const DIV_SCALAR: Operator = Operator::overload(OpPacket::DivInplace, Overload::Scalar);
    pub const MUL_TENSOR: Operator = Operator::overload(OpPacket::Mul, Overload::Tensor);
    pub const ADD_TENSOR: Operator = Operator::overload(OpPacket::Add, Overload::Tensor);
    pub const SUB_TENSOR: Operator = Operator::overload(OpPacket::Sub, Overload::Tensor);
    pub const RELU: Operator = Operator::overload(OpPacket::Relu, Overload::Default);
    pub const CLAMP: Operator = Operator::overload(OpPacket::Clamp, Overload::Default);
    pub const CLAMP_TENSOR: Operator = Operator::overload(OpPacket::Clamp, Overload::Tensor);
    pub const QUANTIZE_PER_TENSOR: Operator = Operator::overload(OpPacket::QuantizePerTensor, Overload::Default);
    pub const QUANTIZE_PER_TENSOR_TENSOR: Operator =
        Operator::overload(OpPacket::QuantizePerTensor, Overload::QParamTensor);
    pub const QUANTIZE_PER_TENSOR_TENSOR2: Operator =
        Operator::overload(OpPacket::QuantizePerTensor, Overload::QParamTensor2);
    pub const DEQUANTIZE_PER_TENSOR: Operator = Operator::overload(OpPacket::DequantizePerTensor, Overload::Default);
    pub const DEQUANTIZE_PER_TENSOR_TENSOR: Operator =
        Operator::overload(OpPacket::DequantizePerTensor, Overload::QParamTensor);
    pub const DEQUANTIZE_PER_TENSOR_TENSOR2: Operator =
        Operator::overload(OpPacket::DequantizePerTensor, Overload::QParamTensor2);
    pub const QUANTIZE_PER_CHANNEL: Operator = Operator::overload(OpPacket::QuantizePerChannel, Overload::Default);
    pub const DEQUANTIZE_PER_CHANNEL: Operator =
        Operator::overload(OpPacket::DequantizePerChannel, Overload::Default);
    pub const GETITEM: Operator = Operator::packet(OpPacket::Getitem);

    /// Overload-free operator identity.
    pub const fn packet(packet: OpPacket) -> Self {
        Self { packet, overload: None }
    }

    /// Operator identity for a specific overload.
    pub const fn overload(packet: OpPacket, overload: Overload) -> Self {
        Self { packet, overload: Some(overload) }
    }

    /// Same packet with the overload dropped.
    pub const fn without_overload(self) -> Self {
        Self::packet(self.packet)
    }

    /// Argument schema of this overload, if it declares one.
    ///
    /// Overload-free packets and `getitem` have no schema.
    pub fn schema(&self) -> Option<&'static [ArgSpec]> {
        schema::lookup(*self)
    }

    /// Default node name for calls to this operator, e.g. `mul_tensor`.
    pub fn node_name(&self) -> String {
        match self.overload {
            Some(overload) => format!("{}_{}", self.packet.base_name(), overload.to_string().to_lowercase()),
            None => self.packet.base_name().to_string(),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.overload {
            Some(overload) => write!(f, "{}.{}", self.packet, overload),
            None => write!(f, "{}", self.packet),
        }
    }
}

/// What a node refers to: an attribute/input name or a called operator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// Placeholder input name, parameter attribute name, or `output`.
    Name(String),
    Op(Operator),
}

impl Target {
    pub fn as_operator(&self) -> Option<Operator> {
        match self {
            Target::Op(op) => Some(*op),
            Target::Name(_) => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Target::Name(name) => Some(name),
            Target::Op(_) => None,
        }
    }
}

impl From<Operator> for Target {
    fn from(op: Operator) -> Self {
        Target::Op(op)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Name(name) => write!(f, "{name}"),
            Target::Op(op) => write!(f, "{op}"),
        }
    }
}
