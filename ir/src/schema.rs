//! Operator argument schemas and operand resolution.
//!
//! Each overload declares an ordered list of [`ArgSpec`]s. Call sites may
//! supply any mix of positional and keyword arguments;
//! [`resolve_arguments`] maps them back onto the declared parameter order so
//! callers can read "argument #4" regardless of how it was passed.

use crate::op::{OpPacket, Operator, Overload};
use crate::types::{Argument, Kwargs};
use self::ArgSpec as A;
use self::DefaultValue as D;

/// Declared default of a schema parameter.
///
/// `None` covers both "defaults to None" and "has no default".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl DefaultValue {
    pub fn to_argument(self) -> Argument {
        match self {
            DefaultValue::None => Argument::None,
            DefaultValue::Bool(v) => Argument::Bool(v),
            DefaultValue::Int(v) => Argument::Int(v),
            DefaultValue::Float(v) => Argument::Float(v),
        }
    }
}

/// One declared parameter of an operator overload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArgSpec {
    pub name: &'static str,
    /// Parameter may only be supplied by keyword.
    pub kwarg_only: bool,
    pub default: DefaultValue,
}

impl ArgSpec {
    /// Positional-or-keyword parameter without a default.
    pub const fn required(name: &'static str) -> Self {
        Self { name, kwarg_only: false, default: DefaultValue::None }
    }

    /// Positional-or-keyword parameter with a default.
    pub const fn optional(name: &'static str, default: DefaultValue) -> Self {
        Self { name, kwarg_only: false, default }
    }

    /// Keyword-only parameter.
    pub const fn keyword(name: &'static str, default: DefaultValue) -> Self {
        Self { name, kwarg_only: true, default }
    }
}

/// Resolve a call's arguments against `schema`, one value per schema entry.
///
/// For each entry in order: a keyword argument with the entry's name wins;
/// otherwise the positional argument at the entry's index is used unless the
/// entry is keyword-only; otherwise the declared default. Missing values never
/// raise; an entry without a default resolves to [`Argument::None`].
pub fn resolve_arguments(args: &[Argument], kwargs: &Kwargs, schema: &[ArgSpec]) -> Vec<Argument> {
    schema
        .iter()
        .enumerate()
        .map(|(index, spec)| {
            if let Some(value) = kwargs.get(spec.name) {
                value.clone()
            } else if !spec.kwarg_only
                && let Some(value) = args.get(index)
            {
                value.clone()
            } else {
                spec.default.to_argument()
            }
        })
        .collect()
}

// =============================================================================
// Schema tables
// =============================================================================

static CONVOLUTION: [ArgSpec; 9] = [
    A::required("input"),
    A::required("weight"),
    A::required("bias"),
    A::required("stride"),
    A::required("padding"),
    A::required("dilation"),
    A::required("transposed"),
    A::required("output_padding"),
    A::required("groups"),
];

static BATCH_NORM_NO_TRAINING: [ArgSpec; 7] = [
    A::required("input"),
    A::required("weight"),
    A::required("bias"),
    A::required("running_mean"),
    A::required("running_var"),
    A::required("momentum"),
    A::required("eps"),
];

static BATCH_NORM: [ArgSpec; 8] = [
    A::required("input"),
    A::required("weight"),
    A::required("bias"),
    A::required("running_mean"),
    A::required("running_var"),
    A::required("training"),
    A::required("momentum"),
    A::required("eps"),
];

static EMPTY_LIKE: [ArgSpec; 6] = [
    A::required("self"),
    A::keyword("dtype", D::None),
    A::keyword("layout", D::None),
    A::keyword("device", D::None),
    A::keyword("pin_memory", D::None),
    A::keyword("memory_format", D::None),
];

static BERNOULLI_FLOAT: [ArgSpec; 3] =
    [A::required("self"), A::optional("p", D::Float(0.5)), A::keyword("generator", D::None)];

static DIV_SCALAR: [ArgSpec; 2] = [A::required("self"), A::required("other")];

static MUL_TENSOR: [ArgSpec; 2] = [A::required("self"), A::required("other")];

static ADD_SUB_TENSOR: [ArgSpec; 3] =
    [A::required("self"), A::required("other"), A::keyword("alpha", D::Int(1))];

static UNARY: [ArgSpec; 1] = [A::required("self")];

static CLAMP: [ArgSpec; 3] =
    [A::required("self"), A::optional("min", D::None), A::optional("max", D::None)];

static QUANTIZE_PER_TENSOR: [ArgSpec; 6] = [
    A::required("input"),
    A::required("scale"),
    A::required("zero_point"),
    A::required("quant_min"),
    A::required("quant_max"),
    A::required("dtype"),
];

static QUANTIZE_PER_CHANNEL: [ArgSpec; 7] = [
    A::required("input"),
    A::required("scales"),
    A::required("zero_points"),
    A::required("axis"),
    A::required("quant_min"),
    A::required("quant_max"),
    A::required("dtype"),
];

/// Schema table lookup. Overload-free packets resolve to `None`.
pub fn lookup(op: Operator) -> Option<&'static [ArgSpec]> {
    use OpPacket as P;
    use Overload as O;

    let overload = op.overload?;
    let schema: &'static [ArgSpec] = match (op.packet, overload) {
        (P::Convolution, O::Default) => &CONVOLUTION,
        (P::NativeBatchNormNoTraining, O::Default) => &BATCH_NORM_NO_TRAINING,
        (P::NativeBatchNorm, O::Default) => &BATCH_NORM,
        (P::EmptyLike, O::Default) => &EMPTY_LIKE,
        (P::BernoulliInplace, O::Float) => &BERNOULLI_FLOAT,
        (P::DivInplace, O::Scalar) => &DIV_SCALAR,
        (P::Mul, O::Tensor) => &MUL_TENSOR,
        (P::Add | P::Sub, O::Tensor) => &ADD_SUB_TENSOR,
        (P::Relu, O::Default) => &UNARY,
        (P::Clamp, O::Default | O::Tensor) => &CLAMP,
        (P::QuantizePerTensor | P::DequantizePerTensor, O::Default | O::QParamTensor | O::QParamTensor2) => {
            &QUANTIZE_PER_TENSOR
        }
        (P::QuantizePerChannel | P::DequantizePerChannel, O::Default) => &QUANTIZE_PER_CHANNEL,
        _ => return None,
    };
    Some(schema)
}
