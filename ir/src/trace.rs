//! Graph construction from example inputs.
//!
//! [`Tracer`] records a computation as a decomposed, operator-level graph: a
//! composite layer (batch norm, dropout, ...) is emitted as the sequence of
//! primitive calls it lowers to, so the result can be matched against other
//! traced graphs node by node.
//!
//! ```ignore
//! let mut t = Tracer::new();
//! let x = t.input("x", &example);
//! let w = t.parameter("conv.weight", weight);
//! let y = t.in_scope("conv", "Conv2d", |t| t.convolution(x, w, None, &ConvParams::default()));
//! let module = t.finish(y.into())?;
//! ```

use bon::bon;
use snafu::ensure;

use crate::error::*;
use crate::graph::Graph;
use crate::module::GraphModule;
use crate::node::{ModuleScope, NodeId};
use crate::op::{OpKind, Operator, Target};
use crate::params::{ParameterStore, Tensor};
use crate::pytree::TreeSpec;
use crate::types::{Argument, Kwargs, ScalarType};

// =============================================================================
// Layer parameters
// =============================================================================

/// Non-tensor arguments of a convolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvParams {
    pub stride: Vec<i64>,
    pub padding: Vec<i64>,
    pub dilation: Vec<i64>,
    pub transposed: bool,
    pub output_padding: Vec<i64>,
    pub groups: i64,
}

impl Default for ConvParams {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[bon]
impl ConvParams {
    /// 2-d convolution defaults: unit stride and dilation, no padding.
    #[builder]
    pub fn builder(
        #[builder(default = vec![1, 1])] stride: Vec<i64>,
        #[builder(default = vec![0, 0])] padding: Vec<i64>,
        #[builder(default = vec![1, 1])] dilation: Vec<i64>,
        #[builder(default = false)] transposed: bool,
        #[builder(default = vec![0, 0])] output_padding: Vec<i64>,
        #[builder(default = 1)] groups: i64,
    ) -> Self {
        Self { stride, padding, dilation, transposed, output_padding, groups }
    }
}

/// Scalar arguments of a batch norm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchNormParams {
    pub momentum: f64,
    pub eps: f64,
    /// Emit the training variant (batch statistics) instead of the inference one.
    pub training: bool,
}

impl Default for BatchNormParams {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[bon]
impl BatchNormParams {
    #[builder]
    pub fn builder(
        #[builder(default = 0.1)] momentum: f64,
        #[builder(default = 1e-5)] eps: f64,
        #[builder(default = false)] training: bool,
    ) -> Self {
        Self { momentum, eps, training }
    }
}

/// Integer range and storage type of a quantized value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantRange {
    pub quant_min: i64,
    pub quant_max: i64,
    pub dtype: ScalarType,
}

impl QuantRange {
    pub const INT8: QuantRange = QuantRange { quant_min: -128, quant_max: 127, dtype: ScalarType::Int8 };
    pub const UINT8: QuantRange = QuantRange { quant_min: 0, quant_max: 255, dtype: ScalarType::UInt8 };
}

// =============================================================================
// Tracer
// =============================================================================

/// Records operator calls into a fresh [`GraphModule`].
#[derive(Debug, Default)]
pub struct Tracer {
    graph: Graph,
    params: ParameterStore,
    scopes: Vec<(String, ModuleScope)>,
    num_inputs: usize,
    num_constants: usize,
}

impl Tracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph recorded so far.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Add a positional input; the example's shape is recorded on the node.
    pub fn input(&mut self, name: &str, example: &Tensor) -> NodeId {
        let id = self.graph.placeholder(name);
        self.graph.meta_mut(id).shape = Some(example.shape().to_vec());
        self.num_inputs += 1;
        id
    }

    /// Store a named parameter and read it.
    pub fn parameter(&mut self, attr: &str, value: Tensor) -> NodeId {
        let shape = value.shape().to_vec();
        self.params.insert(attr, value);
        let id = self.graph.get_attr(attr);
        self.annotate(id, Some(shape));
        id
    }

    /// Store an anonymous constant tensor and read it.
    pub fn constant(&mut self, value: Tensor) -> NodeId {
        let attr = format!("_tensor_constant{}", self.num_constants);
        self.num_constants += 1;
        self.parameter(&attr, value)
    }

    /// Record everything `f` emits as belonging to module `name` of class
    /// `type_name`, nested in the current scope.
    pub fn in_scope<R>(&mut self, name: &str, type_name: &str, f: impl FnOnce(&mut Self) -> R) -> R {
        let path = match self.scopes.last() {
            Some((_, parent)) => format!("{}.{name}", parent.path),
            None => name.to_string(),
        };
        let key = format!("L__self___{}", path.replace('.', "_"));
        self.scopes.push((key, ModuleScope { path, type_name: type_name.to_string() }));
        let result = f(self);
        self.scopes.pop();
        result
    }

    /// Record a call of `op`.
    pub fn call(&mut self, op: Operator, args: Vec<Argument>, kwargs: Kwargs) -> NodeId {
        let id = self.graph.create_node(OpKind::CallFunction, Target::Op(op), args, kwargs, None);
        self.annotate(id, None);
        id
    }

    /// Element `index` of a multi-output call.
    pub fn getitem(&mut self, value: NodeId, index: i64) -> NodeId {
        let id = self.graph.create_node(
            OpKind::CallFunction,
            Target::Op(Operator::GETITEM),
            vec![value.into(), Argument::Int(index)],
            Kwargs::new(),
            Some("getitem"),
        );
        self.annotate(id, None);
        id
    }

    fn annotate(&mut self, id: NodeId, shape: Option<Vec<usize>>) {
        let meta = self.graph.meta_mut(id);
        meta.module_stack.clone_from(&self.scopes);
        if shape.is_some() {
            meta.shape = shape;
        }
    }

    // =========================================================================
    // Layers
    // =========================================================================

    pub fn convolution(&mut self, input: NodeId, weight: NodeId, bias: Option<NodeId>, params: &ConvParams) -> NodeId {
        let args = vec![
            input.into(),
            weight.into(),
            bias.into(),
            Argument::int_list(&params.stride),
            Argument::int_list(&params.padding),
            Argument::int_list(&params.dilation),
            params.transposed.into(),
            Argument::int_list(&params.output_padding),
            params.groups.into(),
        ];
        self.call(Operator::CONVOLUTION, args, Kwargs::new())
    }

    /// Batch norm over running statistics; returns the normalized output
    /// (element 0 of the 3-tuple the operator produces).
    pub fn batch_norm(
        &mut self,
        input: NodeId,
        weight: Option<NodeId>,
        bias: Option<NodeId>,
        running_mean: NodeId,
        running_var: NodeId,
        params: &BatchNormParams,
    ) -> NodeId {
        let mut args = vec![input.into(), weight.into(), bias.into(), running_mean.into(), running_var.into()];
        let op = if params.training {
            args.push(Argument::Bool(true));
            Operator::BATCH_NORM
        } else {
            Operator::BATCH_NORM_NO_TRAINING
        };
        args.extend([params.momentum.into(), params.eps.into()]);
        let bn = self.call(op, args, Kwargs::new());
        self.getitem(bn, 0)
    }

    /// Dropout with drop probability `p`.
    ///
    /// Training mode lowers to `empty_like → bernoulli_ → div_ → mul`;
    /// evaluation mode is the identity and emits nothing.
    pub fn dropout(&mut self, input: NodeId, p: f64, training: bool) -> Result<NodeId> {
        ensure!((0.0..=1.0).contains(&p), InvalidDropoutProbabilitySnafu { p });
        if !training {
            return Ok(input);
        }
        let keep = 1.0 - p;
        let empty = self.call(Operator::EMPTY_LIKE, vec![input.into()], Kwargs::new());
        let mask = self.call(Operator::BERNOULLI_FLOAT, vec![empty.into(), keep.into()], Kwargs::new());
        let scaled = self.call(Operator::DIV_SCALAR, vec![mask.into(), keep.into()], Kwargs::new());
        Ok(self.call(Operator::MUL_TENSOR, vec![input.into(), scaled.into()], Kwargs::new()))
    }

    pub fn add(&mut self, lhs: NodeId, rhs: impl Into<Argument>) -> NodeId {
        self.call(Operator::ADD_TENSOR, vec![lhs.into(), rhs.into()], Kwargs::new())
    }

    pub fn sub(&mut self, lhs: NodeId, rhs: impl Into<Argument>) -> NodeId {
        self.call(Operator::SUB_TENSOR, vec![lhs.into(), rhs.into()], Kwargs::new())
    }

    pub fn mul(&mut self, lhs: NodeId, rhs: impl Into<Argument>) -> NodeId {
        self.call(Operator::MUL_TENSOR, vec![lhs.into(), rhs.into()], Kwargs::new())
    }

    pub fn relu(&mut self, input: NodeId) -> NodeId {
        self.call(Operator::RELU, vec![input.into()], Kwargs::new())
    }

    /// Clamp with scalar bounds, or with tensor bounds when either bound is a node.
    pub fn clamp(&mut self, input: NodeId, min: impl Into<Argument>, max: impl Into<Argument>) -> NodeId {
        let (min, max) = (min.into(), max.into());
        let op = if min.as_node().is_some() || max.as_node().is_some() { Operator::CLAMP_TENSOR } else { Operator::CLAMP };
        self.call(op, vec![input.into(), min, max], Kwargs::new())
    }

    // =========================================================================
    // Quantization
    // =========================================================================

    /// Per-tensor quantize; tensor-valued scale/zero point select the `.tensor`
    /// overload.
    pub fn quantize_per_tensor(
        &mut self,
        input: NodeId,
        scale: impl Into<Argument>,
        zero_point: impl Into<Argument>,
        range: QuantRange,
    ) -> NodeId {
        let (scale, zero_point) = (scale.into(), zero_point.into());
        let op = if scale.as_node().is_some() {
            Operator::QUANTIZE_PER_TENSOR_TENSOR
        } else {
            Operator::QUANTIZE_PER_TENSOR
        };
        self.call(op, qparams_args(input, scale, zero_point, range), Kwargs::new())
    }

    pub fn dequantize_per_tensor(
        &mut self,
        input: NodeId,
        scale: impl Into<Argument>,
        zero_point: impl Into<Argument>,
        range: QuantRange,
    ) -> NodeId {
        let (scale, zero_point) = (scale.into(), zero_point.into());
        let op = if scale.as_node().is_some() {
            Operator::DEQUANTIZE_PER_TENSOR_TENSOR
        } else {
            Operator::DEQUANTIZE_PER_TENSOR
        };
        self.call(op, qparams_args(input, scale, zero_point, range), Kwargs::new())
    }

    pub fn quantize_per_channel(
        &mut self,
        input: NodeId,
        scales: NodeId,
        zero_points: NodeId,
        axis: i64,
        range: QuantRange,
    ) -> NodeId {
        let args = per_channel_args(input, scales, zero_points, axis, range);
        self.call(Operator::QUANTIZE_PER_CHANNEL, args, Kwargs::new())
    }

    pub fn dequantize_per_channel(
        &mut self,
        input: NodeId,
        scales: NodeId,
        zero_points: NodeId,
        axis: i64,
        range: QuantRange,
    ) -> NodeId {
        let args = per_channel_args(input, scales, zero_points, axis, range);
        self.call(Operator::DEQUANTIZE_PER_CHANNEL, args, Kwargs::new())
    }

    // =========================================================================
    // Finalization
    // =========================================================================

    /// Close the graph with `outputs` and compile it into a module.
    pub fn finish(mut self, outputs: Argument) -> Result<GraphModule> {
        self.graph.output(outputs)?;
        tracing::debug!(nodes = self.graph.len(), inputs = self.num_inputs, "traced graph");
        GraphModule::new(self.graph, self.params, TreeSpec::positional(self.num_inputs))
    }
}

fn qparams_args(input: NodeId, scale: Argument, zero_point: Argument, range: QuantRange) -> Vec<Argument> {
    vec![input.into(), scale, zero_point, range.quant_min.into(), range.quant_max.into(), range.dtype.into()]
}

fn per_channel_args(input: NodeId, scales: NodeId, zero_points: NodeId, axis: i64, range: QuantRange) -> Vec<Argument> {
    vec![
        input.into(),
        scales.into(),
        zero_points.into(),
        axis.into(),
        range.quant_min.into(),
        range.quant_max.into(),
        range.dtype.into(),
    ]
}
