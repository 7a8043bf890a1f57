//! Graph-rewrite passes that prepare traced models for quantization.
//!
//! # Module Organization
//!
//! - [`fusion`] - Affine parameter fusion primitive
//! - [`fold`] - Batch-norm folding into convolutions
//! - [`canonicalize`] - Quantize/dequantize overload canonicalization
//! - [`dropout`] - Training dropout replacement for evaluation
//! - [`literals`] - Literal-to-placeholder promotion
//! - [`pattern_graph`] - Decomposed reference graphs for matching
//! - [`scope`] - Per-node module scope lookup
//! - [`config`] - Pass configuration

pub mod canonicalize;
pub mod config;
pub mod dropout;
pub mod error;
pub mod fold;
pub mod fusion;
pub mod literals;
pub mod pattern_graph;
pub mod scope;


pub use canonicalize::{CANONICAL_OVERLOADS, canonical_overload, canonicalize_overloads};
pub use config::{FoldOptions, LiveStatsPolicy, TraceOptions};
pub use dropout::{is_dropout_filter, replace_training_dropout_with_eval_noop};
pub use error::{Error, Result};
pub use fold::{fold_bn_weights_into_conv_node, fold_normalization_into_linear, fold_normalization_into_linear_with};
pub use fusion::fuse_affine_params;
pub use literals::promote_literals_to_inputs;
pub use pattern_graph::build_decomposed_graph;
pub use scope::{NodeScope, node_name_to_scope};
