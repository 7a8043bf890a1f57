//! Mutable computation-graph IR for quantization rewrites.
//!
//! This crate defines the graph data model and the generic rewrite machinery
//! the quantization passes are built on.
//!
//! # Module Organization
//!
//! - [`types`] - Argument values (literals, node references, tuples/lists) and keyword arguments
//! - [`op`] - Node kinds and operator identities (packet + overload)
//! - [`schema`] - Per-overload argument schemas and operand resolution
//! - [`node`] / [`graph`] - Arena-backed graph with maintained use lists
//! - [`module`] / [`params`] / [`pytree`] - Graph plus parameters and calling convention
//! - [`trace`] - Graph construction from example inputs
//! - [`pattern`] - Subgraph matching
//! - [`rewrite`] - Filtered subgraph replacement
//! - [`error`] - Error types and result handling

pub mod error;
pub mod graph;
pub mod module;
pub mod node;
pub mod op;
pub mod params;
pub mod pattern;
pub mod pytree;
pub mod rewrite;
pub mod schema;
pub mod trace;
pub mod types;


pub use error::{Error, Result};
pub use graph::{Graph, InsertPoint, Nodes};
pub use module::GraphModule;
pub use node::{ModuleScope, Node, NodeId, NodeMeta};
pub use op::{OpKind, OpPacket, Operator, Overload, Target};
pub use params::{ParameterStore, Tensor};
pub use pattern::{InternalMatch, LiteralMatching, MatcherOptions, SubgraphMatcher};
pub use pytree::TreeSpec;
pub use rewrite::{MatchFilter, ReplacedPattern, replace_pattern, replace_pattern_with_filters};
pub use schema::{ArgSpec, DefaultValue, resolve_arguments};
pub use trace::{BatchNormParams, ConvParams, QuantRange, Tracer};
pub use types::{Argument, Kwargs, ScalarType};
