//! Calling-convention description of a module's inputs.

use std::fmt;

use snafu::OptionExt;

use crate::error::*;

/// Shape of a nested input structure; leaves correspond to graph placeholders
/// in order.
///
/// Module inputs follow the `(args, kwargs)` convention:
/// `Tuple([Tuple(args…), Dict(kwargs…)])`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeSpec {
    Leaf,
    Tuple(Vec<TreeSpec>),
    List(Vec<TreeSpec>),
    Dict(Vec<(String, TreeSpec)>),
}

impl TreeSpec {
    /// `(args, kwargs)` spec for `num_args` positional tensors and no keywords.
    pub fn positional(num_args: usize) -> Self {
        TreeSpec::Tuple(vec![TreeSpec::Tuple(vec![TreeSpec::Leaf; num_args]), TreeSpec::Dict(Vec::new())])
    }

    /// Number of leaves.
    pub fn num_leaves(&self) -> usize {
        match self {
            TreeSpec::Leaf => 1,
            TreeSpec::Tuple(children) | TreeSpec::List(children) => children.iter().map(TreeSpec::num_leaves).sum(),
            TreeSpec::Dict(entries) => entries.iter().map(|(_, child)| child.num_leaves()).sum(),
        }
    }

    /// Positional argument specs of an `(args, kwargs)` spec.
    pub fn args(&self) -> Option<&[TreeSpec]> {
        match self {
            TreeSpec::Tuple(children) => match children.first() {
                Some(TreeSpec::Tuple(args)) => Some(args),
                _ => None,
            },
            _ => None,
        }
    }

    fn args_mut(&mut self) -> Option<&mut Vec<TreeSpec>> {
        match self {
            TreeSpec::Tuple(children) => match children.first_mut() {
                Some(TreeSpec::Tuple(args)) => Some(args),
                _ => None,
            },
            _ => None,
        }
    }

    /// Append one positional leaf to an `(args, kwargs)` spec.
    pub fn push_positional_leaf(&mut self) -> Result<()> {
        let rendered = self.to_string();
        self.args_mut().context(MalformedInputSpecSnafu { spec: rendered })?.push(TreeSpec::Leaf);
        Ok(())
    }
}

impl fmt::Display for TreeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeSpec::Leaf => write!(f, "*"),
            TreeSpec::Tuple(children) => write!(f, "({})", itertools::join(children, ", ")),
            TreeSpec::List(children) => write!(f, "[{}]", itertools::join(children, ", ")),
            TreeSpec::Dict(entries) => {
                write!(f, "{{{}}}", itertools::join(entries.iter().map(|(key, child)| format!("{key}: {child}")), ", "))
            }
        }
    }
}
