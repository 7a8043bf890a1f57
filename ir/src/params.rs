//! Parameter storage referenced by `get_attr` nodes.

use std::collections::BTreeMap;

use snafu::OptionExt;

use crate::error::*;

/// Dense `f32` tensor used for stored parameters.
pub type Tensor = ndarray::ArrayD<f32>;

/// Named tensors owned by a [`GraphModule`](crate::GraphModule).
///
/// Names are dotted attribute paths such as `conv.weight`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterStore {
    tensors: BTreeMap<String, Tensor>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Result<&Tensor> {
        self.tensors.get(name).context(MissingParameterSnafu { name })
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Tensor> {
        self.tensors.get_mut(name).context(MissingParameterSnafu { name })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tensors.contains_key(name)
    }

    /// Store `value` under `name`, returning the previous tensor.
    pub fn insert(&mut self, name: impl Into<String>, value: Tensor) -> Option<Tensor> {
        self.tensors.insert(name.into(), value)
    }

    pub fn remove(&mut self, name: &str) -> Option<Tensor> {
        self.tensors.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tensors.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor)> {
        self.tensors.iter().map(|(name, tensor)| (name.as_str(), tensor))
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}

impl FromIterator<(String, Tensor)> for ParameterStore {
    fn from_iter<T: IntoIterator<Item = (String, Tensor)>>(iter: T) -> Self {
        Self { tensors: iter.into_iter().collect() }
    }
}
