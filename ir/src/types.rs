//! Argument values carried by graph nodes.
//!
//! Every positional or keyword argument of a [`Node`](crate::Node) is an
//! [`Argument`]: a literal, a reference to another node, or a nested
//! tuple/list of those. Keyword arguments are stored in [`Kwargs`], which keeps
//! the call-site order because matching compares keyword *key sequences*.

use std::fmt;

use smallvec::SmallVec;

use crate::node::NodeId;

/// Element type carried by `dtype`-style operator arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::Display, strum::EnumString, strum::IntoStaticStr, strum::EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ScalarType {
    Bool,
    #[strum(serialize = "uint8")]
    UInt8,
    Int8,
    Int16,
    Int32,
    Int64,
    Float16,
    #[strum(serialize = "bfloat16")]
    BFloat16,
    Float32,
    Float64,
}

/// A single argument value of a graph node.
///
/// Literals are `Bool`, `Int` and `Float` (and tuples/lists made only of
/// those). Equality is structural and type-sensitive: `Int(1)` and
/// `Float(1.0)` are different arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Dtype(ScalarType),
    Node(NodeId),
    Tuple(Vec<Argument>),
    List(Vec<Argument>),
}

impl Argument {
    /// Whether this argument is a numeric literal or a tuple/list made only of
    /// numeric literals.
    ///
    /// Booleans count as numbers. An empty tuple/list is vacuously literal.
    pub fn is_literal(&self) -> bool {
        match self {
            Argument::Bool(_) | Argument::Int(_) | Argument::Float(_) => true,
            Argument::Tuple(items) | Argument::List(items) => items.iter().all(Argument::is_literal),
            _ => false,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Argument::None)
    }

    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Argument::Node(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Argument::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Argument::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric value as `f64`; integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Argument::Float(v) => Some(*v),
            Argument::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Items of a tuple or list argument.
    pub fn as_sequence(&self) -> Option<&[Argument]> {
        match self {
            Argument::Tuple(items) | Argument::List(items) => Some(items),
            _ => None,
        }
    }

    /// Visit every node referenced by this argument, depth-first.
    pub fn for_each_node(&self, f: &mut impl FnMut(NodeId)) {
        match self {
            Argument::Node(id) => f(*id),
            Argument::Tuple(items) | Argument::List(items) => items.iter().for_each(|item| item.for_each_node(f)),
            _ => {}
        }
    }

    /// Nodes referenced by this argument, in traversal order (duplicates kept).
    pub fn nodes(&self) -> SmallVec<[NodeId; 4]> {
        let mut out = SmallVec::new();
        self.for_each_node(&mut |id| out.push(id));
        out
    }

    /// Rebuild this argument with every node reference replaced by `f(node)`.
    pub fn map_nodes(&self, f: &mut impl FnMut(NodeId) -> Argument) -> Argument {
        match self {
            Argument::Node(id) => f(*id),
            Argument::Tuple(items) => Argument::Tuple(items.iter().map(|item| item.map_nodes(f)).collect()),
            Argument::List(items) => Argument::List(items.iter().map(|item| item.map_nodes(f)).collect()),
            other => other.clone(),
        }
    }

    /// Whether this argument references `node` anywhere inside it.
    pub fn references(&self, node: NodeId) -> bool {
        let mut found = false;
        self.for_each_node(&mut |id| found |= id == node);
        found
    }

    /// Integer list helper used by convolution-style arguments.
    pub fn int_list(values: &[i64]) -> Argument {
        Argument::List(values.iter().copied().map(Argument::Int).collect())
    }
}

impl From<NodeId> for Argument {
    fn from(id: NodeId) -> Self {
        Argument::Node(id)
    }
}

impl From<Option<NodeId>> for Argument {
    fn from(id: Option<NodeId>) -> Self {
        id.map_or(Argument::None, Argument::Node)
    }
}

impl From<bool> for Argument {
    fn from(v: bool) -> Self {
        Argument::Bool(v)
    }
}

impl From<i64> for Argument {
    fn from(v: i64) -> Self {
        Argument::Int(v)
    }
}

impl From<f64> for Argument {
    fn from(v: f64) -> Self {
        Argument::Float(v)
    }
}

impl From<ScalarType> for Argument {
    fn from(v: ScalarType) -> Self {
        Argument::Dtype(v)
    }
}

impl From<&str> for Argument {
    fn from(v: &str) -> Self {
        Argument::Str(v.to_string())
    }
}

/// Literal rendering. Node references print as their handle; the graph
/// printer substitutes `%name` for them.
impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::None => write!(f, "None"),
            Argument::Bool(true) => write!(f, "True"),
            Argument::Bool(false) => write!(f, "False"),
            Argument::Int(v) => write!(f, "{v}"),
            Argument::Float(v) if v.fract() == 0.0 && v.is_finite() => write!(f, "{v:.1}"),
            Argument::Float(v) => write!(f, "{v}"),
            Argument::Str(s) => write!(f, "{s:?}"),
            Argument::Dtype(dt) => write!(f, "{dt}"),
            Argument::Node(id) => write!(f, "{id}"),
            Argument::Tuple(items) if items.len() == 1 => write!(f, "({},)", items[0]),
            Argument::Tuple(items) => write!(f, "({})", itertools::join(items, ", ")),
            Argument::List(items) => write!(f, "[{}]", itertools::join(items, ", ")),
        }
    }
}

/// Ordered keyword arguments of a call.
///
/// Lookup is linear; calls carry a handful of keywords at most.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kwargs(SmallVec<[(String, Argument); 2]>);

impl Kwargs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Argument> {
        self.0.iter().find(|(key, _)| key == name).map(|(_, value)| value)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Insert or overwrite `name`, keeping the original position on overwrite.
    pub fn insert(&mut self, name: impl Into<String>, value: Argument) -> Option<Argument> {
        let name = name.into();
        if let Some((_, slot)) = self.0.iter_mut().find(|(key, _)| *key == name) {
            return Some(std::mem::replace(slot, value));
        }
        self.0.push((name, value));
        None
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(key, _)| key.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Argument> {
        self.0.iter().map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Argument)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Argument)> {
        self.0.iter_mut().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether both keyword sets have the same keys in the same order.
    pub fn same_keys(&self, other: &Kwargs) -> bool {
        self.keys().eq(other.keys())
    }
}

impl<K: Into<String>> FromIterator<(K, Argument)> for Kwargs {
    fn from_iter<T: IntoIterator<Item = (K, Argument)>>(iter: T) -> Self {
        let mut kwargs = Kwargs::new();
        for (key, value) in iter {
            kwargs.insert(key, value);
        }
        kwargs
    }
}
