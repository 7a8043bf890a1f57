//! Mutable dataflow graph with arena storage.
//!
//! Nodes live in an append-only arena indexed by [`NodeId`]; program order is
//! a doubly linked list threaded through the arena, so nodes can be inserted
//! next to an anchor or erased in constant time without invalidating handles. Every mutation that touches arguments also updates the `users`
//! back-references of the affected inputs, so the invariant
//!
//! > `b ∈ a.users` ⇔ `b` references `a` in its args or kwargs
//!
//! holds whenever a public method returns.
//!
//! # Insertion points
//!
//! New nodes are placed at the graph's current [`InsertPoint`] (the end by
//! default). [`Graph::inserting_before`] and [`Graph::inserting_after`] scope a
//! different point to a closure and restore the previous one afterwards:
//!
//! ```ignore
//! let bias = graph.inserting_before(conv, |g| g.get_attr("conv_weight_bias"))?;
//! ```

mod dce;
mod display;
mod lint;

use std::collections::{HashMap, HashSet};
use std::ops::Index;

use snafu::{OptionExt, ensure};

use crate::error::*;
use crate::node::{Node, NodeId, NodeMeta};
use crate::op::{OpKind, Operator, Target};
use crate::types::{Argument, Kwargs};

/// Where [`Graph::create_node`] places new nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InsertPoint {
    /// After the current last node.
    #[default]
    Append,
    /// Immediately before the anchor; consecutive inserts keep their order.
    Before(NodeId),
    /// Immediately after the anchor; each insert lands directly behind it.
    After(NodeId),
}

/// Neighbours of an arena slot in program order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Link {
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

/// Ordered, mutable computation graph.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// Arena; erased slots become `None` and are never reused.
    nodes: Vec<Option<Node>>,
    /// Program order (def-before-use), one entry per arena slot.
    links: Vec<Link>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
    len: usize,
    /// Every name ever handed out.
    names: HashSet<String>,
    /// Next numeric suffix per base name.
    name_counters: HashMap<String, usize>,
    insert_point: InsertPoint,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    /// Live nodes in program order.
    pub fn nodes(&self) -> Nodes<'_> {
        Nodes { graph: self, front: self.head, back: self.tail, remaining: self.len }
    }

    /// Snapshot of node handles in program order.
    ///
    /// Use this to iterate while mutating the graph.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes().map(Node::id).collect()
    }

    /// Position of a node in program order.
    ///
    /// Walks the order from the start; passes never need it.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.nodes().position(|n| n.id == id)
    }

    /// Node following `id` in program order.
    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.contains(id).then(|| self.links[id.index()].next).flatten()
    }

    /// Node preceding `id` in program order.
    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.contains(id).then(|| self.links[id.index()].prev).flatten()
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes().find(|n| n.name == name).map(Node::id)
    }

    /// Placeholder nodes in program order.
    pub fn placeholders(&self) -> Vec<NodeId> {
        self.nodes().filter(|n| n.op == OpKind::Placeholder).map(Node::id).collect()
    }

    /// The output node, if the graph has one.
    pub fn output_node(&self) -> Option<NodeId> {
        self.nodes().rev().find(|n| n.op == OpKind::Output).map(Node::id)
    }

    /// Mutable access to a node's annotations.
    pub fn meta_mut(&mut self, id: NodeId) -> &mut NodeMeta {
        &mut self.node_mut(id).meta
    }

    pub fn insert_point(&self) -> InsertPoint {
        self.insert_point
    }

    // =========================================================================
    // Node creation
    // =========================================================================

    /// Create a node at the current insertion point and register its uses.
    ///
    /// `name` is a naming hint; the final name is made unique within the
    /// graph. Panics if an argument references a node that is not live.
    pub fn create_node(
        &mut self,
        op: OpKind,
        target: Target,
        args: Vec<Argument>,
        kwargs: Kwargs,
        name: Option<&str>,
    ) -> NodeId {
        let hint = match name {
            Some(name) => name.to_string(),
            None => default_name(op, &target),
        };
        let name = self.unique_name(&hint);
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(Node {
            id,
            name,
            op,
            target,
            args,
            kwargs,
            users: Vec::new(),
            meta: NodeMeta::default(),
        }));
        self.links.push(Link::default());

        let prev = self.insertion_predecessor();
        self.link_after(id, prev);
        self.register_uses(id);

        tracing::trace!(node.id = %id, node.name = %self[id].name, op = %op, "created node");
        id
    }

    /// Add a graph input named `name`.
    pub fn placeholder(&mut self, name: &str) -> NodeId {
        self.create_node(OpKind::Placeholder, Target::Name(name.to_string()), Vec::new(), Kwargs::new(), Some(name))
    }

    /// Add a read of the stored parameter `attr`.
    pub fn get_attr(&mut self, attr: &str) -> NodeId {
        let hint = attr.replace('.', "_");
        self.create_node(OpKind::GetAttr, Target::Name(attr.to_string()), Vec::new(), Kwargs::new(), Some(&hint))
    }

    /// Add a call of `op`.
    pub fn call_function(&mut self, op: Operator, args: Vec<Argument>, kwargs: Kwargs) -> NodeId {
        self.create_node(OpKind::CallFunction, Target::Op(op), args, kwargs, None)
    }

    /// Add the output node returning `value`.
    pub fn output(&mut self, value: Argument) -> Result<NodeId> {
        if let Some(existing) = self.output_node() {
            return DuplicateOutputSnafu { name: self[existing].name.clone() }.fail();
        }
        Ok(self.create_node(OpKind::Output, Target::Name("output".into()), vec![value], Kwargs::new(), None))
    }

    /// Run `f` with new nodes inserted immediately before `anchor`.
    pub fn inserting_before<R>(&mut self, anchor: NodeId, f: impl FnOnce(&mut Graph) -> R) -> Result<R> {
        self.with_insert_point(InsertPoint::Before(anchor), f)
    }

    /// Run `f` with new nodes inserted immediately after `anchor`.
    pub fn inserting_after<R>(&mut self, anchor: NodeId, f: impl FnOnce(&mut Graph) -> R) -> Result<R> {
        self.with_insert_point(InsertPoint::After(anchor), f)
    }

    fn with_insert_point<R>(&mut self, point: InsertPoint, f: impl FnOnce(&mut Graph) -> R) -> Result<R> {
        if let InsertPoint::Before(anchor) | InsertPoint::After(anchor) = point {
            ensure!(self.contains(anchor), InvalidInsertPointSnafu { id: anchor });
        }
        let saved = std::mem::replace(&mut self.insert_point, point);
        let result = f(self);
        self.insert_point = saved;
        Ok(result)
    }

    /// Node the next created node is linked behind; `None` means the front.
    fn insertion_predecessor(&self) -> Option<NodeId> {
        match self.insert_point {
            InsertPoint::Append => self.tail,
            InsertPoint::Before(anchor) if self.contains(anchor) => self.links[anchor.index()].prev,
            InsertPoint::After(anchor) if self.contains(anchor) => Some(anchor),
            point => {
                tracing::warn!(?point, "insertion anchor was erased, appending instead");
                self.tail
            }
        }
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Replace all positional arguments of `id`.
    pub fn set_args(&mut self, id: NodeId, args: Vec<Argument>) {
        self.unregister_uses(id);
        self.node_mut(id).args = args;
        self.register_uses(id);
    }

    /// Replace the positional argument at `index`, padding with `None` if the
    /// call currently has fewer arguments.
    pub fn set_arg(&mut self, id: NodeId, index: usize, value: Argument) {
        let mut args = self[id].args.clone();
        if args.len() <= index {
            args.resize(index + 1, Argument::None);
        }
        args[index] = value;
        self.set_args(id, args);
    }

    /// Replace all keyword arguments of `id`.
    pub fn set_kwargs(&mut self, id: NodeId, kwargs: Kwargs) {
        self.unregister_uses(id);
        self.node_mut(id).kwargs = kwargs;
        self.register_uses(id);
    }

    /// Retarget a node. Arguments and users are left untouched.
    pub fn set_target(&mut self, id: NodeId, target: Target) {
        self.node_mut(id).target = target;
    }

    /// Make every user of `old` reference `new` instead.
    ///
    /// `old` stays in the graph (possibly dead). Returns the rewired users.
    pub fn replace_all_uses_with(&mut self, old: NodeId, new: NodeId) -> Vec<NodeId> {
        if old == new {
            return Vec::new();
        }
        let users = self[old].users.clone();
        for &user in &users {
            self.replace_input_with(user, old, new);
        }
        tracing::trace!(old = %self[old].name, new = %self[new].name, rewired = users.len(), "replaced all uses");
        users
    }

    /// Replace every reference to `old` inside `user`'s arguments with `new`.
    pub fn replace_input_with(&mut self, user: NodeId, old: NodeId, new: NodeId) {
        let mut swap = |id: NodeId| Argument::Node(if id == old { new } else { id });
        let node = &self[user];
        let args = node.args.iter().map(|arg| arg.map_nodes(&mut swap)).collect();
        let kwargs = node.kwargs.iter().map(|(key, arg)| (key.to_string(), arg.map_nodes(&mut swap))).collect();

        self.unregister_uses(user);
        let node = self.node_mut(user);
        node.args = args;
        node.kwargs = kwargs;
        self.register_uses(user);
    }

    /// Remove a node that has no users.
    pub fn erase_node(&mut self, id: NodeId) -> Result<()> {
        let node = self.node(id).context(UnknownNodeSnafu { id })?;
        ensure!(node.users.is_empty(), NodeHasUsersSnafu { name: node.name.clone(), users: node.users.len() });

        self.unregister_uses(id);
        self.unlink(id);
        let node = self.nodes[id.index()].take();
        if let Some(node) = node {
            tracing::trace!(node.id = %id, node.name = %node.name, "erased node");
        }
        Ok(())
    }

    /// Copy every node of `src` not already in `val_map` into this graph at
    /// the current insertion point.
    ///
    /// `val_map` maps `src` node ids to values in this graph; it must cover
    /// every `src` placeholder and is extended with the copied nodes. Returns
    /// the value `src` outputs, translated into this graph.
    pub fn graph_copy(&mut self, src: &Graph, val_map: &mut HashMap<NodeId, Argument>) -> Result<Argument> {
        let mut output = None;
        for node in src.nodes() {
            if val_map.contains_key(&node.id) {
                continue;
            }
            for input in node.input_nodes() {
                ensure!(val_map.contains_key(&input), UnknownNodeSnafu { id: input });
            }
            let mut translate = |id: NodeId| val_map[&id].clone();
            let args: Vec<_> = node.args.iter().map(|arg| arg.map_nodes(&mut translate)).collect();
            let kwargs = node.kwargs.iter().map(|(key, arg)| (key.to_string(), arg.map_nodes(&mut translate))).collect();

            if node.op == OpKind::Output {
                output = args.into_iter().next();
                continue;
            }
            ensure!(node.op != OpKind::Placeholder, UnknownNodeSnafu { id: node.id });

            let copied = self.create_node(node.op, node.target.clone(), args, kwargs, Some(&node.name));
            self.node_mut(copied).meta = node.meta.clone();
            val_map.insert(node.id, Argument::Node(copied));
        }
        output.context(MissingOutputSnafu)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .unwrap_or_else(|| panic!("node {id} is not part of this graph"))
    }

    /// Link a fresh node behind `prev`, or at the front when `prev` is `None`.
    fn link_after(&mut self, id: NodeId, prev: Option<NodeId>) {
        let next = match prev {
            Some(prev) => self.links[prev.index()].next,
            None => self.head,
        };
        self.links[id.index()] = Link { prev, next };
        match prev {
            Some(prev) => self.links[prev.index()].next = Some(id),
            None => self.head = Some(id),
        }
        match next {
            Some(next) => self.links[next.index()].prev = Some(id),
            None => self.tail = Some(id),
        }
        self.len += 1;
    }

    fn unlink(&mut self, id: NodeId) {
        let Link { prev, next } = std::mem::take(&mut self.links[id.index()]);
        match prev {
            Some(prev) => self.links[prev.index()].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.links[next.index()].prev = prev,
            None => self.tail = prev,
        }
        self.len -= 1;
    }

    fn register_uses(&mut self, user: NodeId) {
        for input in self[user].input_nodes() {
            let users = &mut self.node_mut(input).users;
            if !users.contains(&user) {
                users.push(user);
            }
        }
    }

    fn unregister_uses(&mut self, user: NodeId) {
        for input in self[user].input_nodes() {
            if let Some(Some(node)) = self.nodes.get_mut(input.index()) {
                node.users.retain(|&u| u != user);
            }
        }
    }

    fn unique_name(&mut self, hint: &str) -> String {
        let base = sanitize_name(hint);
        if self.names.insert(base.clone()) {
            return base;
        }
        let counter = self.name_counters.entry(base.clone()).or_insert(1);
        loop {
            let candidate = format!("{base}_{counter}");
            *counter += 1;
            if self.names.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

/// Iterator over live nodes in program order; see [`Graph::nodes`].
#[derive(Debug, Clone)]
pub struct Nodes<'g> {
    graph: &'g Graph,
    front: Option<NodeId>,
    back: Option<NodeId>,
    remaining: usize,
}

impl<'g> Iterator for Nodes<'g> {
    type Item = &'g Node;

    fn next(&mut self) -> Option<&'g Node> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.front?;
        self.front = self.graph.links[id.index()].next;
        self.remaining -= 1;
        Some(&self.graph[id])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl DoubleEndedIterator for Nodes<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.back?;
        self.back = self.graph.links[id.index()].prev;
        self.remaining -= 1;
        Some(&self.graph[id])
    }
}

impl ExactSizeIterator for Nodes<'_> {}

impl Index<NodeId> for Graph {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        self.node(id).unwrap_or_else(|| panic!("node {id} is not part of this graph"))
    }
}

fn default_name(op: OpKind, target: &Target) -> String {
    match (op, target) {
        (OpKind::CallFunction, Target::Op(operator)) => operator.node_name(),
        (_, Target::Name(name)) => name.replace('.', "_"),
        (_, Target::Op(operator)) => operator.node_name(),
    }
}

fn sanitize_name(hint: &str) -> String {
    let mut name: String = hint.chars().map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' }).collect();
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}
