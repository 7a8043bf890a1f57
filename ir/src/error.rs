use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Node handle does not refer to a live node of this graph.
    #[snafu(display("node {id} is not part of this graph"))]
    UnknownNode { id: crate::NodeId },

    /// Erasing a node that is still referenced.
    #[snafu(display("cannot erase node '{name}': it still has {users} user(s)"))]
    NodeHasUsers { name: String, users: usize },

    /// Graph has no output node.
    #[snafu(display("graph has no output node"))]
    MissingOutput,

    /// A second output node was requested.
    #[snafu(display("graph already has an output node '{name}'"))]
    DuplicateOutput { name: String },

    /// Anchor node for an insertion point is not part of the graph.
    #[snafu(display("insertion anchor {id} is not part of this graph"))]
    InvalidInsertPoint { id: crate::NodeId },

    // =========================================================================
    // Lint
    // =========================================================================
    /// A node references an input that is not among its inputs' users.
    #[snafu(display("users of '{input}' are out of sync: '{user}' references it but is not recorded as a user"))]
    MissingUserEdge { input: String, user: String },

    /// A node lists a user that does not reference it.
    #[snafu(display("users of '{input}' are out of sync: '{user}' is recorded as a user but does not reference it"))]
    StaleUserEdge { input: String, user: String },

    /// A node references an input defined later in program order.
    #[snafu(display("node '{node}' uses '{input}' before it is defined"))]
    UseBeforeDefinition { node: String, input: String },

    /// Two live nodes share a name.
    #[snafu(display("duplicate node name '{name}'"))]
    DuplicateName { name: String },

    /// Output node is not the final node of the graph.
    #[snafu(display("output node '{name}' is not the last node of the graph"))]
    OutputNotLast { name: String },

    /// `get_attr` refers to an attribute that is not stored in the module.
    #[snafu(display("attribute '{name}' is not stored in the module"))]
    MissingParameter { name: String },

    /// Node expected to read a stored parameter is not a `get_attr` node.
    #[snafu(display("node '{name}' is not a get_attr node"))]
    NotAttribute { name: String },

    /// Input spec does not follow the `(args, kwargs)` convention.
    #[snafu(display("input spec {spec} is not an (args, kwargs) tuple"))]
    MalformedInputSpec { spec: String },

    // =========================================================================
    // Matching and replacement
    // =========================================================================
    /// Pattern graph contains a node nothing consumes.
    #[snafu(display("pattern graph contains dead node '{name}'"))]
    DeadPatternNode { name: String },

    /// Match does not bind a non-placeholder pattern node to a graph node.
    #[snafu(display("match does not bind pattern node '{name}' to a graph node"))]
    IncompleteMatch { name: String },

    /// Placeholder counts of match and replacement disagree.
    #[snafu(display("match binds {matched} placeholder(s) but replacement declares {replacement}"))]
    PlaceholderCountMismatch { matched: usize, replacement: usize },

    /// Returning value counts of match and replacement disagree.
    #[snafu(display("match returns {matched} value(s) but replacement returns {replacement}"))]
    ReturnCountMismatch { matched: usize, replacement: usize },

    /// Matched returning nodes have no users to anchor the replacement.
    #[snafu(display("returning nodes of the match starting at '{anchor}' have no users"))]
    ReturningNodesWithoutUsers { anchor: String },

    /// Replacement result is not a node and cannot stand in for a matched node.
    #[snafu(display("replacement returns '{value}', which cannot replace graph node '{name}'"))]
    NonNodeReplacement { name: String, value: String },

    // =========================================================================
    // Tracing
    // =========================================================================
    /// Dropout probability outside `[0, 1]`.
    #[snafu(display("dropout probability must be in [0, 1], got {p}"))]
    InvalidDropoutProbability { p: f64 },
}
