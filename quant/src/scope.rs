//! Per-node module scope lookup.

use std::collections::BTreeMap;

use tessera_ir::GraphModule;

/// Innermost module a node was traced in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeScope {
    /// Last component of the module path, e.g. `conv1` for `backbone.conv1`.
    pub name: String,
    /// Module class name; `None` for nodes traced outside any module.
    pub module_type: Option<String>,
}

/// Map every node name to its innermost recorded module scope.
pub fn node_name_to_scope(module: &GraphModule) -> BTreeMap<String, NodeScope> {
    module
        .graph
        .nodes()
        .map(|node| {
            let scope = match node.innermost_scope() {
                Some(scope) => NodeScope {
                    name: scope.path.rsplit('.').next().unwrap_or_default().to_string(),
                    module_type: Some(scope.type_name.clone()),
                },
                None => NodeScope::default(),
            };
            (node.name().to_string(), scope)
        })
        .collect()
}
