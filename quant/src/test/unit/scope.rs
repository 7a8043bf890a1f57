use tessera_ir::Operator;

use crate::test::helpers::ConvBn;
use crate::*;

#[test]
fn test_scope_of_nested_modules() {
    let module = ConvBn::new(false, false).finish();
    let scopes = node_name_to_scope(&module);

    let name_of = |op: Operator| module.graph.nodes().find(|n| n.is_call_to(op)).unwrap().name().to_string();

    let conv = &scopes[&name_of(Operator::CONVOLUTION)];
    assert_eq!(conv.name, "0");
    assert_eq!(conv.module_type.as_deref(), Some("Conv2d"));

    let bn = &scopes[&name_of(Operator::BATCH_NORM_NO_TRAINING)];
    assert_eq!(bn.name, "1");
    assert_eq!(bn.module_type.as_deref(), Some("BatchNorm2d"));

    assert_eq!(scopes["conv_weight"].module_type.as_deref(), Some("Conv2d"));
}

#[test]
fn test_nodes_outside_modules_have_empty_scope() {
    let module = ConvBn::new(false, false).finish();
    let scopes = node_name_to_scope(&module);

    assert_eq!(scopes.len(), module.graph.len());
    assert_eq!(scopes["x"], NodeScope::default());
    let relu = module.graph.nodes().find(|n| n.is_call_to(Operator::RELU)).unwrap();
    assert_eq!(scopes[relu.name()], NodeScope { name: String::new(), module_type: None });
}
