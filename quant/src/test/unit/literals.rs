use tessera_ir::{Argument, Kwargs, OpKind, Operator, Tracer, TreeSpec};

use crate::test::helpers::tensor;
use crate::*;

#[test]
fn test_scalar_and_tuple_literals_become_inputs() {
    let mut t = Tracer::new();
    let x = t.input("x", &tensor(&[2], vec![0.0; 2]));
    let call = t.call(
        Operator::ADD_TENSOR,
        vec![x.into(), Argument::Int(3), Argument::Tuple(vec![Argument::Int(1), Argument::Int(2)])],
        Kwargs::new(),
    );
    let module = t.finish(call.into()).unwrap();

    let module = promote_literals_to_inputs(module).unwrap();
    println!("{}", module.code());

    let placeholders = module.graph.placeholders();
    let names: Vec<_> = placeholders.iter().map(|&p| module.graph[p].name()).collect();
    assert_eq!(names, ["x", "arg1", "arg2"]);
    assert_eq!(
        module.graph[call].args(),
        &[Argument::Node(x), Argument::Node(placeholders[1]), Argument::Node(placeholders[2])]
    );
    assert_eq!(module.in_spec, TreeSpec::positional(3));
    assert_eq!(module.graph.position(placeholders[2]), Some(2));
}

#[test]
fn test_promotion_follows_node_then_argument_order() {
    let mut t = Tracer::new();
    let x = t.input("x", &tensor(&[2], vec![0.0; 2]));
    let y = t.input("y", &tensor(&[2], vec![0.0; 2]));
    let add = t.add(x, 1.5);
    let clamp = t.clamp(add, 0.0, 6.0);
    let sum = t.add(clamp, y);
    let module = t.finish(sum.into()).unwrap();

    let module = promote_literals_to_inputs(module).unwrap();

    let placeholders = module.graph.placeholders();
    assert_eq!(placeholders.len(), 5);
    assert_eq!(module.graph[add].arg(1), Some(&Argument::Node(placeholders[2])));
    assert_eq!(module.graph[clamp].arg(1), Some(&Argument::Node(placeholders[3])));
    assert_eq!(module.graph[clamp].arg(2), Some(&Argument::Node(placeholders[4])));
    assert_eq!(module.graph[placeholders[4]].name(), "arg4");
    assert_eq!(module.in_spec.num_leaves(), 5);
}

#[test]
fn test_non_literal_arguments_are_kept() {
    let mut t = Tracer::new();
    let x = t.input("x", &tensor(&[2], vec![0.0; 2]));
    let mut kwargs = Kwargs::new();
    kwargs.insert("alpha", Argument::Float(2.0));
    let call = t.call(Operator::ADD_TENSOR, vec![x.into(), Argument::None], kwargs.clone());
    let module = t.finish(call.into()).unwrap();

    let module = promote_literals_to_inputs(module).unwrap();

    assert_eq!(module.graph.placeholders().len(), 1);
    assert_eq!(module.graph[call].args(), &[Argument::Node(x), Argument::None]);
    assert_eq!(module.graph[call].kwargs(), &kwargs);
}

#[test]
fn test_graph_without_inputs_gets_leading_placeholder() {
    let mut t = Tracer::new();
    let c = t.constant(tensor(&[2], vec![1.0, 2.0]));
    let mul = t.mul(c, 4i64);
    let module = t.finish(mul.into()).unwrap();

    let module = promote_literals_to_inputs(module).unwrap();

    let first = module.graph.nodes().next().unwrap();
    assert_eq!(first.op(), OpKind::Placeholder);
    assert_eq!(first.name(), "arg0");
    assert_eq!(module.graph[mul].arg(1), Some(&Argument::Node(first.id())));
    assert_eq!(module.in_spec.num_leaves(), 1);
}
