use crate::test::helpers::tensor;
use crate::*;

fn example() -> Tensor {
    tensor(&[1], vec![0.0])
}

/// `relu(x + y)`.
fn add_relu_module() -> GraphModule {
    let mut t = Tracer::new();
    let x = t.input("x", &example());
    let y = t.input("y", &example());
    let add = t.add(x, y);
    let relu = t.relu(add);
    t.finish(relu.into()).unwrap()
}

/// `clamp(a - b, 0.0, None)`.
fn sub_clamp_module() -> GraphModule {
    let mut t = Tracer::new();
    let a = t.input("a", &example());
    let b = t.input("b", &example());
    let sub = t.sub(a, b);
    let clamp = t.clamp(sub, 0.0, Argument::None);
    t.finish(clamp.into()).unwrap()
}

fn count_calls(graph: &Graph, op: Operator) -> usize {
    graph.nodes().filter(|n| n.is_call_to(op)).count()
}

fn reject_all(_: &InternalMatch, _: &Graph, _: &Graph) -> bool {
    false
}

#[test]
fn test_replace_rewires_outputs() {
    let mut module = add_relu_module();
    let pattern = add_relu_module().graph;
    let replacement = sub_clamp_module();

    let replaced = replace_pattern(&mut module, &pattern, &replacement).unwrap();
    println!("{}", module.code());

    assert_eq!(replaced.len(), 1);
    assert_eq!(replaced[0].replacements.len(), 2);
    assert_eq!(count_calls(&module.graph, Operator::ADD_TENSOR), 0);
    assert_eq!(count_calls(&module.graph, Operator::RELU), 0);
    assert_eq!(count_calls(&module.graph, Operator::CLAMP), 1);

    let output = module.graph.output_node().unwrap();
    let result = module.graph[output].arg(0).and_then(Argument::as_node).unwrap();
    assert!(module.graph[result].is_call_to(Operator::CLAMP));
    assert!(module.code().contains("aten.sub.Tensor"));
}

#[test]
fn test_rejecting_filter_keeps_graph() {
    let mut module = add_relu_module();
    let before = module.code().to_string();
    let pattern = add_relu_module().graph;
    let filter: &MatchFilter = &reject_all;

    let replaced =
        replace_pattern_with_filters(&mut module, &pattern, &sub_clamp_module(), &[filter], LiteralMatching::Exact)
            .unwrap();

    assert!(replaced.is_empty());
    assert_eq!(module.code(), before);
}

#[test]
fn test_later_matches_follow_earlier_replacements() {
    let mut t = Tracer::new();
    let x = t.input("x", &example());
    let r1 = t.relu(x);
    let r2 = t.relu(r1);
    let mut module = t.finish(r2.into()).unwrap();

    let mut p = Tracer::new();
    let a = p.input("a", &example());
    let relu = p.relu(a);
    let pattern = p.finish(relu.into()).unwrap().graph;

    let mut r = Tracer::new();
    let a = r.input("a", &example());
    let clamp = r.clamp(a, 0.0, Argument::None);
    let replacement = r.finish(clamp.into()).unwrap();

    let replaced = replace_pattern(&mut module, &pattern, &replacement).unwrap();
    assert_eq!(replaced.len(), 2);

    let first = replaced[0].replacements[0];
    let second = replaced[1].replacements[0];
    assert_eq!(module.graph[second].arg(0), Some(&Argument::Node(first)));
    assert_eq!(count_calls(&module.graph, Operator::RELU), 0);
    assert!(module.graph.lint().is_ok());
}

#[test]
fn test_replacement_parameters_are_copied() {
    let mut module = add_relu_module();
    let pattern = add_relu_module().graph;

    let mut r = Tracer::new();
    let a = r.input("a", &example());
    let b = r.input("b", &example());
    let scale = r.parameter("scale", tensor(&[1], vec![2.0]));
    let add = r.add(a, b);
    let mul = r.mul(add, scale);
    let replacement = r.finish(mul.into()).unwrap();

    replace_pattern(&mut module, &pattern, &replacement).unwrap();

    assert!(module.params.contains("scale"));
    assert_eq!(count_calls(&module.graph, Operator::MUL_TENSOR), 1);
}

#[test]
fn test_placeholder_count_mismatch() {
    let mut module = add_relu_module();
    let pattern = add_relu_module().graph;

    let mut r = Tracer::new();
    let a = r.input("a", &example());
    let relu = r.relu(a);
    let replacement = r.finish(relu.into()).unwrap();

    let result = replace_pattern(&mut module, &pattern, &replacement);
    assert!(matches!(result, Err(Error::PlaceholderCountMismatch { matched: 2, replacement: 1 })));
}

#[test]
fn test_partial_literal_match_leaves_graph_untouched() {
    let mut p = Tracer::new();
    let a = p.input("a", &example());
    let relu = p.relu(a);
    let mul = p.mul(a, relu);
    let pattern = p.finish(mul.into()).unwrap().graph;

    let mut r = Tracer::new();
    let a = r.input("a", &example());
    let replacement = r.finish(a.into()).unwrap();

    let mut t = Tracer::new();
    let y = t.input("y", &example());
    let scaled = t.mul(y, 0.8);
    let mut module = t.finish(scaled.into()).unwrap();
    let before = module.code().to_string();

    let replaced =
        replace_pattern_with_filters(&mut module, &pattern, &replacement, &[], LiteralMatching::Ignore).unwrap();

    assert!(replaced.is_empty());
    assert_eq!(module.code(), before);
}
