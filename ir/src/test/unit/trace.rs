use crate::test::helpers::tensor;
use crate::*;

fn example() -> Tensor {
    tensor(&[2, 3], vec![0.0; 6])
}

fn calls(graph: &Graph) -> Vec<Operator> {
    graph.nodes().filter_map(Node::operator).collect()
}

#[test]
fn test_input_records_shape() {
    let mut t = Tracer::new();
    let x = t.input("x", &example());
    assert_eq!(t.graph()[x].meta.shape, Some(vec![2, 3]));
}

#[test]
fn test_training_dropout_decomposition() {
    let mut t = Tracer::new();
    let x = t.input("x", &example());
    let y = t.dropout(x, 0.25, true).unwrap();
    let module = t.finish(y.into()).unwrap();
    let graph = &module.graph;

    assert_eq!(
        calls(graph),
        vec![Operator::EMPTY_LIKE, Operator::BERNOULLI_FLOAT, Operator::DIV_SCALAR, Operator::MUL_TENSOR]
    );
    let bernoulli = graph.find_by_name("bernoulli__float").unwrap();
    assert_eq!(graph[bernoulli].arg(1), Some(&Argument::Float(0.75)));
    let div = graph.find_by_name("div__scalar").unwrap();
    assert_eq!(graph[div].arg(1), Some(&Argument::Float(0.75)));
    assert_eq!(graph[y].arg(0), Some(&Argument::Node(x)));
}

#[test]
fn test_eval_dropout_is_identity() {
    let mut t = Tracer::new();
    let x = t.input("x", &example());
    let y = t.dropout(x, 0.5, false).unwrap();
    assert_eq!(x, y);

    let module = t.finish(y.into()).unwrap();
    assert!(calls(&module.graph).is_empty());
}

#[test]
fn test_invalid_dropout_probability() {
    let mut t = Tracer::new();
    let x = t.input("x", &example());
    assert!(matches!(t.dropout(x, 1.5, true), Err(Error::InvalidDropoutProbability { .. })));
}

#[test]
fn test_batch_norm_variants() {
    let mut t = Tracer::new();
    let x = t.input("x", &example());
    let mean = t.parameter("bn.running_mean", tensor(&[3], vec![0.0; 3]));
    let var = t.parameter("bn.running_var", tensor(&[3], vec![1.0; 3]));

    let eval = t.batch_norm(x, None, None, mean, var, &BatchNormParams::default());
    let train_params = BatchNormParams::builder().training(true).eps(1e-3).build();
    let train = t.batch_norm(x, None, None, mean, var, &train_params);
    let module = t.finish(Argument::Tuple(vec![eval.into(), train.into()])).unwrap();
    let graph = &module.graph;

    assert!(graph[eval].is_call_to(Operator::GETITEM));
    assert_eq!(graph[eval].arg(1), Some(&Argument::Int(0)));

    let eval_bn = graph[eval].arg(0).and_then(Argument::as_node).unwrap();
    assert!(graph[eval_bn].is_call_to(Operator::BATCH_NORM_NO_TRAINING));
    assert_eq!(graph[eval_bn].arg(6), Some(&Argument::Float(1e-5)));

    let train_bn = graph[train].arg(0).and_then(Argument::as_node).unwrap();
    assert!(graph[train_bn].is_call_to(Operator::BATCH_NORM));
    assert_eq!(graph[train_bn].arg(5), Some(&Argument::Bool(true)));
    assert_eq!(graph[train_bn].arg(7), Some(&Argument::Float(1e-3)));
}

#[test]
fn test_convolution_arguments() {
    let mut t = Tracer::new();
    let x = t.input("x", &example());
    let w = t.parameter("conv.weight", tensor(&[1, 1, 1, 1], vec![1.0]));
    let params = ConvParams::builder().stride(vec![2, 2]).build();
    let conv = t.convolution(x, w, None, &params);
    let module = t.finish(conv.into()).unwrap();

    let node = &module.graph[conv];
    assert_eq!(node.args().len(), 9);
    assert_eq!(node.arg(2), Some(&Argument::None));
    assert_eq!(node.arg(3), Some(&Argument::int_list(&[2, 2])));
    assert_eq!(node.arg(6), Some(&Argument::Bool(false)));
    assert_eq!(node.arg(8), Some(&Argument::Int(1)));
}

#[test]
fn test_nested_scopes_are_recorded() {
    let mut t = Tracer::new();
    let x = t.input("x", &example());
    let y = t.in_scope("block", "Block", |t| t.in_scope("act", "ReLU", |t| t.relu(x)));
    let z = t.relu(y);

    let graph = t.graph();
    let stack = &graph[y].meta.module_stack;
    assert_eq!(stack.len(), 2);
    assert_eq!(stack[1].1, ModuleScope { path: "block.act".into(), type_name: "ReLU".into() });
    assert_eq!(graph[y].innermost_scope().map(|s| s.type_name.as_str()), Some("ReLU"));
    assert!(graph[z].meta.module_stack.is_empty());
}

#[test]
fn test_quantize_overload_selection() {
    let mut t = Tracer::new();
    let x = t.input("x", &example());
    let scale = t.constant(tensor(&[1], vec![0.1]));
    let zero_point = t.constant(tensor(&[1], vec![0.0]));

    let q_scalar = t.quantize_per_tensor(x, 0.1, 0i64, QuantRange::INT8);
    let q_tensor = t.quantize_per_tensor(x, scale, zero_point, QuantRange::INT8);
    let dq = t.dequantize_per_tensor(q_tensor, scale, zero_point, QuantRange::INT8);
    let module = t.finish(Argument::Tuple(vec![q_scalar.into(), dq.into()])).unwrap();

    assert!(module.graph[q_scalar].is_call_to(Operator::QUANTIZE_PER_TENSOR));
    assert!(module.graph[q_tensor].is_call_to(Operator::QUANTIZE_PER_TENSOR_TENSOR));
    assert!(module.graph[dq].is_call_to(Operator::DEQUANTIZE_PER_TENSOR_TENSOR));
    assert_eq!(module.graph[q_scalar].arg(5), Some(&Argument::Dtype(ScalarType::Int8)));
    assert!(module.params.contains("_tensor_constant1"));
}

#[test]
fn test_finish_builds_input_spec() {
    let mut t = Tracer::new();
    let x = t.input("x", &example());
    let y = t.input("y", &example());
    let sum = t.add(x, y);
    let module = t.finish(sum.into()).unwrap();

    assert_eq!(module.in_spec, TreeSpec::positional(2));
    assert_eq!(module.in_spec.num_leaves(), 2);
    assert!(module.code().contains("return add_tensor"));
}
