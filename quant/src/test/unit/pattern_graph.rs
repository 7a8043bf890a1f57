use tessera_ir::{Argument, OpKind, Operator};

use crate::test::helpers::tensor;
use crate::*;

#[test]
fn test_inputs_are_positional_args() {
    let examples = [tensor(&[2], vec![0.0; 2]), tensor(&[2], vec![0.0; 2])];
    let module =
        build_decomposed_graph(|t, inputs, _| Ok(t.add(inputs[0], inputs[1]).into()), &examples, &TraceOptions::default())
            .unwrap();

    let names: Vec<_> = module.graph.placeholders().iter().map(|&p| module.graph[p].name().to_string()).collect();
    assert_eq!(names, ["arg0", "arg1"]);
    assert_eq!(module.in_spec.num_leaves(), 2);
    assert!(module.code().contains("aten.add.Tensor"));
}

#[test]
fn test_dead_nodes_are_removed() {
    let examples = [tensor(&[2], vec![0.0; 2])];
    let module = build_decomposed_graph(
        |t, inputs, _| {
            t.relu(inputs[0]);
            Ok(t.mul(inputs[0], 2.0).into())
        },
        &examples,
        &TraceOptions::default(),
    )
    .unwrap();

    assert!(!module.graph.nodes().any(|n| n.is_call_to(Operator::RELU)));
    assert_eq!(module.graph.nodes().filter(|n| n.op() == OpKind::CallFunction).count(), 1);
}

#[test]
fn test_options_reach_the_callable() {
    let examples = [tensor(&[2], vec![0.0; 2])];
    let options = TraceOptions::default().with("training", true).with("p", 0.25);
    let module = build_decomposed_graph(
        |t, inputs, options| {
            let y = t.dropout(inputs[0], options.number("p", 0.5), options.flag("training", false))?;
            Ok(y.into())
        },
        &examples,
        &options,
    )
    .unwrap();

    let bernoulli = module.graph.nodes().find(|n| n.is_call_to(Operator::BERNOULLI_FLOAT)).unwrap();
    assert_eq!(bernoulli.arg(1), Some(&Argument::Float(0.75)));
}

#[test]
fn test_tracer_errors_are_wrapped() {
    let examples = [tensor(&[2], vec![0.0; 2])];
    let err = build_decomposed_graph(
        |t, inputs, _| Ok(t.dropout(inputs[0], 2.0, true)?.into()),
        &examples,
        &TraceOptions::default(),
    )
    .unwrap_err();

    assert!(matches!(err, Error::Graph { source: tessera_ir::Error::InvalidDropoutProbability { .. } }));
}
