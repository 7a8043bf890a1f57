use std::collections::HashMap;

use crate::test::helpers::add_relu_graph;
use crate::*;

#[test]
fn test_users_track_argument_references() {
    let (g, x, add, relu) = add_relu_graph();

    // `x` appears twice in `add` but is recorded once.
    assert_eq!(g[x].users(), &[add]);
    assert_eq!(g[add].users(), &[relu]);
    let output = g.output_node().unwrap();
    assert_eq!(g[relu].users(), &[output]);
    assert!(g.lint().is_ok());
}

#[test]
fn test_default_names_are_unique() {
    let mut g = Graph::new();
    let x = g.placeholder("x");
    let a = g.call_function(Operator::RELU, vec![x.into()], Kwargs::new());
    let b = g.call_function(Operator::RELU, vec![a.into()], Kwargs::new());
    let c = g.call_function(Operator::RELU, vec![b.into()], Kwargs::new());

    assert_eq!(g[a].name(), "relu_default");
    assert_eq!(g[b].name(), "relu_default_1");
    assert_eq!(g[c].name(), "relu_default_2");
}

#[test]
fn test_get_attr_name_replaces_dots() {
    let mut g = Graph::new();
    let w = g.get_attr("conv.weight");
    assert_eq!(g[w].name(), "conv_weight");
    assert_eq!(g[w].target().as_name(), Some("conv.weight"));
}

#[test]
fn test_inserting_before_keeps_call_order() {
    let (mut g, _, add, relu) = add_relu_graph();
    let (first, second) = g
        .inserting_before(relu, |g| {
            let first = g.call_function(Operator::RELU, vec![add.into()], Kwargs::new());
            let second = g.call_function(Operator::RELU, vec![first.into()], Kwargs::new());
            (first, second)
        })
        .unwrap();

    let relu_pos = g.position(relu).unwrap();
    assert_eq!(g.position(first), Some(relu_pos - 2));
    assert_eq!(g.position(second), Some(relu_pos - 1));
    assert_eq!(g.insert_point(), InsertPoint::Append);
    assert!(g.lint().is_ok());
}

#[test]
fn test_inserting_after_places_each_node_behind_anchor() {
    let (mut g, x, ..) = add_relu_graph();
    let (first, second) = g
        .inserting_after(x, |g| {
            let first = g.get_attr("a");
            let second = g.get_attr("b");
            (first, second)
        })
        .unwrap();

    assert_eq!(g.position(x), Some(0));
    assert_eq!(g.position(second), Some(1));
    assert_eq!(g.position(first), Some(2));
}

#[test]
fn test_erase_relinks_neighbours() {
    let (mut g, x, add, relu) = add_relu_graph();
    let output = g.output_node().unwrap();
    g.replace_all_uses_with(relu, add);
    g.erase_node(relu).unwrap();

    assert_eq!(g.len(), 3);
    assert_eq!(g.node_ids(), vec![x, add, output]);
    assert_eq!(g.next(add), Some(output));
    assert_eq!(g.prev(output), Some(add));
    assert_eq!(g.next(relu), None);
    let reversed: Vec<_> = g.nodes().rev().map(Node::id).collect();
    assert_eq!(reversed, vec![output, add, x]);
    assert_eq!(g.nodes().len(), 3);
}

#[test]
fn test_insert_at_both_ends() {
    let (mut g, x, ..) = add_relu_graph();
    let output = g.output_node().unwrap();

    let front = g.inserting_before(x, |g| g.placeholder("front")).unwrap();
    let back = g.inserting_after(output, |g| g.get_attr("back")).unwrap();

    assert_eq!(g.nodes().next().map(Node::id), Some(front));
    assert_eq!(g.nodes().next_back().map(Node::id), Some(back));
    assert_eq!(g.prev(front), None);
    assert_eq!(g.next(back), None);
    assert_eq!(g.len(), 6);
}

#[test]
fn test_many_anchored_inserts_keep_order() {
    let mut g = Graph::new();
    let x = g.placeholder("x");
    let out = g.output(x.into()).unwrap();
    let inserted: Vec<_> = g
        .inserting_before(out, |g| (0..64).map(|i| g.get_attr(&format!("p{i}"))).collect())
        .unwrap();

    let ids = g.node_ids();
    assert_eq!(ids.first(), Some(&x));
    assert_eq!(ids.last(), Some(&out));
    assert_eq!(&ids[1..65], inserted.as_slice());
    assert!(g.lint().is_ok());
}

#[test]
fn test_inserting_before_unknown_anchor_fails() {
    let (mut g, _, add, relu) = add_relu_graph();
    g.replace_all_uses_with(relu, add);
    g.erase_node(relu).unwrap();

    let result = g.inserting_before(relu, |g| g.get_attr("a"));
    assert!(matches!(result, Err(Error::InvalidInsertPoint { .. })));
}

#[test]
fn test_replace_all_uses_keeps_old_node() {
    let (mut g, x, add, relu) = add_relu_graph();
    let rewired = g.replace_all_uses_with(add, x);

    assert_eq!(rewired, vec![relu]);
    assert_eq!(g[relu].args(), &[Argument::Node(x)]);
    assert!(g.contains(add));
    assert!(g[add].users().is_empty());
    assert!(g[x].users().contains(&relu));
    assert!(g[x].users().contains(&add));
    assert!(g.lint().is_ok());
}

#[test]
fn test_replace_all_uses_rewires_nested_and_keyword_references() {
    let mut g = Graph::new();
    let x = g.placeholder("x");
    let y = g.placeholder("y");
    let kwargs: Kwargs = [("other", Argument::Node(x))].into_iter().collect();
    let call = g.call_function(Operator::CLAMP, vec![Argument::Tuple(vec![x.into(), Argument::Int(1)])], kwargs);

    g.replace_all_uses_with(x, y);

    assert_eq!(g[call].args(), &[Argument::Tuple(vec![y.into(), Argument::Int(1)])]);
    assert_eq!(g[call].kwargs().get("other"), Some(&Argument::Node(y)));
    assert!(g[x].users().is_empty());
    assert_eq!(g[y].users(), &[call]);
}

#[test]
fn test_erase_node_with_users_fails() {
    let (mut g, _, add, _) = add_relu_graph();
    assert!(matches!(g.erase_node(add), Err(Error::NodeHasUsers { users: 1, .. })));
    assert!(g.contains(add));
}

#[test]
fn test_erase_node_unregisters_uses() {
    let (mut g, x, add, relu) = add_relu_graph();
    g.replace_all_uses_with(add, x);
    g.erase_node(add).unwrap();

    assert!(!g.contains(add));
    assert_eq!(g[x].users(), &[relu]);
    assert!(matches!(g.erase_node(add), Err(Error::UnknownNode { .. })));
}

#[test]
fn test_set_arg_pads_with_none() {
    let (mut g, x, _, relu) = add_relu_graph();
    g.set_arg(relu, 2, x.into());

    assert_eq!(g[relu].args().len(), 3);
    assert_eq!(g[relu].arg(1), Some(&Argument::None));
    assert!(g[x].users().contains(&relu));
}

#[test]
fn test_set_args_drops_stale_users() {
    let (mut g, x, add, relu) = add_relu_graph();
    g.set_args(relu, vec![x.into()]);

    assert!(g[add].users().is_empty());
    assert!(g[x].users().contains(&relu));
}

#[test]
fn test_second_output_is_rejected() {
    let (mut g, x, ..) = add_relu_graph();
    assert!(matches!(g.output(x.into()), Err(Error::DuplicateOutput { .. })));
}

#[test]
fn test_graph_copy_maps_placeholders() {
    let (src, src_x, ..) = add_relu_graph();

    let mut dst = Graph::new();
    let y = dst.placeholder("y");
    let mut val_map = HashMap::from([(src_x, Argument::Node(y))]);
    let result = dst.graph_copy(&src, &mut val_map).unwrap();

    let copied = result.as_node().unwrap();
    assert!(dst[copied].is_call_to(Operator::RELU));
    let copied_add = dst[copied].arg(0).and_then(Argument::as_node).unwrap();
    assert_eq!(dst[copied_add].args(), &[Argument::Node(y), Argument::Node(y)]);
    assert_eq!(val_map.len(), 3);
}

#[test]
fn test_graph_copy_requires_bound_placeholders() {
    let (src, ..) = add_relu_graph();
    let mut dst = Graph::new();
    let result = dst.graph_copy(&src, &mut HashMap::new());
    assert!(matches!(result, Err(Error::UnknownNode { .. })));
}

#[test]
fn test_lint_detects_missing_user_edge() {
    let (mut g, x, ..) = add_relu_graph();
    g.node_mut(x).users.clear();
    assert!(matches!(g.lint(), Err(Error::MissingUserEdge { .. })));
}

#[test]
fn test_lint_detects_stale_user_edge() {
    let (mut g, x, _, relu) = add_relu_graph();
    g.node_mut(x).users.push(relu);
    assert!(matches!(g.lint(), Err(Error::StaleUserEdge { .. })));
}

#[test]
fn test_lint_detects_output_not_last() {
    let (mut g, x, ..) = add_relu_graph();
    g.call_function(Operator::RELU, vec![x.into()], Kwargs::new());
    assert!(matches!(g.lint(), Err(Error::OutputNotLast { .. })));
}

#[test]
fn test_display_lists_nodes() {
    let (g, ..) = add_relu_graph();
    let listing = g.to_string();
    println!("{listing}");

    assert!(listing.starts_with("graph():"));
    assert!(listing.contains("%x : [num_users=1] = placeholder[target=x]"));
    assert!(listing.contains("call_function[target=aten.add.Tensor](args = (%x, %x), kwargs = {})"));
    assert!(listing.contains("call_function[target=aten.relu.default](args = (%add_tensor,), kwargs = {})"));
    assert!(listing.trim_end().ends_with("return relu_default"));
}
