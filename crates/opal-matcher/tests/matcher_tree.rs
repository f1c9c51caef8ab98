//! End-to-end tests for matcher tree generation.
//!
//! Builds pattern modules through the `opal-ir` builder API, generates the
//! merged matcher tree, and checks both concrete tree shapes and the
//! invariants every generated tree must satisfy.

use rustc_hash::FxHashMap;

use opal_ir::{Pattern, PatternId, PatternModule};
use opal_matcher::{
    build_predicate_list, generate_matcher_tree, order_predicates, pretty_print, success_patterns,
    MatcherNode, OrderedPredicate, PositionId, PredicateBuilder, PredicateOrdering, QuestionId,
    QuestionKind, TreeStats,
};

/// A pattern matching a nullary operation with the given name.
fn named_op_pattern(name: &str) -> Pattern {
    let mut p = Pattern::build(name);
    let (op, _) = p.operation(Some(name), vec![], vec![], vec![]);
    p.finish(op)
}

/// A pattern matching `add(input, input)` with no results.
fn binary_add_pattern(name: &str) -> Pattern {
    let mut p = Pattern::build(name);
    let a = p.input();
    let b = p.input();
    let (op, _) = p.operation(Some("add"), vec![a, b], vec![], vec![]);
    p.finish(op)
}

fn generate(module: &PatternModule) -> (Box<MatcherNode>, PredicateBuilder) {
    let mut builder = PredicateBuilder::new();
    let root = generate_matcher_tree(module, &mut builder).expect("generation succeeds");
    (root, builder)
}

/// Recompute the predicate ordering for a module against the same builder.
/// Interning is idempotent, so the handles line up with the generated tree.
fn ordering_for(module: &PatternModule, builder: &mut PredicateBuilder) -> PredicateOrdering {
    let mut lists = Vec::new();
    for (id, pattern) in module.iter() {
        let (preds, _) = build_predicate_list(pattern, builder).expect("extraction succeeds");
        lists.push((id, preds));
    }
    order_predicates(&lists, builder)
}

/// Children reached without taking a failure edge.
fn forward_children(node: &MatcherNode) -> Vec<&MatcherNode> {
    match node {
        MatcherNode::Bool(n) => n.on_success.as_deref().into_iter().collect(),
        MatcherNode::Switch(n) => n.cases.values().filter_map(|c| c.as_deref()).collect(),
        MatcherNode::Success(_) | MatcherNode::Exit => Vec::new(),
    }
}

/// All children, failure edges included.
fn all_children(node: &MatcherNode) -> Vec<&MatcherNode> {
    let mut children = forward_children(node);
    if let Some(failure) = node.on_failure() {
        children.push(failure);
    }
    children
}

// ============================================================================
// Seed Scenarios
// ============================================================================

#[test]
fn test_single_pattern_single_name_check() {
    let mut module = PatternModule::new();
    let p1 = module.push(named_op_pattern("add"));
    let (root, builder) = generate(&module);

    // The name check is the first decision, folded to a boolean, and the
    // root's failure edge exits immediately.
    let MatcherNode::Bool(bool_node) = &*root else {
        panic!("expected boolean root, got {root:?}");
    };
    assert_eq!(
        builder.question(bool_node.question).kind(),
        QuestionKind::OperationName
    );
    assert_eq!(bool_node.on_failure.as_deref(), Some(&MatcherNode::Exit));
    assert_eq!(success_patterns(&root), vec![p1]);
}

#[test]
fn test_shared_root_check_with_refinement() {
    // Both patterns match `add(_, _)`; the first additionally requires
    // operand 1 to be produced by a `mul`.
    let mut refined = Pattern::build("add-of-mul");
    let x = refined.input();
    let m = refined.input();
    let t = refined.ty();
    let (_, mul_results) = refined.operation(Some("mul"), vec![m], vec![t], vec![]);
    let (op, _) = refined.operation(Some("add"), vec![x, mul_results[0]], vec![], vec![]);
    let mut module = PatternModule::new();
    let p1 = module.push(refined.finish(op));
    let p2 = module.push(binary_add_pattern("plain-add"));

    let (root, builder) = generate(&module);
    let dump = pretty_print(&root, &builder);

    // The shared name check appears once, at the root.
    assert!(dump.starts_with("bool op_name @ root == \"add\""));
    assert_eq!(dump.matches("op_name @ root ==").count(), 1);
    // The refinement is checked behind the shared prefix.
    assert!(dump.contains("bool op_name @ root.operand[1].defining_op == \"mul\""));

    // The less specific pattern ran out of predicates first, so its success
    // fronts the refinement subtree and chains to it on failure.
    assert_eq!(success_patterns(&root), vec![p2, p1]);
}

#[test]
fn test_diverging_names_become_switch_cases() {
    let mut module = PatternModule::new();
    let p1 = module.push(named_op_pattern("add"));
    let p2 = module.push(named_op_pattern("sub"));
    let (root, builder) = generate(&module);

    let MatcherNode::Switch(switch) = &*root else {
        panic!("expected switch root, got {root:?}");
    };
    assert_eq!(
        builder.question(switch.question).kind(),
        QuestionKind::OperationName
    );
    assert_eq!(switch.cases.len(), 2);
    assert_eq!(switch.on_failure.as_deref(), Some(&MatcherNode::Exit));

    let found = success_patterns(&root);
    assert!(found.contains(&p1) && found.contains(&p2));
}

#[test]
fn test_reused_value_checked_by_equality() {
    let mut p = Pattern::build("fold-self-add");
    let v = p.input();
    let (op, _) = p.operation(Some("add"), vec![v, v], vec![], vec![]);
    let mut module = PatternModule::new();
    module.push(p.finish(op));

    let (root, builder) = generate(&module);
    let dump = pretty_print(&root, &builder);

    // Exactly one equality, anchored at the deeper occurrence and referring
    // back to the first binding.
    assert_eq!(dump.matches("equal_to").count(), 1);
    assert!(dump.contains("bool equal_to(root.operand[0]) @ root.operand[1] == true"));
}

#[test]
fn test_common_checks_hoisted_above_rare_ones() {
    // Three patterns share the name check; only one pins the result type.
    let typed = {
        let mut p = Pattern::build("add-i32");
        let t = p.concrete_type("i32");
        let (op, _) = p.operation(Some("add"), vec![], vec![t], vec![]);
        p.finish(op)
    };
    let untyped = |name: &str| {
        let mut p = Pattern::build(name);
        let t = p.ty();
        let (op, _) = p.operation(Some("add"), vec![], vec![t], vec![]);
        p.finish(op)
    };
    let mut module = PatternModule::new();
    module.push(typed);
    module.push(untyped("add-any-1"));
    module.push(untyped("add-any-2"));

    let (root, builder) = generate(&module);

    // Walk forward edges only; the name check must sit strictly closer to
    // the root than the type check.
    fn first_depth(
        node: &MatcherNode,
        kind: QuestionKind,
        builder: &PredicateBuilder,
        depth: usize,
    ) -> Option<usize> {
        if let Some(question) = node.question() {
            if builder.question(question).kind() == kind {
                return Some(depth);
            }
        }
        let mut children = forward_children(node);
        if let Some(failure) = node.on_failure() {
            children.push(failure);
        }
        children
            .into_iter()
            .filter_map(|child| first_depth(child, kind, builder, depth + 1))
            .min()
    }

    let name_depth = first_depth(&root, QuestionKind::OperationName, &builder, 0).unwrap();
    let type_depth = first_depth(&root, QuestionKind::TypeConstraint, &builder, 0).unwrap();
    assert!(name_depth < type_depth);
    assert_eq!(name_depth, 0);
}

#[test]
fn test_agreeing_patterns_leave_no_switch() {
    let mut module = PatternModule::new();
    let p1 = module.push(named_op_pattern("add"));
    let p2 = module.push(named_op_pattern("add"));
    let (root, _) = generate(&module);

    let MatcherNode::Bool(_) = &*root else {
        panic!("expected boolean root, got {root:?}");
    };
    fn no_switch(node: &MatcherNode) {
        assert!(!matches!(node, MatcherNode::Switch(_)));
        for child in all_children(node) {
            no_switch(child);
        }
    }
    no_switch(&root);
    assert_eq!(success_patterns(&root), vec![p2, p1]);
}

// ============================================================================
// Universal Invariants
// ============================================================================

/// A module mixing divergence, refinement, equalities, attributes, and a
/// user-defined constraint.
fn sample_module() -> PatternModule {
    let mut module = PatternModule::new();

    module.push(binary_add_pattern("plain-add"));

    let mut refined = Pattern::build("add-of-mul");
    let x = refined.input();
    let m = refined.input();
    let t = refined.ty();
    let (_, mul_results) = refined.operation(Some("mul"), vec![m], vec![t], vec![]);
    let (op, _) = refined.operation(Some("add"), vec![x, mul_results[0]], vec![], vec![]);
    refined.constraint("single_use", vec![mul_results[0]], vec![]);
    module.push(refined.finish(op));

    let mut same = Pattern::build("sub-self");
    let v = same.input();
    let (op, _) = same.operation(Some("sub"), vec![v, v], vec![], vec![]);
    module.push(same.finish(op));

    let mut attr = Pattern::build("cmp-eq");
    let pred = attr.literal_attribute(opal_ir::AttributeValue::string("eq"));
    let a = attr.input();
    let b = attr.input();
    let (op, _) = attr.operation(Some("cmp"), vec![a, b], vec![], vec![("predicate", pred)]);
    module.push(attr.finish(op));

    module
}

#[test]
fn test_interned_handles_are_stable() {
    let mut builder = PredicateBuilder::new();
    let root = builder.root();
    let operand = builder.operand(root, 0);
    assert_eq!(builder.root(), root);
    assert_eq!(builder.operand(root, 0), operand);
    assert_eq!(builder.operation_name("add"), builder.operation_name("add"));
    assert_eq!(builder.equal_to(operand), builder.equal_to(operand));
}

#[test]
fn test_failure_chain_from_root_terminates_at_exit() {
    let module = sample_module();
    let (root, _) = generate(&module);

    let mut node: &MatcherNode = &root;
    let mut steps = 0;
    while let Some(next) = node.on_failure() {
        node = next;
        steps += 1;
        assert!(steps <= 256, "failure chain does not terminate");
    }
    assert_eq!(node, &MatcherNode::Exit);
}

#[test]
fn test_every_pattern_succeeds_exactly_once() {
    let module = sample_module();
    let (root, _) = generate(&module);

    let mut found = success_patterns(&root);
    found.sort_by_key(|id| id.0);
    let expected: Vec<PatternId> = module.iter().map(|(id, _)| id).collect();
    assert_eq!(found, expected);
}

#[test]
fn test_generation_is_deterministic() {
    let module = sample_module();
    let (first_root, first_builder) = generate(&module);
    let (second_root, second_builder) = generate(&module);
    assert_eq!(
        pretty_print(&first_root, &first_builder),
        pretty_print(&second_root, &second_builder)
    );
}

#[test]
fn test_no_single_case_switch_survives_folding() {
    let module = sample_module();
    let (root, _) = generate(&module);

    fn check(node: &MatcherNode) {
        if let MatcherNode::Switch(switch) = node {
            assert!(
                switch.cases.len() > 1,
                "single-case switch survived folding"
            );
        }
        for child in all_children(node) {
            check(child);
        }
    }
    check(&root);
}

#[test]
fn test_tree_is_finite_and_fully_counted() {
    let module = sample_module();
    let (root, _) = generate(&module);

    let stats = TreeStats::compute(&root);
    assert_eq!(stats.success_nodes, module.len());
    assert_eq!(stats.exit_nodes, 1);
    assert_eq!(
        stats.total_nodes,
        stats.bool_nodes + stats.switch_nodes + stats.success_nodes + stats.exit_nodes
    );
    assert!(stats.max_depth < stats.total_nodes);
}

#[test]
fn test_decision_order_follows_cost_ranks() {
    let module = sample_module();
    let (root, mut builder) = generate(&module);
    let ordering = ordering_for(&module, &mut builder);

    let mut ranks: FxHashMap<(PositionId, QuestionId), usize> = FxHashMap::default();
    for (rank, &index) in ordering.sorted.iter().enumerate() {
        let predicate = &ordering.predicates[index];
        ranks.insert((predicate.position, predicate.question), rank);
    }

    // Along success and case edges, decision nodes appear in strictly
    // increasing rank order.
    fn check(
        node: &MatcherNode,
        ranks: &FxHashMap<(PositionId, QuestionId), usize>,
        last: Option<usize>,
    ) {
        let next = match (node.position(), node.question()) {
            (Some(position), Some(question)) => {
                let rank = ranks[&(position, question)];
                if let Some(last) = last {
                    assert!(rank > last, "decision order violates the cost ranking");
                }
                Some(rank)
            }
            _ => last,
        };
        match node {
            MatcherNode::Bool(n) => {
                if let Some(child) = n.on_success.as_deref() {
                    check(child, ranks, next);
                }
            }
            MatcherNode::Switch(n) => {
                for child in n.cases.values().filter_map(|c| c.as_deref()) {
                    check(child, ranks, next);
                }
            }
            MatcherNode::Success(_) | MatcherNode::Exit => {}
        }
    }
    check(&root, &ranks, None);
}

#[test]
fn test_expected_answers_route_each_pattern_to_its_success() {
    let module = sample_module();
    let (root, mut builder) = generate(&module);
    let ordering = ordering_for(&module, &mut builder);

    let mut by_key: FxHashMap<(PositionId, QuestionId), &OrderedPredicate> = FxHashMap::default();
    for predicate in &ordering.predicates {
        by_key.insert((predicate.position, predicate.question), predicate);
    }

    for (pattern, _) in module.iter() {
        let mut node: &MatcherNode = &root;
        let mut steps = 0;
        loop {
            steps += 1;
            assert!(steps <= 1024, "model walk for {pattern:?} does not terminate");
            match node {
                MatcherNode::Bool(bool_node) => {
                    let expected = by_key[&(bool_node.position, bool_node.question)]
                        .pattern_to_answer
                        .get(&pattern);
                    node = match expected {
                        Some(&answer) if answer == bool_node.answer => bool_node
                            .on_success
                            .as_deref()
                            .expect("matching branch exists"),
                        _ => bool_node
                            .on_failure
                            .as_deref()
                            .expect("failure branch exists"),
                    };
                }
                MatcherNode::Switch(switch) => {
                    let expected = by_key[&(switch.position, switch.question)]
                        .pattern_to_answer
                        .get(&pattern);
                    node = match expected {
                        Some(answer) => switch
                            .cases
                            .get(answer)
                            .and_then(|c| c.as_deref())
                            .expect("case for the expected answer exists"),
                        None => switch.on_failure.as_deref().expect("failure branch exists"),
                    };
                }
                MatcherNode::Success(success) => {
                    if success.pattern == pattern {
                        break;
                    }
                    node = success
                        .on_failure
                        .as_deref()
                        .expect("further trials remain for an unmatched pattern");
                }
                MatcherNode::Exit => panic!("model walk for {pattern:?} fell off the tree"),
            }
        }
    }
}

#[test]
fn test_unbound_constraint_argument_aborts_generation() {
    let mut p = Pattern::build("dangling");
    let stray = p.input();
    let (op, _) = p.operation(Some("add"), vec![], vec![], vec![]);
    p.constraint("uses", vec![stray], vec![]);
    let mut module = PatternModule::new();
    module.push(p.finish(op));

    let mut builder = PredicateBuilder::new();
    let err = generate_matcher_tree(&module, &mut builder).unwrap_err();
    assert!(matches!(
        err,
        opal_matcher::MatcherError::PatternAuthoring { .. }
    ));
}
