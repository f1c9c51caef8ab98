//! Matcher tree construction.
//!
//! Patterns are "pushed" through the emerging tree in globally sorted
//! predicate order. A pattern traverses as far as possible along decision
//! nodes it shares with earlier patterns, then diverges into a failure
//! branch or grows fresh nodes at the frontier. Two post-passes tighten the
//! shape: single-case switches collapse into boolean tests, and the failure
//! chain from the root is capped with an exit node.

use indexmap::IndexMap;

use opal_ir::{PatternId, PatternModule};

use crate::builder::PredicateBuilder;
use crate::extract::build_predicate_list;
use crate::order::{order_predicates, OrderedPredicate, OrderedPredicateList};
use crate::predicate::{AnswerId, PositionId, QuestionId};
use crate::{MatcherError, Result};

/// A child edge of a matcher node. Empty slots are holes still under
/// construction; after generation the failure chain from the root ends in
/// [`MatcherNode::Exit`].
pub type Slot = Option<Box<MatcherNode>>;

// ============================================================================
// Nodes
// ============================================================================

/// A node of the generated matcher decision tree.
#[derive(Debug, Clone, PartialEq)]
pub enum MatcherNode {
    /// A boolean test: one expected answer, a success and a failure branch.
    Bool(BoolNode),
    /// A multi-way dispatch on the answers to one question.
    Switch(SwitchNode),
    /// A pattern has matched; the failure branch chains to further trials.
    Success(SuccessNode),
    /// No further patterns to try.
    Exit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoolNode {
    pub position: PositionId,
    pub question: QuestionId,
    pub answer: AnswerId,
    pub on_success: Slot,
    pub on_failure: Slot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchNode {
    pub position: PositionId,
    pub question: QuestionId,
    /// One child per distinct expected answer, in first-insertion order.
    pub cases: IndexMap<AnswerId, Slot>,
    pub on_failure: Slot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuccessNode {
    pub pattern: PatternId,
    pub on_failure: Slot,
}

impl MatcherNode {
    /// The position this node tests, if it is a decision node.
    pub fn position(&self) -> Option<PositionId> {
        match self {
            MatcherNode::Bool(n) => Some(n.position),
            MatcherNode::Switch(n) => Some(n.position),
            MatcherNode::Success(_) | MatcherNode::Exit => None,
        }
    }

    /// The question this node asks, if it is a decision node.
    pub fn question(&self) -> Option<QuestionId> {
        match self {
            MatcherNode::Bool(n) => Some(n.question),
            MatcherNode::Switch(n) => Some(n.question),
            MatcherNode::Success(_) | MatcherNode::Exit => None,
        }
    }

    pub fn on_failure(&self) -> Option<&MatcherNode> {
        match self {
            MatcherNode::Bool(n) => n.on_failure.as_deref(),
            MatcherNode::Switch(n) => n.on_failure.as_deref(),
            MatcherNode::Success(n) => n.on_failure.as_deref(),
            MatcherNode::Exit => None,
        }
    }

    fn failure_slot_mut(&mut self) -> Option<&mut Slot> {
        match self {
            MatcherNode::Bool(n) => Some(&mut n.on_failure),
            MatcherNode::Switch(n) => Some(&mut n.on_failure),
            MatcherNode::Success(n) => Some(&mut n.on_failure),
            MatcherNode::Exit => None,
        }
    }
}

// ============================================================================
// Generation
// ============================================================================

/// Lower every pattern of the module into one merged matcher tree and return
/// its root. The builder must be the one the tree's handles were interned
/// with; it stays alive alongside the tree.
pub fn generate_matcher_tree(
    module: &PatternModule,
    builder: &mut PredicateBuilder,
) -> Result<Box<MatcherNode>> {
    let mut pattern_predicates = Vec::with_capacity(module.len());
    for (id, pattern) in module.iter() {
        let (predicates, _bindings) = build_predicate_list(pattern, builder)?;
        pattern_predicates.push((id, predicates));
    }

    let ordering = order_predicates(&pattern_predicates, builder);

    let mut root: Slot = None;
    for list in &ordering.lists {
        propagate_pattern(&mut root, list, &ordering.predicates, &ordering.sorted, 0)?;
    }

    fold_switch_to_bool(&mut root);
    insert_exit(&mut root)?;
    root.ok_or_else(|| MatcherError::internal("exit insertion left an empty tree"))
}

/// The node at the slot tests exactly this predicate's position/question.
fn is_same_predicate(node: &MatcherNode, predicate: &OrderedPredicate) -> bool {
    node.position() == Some(predicate.position) && node.question() == Some(predicate.question)
}

/// Child slot of a switch node for the answer the pattern expects.
fn switch_child_mut<'t>(
    node: &'t mut MatcherNode,
    predicate: &OrderedPredicate,
    pattern: PatternId,
) -> Result<&'t mut Slot> {
    let MatcherNode::Switch(switch) = node else {
        return Err(MatcherError::internal(
            "propagation reached a non-switch decision node",
        ));
    };
    let answer = predicate
        .pattern_to_answer
        .get(&pattern)
        .copied()
        .ok_or_else(|| {
            MatcherError::internal("pattern has no recorded answer for a predicate it references")
        })?;
    Ok(switch.cases.entry(answer).or_insert(None))
}

/// Drive one pattern through the tree along the sorted predicate order.
fn propagate_pattern(
    slot: &mut Slot,
    list: &OrderedPredicateList,
    predicates: &[OrderedPredicate],
    sorted: &[usize],
    current: usize,
) -> Result<()> {
    // Out of predicates: this pattern has matched. Its success node goes in
    // front of whatever unrelated subtree already occupied the slot.
    if current == sorted.len() {
        let displaced = slot.take();
        *slot = Some(Box::new(MatcherNode::Success(SuccessNode {
            pattern: list.pattern,
            on_failure: displaced,
        })));
        return Ok(());
    }

    let index = sorted[current];
    if !list.predicates.contains(&index) {
        return propagate_pattern(slot, list, predicates, sorted, current + 1);
    }
    let predicate = &predicates[index];

    match slot {
        None => {
            let node = slot.insert(Box::new(MatcherNode::Switch(SwitchNode {
                position: predicate.position,
                question: predicate.question,
                cases: IndexMap::new(),
                on_failure: None,
            })));
            let child = switch_child_mut(node, predicate, list.pattern)?;
            propagate_pattern(child, list, predicates, sorted, current + 1)
        }
        Some(node) if is_same_predicate(node, predicate) => {
            let child = switch_child_mut(node, predicate, list.pattern)?;
            propagate_pattern(child, list, predicates, sorted, current + 1)
        }
        Some(node) => {
            // The shared prefix has diverged; continue below the existing
            // subtree with the same predicate.
            let failure = node.failure_slot_mut().ok_or_else(|| {
                MatcherError::internal("propagation descended into an exit node")
            })?;
            propagate_pattern(failure, list, predicates, sorted, current)
        }
    }
}

// ============================================================================
// Post-passes
// ============================================================================

/// Collapse every single-case switch under `slot` into a boolean test.
fn fold_switch_to_bool(slot: &mut Slot) {
    let Some(node) = slot else { return };

    match &mut **node {
        MatcherNode::Switch(switch) => {
            for (_, child) in switch.cases.iter_mut() {
                fold_switch_to_bool(child);
            }
        }
        MatcherNode::Bool(node) => fold_switch_to_bool(&mut node.on_success),
        MatcherNode::Success(_) | MatcherNode::Exit => {}
    }

    let single_case = matches!(&**node, MatcherNode::Switch(s) if s.cases.len() == 1);
    if single_case {
        if let Some(boxed) = slot.take() {
            if let MatcherNode::Switch(mut switch) = *boxed {
                if let Some((answer, on_success)) = switch.cases.pop() {
                    *slot = Some(Box::new(MatcherNode::Bool(BoolNode {
                        position: switch.position,
                        question: switch.question,
                        answer,
                        on_success,
                        on_failure: switch.on_failure,
                    })));
                }
            }
        }
    }

    if let Some(node) = slot {
        if let Some(failure) = node.failure_slot_mut() {
            fold_switch_to_bool(failure);
        }
    }
}

/// Cap the failure chain from the root with an exit node.
fn insert_exit(root: &mut Slot) -> Result<()> {
    let mut slot = root;
    loop {
        match slot {
            Some(node) => {
                slot = node.failure_slot_mut().ok_or_else(|| {
                    MatcherError::internal("exit node already present before exit insertion")
                })?;
            }
            None => break,
        }
    }
    *slot = Some(Box::new(MatcherNode::Exit));
    Ok(())
}
