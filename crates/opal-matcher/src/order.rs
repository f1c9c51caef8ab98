//! Cross-pattern predicate deduplication and cost ordering.
//!
//! Every predicate is uniqued on its `(position, question)` pair; the
//! answers each pattern expects are recorded per unique predicate. A
//! two-tier frequency score then drives a global total order:
//!
//! 1. `primary` — how many pattern references a predicate has. Common
//!    predicates are hoisted toward the root so their cost is shared.
//! 2. `secondary` — the sum, over every pattern containing the predicate,
//!    of that pattern's squared primary total. Favors predicates embedded
//!    in patterns that are themselves heavily shared.
//!
//! Remaining ties fall back to position depth, then the fixed position and
//! question kind orders. The sort is stable, and the dedup table is
//! insertion-ordered, so the result is deterministic for a fixed input.

use std::cmp::Reverse;

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};

use opal_ir::PatternId;

use crate::builder::PredicateBuilder;
use crate::predicate::{AnswerId, PositionId, PositionalPredicate, QuestionId};

/// The deduplicated, cost-scored view of a predicate across all patterns.
#[derive(Debug, Clone)]
pub struct OrderedPredicate {
    pub position: PositionId,
    pub question: QuestionId,
    /// Number of pattern references to this predicate.
    pub primary: u32,
    /// Sum of the squared primary totals of every containing pattern.
    pub secondary: u32,
    /// The answer each referencing pattern expects. Distinct answers become
    /// distinct switch cases at the same decision node.
    pub pattern_to_answer: FxHashMap<PatternId, AnswerId>,
}

/// The unique predicates referenced by one pattern, as indices into
/// [`PredicateOrdering::predicates`].
#[derive(Debug, Clone)]
pub struct OrderedPredicateList {
    pub pattern: PatternId,
    pub predicates: FxHashSet<usize>,
}

/// Output of the ordering stage: the deduped predicates, the global visit
/// order over them, and each pattern's membership set.
#[derive(Debug)]
pub struct PredicateOrdering {
    /// Unique predicates in first-insertion order.
    pub predicates: Vec<OrderedPredicate>,
    /// Indices into `predicates`, sorted by the cost model.
    pub sorted: Vec<usize>,
    /// One membership list per input pattern, in input order.
    pub lists: Vec<OrderedPredicateList>,
}

/// Dedup, score, and order the predicate lists of all patterns.
pub fn order_predicates(
    patterns: &[(PatternId, Vec<PositionalPredicate>)],
    builder: &PredicateBuilder,
) -> PredicateOrdering {
    // Unique on (position, question), recording each pattern's expected
    // answer. The first answer a pattern records for a predicate wins.
    let mut uniqued: IndexMap<(PositionId, QuestionId), OrderedPredicate> = IndexMap::new();
    for (pattern, preds) in patterns {
        for pred in preds {
            let entry = uniqued
                .entry((pred.position, pred.question))
                .or_insert_with(|| OrderedPredicate {
                    position: pred.position,
                    question: pred.question,
                    primary: 0,
                    secondary: 0,
                    pattern_to_answer: FxHashMap::default(),
                });
            entry.pattern_to_answer.entry(*pattern).or_insert(pred.answer);
        }
    }

    // Per-pattern membership sets; primary counts every reference.
    let mut lists = Vec::with_capacity(patterns.len());
    for (pattern, preds) in patterns {
        let mut members = FxHashSet::default();
        for pred in preds {
            if let Some(index) = uniqued.get_index_of(&(pred.position, pred.question)) {
                if let Some((_, entry)) = uniqued.get_index_mut(index) {
                    entry.primary += 1;
                }
                members.insert(index);
            }
        }
        lists.push(OrderedPredicateList {
            pattern: *pattern,
            predicates: members,
        });
    }

    // Fold each pattern's squared primary total into its members' secondary
    // sums, emphasizing sharing within a pattern over sharing across them.
    let mut predicates: Vec<OrderedPredicate> = uniqued.into_values().collect();
    for list in &lists {
        let total: u32 = list
            .predicates
            .iter()
            .map(|&i| predicates[i].primary * predicates[i].primary)
            .sum();
        for &i in &list.predicates {
            predicates[i].secondary += total;
        }
    }

    // Stable sort; insertion order breaks remaining ties.
    let mut sorted: Vec<usize> = (0..predicates.len()).collect();
    sorted.sort_by_key(|&i| {
        let p = &predicates[i];
        (
            Reverse(p.primary),
            Reverse(p.secondary),
            builder.depth(p.position),
            builder.position(p.position).kind(),
            builder.question(p.question).kind(),
        )
    });

    PredicateOrdering {
        predicates,
        sorted,
        lists,
    }
}
