//! Matcher-tree generation for Opal rewrite patterns.
//!
//! Lowers the declarative patterns of an [`opal_ir::PatternModule`] into a
//! single deterministic decision tree that, interpreted against a candidate
//! IR operation, reports which (if any) pattern matches. The cost of checks
//! shared between patterns is amortized by hoisting common predicates
//! toward the root and collapsing single-case dispatch into boolean tests.
//!
//! # Architecture
//!
//! ```text
//! PatternModule → [extract] → positional predicates per pattern
//!               → [order]   → deduplicated, cost-sorted predicates
//!               → [tree]    → propagation, folding, exit insertion
//!               → MatcherNode root (consumed by a code emitter)
//! ```
//!
//! The pass is synchronous and all-or-nothing over a module: one malformed
//! pattern aborts generation. All interned handles produced along the way
//! stay owned by the [`PredicateBuilder`], which must outlive the tree.
//!
//! # Example
//!
//! ```
//! use opal_ir::{Pattern, PatternModule};
//! use opal_matcher::{generate_matcher_tree, PredicateBuilder};
//!
//! let mut p = Pattern::build("erase-noop");
//! let (op, _) = p.operation(Some("noop"), vec![], vec![], vec![]);
//! let mut module = PatternModule::new();
//! module.push(p.finish(op));
//!
//! let mut builder = PredicateBuilder::new();
//! let root = generate_matcher_tree(&module, &mut builder)?;
//! assert_eq!(opal_matcher::success_patterns(&root).len(), 1);
//! # Ok::<(), opal_matcher::MatcherError>(())
//! ```

use thiserror::Error;

pub mod builder;
pub mod extract;
pub mod order;
pub mod predicate;
pub mod pretty;
pub mod tree;

// Re-export main types
pub use builder::{Predicate, PredicateBuilder};
pub use extract::{build_predicate_list, BindingMap};
pub use order::{order_predicates, OrderedPredicate, OrderedPredicateList, PredicateOrdering};
pub use predicate::{
    AnswerData, AnswerId, PositionData, PositionId, PositionKind, PositionalPredicate,
    QuestionData, QuestionId, QuestionKind,
};
pub use pretty::{position_path, pretty_print, success_patterns, TreeStats};
pub use tree::{
    generate_matcher_tree, BoolNode, MatcherNode, Slot, SuccessNode, SwitchNode,
};

/// Errors raised by matcher generation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatcherError {
    /// The pattern itself is malformed: a constraint argument was never
    /// bound by the structural walk, or a symbolic form sits at a position
    /// it is not legal for.
    #[error("invalid pattern: {message}")]
    PatternAuthoring { message: String },

    /// An invariant of the pass was violated. These are bugs in the
    /// matcher generator, not user errors.
    #[error("internal matcher error: {message}")]
    Internal { message: String },
}

impl MatcherError {
    pub fn authoring(message: impl Into<String>) -> Self {
        MatcherError::PatternAuthoring {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        MatcherError::Internal {
            message: message.into(),
        }
    }
}

/// Result type for matcher generation.
pub type Result<T> = std::result::Result<T, MatcherError>;
