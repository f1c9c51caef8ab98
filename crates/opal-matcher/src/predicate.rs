//! Positions, questions, and answers.
//!
//! A *position* locates a point in a hypothetical candidate IR subtree
//! relative to the match root. A *question* is a predicate asked at a
//! position; an *answer* is the expected outcome. All three are interned by
//! [`PredicateBuilder`](crate::PredicateBuilder), so handle equality is
//! structural equality and handles stay `Copy`.

use smol_str::SmolStr;

use opal_ir::{AttributeValue, TypeValue};

// ============================================================================
// Interned Handles
// ============================================================================

/// Interned handle to a [`PositionData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PositionId(pub u32);

/// Interned handle to a [`QuestionData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuestionId(pub u32);

/// Interned handle to an [`AnswerData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnswerId(pub u32);

// ============================================================================
// Positions
// ============================================================================

/// Structural description of a position.
///
/// Positions form a tree rooted at `Operation { operand: None }` (the match
/// root). Every non-root position names its parent, so two positions are
/// equal iff their whole root-relative paths are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PositionData {
    /// An operation: the match root when `operand` is `None`, otherwise the
    /// operation defining the value at the given operand position.
    Operation { operand: Option<PositionId> },
    /// Operand `index` of the operation at `op`.
    Operand { op: PositionId, index: usize },
    /// Result `index` of the operation at `op`.
    Result { op: PositionId, index: usize },
    /// The attribute named `name` of the operation at `op`.
    Attribute { op: PositionId, name: SmolStr },
    /// The type of the value at `parent` (an operand, result, or attribute).
    Type { parent: PositionId },
}

impl PositionData {
    pub fn kind(&self) -> PositionKind {
        match self {
            PositionData::Operation { .. } => PositionKind::Operation,
            PositionData::Operand { .. } => PositionKind::Operand,
            PositionData::Result { .. } => PositionKind::Result,
            PositionData::Attribute { .. } => PositionKind::Attribute,
            PositionData::Type { .. } => PositionKind::Type,
        }
    }

    /// The position this one hangs off, if any.
    pub fn parent(&self) -> Option<PositionId> {
        match self {
            PositionData::Operation { operand } => *operand,
            PositionData::Operand { op, .. } | PositionData::Result { op, .. } => Some(*op),
            PositionData::Attribute { op, .. } => Some(*op),
            PositionData::Type { parent } => Some(*parent),
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, PositionData::Operation { operand: None })
    }
}

/// Position kinds in their fixed cost-model order: structural dispatch on an
/// operation sorts before checks on its operands, results, attributes, and
/// finally types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PositionKind {
    Operation,
    Operand,
    Result,
    Attribute,
    Type,
}

// ============================================================================
// Questions and Answers
// ============================================================================

/// What is being asked at a position.
///
/// Questions are the dispatch key of a decision node, so value payloads live
/// on the answer side: two patterns expecting different operation names at
/// the same position share one `OperationName` question and diverge on its
/// answers. `EqualTo` and `Constraint` are the exceptions, since their
/// payloads identify *which* check runs rather than its expected outcome.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QuestionData {
    /// Is the value at this position present?
    IsNotNull,
    /// What is the operation's name?
    OperationName,
    /// How many operands does the operation have?
    OperandCount,
    /// How many results does the operation have?
    ResultCount,
    /// Does the attribute equal a literal constant?
    AttributeConstraint,
    /// Is the type a given concrete type?
    TypeConstraint,
    /// Is the value here the same value as the one at `other`?
    EqualTo { other: PositionId },
    /// Does the named external constraint hold over `args`?
    Constraint {
        name: SmolStr,
        args: Vec<PositionId>,
        params: Vec<AttributeValue>,
    },
}

impl QuestionData {
    pub fn kind(&self) -> QuestionKind {
        match self {
            QuestionData::IsNotNull => QuestionKind::IsNotNull,
            QuestionData::OperationName => QuestionKind::OperationName,
            QuestionData::OperandCount => QuestionKind::OperandCount,
            QuestionData::ResultCount => QuestionKind::ResultCount,
            QuestionData::AttributeConstraint => QuestionKind::AttributeConstraint,
            QuestionData::TypeConstraint => QuestionKind::TypeConstraint,
            QuestionData::EqualTo { .. } => QuestionKind::EqualTo,
            QuestionData::Constraint { .. } => QuestionKind::Constraint,
        }
    }
}

/// Question kinds in their fixed cost-model order, the final tie-break of
/// the predicate sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QuestionKind {
    IsNotNull,
    OperationName,
    OperandCount,
    ResultCount,
    AttributeConstraint,
    TypeConstraint,
    EqualTo,
    Constraint,
}

/// The expected outcome of a question. Boolean-natured questions pair with
/// `True`; value-bearing questions carry the expected value here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnswerData {
    True,
    OperationName(SmolStr),
    Count(usize),
    Attribute(AttributeValue),
    Type(TypeValue),
}

// ============================================================================
// Positional Predicates
// ============================================================================

/// A single check a pattern requires: at `position`, asking `question` must
/// yield `answer`. A pattern matches iff all of its positional predicates
/// hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionalPredicate {
    pub position: PositionId,
    pub question: QuestionId,
    pub answer: AnswerId,
}
