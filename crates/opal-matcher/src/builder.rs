//! Interning factory for positions, questions, and answers.
//!
//! All downstream comparisons use the interned handles, so building the same
//! position or qualifier twice hands back the same id. The tables are owned
//! by the builder and live exactly as long as one matcher-generation run
//! (the generated tree borrows nothing, but its handles are only meaningful
//! against the builder that produced them).

use indexmap::IndexSet;
use smol_str::SmolStr;

use opal_ir::{AttributeValue, TypeValue};

use crate::predicate::{
    AnswerData, AnswerId, PositionData, PositionId, QuestionData, QuestionId,
};

/// An interned question paired with the answer a pattern expects for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Predicate {
    pub question: QuestionId,
    pub answer: AnswerId,
}

/// Hash-consing store for the predicate data model.
///
/// Handles are indices into insertion-ordered tables, so identical arguments
/// always return identical handles and iteration order is deterministic.
#[derive(Debug, Default)]
pub struct PredicateBuilder {
    positions: IndexSet<PositionData>,
    /// Depth of each interned position, indexed by `PositionId`.
    depths: Vec<u32>,
    questions: IndexSet<QuestionData>,
    answers: IndexSet<AnswerData>,
}

impl PredicateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Positions
    // ------------------------------------------------------------------

    fn intern_position(&mut self, data: PositionData, depth: u32) -> PositionId {
        let (index, inserted) = self.positions.insert_full(data);
        if inserted {
            self.depths.push(depth);
        }
        PositionId(index as u32)
    }

    /// The match root.
    pub fn root(&mut self) -> PositionId {
        self.intern_position(PositionData::Operation { operand: None }, 0)
    }

    /// Operand `index` of the operation at `op`.
    pub fn operand(&mut self, op: PositionId, index: usize) -> PositionId {
        let depth = self.depth(op) + 1;
        self.intern_position(PositionData::Operand { op, index }, depth)
    }

    /// Result `index` of the operation at `op`.
    pub fn result(&mut self, op: PositionId, index: usize) -> PositionId {
        let depth = self.depth(op) + 1;
        self.intern_position(PositionData::Result { op, index }, depth)
    }

    /// The attribute named `name` of the operation at `op`.
    pub fn attribute(&mut self, op: PositionId, name: &str) -> PositionId {
        let depth = self.depth(op) + 1;
        self.intern_position(
            PositionData::Attribute {
                op,
                name: SmolStr::new(name),
            },
            depth,
        )
    }

    /// The type of the value at `parent`.
    pub fn type_of(&mut self, parent: PositionId) -> PositionId {
        let depth = self.depth(parent) + 1;
        self.intern_position(PositionData::Type { parent }, depth)
    }

    /// The operation defining the value at the operand position `operand`.
    pub fn parent(&mut self, operand: PositionId) -> PositionId {
        let depth = self.depth(operand) + 1;
        self.intern_position(
            PositionData::Operation {
                operand: Some(operand),
            },
            depth,
        )
    }

    pub fn position(&self, id: PositionId) -> &PositionData {
        &self.positions[id.0 as usize]
    }

    /// Index-path length of the position, counted from the root.
    pub fn depth(&self, id: PositionId) -> u32 {
        self.depths[id.0 as usize]
    }

    // ------------------------------------------------------------------
    // Qualifiers
    // ------------------------------------------------------------------

    fn intern_question(&mut self, data: QuestionData) -> QuestionId {
        QuestionId(self.questions.insert_full(data).0 as u32)
    }

    fn intern_answer(&mut self, data: AnswerData) -> AnswerId {
        AnswerId(self.answers.insert_full(data).0 as u32)
    }

    /// The value at the position must be present.
    pub fn is_not_null(&mut self) -> Predicate {
        Predicate {
            question: self.intern_question(QuestionData::IsNotNull),
            answer: self.intern_answer(AnswerData::True),
        }
    }

    /// The operation must have the given name.
    pub fn operation_name(&mut self, name: &str) -> Predicate {
        Predicate {
            question: self.intern_question(QuestionData::OperationName),
            answer: self.intern_answer(AnswerData::OperationName(SmolStr::new(name))),
        }
    }

    /// The operation must have exactly `count` operands.
    pub fn operand_count(&mut self, count: usize) -> Predicate {
        Predicate {
            question: self.intern_question(QuestionData::OperandCount),
            answer: self.intern_answer(AnswerData::Count(count)),
        }
    }

    /// The operation must have exactly `count` results.
    pub fn result_count(&mut self, count: usize) -> Predicate {
        Predicate {
            question: self.intern_question(QuestionData::ResultCount),
            answer: self.intern_answer(AnswerData::Count(count)),
        }
    }

    /// The attribute must equal the given constant.
    pub fn attribute_constraint(&mut self, value: &AttributeValue) -> Predicate {
        Predicate {
            question: self.intern_question(QuestionData::AttributeConstraint),
            answer: self.intern_answer(AnswerData::Attribute(value.clone())),
        }
    }

    /// The type must be the given concrete type.
    pub fn type_constraint(&mut self, ty: &TypeValue) -> Predicate {
        Predicate {
            question: self.intern_question(QuestionData::TypeConstraint),
            answer: self.intern_answer(AnswerData::Type(ty.clone())),
        }
    }

    /// The value here must be the same value as the one at `other`.
    pub fn equal_to(&mut self, other: PositionId) -> Predicate {
        Predicate {
            question: self.intern_question(QuestionData::EqualTo { other }),
            answer: self.intern_answer(AnswerData::True),
        }
    }

    /// The named external constraint must hold over the argument positions.
    pub fn constraint(
        &mut self,
        name: &str,
        args: Vec<PositionId>,
        params: Vec<AttributeValue>,
    ) -> Predicate {
        Predicate {
            question: self.intern_question(QuestionData::Constraint {
                name: SmolStr::new(name),
                args,
                params,
            }),
            answer: self.intern_answer(AnswerData::True),
        }
    }

    pub fn question(&self, id: QuestionId) -> &QuestionData {
        &self.questions[id.0 as usize]
    }

    pub fn answer(&self, id: AnswerId) -> &AnswerData {
        &self.answers[id.0 as usize]
    }
}
