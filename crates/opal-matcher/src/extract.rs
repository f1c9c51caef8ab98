//! Predicate extraction.
//!
//! Walks a pattern's structural description from its root operation and
//! emits the flat list of positional predicates that, conjunctively,
//! characterize a successful match. The walk dispatches on the *position*
//! kind, not on the symbol's form: the position determines which questions
//! are legal there.
//!
//! A binding map from symbol to first-observed position is threaded through
//! the walk. Re-reaching a direct-value symbol (input, attribute, type) at a
//! second position emits an equality predicate instead of recursing again;
//! re-reaching an operation-produced value keeps walking, so shared
//! subtrees are re-checked at every position they appear.

use rustc_hash::FxHashMap;

use opal_ir::{Pattern, SymbolId, SymbolKind};

use crate::builder::{Predicate, PredicateBuilder};
use crate::predicate::{PositionId, PositionKind, PositionalPredicate};
use crate::{MatcherError, Result};

/// Mapping from a pattern's symbolic values to the position each was first
/// observed at. Handed to downstream consumers that need to locate bound
/// values after matching.
pub type BindingMap = FxHashMap<SymbolId, PositionId>;

/// Build the full predicate list for one pattern: the structural walk from
/// the root, followed by the user-defined constraint applications.
pub fn build_predicate_list(
    pattern: &Pattern,
    builder: &mut PredicateBuilder,
) -> Result<(Vec<PositionalPredicate>, BindingMap)> {
    let root_kind = pattern.symbol(pattern.root).ok_or_else(|| {
        MatcherError::authoring(format!(
            "pattern `{}`: root symbol is not defined",
            pattern.name
        ))
    })?;
    if !root_kind.is_operation() {
        return Err(MatcherError::authoring(format!(
            "pattern `{}`: root symbol must be an operation",
            pattern.name
        )));
    }

    let mut predicates = Vec::new();
    let mut bindings = BindingMap::default();
    let root = builder.root();
    TreeWalker {
        pattern,
        builder: &mut *builder,
        predicates: &mut predicates,
        bindings: &mut bindings,
    }
    .visit(pattern.root, root)?;

    collect_constraint_predicates(pattern, builder, &bindings, &mut predicates)?;
    Ok((predicates, bindings))
}

struct TreeWalker<'a> {
    pattern: &'a Pattern,
    builder: &'a mut PredicateBuilder,
    predicates: &'a mut Vec<PositionalPredicate>,
    bindings: &'a mut BindingMap,
}

impl<'a> TreeWalker<'a> {
    fn push(&mut self, position: PositionId, pred: Predicate) {
        self.predicates.push(PositionalPredicate {
            position,
            question: pred.question,
            answer: pred.answer,
        });
    }

    fn symbol(&self, id: SymbolId) -> Result<&'a SymbolKind> {
        self.pattern.symbol(id).ok_or_else(|| {
            MatcherError::authoring(format!(
                "pattern `{}`: reference to undefined symbol {}",
                self.pattern.name, id.0
            ))
        })
    }

    fn form_mismatch(&self, position: &str) -> MatcherError {
        MatcherError::authoring(format!(
            "pattern `{}`: {position} position bound to an incompatible symbolic form",
            self.pattern.name
        ))
    }

    fn visit(&mut self, value: SymbolId, pos: PositionId) -> Result<()> {
        let kind = self.symbol(value)?;

        if let Some(&bound) = self.bindings.get(&value) {
            if kind.is_direct_value() {
                // Both paths must resolve to the same value. The deeper
                // position anchors the check; at equal depth the later
                // observation anchors and refers back to the first binding.
                let (anchor, referent) = if self.builder.depth(pos) >= self.builder.depth(bound) {
                    (pos, bound)
                } else {
                    (bound, pos)
                };
                let pred = self.builder.equal_to(referent);
                self.push(anchor, pred);
                return Ok(());
            }
        } else {
            self.bindings.insert(value, pos);
        }

        match self.builder.position(pos).kind() {
            PositionKind::Attribute => {
                let SymbolKind::Attribute { ty, value: literal } = kind else {
                    return Err(self.form_mismatch("attribute"));
                };
                let not_null = self.builder.is_not_null();
                self.push(pos, not_null);

                if let Some(ty) = ty {
                    let ty_pos = self.builder.type_of(pos);
                    self.visit(*ty, ty_pos)?;
                } else if let Some(literal) = literal {
                    let pred = self.builder.attribute_constraint(literal);
                    self.push(pos, pred);
                }
            }
            PositionKind::Operand => {
                let not_null = self.builder.is_not_null();
                self.push(pos, not_null);

                match kind {
                    SymbolKind::Input { ty: Some(ty) } => {
                        let ty_pos = self.builder.type_of(pos);
                        self.visit(*ty, ty_pos)?;
                    }
                    SymbolKind::Input { ty: None } => {}
                    SymbolKind::Result { op, .. } => {
                        let parent_pos = self.builder.parent(pos);
                        self.visit(*op, parent_pos)?;
                    }
                    _ => return Err(self.form_mismatch("operand")),
                }
            }
            PositionKind::Operation => {
                let SymbolKind::Operation(op) = kind else {
                    return Err(self.form_mismatch("operation"));
                };
                // The root operation is handed to the matcher non-null.
                if !self.builder.position(pos).is_root() {
                    let not_null = self.builder.is_not_null();
                    self.push(pos, not_null);
                }
                if let Some(name) = &op.name {
                    let pred = self.builder.operation_name(name);
                    self.push(pos, pred);
                }
                let operand_count = self.builder.operand_count(op.operands.len());
                self.push(pos, operand_count);
                let result_count = self.builder.result_count(op.results.len());
                self.push(pos, result_count);

                for (name, attr) in &op.attributes {
                    let attr_pos = self.builder.attribute(pos, name);
                    self.visit(*attr, attr_pos)?;
                }
                for (index, operand) in op.operands.iter().enumerate() {
                    let operand_pos = self.builder.operand(pos, index);
                    self.visit(*operand, operand_pos)?;
                }
                for (index, result) in op.results.iter().enumerate() {
                    let result_pos = self.builder.result(pos, index);
                    self.visit(*result, result_pos)?;
                }
            }
            PositionKind::Result => {
                let SymbolKind::Result { ty, .. } = kind else {
                    return Err(self.form_mismatch("result"));
                };
                let not_null = self.builder.is_not_null();
                self.push(pos, not_null);

                let ty_pos = self.builder.type_of(pos);
                self.visit(*ty, ty_pos)?;
            }
            PositionKind::Type => {
                let SymbolKind::Type { value } = kind else {
                    return Err(self.form_mismatch("type"));
                };
                if let Some(ty) = value {
                    let pred = self.builder.type_constraint(ty);
                    self.push(pos, pred);
                }
            }
        }
        Ok(())
    }
}

/// Append one predicate per user-defined constraint, anchored at the deepest
/// argument position so the constraint runs only once all of its arguments
/// have been matched. Ties break toward the first occurrence in the
/// argument list.
fn collect_constraint_predicates(
    pattern: &Pattern,
    builder: &mut PredicateBuilder,
    bindings: &BindingMap,
    predicates: &mut Vec<PositionalPredicate>,
) -> Result<()> {
    for app in &pattern.constraints {
        let mut positions = Vec::with_capacity(app.args.len());
        for &arg in &app.args {
            let pos = bindings.get(&arg).copied().ok_or_else(|| {
                MatcherError::authoring(format!(
                    "pattern `{}`: constraint `{}` applies to a value never reached by the structural walk",
                    pattern.name, app.name
                ))
            })?;
            positions.push(pos);
        }
        let Some(&first) = positions.first() else {
            return Err(MatcherError::authoring(format!(
                "pattern `{}`: constraint `{}` has no arguments",
                pattern.name, app.name
            )));
        };
        let mut anchor = first;
        for &pos in &positions[1..] {
            if builder.depth(pos) > builder.depth(anchor) {
                anchor = pos;
            }
        }
        let pred = builder.constraint(&app.name, positions, app.params.clone());
        predicates.push(PositionalPredicate {
            position: anchor,
            question: pred.question,
            answer: pred.answer,
        });
    }
    Ok(())
}
