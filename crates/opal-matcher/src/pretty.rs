//! Pretty printing for matcher trees.
//!
//! Renders a generated tree with positions spelled as root-relative paths
//! (`root`, `root.operand[0]`, `root.operand[0].defining_op`, ...), useful
//! for debugging and for structural assertions in tests.

use opal_ir::PatternId;

use crate::builder::PredicateBuilder;
use crate::predicate::{AnswerData, PositionId, QuestionData};
use crate::tree::MatcherNode;

/// Pretty print a matcher tree against the builder that interned its
/// handles.
pub fn pretty_print(root: &MatcherNode, builder: &PredicateBuilder) -> String {
    let mut printer = PrettyPrinter {
        out: String::new(),
        builder,
        indent: 0,
    };
    printer.print_node(root);
    printer.out
}

/// Root-relative spelling of a position.
pub fn position_path(builder: &PredicateBuilder, id: PositionId) -> String {
    use crate::predicate::PositionData::*;
    match builder.position(id) {
        Operation { operand: None } => "root".to_string(),
        Operation { operand: Some(operand) } => {
            format!("{}.defining_op", position_path(builder, *operand))
        }
        Operand { op, index } => format!("{}.operand[{index}]", position_path(builder, *op)),
        Result { op, index } => format!("{}.result[{index}]", position_path(builder, *op)),
        Attribute { op, name } => format!("{}.attr[{name:?}]", position_path(builder, *op)),
        Type { parent } => format!("{}.type", position_path(builder, *parent)),
    }
}

struct PrettyPrinter<'a> {
    out: String,
    builder: &'a PredicateBuilder,
    indent: usize,
}

impl<'a> PrettyPrinter<'a> {
    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push(' ');
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn indented(&mut self, f: impl FnOnce(&mut Self)) {
        self.indent += 2;
        f(self);
        self.indent -= 2;
    }

    fn question(&self, id: crate::predicate::QuestionId) -> String {
        match self.builder.question(id) {
            QuestionData::IsNotNull => "is_not_null".to_string(),
            QuestionData::OperationName => "op_name".to_string(),
            QuestionData::OperandCount => "operand_count".to_string(),
            QuestionData::ResultCount => "result_count".to_string(),
            QuestionData::AttributeConstraint => "attr_constraint".to_string(),
            QuestionData::TypeConstraint => "type_constraint".to_string(),
            QuestionData::EqualTo { other } => {
                format!("equal_to({})", position_path(self.builder, *other))
            }
            QuestionData::Constraint { name, args, .. } => {
                let args: Vec<String> = args
                    .iter()
                    .map(|&arg| position_path(self.builder, arg))
                    .collect();
                format!("constraint {name:?}({})", args.join(", "))
            }
        }
    }

    fn answer(&self, id: crate::predicate::AnswerId) -> String {
        match self.builder.answer(id) {
            AnswerData::True => "true".to_string(),
            AnswerData::OperationName(name) => format!("{name:?}"),
            AnswerData::Count(count) => count.to_string(),
            AnswerData::Attribute(value) => value.to_string(),
            AnswerData::Type(ty) => ty.to_string(),
        }
    }

    fn print_slot(&mut self, label: &str, slot: Option<&MatcherNode>) {
        if let Some(node) = slot {
            self.line(label);
            self.indented(|p| p.print_node(node));
        }
    }

    fn print_node(&mut self, node: &MatcherNode) {
        match node {
            MatcherNode::Bool(bool_node) => {
                self.line(&format!(
                    "bool {} @ {} == {}",
                    self.question(bool_node.question),
                    position_path(self.builder, bool_node.position),
                    self.answer(bool_node.answer),
                ));
                self.indented(|p| {
                    p.print_slot("then:", bool_node.on_success.as_deref());
                    p.print_slot("else:", bool_node.on_failure.as_deref());
                });
            }
            MatcherNode::Switch(switch) => {
                self.line(&format!(
                    "switch {} @ {}",
                    self.question(switch.question),
                    position_path(self.builder, switch.position),
                ));
                self.indented(|p| {
                    for (answer, child) in &switch.cases {
                        p.print_slot(&format!("case {}:", p.answer(*answer)), child.as_deref());
                    }
                    p.print_slot("default:", switch.on_failure.as_deref());
                });
            }
            MatcherNode::Success(success) => {
                self.line(&format!("success pattern {}", success.pattern));
                self.indented(|p| p.print_slot("else:", success.on_failure.as_deref()));
            }
            MatcherNode::Exit => self.line("exit"),
        }
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Shape statistics for a generated matcher tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub bool_nodes: usize,
    pub switch_nodes: usize,
    pub success_nodes: usize,
    pub exit_nodes: usize,
    pub max_depth: usize,
}

impl TreeStats {
    /// Compute statistics by walking every edge of the tree once.
    pub fn compute(root: &MatcherNode) -> Self {
        let mut stats = Self::default();
        stats.visit(root, 0);
        stats
    }

    fn visit(&mut self, node: &MatcherNode, depth: usize) {
        self.total_nodes += 1;
        self.max_depth = self.max_depth.max(depth);
        match node {
            MatcherNode::Bool(bool_node) => {
                self.bool_nodes += 1;
                if let Some(child) = bool_node.on_success.as_deref() {
                    self.visit(child, depth + 1);
                }
                if let Some(child) = bool_node.on_failure.as_deref() {
                    self.visit(child, depth + 1);
                }
            }
            MatcherNode::Switch(switch) => {
                self.switch_nodes += 1;
                for (_, child) in &switch.cases {
                    if let Some(child) = child.as_deref() {
                        self.visit(child, depth + 1);
                    }
                }
                if let Some(child) = switch.on_failure.as_deref() {
                    self.visit(child, depth + 1);
                }
            }
            MatcherNode::Success(success) => {
                self.success_nodes += 1;
                if let Some(child) = success.on_failure.as_deref() {
                    self.visit(child, depth + 1);
                }
            }
            MatcherNode::Exit => self.exit_nodes += 1,
        }
    }
}

/// Pattern identities of every success node, in traversal order (success
/// and case edges before failure edges).
pub fn success_patterns(root: &MatcherNode) -> Vec<PatternId> {
    fn visit(node: &MatcherNode, out: &mut Vec<PatternId>) {
        match node {
            MatcherNode::Bool(n) => {
                if let Some(child) = n.on_success.as_deref() {
                    visit(child, out);
                }
                if let Some(child) = n.on_failure.as_deref() {
                    visit(child, out);
                }
            }
            MatcherNode::Switch(n) => {
                for (_, child) in &n.cases {
                    if let Some(child) = child.as_deref() {
                        visit(child, out);
                    }
                }
                if let Some(child) = n.on_failure.as_deref() {
                    visit(child, out);
                }
            }
            MatcherNode::Success(n) => {
                out.push(n.pattern);
                if let Some(child) = n.on_failure.as_deref() {
                    visit(child, out);
                }
            }
            MatcherNode::Exit => {}
        }
    }
    let mut out = Vec::new();
    visit(root, &mut out);
    out
}
