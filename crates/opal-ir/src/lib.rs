//! Opal rewrite-pattern IR
//!
//! Defines the declarative description of a structural rewrite pattern: a
//! tree of symbolic values rooted at an operation, plus user-defined
//! constraint applications over those values. The matcher generator in
//! `opal-matcher` consumes a [`PatternModule`] and lowers all of its
//! patterns into a single merged decision tree.
//!
//! Symbolic values are pattern-local and identified by [`SymbolId`]; their
//! shape is given by a defining form ([`SymbolKind`]): an operation, an
//! external input value, a result produced by an operation, an attribute, or
//! a type. Patterns are assembled through [`PatternBuilder`].

// Re-export common types for use by other crates
pub use smol_str::SmolStr;

use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// Identity of a pattern within a [`PatternModule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatternId(pub u32);

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a symbolic value within a single [`Pattern`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub u32);

// ============================================================================
// Literal Constants
// ============================================================================

/// An opaque concrete type spelling, e.g. `"i32"` or `"tensor<4xf32>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeValue(pub SmolStr);

impl TypeValue {
    pub fn new(spelling: &str) -> Self {
        Self(SmolStr::new(spelling))
    }
}

impl fmt::Display for TypeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A concrete attribute constant.
///
/// Floats are stored as raw bit patterns so that constants stay `Eq + Hash`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeValue {
    Unit,
    Bool(bool),
    Integer(i64),
    Float(u64),
    String(SmolStr),
    Array(Vec<AttributeValue>),
    TypeRef(TypeValue),
}

impl AttributeValue {
    /// Wrap a float constant, preserving the exact bit pattern.
    pub fn float(value: f64) -> Self {
        AttributeValue::Float(value.to_bits())
    }

    pub fn string(value: &str) -> Self {
        AttributeValue::String(SmolStr::new(value))
    }

    /// The float constant, if this is one.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttributeValue::Float(bits) => Some(f64::from_bits(*bits)),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Unit => write!(f, "unit"),
            AttributeValue::Bool(b) => write!(f, "{b}"),
            AttributeValue::Integer(i) => write!(f, "{i}"),
            AttributeValue::Float(bits) => write!(f, "{}", f64::from_bits(*bits)),
            AttributeValue::String(s) => write!(f, "{s:?}"),
            AttributeValue::Array(elems) => {
                write!(f, "[")?;
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, "]")
            }
            AttributeValue::TypeRef(ty) => write!(f, "{ty}"),
        }
    }
}

// ============================================================================
// Symbolic Values
// ============================================================================

/// An operation symbol: optionally named, with ordered operand and result
/// values and named attribute entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSymbol {
    /// Concrete operation name, if the pattern fixes one.
    pub name: Option<SmolStr>,
    /// Operand values, each an `Input` or `Result` symbol.
    pub operands: Vec<SymbolId>,
    /// Result values produced by this operation, each a `Result` symbol.
    pub results: Vec<SymbolId>,
    /// Attribute entries as `(name, attribute symbol)` pairs.
    pub attributes: Vec<(SmolStr, SymbolId)>,
}

/// The defining form of a symbolic value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    /// An operation to match structurally.
    Operation(OperationSymbol),
    /// An external value fed into the matched subtree, optionally with a
    /// type symbol constraining it.
    Input { ty: Option<SymbolId> },
    /// The value produced by an operation symbol, with its declared type
    /// symbol. Its index is its place in the operation's `results` list.
    Result { op: SymbolId, ty: SymbolId },
    /// An attribute value, either carrying a type sub-term or a literal
    /// constant (or neither, when unconstrained).
    Attribute {
        ty: Option<SymbolId>,
        value: Option<AttributeValue>,
    },
    /// A type value, optionally fixed to a concrete type.
    Type { value: Option<TypeValue> },
}

impl SymbolKind {
    /// Forms that denote a matched value directly rather than the operation
    /// producing it. Reaching one of these through a second path pins both
    /// paths to the same value.
    pub fn is_direct_value(&self) -> bool {
        matches!(
            self,
            SymbolKind::Input { .. } | SymbolKind::Attribute { .. } | SymbolKind::Type { .. }
        )
    }

    pub fn is_operation(&self) -> bool {
        matches!(self, SymbolKind::Operation(_))
    }
}

// ============================================================================
// Constraints
// ============================================================================

/// A user-defined constraint applied to previously matched values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintApp {
    /// Name of the externally registered constraint.
    pub name: SmolStr,
    /// Ordered argument values; each must occur in the structural tree.
    pub args: Vec<SymbolId>,
    /// Opaque parameters forwarded to the constraint at match time.
    pub params: Vec<AttributeValue>,
}

// ============================================================================
// Patterns and Modules
// ============================================================================

/// A declarative rewrite pattern: the structural match half only. The
/// rewrite action lives with the driver and is opaque to matcher generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    /// Display name, used in diagnostics and dumps.
    pub name: SmolStr,
    /// The designated root, always an operation symbol.
    pub root: SymbolId,
    symbols: Vec<SymbolKind>,
    /// Constraint applications, in authoring order.
    pub constraints: Vec<ConstraintApp>,
}

impl Pattern {
    /// Start assembling a new pattern.
    pub fn build(name: &str) -> PatternBuilder {
        PatternBuilder {
            name: SmolStr::new(name),
            symbols: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Look up a symbol's defining form.
    pub fn symbol(&self, id: SymbolId) -> Option<&SymbolKind> {
        self.symbols.get(id.0 as usize)
    }

    pub fn num_symbols(&self) -> usize {
        self.symbols.len()
    }
}

/// An ordered collection of patterns lowered together into one matcher tree.
#[derive(Debug, Clone, Default)]
pub struct PatternModule {
    patterns: Vec<Pattern>,
}

impl PatternModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pattern, returning its identity within this module.
    pub fn push(&mut self, pattern: Pattern) -> PatternId {
        let id = PatternId(self.patterns.len() as u32);
        self.patterns.push(pattern);
        id
    }

    pub fn get(&self, id: PatternId) -> Option<&Pattern> {
        self.patterns.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Iterate patterns in module order with their identities.
    pub fn iter(&self) -> impl Iterator<Item = (PatternId, &Pattern)> {
        self.patterns
            .iter()
            .enumerate()
            .map(|(i, p)| (PatternId(i as u32), p))
    }
}

// ============================================================================
// Pattern Builder
// ============================================================================

/// Incrementally assembles the symbol arena of a [`Pattern`].
pub struct PatternBuilder {
    name: SmolStr,
    symbols: Vec<SymbolKind>,
    constraints: Vec<ConstraintApp>,
}

impl PatternBuilder {
    fn push(&mut self, kind: SymbolKind) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(kind);
        id
    }

    /// An unconstrained type variable.
    pub fn ty(&mut self) -> SymbolId {
        self.push(SymbolKind::Type { value: None })
    }

    /// A type fixed to a concrete spelling.
    pub fn concrete_type(&mut self, spelling: &str) -> SymbolId {
        self.push(SymbolKind::Type {
            value: Some(TypeValue::new(spelling)),
        })
    }

    /// An external input value with no type constraint.
    pub fn input(&mut self) -> SymbolId {
        self.push(SymbolKind::Input { ty: None })
    }

    /// An external input value constrained to the given type symbol.
    pub fn typed_input(&mut self, ty: SymbolId) -> SymbolId {
        self.push(SymbolKind::Input { ty: Some(ty) })
    }

    /// An unconstrained attribute.
    pub fn attribute(&mut self) -> SymbolId {
        self.push(SymbolKind::Attribute {
            ty: None,
            value: None,
        })
    }

    /// An attribute carrying a type sub-term.
    pub fn typed_attribute(&mut self, ty: SymbolId) -> SymbolId {
        self.push(SymbolKind::Attribute {
            ty: Some(ty),
            value: None,
        })
    }

    /// An attribute fixed to a literal constant.
    pub fn literal_attribute(&mut self, value: AttributeValue) -> SymbolId {
        self.push(SymbolKind::Attribute {
            ty: None,
            value: Some(value),
        })
    }

    /// An operation symbol. `result_types` supplies one type symbol per
    /// result; the freshly allocated result symbols are returned alongside
    /// the operation itself so they can be fed to enclosing operations as
    /// operands.
    pub fn operation(
        &mut self,
        name: Option<&str>,
        operands: Vec<SymbolId>,
        result_types: Vec<SymbolId>,
        attributes: Vec<(&str, SymbolId)>,
    ) -> (SymbolId, Vec<SymbolId>) {
        let op = self.push(SymbolKind::Operation(OperationSymbol {
            name: name.map(SmolStr::new),
            operands,
            results: Vec::new(),
            attributes: attributes
                .into_iter()
                .map(|(n, sym)| (SmolStr::new(n), sym))
                .collect(),
        }));
        let results: Vec<SymbolId> = result_types
            .into_iter()
            .map(|ty| self.push(SymbolKind::Result { op, ty }))
            .collect();
        if let Some(SymbolKind::Operation(sym)) = self.symbols.get_mut(op.0 as usize) {
            sym.results = results.clone();
        }
        (op, results)
    }

    /// Record a user-defined constraint application.
    pub fn constraint(&mut self, name: &str, args: Vec<SymbolId>, params: Vec<AttributeValue>) {
        self.constraints.push(ConstraintApp {
            name: SmolStr::new(name),
            args,
            params,
        });
    }

    /// Finish the pattern with the given root operation symbol.
    pub fn finish(self, root: SymbolId) -> Pattern {
        Pattern {
            name: self.name,
            root,
            symbols: self.symbols,
            constraints: self.constraints,
        }
    }
}
