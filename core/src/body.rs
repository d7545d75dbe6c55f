//! Parsed configuration bodies.
//!
//! These types are what [`crate::syntax::parse`] produces and what the
//! decoder consumes: attribute assignments with unevaluated expressions,
//! and nested block occurrences with their headers. Every node keeps the
//! source range it came from.

use crate::diagnostics::SourceRange;
use crate::value::Value;

/// One body: attribute assignments and nested blocks, in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Body {
    pub attributes: Vec<Attribute>,
    pub blocks: Vec<Block>,
    /// Span of the body contents (between the braces for nested bodies).
    pub range: SourceRange,
}

impl Body {
    /// Creates an empty body located at `range`.
    pub fn empty(range: SourceRange) -> Self {
        Self {
            attributes: Vec::new(),
            blocks: Vec::new(),
            range,
        }
    }

    /// Returns `true` when the body has no attributes and no blocks.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.blocks.is_empty()
    }

    /// Finds the first attribute with the given name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Iterates over blocks of the given type.
    pub fn blocks_of_type<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a Block> {
        self.blocks.iter().filter(move |b| b.type_name == type_name)
    }
}

/// `name = expression`.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub name_range: SourceRange,
    pub expr: Expression,
    /// Span of the whole assignment.
    pub range: SourceRange,
}

/// `type "label" label { ... }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub type_name: String,
    pub labels: Vec<String>,
    /// Span of the type keyword.
    pub type_range: SourceRange,
    /// One span per label.
    pub labels_range: Vec<SourceRange>,
    pub body: Body,
    /// Span from the type keyword to the closing brace.
    pub range: SourceRange,
}

impl Block {
    /// Span covering the type keyword and all labels.
    pub fn header_range(&self) -> SourceRange {
        match self.labels_range.last() {
            Some(last) => self.type_range.to(last),
            None => self.type_range.clone(),
        }
    }
}

/// One step of a traversal after the root variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// `.name`
    Attr(String),
    /// `[0]` or `["key"]`
    Index(Value),
}

/// An unevaluated expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal scalar: string, number, bool or null.
    Literal { value: Value, range: SourceRange },
    /// `[a, b, c]`
    List {
        items: Vec<Expression>,
        range: SourceRange,
    },
    /// `{ key = value, ... }`
    Object {
        entries: Vec<(String, Expression)>,
        range: SourceRange,
    },
    /// `root.step[0].step`
    Traversal {
        root: String,
        steps: Vec<Step>,
        range: SourceRange,
    },
    /// `name(arg, ...)`
    Call {
        name: String,
        args: Vec<Expression>,
        range: SourceRange,
    },
}

impl Expression {
    /// Literal expression without a meaningful location.
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal {
            value: value.into(),
            range: SourceRange::default(),
        }
    }

    /// Source span of the expression.
    pub fn range(&self) -> &SourceRange {
        match self {
            Self::Literal { range, .. }
            | Self::List { range, .. }
            | Self::Object { range, .. }
            | Self::Traversal { range, .. }
            | Self::Call { range, .. } => range,
        }
    }
}
