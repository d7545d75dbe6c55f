//! Block specs, root specs and block header matching.
//!
//! A [`BlockSpec`] describes a nested, optionally labeled, optionally
//! repeated child block; a [`RootSpec`] describes the outermost body and has
//! no header. Both hold an ordered list of [`Spec`] children, a closed
//! variant over attribute, block and opaque specs.
//!
//! # Examples
//!
//! ```
//! use blockspec_core::{AttrSpec, BlockSpec, Constraints, NameMatcher, RootSpec, ValueKind};
//!
//! let root = RootSpec::new()
//!     .with_attr(AttrSpec::new("title", ValueKind::String))
//!     .with_block(
//!         BlockSpec::new(NameMatcher::exact("section", &[]))
//!             .repeatable()
//!             .with_attr(
//!                 AttrSpec::new("heading", ValueKind::String)
//!                     .with_constraints(Constraints::REQUIRED)
//!                     .with_example("Overview"),
//!             ),
//!     );
//!
//! assert!(!root.is_required());
//! assert!(root.validate_spec().is_empty());
//! assert!(NameMatcher::exact("section", &[]).matches("section", &[]));
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::attr::AttrSpec;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::value::is_identifier;

/// Predicate over a block occurrence's type name and labels.
///
/// Matchers compose by logical AND through [`NameMatcher::All`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameMatcher {
    /// Type name must be identical.
    Type(String),
    /// Label list must be identical (same values, same length).
    Labels(Vec<String>),
    /// Exactly this many labels, any values.
    LabelCount(usize),
    /// Every inner matcher must match.
    All(Vec<NameMatcher>),
}

impl NameMatcher {
    /// Matches the type name and the exact label list.
    pub fn exact(type_name: impl Into<String>, labels: &[&str]) -> Self {
        Self::All(vec![
            Self::Type(type_name.into()),
            Self::Labels(labels.iter().map(|l| l.to_string()).collect()),
        ])
    }

    /// Matches the type name and any `count` labels.
    pub fn labeled(type_name: impl Into<String>, count: usize) -> Self {
        Self::All(vec![Self::Type(type_name.into()), Self::LabelCount(count)])
    }

    /// Combines two matchers with logical AND.
    pub fn and(self, other: NameMatcher) -> Self {
        match self {
            Self::All(mut inner) => {
                inner.push(other);
                Self::All(inner)
            }
            first => Self::All(vec![first, other]),
        }
    }

    /// Returns `true` when the occurrence satisfies the matcher.
    pub fn matches(&self, type_name: &str, labels: &[String]) -> bool {
        match self {
            Self::Type(expected) => expected == type_name,
            Self::Labels(expected) => expected.as_slice() == labels,
            Self::LabelCount(count) => labels.len() == *count,
            Self::All(inner) => inner.iter().all(|m| m.matches(type_name, labels)),
        }
    }

    /// First type name the matcher requires, if any.
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Self::Type(name) => Some(name),
            Self::All(inner) => inner.iter().find_map(NameMatcher::type_name),
            Self::Labels(_) | Self::LabelCount(_) => None,
        }
    }

    /// Number of labels the matcher requires, if it constrains labels.
    pub fn expected_labels(&self) -> Option<usize> {
        match self {
            Self::Labels(labels) => Some(labels.len()),
            Self::LabelCount(count) => Some(*count),
            Self::All(inner) => inner.iter().find_map(NameMatcher::expected_labels),
            Self::Type(_) => None,
        }
    }

    /// Labels that satisfy the matcher, for rendering examples.
    pub fn example_labels(&self) -> Vec<String> {
        if let Some(labels) = self.exact_labels() {
            return labels.to_vec();
        }
        let count = self.expected_labels().unwrap_or(0);
        (1..=count).map(|i| format!("label_{i}")).collect()
    }

    fn exact_labels(&self) -> Option<&[String]> {
        match self {
            Self::Labels(labels) => Some(labels),
            Self::All(inner) => inner.iter().find_map(NameMatcher::exact_labels),
            Self::Type(_) | Self::LabelCount(_) => None,
        }
    }

    /// Returns `true` when two requirements inside the matcher contradict
    /// each other, so that no occurrence can ever match.
    fn is_contradictory(&self) -> bool {
        let mut types = Vec::new();
        let mut counts = Vec::new();
        let mut exact = Vec::new();
        self.collect_parts(&mut types, &mut counts, &mut exact);
        types.windows(2).any(|w| w[0] != w[1])
            || exact.windows(2).any(|w| w[0] != w[1])
            || counts.windows(2).any(|w| w[0] != w[1])
            || exact.first().is_some_and(|labels| counts.iter().any(|c| *c != labels.len()))
    }

    fn collect_parts<'a>(
        &'a self,
        types: &mut Vec<&'a str>,
        counts: &mut Vec<usize>,
        exact: &mut Vec<&'a [String]>,
    ) {
        match self {
            Self::Type(name) => types.push(name),
            Self::LabelCount(count) => counts.push(*count),
            Self::Labels(labels) => exact.push(labels),
            Self::All(inner) => inner
                .iter()
                .for_each(|m| m.collect_parts(types, counts, exact)),
        }
    }
}

/// Escape hatch: an attribute or blocks passed through without schema
/// validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpaqueSpec {
    /// Attribute name or block type name.
    pub name: String,
    /// Documentation text.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub doc: String,
    /// Whether the attribute or at least one block must be present.
    #[serde(default)]
    pub required: bool,
}

impl OpaqueSpec {
    /// Creates an optional opaque spec.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: String::new(),
            required: false,
        }
    }

    /// Sets documentation text.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    /// Marks the spec required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// One child of a block or root spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spec {
    /// Leaf attribute.
    Attr(AttrSpec),
    /// Nested block.
    Block(BlockSpec),
    /// Unvalidated pass-through.
    Opaque(OpaqueSpec),
}

impl Spec {
    /// Name this child occupies in the body namespace.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Attr(attr) => Some(&attr.name),
            Self::Block(block) => block.matcher.type_name(),
            Self::Opaque(opaque) => Some(&opaque.name),
        }
    }

    /// Returns `true` when the child must be present.
    pub fn is_required(&self) -> bool {
        match self {
            Self::Attr(attr) => attr.is_required(),
            Self::Block(block) => block.required,
            Self::Opaque(opaque) => opaque.required,
        }
    }

    /// Self-checks the child.
    pub fn validate_spec(&self) -> Diagnostics {
        match self {
            Self::Attr(attr) => attr.validate_spec(),
            Self::Block(block) => block.validate_spec(),
            Self::Opaque(opaque) => {
                if is_identifier(&opaque.name) {
                    Diagnostics::new()
                } else {
                    Diagnostic::error(
                        "Invalid opaque spec name",
                        format!("{:?} is not a valid identifier.", opaque.name),
                    )
                    .into()
                }
            }
        }
    }
}

impl From<AttrSpec> for Spec {
    fn from(attr: AttrSpec) -> Self {
        Self::Attr(attr)
    }
}

impl From<BlockSpec> for Spec {
    fn from(block: BlockSpec) -> Self {
        Self::Block(block)
    }
}

impl From<OpaqueSpec> for Spec {
    fn from(opaque: OpaqueSpec) -> Self {
        Self::Opaque(opaque)
    }
}

/// Shared view over block and root specs used by the decoder, the validator
/// and the documentation generator.
pub trait SpecNode {
    /// Ordered children.
    fn children(&self) -> &[Spec];
    /// Documentation text.
    fn doc(&self) -> &str;
    /// Unknown attributes pass through unvalidated.
    fn allow_extra_attrs(&self) -> bool;
    /// Unknown blocks pass through unvalidated.
    fn allow_extra_blocks(&self) -> bool;

    /// Iterates over attribute children.
    fn attrs(&self) -> impl Iterator<Item = &AttrSpec> {
        self.children().iter().filter_map(|child| match child {
            Spec::Attr(attr) => Some(attr),
            _ => None,
        })
    }

    /// Iterates over block children.
    fn blocks(&self) -> impl Iterator<Item = &BlockSpec> {
        self.children().iter().filter_map(|child| match child {
            Spec::Block(block) => Some(block),
            _ => None,
        })
    }

    /// Finds an attribute child by name.
    fn attr(&self, name: &str) -> Option<&AttrSpec> {
        self.attrs().find(|attr| attr.name == name)
    }
}

/// Recursively self-checks a child list and its shared namespace.
fn validate_children(children: &[Spec]) -> Diagnostics {
    let mut diags = Diagnostics::new();
    let mut seen: HashMap<&str, Vec<&Spec>> = HashMap::new();

    for child in children {
        if let Some(name) = child.name() {
            let previous = seen.entry(name).or_default();
            // Blocks sharing a type name but told apart by labels are fine.
            let clashes = previous.iter().any(|earlier| match (earlier, child) {
                (Spec::Block(a), Spec::Block(b)) => a.matcher == b.matcher,
                _ => true,
            });
            if clashes {
                diags.push(Diagnostic::error(
                    "Duplicate name in spec",
                    format!("{name:?} is declared more than once in the same body."),
                ));
            }
            previous.push(child);
        }
        diags.extend(child.validate_spec());
    }

    diags
}

/// Description of a nested block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSpec {
    /// Header pattern.
    pub matcher: NameMatcher,
    /// At least one occurrence must be present.
    #[serde(default)]
    pub required: bool,
    /// More than one occurrence is allowed.
    #[serde(default)]
    pub repeatable: bool,
    /// Documentation text.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub doc: String,
    /// Ordered children.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Spec>,
    /// Unknown attributes pass through unvalidated.
    #[serde(default)]
    pub allow_extra_attrs: bool,
    /// Unknown blocks pass through unvalidated.
    #[serde(default)]
    pub allow_extra_blocks: bool,
}

impl BlockSpec {
    /// Creates an optional, non-repeatable block spec.
    pub fn new(matcher: NameMatcher) -> Self {
        Self {
            matcher,
            required: false,
            repeatable: false,
            doc: String::new(),
            children: Vec::new(),
            allow_extra_attrs: false,
            allow_extra_blocks: false,
        }
    }

    /// Marks the block required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Allows more than one occurrence.
    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }

    /// Sets documentation text.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    /// Appends an attribute child.
    pub fn with_attr(mut self, attr: AttrSpec) -> Self {
        self.children.push(Spec::Attr(attr));
        self
    }

    /// Appends a block child.
    pub fn with_block(mut self, block: BlockSpec) -> Self {
        self.children.push(Spec::Block(block));
        self
    }

    /// Appends an opaque child.
    pub fn with_opaque(mut self, opaque: OpaqueSpec) -> Self {
        self.children.push(Spec::Opaque(opaque));
        self
    }

    /// Lets unknown attributes and blocks pass through.
    pub fn allow_extra(mut self) -> Self {
        self.allow_extra_attrs = true;
        self.allow_extra_blocks = true;
        self
    }

    /// Human-readable cardinality: `exactly one`, `zero or one`, ...
    pub fn cardinality(&self) -> &'static str {
        match (self.required, self.repeatable) {
            (true, false) => "exactly one",
            (false, false) => "zero or one",
            (true, true) => "one or more",
            (false, true) => "zero or more",
        }
    }

    /// Recursively self-checks the block spec.
    pub fn validate_spec(&self) -> Diagnostics {
        let mut diags = Diagnostics::new();
        match self.matcher.type_name() {
            None => diags.push(Diagnostic::error(
                "Block spec without type name",
                "A nested block spec must match a type name; labels alone cannot identify a block.",
            )),
            Some(name) if !is_identifier(name) => diags.push(Diagnostic::error(
                "Invalid block type name",
                format!("{name:?} is not a valid identifier."),
            )),
            Some(_) => {}
        }
        if self.matcher.is_contradictory() {
            diags.push(Diagnostic::error(
                "Block matcher can never match",
                format!(
                    "The matcher for {:?} combines requirements that contradict each other.",
                    self.matcher.type_name().unwrap_or_default()
                ),
            ));
        }
        diags.extend(validate_children(&self.children));
        diags
    }
}

impl SpecNode for BlockSpec {
    fn children(&self) -> &[Spec] {
        &self.children
    }

    fn doc(&self) -> &str {
        &self.doc
    }

    fn allow_extra_attrs(&self) -> bool {
        self.allow_extra_attrs
    }

    fn allow_extra_blocks(&self) -> bool {
        self.allow_extra_blocks
    }
}

/// Description of a plugin's outermost configuration or argument object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RootSpec {
    /// Explicitly required, regardless of children.
    #[serde(default)]
    pub required: bool,
    /// Documentation text.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub doc: String,
    /// Ordered children.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Spec>,
    /// Unknown attributes pass through unvalidated.
    #[serde(default)]
    pub allow_extra_attrs: bool,
    /// Unknown blocks pass through unvalidated.
    #[serde(default)]
    pub allow_extra_blocks: bool,
}

impl RootSpec {
    /// Creates an empty root spec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the object required even if nothing inside it is.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets documentation text.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    /// Appends an attribute child.
    pub fn with_attr(mut self, attr: AttrSpec) -> Self {
        self.children.push(Spec::Attr(attr));
        self
    }

    /// Appends a block child.
    pub fn with_block(mut self, block: BlockSpec) -> Self {
        self.children.push(Spec::Block(block));
        self
    }

    /// Appends an opaque child.
    pub fn with_opaque(mut self, opaque: OpaqueSpec) -> Self {
        self.children.push(Spec::Opaque(opaque));
        self
    }

    /// Lets unknown attributes and blocks pass through.
    pub fn allow_extra(mut self) -> Self {
        self.allow_extra_attrs = true;
        self.allow_extra_blocks = true;
        self
    }

    /// Effective requiredness: explicitly required, or any child required.
    pub fn is_required(&self) -> bool {
        self.required || self.children.iter().any(Spec::is_required)
    }

    /// Recursively self-checks every child.
    pub fn validate_spec(&self) -> Diagnostics {
        validate_children(&self.children)
    }
}

impl SpecNode for RootSpec {
    fn children(&self) -> &[Spec] {
        &self.children
    }

    fn doc(&self) -> &str {
        &self.doc
    }

    fn allow_extra_attrs(&self) -> bool {
        self.allow_extra_attrs
    }

    fn allow_extra_blocks(&self) -> bool {
        self.allow_extra_blocks
    }
}
