//! Decoding parsed bodies against specs.
//!
//! [`decode`] walks a [`Body`] alongside a [`RootSpec`], evaluating every
//! attribute expression, matching every nested block occurrence to a
//! [`BlockSpec`], filling absent attributes with their defaults and checking
//! every value and block cardinality. Decoding never stops early: all
//! problems found in one pass are returned together with a best-effort
//! [`DecodedBlock`]. Any error-severity diagnostic means the decoded value
//! must not be used; [`Decoded::into_result`] enforces that.
//!
//! # Examples
//!
//! ```
//! use blockspec_core::{AttrSpec, Constraints, EvalContext, RootSpec, ValueKind, decode, syntax};
//!
//! let spec = RootSpec::new()
//!     .with_attr(
//!         AttrSpec::new("path", ValueKind::String)
//!             .with_constraints(Constraints::REQUIRED_MEANINGFUL)
//!             .with_example("data.csv"),
//!     )
//!     .with_attr(AttrSpec::new("delimiter", ValueKind::String).with_default(","));
//!
//! let body = syntax::parse("path = \"people.csv\"\n", "source.conf").unwrap();
//! let decoded = decode(&body, &spec, &EvalContext::new()).into_result().unwrap();
//! assert_eq!(decoded.get_str("path"), Some("people.csv"));
//! assert_eq!(decoded.get_str("delimiter"), Some(","));
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, trace};

use crate::attr::AttrSpec;
use crate::block::{BlockSpec, NameMatcher, RootSpec, Spec, SpecNode};
use crate::body::{Attribute, Block, Body};
use crate::diagnostics::{Diagnostic, Diagnostics, SourceRange};
use crate::eval::EvalContext;
use crate::value::{Value, quote};

/// One decoded attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedAttr {
    pub value: Value,
    /// Name range of the assignment; `None` when the value is a default or
    /// null fill-in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<SourceRange>,
}

/// The decoded form of a body: attribute values by name and nested blocks
/// in source order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DecodedBlock {
    /// Block type; empty for a root body.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub type_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    /// Type keyword range for nested blocks; body range for roots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<SourceRange>,
    pub attrs: BTreeMap<String, DecodedAttr>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<DecodedBlock>,
}

impl DecodedBlock {
    fn new(type_name: &str, labels: Vec<String>, range: Option<SourceRange>) -> Self {
        Self {
            type_name: type_name.to_string(),
            labels,
            range,
            attrs: BTreeMap::new(),
            blocks: Vec::new(),
        }
    }

    /// Looks up a decoded attribute with its range.
    pub fn attr(&self, name: &str) -> Option<&DecodedAttr> {
        self.attrs.get(name)
    }

    /// Looks up an attribute value. Absent optional attributes decode to
    /// their default or to [`Value::Null`], so this is `None` only for names
    /// the spec does not declare.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name).map(|a| &a.value)
    }

    /// String attribute value.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Numeric attribute value.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    /// Boolean attribute value.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// First nested block matching `matcher`.
    pub fn block(&self, matcher: &NameMatcher) -> Option<&DecodedBlock> {
        self.blocks.iter().find(|b| matcher.matches(&b.type_name, &b.labels))
    }

    /// All nested blocks matching `matcher`, in source order.
    pub fn blocks<'a>(
        &'a self,
        matcher: &'a NameMatcher,
    ) -> impl Iterator<Item = &'a DecodedBlock> {
        self.blocks
            .iter()
            .filter(move |b| matcher.matches(&b.type_name, &b.labels))
    }

    /// Plain data view: attribute values by name, and for each nested block
    /// type a list of block values. A labeled block carries its labels under
    /// the `labels` key.
    pub fn to_value(&self) -> Value {
        let mut map: BTreeMap<String, Value> = self
            .attrs
            .iter()
            .map(|(name, attr)| (name.clone(), attr.value.clone()))
            .collect();
        for block in &self.blocks {
            let entry = map
                .entry(block.type_name.clone())
                .or_insert_with(|| Value::List(Vec::new()));
            if let Value::List(items) = entry {
                let mut value = block.to_value();
                if !block.labels.is_empty() {
                    if let Value::Map(fields) = &mut value {
                        fields.insert(
                            "labels".to_string(),
                            Value::list(block.labels.iter().map(|l| Value::from(l.as_str()))),
                        );
                    }
                }
                items.push(value);
            }
        }
        Value::Map(map)
    }
}

/// Result of a decode: the best-effort value and every diagnostic found.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Decoded {
    pub block: DecodedBlock,
    pub diagnostics: Diagnostics,
}

impl Decoded {
    /// Returns `true` when any diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    /// Returns the decoded block when there is no error, dropping warnings.
    ///
    /// # Errors
    ///
    /// Returns all diagnostics (warnings included) if any of them is an
    /// error.
    pub fn into_result(self) -> Result<DecodedBlock, Diagnostics> {
        if self.diagnostics.has_errors() {
            Err(self.diagnostics)
        } else {
            Ok(self.block)
        }
    }
}

/// Decodes a root body.
pub fn decode(body: &Body, spec: &RootSpec, ctx: &EvalContext) -> Decoded {
    debug!(
        attributes = body.attributes.len(),
        blocks = body.blocks.len(),
        "decoding body"
    );
    let mut decoder = Decoder::new(ctx);
    let mut out = DecodedBlock::new("", Vec::new(), Some(body.range.clone()));
    decoder.decode_node(body, spec, &body.range.start_range(), &mut out);
    decoder.finish(out)
}

/// Decodes a single block occurrence against a block spec, ignoring the
/// spec's cardinality.
pub fn decode_block(block: &Block, spec: &BlockSpec, ctx: &EvalContext) -> Decoded {
    let mut decoder = Decoder::new(ctx);
    let out = decoder.decode_child(block, spec, true);
    decoder.finish(out)
}

/// Decodes a body that the host may not have at all, such as a plugin's
/// configuration block that the user left out.
///
/// A missing body is an error only if the spec is required (explicitly or
/// through a required child); otherwise the result holds every default.
pub fn decode_optional(
    body: Option<&Body>,
    spec: &RootSpec,
    ctx: &EvalContext,
    range: &SourceRange,
) -> Decoded {
    match body {
        Some(body) => decode(body, spec, ctx),
        None if spec.is_required() => Decoded {
            block: DecodedBlock::new("", Vec::new(), Some(range.clone())),
            diagnostics: Diagnostic::error(
                "Missing required configuration",
                "This plugin requires configuration, but none was provided.",
            )
            .with_range(range.clone())
            .into(),
        },
        None => decode(&Body::empty(range.clone()), spec, ctx),
    }
}

struct Decoder<'a> {
    ctx: &'a EvalContext,
    diags: Diagnostics,
}

impl<'a> Decoder<'a> {
    fn new(ctx: &'a EvalContext) -> Self {
        Self {
            ctx,
            diags: Diagnostics::new(),
        }
    }

    fn finish(self, block: DecodedBlock) -> Decoded {
        debug!(
            errors = self.diags.errors().count(),
            warnings = self.diags.warnings().count(),
            "decode finished"
        );
        Decoded {
            block,
            diagnostics: self.diags,
        }
    }

    fn error(&mut self, summary: &str, detail: String, range: &SourceRange) {
        self.diags
            .push(Diagnostic::error(summary, detail).with_range(range.clone()));
    }

    fn warning(&mut self, summary: &str, detail: String, range: &SourceRange) {
        self.diags
            .push(Diagnostic::warning(summary, detail).with_range(range.clone()));
    }

    /// Decodes `body` against the children of `node` into `out`.
    /// `missing_range` locates diagnostics about absent children.
    fn decode_node<N: SpecNode>(
        &mut self,
        body: &Body,
        node: &N,
        missing_range: &SourceRange,
        out: &mut DecodedBlock,
    ) {
        let conflicted = self.find_conflicts(body);
        let mut present: HashSet<&str> = HashSet::new();
        let mut first_attr: HashMap<&str, &SourceRange> = HashMap::new();

        for attr in &body.attributes {
            if conflicted.contains(attr.name.as_str()) {
                continue;
            }
            if let Some(previous) = first_attr.get(attr.name.as_str()) {
                self.error(
                    "Duplicate attribute",
                    format!(
                        "The attribute {:?} was already defined at {previous}.",
                        attr.name
                    ),
                    &attr.name_range,
                );
                continue;
            }
            first_attr.insert(&attr.name, &attr.name_range);
            present.insert(&attr.name);

            let child = node
                .children()
                .iter()
                .find(|c| c.name() == Some(attr.name.as_str()));
            let decoded = match child {
                Some(Spec::Attr(spec)) => self.decode_attr(attr, spec),
                Some(Spec::Opaque(_)) => self.evaluate_raw(attr),
                Some(Spec::Block(_)) => {
                    self.error(
                        "Unexpected attribute",
                        format!(
                            "A block of type {:?} is expected here, not an attribute.",
                            attr.name
                        ),
                        &attr.name_range,
                    );
                    continue;
                }
                None if node.allow_extra_attrs() => self.evaluate_raw(attr),
                None => {
                    self.error(
                        "Unsupported argument",
                        format!("An argument named {:?} is not expected here.", attr.name),
                        &attr.name_range,
                    );
                    continue;
                }
            };
            out.attrs.insert(attr.name.clone(), decoded);
        }

        // Occurrence count and first range per block spec, keyed by child index.
        let mut seen_blocks: HashMap<usize, &SourceRange> = HashMap::new();

        for block in &body.blocks {
            if conflicted.contains(block.type_name.as_str()) {
                continue;
            }
            present.insert(&block.type_name);

            let candidates: Vec<(usize, &BlockSpec)> = node
                .children()
                .iter()
                .enumerate()
                .filter_map(|(i, child)| match child {
                    Spec::Block(spec)
                        if spec.matcher.type_name() == Some(block.type_name.as_str()) =>
                    {
                        Some((i, spec))
                    }
                    _ => None,
                })
                .collect();

            let exact = candidates
                .iter()
                .find(|(_, spec)| spec.matcher.matches(&block.type_name, &block.labels));
            let labels_ignored = candidates
                .iter()
                .find(|(_, spec)| spec.matcher.matches(&block.type_name, &[]));

            let (index, spec, keep_labels) = match (exact, labels_ignored) {
                (Some(&(i, spec)), _) => (i, spec, true),
                (None, Some(&(i, spec))) => {
                    self.warning(
                        "Labels ignored",
                        format!(
                            "Block {:?} takes no labels; labels are ignored in this context.",
                            block.type_name
                        ),
                        &block.header_range(),
                    );
                    (i, spec, false)
                }
                (None, None) if !candidates.is_empty() => {
                    let expected = candidates
                        .iter()
                        .filter_map(|(_, spec)| spec.matcher.expected_labels())
                        .map(|n| n.to_string())
                        .collect::<Vec<_>>();
                    self.error(
                        "Invalid block labels",
                        format!(
                            "No {:?} block accepts the labels [{}]; expected {} label(s).",
                            block.type_name,
                            block
                                .labels
                                .iter()
                                .map(|l| quote(l))
                                .collect::<Vec<_>>()
                                .join(", "),
                            if expected.is_empty() {
                                "a different set of".to_string()
                            } else {
                                expected.join(" or ")
                            }
                        ),
                        &block.header_range(),
                    );
                    continue;
                }
                (None, None) => {
                    self.decode_unmatched_block(block, node, out);
                    continue;
                }
            };

            if let Some(first) = seen_blocks.get(&index) {
                if !spec.repeatable {
                    self.error(
                        "Duplicate block",
                        format!(
                            "Only one {:?} block is allowed. Another was already defined at {first}.",
                            block.type_name
                        ),
                        &block.type_range,
                    );
                    continue;
                }
            } else {
                seen_blocks.insert(index, &block.type_range);
            }
            let decoded = self.decode_child(block, spec, keep_labels);
            out.blocks.push(decoded);
        }

        for (index, child) in node.children().iter().enumerate() {
            match child {
                Spec::Attr(spec) => {
                    if present.contains(spec.name.as_str())
                        || conflicted.contains(spec.name.as_str())
                    {
                        continue;
                    }
                    let filled = self.fill_absent(spec, missing_range);
                    out.attrs.insert(spec.name.clone(), filled);
                }
                Spec::Block(spec) => {
                    let name = spec.matcher.type_name().unwrap_or_default();
                    if spec.required
                        && !seen_blocks.contains_key(&index)
                        && !conflicted.contains(name)
                    {
                        self.error(
                            "Missing required block",
                            format!(
                                "{} block {} is required, but none was found.",
                                if spec.repeatable { "At least one" } else { "A" },
                                header_text(&spec.matcher)
                            ),
                            missing_range,
                        );
                    }
                }
                Spec::Opaque(spec) => {
                    let name = spec.name.as_str();
                    if spec.required && !present.contains(name) && !conflicted.contains(name) {
                        self.error(
                            "Missing required definition",
                            format!("An attribute or block named {name:?} is required, but none was found."),
                            missing_range,
                        );
                    }
                }
            }
        }
    }

    /// Reports each name used by both an attribute and a block once, and
    /// returns the set of such names.
    fn find_conflicts<'b>(&mut self, body: &'b Body) -> HashSet<&'b str> {
        let mut conflicted = HashSet::new();
        for attr in &body.attributes {
            let name = attr.name.as_str();
            if conflicted.contains(name) {
                continue;
            }
            let Some(block) = body.blocks.iter().find(|b| b.type_name == name) else {
                continue;
            };
            let (earlier, earlier_range, later_range) =
                if attr.name_range.start <= block.type_range.start {
                    ("an attribute", &attr.name_range, &block.type_range)
                } else {
                    ("a block", &block.type_range, &attr.name_range)
                };
            self.error(
                "Attribute and block name conflict",
                format!(
                    "{name:?} was already defined as {earlier} at {earlier_range}; an attribute and a block cannot share a name."
                ),
                later_range,
            );
            conflicted.insert(name);
        }
        conflicted
    }

    fn decode_attr(&mut self, attr: &Attribute, spec: &AttrSpec) -> DecodedAttr {
        let range = Some(attr.name_range.clone());
        let raw = match attr.expr.evaluate(self.ctx) {
            Ok(value) => value,
            Err(diag) => {
                self.diags.push(diag);
                return DecodedAttr {
                    value: Value::Null,
                    range,
                };
            }
        };

        if let Some(note) = &spec.deprecated {
            self.warning(
                "Deprecated attribute",
                format!("The attribute {:?} is deprecated: {note}", spec.name),
                &attr.name_range,
            );
        }

        let value = match spec.kind.conform(&raw) {
            Ok(value) => spec.normalize(value),
            Err(err) => {
                self.error(
                    "Incorrect attribute value type",
                    format!("Inappropriate value for attribute {:?}: {err}.", spec.name),
                    attr.expr.range(),
                );
                return DecodedAttr { value: raw, range };
            }
        };

        let diags = spec.validate_value(&value).with_range(attr.expr.range());
        self.diags.extend(diags);
        trace!(
            attribute = %spec.name,
            value = %redact(spec, &value),
            "decoded attribute"
        );
        DecodedAttr { value, range }
    }

    fn fill_absent(&mut self, spec: &AttrSpec, missing_range: &SourceRange) -> DecodedAttr {
        let Some(default) = &spec.default else {
            if spec.is_required() {
                self.error(
                    "Missing required attribute",
                    format!(
                        "The attribute {:?} is required, but no definition was found.",
                        spec.name
                    ),
                    missing_range,
                );
            } else {
                let diags = spec.validate_value(&Value::Null).with_range(missing_range);
                self.diags.extend(diags);
            }
            return DecodedAttr {
                value: Value::Null,
                range: None,
            };
        };

        let value = match spec.kind.conform(default) {
            Ok(value) => spec.normalize(value),
            Err(err) => {
                self.error(
                    "Invalid default value",
                    format!("The default for attribute {:?} is invalid: {err}.", spec.name),
                    missing_range,
                );
                return DecodedAttr {
                    value: default.clone(),
                    range: None,
                };
            }
        };
        let diags = spec.validate_value(&value).with_range(missing_range);
        self.diags.extend(diags);
        trace!(
            attribute = %spec.name,
            value = %redact(spec, &value),
            "filled default"
        );
        DecodedAttr { value, range: None }
    }

    fn evaluate_raw(&mut self, attr: &Attribute) -> DecodedAttr {
        let value = attr.expr.evaluate(self.ctx).unwrap_or_else(|diag| {
            self.diags.push(diag);
            Value::Null
        });
        DecodedAttr {
            value,
            range: Some(attr.name_range.clone()),
        }
    }

    fn decode_child(&mut self, block: &Block, spec: &BlockSpec, keep_labels: bool) -> DecodedBlock {
        let labels = if keep_labels {
            block.labels.clone()
        } else {
            Vec::new()
        };
        let mut out = DecodedBlock::new(&block.type_name, labels, Some(block.type_range.clone()));
        self.decode_node(&block.body, spec, &block.header_range(), &mut out);
        out
    }

    /// Handles a block whose type matches no block spec: opaque pass-through,
    /// allowed extra, or an error.
    fn decode_unmatched_block<N: SpecNode>(
        &mut self,
        block: &Block,
        node: &N,
        out: &mut DecodedBlock,
    ) {
        let child = node
            .children()
            .iter()
            .find(|c| c.name() == Some(block.type_name.as_str()));
        match child {
            Some(Spec::Opaque(_)) => out.blocks.push(self.decode_generic(block)),
            Some(Spec::Attr(_)) => self.error(
                "Unexpected block",
                format!(
                    "An attribute named {:?} is expected here, not a block.",
                    block.type_name
                ),
                &block.type_range,
            ),
            _ if node.allow_extra_blocks() => out.blocks.push(self.decode_generic(block)),
            _ => self.error(
                "Unsupported block type",
                format!("Blocks of type {:?} are not expected here.", block.type_name),
                &block.type_range,
            ),
        }
    }

    /// Decodes a block without a schema: every attribute is evaluated as-is
    /// and nested blocks are decoded the same way.
    fn decode_generic(&mut self, block: &Block) -> DecodedBlock {
        let mut out = DecodedBlock::new(
            &block.type_name,
            block.labels.clone(),
            Some(block.type_range.clone()),
        );
        for attr in &block.body.attributes {
            let decoded = self.evaluate_raw(attr);
            out.attrs.insert(attr.name.clone(), decoded);
        }
        for nested in &block.body.blocks {
            let decoded = self.decode_generic(nested);
            out.blocks.push(decoded);
        }
        out
    }
}

fn redact(spec: &AttrSpec, value: &Value) -> String {
    if spec.secret {
        "<redacted>".to_string()
    } else {
        value.to_string()
    }
}

/// `type "label"` rendering of what a matcher expects.
pub(crate) fn header_text(matcher: &NameMatcher) -> String {
    let mut text = matcher.type_name().unwrap_or_default().to_string();
    for label in matcher.example_labels() {
        text.push(' ');
        text.push_str(&quote(&label));
    }
    text
}
