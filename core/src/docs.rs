//! Reference documentation rendered straight from specs.
//!
//! [`render_example`] writes a complete configuration body for a spec, with
//! a comment above every attribute and block describing its kind,
//! requiredness and constraints. The example reads the same spec objects
//! the decoder checks against, so for any spec without `validate_spec`
//! errors, the rendered text parses and decodes against that spec without
//! errors. Capsule-typed attributes have no literal syntax and are rendered
//! as comments.
//!
//! [`render_markdown`] wraps the same example in a markdown reference page.
//!
//! # Examples
//!
//! ```
//! use blockspec_core::{AttrSpec, Constraints, DocOptions, RootSpec, ValueKind, render_example};
//!
//! let spec = RootSpec::new()
//!     .with_attr(
//!         AttrSpec::new("url", ValueKind::String)
//!             .with_doc("Endpoint to fetch.")
//!             .with_constraints(Constraints::REQUIRED_MEANINGFUL)
//!             .with_example("https://example.com/data.json"),
//!     )
//!     .with_attr(AttrSpec::new("timeout", ValueKind::Number).with_default(30));
//!
//! let text = render_example(&spec, &DocOptions::default());
//! assert!(text.contains("# Endpoint to fetch.\n"));
//! assert!(text.contains("url = \"https://example.com/data.json\"\n"));
//! assert!(text.contains("timeout = 30\n"));
//! ```

use crate::attr::{AttrSpec, bounds_phrase, list_literals};
use crate::block::{BlockSpec, OpaqueSpec, RootSpec, Spec, SpecNode};
use crate::constraints::Constraints;
use crate::decode::header_text;
use crate::value::{Value, ValueKind, exact_integer};

const PLACEHOLDER: &str = "example";

/// Layout options for rendered examples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocOptions {
    /// Spaces per nesting level.
    pub indent: usize,
    /// Wraps the whole example in a block with this header, e.g. `config`.
    pub header: Option<String>,
    /// Emits descriptive comments.
    pub comments: bool,
}

impl Default for DocOptions {
    fn default() -> Self {
        Self {
            indent: 2,
            header: None,
            comments: true,
        }
    }
}

impl DocOptions {
    /// Sets the wrapping header.
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    /// Disables descriptive comments.
    pub fn without_comments(mut self) -> Self {
        self.comments = false;
        self
    }
}

struct Writer<'a> {
    out: String,
    opts: &'a DocOptions,
}

impl Writer<'_> {
    fn line(&mut self, depth: usize, text: &str) {
        if !text.is_empty() {
            self.out.push_str(&" ".repeat(depth * self.opts.indent));
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    fn comment(&mut self, depth: usize, text: &str) {
        if !self.opts.comments {
            return;
        }
        for line in text.lines() {
            if line.is_empty() {
                self.line(depth, "#");
            } else {
                self.line(depth, &format!("# {line}"));
            }
        }
    }

    fn children(&mut self, depth: usize, children: &[Spec]) {
        for (i, child) in children.iter().enumerate() {
            if i > 0 && self.opts.comments {
                self.line(0, "");
            }
            match child {
                Spec::Attr(attr) => self.attr(depth, attr),
                Spec::Block(block) => self.block(depth, block),
                Spec::Opaque(opaque) => self.opaque(depth, opaque),
            }
        }
    }

    fn attr(&mut self, depth: usize, spec: &AttrSpec) {
        if !spec.doc.is_empty() {
            self.comment(depth, &spec.doc);
        }
        self.comment(depth, &summary_line(spec));

        let name = &spec.name;
        if let ValueKind::Capsule(kind) = &spec.kind {
            self.line(depth, &format!("# {name} = <{kind}>"));
            return;
        }
        // An absent non-null attribute without a default fails to decode.
        let non_null = spec.constraints.contains(Constraints::NON_NULL);
        match (&spec.default, spec.is_required()) {
            (Some(default), false) => self.line(depth, &format!("{name} = {default}")),
            (None, false) if !non_null => match example_value(spec) {
                Some(value) => self.line(depth, &format!("# {name} = {value}")),
                None => self.line(depth, &format!("# {name} = <{}>", spec.kind)),
            },
            _ => match example_value(spec) {
                Some(value) => self.line(depth, &format!("{name} = {value}")),
                None => self.line(depth, &format!("# {name} = <{}>", spec.kind)),
            },
        }
    }

    fn block(&mut self, depth: usize, spec: &BlockSpec) {
        if !spec.doc.is_empty() {
            self.comment(depth, &spec.doc);
        }
        self.comment(depth, &format!("Block, {}.", spec.cardinality()));
        self.line(depth, &format!("{} {{", header_text(&spec.matcher)));
        self.children(depth + 1, &spec.children);
        self.line(depth, "}");
    }

    fn opaque(&mut self, depth: usize, spec: &OpaqueSpec) {
        if !spec.doc.is_empty() {
            self.comment(depth, &spec.doc);
        }
        let status = if spec.required { "required" } else { "optional" };
        self.comment(
            depth,
            &format!("{status}; any attribute value or block content is accepted without validation."),
        );
        if spec.required {
            self.line(depth, &format!("{} = {{}}", spec.name));
        } else {
            self.line(depth, &format!("# {} = {{}}", spec.name));
        }
    }
}

/// `string, required, length >= 3` style description of an attribute.
fn summary_line(spec: &AttrSpec) -> String {
    let mut parts = vec![
        spec.kind.describe(),
        if spec.is_required() { "required" } else { "optional" }.to_string(),
    ];
    parts.extend(constraint_notes(spec));
    parts.join(", ")
}

/// Human-readable notes for every constraint declared on an attribute.
pub(crate) fn constraint_notes(spec: &AttrSpec) -> Vec<String> {
    let mut notes = Vec::new();
    if !spec.one_of.is_empty() {
        notes.push(format!("one of: {}", list_literals(&spec.one_of)));
    }
    if spec.kind.has_length() {
        if let Some(phrase) = bounds_phrase(spec.effective_min_len(), spec.max_len) {
            notes.push(format!("length {phrase}"));
        }
    }
    if spec.kind.is_numeric() {
        if let Some(phrase) = bounds_phrase(spec.min, spec.max) {
            notes.push(format!("value {phrase}"));
        }
    }
    if spec.constraints.contains(Constraints::INTEGER) {
        notes.push("integer".to_string());
    }
    if spec.constraints.contains(Constraints::NON_NULL) {
        notes.push("non-null".to_string());
    }
    if spec.constraints.contains(Constraints::TRIMMED_NON_EMPTY) {
        notes.push("surrounding whitespace is trimmed".to_string());
    }
    if let Some(note) = &spec.deprecated {
        notes.push(format!("deprecated: {note}"));
    }
    if spec.secret {
        notes.push("secret".to_string());
    }
    notes
}

/// The declared example, or a placeholder satisfying the constraints.
fn example_value(spec: &AttrSpec) -> Option<Value> {
    if let Some(example) = &spec.example {
        return Some(example.clone());
    }
    if let Some(first) = spec.one_of.first() {
        return Some(first.clone());
    }
    match &spec.kind {
        ValueKind::String => {
            let len = target_len(spec, PLACEHOLDER.len());
            Some(Value::String(sized_string(len)))
        }
        ValueKind::Number => Some(Value::Number(number_in_bounds(spec))),
        ValueKind::List(element) => {
            let len = target_len(spec, 1);
            let item = kind_placeholder(element)?;
            Some(Value::List(vec![item; len]))
        }
        ValueKind::Map(element) => {
            let len = target_len(spec, 1);
            let item = kind_placeholder(element)?;
            Some(Value::Map(
                (1..=len).map(|i| (format!("key{i}"), item.clone())).collect(),
            ))
        }
        kind => kind_placeholder(kind),
    }
}

/// Placeholder for a kind with no constraints attached.
fn kind_placeholder(kind: &ValueKind) -> Option<Value> {
    match kind {
        ValueKind::String => Some(Value::from(PLACEHOLDER)),
        ValueKind::Number => Some(Value::from(1)),
        ValueKind::Bool => Some(Value::Bool(false)),
        ValueKind::List(element) => Some(Value::list([kind_placeholder(element)?])),
        ValueKind::Map(element) => Some(Value::map([("key1", kind_placeholder(element)?)])),
        ValueKind::Tuple(elements) => elements
            .iter()
            .map(kind_placeholder)
            .collect::<Option<Vec<_>>>()
            .map(Value::List),
        ValueKind::Capsule(_) => None,
    }
}

fn target_len(spec: &AttrSpec, preferred: usize) -> usize {
    let mut len = preferred as u64;
    if let Some(min) = spec.effective_min_len() {
        len = len.max(min);
    }
    if let Some(max) = spec.max_len {
        len = len.min(max);
    }
    usize::try_from(len).unwrap_or(preferred)
}

fn sized_string(len: usize) -> String {
    if len <= PLACEHOLDER.len() {
        PLACEHOLDER[..len].to_string()
    } else {
        format!("{PLACEHOLDER}{}", "x".repeat(len - PLACEHOLDER.len()))
    }
}

fn number_in_bounds(spec: &AttrSpec) -> f64 {
    let integer = spec.constraints.contains(Constraints::INTEGER);
    let mut n = 1.0_f64;
    if let Some(min) = spec.min {
        n = n.max(min);
    }
    if let Some(max) = spec.max {
        n = n.min(max);
    }
    if integer && exact_integer(n).is_none() {
        let up = n.ceil();
        n = if spec.max.is_none_or(|max| up <= max) { up } else { n.floor() };
    }
    n
}

/// Renders a canonical example body for a root spec.
pub fn render_example(spec: &RootSpec, opts: &DocOptions) -> String {
    let mut w = Writer {
        out: String::new(),
        opts,
    };
    if !spec.doc.is_empty() {
        w.comment(0, &spec.doc);
        if opts.comments {
            w.line(0, "");
        }
    }
    match &opts.header {
        Some(header) => {
            w.line(0, &format!("{header} {{"));
            w.children(1, &spec.children);
            w.line(0, "}");
        }
        None => w.children(0, &spec.children),
    }
    w.out
}

/// Renders one block spec, header included.
pub fn render_block_example(spec: &BlockSpec, opts: &DocOptions) -> String {
    let mut w = Writer {
        out: String::new(),
        opts,
    };
    w.block(0, spec);
    w.out
}

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn attribute_table<N: SpecNode>(out: &mut String, node: &N) {
    let attrs: Vec<&AttrSpec> = node.attrs().collect();
    if attrs.is_empty() {
        return;
    }
    out.push_str("| Name | Type | Required | Default | Constraints | Description |\n");
    out.push_str("|------|------|----------|---------|-------------|-------------|\n");
    for attr in attrs {
        let default = attr
            .default
            .as_ref()
            .map_or_else(|| "-".to_string(), |d| format!("`{d}`"));
        let notes = constraint_notes(attr);
        out.push_str(&format!(
            "| `{}` | {} | {} | {} | {} | {} |\n",
            attr.name,
            cell(&attr.kind.describe()),
            if attr.is_required() { "yes" } else { "no" },
            cell(&default),
            cell(&if notes.is_empty() { "-".to_string() } else { notes.join("; ") }),
            cell(&attr.doc),
        ));
    }
    out.push('\n');
}

fn block_sections<N: SpecNode>(out: &mut String, node: &N, level: usize) {
    for block in node.blocks() {
        out.push_str(&format!(
            "{} `{}` ({})\n\n",
            "#".repeat(level.min(6)),
            header_text(&block.matcher),
            block.cardinality()
        ));
        if !block.doc.is_empty() {
            out.push_str(&block.doc);
            out.push_str("\n\n");
        }
        attribute_table(out, block);
        block_sections(out, block, level + 1);
    }
}

/// Renders a markdown reference page: description, attribute tables for
/// the root and every nested block, and a fenced example.
pub fn render_markdown(title: &str, spec: &RootSpec) -> String {
    let mut out = format!("# {title}\n\n");
    if !spec.doc.is_empty() {
        out.push_str(&spec.doc);
        out.push_str("\n\n");
    }
    if spec.is_required() {
        out.push_str("This configuration is **required**.\n\n");
    }
    if spec.attrs().next().is_some() {
        out.push_str("## Attributes\n\n");
        attribute_table(&mut out, spec);
    }
    if spec.blocks().next().is_some() {
        out.push_str("## Blocks\n\n");
        block_sections(&mut out, spec, 3);
    }
    let opaque: Vec<&OpaqueSpec> = spec
        .children
        .iter()
        .filter_map(|c| match c {
            Spec::Opaque(o) => Some(o),
            _ => None,
        })
        .collect();
    if !opaque.is_empty() {
        out.push_str("## Pass-through\n\n");
        for o in opaque {
            out.push_str(&format!("- `{}`: {}\n", o.name, cell(&o.doc)));
        }
        out.push('\n');
    }
    out.push_str("## Example\n\n```\n");
    out.push_str(&render_example(spec, &DocOptions::default()));
    out.push_str("```\n");
    out
}
