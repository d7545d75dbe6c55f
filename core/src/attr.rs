//! Attribute specs: one leaf configuration field and its constraints.
//!
//! An [`AttrSpec`] is checked two ways:
//!
//! - [`AttrSpec::validate_value`] checks a user-supplied value at decode time.
//! - [`AttrSpec::validate_spec`] checks the spec itself for authoring
//!   mistakes. It is meant for plugin test suites and for the registry's
//!   load-time self-check, never for end-user input.
//!
//! # Examples
//!
//! ```
//! use blockspec_core::{AttrSpec, Constraints, Value, ValueKind};
//!
//! let spec = AttrSpec::new("title", ValueKind::String)
//!     .with_constraints(Constraints::REQUIRED_NON_NULL)
//!     .with_min_len(3)
//!     .with_example("Quarterly report");
//! assert!(!spec.validate_spec().has_errors());
//!
//! let diags = spec.validate_value(&Value::from("Q3"));
//! assert_eq!(diags.len(), 1);
//! assert!(diags.iter().next().unwrap().detail.contains(">= 3"));
//! ```

use serde::{Deserialize, Serialize};

use crate::constraints::Constraints;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::value::{Value, ValueKind, format_number, is_identifier};

/// Description of a single attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttrSpec {
    /// Attribute name as written in configuration.
    pub name: String,
    /// Expected shape of the value.
    pub kind: ValueKind,
    /// Value used when the attribute is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Value shown in generated documentation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    /// Documentation text.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub doc: String,
    /// Requirement flags.
    #[serde(default, skip_serializing_if = "no_constraints")]
    pub constraints: Constraints,
    /// Closed set of allowed literals (empty = unrestricted).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<Value>,
    /// Inclusive lower length bound for strings and collections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_len: Option<u64>,
    /// Inclusive upper length bound for strings and collections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_len: Option<u64>,
    /// Inclusive lower bound for numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive upper bound for numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Deprecation note; supplying the attribute produces a warning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,
    /// Value is sensitive and is never logged.
    #[serde(default, skip_serializing_if = "is_false")]
    pub secret: bool,
}

fn no_constraints(c: &Constraints) -> bool {
    c.is_empty()
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl AttrSpec {
    /// Creates an optional attribute of the given kind with no constraints.
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            example: None,
            doc: String::new(),
            constraints: Constraints::NONE,
            one_of: Vec::new(),
            min_len: None,
            max_len: None,
            min: None,
            max: None,
            deprecated: None,
            secret: false,
        }
    }

    /// Sets documentation text.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    /// Sets the default value.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the documentation example.
    pub fn with_example(mut self, value: impl Into<Value>) -> Self {
        self.example = Some(value.into());
        self
    }

    /// Adds constraint flags.
    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints |= constraints;
        self
    }

    /// Shorthand for adding [`Constraints::REQUIRED`].
    pub fn required(self) -> Self {
        self.with_constraints(Constraints::REQUIRED)
    }

    /// Restricts the value to the given literals.
    pub fn with_one_of(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.one_of = values.into_iter().collect();
        self
    }

    /// Sets the inclusive lower length bound.
    pub fn with_min_len(mut self, min: u64) -> Self {
        self.min_len = Some(min);
        self
    }

    /// Sets the inclusive upper length bound.
    pub fn with_max_len(mut self, max: u64) -> Self {
        self.max_len = Some(max);
        self
    }

    /// Sets the inclusive lower numeric bound.
    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    /// Sets the inclusive upper numeric bound.
    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Marks the attribute deprecated.
    pub fn deprecated(mut self, note: impl Into<String>) -> Self {
        self.deprecated = Some(note.into());
        self
    }

    /// Marks the value as sensitive.
    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    /// Returns `true` when [`Constraints::REQUIRED`] is set.
    pub fn is_required(&self) -> bool {
        self.constraints.contains(Constraints::REQUIRED)
    }

    /// Lower length bound after applying the non-empty constraints.
    ///
    /// `NON_EMPTY` raises an absent or zero bound to 1 for non-numeric kinds
    /// and never lowers a declared bound.
    pub fn effective_min_len(&self) -> Option<u64> {
        if self.constraints.requires_non_empty() && !self.kind.is_numeric() {
            Some(self.min_len.unwrap_or(0).max(1))
        } else {
            self.min_len
        }
    }

    fn trims(&self) -> bool {
        self.kind == ValueKind::String && self.constraints.contains(Constraints::TRIMMED_NON_EMPTY)
    }

    /// Applies value normalization implied by the constraints (trimming).
    pub fn normalize(&self, value: Value) -> Value {
        match value {
            Value::String(s) if self.trims() => Value::String(s.trim().to_string()),
            other => other,
        }
    }

    fn measure(&self, value: &Value) -> Option<u64> {
        if !self.kind.has_length() {
            return None;
        }
        let len = match value {
            Value::String(s) if self.trims() => s.trim().chars().count(),
            other => other.length()?,
        };
        Some(len as u64)
    }

    /// Validates a decoded value against this spec.
    ///
    /// Checks are independent and additive; a single value may produce
    /// several diagnostics. Returned diagnostics carry no range.
    pub fn validate_value(&self, value: &Value) -> Diagnostics {
        let mut diags = Diagnostics::new();

        if value.is_null() {
            if self.constraints.contains(Constraints::NON_NULL) {
                diags.push(Diagnostic::error(
                    "Attribute must be non-null",
                    format!("The attribute {:?} must be non-null.", self.name),
                ));
            }
            return diags;
        }

        if let Some(len) = self.measure(value) {
            let lower = self.effective_min_len();
            let upper = self.max_len.map(|u| u as f64);
            if let Some(violation) = check_bounds(len as f64, lower.map(|l| l as f64), upper) {
                if violation.below && lower == Some(1) {
                    diags.push(Diagnostic::error(
                        "Attribute must be non-empty",
                        format!("The attribute {:?} must be non-empty.", self.name),
                    ));
                } else {
                    diags.push(Diagnostic::error(
                        "Attribute length not in range",
                        format!(
                            "The length of the attribute {:?} must be {}, got {len}.",
                            self.name,
                            bounds_phrase(lower, self.max_len).unwrap_or_default()
                        ),
                    ));
                }
            }
        }

        if let (true, Value::Number(n)) = (self.kind.is_numeric(), value) {
            if self.constraints.contains(Constraints::INTEGER) && value.as_integer().is_none() {
                diags.push(Diagnostic::error(
                    "Attribute must be an integer",
                    format!(
                        "The attribute {:?} must be an integer, got {}.",
                        self.name,
                        format_number(*n)
                    ),
                ));
            }
            if check_bounds(*n, self.min, self.max).is_some() {
                diags.push(Diagnostic::error(
                    "Attribute value not in range",
                    format!(
                        "The attribute {:?} must be {}, got {}.",
                        self.name,
                        bounds_phrase(self.min, self.max).unwrap_or_default(),
                        format_number(*n)
                    ),
                ));
            }
        }

        if !self.one_of.is_empty() && !self.allows(value) {
            diags.push(Diagnostic::error(
                "Attribute value not allowed",
                format!(
                    "The attribute {:?} must be one of: {}; got {value}.",
                    self.name,
                    list_literals(&self.one_of)
                ),
            ));
        }

        diags
    }

    /// Compares against the one_of literals as they decode under this kind.
    fn allows(&self, value: &Value) -> bool {
        self.one_of.iter().any(|literal| {
            self.kind
                .conform(literal)
                .is_ok_and(|conformed| self.normalize(conformed) == *value)
        })
    }

    /// Checks the spec for internal consistency.
    ///
    /// Authoring problems are errors, except a required attribute without an
    /// example, which is a warning. When no error is found, the declared
    /// default and example are validated against the spec itself.
    pub fn validate_spec(&self) -> Diagnostics {
        let mut diags = Diagnostics::new();
        let name = &self.name;

        if !is_identifier(name) {
            diags.push(Diagnostic::error(
                "Invalid attribute name",
                format!("{name:?} is not a valid identifier."),
            ));
        }

        if self.is_required() {
            if self.example.is_none() {
                diags.push(Diagnostic::warning(
                    "Missing example for required attribute",
                    format!("The required attribute {name:?} should declare an example value."),
                ));
            }
            if self.default.is_some() {
                diags.push(Diagnostic::error(
                    "Default value specified for required attribute",
                    format!("The attribute {name:?} is required, so its default would never be used."),
                ));
            }
        }

        if self.constraints.contains(Constraints::INTEGER) && !self.kind.is_numeric() {
            diags.push(Diagnostic::error(
                "Integer constraint on non-numeric attribute",
                format!("The attribute {name:?} has kind {} and cannot be an integer.", self.kind),
            ));
        }

        if self.constraints.contains(Constraints::TRIMMED_NON_EMPTY)
            && self.kind != ValueKind::String
        {
            diags.push(Diagnostic::error(
                "Trimming constraint on non-string attribute",
                format!("The attribute {name:?} has kind {} and cannot be trimmed.", self.kind),
            ));
        }

        let has_len_bound = self.min_len.is_some() || self.max_len.is_some();
        let has_value_bound = self.min.is_some() || self.max.is_some();
        if !self.kind.supports_bounds() {
            if has_len_bound || has_value_bound {
                diags.push(Diagnostic::error(
                    "Bounds on unbounded attribute kind",
                    format!("The attribute {name:?} has kind {}, which cannot be bounded.", self.kind),
                ));
            }
        } else if self.kind.is_numeric() {
            if has_len_bound {
                diags.push(Diagnostic::error(
                    "Length bound on numeric attribute",
                    format!("The attribute {name:?} is a number; use min/max instead of min_len/max_len."),
                ));
            }
            for (label, bound) in [("min", self.min), ("max", self.max)] {
                if let Some(b) = bound.filter(|b| !b.is_finite()) {
                    diags.push(Diagnostic::error(
                        "Invalid numeric bound",
                        format!("The {label} bound of {name:?} must be a finite number, got {b}."),
                    ));
                }
            }
            if let (Some(lo), Some(hi)) = (self.min, self.max) {
                if lo > hi {
                    diags.push(Diagnostic::error(
                        "Lower bound exceeds upper bound",
                        format!(
                            "The attribute {name:?} has min {} greater than max {}.",
                            format_number(lo),
                            format_number(hi)
                        ),
                    ));
                } else if self.constraints.contains(Constraints::INTEGER) && lo.ceil() > hi {
                    diags.push(Diagnostic::error(
                        "No integer satisfies the bounds",
                        format!(
                            "The attribute {name:?} must be an integer between {} and {}, \
                             but that range holds none.",
                            format_number(lo),
                            format_number(hi)
                        ),
                    ));
                }
            }
        } else {
            if has_value_bound {
                diags.push(Diagnostic::error(
                    "Value bound on non-numeric attribute",
                    format!(
                        "The attribute {name:?} has kind {}; use min_len/max_len instead of min/max.",
                        self.kind
                    ),
                ));
            }
            if let (Some(lo), Some(hi)) = (self.effective_min_len(), self.max_len) {
                if lo > hi {
                    diags.push(Diagnostic::error(
                        "Lower bound exceeds upper bound",
                        format!("The attribute {name:?} has a minimum length of {lo} but max_len {hi}."),
                    ));
                }
            }
            if let ValueKind::Tuple(elements) = &self.kind {
                let arity = elements.len() as u64;
                let lower = self.effective_min_len();
                if lower.is_some_and(|lo| arity < lo) || self.max_len.is_some_and(|hi| arity > hi) {
                    diags.push(Diagnostic::error(
                        "Tuple arity outside length bounds",
                        format!(
                            "The attribute {name:?} is a tuple of {arity} elements, \
                             but its length must be {}.",
                            bounds_phrase(lower, self.max_len).unwrap_or_default()
                        ),
                    ));
                }
            }
        }

        if self.is_required() && matches!(self.kind, ValueKind::Capsule(_)) {
            diags.push(Diagnostic::warning(
                "Required capsule attribute",
                format!(
                    "The attribute {name:?} holds a host value that configuration text cannot \
                     express; generated examples leave it out."
                ),
            ));
        }

        for literal in &self.one_of {
            if literal.is_null() || self.kind.conform(literal).is_err() {
                diags.push(Diagnostic::error(
                    "Invalid enumeration value",
                    format!("{literal} is not a valid {} for the attribute {name:?}.", self.kind),
                ));
            }
        }

        if diags.has_errors() {
            return diags;
        }

        if let Some(default) = &self.default {
            diags.extend(self.validate_own_value(default, "Invalid default value", "default"));
        }
        if let Some(example) = &self.example {
            diags.extend(self.validate_own_value(example, "Invalid example value", "example"));
        }
        for literal in &self.one_of {
            diags.extend(self.validate_own_value(literal, "Invalid enumeration value", "one_of"));
        }

        diags
    }

    fn validate_own_value(&self, value: &Value, summary: &str, what: &str) -> Diagnostics {
        let conformed = match self.kind.conform(value) {
            Ok(v) => self.normalize(v),
            Err(err) => {
                return Diagnostic::error(
                    summary,
                    format!("{what} value is invalid for its own spec: {err}"),
                )
                .into();
            }
        };
        self.validate_value(&conformed)
            .errors()
            .map(|d| {
                Diagnostic::error(
                    summary,
                    format!("{what} value is invalid for its own spec: {}", d.detail),
                )
            })
            .collect()
    }
}

struct Violation {
    below: bool,
}

fn check_bounds(v: f64, lower: Option<f64>, upper: Option<f64>) -> Option<Violation> {
    if lower.is_some_and(|lo| v < lo) {
        return Some(Violation { below: true });
    }
    if upper.is_some_and(|hi| v > hi) {
        return Some(Violation { below: false });
    }
    None
}

/// Phrases an inclusive range: `exactly N`, `between L and U`, `>= L`, `<= U`.
pub(crate) fn bounds_phrase<T: BoundDisplay>(lower: Option<T>, upper: Option<T>) -> Option<String> {
    match (lower, upper) {
        (Some(lo), Some(hi)) if lo.render() == hi.render() => {
            Some(format!("exactly {}", lo.render()))
        }
        (Some(lo), Some(hi)) => Some(format!("between {} and {}", lo.render(), hi.render())),
        (Some(lo), None) => Some(format!(">= {}", lo.render())),
        (None, Some(hi)) => Some(format!("<= {}", hi.render())),
        (None, None) => None,
    }
}

pub(crate) trait BoundDisplay {
    fn render(&self) -> String;
}

impl BoundDisplay for u64 {
    fn render(&self) -> String {
        self.to_string()
    }
}

impl BoundDisplay for f64 {
    fn render(&self) -> String {
        format_number(*self)
    }
}

pub(crate) fn list_literals(values: &[Value]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
