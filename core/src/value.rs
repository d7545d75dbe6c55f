//! Decoded values and the value kinds attribute specs declare.
//!
//! [`Value`] is the tagged union every evaluated expression produces and every
//! decoded attribute holds. [`ValueKind`] is the closed set of shapes a spec
//! may ask for; [`ValueKind::conform`] performs the small set of implicit
//! conversions the configuration language allows.

use std::collections::BTreeMap;
use std::fmt::{self, Write};

use serde::{Deserialize, Serialize};

/// Opaque host value carried through decoding untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Capsule {
    /// Capsule kind name; must match [`ValueKind::Capsule`].
    pub kind: String,
    /// Host payload.
    pub data: serde_json::Value,
}

/// A configuration value.
///
/// Serializes through [`serde_json::Value`]; capsules serialize as their
/// payload and never deserialize back into a capsule.
///
/// # Examples
///
/// ```
/// use blockspec_core::Value;
///
/// let v = Value::list([Value::from(1), Value::from("two")]);
/// assert_eq!(v.to_string(), r#"[1, "two"]"#);
/// assert_eq!(v.length(), Some(2));
/// assert_eq!(Value::from(3.0).as_integer(), Some(3));
/// assert_eq!(Value::from(3.5).as_integer(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
    /// Absent or explicit `null`.
    #[default]
    Null,
    /// `true` / `false`.
    Bool(bool),
    /// Any number; integers are numbers with no fractional part.
    Number(f64),
    /// UTF-8 string.
    String(String),
    /// Ordered sequence (lists and tuples).
    List(Vec<Value>),
    /// String-keyed map, ordered by key.
    Map(BTreeMap<String, Value>),
    /// Opaque host value.
    Capsule(Capsule),
}

impl Value {
    /// Builds a list value.
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Self::List(items.into_iter().collect())
    }

    /// Builds a map value.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the string content, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number, if this is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the boolean, if this is a bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the number as an `i64` only when it is exactly integral.
    ///
    /// No truncation or rounding is applied: `2.0` converts, `2.5` and
    /// values outside the `i64` range do not.
    pub fn as_integer(&self) -> Option<i64> {
        let n = self.as_f64()?;
        exact_integer(n)
    }

    /// Length of strings (Unicode code points) and collections (elements).
    ///
    /// `None` for scalars, capsules and null.
    pub fn length(&self) -> Option<usize> {
        match self {
            Self::String(s) => Some(s.chars().count()),
            Self::List(items) => Some(items.len()),
            Self::Map(entries) => Some(entries.len()),
            _ => None,
        }
    }

    /// Short name of the value's shape, used in type errors.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Capsule(c) => &c.kind,
        }
    }
}

pub(crate) fn exact_integer(n: f64) -> Option<i64> {
    // 2^63 is exactly representable; anything at or above it overflows i64.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if !n.is_finite() || n.fract() != 0.0 || n >= LIMIT || n < -LIMIT {
        return None;
    }
    Some(n as i64)
}

/// Formats a number the way the configuration language writes it.
pub(crate) fn format_number(n: f64) -> String {
    match exact_integer(n) {
        Some(i) if i.unsigned_abs() < 1_000_000_000_000_000 => i.to_string(),
        _ => n.to_string(),
    }
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

pub(crate) fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

impl fmt::Display for Value {
    /// Renders the value as a configuration-language literal.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::String(s) => f.write_str(&quote(s)),
            Self::List(items) => {
                f.write_char('[')?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_char(']')
            }
            Self::Map(entries) => {
                if entries.is_empty() {
                    return f.write_str("{}");
                }
                f.write_str("{ ")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    if is_identifier(key) {
                        write!(f, "{key} = {value}")?;
                    } else {
                        write!(f, "{} = {value}", quote(key))?;
                    }
                }
                f.write_str(" }")
            }
            Self::Capsule(c) => write!(f, "<{}>", c.kind),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Self::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match exact_integer(n) {
                Some(i) => Self::from(i),
                None => serde_json::Number::from_f64(n).map_or(Self::Null, Self::Number),
            },
            Value::String(s) => Self::String(s),
            Value::List(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Map(entries) => Self::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Self::from(v)))
                    .collect(),
            ),
            Value::Capsule(c) => c.data,
        }
    }
}

/// The shape an attribute value must have.
///
/// Serialized externally tagged: `"string"`, `{"list": "number"}`,
/// `{"tuple": ["string", "bool"]}`, `{"capsule": "jq_query"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// UTF-8 string.
    String,
    /// Number (integral or not).
    Number,
    /// Boolean.
    Bool,
    /// Homogeneous list.
    List(Box<ValueKind>),
    /// String-keyed map with homogeneous values.
    Map(Box<ValueKind>),
    /// Fixed-arity heterogeneous sequence.
    Tuple(Vec<ValueKind>),
    /// Opaque host value of the named kind.
    Capsule(String),
}

impl ValueKind {
    /// Shorthand for `List(Box::new(element))`.
    pub fn list(element: ValueKind) -> Self {
        Self::List(Box::new(element))
    }

    /// Shorthand for `Map(Box::new(element))`.
    pub fn map(element: ValueKind) -> Self {
        Self::Map(Box::new(element))
    }

    /// Returns `true` for [`ValueKind::Number`].
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Number)
    }

    /// Returns `true` for kinds that have a length (strings and collections).
    pub fn has_length(&self) -> bool {
        matches!(
            self,
            Self::String | Self::List(_) | Self::Map(_) | Self::Tuple(_)
        )
    }

    /// Returns `true` for kinds on which a bound is meaningful.
    pub fn supports_bounds(&self) -> bool {
        !matches!(self, Self::Bool | Self::Capsule(_))
    }

    /// Human-readable description, e.g. `list of number`.
    pub fn describe(&self) -> String {
        match self {
            Self::String => "string".to_string(),
            Self::Number => "number".to_string(),
            Self::Bool => "bool".to_string(),
            Self::List(element) => format!("list of {}", element.describe()),
            Self::Map(element) => format!("map of {}", element.describe()),
            Self::Tuple(elements) => {
                let parts: Vec<String> = elements.iter().map(ValueKind::describe).collect();
                format!("tuple [{}]", parts.join(", "))
            }
            Self::Capsule(name) => name.clone(),
        }
    }

    /// Converts `value` to this kind, applying the implicit conversions the
    /// configuration language allows.
    ///
    /// Null always conforms. Strings accept numbers and bools, numbers accept
    /// numeric strings, bools accept `"true"`/`"false"`; collections conform
    /// element-wise.
    ///
    /// # Errors
    ///
    /// Returns a message describing the expected shape when no conversion
    /// applies.
    ///
    /// # Examples
    ///
    /// ```
    /// use blockspec_core::{Value, ValueKind};
    ///
    /// assert_eq!(ValueKind::Number.conform(&Value::from("42")), Ok(Value::from(42)));
    /// assert_eq!(ValueKind::String.conform(&Value::from(true)), Ok(Value::from("true")));
    /// assert!(ValueKind::Bool.conform(&Value::from("yes")).is_err());
    /// ```
    pub fn conform(&self, value: &Value) -> Result<Value, String> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match (self, value) {
            (Self::String, Value::String(_)) => Ok(value.clone()),
            (Self::String, Value::Number(n)) => Ok(Value::String(format_number(*n))),
            (Self::String, Value::Bool(b)) => Ok(Value::String(b.to_string())),
            (Self::Number, Value::Number(_)) => Ok(value.clone()),
            (Self::Number, Value::String(s)) => match s.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(Value::Number(n)),
                _ => Err(format!("a number is required, got string {}", quote(s))),
            },
            (Self::Bool, Value::Bool(_)) => Ok(value.clone()),
            (Self::Bool, Value::String(s)) if s == "true" || s == "false" => {
                Ok(Value::Bool(s == "true"))
            }
            (Self::List(element), Value::List(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    element
                        .conform(item)
                        .map_err(|err| format!("element {i}: {err}"))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            (Self::Map(element), Value::Map(entries)) => entries
                .iter()
                .map(|(key, item)| {
                    element
                        .conform(item)
                        .map(|v| (key.clone(), v))
                        .map_err(|err| format!("key {}: {err}", quote(key)))
                })
                .collect::<Result<BTreeMap<_, _>, _>>()
                .map(Value::Map),
            (Self::Tuple(elements), Value::List(items)) => {
                if elements.len() != items.len() {
                    return Err(format!(
                        "a tuple of {} elements is required, got {}",
                        elements.len(),
                        items.len()
                    ));
                }
                elements
                    .iter()
                    .zip(items)
                    .enumerate()
                    .map(|(i, (kind, item))| {
                        kind.conform(item)
                            .map_err(|err| format!("element {i}: {err}"))
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::List)
            }
            (Self::Capsule(name), Value::Capsule(c)) if &c.kind == name => Ok(value.clone()),
            _ => Err(format!(
                "{} is required, got {}",
                self.article(),
                value.type_name()
            )),
        }
    }

    fn article(&self) -> String {
        match self {
            Self::String => "a string".to_string(),
            Self::Number => "a number".to_string(),
            Self::Bool => "a bool".to_string(),
            Self::List(_) | Self::Map(_) | Self::Tuple(_) => format!("a {}", self.describe()),
            Self::Capsule(name) => format!("a {name} value"),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}
