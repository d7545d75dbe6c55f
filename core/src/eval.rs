//! Expression evaluation against host-supplied bindings.
//!
//! An [`EvalContext`] maps names to [`Value`]s (referenced as traversals such
//! as `vars.region` or `items[0]`) and to [`Function`]s (referenced as calls
//! such as `upper(name)`). Evaluation failures are positional diagnostics.
//!
//! # Examples
//!
//! ```
//! use blockspec_core::{EvalContext, Value, syntax};
//!
//! let ctx = EvalContext::standard().with_variable("env", Value::map([("name", Value::from("prod"))]));
//! let body = syntax::parse("target = upper(env.name)\n", "main.conf").unwrap();
//! let value = body.attributes[0].expr.evaluate(&ctx).unwrap();
//! assert_eq!(value, Value::from("PROD"));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::body::{Expression, Step};
use crate::diagnostics::{Diagnostic, SourceRange};
use crate::value::{Value, quote};

/// A callable binding.
pub trait Function: Send + Sync {
    /// Calls the function with evaluated arguments.
    ///
    /// # Errors
    ///
    /// Returns a message when the arguments are unacceptable.
    fn call(&self, args: &[Value]) -> Result<Value, String>;
}

impl<F> Function for F
where
    F: Fn(&[Value]) -> Result<Value, String> + Send + Sync,
{
    fn call(&self, args: &[Value]) -> Result<Value, String> {
        self(args)
    }
}

/// Variable and function bindings used to resolve expressions.
#[derive(Clone, Default)]
pub struct EvalContext {
    variables: BTreeMap<String, Value>,
    functions: BTreeMap<String, Arc<dyn Function>>,
}

impl fmt::Debug for EvalContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalContext")
            .field("variables", &self.variables)
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl EvalContext {
    /// Creates a context with no bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context with the built-in string and collection functions:
    /// `upper`, `lower`, `trim`, `length`, `join` and `concat`.
    pub fn standard() -> Self {
        Self::new()
            .with_function("upper", |args: &[Value]| -> Result<Value, String> {
                one_string("upper", args).map(|s| Value::from(s.to_uppercase()))
            })
            .with_function("lower", |args: &[Value]| -> Result<Value, String> {
                one_string("lower", args).map(|s| Value::from(s.to_lowercase()))
            })
            .with_function("trim", |args: &[Value]| -> Result<Value, String> {
                one_string("trim", args).map(|s| Value::from(s.trim()))
            })
            .with_function("length", |args: &[Value]| -> Result<Value, String> {
                match args {
                    [value] => value
                        .length()
                        .map(|n| Value::Number(n as f64))
                        .ok_or_else(|| format!("cannot take the length of a {}", value.type_name())),
                    _ => Err(arity("length", 1, args.len())),
                }
            })
            .with_function("join", |args: &[Value]| -> Result<Value, String> {
                match args {
                    [Value::String(sep), Value::List(items)] => {
                        let parts = items
                            .iter()
                            .map(|item| match item {
                                Value::String(s) => Ok(s.clone()),
                                Value::Null => Err("cannot join a null element".to_string()),
                                Value::List(_) | Value::Map(_) | Value::Capsule(_) => {
                                    Err(format!("cannot join a {} element", item.type_name()))
                                }
                                other => Ok(other.to_string()),
                            })
                            .collect::<Result<Vec<_>, _>>()?;
                        Ok(Value::from(parts.join(sep.as_str())))
                    }
                    [_, _] => Err("join expects a separator string and a list".to_string()),
                    _ => Err(arity("join", 2, args.len())),
                }
            })
            .with_function("concat", |args: &[Value]| -> Result<Value, String> {
                let mut out = Vec::new();
                for arg in args {
                    match arg {
                        Value::List(items) => out.extend(items.iter().cloned()),
                        other => {
                            return Err(format!("concat expects lists, got {}", other.type_name()));
                        }
                    }
                }
                Ok(Value::List(out))
            })
    }

    /// Adds or replaces a variable.
    pub fn with_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set_variable(name, value);
        self
    }

    /// Adds or replaces a variable in place.
    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    /// Adds or replaces a function.
    pub fn with_function(mut self, name: impl Into<String>, function: impl Function + 'static) -> Self {
        self.functions.insert(name.into(), Arc::new(function));
        self
    }

    /// Looks up a variable.
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Looks up a function.
    pub fn function(&self, name: &str) -> Option<&dyn Function> {
        self.functions.get(name).map(|f| f.as_ref())
    }
}

fn arity(name: &str, expected: usize, got: usize) -> String {
    format!("{name} expects {expected} argument(s), got {got}")
}

fn one_string<'a>(name: &str, args: &'a [Value]) -> Result<&'a str, String> {
    match args {
        [Value::String(s)] => Ok(s),
        [other] => Err(format!("{name} expects a string, got {}", other.type_name())),
        _ => Err(arity(name, 1, args.len())),
    }
}

impl Expression {
    /// Evaluates the expression.
    ///
    /// # Errors
    ///
    /// Returns a diagnostic pointing at the failing sub-expression for
    /// unknown variables or functions, invalid traversal steps and function
    /// failures.
    pub fn evaluate(&self, ctx: &EvalContext) -> Result<Value, Diagnostic> {
        match self {
            Self::Literal { value, .. } => Ok(value.clone()),
            Self::List { items, .. } => items
                .iter()
                .map(|item| item.evaluate(ctx))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Self::Object { entries, .. } => {
                let mut map = BTreeMap::new();
                for (key, expr) in entries {
                    if map.insert(key.clone(), expr.evaluate(ctx)?).is_some() {
                        return Err(Diagnostic::error(
                            "Duplicate object key",
                            format!("The key {} is defined more than once.", quote(key)),
                        )
                        .with_range(expr.range().clone()));
                    }
                }
                Ok(Value::Map(map))
            }
            Self::Traversal { root, steps, range } => {
                let Some(mut current) = ctx.variable(root) else {
                    return Err(Diagnostic::error(
                        "Unknown variable",
                        format!("There is no variable named {root:?}."),
                    )
                    .with_range(range.clone()));
                };
                for step in steps {
                    current = apply_step(current, step, range)?;
                }
                Ok(current.clone())
            }
            Self::Call { name, args, range } => {
                let Some(function) = ctx.function(name) else {
                    return Err(Diagnostic::error(
                        "Call to unknown function",
                        format!("There is no function named {name:?}."),
                    )
                    .with_range(range.clone()));
                };
                let values = args
                    .iter()
                    .map(|arg| arg.evaluate(ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                function.call(&values).map_err(|err| {
                    Diagnostic::error(
                        "Error in function call",
                        format!("Call to function {name:?} failed: {err}."),
                    )
                    .with_range(range.clone())
                })
            }
        }
    }
}

fn apply_step<'a>(current: &'a Value, step: &Step, range: &SourceRange) -> Result<&'a Value, Diagnostic> {
    let found = match (current, step) {
        (Value::Map(entries), Step::Attr(key)) => entries.get(key).ok_or_else(|| {
            Diagnostic::error(
                "Unsupported attribute",
                format!("This object does not have an attribute named {key:?}."),
            )
        }),
        (Value::Map(entries), Step::Index(Value::String(key))) => entries.get(key).ok_or_else(|| {
            Diagnostic::error(
                "Invalid index",
                format!("The given key {} does not identify an element in this map.", quote(key)),
            )
        }),
        (Value::List(items), Step::Index(index)) => index
            .as_integer()
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| items.get(i))
            .ok_or_else(|| {
                Diagnostic::error(
                    "Invalid index",
                    format!(
                        "The index {index} is not valid for a list of {} elements.",
                        items.len()
                    ),
                )
            }),
        (other, Step::Attr(key)) => Err(Diagnostic::error(
            "Unsupported attribute",
            format!("Cannot access attribute {key:?} on a {} value.", other.type_name()),
        )),
        (other, Step::Index(_)) => Err(Diagnostic::error(
            "Invalid index",
            format!("A {} value cannot be indexed.", other.type_name()),
        )),
    };
    found.map_err(|diag| diag.with_range(range.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    fn eval(source: &str, ctx: &EvalContext) -> Result<Value, Diagnostic> {
        let body = parse(&format!("v = {source}\n"), "test.conf").unwrap();
        body.attributes[0].expr.evaluate(ctx)
    }

    #[test]
    fn test_traversal_steps() {
        let ctx = EvalContext::new().with_variable(
            "data",
            Value::map([(
                "rows",
                Value::list([Value::map([("id", Value::from(7))])]),
            )]),
        );
        assert_eq!(eval("data.rows[0].id", &ctx).unwrap(), Value::from(7));
        assert_eq!(eval("data[\"rows\"][0][\"id\"]", &ctx).unwrap(), Value::from(7));

        let err = eval("data.rows[3]", &ctx).unwrap_err();
        assert_eq!(err.summary, "Invalid index");
        assert!(err.range.is_some());

        let err = eval("data.missing", &ctx).unwrap_err();
        assert_eq!(err.summary, "Unsupported attribute");
    }

    #[test]
    fn test_unknown_names() {
        let ctx = EvalContext::new();
        assert_eq!(eval("nope", &ctx).unwrap_err().summary, "Unknown variable");
        assert_eq!(eval("nope(1)", &ctx).unwrap_err().summary, "Call to unknown function");
    }

    #[test]
    fn test_standard_functions() {
        let ctx = EvalContext::standard();
        assert_eq!(eval("lower(\"ABC\")", &ctx).unwrap(), Value::from("abc"));
        assert_eq!(eval("trim(\"  x \")", &ctx).unwrap(), Value::from("x"));
        assert_eq!(eval("length([1, 2, 3])", &ctx).unwrap(), Value::from(3));
        assert_eq!(eval("join(\"-\", [\"a\", 1, true])", &ctx).unwrap(), Value::from("a-1-true"));
        assert_eq!(
            eval("concat([1], [2, 3])", &ctx).unwrap(),
            Value::list([1, 2, 3].map(Value::from))
        );
        let err = eval("upper(1)", &ctx).unwrap_err();
        assert_eq!(err.summary, "Error in function call");
        assert!(err.detail.contains("expects a string"));
    }

    #[test]
    fn test_closures_are_functions() {
        let ctx = EvalContext::new().with_function("answer", |_: &[Value]| -> Result<Value, String> {
            Ok(Value::from(42))
        });
        assert_eq!(eval("answer()", &ctx).unwrap(), Value::from(42));
    }

    #[test]
    fn test_object_keys_must_be_unique() {
        let err = eval("{ a = 1, a = 2 }", &EvalContext::new()).unwrap_err();
        assert_eq!(err.summary, "Duplicate object key");
    }
}
