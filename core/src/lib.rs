//! Declarative schemas for block-structured plugin configuration.
//!
//! Plugins of a document generator describe their configuration block and
//! their invocation arguments with specs; this crate checks user-written
//! configuration against those specs and renders reference documentation
//! from the same objects:
//!
//! - [`AttrSpec`], [`BlockSpec`], [`OpaqueSpec`] and [`RootSpec`] describe
//!   attributes, nested blocks and pass-through children.
//! - [`Constraints`] holds requirement flags such as
//!   [`Constraints::REQUIRED_MEANINGFUL`].
//! - [`syntax::parse`] turns configuration text into a [`Body`].
//! - [`decode`] checks a body against a spec and returns a [`DecodedBlock`]
//!   together with [`Diagnostics`].
//! - [`render_example`] and [`render_markdown`] document a spec.
//! - [`PluginSpec`] and [`SpecPackage`] bundle specs for distribution;
//!   [`validate_package`] catches authoring mistakes.
//!
//! # Example
//!
//! ```
//! use blockspec_core::*;
//!
//! let spec = RootSpec::new()
//!     .with_attr(
//!         AttrSpec::new("bucket", ValueKind::String)
//!             .with_constraints(Constraints::REQUIRED_MEANINGFUL)
//!             .with_example("docs-site"),
//!     )
//!     .with_block(
//!         BlockSpec::new(NameMatcher::labeled("route", 1))
//!             .repeatable()
//!             .with_attr(AttrSpec::new("cache", ValueKind::Bool).with_default(true)),
//!     );
//! assert!(!spec.validate_spec().has_errors());
//!
//! let source = r#"
//! bucket = "reports"
//! route "index" {}
//! route "archive" { cache = false }
//! "#;
//! let body = syntax::parse(source, "publish.conf").unwrap();
//! let decoded = decode(&body, &spec, &EvalContext::new()).into_result().unwrap();
//!
//! let routes = NameMatcher::labeled("route", 1);
//! assert_eq!(decoded.get_str("bucket"), Some("reports"));
//! assert_eq!(decoded.blocks(&routes).count(), 2);
//! assert_eq!(decoded.blocks(&routes).last().unwrap().get_bool("cache"), Some(false));
//!
//! // The generated example decodes cleanly against the same spec.
//! let example = render_example(&spec, &DocOptions::default());
//! let body = syntax::parse(&example, "example.conf").unwrap();
//! assert!(!decode(&body, &spec, &EvalContext::new()).has_errors());
//! ```

mod attr;
mod block;
mod body;
mod constraints;
mod decode;
mod diagnostics;
mod docs;
mod eval;
mod package;
mod plugin;
pub mod syntax;
mod validate;
mod value;

pub use attr::AttrSpec;
pub use block::{BlockSpec, NameMatcher, OpaqueSpec, RootSpec, Spec, SpecNode};
pub use body::{Attribute, Block, Body, Expression, Step};
pub use constraints::{Constraint, Constraints};
pub use decode::{Decoded, DecodedAttr, DecodedBlock, decode, decode_block, decode_optional};
pub use diagnostics::{Diagnostic, Diagnostics, Pos, Severity, SourceRange};
pub use docs::{DocOptions, render_block_example, render_example, render_markdown};
pub use eval::{EvalContext, Function};
pub use package::SpecPackage;
pub use plugin::{PluginKind, PluginSpec, SPEC_CONTRACT_VERSION, Section, parse_plugin_id};
pub use syntax::SyntaxError;
pub use validate::{ValidationError, validate_package, validate_plugin};
pub use value::{Capsule, Value, ValueKind};
