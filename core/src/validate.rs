//! Plugin and package validation.
//!
//! Checks the structural invariants of plugin specs and spec packages:
//! names are present, no plugin is published twice, and every declared
//! config or args spec passes its own `validate_spec` without errors.
//! Spec warnings are not validation errors; callers that care read them
//! from [`PluginSpec::validate_spec`](crate::PluginSpec::validate_spec).
//!
//! # Examples
//!
//! ```
//! use blockspec_core::*;
//!
//! let plugin = PluginSpec::new(PluginKind::Publisher, "s3").with_config(
//!     RootSpec::new().with_attr(AttrSpec::new("bucket", ValueKind::String).required().with_example("docs")),
//! );
//! assert!(validate_plugin(&plugin).is_empty());
//!
//! // Invalid: a length bound on a bool attribute
//! let bad = PluginSpec::new(PluginKind::Publisher, "s3").with_config(
//!     RootSpec::new().with_attr(AttrSpec::new("public", ValueKind::Bool).with_max_len(1)),
//! );
//! assert!(!validate_plugin(&bad).is_empty());
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::plugin::{PluginSpec, Section};
use crate::{PluginKind, SpecPackage};

/// Plugin/package validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Package version string is empty.
    #[error("package version cannot be empty")]
    EmptyPackageVersion,
    /// Plugin name is empty or whitespace-only.
    #[error("plugin name cannot be empty")]
    EmptyPluginName,
    /// Two plugins in the same package share kind and name.
    #[error("duplicate plugin in package: {0}")]
    DuplicatePlugin(String),
    /// A config or args spec fails its own self-check.
    #[error("invalid {section} spec for {plugin}: {message}")]
    InvalidSpec {
        plugin: String,
        section: Section,
        message: String,
    },
}

/// Validates a full spec package.
///
/// Checks for an empty version string and duplicate plugins, and validates
/// each plugin individually.
///
/// # Examples
///
/// ```
/// use blockspec_core::*;
///
/// let mut package = SpecPackage::new("1.0.0", "2024-01-01T00:00:00Z");
/// package.plugins.push(PluginSpec::new(PluginKind::DataSource, "csv"));
/// assert!(validate_package(&package).is_empty());
///
/// package.plugins.push(PluginSpec::new(PluginKind::DataSource, "csv"));
/// let errors = validate_package(&package);
/// assert!(errors.iter().any(|e| matches!(e, ValidationError::DuplicatePlugin(_))));
/// ```
pub fn validate_package(package: &SpecPackage) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if package.version.trim().is_empty() {
        errors.push(ValidationError::EmptyPackageVersion);
        return errors;
    }

    let mut seen: HashSet<(PluginKind, &str)> = HashSet::new();
    for plugin in &package.plugins {
        if !seen.insert((plugin.kind, plugin.name.as_str())) {
            errors.push(ValidationError::DuplicatePlugin(plugin.id()));
            continue;
        }
        errors.extend(validate_plugin(plugin));
    }

    errors
}

/// Validates one plugin spec.
pub fn validate_plugin(plugin: &PluginSpec) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if plugin.name.trim().is_empty() {
        errors.push(ValidationError::EmptyPluginName);
        return errors;
    }

    for (section, diags) in plugin.validate_spec() {
        errors.extend(diags.errors().map(|diag| ValidationError::InvalidSpec {
            plugin: plugin.id(),
            section,
            message: diag.to_string(),
        }));
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AttrSpec, BlockSpec, NameMatcher, RootSpec, ValueKind};

    #[test]
    fn test_empty_version() {
        let package = SpecPackage::new("  ", "2024-01-01T00:00:00Z");
        assert_eq!(validate_package(&package), vec![ValidationError::EmptyPackageVersion]);
    }

    #[test]
    fn test_empty_plugin_name() {
        let plugin = PluginSpec::new(PluginKind::Publisher, " ");
        assert_eq!(validate_plugin(&plugin), vec![ValidationError::EmptyPluginName]);
    }

    #[test]
    fn test_same_name_different_kind_is_allowed() {
        let mut package = SpecPackage::new("1.0.0", "2024-01-01T00:00:00Z");
        package.plugins.push(PluginSpec::new(PluginKind::DataSource, "file"));
        package.plugins.push(PluginSpec::new(PluginKind::Publisher, "file"));
        assert!(validate_package(&package).is_empty());
    }

    #[test]
    fn test_nested_spec_errors_name_section() {
        let plugin = PluginSpec::new(PluginKind::ContentProvider, "table").with_args(
            RootSpec::new().with_block(
                BlockSpec::new(NameMatcher::exact("column", &[]))
                    .with_attr(AttrSpec::new("width", ValueKind::Number).with_min(5.0).with_max(1.0)),
            ),
        );
        let errors = validate_plugin(&plugin);
        assert_eq!(errors.len(), 1);
        let message = errors[0].to_string();
        assert!(message.starts_with("invalid args spec for content_provider/table:"), "{message}");
        assert!(message.contains("Lower bound exceeds upper bound"));
    }

    #[test]
    fn test_spec_warnings_are_not_errors() {
        let plugin = PluginSpec::new(PluginKind::DataSource, "sql")
            .with_config(RootSpec::new().with_attr(AttrSpec::new("query", ValueKind::String).required()));
        assert!(validate_plugin(&plugin).is_empty());
    }
}
