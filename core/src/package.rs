use serde::{Deserialize, Serialize};

use crate::plugin::{PluginKind, PluginSpec};

/// Serializable bundle of plugin specs used for distribution.
///
/// A package groups the [`PluginSpec`]s of many plugins with version
/// metadata, so a host can load every schema it needs from one file.
///
/// # Examples
///
/// ```
/// use blockspec_core::*;
///
/// let mut package = SpecPackage::new("1.0.0", "2024-01-15T10:30:00Z");
/// package.name = Some("builtin-plugins".into());
/// package.plugins.push(PluginSpec::new(PluginKind::DataSource, "csv"));
/// package.plugins.push(PluginSpec::new(PluginKind::Publisher, "s3"));
///
/// assert_eq!(package.plugin_count(), 2);
/// assert!(package.find(PluginKind::Publisher, "s3").is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecPackage {
    /// Spec contract version (populated from
    /// [`SPEC_CONTRACT_VERSION`](crate::SPEC_CONTRACT_VERSION)).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    /// Package version (semver string).
    pub version: String,
    pub name: Option<String>,
    pub description: Option<String>,
    /// ISO-8601 creation timestamp.
    pub generated_at: String,
    /// SHA-256 of the canonical JSON of `plugins`, hex-encoded.
    pub bundle_hash: Option<String>,
    pub plugins: Vec<PluginSpec>,
}

impl SpecPackage {
    /// Creates a package with required fields.
    pub fn new(version: impl Into<String>, generated_at: impl Into<String>) -> Self {
        Self {
            schema_version: Some(crate::SPEC_CONTRACT_VERSION.to_string()),
            version: version.into(),
            name: None,
            description: None,
            generated_at: generated_at.into(),
            bundle_hash: None,
            plugins: Vec::new(),
        }
    }

    /// Returns the number of plugins in this package.
    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    /// Finds a plugin by kind and name.
    pub fn find(&self, kind: PluginKind, name: &str) -> Option<&PluginSpec> {
        self.plugins
            .iter()
            .find(|p| p.kind == kind && p.name == name)
    }
}
