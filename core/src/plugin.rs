//! Plugin spec descriptions.
//!
//! A [`PluginSpec`] is what a plugin publishes about itself: its kind, its
//! name and the root specs for its configuration block and its invocation
//! arguments. Plugin specs are serde types so they can be authored as JSON
//! or YAML files and bundled into a [`SpecPackage`](crate::SpecPackage).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::block::RootSpec;
use crate::diagnostics::Diagnostics;

/// Version of the spec file contract (semver).
///
/// Embedded in every [`SpecPackage`](crate::SpecPackage) to track
/// compatibility of bundled spec files.
pub const SPEC_CONTRACT_VERSION: &str = "1.0.0";

/// Role a plugin plays in document generation.
///
/// # Examples
///
/// ```
/// use blockspec_core::PluginKind;
///
/// let kind: PluginKind = "data-source".parse().unwrap();
/// assert_eq!(kind, PluginKind::DataSource);
/// assert_eq!(kind.to_string(), "data_source");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginKind {
    /// Fetches data that content can refer to.
    DataSource,
    /// Produces document content.
    ContentProvider,
    /// Writes the finished document somewhere.
    Publisher,
}

impl PluginKind {
    /// All kinds, in documentation order.
    pub const ALL: [PluginKind; 3] = [Self::DataSource, Self::ContentProvider, Self::Publisher];

    /// snake_case name used in spec files and plugin ids.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DataSource => "data_source",
            Self::ContentProvider => "content_provider",
            Self::Publisher => "publisher",
        }
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluginKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('-', "_").as_str() {
            "data_source" => Ok(Self::DataSource),
            "content_provider" => Ok(Self::ContentProvider),
            "publisher" => Ok(Self::Publisher),
            _ => Err(format!(
                "unknown plugin kind '{s}' (expected data_source, content_provider or publisher)"
            )),
        }
    }
}

/// Which of a plugin's two specs is meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    /// The plugin's configuration block.
    Config,
    /// Per-invocation arguments.
    Args,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => f.write_str("config"),
            Self::Args => f.write_str("args"),
        }
    }
}

/// Published description of one plugin.
///
/// # Examples
///
/// ```
/// use blockspec_core::*;
///
/// let plugin = PluginSpec::new(PluginKind::DataSource, "csv")
///     .with_doc("Reads rows from a CSV file.")
///     .with_config(RootSpec::new().with_attr(
///         AttrSpec::new("path", ValueKind::String).required().with_example("people.csv"),
///     ));
///
/// assert_eq!(plugin.id(), "data_source/csv");
/// assert!(plugin.section(Section::Config).unwrap().is_required());
/// assert!(plugin.section(Section::Args).is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginSpec {
    /// Plugin name, unique per kind.
    pub name: String,
    pub kind: PluginKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub doc: String,
    /// Spec of the configuration block, if the plugin takes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<RootSpec>,
    /// Spec of the invocation arguments, if the plugin takes any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<RootSpec>,
}

impl PluginSpec {
    /// Creates a plugin spec with neither config nor args.
    pub fn new(kind: PluginKind, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            doc: String::new(),
            config: None,
            args: None,
        }
    }

    /// Sets documentation text.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    /// Sets the configuration spec.
    pub fn with_config(mut self, spec: RootSpec) -> Self {
        self.config = Some(spec);
        self
    }

    /// Sets the arguments spec.
    pub fn with_args(mut self, spec: RootSpec) -> Self {
        self.args = Some(spec);
        self
    }

    /// `kind/name` identifier.
    pub fn id(&self) -> String {
        format!("{}/{}", self.kind, self.name)
    }

    /// Returns the spec of one section.
    pub fn section(&self, section: Section) -> Option<&RootSpec> {
        match section {
            Section::Config => self.config.as_ref(),
            Section::Args => self.args.as_ref(),
        }
    }

    /// Iterates over the sections the plugin declares.
    pub fn sections(&self) -> impl Iterator<Item = (Section, &RootSpec)> {
        [Section::Config, Section::Args]
            .into_iter()
            .filter_map(|s| self.section(s).map(|spec| (s, spec)))
    }

    /// Self-checks every declared section.
    pub fn validate_spec(&self) -> Vec<(Section, Diagnostics)> {
        self.sections()
            .map(|(section, spec)| (section, spec.validate_spec()))
            .filter(|(_, diags)| !diags.is_empty())
            .collect()
    }
}

/// Parses a `kind/name` plugin id.
///
/// # Errors
///
/// Returns a message when the id has no `/` or the kind is unknown.
pub fn parse_plugin_id(id: &str) -> Result<(PluginKind, String), String> {
    let Some((kind, name)) = id.split_once('/') else {
        return Err(format!("invalid plugin id '{id}' (expected kind/name)"));
    };
    if name.trim().is_empty() {
        return Err(format!("invalid plugin id '{id}' (empty name)"));
    }
    Ok((kind.parse()?, name.to_string()))
}
