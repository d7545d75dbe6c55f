//! Plugin spec registry loading with builder pattern and fallback chains.
//!
//! Provides [`SpecRegistry`] for in-memory plugin spec lookup and
//! [`RegistryBuilder`] for constructing a registry from multiple sources,
//! either as a fallback chain or merged.
//!
//! # Loading patterns
//!
//! ```no_run
//! use blockspec_core::PluginKind;
//! use blockspec_registry::SpecRegistry;
//!
//! // Load from a directory of JSON/YAML spec files
//! let registry = SpecRegistry::from_dir("specs/").unwrap();
//! assert!(registry.get(PluginKind::DataSource, "csv").is_some());
//!
//! // Load from a single hashed SpecPackage bundle
//! let registry = SpecRegistry::from_bundle("specs.bundle.json").unwrap();
//!
//! // Use the builder for a fallback chain
//! let registry = SpecRegistry::builder()
//!     .from_dir("specs/")
//!     .from_bundle("specs.bundle.json")
//!     .build()
//!     .unwrap();
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use blockspec_core::{PluginKind, PluginSpec, ValidationError, parse_plugin_id};
use tracing::debug;

use crate::bundle::read_package;
use crate::error::{RegistryError, Result};
use crate::files::{check_plugin, collect_spec_paths, load_spec_files};

/// Describes where a [`SpecRegistry`] was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrySource {
    /// A directory of individual spec files.
    Directory(PathBuf),
    /// A single [`SpecPackage`](blockspec_core::SpecPackage) JSON file.
    Bundle(PathBuf),
    /// Built in memory.
    Memory,
    /// Several sources, via a builder.
    Multiple(Vec<RegistrySource>),
}

impl RegistrySource {
    /// Directory for an existing directory path, bundle otherwise.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.is_dir() {
            Self::Directory(path)
        } else {
            Self::Bundle(path)
        }
    }

    fn load(&self) -> Result<SpecRegistry> {
        match self {
            Self::Directory(path) => SpecRegistry::from_dir(path),
            Self::Bundle(path) => SpecRegistry::from_bundle(path),
            Self::Memory | Self::Multiple(_) => Err(RegistryError::NoSourcesAvailable),
        }
    }
}

type PluginKey = (PluginKind, String);

/// In-memory collection of plugin specs with O(1) lookup by kind and name.
///
/// Every plugin passes its self-check before it is inserted.
///
/// # Examples
///
/// ```
/// use blockspec_core::{PluginKind, PluginSpec};
/// use blockspec_registry::SpecRegistry;
///
/// let mut registry = SpecRegistry::new();
/// registry.insert(PluginSpec::new(PluginKind::Publisher, "s3")).unwrap();
///
/// assert_eq!(registry.len(), 1);
/// assert!(registry.find("publisher/s3").is_some());
/// assert!(registry.get(PluginKind::DataSource, "s3").is_none());
/// ```
#[derive(Debug)]
pub struct SpecRegistry {
    plugins: HashMap<PluginKey, PluginSpec>,
    source: RegistrySource,
}

impl Default for SpecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SpecRegistry {
    /// Creates an empty in-memory registry.
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
            source: RegistrySource::Memory,
        }
    }

    /// Returns a new [`RegistryBuilder`].
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Loads every `*.json`, `*.yaml` and `*.yml` file of a directory, each
    /// holding one plugin spec.
    ///
    /// # Errors
    ///
    /// Returns I/O and parse errors, [`RegistryError::InvalidSpec`] when a
    /// spec fails its self-check or two files define the same plugin.
    pub fn from_dir(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(RegistryError::InvalidInput(format!(
                "'{}' is not a directory",
                path.display()
            )));
        }
        let files = collect_spec_paths(&[path.to_path_buf()])?;
        let mut registry = Self::new();
        registry.source = RegistrySource::Directory(path.to_path_buf());
        for plugin in load_spec_files(&files)? {
            registry.add_checked(plugin, &path.display().to_string())?;
        }
        debug!(path = %path.display(), plugins = registry.len(), "loaded spec directory");
        Ok(registry)
    }

    /// Loads a hashed [`SpecPackage`](blockspec_core::SpecPackage) bundle.
    ///
    /// # Errors
    ///
    /// Returns I/O and JSON errors, [`RegistryError::InvalidChecksum`] when
    /// the recorded hash does not match, or [`RegistryError::InvalidSpec`].
    pub fn from_bundle(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let package = read_package(path)?;
        let origin = path.display().to_string();

        let mut registry = Self::new();
        registry.source = RegistrySource::Bundle(path.to_path_buf());
        for plugin in package.plugins {
            check_plugin(&plugin, &origin)?;
            registry.add_checked(plugin, &origin)?;
        }
        debug!(path = %origin, plugins = registry.len(), "loaded spec bundle");
        Ok(registry)
    }

    fn add_checked(&mut self, plugin: PluginSpec, origin: &str) -> Result<()> {
        let key = (plugin.kind, plugin.name.clone());
        if self.plugins.contains_key(&key) {
            return Err(RegistryError::InvalidSpec {
                origin: origin.to_string(),
                message: ValidationError::DuplicatePlugin(plugin.id()).to_string(),
            });
        }
        self.plugins.insert(key, plugin);
        Ok(())
    }

    /// Self-checks and inserts a plugin.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidSpec`] if the plugin fails its
    /// self-check or is already registered.
    pub fn insert(&mut self, plugin: PluginSpec) -> Result<()> {
        check_plugin(&plugin, "memory")?;
        self.add_checked(plugin, "memory")
    }

    /// Moves every plugin of `other` into this registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidSpec`] on the first plugin that is
    /// already registered.
    pub fn merge(&mut self, other: SpecRegistry) -> Result<()> {
        let origin = format!("{:?}", other.source);
        for plugin in other.plugins.into_values() {
            self.add_checked(plugin, &origin)?;
        }
        Ok(())
    }

    /// Looks up a plugin by kind and name.
    pub fn get(&self, kind: PluginKind, name: &str) -> Option<&PluginSpec> {
        self.plugins.get(&(kind, name.to_string()))
    }

    /// Looks up a plugin by `kind/name` id.
    pub fn find(&self, id: &str) -> Option<&PluginSpec> {
        let (kind, name) = parse_plugin_id(id).ok()?;
        self.get(kind, &name)
    }

    /// Returns `true` if the registry holds the plugin.
    pub fn contains(&self, kind: PluginKind, name: &str) -> bool {
        self.get(kind, name).is_some()
    }

    /// Plugins ordered by kind, then name.
    pub fn plugins(&self) -> Vec<&PluginSpec> {
        let mut plugins: Vec<&PluginSpec> = self.plugins.values().collect();
        plugins.sort_by(|a, b| (a.kind, &a.name).cmp(&(b.kind, &b.name)));
        plugins
    }

    /// Returns the number of plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns `true` if the registry holds no plugin.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Returns a reference to the source metadata.
    pub fn source(&self) -> &RegistrySource {
        &self.source
    }
}

/// Builder for constructing a [`SpecRegistry`] from several sources.
///
/// [`build`](Self::build) treats the sources as a fallback chain: the first
/// source that loads wins. [`merge_all`](Self::merge_all) loads every source
/// and combines them.
///
/// # Example
///
/// ```no_run
/// use blockspec_registry::SpecRegistry;
///
/// let registry = SpecRegistry::builder()
///     .from_dir("/opt/blockspec/specs/")
///     .from_bundle("/opt/blockspec/specs.bundle.json")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    sources: Vec<RegistrySource>,
}

impl RegistryBuilder {
    /// Creates a builder with no sources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directory of spec files.
    pub fn from_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(RegistrySource::Directory(path.into()));
        self
    }

    /// Adds a bundle file.
    pub fn from_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(RegistrySource::Bundle(path.into()));
        self
    }

    /// Adds a source.
    pub fn with_source(mut self, source: RegistrySource) -> Self {
        self.sources.push(source);
        self
    }

    /// Returns the first source that loads successfully.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NoSourcesAvailable`] if every source fails
    /// or none was added.
    pub fn build(self) -> Result<SpecRegistry> {
        if self.sources.is_empty() {
            return Err(RegistryError::NoSourcesAvailable);
        }

        for source in &self.sources {
            match source.load() {
                Ok(mut registry) => {
                    registry.source = RegistrySource::Multiple(self.sources.clone());
                    return Ok(registry);
                }
                Err(err) => debug!(?source, %err, "spec source failed, trying next"),
            }
        }

        Err(RegistryError::NoSourcesAvailable)
    }

    /// Loads every source and merges them into one registry.
    ///
    /// # Errors
    ///
    /// Returns the first load error, a duplicate plugin across sources as
    /// [`RegistryError::InvalidSpec`], or
    /// [`RegistryError::NoSourcesAvailable`] when no source was added.
    pub fn merge_all(self) -> Result<SpecRegistry> {
        if self.sources.is_empty() {
            return Err(RegistryError::NoSourcesAvailable);
        }

        let mut merged = SpecRegistry::new();
        for source in &self.sources {
            merged.merge(source.load()?)?;
        }
        merged.source = RegistrySource::Multiple(self.sources);
        Ok(merged)
    }
}
