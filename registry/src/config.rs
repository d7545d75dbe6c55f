//! Tool configuration for the `blockspec` command.
//!
//! Defines the YAML-serializable settings that tell the tool where plugin
//! specs live and which variables configuration files may reference.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! sources:
//!   - specs/
//! bundles:
//!   - vendor/builtin.bundle.json
//! variables:
//!   env: production
//!   regions: [eu-west-1, us-east-2]
//! deny_warnings: true
//! ```

use std::collections::BTreeMap;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use blockspec_core::{EvalContext, Value};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::loader::RegistrySource;

/// Top-level tool configuration, typically `blockspec.yml`.
///
/// # Examples
///
/// ```
/// use blockspec_registry::ToolConfig;
///
/// let config: ToolConfig = serde_yaml::from_str("version: \"1.0\"\nvariables: {env: prod}\n").unwrap();
/// assert!(config.sources.is_empty());
/// assert!(!config.deny_warnings);
/// assert!(config.eval_context().variable("env").is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Configuration format version (e.g., `"1.0"`).
    pub version: String,
    /// Directories of spec files.
    #[serde(default)]
    pub sources: Vec<PathBuf>,
    /// Hashed spec bundles.
    #[serde(default)]
    pub bundles: Vec<PathBuf>,
    /// Variables configuration expressions may reference.
    #[serde(default)]
    pub variables: BTreeMap<String, serde_json::Value>,
    /// Treat spec and decode warnings as failures.
    #[serde(default)]
    pub deny_warnings: bool,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            sources: Vec::new(),
            bundles: Vec::new(),
            variables: BTreeMap::new(),
            deny_warnings: false,
        }
    }
}

impl ToolConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::RegistryError::IoError) if the file cannot
    /// be read, or [`YamlError`](crate::RegistryError::YamlError) if parsing
    /// fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::RegistryError::IoError) if the file cannot
    /// be written, or [`YamlError`](crate::RegistryError::YamlError) if
    /// serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Spec sources, with relative paths resolved against `base` (usually
    /// the directory holding the configuration file).
    pub fn registry_sources(&self, base: &Path) -> Vec<RegistrySource> {
        let resolve = |path: &PathBuf| {
            if path.is_relative() {
                base.join(path)
            } else {
                path.clone()
            }
        };
        self.sources
            .iter()
            .map(|p| RegistrySource::Directory(resolve(p)))
            .chain(self.bundles.iter().map(|p| RegistrySource::Bundle(resolve(p))))
            .collect()
    }

    /// Standard evaluation context with the configured variables bound.
    pub fn eval_context(&self) -> EvalContext {
        let mut ctx = EvalContext::standard();
        for (name, value) in &self.variables {
            ctx.set_variable(name.clone(), Value::from(value.clone()));
        }
        ctx
    }
}
