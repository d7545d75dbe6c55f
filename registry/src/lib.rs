//! Plugin spec loading, bundling and tool configuration.
//!
//! This crate loads [`PluginSpec`](blockspec_core::PluginSpec)s from
//! directories of JSON/YAML files and from hashed
//! [`SpecPackage`](blockspec_core::SpecPackage) bundles, self-checking every
//! spec on the way in, and reads the tool's YAML configuration.
//!
//! # Quick start
//!
//! ```no_run
//! use blockspec_core::PluginKind;
//! use blockspec_registry::{SpecRegistry, ToolConfig, build_package, collect_spec_paths, load_spec_files};
//!
//! // Load plugin specs from a directory
//! let registry = SpecRegistry::from_dir("specs/").unwrap();
//! if let Some(plugin) = registry.get(PluginKind::DataSource, "csv") {
//!     println!("csv takes config: {}", plugin.config.is_some());
//! }
//!
//! // Bundle spec files into a hashed package
//! let paths = collect_spec_paths(&["specs/".into()]).unwrap();
//! let plugins = load_spec_files(&paths).unwrap();
//! let package = build_package(plugins, "1.0.0", "2024-01-15T10:30:00Z", None, None).unwrap();
//! assert!(package.bundle_hash.is_some());
//!
//! // Tool configuration
//! let config = ToolConfig::load("blockspec.yml").unwrap();
//! let registry = config
//!     .registry_sources(std::path::Path::new("."))
//!     .into_iter()
//!     .fold(SpecRegistry::builder(), |b, s| b.with_source(s))
//!     .merge_all()
//!     .unwrap();
//! ```

mod bundle;
mod config;
mod error;
mod files;
mod loader;

pub use bundle::{build_package, bundle_hash, read_package, verify_package, write_package};
pub use config::ToolConfig;
pub use error::{RegistryError, Result};
pub use files::{check_plugin, collect_spec_paths, load_spec_files, read_spec_file};
pub use loader::{RegistryBuilder, RegistrySource, SpecRegistry};
