//! Spec file discovery and loading.
//!
//! A spec file holds one [`PluginSpec`] as JSON (`.json`) or YAML (`.yaml`,
//! `.yml`). Every loaded spec is self-checked: errors reject the file,
//! warnings are logged.

use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use blockspec_core::{PluginSpec, validate_plugin};
use tracing::{debug, warn};

use crate::error::{RegistryError, Result};

const SPEC_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

fn is_spec_file(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| SPEC_EXTENSIONS.contains(&ext))
}

/// Expands files and directories into a sorted, de-duplicated list of spec
/// files. Directories are scanned one level deep.
///
/// # Errors
///
/// Returns [`RegistryError::InvalidInput`] when no input is given, when a
/// file has an unsupported extension or when a path does not exist.
pub fn collect_spec_paths(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    if inputs.is_empty() {
        return Err(RegistryError::InvalidInput(
            "No spec paths were provided".to_string(),
        ));
    }

    let mut paths = BTreeSet::new();

    for input in inputs {
        if input.is_dir() {
            for entry in fs::read_dir(input)? {
                let path = entry?.path();
                if path.is_file() && is_spec_file(&path) {
                    paths.insert(path);
                }
            }
            continue;
        }

        if input.is_file() {
            if !is_spec_file(input) {
                return Err(RegistryError::InvalidInput(format!(
                    "Spec file '{}' must end in .json, .yaml or .yml",
                    input.display()
                )));
            }
            paths.insert(input.clone());
            continue;
        }

        return Err(RegistryError::InvalidInput(format!(
            "Spec path '{}' does not exist",
            input.display()
        )));
    }

    Ok(paths.into_iter().collect())
}

/// Parses one spec file without checking it.
///
/// YAML is read into a JSON tree first so that both formats accept the same
/// externally tagged layout (`attr:`, `block:`, `{list: number}`).
///
/// # Errors
///
/// Returns [`RegistryError::IoError`] if the file cannot be read and
/// [`RegistryError::InvalidFile`] if it does not hold a plugin spec.
pub fn read_spec_file(path: &Path) -> Result<PluginSpec> {
    let raw = fs::read_to_string(path)?;
    let invalid = |message: String| RegistryError::InvalidFile {
        path: path.to_path_buf(),
        message,
    };

    let tree: serde_json::Value = match path.extension().and_then(OsStr::to_str) {
        Some("json") => serde_json::from_str(&raw).map_err(|e| invalid(e.to_string()))?,
        _ => serde_yaml::from_str(&raw).map_err(|e| invalid(e.to_string()))?,
    };
    serde_json::from_value(tree).map_err(|e| invalid(e.to_string()))
}

/// Self-checks a loaded plugin: errors are returned, warnings are logged.
///
/// # Errors
///
/// Returns [`RegistryError::InvalidSpec`] carrying the first validation
/// error.
pub fn check_plugin(plugin: &PluginSpec, origin: &str) -> Result<()> {
    if let Some(first) = validate_plugin(plugin).into_iter().next() {
        return Err(RegistryError::InvalidSpec {
            origin: origin.to_string(),
            message: first.to_string(),
        });
    }
    for (section, diags) in plugin.validate_spec() {
        for warning in diags.warnings() {
            warn!(
                plugin = %plugin.id(),
                %section,
                origin,
                "{warning}"
            );
        }
    }
    Ok(())
}

/// Reads and self-checks every spec file, in order.
///
/// # Errors
///
/// Fails on the first file that cannot be read or does not pass its
/// self-check.
pub fn load_spec_files(paths: &[PathBuf]) -> Result<Vec<PluginSpec>> {
    let mut plugins = Vec::with_capacity(paths.len());
    for path in paths {
        let plugin = read_spec_file(path)?;
        check_plugin(&plugin, &path.display().to_string())?;
        debug!(plugin = %plugin.id(), path = %path.display(), "loaded spec file");
        plugins.push(plugin);
    }
    Ok(plugins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CSV_YAML: &str = r#"
name: csv
kind: data_source
config:
  children:
    - attr:
        name: path
        kind: string
        constraints: [required_meaningful]
        example: people.csv
"#;

    #[test]
    fn test_collect_spec_paths_filters_extensions() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("csv.yaml"), CSV_YAML).unwrap();
        fs::write(dir.path().join("s3.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignore").unwrap();

        let paths = collect_spec_paths(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["csv.yaml", "s3.json"]);
    }

    #[test]
    fn test_collect_spec_paths_rejects_bad_inputs() {
        let dir = TempDir::new().unwrap();
        let txt = dir.path().join("notes.txt");
        fs::write(&txt, "ignore").unwrap();

        assert!(collect_spec_paths(&[]).is_err());
        assert!(collect_spec_paths(&[txt]).is_err());
        assert!(collect_spec_paths(&[dir.path().join("missing.json")]).is_err());
    }

    #[test]
    fn test_read_yaml_spec() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("csv.yml");
        fs::write(&path, CSV_YAML).unwrap();

        let plugin = read_spec_file(&path).unwrap();
        assert_eq!(plugin.id(), "data_source/csv");
        assert!(plugin.config.unwrap().is_required());
    }

    #[test]
    fn test_read_invalid_file_names_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, r#"{"name": "x"}"#).unwrap();

        let err = read_spec_file(&path).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidFile { .. }));
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_load_rejects_failing_self_check() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(
            &path,
            r#"
name: bad
kind: publisher
config:
  children:
    - attr:
        name: retries
        kind: number
        min: 5
        max: 1
"#,
        )
        .unwrap();

        let err = load_spec_files(&[path]).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidSpec { .. }));
        assert!(err.to_string().contains("Lower bound exceeds upper bound"));
    }
}
