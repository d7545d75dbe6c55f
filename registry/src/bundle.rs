//! Spec bundles: hashed [`SpecPackage`] files.
//!
//! A bundle's `bundle_hash` is the hex SHA-256 of the canonical JSON of its
//! plugin list. Loading a bundle recomputes the hash and rejects the file on
//! mismatch; bundles without a hash are accepted as-is.

use std::fs;
use std::path::Path;

use blockspec_core::{PluginSpec, SpecPackage, validate_package};
use sha2::{Digest, Sha256};

use crate::error::{RegistryError, Result};

/// Hex SHA-256 over the canonical JSON of `plugins`.
///
/// Struct fields serialize in declaration order and maps are ordered by
/// key, so equal plugin lists always hash equally.
///
/// # Errors
///
/// Returns [`RegistryError::JsonError`] if serialization fails.
pub fn bundle_hash(plugins: &[PluginSpec]) -> Result<String> {
    let canonical = serde_json::to_vec(plugins)?;
    let digest = Sha256::digest(&canonical);
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}

/// Builds a validated, hashed package from already-checked plugins.
///
/// # Errors
///
/// Returns [`RegistryError::InvalidSpec`] with the first package validation
/// error (for example a duplicate plugin).
pub fn build_package(
    plugins: Vec<PluginSpec>,
    version: &str,
    generated_at: &str,
    name: Option<String>,
    description: Option<String>,
) -> Result<SpecPackage> {
    let mut package = SpecPackage::new(version, generated_at);
    package.name = name;
    package.description = description;
    package.bundle_hash = Some(bundle_hash(&plugins)?);
    package.plugins = plugins;

    if let Some(first) = validate_package(&package).into_iter().next() {
        return Err(RegistryError::InvalidSpec {
            origin: "bundle".to_string(),
            message: first.to_string(),
        });
    }

    Ok(package)
}

/// Recomputes the package hash and compares it with the recorded one.
///
/// # Errors
///
/// Returns [`RegistryError::InvalidChecksum`] on mismatch.
pub fn verify_package(package: &SpecPackage) -> Result<()> {
    let Some(expected) = &package.bundle_hash else {
        return Ok(());
    };
    let actual = bundle_hash(&package.plugins)?;
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(RegistryError::InvalidChecksum(format!(
            "bundle hash mismatch: recorded {expected}, computed {actual}"
        )));
    }
    Ok(())
}

/// Reads a package JSON file and verifies its hash.
///
/// # Errors
///
/// Returns I/O and JSON errors, or [`RegistryError::InvalidChecksum`].
pub fn read_package(path: &Path) -> Result<SpecPackage> {
    let file = fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let package: SpecPackage = serde_json::from_reader(reader)?;
    verify_package(&package)?;
    Ok(package)
}

/// Writes a package as pretty JSON, creating parent directories.
///
/// # Errors
///
/// Returns I/O and JSON errors.
pub fn write_package(package: &SpecPackage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let raw = serde_json::to_string_pretty(package)?;
    fs::write(path, raw)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockspec_core::{AttrSpec, PluginKind, RootSpec, ValueKind};

    fn plugins() -> Vec<PluginSpec> {
        vec![
            PluginSpec::new(PluginKind::DataSource, "csv").with_config(
                RootSpec::new().with_attr(AttrSpec::new("path", ValueKind::String).required().with_example("a.csv")),
            ),
            PluginSpec::new(PluginKind::Publisher, "s3"),
        ]
    }

    #[test]
    fn test_hash_is_stable_and_content_sensitive() {
        let a = bundle_hash(&plugins()).unwrap();
        assert_eq!(a, bundle_hash(&plugins()).unwrap());
        assert_eq!(a.len(), 64);

        let mut changed = plugins();
        changed[1].doc = "Uploads files.".to_string();
        assert_ne!(a, bundle_hash(&changed).unwrap());
    }

    #[test]
    fn test_build_package_records_hash() {
        let package = build_package(plugins(), "1.2.0", "2024-01-01T00:00:00Z", None, None).unwrap();
        assert_eq!(package.plugin_count(), 2);
        assert!(verify_package(&package).is_ok());
    }

    #[test]
    fn test_build_package_rejects_duplicates() {
        let mut list = plugins();
        list.push(PluginSpec::new(PluginKind::Publisher, "s3"));
        let err = build_package(list, "1.0.0", "2024-01-01T00:00:00Z", None, None).unwrap_err();
        assert!(err.to_string().contains("duplicate plugin in package: publisher/s3"));
    }

    #[test]
    fn test_tampered_package_fails_verification() {
        let mut package = build_package(plugins(), "1.0.0", "2024-01-01T00:00:00Z", None, None).unwrap();
        package.plugins.pop();
        assert!(matches!(
            verify_package(&package),
            Err(RegistryError::InvalidChecksum(_))
        ));

        package.bundle_hash = None;
        assert!(verify_package(&package).is_ok());
    }

    #[test]
    fn test_write_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("bundle.json");
        let package = build_package(plugins(), "1.0.0", "2024-01-01T00:00:00Z", Some("builtin".into()), None).unwrap();

        write_package(&package, &path).unwrap();
        let loaded = read_package(&path).unwrap();
        assert_eq!(loaded, package);
    }
}
