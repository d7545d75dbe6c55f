use std::fs;

use blockspec_core::{EvalContext, NameMatcher, PluginKind, Section, Value, decode, syntax};
use blockspec_registry::{SpecRegistry, ToolConfig, build_package, load_spec_files, write_package};
use tempfile::TempDir;

const TABLE_SPEC: &str = r#"{
  "name": "table",
  "kind": "content_provider",
  "doc": "Renders rows as a table.",
  "args": {
    "children": [
      {"attr": {"name": "source", "kind": "string", "constraints": ["required_meaningful"], "example": "people"}},
      {"attr": {"name": "columns", "kind": {"list": "string"}, "constraints": ["non_empty"], "example": ["name"]}},
      {"block": {
        "matcher": {"all": [{"type": "column"}, {"label_count": 1}]},
        "repeatable": true,
        "children": [
          {"attr": {"name": "width", "kind": "number", "constraints": ["integer"], "min": 1}}
        ]
      }}
    ]
  }
}"#;

#[test]
fn test_directory_registry_decodes_configuration() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("table.json"), TABLE_SPEC).unwrap();

    let registry = SpecRegistry::from_dir(dir.path()).unwrap();
    let plugin = registry.find("content_provider/table").unwrap();
    let spec = plugin.section(Section::Args).unwrap();

    let source = "source = \"people\"\ncolumns = [\"name\", \"email\"]\n\ncolumn \"name\" {\n  width = 20\n}\n";
    let body = syntax::parse(source, "page.conf").unwrap();
    let decoded = decode(&body, spec, &EvalContext::standard()).into_result().unwrap();

    assert_eq!(decoded.get_str("source"), Some("people"));
    assert_eq!(decoded.get("columns").and_then(Value::length), Some(2));
    let matcher = NameMatcher::labeled("column", 1);
    let column = decoded.block(&matcher).unwrap();
    assert_eq!(column.labels, vec!["name".to_string()]);
    assert_eq!(column.get_f64("width"), Some(20.0));
}

#[test]
fn test_bundle_and_directory_agree() {
    let dir = TempDir::new().unwrap();
    let specs = dir.path().join("specs");
    fs::create_dir_all(&specs).unwrap();
    fs::write(specs.join("table.json"), TABLE_SPEC).unwrap();

    let plugins = load_spec_files(&[specs.join("table.json")]).unwrap();
    let package = build_package(plugins, "0.1.0", "2024-05-01T00:00:00Z", None, None).unwrap();
    let bundle = dir.path().join("specs.bundle.json");
    write_package(&package, &bundle).unwrap();

    let from_dir = SpecRegistry::from_dir(&specs).unwrap();
    let from_bundle = SpecRegistry::from_bundle(&bundle).unwrap();
    assert_eq!(
        from_dir.get(PluginKind::ContentProvider, "table"),
        from_bundle.get(PluginKind::ContentProvider, "table")
    );
}

#[test]
fn test_tool_config_drives_registry_and_variables() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("specs")).unwrap();
    fs::write(dir.path().join("specs").join("table.json"), TABLE_SPEC).unwrap();
    let config_path = dir.path().join("blockspec.yml");
    fs::write(
        &config_path,
        "version: \"1.0\"\nsources: [specs]\nvariables:\n  dataset: people\n",
    )
    .unwrap();

    let config = ToolConfig::load(&config_path).unwrap();
    let registry = config
        .registry_sources(dir.path())
        .into_iter()
        .fold(SpecRegistry::builder(), |builder, source| builder.with_source(source))
        .merge_all()
        .unwrap();
    assert_eq!(registry.len(), 1);

    let plugin = registry.get(PluginKind::ContentProvider, "table").unwrap();
    let body = syntax::parse("source = dataset\n", "page.conf").unwrap();
    let decoded = decode(&body, plugin.args.as_ref().unwrap(), &config.eval_context());
    assert!(!decoded.has_errors(), "{}", decoded.diagnostics);
    assert_eq!(decoded.block.get_str("source"), Some("people"));
}
