use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const BIN: &str = env!("CARGO_BIN_EXE_blockspec");

const S3_SPEC: &str = r#"
name: s3
kind: publisher
doc: Uploads the rendered site to a bucket.
config:
  children:
    - attr:
        name: bucket
        kind: string
        constraints: [required_meaningful]
        example: my-site
    - attr:
        name: region
        kind: string
        default: us-east-1
    - attr:
        name: parallelism
        kind: number
        constraints: [integer]
        min: 1
        max: 16
    - attr:
        name: access_key
        kind: string
        secret: true
"#;

const CSV_SPEC: &str = r#"
name: csv
kind: data_source
config:
  children:
    - attr:
        name: path
        kind: string
        constraints: [required]
"#;

const BROKEN_SPEC: &str = r#"
name: broken
kind: content_provider
config:
  children:
    - attr:
        name: retries
        kind: number
        min: 5
        max: 1
"#;

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create parent dir");
    }
    fs::write(&path, contents).expect("failed to write file");
    path
}

/// A temp dir holding `specs/s3.yaml`.
fn spec_dir() -> TempDir {
    let dir = TempDir::new().expect("failed to create temp dir");
    write(dir.path(), "specs/s3.yaml", S3_SPEC);
    dir
}

fn run(args: &[&str]) -> Output {
    Command::new(BIN)
        .args(args)
        .output()
        .expect("failed to run blockspec")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp paths are UTF-8")
}

// ---------------------------------------------------------------------------
// Lint tests
// ---------------------------------------------------------------------------

#[test]
fn lint_accepts_valid_specs() {
    let dir = spec_dir();
    let out = run(&["lint", path_str(&dir.path().join("specs"))]);

    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(
        stdout(&out).contains("Linted 1 spec file(s): 0 error(s), 0 warning(s)."),
        "stdout: {}",
        stdout(&out)
    );
}

#[test]
fn lint_reports_bound_errors() {
    let dir = spec_dir();
    let broken = write(dir.path(), "specs/broken.yaml", BROKEN_SPEC);

    let out = run(&["lint", path_str(&broken)]);

    assert!(!out.status.success());
    let text = stdout(&out);
    assert!(text.contains("content_provider/broken/config"), "stdout: {text}");
    assert!(text.contains("Lower bound exceeds upper bound"), "stdout: {text}");
    assert!(stderr(&out).contains("error(s) found in spec files"));
}

#[test]
fn lint_deny_warnings_fails_on_missing_example() {
    let dir = TempDir::new().unwrap();
    let csv = write(dir.path(), "csv.yaml", CSV_SPEC);

    let lenient = run(&["lint", path_str(&csv)]);
    assert!(lenient.status.success(), "stderr: {}", stderr(&lenient));
    assert!(stdout(&lenient).contains("Missing example for required attribute"));

    let strict = run(&["lint", "--deny-warnings", path_str(&csv)]);
    assert!(!strict.status.success());
    assert!(stderr(&strict).contains("--deny-warnings"));
}

#[test]
fn lint_rejects_unreadable_spec() {
    let dir = TempDir::new().unwrap();
    let bad = write(dir.path(), "bad.json", r#"{"name": "x"}"#);

    let out = run(&["lint", path_str(&bad)]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("bad.json"));
}

// ---------------------------------------------------------------------------
// Check tests
// ---------------------------------------------------------------------------

#[test]
fn check_valid_config_succeeds() {
    let dir = spec_dir();
    let site = write(dir.path(), "site.conf", "bucket = \"my-site\"\nparallelism = 4\n");

    let out = run(&[
        "check",
        "--registry",
        path_str(&dir.path().join("specs")),
        "--plugin",
        "publisher/s3",
        path_str(&site),
    ]);

    assert!(out.status.success(), "stdout: {}\nstderr: {}", stdout(&out), stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("site.conf: ok"), "stdout: {text}");
    assert!(text.contains("Checked 1 file(s) against publisher/s3 config: 0 error(s), 0 warning(s)."));
}

#[test]
fn check_reports_diagnostics_with_source_pointer() {
    let dir = spec_dir();
    let good = write(dir.path(), "good.conf", "bucket = \"ok\"\n");
    let bad = write(dir.path(), "bad.conf", "region = \"eu-west-1\"\nparallelism = 40\n");

    let out = run(&[
        "check",
        "--registry",
        path_str(&dir.path().join("specs")),
        "--plugin",
        "publisher/s3",
        path_str(&good),
        path_str(&bad),
    ]);

    assert!(!out.status.success());
    let text = stdout(&out);
    assert!(text.contains("good.conf: ok"), "stdout: {text}");
    assert!(text.contains("Missing required attribute"), "stdout: {text}");
    assert!(text.contains("Attribute value not in range"), "stdout: {text}");
    assert!(text.contains("bad.conf:2:"), "stdout: {text}");
    assert!(text.contains("2 error(s)"), "stdout: {text}");
}

#[test]
fn check_reports_syntax_errors() {
    let dir = spec_dir();
    let broken = write(dir.path(), "broken.conf", "bucket = = 3\n");

    let out = run(&[
        "check",
        "--registry",
        path_str(&dir.path().join("specs")),
        "--plugin",
        "publisher/s3",
        path_str(&broken),
    ]);

    assert!(!out.status.success());
    assert!(stdout(&out).contains("broken.conf:1:"), "stdout: {}", stdout(&out));
}

#[test]
fn check_json_binds_vars_and_redacts_secrets() {
    let dir = spec_dir();
    let site = write(
        dir.path(),
        "site.conf",
        "bucket = upper(env)\naccess_key = \"AKIA123\"\n",
    );

    let out = run(&[
        "check",
        "--registry",
        path_str(&dir.path().join("specs")),
        "--plugin",
        "publisher/s3",
        "--var",
        "env=prod",
        "--format",
        "json",
        path_str(&site),
    ]);

    assert!(out.status.success(), "stdout: {}\nstderr: {}", stdout(&out), stderr(&out));
    let reports: serde_json::Value = serde_json::from_slice(&out.stdout).expect("valid JSON");
    let report = &reports[0];
    assert_eq!(report["ok"], serde_json::json!(true));
    assert_eq!(report["value"]["bucket"], serde_json::json!("PROD"));
    assert_eq!(report["value"]["region"], serde_json::json!("us-east-1"));
    assert_eq!(report["value"]["access_key"], serde_json::json!("(sensitive)"));
    assert_eq!(report["diagnostics"], serde_json::json!([]));
}

#[test]
fn check_unknown_plugin_fails() {
    let dir = spec_dir();
    let site = write(dir.path(), "site.conf", "bucket = \"x\"\n");

    let out = run(&[
        "check",
        "--registry",
        path_str(&dir.path().join("specs")),
        "--plugin",
        "publisher/gcs",
        path_str(&site),
    ]);

    assert!(!out.status.success());
    assert!(stderr(&out).contains("Unknown plugin 'publisher/gcs'"));
}

#[test]
fn check_uses_tool_config_sources_and_variables() {
    let dir = spec_dir();
    let config = write(
        dir.path(),
        "blockspec.yml",
        "version: \"1.0\"\nsources:\n  - specs\nvariables:\n  env: staging\n",
    );
    let site = write(dir.path(), "site.conf", "bucket = env\n");

    let out = run(&[
        "check",
        "--config",
        path_str(&config),
        "--plugin",
        "publisher/s3",
        "--format",
        "json",
        path_str(&site),
    ]);

    assert!(out.status.success(), "stdout: {}\nstderr: {}", stdout(&out), stderr(&out));
    let reports: serde_json::Value = serde_json::from_slice(&out.stdout).expect("valid JSON");
    assert_eq!(reports[0]["value"]["bucket"], serde_json::json!("staging"));
}

#[test]
fn check_without_sources_fails() {
    let dir = TempDir::new().unwrap();
    let site = write(dir.path(), "site.conf", "bucket = \"x\"\n");

    let out = run(&["check", "--plugin", "publisher/s3", path_str(&site)]);

    assert!(!out.status.success());
    assert!(stderr(&out).contains("No spec sources"));
}

// ---------------------------------------------------------------------------
// Bundle, list and docs tests
// ---------------------------------------------------------------------------

#[test]
fn bundle_then_list_from_bundle() {
    let dir = spec_dir();
    write(dir.path(), "specs/csv.yaml", CSV_SPEC);
    let bundle = dir.path().join("out").join("specs.bundle.json");

    let out = run(&[
        "bundle",
        path_str(&dir.path().join("specs")),
        "--output",
        path_str(&bundle),
        "--name",
        "builtin",
    ]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("Bundled 2 plugin spec(s)"));

    let raw = fs::read_to_string(&bundle).unwrap();
    let package: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(package["name"], serde_json::json!("builtin"));
    assert_eq!(package["bundle_hash"].as_str().map(str::len), Some(64));

    let out = run(&["list", "--registry", path_str(&bundle)]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    let csv_line = text.find("data_source/csv").expect("csv listed");
    let s3_line = text.find("publisher/s3").expect("s3 listed");
    assert!(csv_line < s3_line, "plugins are ordered by kind: {text}");
    assert!(text.contains("Uploads the rendered site to a bucket."));
    assert!(text.contains("2 plugin(s) registered."));
}

#[test]
fn bundle_rejects_failing_specs() {
    let dir = spec_dir();
    write(dir.path(), "specs/broken.yaml", BROKEN_SPEC);
    let bundle = dir.path().join("specs.bundle.json");

    let out = run(&[
        "bundle",
        path_str(&dir.path().join("specs")),
        "--output",
        path_str(&bundle),
    ]);

    assert!(!out.status.success());
    assert!(!bundle.exists());
}

#[test]
fn list_rejects_tampered_bundle() {
    let dir = spec_dir();
    let bundle = dir.path().join("specs.bundle.json");
    let out = run(&[
        "bundle",
        path_str(&dir.path().join("specs")),
        "--output",
        path_str(&bundle),
    ]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let raw = fs::read_to_string(&bundle).unwrap();
    fs::write(&bundle, raw.replace("my-site", "your-site")).unwrap();

    let out = run(&["list", "--registry", path_str(&bundle)]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("bundle hash mismatch"), "stderr: {}", stderr(&out));
}

#[test]
fn list_json_reports_sections() {
    let dir = spec_dir();
    let out = run(&[
        "list",
        "--registry",
        path_str(&dir.path().join("specs")),
        "--format",
        "json",
    ]);

    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let list: serde_json::Value = serde_json::from_slice(&out.stdout).expect("valid JSON");
    assert_eq!(list[0]["id"], serde_json::json!("publisher/s3"));
    assert_eq!(list[0]["sections"], serde_json::json!(["config"]));
}

#[test]
fn docs_writes_one_page_per_plugin() {
    let dir = spec_dir();
    let docs = dir.path().join("docs");

    let out = run(&[
        "docs",
        "--registry",
        path_str(&dir.path().join("specs")),
        "--output",
        path_str(&docs),
    ]);

    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let page = fs::read_to_string(docs.join("publisher-s3.md")).expect("page written");
    assert!(page.starts_with("# publisher/s3\n"));
    assert!(page.contains("## s3 config"));
    assert!(page.contains("bucket"));
    assert!(page.contains("my-site"));
}

#[test]
fn docs_prints_single_plugin_to_stdout() {
    let dir = spec_dir();
    write(dir.path(), "specs/csv.yaml", CSV_SPEC);

    let out = run(&[
        "docs",
        "--registry",
        path_str(&dir.path().join("specs")),
        "--plugin",
        "data_source/csv",
    ]);

    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("# data_source/csv"));
    assert!(!text.contains("publisher/s3"));
}
