use std::fs;
use std::path::{Path, PathBuf};

use blockspec_core::{
    Decoded, DecodedBlock, Diagnostic, Diagnostics, EvalContext, PluginSpec, RootSpec, Section,
    SpecNode, ValidationError, Value, decode, parse_plugin_id, render_markdown, syntax, validate_plugin,
};
use blockspec_registry::{
    RegistryBuilder, RegistrySource, SpecRegistry, ToolConfig, build_package, collect_spec_paths,
    load_spec_files, read_spec_file, write_package,
};
use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");
const REDACTED: &str = "(sensitive)";

/// Output format for commands that print structured results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum CliOutputFormat {
    Text,
    Json,
    Yaml,
}

/// Plugin section selector with clap argument parsing support.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliSection {
    Config,
    Args,
}

impl From<CliSection> for Section {
    fn from(section: CliSection) -> Self {
        match section {
            CliSection::Config => Self::Config,
            CliSection::Args => Self::Args,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "blockspec")]
#[command(about = "Lint plugin specs and check configuration files against them")]
#[command(version)]
struct Cli {
    /// Tool configuration file (spec sources, variables).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Spec directory or bundle file; may be repeated.
    #[arg(long = "registry", global = true)]
    registries: Vec<PathBuf>,
    /// Log filter (trace, debug, info, warn, error or an EnvFilter directive).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Self-check spec files and print their diagnostics.
    Lint(LintArgs),
    /// Decode configuration files against a registered plugin spec.
    Check(CheckArgs),
    /// Render markdown reference pages for registered plugins.
    Docs(DocsArgs),
    /// Bundle spec files into a hashed SpecPackage file.
    Bundle(BundleArgs),
    /// List registered plugins.
    List(ListArgs),
}

#[derive(Debug, Args)]
struct LintArgs {
    /// Spec files and/or directories containing spec files.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Fail when any spec produces a warning.
    #[arg(long)]
    deny_warnings: bool,
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// Plugin id as kind/name (e.g. publisher/s3).
    #[arg(long)]
    plugin: String,
    /// Which plugin spec the files are checked against.
    #[arg(long, value_enum, default_value = "config")]
    section: CliSection,
    /// Variable binding as name=value; the value is read as JSON when it
    /// parses, as a plain string otherwise.
    #[arg(long = "var", value_name = "NAME=VALUE")]
    vars: Vec<String>,
    /// Output format.
    #[arg(long, value_enum, default_value = "text")]
    format: CliOutputFormat,
    /// Fail when any file produces a warning.
    #[arg(long)]
    deny_warnings: bool,
    /// Print secret attribute values instead of redacting them.
    #[arg(long)]
    show_secrets: bool,
    /// Configuration files to check.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct DocsArgs {
    /// Only document this plugin (kind/name).
    #[arg(long)]
    plugin: Option<String>,
    /// Directory for one markdown file per plugin; stdout when omitted.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct BundleArgs {
    /// Spec files and/or directories containing spec files.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Output JSON bundle path.
    #[arg(long)]
    output: PathBuf,
    /// Optional bundle name metadata.
    #[arg(long)]
    name: Option<String>,
    /// Optional bundle description metadata.
    #[arg(long)]
    description: Option<String>,
}

#[derive(Debug, Args)]
struct ListArgs {
    /// Output format.
    #[arg(long, value_enum, default_value = "text")]
    format: CliOutputFormat,
}

/// Settings shared by every subcommand.
struct Context {
    config: ToolConfig,
    config_dir: PathBuf,
    registries: Vec<PathBuf>,
}

impl Context {
    fn load(config: Option<&Path>, registries: Vec<PathBuf>) -> Result<Self, String> {
        let Some(path) = config else {
            return Ok(Self {
                config: ToolConfig::default(),
                config_dir: PathBuf::from("."),
                registries,
            });
        };
        let config = ToolConfig::load(path)
            .map_err(|err| format!("Failed to load config '{}': {err}", path.display()))?;
        let config_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        debug!(path = %path.display(), "loaded tool config");
        Ok(Self {
            config,
            config_dir,
            registries,
        })
    }

    /// Merges every `--registry` path and every configured source.
    fn registry(&self) -> Result<SpecRegistry, String> {
        let sources: Vec<RegistrySource> = self
            .registries
            .iter()
            .map(|p| RegistrySource::from_path(p.clone()))
            .chain(self.config.registry_sources(&self.config_dir))
            .collect();
        if sources.is_empty() {
            return Err(
                "No spec sources: pass --registry or list sources in the --config file"
                    .to_string(),
            );
        }
        let registry = sources
            .into_iter()
            .fold(RegistryBuilder::new(), RegistryBuilder::with_source)
            .merge_all()
            .map_err(|e| e.to_string())?;
        info!(plugins = registry.len(), "loaded spec registry");
        Ok(registry)
    }

    fn find_plugin<'a>(&self, registry: &'a SpecRegistry, id: &str) -> Result<&'a PluginSpec, String> {
        let (kind, name) = parse_plugin_id(id)?;
        registry
            .get(kind, &name)
            .ok_or_else(|| format!("Unknown plugin '{id}'"))
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let result = Context::load(cli.config.as_deref(), cli.registries).and_then(|ctx| {
        match cli.command {
            Command::Lint(args) => run_lint(&ctx, args),
            Command::Check(args) => run_check(&ctx, args),
            Command::Docs(args) => run_docs(&ctx, args),
            Command::Bundle(args) => run_bundle(args),
            Command::List(args) => run_list(&ctx, args),
        }
    });

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run_lint(ctx: &Context, args: LintArgs) -> Result<(), String> {
    let deny_warnings = args.deny_warnings || ctx.config.deny_warnings;
    let paths = collect_spec_paths(&args.inputs).map_err(|e| e.to_string())?;

    let mut errors = 0usize;
    let mut warnings = 0usize;
    for path in &paths {
        let plugin = match read_spec_file(path) {
            Ok(plugin) => plugin,
            Err(err) => {
                eprintln!("{err}");
                errors += 1;
                continue;
            }
        };

        // Section problems are reported below with their positions.
        for problem in validate_plugin(&plugin)
            .into_iter()
            .filter(|p| !matches!(p, ValidationError::InvalidSpec { .. }))
        {
            println!("{}: error: {problem}", path.display());
            errors += 1;
        }
        for (section, diags) in plugin.validate_spec() {
            errors += diags.errors().count();
            warnings += diags.warnings().count();
            for diag in &diags {
                println!("{} [{}/{section}]: {diag}", path.display(), plugin.id());
            }
        }
    }

    println!(
        "Linted {} spec file(s): {errors} error(s), {warnings} warning(s).",
        paths.len()
    );

    if errors > 0 {
        return Err(format!("{errors} error(s) found in spec files"));
    }
    if deny_warnings && warnings > 0 {
        return Err(format!("{warnings} warning(s) found in spec files (--deny-warnings)"));
    }
    Ok(())
}

/// Outcome of checking one configuration file.
struct FileCheck {
    path: PathBuf,
    source: Option<String>,
    decoded: Option<DecodedBlock>,
    diagnostics: Diagnostics,
}

#[derive(Debug, Serialize)]
struct FileReport {
    file: String,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
    diagnostics: Diagnostics,
}

fn run_check(ctx: &Context, args: CheckArgs) -> Result<(), String> {
    let registry = ctx.registry()?;
    let plugin = ctx.find_plugin(&registry, &args.plugin)?;
    let section = Section::from(args.section);
    let spec = plugin
        .section(section)
        .ok_or_else(|| format!("Plugin '{}' has no {section} spec", plugin.id()))?;

    let mut eval = ctx.config.eval_context();
    for raw in &args.vars {
        bind_variable(&mut eval, raw)?;
    }

    let checks: Vec<FileCheck> = args
        .files
        .par_iter()
        .map(|path| check_file(path, spec, &eval))
        .collect();

    let errors: usize = checks.iter().map(|c| c.diagnostics.errors().count()).sum();
    let warnings: usize = checks.iter().map(|c| c.diagnostics.warnings().count()).sum();

    match args.format {
        CliOutputFormat::Text => {
            for check in &checks {
                if check.diagnostics.is_empty() {
                    println!("{}: ok", check.path.display());
                } else {
                    print!("{}", check.diagnostics.render(check.source.as_deref()));
                }
            }
            println!(
                "Checked {} file(s) against {} {section}: {errors} error(s), {warnings} warning(s).",
                checks.len(),
                plugin.id()
            );
        }
        CliOutputFormat::Json | CliOutputFormat::Yaml => {
            let reports: Vec<FileReport> = checks
                .into_iter()
                .map(|check| {
                    let value = check.decoded.map(|mut block| {
                        if !args.show_secrets {
                            redact_secrets(&mut block, spec);
                        }
                        block.to_value()
                    });
                    FileReport {
                        file: check.path.display().to_string(),
                        ok: !check.diagnostics.has_errors(),
                        value,
                        diagnostics: check.diagnostics,
                    }
                })
                .collect();
            println!("{}", format_structured(&reports, args.format)?);
        }
    }

    if errors > 0 {
        return Err(format!("{errors} error(s) found in configuration files"));
    }
    if (args.deny_warnings || ctx.config.deny_warnings) && warnings > 0 {
        return Err(format!(
            "{warnings} warning(s) found in configuration files (--deny-warnings)"
        ));
    }
    Ok(())
}

fn check_file(path: &Path, spec: &RootSpec, eval: &EvalContext) -> FileCheck {
    let filename = path.display().to_string();
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            return FileCheck {
                path: path.to_path_buf(),
                source: None,
                decoded: None,
                diagnostics: Diagnostic::error(
                    "Failed to read file",
                    format!("{filename}: {err}"),
                )
                .into(),
            };
        }
    };

    let (decoded, diagnostics) = match syntax::parse(&source, &filename) {
        Ok(body) => {
            let Decoded { block, diagnostics } = decode(&body, spec, eval);
            (Some(block), diagnostics)
        }
        Err(diagnostics) => (None, diagnostics),
    };
    debug!(
        file = %filename,
        diagnostics = diagnostics.len(),
        "checked configuration file"
    );

    FileCheck {
        path: path.to_path_buf(),
        source: Some(source),
        decoded,
        diagnostics,
    }
}

fn bind_variable(eval: &mut EvalContext, raw: &str) -> Result<(), String> {
    let Some((name, value)) = raw.split_once('=') else {
        return Err(format!("Invalid --var '{raw}' (expected NAME=VALUE)"));
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("Invalid --var '{raw}' (empty name)"));
    }
    let value = serde_json::from_str::<serde_json::Value>(value)
        .map_or_else(|_| Value::from(value), Value::from);
    eval.set_variable(name, value);
    Ok(())
}

/// Replaces the values of secret attributes, recursing into nested blocks.
fn redact_secrets<N: SpecNode>(block: &mut DecodedBlock, spec: &N) {
    for attr in spec.attrs().filter(|a| a.secret) {
        if let Some(decoded) = block.attrs.get_mut(&attr.name) {
            if !decoded.value.is_null() {
                decoded.value = Value::from(REDACTED);
            }
        }
    }
    for child in &mut block.blocks {
        if let Some(child_spec) = spec
            .blocks()
            .find(|b| b.matcher.matches(&child.type_name, &child.labels))
        {
            redact_secrets(child, child_spec);
        }
    }
}

fn run_docs(ctx: &Context, args: DocsArgs) -> Result<(), String> {
    let registry = ctx.registry()?;
    let plugins = match &args.plugin {
        Some(id) => vec![ctx.find_plugin(&registry, id)?],
        None => registry.plugins(),
    };

    if let Some(dir) = &args.output {
        fs::create_dir_all(dir).map_err(|err| {
            format!("Failed to create output directory '{}': {err}", dir.display())
        })?;
    }

    for plugin in &plugins {
        let page = plugin_page(plugin);
        match &args.output {
            Some(dir) => {
                let path = dir.join(format!("{}-{}.md", plugin.kind, plugin.name));
                fs::write(&path, page)
                    .map_err(|err| format!("Failed to write '{}': {err}", path.display()))?;
            }
            None => println!("{page}"),
        }
    }

    if let Some(dir) = &args.output {
        println!(
            "Wrote {} reference page(s) to '{}'.",
            plugins.len(),
            dir.display()
        );
    }
    Ok(())
}

fn plugin_page(plugin: &PluginSpec) -> String {
    let mut page = format!("# {}\n\n", plugin.id());
    if !plugin.doc.is_empty() {
        page.push_str(&plugin.doc);
        page.push_str("\n\n");
    }
    let mut sections = plugin.sections().peekable();
    if sections.peek().is_none() {
        page.push_str("This plugin takes no configuration.\n");
        return page;
    }
    for (section, spec) in sections {
        // Demote the section page one heading level under the plugin title.
        let rendered = render_markdown(&format!("{} {section}", plugin.name), spec);
        let mut in_fence = false;
        for line in rendered.lines() {
            if line.starts_with("```") {
                in_fence = !in_fence;
            } else if !in_fence && line.starts_with('#') {
                page.push('#');
            }
            page.push_str(line);
            page.push('\n');
        }
        page.push('\n');
    }
    page
}

fn run_bundle(args: BundleArgs) -> Result<(), String> {
    let paths = collect_spec_paths(&args.inputs).map_err(|e| e.to_string())?;
    let plugins = load_spec_files(&paths).map_err(|e| e.to_string())?;
    let generated_at = chrono::Utc::now().to_rfc3339();
    let package = build_package(
        plugins,
        PACKAGE_VERSION,
        &generated_at,
        args.name,
        args.description,
    )
    .map_err(|e| e.to_string())?;

    write_package(&package, &args.output)
        .map_err(|err| format!("Failed to write '{}': {err}", args.output.display()))?;

    println!(
        "Bundled {} plugin spec(s) into '{}'.",
        package.plugin_count(),
        args.output.display()
    );
    Ok(())
}

#[derive(Debug, Serialize)]
struct PluginSummary {
    id: String,
    sections: Vec<Section>,
    #[serde(skip_serializing_if = "String::is_empty")]
    doc: String,
}

fn run_list(ctx: &Context, args: ListArgs) -> Result<(), String> {
    let registry = ctx.registry()?;
    let summaries: Vec<PluginSummary> = registry
        .plugins()
        .into_iter()
        .map(|plugin| PluginSummary {
            id: plugin.id(),
            sections: plugin.sections().map(|(section, _)| section).collect(),
            doc: plugin.doc.lines().next().unwrap_or_default().to_string(),
        })
        .collect();

    if args.format != CliOutputFormat::Text {
        println!("{}", format_structured(&summaries, args.format)?);
        return Ok(());
    }

    let width = summaries.iter().map(|s| s.id.len()).max().unwrap_or(0);
    for summary in &summaries {
        let sections: Vec<String> = summary.sections.iter().map(ToString::to_string).collect();
        let sections = if sections.is_empty() {
            "-".to_string()
        } else {
            sections.join(",")
        };
        println!("{:<width$}  {:<11}  {}", summary.id, sections, summary.doc);
    }
    println!("{} plugin(s) registered.", summaries.len());
    Ok(())
}

fn format_structured<T: Serialize>(value: &T, format: CliOutputFormat) -> Result<String, String> {
    match format {
        CliOutputFormat::Yaml => {
            serde_yaml::to_string(value).map_err(|err| format!("Failed to serialize YAML: {err}"))
        }
        CliOutputFormat::Json | CliOutputFormat::Text => serde_json::to_string_pretty(value)
            .map_err(|err| format!("Failed to serialize JSON: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockspec_core::{AttrSpec, BlockSpec, NameMatcher, PluginKind, ValueKind};

    #[test]
    fn test_bind_variable_reads_json_then_string() {
        let mut eval = EvalContext::new();
        bind_variable(&mut eval, "replicas=3").unwrap();
        bind_variable(&mut eval, "env=production").unwrap();
        bind_variable(&mut eval, "regions=[\"a\",\"b\"]").unwrap();

        assert_eq!(eval.variable("replicas"), Some(&Value::from(3)));
        assert_eq!(eval.variable("env"), Some(&Value::from("production")));
        assert_eq!(eval.variable("regions").and_then(Value::length), Some(2));
    }

    #[test]
    fn test_bind_variable_rejects_malformed() {
        let mut eval = EvalContext::new();
        assert!(bind_variable(&mut eval, "novalue").is_err());
        assert!(bind_variable(&mut eval, "=3").is_err());
    }

    #[test]
    fn test_redact_secrets_recurses_into_blocks() {
        let spec = RootSpec::new()
            .with_attr(AttrSpec::new("token", ValueKind::String).secret())
            .with_block(
                BlockSpec::new(NameMatcher::labeled("backend", 1))
                    .repeatable()
                    .with_attr(AttrSpec::new("password", ValueKind::String).secret())
                    .with_attr(AttrSpec::new("host", ValueKind::String)),
            );
        let source = "token = \"abc\"\nbackend \"a\" {\n  password = \"p\"\n  host = \"h\"\n}\n";
        let body = syntax::parse(source, "test.conf").unwrap();
        let mut block = decode(&body, &spec, &EvalContext::new()).block;

        redact_secrets(&mut block, &spec);

        assert_eq!(block.get_str("token"), Some(REDACTED));
        assert_eq!(block.blocks[0].get_str("password"), Some(REDACTED));
        assert_eq!(block.blocks[0].get_str("host"), Some("h"));
    }

    #[test]
    fn test_plugin_page_nests_section_headings() {
        let plugin = PluginSpec::new(PluginKind::Publisher, "s3")
            .with_doc("Uploads files.")
            .with_config(RootSpec::new().with_attr(AttrSpec::new("bucket", ValueKind::String)));
        let page = plugin_page(&plugin);
        assert!(page.starts_with("# publisher/s3\n\nUploads files.\n"));
        assert!(page.contains("## s3 config"));
        assert!(page.contains("bucket"));
    }

    #[test]
    fn test_plugin_page_without_sections() {
        let plugin = PluginSpec::new(PluginKind::DataSource, "clock");
        assert!(plugin_page(&plugin).contains("takes no configuration"));
    }
}
