use blockspec_core::*;

fn decode_text(source: &str, spec: &RootSpec) -> Decoded {
    let body = syntax::parse(source, "scenario.conf").expect("scenario source must parse");
    decode(&body, spec, &EvalContext::standard())
}

fn errors(decoded: &Decoded) -> Vec<&Diagnostic> {
    decoded.diagnostics.errors().collect()
}

// ---------------------------------------------------------------------------
// Value checks
// ---------------------------------------------------------------------------

#[test]
fn short_required_string_reports_length_bound() {
    let spec = RootSpec::new().with_attr(
        AttrSpec::new("title", ValueKind::String)
            .with_constraints(Constraints::REQUIRED_NON_NULL)
            .with_min_len(10)
            .with_example("Quarterly report"),
    );
    let decoded = decode_text("title = \"hello\"\n", &spec);

    let errs = errors(&decoded);
    assert_eq!(errs.len(), 1, "{}", decoded.diagnostics);
    assert!(errs[0].detail.contains("length"));
    assert!(errs[0].detail.contains(">= 10"));
    let range = errs[0].range.as_ref().expect("value errors carry a range");
    assert_eq!(range.start.line, 1);
    assert_eq!(range.start.column, 9);
}

#[test]
fn number_outside_fractional_bounds_is_not_in_range() {
    let spec = RootSpec::new().with_attr(AttrSpec::new("ratio", ValueKind::Number).with_min(1.5).with_max(2.5));
    let decoded = decode_text("ratio = 4.2\n", &spec);

    let errs = errors(&decoded);
    assert_eq!(errs.len(), 1);
    assert_eq!(errs[0].summary, "Attribute value not in range");
    assert!(errs[0].detail.contains("between 1.5 and 2.5"), "{}", errs[0].detail);
}

#[test]
fn list_longer_than_upper_bound_is_length_error() {
    let spec = RootSpec::new().with_attr(
        AttrSpec::new("weights", ValueKind::list(ValueKind::Number))
            .with_constraints(Constraints::NON_EMPTY)
            .with_min_len(1)
            .with_max_len(2),
    );
    let decoded = decode_text("weights = [1, 2, 3]\n", &spec);

    let errs = errors(&decoded);
    assert_eq!(errs.len(), 1);
    assert_eq!(errs[0].summary, "Attribute length not in range");
}

#[test]
fn missing_exactly_one_block_is_reported_once() {
    let spec = RootSpec::new().with_block(
        BlockSpec::new(NameMatcher::labeled("output", 1))
            .required()
            .with_attr(AttrSpec::new("path", ValueKind::String).with_default("out.html")),
    );
    let decoded = decode_text("\n", &spec);

    let errs = errors(&decoded);
    assert_eq!(errs.len(), 1);
    assert_eq!(errs[0].summary, "Missing required block");
    assert!(errs[0].detail.contains("output \"label_1\""), "{}", errs[0].detail);
}

#[test]
fn empty_body_decodes_to_defaults_without_diagnostics() {
    let spec = RootSpec::new()
        .with_attr(AttrSpec::new("delimiter", ValueKind::String).with_default(","))
        .with_attr(AttrSpec::new("skip_header", ValueKind::Bool).with_default(false))
        .with_attr(AttrSpec::new("limit", ValueKind::Number))
        .with_block(BlockSpec::new(NameMatcher::exact("column", &[])).repeatable());
    let decoded = decode_text("", &spec);

    assert!(decoded.diagnostics.is_empty(), "{}", decoded.diagnostics);
    let block = decoded.into_result().unwrap();
    assert_eq!(block.get_str("delimiter"), Some(","));
    assert_eq!(block.get_bool("skip_header"), Some(false));
    assert_eq!(block.get("limit"), Some(&Value::Null));
    assert!(block.blocks.is_empty());
}

// ---------------------------------------------------------------------------
// Structure
// ---------------------------------------------------------------------------

#[test]
fn attribute_and_block_sharing_a_name_conflict_once() {
    let spec = RootSpec::new().with_attr(AttrSpec::new("theme", ValueKind::String).required().with_example("dark"));
    let decoded = decode_text("theme = \"dark\"\ntheme {\n  accent = \"blue\"\n}\ntheme = \"light\"\n", &spec);

    let errs = errors(&decoded);
    assert_eq!(errs.len(), 1, "{}", decoded.diagnostics);
    assert_eq!(errs[0].summary, "Attribute and block name conflict");
    assert!(decoded.block.get("theme").is_none());
}

#[test]
fn nested_repeatable_blocks_keep_source_order() {
    let column = NameMatcher::labeled("column", 1);
    let spec = RootSpec::new().with_block(
        BlockSpec::new(NameMatcher::exact("table", &[]))
            .required()
            .with_block(
                BlockSpec::new(column.clone())
                    .repeatable()
                    .with_attr(AttrSpec::new("width", ValueKind::Number).with_min(1.0).with_default(10)),
            ),
    );
    let source = r#"
table {
  column "name" {
    width = 20
  }
  column "total" {}
}
"#;
    let decoded = decode_text(source, &spec).into_result().unwrap();
    let table = decoded.block(&NameMatcher::exact("table", &[])).unwrap();
    let widths: Vec<(String, f64)> = table
        .blocks(&column)
        .map(|c| (c.labels[0].clone(), c.get_f64("width").unwrap()))
        .collect();
    assert_eq!(widths, vec![("name".to_string(), 20.0), ("total".to_string(), 10.0)]);

    let value = decoded.to_value();
    let Value::Map(root) = value else { panic!("root decodes to a map") };
    let Some(Value::List(tables)) = root.get("table") else { panic!("tables are grouped in a list") };
    assert_eq!(tables.len(), 1);
}

#[test]
fn variables_and_functions_feed_attribute_values() {
    let spec = RootSpec::new()
        .with_attr(AttrSpec::new("region", ValueKind::String).required().with_example("eu-west-1"))
        .with_attr(AttrSpec::new("tags", ValueKind::list(ValueKind::String)));
    let ctx = EvalContext::standard().with_variable("env", Value::map([("region", Value::from("us-east-2"))]));
    let body = syntax::parse("region = upper(env.region)\ntags = [\"a\", env.region]\n", "vars.conf").unwrap();

    let decoded = decode(&body, &spec, &ctx).into_result().unwrap();
    assert_eq!(decoded.get_str("region"), Some("US-EAST-2"));
    assert_eq!(
        decoded.get("tags"),
        Some(&Value::list([Value::from("a"), Value::from("us-east-2")]))
    );
}

#[test]
fn missing_configuration_body_respects_requiredness() {
    let range = SourceRange::new("site.conf", Pos::default(), Pos::default());
    let optional = RootSpec::new().with_attr(AttrSpec::new("verbose", ValueKind::Bool).with_default(false));
    let decoded = decode_optional(None, &optional, &EvalContext::new(), &range);
    assert!(decoded.diagnostics.is_empty());
    assert_eq!(decoded.block.get_bool("verbose"), Some(false));

    let required = optional.required();
    let decoded = decode_optional(None, &required, &EvalContext::new(), &range);
    assert_eq!(errors(&decoded).len(), 1);
    assert_eq!(errors(&decoded)[0].summary, "Missing required configuration");
}

#[test]
fn diagnostics_render_with_source_pointer() {
    let spec = RootSpec::new().with_attr(AttrSpec::new("retries", ValueKind::Number).with_max(3.0));
    let source = "retries = 7\n";
    let decoded = decode_text(source, &spec);

    let rendered = decoded.diagnostics.render(Some(source));
    assert!(rendered.contains("error: Attribute value not in range"), "{rendered}");
    assert!(rendered.contains("--> scenario.conf:1:11"), "{rendered}");
    assert!(rendered.contains("1 | retries = 7"), "{rendered}");
}
