use blockspec_core::*;

fn publisher_spec() -> RootSpec {
    RootSpec::new()
        .with_doc("Uploads the rendered site to object storage.")
        .with_attr(
            AttrSpec::new("bucket", ValueKind::String)
                .with_doc("Target bucket.")
                .with_constraints(Constraints::REQUIRED_MEANINGFUL)
                .with_example("docs-site"),
        )
        .with_attr(
            AttrSpec::new("prefix", ValueKind::String)
                .with_constraints(Constraints::REQUIRED | Constraints::TRIMMED_NON_EMPTY)
                .with_min_len(12),
        )
        .with_attr(
            AttrSpec::new("storage_class", ValueKind::String)
                .required()
                .with_one_of([Value::from("standard"), Value::from("archive")]),
        )
        .with_attr(
            AttrSpec::new("parallelism", ValueKind::Number)
                .with_constraints(Constraints::REQUIRED | Constraints::INTEGER)
                .with_min(2.5)
                .with_max(7.0),
        )
        .with_attr(AttrSpec::new("timeout", ValueKind::Number).with_default(30).with_min(1.0))
        .with_attr(
            AttrSpec::new("retry_codes", ValueKind::list(ValueKind::Number))
                .with_constraints(Constraints::REQUIRED | Constraints::NON_EMPTY)
                .with_max_len(3),
        )
        .with_attr(
            AttrSpec::new("headers", ValueKind::map(ValueKind::String))
                .required()
                .with_min_len(2),
        )
        .with_attr(
            AttrSpec::new("origin", ValueKind::Tuple(vec![ValueKind::String, ValueKind::Bool]))
                .required(),
        )
        .with_attr(AttrSpec::new("filter", ValueKind::Capsule("jq_query".into())))
        .with_attr(
            AttrSpec::new("acl", ValueKind::String)
                .with_default("private")
                .deprecated("Use bucket policies instead."),
        )
        .with_attr(
            AttrSpec::new("access_key", ValueKind::String)
                .secret()
                .required()
                .with_example("AKIA0000"),
        )
        .with_opaque(OpaqueSpec::new("metadata").required().with_doc("Copied onto every object."))
        .with_block(
            BlockSpec::new(NameMatcher::labeled("route", 1))
                .required()
                .repeatable()
                .with_doc("Maps a path prefix to cache settings.")
                .with_attr(AttrSpec::new("cache", ValueKind::Bool).with_default(true))
                .with_block(
                    BlockSpec::new(NameMatcher::exact("header", &["cache-control"]))
                        .required()
                        .with_attr(
                            AttrSpec::new("value", ValueKind::String)
                                .with_constraints(Constraints::REQUIRED_NON_NULL)
                                .with_example("max-age=60"),
                        ),
                ),
        )
        .with_block(BlockSpec::new(NameMatcher::exact("notify", &[])).with_attr(
            AttrSpec::new("channel", ValueKind::String).required().with_example("#releases"),
        ))
}

#[test]
fn rich_spec_is_valid() {
    let spec = publisher_spec();
    let diags = spec.validate_spec();
    assert!(!diags.has_errors(), "{diags}");
}

#[test]
fn rendered_example_decodes_cleanly() {
    let spec = publisher_spec();
    let text = render_example(&spec, &DocOptions::default());
    let body = syntax::parse(&text, "example.conf").unwrap_or_else(|d| panic!("{d}\n{text}"));

    let decoded = decode(&body, &spec, &EvalContext::new());
    assert!(!decoded.has_errors(), "{}\n{text}", decoded.diagnostics);
}

#[test]
fn rendered_example_without_comments_decodes_cleanly() {
    let spec = publisher_spec();
    let text = render_example(&spec, &DocOptions::default().without_comments());
    assert!(!text.contains("# Target bucket."));

    let body = syntax::parse(&text, "example.conf").unwrap();
    assert!(!decode(&body, &spec, &EvalContext::new()).has_errors(), "{text}");
}

#[test]
fn rendered_example_uses_declared_values_and_placeholders() {
    let text = render_example(&publisher_spec(), &DocOptions::default());
    assert!(text.contains("bucket = \"docs-site\"\n"), "{text}");
    assert!(text.contains("prefix = \"examplexxxxx\"\n"), "{text}");
    assert!(text.contains("storage_class = \"standard\"\n"), "{text}");
    assert!(text.contains("parallelism = 3\n"), "{text}");
    assert!(text.contains("timeout = 30\n"), "{text}");
    assert!(text.contains("# filter = <jq_query>\n"), "{text}");
    assert!(text.contains("metadata = {}\n"), "{text}");
    assert!(text.contains("route \"label_1\" {\n"), "{text}");
    assert!(text.contains("  header \"cache-control\" {\n"), "{text}");
    assert!(text.contains("# number, required, value between 2.5 and 7, integer\n"), "{text}");
}

#[test]
fn block_example_decodes_with_decode_block() {
    let spec = BlockSpec::new(NameMatcher::labeled("source", 2)).with_attr(
        AttrSpec::new("url", ValueKind::String)
            .with_constraints(Constraints::REQUIRED_MEANINGFUL)
            .with_example("https://example.com/feed.json"),
    );
    let text = render_block_example(&spec, &DocOptions::default());
    let body = syntax::parse(&text, "block.conf").unwrap();
    assert_eq!(body.blocks.len(), 1);

    let decoded = decode_block(&body.blocks[0], &spec, &EvalContext::new());
    assert!(!decoded.has_errors(), "{}", decoded.diagnostics);
    assert_eq!(decoded.block.labels, vec!["label_1".to_string(), "label_2".to_string()]);
}

#[test]
fn markdown_reference_lists_every_part() {
    let page = render_markdown("s3 publisher", &publisher_spec());
    assert!(page.starts_with("# s3 publisher\n\nUploads the rendered site to object storage.\n"));
    assert!(page.contains("This configuration is **required**."));
    assert!(page.contains("| `bucket` | string | yes | - |"), "{page}");
    assert!(page.contains("| `timeout` | number | no | `30` |"), "{page}");
    assert!(page.contains("### `route \"label_1\"` (one or more)"), "{page}");
    assert!(page.contains("#### `header \"cache-control\"` (exactly one)"), "{page}");
    assert!(page.contains("- `metadata`: Copied onto every object."), "{page}");
    assert!(page.contains("## Example\n\n```\n"));
    assert!(page.trim_end().ends_with("```"));
}

#[test]
fn converted_enumerations_and_non_null_attributes_decode() {
    let spec = RootSpec::new()
        .with_attr(
            AttrSpec::new("level", ValueKind::String)
                .required()
                .with_one_of([Value::from(1), Value::from(2)]),
        )
        .with_attr(
            AttrSpec::new("title", ValueKind::String).with_constraints(Constraints::MEANINGFUL),
        )
        .with_attr(
            AttrSpec::new("ratio", ValueKind::Number)
                .with_constraints(Constraints::INTEGER)
                .with_min(1.5)
                .with_max(2.2),
        );
    assert!(!spec.validate_spec().has_errors());

    let text = render_example(&spec, &DocOptions::default().without_comments());
    assert!(text.contains("level = 1\n"), "{text}");
    assert!(text.contains("title = \"example\"\n"), "{text}");

    let body = syntax::parse(&text, "example.conf").unwrap();
    let decoded = decode(&body, &spec, &EvalContext::new());
    assert!(!decoded.has_errors(), "{}\n{text}", decoded.diagnostics);
    assert_eq!(decoded.block.get_str("level"), Some("1"));
}
