//! Filled templates must validate against their own schema, and every
//! emitter must be deterministic.

use std::path::PathBuf;

use nml_codegen::{
    generate_docs, generate_fortran, generate_helper, render_template, DocMode, FortranOptions,
    HandlebarsRenderer, HelperConstant, MarkdownOptions, Overrides, TemplateOptions, ValueMode,
};
use nml_core::{ConstantValue, Constants};
use nml_schema::{load_schema, parse_namelist, validate_namelist, NamelistSchema};
use proptest::prelude::*;
use serde_json::{json, Value};

/// Find the repository root.
fn repo_root() -> PathBuf {
    let mut dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    dir.pop(); // crates/
    dir.pop(); // repo root
    dir
}

fn constants() -> Constants {
    let mut c = Constants::new();
    c.insert("max_params", ConstantValue::Integer(4));
    c.insert("name_len", ConstantValue::Integer(16));
    c
}

fn fixture() -> Value {
    load_schema(&repo_root().join("fixtures/01_simple/optimization.yml")).unwrap()
}

fn fixture_options() -> FortranOptions {
    FortranOptions {
        kind_module: Some("mo_kind".to_string()),
        kind_map: [("i4", "int32"), ("i8", "int64"), ("dp", "real64")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        kind_allowlist: ["dp", "i4", "i8"].into_iter().map(str::to_string).collect(),
        ..FortranOptions::default()
    }
}

fn filled(schema: &NamelistSchema, doc_mode: DocMode) -> String {
    render_template(
        std::slice::from_ref(schema),
        &TemplateOptions {
            doc_mode,
            value_mode: ValueMode::Filled,
        },
        &Overrides::new(),
        &HandlebarsRenderer::new().unwrap(),
    )
    .unwrap()
}

fn assert_round_trip(raw: &Value, constants: &Constants) {
    let schema = NamelistSchema::resolve(raw, constants).unwrap();
    for doc_mode in [DocMode::Plain, DocMode::Documented] {
        let text = filled(&schema, doc_mode);
        let groups = parse_namelist(&text, "template").unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, schema.name);
        validate_namelist(raw, &groups[0].values, constants)
            .unwrap_or_else(|e| panic!("{e}\n---\n{text}"));
    }
}

#[test]
fn fixture_filled_template_validates() {
    assert_round_trip(&fixture(), &constants());
}

#[test]
fn fixture_template_slices_row_major_ranges() {
    let schema = NamelistSchema::resolve(&fixture(), &constants()).unwrap();
    let text = filled(&schema, DocMode::Plain);
    assert!(text.contains("  method = 'DDS'\n"));
    assert!(text.contains("  niterations = 1000\n"));
    assert!(text.contains("  weights = 4*1.0\n"));
    assert!(text.contains("  ranges(1, :) = 0.0, 1.0, 0.0, 0.0\n"));
    assert!(text.contains("  ranges(2, :) = 0.0, 0.0, 0.0, 0.0\n"));
    assert!(text.contains("  levels = 3*1\n"));
}

#[test]
fn minimal_filled_template_of_fixture_validates() {
    let raw = fixture();
    let schema = NamelistSchema::resolve(&raw, &constants()).unwrap();
    let text = render_template(
        &[schema],
        &TemplateOptions {
            doc_mode: DocMode::Documented,
            value_mode: ValueMode::MinimalFilled,
        },
        &Overrides::new(),
        &HandlebarsRenderer::new().unwrap(),
    )
    .unwrap();
    assert!(!text.contains("tolerance ="));
    let groups = parse_namelist(&text, "template").unwrap();
    validate_namelist(&raw, &groups[0].values, &constants()).unwrap();
}

fn rendered(schema: &NamelistSchema, doc_mode: DocMode, value_mode: ValueMode) -> String {
    render_template(
        std::slice::from_ref(schema),
        &TemplateOptions { doc_mode, value_mode },
        &Overrides::new(),
        &HandlebarsRenderer::new().unwrap(),
    )
    .unwrap()
}

#[test]
fn fixture_empty_templates_read_back_unset() {
    let raw = fixture();
    let schema = NamelistSchema::resolve(&raw, &constants()).unwrap();
    let mut optional = raw.clone();
    optional.as_object_mut().unwrap().remove("required");

    for value_mode in [ValueMode::Empty, ValueMode::MinimalEmpty] {
        for doc_mode in [DocMode::Plain, DocMode::Documented] {
            let text = rendered(&schema, doc_mode, value_mode);
            let groups = parse_namelist(&text, "template").unwrap_or_else(|e| panic!("{e}\n---\n{text}"));
            assert_eq!(groups.len(), 1);
            let values = &groups[0].values;
            assert!(values.values().all(Value::is_null), "{values:?}\n---\n{text}");
            if value_mode == ValueMode::MinimalEmpty {
                assert_eq!(values.keys().collect::<Vec<_>>(), vec!["method", "niterations"]);
            } else {
                assert_eq!(values.len(), schema.properties.len());
            }

            let err = validate_namelist(&raw, values, &constants()).unwrap_err();
            assert_eq!(err.to_string(), "method: required property is missing");
            validate_namelist(&optional, values, &constants()).unwrap();
        }
    }
}

#[test]
fn empty_template_writes_whole_array_slices() {
    let schema = NamelistSchema::resolve(&fixture(), &constants()).unwrap();
    let text = rendered(&schema, DocMode::Plain, ValueMode::Empty);
    assert!(text.contains("  weights(:) =\n"));
    assert!(text.contains("  ranges(:, :) =\n"));
}

#[test]
fn bounded_and_enum_fields_round_trip() {
    assert_round_trip(
        &json!({
            "x-fortran-namelist": "bounded",
            "type": "object",
            "required": ["count", "scale"],
            "properties": {
                "count": {"type": "integer", "minimum": 3, "maximum": 9},
                "scale": {"type": "number", "exclusiveMinimum": 0.0},
                "grid": {"type": "array", "x-fortran-shape": [2, 3], "items": {"type": "integer"}, "default": [1, 2, 3, 4, 5, 6]},
                "mode": {"type": "array", "x-fortran-shape": 2, "items": {"type": "string", "x-fortran-len": 4, "enum": ["a", "b"]}},
            },
        }),
        &Constants::new(),
    );
}

#[test]
fn fixture_outputs_are_deterministic() {
    let renderer = HandlebarsRenderer::new().unwrap();
    let schema = NamelistSchema::resolve(&fixture(), &constants()).unwrap();
    let again = NamelistSchema::resolve(&fixture(), &constants()).unwrap();

    let a = generate_fortran(&schema, &fixture_options(), &renderer).unwrap();
    let b = generate_fortran(&again, &fixture_options(), &renderer).unwrap();
    assert_eq!(a, b);
    assert!(a.contains("use mo_kind, only: i4 => int32, dp => real64, i8 => int64"));
    assert!(a.contains("this%ranges = reshape(ranges_default, shape(this%ranges), pad=[ranges_pad], order=[2, 1])"));

    let options = MarkdownOptions::default();
    assert_eq!(
        generate_docs(&schema, &options, &renderer).unwrap(),
        generate_docs(&again, &options, &renderer).unwrap()
    );
}

#[test]
fn helper_declares_config_constants() {
    let constants = vec![
        HelperConstant {
            name: "max_params".to_string(),
            value: ConstantValue::Integer(4),
            doc: Some("maximum number of parameters".to_string()),
        },
        HelperConstant {
            name: "name_len".to_string(),
            value: ConstantValue::Integer(16),
            doc: None,
        },
    ];
    let out = generate_helper("nml_helper", &constants, &HandlebarsRenderer::new().unwrap()).unwrap();
    assert!(out.contains("integer, parameter, public :: max_params = 4"));
    assert!(out.contains("integer, parameter, public :: name_len = 16"));
}

fn integer_schema(default: i64, lo: i64, span: i64, extent: u64) -> Value {
    json!({
        "x-fortran-namelist": "prop_nml",
        "type": "object",
        "properties": {
            "n": {"type": "integer", "minimum": lo, "maximum": lo + span},
            "v": {"type": "array", "x-fortran-shape": extent, "items": {"type": "integer", "default": default}},
        },
    })
}

proptest! {
    #[test]
    fn generation_is_deterministic(default in -1000i64..1000, lo in -50i64..50, span in 0i64..20, extent in 1u64..6) {
        let raw = integer_schema(default, lo, span, extent);
        let renderer = HandlebarsRenderer::new().unwrap();
        let one = NamelistSchema::resolve(&raw, &Constants::new()).unwrap();
        let two = NamelistSchema::resolve(&raw, &Constants::new()).unwrap();
        prop_assert_eq!(
            generate_fortran(&one, &FortranOptions::default(), &renderer).unwrap(),
            generate_fortran(&two, &FortranOptions::default(), &renderer).unwrap()
        );
    }

    #[test]
    fn filled_templates_validate(default in -1000i64..1000, lo in -50i64..50, span in 0i64..20, extent in 1u64..6) {
        let raw = integer_schema(default, lo, span, extent);
        let schema = NamelistSchema::resolve(&raw, &Constants::new()).unwrap();
        let text = filled(&schema, DocMode::Documented);
        let groups = parse_namelist(&text, "template").unwrap();
        prop_assert!(validate_namelist(&raw, &groups[0].values, &Constants::new()).is_ok());
    }
}
