use opjson::{CompileErrorKind, EncodeErrorKind, EncodeOptions, Encoder};
use opjson_shape::{Field, Kind, Shape, Value, shapes};
use opjson_testhelpers::{IPanic, assert_json_eq};
use serde_json::json;

static STRINGS: Shape = Shape::new("[]string", Kind::Slice(|| &shapes::STRING));
static USER_FIELDS: [Field; 3] = [
    Field::new("ID", || &shapes::INT),
    Field::new("Name", || &shapes::STRING).tag(",omitempty"),
    Field::new("Tags", || &STRINGS),
];
static USER: Shape = Shape::new("User", Kind::Struct(&USER_FIELDS));

// Interfaces

static ENVELOPE_FIELDS: [Field; 2] = [
    Field::new("Kind", || &shapes::STRING),
    Field::new("Body", || &shapes::INTERFACE),
];
static ENVELOPE: Shape = Shape::new("Envelope", Kind::Struct(&ENVELOPE_FIELDS));
static ANYS: Shape = Shape::new("[]interface {}", Kind::Slice(|| &shapes::INTERFACE));

fn envelope(kind: &str, body: Value) -> Value {
    Value::structure([Value::from(kind), body])
}

#[test]
fn interfaces_dispatch_on_the_held_type() -> Result<(), IPanic> {
    opjson_testhelpers::setup();
    let encoder = Encoder::new();
    let user = Value::structure([
        Value::from(7i64),
        Value::from(""),
        Value::from(vec!["x", "y"]),
    ]);

    assert_eq!(
        encoder.encode_to_string(&ENVELOPE, &envelope("user", Value::dynamic(&USER, user)))?,
        r#"{"Kind":"user","Body":{"ID":7,"Tags":["x","y"]}}"#
    );
    assert_eq!(
        encoder.encode_to_string(&ENVELOPE, &envelope("n", Value::dynamic(&shapes::INT, 5i64)))?,
        r#"{"Kind":"n","Body":5}"#
    );
    assert_eq!(
        encoder.encode_to_string(&ENVELOPE, &envelope("none", Value::Null))?,
        r#"{"Kind":"none","Body":null}"#
    );
    assert!(encoder.cache().contains(&USER));
    assert!(encoder.cache().contains(&shapes::INT));
    Ok(())
}

#[test]
fn interface_elements_nest() -> Result<(), IPanic> {
    let value = Value::Seq(vec![
        Value::dynamic(&shapes::STRING, "a"),
        Value::dynamic(&shapes::INT, 1i64),
        Value::Null,
        Value::dynamic(&ANYS, vec![Value::dynamic(&shapes::BOOL, true)]),
    ]);
    let out = Encoder::new().encode(&ANYS, &value)?;
    assert_eq!(out, br#"["a",1,null,[true]]"#);
    Ok(())
}

#[test]
fn unsupported_held_types_fail_at_the_interface() {
    let encoder = Encoder::new();
    let value = envelope("f", Value::dynamic(&shapes::FUNC, Value::Null));
    let err = encoder.encode(&ENVELOPE, &value).unwrap_err();
    match &err.kind {
        EncodeErrorKind::UnsupportedValue { type_name, reason } => {
            assert_eq!(*type_name, "func()");
            assert!(reason.contains("not serializable"), "{reason}");
        }
        other => panic!("expected an unsupported value, got {other:?}"),
    }
    assert_eq!(err.path.to_string(), "$.Body");
}

#[test]
fn errors_inside_dispatched_programs_keep_the_outer_path() {
    let encoder = Encoder::new();
    let bad_user = Value::structure([Value::from("seven"), Value::from(""), Value::Null]);
    let err = encoder
        .encode(&ENVELOPE, &envelope("user", Value::dynamic(&USER, bad_user)))
        .unwrap_err();
    assert_eq!(err.path.to_string(), "$.Body.ID");
    assert_eq!(err.root, "Envelope");
}

#[test]
fn interface_fields_need_interface_values() {
    let err = Encoder::new()
        .encode(&ENVELOPE, &envelope("raw", Value::from(3i64)))
        .unwrap_err();
    assert_eq!(
        err.kind,
        EncodeErrorKind::ShapeMismatch {
            type_name: "interface {}",
            expected: "interface",
            found: "int",
        }
    );
}

#[test]
fn encode_dyn_accepts_self_describing_values() -> Result<(), IPanic> {
    let encoder = Encoder::new();
    let value = Value::dynamic(&STRINGS, vec!["a"]);
    assert_eq!(encoder.encode_dyn(&value)?, br#"["a"]"#);
    Ok(())
}

// Maps

static SCORES: Shape = Shape::new("map[string]int", Kind::Map(|| &shapes::STRING, || &shapes::INT));
static BY_ID: Shape = Shape::new("map[int]string", Kind::Map(|| &shapes::INT, || &shapes::STRING));
static RATIOS: Shape = Shape::new(
    "map[string]float64",
    Kind::Map(|| &shapes::STRING, || &shapes::FLOAT64),
);

fn scores() -> Value {
    Value::map([("b", 2i64), ("a", 1), ("c", 3)])
}

#[test]
fn map_keys_are_sorted_by_default() -> Result<(), IPanic> {
    let encoder = Encoder::new();
    assert_eq!(encoder.encode(&SCORES, &scores())?, br#"{"a":1,"b":2,"c":3}"#);
    let by_id = Value::map([(2i64, "two"), (10, "ten"), (-1, "neg")]);
    assert_eq!(
        encoder.encode(&BY_ID, &by_id)?,
        br#"{"-1":"neg","10":"ten","2":"two"}"#
    );
    Ok(())
}

#[test]
fn unsorted_maps_keep_entry_order() -> Result<(), IPanic> {
    let encoder = Encoder::with_options(EncodeOptions::default().sort_map_keys(false));
    assert_eq!(encoder.encode(&SCORES, &scores())?, br#"{"b":2,"a":1,"c":3}"#);
    let names = encoder.program(&SCORES)?.op_names();
    assert_eq!(names[0], "MapHead");
    let names = Encoder::new().program(&SCORES)?.op_names();
    assert_eq!(names[0], "MapHeadLoad");
    Ok(())
}

#[test]
fn nil_and_empty_maps() -> Result<(), IPanic> {
    let encoder = Encoder::new();
    assert_eq!(encoder.encode(&SCORES, &Value::Null)?, b"null");
    assert_eq!(encoder.encode(&SCORES, &Value::Map(vec![]))?, b"{}");
    Ok(())
}

#[test]
fn map_keys_are_escaped() -> Result<(), IPanic> {
    let value = Value::map([("<k>", 1i64), ("q\"uote", 2)]);
    let out = Encoder::new().encode(&SCORES, &value)?;
    assert!(!out.contains(&b'<'));
    assert_json_eq(&out, json!({"<k>": 1, "q\"uote": 2}));
    Ok(())
}

#[test]
fn map_value_errors_name_the_key() {
    let value = Value::map([("ok", 1.0), ("bad", f64::NAN)]);
    let err = Encoder::new().encode(&RATIOS, &value).unwrap_err();
    assert_eq!(err.path.to_string(), r#"$["bad"]"#);
}

static FLAGS: Shape = Shape::new("map[bool]int", Kind::Map(|| &shapes::BOOL, || &shapes::INT));
static HOLDER_FIELDS: [Field; 1] = [Field::new("M", || &FLAGS)];
static HOLDER: Shape = Shape::new("Holder", Kind::Struct(&HOLDER_FIELDS));

#[test]
fn unsupported_map_keys_do_not_compile() {
    let err = Encoder::new().program(&HOLDER).unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::UnsupportedMapKey { type_name: "bool" });
    assert_eq!(err.path.to_string(), "$.M");
}

static USER_ID: Shape = Shape::new("UserID", Kind::Int).marshal_text(|value| match value {
    Value::Int(n) => Ok(format!("user-{n}")),
    _ => Err("not a user id".to_string()),
});
static BY_USER: Shape = Shape::new("map[UserID]int", Kind::Map(|| &USER_ID, || &shapes::INT));

#[test]
fn text_hooks_render_map_keys() -> Result<(), IPanic> {
    let value = Value::map([(2i64, 20i64), (1, 10)]);
    assert_eq!(
        Encoder::new().encode(&BY_USER, &value)?,
        br#"{"user-1":10,"user-2":20}"#
    );
    Ok(())
}

// Hooks

static RAW: Shape = Shape::new("Raw", Kind::String).marshal_json(|value| match value {
    Value::String(s) => Ok(s.clone().into_bytes()),
    _ => Err("raw JSON must be text".to_string()),
});
static RAW_PTR: Shape = Shape::new("*Raw", Kind::Pointer(|| &RAW));
static LEVEL: Shape = Shape::new("Level", Kind::Int).marshal_text(|value| match value {
    Value::Int(0) => Ok("low".to_string()),
    Value::Int(1) => Ok("<high>".to_string()),
    other => Err(format!("no level for {other:?}")),
});

static HOOKED_FIELDS: [Field; 3] = [
    Field::new("Payload", || &RAW),
    Field::new("Maybe", || &RAW_PTR),
    Field::new("Level", || &LEVEL),
];
static HOOKED: Shape = Shape::new("Hooked", Kind::Struct(&HOOKED_FIELDS));

#[test]
fn json_hooks_are_emitted_verbatim() -> Result<(), IPanic> {
    let encoder = Encoder::with_options(EncodeOptions::default().escape_html(false));
    let value = Value::structure([
        Value::from(r#"{"pre": [1, 2]}"#),
        Value::Null,
        Value::from(1i64),
    ]);
    assert_eq!(
        encoder.encode_to_string(&HOOKED, &value)?,
        r#"{"Payload":{"pre": [1, 2]},"Maybe":null,"Level":"<high>"}"#
    );

    let value = Value::structure([
        Value::from("true"),
        Value::ptr("false"),
        Value::from(0i64),
    ]);
    assert_eq!(
        encoder.encode_to_string(&HOOKED, &value)?,
        r#"{"Payload":true,"Maybe":false,"Level":"low"}"#
    );
    assert_eq!(encoder.encode_to_string(&RAW, &Value::from("[]"))?, "[]");
    Ok(())
}

#[test]
fn text_hooks_are_escaped_when_asked() -> Result<(), IPanic> {
    let value = Value::structure([Value::from("1"), Value::Null, Value::from(1i64)]);
    let out = Encoder::new().encode(&HOOKED, &value)?;
    assert!(!out.contains(&b'<'));
    assert_json_eq(&out, json!({"Payload": 1, "Maybe": null, "Level": "<high>"}));
    Ok(())
}

#[test]
fn hook_failures_carry_type_and_path() {
    let value = Value::structure([Value::from("1"), Value::Null, Value::from(7i64)]);
    let err = Encoder::new().encode(&HOOKED, &value).unwrap_err();
    assert_eq!(
        err.kind,
        EncodeErrorKind::Marshal {
            type_name: "Level",
            message: "no level for Int(7)".to_string(),
        }
    );
    assert_eq!(err.path.to_string(), "$.Level");
    assert_eq!(
        err.to_string(),
        "marshal failed for type Level: no level for Int(7) (encoding Hooked at $.Level)"
    );
}
