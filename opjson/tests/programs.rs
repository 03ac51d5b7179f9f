use opjson::{CompileOptions, Encoder, compile};
use opjson_shape::{Field, Kind, Shape, Value, shapes};
use opjson_testhelpers::{IPanic, assert_json_eq};
use serde_json::json;

static STRINGS: Shape = Shape::new("[]string", Kind::Slice(|| &shapes::STRING));

static USER_FIELDS: [Field; 3] = [
    Field::new("ID", || &shapes::INT64),
    Field::new("Name", || &shapes::STRING).tag(",omitempty"),
    Field::new("Tags", || &STRINGS),
];
static USER: Shape = Shape::new("User", Kind::Struct(&USER_FIELDS));

static NODE_FIELDS: [Field; 2] = [
    Field::new("Value", || &shapes::INT),
    Field::new("Next", || &NODE_PTR),
];
static NODE: Shape = Shape::new("Node", Kind::Struct(&NODE_FIELDS));
static NODE_PTR: Shape = Shape::new("*Node", Kind::Pointer(|| &NODE));

#[test]
fn struct_listing() -> Result<(), IPanic> {
    opjson_testhelpers::setup();
    let program = compile(&USER, CompileOptions::default())?;
    insta::assert_snapshot!(program.to_string().trim_end(), @r#"
    000 StructEscapedFieldHeadInt64 "ID":
    001 StructEscapedFieldOmitEmptyString "Name":
    002 StructEscapedFieldSlice "Tags": next=7
    003 SliceHead next=7
    004 EscapedString
    005 SliceElem next=4
    006 SliceEnd
    007 StructEnd
    008 End
    "#);
    Ok(())
}

#[test]
fn sole_field_listing() -> Result<(), IPanic> {
    static FIELDS: [Field; 1] = [Field::new("a", || &shapes::INT)];
    static SOLE: Shape = Shape::new("Sole", Kind::Struct(&FIELDS));
    let program = compile(&SOLE, CompileOptions::default())?;
    insta::assert_snapshot!(program.to_string().trim_end(), @r#"
    000 StructEscapedFieldHeadIntOnly "a":
    001 End
    "#);
    Ok(())
}

#[test]
fn recursive_listing() -> Result<(), IPanic> {
    let program = compile(&NODE, CompileOptions::default())?;
    insta::assert_snapshot!(program.to_string().trim_end(), @r#"
    000 StructEscapedFieldHeadInt "Value":
    001 StructEscapedFieldPointer "Next": next=4
    002 Ptr next=4
    003 StructFieldRecursive call=0
    004 StructEnd
    005 End
    -- recursion 0: Node
    006 StructEscapedFieldHeadInt "Value":
    007 StructEscapedFieldPointer "Next": next=10
    008 Ptr next=10
    009 StructFieldRecursive call=0
    010 StructEnd
    011 StructFieldRecursiveEnd
    "#);
    Ok(())
}

#[test]
fn compilation_is_deterministic() -> Result<(), IPanic> {
    let options = CompileOptions::default();
    assert_eq!(compile(&USER, options)?, compile(&USER, options)?);
    assert_eq!(compile(&NODE, options)?, compile(&NODE, options)?);
    Ok(())
}

fn chain(depth: usize) -> Value {
    let mut next = Value::Null;
    for value in (1..depth).rev() {
        next = Value::ptr(Value::structure([Value::from(value), next]));
    }
    Value::structure([Value::from(0usize), next])
}

fn expected_chain(depth: usize) -> String {
    let mut out = String::new();
    for value in 0..depth {
        out.push_str(&format!(r#"{{"Value":{value},"Next":"#));
    }
    out.push_str("null");
    out.push_str(&"}".repeat(depth));
    out
}

#[test]
fn deep_chains_run_on_a_bounded_program() -> Result<(), IPanic> {
    opjson_testhelpers::setup();
    let encoder = Encoder::new();
    let program = encoder.program(&NODE)?;
    assert_eq!(program.recursions.len(), 1);
    let len = program.len();

    for depth in [1, 2, 10, 1000] {
        let out = encoder.encode_to_string(&NODE, &chain(depth))?;
        assert_eq!(out, expected_chain(depth), "depth {depth}");
    }
    // the program did not grow with the data
    assert_eq!(encoder.program(&NODE)?.len(), len);
    Ok(())
}

static TREE_FIELDS: [Field; 2] = [
    Field::new("Name", || &shapes::STRING),
    Field::new("Children", || &TREES).tag(",omitempty"),
];
static TREE: Shape = Shape::new("Tree", Kind::Struct(&TREE_FIELDS));
static TREES: Shape = Shape::new("[]Tree", Kind::Slice(|| &TREE));

fn tree(name: &str, children: Vec<Value>) -> Value {
    Value::structure([Value::from(name), Value::Seq(children)])
}

#[test]
fn recursion_through_slices() -> Result<(), IPanic> {
    let encoder = Encoder::new();
    let value = tree(
        "root",
        vec![
            tree("a", vec![tree("a1", vec![]), tree("a2", vec![])]),
            tree("b", vec![]),
        ],
    );
    assert_json_eq(
        &encoder.encode(&TREE, &value)?,
        json!({
            "Name": "root",
            "Children": [
                {"Name": "a", "Children": [{"Name": "a1"}, {"Name": "a2"}]},
                {"Name": "b"}
            ]
        }),
    );
    let program = encoder.program(&TREE)?;
    assert_eq!(program.recursions.len(), 1);
    assert_eq!(program.recursions[0].shape.type_name, "Tree");
    Ok(())
}

static LEFT_FIELDS: [Field; 2] = [
    Field::new("L", || &shapes::STRING),
    Field::new("Right", || &RIGHT_PTR),
];
static LEFT: Shape = Shape::new("Left", Kind::Struct(&LEFT_FIELDS));
static LEFT_PTR: Shape = Shape::new("*Left", Kind::Pointer(|| &LEFT));

static RIGHT_FIELDS: [Field; 2] = [
    Field::new("R", || &shapes::STRING),
    Field::new("Left", || &LEFT_PTR),
];
static RIGHT: Shape = Shape::new("Right", Kind::Struct(&RIGHT_FIELDS));
static RIGHT_PTR: Shape = Shape::new("*Right", Kind::Pointer(|| &RIGHT));

#[test]
fn mutual_recursion() -> Result<(), IPanic> {
    let value = Value::structure([
        Value::from("l0"),
        Value::ptr(Value::structure([
            Value::from("r0"),
            Value::ptr(Value::structure([Value::from("l1"), Value::Null])),
        ])),
    ]);
    let encoder = Encoder::new();
    assert_eq!(
        encoder.encode_to_string(&LEFT, &value)?,
        r#"{"L":"l0","Right":{"R":"r0","Left":{"L":"l1","Right":null}}}"#
    );
    let program = encoder.program(&LEFT)?;
    assert_eq!(program.recursions.len(), 1);
    Ok(())
}

#[test]
fn recursive_embedding_falls_back_to_a_named_field() -> Result<(), IPanic> {
    static FIELDS: [Field; 2] = [
        Field::new("ID", || &shapes::INT),
        Field::new("Parent", || &SELF_PTR).embedded(),
    ];
    static SELF: Shape = Shape::new("SelfEmbed", Kind::Struct(&FIELDS));
    static SELF_PTR: Shape = Shape::new("*SelfEmbed", Kind::Pointer(|| &SELF));

    let value = Value::structure([
        Value::from(1i64),
        Value::ptr(Value::structure([Value::from(2i64), Value::Null])),
    ]);
    assert_eq!(
        Encoder::new().encode_to_string(&SELF, &value)?,
        r#"{"ID":1,"Parent":{"ID":2,"Parent":null}}"#
    );
    Ok(())
}
