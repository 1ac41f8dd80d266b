//! Schema parsing, validation diagnostics and printing.

use blink::error::DiagnosticKind;
use blink::parser::{self, SchemaBuilder};
use blink::types::{Primitive, Resolved};
use blink::{NsName, Schema, TypeId};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const TRADING: &str = r#"
# Order entry
namespace Trading

Side = Buy/1 | Sell/2
Price = fixedDec(4)
Tags = string []

@doc="base of every message" Header -> u64 SeqNo, @unit='ns' i64 SendTime
@version='2' NewOrder/10 : Header -> string Symbol, Side Side, Price Px,
                                  u32 Qty, Tags Tags?
Cancel/11 : Header -> u64 OrderId, string Reason?
Batch/12 -> Header* [] Items, fixed(8) Token
"#;

fn trading() -> Schema {
    parser::parse(TRADING).unwrap()
}

#[test]
fn test_full_schema() {
    let schema = trading();
    assert_eq!(schema.groups().len(), 4);
    assert_eq!(schema.enums().len(), 1);
    assert_eq!(schema.defines().len(), 2);

    let order = schema.get_group("Trading:NewOrder").unwrap();
    let names: Vec<&str> = order.all_fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["SeqNo", "SendTime", "Symbol", "Side", "Px", "Qty", "Tags"]);
    assert_eq!(order.id(), 10);
    assert_eq!(order.all_fields[4].resolved.kind, Resolved::FixedDec(4));
    assert!(order.all_fields[6].resolved.sequence);

    let batch = schema.get_group("Trading:Batch").unwrap();
    assert!(matches!(batch.all_fields[0].resolved.kind, Resolved::DynamicGroup(_)));
    assert!(batch.all_fields[0].resolved.sequence);
    assert_eq!(batch.all_fields[1].resolved.kind, Resolved::Fixed(8));
}

#[test]
fn test_type_ids_are_stable_and_versioned() {
    let schema = trading();
    let order = schema.get_group("Trading:NewOrder").unwrap();
    assert_eq!(
        order.type_id,
        TypeId::compute(&NsName::qualified("Trading", "NewOrder"), Some("2"))
    );
    assert_ne!(
        order.type_id,
        TypeId::compute(&NsName::qualified("Trading", "NewOrder"), None)
    );
    assert_eq!(trading().get_group("Trading:Cancel").unwrap().type_id, schema.get_group("Trading:Cancel").unwrap().type_id);
    assert!(schema.group_by_type_id(order.type_id).is_some());
}

#[test]
fn test_printed_schema_reparses_identically() {
    let schema = trading();
    let text = schema.to_string();
    let again = parser::parse(&text).unwrap();
    assert_eq!(again.to_string(), text);
    for (a, b) in schema.groups().iter().zip(again.groups()) {
        assert_eq!(a.name, b.name);
        assert_eq!(a.type_id, b.type_id);
        assert_eq!(a.all_fields.len(), b.all_fields.len());
        for (fa, fb) in a.all_fields.iter().zip(&b.all_fields) {
            assert_eq!(fa.name, fb.name);
            assert_eq!(fa.optional, fb.optional);
            assert_eq!(fa.resolved, fb.resolved);
        }
    }
}

#[test]
fn test_recursive_define_diagnostic() {
    let err = parser::parse("Foo = Bar\nBar = Foo").unwrap_err();
    assert_eq!(
        err.to_string(),
        "<input>:2:7: error: illegal recursive reference to 'Foo'"
    );
}

#[test]
fn test_duplicate_across_sources_points_at_both() {
    let mut builder = SchemaBuilder::new();
    builder.parse_str("a.blink", "Foo -> u8 x").unwrap();
    builder.parse_str("b.blink", "\n  Foo -> u16 y").unwrap();
    let err = builder.finalize().unwrap_err();
    assert_eq!(
        err.to_string(),
        "b.blink:2:3: error: duplicate definition of 'Foo'\n  previously defined here: a.blink:1:1"
    );
}

#[test]
fn test_every_rule_is_reported() {
    let cases: &[(&str, DiagnosticKind)] = &[
        ("A -> Nope n", DiagnosticKind::UndefinedReference("Nope".into())),
        ("A -> A a", DiagnosticKind::RecursiveReference("A".into())),
        ("X = u8\nA : X", DiagnosticKind::SuperNotGroup("X".into())),
        ("B\nA : B*", DiagnosticKind::DynamicSuper("B".into())),
        ("B\nA : B []", DiagnosticKind::SequenceSuper("B".into())),
        ("S = u8 []\nA -> S [] s", DiagnosticKind::NestedSequence("S".into())),
        ("X = u8\nA -> X* x", DiagnosticKind::DynamicNonGroup("X".into())),
    ];
    for (text, expected) in cases {
        let err = parser::parse(text).unwrap_err();
        assert_eq!(&err.first().kind, expected, "schema {:?}", text);
    }
}

#[test]
fn test_reference_resolution_across_namespaces() {
    let schema = parser::parse(
        "Shared -> u8 v\n\
         namespace A\n\
         Local -> Shared s, B:Thing t\n\
         namespace B\n\
         Thing -> A:Local* back?",
    )
    .unwrap();
    let local = schema.find_group(&NsName::qualified("A", "Local")).unwrap();
    let shared = schema.group_index(&NsName::local("Shared")).unwrap();
    let thing = schema.group_index(&NsName::qualified("B", "Thing")).unwrap();
    assert_eq!(local.fields[0].resolved.kind, Resolved::StaticGroup(shared));
    assert_eq!(local.fields[1].resolved.kind, Resolved::StaticGroup(thing));
}

#[test]
fn test_schema_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Schema>();
}

#[test]
fn test_syntax_errors() {
    for (text, message) in [
        ("Foo/1 = u8", "ids are only allowed on group definitions"),
        ("Foo -> u32* x", "only references to groups can be dynamic"),
        ("Foo -> u8", "expected field name"),
        ("Foo -> fixedDec(30) x", "decimal scale 30"),
    ] {
        let err = parser::parse(text).unwrap_err();
        assert!(
            err.to_string().contains(message),
            "{:?} gave {}",
            text,
            err
        );
    }
}

// Randomly generated schemas: a chain of groups where each may reference
// earlier ones.

fn primitive() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "i8", "u8", "i16", "u16", "i32", "u32", "i64", "u64", "f64", "bool", "string", "binary",
        "fixed(4)", "fixedDec(3)",
    ])
}

fn field_type(earlier: usize) -> BoxedStrategy<String> {
    let prim = primitive().prop_map(str::to_string);
    let base = if earlier == 0 {
        prim.boxed()
    } else {
        prop_oneof![
            3 => prim,
            1 => (0..earlier).prop_map(|i| format!("G{}", i)),
            1 => (0..earlier).prop_map(|i| format!("G{}*", i)),
        ]
        .boxed()
    };
    (base, any::<bool>())
        .prop_map(|(ty, seq)| if seq { format!("{} []", ty) } else { ty })
        .boxed()
}

fn group_text(index: usize) -> BoxedStrategy<String> {
    prop::collection::vec((field_type(index), any::<bool>()), 0..5)
        .prop_map(move |fields| {
            let mut text = format!("G{}/{}", index, index + 1);
            for (i, (ty, optional)) in fields.iter().enumerate() {
                text.push_str(if i == 0 { " -> " } else { ", " });
                text.push_str(&format!("{} f{}{}", ty, i, if *optional { "?" } else { "" }));
            }
            text
        })
        .boxed()
}

fn schema_text() -> impl Strategy<Value = String> {
    (1usize..6).prop_flat_map(|n| {
        (0..n)
            .map(group_text)
            .collect::<Vec<_>>()
            .prop_map(|groups| groups.join("\n"))
    })
}

proptest! {
    #[test]
    fn prop_print_parse_roundtrip(text in schema_text()) {
        let schema = parser::parse(&text).unwrap();
        let printed = schema.to_string();
        let again = parser::parse(&printed).unwrap();
        prop_assert_eq!(again.to_string(), printed);
        prop_assert_eq!(again.groups().len(), schema.groups().len());
        for (a, b) in schema.groups().iter().zip(again.groups()) {
            prop_assert_eq!(a.type_id, b.type_id);
            prop_assert_eq!(a.all_fields.len(), b.all_fields.len());
            for (fa, fb) in a.all_fields.iter().zip(&b.all_fields) {
                prop_assert_eq!(&fa.resolved, &fb.resolved);
                prop_assert_eq!(fa.optional, fb.optional);
            }
        }
    }
}

#[test]
fn test_primitive_keywords_roundtrip() {
    for p in Primitive::ALL {
        assert_eq!(Primitive::from_keyword(p.keyword()), Some(p));
    }
}
