//! The bootstrap schema that describes schema definitions.

use std::sync::{Arc, OnceLock};

use crate::types::{Primitive, Schema, TypeId};

/// Namespace of every meta group.
pub const META_NS: &str = "Blink";

const META_SCHEMA: &str = r#"
namespace Blink

NsName -> string Ns?, string Name
Annotation -> NsName Name, string Value

TypeDef -> Annotation [] Annotations?
U8 : TypeDef
I8 : TypeDef
U16 : TypeDef
I16 : TypeDef
U32 : TypeDef
I32 : TypeDef
U64 : TypeDef
I64 : TypeDef
F64 : TypeDef
Bool : TypeDef
String : TypeDef
Binary : TypeDef
Fixed : TypeDef -> u32 Size
FixedDec : TypeDef -> u8 Scale
Ref : TypeDef -> NsName Type
DynRef : TypeDef -> NsName Type
Sequence : TypeDef -> TypeDef* Type

Symbol -> Annotation [] Annotations?, string Name, i32 Value
Enum : TypeDef -> Symbol [] Symbols

FieldDef -> Annotation [] Annotations?, string Name, TypeDef* Type, bool Optional
Define -> Annotation [] Annotations?, NsName Name, TypeDef* Type
GroupDef -> Annotation [] Annotations?, NsName Name, u64 Id?, FieldDef [] Fields, NsName Super?
"#;

/// The parsed meta schema, shared by every exchange encoder and decoder.
pub fn meta_schema() -> &'static Arc<Schema> {
    static META: OnceLock<Arc<Schema>> = OnceLock::new();
    META.get_or_init(|| {
        Arc::new(crate::parser::parse(META_SCHEMA).expect("built-in meta schema is valid"))
    })
}

/// The meta schema source text.
pub fn meta_schema_text() -> &'static str {
    META_SCHEMA
}

pub(crate) fn meta_type_id(name: &str) -> Option<TypeId> {
    meta_schema()
        .get_group(&format!("{}:{}", META_NS, name))
        .map(|g| g.type_id)
}

/// Meta group name for a primitive type.
pub(crate) fn primitive_group(p: Primitive) -> &'static str {
    match p {
        Primitive::I8 => "I8",
        Primitive::U8 => "U8",
        Primitive::I16 => "I16",
        Primitive::U16 => "U16",
        Primitive::I32 => "I32",
        Primitive::U32 => "U32",
        Primitive::I64 => "I64",
        Primitive::U64 => "U64",
        Primitive::F64 => "F64",
        Primitive::Bool => "Bool",
        Primitive::String => "String",
        Primitive::Binary => "Binary",
    }
}

pub(crate) fn primitive_from_group(name: &str) -> Option<Primitive> {
    Primitive::ALL
        .iter()
        .copied()
        .find(|p| primitive_group(*p) == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_schema_parses() {
        let meta = meta_schema();
        let group_def = meta.get_group("Blink:GroupDef").unwrap();
        let names: Vec<&str> = group_def.all_fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["Annotations", "Name", "Id", "Fields", "Super"]);
        let fixed = meta.get_group("Blink:Fixed").unwrap();
        assert_eq!(fixed.all_fields.len(), 2);
    }

    #[test]
    fn test_primitive_group_names() {
        for p in Primitive::ALL {
            assert_eq!(primitive_from_group(primitive_group(p)), Some(p));
            assert!(meta_type_id(primitive_group(p)).is_some());
        }
    }
}
