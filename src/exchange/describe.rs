//! Conversion between schema definitions and meta-schema messages.

use std::collections::HashSet;

use crate::decimal::MAX_SCALE;
use crate::error::{CodecError, Location};
use crate::parser::ast::*;
use crate::types::{DefRef, Field, NsName, Schema};
use crate::value::{Message, Value};

use super::meta::{primitive_from_group, primitive_group, META_NS};

fn meta(name: &str) -> NsName {
    NsName::qualified(META_NS, name)
}

/// Definitions needed to describe `root`, dependencies first.
///
/// Follows supergroups, field types (static and dynamic) and define
/// targets. Dependency cycles through dynamic references are cut where
/// they are first revisited.
pub fn build_transitive(schema: &Schema, root: &NsName) -> Result<Vec<DefRef>, CodecError> {
    let start = schema
        .lookup(root)
        .ok_or_else(|| CodecError::UnknownGroup(root.to_string()))?;
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    visit(schema, start, &mut visited, &mut order);
    Ok(order)
}

fn visit(schema: &Schema, def: DefRef, visited: &mut HashSet<DefRef>, order: &mut Vec<DefRef>) {
    if !visited.insert(def) {
        return;
    }
    for dep in dependencies(schema, def) {
        visit(schema, dep, visited, order);
    }
    order.push(def);
}

fn dependencies(schema: &Schema, def: DefRef) -> Vec<DefRef> {
    let mut deps = Vec::new();
    match def {
        DefRef::Group(idx) => {
            let group = schema.group(idx);
            if let Some(parent) = group.super_group {
                deps.push(DefRef::Group(parent));
            }
            for field in &group.fields {
                if let Some(name) = field.ty.ref_name() {
                    deps.extend(schema.resolve(name, group.name.ns()));
                }
            }
        }
        DefRef::Define(idx) => {
            let define = schema.define(idx);
            if let Some(name) = define.ty.ref_name() {
                deps.extend(schema.resolve(name, define.name.ns()));
            }
        }
        DefRef::Enum(_) => {}
    }
    deps
}

/// The meta-schema message describing one definition. Enums are described
/// as a `Define` whose type is an `Enum`.
pub fn describe(schema: &Schema, def: DefRef) -> Message {
    match def {
        DefRef::Group(idx) => {
            let group = schema.group(idx);
            let ns = group.name.ns();
            let fields = group
                .fields
                .iter()
                .map(|f| Value::Group(describe_field(schema, f, ns)))
                .collect::<Vec<_>>();
            let mut msg = Message::new(meta("GroupDef"))
                .with("Name", ns_name(&group.name))
                .with("Fields", Value::Sequence(fields));
            set_annotations(&mut msg, &group.annotations);
            if let Some(id) = group.explicit_id {
                msg.set("Id", id);
            }
            if let Some(parent) = group.super_group {
                msg.set("Super", ns_name(&schema.group(parent).name));
            }
            msg
        }
        DefRef::Define(idx) => {
            let define = schema.define(idx);
            let mut msg = Message::new(meta("Define"))
                .with("Name", ns_name(&define.name))
                .with("Type", type_def(schema, &define.ty, define.name.ns()));
            set_annotations(&mut msg, &define.annotations);
            msg
        }
        DefRef::Enum(idx) => {
            let enumeration = schema.enumeration(idx);
            let symbols = enumeration
                .symbols
                .iter()
                .map(|s| {
                    let mut sym = Message::new(meta("Symbol"))
                        .with("Name", s.name.as_str())
                        .with("Value", s.value);
                    set_annotations(&mut sym, &s.annotations);
                    Value::Group(sym)
                })
                .collect::<Vec<_>>();
            let mut msg = Message::new(meta("Define"))
                .with("Name", ns_name(&enumeration.name))
                .with("Type", Message::new(meta("Enum")).with("Symbols", Value::Sequence(symbols)));
            set_annotations(&mut msg, &enumeration.annotations);
            msg
        }
    }
}

fn describe_field(schema: &Schema, field: &Field, ns: Option<&str>) -> Message {
    let mut msg = Message::new(meta("FieldDef"))
        .with("Name", field.name.as_str())
        .with("Type", type_def(schema, &field.ty, ns))
        .with("Optional", field.optional);
    set_annotations(&mut msg, &field.annotations);
    msg
}

fn ns_name(name: &NsName) -> Message {
    let mut msg = Message::new(meta("NsName")).with("Name", name.name());
    if let Some(ns) = name.ns() {
        msg.set("Ns", ns);
    }
    msg
}

fn set_annotations(msg: &mut Message, annotations: &[Annotation]) {
    if annotations.is_empty() {
        return;
    }
    let items = annotations
        .iter()
        .map(|a| {
            Value::Group(
                Message::new(meta("Annotation"))
                    .with("Name", ns_name(&a.name))
                    .with("Value", a.value.as_str()),
            )
        })
        .collect::<Vec<_>>();
    msg.set("Annotations", Value::Sequence(items));
}

/// Describe a declared type. References are sent fully qualified, resolved
/// the same way the sender resolved them.
fn type_def(schema: &Schema, spec: &TypeSpec, ns: Option<&str>) -> Message {
    let base = match &spec.kind {
        TypeKind::Primitive(p) => Message::new(meta(primitive_group(*p))),
        TypeKind::Fixed(size) => Message::new(meta("Fixed")).with("Size", *size),
        TypeKind::FixedDec(scale) => Message::new(meta("FixedDec")).with("Scale", *scale as u32),
        TypeKind::Ref(name) => {
            let target = schema
                .resolve(name, ns)
                .map(|def| schema.def_name(def).clone())
                .unwrap_or_else(|| name.clone());
            let kind = if spec.dynamic { "DynRef" } else { "Ref" };
            Message::new(meta(kind)).with("Type", ns_name(&target))
        }
    };
    if spec.sequence {
        Message::new(meta("Sequence")).with("Type", base)
    } else {
        base
    }
}

// Decoding descriptors back into definitions

fn invalid(message: impl Into<String>) -> CodecError {
    CodecError::InvalidDescriptor(message.into())
}

fn field<'m>(msg: &'m Message, name: &str) -> Result<&'m Value, CodecError> {
    msg.get(name)
        .ok_or_else(|| invalid(format!("{} is missing '{}'", msg.group, name)))
}

fn string_field(msg: &Message, name: &str) -> Result<String, CodecError> {
    field(msg, name)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid(format!("'{}' of {} is not a string", name, msg.group)))
}

fn group_field<'m>(msg: &'m Message, name: &str) -> Result<&'m Message, CodecError> {
    field(msg, name)?
        .as_group()
        .ok_or_else(|| invalid(format!("'{}' of {} is not a group", name, msg.group)))
}

fn read_ns_name(msg: &Message) -> Result<NsName, CodecError> {
    let name = string_field(msg, "Name")?;
    let ns = match msg.get("Ns") {
        Some(v) => Some(
            v.as_str()
                .ok_or_else(|| invalid("'Ns' of NsName is not a string"))?,
        ),
        None => None,
    };
    Ok(NsName::new(ns, name))
}

fn read_annotations(msg: &Message) -> Result<Vec<Annotation>, CodecError> {
    let Some(value) = msg.get("Annotations") else {
        return Ok(Vec::new());
    };
    let items = value
        .as_sequence()
        .ok_or_else(|| invalid("'Annotations' is not a sequence"))?;
    items
        .iter()
        .map(|item| {
            let a = item
                .as_group()
                .ok_or_else(|| invalid("annotation is not a group"))?;
            Ok(Annotation {
                name: read_ns_name(group_field(a, "Name")?)?,
                value: string_field(a, "Value")?,
            })
        })
        .collect()
}

fn read_type(msg: &Message, location: &Location) -> Result<TypeSpec, CodecError> {
    if msg.group.ns() != Some(META_NS) {
        return Err(invalid(format!("{} is not a type descriptor", msg.group)));
    }
    let kind_name = msg.group.name();
    let spec = match kind_name {
        "Fixed" => {
            let size = field(msg, "Size")?
                .as_uint()
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| invalid("invalid fixed size"))?;
            TypeSpec::fixed(size)
        }
        "FixedDec" => {
            let scale = field(msg, "Scale")?
                .as_uint()
                .filter(|s| *s <= MAX_SCALE as u64)
                .ok_or_else(|| invalid("invalid decimal scale"))?;
            TypeSpec::fixed_dec(scale as u8)
        }
        "Ref" => TypeSpec::reference(read_ns_name(group_field(msg, "Type")?)?),
        "DynRef" => TypeSpec::dynamic(read_ns_name(group_field(msg, "Type")?)?),
        "Sequence" => {
            let item = read_type(group_field(msg, "Type")?, location)?;
            if item.sequence {
                return Err(invalid("sequence of sequences"));
            }
            item.sequence()
        }
        other => match primitive_from_group(other) {
            Some(p) => TypeSpec::primitive(p),
            None => return Err(invalid(format!("unexpected type descriptor {}", msg.group))),
        },
    };
    Ok(spec.at(location.clone()))
}

fn read_symbols(msg: &Message, location: &Location) -> Result<Vec<SymbolDef>, CodecError> {
    let items = field(msg, "Symbols")?
        .as_sequence()
        .ok_or_else(|| invalid("'Symbols' is not a sequence"))?;
    items
        .iter()
        .map(|item| {
            let s = item
                .as_group()
                .ok_or_else(|| invalid("symbol is not a group"))?;
            let value = field(s, "Value")?
                .as_int()
                .and_then(|v| i32::try_from(v).ok())
                .ok_or_else(|| invalid("invalid symbol value"))?;
            Ok(SymbolDef {
                name: string_field(s, "Name")?,
                value: Some(value),
                annotations: read_annotations(s)?,
                location: location.clone(),
            })
        })
        .collect()
}

/// Rebuild a declared definition from a `GroupDef` or `Define` message.
pub fn definition_from_message(msg: &Message, location: Location) -> Result<Definition, CodecError> {
    let annotations = read_annotations(msg)?;
    let name = read_ns_name(group_field(msg, "Name")?)?;

    if msg.group == meta("Define") {
        let ty = group_field(msg, "Type")?;
        if ty.group == meta("Enum") {
            return Ok(Definition::Enum(EnumDef {
                name,
                symbols: read_symbols(ty, &location)?,
                annotations,
                location,
            }));
        }
        return Ok(Definition::Define(DefineDef {
            name,
            ty: read_type(ty, &location)?,
            annotations,
            location,
        }));
    }

    if msg.group != meta("GroupDef") {
        return Err(invalid(format!("{} is not a definition", msg.group)));
    }

    let id = match msg.get("Id") {
        Some(v) => Some(v.as_uint().ok_or_else(|| invalid("invalid group id"))?),
        None => None,
    };
    let super_ref = match msg.get("Super") {
        Some(v) => {
            let name = read_ns_name(v.as_group().ok_or_else(|| invalid("invalid supergroup"))?)?;
            Some(TypeSpec::reference(name).at(location.clone()))
        }
        None => None,
    };
    let fields = field(msg, "Fields")?
        .as_sequence()
        .ok_or_else(|| invalid("'Fields' is not a sequence"))?
        .iter()
        .map(|item| {
            let f = item
                .as_group()
                .ok_or_else(|| invalid("field is not a group"))?;
            Ok(FieldDef {
                name: string_field(f, "Name")?,
                ty: read_type(group_field(f, "Type")?, &location)?,
                optional: field(f, "Optional")?
                    .as_bool()
                    .ok_or_else(|| invalid("'Optional' is not a bool"))?,
                annotations: read_annotations(f)?,
                location: location.clone(),
            })
        })
        .collect::<Result<Vec<_>, CodecError>>()?;

    Ok(Definition::Group(GroupDef {
        name,
        id,
        super_ref,
        fields,
        annotations,
        location,
    }))
}
