use std::collections::HashMap;
use std::fmt;

use sha2::{Digest, Sha256};

use crate::error::Location;
use crate::parser::ast::{Annotation, Definition, TypeSpec};
use crate::parser::schema_builder::SchemaBuilder;

/// A definition name, optionally qualified by a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NsName {
    ns: Option<String>,
    name: String,
}

impl NsName {
    pub fn new(ns: Option<&str>, name: impl Into<String>) -> Self {
        NsName {
            ns: ns.map(str::to_string),
            name: name.into(),
        }
    }

    /// An unqualified name.
    pub fn local(name: impl Into<String>) -> Self {
        NsName {
            ns: None,
            name: name.into(),
        }
    }

    pub fn qualified(ns: impl Into<String>, name: impl Into<String>) -> Self {
        NsName {
            ns: Some(ns.into()),
            name: name.into(),
        }
    }

    /// Parse `ns:Name` or `Name`.
    pub fn parse(text: &str) -> Self {
        match text.split_once(':') {
            Some((ns, name)) => NsName::qualified(ns, name),
            None => NsName::local(text),
        }
    }

    pub fn ns(&self) -> Option<&str> {
        self.ns.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_qualified(&self) -> bool {
        self.ns.is_some()
    }

    /// The same local name placed in `ns`.
    pub fn with_ns(&self, ns: Option<&str>) -> NsName {
        NsName::new(ns, self.name.clone())
    }
}

impl fmt::Display for NsName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ns {
            Some(ns) => write!(f, "{}:{}", ns, self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl From<&str> for NsName {
    fn from(text: &str) -> Self {
        NsName::parse(text)
    }
}

/// The 64-bit wire identity of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u64);

impl TypeId {
    /// Derive the type id from the qualified group name and optional version.
    ///
    /// The id is the first eight bytes (little-endian) of the SHA-256 digest of
    /// `ns:Name` or `ns:Name/version`, so it is stable across processes.
    pub fn compute(name: &NsName, version: Option<&str>) -> TypeId {
        let mut hasher = Sha256::new();
        hasher.update(name.to_string().as_bytes());
        if let Some(version) = version {
            hasher.update(b"/");
            hasher.update(version.as_bytes());
        }
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        TypeId(u64::from_le_bytes(bytes))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Built-in scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F64,
    Bool,
    String,
    Binary,
}

impl Primitive {
    pub const ALL: [Primitive; 12] = [
        Primitive::I8,
        Primitive::U8,
        Primitive::I16,
        Primitive::U16,
        Primitive::I32,
        Primitive::U32,
        Primitive::I64,
        Primitive::U64,
        Primitive::F64,
        Primitive::Bool,
        Primitive::String,
        Primitive::Binary,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            Primitive::I8 => "i8",
            Primitive::U8 => "u8",
            Primitive::I16 => "i16",
            Primitive::U16 => "u16",
            Primitive::I32 => "i32",
            Primitive::U32 => "u32",
            Primitive::I64 => "i64",
            Primitive::U64 => "u64",
            Primitive::F64 => "f64",
            Primitive::Bool => "bool",
            Primitive::String => "string",
            Primitive::Binary => "binary",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Primitive> {
        Primitive::ALL.iter().copied().find(|p| p.keyword() == word)
    }

    /// Width in bits and signedness, for the integer primitives.
    pub fn integer_width(self) -> Option<(u32, bool)> {
        match self {
            Primitive::I8 => Some((8, true)),
            Primitive::U8 => Some((8, false)),
            Primitive::I16 => Some((16, true)),
            Primitive::U16 => Some((16, false)),
            Primitive::I32 => Some((32, true)),
            Primitive::U32 => Some((32, false)),
            Primitive::I64 => Some((64, true)),
            Primitive::U64 => Some((64, false)),
            _ => None,
        }
    }
}

/// A field or define type after all references are resolved.
///
/// Indices point into the owning `Schema`'s group and enum tables. Defines
/// are flattened away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
    Primitive(Primitive),
    Fixed(u32),
    FixedDec(u8),
    Enum(usize),
    StaticGroup(usize),
    DynamicGroup(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedType {
    pub kind: Resolved,
    pub sequence: bool,
}

/// A field of a finalized group.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    /// The type as declared, before define resolution.
    pub ty: TypeSpec,
    pub resolved: ResolvedType,
    pub optional: bool,
    pub annotations: Vec<Annotation>,
    pub location: Location,
}

/// A finalized group.
#[derive(Debug, Clone)]
pub struct Group {
    pub name: NsName,
    /// Explicit `/id`, if one was declared.
    pub explicit_id: Option<u64>,
    /// Position among the schema's groups in declaration order.
    pub ordinal: u64,
    pub version: Option<String>,
    pub type_id: TypeId,
    pub super_group: Option<usize>,
    /// Own fields, excluding inherited ones.
    pub fields: Vec<Field>,
    /// Inherited fields (most-base ancestor first) followed by own fields.
    pub all_fields: Vec<Field>,
    pub annotations: Vec<Annotation>,
    pub location: Location,
}

impl Group {
    /// The explicit id, or the declaration ordinal when none was given.
    pub fn id(&self) -> u64 {
        self.explicit_id.unwrap_or(self.ordinal)
    }

    pub fn find_field(&self, name: &str) -> Option<&Field> {
        self.all_fields.iter().find(|f| f.name == name)
    }
}

/// A finalized type alias.
#[derive(Debug, Clone)]
pub struct Define {
    pub name: NsName,
    pub ty: TypeSpec,
    pub resolved: ResolvedType,
    pub annotations: Vec<Annotation>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub value: i32,
    pub annotations: Vec<Annotation>,
}

/// A finalized enumeration with all symbol values assigned.
#[derive(Debug, Clone)]
pub struct Enum {
    pub name: NsName,
    pub symbols: Vec<Symbol>,
    pub annotations: Vec<Annotation>,
    pub location: Location,
}

impl Enum {
    pub fn symbol_by_value(&self, value: i32) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.value == value)
    }

    pub fn symbol_by_name(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.name == name)
    }
}

/// Index of a named definition inside a `Schema`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefRef {
    Group(usize),
    Define(usize),
    Enum(usize),
}

/// A closed, validated and immutable schema.
///
/// Built by `SchemaBuilder::finalize`; never mutated afterwards, so it can
/// be shared (typically behind an `Arc`) by any number of readers and writers.
#[derive(Debug, Clone)]
pub struct Schema {
    definitions: Vec<Definition>,
    groups: Vec<Group>,
    defines: Vec<Define>,
    enums: Vec<Enum>,
    by_name: HashMap<NsName, DefRef>,
    /// Local name to definition, `None` when the local name is ambiguous.
    by_local_name: HashMap<String, Option<DefRef>>,
    by_type_id: HashMap<TypeId, usize>,
}

impl Schema {
    pub(crate) fn from_parts(
        definitions: Vec<Definition>,
        groups: Vec<Group>,
        defines: Vec<Define>,
        enums: Vec<Enum>,
        by_name: HashMap<NsName, DefRef>,
    ) -> Self {
        let mut by_local_name: HashMap<String, Option<DefRef>> = HashMap::new();
        for (name, def) in &by_name {
            by_local_name
                .entry(name.name().to_string())
                .and_modify(|slot| *slot = None)
                .or_insert(Some(*def));
        }
        let by_type_id = groups
            .iter()
            .enumerate()
            .map(|(idx, g)| (g.type_id, idx))
            .collect();
        Schema {
            definitions,
            groups,
            defines,
            enums,
            by_name,
            by_local_name,
            by_type_id,
        }
    }

    /// An empty schema.
    pub fn empty() -> Self {
        Schema::from_parts(Vec::new(), Vec::new(), Vec::new(), Vec::new(), HashMap::new())
    }

    /// Declared definitions in declaration order.
    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn defines(&self) -> &[Define] {
        &self.defines
    }

    pub fn enums(&self) -> &[Enum] {
        &self.enums
    }

    pub fn group(&self, idx: usize) -> &Group {
        &self.groups[idx]
    }

    pub fn define(&self, idx: usize) -> &Define {
        &self.defines[idx]
    }

    pub fn enumeration(&self, idx: usize) -> &Enum {
        &self.enums[idx]
    }

    /// Look up a definition by name.
    ///
    /// An unqualified name that is not found verbatim falls back to the
    /// unique definition with that local name in any namespace.
    pub fn lookup(&self, name: &NsName) -> Option<DefRef> {
        if let Some(def) = self.by_name.get(name) {
            return Some(*def);
        }
        if name.is_qualified() {
            return None;
        }
        self.by_local_name.get(name.name()).copied().flatten()
    }

    /// Resolve a reference as written inside namespace `ns`: that namespace
    /// first, then unqualified. This is how field types are resolved.
    pub fn resolve(&self, name: &NsName, ns: Option<&str>) -> Option<DefRef> {
        if !name.is_qualified() && ns.is_some() {
            if let Some(def) = self.by_name.get(&name.with_ns(ns)) {
                return Some(*def);
            }
        }
        self.by_name.get(name).copied()
    }

    pub fn def_name(&self, def: DefRef) -> &NsName {
        match def {
            DefRef::Group(idx) => &self.groups[idx].name,
            DefRef::Define(idx) => &self.defines[idx].name,
            DefRef::Enum(idx) => &self.enums[idx].name,
        }
    }

    pub fn group_index(&self, name: &NsName) -> Option<usize> {
        match self.lookup(name)? {
            DefRef::Group(idx) => Some(idx),
            _ => None,
        }
    }

    pub fn find_group(&self, name: &NsName) -> Option<&Group> {
        self.group_index(name).map(|idx| &self.groups[idx])
    }

    /// Get a group by its textual name (`ns:Name` or `Name`).
    pub fn get_group(&self, name: &str) -> Option<&Group> {
        self.find_group(&NsName::parse(name))
    }

    pub fn find_enum(&self, name: &NsName) -> Option<&Enum> {
        match self.lookup(name)? {
            DefRef::Enum(idx) => Some(&self.enums[idx]),
            _ => None,
        }
    }

    pub fn find_define(&self, name: &NsName) -> Option<&Define> {
        match self.lookup(name)? {
            DefRef::Define(idx) => Some(&self.defines[idx]),
            _ => None,
        }
    }

    pub fn group_index_by_type_id(&self, type_id: TypeId) -> Option<usize> {
        self.by_type_id.get(&type_id).copied()
    }

    pub fn group_by_type_id(&self, type_id: TypeId) -> Option<&Group> {
        self.group_index_by_type_id(type_id)
            .map(|idx| &self.groups[idx])
    }

    /// True if `group` is `ancestor` or inherits from it.
    pub fn is_subtype(&self, group: usize, ancestor: usize) -> bool {
        let mut current = Some(group);
        while let Some(idx) = current {
            if idx == ancestor {
                return true;
            }
            current = self.groups[idx].super_group;
        }
        false
    }

    /// Reopen a copy of this schema's definitions for extension.
    pub fn to_builder(&self) -> SchemaBuilder {
        let mut builder = SchemaBuilder::new();
        for def in &self.definitions {
            builder.add(def.clone());
        }
        builder
    }
}
