//! Declared (unresolved) schema definitions.
//!
//! The parser produces these, and they are also the programmatic way to build
//! a schema: construct them in code and hand them to a `SchemaBuilder`.

use crate::error::Location;
use crate::types::{NsName, Primitive};

/// An informational `@name='value'` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub name: NsName,
    pub value: String,
}

impl Annotation {
    pub fn new(name: impl Into<NsName>, value: impl Into<String>) -> Self {
        Annotation {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The base of a declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Primitive(Primitive),
    Fixed(u32),
    FixedDec(u8),
    /// A reference to a group, enum or define by name.
    Ref(NsName),
}

/// A declared type: base, `*` dynamic marker and `[]` sequence marker.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSpec {
    pub kind: TypeKind,
    pub dynamic: bool,
    pub sequence: bool,
    pub location: Location,
}

impl TypeSpec {
    pub fn new(kind: TypeKind) -> Self {
        TypeSpec {
            kind,
            dynamic: false,
            sequence: false,
            location: Location::builtin(),
        }
    }

    pub fn primitive(p: Primitive) -> Self {
        TypeSpec::new(TypeKind::Primitive(p))
    }

    pub fn fixed(size: u32) -> Self {
        TypeSpec::new(TypeKind::Fixed(size))
    }

    pub fn fixed_dec(scale: u8) -> Self {
        TypeSpec::new(TypeKind::FixedDec(scale))
    }

    /// Static reference to a named definition.
    pub fn reference(name: impl Into<NsName>) -> Self {
        TypeSpec::new(TypeKind::Ref(name.into()))
    }

    /// Dynamic (`Name*`) reference to a group.
    pub fn dynamic(name: impl Into<NsName>) -> Self {
        TypeSpec {
            dynamic: true,
            ..TypeSpec::reference(name)
        }
    }

    /// Turn this type into a sequence of itself.
    pub fn sequence(mut self) -> Self {
        self.sequence = true;
        self
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn ref_name(&self) -> Option<&NsName> {
        match &self.kind {
            TypeKind::Ref(name) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeSpec,
    pub optional: bool,
    pub annotations: Vec<Annotation>,
    pub location: Location,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: TypeSpec) -> Self {
        FieldDef {
            name: name.into(),
            ty,
            optional: false,
            annotations: Vec::new(),
            location: Location::builtin(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn annotate(mut self, name: impl Into<NsName>, value: impl Into<String>) -> Self {
        self.annotations.push(Annotation::new(name, value));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupDef {
    pub name: NsName,
    pub id: Option<u64>,
    /// The `: Super` reference; kept as a full type so the validator can
    /// reject dynamic or sequence supergroups with a position.
    pub super_ref: Option<TypeSpec>,
    pub fields: Vec<FieldDef>,
    pub annotations: Vec<Annotation>,
    pub location: Location,
}

impl GroupDef {
    pub fn new(name: impl Into<NsName>) -> Self {
        GroupDef {
            name: name.into(),
            id: None,
            super_ref: None,
            fields: Vec::new(),
            annotations: Vec::new(),
            location: Location::builtin(),
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_super(mut self, name: impl Into<NsName>) -> Self {
        self.super_ref = Some(TypeSpec::reference(name));
        self
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn annotate(mut self, name: impl Into<NsName>, value: impl Into<String>) -> Self {
        self.annotations.push(Annotation::new(name, value));
        self
    }

    /// The `@version` annotation, which participates in the type id.
    pub fn version(&self) -> Option<&str> {
        self.annotations
            .iter()
            .find(|a| !a.name.is_qualified() && a.name.name() == "version")
            .map(|a| a.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefineDef {
    pub name: NsName,
    pub ty: TypeSpec,
    pub annotations: Vec<Annotation>,
    pub location: Location,
}

impl DefineDef {
    pub fn new(name: impl Into<NsName>, ty: TypeSpec) -> Self {
        DefineDef {
            name: name.into(),
            ty,
            annotations: Vec::new(),
            location: Location::builtin(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolDef {
    pub name: String,
    /// Explicit `/value`; otherwise previous value + 1, starting at 0.
    pub value: Option<i32>,
    pub annotations: Vec<Annotation>,
    pub location: Location,
}

impl SymbolDef {
    pub fn new(name: impl Into<String>) -> Self {
        SymbolDef {
            name: name.into(),
            value: None,
            annotations: Vec::new(),
            location: Location::builtin(),
        }
    }

    pub fn with_value(mut self, value: i32) -> Self {
        self.value = Some(value);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
    pub name: NsName,
    pub symbols: Vec<SymbolDef>,
    pub annotations: Vec<Annotation>,
    pub location: Location,
}

impl EnumDef {
    pub fn new(name: impl Into<NsName>) -> Self {
        EnumDef {
            name: name.into(),
            symbols: Vec::new(),
            annotations: Vec::new(),
            location: Location::builtin(),
        }
    }

    pub fn symbol(mut self, symbol: SymbolDef) -> Self {
        self.symbols.push(symbol);
        self
    }
}

/// Any top-level definition.
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Group(GroupDef),
    Define(DefineDef),
    Enum(EnumDef),
}

impl Definition {
    pub fn name(&self) -> &NsName {
        match self {
            Definition::Group(g) => &g.name,
            Definition::Define(d) => &d.name,
            Definition::Enum(e) => &e.name,
        }
    }

    pub fn location(&self) -> &Location {
        match self {
            Definition::Group(g) => &g.location,
            Definition::Define(d) => &d.location,
            Definition::Enum(e) => &e.location,
        }
    }
}

impl From<GroupDef> for Definition {
    fn from(g: GroupDef) -> Self {
        Definition::Group(g)
    }
}

impl From<DefineDef> for Definition {
    fn from(d: DefineDef) -> Self {
        Definition::Define(d)
    }
}

impl From<EnumDef> for Definition {
    fn from(e: EnumDef) -> Self {
        Definition::Enum(e)
    }
}
