//! Name resolution and validation of declared definitions.
//!
//! Runs in phases: name table, reference check, recursion check, then type
//! resolution (which also flattens inheritance). Each phase collects every
//! diagnostic it finds; resolution only runs when all references exist and
//! the static reference graph is acyclic.

use std::collections::HashMap;

use super::ast::*;
use crate::error::{Diagnostic, DiagnosticKind, Location, SchemaError};
use crate::types::{
    DefRef, Define, Enum, Field, Group, NsName, Primitive, Resolved, ResolvedType, Schema, Symbol,
    TypeId,
};

/// Validate `definitions` and freeze them into a `Schema`.
pub(crate) fn build(definitions: &[Definition]) -> Result<Schema, SchemaError> {
    let mut v = Validator::new(definitions);
    v.check_references();
    if !v.fatal {
        v.check_recursion();
    }
    if v.fatal {
        return Err(SchemaError::new(v.diagnostics));
    }
    let schema = v.resolve();
    if v.diagnostics.is_empty() {
        Ok(schema)
    } else {
        Err(SchemaError::new(v.diagnostics))
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Visit {
    New,
    Active,
    Done,
}

struct Validator<'a> {
    /// Accepted definitions; later duplicates are dropped.
    defs: Vec<&'a Definition>,
    refs: Vec<DefRef>,
    names: HashMap<NsName, usize>,
    groups: Vec<&'a GroupDef>,
    defines: Vec<&'a DefineDef>,
    enums: Vec<&'a EnumDef>,
    /// Defines already flattened, so their diagnostics are reported once.
    resolved_defines: Vec<Option<ResolvedType>>,
    diagnostics: Vec<Diagnostic>,
    fatal: bool,
}

impl<'a> Validator<'a> {
    fn new(definitions: &'a [Definition]) -> Self {
        let mut v = Validator {
            defs: Vec::new(),
            refs: Vec::new(),
            names: HashMap::new(),
            groups: Vec::new(),
            defines: Vec::new(),
            enums: Vec::new(),
            resolved_defines: Vec::new(),
            diagnostics: Vec::new(),
            fatal: false,
        };

        for def in definitions {
            if let Some(&prev) = v.names.get(def.name()) {
                let earlier = v.defs[prev].location().clone();
                v.diagnostics.push(
                    Diagnostic::new(
                        def.location().clone(),
                        DiagnosticKind::DuplicateDefinition(def.name().to_string()),
                    )
                    .with_related("previously defined here", earlier),
                );
                continue;
            }

            let def_ref = match def {
                Definition::Group(g) => {
                    v.groups.push(g);
                    DefRef::Group(v.groups.len() - 1)
                }
                Definition::Define(d) => {
                    v.defines.push(d);
                    DefRef::Define(v.defines.len() - 1)
                }
                Definition::Enum(e) => {
                    v.enums.push(e);
                    DefRef::Enum(v.enums.len() - 1)
                }
            };
            v.names.insert(def.name().clone(), v.defs.len());
            v.defs.push(def);
            v.refs.push(def_ref);
        }
        v.resolved_defines = vec![None; v.defines.len()];
        v
    }

    /// Resolve a reference written inside namespace `ns`: first in that
    /// namespace, then without one.
    fn lookup(&self, name: &NsName, ns: Option<&str>) -> Option<usize> {
        if name.is_qualified() {
            return self.names.get(name).copied();
        }
        if ns.is_some() {
            if let Some(&idx) = self.names.get(&name.with_ns(ns)) {
                return Some(idx);
            }
        }
        self.names.get(name).copied()
    }

    fn error(&mut self, location: &Location, kind: DiagnosticKind) {
        self.diagnostics.push(Diagnostic::new(location.clone(), kind));
    }

    /// Every type mentioned by a definition, with whether it is a super reference.
    fn type_specs(def: &Definition) -> Vec<(&TypeSpec, bool)> {
        match def {
            Definition::Group(g) => {
                let mut specs: Vec<(&TypeSpec, bool)> =
                    g.super_ref.iter().map(|s| (s, true)).collect();
                specs.extend(g.fields.iter().map(|f| (&f.ty, false)));
                specs
            }
            Definition::Define(d) => vec![(&d.ty, false)],
            Definition::Enum(_) => Vec::new(),
        }
    }

    fn check_references(&mut self) {
        let defs = self.defs.clone();
        for def in defs {
            let ns = def.name().ns();
            for (spec, is_super) in Self::type_specs(def) {
                let Some(name) = spec.ref_name() else {
                    continue;
                };
                match self.lookup(name, ns) {
                    None => {
                        self.fatal = true;
                        self.error(
                            &spec.location,
                            DiagnosticKind::UndefinedReference(name.to_string()),
                        );
                    }
                    Some(target) => {
                        let is_group = matches!(self.refs[target], DefRef::Group(_));
                        if spec.dynamic && !is_group && !is_super {
                            self.fatal = true;
                            self.error(
                                &spec.location,
                                DiagnosticKind::DynamicNonGroup(name.to_string()),
                            );
                        }
                    }
                }
            }
        }
    }

    /// Structural edges: static references to groups and defines, and
    /// every supergroup link.
    fn edges(&self, node: usize) -> Vec<(usize, Location, String)> {
        let def = self.defs[node];
        let ns = def.name().ns();
        let mut out = Vec::new();
        for (spec, is_super) in Self::type_specs(def) {
            if spec.dynamic && !is_super {
                continue;
            }
            let Some(name) = spec.ref_name() else {
                continue;
            };
            if let Some(target) = self.lookup(name, ns) {
                if !matches!(self.refs[target], DefRef::Enum(_)) {
                    out.push((target, spec.location.clone(), name.to_string()));
                }
            }
        }
        out
    }

    fn check_recursion(&mut self) {
        let mut state = vec![Visit::New; self.defs.len()];
        for root in 0..self.defs.len() {
            if state[root] == Visit::New {
                self.visit(root, &mut state);
            }
        }
    }

    fn visit(&mut self, node: usize, state: &mut [Visit]) {
        state[node] = Visit::Active;
        for (target, location, name) in self.edges(node) {
            match state[target] {
                Visit::Active => {
                    self.fatal = true;
                    self.error(&location, DiagnosticKind::RecursiveReference(name));
                }
                Visit::New => self.visit(target, state),
                Visit::Done => {}
            }
        }
        state[node] = Visit::Done;
    }

    /// Resolve a type spec, flattening defines. Only called once all
    /// references are known to exist and be acyclic.
    fn resolve_type(&mut self, spec: &TypeSpec, ns: Option<&str>) -> ResolvedType {
        let kind = match &spec.kind {
            TypeKind::Primitive(p) => Resolved::Primitive(*p),
            TypeKind::Fixed(n) => Resolved::Fixed(*n),
            TypeKind::FixedDec(s) => Resolved::FixedDec(*s),
            TypeKind::Ref(name) => {
                // Undefined references were reported by `check_references`.
                let Some(target) = self.lookup(name, ns) else {
                    return ResolvedType {
                        kind: Resolved::Primitive(Primitive::Binary),
                        sequence: spec.sequence,
                    };
                };
                match self.refs[target] {
                    DefRef::Group(g) if spec.dynamic => Resolved::DynamicGroup(g),
                    DefRef::Group(g) => Resolved::StaticGroup(g),
                    DefRef::Enum(e) => Resolved::Enum(e),
                    DefRef::Define(d) => {
                        let inner = self.resolve_define(d);
                        if spec.sequence && inner.sequence {
                            self.error(
                                &spec.location,
                                DiagnosticKind::NestedSequence(name.to_string()),
                            );
                        }
                        return ResolvedType {
                            kind: inner.kind,
                            sequence: spec.sequence || inner.sequence,
                        };
                    }
                }
            }
        };
        ResolvedType {
            kind,
            sequence: spec.sequence,
        }
    }

    fn resolve_define(&mut self, d: usize) -> ResolvedType {
        if let Some(resolved) = self.resolved_defines[d] {
            return resolved;
        }
        let define = self.defines[d];
        let resolved = self.resolve_type(&define.ty, define.name.ns());
        self.resolved_defines[d] = Some(resolved);
        resolved
    }

    fn resolve(&mut self) -> Schema {
        let enums: Vec<Enum> = self
            .enums
            .clone()
            .into_iter()
            .map(|e| self.resolve_enum(e))
            .collect();

        let defines: Vec<Define> = self
            .defines
            .clone()
            .into_iter()
            .enumerate()
            .map(|(idx, d)| Define {
                name: d.name.clone(),
                ty: d.ty.clone(),
                resolved: self.resolve_define(idx),
                annotations: d.annotations.clone(),
                location: d.location.clone(),
            })
            .collect();

        let group_defs = self.groups.clone();
        let supers: Vec<Option<usize>> = group_defs.iter().map(|g| self.resolve_super(g)).collect();
        let own_fields: Vec<Vec<Field>> = group_defs.iter().map(|g| self.resolve_fields(g)).collect();

        let mut all_fields: Vec<Option<Vec<Field>>> = vec![None; group_defs.len()];
        for idx in 0..group_defs.len() {
            self.flatten(idx, &group_defs, &supers, &own_fields, &mut all_fields);
        }

        let mut type_ids: HashMap<TypeId, usize> = HashMap::new();
        let mut groups = Vec::with_capacity(group_defs.len());
        for (idx, (g, fields)) in group_defs.iter().zip(own_fields).enumerate() {
            let version = g.version().map(str::to_string);
            let type_id = TypeId::compute(&g.name, version.as_deref());
            if let Some(&prev) = type_ids.get(&type_id) {
                self.diagnostics.push(
                    Diagnostic::new(
                        g.location.clone(),
                        DiagnosticKind::DuplicateTypeId {
                            name: g.name.to_string(),
                            type_id,
                        },
                    )
                    .with_related("conflicting group defined here", group_defs[prev].location.clone()),
                );
            } else {
                type_ids.insert(type_id, idx);
            }

            groups.push(Group {
                name: g.name.clone(),
                explicit_id: g.id,
                ordinal: idx as u64,
                version,
                type_id,
                super_group: supers[idx],
                fields,
                all_fields: all_fields[idx].take().unwrap_or_default(),
                annotations: g.annotations.clone(),
                location: g.location.clone(),
            });
        }

        let by_name = self
            .names
            .iter()
            .map(|(name, &node)| (name.clone(), self.refs[node]))
            .collect();
        let definitions = self.defs.iter().map(|d| (*d).clone()).collect();
        Schema::from_parts(definitions, groups, defines, enums, by_name)
    }

    fn resolve_enum(&mut self, e: &EnumDef) -> Enum {
        let mut symbols: Vec<Symbol> = Vec::with_capacity(e.symbols.len());
        let mut locations: Vec<&Location> = Vec::with_capacity(e.symbols.len());
        let mut next: Option<i32> = Some(0);
        for s in &e.symbols {
            let Some(value) = s.value.or(next) else {
                self.error(
                    &s.location,
                    DiagnosticKind::SymbolValueOverflow {
                        name: e.name.to_string(),
                        symbol: s.name.clone(),
                    },
                );
                continue;
            };
            next = value.checked_add(1);

            if let Some(pos) = symbols.iter().position(|prev| prev.name == s.name) {
                self.diagnostics.push(
                    Diagnostic::new(
                        s.location.clone(),
                        DiagnosticKind::DuplicateSymbol {
                            name: e.name.to_string(),
                            symbol: s.name.clone(),
                        },
                    )
                    .with_related("previously declared here", locations[pos].clone()),
                );
                continue;
            }
            if let Some(pos) = symbols.iter().position(|prev| prev.value == value) {
                self.diagnostics.push(
                    Diagnostic::new(
                        s.location.clone(),
                        DiagnosticKind::DuplicateSymbolValue {
                            name: e.name.to_string(),
                            symbol: s.name.clone(),
                            value,
                        },
                    )
                    .with_related("value previously used here", locations[pos].clone()),
                );
                continue;
            }
            symbols.push(Symbol {
                name: s.name.clone(),
                value,
                annotations: s.annotations.clone(),
            });
            locations.push(&s.location);
        }
        Enum {
            name: e.name.clone(),
            symbols,
            annotations: e.annotations.clone(),
            location: e.location.clone(),
        }
    }

    fn resolve_super(&mut self, g: &GroupDef) -> Option<usize> {
        let spec = g.super_ref.as_ref()?;
        let display = match &spec.kind {
            TypeKind::Ref(name) => name.to_string(),
            TypeKind::Primitive(p) => p.keyword().to_string(),
            TypeKind::Fixed(n) => format!("fixed({})", n),
            TypeKind::FixedDec(s) => format!("fixedDec({})", s),
        };
        let target = spec
            .ref_name()
            .and_then(|name| self.lookup(name, g.name.ns()))
            .map(|node| self.refs[node]);

        let Some(DefRef::Group(idx)) = target else {
            self.error(&spec.location, DiagnosticKind::SuperNotGroup(display));
            return None;
        };
        if spec.dynamic {
            self.error(&spec.location, DiagnosticKind::DynamicSuper(display));
            return None;
        }
        if spec.sequence {
            self.error(&spec.location, DiagnosticKind::SequenceSuper(display));
            return None;
        }
        Some(idx)
    }

    fn resolve_fields(&mut self, g: &GroupDef) -> Vec<Field> {
        let mut fields: Vec<Field> = Vec::with_capacity(g.fields.len());
        for f in &g.fields {
            if let Some(prev) = fields.iter().find(|prev| prev.name == f.name) {
                let earlier = prev.location.clone();
                self.diagnostics.push(
                    Diagnostic::new(
                        f.location.clone(),
                        DiagnosticKind::DuplicateField {
                            group: g.name.to_string(),
                            field: f.name.clone(),
                        },
                    )
                    .with_related("previously declared here", earlier),
                );
                continue;
            }
            let resolved = self.resolve_type(&f.ty, g.name.ns());
            fields.push(Field {
                name: f.name.clone(),
                ty: f.ty.clone(),
                resolved,
                optional: f.optional,
                annotations: f.annotations.clone(),
                location: f.location.clone(),
            });
        }
        fields
    }

    /// Compute inherited-then-own fields for `idx`, ancestors first.
    fn flatten(
        &mut self,
        idx: usize,
        group_defs: &[&GroupDef],
        supers: &[Option<usize>],
        own_fields: &[Vec<Field>],
        out: &mut [Option<Vec<Field>>],
    ) {
        if out[idx].is_some() {
            return;
        }
        let mut fields = match supers[idx] {
            Some(parent) => {
                self.flatten(parent, group_defs, supers, own_fields, out);
                out[parent].clone().unwrap_or_default()
            }
            None => Vec::new(),
        };
        for f in &own_fields[idx] {
            if let Some(inherited) = fields.iter().find(|i| i.name == f.name) {
                let earlier = inherited.location.clone();
                self.diagnostics.push(
                    Diagnostic::new(
                        f.location.clone(),
                        DiagnosticKind::ShadowedField {
                            group: group_defs[idx].name.to_string(),
                            field: f.name.clone(),
                        },
                    )
                    .with_related("inherited field declared here", earlier),
                );
                continue;
            }
            fields.push(f.clone());
        }
        out[idx] = Some(fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::grammar::parse_schema;

    fn check(input: &str) -> Result<Schema, SchemaError> {
        build(&parse_schema("t", input).unwrap())
    }

    fn kinds(input: &str) -> Vec<DiagnosticKind> {
        check(input)
            .unwrap_err()
            .diagnostics()
            .iter()
            .map(|d| d.kind.clone())
            .collect()
    }

    #[test]
    fn test_forward_references_resolve() {
        let schema = check("A -> B b\nB -> u32 x").unwrap();
        let a = schema.get_group("A").unwrap();
        assert_eq!(a.fields[0].resolved.kind, Resolved::StaticGroup(1));
    }

    #[test]
    fn test_define_is_flattened() {
        let schema = check("Ids = u64 []\nA -> Ids ids, Shape* s\nShape").unwrap();
        let a = schema.get_group("A").unwrap();
        assert_eq!(
            a.fields[0].resolved,
            ResolvedType {
                kind: Resolved::Primitive(Primitive::U64),
                sequence: true
            }
        );
        assert_eq!(a.fields[1].resolved.kind, Resolved::DynamicGroup(1));
    }

    #[test]
    fn test_inherited_fields_come_first() {
        let schema = check("Base -> u32 a\nMid : Base -> u32 b\nLeaf : Mid -> u32 c").unwrap();
        let leaf = schema.get_group("Leaf").unwrap();
        let names: Vec<&str> = leaf.all_fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(leaf.fields.len(), 1);
        assert_eq!(leaf.super_group, Some(1));
    }

    #[test]
    fn test_enum_auto_values() {
        let schema = check("E = A | B/10 | C").unwrap();
        let values: Vec<i32> = schema.enums()[0].symbols.iter().map(|s| s.value).collect();
        assert_eq!(values, [0, 10, 11]);
    }

    #[test]
    fn test_namespace_resolution_prefers_current_namespace() {
        let schema = check("B -> u8 x\nnamespace N\nB -> u16 y\nA -> B b").unwrap();
        let a = schema.find_group(&NsName::qualified("N", "A")).unwrap();
        assert_eq!(a.fields[0].resolved.kind, Resolved::StaticGroup(1));
    }

    #[test]
    fn test_duplicate_definition_has_related_location() {
        let err = check("Foo\nFoo -> u8 x").unwrap_err();
        let d = err.first();
        assert_eq!(d.location.line, 2);
        assert_eq!(d.related.as_ref().unwrap().location.line, 1);
    }

    #[test]
    fn test_recursive_define_reports_second_reference() {
        let err = check("Foo = Bar\nBar = Foo").unwrap_err();
        assert_eq!(err.diagnostics().len(), 1);
        let d = err.first();
        assert_eq!(d.kind, DiagnosticKind::RecursiveReference("Foo".into()));
        assert_eq!((d.location.line, d.location.column), (2, 7));
    }

    #[test]
    fn test_dynamic_self_reference_is_allowed() {
        assert!(check("Node -> u32 v, Node* next?").is_ok());
        assert_eq!(
            kinds("Node -> u32 v, Node next?"),
            vec![DiagnosticKind::RecursiveReference("Node".into())]
        );
    }

    #[test]
    fn test_super_cycle_is_rejected_even_when_dynamic() {
        let k = kinds("A : B*\nB : A");
        assert!(k.contains(&DiagnosticKind::RecursiveReference("A".into())));
    }

    #[test]
    fn test_super_rules() {
        assert_eq!(
            kinds("E = X | Y\nA : E"),
            vec![DiagnosticKind::SuperNotGroup("E".into())]
        );
        assert_eq!(
            kinds("B\nA : B*"),
            vec![DiagnosticKind::DynamicSuper("B".into())]
        );
        assert_eq!(
            kinds("B\nA : B []"),
            vec![DiagnosticKind::SequenceSuper("B".into())]
        );
    }

    #[test]
    fn test_nested_sequence_through_define() {
        assert_eq!(
            kinds("Ids = u64 []\nA -> Ids [] x"),
            vec![DiagnosticKind::NestedSequence("Ids".into())]
        );
    }

    #[test]
    fn test_nested_sequence_in_define_reported_once() {
        let err = check("Ids = u64 []\nSeq2 = Ids []\nA -> Seq2 x, Seq2 y").unwrap_err();
        assert_eq!(
            err.to_string(),
            "t:2:8: error: item type 'Ids' of a sequence must not itself be a sequence"
        );
    }

    #[test]
    fn test_field_rules() {
        assert_eq!(
            kinds("A -> u8 x, u16 x"),
            vec![DiagnosticKind::DuplicateField {
                group: "A".into(),
                field: "x".into()
            }]
        );
        assert_eq!(
            kinds("A -> u8 x\nB : A -> u16 x"),
            vec![DiagnosticKind::ShadowedField {
                group: "B".into(),
                field: "x".into()
            }]
        );
    }

    #[test]
    fn test_reference_rules() {
        assert_eq!(
            kinds("A -> Missing m"),
            vec![DiagnosticKind::UndefinedReference("Missing".into())]
        );
        assert_eq!(
            kinds("E = X | Y\nA -> E* e"),
            vec![DiagnosticKind::DynamicNonGroup("E".into())]
        );
    }

    #[test]
    fn test_enum_rules() {
        assert_eq!(
            kinds("E = A | B | A"),
            vec![DiagnosticKind::DuplicateSymbol {
                name: "E".into(),
                symbol: "A".into()
            }]
        );
        assert_eq!(
            kinds("E = A/1 | B/0 | C"),
            vec![DiagnosticKind::DuplicateSymbolValue {
                name: "E".into(),
                symbol: "C".into(),
                value: 1
            }]
        );
    }

    #[test]
    fn test_implicit_symbol_value_overflow() {
        assert_eq!(
            kinds("E = A/2147483647 | B"),
            vec![DiagnosticKind::SymbolValueOverflow {
                name: "E".into(),
                symbol: "B".into()
            }]
        );
        let err = check("E = A/2147483647 | B").unwrap_err();
        assert_eq!(err.first().location.line, 1);
        assert_eq!(err.first().location.column, 20);

        let schema = check("E = A/2147483646 | B | C/-5 | D").unwrap();
        let values: Vec<i32> = schema.enums()[0].symbols.iter().map(|s| s.value).collect();
        assert_eq!(values, [2147483646, 2147483647, -5, -4]);
    }

    #[test]
    fn test_collects_multiple_diagnostics() {
        let err = check("A -> X x\nB -> Y y").unwrap_err();
        assert_eq!(err.diagnostics().len(), 2);
    }
}
