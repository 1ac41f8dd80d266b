//! Schema text output.
//!
//! Prints declared definitions in the same syntax the parser reads, one
//! definition per line. Unqualified definitions come first, then one
//! `namespace` block per namespace in order of first appearance.

use std::fmt::{self, Write};

use crate::parser::ast::*;
use crate::types::Schema;

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}='", self.name)?;
        for c in self.value.chars() {
            match c {
                '\'' => f.write_str("\\'")?,
                '\\' => f.write_str("\\\\")?,
                '\n' => f.write_str("\\n")?,
                '\t' => f.write_str("\\t")?,
                '\r' => f.write_str("\\r")?,
                c => f.write_char(c)?,
            }
        }
        f.write_char('\'')
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeKind::Primitive(p) => f.write_str(p.keyword())?,
            TypeKind::Fixed(n) => write!(f, "fixed({})", n)?,
            TypeKind::FixedDec(s) => write!(f, "fixedDec({})", s)?,
            TypeKind::Ref(name) => write!(f, "{}", name)?,
        }
        if self.dynamic {
            f.write_char('*')?;
        }
        if self.sequence {
            f.write_str(" []")?;
        }
        Ok(())
    }
}

fn annotations(f: &mut fmt::Formatter<'_>, list: &[Annotation]) -> fmt::Result {
    for a in list {
        write!(f, "{} ", a)?;
    }
    Ok(())
}

impl fmt::Display for Definition {
    /// Prints with the local name; the namespace is set by the enclosing
    /// `namespace` line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Definition::Group(g) => {
                annotations(f, &g.annotations)?;
                f.write_str(g.name.name())?;
                if let Some(id) = g.id {
                    write!(f, "/{}", id)?;
                }
                if let Some(s) = &g.super_ref {
                    write!(f, " : {}", s)?;
                }
                for (i, field) in g.fields.iter().enumerate() {
                    f.write_str(if i == 0 { " -> " } else { ", " })?;
                    annotations(f, &field.annotations)?;
                    write!(f, "{} {}", field.ty, field.name)?;
                    if field.optional {
                        f.write_char('?')?;
                    }
                }
                Ok(())
            }
            Definition::Define(d) => {
                annotations(f, &d.annotations)?;
                write!(f, "{} = {}", d.name.name(), d.ty)
            }
            Definition::Enum(e) => {
                annotations(f, &e.annotations)?;
                write!(f, "{} =", e.name.name())?;
                if e.symbols.len() == 1 {
                    f.write_str(" |")?;
                }
                for (i, s) in e.symbols.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" |")?;
                    }
                    f.write_char(' ')?;
                    annotations(f, &s.annotations)?;
                    f.write_str(&s.name)?;
                    if let Some(v) = s.value {
                        write!(f, "/{}", v)?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// Render definitions as schema text.
pub fn print_definitions(defs: &[Definition]) -> String {
    let mut namespaces: Vec<Option<&str>> = vec![None];
    for def in defs {
        let ns = def.name().ns();
        if !namespaces.contains(&ns) {
            namespaces.push(ns);
        }
    }

    let mut out = String::new();
    for ns in namespaces {
        let block: Vec<&Definition> = defs.iter().filter(|d| d.name().ns() == ns).collect();
        if block.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        if let Some(ns) = ns {
            let _ = writeln!(out, "namespace {}\n", ns);
        }
        for def in block {
            let _ = writeln!(out, "{}", def);
        }
    }
    out
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&print_definitions(self.definitions()))
    }
}
