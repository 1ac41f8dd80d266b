use std::sync::Arc;

use super::ast::*;
use super::lexer::{Lexer, Located, Token};
use crate::decimal::MAX_SCALE;
use crate::error::{Diagnostic, DiagnosticKind, Location, SchemaError};
use crate::types::{NsName, Primitive};

/// Parse Blink schema text into declared definitions.
///
/// `source` names the text in diagnostics (usually a file name).
pub fn parse_schema(source: &str, input: &str) -> Result<Vec<Definition>, SchemaError> {
    let mut parser = Parser {
        lexer: Lexer::new(input),
        source: Arc::from(source),
        namespace: None,
    };
    parser.parse_all()
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    source: Arc<str>,
    namespace: Option<String>,
}

impl Parser<'_> {
    fn parse_all(&mut self) -> Result<Vec<Definition>, SchemaError> {
        let mut defs = Vec::new();
        loop {
            let tok = self.lexer.peek_token();
            match &tok.token {
                Token::Eof => break,
                Token::Name(n) if n == "namespace" => {
                    self.lexer.next_token();
                    let (ns, _) = self.expect_name("namespace name")?;
                    self.namespace = Some(ns);
                }
                Token::Name(_) | Token::At => defs.push(self.parse_definition()?),
                _ => return Err(self.unexpected(&tok, "definition")),
            }
        }
        Ok(defs)
    }

    fn parse_definition(&mut self) -> Result<Definition, SchemaError> {
        let annotations = self.parse_annotations()?;
        let (local, name_tok) = self.expect_name("definition name")?;
        let name = NsName::new(self.namespace.as_deref(), local);
        let location = self.location(&name_tok);

        let id = if self.lexer.peek_token().token == Token::Slash {
            self.lexer.next_token();
            Some(self.expect_number("group id")?)
        } else {
            None
        };

        if self.lexer.peek_token().token == Token::Equals {
            let eq = self.lexer.next_token();
            if id.is_some() {
                return Err(self.error_at(&eq, "ids are only allowed on group definitions"));
            }
            return self.parse_define_or_enum(name, annotations, location);
        }

        let super_ref = if self.lexer.peek_token().token == Token::Colon {
            self.lexer.next_token();
            Some(self.parse_type()?)
        } else {
            None
        };

        let fields = if self.lexer.peek_token().token == Token::Arrow {
            self.lexer.next_token();
            self.parse_fields()?
        } else {
            Vec::new()
        };

        Ok(Definition::Group(GroupDef {
            name,
            id,
            super_ref,
            fields,
            annotations,
            location,
        }))
    }

    fn parse_fields(&mut self) -> Result<Vec<FieldDef>, SchemaError> {
        let mut fields = Vec::new();
        loop {
            let annotations = self.parse_annotations()?;
            let ty = self.parse_type()?;
            let (name, name_tok) = self.expect_name("field name")?;
            let optional = if self.lexer.peek_token().token == Token::Question {
                self.lexer.next_token();
                true
            } else {
                false
            };
            fields.push(FieldDef {
                name,
                ty,
                optional,
                annotations,
                location: self.location(&name_tok),
            });

            if self.lexer.peek_token().token == Token::Comma {
                self.lexer.next_token();
            } else {
                break;
            }
        }
        Ok(fields)
    }

    fn parse_define_or_enum(
        &mut self,
        name: NsName,
        annotations: Vec<Annotation>,
        location: Location,
    ) -> Result<Definition, SchemaError> {
        let is_enum = match self.lexer.peek_token().token {
            Token::Pipe | Token::At => true,
            Token::Name(ref word) if !is_type_keyword(word) => {
                matches!(self.peek_second().token, Token::Pipe | Token::Slash)
            }
            _ => false,
        };

        if is_enum {
            let symbols = self.parse_symbols()?;
            return Ok(Definition::Enum(EnumDef {
                name,
                symbols,
                annotations,
                location,
            }));
        }

        let ty = self.parse_type()?;
        Ok(Definition::Define(DefineDef {
            name,
            ty,
            annotations,
            location,
        }))
    }

    fn parse_symbols(&mut self) -> Result<Vec<SymbolDef>, SchemaError> {
        if self.lexer.peek_token().token == Token::Pipe {
            self.lexer.next_token();
        }
        let mut symbols = Vec::new();
        loop {
            let annotations = self.parse_annotations()?;
            let (name, tok) = self.expect_name("enum symbol")?;
            let value = if self.lexer.peek_token().token == Token::Slash {
                self.lexer.next_token();
                Some(self.parse_i32()?)
            } else {
                None
            };
            symbols.push(SymbolDef {
                name,
                value,
                annotations,
                location: self.location(&tok),
            });

            if self.lexer.peek_token().token == Token::Pipe {
                self.lexer.next_token();
            } else {
                break;
            }
        }
        Ok(symbols)
    }

    fn parse_type(&mut self) -> Result<TypeSpec, SchemaError> {
        let tok = self.lexer.next_token();
        let word = match &tok.token {
            Token::Name(w) => w.clone(),
            _ => return Err(self.unexpected(&tok, "type")),
        };

        let kind = match word.as_str() {
            "fixed" => {
                let size = self.parse_parenthesized("fixed size")?;
                let size = u32::try_from(size)
                    .map_err(|_| self.error_at(&tok, format!("fixed size {} is too large", size)))?;
                TypeKind::Fixed(size)
            }
            "fixedDec" => {
                let scale = self.parse_parenthesized("decimal scale")?;
                if scale > MAX_SCALE as u64 {
                    return Err(self.error_at(
                        &tok,
                        format!("decimal scale {} exceeds the maximum of {}", scale, MAX_SCALE),
                    ));
                }
                TypeKind::FixedDec(scale as u8)
            }
            _ => match Primitive::from_keyword(&word) {
                Some(p) => TypeKind::Primitive(p),
                None => TypeKind::Ref(self.finish_qname(word, &tok)),
            },
        };

        let mut dynamic = false;
        let star = self.lexer.peek_token();
        if star.token == Token::Star {
            if !matches!(kind, TypeKind::Ref(_)) {
                return Err(self.error_at(&star, "only references to groups can be dynamic"));
            }
            self.lexer.next_token();
            dynamic = true;
        }

        let mut sequence = false;
        if self.lexer.peek_token().token == Token::LBracket {
            self.lexer.next_token();
            self.expect(Token::RBracket, "']'")?;
            sequence = true;
        }

        Ok(TypeSpec {
            kind,
            dynamic,
            sequence,
            location: self.location(&tok),
        })
    }

    /// Complete a possibly qualified name whose first part was already read.
    /// `ns:Name` is only qualified when written without spaces.
    fn finish_qname(&mut self, first: String, first_tok: &Located) -> NsName {
        let colon = self.lexer.peek_token();
        if colon.token != Token::Colon || colon.start != first_tok.end {
            return NsName::local(first);
        }
        let second = self.peek_second();
        match second.token {
            Token::Name(name) if second.start == colon.end => {
                self.lexer.next_token();
                self.lexer.next_token();
                NsName::qualified(first, name)
            }
            _ => NsName::local(first),
        }
    }

    fn parse_annotations(&mut self) -> Result<Vec<Annotation>, SchemaError> {
        let mut annotations = Vec::new();
        while self.lexer.peek_token().token == Token::At {
            self.lexer.next_token();
            let (first, tok) = self.expect_name("annotation name")?;
            let name = self.finish_qname(first, &tok);
            self.expect(Token::Equals, "'='")?;
            let value_tok = self.lexer.next_token();
            let value = match value_tok.token {
                Token::Str(ref s) => s.clone(),
                _ => return Err(self.unexpected(&value_tok, "annotation value")),
            };
            annotations.push(Annotation { name, value });
        }
        Ok(annotations)
    }

    fn parse_parenthesized(&mut self, what: &str) -> Result<u64, SchemaError> {
        self.expect(Token::LParen, "'('")?;
        let n = self.expect_number(what)?;
        self.expect(Token::RParen, "')'")?;
        Ok(n)
    }

    fn parse_i32(&mut self) -> Result<i32, SchemaError> {
        let tok = self.lexer.peek_token();
        let negative = if tok.token == Token::Minus {
            self.lexer.next_token();
            true
        } else {
            false
        };
        let magnitude = self.expect_number("symbol value")?;
        let value = i64::try_from(magnitude)
            .ok()
            .and_then(|m| if negative { m.checked_neg() } else { Some(m) })
            .and_then(|v| i32::try_from(v).ok());
        value.ok_or_else(|| {
            let sign = if negative { "-" } else { "" };
            self.error_at(&tok, format!("symbol value {}{} does not fit in i32", sign, magnitude))
        })
    }

    // Helper functions

    fn peek_second(&self) -> Located {
        let mut ahead = self.lexer.clone();
        ahead.next_token();
        ahead.next_token()
    }

    fn expect_name(&mut self, what: &str) -> Result<(String, Located), SchemaError> {
        let tok = self.lexer.next_token();
        match &tok.token {
            Token::Name(n) => Ok((n.clone(), tok)),
            _ => Err(self.unexpected(&tok, what)),
        }
    }

    fn expect_number(&mut self, what: &str) -> Result<u64, SchemaError> {
        let tok = self.lexer.next_token();
        match tok.token {
            Token::Number(n) => Ok(n),
            _ => Err(self.unexpected(&tok, what)),
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), SchemaError> {
        let tok = self.lexer.next_token();
        if tok.token == expected {
            Ok(())
        } else {
            Err(self.unexpected(&tok, what))
        }
    }

    fn location(&self, tok: &Located) -> Location {
        Location {
            source: self.source.clone(),
            line: tok.line,
            column: tok.column,
        }
    }

    fn error_at(&self, tok: &Located, message: impl Into<String>) -> SchemaError {
        SchemaError::single(Diagnostic::new(
            self.location(tok),
            DiagnosticKind::Syntax(message.into()),
        ))
    }

    fn unexpected(&self, tok: &Located, expected: &str) -> SchemaError {
        let found = match &tok.token {
            Token::Invalid(msg) => return self.error_at(tok, msg.clone()),
            Token::Eof => "end of input".to_string(),
            Token::Name(n) => format!("'{}'", n),
            Token::Number(n) => n.to_string(),
            Token::Str(s) => format!("string '{}'", s),
            other => format!("'{}'", punctuation(other)),
        };
        self.error_at(tok, format!("expected {}, found {}", expected, found))
    }
}

fn is_type_keyword(word: &str) -> bool {
    word == "fixed" || word == "fixedDec" || Primitive::from_keyword(word).is_some()
}

fn punctuation(token: &Token) -> &'static str {
    match token {
        Token::At => "@",
        Token::Slash => "/",
        Token::Colon => ":",
        Token::Star => "*",
        Token::LBracket => "[",
        Token::RBracket => "]",
        Token::Question => "?",
        Token::Comma => ",",
        Token::Equals => "=",
        Token::Pipe => "|",
        Token::LParen => "(",
        Token::RParen => ")",
        Token::Arrow => "->",
        Token::Minus => "-",
        _ => "?",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Vec<Definition> {
        parse_schema("test", input).unwrap()
    }

    fn group(def: &Definition) -> &GroupDef {
        match def {
            Definition::Group(g) => g,
            other => panic!("expected group, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_simple_group() {
        let defs = parse("Foo/7 -> u32 Bar?, string Baz");
        let g = group(&defs[0]);
        assert_eq!(g.name, NsName::local("Foo"));
        assert_eq!(g.id, Some(7));
        assert_eq!(g.fields.len(), 2);
        assert!(g.fields[0].optional);
        assert_eq!(g.fields[0].ty.kind, TypeKind::Primitive(Primitive::U32));
        assert_eq!(g.fields[1].name, "Baz");
        assert!(!g.fields[1].optional);
    }

    #[test]
    fn test_parse_supergroup_and_dynamic_sequence() {
        let defs = parse("Shape\nRect:Shape -> u32 W\nCanvas -> Shape* [] Shapes");
        let rect = group(&defs[1]);
        assert_eq!(rect.super_ref.as_ref().unwrap().ref_name(), Some(&NsName::local("Shape")));
        let canvas = group(&defs[2]);
        let ty = &canvas.fields[0].ty;
        assert!(ty.dynamic);
        assert!(ty.sequence);
        assert_eq!(ty.ref_name(), Some(&NsName::local("Shape")));
    }

    #[test]
    fn test_parse_enum_and_define() {
        let defs = parse("Color = Red | Green/5 | Blue\nSolo = | Only\nPrice = fixedDec(4)\nIds = u64 []");
        match &defs[0] {
            Definition::Enum(e) => {
                assert_eq!(e.symbols.len(), 3);
                assert_eq!(e.symbols[1].value, Some(5));
                assert_eq!(e.symbols[2].value, None);
            }
            other => panic!("expected enum, got {:?}", other),
        }
        assert!(matches!(&defs[1], Definition::Enum(e) if e.symbols.len() == 1));
        match &defs[2] {
            Definition::Define(d) => assert_eq!(d.ty.kind, TypeKind::FixedDec(4)),
            other => panic!("expected define, got {:?}", other),
        }
        assert!(matches!(&defs[3], Definition::Define(d) if d.ty.sequence));
    }

    #[test]
    fn test_parse_negative_symbol_value() {
        let defs = parse("Sign = Neg/-1 | Zero | Pos");
        match &defs[0] {
            Definition::Enum(e) => assert_eq!(e.symbols[0].value, Some(-1)),
            other => panic!("expected enum, got {:?}", other),
        }
    }

    #[test]
    fn test_symbol_value_out_of_i32_range() {
        for (input, shown) in [
            ("E = A/-9223372036854775808 | B", "-9223372036854775808"),
            ("E = A/18446744073709551615", "18446744073709551615"),
            ("E = A/2147483648", "2147483648"),
        ] {
            let err = parse_schema("test", input).unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("test:1:7: error: symbol value {} does not fit in i32", shown),
                "{}",
                input
            );
        }
        match &parse("E = A/-2147483648")[0] {
            Definition::Enum(e) => assert_eq!(e.symbols[0].value, Some(i32::MIN)),
            other => panic!("expected enum, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_namespace_and_qualified_refs() {
        let defs = parse("namespace Demo\nA -> Other:B x, B y\nC : Other:B");
        let a = group(&defs[0]);
        assert_eq!(a.name, NsName::qualified("Demo", "A"));
        assert_eq!(a.fields[0].ty.ref_name(), Some(&NsName::qualified("Other", "B")));
        assert_eq!(a.fields[1].ty.ref_name(), Some(&NsName::local("B")));
        let c = group(&defs[1]);
        assert_eq!(
            c.super_ref.as_ref().unwrap().ref_name(),
            Some(&NsName::qualified("Other", "B"))
        );
    }

    #[test]
    fn test_parse_annotations() {
        let defs = parse("@doc='A thing' @version='2' Thing -> @unit=\"ms\" u64 Time");
        let g = group(&defs[0]);
        assert_eq!(g.annotations.len(), 2);
        assert_eq!(g.version(), Some("2"));
        assert_eq!(g.fields[0].annotations[0].value, "ms");
    }

    #[test]
    fn test_parse_fixed_types() {
        let defs = parse("Pkt -> fixed(16) Hash, fixedDec(7) Px");
        let g = group(&defs[0]);
        assert_eq!(g.fields[0].ty.kind, TypeKind::Fixed(16));
        assert_eq!(g.fields[1].ty.kind, TypeKind::FixedDec(7));
    }

    #[test]
    fn test_syntax_error_position() {
        let err = parse_schema("s.blink", "Foo -> u32 Bar,\n  , string Baz").unwrap_err();
        let d = err.first();
        assert_eq!((d.location.line, d.location.column), (2, 3));
        assert_eq!(d.to_string(), "s.blink:2:3: error: expected type, found ','");
    }

    #[test]
    fn test_rejects_dynamic_primitive() {
        let err = parse_schema("s", "Foo -> u32* Bar").unwrap_err();
        assert!(err.to_string().contains("only references to groups can be dynamic"));
    }

    #[test]
    fn test_rejects_large_decimal_scale() {
        assert!(parse_schema("s", "Foo -> fixedDec(19) Bar").is_err());
    }
}
