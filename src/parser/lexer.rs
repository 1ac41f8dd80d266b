/// Token types produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `@` annotation prefix
    At,
    /// `/` id or symbol value separator
    Slash,
    /// `:` supergroup or namespace separator
    Colon,
    /// `*` dynamic reference marker
    Star,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `?` optional marker
    Question,
    /// `,`
    Comma,
    /// `=`
    Equals,
    /// `|`
    Pipe,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `->`
    Arrow,
    /// `-` sign of a negative number
    Minus,
    /// An identifier (definition, field, keyword)
    Name(String),
    /// An unsigned numeric literal
    Number(u64),
    /// A quoted annotation literal, escapes already processed
    Str(String),
    /// Something the lexer could not make sense of
    Invalid(String),
    /// End of input
    Eof,
}

/// A token with its source location.
#[derive(Debug, Clone)]
pub struct Located {
    pub token: Token,
    pub line: u32,
    pub column: u32,
    /// Byte offsets of the token in the input.
    pub start: usize,
    pub end: usize,
}

/// Tokenizer for Blink schema text.
#[derive(Clone)]
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    line: u32,
    line_start: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input: input.as_bytes(),
            pos: 0,
            line: 1,
            line_start: 0,
        }
    }

    fn peek_byte(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_byte_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek_byte()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.line_start = self.pos;
        }
        Some(b)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek_byte() {
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
                    self.advance();
                }
                Some(b'#') => {
                    // Line comment: skip to end of line
                    while let Some(b) = self.advance() {
                        if b == b'\n' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn read_name(&mut self) -> Token {
        let start = self.pos;
        while let Some(b) = self.peek_byte() {
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.advance();
            } else {
                break;
            }
        }
        // Only ASCII bytes were consumed.
        Token::Name(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
    }

    fn read_number(&mut self) -> Token {
        let start = self.pos;
        let hex = self.peek_byte() == Some(b'0') && matches!(self.peek_byte_at(1), Some(b'x' | b'X'));
        if hex {
            self.advance();
            self.advance();
        }
        let digits_start = self.pos;
        while let Some(b) = self.peek_byte() {
            if b.is_ascii_hexdigit() && (hex || b.is_ascii_digit()) {
                self.advance();
            } else {
                break;
            }
        }
        let digits = String::from_utf8_lossy(&self.input[digits_start..self.pos]);
        let parsed = if hex {
            u64::from_str_radix(&digits, 16)
        } else {
            digits.parse()
        };
        match parsed {
            Ok(n) => Token::Number(n),
            Err(_) => Token::Invalid(format!(
                "invalid number '{}'",
                String::from_utf8_lossy(&self.input[start..self.pos])
            )),
        }
    }

    fn read_string(&mut self, quote: u8) -> Token {
        self.advance();
        let mut bytes = Vec::new();
        loop {
            match self.advance() {
                None | Some(b'\n') => return Token::Invalid("unterminated string literal".into()),
                Some(b) if b == quote => break,
                Some(b'\\') => match self.advance() {
                    Some(b'n') => bytes.push(b'\n'),
                    Some(b't') => bytes.push(b'\t'),
                    Some(b'r') => bytes.push(b'\r'),
                    Some(b) if b == b'\\' || b == b'\'' || b == b'"' => bytes.push(b),
                    Some(b) => {
                        return Token::Invalid(format!("unknown escape '\\{}'", b as char));
                    }
                    None => return Token::Invalid("unterminated string literal".into()),
                },
                Some(b) => bytes.push(b),
            }
        }
        match String::from_utf8(bytes) {
            Ok(s) => Token::Str(s),
            Err(_) => Token::Invalid("string literal is not valid utf-8".into()),
        }
    }

    /// Read the next token.
    pub fn next_token(&mut self) -> Located {
        self.skip_whitespace_and_comments();
        let line = self.line;
        let column = (self.pos - self.line_start) as u32 + 1;
        let start = self.pos;

        let token = match self.peek_byte() {
            None => Token::Eof,
            Some(b'-') if self.peek_byte_at(1) == Some(b'>') => {
                self.advance();
                self.advance();
                Token::Arrow
            }
            Some(b) if b.is_ascii_alphabetic() || b == b'_' => self.read_name(),
            Some(b) if b.is_ascii_digit() => self.read_number(),
            Some(q @ (b'\'' | b'"')) => self.read_string(q),
            Some(b) => {
                self.advance();
                match b {
                    b'@' => Token::At,
                    b'/' => Token::Slash,
                    b':' => Token::Colon,
                    b'*' => Token::Star,
                    b'[' => Token::LBracket,
                    b']' => Token::RBracket,
                    b'?' => Token::Question,
                    b',' => Token::Comma,
                    b'=' => Token::Equals,
                    b'|' => Token::Pipe,
                    b'(' => Token::LParen,
                    b')' => Token::RParen,
                    b'-' => Token::Minus,
                    other => Token::Invalid(format!("unexpected character '{}'", other as char)),
                }
            }
        };

        Located {
            token,
            line,
            column,
            start,
            end: self.pos,
        }
    }

    /// Peek at the next token without consuming it.
    pub fn peek_token(&mut self) -> Located {
        let saved = (self.pos, self.line, self.line_start);
        let tok = self.next_token();
        (self.pos, self.line, self.line_start) = saved;
        tok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        let mut lex = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            let t = lex.next_token().token;
            if t == Token::Eof {
                break;
            }
            out.push(t);
        }
        out
    }

    #[test]
    fn test_group_tokens() {
        assert_eq!(
            tokens("Foo/3 -> u32 Bar?, string Baz"),
            vec![
                Token::Name("Foo".into()),
                Token::Slash,
                Token::Number(3),
                Token::Arrow,
                Token::Name("u32".into()),
                Token::Name("Bar".into()),
                Token::Question,
                Token::Comma,
                Token::Name("string".into()),
                Token::Name("Baz".into()),
            ]
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(tokens("# comment\nFoo"), vec![Token::Name("Foo".into())]);
    }

    #[test]
    fn test_string_literals() {
        assert_eq!(
            tokens(r#"@doc='it\'s' @b="x\ny""#),
            vec![
                Token::At,
                Token::Name("doc".into()),
                Token::Equals,
                Token::Str("it's".into()),
                Token::At,
                Token::Name("b".into()),
                Token::Equals,
                Token::Str("x\ny".into()),
            ]
        );
        assert!(matches!(tokens("'open")[0], Token::Invalid(_)));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(tokens("0x1F 42"), vec![Token::Number(31), Token::Number(42)]);
        assert_eq!(tokens("-5"), vec![Token::Minus, Token::Number(5)]);
    }

    #[test]
    fn test_line_and_column_tracking() {
        let mut lex = Lexer::new("a\n  bc\n d");
        let t1 = lex.next_token();
        assert_eq!((t1.line, t1.column), (1, 1));
        let t2 = lex.next_token();
        assert_eq!((t2.line, t2.column), (2, 3));
        assert_eq!((t2.start, t2.end), (4, 6));
        let t3 = lex.next_token();
        assert_eq!((t3.line, t3.column), (3, 2));
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut lex = Lexer::new("x y");
        assert_eq!(lex.peek_token().token, Token::Name("x".into()));
        assert_eq!(lex.next_token().token, Token::Name("x".into()));
        assert_eq!(lex.next_token().token, Token::Name("y".into()));
    }
}
