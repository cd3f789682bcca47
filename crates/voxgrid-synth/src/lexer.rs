//! Byte-oriented tokenizer for the snippet language.
//!
//! Lexing never fails: bytes that fit no rule come back as [`TokenKind::Unknown`]
//! and an unterminated string simply runs to end of input. The structural scanner
//! relies on this to split garbage input without erroring; the parser reports a
//! syntax error when it meets a token it cannot use.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub byte: usize,
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Text(String),
    /// Raw source of a `${...}` hole, parsed later by the parser.
    Expr(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Number(f64),
    Str(String),
    Template(Vec<TemplatePart>),
    Punct(&'static str),
    Unknown(char),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// A line break (or a comment containing one) precedes this token.
    pub newline_before: bool,
}

impl Token {
    pub fn is_punct(&self, p: &str) -> bool {
        matches!(&self.kind, TokenKind::Punct(q) if *q == p)
    }

    pub fn is_ident(&self, name: &str) -> bool {
        matches!(&self.kind, TokenKind::Ident(n) if n == name)
    }

    pub fn ident(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Ident(n) => Some(n.as_str()),
            _ => None,
        }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}

/// Longest first so `===` wins over `==` and `=`.
const PUNCTUATORS: &[&str] = &[
    "...", "===", "!==", "=>", "==", "!=", "<=", ">=", "&&", "||", "??", "?.", "+", "-", "*",
    "/", "%", "!", "<", ">", "=", "(", ")", "{", "}", "[", "]", ",", ";", ":", ".", "?", "&",
    "|",
];

#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    idx: usize,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            idx: 0,
            line: 1,
            col: 1,
        }
    }

    pub fn tokenize(mut self) -> Vec<Token> {
        let mut out = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.is_eof();
            out.push(token);
            if is_eof {
                break;
            }
        }
        out
    }

    pub fn position(&self) -> Position {
        Position {
            byte: self.idx,
            line: self.line,
            col: self.col,
        }
    }

    pub fn next_token(&mut self) -> Token {
        let newline_before = self.skip_trivia();
        let start = self.position();
        let kind = if self.idx >= self.bytes.len() {
            TokenKind::Eof
        } else {
            let b = self.bytes[self.idx];
            if b == b'"' || b == b'\'' {
                self.lex_string(b)
            } else if b == b'`' {
                self.lex_template()
            } else if b.is_ascii_digit()
                || (b == b'.' && self.peek_n_bytes(1).is_some_and(|n| n.is_ascii_digit()))
            {
                self.lex_number()
            } else if self.current_char().is_some_and(is_ident_start) {
                self.lex_identifier()
            } else if let Some(p) = self.match_punct() {
                for _ in 0..p.len() {
                    self.advance_byte();
                }
                TokenKind::Punct(p)
            } else {
                let ch = self.input[self.idx..].chars().next().unwrap_or('\u{fffd}');
                for _ in 0..ch.len_utf8() {
                    self.advance_byte();
                }
                TokenKind::Unknown(ch)
            }
        };
        Token {
            kind,
            span: Span::new(start, self.position()),
            newline_before,
        }
    }

    /// Read raw JSX child text up to the next `<`, `{` or end of input.
    pub fn read_jsx_text(&mut self) -> String {
        let start = self.idx;
        while self.idx < self.bytes.len() {
            let b = self.bytes[self.idx];
            if b == b'<' || b == b'{' {
                break;
            }
            self.advance_byte();
        }
        self.input[start..self.idx].to_string()
    }

    fn skip_trivia(&mut self) -> bool {
        let mut saw_newline = false;
        while self.idx < self.bytes.len() {
            let b = self.bytes[self.idx];
            match b {
                b'\n' => {
                    saw_newline = true;
                    self.advance_byte();
                }
                b' ' | b'\t' | b'\r' => self.advance_byte(),
                b'/' if self.peek_n_bytes(1) == Some(b'/') => {
                    while self.idx < self.bytes.len() && self.bytes[self.idx] != b'\n' {
                        self.advance_byte();
                    }
                }
                b'/' if self.peek_n_bytes(1) == Some(b'*') => {
                    self.advance_byte();
                    self.advance_byte();
                    while self.idx < self.bytes.len() {
                        if self.bytes[self.idx] == b'*' && self.peek_n_bytes(1) == Some(b'/') {
                            self.advance_byte();
                            self.advance_byte();
                            break;
                        }
                        if self.bytes[self.idx] == b'\n' {
                            saw_newline = true;
                        }
                        self.advance_byte();
                    }
                }
                // Non-breaking space and other exotic whitespace.
                0xC2 if self.peek_n_bytes(1) == Some(0xA0) => {
                    self.advance_byte();
                    self.advance_byte();
                }
                _ => break,
            }
        }
        saw_newline
    }

    fn lex_string(&mut self, quote: u8) -> TokenKind {
        self.advance_byte();
        let content_start = self.idx;
        while self.idx < self.bytes.len() {
            let b = self.bytes[self.idx];
            if b == quote {
                let content = &self.input[content_start..self.idx];
                self.advance_byte();
                return TokenKind::Str(unescape(content));
            }
            if b == b'\\' {
                self.advance_byte();
                if self.idx < self.bytes.len() {
                    self.advance_byte();
                }
                continue;
            }
            if b == b'\n' {
                break;
            }
            self.advance_byte();
        }
        TokenKind::Str(unescape(&self.input[content_start..self.idx]))
    }

    fn lex_template(&mut self) -> TokenKind {
        self.advance_byte(); // `
        let mut parts = Vec::new();
        let mut text_start = self.idx;
        while self.idx < self.bytes.len() {
            let b = self.bytes[self.idx];
            if b == b'`' {
                break;
            }
            if b == b'\\' {
                self.advance_byte();
                if self.idx < self.bytes.len() {
                    self.advance_byte();
                }
                continue;
            }
            if b == b'$' && self.peek_n_bytes(1) == Some(b'{') {
                let text = &self.input[text_start..self.idx];
                if !text.is_empty() {
                    parts.push(TemplatePart::Text(unescape(text)));
                }
                self.advance_byte();
                self.advance_byte();
                let expr_start = self.idx;
                self.skip_balanced_braces();
                parts.push(TemplatePart::Expr(
                    self.input[expr_start..self.idx].to_string(),
                ));
                if self.idx < self.bytes.len() {
                    self.advance_byte(); // }
                }
                text_start = self.idx;
                continue;
            }
            self.advance_byte();
        }
        let text = &self.input[text_start..self.idx];
        if !text.is_empty() {
            parts.push(TemplatePart::Text(unescape(text)));
        }
        if self.idx < self.bytes.len() {
            self.advance_byte(); // closing `
        }
        TokenKind::Template(parts)
    }

    /// Advance to the `}` closing an already-opened `${`, stepping over nested
    /// braces and quoted strings.
    fn skip_balanced_braces(&mut self) {
        let mut depth = 0usize;
        while self.idx < self.bytes.len() {
            match self.bytes[self.idx] {
                b'{' => depth += 1,
                b'}' if depth == 0 => return,
                b'}' => depth -= 1,
                q @ (b'"' | b'\'' | b'`') => {
                    self.advance_byte();
                    while self.idx < self.bytes.len() && self.bytes[self.idx] != q {
                        if self.bytes[self.idx] == b'\\' {
                            self.advance_byte();
                        }
                        if self.idx < self.bytes.len() {
                            self.advance_byte();
                        }
                    }
                }
                _ => {}
            }
            if self.idx < self.bytes.len() {
                self.advance_byte();
            }
        }
    }

    fn lex_number(&mut self) -> TokenKind {
        let start = self.idx;
        if self.bytes[self.idx] == b'0'
            && matches!(self.peek_n_bytes(1), Some(b'x') | Some(b'X'))
        {
            self.advance_byte();
            self.advance_byte();
            let digits_start = self.idx;
            while self.idx < self.bytes.len() && self.bytes[self.idx].is_ascii_hexdigit() {
                self.advance_byte();
            }
            let value = i64::from_str_radix(&self.input[digits_start..self.idx], 16).unwrap_or(0);
            return TokenKind::Number(value as f64);
        }
        while self.idx < self.bytes.len() {
            let b = self.bytes[self.idx];
            if b.is_ascii_digit() || b == b'.' || b == b'_' {
                self.advance_byte();
            } else if (b == b'e' || b == b'E')
                && self
                    .peek_n_bytes(1)
                    .is_some_and(|n| n.is_ascii_digit() || n == b'-' || n == b'+')
            {
                self.advance_byte();
                self.advance_byte();
            } else {
                break;
            }
        }
        let text: String = self.input[start..self.idx]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        TokenKind::Number(text.parse().unwrap_or(f64::NAN))
    }

    fn lex_identifier(&mut self) -> TokenKind {
        let start = self.idx;
        while let Some(ch) = self.current_char().filter(|c| is_ident_continue(*c)) {
            for _ in 0..ch.len_utf8() {
                self.advance_byte();
            }
        }
        TokenKind::Ident(self.input[start..self.idx].to_string())
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.idx..).and_then(|rest| rest.chars().next())
    }

    fn match_punct(&self) -> Option<&'static str> {
        let rest = &self.bytes[self.idx..];
        PUNCTUATORS
            .iter()
            .copied()
            .find(|p| rest.starts_with(p.as_bytes()))
    }

    fn peek_n_bytes(&self, n: usize) -> Option<u8> {
        self.bytes.get(self.idx + n).copied()
    }

    fn advance_byte(&mut self) {
        if self.idx >= self.bytes.len() {
            return;
        }
        let b = self.bytes[self.idx];
        self.idx += 1;
        if b == b'\n' {
            self.line += 1;
            self.col = 1;
        } else if b & 0xC0 != 0x80 {
            self.col += 1;
        }
    }
}

/// Unicode letters are accepted, as in JavaScript identifiers.
fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Decode backslash escapes in string and template text.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(ch) => out.push(ch),
                    None => out.push_str(&hex),
                }
            }
            Some('\n') => {}
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
