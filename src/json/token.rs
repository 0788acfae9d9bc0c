//! Strict, allocation-free JSON tokenizer.
//!
//! Splits a document into a flat array of tokens. Each token records its
//! kind, byte span, number of direct children and the index of its parent,
//! so callers can walk the document without building a tree. Object values
//! are children of their key token, keys are children of the object.

/// Kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TokenKind {
    #[default]
    Undefined,
    Object,
    Array,
    String,
    /// Number, `true`, `false` or `null`.
    Primitive,
}

/// One token of a parsed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Token {
    pub kind: TokenKind,
    /// First byte of the token. Strings exclude the opening quote.
    pub start: usize,
    /// One past the last byte, `None` while a container is still open.
    pub end: Option<usize>,
    /// Direct children: keys of an object, elements of an array, 1 for a key
    /// with a value.
    pub size: usize,
    pub parent: Option<usize>,
}

impl Token {
    pub const EMPTY: Token = Token {
        kind: TokenKind::Undefined,
        start: 0,
        end: None,
        size: 0,
        parent: None,
    };

    const fn new(kind: TokenKind, start: usize, end: Option<usize>, parent: Option<usize>) -> Self {
        Token {
            kind,
            start,
            end,
            size: 0,
            parent,
        }
    }

    /// Byte length of the token, zero while still open.
    pub fn len(&self) -> usize {
        self.end.map_or(0, |end| end - self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Tokenizer failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JsonError {
    /// Not enough tokens for the document.
    NoMemory,
    /// Invalid character or structure.
    Invalid,
    /// Document ends before every token is closed.
    Partial,
    /// Another session holds the scanner.
    Busy,
}

impl JsonError {
    /// Negative code reported for this failure; tokenizer failures show up
    /// as the token count.
    pub const fn code(&self) -> i32 {
        match self {
            JsonError::NoMemory => -1,
            JsonError::Invalid => -2,
            JsonError::Partial => -3,
            JsonError::Busy => -4,
        }
    }
}

impl core::fmt::Display for JsonError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            JsonError::NoMemory => write!(f, "not enough tokens"),
            JsonError::Invalid => write!(f, "invalid character in JSON"),
            JsonError::Partial => write!(f, "incomplete JSON document"),
            JsonError::Busy => write!(f, "JSON scanner busy"),
        }
    }
}

/// Document bytes plus an optional synthesized trailing byte.
#[derive(Clone, Copy)]
struct Source<'a> {
    text: &'a [u8],
    tail: Option<u8>,
}

impl Source<'_> {
    fn len(&self) -> usize {
        self.text.len() + usize::from(self.tail.is_some())
    }

    fn at(&self, pos: usize) -> u8 {
        match self.text.get(pos) {
            Some(b) => *b,
            None => self.tail.unwrap_or(0),
        }
    }
}

/// Parser state. A fresh tokenizer is needed for every document.
#[derive(Debug, Default)]
pub struct Tokenizer {
    pos: usize,
    next: usize,
    parent: Option<usize>,
}

impl Tokenizer {
    pub const fn new() -> Self {
        Tokenizer {
            pos: 0,
            next: 0,
            parent: None,
        }
    }

    /// Tokenizes `json` into `tokens`, returning the token count.
    ///
    /// Parsing stops at the first NUL byte.
    pub fn parse(&mut self, json: &[u8], tokens: &mut [Token]) -> Result<usize, JsonError> {
        self.run(Source { text: json, tail: None }, tokens)
    }

    /// Like [`parse`](Self::parse), with `tail` appended after `json`.
    pub fn parse_with_tail(
        &mut self,
        json: &[u8],
        tail: u8,
        tokens: &mut [Token],
    ) -> Result<usize, JsonError> {
        self.run(
            Source {
                text: json,
                tail: Some(tail),
            },
            tokens,
        )
    }

    fn run(&mut self, src: Source<'_>, tokens: &mut [Token]) -> Result<usize, JsonError> {
        let mut count = self.next;
        while self.pos < src.len() && src.at(self.pos) != 0 {
            match src.at(self.pos) {
                c @ (b'{' | b'[') => {
                    count += 1;
                    let index = self.alloc(tokens)?;
                    if let Some(p) = self.parent {
                        // a container cannot be an object key
                        if tokens[p].kind == TokenKind::Object {
                            return Err(JsonError::Invalid);
                        }
                        tokens[p].size += 1;
                    }
                    let kind = if c == b'{' {
                        TokenKind::Object
                    } else {
                        TokenKind::Array
                    };
                    tokens[index] = Token::new(kind, self.pos, None, self.parent);
                    self.parent = Some(index);
                }
                c @ (b'}' | b']') => {
                    let kind = if c == b'}' {
                        TokenKind::Object
                    } else {
                        TokenKind::Array
                    };
                    self.close(kind, tokens)?;
                }
                b'"' => {
                    self.string(src, tokens)?;
                    count += 1;
                    if let Some(p) = self.parent {
                        tokens[p].size += 1;
                    }
                }
                b'\t' | b'\r' | b'\n' | b' ' => {}
                b':' => self.parent = self.next.checked_sub(1),
                b',' => {
                    if let Some(p) = self.parent {
                        if !matches!(tokens[p].kind, TokenKind::Array | TokenKind::Object) {
                            self.parent = tokens[p].parent;
                        }
                    }
                }
                b'-' | b'0'..=b'9' | b't' | b'f' | b'n' => {
                    if let Some(p) = self.parent {
                        let t = &tokens[p];
                        // primitives cannot be keys, and a key takes one value
                        if t.kind == TokenKind::Object || (t.kind == TokenKind::String && t.size != 0) {
                            return Err(JsonError::Invalid);
                        }
                    }
                    self.primitive(src, tokens)?;
                    count += 1;
                    if let Some(p) = self.parent {
                        tokens[p].size += 1;
                    }
                }
                _ => return Err(JsonError::Invalid),
            }
            self.pos += 1;
        }

        if tokens[..self.next].iter().any(|t| t.end.is_none()) {
            return Err(JsonError::Partial);
        }
        Ok(count)
    }

    fn alloc(&mut self, tokens: &mut [Token]) -> Result<usize, JsonError> {
        if self.next >= tokens.len() {
            return Err(JsonError::NoMemory);
        }
        let index = self.next;
        self.next += 1;
        tokens[index] = Token::EMPTY;
        Ok(index)
    }

    fn close(&mut self, kind: TokenKind, tokens: &mut [Token]) -> Result<(), JsonError> {
        let Some(mut i) = self.next.checked_sub(1) else {
            return Err(JsonError::Invalid);
        };
        loop {
            let t = &mut tokens[i];
            if t.kind != TokenKind::Undefined && t.end.is_none() {
                if t.kind != kind {
                    return Err(JsonError::Invalid);
                }
                t.end = Some(self.pos + 1);
                self.parent = t.parent;
                return Ok(());
            }
            match t.parent {
                Some(p) => i = p,
                None => {
                    if t.kind != kind || self.parent.is_none() {
                        return Err(JsonError::Invalid);
                    }
                    return Ok(());
                }
            }
        }
    }

    fn primitive(&mut self, src: Source<'_>, tokens: &mut [Token]) -> Result<(), JsonError> {
        let start = self.pos;
        while self.pos < src.len() && src.at(self.pos) != 0 {
            match src.at(self.pos) {
                b'\t' | b'\r' | b'\n' | b' ' | b',' | b']' | b'}' => {
                    let index = self.alloc(tokens).inspect_err(|_| self.pos = start)?;
                    tokens[index] =
                        Token::new(TokenKind::Primitive, start, Some(self.pos), self.parent);
                    self.pos -= 1;
                    return Ok(());
                }
                c if !(32..127).contains(&c) => {
                    self.pos = start;
                    return Err(JsonError::Invalid);
                }
                _ => self.pos += 1,
            }
        }
        // strict mode: a primitive must be followed by a delimiter
        self.pos = start;
        Err(JsonError::Partial)
    }

    fn string(&mut self, src: Source<'_>, tokens: &mut [Token]) -> Result<(), JsonError> {
        let start = self.pos;
        self.pos += 1;
        while self.pos < src.len() && src.at(self.pos) != 0 {
            match src.at(self.pos) {
                b'"' => {
                    let index = self.alloc(tokens).inspect_err(|_| self.pos = start)?;
                    tokens[index] =
                        Token::new(TokenKind::String, start + 1, Some(self.pos), self.parent);
                    return Ok(());
                }
                b'\\' if self.pos + 1 < src.len() => {
                    self.pos += 1;
                    match src.at(self.pos) {
                        b'"' | b'/' | b'\\' | b'b' | b'f' | b'r' | b'n' | b't' => {}
                        b'u' => {
                            for _ in 0..4 {
                                self.pos += 1;
                                if self.pos >= src.len() || src.at(self.pos) == 0 {
                                    break;
                                }
                                if !src.at(self.pos).is_ascii_hexdigit() {
                                    self.pos = start;
                                    return Err(JsonError::Invalid);
                                }
                            }
                        }
                        _ => {
                            self.pos = start;
                            return Err(JsonError::Invalid);
                        }
                    }
                    self.pos += 1;
                }
                _ => self.pos += 1,
            }
        }
        self.pos = start;
        Err(JsonError::Partial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str, tokens: &mut [Token]) -> Result<usize, JsonError> {
        Tokenizer::new().parse(json.as_bytes(), tokens)
    }

    fn text<'a>(json: &'a str, t: &Token) -> &'a str {
        &json[t.start..t.end.unwrap()]
    }

    #[test]
    fn nested_document_links_parents() {
        let json = r#"{"state":{"reported":{"fw":"1.2","n":[1,2]}}}"#;
        let mut tokens = [Token::EMPTY; 16];
        assert_eq!(parse(json, &mut tokens), Ok(11));

        assert_eq!(tokens[0].kind, TokenKind::Object);
        assert_eq!(tokens[0].size, 1);
        assert_eq!(tokens[0].parent, None);

        // key "state" belongs to the root, its value belongs to the key
        assert_eq!(text(json, &tokens[1]), "state");
        assert_eq!(tokens[1].parent, Some(0));
        assert_eq!(tokens[2].parent, Some(1));

        assert_eq!(text(json, &tokens[5]), "fw");
        assert_eq!(text(json, &tokens[6]), "1.2");
        assert_eq!(tokens[6].kind, TokenKind::String);

        assert_eq!(tokens[8].kind, TokenKind::Array);
        assert_eq!(tokens[8].size, 2);
        assert_eq!(text(json, &tokens[9]), "1");
        assert_eq!(tokens[9].parent, Some(8));
    }

    #[test]
    fn primitives_and_escapes() {
        let json = r#"{"a":true,"b":null,"c":-12.5e3,"d":"x\"yé"}"#;
        let mut tokens = [Token::EMPTY; 16];
        assert_eq!(parse(json, &mut tokens), Ok(9));
        assert_eq!(tokens[2].kind, TokenKind::Primitive);
        assert_eq!(text(json, &tokens[2]), "true");
        assert_eq!(text(json, &tokens[6]), "-12.5e3");
        assert_eq!(text(json, &tokens[8]), r#"x\"yé"#);
    }

    #[test]
    fn token_capacity_is_enforced() {
        let mut tokens = [Token::EMPTY; 2];
        assert_eq!(parse(r#"{"a":1}"#, &mut tokens), Err(JsonError::NoMemory));
        assert_eq!(JsonError::NoMemory.code(), -1);
    }

    #[test]
    fn strict_mode_rejects_bad_structure() {
        let mut tokens = [Token::EMPTY; 8];
        assert_eq!(parse(r#"{"a":1]"#, &mut tokens), Err(JsonError::Invalid));
        assert_eq!(parse(r#"{1:2}"#, &mut tokens), Err(JsonError::Invalid));
        assert_eq!(parse(r#"{"a":1 2}"#, &mut tokens), Err(JsonError::Invalid));
        assert_eq!(parse(r#"{"a":"\q"}"#, &mut tokens), Err(JsonError::Invalid));
        assert_eq!(parse(r#"{"a":x}"#, &mut tokens), Err(JsonError::Invalid));
    }

    #[test]
    fn truncated_documents_are_partial() {
        let mut tokens = [Token::EMPTY; 8];
        assert_eq!(parse(r#"{"a":1"#, &mut tokens), Err(JsonError::Partial));
        assert_eq!(parse(r#"{"a":"open"#, &mut tokens), Err(JsonError::Partial));
        assert_eq!(parse(r#"{"a":[1,2]"#, &mut tokens), Err(JsonError::Partial));
    }

    #[test]
    fn tail_closes_a_cut_document() {
        let json = r#"{"a":1"#;
        let mut tokens = [Token::EMPTY; 4];
        let n = Tokenizer::new().parse_with_tail(json.as_bytes(), b'}', &mut tokens);
        assert_eq!(n, Ok(3));
        assert_eq!(tokens[0].end, Some(json.len() + 1));
        assert_eq!(text(json, &tokens[2]), "1");
    }

    #[test]
    fn parsing_stops_at_nul() {
        let mut tokens = [Token::EMPTY; 4];
        assert_eq!(
            Tokenizer::new().parse(b"{\"a\":1}\0garbage", &mut tokens),
            Ok(3)
        );
    }
}
