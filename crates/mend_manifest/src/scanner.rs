//! Byte-level scanner for the property-list grammar used inside sections.
//!
//! The scanner never interprets record semantics. It matches words, quoted
//! strings, comments, `{ key = value; }` dictionaries and `( item, )` lists,
//! and reports the byte range of everything it matched.

use crate::error::{ParseError, ParseErrorKind};
use mend_source::TextRange;

/// A scalar token: a bare word or the unescaped content of a quoted string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Scalar {
    pub text: String,
    pub range: TextRange,
}

/// A parsed field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Value {
    Scalar(Scalar),
    Dict,
    List(List),
}

/// One `key = value;` pair of a dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Field {
    pub key: String,
    pub value: Value,
}

/// One list item with its annotation and trailing comma.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ListItem {
    /// `None` for nested dictionaries or lists.
    pub value: Option<String>,
    pub comment: Option<String>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct List {
    pub items: Vec<ListItem>,
    /// Offset of the closing `)`.
    pub close: usize,
}

/// A complete `id /* note */ = { ... };` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Record {
    pub id: String,
    pub comment: Option<String>,
    pub fields: Vec<Field>,
    pub range: TextRange,
}

impl Record {
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|f| f.key == key).map(|f| &f.value)
    }

    pub fn scalar(&self, key: &str) -> Option<&str> {
        match self.field(key) {
            Some(Value::Scalar(s)) => Some(&s.text),
            _ => None,
        }
    }
}

/// What a run of whitespace and comments contained.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Trivia<'a> {
    /// Trimmed text of the last block comment.
    pub comment: Option<&'a str>,
    /// End of the last comment, or the start of the run if it had none.
    pub content_end: usize,
}

pub(crate) struct Scanner<'a> {
    text: &'a str,
    source: &'a [u8],
    pos: usize,
    limit: usize,
}

impl<'a> Scanner<'a> {
    /// A scanner over `text[start..limit]`.
    pub fn new(text: &'a str, start: usize, limit: usize) -> Self {
        Self {
            text,
            source: text.as_bytes(),
            pos: start,
            limit: limit.min(text.len()),
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.limit
    }

    fn peek(&self) -> u8 {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> u8 {
        let idx = self.pos + offset;
        if idx < self.limit {
            self.source[idx]
        } else {
            0
        }
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(kind, self.pos)
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        if self.at_end() {
            return self.error(ParseErrorKind::UnexpectedEnd { expected });
        }
        let found = self.text[self.pos..].chars().next().unwrap_or('\0');
        self.error(ParseErrorKind::Unexpected { expected, found })
    }

    fn expect(&mut self, byte: u8, expected: &'static str) -> Result<(), ParseError> {
        if self.peek() == byte && !self.at_end() {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// Skips whitespace, `/* */` comments and `//` line comments.
    pub fn trivia(&mut self) -> Result<Trivia<'a>, ParseError> {
        let mut trivia = Trivia {
            comment: None,
            content_end: self.pos,
        };
        loop {
            while !self.at_end() && self.source[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }
            if self.peek() == b'/' && self.peek_at(1) == b'*' {
                let start = self.pos;
                let body = start + 2;
                let Some(close) = self.text[body..self.limit].find("*/") else {
                    return Err(ParseError::new(ParseErrorKind::UnterminatedComment, start));
                };
                self.pos = body + close + 2;
                trivia.comment = Some(self.text[body..body + close].trim());
                trivia.content_end = self.pos;
                continue;
            }
            if self.peek() == b'/' && self.peek_at(1) == b'/' {
                while !self.at_end() && self.source[self.pos] != b'\n' {
                    self.pos += 1;
                }
                trivia.content_end = self.pos;
                continue;
            }
            return Ok(trivia);
        }
    }

    fn is_word_byte(&self, idx: usize) -> bool {
        let b = self.source[idx];
        if b.is_ascii_whitespace() || b"{}();,=\"".contains(&b) {
            return false;
        }
        if b == b'/' && idx + 1 < self.limit {
            let next = self.source[idx + 1];
            return next != b'*' && next != b'/';
        }
        true
    }

    /// A bare word or a quoted string.
    pub fn scalar(&mut self, expected: &'static str) -> Result<Scalar, ParseError> {
        let start = self.pos;
        if self.peek() == b'"' && !self.at_end() {
            return self.quoted();
        }
        while !self.at_end() && self.is_word_byte(self.pos) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.unexpected(expected));
        }
        Ok(Scalar {
            text: self.text[start..self.pos].to_string(),
            range: TextRange::new(start, self.pos),
        })
    }

    fn quoted(&mut self) -> Result<Scalar, ParseError> {
        let start = self.pos;
        self.pos += 1;
        let mut text = String::new();
        let mut run = self.pos;
        loop {
            if self.at_end() {
                return Err(ParseError::new(ParseErrorKind::UnterminatedString, start));
            }
            match self.source[self.pos] {
                b'"' => {
                    text.push_str(&self.text[run..self.pos]);
                    self.pos += 1;
                    return Ok(Scalar {
                        text,
                        range: TextRange::new(start, self.pos),
                    });
                }
                b'\\' => {
                    text.push_str(&self.text[run..self.pos]);
                    self.pos += 1;
                    if self.at_end() {
                        return Err(ParseError::new(ParseErrorKind::UnterminatedString, start));
                    }
                    match self.source[self.pos] {
                        b'n' => text.push('\n'),
                        b't' => text.push('\t'),
                        b'"' => text.push('"'),
                        b'\\' => text.push('\\'),
                        // Unknown escapes keep the backslash; step back so the
                        // escaped character is copied with the next run.
                        _ => {
                            text.push('\\');
                            run = self.pos;
                            continue;
                        }
                    }
                    self.pos += 1;
                    run = self.pos;
                }
                _ => self.pos += 1,
            }
        }
    }

    /// `id /* note */ = { ... };`
    pub fn record(&mut self) -> Result<Record, ParseError> {
        let start = self.pos;
        self.record_inner(start).map_err(|e| e.in_record(start))
    }

    fn record_inner(&mut self, start: usize) -> Result<Record, ParseError> {
        let id = self.scalar("record id")?.text;
        let comment = self.trivia()?.comment.map(str::to_string);
        self.expect(b'=', "'='")?;
        self.trivia()?;
        self.expect(b'{', "'{'")?;
        let fields = self.dict_body()?;
        self.trivia()?;
        self.expect(b';', "';'")?;
        Ok(Record {
            id,
            comment,
            fields,
            range: TextRange::new(start, self.pos),
        })
    }

    /// Fields up to and including the closing `}`.
    fn dict_body(&mut self) -> Result<Vec<Field>, ParseError> {
        let mut fields = Vec::new();
        loop {
            self.trivia()?;
            if self.at_end() {
                return Err(self.unexpected("'}'"));
            }
            if self.peek() == b'}' {
                self.pos += 1;
                return Ok(fields);
            }
            let key = self.scalar("field name or '}'")?.text;
            self.trivia()?;
            self.expect(b'=', "'='")?;
            self.trivia()?;
            let value = self.value()?;
            self.trivia()?;
            self.expect(b';', "';'")?;
            fields.push(Field { key, value });
        }
    }

    fn value(&mut self) -> Result<Value, ParseError> {
        if self.at_end() {
            return Err(self.unexpected("value"));
        }
        match self.peek() {
            b'{' => {
                self.pos += 1;
                self.dict_body()?;
                Ok(Value::Dict)
            }
            b'(' => {
                self.pos += 1;
                Ok(Value::List(self.list_body()?))
            }
            _ => Ok(Value::Scalar(self.scalar("value")?)),
        }
    }

    /// Items up to and including the closing `)`.
    fn list_body(&mut self) -> Result<List, ParseError> {
        let mut items = Vec::new();
        loop {
            self.trivia()?;
            if self.at_end() {
                return Err(self.unexpected("')'"));
            }
            if self.peek() == b')' {
                let close = self.pos;
                self.pos += 1;
                return Ok(List { items, close });
            }
            let start = self.pos;
            let value = match self.value()? {
                Value::Scalar(s) => Some(s.text),
                Value::Dict | Value::List(_) => None,
            };
            let value_end = self.pos;
            let trivia = self.trivia()?;
            let comment = trivia.comment.map(str::to_string);
            let end = if self.peek() == b',' && !self.at_end() {
                self.pos += 1;
                self.pos
            } else if self.peek() == b')' && !self.at_end() {
                trivia.content_end.max(value_end)
            } else {
                return Err(self.unexpected("',' or ')'"));
            };
            items.push(ListItem {
                value,
                comment,
                range: TextRange::new(start, end),
            });
        }
    }
}
