//! Restricted literal parser for tool arguments.
//!
//! Models write arguments the way they would write a Python dict:
//! single or double quotes, `True`/`None`, trailing commas, tuples.
//! This module accepts exactly that literal subset and produces a
//! [`serde_json::Value`]. Names, calls and operators are rejected, so
//! nothing the model writes is ever evaluated.

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Deepest container nesting accepted before giving up.
const MAX_DEPTH: usize = 64;

/// A literal that could not be parsed, with the byte offset of the problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at byte {position}")]
pub struct LiteralError {
    pub position: usize,
    pub message: String,
}

/// Parse any literal value.
pub fn parse_literal(source: &str) -> Result<Value, LiteralError> {
    let mut parser = LiteralParser::new(source);
    let value = parser.value(0)?;
    parser.skip_ws();
    if parser.pos < source.len() {
        return Err(parser.error("unexpected trailing characters"));
    }
    Ok(value)
}

/// Parse a literal that must be a mapping, as tool arguments are.
pub fn parse_mapping(source: &str) -> Result<Map<String, Value>, LiteralError> {
    match parse_literal(source)? {
        Value::Object(map) => Ok(map),
        other => Err(LiteralError {
            position: 0,
            message: format!("expected a mapping, found {}", kind_name(&other)),
        }),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "None",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

struct LiteralParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> LiteralParser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError {
            position: self.pos,
            message: message.into(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.pos += c.len_utf8();
                }
                // Python comments run to end of line.
                Some('#') => {
                    let line_end = self.rest().find('\n').unwrap_or(self.rest().len());
                    self.pos += line_end;
                }
                _ => return,
            }
        }
    }

    fn expect(&mut self, want: char) -> Result<(), LiteralError> {
        self.skip_ws();
        match self.peek() {
            Some(c) if c == want => {
                self.pos += c.len_utf8();
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{want}', found '{c}'"))),
            None => Err(self.error(format!("expected '{want}', found end of input"))),
        }
    }

    fn value(&mut self, depth: usize) -> Result<Value, LiteralError> {
        if depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }

        self.skip_ws();
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some('{') => self.mapping(depth),
            Some('[') => self.sequence(']', depth).map(Value::Array),
            Some('(') => self.tuple(depth),
            Some('\'' | '"') => self.strings(),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.keyword(),
            Some(c) => Err(self.error(format!("unexpected character '{c}'"))),
        }
    }

    fn mapping(&mut self, depth: usize) -> Result<Value, LiteralError> {
        self.expect('{')?;
        let mut map = Map::new();

        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.bump();
                return Ok(Value::Object(map));
            }

            let key_pos = self.pos;
            let key = match self.value(depth + 1)? {
                Value::String(s) => s,
                other => {
                    return Err(LiteralError {
                        position: key_pos,
                        message: format!("mapping keys must be strings, found {}", kind_name(&other)),
                    });
                }
            };
            self.expect(':')?;
            let value = self.value(depth + 1)?;
            // Later duplicates win.
            map.insert(key, value);

            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(Value::Object(map)),
                Some(c) => {
                    self.pos -= c.len_utf8();
                    return Err(self.error(format!("expected ',' or '}}', found '{c}'")));
                }
                None => return Err(self.error("unterminated mapping")),
            }
        }
    }

    /// Comma-separated values up to `close`, trailing comma allowed.
    fn sequence(&mut self, close: char, depth: usize) -> Result<Vec<Value>, LiteralError> {
        // Opening bracket
        self.bump();
        self.sequence_rest(close, depth, Vec::new())
    }

    /// Continue a sequence after its opening bracket or a separating comma.
    fn sequence_rest(
        &mut self,
        close: char,
        depth: usize,
        mut items: Vec<Value>,
    ) -> Result<Vec<Value>, LiteralError> {
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.bump();
                return Ok(items);
            }

            items.push(self.value(depth + 1)?);

            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(c) if c == close => return Ok(items),
                Some(c) => {
                    self.pos -= c.len_utf8();
                    return Err(self.error(format!("expected ',' or '{close}', found '{c}'")));
                }
                None => return Err(self.error(format!("unterminated sequence, missing '{close}'"))),
            }
        }
    }

    /// `()` and `(a, b)` are tuples, `(a)` is just a parenthesized value.
    fn tuple(&mut self, depth: usize) -> Result<Value, LiteralError> {
        self.bump();
        self.skip_ws();
        if self.peek() == Some(')') {
            self.bump();
            return Ok(Value::Array(Vec::new()));
        }

        let first = self.value(depth + 1)?;
        self.skip_ws();
        match self.peek() {
            Some(')') => {
                self.bump();
                Ok(first)
            }
            Some(',') => {
                self.bump();
                self.sequence_rest(')', depth, vec![first]).map(Value::Array)
            }
            Some(c) => Err(self.error(format!("expected ',' or ')', found '{c}'"))),
            None => Err(self.error("unterminated tuple, missing ')'")),
        }
    }

    /// One or more adjacent string literals, concatenated.
    fn strings(&mut self) -> Result<Value, LiteralError> {
        let mut out = self.string()?;
        loop {
            let before = self.pos;
            self.skip_ws();
            if matches!(self.peek(), Some('\'' | '"')) {
                out.push_str(&self.string()?);
            } else {
                self.pos = before;
                return Ok(Value::String(out));
            }
        }
    }

    fn string(&mut self) -> Result<String, LiteralError> {
        let start = self.pos;
        let Some(quote) = self.bump() else {
            return Err(self.error("expected a string"));
        };

        let mut out = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(LiteralError {
                    position: start,
                    message: "unterminated string".into(),
                });
            };
            match c {
                c if c == quote => return Ok(out),
                '\n' => {
                    return Err(LiteralError {
                        position: start,
                        message: "newline inside string literal".into(),
                    });
                }
                '\\' => self.escape(&mut out)?,
                c => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<(), LiteralError> {
        let Some(c) = self.bump() else {
            return Err(self.error("unterminated escape sequence"));
        };
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            // Line continuation
            '\n' => {}
            'x' => out.push(self.hex_escape(2)?),
            'u' => out.push(self.hex_escape(4)?),
            // Unknown escapes keep their backslash, as Python does.
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn hex_escape(&mut self, digits: usize) -> Result<char, LiteralError> {
        let rest = self.rest();
        let hex = rest.get(..digits).filter(|h| h.chars().all(|c| c.is_ascii_hexdigit()));
        let Some(hex) = hex else {
            return Err(self.error(format!("expected {digits} hex digits")));
        };
        let code = u32::from_str_radix(hex, 16).map_err(|e| self.error(e.to_string()))?;
        let c = char::from_u32(code).ok_or_else(|| self.error("invalid unicode escape"))?;
        self.pos += digits;
        Ok(c)
    }

    fn number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        let mut literal = String::new();
        let mut is_float = false;

        if let Some(sign @ ('-' | '+')) = self.peek() {
            self.bump();
            if sign == '-' {
                literal.push('-');
            }
            self.skip_ws();
        }

        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => literal.push(c),
                '_' => {}
                '.' => {
                    is_float = true;
                    literal.push(c);
                }
                'e' | 'E' => {
                    is_float = true;
                    literal.push(c);
                    self.bump();
                    if let Some(sign @ ('-' | '+')) = self.peek() {
                        literal.push(sign);
                    } else {
                        continue;
                    }
                }
                _ => break,
            }
            self.bump();
        }

        let invalid = || LiteralError {
            position: start,
            message: format!("invalid number '{}'", &self.src[start..self.pos]),
        };

        if !literal.chars().any(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        if is_float {
            let f: f64 = literal.parse().map_err(|_| invalid())?;
            return Number::from_f64(f).map(Value::Number).ok_or_else(invalid);
        }

        if let Ok(i) = literal.parse::<i64>() {
            return Ok(Value::from(i));
        }
        literal.parse::<u64>().map(Value::from).map_err(|_| LiteralError {
            position: start,
            message: format!("integer '{literal}' out of range"),
        })
    }

    fn keyword(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        let len = self
            .rest()
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(self.rest().len());
        let word = &self.src[start..start + len];
        self.pos += len;

        match word {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" | "null" => Ok(Value::Null),
            _ => Err(LiteralError {
                position: start,
                message: format!("unexpected name '{word}'"),
            }),
        }
    }
}
