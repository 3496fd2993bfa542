// SPDX-FileCopyrightText: 2025 2025 Contributors to the pipekit project.
// SPDX-License-Identifier: Apache-2.0

//! Parser for the structure text form.
//!
//! ```text
//! structure := name ( "," key "=" value )* [";"]
//! value     := [ "(" tag ")" ] ( token | quoted | range | list | array )
//! range     := "[" token "," token [ "," token ] "]"
//! list      := "{" [ value ( "," value )* ] "}"
//! array     := "<" [ value ( "," value )* ">"
//! ```
//!
//! Items of a list or array inherit the outer tag unless they carry their own.
//! Untagged scalars are inferred as int, double, fraction, boolean and finally
//! string.

use crate::{
    Error, Result,
    structure::{
        Structure, is_valid_name,
        value::{DoubleRange, Fraction, IntRange, Value, is_simple_char},
    },
};

/// Scalar kinds a type tag can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Int,
    Int64,
    UInt,
    Double,
    Boolean,
    String,
    Fraction,
}

impl Tag {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "int" | "i" | "gint" => Tag::Int,
            "gint64" | "int64" => Tag::Int64,
            "uint" | "u" | "guint" => Tag::UInt,
            "double" | "d" | "gdouble" | "float" | "f" => Tag::Double,
            "boolean" | "bool" | "b" | "gboolean" => Tag::Boolean,
            "string" | "str" | "s" | "gchararray" => Tag::String,
            "fraction" | "GstFraction" => Tag::Fraction,
            _ => return None,
        })
    }
}

/// A scalar token as it appeared in the input.
struct Token {
    text: String,
    quoted: bool,
}

pub(crate) struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn error(&self, reason: impl std::fmt::Display) -> Error {
        Error::parse(self.input, format!("{reason} at offset {}", self.pos))
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    pub(crate) fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Consumes `c` (after optional whitespace) if it is next.
    pub(crate) fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<()> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(format_args!("expected '{c}'")))
        }
    }

    pub(crate) fn at_end(&mut self) -> bool {
        self.skip_ws();
        self.pos == self.input.len()
    }

    /// Returns the unparsed remainder, used by callers that look for keywords.
    pub(crate) fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    pub(crate) fn expect_end(&mut self) -> Result<()> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.error("trailing characters"))
        }
    }

    fn simple_token(&mut self) -> String {
        self.skip_ws();
        let start = self.pos;
        while self.peek().is_some_and(is_simple_char) {
            self.bump();
        }
        self.input[start..self.pos].to_owned()
    }

    /// Parses one structure, stopping before a `;` or the end of input.
    pub(crate) fn structure(&mut self) -> Result<Structure> {
        let name = self.simple_token();
        if !is_valid_name(&name) {
            return Err(Error::InvalidName(name));
        }
        let mut structure = Structure::new_empty(&name)?;
        while self.eat(',') {
            let key = self.simple_token();
            if !is_valid_name(&key) {
                return Err(Error::InvalidFieldName(key));
            }
            self.expect('=')?;
            let value = self.value(None)?;
            structure.set_value(&key, value)?;
        }
        self.skip_ws();
        match self.peek() {
            None | Some(';') => Ok(structure),
            Some(c) => Err(self.error(format_args!("unexpected '{c}'"))),
        }
    }

    fn tag(&mut self) -> Result<Option<Tag>> {
        if !self.eat('(') {
            return Ok(None);
        }
        let name = self.simple_token();
        let tag = Tag::from_name(&name)
            .ok_or_else(|| self.error(format_args!("unknown type '{name}'")))?;
        self.expect(')')?;
        Ok(Some(tag))
    }

    fn value(&mut self, inherited: Option<Tag>) -> Result<Value> {
        let tag = self.tag()?.or(inherited);
        self.skip_ws();
        match self.peek() {
            Some('[') => {
                self.bump();
                self.range(tag)
            }
            Some('{') => {
                self.bump();
                Ok(Value::List(self.items(tag, '}')?))
            }
            Some('<') => {
                self.bump();
                Ok(Value::Array(self.items(tag, '>')?))
            }
            _ => {
                let token = self.token()?;
                self.scalar(tag, token)
            }
        }
    }

    fn items(&mut self, tag: Option<Tag>, close: char) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(self.value(tag)?);
            if self.eat(close) {
                return Ok(items);
            }
            self.expect(',')?;
        }
    }

    fn range(&mut self, tag: Option<Tag>) -> Result<Value> {
        let mut bounds = vec![self.token()?];
        while self.eat(',') {
            bounds.push(self.token()?);
        }
        self.expect(']')?;
        if bounds.len() < 2 || bounds.len() > 3 {
            return Err(self.error("a range takes two or three members"));
        }

        let all_ints = bounds.iter().all(|b| b.text.parse::<i32>().is_ok());
        let tag = tag.unwrap_or(if all_ints { Tag::Int } else { Tag::Double });
        match tag {
            Tag::Int => {
                let mut ints = Vec::with_capacity(bounds.len());
                for bound in &bounds {
                    ints.push(self.int(&bound.text)?);
                }
                let step = ints.get(2).copied().unwrap_or(1);
                if ints[0] > ints[1] || step < 1 {
                    return Err(self.error("invalid int range"));
                }
                Ok(Value::IntRange(IntRange::with_step(ints[0], ints[1], step)))
            }
            Tag::Double if bounds.len() == 2 => {
                let min = self.double(&bounds[0].text)?;
                let max = self.double(&bounds[1].text)?;
                if min > max {
                    return Err(self.error("invalid double range"));
                }
                Ok(Value::DoubleRange(DoubleRange::new(min, max)))
            }
            other => Err(self.error(format_args!("no range of {other:?}"))),
        }
    }

    fn token(&mut self) -> Result<Token> {
        self.skip_ws();
        if self.peek() == Some('"') {
            self.bump();
            return Ok(Token {
                text: self.quoted()?,
                quoted: true,
            });
        }
        let text = self.simple_token();
        if text.is_empty() {
            return Err(self.error("expected a value"));
        }
        Ok(Token {
            text,
            quoted: false,
        })
    }

    /// Reads the body of a quoted string; the opening quote is consumed.
    fn quoted(&mut self) -> Result<String> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some(d @ '0'..='7') => {
                        let mut code = d.to_digit(8).unwrap_or(0);
                        for _ in 0..2 {
                            match self.peek().and_then(|c| c.to_digit(8)) {
                                Some(digit) => {
                                    code = code * 8 + digit;
                                    self.bump();
                                }
                                None => break,
                            }
                        }
                        let c = char::from_u32(code)
                            .ok_or_else(|| self.error("invalid octal escape"))?;
                        out.push(c);
                    }
                    Some(c) => out.push(c),
                    None => return Err(self.error("unterminated escape")),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn scalar(&self, tag: Option<Tag>, token: Token) -> Result<Value> {
        let Some(tag) = tag else {
            return Ok(infer(token));
        };
        let text = token.text.as_str();
        Ok(match tag {
            Tag::Int => Value::Int(self.int(text)?),
            Tag::Int64 => Value::Int64(
                text.parse()
                    .map_err(|_| self.error(format_args!("'{text}' is not a gint64")))?,
            ),
            Tag::UInt => Value::UInt(
                text.parse()
                    .map_err(|_| self.error(format_args!("'{text}' is not a uint")))?,
            ),
            Tag::Double => Value::Double(self.double(text)?),
            Tag::Boolean => Value::Boolean(
                parse_bool(text)
                    .ok_or_else(|| self.error(format_args!("'{text}' is not a boolean")))?,
            ),
            Tag::String => Value::String(token.text),
            Tag::Fraction => Value::Fraction(
                parse_fraction(text)
                    .ok_or_else(|| self.error(format_args!("'{text}' is not a fraction")))?,
            ),
        })
    }

    fn int(&self, text: &str) -> Result<i32> {
        text.parse()
            .map_err(|_| self.error(format_args!("'{text}' is not an int")))
    }

    fn double(&self, text: &str) -> Result<f64> {
        text.parse()
            .map_err(|_| self.error(format_args!("'{text}' is not a double")))
    }
}

fn infer(token: Token) -> Value {
    if token.quoted {
        return Value::String(token.text);
    }
    let text = token.text.as_str();
    if let Ok(v) = text.parse::<i32>() {
        return Value::Int(v);
    }
    if let Ok(v) = text.parse::<f64>() {
        return Value::Double(v);
    }
    if text.contains('/') {
        if let Some(f) = parse_fraction(text) {
            return Value::Fraction(f);
        }
    }
    match text {
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        _ => Value::String(token.text),
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "yes" | "t" | "1" => Some(true),
        "false" | "no" | "f" | "0" => Some(false),
        _ => None,
    }
}

fn parse_fraction(text: &str) -> Option<Fraction> {
    let (numer, denom) = match text.split_once('/') {
        Some((n, d)) => (n.parse().ok()?, d.parse().ok()?),
        None => (text.parse().ok()?, 1),
    };
    Fraction::new(numer, denom).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(text: &str) -> Result<Structure> {
        let mut parser = Parser::new(text);
        let s = parser.structure()?;
        parser.eat(';');
        parser.expect_end()?;
        Ok(s)
    }

    #[test]
    fn typed_fields() {
        let s = parse_one("test/test, channels=(int)2, rate=(double)44100.5, live=(boolean)true")
            .unwrap();
        assert_eq!(s.value("channels"), Some(&Value::Int(2)));
        assert_eq!(s.value("rate"), Some(&Value::Double(44100.5)));
        assert_eq!(s.value("live"), Some(&Value::Boolean(true)));
    }

    #[test]
    fn untyped_values_are_inferred() {
        let s = parse_one("caps, a=1, b=2.5, c=30/1, d=false, e=RGB, f=\"1\"").unwrap();
        assert_eq!(s.value("a"), Some(&Value::Int(1)));
        assert_eq!(s.value("b"), Some(&Value::Double(2.5)));
        assert_eq!(s.value("c"), Some(&Value::Fraction(Fraction::new(30, 1).unwrap())));
        assert_eq!(s.value("d"), Some(&Value::Boolean(false)));
        assert_eq!(s.value("e"), Some(&Value::from("RGB")));
        assert_eq!(s.value("f"), Some(&Value::from("1")));
    }

    #[test]
    fn ranges_lists_and_arrays() {
        let s = parse_one(
            "audio/x-raw, channels=(int)[ 1, 2 ], rate=[ 8000, 96000, 8000 ], \
             gain=(double)[0, 1.5], format=(string){ S16LE, F32LE }, order=< (int)1, (string)x >",
        )
        .unwrap();
        assert_eq!(s.value("channels"), Some(&Value::IntRange(IntRange::new(1, 2))));
        assert_eq!(
            s.value("rate"),
            Some(&Value::IntRange(IntRange::with_step(8000, 96000, 8000)))
        );
        assert_eq!(s.value("gain"), Some(&Value::DoubleRange(DoubleRange::new(0.0, 1.5))));
        assert_eq!(
            s.value("format"),
            Some(&Value::List(vec!["S16LE".into(), "F32LE".into()]))
        );
        assert_eq!(
            s.value("order"),
            Some(&Value::Array(vec![Value::Int(1), "x".into()]))
        );
    }

    #[test]
    fn quoted_strings_unescape() {
        let s = parse_one(r#"t, msg=(string)"a \"quoted\" \\ word\011tab""#).unwrap();
        assert_eq!(s.get_str("msg"), Some("a \"quoted\" \\ word\ttab"));
    }

    #[test]
    fn malformed_inputs_fail() {
        for bad in [
            "",
            "1abc",
            "test, =1",
            "test, a=(nosuchtype)1",
            "test, a=(int)x",
            "test, a=(int)[ 3, 1 ]",
            "test, a=\"open",
            "test, a={ 1, 2",
            "test, a=1 b=2",
            "test; trailing",
        ] {
            assert!(parse_one(bad).is_err(), "{bad:?} should not parse");
        }
    }
}
