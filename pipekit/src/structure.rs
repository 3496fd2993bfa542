// SPDX-FileCopyrightText: 2025 2025 Contributors to the pipekit project.
// SPDX-License-Identifier: Apache-2.0

//! Named key/value records.
//!
//! A [`Structure`] has a name and an ordered list of uniquely keyed fields.
//! Fields keep their insertion order for serialization, while lookups,
//! equality and subset checks are by key.
//!
//! # Text form
//!
//! ```text
//! audio/x-raw, format=(string)F32LE, channels=(int)[ 1, 2 ], rate=(int)48000;
//! ```
//!
//! [`Structure::to_string`] always writes this form and
//! [`Structure::from_str`] reads it back, so that
//! `s.to_string().parse::<Structure>()` equals `s`.
//!
//! # Examples
//!
//! ```
//! use pipekit::Structure;
//!
//! # fn main() -> Result<(), pipekit::Error> {
//! let s = Structure::builder("test").field("message", "hello").build()?;
//! assert_eq!(s.to_string(), "test, message=(string)hello;");
//!
//! let parsed: Structure = s.to_string().parse()?;
//! assert_eq!(parsed, s);
//! # Ok(())
//! # }
//! ```

pub(crate) mod parse;
pub mod value;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::{Error, Result, structure::value::FromValue};
pub use value::{DoubleRange, Fraction, IntRange, Value};

/// Returns `true` if `name` is usable as a structure name or field key.
///
/// Names are non-empty, made of ASCII alphanumerics and `/`, `-`, `_`, `.`,
/// and do not start with a digit.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if !first.is_ascii_digit() && is_name_char(first) => chars.all(is_name_char),
        _ => false,
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '_' | '.')
}

fn check_name(name: &str) -> Result<()> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(Error::InvalidName(name.to_owned()))
    }
}

fn check_field_name(key: &str) -> Result<()> {
    if is_valid_name(key) {
        Ok(())
    } else {
        Err(Error::InvalidFieldName(key.to_owned()))
    }
}

/// A named, ordered set of typed fields.
#[derive(Debug, Clone)]
pub struct Structure {
    name: String,
    fields: Vec<(String, Value)>,
}

impl Structure {
    /// Creates a structure without fields.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidName`] if `name` violates the naming rule.
    pub fn new_empty(name: &str) -> Result<Self> {
        check_name(name)?;
        Ok(Self {
            name: name.to_owned(),
            fields: Vec::new(),
        })
    }

    /// Creates a structure from a name and `(key, value)` pairs.
    ///
    /// Later pairs replace earlier ones with the same key.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidName`] or [`Error::InvalidFieldName`].
    pub fn new<K, V>(name: &str, fields: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut structure = Self::new_empty(name)?;
        for (key, value) in fields {
            structure.set_value(key.as_ref(), value)?;
        }
        Ok(structure)
    }

    /// Builds a structure from names known to be valid at compile time.
    pub(crate) fn from_static(name: &'static str, fields: Vec<(&'static str, Value)>) -> Self {
        debug_assert!(is_valid_name(name));
        debug_assert!(fields.iter().all(|(k, _)| is_valid_name(k)));
        Self {
            name: name.to_owned(),
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v))
                .collect(),
        }
    }

    /// Starts building a structure. Validation happens in [`Builder::build`].
    pub fn builder(name: &str) -> Builder {
        Builder {
            name: name.to_owned(),
            fields: Vec::new(),
        }
    }

    /// Returns the structure name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the structure. Fields are untouched.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidName`] if `name` violates the naming rule; the old
    /// name is kept.
    pub fn set_name(&mut self, name: &str) -> Result<()> {
        check_name(name)?;
        self.name = name.to_owned();
        Ok(())
    }

    /// Returns `true` if the structure is called `name`.
    pub fn has_name(&self, name: &str) -> bool {
        self.name == name
    }

    /// Returns the value stored under `key`.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Returns a mutable reference to the value stored under `key`.
    pub fn value_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.fields
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Returns the value under `key` converted to `T`.
    ///
    /// # Errors
    ///
    /// - [`Error::FieldNotFound`] if there is no such field
    /// - [`Error::TypeMismatch`] if the field holds another type
    ///
    /// # Examples
    ///
    /// ```
    /// # use pipekit::Structure;
    /// let s = Structure::builder("test_message").field("msg_id", 4).build().unwrap();
    /// assert_eq!(s.get::<i32>("msg_id").unwrap(), 4);
    /// assert!(s.get::<String>("msg_id").is_err());
    /// ```
    pub fn get<T: FromValue>(&self, key: &str) -> Result<T> {
        let value = self
            .value(key)
            .ok_or_else(|| Error::FieldNotFound(key.to_owned()))?;
        T::from_value(value).ok_or_else(|| Error::TypeMismatch {
            field: key.to_owned(),
            expected: T::TYPE_NAME,
            actual: value.type_name(),
        })
    }

    /// Borrows a string field without copying it.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.value(key)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Sets `key` to `value`, replacing an existing field in place or
    /// appending a new one.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidFieldName`] if `key` violates the naming rule.
    pub fn set_value(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        check_field_name(key)?;
        let value = value.into();
        match self.value_mut(key) {
            Some(slot) => *slot = value,
            None => self.fields.push((key.to_owned(), value)),
        }
        Ok(())
    }

    /// Removes `key` if present and returns its value.
    pub fn remove_field(&mut self, key: &str) -> Option<Value> {
        let index = self.fields.iter().position(|(k, _)| k == key)?;
        Some(self.fields.remove(index).1)
    }

    /// Removes every field, keeping the name.
    pub fn remove_all_fields(&mut self) {
        self.fields.clear();
    }

    /// Returns `true` if a field called `key` exists.
    pub fn has_field(&self, key: &str) -> bool {
        self.value(key).is_some()
    }

    /// Returns `true` if `key` exists and its type name is `type_name`.
    pub fn has_field_with_type(&self, key: &str, type_name: &str) -> bool {
        self.value(key).is_some_and(|v| v.type_name() == type_name)
    }

    /// Number of fields.
    pub fn n_fields(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the structure has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the key of the field at `index` in insertion order.
    pub fn nth_field_name(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(|(k, _)| k.as_str())
    }

    /// Iterates over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns `true` if `self` has the same name as `superset` and, for
    /// every field of `superset`, holds that field with a value contained in
    /// the superset's value.
    ///
    /// The relation is asymmetric: `channels=(int)1` is a subset of
    /// `channels=(int)[ 1, 2 ]`, not the other way around.
    pub fn is_subset(&self, superset: &Structure) -> bool {
        self.name == superset.name
            && superset.iter().all(|(key, sup)| {
                self.value(key)
                    .is_some_and(|sub| sub.is_subset(sup))
            })
    }
}

impl PartialEq for Structure {
    /// Names must match and both sides must hold the same set of fields;
    /// field order is irrelevant.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.fields.len() == other.fields.len()
            && self
                .iter()
                .all(|(key, value)| other.value(key) == Some(value))
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.body_text())?;
        f.write_str(";")
    }
}

impl Structure {
    /// The text form without the terminating `;`, as used inside caps.
    pub(crate) fn body_text(&self) -> String {
        let mut out = self.name.clone();
        for (key, value) in &self.fields {
            out.push_str(", ");
            out.push_str(key);
            out.push('=');
            value.write_tagged(&mut out);
        }
        out
    }
}

impl FromStr for Structure {
    type Err = Error;

    /// Parses the text form. The trailing `;` is optional.
    fn from_str(s: &str) -> Result<Self> {
        let mut parser = parse::Parser::new(s);
        let structure = parser.structure()?;
        parser.eat(';');
        parser.expect_end()?;
        Ok(structure)
    }
}

impl Serialize for Structure {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Structure {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

/// Builder returned by [`Structure::builder`].
#[must_use]
pub struct Builder {
    name: String,
    fields: Vec<(String, Value)>,
}

impl Builder {
    /// Adds a field. A repeated key replaces the earlier value.
    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.push((key.to_owned(), value.into()));
        self
    }

    /// Validates the name and keys and creates the structure.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidName`] or [`Error::InvalidFieldName`].
    pub fn build(self) -> Result<Structure> {
        Structure::new(&self.name, self.fields)
    }
}
