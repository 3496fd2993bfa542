// SPDX-FileCopyrightText: 2025 2025 Contributors to the pipekit project.
// SPDX-License-Identifier: Apache-2.0

//! Media format descriptions.
//!
//! [`Caps`] is either ANY, matching every format, or an ordered list of
//! [`Structure`]s, each describing one acceptable format. A list with no
//! structures is EMPTY and matches nothing.
//!
//! The text form is `ANY`, `EMPTY`, or the structures joined with `; `:
//!
//! ```
//! use pipekit::Caps;
//!
//! let caps: Caps = "audio/x-raw, rate=(int)48000; audio/x-raw, rate=(int)44100".parse().unwrap();
//! assert_eq!(caps.size(), 2);
//! assert_eq!(caps.structure(1).unwrap().get::<i32>("rate").unwrap(), 44100);
//! assert_eq!(caps.to_string(), "audio/x-raw, rate=(int)48000; audio/x-raw, rate=(int)44100");
//! ```

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use tracing::debug;

use crate::{Error, Result, Structure, Value, structure::parse::Parser};

bitflags::bitflags! {
    /// Flags reported by [`Caps::flags`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CapsFlags: u32 {
        /// Set on ANY caps only.
        const ANY = 1 << 0;
    }
}

/// A set of media formats: ANY, EMPTY, or a list of structures.
#[derive(Debug, Clone, PartialEq)]
pub struct Caps {
    any: bool,
    structures: Vec<Structure>,
}

impl Caps {
    /// Caps with no structures, matching nothing.
    pub fn new_empty() -> Self {
        Self {
            any: false,
            structures: Vec::new(),
        }
    }

    /// Caps matching every format.
    pub fn new_any() -> Self {
        Self {
            any: true,
            structures: Vec::new(),
        }
    }

    /// Caps holding a single field-less structure named `media_type`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidName`] if `media_type` is not a valid structure name.
    pub fn new_empty_simple(media_type: &str) -> Result<Self> {
        let mut caps = Self::new_empty();
        caps.append_structure(Structure::new_empty(media_type)?);
        Ok(caps)
    }

    /// Starts building single-structure caps.
    pub fn builder(media_type: &str) -> Builder {
        Builder {
            structure: Structure::builder(media_type),
        }
    }

    /// Number of structures; 0 for both ANY and EMPTY caps.
    pub fn size(&self) -> usize {
        self.structures.len()
    }

    /// Returns the structure at `index`, or `None` if out of range.
    pub fn structure(&self, index: usize) -> Option<&Structure> {
        self.structures.get(index)
    }

    /// Mutable access to the structure at `index`.
    pub fn structure_mut(&mut self, index: usize) -> Option<&mut Structure> {
        self.structures.get_mut(index)
    }

    /// Appends a structure. ANY caps already match everything and are left
    /// unchanged.
    pub fn append_structure(&mut self, structure: Structure) {
        if self.any {
            debug!("Not appending {structure} to ANY caps");
            return;
        }
        self.structures.push(structure);
    }

    /// `true` for caps created with [`Caps::new_any`] or parsed from `ANY`.
    pub fn is_any(&self) -> bool {
        self.any
    }

    /// `true` for caps that are not ANY and hold no structure.
    pub fn is_empty(&self) -> bool {
        !self.any && self.structures.is_empty()
    }

    /// Returns [`CapsFlags::ANY`] for ANY caps and no flags otherwise.
    pub fn flags(&self) -> CapsFlags {
        if self.any {
            CapsFlags::ANY
        } else {
            CapsFlags::empty()
        }
    }

    /// Iterates over the structures in order.
    pub fn iter(&self) -> impl Iterator<Item = &Structure> {
        self.structures.iter()
    }
}

impl fmt::Display for Caps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.any {
            return f.write_str("ANY");
        }
        if self.structures.is_empty() {
            return f.write_str("EMPTY");
        }
        for (i, structure) in self.structures.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            f.write_str(&structure.body_text())?;
        }
        // A lone `ANY;` or `EMPTY;` structure must not read back as a keyword.
        if let [only] = self.structures.as_slice() {
            if only.is_empty() && matches!(only.name(), "ANY" | "EMPTY") {
                f.write_str(";")?;
            }
        }
        Ok(())
    }
}

impl FromStr for Caps {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parser = Parser::new(s);
        parser.skip_ws();
        match parser.rest().trim_end() {
            "ANY" => return Ok(Self::new_any()),
            "EMPTY" | "" => return Ok(Self::new_empty()),
            _ => {}
        }

        let mut caps = Self::new_empty();
        loop {
            caps.append_structure(parser.structure()?);
            if !parser.eat(';') || parser.at_end() {
                break;
            }
        }
        parser.expect_end()?;
        Ok(caps)
    }
}

impl Serialize for Caps {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Caps {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

/// Builder returned by [`Caps::builder`].
#[must_use]
pub struct Builder {
    structure: crate::structure::Builder,
}

impl Builder {
    /// Adds a field to the caps' structure.
    pub fn field(self, key: &str, value: impl Into<Value>) -> Self {
        Self {
            structure: self.structure.field(key, value),
        }
    }

    /// Finishes the caps.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidName`] or [`Error::InvalidFieldName`].
    pub fn build(self) -> Result<Caps> {
        let mut caps = Caps::new_empty();
        caps.append_structure(self.structure.build()?);
        Ok(caps)
    }
}
