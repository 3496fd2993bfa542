// SPDX-FileCopyrightText: 2025 2025 Contributors to the pipekit project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for pipekit operations.
//!
//! Absent fields and empty queues are not errors: lookups and pops return
//! `Option`. The variants here cover construction, parsing and typed access.

/// Convenience result type using [`Error`] as the error variant.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors that can occur when building, parsing or accessing pipekit values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A structure or caps name is empty or contains characters outside the
    /// naming rule (ASCII alphanumerics plus `/`, `-`, `_`, `.`, not starting
    /// with a digit).
    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    /// A field key violates the naming rule.
    #[error("Invalid field name: {0:?}")]
    InvalidFieldName(String),

    /// A value cannot be represented, such as a fraction with a zero
    /// denominator.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Serialized text could not be parsed. No partial value is ever returned.
    #[error("Failed to parse {input:?}: {reason}")]
    Parse {
        /// The text that was being parsed.
        input: String,
        /// What went wrong, including the byte offset when known.
        reason: String,
    },

    /// A typed getter was called for a key the structure does not have.
    #[error("Field not found: {0}")]
    FieldNotFound(String),

    /// A typed getter found the key, but the stored value has another type.
    #[error("Field {field} has type {actual}, {expected} requested")]
    TypeMismatch {
        /// The field key.
        field: String,
        /// Type tag that was requested.
        expected: &'static str,
        /// Type tag that is stored.
        actual: &'static str,
    },

    /// A mutable view was requested on a message that is shared with another
    /// holder (for example still queued on a bus, or peeked).
    #[error("Message is shared and cannot be modified")]
    NotWritable,

    /// A generic error for failures not covered by the other variants.
    #[error("Other error: {0}")]
    Other(String),
}

impl Error {
    pub(crate) fn parse(input: &str, reason: impl Into<String>) -> Self {
        Error::Parse {
            input: input.to_owned(),
            reason: reason.into(),
        }
    }
}
