// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use crate::trace::FieldType;

/// Errors raised while declaring or accessing trace header fields.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HeaderError {
    /// The field is not declared in the layout, or has been deleted.
    #[error("Unknown header field '{0}'")]
    UnknownField(String),

    /// A typed accessor was used on a field of a different type.
    #[error("Header field '{name}' is of type {actual}, cannot access it as {requested}")]
    TypeMismatch {
        name: String,
        actual: FieldType,
        requested: &'static str,
    },

    /// A field was re-declared with a type that differs from its original declaration.
    #[error("Header field '{name}' already declared as {existing}, cannot re-declare it as {requested}")]
    IncompatibleRedeclaration {
        name: String,
        existing: FieldType,
        requested: FieldType,
    },

    /// Field names must be non-empty and free of whitespace.
    #[error("Invalid header field name '{0}'")]
    InvalidName(String),

    /// A string field with a zero length was declared.
    #[error("String header field '{0}' must have a length of at least one byte")]
    EmptyString(String),
}
