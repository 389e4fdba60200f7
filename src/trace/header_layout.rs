// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::config::consts::DEFAULT_STRING_FIELD_LEN;
use crate::errors::HeaderError;

/// Scalar type of one header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Int,
    Int64,
    Float,
    Double,
    /// Fixed-length string, NUL padded.
    String(usize),
}

impl FieldType {
    /// Encoded size in bytes.
    pub fn byte_len(&self) -> usize {
        match self {
            FieldType::Int | FieldType::Float => 4,
            FieldType::Int64 | FieldType::Double => 8,
            FieldType::String(len) => *len,
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, FieldType::String(_))
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Int => write!(f, "int"),
            FieldType::Int64 => write!(f, "int64"),
            FieldType::Float => write!(f, "float"),
            FieldType::Double => write!(f, "double"),
            FieldType::String(len) => write!(f, "string{}", len),
        }
    }
}

impl FromStr for FieldType {
    type Err = String;

    /// Accepts `int`, `int64`, `float`, `double`, `string` and `stringN`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "int" | "i" => Ok(FieldType::Int),
            "int64" | "long" | "l" => Ok(FieldType::Int64),
            "float" | "f" => Ok(FieldType::Float),
            "double" | "d" => Ok(FieldType::Double),
            "string" | "s" => Ok(FieldType::String(DEFAULT_STRING_FIELD_LEN)),
            other => match other.strip_prefix("string") {
                Some(len) => len
                    .parse::<usize>()
                    .ok()
                    .filter(|len| *len > 0)
                    .map(FieldType::String)
                    .ok_or_else(|| format!("invalid string length in '{}'", s)),
                None => Err(format!("unknown header type '{}'", s)),
            },
        }
    }
}

/// One declared header field.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderField {
    pub name: String,
    pub field_type: FieldType,
    /// Byte offset into the header buffer. Never changes once assigned.
    pub offset: usize,
    pub description: String,
    /// `false` once a module deleted the field. The bytes stay reserved.
    pub active: bool,
}

/// Append-only description of the header fields of every trace at one point of a flow.
///
/// Fields are appended at the end of the byte block as they are declared. Deleting a field
/// only clears its `active` flag; the offset stays reserved so layouts derived from this
/// one keep the same offsets for every field they inherit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderLayout {
    fields: Vec<HeaderField>,
    by_name: HashMap<String, usize>,
    byte_size: usize,
}

impl HeaderLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a layout from the layouts of all input ports.
    ///
    /// The first input is taken as is, so its offsets carry over unchanged. Fields only
    /// known to later inputs are appended in the order those inputs list them. A field is
    /// active in the result when it is active in any input.
    pub fn merge(inputs: &[&HeaderLayout]) -> Result<HeaderLayout, HeaderError> {
        let mut iter = inputs.iter();
        let mut merged = match iter.next() {
            Some(first) => (*first).clone(),
            None => return Ok(HeaderLayout::new()),
        };

        for layout in iter {
            for field in &layout.fields {
                match merged.by_name.get(&field.name) {
                    Some(&index) => {
                        let existing = &mut merged.fields[index];
                        if existing.field_type != field.field_type {
                            return Err(HeaderError::IncompatibleRedeclaration {
                                name: field.name.clone(),
                                existing: existing.field_type,
                                requested: field.field_type,
                            });
                        }
                        existing.active |= field.active;
                    }
                    None => {
                        merged.append(
                            field.name.clone(),
                            field.field_type,
                            field.description.clone(),
                        );
                        if !field.active {
                            let last = merged.fields.len() - 1;
                            merged.fields[last].active = false;
                        }
                    }
                }
            }
        }

        Ok(merged)
    }

    /// Declare a field, returning its index.
    ///
    /// Re-declaring an existing field with the same type is a no-op that re-activates it
    /// if it had been deleted.
    pub fn declare(
        &mut self,
        name: &str,
        field_type: FieldType,
        description: &str,
    ) -> Result<usize, HeaderError> {
        let name = normalize_name(name)?;
        if let FieldType::String(0) = field_type {
            return Err(HeaderError::EmptyString(name));
        }

        if let Some(&index) = self.by_name.get(&name) {
            let existing = &mut self.fields[index];
            if existing.field_type != field_type {
                return Err(HeaderError::IncompatibleRedeclaration {
                    name,
                    existing: existing.field_type,
                    requested: field_type,
                });
            }
            existing.active = true;
            return Ok(index);
        }

        Ok(self.append(name, field_type, description.to_string()))
    }

    /// Mark a field as deleted.
    pub fn delete(&mut self, name: &str) -> Result<(), HeaderError> {
        let name = name.to_ascii_lowercase();
        match self.by_name.get(&name) {
            Some(&index) if self.fields[index].active => {
                self.fields[index].active = false;
                Ok(())
            }
            _ => Err(HeaderError::UnknownField(name)),
        }
    }

    /// Active field by name.
    pub fn field(&self, name: &str) -> Option<&HeaderField> {
        let index = match self.by_name.get(name) {
            Some(index) => *index,
            None => *self.by_name.get(&name.to_ascii_lowercase())?,
        };
        let field = &self.fields[index];
        field.active.then_some(field)
    }

    /// Active field by name, or [`HeaderError::UnknownField`].
    pub fn lookup(&self, name: &str) -> Result<&HeaderField, HeaderError> {
        self.field(name)
            .ok_or_else(|| HeaderError::UnknownField(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// All fields including deleted ones, in declaration order.
    pub fn fields(&self) -> &[HeaderField] {
        &self.fields
    }

    pub fn active_fields(&self) -> impl Iterator<Item = &HeaderField> {
        self.fields.iter().filter(|field| field.active)
    }

    /// Size of the encoded header in bytes.
    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    /// True when every field of `other` sits at the same position, offset and type in
    /// `self`, i.e. a header encoded with `other` is a valid prefix of one encoded with
    /// `self`.
    pub fn extends(&self, other: &HeaderLayout) -> bool {
        other.fields.len() <= self.fields.len()
            && other.fields.iter().zip(&self.fields).all(|(a, b)| {
                a.name == b.name && a.offset == b.offset && a.field_type == b.field_type
            })
    }

    fn append(&mut self, name: String, field_type: FieldType, description: String) -> usize {
        let index = self.fields.len();
        self.by_name.insert(name.clone(), index);
        self.fields.push(HeaderField {
            name,
            field_type,
            offset: self.byte_size,
            description,
            active: true,
        });
        self.byte_size += field_type.byte_len();
        index
    }
}

fn normalize_name(name: &str) -> Result<String, HeaderError> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(HeaderError::InvalidName(name.to_string()));
    }
    Ok(name.to_ascii_lowercase())
}
