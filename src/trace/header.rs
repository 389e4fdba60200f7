// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Header value storage.
//!
//! Header bytes are a plain little-endian buffer. Values are only ever read and written
//! through the explicit encode/decode functions below, keyed by a [`HeaderField`].

use std::fmt::{Display, Formatter};

use crate::errors::HeaderError;
use crate::trace::{FieldType, HeaderField, HeaderLayout};

/// A decoded header value.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Int(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Str(String),
}

impl HeaderValue {
    /// Numeric value as `f64`, `None` for strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Int(v) => Some(*v as f64),
            HeaderValue::Int64(v) => Some(*v as f64),
            HeaderValue::Float(v) => Some(*v as f64),
            HeaderValue::Double(v) => Some(*v),
            HeaderValue::Str(_) => None,
        }
    }

    /// Parse `text` as a value of `field_type`.
    pub fn parse(field_type: FieldType, text: &str) -> Result<HeaderValue, String> {
        let invalid = || format!("'{}' is not a valid {}", text, field_type);
        match field_type {
            FieldType::Int => text.parse().map(HeaderValue::Int).map_err(|_| invalid()),
            FieldType::Int64 => text.parse().map(HeaderValue::Int64).map_err(|_| invalid()),
            FieldType::Float => text.parse().map(HeaderValue::Float).map_err(|_| invalid()),
            FieldType::Double => text.parse().map(HeaderValue::Double).map_err(|_| invalid()),
            FieldType::String(_) => Ok(HeaderValue::Str(text.to_string())),
        }
    }
}

impl Display for HeaderValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            HeaderValue::Int(v) => write!(f, "{}", v),
            HeaderValue::Int64(v) => write!(f, "{}", v),
            HeaderValue::Float(v) => write!(f, "{}", v),
            HeaderValue::Double(v) => write!(f, "{}", v),
            HeaderValue::Str(v) => write!(f, "{}", v),
        }
    }
}

/// Encoded header block of one trace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    bytes: Vec<u8>,
}

impl Header {
    /// Zeroed header sized for `layout`.
    pub fn for_layout(layout: &HeaderLayout) -> Self {
        Self {
            bytes: vec![0; layout.byte_size()],
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decode the value of `field`.
    pub fn read(&self, field: &HeaderField) -> HeaderValue {
        let raw = self.slice(field);
        match field.field_type {
            FieldType::Int => HeaderValue::Int(i32::from_le_bytes(fixed(raw))),
            FieldType::Int64 => HeaderValue::Int64(i64::from_le_bytes(fixed(raw))),
            FieldType::Float => HeaderValue::Float(f32::from_le_bytes(fixed(raw))),
            FieldType::Double => HeaderValue::Double(f64::from_le_bytes(fixed(raw))),
            FieldType::String(_) => {
                let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
                HeaderValue::Str(String::from_utf8_lossy(&raw[..end]).into_owned())
            }
        }
    }

    /// Encode `value` into `field`. The value type must match the field type exactly.
    pub fn write(&mut self, field: &HeaderField, value: &HeaderValue) -> Result<(), HeaderError> {
        let mismatch = |requested: &'static str| HeaderError::TypeMismatch {
            name: field.name.clone(),
            actual: field.field_type,
            requested,
        };
        let raw = self.slice_mut(field);
        match (field.field_type, value) {
            (FieldType::Int, HeaderValue::Int(v)) => raw.copy_from_slice(&v.to_le_bytes()),
            (FieldType::Int64, HeaderValue::Int64(v)) => raw.copy_from_slice(&v.to_le_bytes()),
            (FieldType::Float, HeaderValue::Float(v)) => raw.copy_from_slice(&v.to_le_bytes()),
            (FieldType::Double, HeaderValue::Double(v)) => raw.copy_from_slice(&v.to_le_bytes()),
            (FieldType::String(len), HeaderValue::Str(v)) => {
                raw.fill(0);
                let bytes = v.as_bytes();
                let n = bytes.len().min(len);
                raw[..n].copy_from_slice(&bytes[..n]);
            }
            (_, HeaderValue::Int(_)) => return Err(mismatch("int")),
            (_, HeaderValue::Int64(_)) => return Err(mismatch("int64")),
            (_, HeaderValue::Float(_)) => return Err(mismatch("float")),
            (_, HeaderValue::Double(_)) => return Err(mismatch("double")),
            (_, HeaderValue::Str(_)) => return Err(mismatch("string")),
        }
        Ok(())
    }

    /// Encode a numeric value into any numeric field, converting as needed.
    pub fn write_f64(&mut self, field: &HeaderField, value: f64) -> Result<(), HeaderError> {
        let converted = match field.field_type {
            FieldType::Int => HeaderValue::Int(value.round() as i32),
            FieldType::Int64 => HeaderValue::Int64(value.round() as i64),
            FieldType::Float => HeaderValue::Float(value as f32),
            FieldType::Double => HeaderValue::Double(value),
            FieldType::String(_) => {
                return Err(HeaderError::TypeMismatch {
                    name: field.name.clone(),
                    actual: field.field_type,
                    requested: "number",
                })
            }
        };
        self.write(field, &converted)
    }

    /// Zero the bytes of `field`.
    pub(crate) fn clear(&mut self, field: &HeaderField) {
        self.slice_mut(field).fill(0);
    }

    /// Copy the bytes of `src_field` in `src` into `dst_field` of `self`.
    pub(crate) fn copy_field(&mut self, dst_field: &HeaderField, src: &Header, src_field: &HeaderField) {
        let len = dst_field.field_type.byte_len();
        self.slice_mut(dst_field)
            .copy_from_slice(&src.bytes[src_field.offset..src_field.offset + len]);
    }

    pub(crate) fn copy_from(&mut self, other: &Header) {
        self.bytes.clear();
        self.bytes.extend_from_slice(&other.bytes);
    }

    /// Reset to a zeroed block of `size` bytes, keeping the allocation.
    pub(crate) fn reset(&mut self, size: usize) {
        self.bytes.clear();
        self.bytes.resize(size, 0);
    }

    /// Grow or shrink to `size` bytes, preserving the leading bytes.
    pub(crate) fn resize(&mut self, size: usize) {
        self.bytes.resize(size, 0);
    }

    fn slice(&self, field: &HeaderField) -> &[u8] {
        &self.bytes[field.offset..field.offset + field.field_type.byte_len()]
    }

    fn slice_mut(&mut self, field: &HeaderField) -> &mut [u8] {
        let len = field.field_type.byte_len();
        &mut self.bytes[field.offset..field.offset + len]
    }
}

fn fixed<const N: usize>(raw: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&raw[..N]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> HeaderLayout {
        let mut layout = HeaderLayout::new();
        layout.declare("i", FieldType::Int, "").unwrap();
        layout.declare("l", FieldType::Int64, "").unwrap();
        layout.declare("f", FieldType::Float, "").unwrap();
        layout.declare("d", FieldType::Double, "").unwrap();
        layout.declare("s", FieldType::String(4), "").unwrap();
        layout
    }

    #[test]
    fn test_typed_values_are_encoded_little_endian() {
        let layout = layout();
        let mut header = Header::for_layout(&layout);

        header.write(layout.lookup("i").unwrap(), &HeaderValue::Int(-2)).unwrap();
        header.write(layout.lookup("l").unwrap(), &HeaderValue::Int64(1 << 40)).unwrap();
        header.write(layout.lookup("f").unwrap(), &HeaderValue::Float(1.5)).unwrap();
        header.write(layout.lookup("d").unwrap(), &HeaderValue::Double(-0.25)).unwrap();

        assert_eq!(&header.as_bytes()[0..4], &(-2i32).to_le_bytes());
        assert_eq!(header.read(layout.lookup("l").unwrap()), HeaderValue::Int64(1 << 40));
        assert_eq!(header.read(layout.lookup("f").unwrap()), HeaderValue::Float(1.5));
        assert_eq!(header.read(layout.lookup("d").unwrap()), HeaderValue::Double(-0.25));
    }

    #[test]
    fn test_strings_are_truncated_and_padded() {
        let layout = layout();
        let mut header = Header::for_layout(&layout);
        let field = layout.lookup("s").unwrap();

        header.write(field, &HeaderValue::Str("abcdef".into())).unwrap();
        assert_eq!(header.read(field), HeaderValue::Str("abcd".into()));

        header.write(field, &HeaderValue::Str("x".into())).unwrap();
        assert_eq!(header.read(field), HeaderValue::Str("x".into()));
    }

    #[test]
    fn test_write_rejects_type_mismatch() {
        let layout = layout();
        let mut header = Header::for_layout(&layout);
        let err = header
            .write(layout.lookup("i").unwrap(), &HeaderValue::Double(1.0))
            .unwrap_err();
        assert!(matches!(err, HeaderError::TypeMismatch { requested: "double", .. }));
    }

    #[test]
    fn test_write_f64_converts_numeric_fields() {
        let layout = layout();
        let mut header = Header::for_layout(&layout);
        header.write_f64(layout.lookup("i").unwrap(), 2.6).unwrap();
        header.write_f64(layout.lookup("f").unwrap(), 0.5).unwrap();
        assert_eq!(header.read(layout.lookup("i").unwrap()), HeaderValue::Int(3));
        assert_eq!(header.read(layout.lookup("f").unwrap()), HeaderValue::Float(0.5));
        assert!(header.write_f64(layout.lookup("s").unwrap(), 1.0).is_err());
    }

    #[test]
    fn test_parse_values() {
        assert_eq!(HeaderValue::parse(FieldType::Int, "12"), Ok(HeaderValue::Int(12)));
        assert_eq!(
            HeaderValue::parse(FieldType::Int, "1.5"),
            Err("'1.5' is not a valid int".to_string())
        );
        assert_eq!(
            HeaderValue::parse(FieldType::Float, "x"),
            Err("'x' is not a valid float".to_string())
        );
        assert_eq!(HeaderValue::parse(FieldType::Double, "1.5"), Ok(HeaderValue::Double(1.5)));
        assert_eq!(HeaderValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(HeaderValue::Str("a".into()).as_f64(), None);
    }
}
