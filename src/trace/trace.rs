// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::rc::Rc;

use crate::errors::HeaderError;
use crate::trace::{Header, HeaderLayout, HeaderValue};

/// One seismic record in flight.
///
/// A trace is created and recycled by the [`crate::trace::TracePool`] only. Module code
/// can read and write header values and samples, but the sample count and the header
/// layout are changed by the engine so that the pool's memory accounting stays exact.
#[derive(Debug, Clone)]
pub struct Trace {
    id: u64,
    layout: Rc<HeaderLayout>,
    header: Header,
    samples: Vec<f32>,
}

impl Trace {
    pub(crate) fn empty(layout: Rc<HeaderLayout>) -> Self {
        Self {
            id: 0,
            header: Header::for_layout(&layout),
            layout,
            samples: Vec::new(),
        }
    }

    /// Identity assigned by the pool at checkout, unique within one run.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn layout(&self) -> &Rc<HeaderLayout> {
        &self.layout
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    pub fn nsamples(&self) -> usize {
        self.samples.len()
    }

    /// Bytes held by the sample buffer.
    pub fn sample_bytes(&self) -> u64 {
        (self.samples.len() * std::mem::size_of::<f32>()) as u64
    }

    pub fn value(&self, name: &str) -> Result<HeaderValue, HeaderError> {
        Ok(self.header.read(self.layout.lookup(name)?))
    }

    pub fn set_value(&mut self, name: &str, value: HeaderValue) -> Result<(), HeaderError> {
        let field = self.layout.lookup(name)?;
        self.header.write(field, &value)
    }

    /// Any numeric field as `f64`.
    pub fn get_f64(&self, name: &str) -> Result<f64, HeaderError> {
        let field = self.layout.lookup(name)?;
        self.header
            .read(field)
            .as_f64()
            .ok_or_else(|| HeaderError::TypeMismatch {
                name: field.name.clone(),
                actual: field.field_type,
                requested: "number",
            })
    }

    /// Any numeric field from an `f64`, converting to the field's type.
    pub fn set_f64(&mut self, name: &str, value: f64) -> Result<(), HeaderError> {
        let field = self.layout.lookup(name)?;
        self.header.write_f64(field, value)
    }

    pub fn get_int(&self, name: &str) -> Result<i32, HeaderError> {
        match self.value(name)? {
            HeaderValue::Int(v) => Ok(v),
            _ => Err(self.mismatch(name, "int")),
        }
    }

    pub fn set_int(&mut self, name: &str, value: i32) -> Result<(), HeaderError> {
        self.set_value(name, HeaderValue::Int(value))
    }

    pub fn get_int64(&self, name: &str) -> Result<i64, HeaderError> {
        match self.value(name)? {
            HeaderValue::Int64(v) => Ok(v),
            _ => Err(self.mismatch(name, "int64")),
        }
    }

    pub fn set_int64(&mut self, name: &str, value: i64) -> Result<(), HeaderError> {
        self.set_value(name, HeaderValue::Int64(value))
    }

    pub fn get_float(&self, name: &str) -> Result<f32, HeaderError> {
        match self.value(name)? {
            HeaderValue::Float(v) => Ok(v),
            _ => Err(self.mismatch(name, "float")),
        }
    }

    pub fn set_float(&mut self, name: &str, value: f32) -> Result<(), HeaderError> {
        self.set_value(name, HeaderValue::Float(value))
    }

    pub fn get_double(&self, name: &str) -> Result<f64, HeaderError> {
        match self.value(name)? {
            HeaderValue::Double(v) => Ok(v),
            _ => Err(self.mismatch(name, "double")),
        }
    }

    pub fn set_double(&mut self, name: &str, value: f64) -> Result<(), HeaderError> {
        self.set_value(name, HeaderValue::Double(value))
    }

    pub fn get_string(&self, name: &str) -> Result<String, HeaderError> {
        match self.value(name)? {
            HeaderValue::Str(v) => Ok(v),
            _ => Err(self.mismatch(name, "string")),
        }
    }

    pub fn set_string(&mut self, name: &str, value: &str) -> Result<(), HeaderError> {
        self.set_value(name, HeaderValue::Str(value.to_string()))
    }

    /// Prepare a recycled trace for a new checkout.
    pub(crate) fn reset(&mut self, id: u64, layout: &Rc<HeaderLayout>, nsamples: usize) {
        self.id = id;
        self.header.reset(layout.byte_size());
        self.layout = Rc::clone(layout);
        self.samples.clear();
        self.samples.resize(nsamples, 0.0);
    }

    /// Copy header and samples of `other` into `self`, keeping `self`'s identity.
    pub(crate) fn copy_contents(&mut self, other: &Trace) {
        self.layout = Rc::clone(&other.layout);
        self.header.copy_from(&other.header);
        self.samples.clear();
        self.samples.extend_from_slice(&other.samples);
    }

    pub(crate) fn resize(&mut self, nsamples: usize) {
        self.samples.resize(nsamples, 0.0);
    }

    /// Re-bind the header to `layout`.
    ///
    /// When `layout` extends the current one the bytes are kept and only grown. Otherwise
    /// the header is rebuilt, copying every active field that exists in both layouts with
    /// the same type.
    pub(crate) fn rebind(&mut self, layout: &Rc<HeaderLayout>) {
        if Rc::ptr_eq(&self.layout, layout) {
            return;
        }
        if layout.extends(&self.layout) {
            self.header.resize(layout.byte_size());
        } else {
            let mut rebuilt = Header::for_layout(layout);
            for field in self.layout.active_fields() {
                if let Some(target) = layout.field(&field.name) {
                    if target.field_type == field.field_type {
                        rebuilt.copy_field(target, &self.header, field);
                    }
                }
            }
            self.header = rebuilt;
        }
        self.layout = Rc::clone(layout);
    }

    /// Re-bind to `layout` and zero every field that `layout` marks as deleted.
    pub(crate) fn strip_deleted(&mut self, layout: &Rc<HeaderLayout>) {
        self.rebind(layout);
        for field in layout.fields().iter().filter(|field| !field.active) {
            self.header.clear(field);
        }
    }

    fn mismatch(&self, name: &str, requested: &'static str) -> HeaderError {
        match self.layout.lookup(name) {
            Ok(field) => HeaderError::TypeMismatch {
                name: field.name.clone(),
                actual: field.field_type,
                requested,
            },
            Err(err) => err,
        }
    }
}
