// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::HeaderError;
use crate::trace::{HeaderValue, Trace};

/// One key field, kept in the precision it was stored with.
#[derive(Debug, Clone, Copy)]
enum KeyValue {
    Integer(i64),
    Real(f64),
}

impl PartialEq for KeyValue {
    /// Numeric equality. Zero equals negative zero, and NaN equals NaN so that traces
    /// with an unset floating key stay in one ensemble.
    fn eq(&self, other: &Self) -> bool {
        match (*self, *other) {
            (KeyValue::Integer(a), KeyValue::Integer(b)) => a == b,
            (KeyValue::Real(a), KeyValue::Real(b)) => a == b || (a.is_nan() && b.is_nan()),
            (KeyValue::Integer(i), KeyValue::Real(r)) | (KeyValue::Real(r), KeyValue::Integer(i)) => {
                r == i as f64 && r as i64 == i
            }
        }
    }
}

/// Values of the ensemble keys of one trace, in key declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleKey(Vec<KeyValue>);

impl Eq for EnsembleKey {}

impl EnsembleKey {
    /// Read the key values of `trace`. Every key must be a numeric field.
    pub fn of(trace: &Trace, keys: &[String]) -> Result<Self, HeaderError> {
        keys.iter()
            .map(|key| match trace.value(key)? {
                HeaderValue::Int(v) => Ok(KeyValue::Integer(i64::from(v))),
                HeaderValue::Int64(v) => Ok(KeyValue::Integer(v)),
                HeaderValue::Float(v) => Ok(KeyValue::Real(f64::from(v))),
                HeaderValue::Double(v) => Ok(KeyValue::Real(v)),
                HeaderValue::Str(_) => Err(HeaderError::TypeMismatch {
                    name: key.clone(),
                    actual: trace.layout().lookup(key)?.field_type,
                    requested: "number",
                }),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(EnsembleKey)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::trace::{FieldType, HeaderLayout, PoolSettings, TraceHandle, TracePool};

    fn pool_with(fields: &[(&str, FieldType)]) -> (TracePool, Rc<HeaderLayout>) {
        let mut layout = HeaderLayout::new();
        for (name, field_type) in fields {
            layout.declare(name, *field_type, "").unwrap();
        }
        (TracePool::new(PoolSettings::default()), Rc::new(layout))
    }

    fn key(pool: &TracePool, handle: TraceHandle, keys: &[&str]) -> EnsembleKey {
        let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        EnsembleKey::of(pool.get(handle).unwrap(), &keys).unwrap()
    }

    #[test]
    fn test_any_differing_field_separates_ensembles() {
        let (mut pool, layout) = pool_with(&[("cdp", FieldType::Int), ("line", FieldType::Int)]);
        let a = pool.acquire(&layout, 0).unwrap();
        let b = pool.acquire(&layout, 0).unwrap();
        let c = pool.acquire(&layout, 0).unwrap();
        for (handle, cdp, line) in [(a, 1, 9), (b, 1, 8), (c, 1, 9)] {
            let trace = pool.get_mut(handle).unwrap();
            trace.set_int("cdp", cdp).unwrap();
            trace.set_int("line", line).unwrap();
        }

        assert_eq!(key(&pool, a, &["cdp", "line"]), key(&pool, c, &["cdp", "line"]));
        assert_ne!(key(&pool, a, &["cdp", "line"]), key(&pool, b, &["cdp", "line"]));
        assert_eq!(key(&pool, a, &["cdp"]), key(&pool, b, &["cdp"]));
    }

    #[test]
    fn test_large_int64_keys_compare_exactly() {
        let (mut pool, layout) = pool_with(&[("shot", FieldType::Int64)]);
        let a = pool.acquire(&layout, 0).unwrap();
        let b = pool.acquire(&layout, 0).unwrap();
        pool.get_mut(a).unwrap().set_int64("shot", 9_007_199_254_740_992).unwrap();
        pool.get_mut(b).unwrap().set_int64("shot", 9_007_199_254_740_993).unwrap();

        assert_ne!(key(&pool, a, &["shot"]), key(&pool, b, &["shot"]));
    }

    #[test]
    fn test_signed_zero_and_nan_keys_stay_together() {
        let (mut pool, layout) = pool_with(&[("offset", FieldType::Double)]);
        let handles: Vec<_> = [0.0, -0.0, f64::NAN, f64::NAN]
            .into_iter()
            .map(|value| {
                let handle = pool.acquire(&layout, 0).unwrap();
                pool.get_mut(handle).unwrap().set_double("offset", value).unwrap();
                handle
            })
            .collect();

        assert_eq!(key(&pool, handles[0], &["offset"]), key(&pool, handles[1], &["offset"]));
        assert_eq!(key(&pool, handles[2], &["offset"]), key(&pool, handles[3], &["offset"]));
        assert_ne!(key(&pool, handles[0], &["offset"]), key(&pool, handles[2], &["offset"]));
    }

    #[test]
    fn test_string_key_is_rejected() {
        let (mut pool, layout) = pool_with(&[("name", FieldType::String(8))]);
        let handle = pool.acquire(&layout, 0).unwrap();
        let err = EnsembleKey::of(pool.get(handle).unwrap(), &["name".to_string()]).unwrap_err();
        assert!(matches!(err, HeaderError::TypeMismatch { requested: "number", .. }));
    }

    #[test]
    fn test_no_keys_form_one_ensemble() {
        assert_eq!(EnsembleKey(Vec::new()), EnsembleKey(Vec::new()));
    }
}
