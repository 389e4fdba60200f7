// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::rc::Rc;

use crate::errors::ModuleError;
use crate::trace::{HeaderLayout, Trace, TraceHandle, TracePool};

/// The batch of traces handed to one multi-trace or input call.
///
/// A gather borrows the module's batch and the run's pool for the duration of the call.
/// Traces removed from the gather go straight back to the pool; traces created or
/// duplicated through it are checked out from the pool and bound to the module's layout.
pub struct Gather<'a> {
    handles: &'a mut Vec<TraceHandle>,
    pool: &'a mut TracePool,
    layout: &'a Rc<HeaderLayout>,
    nsamples: usize,
}

impl<'a> Gather<'a> {
    pub(crate) fn new(
        handles: &'a mut Vec<TraceHandle>,
        pool: &'a mut TracePool,
        layout: &'a Rc<HeaderLayout>,
        nsamples: usize,
    ) -> Self {
        Self {
            handles,
            pool,
            layout,
            nsamples,
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Sample count of traces created through this gather.
    pub fn nsamples(&self) -> usize {
        self.nsamples
    }

    pub fn layout(&self) -> &Rc<HeaderLayout> {
        self.layout
    }

    pub fn get(&self, index: usize) -> Result<&Trace, ModuleError> {
        let handle = self.handle(index)?;
        Ok(self.pool.get(handle)?)
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut Trace, ModuleError> {
        let handle = self.handle(index)?;
        Ok(self.pool.get_mut(handle)?)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trace> + '_ {
        self.handles
            .iter()
            .filter_map(|handle| self.pool.get(*handle).ok())
    }

    /// Drop the trace at `index`, returning it to the pool.
    pub fn remove(&mut self, index: usize) -> Result<(), ModuleError> {
        let handle = self.handle(index)?;
        self.handles.remove(index);
        Ok(self.pool.release(handle)?)
    }

    /// Drop every trace from `len` onwards.
    pub fn truncate(&mut self, len: usize) -> Result<(), ModuleError> {
        if len >= self.handles.len() {
            return Ok(());
        }
        let dropped: Vec<TraceHandle> = self.handles.drain(len..).collect();
        Ok(self.pool.release_all(dropped)?)
    }

    /// Insert a copy of the trace at `index` right after it. Returns the copy's index.
    pub fn duplicate(&mut self, index: usize) -> Result<usize, ModuleError> {
        let handle = self.handle(index)?;
        let copy = self.pool.duplicate(handle)?;
        self.handles.insert(index + 1, copy);
        Ok(index + 1)
    }

    /// Append a zeroed trace bound to the module's layout.
    pub fn push_new(&mut self) -> Result<&mut Trace, ModuleError> {
        let handle = self.pool.acquire(self.layout, self.nsamples)?;
        self.handles.push(handle);
        Ok(self.pool.get_mut(handle)?)
    }

    /// Insert a zeroed trace at `index`.
    pub fn insert_new(&mut self, index: usize) -> Result<&mut Trace, ModuleError> {
        if index > self.handles.len() {
            return Err(self.out_of_range(index));
        }
        let handle = self.pool.acquire(self.layout, self.nsamples)?;
        self.handles.insert(index, handle);
        Ok(self.pool.get_mut(handle)?)
    }

    /// Swap two traces, e.g. for sorting inside a batch.
    pub fn swap(&mut self, a: usize, b: usize) -> Result<(), ModuleError> {
        self.handle(a)?;
        self.handle(b)?;
        self.handles.swap(a, b);
        Ok(())
    }

    fn handle(&self, index: usize) -> Result<TraceHandle, ModuleError> {
        self.handles
            .get(index)
            .copied()
            .ok_or_else(|| self.out_of_range(index))
    }

    fn out_of_range(&self, index: usize) -> ModuleError {
        ModuleError::Fatal(format!(
            "trace index {} out of range for a gather of {} traces",
            index,
            self.handles.len()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{FieldType, PoolSettings};

    fn setup() -> (TracePool, Rc<HeaderLayout>) {
        let mut layout = HeaderLayout::new();
        layout.declare("n", FieldType::Int, "").unwrap();
        (TracePool::new(PoolSettings::default()), Rc::new(layout))
    }

    #[test]
    fn test_push_duplicate_and_remove() {
        let (mut pool, layout) = setup();
        let mut handles = Vec::new();
        {
            let mut gather = Gather::new(&mut handles, &mut pool, &layout, 4);
            gather.push_new().unwrap().set_int("n", 1).unwrap();
            gather.push_new().unwrap().set_int("n", 2).unwrap();
            let copy = gather.duplicate(0).unwrap();
            assert_eq!(copy, 1);
            assert_eq!(gather.len(), 3);

            let values: Vec<i32> = gather.iter().map(|t| t.get_int("n").unwrap()).collect();
            assert_eq!(values, vec![1, 1, 2]);

            gather.remove(0).unwrap();
            assert_eq!(gather.get(0).unwrap().get_int("n").unwrap(), 1);
            assert_eq!(gather.get(1).unwrap().nsamples(), 4);
        }
        assert_eq!(handles.len(), 2);
        assert_eq!(pool.outstanding(), 2);
    }

    #[test]
    fn test_truncate_releases_tail() {
        let (mut pool, layout) = setup();
        let mut handles = Vec::new();
        let mut gather = Gather::new(&mut handles, &mut pool, &layout, 1);
        for _ in 0..4 {
            gather.push_new().unwrap();
        }
        gather.truncate(1).unwrap();
        assert_eq!(gather.len(), 1);
        drop(gather);
        assert_eq!(pool.outstanding(), 1);
    }

    #[test]
    fn test_out_of_range_index_is_an_error() {
        let (mut pool, layout) = setup();
        let mut handles = Vec::new();
        let mut gather = Gather::new(&mut handles, &mut pool, &layout, 1);
        assert!(gather.get(0).is_err());
        assert!(gather.remove(3).is_err());
        assert!(gather.insert_new(2).is_err());
        assert!(gather.swap(0, 1).is_err());
    }
}
