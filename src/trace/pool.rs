// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Index-based arena that owns every trace of a run.
//!
//! Slots are created lazily when the free list runs dry. Capacity grows by an increment
//! that itself grows by `growth_increment` on every exhaustion, so a long run with a
//! steady working set settles quickly without the memory spikes of doubling.
//!
//! Handles are plain slot indices. The pool tracks which slots are checked out, so a
//! double release or a release of a foreign handle is reported as a [`PoolError`]
//! instead of corrupting the free list.

use std::fmt::{Display, Formatter};
use std::rc::Rc;

use serde::Serialize;

use crate::config::consts::{
    DEFAULT_MEMORY_BUDGET_BYTES, DEFAULT_POOL_GROWTH_INCREMENT, DEFAULT_POOL_INITIAL_CAPACITY,
};
use crate::errors::PoolError;
use crate::observability::messages::pool::{LayoutInterned, PoolGrown};
use crate::observability::messages::StructuredLog;
use crate::trace::{HeaderLayout, Trace};

/// Handle to a checked-out trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraceHandle(usize);

impl TraceHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for TraceHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Sizing and budget of a [`TracePool`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolSettings {
    /// Ceiling for sample bytes held by checked-out traces.
    pub budget_bytes: u64,
    /// Slots created on the first exhaustion.
    pub initial_capacity: usize,
    /// Added to the growth step after every exhaustion.
    pub growth_increment: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            budget_bytes: DEFAULT_MEMORY_BUDGET_BYTES,
            initial_capacity: DEFAULT_POOL_INITIAL_CAPACITY,
            growth_increment: DEFAULT_POOL_GROWTH_INCREMENT,
        }
    }
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PoolStats {
    pub capacity: usize,
    pub outstanding: usize,
    pub bytes_in_use: u64,
    pub peak_bytes_in_use: u64,
    pub checkouts: u64,
    pub growth_events: u64,
    pub layouts_interned: usize,
    pub layouts_reused: u64,
}

struct Slot {
    trace: Trace,
    checked_out: bool,
}

pub struct TracePool {
    slots: Vec<Slot>,
    free: Vec<usize>,
    settings: PoolSettings,
    next_growth: usize,
    bytes_in_use: u64,
    outstanding: usize,
    next_trace_id: u64,
    empty_layout: Rc<HeaderLayout>,
    layouts: Vec<Rc<HeaderLayout>>,
    stats: PoolStats,
}

impl TracePool {
    pub fn new(settings: PoolSettings) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            next_growth: settings.initial_capacity.max(1),
            settings,
            bytes_in_use: 0,
            outstanding: 0,
            next_trace_id: 1,
            empty_layout: Rc::new(HeaderLayout::new()),
            layouts: Vec::new(),
            stats: PoolStats::default(),
        }
    }

    /// Check out a zeroed trace bound to `layout` with `nsamples` samples.
    pub fn acquire(
        &mut self,
        layout: &Rc<HeaderLayout>,
        nsamples: usize,
    ) -> Result<TraceHandle, PoolError> {
        let bytes = self.sample_bytes(nsamples)?;
        self.check_budget(bytes)?;

        if self.free.is_empty() {
            self.grow();
        }
        let index = self
            .free
            .pop()
            .ok_or(PoolError::UnknownHandle(TraceHandle(self.slots.len())))?;

        let id = self.next_trace_id;
        self.next_trace_id += 1;

        let slot = &mut self.slots[index];
        slot.trace.reset(id, layout, nsamples);
        slot.checked_out = true;

        self.outstanding += 1;
        self.bytes_in_use += bytes;
        self.stats.checkouts += 1;
        self.stats.peak_bytes_in_use = self.stats.peak_bytes_in_use.max(self.bytes_in_use);

        Ok(TraceHandle(index))
    }

    /// Return a trace to the free list.
    pub fn release(&mut self, handle: TraceHandle) -> Result<(), PoolError> {
        let slot = self
            .slots
            .get_mut(handle.0)
            .ok_or(PoolError::UnknownHandle(handle))?;
        if !slot.checked_out {
            return Err(PoolError::DoubleRelease(handle));
        }
        slot.checked_out = false;
        self.bytes_in_use -= slot.trace.sample_bytes();
        self.outstanding -= 1;
        self.free.push(handle.0);
        Ok(())
    }

    /// Release every handle in `handles`, stopping at the first failure.
    pub fn release_all<I>(&mut self, handles: I) -> Result<(), PoolError>
    where
        I: IntoIterator<Item = TraceHandle>,
    {
        for handle in handles {
            self.release(handle)?;
        }
        Ok(())
    }

    pub fn get(&self, handle: TraceHandle) -> Result<&Trace, PoolError> {
        match self.slots.get(handle.0) {
            Some(slot) if slot.checked_out => Ok(&slot.trace),
            Some(_) => Err(PoolError::NotCheckedOut(handle)),
            None => Err(PoolError::UnknownHandle(handle)),
        }
    }

    pub fn get_mut(&mut self, handle: TraceHandle) -> Result<&mut Trace, PoolError> {
        match self.slots.get_mut(handle.0) {
            Some(slot) if slot.checked_out => Ok(&mut slot.trace),
            Some(_) => Err(PoolError::NotCheckedOut(handle)),
            None => Err(PoolError::UnknownHandle(handle)),
        }
    }

    /// Check out a copy of `handle`: same layout, header bytes and samples, new identity.
    pub fn duplicate(&mut self, handle: TraceHandle) -> Result<TraceHandle, PoolError> {
        let (layout, nsamples) = {
            let source = self.get(handle)?;
            (Rc::clone(source.layout()), source.nsamples())
        };
        let copy = self.acquire(&layout, nsamples)?;

        let (source, target) = two_slots_mut(&mut self.slots, handle.0, copy.0);
        target.trace.copy_contents(&source.trace);
        Ok(copy)
    }

    /// Change the sample count of a checked-out trace.
    pub fn resize(&mut self, handle: TraceHandle, nsamples: usize) -> Result<(), PoolError> {
        let current = self.get(handle)?.sample_bytes();
        let wanted = self.sample_bytes(nsamples)?;
        if wanted > current {
            self.check_budget(wanted - current)?;
        }
        self.get_mut(handle)?.resize(nsamples);
        self.bytes_in_use = self.bytes_in_use - current + wanted;
        self.stats.peak_bytes_in_use = self.stats.peak_bytes_in_use.max(self.bytes_in_use);
        Ok(())
    }

    /// Re-bind the header of a checked-out trace to `layout`.
    pub fn rebind(&mut self, handle: TraceHandle, layout: &Rc<HeaderLayout>) -> Result<(), PoolError> {
        self.get_mut(handle)?.rebind(layout);
        Ok(())
    }

    /// Re-bind to `layout` and zero the fields it marks as deleted.
    pub fn strip_deleted(
        &mut self,
        handle: TraceHandle,
        layout: &Rc<HeaderLayout>,
    ) -> Result<(), PoolError> {
        self.get_mut(handle)?.strip_deleted(layout);
        Ok(())
    }

    /// Share one allocation between structurally identical layouts.
    pub fn intern_layout(&mut self, layout: HeaderLayout) -> Rc<HeaderLayout> {
        if let Some(existing) = self.layouts.iter().find(|known| ***known == layout) {
            self.stats.layouts_reused += 1;
            return Rc::clone(existing);
        }
        let interned = Rc::new(layout);
        self.layouts.push(Rc::clone(&interned));
        LayoutInterned {
            fields: interned.fields().len(),
            byte_size: interned.byte_size(),
            total: self.layouts.len(),
        }
        .log();
        interned
    }

    pub fn bytes_in_use(&self) -> u64 {
        self.bytes_in_use
    }

    /// Number of checked-out handles.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.slots.len(),
            outstanding: self.outstanding,
            bytes_in_use: self.bytes_in_use,
            layouts_interned: self.layouts.len(),
            ..self.stats.clone()
        }
    }

    fn check_budget(&self, bytes: u64) -> Result<(), PoolError> {
        match self.bytes_in_use.checked_add(bytes) {
            Some(total) if total <= self.settings.budget_bytes => Ok(()),
            _ => Err(self.out_of_budget(bytes)),
        }
    }

    /// Sample bytes of a trace with `nsamples` samples. A count too large to express in
    /// bytes can never fit the budget.
    fn sample_bytes(&self, nsamples: usize) -> Result<u64, PoolError> {
        nsamples
            .checked_mul(std::mem::size_of::<f32>())
            .and_then(|bytes| u64::try_from(bytes).ok())
            .ok_or_else(|| self.out_of_budget(u64::MAX))
    }

    fn out_of_budget(&self, requested: u64) -> PoolError {
        PoolError::OutOfBudget {
            requested,
            in_use: self.bytes_in_use,
            budget: self.settings.budget_bytes,
        }
    }

    fn grow(&mut self) {
        let added = self.next_growth;
        let start = self.slots.len();
        self.slots.reserve(added);
        for index in start..start + added {
            self.slots.push(Slot {
                trace: Trace::empty(Rc::clone(&self.empty_layout)),
                checked_out: false,
            });
            self.free.push(index);
        }
        // Lowest index is handed out first.
        self.free.reverse();
        self.next_growth += self.settings.growth_increment;
        self.stats.growth_events += 1;

        PoolGrown {
            added,
            capacity: self.slots.len(),
            next_increment: self.next_growth,
        }
        .log();
    }
}

fn two_slots_mut(slots: &mut [Slot], a: usize, b: usize) -> (&mut Slot, &mut Slot) {
    if a < b {
        let (left, right) = slots.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = slots.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::FieldType;

    fn settings(budget_bytes: u64) -> PoolSettings {
        PoolSettings {
            budget_bytes,
            initial_capacity: 2,
            growth_increment: 2,
        }
    }

    fn layout() -> Rc<HeaderLayout> {
        let mut layout = HeaderLayout::new();
        layout.declare("trcno", FieldType::Int, "").unwrap();
        Rc::new(layout)
    }

    #[test]
    fn test_acquire_and_release_track_bytes() {
        let mut pool = TracePool::new(settings(1024));
        let layout = layout();

        let a = pool.acquire(&layout, 10).unwrap();
        let b = pool.acquire(&layout, 5).unwrap();
        assert_eq!(pool.outstanding(), 2);
        assert_eq!(pool.bytes_in_use(), 60);

        pool.release(a).unwrap();
        assert_eq!(pool.bytes_in_use(), 20);
        pool.release(b).unwrap();
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.bytes_in_use(), 0);
    }

    #[test]
    fn test_double_release_is_rejected() {
        let mut pool = TracePool::new(settings(1024));
        let handle = pool.acquire(&layout(), 1).unwrap();
        pool.release(handle).unwrap();
        assert_eq!(pool.release(handle), Err(PoolError::DoubleRelease(handle)));
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn test_unknown_handle_is_rejected() {
        let mut pool = TracePool::new(settings(1024));
        let foreign = TraceHandle(99);
        assert_eq!(pool.release(foreign), Err(PoolError::UnknownHandle(foreign)));
        assert!(pool.get(foreign).is_err());
    }

    #[test]
    fn test_use_after_release_is_rejected() {
        let mut pool = TracePool::new(settings(1024));
        let handle = pool.acquire(&layout(), 1).unwrap();
        pool.release(handle).unwrap();
        assert_eq!(pool.get(handle).unwrap_err(), PoolError::NotCheckedOut(handle));
    }

    #[test]
    fn test_budget_is_never_exceeded() {
        // Ten samples per trace is 40 bytes; the budget allows three traces.
        let mut pool = TracePool::new(settings(120));
        let layout = layout();
        let mut held = Vec::new();

        for step in 0..20 {
            if step % 3 == 2 {
                if let Some(handle) = held.pop() {
                    pool.release(handle).unwrap();
                }
                continue;
            }
            match pool.acquire(&layout, 10) {
                Ok(handle) => held.push(handle),
                Err(PoolError::OutOfBudget { budget, .. }) => assert_eq!(budget, 120),
                Err(other) => panic!("unexpected error {other}"),
            }
            assert!(pool.bytes_in_use() <= 120);
            assert!(pool.outstanding() <= 3);
        }
    }

    #[test]
    fn test_out_of_budget_message_mentions_ensembles() {
        let mut pool = TracePool::new(settings(8));
        let err = pool.acquire(&layout(), 4).unwrap_err();
        assert!(err.to_string().contains("unbounded ensemble"));
    }

    #[test]
    fn test_growth_uses_increasing_increments() {
        let mut pool = TracePool::new(settings(u64::MAX));
        let layout = layout();
        let mut held = Vec::new();

        held.push(pool.acquire(&layout, 1).unwrap());
        assert_eq!(pool.capacity(), 2);
        for _ in 0..2 {
            held.push(pool.acquire(&layout, 1).unwrap());
        }
        assert_eq!(pool.capacity(), 6);
        for _ in 0..4 {
            held.push(pool.acquire(&layout, 1).unwrap());
        }
        assert_eq!(pool.capacity(), 12);
        assert_eq!(pool.stats().growth_events, 3);
    }

    #[test]
    fn test_recycled_slots_are_reset() {
        let mut pool = TracePool::new(settings(1024));
        let layout = layout();
        let handle = pool.acquire(&layout, 3).unwrap();
        {
            let trace = pool.get_mut(handle).unwrap();
            trace.set_int("trcno", 42).unwrap();
            trace.samples_mut()[0] = 1.0;
        }
        let first_id = pool.get(handle).unwrap().id();
        pool.release(handle).unwrap();

        let again = pool.acquire(&layout, 2).unwrap();
        assert_eq!(again, handle);
        let trace = pool.get(again).unwrap();
        assert_eq!(trace.get_int("trcno").unwrap(), 0);
        assert_eq!(trace.samples(), &[0.0, 0.0]);
        assert!(trace.id() > first_id);
    }

    #[test]
    fn test_duplicate_copies_contents() {
        let mut pool = TracePool::new(settings(1024));
        let layout = layout();
        let original = pool.acquire(&layout, 2).unwrap();
        {
            let trace = pool.get_mut(original).unwrap();
            trace.set_int("trcno", 3).unwrap();
            trace.samples_mut().copy_from_slice(&[1.0, 2.0]);
        }

        let copy = pool.duplicate(original).unwrap();
        assert_ne!(copy, original);
        let copied = pool.get(copy).unwrap();
        assert_eq!(copied.get_int("trcno").unwrap(), 3);
        assert_eq!(copied.samples(), &[1.0, 2.0]);
        assert_ne!(copied.id(), pool.get(original).unwrap().id());
        assert_eq!(pool.bytes_in_use(), 16);
    }

    #[test]
    fn test_resize_updates_accounting_and_budget() {
        let mut pool = TracePool::new(settings(40));
        let handle = pool.acquire(&layout(), 5).unwrap();
        pool.resize(handle, 8).unwrap();
        assert_eq!(pool.bytes_in_use(), 32);
        assert!(matches!(
            pool.resize(handle, 20),
            Err(PoolError::OutOfBudget { .. })
        ));
        pool.resize(handle, 1).unwrap();
        assert_eq!(pool.bytes_in_use(), 4);
    }

    #[test]
    fn test_oversized_sample_counts_are_out_of_budget() {
        let mut pool = TracePool::new(settings(u64::MAX));
        let layout = layout();

        let err = pool.acquire(&layout, usize::MAX / 2).unwrap_err();
        assert!(matches!(err, PoolError::OutOfBudget { budget: u64::MAX, .. }));
        assert_eq!(pool.outstanding(), 0);

        let handle = pool.acquire(&layout, 4).unwrap();
        assert!(matches!(
            pool.resize(handle, usize::MAX / 2),
            Err(PoolError::OutOfBudget { .. })
        ));
        assert!(matches!(
            pool.acquire(&layout, usize::MAX / 4 - 1),
            Err(PoolError::OutOfBudget { .. })
        ));
        assert_eq!(pool.bytes_in_use(), 16);
        assert_eq!(pool.get(handle).unwrap().nsamples(), 4);
    }

    #[test]
    fn test_intern_layout_reuses_identical_layouts() {
        let mut pool = TracePool::new(settings(1024));
        let mut a = HeaderLayout::new();
        a.declare("x", FieldType::Int, "").unwrap();
        let b = a.clone();

        let first = pool.intern_layout(a);
        let second = pool.intern_layout(b);
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(pool.stats().layouts_interned, 1);
        assert_eq!(pool.stats().layouts_reused, 1);
    }
}
