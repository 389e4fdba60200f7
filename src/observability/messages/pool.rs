// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the trace pool.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// The pool ran out of free slots and created new ones.
///
/// # Log Level
/// `debug!`
pub struct PoolGrown {
    pub added: usize,
    pub capacity: usize,
    pub next_increment: usize,
}

impl Display for PoolGrown {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Trace pool grew by {} slots to {} (next growth {})",
            self.added, self.capacity, self.next_increment
        )
    }
}

impl StructuredLog for PoolGrown {
    fn log(&self) {
        tracing::debug!(
            added = self.added,
            capacity = self.capacity,
            next_increment = self.next_increment,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("pool_grown", span_name = name, capacity = self.capacity)
    }
}

/// A new header layout entered the pool's layout arena.
///
/// # Log Level
/// `trace!`
pub struct LayoutInterned {
    pub fields: usize,
    pub byte_size: usize,
    pub total: usize,
}

impl Display for LayoutInterned {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Interned header layout with {} fields ({} bytes), {} layouts known",
            self.fields, self.byte_size, self.total
        )
    }
}

impl StructuredLog for LayoutInterned {
    fn log(&self) {
        tracing::trace!(
            fields = self.fields,
            byte_size = self.byte_size,
            total = self.total,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!("layout_interned", span_name = name, total = self.total)
    }
}
