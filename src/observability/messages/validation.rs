// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for flow description and graph diagnostics.
//!
//! This module contains message types for logging events related to:
//! * Unreachable modules in the flow graph
//! * Lookup tables loaded from side files
//! * Textual substitutions declared with `&define`

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A module is not reachable from any other module.
///
/// # Log Level
/// `warn!` - Dead code in the flow, not a runtime hazard
///
/// # Example
/// ```
/// use seisflow::observability::messages::validation::UnreachableModule;
///
/// let msg = UnreachableModule {
///     module: "SCALE",
///     index: 4,
///     line: 17,
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct UnreachableModule<'a> {
    pub module: &'a str,
    pub index: usize,
    pub line: usize,
}

impl Display for UnreachableModule<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Module #{} '{}' (line {}) cannot be reached by any trace and will not run",
            self.index, self.module, self.line
        )
    }
}

impl StructuredLog for UnreachableModule<'_> {
    fn log(&self) {
        tracing::warn!(
            module = self.module,
            index = self.index,
            line = self.line,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "unreachable_module",
            span_name = name,
            module = self.module,
            index = self.index,
        )
    }
}

/// A lookup table was read from its side file.
///
/// # Log Level
/// `debug!`
pub struct TableLoaded<'a> {
    pub name: &'a str,
    pub path: &'a str,
    pub rows: usize,
}

impl Display for TableLoaded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Loaded table '{}' from {}: {} rows", self.name, self.path, self.rows)
    }
}

impl StructuredLog for TableLoaded<'_> {
    fn log(&self) {
        tracing::debug!(name = self.name, path = self.path, rows = self.rows, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("table_loaded", span_name = name, table = self.name)
    }
}

/// A `&define` was declared.
///
/// # Log Level
/// `trace!`
pub struct DefineDeclared<'a> {
    pub name: &'a str,
    pub value: &'a str,
    pub line: usize,
}

impl Display for DefineDeclared<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Line {}: &{}& = '{}'", self.line, self.name, self.value)
    }
}

impl StructuredLog for DefineDeclared<'_> {
    fn log(&self) {
        tracing::trace!(name = self.name, value = self.value, line = self.line, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!("define", span_name = name, define = self.name)
    }
}
