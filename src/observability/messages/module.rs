// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for per-module scheduling events.
//!
//! Logic errors that the engine can recover from (an out-of-range output port, an
//! impossible retain count) are clamped and reported through the warnings below.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// One processing call finished.
///
/// # Log Level
/// `trace!` - Emitted for every call
pub struct ModuleSubmitted<'a> {
    pub module: &'a str,
    pub index: usize,
    pub batch_size: usize,
    pub produced: usize,
    pub retained: usize,
    pub forced: bool,
}

impl Display for ModuleSubmitted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Module #{} '{}' called with {} traces{}: {} produced, {} retained",
            self.index,
            self.module,
            self.batch_size,
            if self.forced { " (forced)" } else { "" },
            self.produced,
            self.retained
        )
    }
}

impl StructuredLog for ModuleSubmitted<'_> {
    fn log(&self) {
        tracing::trace!(
            module = self.module,
            index = self.index,
            batch_size = self.batch_size,
            produced = self.produced,
            retained = self.retained,
            forced = self.forced,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!(
            "submit",
            span_name = name,
            module = self.module,
            index = self.index,
            batch_size = self.batch_size,
        )
    }
}

/// A multi-trace module asked to retain more traces than its batch held.
///
/// # Log Level
/// `warn!` - Module logic error, clamped
///
/// # Example
/// ```
/// use seisflow::observability::messages::module::RetainCountClamped;
///
/// let msg = RetainCountClamped {
///     module: "STACK",
///     requested: 12,
///     batch_size: 10,
///     clamped_to: 10,
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct RetainCountClamped<'a> {
    pub module: &'a str,
    pub requested: usize,
    pub batch_size: usize,
    pub clamped_to: usize,
}

impl Display for RetainCountClamped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Module '{}' asked to keep {} traces of a batch of {}; keeping {}",
            self.module, self.requested, self.batch_size, self.clamped_to
        )
    }
}

impl StructuredLog for RetainCountClamped<'_> {
    fn log(&self) {
        tracing::warn!(
            module = self.module,
            requested = self.requested,
            batch_size = self.batch_size,
            clamped_to = self.clamped_to,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "retain_clamped",
            span_name = name,
            module = self.module,
            requested = self.requested,
        )
    }
}

/// A module returned an output port it does not have.
///
/// # Log Level
/// `warn!` - Module logic error, clamped
pub struct OutputPortClamped<'a> {
    pub module: &'a str,
    pub requested: usize,
    pub port_count: usize,
}

impl Display for OutputPortClamped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Module '{}' selected output port {} but has {} port(s); using port {}",
            self.module,
            self.requested,
            self.port_count,
            self.port_count.saturating_sub(1)
        )
    }
}

impl StructuredLog for OutputPortClamped<'_> {
    fn log(&self) {
        tracing::warn!(
            module = self.module,
            requested = self.requested,
            port_count = self.port_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "port_clamped",
            span_name = name,
            module = self.module,
            requested = self.requested,
        )
    }
}

/// A call kept every trace of a batch that cannot grow any more; the engine flushes
/// them instead of calling the module again with the same batch.
///
/// # Log Level
/// `warn!` - Module logic error, clamped
pub struct ForcedRetentionFlushed<'a> {
    pub module: &'a str,
    pub retained: usize,
}

impl Display for ForcedRetentionFlushed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Module '{}' kept all {} traces without taking new ones; flushing them downstream",
            self.module, self.retained
        )
    }
}

impl StructuredLog for ForcedRetentionFlushed<'_> {
    fn log(&self) {
        tracing::warn!(module = self.module, retained = self.retained, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("forced_flush", span_name = name, module = self.module)
    }
}

/// A declared ensemble key does not exist in the module's merged header layout.
///
/// # Log Level
/// `warn!` - Configuration degraded, run continues
pub struct EnsembleKeyDropped<'a> {
    pub module: &'a str,
    pub key: &'a str,
}

impl Display for EnsembleKeyDropped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Module '{}': ensemble key '{}' is not a header field here and is ignored",
            self.module, self.key
        )
    }
}

impl StructuredLog for EnsembleKeyDropped<'_> {
    fn log(&self) {
        tracing::warn!(module = self.module, key = self.key, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "ensemble_key_dropped",
            span_name = name,
            module = self.module,
            key = self.key,
        )
    }
}
