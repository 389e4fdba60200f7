// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for consistent, human-readable output and
//! [`StructuredLog`] to emit itself at its designated level with structured fields.

use tracing::Span;

pub mod engine;
pub mod module;
pub mod pool;
pub mod validation;

/// A log message that knows its level and structured fields.
pub trait StructuredLog {
    /// Emit the event at the message's level.
    fn log(&self);

    /// Open a span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}
