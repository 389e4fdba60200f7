// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the flow lifecycle.
//!
//! This module contains message types for logging events related to:
//! * The initialization pass over all modules
//! * The execution pass (start, end-of-input drain, completion, failure)
//! * The cleanup pass

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Initialization pass started.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use seisflow::observability::messages::engine::InitializationStarted;
///
/// let msg = InitializationStarted {
///     flow: "demo.flow",
///     module_count: 4,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct InitializationStarted<'a> {
    pub flow: &'a str,
    pub module_count: usize,
}

impl Display for InitializationStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Initializing flow '{}': {} modules",
            self.flow, self.module_count
        )
    }
}

impl StructuredLog for InitializationStarted<'_> {
    fn log(&self) {
        tracing::info!(
            flow = self.flow,
            module_count = self.module_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "initialization",
            span_name = name,
            flow = self.flow,
            module_count = self.module_count,
        )
    }
}

/// One module finished its init call.
///
/// # Log Level
/// `debug!` - Per-module detail
pub struct ModuleInitialized<'a> {
    pub module: &'a str,
    pub index: usize,
    pub execution_type: &'a str,
    pub nsamples: usize,
    pub sample_int: f64,
    pub header_fields: usize,
}

impl Display for ModuleInitialized<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Module #{} '{}' initialized: {} execution, {} samples at {} ms, {} header fields",
            self.index,
            self.module,
            self.execution_type,
            self.nsamples,
            self.sample_int,
            self.header_fields
        )
    }
}

impl StructuredLog for ModuleInitialized<'_> {
    fn log(&self) {
        tracing::debug!(
            module = self.module,
            index = self.index,
            execution_type = self.execution_type,
            nsamples = self.nsamples,
            sample_int = self.sample_int,
            header_fields = self.header_fields,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "module_init",
            span_name = name,
            module = self.module,
            index = self.index,
        )
    }
}

/// Execution pass started.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use seisflow::observability::messages::engine::ExecutionStarted;
///
/// let msg = ExecutionStarted {
///     input_module: "SYNTHETIC",
///     module_count: 5,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct ExecutionStarted<'a> {
    pub input_module: &'a str,
    pub module_count: usize,
}

impl Display for ExecutionStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting flow execution from input module '{}' over {} modules",
            self.input_module, self.module_count
        )
    }
}

impl StructuredLog for ExecutionStarted<'_> {
    fn log(&self) {
        tracing::info!(
            input_module = self.input_module,
            module_count = self.module_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "execution",
            span_name = name,
            input_module = self.input_module,
            module_count = self.module_count,
        )
    }
}

/// The input module reported that no more traces will come.
///
/// # Log Level
/// `debug!` - Scheduler detail
pub struct InputFinished {
    pub traces_read: u64,
}

impl Display for InputFinished {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Input finished after {} traces, draining remaining module state",
            self.traces_read
        )
    }
}

impl StructuredLog for InputFinished {
    fn log(&self) {
        tracing::debug!(traces_read = self.traces_read, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("drain", span_name = name, traces_read = self.traces_read)
    }
}

/// Execution completed successfully.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use seisflow::observability::messages::engine::ExecutionCompleted;
/// use std::time::Duration;
///
/// let msg = ExecutionCompleted {
///     traces_read: 240,
///     traces_written: 120,
///     peak_bytes: 1 << 20,
///     duration: Duration::from_millis(250),
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct ExecutionCompleted {
    pub traces_read: u64,
    pub traces_written: u64,
    pub peak_bytes: u64,
    pub duration: std::time::Duration,
}

impl Display for ExecutionCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Flow execution completed: {} traces read, {} reached the end of the flow, peak trace memory {} bytes, in {:?}",
            self.traces_read, self.traces_written, self.peak_bytes, self.duration
        )
    }
}

impl StructuredLog for ExecutionCompleted {
    fn log(&self) {
        tracing::info!(
            traces_read = self.traces_read,
            traces_written = self.traces_written,
            peak_bytes = self.peak_bytes,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "execution_completed",
            span_name = name,
            traces_read = self.traces_read,
            duration = ?self.duration,
        )
    }
}

/// The run failed with a fatal error.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct FlowFailed<'a> {
    pub phase: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for FlowFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Flow failed during {}: {}", self.phase, self.error)
    }
}

impl StructuredLog for FlowFailed<'_> {
    fn log(&self) {
        tracing::error!(
            phase = self.phase,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "flow_failed",
            span_name = name,
            phase = self.phase,
            error = %self.error,
        )
    }
}

/// A module failed to release its state in the cleanup pass.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct CleanupFailed<'a> {
    pub module: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for CleanupFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Module '{}' failed to clean up: {}", self.module, self.error)
    }
}

impl StructuredLog for CleanupFailed<'_> {
    fn log(&self) {
        tracing::error!(
            module = self.module,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "cleanup_failed",
            span_name = name,
            module = self.module,
        )
    }
}

/// Traces still held by modules were returned to the pool after a failure.
///
/// # Log Level
/// `warn!`
pub struct TracesReclaimed {
    pub count: usize,
}

impl Display for TracesReclaimed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Reclaimed {} traces still held by modules", self.count)
    }
}

impl StructuredLog for TracesReclaimed {
    fn log(&self) {
        tracing::warn!(count = self.count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("reclaim", span_name = name, count = self.count)
    }
}
