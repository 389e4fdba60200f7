// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::cell::RefCell;
use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::rc::Rc;

use crate::errors::ModuleError;
use crate::observability::messages::StructuredLog;

/// Line-oriented, append-only text log of a flow run.
///
/// Module code receives a `&mut FlowLog` in every call. Lines are prefixed with the name
/// of the module currently being called and are mirrored to `tracing` at the matching
/// level, so the same message shows up in the run log and in structured diagnostics.
pub struct FlowLog {
    sink: Box<dyn Write>,
    context: Option<String>,
    warnings: usize,
    errors: usize,
    sink_failed: bool,
}

impl FlowLog {
    pub fn new(sink: Box<dyn Write>) -> Self {
        Self {
            sink,
            context: None,
            warnings: 0,
            errors: 0,
            sink_failed: false,
        }
    }

    /// A log that only mirrors to `tracing`.
    pub fn discard() -> Self {
        Self::new(Box::new(io::sink()))
    }

    pub fn to_file(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(Box::new(BufWriter::new(file))))
    }

    /// Prefix following lines with `module`, or clear the prefix.
    pub fn set_context(&mut self, module: Option<&str>) {
        self.context = module.map(str::to_string);
    }

    /// Append one informational line.
    pub fn line(&mut self, message: impl Display) {
        let text = self.format(&message);
        tracing::info!(target: "seisflow::flow_log", "{}", text);
        self.emit(&text, true);
    }

    /// Append text without a line break.
    pub fn write(&mut self, text: impl Display) {
        let text = text.to_string();
        tracing::debug!(target: "seisflow::flow_log", "{}", text);
        self.emit(&text, false);
    }

    pub fn warning(&mut self, message: impl Display) {
        self.warnings += 1;
        let text = self.format(&format_args!("WARNING: {}", message));
        tracing::warn!(target: "seisflow::flow_log", "{}", text);
        self.emit(&text, true);
    }

    /// Record an engine warning: the text goes to the sink, the structured event to
    /// `tracing`.
    pub fn warning_event<M>(&mut self, message: &M)
    where
        M: StructuredLog + Display,
    {
        self.warnings += 1;
        let text = self.format(&format_args!("WARNING: {}", message));
        message.log();
        self.emit(&text, true);
    }

    /// Log an error and hand back the matching [`ModuleError::Fatal`].
    ///
    /// ```
    /// use seisflow::errors::ModuleError;
    /// use seisflow::observability::FlowLog;
    ///
    /// fn check(log: &mut FlowLog, factor: f64) -> Result<(), ModuleError> {
    ///     if factor == 0.0 {
    ///         return log.error("factor must not be zero");
    ///     }
    ///     Ok(())
    /// }
    ///
    /// assert!(check(&mut FlowLog::discard(), 0.0).is_err());
    /// ```
    pub fn error<T>(&mut self, message: impl Display) -> Result<T, ModuleError> {
        self.errors += 1;
        let message = message.to_string();
        let text = self.format(&format_args!("ERROR: {}", message));
        tracing::error!(target: "seisflow::flow_log", "{}", text);
        self.emit(&text, true);
        Err(ModuleError::Fatal(message))
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn flush(&mut self) {
        if self.sink.flush().is_err() {
            self.report_sink_failure();
        }
    }

    fn format(&self, message: &dyn Display) -> String {
        match &self.context {
            Some(module) => format!("[{}] {}", module, message),
            None => message.to_string(),
        }
    }

    fn emit(&mut self, text: &str, newline: bool) {
        if self.sink_failed {
            return;
        }
        let result = if newline {
            writeln!(self.sink, "{}", text)
        } else {
            write!(self.sink, "{}", text)
        };
        if result.is_err() {
            self.report_sink_failure();
        }
    }

    fn report_sink_failure(&mut self) {
        if !self.sink_failed {
            self.sink_failed = true;
            tracing::warn!("flow log sink failed; further lines go to tracing only");
        }
    }
}

impl Drop for FlowLog {
    fn drop(&mut self) {
        let _ = self.sink.flush();
    }
}

/// Shared in-memory sink, handy for tests and for embedding the log in a summary.
#[derive(Clone, Default)]
pub struct LogBuffer {
    bytes: Rc<RefCell<Vec<u8>>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.borrow()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
