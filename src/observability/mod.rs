// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and the user-facing flow log.
//!
//! Engine diagnostics are emitted through `tracing`. Every event is a message struct in
//! [`messages`] with a `Display` implementation and a [`messages::StructuredLog`]
//! implementation, which keeps message text out of the engine code and attaches the
//! event's values as structured fields.
//!
//! Messages are organized by subsystem:
//! * `messages::engine` - flow lifecycle: initialization, execution, cleanup
//! * `messages::module` - per-module scheduling events and clamped logic errors
//! * `messages::pool` - trace pool growth and layout interning
//! * `messages::validation` - flow graph diagnostics
//!
//! [`FlowLog`] is the line-oriented text log shared by the engine and by module code.
//! Every line written to it is mirrored to `tracing` as well.
//!
//! # Usage
//!
//! ```rust
//! use seisflow::observability::messages::engine::ExecutionStarted;
//! use seisflow::observability::messages::StructuredLog;
//!
//! let msg = ExecutionStarted {
//!     input_module: "SYNTHETIC",
//!     module_count: 3,
//! };
//!
//! msg.log();
//! ```

mod logger;
pub mod messages;

pub use logger::{FlowLog, LogBuffer};
