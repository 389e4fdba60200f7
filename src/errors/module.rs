// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors produced by module implementations.

use thiserror::Error;

use super::{HeaderError, PoolError};

/// Error type returned from every module call.
///
/// Module code propagates header and pool failures with `?`; fatal conditions detected
/// by the module itself go through [`crate::observability::FlowLog::error`], which logs
/// the message and yields [`ModuleError::Fatal`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModuleError {
    #[error("{0}")]
    Fatal(String),

    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    /// A parameter was present but its value could not be used.
    #[error("Parameter '{name}': {reason}")]
    Parameter { name: String, reason: String },

    /// The scheduler invoked a call shape the module does not implement.
    #[error("Module does not implement {0}")]
    UnsupportedCall(&'static str),
}
