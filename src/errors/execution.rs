// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use super::{ConfigError, ModuleError, PoolError};

/// Fatal errors raised while traces are flowing.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// A module call returned an error.
    #[error("Module '{module}' (#{index}) failed: {source}")]
    ModuleFailed {
        module: String,
        index: usize,
        #[source]
        source: ModuleError,
    },

    /// The scheduler itself hit a pool failure while moving traces.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// An invariant of the scheduler was violated.
    #[error("Internal scheduler error: {0}")]
    Internal(String),
}

/// Top-level error of one flow run.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// The run itself succeeded but at least one module failed to clean up.
    #[error("Cleanup failed for module '{module}': {source}")]
    Cleanup {
        module: String,
        #[source]
        source: ModuleError,
    },
}

impl FlowError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            FlowError::Config(_) => 1,
            FlowError::Execution(_) => 2,
            FlowError::Cleanup { .. } => 3,
        }
    }
}
