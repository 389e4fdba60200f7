// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use crate::trace::TraceHandle;

/// Errors from the trace pool.
///
/// Every variant is fatal for the run: the pool is the single owner of trace memory, so a
/// violated checkout invariant means the ownership bookkeeping can no longer be trusted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoolError {
    /// Checking out another trace would exceed the configured memory ceiling.
    #[error(
        "Trace pool out of budget: {requested} more bytes requested with {in_use} of {budget} bytes in use. \
The most likely cause is a module buffering an unbounded ensemble; check the ensemble keys \
and trace ordering of the input, or raise the memory budget"
    )]
    OutOfBudget {
        requested: u64,
        in_use: u64,
        budget: u64,
    },

    /// A handle was released while it was not checked out.
    #[error("Trace {0} released twice")]
    DoubleRelease(TraceHandle),

    /// A handle refers to no slot of this pool.
    #[error("Trace {0} does not belong to this pool")]
    UnknownHandle(TraceHandle),

    /// A handle was used for access while its slot was free.
    #[error("Trace {0} used after it was returned to the pool")]
    NotCheckedOut(TraceHandle),
}
