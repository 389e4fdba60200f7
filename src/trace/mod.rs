// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Trace data model and the pooled memory that backs it.
//!
//! * [`HeaderLayout`] describes the named, typed, byte-offset header fields shared by all
//!   traces at one point of the flow graph.
//! * [`Trace`] carries a header and a sample buffer, plus a shared reference to its layout.
//! * [`TracePool`] is the only allocator of traces. Modules never own a trace directly;
//!   they hold [`TraceHandle`]s that index into the pool.
//! * [`Gather`] is the view a multi-trace module receives: the handles of its batch plus
//!   mutable access to the pool.

mod gather;
mod header;
mod header_layout;
mod pool;
mod super_header;
#[allow(clippy::module_inception)]
mod trace;

pub use gather::Gather;
pub use header::{Header, HeaderValue};
pub use header_layout::{FieldType, HeaderField, HeaderLayout};
pub use pool::{PoolSettings, PoolStats, TraceHandle, TracePool};
pub use super_header::SuperHeader;
pub use trace::Trace;
