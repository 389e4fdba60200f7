// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Batch seismic trace flow engine.
//!
//! A flow is a list of modules read from a text description. Traces enter through the
//! first module, are pushed through the rest one batch at a time, and leave the flow at
//! the last module. Conditional (`IF`/`ELSEIF`/`ELSE`/`ENDIF`) and duplicating
//! (`SPLIT`/`ENDSPLIT`) blocks turn the list into a graph.
//!
//! ```
//! use std::path::Path;
//! use seisflow::config::{parse_flow_str, RuntimeBuilder};
//! use seisflow::observability::FlowLog;
//!
//! let text = "\
//! $SYNTHETIC
//!  ntraces 6
//!  ens_size 3
//! $STACK
//! ";
//! let flow = parse_flow_str(text, Path::new(".")).unwrap();
//! let mut executor = RuntimeBuilder::new().build(flow).unwrap();
//! let summary = executor.run(&mut FlowLog::discard()).unwrap();
//!
//! assert_eq!(summary.traces_read, 6);
//! assert_eq!(summary.traces_written, 2);
//! ```

pub mod config;     // flow parsing, engine settings, runtime assembly
pub mod engine;     // graph and scheduler
pub mod errors;     // error handling
pub mod modules;    // module registry and built-in modules
pub mod observability;
pub mod trace;      // traces, headers and the trace pool
pub mod traits;     // module contract
