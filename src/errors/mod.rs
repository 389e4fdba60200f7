// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod execution;
mod header;
mod module;
mod pool;

pub use config::ConfigError;
pub use execution::{ExecutionError, FlowError};
pub use header::HeaderError;
pub use module::ModuleError;
pub use pool::PoolError;
