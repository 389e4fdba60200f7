// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod flow_parser;
mod loader;
pub(crate) mod runtime;
mod validation;

pub mod consts;
pub mod params;
pub mod tables;

pub use flow_parser::{parse_flow_file, parse_flow_str, FlowDescription, ModuleDecl};
pub use loader::{load_config, parse_config, ConfigFormat, EngineConfig, PoolConfig};
pub use params::{ModuleParams, ParamKind, ParamSpec};
pub use runtime::RuntimeBuilder;
pub use tables::{Interpolation, LookupTable, TableSet};
pub use validation::validate_flow;
