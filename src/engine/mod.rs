// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod ensemble;
pub mod graph;
mod module;
pub mod scheduler;


pub use ensemble::EnsembleKey;
pub use graph::{build_graph, FlowGraph, GraphNode};
pub(crate) use module::ModuleNode;
pub use module::ModuleStats;
pub use scheduler::{FlowExecutor, ModuleSummary, RunSummary};
