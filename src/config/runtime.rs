// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::flow_parser::FlowDescription;
use crate::config::loader::EngineConfig;
use crate::config::validation::validate_flow;
use crate::engine::{build_graph, FlowExecutor, GraphNode, ModuleNode};
use crate::errors::ConfigError;
use crate::modules::ModuleRegistry;
use crate::trace::{PoolSettings, TracePool};

/// Flow runtime builder: turns a parsed flow into a ready-to-run [`FlowExecutor`].
///
/// The builder validates the flow, creates one module instance per `$NAME`, wires the
/// graph edges, and sizes the trace pool from the engine configuration.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use seisflow::config::{parse_flow_str, RuntimeBuilder};
/// use seisflow::observability::FlowLog;
///
/// let flow = parse_flow_str("$SYNTHETIC\n ntraces 4\n$SCALE\n factor 2\n", Path::new(".")).unwrap();
/// let mut executor = RuntimeBuilder::new().build(flow).unwrap();
///
/// let summary = executor.run(&mut FlowLog::discard()).unwrap();
/// assert_eq!(summary.traces_written, 4);
/// ```
pub struct RuntimeBuilder {
    registry: ModuleRegistry,
    settings: PoolSettings,
    warnings_as_errors: bool,
}

impl RuntimeBuilder {
    /// Builder over the built-in modules and default engine settings.
    pub fn new() -> Self {
        Self::with_registry(ModuleRegistry::with_builtins())
    }

    pub fn with_registry(registry: ModuleRegistry) -> Self {
        Self {
            registry,
            settings: PoolSettings::default(),
            warnings_as_errors: false,
        }
    }

    /// Apply pool sizing and warning policy from an engine configuration.
    pub fn with_config(mut self, config: &EngineConfig) -> Self {
        self.settings = config.pool_settings();
        self.warnings_as_errors = config.warnings_as_errors();
        self
    }

    pub fn with_pool_settings(mut self, settings: PoolSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn warnings_as_errors(mut self, enabled: bool) -> Self {
        self.warnings_as_errors = enabled;
        self
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Register additional modules before building.
    pub fn registry_mut(&mut self) -> &mut ModuleRegistry {
        &mut self.registry
    }

    /// Validate `flow` and assemble its executor.
    pub fn build(&self, flow: FlowDescription) -> Result<FlowExecutor, ConfigError> {
        validate_flow(&flow, &self.registry).map_err(ConfigError::from_list)?;
        let label = flow.label();

        let mut nodes = Vec::with_capacity(flow.modules.len());
        for (index, decl) in flow.modules.into_iter().enumerate() {
            let module = self
                .registry
                .create(&decl.name)
                .ok_or_else(|| ConfigError::UnknownModule {
                    name: decl.name.clone(),
                    line: decl.line,
                })?;
            nodes.push(ModuleNode::new(index, decl.line, &decl.name, decl.params, module));
        }

        wire(&mut nodes)?;

        Ok(FlowExecutor::new(
            label,
            nodes,
            TracePool::new(self.settings),
            flow.tables,
            self.warnings_as_errors,
        ))
    }
}

/// Connect the nodes along the edges of the flow graph.
pub(crate) fn wire(nodes: &mut [ModuleNode]) -> Result<(), ConfigError> {
    let graph_nodes: Vec<GraphNode> = nodes
        .iter()
        .map(|node| GraphNode {
            name: node.name.clone(),
            line: node.line,
            role: node.role,
        })
        .collect();
    let graph = build_graph(&graph_nodes)?;

    for (index, node) in nodes.iter_mut().enumerate() {
        node.next = graph.next[index].clone();
        node.prev = graph.prev[index].clone();
        node.reachable = graph.reachable[index];
    }
    Ok(())
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
