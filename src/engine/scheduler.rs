// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Single-threaded flow scheduler.
//!
//! # Passes
//!
//! 1. **Initialization** in list order. Each module sees the merged layouts and
//!    super-headers of its input ports, so a module is initialized only after everything
//!    feeding it.
//! 2. **Execution**. The input module is asked for traces one call at a time. After every
//!    call the produced traces are pushed down the graph depth-first: a module that is
//!    ready is called, its outputs are queued at its successor, and the walk continues into
//!    the successor. Modules that are still ready afterwards are remembered on a stack and
//!    revisited once the walk below them comes to rest.
//! 3. **Drain** once the input is exhausted. Every module is visited again in list order
//!    and called with `force` until it holds no traces. List order is a topological order
//!    of the graph, so a module is forced only once all of its upstream modules are empty,
//!    whichever branch they sit on.
//! 4. **Cleanup** of every initialized module, also after a failure.
//!
//! Handles move between modules; samples are never copied except where a SPLIT duplicates
//! a trace.

use std::rc::Rc;
use std::time::Instant;

use serde::Serialize;

use crate::config::tables::TableSet;
use crate::engine::module::{ModuleNode, ModuleStats, PortOutputs};
use crate::errors::{ConfigError, ExecutionError, FlowError, ModuleError};
use crate::observability::messages::engine::{
    CleanupFailed, ExecutionCompleted, ExecutionStarted, FlowFailed, InitializationStarted,
    InputFinished, TracesReclaimed,
};
use crate::observability::messages::validation::UnreachableModule;
use crate::observability::messages::StructuredLog;
use crate::observability::FlowLog;
use crate::trace::{HeaderLayout, PoolStats, SuperHeader, TracePool};
use crate::traits::{ExecutionType, InputOutcome};

/// What a run did, for humans and for `--summary`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub flow: String,
    pub traces_read: u64,
    pub traces_written: u64,
    pub duration_ms: u64,
    pub warnings: usize,
    pub pool: PoolStats,
    pub modules: Vec<ModuleSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleSummary {
    pub index: usize,
    pub name: String,
    pub line: usize,
    pub execution_type: String,
    #[serde(flatten)]
    pub stats: ModuleStats,
}

pub struct FlowExecutor {
    label: String,
    nodes: Vec<ModuleNode>,
    pool: TracePool,
    tables: TableSet,
    warnings_as_errors: bool,
    traces_read: u64,
    traces_written: u64,
    duration_ms: u64,
    warnings: usize,
}

impl FlowExecutor {
    pub(crate) fn new(
        label: String,
        nodes: Vec<ModuleNode>,
        pool: TracePool,
        tables: TableSet,
        warnings_as_errors: bool,
    ) -> Self {
        Self {
            label,
            nodes,
            pool,
            tables,
            warnings_as_errors,
            traces_read: 0,
            traces_written: 0,
            duration_ms: 0,
            warnings: 0,
        }
    }

    /// Initialize, execute and clean up. Failures clean up what was initialized and return
    /// every trace to the pool before the error is handed back.
    pub fn run(&mut self, log: &mut FlowLog) -> Result<RunSummary, FlowError> {
        if let Err(err) = self.initialize(log) {
            self.abort("initialization", &err, log);
            return Err(err.into());
        }
        if let Err(err) = self.execute(log) {
            self.abort("execution", &err, log);
            return Err(err.into());
        }
        self.cleanup(log)?;
        self.warnings = log.warning_count();
        log.flush();
        Ok(self.summary())
    }

    /// Initialize and clean up without moving any trace.
    pub fn check(&mut self, log: &mut FlowLog) -> Result<(), FlowError> {
        if let Err(err) = self.initialize(log) {
            self.abort("initialization", &err, log);
            return Err(err.into());
        }
        self.cleanup(log)
    }

    pub fn initialize(&mut self, log: &mut FlowLog) -> Result<(), ConfigError> {
        let start_msg = InitializationStarted {
            flow: &self.label,
            module_count: self.nodes.len(),
        };
        let span = start_msg.span("flow_initialization");
        let _guard = span.enter();
        start_msg.log();
        let warnings_before = log.warning_count();

        if self.nodes.is_empty() {
            return Err(ConfigError::NoInputModule);
        }

        for index in 0..self.nodes.len() {
            if !self.nodes[index].reachable {
                let node = &self.nodes[index];
                log.warning_event(&UnreachableModule {
                    module: &node.name,
                    index,
                    line: node.line,
                });
                continue;
            }

            let inputs: Vec<(Rc<HeaderLayout>, SuperHeader)> = self.nodes[index]
                .prev
                .iter()
                .map(|prev| &self.nodes[*prev])
                .filter(|prev| prev.initialized)
                .map(|prev| (Rc::clone(prev.out_layout()), prev.super_header().clone()))
                .collect();

            let node = &mut self.nodes[index];
            node.initialize(&inputs, &mut self.pool, &self.tables, log)?;

            match (index, node.execution_type()) {
                (0, ExecutionType::Input) => {}
                (0, _) => return Err(ConfigError::NoInputModule),
                (_, ExecutionType::Input) => {
                    return Err(ConfigError::MisplacedInput {
                        module: node.name.clone(),
                        line: node.line,
                    })
                }
                _ => {}
            }
        }

        let warnings = log.warning_count() - warnings_before;
        if self.warnings_as_errors && warnings > 0 {
            return Err(ConfigError::WarningsAsErrors(warnings));
        }
        Ok(())
    }

    pub fn execute(&mut self, log: &mut FlowLog) -> Result<(), ExecutionError> {
        if self.nodes.is_empty() {
            return Err(ExecutionError::Internal("flow has no modules".to_string()));
        }
        let started = Instant::now();
        let start_msg = ExecutionStarted {
            input_module: &self.nodes[0].name,
            module_count: self.nodes.len(),
        };
        let span = start_msg.span("flow_execution");
        let _guard = span.enter();
        start_msg.log();

        let mut input_finished = false;
        while !input_finished {
            let (outcome, outputs) = self.nodes[0].submit_input(&mut self.pool, log)?;
            self.traces_read += outputs.iter().map(|port| port.len() as u64).sum::<u64>();
            input_finished = outcome == InputOutcome::Finished;

            let mut targets = self.forward(0, outputs)?;
            if input_finished {
                InputFinished {
                    traces_read: self.traces_read,
                }
                .log();
                if targets.is_empty() {
                    targets.extend(self.nodes[0].next.first().copied());
                }
            }
            self.walk(targets, input_finished, None, log)?;
        }

        for index in 1..self.nodes.len() {
            if self.nodes[index].initialized {
                self.walk(vec![index], true, Some(index), log)?;
            }
        }

        if let Some(node) = self.nodes.iter().find(|node| node.holding() > 0) {
            return Err(ExecutionError::Internal(format!(
                "module '{}' still holds {} traces after the drain",
                node.name,
                node.holding()
            )));
        }

        let elapsed = started.elapsed();
        self.duration_ms = elapsed.as_millis() as u64;
        ExecutionCompleted {
            traces_read: self.traces_read,
            traces_written: self.traces_written,
            peak_bytes: self.pool.stats().peak_bytes_in_use,
            duration: elapsed,
        }
        .log();
        Ok(())
    }

    /// Depth-first walk from `targets`.
    ///
    /// A module is forced only when the input is finished, the stack is empty and its
    /// index does not exceed `force_through`.
    fn walk(
        &mut self,
        targets: Vec<usize>,
        input_finished: bool,
        force_through: Option<usize>,
        log: &mut FlowLog,
    ) -> Result<(), ExecutionError> {
        let mut stack: Vec<usize> = Vec::new();
        let mut pending = targets;

        loop {
            let current = match next_target(&mut pending, &mut stack) {
                Some(current) => current,
                None => return Ok(()),
            };

            let force = input_finished
                && stack.is_empty()
                && force_through.is_some_and(|limit| current <= limit);

            if !self.nodes[current].is_ready(&self.pool, force)? {
                continue;
            }

            let outputs = self.nodes[current].submit(&mut self.pool, force, log)?;
            let mut successors = self.forward(current, outputs)?;

            if self.nodes[current].is_ready(&self.pool, force)? {
                stack.push(current);
            }
            if successors.is_empty() && input_finished {
                successors.extend(self.nodes[current].next.first().copied());
            }
            pending = successors;
        }
    }

    /// Queue outputs at the successors, or return them to the pool at the terminal module.
    /// Returns the successors that received traces, by port.
    fn forward(&mut self, from: usize, outputs: PortOutputs) -> Result<Vec<usize>, ExecutionError> {
        let mut targets = Vec::new();
        for (port, handles) in outputs.into_iter().enumerate() {
            if handles.is_empty() {
                continue;
            }
            match self.nodes[from].next.get(port).copied() {
                Some(successor) => {
                    let layout = Rc::clone(self.nodes[successor].exec_layout());
                    for handle in handles {
                        self.pool.rebind(handle, &layout)?;
                        self.nodes[successor].enqueue(handle);
                    }
                    if !targets.contains(&successor) {
                        targets.push(successor);
                    }
                }
                None => {
                    self.traces_written += handles.len() as u64;
                    self.pool.release_all(handles)?;
                }
            }
        }
        Ok(targets)
    }

    /// Call `cleanup` on every initialized module. All modules are called; the first
    /// failure is returned.
    pub fn cleanup(&mut self, log: &mut FlowLog) -> Result<(), FlowError> {
        let mut first_failure: Option<(String, ModuleError)> = None;

        for node in self.nodes.iter_mut().filter(|node| node.initialized) {
            node.initialized = false;
            if let Err(err) = node.cleanup(log) {
                CleanupFailed {
                    module: &node.name,
                    error: &err,
                }
                .log();
                log.line(format_args!("ERROR: cleanup of '{}' failed: {}", node.name, err));
                if first_failure.is_none() {
                    first_failure = Some((node.name.clone(), err));
                }
            }
        }

        match first_failure {
            Some((module, source)) => Err(FlowError::Cleanup { module, source }),
            None => Ok(()),
        }
    }

    fn abort(&mut self, phase: &str, err: &dyn std::error::Error, log: &mut FlowLog) {
        FlowFailed { phase, error: err }.log();
        log.line(format_args!("ERROR: flow failed during {}: {}", phase, err));

        let mut reclaimed = 0;
        for node in &mut self.nodes {
            for handle in node.take_all() {
                if self.pool.release(handle).is_ok() {
                    reclaimed += 1;
                }
            }
        }
        if reclaimed > 0 {
            TracesReclaimed { count: reclaimed }.log();
        }

        // The run already failed; cleanup problems are only logged.
        let _ = self.cleanup(log);
        log.flush();
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            flow: self.label.clone(),
            traces_read: self.traces_read,
            traces_written: self.traces_written,
            duration_ms: self.duration_ms,
            warnings: self.warnings,
            pool: self.pool.stats(),
            modules: self
                .nodes
                .iter()
                .map(|node| ModuleSummary {
                    index: node.index,
                    name: node.name.clone(),
                    line: node.line,
                    execution_type: node.execution_type().to_string(),
                    stats: node.stats.clone(),
                })
                .collect(),
        }
    }

    pub fn pool(&self) -> &TracePool {
        &self.pool
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|node| node.name.as_str())
    }
}

/// Continue with the first pending successor, stacking the others; otherwise resume the
/// most recently stacked module.
fn next_target(pending: &mut Vec<usize>, stack: &mut Vec<usize>) -> Option<usize> {
    if pending.is_empty() {
        return stack.pop();
    }
    let first = pending.remove(0);
    stack.extend(pending.drain(..).rev());
    Some(first)
}
