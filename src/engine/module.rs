// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Runtime node wrapping one module of the flow.
//!
//! A node owns the module's batch and queue, the layouts and super-header fixed during
//! initialization, and the edges to its neighbors. Traces are queued by the scheduler,
//! migrated into the batch according to the module's trace selection, processed, and the
//! leading part of the batch is returned as output.

use std::collections::VecDeque;
use std::rc::Rc;

use serde::Serialize;

use crate::config::params::{validate_params, ModuleParams};
use crate::config::tables::TableSet;
use crate::engine::ensemble::EnsembleKey;
use crate::errors::{ConfigError, ExecutionError, ModuleError};
use crate::observability::messages::engine::ModuleInitialized;
use crate::observability::messages::module::{
    EnsembleKeyDropped, ForcedRetentionFlushed, ModuleSubmitted, OutputPortClamped,
    RetainCountClamped,
};
use crate::observability::messages::StructuredLog;
use crate::observability::FlowLog;
use crate::trace::{FieldType, Gather, HeaderLayout, SuperHeader, TraceHandle, TracePool};
use crate::traits::{BlockRole, ExecEnv, ExecutionType, FlowModule, InitEnv, InputOutcome, TraceSelection};

/// Per-module counters reported in the run summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModuleStats {
    pub calls: u64,
    pub traces_in: u64,
    pub traces_out: u64,
    pub traces_discarded: u64,
}

/// Traces produced by one call, indexed by output port.
pub(crate) type PortOutputs = Vec<Vec<TraceHandle>>;

pub(crate) struct ModuleNode {
    pub(crate) name: String,
    pub(crate) index: usize,
    pub(crate) line: usize,
    pub(crate) role: Option<BlockRole>,
    /// Successor per output port.
    pub(crate) next: Vec<usize>,
    pub(crate) prev: Vec<usize>,
    pub(crate) reachable: bool,
    pub(crate) initialized: bool,
    pub(crate) stats: ModuleStats,
    module: Box<dyn FlowModule>,
    params: ModuleParams,
    execution_type: ExecutionType,
    output_ports: usize,
    in_nsamples: usize,
    exec_layout: Rc<HeaderLayout>,
    out_layout: Rc<HeaderLayout>,
    super_header: SuperHeader,
    batch: Vec<TraceHandle>,
    queue: VecDeque<TraceHandle>,
}

impl ModuleNode {
    pub(crate) fn new(
        index: usize,
        line: usize,
        name: &str,
        params: ModuleParams,
        module: Box<dyn FlowModule>,
    ) -> Self {
        let empty = Rc::new(HeaderLayout::new());
        Self {
            name: name.to_string(),
            index,
            line,
            role: module.block_role(),
            next: Vec::new(),
            prev: Vec::new(),
            reachable: true,
            initialized: false,
            stats: ModuleStats::default(),
            module,
            params,
            execution_type: ExecutionType::SingleTrace,
            output_ports: 1,
            in_nsamples: 0,
            exec_layout: Rc::clone(&empty),
            out_layout: empty,
            super_header: SuperHeader::default(),
            batch: Vec::new(),
            queue: VecDeque::new(),
        }
    }

    pub(crate) fn execution_type(&self) -> ExecutionType {
        self.execution_type
    }

    pub(crate) fn out_layout(&self) -> &Rc<HeaderLayout> {
        &self.out_layout
    }

    pub(crate) fn exec_layout(&self) -> &Rc<HeaderLayout> {
        &self.exec_layout
    }

    pub(crate) fn super_header(&self) -> &SuperHeader {
        &self.super_header
    }

    /// Traces waiting in the batch and the queue.
    pub(crate) fn holding(&self) -> usize {
        self.batch.len() + self.queue.len()
    }

    /// Run the module's init against the merged state of its input ports.
    pub(crate) fn initialize(
        &mut self,
        inputs: &[(Rc<HeaderLayout>, SuperHeader)],
        pool: &mut TracePool,
        tables: &TableSet,
        log: &mut FlowLog,
    ) -> Result<(), ConfigError> {
        let layouts: Vec<&HeaderLayout> = inputs.iter().map(|(layout, _)| layout.as_ref()).collect();
        let mut layout = HeaderLayout::merge(&layouts).map_err(|source| ConfigError::Header {
            module: self.name.clone(),
            source,
        })?;
        let mut super_header = merge_super_headers(&self.name, inputs)?;
        self.in_nsamples = super_header.nsamples;

        validate_params(&self.params, &self.module.params()).map_err(ConfigError::from_list)?;

        let mut deleted = Vec::new();
        let execution_type = {
            let mut env = InitEnv::new(&self.name, &mut layout, &mut deleted, &mut super_header, tables);
            log.set_context(Some(&self.name));
            let result = self.module.init(&self.params, &mut env, log);
            log.set_context(None);
            result.map_err(|source| ConfigError::ModuleInit {
                module: self.name.clone(),
                source,
            })?;
            env.execution_type()
        };

        if let ExecutionType::MultiTrace(TraceSelection::Fixed(0)) = execution_type {
            return Err(ConfigError::ModuleInit {
                module: self.name.clone(),
                source: ModuleError::Fatal("fixed trace selection needs at least one trace".into()),
            });
        }

        let mut kept_keys = Vec::with_capacity(super_header.ensemble_keys.len());
        for key in std::mem::take(&mut super_header.ensemble_keys) {
            match layout.field(&key).map(|field| field.field_type) {
                Some(FieldType::String(_)) => {
                    return Err(ConfigError::StringEnsembleKey {
                        module: self.name.clone(),
                        key,
                    })
                }
                Some(_) => kept_keys.push(key),
                None => log.warning_event(&EnsembleKeyDropped {
                    module: &self.name,
                    key: &key,
                }),
            }
        }
        super_header.ensemble_keys = kept_keys;

        if execution_type == ExecutionType::MultiTrace(TraceSelection::Ensemble)
            && super_header.ensemble_keys.is_empty()
        {
            log.warning(format_args!(
                "module '{}' selects ensembles but no ensemble keys are defined; all traces form one ensemble",
                self.name
            ));
        }

        let mut out = layout.clone();
        for name in &deleted {
            out.delete(name).map_err(|source| ConfigError::Header {
                module: self.name.clone(),
                source,
            })?;
        }
        self.exec_layout = pool.intern_layout(layout);
        self.out_layout = if deleted.is_empty() {
            Rc::clone(&self.exec_layout)
        } else {
            pool.intern_layout(out)
        };

        self.execution_type = execution_type;
        self.output_ports = match self.role {
            Some(role) if role.is_branching() => 2,
            _ => 1,
        };
        self.super_header = super_header;
        self.initialized = true;

        ModuleInitialized {
            module: &self.name,
            index: self.index,
            execution_type: &self.execution_type.to_string(),
            nsamples: self.super_header.nsamples,
            sample_int: self.super_header.sample_int,
            header_fields: self.out_layout.active_fields().count(),
        }
        .log();
        Ok(())
    }

    pub(crate) fn enqueue(&mut self, handle: TraceHandle) {
        self.stats.traces_in += 1;
        self.queue.push_back(handle);
    }

    pub(crate) fn is_ready(&self, pool: &TracePool, force: bool) -> Result<bool, ExecutionError> {
        let held = self.holding();
        Ok(match self.execution_type {
            ExecutionType::Input => true,
            ExecutionType::SingleTrace => held > 0,
            ExecutionType::MultiTrace(TraceSelection::Fixed(n)) => held >= n || (force && held > 0),
            ExecutionType::MultiTrace(TraceSelection::Ensemble) => {
                (force && held > 0) || self.ensemble_run(pool)?.1
            }
        })
    }

    /// Number of queued traces in the current ensemble, and whether a trace of another
    /// ensemble follows them.
    fn ensemble_run(&self, pool: &TracePool) -> Result<(usize, bool), ExecutionError> {
        let keys = &self.super_header.ensemble_keys;
        let head = match self.batch.first().or_else(|| self.queue.front()) {
            Some(handle) => *handle,
            None => return Ok((0, false)),
        };
        let current = self.key_of(pool, head, keys)?;

        for (position, handle) in self.queue.iter().enumerate() {
            if self.key_of(pool, *handle, keys)? != current {
                return Ok((position, true));
            }
        }
        Ok((self.queue.len(), false))
    }

    fn key_of(
        &self,
        pool: &TracePool,
        handle: TraceHandle,
        keys: &[String],
    ) -> Result<EnsembleKey, ExecutionError> {
        let trace = pool.get(handle)?;
        EnsembleKey::of(trace, keys).map_err(|source| self.failed(source.into()))
    }

    /// Move queued traces into the batch for the next call. Returns how many moved.
    fn migrate(&mut self, pool: &TracePool) -> Result<usize, ExecutionError> {
        let count = match self.execution_type {
            ExecutionType::MultiTrace(TraceSelection::Fixed(n)) => {
                n.saturating_sub(self.batch.len()).min(self.queue.len())
            }
            ExecutionType::MultiTrace(TraceSelection::Ensemble) => self.ensemble_run(pool)?.0,
            _ => 0,
        };
        self.batch.extend(self.queue.drain(..count));
        Ok(count)
    }

    /// Pull from an input module once.
    pub(crate) fn submit_input(
        &mut self,
        pool: &mut TracePool,
        log: &mut FlowLog,
    ) -> Result<(InputOutcome, PortOutputs), ExecutionError> {
        let outcome = {
            let mut gather = Gather::new(
                &mut self.batch,
                pool,
                &self.exec_layout,
                self.super_header.nsamples,
            );
            let env = ExecEnv {
                module: &self.name,
                index: self.index,
                super_header: &self.super_header,
                layout: &self.exec_layout,
                forced: false,
            };
            log.set_context(Some(&self.name));
            let result = self.module.exec_input(&mut gather, &env, log);
            log.set_context(None);
            result
        }
        .map_err(|source| self.failed(source))?;

        self.stats.calls += 1;
        let produced: Vec<TraceHandle> = self.batch.drain(..).collect();
        self.stats.traces_in += produced.len() as u64;
        let outputs = self.finish(pool, 0, produced)?;
        Ok((outcome, outputs))
    }

    /// One processing call of a single- or multi-trace module.
    pub(crate) fn submit(
        &mut self,
        pool: &mut TracePool,
        force: bool,
        log: &mut FlowLog,
    ) -> Result<PortOutputs, ExecutionError> {
        match self.execution_type {
            ExecutionType::Input => Err(ExecutionError::Internal(format!(
                "input module '{}' submitted as a processing module",
                self.name
            ))),
            ExecutionType::SingleTrace => self.submit_single(pool, force, log),
            ExecutionType::MultiTrace(_) => self.submit_multi(pool, force, log),
        }
    }

    fn submit_single(
        &mut self,
        pool: &mut TracePool,
        force: bool,
        log: &mut FlowLog,
    ) -> Result<PortOutputs, ExecutionError> {
        let handle = match self.batch.pop().or_else(|| self.queue.pop_front()) {
            Some(handle) => handle,
            None => return Ok(vec![Vec::new(); self.output_ports]),
        };

        let mut port = 0;
        let keep = {
            let env = ExecEnv {
                module: &self.name,
                index: self.index,
                super_header: &self.super_header,
                layout: &self.exec_layout,
                forced: force,
            };
            let trace = pool.get_mut(handle)?;
            log.set_context(Some(&self.name));
            let result = self.module.exec_single(trace, &mut port, &env, log);
            log.set_context(None);
            result
        };
        self.stats.calls += 1;

        let keep = match keep {
            Ok(keep) => keep,
            Err(source) => {
                // The trace is no longer reachable from any module.
                pool.release(handle)?;
                return Err(self.failed(source));
            }
        };

        let produced = if keep {
            vec![handle]
        } else {
            pool.release(handle)?;
            self.stats.traces_discarded += 1;
            Vec::new()
        };
        self.report(1, produced.len(), 0, force);
        self.finish(pool, self.clamp_port(port, log), produced)
    }

    fn submit_multi(
        &mut self,
        pool: &mut TracePool,
        force: bool,
        log: &mut FlowLog,
    ) -> Result<PortOutputs, ExecutionError> {
        let migrated = self.migrate(pool)?;
        let batch_size = self.batch.len();

        let mut port = 0;
        let mut num_to_keep = 0;
        let result = {
            let mut gather = Gather::new(&mut self.batch, pool, &self.exec_layout, self.in_nsamples);
            let env = ExecEnv {
                module: &self.name,
                index: self.index,
                super_header: &self.super_header,
                layout: &self.exec_layout,
                forced: force,
            };
            log.set_context(Some(&self.name));
            let result = self
                .module
                .exec_multi(&mut gather, &mut port, &mut num_to_keep, &env, log);
            log.set_context(None);
            result
        };
        result.map_err(|source| self.failed(source))?;
        self.stats.calls += 1;

        let len = self.batch.len();
        self.stats.traces_discarded += batch_size.saturating_sub(len) as u64;

        if num_to_keep > len {
            log.warning_event(&RetainCountClamped {
                module: &self.name,
                requested: num_to_keep,
                batch_size: len,
                clamped_to: len,
            });
            num_to_keep = len;
        }
        // A call that keeps everything without taking anything new would be repeated forever.
        if len > 0 && num_to_keep == len && (migrated == 0 || (force && self.queue.is_empty())) {
            log.warning_event(&ForcedRetentionFlushed {
                module: &self.name,
                retained: len,
            });
            num_to_keep = 0;
        }

        let produced: Vec<TraceHandle> = self.batch.drain(..len - num_to_keep).collect();
        self.report(batch_size, produced.len(), num_to_keep, force);
        self.finish(pool, self.clamp_port(port, log), produced)
    }

    fn clamp_port(&self, port: usize, log: &mut FlowLog) -> usize {
        if port < self.output_ports {
            return port;
        }
        log.warning_event(&OutputPortClamped {
            module: &self.name,
            requested: port,
            port_count: self.output_ports,
        });
        self.output_ports - 1
    }

    /// Bring outputs to the post-module layout and sample count and sort them by port.
    fn finish(
        &mut self,
        pool: &mut TracePool,
        port: usize,
        produced: Vec<TraceHandle>,
    ) -> Result<PortOutputs, ExecutionError> {
        let mut outputs = vec![Vec::new(); self.output_ports];
        for handle in &produced {
            pool.strip_deleted(*handle, &self.out_layout)?;
            if pool.get(*handle)?.nsamples() != self.super_header.nsamples {
                pool.resize(*handle, self.super_header.nsamples)?;
            }
        }
        self.stats.traces_out += produced.len() as u64;

        if self.role == Some(BlockRole::Split) {
            let copies = produced
                .iter()
                .map(|handle| pool.duplicate(*handle))
                .collect::<Result<Vec<_>, _>>()?;
            self.stats.traces_out += copies.len() as u64;
            outputs[0] = produced;
            outputs[1] = copies;
        } else {
            outputs[port] = produced;
        }
        Ok(outputs)
    }

    fn report(&self, batch_size: usize, produced: usize, retained: usize, forced: bool) {
        ModuleSubmitted {
            module: &self.name,
            index: self.index,
            batch_size,
            produced,
            retained,
            forced,
        }
        .log();
    }

    pub(crate) fn cleanup(&mut self, log: &mut FlowLog) -> Result<(), ModuleError> {
        log.set_context(Some(&self.name));
        let result = self.module.cleanup(log);
        log.set_context(None);
        result
    }

    /// Hand back every trace the node holds, for reclaiming after a failure.
    pub(crate) fn take_all(&mut self) -> Vec<TraceHandle> {
        let mut handles: Vec<TraceHandle> = self.batch.drain(..).collect();
        handles.extend(self.queue.drain(..));
        handles
    }

    fn failed(&self, source: ModuleError) -> ExecutionError {
        ExecutionError::ModuleFailed {
            module: self.name.clone(),
            index: self.index,
            source,
        }
    }
}

fn merge_super_headers(
    module: &str,
    inputs: &[(Rc<HeaderLayout>, SuperHeader)],
) -> Result<SuperHeader, ConfigError> {
    let mut iter = inputs.iter().map(|(_, super_header)| super_header);
    let Some(first) = iter.next() else {
        return Ok(SuperHeader::default());
    };
    for other in iter {
        if other.nsamples != first.nsamples {
            return Err(ConfigError::SuperHeaderMismatch {
                module: module.to_string(),
                field: "sample count",
                first: first.nsamples.to_string(),
                second: other.nsamples.to_string(),
            });
        }
        if (other.sample_int - first.sample_int).abs() > f64::EPSILON * first.sample_int.abs().max(1.0) {
            return Err(ConfigError::SuperHeaderMismatch {
                module: module.to_string(),
                field: "sample interval",
                first: first.sample_int.to_string(),
                second: other.sample_int.to_string(),
            });
        }
    }
    Ok(first.clone())
}
