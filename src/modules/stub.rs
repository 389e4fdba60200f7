// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Test modules: an input fed from a list, a recorder, a header capture, and a module
//! that fails on demand.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use crate::config::params::{ModuleParams, ParamKind, ParamSpec};
use crate::config::{parse_flow_str, RuntimeBuilder};
use crate::engine::RunSummary;
use crate::errors::{FlowError, ModuleError};
use crate::modules::ModuleRegistry;
use crate::observability::FlowLog;
use crate::trace::{FieldType, Gather, HeaderValue, Trace};
use crate::traits::{ExecEnv, ExecutionType, FlowModule, InitEnv, InputOutcome};

/// Input producing one trace per `(ensemble, value)` pair.
pub struct ListInput {
    traces: Vec<(i32, f32)>,
    nsamples: usize,
    next: usize,
}

impl ListInput {
    /// Traces with the given values, each its own ensemble.
    pub fn values(values: &[f32]) -> Self {
        Self::with_ensembles(
            &values
                .iter()
                .enumerate()
                .map(|(index, value)| (index as i32 + 1, *value))
                .collect::<Vec<_>>(),
        )
    }

    /// Traces whose value is their trace number, grouped by `keys`.
    pub fn ensembles(keys: &[i32]) -> Self {
        Self::with_ensembles(
            &keys
                .iter()
                .enumerate()
                .map(|(index, key)| (*key, index as f32 + 1.0))
                .collect::<Vec<_>>(),
        )
    }

    pub fn with_ensembles(traces: &[(i32, f32)]) -> Self {
        Self {
            traces: traces.to_vec(),
            nsamples: 1,
            next: 0,
        }
    }

    pub fn samples(mut self, nsamples: usize) -> Self {
        self.nsamples = nsamples;
        self
    }
}

impl FlowModule for ListInput {
    fn init(
        &mut self,
        _params: &ModuleParams,
        env: &mut InitEnv,
        _log: &mut FlowLog,
    ) -> Result<(), ModuleError> {
        env.set_execution_type(ExecutionType::Input);
        env.declare_field("trcno", FieldType::Int, "")?;
        env.declare_field("ens", FieldType::Int, "")?;
        env.set_nsamples(self.nsamples);
        env.set_sample_int(2.0);
        env.set_ensemble_keys(vec!["ens".to_string()]);
        Ok(())
    }

    fn exec_input(
        &mut self,
        gather: &mut Gather,
        _env: &ExecEnv,
        _log: &mut FlowLog,
    ) -> Result<InputOutcome, ModuleError> {
        let Some((ensemble, value)) = self.traces.get(self.next).copied() else {
            return Ok(InputOutcome::Finished);
        };
        self.next += 1;

        let trace = gather.push_new()?;
        trace.set_int("trcno", self.next as i32)?;
        trace.set_int("ens", ensemble)?;
        trace.samples_mut().fill(value);

        Ok(if self.next == self.traces.len() {
            InputOutcome::Finished
        } else {
            InputOutcome::Produced
        })
    }
}

/// What a [`Recorder`] saw.
#[derive(Debug, Default)]
pub struct Recording {
    /// First sample of every trace, per call.
    pub batches: Vec<Vec<f32>>,
    pub forced: Vec<bool>,
    pub cleanups: usize,
}

/// Shared view of a [`Recording`], kept by the test while the engine owns the module.
#[derive(Debug, Clone, Default)]
pub struct RecorderLog(Rc<RefCell<Recording>>);

impl RecorderLog {
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.0.borrow().batches.iter().map(Vec::len).collect()
    }

    pub fn batches(&self) -> Vec<Vec<f32>> {
        self.0.borrow().batches.clone()
    }

    /// Every trace seen, in order.
    pub fn values(&self) -> Vec<f32> {
        self.0.borrow().batches.iter().flatten().copied().collect()
    }

    pub fn forced(&self) -> Vec<bool> {
        self.0.borrow().forced.clone()
    }

    pub fn cleanups(&self) -> usize {
        self.0.borrow().cleanups
    }
}

/// Pass-through module recording every call.
pub struct Recorder {
    execution_type: ExecutionType,
    keep: usize,
    resize: Option<usize>,
    delete: Vec<String>,
    log: RecorderLog,
}

impl Recorder {
    pub fn new(execution_type: ExecutionType) -> (Self, RecorderLog) {
        let log = RecorderLog::default();
        let recorder = Self {
            execution_type,
            keep: 0,
            resize: None,
            delete: Vec::new(),
            log: log.clone(),
        };
        (recorder, log)
    }

    /// Ask to keep `keep` traces after every multi-trace call.
    pub fn keeping(mut self, keep: usize) -> Self {
        self.keep = keep;
        self
    }

    pub fn resizing(mut self, nsamples: usize) -> Self {
        self.resize = Some(nsamples);
        self
    }

    pub fn deleting(mut self, field: &str) -> Self {
        self.delete.push(field.to_string());
        self
    }

    fn record(&self, values: Vec<f32>, forced: bool) {
        let mut recording = self.log.0.borrow_mut();
        recording.batches.push(values);
        recording.forced.push(forced);
    }
}

impl FlowModule for Recorder {
    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::optional("note", ParamKind::Text, "ignored")]
    }

    fn init(
        &mut self,
        _params: &ModuleParams,
        env: &mut InitEnv,
        _log: &mut FlowLog,
    ) -> Result<(), ModuleError> {
        env.set_execution_type(self.execution_type);
        if let Some(nsamples) = self.resize {
            env.set_nsamples(nsamples);
        }
        for field in &self.delete {
            env.delete_field(field)?;
        }
        Ok(())
    }

    fn exec_single(
        &mut self,
        trace: &mut Trace,
        _port: &mut usize,
        env: &ExecEnv,
        _log: &mut FlowLog,
    ) -> Result<bool, ModuleError> {
        self.record(vec![first_sample(trace)], env.forced);
        Ok(true)
    }

    fn exec_multi(
        &mut self,
        gather: &mut Gather,
        _port: &mut usize,
        num_to_keep: &mut usize,
        env: &ExecEnv,
        _log: &mut FlowLog,
    ) -> Result<(), ModuleError> {
        self.record(gather.iter().map(first_sample).collect(), env.forced);
        *num_to_keep = self.keep;
        Ok(())
    }

    fn cleanup(&mut self, _log: &mut FlowLog) -> Result<(), ModuleError> {
        self.log.0.borrow_mut().cleanups += 1;
        Ok(())
    }
}

fn first_sample(trace: &Trace) -> f32 {
    trace.samples().first().copied().unwrap_or(f32::NAN)
}

/// Where a [`Failing`] module fails.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FailAt {
    Init,
    /// On the n-th trace, 1-based.
    Exec(usize),
    Cleanup,
}

/// Single-trace pass-through that fails at a chosen point and counts cleanups.
pub struct Failing {
    at: FailAt,
    seen: usize,
    cleanups: Rc<RefCell<usize>>,
}

impl Failing {
    pub fn new(at: FailAt) -> (Self, Rc<RefCell<usize>>) {
        let cleanups = Rc::new(RefCell::new(0));
        let module = Self {
            at,
            seen: 0,
            cleanups: Rc::clone(&cleanups),
        };
        (module, cleanups)
    }
}

impl FlowModule for Failing {
    fn init(
        &mut self,
        _params: &ModuleParams,
        _env: &mut InitEnv,
        log: &mut FlowLog,
    ) -> Result<(), ModuleError> {
        if self.at == FailAt::Init {
            return log.error("refusing to initialize");
        }
        Ok(())
    }

    fn exec_single(
        &mut self,
        _trace: &mut Trace,
        _port: &mut usize,
        _env: &ExecEnv,
        log: &mut FlowLog,
    ) -> Result<bool, ModuleError> {
        self.seen += 1;
        if self.at == FailAt::Exec(self.seen) {
            return log.error(format_args!("failing on trace {}", self.seen));
        }
        Ok(true)
    }

    fn cleanup(&mut self, log: &mut FlowLog) -> Result<(), ModuleError> {
        *self.cleanups.borrow_mut() += 1;
        if self.at == FailAt::Cleanup {
            return log.error("cleanup failed");
        }
        Ok(())
    }
}

/// One trace as it reached a [`Capture`].
#[derive(Debug, Clone, PartialEq)]
pub struct Captured {
    pub samples: Vec<f32>,
    /// Values of the captured fields, in the order they were requested.
    pub headers: Vec<HeaderValue>,
}

#[derive(Debug, Clone, Default)]
pub struct CaptureLog(Rc<RefCell<Vec<Captured>>>);

impl CaptureLog {
    pub fn traces(&self) -> Vec<Captured> {
        self.0.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Value of the `column`-th captured field of every trace.
    pub fn column(&self, column: usize) -> Vec<HeaderValue> {
        self.0
            .borrow()
            .iter()
            .map(|trace| trace.headers[column].clone())
            .collect()
    }

    /// First sample of every trace.
    pub fn first_samples(&self) -> Vec<f32> {
        self.0.borrow().iter().map(|trace| trace.samples[0]).collect()
    }
}

/// Sink that declares the fields it reads, then records every trace.
///
/// Declaring re-activates a field deleted upstream, so a capture placed after `HDR_DEL`
/// sees what a downstream module re-declaring the field would see.
pub struct Capture {
    fields: Vec<(String, FieldType)>,
    log: CaptureLog,
}

impl FlowModule for Capture {
    fn init(
        &mut self,
        _params: &ModuleParams,
        env: &mut InitEnv,
        _log: &mut FlowLog,
    ) -> Result<(), ModuleError> {
        for (name, field_type) in &self.fields {
            env.declare_field(name, *field_type, "")?;
        }
        Ok(())
    }

    fn exec_single(
        &mut self,
        trace: &mut Trace,
        _port: &mut usize,
        _env: &ExecEnv,
        _log: &mut FlowLog,
    ) -> Result<bool, ModuleError> {
        let headers = self
            .fields
            .iter()
            .map(|(name, _)| trace.value(name))
            .collect::<Result<Vec<_>, _>>()?;
        self.log.0.borrow_mut().push(Captured {
            samples: trace.samples().to_vec(),
            headers,
        });
        Ok(true)
    }
}

/// Run flow text over the built-in modules with a `$CAPTURE` appended at the end.
pub fn run_captured(
    flow: &str,
    fields: &[(&str, FieldType)],
) -> Result<(RunSummary, CaptureLog), FlowError> {
    let captured = CaptureLog::default();
    let fields: Vec<(String, FieldType)> = fields
        .iter()
        .map(|(name, field_type)| (name.to_string(), *field_type))
        .collect();

    let mut registry = ModuleRegistry::with_builtins();
    let log = captured.clone();
    registry.register("CAPTURE", move || {
        Box::new(Capture {
            fields: fields.clone(),
            log: log.clone(),
        })
    });

    let text = format!("{}\n$CAPTURE\n", flow);
    let description = parse_flow_str(&text, Path::new("."))?;
    let summary = RuntimeBuilder::with_registry(registry)
        .build(description)?
        .run(&mut FlowLog::discard())?;
    Ok((summary, captured))
}
