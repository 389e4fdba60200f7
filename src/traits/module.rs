// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The contract between the engine and a processing module.
//!
//! A module is created from the [`crate::modules::ModuleRegistry`], initialized once with
//! its parameters, then called repeatedly with traces according to the execution type it
//! chose during initialization:
//!
//! * [`ExecutionType::Input`] modules create traces through a [`Gather`] and report when
//!   their source is exhausted.
//! * [`ExecutionType::SingleTrace`] modules see one trace per call and may drop it.
//! * [`ExecutionType::MultiTrace`] modules see a batch selected by [`TraceSelection`] and
//!   may keep the trailing traces of the batch for their next call.
//!
//! The engine owns every trace. Modules only borrow them for the duration of a call.

use std::rc::Rc;

use crate::config::params::{ModuleParams, ParamSpec};
use crate::config::tables::{LookupTable, TableSet};
use crate::errors::{HeaderError, ModuleError};
use crate::observability::FlowLog;
use crate::trace::{FieldType, Gather, HeaderLayout, SuperHeader, Trace};

/// How a multi-trace module's batch is assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceSelection {
    /// Exactly `n` traces, fewer only at end of input.
    Fixed(usize),
    /// All consecutive traces sharing the values of the ensemble keys.
    Ensemble,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionType {
    Input,
    SingleTrace,
    MultiTrace(TraceSelection),
}

impl std::fmt::Display for ExecutionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionType::Input => f.write_str("input"),
            ExecutionType::SingleTrace => f.write_str("single-trace"),
            ExecutionType::MultiTrace(TraceSelection::Fixed(n)) => write!(f, "multi-trace fixed({})", n),
            ExecutionType::MultiTrace(TraceSelection::Ensemble) => f.write_str("multi-trace ensemble"),
        }
    }
}

/// Result of one call of an input module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    /// Traces were added to the gather.
    Produced,
    /// Nothing this time; call again.
    Skipped,
    /// The source is exhausted. Traces added during this call are still delivered.
    Finished,
}

/// Structural keywords that shape the flow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRole {
    If,
    ElseIf,
    Else,
    EndIf,
    Split,
    EndSplit,
}

impl BlockRole {
    /// True for the roles that route traces over two output ports.
    pub fn is_branching(self) -> bool {
        matches!(self, BlockRole::If | BlockRole::ElseIf | BlockRole::Split)
    }
}

/// What a module can configure during initialization.
///
/// The layout and super-header start as the merge of everything feeding the module.
/// Declarations made here describe the traces the module processes; deletions take effect
/// on the traces it outputs.
pub struct InitEnv<'a> {
    module: &'a str,
    layout: &'a mut HeaderLayout,
    deleted: &'a mut Vec<String>,
    super_header: &'a mut SuperHeader,
    tables: &'a TableSet,
    execution_type: ExecutionType,
}

impl<'a> InitEnv<'a> {
    pub(crate) fn new(
        module: &'a str,
        layout: &'a mut HeaderLayout,
        deleted: &'a mut Vec<String>,
        super_header: &'a mut SuperHeader,
        tables: &'a TableSet,
    ) -> Self {
        Self {
            module,
            layout,
            deleted,
            super_header,
            tables,
            execution_type: ExecutionType::SingleTrace,
        }
    }

    pub fn module(&self) -> &str {
        self.module
    }

    pub fn set_execution_type(&mut self, execution_type: ExecutionType) {
        self.execution_type = execution_type;
    }

    pub fn execution_type(&self) -> ExecutionType {
        self.execution_type
    }

    /// Add a header field, or re-activate a deleted one of the same type.
    pub fn declare_field(
        &mut self,
        name: &str,
        field_type: FieldType,
        description: &str,
    ) -> Result<(), ModuleError> {
        self.layout.declare(name, field_type, description)?;
        let name = name.to_ascii_lowercase();
        self.deleted.retain(|deleted| *deleted != name);
        Ok(())
    }

    /// Remove a field from the traces this module outputs.
    pub fn delete_field(&mut self, name: &str) -> Result<(), ModuleError> {
        let field = self.layout.lookup(name)?;
        if !self.deleted.contains(&field.name) {
            self.deleted.push(field.name.clone());
        }
        Ok(())
    }

    /// Type of an active field.
    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        if self.deleted.iter().any(|deleted| deleted.eq_ignore_ascii_case(name)) {
            return None;
        }
        self.layout.field(name).map(|field| field.field_type)
    }

    /// Type of an active numeric field, or an error naming the problem.
    pub fn numeric_field(&self, name: &str) -> Result<FieldType, ModuleError> {
        match self.field_type(name) {
            Some(field_type) if field_type.is_numeric() => Ok(field_type),
            Some(field_type) => Err(ModuleError::Header(HeaderError::TypeMismatch {
                name: name.to_string(),
                actual: field_type,
                requested: "number",
            })),
            None => Err(ModuleError::Header(HeaderError::UnknownField(name.to_string()))),
        }
    }

    pub fn layout(&self) -> &HeaderLayout {
        self.layout
    }

    pub fn super_header(&self) -> &SuperHeader {
        self.super_header
    }

    pub fn nsamples(&self) -> usize {
        self.super_header.nsamples
    }

    pub fn set_nsamples(&mut self, nsamples: usize) {
        self.super_header.nsamples = nsamples;
    }

    pub fn sample_int(&self) -> f64 {
        self.super_header.sample_int
    }

    pub fn set_sample_int(&mut self, sample_int: f64) {
        self.super_header.sample_int = sample_int;
    }

    pub fn ensemble_keys(&self) -> &[String] {
        &self.super_header.ensemble_keys
    }

    pub fn set_ensemble_keys(&mut self, keys: Vec<String>) {
        self.super_header.ensemble_keys = keys.into_iter().map(|key| key.to_ascii_lowercase()).collect();
    }

    pub fn table(&self, name: &str) -> Result<Rc<LookupTable>, ModuleError> {
        self.tables.get(name).ok_or_else(|| ModuleError::Parameter {
            name: name.to_string(),
            reason: "no table with this name is declared in the flow".to_string(),
        })
    }
}

/// Read-only context of one processing call.
#[derive(Debug, Clone, Copy)]
pub struct ExecEnv<'a> {
    pub module: &'a str,
    pub index: usize,
    /// Super-header of the traces this module outputs.
    pub super_header: &'a SuperHeader,
    pub layout: &'a Rc<HeaderLayout>,
    /// True when the input is exhausted and upstream modules hold no more traces.
    pub forced: bool,
}

/// A processing module.
///
/// Only the call matching the execution type chosen in [`FlowModule::init`] is ever
/// made; the others default to [`ModuleError::UnsupportedCall`].
pub trait FlowModule {
    /// Parameters this module accepts.
    fn params(&self) -> Vec<ParamSpec> {
        Vec::new()
    }

    /// One-line summary for module listings.
    fn description(&self) -> &'static str {
        ""
    }

    /// Structural role, for the keywords that shape the graph.
    fn block_role(&self) -> Option<BlockRole> {
        None
    }

    fn init(
        &mut self,
        params: &ModuleParams,
        env: &mut InitEnv,
        log: &mut FlowLog,
    ) -> Result<(), ModuleError>;

    fn exec_input(
        &mut self,
        _gather: &mut Gather,
        _env: &ExecEnv,
        _log: &mut FlowLog,
    ) -> Result<InputOutcome, ModuleError> {
        Err(ModuleError::UnsupportedCall("exec_input"))
    }

    /// Process one trace. Returns `false` to drop it. `port` selects the output port.
    fn exec_single(
        &mut self,
        _trace: &mut Trace,
        _port: &mut usize,
        _env: &ExecEnv,
        _log: &mut FlowLog,
    ) -> Result<bool, ModuleError> {
        Err(ModuleError::UnsupportedCall("exec_single"))
    }

    /// Process a batch. The leading `len - num_to_keep` traces are output on `port`;
    /// the rest stay in the batch for the next call.
    fn exec_multi(
        &mut self,
        _gather: &mut Gather,
        _port: &mut usize,
        _num_to_keep: &mut usize,
        _env: &ExecEnv,
        _log: &mut FlowLog,
    ) -> Result<(), ModuleError> {
        Err(ModuleError::UnsupportedCall("exec_multi"))
    }

    /// Called once after the run, also after a failed run.
    fn cleanup(&mut self, _log: &mut FlowLog) -> Result<(), ModuleError> {
        Ok(())
    }
}
