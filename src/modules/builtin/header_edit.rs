// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! `HDR_SET` and `HDR_DEL`: declare, assign and delete header fields.

use crate::config::params::{ModuleParams, ParamKind, ParamSpec};
use crate::errors::ModuleError;
use crate::observability::FlowLog;
use crate::trace::{FieldType, HeaderValue, Trace};
use crate::traits::{ExecEnv, FlowModule, InitEnv};

/// Assign constant values, declaring the fields when they do not exist yet.
#[derive(Debug, Default)]
pub struct HeaderSet {
    assignments: Vec<(String, HeaderValue)>,
}

impl FlowModule for HeaderSet {
    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required(
            "header",
            ParamKind::List,
            "<name> <type> <value>: type is int, int64, float, double or stringN",
        )
        .repeatable()]
    }

    fn description(&self) -> &'static str {
        "Set header fields to constant values"
    }

    fn init(
        &mut self,
        params: &ModuleParams,
        env: &mut InitEnv,
        _log: &mut FlowLog,
    ) -> Result<(), ModuleError> {
        for entry in params.all("header") {
            let [name, kind, value] = entry.values.as_slice() else {
                return Err(ModuleError::Parameter {
                    name: "header".to_string(),
                    reason: format!("line {}: expected '<name> <type> <value>'", entry.line),
                });
            };
            let invalid = |reason: String| ModuleError::Parameter {
                name: "header".to_string(),
                reason: format!("line {}: {}", entry.line, reason),
            };
            let field_type = kind.parse::<FieldType>().map_err(invalid)?;
            let value = HeaderValue::parse(field_type, value).map_err(invalid)?;

            env.declare_field(name, field_type, "set by HDR_SET")?;
            self.assignments.push((name.to_ascii_lowercase(), value));
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
        for (name, value) in &self.assignments {
            trace.set_value(name, value.clone())?;
        }
        Ok(true)
    }
}

/// Delete header fields from the traces passing through.
#[derive(Debug, Default)]
pub struct HeaderDelete;

impl FlowModule for HeaderDelete {
    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required("header", ParamKind::List, "names of the fields to delete").repeatable()]
    }

    fn description(&self) -> &'static str {
        "Delete header fields"
    }

    fn init(
        &mut self,
        params: &ModuleParams,
        env: &mut InitEnv,
        _log: &mut FlowLog,
    ) -> Result<(), ModuleError> {
        for entry in params.all("header") {
            for name in &entry.values {
                env.delete_field(name)?;
            }
        }
        Ok(())
    }

    fn exec_single(
        &mut self,
        _trace: &mut Trace,
        _port: &mut usize,
        _env: &ExecEnv,
        _log: &mut FlowLog,
    ) -> Result<bool, ModuleError> {
        Ok(true)
    }
}
