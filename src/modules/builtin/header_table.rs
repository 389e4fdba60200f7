// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::rc::Rc;

use crate::config::params::{ModuleParams, ParamKind, ParamSpec};
use crate::config::tables::LookupTable;
use crate::errors::ModuleError;
use crate::observability::FlowLog;
use crate::trace::{FieldType, Trace};
use crate::traits::{ExecEnv, FlowModule, InitEnv};

/// Set a header from a lookup table indexed by another header.
#[derive(Debug, Default)]
pub struct HeaderTable {
    table: Option<Rc<LookupTable>>,
    key: String,
    target: String,
    column: usize,
}

impl FlowModule for HeaderTable {
    fn params(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("table", ParamKind::Text, "name of a &table of the flow"),
            ParamSpec::required("key", ParamKind::Text, "numeric header used as the table key"),
            ParamSpec::required("target", ParamKind::Text, "header receiving the value"),
            ParamSpec::optional("column", ParamKind::Int, "value column, starting at 0"),
        ]
    }

    fn description(&self) -> &'static str {
        "Set a header from a lookup table"
    }

    fn init(
        &mut self,
        params: &ModuleParams,
        env: &mut InitEnv,
        _log: &mut FlowLog,
    ) -> Result<(), ModuleError> {
        let table = env.table(&params.require_text("table")?)?;
        let column = params.int_or("column", 0)?;
        if column < 0 || column as usize >= table.columns() {
            return Err(ModuleError::Parameter {
                name: "column".to_string(),
                reason: format!(
                    "table '{}' has {} value column(s)",
                    table.name(),
                    table.columns()
                ),
            });
        }

        self.key = params.require_text("key")?.to_ascii_lowercase();
        env.numeric_field(&self.key)?;

        self.target = params.require_text("target")?.to_ascii_lowercase();
        if env.field_type(&self.target).is_none() {
            env.declare_field(&self.target, FieldType::Double, "set by HDR_TABLE")?;
        }
        env.numeric_field(&self.target)?;

        self.column = column as usize;
        self.table = Some(table);
        Ok(())
    }

    fn exec_single(
        &mut self,
        trace: &mut Trace,
        _port: &mut usize,
        _env: &ExecEnv,
        log: &mut FlowLog,
    ) -> Result<bool, ModuleError> {
        let Some(table) = &self.table else {
            return Err(ModuleError::Fatal("table not loaded".to_string()));
        };
        let key = trace.get_f64(&self.key)?;
        match table.value(key, self.column) {
            Some(value) => {
                trace.set_f64(&self.target, value)?;
                Ok(true)
            }
            None => log.error(format_args!(
                "table '{}' has no entry for {} = {}",
                table.name(),
                self.key,
                key
            )),
        }
    }
}
