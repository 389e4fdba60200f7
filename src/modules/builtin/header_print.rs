// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::params::{ModuleParams, ParamKind, ParamSpec};
use crate::errors::ModuleError;
use crate::observability::FlowLog;
use crate::trace::Trace;
use crate::traits::{ExecEnv, FlowModule, InitEnv};

/// Write header values of passing traces to the flow log.
#[derive(Debug, Default)]
pub struct HeaderPrint {
    fields: Vec<String>,
    title: Option<String>,
    every: u64,
    seen: u64,
}

impl FlowModule for HeaderPrint {
    fn params(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::optional("header", ParamKind::List, "fields to print (default: all)"),
            ParamSpec::optional("every", ParamKind::Int, "print every n-th trace (default 1)"),
            ParamSpec::optional("title", ParamKind::Text, "text printed before the values"),
        ]
    }

    fn description(&self) -> &'static str {
        "Print header values to the flow log"
    }

    fn init(
        &mut self,
        params: &ModuleParams,
        env: &mut InitEnv,
        _log: &mut FlowLog,
    ) -> Result<(), ModuleError> {
        self.fields = if params.has("header") {
            params
                .list("header")
                .iter()
                .map(|name| {
                    env.field_type(name)
                        .map(|_| name.to_ascii_lowercase())
                        .ok_or_else(|| ModuleError::Parameter {
                            name: "header".to_string(),
                            reason: format!("no header field '{}'", name),
                        })
                })
                .collect::<Result<_, _>>()?
        } else {
            env.layout()
                .active_fields()
                .map(|field| field.name.clone())
                .collect()
        };

        let every = params.int_or("every", 1)?;
        if every < 1 {
            return Err(ModuleError::Parameter {
                name: "every".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        self.every = every as u64;
        self.title = params.text("title")?;
        Ok(())
    }

    fn exec_single(
        &mut self,
        trace: &mut Trace,
        _port: &mut usize,
        _env: &ExecEnv,
        log: &mut FlowLog,
    ) -> Result<bool, ModuleError> {
        self.seen += 1;
        if (self.seen - 1) % self.every != 0 {
            return Ok(true);
        }

        let values = self
            .fields
            .iter()
            .map(|name| trace.value(name).map(|value| format!("{}={}", name, value)))
            .collect::<Result<Vec<_>, _>>()?;
        match &self.title {
            Some(title) => log.line(format_args!("{} {}", title, values.join(" "))),
            None => log.line(values.join(" ")),
        }
        Ok(true)
    }
}
