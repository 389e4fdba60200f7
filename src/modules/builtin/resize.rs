// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::params::{ModuleParams, ParamKind, ParamSpec};
use crate::errors::ModuleError;
use crate::observability::FlowLog;
use crate::trace::Trace;
use crate::traits::{ExecEnv, FlowModule, InitEnv};

/// Change the sample count; traces are truncated or padded with zeros on output.
#[derive(Debug, Default)]
pub struct Resize;

impl FlowModule for Resize {
    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required("nsamples", ParamKind::Int, "new number of samples")]
    }

    fn description(&self) -> &'static str {
        "Truncate or zero-pad traces to a new length"
    }

    fn init(
        &mut self,
        params: &ModuleParams,
        env: &mut InitEnv,
        log: &mut FlowLog,
    ) -> Result<(), ModuleError> {
        let nsamples = params.require_int("nsamples")?;
        if nsamples < 1 {
            return Err(ModuleError::Parameter {
                name: "nsamples".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if nsamples as usize == env.nsamples() {
            log.warning(format_args!("traces already have {} samples", nsamples));
        }
        env.set_nsamples(nsamples as usize);
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
