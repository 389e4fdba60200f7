// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::params::{ModuleParams, ParamKind, ParamSpec};
use crate::errors::ModuleError;
use crate::observability::FlowLog;
use crate::trace::Trace;
use crate::traits::{ExecEnv, FlowModule, InitEnv};

/// Redefine the ensemble keys seen by downstream modules.
#[derive(Debug, Default)]
pub struct EnsembleKeys;

impl FlowModule for EnsembleKeys {
    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required("keys", ParamKind::List, "numeric header fields, outermost first")]
    }

    fn description(&self) -> &'static str {
        "Set the ensemble keys"
    }

    fn init(
        &mut self,
        params: &ModuleParams,
        env: &mut InitEnv,
        _log: &mut FlowLog,
    ) -> Result<(), ModuleError> {
        env.set_ensemble_keys(params.list("keys").to_vec());
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
