// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::params::{ModuleParams, ParamKind, ParamSpec};
use crate::errors::ModuleError;
use crate::observability::FlowLog;
use crate::trace::Trace;
use crate::traits::{ExecEnv, FlowModule, InitEnv};

/// Multiply every sample by a constant.
#[derive(Debug, Default)]
pub struct Scale {
    factor: f32,
}

impl FlowModule for Scale {
    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required("factor", ParamKind::Float, "multiplier")]
    }

    fn description(&self) -> &'static str {
        "Multiply samples by a constant factor"
    }

    fn init(
        &mut self,
        params: &ModuleParams,
        _env: &mut InitEnv,
        log: &mut FlowLog,
    ) -> Result<(), ModuleError> {
        self.factor = params.require_float("factor")? as f32;
        if self.factor == 0.0 {
            log.warning("factor 0 zeroes every trace");
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
        for sample in trace.samples_mut() {
            *sample *= self.factor;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ConfigError, FlowError};
    use crate::modules::stub::run_captured;

    #[test]
    fn test_every_sample_is_multiplied() {
        let (_, captured) =
            run_captured("$SYNTHETIC\n ntraces 3\n nsamples 2\n$SCALE\n factor -0.5\n", &[]).unwrap();
        assert_eq!(
            captured.traces().into_iter().map(|t| t.samples).collect::<Vec<_>>(),
            vec![vec![-0.5, -0.5], vec![-1.0, -1.0], vec![-1.5, -1.5]]
        );
    }

    #[test]
    fn test_factor_must_be_a_number() {
        let err = run_captured("$SYNTHETIC\n ntraces 1\n$SCALE\n factor loud\n", &[]).unwrap_err();
        assert!(
            matches!(err, FlowError::Config(ConfigError::InvalidParameter { ref param, .. }) if param == "factor"),
            "{:?}",
            err
        );
    }
}
