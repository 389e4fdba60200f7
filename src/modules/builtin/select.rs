// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::params::{ModuleParams, ParamKind, ParamSpec};
use crate::errors::ModuleError;
use crate::modules::builtin::control::{range_params, HeaderRange};
use crate::observability::FlowLog;
use crate::trace::Trace;
use crate::traits::{ExecEnv, FlowModule, InitEnv};

/// Drop traces outside header ranges.
#[derive(Debug, Default)]
pub struct Select {
    ranges: Vec<HeaderRange>,
    reject: bool,
}

impl FlowModule for Select {
    fn params(&self) -> Vec<ParamSpec> {
        let mut params = range_params();
        params.push(ParamSpec::optional(
            "reject",
            ParamKind::Flag,
            "drop the traces inside the ranges instead",
        ));
        params
    }

    fn description(&self) -> &'static str {
        "Keep only traces whose headers fall inside the given ranges"
    }

    fn init(
        &mut self,
        params: &ModuleParams,
        env: &mut InitEnv,
        _log: &mut FlowLog,
    ) -> Result<(), ModuleError> {
        self.ranges = HeaderRange::from_params(params, env)?;
        self.reject = params.has("reject");
        Ok(())
    }

    fn exec_single(
        &mut self,
        trace: &mut Trace,
        _port: &mut usize,
        _env: &ExecEnv,
        _log: &mut FlowLog,
    ) -> Result<bool, ModuleError> {
        Ok(HeaderRange::all(&self.ranges, trace)? != self.reject)
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ConfigError, FlowError};
    use crate::modules::stub::run_captured;
    use crate::trace::{FieldType, HeaderValue};

    fn trace_numbers(select: &str) -> Vec<HeaderValue> {
        let flow = format!("$SYNTHETIC\n ntraces 6\n nsamples 1\n$SELECT\n{}", select);
        let (summary, captured) = run_captured(&flow, &[("trcno", FieldType::Int)]).unwrap();
        assert_eq!(summary.traces_read, 6);
        assert_eq!(summary.pool.outstanding, 0);
        captured.column(0)
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        assert_eq!(
            trace_numbers(" header trcno 2 4\n"),
            vec![HeaderValue::Int(2), HeaderValue::Int(3), HeaderValue::Int(4)]
        );
    }

    #[test]
    fn test_reject_drops_the_range_instead() {
        assert_eq!(
            trace_numbers(" header trcno 2 4\n reject\n"),
            vec![HeaderValue::Int(1), HeaderValue::Int(5), HeaderValue::Int(6)]
        );
    }

    #[test]
    fn test_every_range_must_hold() {
        assert_eq!(
            trace_numbers(" header trcno 1 5\n header ens 4 6\n"),
            vec![HeaderValue::Int(4), HeaderValue::Int(5)]
        );
    }

    #[test]
    fn test_unknown_header_fails_initialization() {
        let err = run_captured(
            "$SYNTHETIC\n ntraces 1\n$SELECT\n header offset 0 10\n",
            &[],
        )
        .unwrap_err();
        assert!(
            matches!(err, FlowError::Config(ConfigError::ModuleInit { ref module, .. }) if module == "SELECT"),
            "{:?}",
            err
        );
    }
}
