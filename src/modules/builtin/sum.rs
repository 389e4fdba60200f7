// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::params::{ModuleParams, ParamKind, ParamSpec};
use crate::errors::ModuleError;
use crate::observability::FlowLog;
use crate::trace::Gather;
use crate::traits::{ExecEnv, ExecutionType, FlowModule, InitEnv, TraceSelection};

/// Sum groups of `count` consecutive traces into their first trace.
#[derive(Debug, Default)]
pub struct Sum {
    count: usize,
}

impl FlowModule for Sum {
    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::optional("count", ParamKind::Int, "traces per sum (default 2)")]
    }

    fn description(&self) -> &'static str {
        "Sum fixed-size groups of traces"
    }

    fn init(
        &mut self,
        params: &ModuleParams,
        env: &mut InitEnv,
        _log: &mut FlowLog,
    ) -> Result<(), ModuleError> {
        let count = params.int_or("count", 2)?;
        if count < 1 {
            return Err(ModuleError::Parameter {
                name: "count".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        self.count = count as usize;
        env.set_execution_type(ExecutionType::MultiTrace(TraceSelection::Fixed(self.count)));
        Ok(())
    }

    fn exec_multi(
        &mut self,
        gather: &mut Gather,
        _port: &mut usize,
        num_to_keep: &mut usize,
        _env: &ExecEnv,
        _log: &mut FlowLog,
    ) -> Result<(), ModuleError> {
        *num_to_keep = 0;
        if gather.is_empty() {
            return Ok(());
        }

        let mut total = gather.get(0)?.samples().to_vec();
        for index in 1..gather.len() {
            for (sum, sample) in total.iter_mut().zip(gather.get(index)?.samples()) {
                *sum += *sample;
            }
        }
        gather.get_mut(0)?.samples_mut().copy_from_slice(&total);
        gather.truncate(1)
    }
}

#[cfg(test)]
mod tests {
    use crate::modules::stub::run_captured;
    use crate::trace::{FieldType, HeaderValue};

    #[test]
    fn test_groups_are_summed_into_their_first_trace() {
        let (summary, captured) = run_captured(
            "$SYNTHETIC\n ntraces 5\n nsamples 2\n$SUM\n count 3\n",
            &[("trcno", FieldType::Int)],
        )
        .unwrap();

        assert_eq!(
            captured.traces().iter().map(|t| t.samples.clone()).collect::<Vec<_>>(),
            vec![vec![6.0, 6.0], vec![9.0, 9.0]]
        );
        assert_eq!(captured.column(0), vec![HeaderValue::Int(1), HeaderValue::Int(4)]);
        assert_eq!(summary.traces_written, 2);
        assert_eq!(summary.pool.outstanding, 0);
    }

    #[test]
    fn test_count_defaults_to_pairs() {
        let (_, captured) = run_captured("$SYNTHETIC\n ntraces 4\n nsamples 1\n$SUM\n", &[]).unwrap();
        assert_eq!(captured.first_samples(), vec![3.0, 7.0]);
    }
}
