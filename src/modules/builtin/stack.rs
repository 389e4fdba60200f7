// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::params::{ModuleParams, ParamKind, ParamSpec};
use crate::errors::ModuleError;
use crate::observability::FlowLog;
use crate::trace::{FieldType, Gather};
use crate::traits::{ExecEnv, ExecutionType, FlowModule, InitEnv, TraceSelection};

/// Average every ensemble into one trace.
///
/// The first trace of the ensemble carries the result; its `fold` header records how many
/// traces contributed.
#[derive(Debug, Default)]
pub struct Stack {
    sum_only: bool,
}

impl FlowModule for Stack {
    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::optional(
            "sum",
            ParamKind::Flag,
            "output the sum instead of the mean",
        )]
    }

    fn description(&self) -> &'static str {
        "Stack each ensemble into a single trace"
    }

    fn init(
        &mut self,
        params: &ModuleParams,
        env: &mut InitEnv,
        _log: &mut FlowLog,
    ) -> Result<(), ModuleError> {
        self.sum_only = params.has("sum");
        env.set_execution_type(ExecutionType::MultiTrace(TraceSelection::Ensemble));
        env.declare_field("fold", FieldType::Int, "number of stacked traces")?;
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
        let fold = gather.len();
        if fold == 0 {
            return Ok(());
        }

        let mut stacked = gather.get(0)?.samples().to_vec();
        for index in 1..fold {
            for (sum, sample) in stacked.iter_mut().zip(gather.get(index)?.samples()) {
                *sum += *sample;
            }
        }
        if !self.sum_only {
            let scale = 1.0 / fold as f32;
            stacked.iter_mut().for_each(|sample| *sample *= scale);
        }

        let first = gather.get_mut(0)?;
        first.samples_mut().copy_from_slice(&stacked);
        first.set_int("fold", fold as i32)?;
        gather.truncate(1)
    }
}

#[cfg(test)]
mod tests {
    use crate::modules::stub::run_captured;
    use crate::trace::{FieldType, HeaderValue};

    const ENSEMBLES_OF_THREE: &str = "$SYNTHETIC\n ntraces 7\n nsamples 2\n ens_size 3\n";

    #[test]
    fn test_ensembles_are_averaged_into_their_first_trace() {
        let (summary, captured) = run_captured(
            &format!("{}$STACK\n", ENSEMBLES_OF_THREE),
            &[("trcno", FieldType::Int), ("fold", FieldType::Int)],
        )
        .unwrap();

        assert_eq!(summary.traces_read, 7);
        assert_eq!(captured.len(), 3);
        assert_eq!(
            captured.traces().iter().map(|t| t.samples.clone()).collect::<Vec<_>>(),
            vec![vec![2.0, 2.0], vec![5.0, 5.0], vec![7.0, 7.0]]
        );
        assert_eq!(
            captured.column(0),
            vec![HeaderValue::Int(1), HeaderValue::Int(4), HeaderValue::Int(7)]
        );
        assert_eq!(
            captured.column(1),
            vec![HeaderValue::Int(3), HeaderValue::Int(3), HeaderValue::Int(1)]
        );
        assert_eq!(summary.pool.outstanding, 0);
    }

    #[test]
    fn test_sum_flag_skips_normalization() {
        let (_, captured) = run_captured(
            &format!("{}$STACK\n sum\n", ENSEMBLES_OF_THREE),
            &[("fold", FieldType::Int)],
        )
        .unwrap();

        assert_eq!(captured.first_samples(), vec![6.0, 15.0, 7.0]);
        assert_eq!(
            captured.column(0),
            vec![HeaderValue::Int(3), HeaderValue::Int(3), HeaderValue::Int(1)]
        );
    }
}
