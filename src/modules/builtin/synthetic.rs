// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::params::{ModuleParams, ParamKind, ParamSpec};
use crate::errors::ModuleError;
use crate::observability::FlowLog;
use crate::trace::{FieldType, Gather};
use crate::traits::{ExecEnv, ExecutionType, FlowModule, InitEnv, InputOutcome};

/// Input module generating constant traces.
///
/// Trace `n` (1-based) belongs to ensemble `(n - 1) / ens_size + 1`. Every sample of a
/// trace holds `value`, or the trace number when no value is given.
#[derive(Debug, Default)]
pub struct Synthetic {
    ntraces: u64,
    ens_size: u64,
    value: Option<f32>,
    produced: u64,
}

impl FlowModule for Synthetic {
    fn params(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("ntraces", ParamKind::Int, "number of traces to generate"),
            ParamSpec::optional("nsamples", ParamKind::Int, "samples per trace (default 100)"),
            ParamSpec::optional("sample_int", ParamKind::Float, "sample interval in ms (default 4)"),
            ParamSpec::optional("ens_size", ParamKind::Int, "traces per ensemble (default 1)"),
            ParamSpec::optional("value", ParamKind::Float, "sample value (default: trace number)"),
        ]
    }

    fn description(&self) -> &'static str {
        "Generate synthetic traces numbered by trcno and grouped by ens"
    }

    fn init(
        &mut self,
        params: &ModuleParams,
        env: &mut InitEnv,
        _log: &mut FlowLog,
    ) -> Result<(), ModuleError> {
        let positive = |name: &str, value: i64, minimum: i64| {
            if value < minimum {
                Err(ModuleError::Parameter {
                    name: name.to_string(),
                    reason: format!("must be at least {}", minimum),
                })
            } else {
                Ok(value as u64)
            }
        };

        self.ntraces = positive("ntraces", params.require_int("ntraces")?, 0)?;
        self.ens_size = positive("ens_size", params.int_or("ens_size", 1)?, 1)?;
        let nsamples = positive("nsamples", params.int_or("nsamples", 100)?, 1)?;
        let sample_int = params.float_or("sample_int", 4.0)?;
        if sample_int <= 0.0 {
            return Err(ModuleError::Parameter {
                name: "sample_int".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        self.value = params.float("value")?.map(|value| value as f32);

        env.set_execution_type(ExecutionType::Input);
        env.declare_field("trcno", FieldType::Int, "trace number within the run")?;
        env.declare_field("ens", FieldType::Int, "ensemble number")?;
        env.set_nsamples(nsamples as usize);
        env.set_sample_int(sample_int);
        env.set_ensemble_keys(vec!["ens".to_string()]);
        Ok(())
    }

    fn exec_input(
        &mut self,
        gather: &mut Gather,
        _env: &ExecEnv,
        _log: &mut FlowLog,
    ) -> Result<InputOutcome, ModuleError> {
        if self.produced >= self.ntraces {
            return Ok(InputOutcome::Finished);
        }
        self.produced += 1;

        let number = self.produced;
        let ensemble = (number - 1) / self.ens_size + 1;
        let value = self.value.unwrap_or(number as f32);

        let trace = gather.push_new()?;
        trace.set_int("trcno", number as i32)?;
        trace.set_int("ens", ensemble as i32)?;
        trace.samples_mut().fill(value);

        Ok(if self.produced == self.ntraces {
            InputOutcome::Finished
        } else {
            InputOutcome::Produced
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::modules::stub::run_captured;
    use crate::trace::{FieldType, HeaderValue};

    #[test]
    fn test_traces_are_numbered_and_grouped() {
        let (summary, captured) = run_captured(
            "$SYNTHETIC\n ntraces 5\n nsamples 3\n ens_size 2\n value 0.25\n",
            &[("trcno", FieldType::Int), ("ens", FieldType::Int)],
        )
        .unwrap();

        assert_eq!(summary.traces_read, 5);
        assert_eq!(captured.column(0), (1..=5).map(HeaderValue::Int).collect::<Vec<_>>());
        assert_eq!(
            captured.column(1),
            [1, 1, 2, 2, 3].into_iter().map(HeaderValue::Int).collect::<Vec<_>>()
        );
        assert!(captured.traces().iter().all(|trace| trace.samples == vec![0.25; 3]));
    }

    #[test]
    fn test_samples_default_to_the_trace_number() {
        let (_, captured) = run_captured("$SYNTHETIC\n ntraces 3\n nsamples 1\n", &[]).unwrap();
        assert_eq!(captured.first_samples(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_zero_traces_run_nothing() {
        let (summary, captured) = run_captured("$SYNTHETIC\n ntraces 0\n", &[]).unwrap();
        assert_eq!(summary.traces_read, 0);
        assert_eq!(captured.len(), 0);
    }
}
