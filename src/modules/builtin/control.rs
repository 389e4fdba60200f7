// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structural keywords: `IF`, `ELSEIF`, `ELSE`, `ENDIF`, `SPLIT` and `ENDSPLIT`.
//!
//! The graph builder reads their [`BlockRole`]; at run time they are ordinary
//! single-trace modules. `IF` and `ELSEIF` pick an output port, the others pass traces
//! through. The duplication done by `SPLIT` happens in the engine.

use crate::config::params::{ModuleParams, ParamKind, ParamSpec};
use crate::errors::ModuleError;
use crate::observability::FlowLog;
use crate::trace::Trace;
use crate::traits::{BlockRole, ExecEnv, FlowModule, InitEnv};

/// Inclusive range test on a numeric header field.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderRange {
    pub field: String,
    pub min: f64,
    pub max: f64,
}

impl HeaderRange {
    /// Parse every `header <name> <min> <max>` line and check the fields exist.
    pub fn from_params(params: &ModuleParams, env: &InitEnv) -> Result<Vec<Self>, ModuleError> {
        params
            .all("header")
            .map(|entry| {
                let [field, min, max] = entry.values.as_slice() else {
                    return Err(ModuleError::Parameter {
                        name: "header".to_string(),
                        reason: format!("line {}: expected '<name> <min> <max>'", entry.line),
                    });
                };
                env.numeric_field(field)?;
                let bound = |text: &str| {
                    text.parse::<f64>().map_err(|_| ModuleError::Parameter {
                        name: "header".to_string(),
                        reason: format!("line {}: '{}' is not a number", entry.line, text),
                    })
                };
                let (min, max) = (bound(min.as_str())?, bound(max.as_str())?);
                if min > max {
                    return Err(ModuleError::Parameter {
                        name: "header".to_string(),
                        reason: format!("line {}: minimum {} exceeds maximum {}", entry.line, min, max),
                    });
                }
                Ok(Self {
                    field: field.to_ascii_lowercase(),
                    min,
                    max,
                })
            })
            .collect()
    }

    pub fn contains(&self, trace: &Trace) -> Result<bool, ModuleError> {
        let value = trace.get_f64(&self.field)?;
        Ok(value >= self.min && value <= self.max)
    }

    /// True when every range holds.
    pub fn all(ranges: &[HeaderRange], trace: &Trace) -> Result<bool, ModuleError> {
        for range in ranges {
            if !range.contains(trace)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

pub(crate) fn range_params() -> Vec<ParamSpec> {
    vec![ParamSpec::required(
        "header",
        ParamKind::List,
        "<name> <min> <max>: inclusive range of a numeric header, all ranges must hold",
    )
    .repeatable()]
}

/// `IF` / `ELSEIF`: port 0 when all ranges hold, port 1 otherwise.
pub struct Conditional {
    else_if: bool,
    ranges: Vec<HeaderRange>,
}

impl Conditional {
    pub fn new(else_if: bool) -> Self {
        Self {
            else_if,
            ranges: Vec::new(),
        }
    }
}

impl FlowModule for Conditional {
    fn params(&self) -> Vec<ParamSpec> {
        range_params()
    }

    fn description(&self) -> &'static str {
        if self.else_if {
            "Alternative branch when the previous conditions failed"
        } else {
            "Start a conditional block routing traces by header ranges"
        }
    }

    fn block_role(&self) -> Option<BlockRole> {
        Some(if self.else_if {
            BlockRole::ElseIf
        } else {
            BlockRole::If
        })
    }

    fn init(
        &mut self,
        params: &ModuleParams,
        env: &mut InitEnv,
        _log: &mut FlowLog,
    ) -> Result<(), ModuleError> {
        self.ranges = HeaderRange::from_params(params, env)?;
        Ok(())
    }

    fn exec_single(
        &mut self,
        trace: &mut Trace,
        port: &mut usize,
        _env: &ExecEnv,
        _log: &mut FlowLog,
    ) -> Result<bool, ModuleError> {
        *port = if HeaderRange::all(&self.ranges, trace)? { 0 } else { 1 };
        Ok(true)
    }
}

/// `ELSE`, `ENDIF`, `SPLIT`, `ENDSPLIT`: pass every trace through.
pub struct Marker {
    role: BlockRole,
}

impl Marker {
    pub fn new(role: BlockRole) -> Self {
        Self { role }
    }
}

impl FlowModule for Marker {
    fn description(&self) -> &'static str {
        match self.role {
            BlockRole::Else => "Final branch of a conditional block",
            BlockRole::EndIf => "End a conditional block",
            BlockRole::Split => "Send every trace through the block and, as a copy, around it",
            BlockRole::EndSplit => "End a split block",
            BlockRole::If | BlockRole::ElseIf => "Conditional",
        }
    }

    fn block_role(&self) -> Option<BlockRole> {
        Some(self.role)
    }

    fn init(
        &mut self,
        _params: &ModuleParams,
        _env: &mut InitEnv,
        _log: &mut FlowLog,
    ) -> Result<(), ModuleError> {
        Ok(())
    }

    fn exec_single(
        &mut self,
        _trace: &mut Trace,
        port: &mut usize,
        _env: &ExecEnv,
        _log: &mut FlowLog,
    ) -> Result<bool, ModuleError> {
        *port = 0;
        Ok(true)
    }
}
