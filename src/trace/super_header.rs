// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;

/// Properties shared by every trace leaving a module.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SuperHeader {
    pub nsamples: usize,
    /// Sample interval in milliseconds.
    pub sample_int: f64,
    /// Header fields whose values group consecutive traces into ensembles.
    pub ensemble_keys: Vec<String>,
}

impl SuperHeader {
    /// Trace length in milliseconds.
    pub fn trace_length(&self) -> f64 {
        self.nsamples.saturating_sub(1) as f64 * self.sample_int
    }
}
