// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Processing modules and the registry that creates them by name.

pub mod builtin;
mod registry;
#[cfg(test)]
pub(crate) mod stub;

pub use registry::{ModuleConstructor, ModuleRegistry};
