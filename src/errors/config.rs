// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors detected before any trace flows: flow syntax, graph structure and module
//! initialization.

use std::path::PathBuf;

use thiserror::Error;

use super::{HeaderError, ModuleError};

/// Configuration errors abort the run during the initialization pass.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Malformed line in the flow description.
    #[error("Line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// A `&define` name was declared twice.
    #[error("Line {line}: duplicate definition of '&{name}'")]
    DuplicateDefine { name: String, line: usize },

    /// A `&name&` substitution refers to nothing defined above it.
    #[error("Line {line}: '&{name}&' is not defined")]
    UndefinedSubstitution { name: String, line: usize },

    /// A `&table` name was declared twice.
    #[error("Line {line}: duplicate table '{name}'")]
    DuplicateTable { name: String, line: usize },

    /// A table side file could not be parsed.
    #[error("Table '{name}' ({path}): line {line}: {message}")]
    TableFormat {
        name: String,
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// No module with this name is registered.
    #[error("Line {line}: unknown module '{name}'")]
    UnknownModule { name: String, line: usize },

    /// A parameter line names something the module does not declare.
    #[error("Module '{module}' (line {line}): unknown parameter '{param}'")]
    UnknownParameter {
        module: String,
        param: String,
        line: usize,
    },

    /// A required parameter is absent.
    #[error("Module '{module}': missing required parameter '{param}'")]
    MissingParameter { module: String, param: String },

    /// A parameter value does not match its declared kind.
    #[error("Module '{module}' (line {line}): parameter '{param}': {reason}")]
    InvalidParameter {
        module: String,
        param: String,
        line: usize,
        reason: String,
    },

    /// Conditional or split keywords do not nest properly.
    #[error("Line {line}: {message}")]
    BlockStructure { line: usize, message: String },

    /// The flow has no input module.
    #[error("Flow has no input module")]
    NoInputModule,

    /// Only one input module is supported, and it must start the flow.
    #[error("Module '{module}' (line {line}) is an input module; the only input module must be the first module of the flow")]
    MisplacedInput { module: String, line: usize },

    /// Input ports of a merge point disagree on the super-header.
    #[error("Module '{module}': input ports disagree on {field} ({first} vs {second})")]
    SuperHeaderMismatch {
        module: String,
        field: &'static str,
        first: String,
        second: String,
    },

    /// String header fields cannot define ensembles.
    #[error("Module '{module}': ensemble key '{key}' is a string field; only numeric ensemble keys are supported")]
    StringEnsembleKey { module: String, key: String },

    /// A header declaration made by a module during init failed.
    #[error("Module '{module}': {source}")]
    Header {
        module: String,
        #[source]
        source: HeaderError,
    },

    /// A module's init call failed.
    #[error("Module '{module}' failed to initialize: {source}")]
    ModuleInit {
        module: String,
        #[source]
        source: ModuleError,
    },

    /// Several problems found while validating the flow.
    #[error("{} problem(s) in the flow:\n{}", .0.len(), list(.0))]
    Invalid(Vec<ConfigError>),

    /// Warnings were promoted to errors by the engine configuration.
    #[error("{0} warning(s) during initialization and warnings are treated as errors")]
    WarningsAsErrors(usize),

    /// A memory budget given in MiB does not fit in a byte count.
    #[error("Memory budget of {0} MiB is too large")]
    MemoryBudgetOverflow(u64),

    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML engine configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid TOML engine configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

fn list(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(|err| format!("  - {}", err))
        .collect::<Vec<_>>()
        .join("\n")
}

impl ConfigError {
    /// Collapse a list of errors, keeping a lone error as is.
    pub fn from_list(mut errors: Vec<ConfigError>) -> ConfigError {
        if errors.len() == 1 {
            errors.remove(0)
        } else {
            ConfigError::Invalid(errors)
        }
    }
}
