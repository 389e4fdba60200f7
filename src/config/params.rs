// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Module parameters as written in the flow description, and the declarations modules
//! use to describe what they accept.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::errors::{ConfigError, ModuleError};

/// Shape of the values that follow a parameter name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// No values.
    Flag,
    /// Exactly one integer.
    Int,
    /// Exactly one number.
    Float,
    /// Exactly one word or quoted string.
    Text,
    /// One or more words.
    List,
}

impl Display for ParamKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ParamKind::Flag => "flag",
            ParamKind::Int => "integer",
            ParamKind::Float => "number",
            ParamKind::Text => "text",
            ParamKind::List => "list",
        };
        f.write_str(text)
    }
}

/// One parameter a module accepts.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub repeatable: bool,
    pub description: &'static str,
}

impl ParamSpec {
    pub fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            repeatable: false,
            description,
        }
    }

    pub fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            required: true,
            ..Self::optional(name, kind, description)
        }
    }

    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }
}

/// One `name value...` line of a module block.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamEntry {
    pub name: String,
    pub values: Vec<String>,
    pub line: usize,
}

/// The parameter lines of one module, in the order they were written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleParams {
    module: String,
    entries: Vec<ParamEntry>,
}

impl ModuleParams {
    pub fn new(module: &str) -> Self {
        Self {
            module: module.to_string(),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, name: &str, values: Vec<String>, line: usize) {
        self.entries.push(ParamEntry {
            name: name.to_ascii_lowercase(),
            values,
            line,
        });
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn entries(&self) -> &[ParamEntry] {
        &self.entries
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// First entry named `name`.
    pub fn get(&self, name: &str) -> Option<&ParamEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Every entry named `name`, for repeatable parameters.
    pub fn all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ParamEntry> + 'a {
        self.entries.iter().filter(move |entry| entry.name == name)
    }

    pub fn int(&self, name: &str) -> Result<Option<i64>, ModuleError> {
        self.single(name)
    }

    pub fn float(&self, name: &str) -> Result<Option<f64>, ModuleError> {
        self.single(name)
    }

    pub fn text(&self, name: &str) -> Result<Option<String>, ModuleError> {
        self.single(name)
    }

    pub fn int_or(&self, name: &str, default: i64) -> Result<i64, ModuleError> {
        Ok(self.int(name)?.unwrap_or(default))
    }

    pub fn float_or(&self, name: &str, default: f64) -> Result<f64, ModuleError> {
        Ok(self.float(name)?.unwrap_or(default))
    }

    pub fn require_int(&self, name: &str) -> Result<i64, ModuleError> {
        self.int(name)?.ok_or_else(|| missing(name))
    }

    pub fn require_float(&self, name: &str) -> Result<f64, ModuleError> {
        self.float(name)?.ok_or_else(|| missing(name))
    }

    pub fn require_text(&self, name: &str) -> Result<String, ModuleError> {
        self.text(name)?.ok_or_else(|| missing(name))
    }

    /// Values of the first entry named `name`, or an empty slice.
    pub fn list(&self, name: &str) -> &[String] {
        self.get(name).map(|entry| entry.values.as_slice()).unwrap_or(&[])
    }

    fn single<T>(&self, name: &str) -> Result<Option<T>, ModuleError>
    where
        T: FromStr,
        T::Err: Display,
    {
        let Some(entry) = self.get(name) else {
            return Ok(None);
        };
        let [value] = entry.values.as_slice() else {
            return Err(ModuleError::Parameter {
                name: name.to_string(),
                reason: format!("expected one value, found {}", entry.values.len()),
            });
        };
        value.parse::<T>().map(Some).map_err(|err| ModuleError::Parameter {
            name: name.to_string(),
            reason: format!("'{}': {}", value, err),
        })
    }
}

fn missing(name: &str) -> ModuleError {
    ModuleError::Parameter {
        name: name.to_string(),
        reason: "required but not given".to_string(),
    }
}

/// Check parameter lines against the module's declarations.
///
/// Every problem is collected so that a flow with several typos reports them all at once.
pub fn validate_params(
    params: &ModuleParams,
    specs: &[ParamSpec],
) -> Result<(), Vec<ConfigError>> {
    let module = params.module().to_string();
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for entry in params.entries() {
        let Some(spec) = specs.iter().find(|spec| spec.name == entry.name) else {
            errors.push(ConfigError::UnknownParameter {
                module: module.clone(),
                param: entry.name.clone(),
                line: entry.line,
            });
            continue;
        };

        if !seen.insert(spec.name) && !spec.repeatable {
            errors.push(invalid(&module, entry, "given more than once".to_string()));
        }

        if let Err(reason) = check_kind(spec.kind, &entry.values) {
            errors.push(invalid(&module, entry, reason));
        }
    }

    for spec in specs.iter().filter(|spec| spec.required) {
        if !seen.contains(spec.name) {
            errors.push(ConfigError::MissingParameter {
                module: module.clone(),
                param: spec.name.to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_kind(kind: ParamKind, values: &[String]) -> Result<(), String> {
    match (kind, values) {
        (ParamKind::Flag, []) => Ok(()),
        (ParamKind::Flag, _) => Err("takes no value".to_string()),
        (ParamKind::List, []) => Err("expected at least one value".to_string()),
        (ParamKind::List, _) => Ok(()),
        (_, [value]) => match kind {
            ParamKind::Int => value
                .parse::<i64>()
                .map(|_| ())
                .map_err(|_| format!("'{}' is not an integer", value)),
            ParamKind::Float => value
                .parse::<f64>()
                .map(|_| ())
                .map_err(|_| format!("'{}' is not a number", value)),
            _ => Ok(()),
        },
        (_, values) => Err(format!(
            "expected one {} value, found {}",
            kind,
            values.len()
        )),
    }
}

fn invalid(module: &str, entry: &ParamEntry, reason: String) -> ConfigError {
    ConfigError::InvalidParameter {
        module: module.to_string(),
        param: entry.name.clone(),
        line: entry.line,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs() -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("factor", ParamKind::Float, "multiplier"),
            ParamSpec::optional("count", ParamKind::Int, ""),
            ParamSpec::optional("header", ParamKind::List, "").repeatable(),
            ParamSpec::optional("verbose", ParamKind::Flag, ""),
        ]
    }

    fn params(lines: &[(&str, &[&str])]) -> ModuleParams {
        let mut params = ModuleParams::new("SCALE");
        for (index, (name, values)) in lines.iter().enumerate() {
            params.push(
                name,
                values.iter().map(|value| value.to_string()).collect(),
                index + 2,
            );
        }
        params
    }

    #[test]
    fn test_valid_parameters_pass() {
        let params = params(&[
            ("factor", &["2.5"]),
            ("header", &["offset", "0", "10"]),
            ("header", &["cdp", "1", "5"]),
            ("verbose", &[]),
        ]);
        assert!(validate_params(&params, &specs()).is_ok());
        assert_eq!(params.float("factor").unwrap(), Some(2.5));
        assert_eq!(params.all("header").count(), 2);
        assert_eq!(params.int_or("count", 7).unwrap(), 7);
    }

    #[test]
    fn test_all_problems_are_reported() {
        let params = params(&[
            ("count", &["three"]),
            ("count", &["3"]),
            ("colour", &["red"]),
            ("verbose", &["yes"]),
        ]);
        let errors = validate_params(&params, &specs()).unwrap_err();

        assert_eq!(errors.len(), 5);
        assert!(errors.iter().any(|err| matches!(
            err,
            ConfigError::UnknownParameter { param, line: 4, .. } if param == "colour"
        )));
        assert!(errors.iter().any(|err| matches!(
            err,
            ConfigError::MissingParameter { param, .. } if param == "factor"
        )));
        assert!(errors.iter().any(|err| matches!(
            err,
            ConfigError::InvalidParameter { reason, .. } if reason == "given more than once"
        )));
    }

    #[test]
    fn test_typed_access_reports_bad_values() {
        let params = params(&[("factor", &["fast"])]);
        assert!(matches!(
            params.float("factor"),
            Err(ModuleError::Parameter { name, .. }) if name == "factor"
        ));
        assert!(params.require_int("count").is_err());
    }
}
