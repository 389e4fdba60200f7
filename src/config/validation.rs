// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Static validation of a parsed flow.
//!
//! Runs before any module is initialized and collects every problem it finds, so that a
//! flow with several mistakes reports them together:
//!
//! 1. **Module names**: every `$NAME` must be registered.
//! 2. **Parameters**: each module's parameter lines are checked against its declarations
//!    (unknown names, missing required parameters, values of the wrong kind, repeats).
//! 3. **Block structure**: IF/ELSEIF/ELSE/ENDIF and SPLIT/ENDSPLIT must nest. Only checked
//!    when every module name resolved, since block roles come from the modules.
//!
//! # Example
//! ```rust
//! use std::path::Path;
//! use seisflow::config::{parse_flow_str, validate_flow};
//! use seisflow::modules::ModuleRegistry;
//!
//! let flow = parse_flow_str("$SYNTHETIC\n ntraces 3\n$SCALE\n", Path::new(".")).unwrap();
//! let errors = validate_flow(&flow, &ModuleRegistry::with_builtins()).unwrap_err();
//! assert_eq!(errors.len(), 1); // SCALE needs a factor
//! ```

use crate::config::flow_parser::FlowDescription;
use crate::config::params::validate_params;
use crate::engine::{build_graph, GraphNode};
use crate::errors::ConfigError;
use crate::modules::ModuleRegistry;

pub fn validate_flow(
    flow: &FlowDescription,
    registry: &ModuleRegistry,
) -> Result<(), Vec<ConfigError>> {
    if flow.modules.is_empty() {
        return Err(vec![ConfigError::NoInputModule]);
    }

    let mut errors = Vec::new();
    let mut nodes = Vec::with_capacity(flow.modules.len());

    for decl in &flow.modules {
        let Some(module) = registry.create(&decl.name) else {
            errors.push(ConfigError::UnknownModule {
                name: decl.name.clone(),
                line: decl.line,
            });
            continue;
        };

        if let Err(param_errors) = validate_params(&decl.params, &module.params()) {
            errors.extend(param_errors);
        }
        nodes.push(GraphNode {
            name: decl.name.clone(),
            line: decl.line,
            role: module.block_role(),
        });
    }

    if nodes.len() == flow.modules.len() {
        if let Err(err) = build_graph(&nodes) {
            errors.push(err);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::flow_parser::parse_flow_str;
    use std::path::Path;

    fn validate(text: &str) -> Result<(), Vec<ConfigError>> {
        let flow = parse_flow_str(text, Path::new(".")).unwrap();
        validate_flow(&flow, &ModuleRegistry::with_builtins())
    }

    #[test]
    fn test_valid_flow() {
        let text = "\
$SYNTHETIC
 ntraces 10
$IF
 header trcno 1 5
$SCALE
 factor 2
$ENDIF
";
        assert!(validate(text).is_ok());
    }

    #[test]
    fn test_all_problems_are_reported() {
        let text = "\
$SYNTHETIC
 ntraces ten
 colour blue
$NOPE
$SCALE
";
        let errors = validate(text).unwrap_err();

        assert_eq!(errors.len(), 4, "{:?}", errors);
        assert!(errors
            .iter()
            .any(|err| matches!(err, ConfigError::InvalidParameter { param, .. } if param == "ntraces")));
        assert!(errors
            .iter()
            .any(|err| matches!(err, ConfigError::UnknownParameter { param, line: 3, .. } if param == "colour")));
        assert!(errors
            .iter()
            .any(|err| matches!(err, ConfigError::UnknownModule { name, line: 4 } if name == "NOPE")));
        assert!(errors
            .iter()
            .any(|err| matches!(err, ConfigError::MissingParameter { module, .. } if module == "SCALE")));
    }

    #[test]
    fn test_block_structure_is_checked() {
        let errors = validate("$SYNTHETIC\n ntraces 1\n$ELSE\n").unwrap_err();
        assert!(matches!(errors[0], ConfigError::BlockStructure { line: 3, .. }));
    }

    #[test]
    fn test_empty_flow() {
        let errors = validate("# nothing here\n").unwrap_err();
        assert!(matches!(errors[0], ConfigError::NoInputModule));
    }
}
