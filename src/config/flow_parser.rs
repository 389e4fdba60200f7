// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Parser for the textual flow description.
//!
//! ```text
//! # comment
//! &define GAIN 2.5
//! &table statics statics.txt nearest
//!
//! $SYNTHETIC
//!  ntraces 100
//!  nsamples 500
//! $SCALE
//!  factor &GAIN&
//! ```
//!
//! A `$NAME` line starts a module; the lines after it are its parameters until the next
//! module line. Parameter values are separated by whitespace and may be double-quoted to
//! contain spaces. `&name&` is replaced by the value of an earlier `&define` everywhere
//! except in comments.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::consts::{COMMENT_SENTINEL, DEFINE_SENTINEL, MODULE_SENTINEL};
use crate::config::params::ModuleParams;
use crate::config::tables::{Interpolation, LookupTable, TableSet};
use crate::errors::ConfigError;
use crate::observability::messages::validation::DefineDeclared;
use crate::observability::messages::StructuredLog;

/// One `$NAME` block of the flow.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDecl {
    /// Upper-cased module name.
    pub name: String,
    pub line: usize,
    pub params: ModuleParams,
}

/// A parsed flow: its modules in order and the tables they may read.
#[derive(Debug, Clone, Default)]
pub struct FlowDescription {
    pub source: Option<PathBuf>,
    pub modules: Vec<ModuleDecl>,
    pub tables: TableSet,
    pub defines: HashMap<String, String>,
}

impl FlowDescription {
    /// Display name used in logs.
    pub fn label(&self) -> String {
        self.source
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "<inline flow>".to_string())
    }
}

/// Read and parse a flow file. Table paths resolve against the file's directory.
pub fn parse_flow_file(path: &Path) -> Result<FlowDescription, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut flow = parse_flow_str(&text, base_dir)?;
    flow.source = Some(path.to_path_buf());
    Ok(flow)
}

/// Parse flow text. Relative table paths resolve against `base_dir`.
pub fn parse_flow_str(text: &str, base_dir: &Path) -> Result<FlowDescription, ConfigError> {
    let mut flow = FlowDescription::default();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with(COMMENT_SENTINEL) {
            continue;
        }

        if let Some(directive) = directive_of(trimmed) {
            let rest = substitute(&trimmed[directive.len() + 1..], &flow.defines, line)?;
            let words = tokenize(&rest, line)?;
            match directive {
                "define" => define(&mut flow, &words, line)?,
                "table" => table(&mut flow, &words, base_dir, line)?,
                other => {
                    return Err(ConfigError::Syntax {
                        line,
                        message: format!("unknown directive '&{}'", other),
                    })
                }
            }
            continue;
        }

        let expanded = substitute(trimmed, &flow.defines, line)?;
        let mut words = tokenize(&expanded, line)?.into_iter();
        let Some(first) = words.next() else {
            continue;
        };

        if let Some(name) = first.strip_prefix(MODULE_SENTINEL) {
            if name.is_empty() {
                return Err(ConfigError::Syntax {
                    line,
                    message: format!("'{}' without a module name", MODULE_SENTINEL),
                });
            }
            if let Some(extra) = words.next() {
                return Err(ConfigError::Syntax {
                    line,
                    message: format!(
                        "unexpected '{}' after module name; parameters go on their own lines",
                        extra
                    ),
                });
            }
            let name = name.to_ascii_uppercase();
            flow.modules.push(ModuleDecl {
                params: ModuleParams::new(&name),
                name,
                line,
            });
            continue;
        }

        match flow.modules.last_mut() {
            Some(module) => module.params.push(&first, words.collect(), line),
            None => {
                return Err(ConfigError::Syntax {
                    line,
                    message: format!("parameter '{}' before the first module", first),
                })
            }
        }
    }

    Ok(flow)
}

/// Directive name of a `&define ...` / `&table ...` line.
///
/// A line that merely starts with a `&name&` substitution is not a directive.
fn directive_of(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(DEFINE_SENTINEL)?;
    let word = rest.split_whitespace().next()?;
    (!word.contains(DEFINE_SENTINEL)).then_some(word)
}

fn define(flow: &mut FlowDescription, words: &[String], line: usize) -> Result<(), ConfigError> {
    let (name, values) = match words.split_first() {
        Some((name, values)) if !values.is_empty() => (name, values),
        _ => {
            return Err(ConfigError::Syntax {
                line,
                message: "expected '&define <name> <value>'".to_string(),
            })
        }
    };
    if !is_identifier(name) {
        return Err(ConfigError::Syntax {
            line,
            message: format!("invalid define name '{}'", name),
        });
    }
    if flow.defines.contains_key(name) {
        return Err(ConfigError::DuplicateDefine {
            name: name.clone(),
            line,
        });
    }

    let value = values.join(" ");
    DefineDeclared {
        name,
        value: &value,
        line,
    }
    .log();
    flow.defines.insert(name.clone(), value);
    Ok(())
}

fn table(
    flow: &mut FlowDescription,
    words: &[String],
    base_dir: &Path,
    line: usize,
) -> Result<(), ConfigError> {
    let (name, file, interpolation) = match words {
        [name, file] => (name, file, Interpolation::default()),
        [name, file, mode] => {
            let mode = mode
                .parse::<Interpolation>()
                .map_err(|message| ConfigError::Syntax { line, message })?;
            (name, file, mode)
        }
        _ => {
            return Err(ConfigError::Syntax {
                line,
                message: "expected '&table <name> <file> [linear|nearest|none]'".to_string(),
            })
        }
    };

    let path = resolve(base_dir, file);
    let loaded = LookupTable::load(name, &path, interpolation)?;
    flow.tables.insert(loaded, path, line)
}

fn resolve(base_dir: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Replace every `&name&` in `text`.
fn substitute(
    text: &str,
    defines: &HashMap<String, String>,
    line: usize,
) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(DEFINE_SENTINEL) {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find(DEFINE_SENTINEL) {
            Some(end) if is_identifier(&after[..end]) => {
                let name = &after[..end];
                let value = defines
                    .get(name)
                    .ok_or_else(|| ConfigError::UndefinedSubstitution {
                        name: name.to_string(),
                        line,
                    })?;
                out.push_str(value);
                rest = &after[end + 1..];
            }
            _ => {
                out.push(DEFINE_SENTINEL);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

fn is_identifier(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Split on whitespace, keeping double-quoted runs together.
fn tokenize(text: &str, line: usize) -> Result<Vec<String>, ConfigError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;

    for c in text.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quoted {
        return Err(ConfigError::Syntax {
            line,
            message: "unterminated quoted value".to_string(),
        });
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<FlowDescription, ConfigError> {
        parse_flow_str(text, Path::new("."))
    }

    #[test]
    fn test_modules_and_parameters() {
        let flow = parse(
            "# demo flow\n\
             $synthetic\n\
             \tntraces 10\n\
             \n\
             $HDR_SET\n\
             header label string8 \"two words\"\n",
        )
        .unwrap();

        assert_eq!(flow.modules.len(), 2);
        assert_eq!(flow.modules[0].name, "SYNTHETIC");
        assert_eq!(flow.modules[0].line, 2);
        assert_eq!(flow.modules[0].params.int("ntraces").unwrap(), Some(10));

        let header = flow.modules[1].params.get("header").unwrap();
        assert_eq!(header.values, vec!["label", "string8", "two words"]);
        assert_eq!(header.line, 6);
    }

    #[test]
    fn test_defines_are_substituted() {
        let flow = parse(
            "&define GAIN 2.5\n\
             &define MOD SCALE\n\
             $&MOD&\n\
             factor &GAIN&\n",
        )
        .unwrap();

        assert_eq!(flow.modules[0].name, "SCALE");
        assert_eq!(flow.modules[0].params.float("factor").unwrap(), Some(2.5));
    }

    #[test]
    fn test_define_errors() {
        let duplicate = parse("&define A 1\n&define A 2\n").unwrap_err();
        assert!(matches!(duplicate, ConfigError::DuplicateDefine { line: 2, .. }));

        let undefined = parse("$SCALE\nfactor &MISSING&\n").unwrap_err();
        assert!(matches!(
            undefined,
            ConfigError::UndefinedSubstitution { ref name, line: 2 } if name == "MISSING"
        ));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(parse("factor 2\n"), Err(ConfigError::Syntax { line: 1, .. })));
        assert!(matches!(parse("$\n"), Err(ConfigError::Syntax { line: 1, .. })));
        assert!(matches!(parse("$SCALE factor\n"), Err(ConfigError::Syntax { .. })));
        assert!(matches!(
            parse("$SCALE\nlabel \"open\n"),
            Err(ConfigError::Syntax { line: 2, .. })
        ));
        assert!(matches!(parse("&include x\n"), Err(ConfigError::Syntax { .. })));
    }

    #[test]
    fn test_lone_ampersand_is_kept() {
        let flow = parse("$HDR_PRINT\ntitle \"a & b\"\n").unwrap();
        assert_eq!(flow.modules[0].params.text("title").unwrap().unwrap(), "a & b");
    }
}
