// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Lookup tables declared with `&table` and read from whitespace separated side files.
//!
//! The first column of a table file is the key; the remaining columns are values. Rows
//! are sorted by key on load and keys must be unique. Lines starting with `#` and blank
//! lines are skipped.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::str::FromStr;

use crate::config::consts::COMMENT_SENTINEL;
use crate::errors::ConfigError;
use crate::observability::messages::validation::TableLoaded;
use crate::observability::messages::StructuredLog;

/// How values between two keys are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Straight line between the neighboring rows; end rows outside the key range.
    #[default]
    Linear,
    /// Row with the closest key; ties go to the lower key.
    Nearest,
    /// Exact keys only.
    None,
}

impl FromStr for Interpolation {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.to_ascii_lowercase().as_str() {
            "linear" => Ok(Interpolation::Linear),
            "nearest" => Ok(Interpolation::Nearest),
            "none" | "exact" => Ok(Interpolation::None),
            other => Err(format!(
                "unknown interpolation '{}', expected linear, nearest or none",
                other
            )),
        }
    }
}

impl Display for Interpolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Interpolation::Linear => "linear",
            Interpolation::Nearest => "nearest",
            Interpolation::None => "none",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable {
    name: String,
    interpolation: Interpolation,
    keys: Vec<f64>,
    rows: Vec<Vec<f64>>,
    columns: usize,
}

impl LookupTable {
    pub fn load(
        name: &str,
        path: &Path,
        interpolation: Interpolation,
    ) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::parse(name, path, &text, interpolation)?;
        TableLoaded {
            name,
            path: &path.display().to_string(),
            rows: table.len(),
        }
        .log();
        Ok(table)
    }

    pub fn parse(
        name: &str,
        path: &Path,
        text: &str,
        interpolation: Interpolation,
    ) -> Result<Self, ConfigError> {
        let format_error = |line: usize, message: String| ConfigError::TableFormat {
            name: name.to_string(),
            path: path.to_path_buf(),
            line,
            message,
        };

        let mut rows: Vec<(f64, Vec<f64>)> = Vec::new();
        let mut columns = None;

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with(COMMENT_SENTINEL) {
                continue;
            }

            let numbers = trimmed
                .split_whitespace()
                .map(|word| {
                    word.parse::<f64>()
                        .map_err(|_| format_error(line, format!("'{}' is not a number", word)))
                })
                .collect::<Result<Vec<f64>, ConfigError>>()?;

            let (key, values) = match numbers.split_first() {
                Some((key, values)) if !values.is_empty() => (*key, values.to_vec()),
                _ => return Err(format_error(line, "expected a key and at least one value".into())),
            };

            match columns {
                None => columns = Some(values.len()),
                Some(expected) if expected != values.len() => {
                    return Err(format_error(
                        line,
                        format!("expected {} value columns, found {}", expected, values.len()),
                    ))
                }
                Some(_) => {}
            }
            rows.push((key, values));
        }

        let Some(columns) = columns else {
            return Err(format_error(0, "table has no rows".into()));
        };

        rows.sort_by(|a, b| a.0.total_cmp(&b.0));
        if let Some(pair) = rows.windows(2).find(|pair| pair[0].0 == pair[1].0) {
            return Err(format_error(0, format!("duplicate key {}", pair[0].0)));
        }

        let (keys, rows) = rows.into_iter().unzip();
        Ok(Self {
            name: name.to_string(),
            interpolation,
            keys,
            rows,
            columns,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// Number of value columns.
    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Value of `column` at `key`, or `None` when the table cannot answer.
    pub fn value(&self, key: f64, column: usize) -> Option<f64> {
        if column >= self.columns || key.is_nan() {
            return None;
        }
        let found = self.keys.binary_search_by(|probe| probe.total_cmp(&key));

        match (self.interpolation, found) {
            (_, Ok(index)) => Some(self.rows[index][column]),
            (Interpolation::None, Err(_)) => None,
            (_, Err(0)) => Some(self.rows[0][column]),
            (_, Err(index)) if index == self.keys.len() => Some(self.rows[index - 1][column]),
            (Interpolation::Nearest, Err(index)) => {
                let below = key - self.keys[index - 1];
                let above = self.keys[index] - key;
                let nearest = if above < below { index } else { index - 1 };
                Some(self.rows[nearest][column])
            }
            (Interpolation::Linear, Err(index)) => {
                let (k0, k1) = (self.keys[index - 1], self.keys[index]);
                let (v0, v1) = (self.rows[index - 1][column], self.rows[index][column]);
                Some(v0 + (v1 - v0) * (key - k0) / (k1 - k0))
            }
        }
    }
}

/// Every table of one flow, by name.
#[derive(Debug, Clone, Default)]
pub struct TableSet {
    tables: HashMap<String, Rc<LookupTable>>,
    sources: HashMap<String, PathBuf>,
}

impl TableSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        table: LookupTable,
        source: PathBuf,
        line: usize,
    ) -> Result<(), ConfigError> {
        let name = table.name().to_string();
        if self.tables.contains_key(&name) {
            return Err(ConfigError::DuplicateTable { name, line });
        }
        self.sources.insert(name.clone(), source);
        self.tables.insert(name, Rc::new(table));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Rc<LookupTable>> {
        self.tables.get(name).cloned()
    }

    pub fn source(&self, name: &str) -> Option<&Path> {
        self.sources.get(name).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VELOCITIES: &str = "\
# offset  velocity  gain
1000  2000  1.0
0     1500  0.5

2000  3000  2.0
";

    fn table(interpolation: Interpolation) -> LookupTable {
        LookupTable::parse("vel", Path::new("vel.txt"), VELOCITIES, interpolation).unwrap()
    }

    #[test]
    fn test_rows_are_sorted_by_key() {
        let table = table(Interpolation::None);
        assert_eq!(table.len(), 3);
        assert_eq!(table.columns(), 2);
        assert_eq!(table.value(0.0, 0), Some(1500.0));
        assert_eq!(table.value(500.0, 0), None);
        assert_eq!(table.value(0.0, 2), None);
    }

    #[test]
    fn test_linear_interpolation_and_extrapolation() {
        let table = table(Interpolation::Linear);
        assert_eq!(table.value(500.0, 0), Some(1750.0));
        assert_eq!(table.value(1500.0, 1), Some(1.5));
        assert_eq!(table.value(-10.0, 0), Some(1500.0));
        assert_eq!(table.value(9000.0, 0), Some(3000.0));
    }

    #[test]
    fn test_nearest_prefers_lower_key_on_tie() {
        let table = table(Interpolation::Nearest);
        assert_eq!(table.value(500.0, 0), Some(1500.0));
        assert_eq!(table.value(501.0, 0), Some(2000.0));
    }

    #[test]
    fn test_malformed_tables_are_rejected() {
        let ragged = "0 1 2\n1 1\n";
        let err = LookupTable::parse("t", Path::new("t"), ragged, Interpolation::Linear).unwrap_err();
        assert!(matches!(err, ConfigError::TableFormat { line: 2, .. }));

        let duplicate = "0 1\n0 2\n";
        assert!(LookupTable::parse("t", Path::new("t"), duplicate, Interpolation::Linear).is_err());

        let words = "0 fast\n";
        assert!(LookupTable::parse("t", Path::new("t"), words, Interpolation::Linear).is_err());

        assert!(LookupTable::parse("t", Path::new("t"), "# empty\n", Interpolation::Linear).is_err());
    }

    #[test]
    fn test_duplicate_table_names_are_rejected() {
        let mut set = TableSet::new();
        set.insert(table(Interpolation::Linear), PathBuf::from("a"), 1).unwrap();
        let err = set
            .insert(table(Interpolation::None), PathBuf::from("b"), 4)
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateTable { line: 4, .. }));
    }
}
