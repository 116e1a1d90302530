//! In-memory tabular data used for cached artifacts and derived tables
//!
//! A [`DataTable`] is a list of named columns plus rows of loosely typed
//! [`Value`]s. CSV cells parse to numbers when they can, to text otherwise,
//! and empty cells become [`Value::Null`].

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

mod csv_io;

pub use csv_io::{read_csv, read_csv_path, write_csv, write_csv_path};

/// One cell of a [`DataTable`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Number(f64),
    Text(String),
}

impl Value {
    /// Parse a raw CSV cell
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Value::Number(n),
            _ => Value::Text(raw.to_string()),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view; numeric-looking text counts as a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            Value::Null => None,
        }
    }

    /// Text view used for label matching; nulls are empty
    pub fn as_label(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Text(s) => s.trim().to_string(),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
        }
    }

    /// Round numeric values to `decimals` places, leaving other values untouched
    pub fn rounded(&self, decimals: i32) -> Value {
        match self.as_f64() {
            Some(n) => {
                let factor = 10f64.powi(decimals);
                Value::Number((n * factor).round() / factor)
            }
            None => Value::Null,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_label())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// Named columns with row-major values
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl DataTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from column names and rows, padding short rows with nulls
    pub fn from_rows<S: Into<String>>(columns: Vec<S>, rows: Vec<Vec<Value>>) -> Self {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Value at (row, column name); missing columns read as null
    pub fn get(&self, row: usize, column: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.column_index(column)
            .and_then(|idx| self.rows.get(row).and_then(|r| r.get(idx)))
            .unwrap_or(&NULL)
    }

    /// Push a row, padding or truncating to the table width
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    /// Project `(label, source)` pairs into a new table; absent sources become null columns
    pub fn select_as(&self, mapping: &[(&str, Option<&str>)]) -> DataTable {
        let indices: Vec<Option<usize>> = mapping
            .iter()
            .map(|(_, source)| source.and_then(|s| self.column_index(s)))
            .collect();
        let columns = mapping.iter().map(|(label, _)| label.to_string()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                indices
                    .iter()
                    .map(|idx| idx.and_then(|i| row.get(i).cloned()).unwrap_or_default())
                    .collect()
            })
            .collect();
        DataTable { columns, rows }
    }

    /// Keep rows for which the predicate holds
    pub fn filter<F>(&self, mut keep: F) -> DataTable
    where
        F: FnMut(&DataTable, usize) -> bool,
    {
        let rows = (0..self.rows.len())
            .filter(|&i| keep(self, i))
            .map(|i| self.rows[i].clone())
            .collect();
        DataTable {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Stable sort by one column; nulls always sort last
    pub fn sort_by_column(&mut self, column: &str, descending: bool) {
        let Some(idx) = self.column_index(column) else {
            return;
        };
        static NULL: Value = Value::Null;
        self.rows.sort_by(|a, b| {
            compare_values(
                a.get(idx).unwrap_or(&NULL),
                b.get(idx).unwrap_or(&NULL),
                descending,
            )
        });
    }

    pub fn truncate(&mut self, len: usize) {
        self.rows.truncate(len);
    }

    /// Apply `f` to every value of a column
    pub fn map_column<F>(&mut self, column: &str, f: F)
    where
        F: Fn(&Value) -> Value,
    {
        if let Some(idx) = self.column_index(column) {
            for cell in self.rows.iter_mut().filter_map(|row| row.get_mut(idx)) {
                *cell = f(cell);
            }
        }
    }

    /// Sum of the numeric values of a column; non-numeric cells count as zero
    pub fn column_sum(&self, idx: usize) -> f64 {
        self.rows
            .iter()
            .filter_map(|row| row.get(idx).and_then(Value::as_f64))
            .sum()
    }

    /// Turn rows into columns: each non-label column becomes a row named after it,
    /// and each source row becomes a column named by its `entity_column` value.
    pub fn transpose(&self, entity_column: &str, label_header: &str) -> DataTable {
        let entity_idx = self.column_index(entity_column);
        let mut columns = vec![label_header.to_string()];
        columns.extend(self.rows.iter().map(|row| {
            entity_idx
                .and_then(|i| row.get(i))
                .map(Value::as_label)
                .unwrap_or_default()
        }));

        let rows = self
            .columns
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != entity_idx)
            .map(|(col, name)| {
                let mut out = Vec::with_capacity(self.rows.len() + 1);
                out.push(Value::Text(name.clone()));
                out.extend(
                    self.rows
                        .iter()
                        .map(|row| row.get(col).cloned().unwrap_or_default()),
                );
                out
            })
            .collect();

        DataTable { columns, rows }
    }
}

/// Ordering used by every sort: numbers before text, nulls last regardless of direction
pub fn compare_values(a: &Value, b: &Value, descending: bool) -> Ordering {
    let ordered = |o: Ordering| if descending { o.reverse() } else { o };
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => ordered(x.partial_cmp(y).unwrap_or(Ordering::Equal)),
        (Value::Number(_), Value::Text(_)) => Ordering::Less,
        (Value::Text(_), Value::Number(_)) => Ordering::Greater,
        (Value::Text(x), Value::Text(y)) => ordered(x.cmp(y)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn players() -> DataTable {
        DataTable::from_rows(
            vec!["playerName", "shots", "goals"],
            vec![
                vec!["Ann".into(), 3.0.into(), Value::Null],
                vec!["Bea".into(), 5.0.into(), 1.0.into()],
                vec!["Cid".into(), Value::Null, 2.0.into()],
            ],
        )
    }

    #[test]
    fn test_value_parse() {
        assert_eq!(Value::parse(""), Value::Null);
        assert_eq!(Value::parse(" 4.5 "), Value::Number(4.5));
        assert_eq!(Value::parse("x"), Value::text("x"));
        assert_eq!(Value::parse("NaN"), Value::text("NaN"));
    }

    #[test]
    fn test_as_label_formats_whole_numbers() {
        assert_eq!(Value::Number(3.0).as_label(), "3");
        assert_eq!(Value::Number(2.25).as_label(), "2.25");
        assert_eq!(Value::Null.as_label(), "");
    }

    #[test]
    fn test_sort_puts_nulls_last() {
        let mut table = players();
        table.sort_by_column("shots", true);
        let names: Vec<_> = (0..3).map(|i| table.get(i, "playerName").as_label()).collect();
        assert_eq!(names, vec!["Bea", "Ann", "Cid"]);
    }

    #[test]
    fn test_select_as_fills_missing_columns() {
        let table = players().select_as(&[("Player", Some("playerName")), ("xG", None)]);
        assert_eq!(table.columns, vec!["Player", "xG"]);
        assert!(table.rows.iter().all(|r| r[1].is_null()));
    }

    #[test]
    fn test_transpose_names_columns_after_entities() {
        let table = players().transpose("playerName", "Per Player");
        assert_eq!(table.columns, vec!["Per Player", "Ann", "Bea", "Cid"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0][0], Value::text("shots"));
        assert_eq!(table.rows[1][3], Value::Number(2.0));
    }

    #[test]
    fn test_column_sum_ignores_text() {
        let table = DataTable::from_rows(
            vec!["a"],
            vec![vec![3.0.into()], vec!["x".into()], vec![1.5.into()]],
        );
        assert_eq!(table.column_sum(0), 4.5);
    }
}
