//! Core table type shared by every codec

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Canonical text for an absent value
pub const NULL: &str = "null";

/// Name of the pseudo-column that carries unassigned matter in flat formats
pub const UNASSIGNED_COLUMN: &str = "umat";

/// Whether a column name refers to unassigned matter (`umat`, any case)
pub fn is_unassigned_column(name: &str) -> bool {
    name.eq_ignore_ascii_case(UNASSIGNED_COLUMN)
}

/// An in-memory table: named text columns, derived numeric columns, and
/// per-record free text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Field names in serialization order
    pub columns: Vec<String>,
    /// Text values, one per record, keyed by field
    pub strings: BTreeMap<String, Vec<String>>,
    /// Numeric columns derived from `strings` by `numerize`
    pub numerics: BTreeMap<String, NumericColumn>,
    /// Field descriptions; empty when the document had none
    pub definitions: BTreeMap<String, String>,
    /// Per-record free text, or empty when the table carries none
    pub unassigned: Vec<String>,
    /// Facts about the table as a whole
    pub metadata: BTreeMap<String, String>,
    /// Digits after the decimal point when writing numeric-looking text
    pub precision: BTreeMap<String, usize>,
}

/// A whole column parsed as numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NumericColumn {
    /// Every value is a 64-bit integer and none is missing
    Integer(Vec<i64>),
    /// Floating-point values; missing entries are NaN
    Float(Vec<f64>),
}

impl NumericColumn {
    /// Number of values in the column
    pub fn len(&self) -> usize {
        match self {
            NumericColumn::Integer(v) => v.len(),
            NumericColumn::Float(v) => v.len(),
        }
    }

    /// Whether the column holds no values
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at `index` widened to f64
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        match self {
            NumericColumn::Integer(v) => v.get(index).map(|&i| i as f64),
            NumericColumn::Float(v) => v.get(index).copied(),
        }
    }

    /// Whole column widened to f64
    pub fn to_f64(&self) -> Vec<f64> {
        match self {
            NumericColumn::Integer(v) => v.iter().map(|&i| i as f64).collect(),
            NumericColumn::Float(v) => v.clone(),
        }
    }

    /// Build a new column from the values at `indices`, in that order
    pub(crate) fn pick(&self, indices: &[usize]) -> NumericColumn {
        match self {
            NumericColumn::Integer(v) => {
                NumericColumn::Integer(indices.iter().map(|&i| v[i]).collect())
            }
            NumericColumn::Float(v) => {
                NumericColumn::Float(indices.iter().map(|&i| v[i]).collect())
            }
        }
    }
}

impl Table {
    /// Create a new empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table with the given fields and no records
    pub fn with_fields<S: AsRef<str>>(fields: &[S]) -> Result<Self> {
        let mut table = Table::new();
        table.init_fields(fields)?;
        Ok(table)
    }

    /// Replace all fields with empty columns of the given names
    pub fn init_fields<S: AsRef<str>>(&mut self, fields: &[S]) -> Result<()> {
        let mut columns: Vec<String> = Vec::with_capacity(fields.len());
        for field in fields {
            let field = field.as_ref();
            if columns.iter().any(|c| c == field) {
                return Err(Error::DuplicateField(field.to_string()));
            }
            columns.push(field.to_string());
        }

        self.strings = columns.iter().map(|c| (c.clone(), Vec::new())).collect();
        self.numerics.clear();
        self.definitions.clear();
        self.unassigned.clear();
        self.columns = columns;
        Ok(())
    }

    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Number of records, failing when columns disagree
    pub fn record_count(&self) -> Result<usize> {
        let mut lengths: Vec<(String, usize)> = self
            .columns
            .iter()
            .map(|c| (c.clone(), self.strings.get(c).map_or(0, Vec::len)))
            .collect();
        if self.has_unassigned() {
            lengths.push((UNASSIGNED_COLUMN.to_string(), self.unassigned.len()));
        }

        let Some(&(_, expected)) = lengths.first() else {
            return Ok(0);
        };
        if lengths.iter().all(|(_, len)| *len == expected) {
            Ok(expected)
        } else {
            Err(Error::UnequalColumnLengths { lengths })
        }
    }

    /// Whether the table carries unassigned matter
    pub fn has_unassigned(&self) -> bool {
        !self.unassigned.is_empty()
    }

    /// Whether the table has a field of this name
    pub fn has_field(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Text values of a field
    pub fn column(&self, name: &str) -> Result<&[String]> {
        self.strings
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::UnknownField(name.to_string()))
    }

    /// Numeric values of a field, if it has been numerized
    pub fn numeric(&self, name: &str) -> Option<&NumericColumn> {
        self.numerics.get(name)
    }

    /// Text value at a record
    pub fn value(&self, field: &str, record: usize) -> Option<&str> {
        self.strings
            .get(field)
            .and_then(|v| v.get(record))
            .map(String::as_str)
    }

    /// Add a field; existing records get `"null"`
    pub fn add_field(&mut self, name: &str, definition: Option<&str>) -> Result<()> {
        if self.has_field(name) {
            return Err(Error::DuplicateField(name.to_string()));
        }
        let count = self.record_count()?;

        self.columns.push(name.to_string());
        self.strings
            .insert(name.to_string(), vec![NULL.to_string(); count]);
        if let Some(definition) = definition {
            self.definitions
                .insert(name.to_string(), definition.to_string());
        }
        Ok(())
    }

    /// Append one record with values in column order
    pub fn push_record<S: AsRef<str>>(&mut self, values: &[S]) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(Error::RecordWidth {
                expected: self.columns.len(),
                found: values.len(),
            });
        }
        self.record_count()?;

        for (field, value) in self.columns.iter().zip(values) {
            self.strings
                .entry(field.clone())
                .or_default()
                .push(value.as_ref().to_string());
        }
        if self.has_unassigned() {
            self.unassigned.push(NULL.to_string());
        }
        Ok(())
    }

    /// Set the unassigned matter; an empty vector drops it
    pub fn set_unassigned(&mut self, unassigned: Vec<String>) -> Result<()> {
        let count = self.record_count()?;
        if !unassigned.is_empty() && unassigned.len() != count {
            return Err(Error::UnequalColumnLengths {
                lengths: vec![
                    ("records".to_string(), count),
                    (UNASSIGNED_COLUMN.to_string(), unassigned.len()),
                ],
            });
        }
        self.unassigned = unassigned;
        Ok(())
    }

    /// Append `n` all-`"null"` records, then re-derive the numeric columns
    pub fn append_empty_records(&mut self, n: usize) -> Result<()> {
        self.record_count()?;

        for field in &self.columns {
            self.strings
                .entry(field.clone())
                .or_default()
                .extend(std::iter::repeat(NULL.to_string()).take(n));
        }
        if self.has_unassigned() {
            self.unassigned
                .extend(std::iter::repeat(NULL.to_string()).take(n));
        }

        self.numerize();
        Ok(())
    }

    /// Replace every blank value, and blank unassigned matter, with `"null"`
    pub fn nullify(&mut self) {
        for values in self.strings.values_mut() {
            for value in values.iter_mut().filter(|v| v.trim().is_empty()) {
                *value = NULL.to_string();
            }
        }
        for value in self.unassigned.iter_mut().filter(|v| v.trim().is_empty()) {
            *value = NULL.to_string();
        }
    }

    /// Replace every `"null"` or `"nan"` value with the empty string
    pub fn unnullify(&mut self) {
        fn is_absent(value: &str) -> bool {
            matches!(value.trim(), NULL | "nan")
        }
        for values in self.strings.values_mut() {
            for value in values.iter_mut().filter(|v| is_absent(v)) {
                value.clear();
            }
        }
        for value in self.unassigned.iter_mut().filter(|v| is_absent(v)) {
            value.clear();
        }
    }

    /// Copy of this table restricted to `fields`, in the given order.
    ///
    /// Definitions are pared down to the subset. Unassigned matter, metadata
    /// and precision are carried over.
    pub fn select<S: AsRef<str>>(&self, fields: &[S]) -> Result<Table> {
        let mut out = Table {
            unassigned: self.unassigned.clone(),
            metadata: self.metadata.clone(),
            ..Table::default()
        };

        for field in fields {
            let field = field.as_ref();
            let values = self.column(field)?;
            if out.has_field(field) {
                return Err(Error::DuplicateField(field.to_string()));
            }
            out.columns.push(field.to_string());
            out.strings.insert(field.to_string(), values.to_vec());
            if let Some(column) = self.numerics.get(field) {
                out.numerics.insert(field.to_string(), column.clone());
            }
            if let Some(definition) = self.definitions.get(field) {
                out.definitions
                    .insert(field.to_string(), definition.clone());
            }
            if let Some(&digits) = self.precision.get(field) {
                out.precision.insert(field.to_string(), digits);
            }
        }
        Ok(out)
    }

    /// Clear definitions when every one of them is empty
    pub(crate) fn drop_blank_definitions(&mut self) {
        let total: usize = self.definitions.values().map(|d| d.len()).sum();
        if total == 0 {
            self.definitions.clear();
        }
    }

    /// Definition of a field, or the empty string
    pub(crate) fn definition(&self, field: &str) -> &str {
        self.definitions.get(field).map_or("", String::as_str)
    }
}

/// Whether a value counts as absent for merges and writers
pub fn is_absent(value: &str) -> bool {
    value.is_empty() || value == NULL
}
