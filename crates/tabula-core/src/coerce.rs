//! Conversion between text columns and numeric columns
//!
//! `numerize` derives `Table::numerics` from `Table::strings`; `characterize`
//! goes the other way and overwrites the text. Neither runs implicitly.

use crate::error::Warning;
use crate::table::{NumericColumn, Table, NULL};

/// Outcome of coercing one column
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    /// Parsed as numbers
    Numeric(NumericColumn),
    /// Stays textual; `sample` is the first value that did not parse
    Text { sample: String },
}

fn is_missing(value: &str) -> bool {
    value.is_empty() || value == NULL
}

/// Parse a whole column of text as numbers.
///
/// Missing values (`"null"` and the empty string) are left out of the probe.
/// If the rest parse as i64 and nothing is missing the column is integer. Any
/// missing value makes the column floating-point with NaN in those slots,
/// since integers have no NaN.
pub fn numerize_column<S: AsRef<str>>(values: &[S]) -> Coerced {
    let present: Vec<(usize, &str)> = values
        .iter()
        .enumerate()
        .map(|(i, v)| (i, v.as_ref()))
        .filter(|(_, v)| !is_missing(v))
        .collect();
    let complete = present.len() == values.len();

    let integers: Option<Vec<i64>> = present
        .iter()
        .map(|(_, v)| v.trim().parse::<i64>().ok())
        .collect();
    if let Some(integers) = integers {
        if complete {
            return Coerced::Numeric(NumericColumn::Integer(integers));
        }
        let mut column = vec![f64::NAN; values.len()];
        for ((index, _), value) in present.iter().zip(integers) {
            column[*index] = value as f64;
        }
        return Coerced::Numeric(NumericColumn::Float(column));
    }

    let mut column = vec![f64::NAN; values.len()];
    for (index, value) in &present {
        match value.trim().parse::<f64>() {
            Ok(number) => column[*index] = number,
            Err(_) => {
                return Coerced::Text {
                    sample: value.to_string(),
                }
            }
        }
    }
    Coerced::Numeric(NumericColumn::Float(column))
}

/// Text form of a numeric column; NaN becomes `"null"`
pub fn characterize_column(column: &NumericColumn) -> Vec<String> {
    match column {
        NumericColumn::Integer(values) => values.iter().map(i64::to_string).collect(),
        NumericColumn::Float(values) => values.iter().map(|&v| format_float(v)).collect(),
    }
}

/// Shortest text that parses back to the same f64
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        NULL.to_string()
    } else {
        format!("{:?}", value)
    }
}

/// Apply a precision directive to numeric-looking text.
///
/// Zero digits rounds half to even and prints an integer; more digits print
/// fixed-point. Absent values and text that does not parse pass through.
pub fn format_with_precision(value: &str, digits: usize) -> String {
    if matches!(value.trim(), NULL | "nan") {
        return value.to_string();
    }
    match value.trim().parse::<f64>() {
        Ok(number) if number.is_finite() => {
            if digits == 0 {
                let rounded = number.round_ties_even();
                if rounded >= i64::MIN as f64 && rounded < i64::MAX as f64 {
                    format!("{}", rounded as i64)
                } else {
                    format!("{:.0}", rounded)
                }
            } else {
                format!("{:.*}", digits, number)
            }
        }
        _ => value.to_string(),
    }
}

impl Table {
    /// Text of a value as a writer should emit it, honoring precision
    pub(crate) fn formatted_value(&self, field: &str, value: &str) -> String {
        match self.precision.get(field) {
            Some(&digits) => format_with_precision(value, digits),
            None => value.to_string(),
        }
    }
}

impl Table {
    /// Derive `numerics` from `strings`, replacing any earlier numeric columns.
    ///
    /// Columns that do not parse stay textual and are reported as warnings;
    /// they never abort the rest of the table.
    pub fn numerize(&mut self) -> Vec<Warning> {
        let mut warnings = Vec::new();
        self.numerics.clear();

        for field in &self.columns {
            let Some(values) = self.strings.get(field) else {
                continue;
            };
            match numerize_column(values) {
                Coerced::Numeric(column) => {
                    self.numerics.insert(field.clone(), column);
                }
                Coerced::Text { sample } => {
                    tracing::debug!(field = %field, sample = %sample, "column stays textual");
                    warnings.push(Warning::NumericCoercion {
                        field: field.clone(),
                        sample,
                    });
                }
            }
        }
        warnings
    }

    /// Overwrite `strings` with the text form of every numeric column.
    ///
    /// A numeric column whose length no longer matches its text column (the
    /// table grew after `numerize`) is left out and the text is kept.
    pub fn characterize(&mut self) {
        for (field, column) in &self.numerics {
            let current = self.strings.get(field).map_or(0, Vec::len);
            if self.strings.contains_key(field) && column.len() != current {
                tracing::warn!(
                    field = %field,
                    numeric = column.len(),
                    text = current,
                    "stale numeric column not characterized"
                );
                continue;
            }
            self.strings
                .insert(field.clone(), characterize_column(column));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numerize_integers() {
        assert_eq!(
            numerize_column(&["1", "-2", " 30 "]),
            Coerced::Numeric(NumericColumn::Integer(vec![1, -2, 30]))
        );
    }

    #[test]
    fn test_numerize_missing_makes_float() {
        match numerize_column(&["1", "null", "3"]) {
            Coerced::Numeric(NumericColumn::Float(v)) => {
                assert_eq!(v[0], 1.0);
                assert!(v[1].is_nan());
                assert_eq!(v[2], 3.0);
            }
            other => panic!("expected float column, got {:?}", other),
        }
    }

    #[test]
    fn test_numerize_mixed_int_and_float() {
        assert_eq!(
            numerize_column(&["1", "2.5", "1e3"]),
            Coerced::Numeric(NumericColumn::Float(vec![1.0, 2.5, 1000.0]))
        );
    }

    #[test]
    fn test_numerize_text_stays_text() {
        assert_eq!(
            numerize_column(&["1", "red", "3"]),
            Coerced::Text {
                sample: "red".to_string()
            }
        );
    }

    #[test]
    fn test_numerize_all_missing_is_nan_column() {
        match numerize_column(&["", "null"]) {
            Coerced::Numeric(NumericColumn::Float(v)) => assert!(v.iter().all(|x| x.is_nan())),
            other => panic!("expected float column, got {:?}", other),
        }
    }

    #[test]
    fn test_table_numerize_then_characterize() {
        let mut table = Table::with_fields(&["x", "label"]).unwrap();
        table.push_record(&["2", "a"]).unwrap();
        table.push_record(&["", "b"]).unwrap();

        let warnings = table.numerize();
        assert_eq!(warnings.len(), 1);
        assert!(table.numeric("label").is_none());

        table.characterize();
        assert_eq!(table.column("x").unwrap(), &["2.0", "null"]);
        assert_eq!(table.column("label").unwrap(), &["a", "b"]);
    }

    #[test]
    fn test_precision_rule() {
        assert_eq!(format_with_precision("2.5", 0), "2");
        assert_eq!(format_with_precision("3.5", 0), "4");
        assert_eq!(format_with_precision("1.23456", 2), "1.23");
        assert_eq!(format_with_precision("7", 3), "7.000");
        assert_eq!(format_with_precision("red", 2), "red");
        assert_eq!(format_with_precision("null", 2), "null");
        assert_eq!(format_with_precision("-0.4", 0), "0");
    }

    #[test]
    fn test_precision_zero_beyond_integer_range() {
        assert_eq!(
            format_with_precision("1e30", 0),
            "1000000000000000019884624838656"
        );
        assert_eq!(
            format_with_precision("-1e19", 0),
            "-10000000000000000000"
        );
    }

    #[test]
    fn test_characterize_keeps_records_added_after_numerize() {
        let mut table = Table::with_fields(&["x", "y"]).unwrap();
        table.push_record(&["1", "2"]).unwrap();
        assert!(table.numerize().is_empty());

        table.push_record(&["3", "4"]).unwrap();
        table.characterize();

        assert_eq!(table.record_count().unwrap(), 2);
        assert_eq!(table.column("x").unwrap(), &["1", "3"]);
        assert_eq!(table.column("y").unwrap(), &["2", "4"]);
    }

    #[test]
    fn test_format_float_round_trips() {
        for value in [0.1, 3.0, -1.5e-12, 1e100, 123456789.125] {
            assert_eq!(format_float(value).parse::<f64>().unwrap(), value);
        }
    }
}
