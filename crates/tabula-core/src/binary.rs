//! Binary columnar codec (`.dob`)
//!
//! A short text header followed by a row-major little-endian matrix:
//!
//! ```text
//! [file_type] Epdobin
//! [data_type] int64
//! [nmbr_rows] 2
//! [nmbr_cols] 2
//!
//! * x = easting
//! * y = northing
//! <2 x 2 x 8 bytes>
//! ```
//!
//! The matrix is located by size from the end of the document, so header text
//! never has to be terminated by a separator.

use crate::coerce::{numerize_column, Coerced};
use crate::error::{Error, Result};
use crate::format::{Parsed, BINARY_MARKER};
use crate::table::{NumericColumn, Table};
use bstr::ByteSlice;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Write};

const DATA_TYPE_TAG: &str = "[data_type]";
const ROWS_TAG: &str = "[nmbr_rows]";
const COLS_TAG: &str = "[nmbr_cols]";

/// Element type of the matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Int32,
    Int64,
    Float64,
}

impl DataType {
    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "int32" => Some(DataType::Int32),
            "int64" => Some(DataType::Int64),
            "float64" | "double" => Some(DataType::Float64),
            _ => None,
        }
    }

    /// Header spelling
    pub fn name(self) -> &'static str {
        match self {
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Float64 => "float64",
        }
    }

    /// Bytes per element
    pub fn size(self) -> usize {
        match self {
            DataType::Int32 => 4,
            DataType::Int64 | DataType::Float64 => 8,
        }
    }
}

fn malformed(reason: impl Into<String>) -> Error {
    Error::BinaryHeaderMalformed {
        reason: reason.into(),
    }
}

/// Text following the first occurrence of `tag`, up to the end of its line
fn header_value(content: &[u8], tag: &str) -> Option<String> {
    let start = content.find(tag)? + tag.len();
    let rest = &content[start..];
    let end = rest.find_byte(b'\n').unwrap_or(rest.len());
    Some(rest[..end].to_str_lossy().trim().to_string())
}

fn header_count(content: &[u8], tag: &str) -> Result<usize> {
    let value = header_value(content, tag).ok_or_else(|| malformed(format!("missing {}", tag)))?;
    value
        .parse()
        .map_err(|_| malformed(format!("{} '{}' is not a count", tag, value)))
}

/// `* field = description` lines, in order
fn header_fields(header: &str) -> Vec<(String, String)> {
    header
        .lines()
        .filter_map(|line| line.trim().strip_prefix("* "))
        .filter_map(|entry| entry.split_once('='))
        .map(|(field, text)| (field.trim().to_string(), text.trim().to_string()))
        .collect()
}

/// Parse a binary document.
///
/// Numeric columns are filled from the matrix and their text form is
/// derived straight away, so the result reads like any other table.
pub fn parse_binary(content: &[u8]) -> Result<Parsed> {
    if content.find(BINARY_MARKER).is_none() {
        return Err(malformed(format!("missing '{}'", BINARY_MARKER)));
    }

    let type_name =
        header_value(content, DATA_TYPE_TAG).ok_or_else(|| malformed("missing [data_type]"))?;
    let data_type = DataType::parse(&type_name)
        .ok_or_else(|| malformed(format!("unsupported data type '{}'", type_name)))?;
    let rows = header_count(content, ROWS_TAG)?;
    let cols = header_count(content, COLS_TAG)?;

    let body_size = rows
        .checked_mul(cols)
        .and_then(|n| n.checked_mul(data_type.size()))
        .ok_or_else(|| malformed("matrix size overflows"))?;
    if body_size > content.len() {
        return Err(malformed(format!(
            "{} x {} {} matrix needs {} bytes, document has {}",
            rows,
            cols,
            data_type.name(),
            body_size,
            content.len()
        )));
    }
    let (header, body) = content.split_at(content.len() - body_size);

    let mut fields = header_fields(&header.to_str_lossy());
    if fields.len() < cols {
        return Err(malformed(format!(
            "{} columns declared but {} field lines found",
            cols,
            fields.len()
        )));
    }
    fields.truncate(cols);

    let names: Vec<&String> = fields.iter().map(|(name, _)| name).collect();
    let mut table = Table::with_fields(&names)?;

    let mut reader = Cursor::new(body);
    let mut columns: Vec<NumericColumn> = (0..cols)
        .map(|_| match data_type {
            DataType::Float64 => NumericColumn::Float(Vec::with_capacity(rows)),
            _ => NumericColumn::Integer(Vec::with_capacity(rows)),
        })
        .collect();
    for _ in 0..rows {
        for column in columns.iter_mut() {
            match column {
                NumericColumn::Integer(values) if data_type == DataType::Int32 => {
                    values.push(i64::from(reader.read_i32::<LittleEndian>()?))
                }
                NumericColumn::Integer(values) => values.push(reader.read_i64::<LittleEndian>()?),
                NumericColumn::Float(values) => values.push(reader.read_f64::<LittleEndian>()?),
            }
        }
    }

    for ((name, definition), column) in fields.into_iter().zip(columns) {
        table.definitions.insert(name.clone(), definition);
        table.numerics.insert(name, column);
    }
    table.drop_blank_definitions();
    table.characterize();

    tracing::debug!(rows, cols, data_type = data_type.name(), "parsed binary");
    Ok(Parsed {
        table,
        warnings: Vec::new(),
    })
}

/// Write a table as a binary document.
///
/// Every field must be numeric. Fields without a numeric column are
/// numerized on the fly. The matrix is int64 when every column is integer,
/// float64 otherwise.
pub fn write_binary(table: &Table) -> Result<Vec<u8>> {
    let count = table.record_count()?;

    let mut columns = Vec::with_capacity(table.columns.len());
    for field in &table.columns {
        let column = match table.numerics.get(field).filter(|c| c.len() == count) {
            Some(column) => column.clone(),
            None => match numerize_column(table.column(field)?) {
                Coerced::Numeric(column) => column,
                Coerced::Text { .. } => return Err(Error::NonNumericColumn(field.clone())),
            },
        };
        columns.push(column);
    }
    if table.has_unassigned() {
        tracing::debug!("binary documents carry no unassigned matter; dropping it");
    }

    let data_type = if columns
        .iter()
        .all(|c| matches!(c, NumericColumn::Integer(_)))
    {
        DataType::Int64
    } else {
        DataType::Float64
    };

    let mut out = Vec::with_capacity(count * columns.len() * data_type.size() + 256);
    writeln!(out, "{}", BINARY_MARKER)?;
    writeln!(out, "{} {}", DATA_TYPE_TAG, data_type.name())?;
    writeln!(out, "{} {}", ROWS_TAG, count)?;
    writeln!(out, "{} {}", COLS_TAG, columns.len())?;
    writeln!(out)?;
    for field in &table.columns {
        writeln!(out, "* {} = {}", field, table.definition(field))?;
    }

    match data_type {
        DataType::Int64 => {
            let integers: Vec<&Vec<i64>> = columns
                .iter()
                .filter_map(|c| match c {
                    NumericColumn::Integer(values) => Some(values),
                    NumericColumn::Float(_) => None,
                })
                .collect();
            for record in 0..count {
                for values in &integers {
                    out.write_i64::<LittleEndian>(values[record])?;
                }
            }
        }
        _ => {
            let floats: Vec<Vec<f64>> = columns.iter().map(NumericColumn::to_f64).collect();
            for record in 0..count {
                for values in &floats {
                    out.write_f64::<LittleEndian>(values[record])?;
                }
            }
        }
    }

    Ok(out)
}
