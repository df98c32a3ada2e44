//! Error and warning types for tabula-core

use crate::format::Format;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tabula-core
#[derive(Debug, Error)]
pub enum Error {
    /// Neither a binary marker, `++` nor `[` was found in the document
    #[error("unrecognized document format: no '++', '[' or binary marker found")]
    FormatUnrecognized,

    /// The binary header is missing a required tag or does not describe the data
    #[error("malformed binary header: {reason}")]
    BinaryHeaderMalformed { reason: String },

    /// Columns of a table disagree on the number of records
    #[error("columns have unequal record counts: {}", format_lengths(.lengths))]
    UnequalColumnLengths { lengths: Vec<(String, usize)> },

    /// More than one record in the merge result carries the same key
    #[error("merge key {} is not unique: shared by records {records:?}", format_key(.key))]
    NonUniqueMergeKey {
        key: Vec<(String, String)>,
        records: Vec<usize>,
    },

    /// A field name that the table does not have
    #[error("unknown field '{0}'")]
    UnknownField(String),

    /// A field name that the table already has
    #[error("duplicate field '{0}'")]
    DuplicateField(String),

    /// A record index past the end of the table
    #[error("record index {index} out of range for table with {len} records")]
    RecordOutOfRange { index: usize, len: usize },

    /// A column that must be numeric holds text
    #[error("field '{0}' is not numeric")]
    NonNumericColumn(String),

    /// A row of values that does not line up with the table's fields
    #[error("record has {found} values but the table has {expected} fields")]
    RecordWidth { expected: usize, found: usize },

    /// The requested operation is not available for this format
    #[error("{format} does not support {operation}")]
    UnsupportedFormat {
        format: Format,
        operation: &'static str,
    },

    /// Unknown format name or file extension
    #[error("unknown format '{0}'")]
    UnknownFormat(String),

    /// A text format was given bytes that are not UTF-8
    #[error("document is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the csv crate
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_lengths(lengths: &[(String, usize)]) -> String {
    lengths
        .iter()
        .map(|(field, len)| format!("{}={}", field, len))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_key(key: &[(String, String)]) -> String {
    let pairs: Vec<String> = key
        .iter()
        .map(|(field, value)| format!("{}='{}'", field, value))
        .collect();
    format!("{{{}}}", pairs.join(", "))
}

/// Non-fatal diagnostics produced while loading or coercing a table
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// Both `++` and `[` occur; the earlier marker decided the format
    AmbiguousFormat { chosen: Format },
    /// A parsed table has columns of different lengths
    UnequalColumnLengths { lengths: Vec<(String, usize)> },
    /// A record line had fewer or more values than the header declared
    RaggedRecord {
        line: usize,
        expected: usize,
        found: usize,
    },
    /// A column could not be parsed as numbers and stays textual
    NumericCoercion { field: String, sample: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::AmbiguousFormat { chosen } => write!(
                f,
                "document contains both '++' and '['; reading as {}",
                chosen
            ),
            Warning::UnequalColumnLengths { lengths } => write!(
                f,
                "columns have unequal record counts: {}",
                format_lengths(lengths)
            ),
            Warning::RaggedRecord {
                line,
                expected,
                found,
            } => write!(
                f,
                "line {} has {} values, expected {}",
                line, found, expected
            ),
            Warning::NumericCoercion { field, sample } => write!(
                f,
                "field '{}' stays textual: '{}' is not a number",
                field, sample
            ),
        }
    }
}
