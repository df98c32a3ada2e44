//! tabula-core: Core library for reading, writing and merging tabular documents
//!
//! This library provides functionality to:
//! - Detect and parse indexed-text, tagged-text, binary and delimited documents
//! - Write tables back out in any of those formats, or as a typeset table
//! - Coerce text columns to numbers and back
//! - Match, search, sort and subset records
//! - Merge two tables on key fields
//! - Discover documents in directory trees

pub mod binary;
pub mod coerce;
pub mod delimited;
pub mod error;
pub mod format;
pub mod indexed;
pub mod io;
pub mod merger;
pub mod nested;
pub mod records;
pub mod scanner;
pub mod table;
pub mod tagged;
pub mod typeset;

pub use coerce::{characterize_column, format_with_precision, numerize_column, Coerced};
pub use error::{Error, Result, Warning};
pub use format::{detect, Format, FormatChoice, Parsed};
pub use io::{load, load_file, parse_as, save, save_file, LoadOptions, Loaded, SaveOptions};
pub use merger::{merge_tables, Unmatched};
pub use nested::NestedSource;
pub use records::{FieldRange, MatchMode, MatchQuery, Matches};
pub use scanner::{scan_directory, Document, ScanResult};
pub use table::{NumericColumn, Table, NULL, UNASSIGNED_COLUMN};
pub use tagged::StartTag;
pub use typeset::{Justify, TypesetOptions};
