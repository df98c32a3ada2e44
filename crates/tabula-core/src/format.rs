//! Document formats and content sniffing

use crate::error::{Error, Result, Warning};
use crate::table::Table;
use bstr::ByteSlice;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Marker that identifies a binary columnar document
pub const BINARY_MARKER: &str = "[file_type] Epdobin";

/// The document formats a table can be read from or written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// `++`-delimited text, one record per line (`.dex`)
    Indexed,
    /// Bracket-tagged text (`.dat`)
    Tagged,
    /// Tagged text whose unassigned matter holds indexed documents (`.ddx`)
    TaggedIndexed,
    /// Text header followed by a raw numeric matrix (`.dob`)
    Binary,
    /// Comma-separated values (`.csv`)
    Delimited,
    /// Typeset table export, write-only (`.tex`)
    Typeset,
}

impl Format {
    /// All formats, in detection-independent order
    pub const ALL: [Format; 6] = [
        Format::Indexed,
        Format::Tagged,
        Format::TaggedIndexed,
        Format::Binary,
        Format::Delimited,
        Format::Typeset,
    ];

    /// Canonical file extension, without the dot
    pub fn extension(self) -> &'static str {
        match self {
            Format::Indexed => "dex",
            Format::Tagged => "dat",
            Format::TaggedIndexed => "ddx",
            Format::Binary => "dob",
            Format::Delimited => "csv",
            Format::Typeset => "tex",
        }
    }

    /// Map a file path to a format by its extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Format> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        Format::ALL.into_iter().find(|f| f.extension() == ext)
    }

    /// Whether documents of this format can be parsed back into a table
    pub fn is_readable(self) -> bool {
        !matches!(self, Format::Typeset)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Indexed => "indexed-text",
            Format::Tagged => "tagged-text",
            Format::TaggedIndexed => "tagged-text (indexed unassigned matter)",
            Format::Binary => "binary",
            Format::Delimited => "delimited-text",
            Format::Typeset => "typeset",
        };
        f.write_str(name)
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dex" | "epdex" | "indexed" => Ok(Format::Indexed),
            "dat" | "epdata" | "epdat" | "tagged" => Ok(Format::Tagged),
            "ddx" | "epdadex" => Ok(Format::TaggedIndexed),
            "dob" | "epdob" | "epdobin" | "binary" => Ok(Format::Binary),
            "csv" | "delimited" => Ok(Format::Delimited),
            "tex" | "latex" | "typeset" => Ok(Format::Typeset),
            other => Err(Error::UnknownFormat(other.to_string())),
        }
    }
}

/// How `load` picks a codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatChoice {
    /// Sniff the content
    #[default]
    Auto,
    /// Use this format regardless of content
    Explicit(Format),
}

impl FromStr for FormatChoice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("auto") {
            Ok(FormatChoice::Auto)
        } else {
            s.parse().map(FormatChoice::Explicit)
        }
    }
}

/// A parsed document plus the non-fatal diagnostics met along the way
#[derive(Debug, Clone, Default)]
pub struct Parsed {
    pub table: Table,
    pub warnings: Vec<Warning>,
}

/// Sniff raw document content and pick a format.
///
/// The binary marker wins outright. Otherwise the first `++` and the first
/// `[` decide; when both occur the earlier one wins and a warning is returned,
/// since either format may carry the other inside its unassigned matter.
pub fn detect(content: &[u8]) -> Result<(Format, Option<Warning>)> {
    if content.find(BINARY_MARKER).is_some() {
        return Ok((Format::Binary, None));
    }

    let plus = content.find("++");
    let bracket = content.find("[");

    match (plus, bracket) {
        (Some(_), None) => Ok((Format::Indexed, None)),
        (None, Some(_)) => Ok((Format::Tagged, None)),
        (Some(p), Some(b)) => {
            let chosen = if b < p { Format::Tagged } else { Format::Indexed };
            let warning = Warning::AmbiguousFormat { chosen };
            tracing::warn!("{}", warning);
            Ok((chosen, Some(warning)))
        }
        (None, None) => Err(Error::FormatUnrecognized),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_binary_marker_wins() {
        let doc = b"++ a # b\n[file_type] Epdobin\n";
        let (format, warning) = detect(doc).unwrap();
        assert_eq!(format, Format::Binary);
        assert!(warning.is_none());
    }

    #[test]
    fn test_detect_single_marker() {
        assert_eq!(detect(b"++ a # b\n1 # 2\n++\n").unwrap().0, Format::Indexed);
        assert_eq!(detect(b"[id] 1\n[name] x\n").unwrap().0, Format::Tagged);
    }

    #[test]
    fn test_detect_ambiguous_first_marker_wins() {
        let (format, warning) = detect(b"[id] 1\n\n++ a # b\n++\n").unwrap();
        assert_eq!(format, Format::Tagged);
        assert_eq!(
            warning,
            Some(Warning::AmbiguousFormat {
                chosen: Format::Tagged
            })
        );

        let (format, warning) = detect(b"++ a # note\nsee [ref] # x\n++\n").unwrap();
        assert_eq!(format, Format::Indexed);
        assert!(warning.is_some());
    }

    #[test]
    fn test_detect_unrecognized() {
        assert!(matches!(
            detect(b"a,b\n1,2\n"),
            Err(Error::FormatUnrecognized)
        ));
    }

    #[test]
    fn test_format_names_and_extensions() {
        assert_eq!("epdex".parse::<Format>().unwrap(), Format::Indexed);
        assert_eq!("LaTeX".parse::<Format>().unwrap(), Format::Typeset);
        assert_eq!("auto".parse::<FormatChoice>().unwrap(), FormatChoice::Auto);
        assert_eq!(Format::from_path("dir/points.DOB"), Some(Format::Binary));
        assert_eq!(Format::from_path("notes.txt"), None);
        assert!("xml".parse::<Format>().is_err());
    }
}
