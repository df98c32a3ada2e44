//! Load and save entrypoints over every codec

use crate::binary::{parse_binary, write_binary};
use crate::delimited::{parse_delimited, write_delimited};
use crate::error::{Error, Result, Warning};
use crate::format::{detect, Format, FormatChoice, Parsed};
use crate::indexed::{parse_indexed, write_indexed};
use crate::table::Table;
use crate::tagged::{parse_tagged, write_tagged, StartTag};
use crate::typeset::{parse_typeset, write_typeset, TypesetOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a document is read
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Sniff the content, or force a format
    pub format: FormatChoice,
    /// Tag that opens a tagged-text record; the first tag when unset
    pub start_tag: Option<String>,
}

/// How a table is written
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveOptions {
    /// Write only these fields, in this order
    pub fields: Option<Vec<String>>,
    /// Layout of typeset exports
    pub typeset: TypesetOptions,
}

/// A loaded table with the format it was read as
#[derive(Debug, Clone)]
pub struct Loaded {
    pub table: Table,
    pub format: Format,
    pub warnings: Vec<Warning>,
}

fn as_text(content: &[u8]) -> Result<&str> {
    Ok(std::str::from_utf8(content)?)
}

/// Parse content with one specific codec
pub fn parse_as(content: &[u8], format: Format, start_tag: Option<&str>) -> Result<Parsed> {
    match format {
        Format::Indexed => parse_indexed(as_text(content)?),
        Format::Tagged | Format::TaggedIndexed => {
            let start = start_tag.map_or(StartTag::FirstTag, StartTag::Named);
            parse_tagged(as_text(content)?, start)
        }
        Format::Binary => parse_binary(content),
        Format::Delimited => parse_delimited(content),
        Format::Typeset => parse_typeset(content),
    }
}

/// Load a document, sniffing its format unless one is forced.
///
/// A table whose columns disagree in length is still returned, with an
/// `UnequalColumnLengths` warning.
pub fn load(content: &[u8], options: &LoadOptions) -> Result<Loaded> {
    let mut warnings = Vec::new();
    let format = match options.format {
        FormatChoice::Auto => {
            let (format, warning) = detect(content)?;
            warnings.extend(warning);
            format
        }
        FormatChoice::Explicit(format) => format,
    };

    let parsed = parse_as(content, format, options.start_tag.as_deref())?;
    warnings.extend(parsed.warnings);

    warnings.extend(column_length_warning(&parsed.table));

    Ok(Loaded {
        table: parsed.table,
        format,
        warnings,
    })
}

/// Downgrade a column-length mismatch to a warning.
///
/// The built-in codecs pad every record, so this only fires for tables
/// assembled by hand or by codecs that trust their input.
fn column_length_warning(table: &Table) -> Option<Warning> {
    match table.record_count() {
        Err(Error::UnequalColumnLengths { lengths }) => {
            let warning = Warning::UnequalColumnLengths { lengths };
            tracing::warn!("{}", warning);
            Some(warning)
        }
        _ => None,
    }
}

/// Write a table in `format`
pub fn save(table: &Table, format: Format, options: &SaveOptions) -> Result<Vec<u8>> {
    let part;
    let table = match &options.fields {
        Some(fields) => {
            part = table.select(fields)?;
            &part
        }
        None => table,
    };

    match format {
        Format::Indexed => write_indexed(table).map(String::into_bytes),
        Format::Tagged | Format::TaggedIndexed => write_tagged(table).map(String::into_bytes),
        Format::Binary => write_binary(table),
        Format::Delimited => write_delimited(table),
        Format::Typeset => write_typeset(table, &options.typeset).map(String::into_bytes),
    }
}

/// Load a file.
///
/// With `FormatChoice::Auto` the content is sniffed first; content without
/// any marker falls back to the file extension, which is how delimited text
/// is recognized.
pub fn load_file<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<Loaded> {
    let path = path.as_ref();
    let content = std::fs::read(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    match load(&content, options) {
        Err(Error::FormatUnrecognized) => {
            let format = Format::from_path(path)
                .filter(|f| f.is_readable())
                .ok_or(Error::FormatUnrecognized)?;
            tracing::debug!(path = %path.display(), %format, "no format marker, using extension");
            load(
                &content,
                &LoadOptions {
                    format: FormatChoice::Explicit(format),
                    ..options.clone()
                },
            )
        }
        other => other,
    }
}

/// Write a table to a file; the format defaults to the one its extension names
pub fn save_file<P: AsRef<Path>>(
    table: &Table,
    path: P,
    format: Option<Format>,
    options: &SaveOptions,
) -> Result<Format> {
    let path = path.as_ref();
    let format = match format {
        Some(format) => format,
        None => Format::from_path(path)
            .ok_or_else(|| Error::UnknownFormat(path.display().to_string()))?,
    };
    std::fs::write(path, save(table, format, options)?)?;
    Ok(format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unequal_columns_become_a_warning() {
        let mut table = Table::with_fields(&["a", "b"]).unwrap();
        table.push_record(&["1", "2"]).unwrap();
        assert!(column_length_warning(&table).is_none());

        if let Some(values) = table.strings.get_mut("b") {
            values.push("3".to_string());
        }
        match column_length_warning(&table) {
            Some(Warning::UnequalColumnLengths { lengths }) => assert_eq!(
                lengths,
                vec![("a".to_string(), 1), ("b".to_string(), 2)]
            ),
            other => panic!("expected a length warning, got {:?}", other),
        }
    }

    #[test]
    fn test_load_sniffs_format() {
        let loaded = load(b"++ a # b\n1 # 2\n++\n", &LoadOptions::default()).unwrap();
        assert_eq!(loaded.format, Format::Indexed);
        assert_eq!(loaded.table.column("b").unwrap(), &["2"]);
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn test_load_reports_ambiguity() {
        let doc = b"[id] 1\n\n++ a # b\n";
        let loaded = load(doc, &LoadOptions::default()).unwrap();
        assert_eq!(loaded.format, Format::Tagged);
        assert_eq!(loaded.table.unassigned, vec!["++ a # b"]);
        assert!(matches!(
            loaded.warnings.as_slice(),
            [Warning::AmbiguousFormat { .. }]
        ));
    }

    #[test]
    fn test_load_explicit_format_and_start_tag() {
        let options = LoadOptions {
            format: FormatChoice::Explicit(Format::Tagged),
            start_tag: Some("id".to_string()),
        };
        let loaded = load(b"[title] survey\n[id] 1\n[id] 2\n", &options).unwrap();
        assert_eq!(loaded.table.columns, vec!["id"]);
        assert_eq!(loaded.table.record_count().unwrap(), 2);
    }

    #[test]
    fn test_load_unrecognized_fails() {
        assert!(matches!(
            load(b"just text", &LoadOptions::default()),
            Err(Error::FormatUnrecognized)
        ));
    }

    #[test]
    fn test_save_field_subset() {
        let mut table = Table::with_fields(&["a", "b", "c"]).unwrap();
        table.push_record(&["1", "2", "3"]).unwrap();
        let options = SaveOptions {
            fields: Some(vec!["c".to_string(), "a".to_string()]),
            ..SaveOptions::default()
        };

        let doc = save(&table, Format::Indexed, &options).unwrap();
        assert_eq!(String::from_utf8(doc).unwrap(), "++ c # a\n3 # 1\n++\n");
    }

    #[test]
    fn test_options_from_json() {
        let options: LoadOptions =
            serde_json::from_str(r#"{"format": {"explicit": "delimited"}}"#).unwrap();
        assert_eq!(options.format, FormatChoice::Explicit(Format::Delimited));
        assert!(options.start_tag.is_none());

        let options: SaveOptions =
            serde_json::from_str(r#"{"typeset": {"caption": "Sites"}}"#).unwrap();
        assert_eq!(options.typeset.caption, "Sites");
        assert!(options.fields.is_none());
    }
}
