//! Indexed-text codec (`.dex`)
//!
//! ```text
//! ;; comment
//! ++ id # name # umat
//! ** key # full name # Unassigned matter
//! 1 # Ada # first|NL|second
//! ++
//! ```

use crate::error::{Result, Warning};
use crate::format::Parsed;
use crate::table::{is_unassigned_column, Table, NULL, UNASSIGNED_COLUMN};

/// Escape that stands for a newline inside a one-line record
pub const NEWLINE_ESCAPE: &str = "|NL|";

const SEPARATOR: char = '#';

/// Parse an indexed-text document
pub fn parse_indexed(content: &str) -> Result<Parsed> {
    let mut fields: Option<Vec<String>> = None;
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut definitions: Vec<String> = Vec::new();
    let mut warnings = Vec::new();

    for (line_idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        if trimmed.starts_with(";;") {
            continue;
        }
        if trimmed == "++" {
            break;
        }
        if let Some(header) = trimmed.strip_prefix("++") {
            fields = Some(
                header
                    .split(SEPARATOR)
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .map(str::to_string)
                    .collect(),
            );
            continue;
        }

        let Some(fields) = fields.as_ref() else {
            continue;
        };

        if let Some(defs) = trimmed.strip_prefix("**") {
            definitions = split_values(defs, fields.len(), line_idx + 1, &mut warnings);
            continue;
        }

        rows.push(split_values(line, fields.len(), line_idx + 1, &mut warnings));
    }

    let fields = fields.unwrap_or_default();
    tracing::debug!(fields = fields.len(), records = rows.len(), "parsed indexed-text");
    Ok(Parsed {
        table: assemble(fields, rows, definitions)?,
        warnings,
    })
}

/// Split one line on `#`, padding short lines with `"null"`.
///
/// A trailing separator is allowed; any other surplus values are dropped
/// with a warning.
fn split_values(
    line: &str,
    expected: usize,
    line_no: usize,
    warnings: &mut Vec<Warning>,
) -> Vec<String> {
    let mut values: Vec<String> = line
        .split(SEPARATOR)
        .map(|v| v.trim().replace(NEWLINE_ESCAPE, "\n"))
        .collect();

    let found = values.len();
    if found < expected {
        let warning = Warning::RaggedRecord {
            line: line_no,
            expected,
            found,
        };
        tracing::warn!("{}", warning);
        warnings.push(warning);
        values.resize(expected, NULL.to_string());
    } else if found > expected {
        if values[expected..].iter().any(|v| !v.is_empty()) {
            let warning = Warning::RaggedRecord {
                line: line_no,
                expected,
                found,
            };
            tracing::warn!("{}", warning);
            warnings.push(warning);
        }
        values.truncate(expected);
    }
    values
}

/// Build a table from header fields and row values, pulling the `umat`
/// column out into unassigned matter.
pub(crate) fn assemble(
    fields: Vec<String>,
    rows: Vec<Vec<String>>,
    definitions: Vec<String>,
) -> Result<Table> {
    let unassigned_idx = fields.iter().position(|f| is_unassigned_column(f));

    let kept: Vec<&String> = fields
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != unassigned_idx)
        .map(|(_, f)| f)
        .collect();
    let mut table = Table::with_fields(&kept)?;

    for (i, field) in fields.iter().enumerate() {
        if Some(i) == unassigned_idx {
            continue;
        }
        let column: Vec<String> = rows.iter().map(|row| row[i].clone()).collect();
        table.strings.insert(field.clone(), column);
        if let Some(definition) = definitions.get(i) {
            table
                .definitions
                .insert(field.clone(), definition.clone());
        }
    }

    if let Some(idx) = unassigned_idx {
        table.unassigned = rows.iter().map(|row| row[idx].clone()).collect();
    }
    table.drop_blank_definitions();
    Ok(table)
}

/// One output column of a flat writer
#[derive(Clone, Copy)]
pub(crate) enum Slot<'a> {
    Field(&'a str),
    Unassigned,
}

impl Slot<'_> {
    pub(crate) fn name(&self) -> &str {
        match self {
            Slot::Field(name) => name,
            Slot::Unassigned => UNASSIGNED_COLUMN,
        }
    }

    pub(crate) fn value<'t>(&self, table: &'t Table, record: usize) -> &'t str {
        match self {
            Slot::Field(name) => table.value(name, record).unwrap_or(NULL),
            Slot::Unassigned => &table.unassigned[record],
        }
    }
}

/// Columns a flat writer emits: every field, then unassigned matter if any
pub(crate) fn slots(table: &Table) -> Vec<Slot<'_>> {
    let mut slots: Vec<Slot> = table.columns.iter().map(|c| Slot::Field(c)).collect();
    if table.has_unassigned() {
        slots.push(Slot::Unassigned);
    }
    slots
}

/// Write a table as an indexed-text document
pub fn write_indexed(table: &Table) -> Result<String> {
    let count = table.record_count()?;
    let slots = slots(table);

    let names: Vec<&str> = slots.iter().map(Slot::name).collect();
    let mut out = format!("++ {}\n", names.join(" # "));

    if !table.definitions.is_empty() {
        let defs: Vec<String> = slots
            .iter()
            .map(|slot| match slot {
                Slot::Field(name) => escape(table.definition(name)),
                Slot::Unassigned => "Unassigned matter".to_string(),
            })
            .collect();
        out.push_str(&format!("** {}\n", defs.join(" # ")));
    }

    for record in 0..count {
        let values: Vec<String> = slots
            .iter()
            .map(|slot| escape(slot.value(table, record)))
            .collect();
        out.push_str(&values.join(" # "));
        out.push('\n');
    }

    out.push_str("++\n");
    Ok(out)
}

fn escape(value: &str) -> String {
    value.replace('\n', NEWLINE_ESCAPE)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = ";; survey points
++ id # name # umat
** key # full name # Unassigned matter
1 # Ada # first|NL|second
2 # Bob #
;; trailing comment
++
3 # ignored # after end
";

    #[test]
    fn test_parse_indexed() {
        let parsed = parse_indexed(DOC).unwrap();
        let table = parsed.table;

        assert_eq!(table.columns, vec!["id", "name"]);
        assert_eq!(table.column("id").unwrap(), &["1", "2"]);
        assert_eq!(table.unassigned, vec!["first\nsecond", ""]);
        assert_eq!(table.definitions["name"], "full name");
        assert!(!table.definitions.contains_key("umat"));
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_parse_without_definitions() {
        let table = parse_indexed("++ a # b #\n1 # 2 #\n++\n").unwrap().table;
        assert_eq!(table.columns, vec!["a", "b"]);
        assert!(table.definitions.is_empty());
        assert!(table.unassigned.is_empty());
    }

    #[test]
    fn test_blank_definitions_are_dropped() {
        let table = parse_indexed("++ a # b\n**  # \n1 # 2\n++\n").unwrap().table;
        assert!(table.definitions.is_empty());
    }

    #[test]
    fn test_short_record_is_padded_with_warning() {
        let parsed = parse_indexed("++ a # b # c\n1 # 2\n++\n").unwrap();
        assert_eq!(parsed.table.value("c", 0), Some("null"));
        assert_eq!(
            parsed.warnings,
            vec![Warning::RaggedRecord {
                line: 2,
                expected: 3,
                found: 2
            }]
        );
    }

    #[test]
    fn test_write_indexed() {
        let mut table = Table::with_fields(&["id", "note"]).unwrap();
        table.push_record(&["1", "two\nlines"]).unwrap();
        table
            .definitions
            .insert("id".to_string(), "key".to_string());
        table.set_unassigned(vec!["free".to_string()]).unwrap();

        let doc = write_indexed(&table).unwrap();
        assert_eq!(
            doc,
            "++ id # note # umat\n** key #  # Unassigned matter\n1 # two|NL|lines # free\n++\n"
        );
    }

    #[test]
    fn test_blank_line_is_a_record() {
        let parsed = parse_indexed("++ a # b\n1 # 2\n\n3 # 4\n++\n").unwrap();
        assert_eq!(parsed.table.column("a").unwrap(), &["1", "", "3"]);
        assert_eq!(parsed.table.column("b").unwrap(), &["2", "null", "4"]);
        assert!(matches!(
            parsed.warnings.as_slice(),
            [Warning::RaggedRecord { line: 3, .. }]
        ));
    }

    #[test]
    fn test_empty_single_value_survives_round_trip() {
        let mut table = Table::with_fields(&["note"]).unwrap();
        for value in ["a", "", "b"] {
            table.push_record(&[value]).unwrap();
        }

        let doc = write_indexed(&table).unwrap();
        let again = parse_indexed(&doc).unwrap().table;
        assert_eq!(again.record_count().unwrap(), 3);
        assert_eq!(again.column("note").unwrap(), &["a", "", "b"]);
    }

    #[test]
    fn test_round_trip() {
        let table = parse_indexed(DOC).unwrap().table;
        let again = parse_indexed(&write_indexed(&table).unwrap()).unwrap().table;
        assert_eq!(again, table);
    }
}
