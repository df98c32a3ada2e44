//! Delimited-text codec (`.csv`)
//!
//! The first non-comment line names the fields. A column named `umat` holds
//! unassigned matter, and `|NL|` stands for a newline inside a value.

use crate::error::{Error, Result, Warning};
use crate::format::Parsed;
use crate::indexed::{assemble, slots, NEWLINE_ESCAPE};
use crate::table::{Table, NULL};
use csv::{QuoteStyle, ReaderBuilder, Terminator, Trim, WriterBuilder};

/// Parse a delimited-text document
pub fn parse_delimited(content: &[u8]) -> Result<Parsed> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(Trim::All)
        .from_reader(content);

    let mut records = reader.records();
    let Some(header) = records.next().transpose()? else {
        return Ok(Parsed::default());
    };

    let mut fields: Vec<String> = header.iter().map(str::to_string).collect();
    while fields.last().is_some_and(|f| f.is_empty()) {
        fields.pop();
    }

    let mut rows = Vec::new();
    let mut warnings = Vec::new();
    for result in records {
        let record = result?;
        let mut values: Vec<String> = record
            .iter()
            .map(|v| v.replace(NEWLINE_ESCAPE, "\n"))
            .collect();

        let found = values.len();
        let surplus = values.get(fields.len()..).unwrap_or_default();
        if found < fields.len() || surplus.iter().any(|v| !v.is_empty()) {
            let warning = Warning::RaggedRecord {
                line: record.position().map_or(0, |p| p.line() as usize),
                expected: fields.len(),
                found,
            };
            tracing::warn!("{}", warning);
            warnings.push(warning);
        }
        values.resize(fields.len(), NULL.to_string());
        rows.push(values);
    }

    tracing::debug!(fields = fields.len(), records = rows.len(), "parsed delimited-text");
    Ok(Parsed {
        table: assemble(fields, rows, Vec::new())?,
        warnings,
    })
}

/// Write a table as delimited text, quoting every value
pub fn write_delimited(table: &Table) -> Result<Vec<u8>> {
    let count = table.record_count()?;
    let slots = slots(table);
    if slots.is_empty() {
        return Ok(Vec::new());
    }

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(slots.iter().map(|slot| slot.name()))?;
    for record in 0..count {
        writer.write_record(slots.iter().map(|slot| {
            let value = slot.value(table, record);
            table
                .formatted_value(slot.name(), value)
                .replace('\n', NEWLINE_ESCAPE)
        }))?;
    }

    writer.into_inner().map_err(|e| Error::Io(e.into_error()))
}
