//! Tagged-text codec (`.dat`, `.ddx`)
//!
//! Each record opens with a start tag; every `[label] value` line assigns a
//! field of the current record:
//!
//! ```text
//! * [id] catalogue number
//! * [note] remarks
//!
//! --------------------------------------------------------------------------------
//!
//! [id] 1
//! [note] && first paragraph
//!
//! second paragraph &&
//!
//! Free text here is the record's unassigned matter.
//!
//! --------------------------------------------------------------------------------
//! ```
//!
//! A line that follows a field without a blank line continues that field.
//! Text between a pair of `&&` markers stays with the field across blank
//! lines, and each blank-line gap becomes a paragraph break. Any other text is
//! unassigned matter, which runs until the next tag.

use crate::error::Result;
use crate::format::Parsed;
use crate::table::{Table, NULL};
use std::collections::BTreeMap;

/// Width of the dash rule that closes each record
pub const RULE_WIDTH: usize = 80;

const BLOCK_MARKER: &str = "&&";
const PARTITION_PREFIXES: [&str; 4] = ["-----", ":::::", ".....", "====="];

/// Which tag starts a new record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartTag<'a> {
    /// Whatever tag appears first in the document
    #[default]
    FirstTag,
    /// A specific label
    Named(&'a str),
}

/// Where the previous line left the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineState {
    /// Nothing to continue; text starts unassigned matter
    AwaitingTag,
    /// The last line assigned or continued a field
    InField,
    /// Inside `&&` markers; `paragraph_open` is false after a blank line
    InBlock { paragraph_open: bool },
    /// Collecting unassigned matter until the next tag
    InUnassigned,
}

/// What a single trimmed line looks like, before state is considered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line<'a> {
    Blank,
    Partition,
    Definition { label: &'a str, text: &'a str },
    Tag { label: &'a str, value: &'a str },
    Text,
}

fn classify(trimmed: &str) -> Line<'_> {
    if trimmed.is_empty() {
        return Line::Blank;
    }
    if trimmed.chars().count() > 10 && PARTITION_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
        return Line::Partition;
    }
    if let Some(rest) = trimmed.strip_prefix("* ") {
        if let Some((label, text)) = split_tag(rest) {
            return Line::Definition { label, text };
        }
    }
    match split_tag(trimmed) {
        Some((label, value)) => Line::Tag { label, value },
        None => Line::Text,
    }
}

/// Split `[label] rest` into a trimmed label and the raw rest
fn split_tag(line: &str) -> Option<(&str, &str)> {
    let inner = line.strip_prefix('[')?;
    let close = inner.find(']')?;
    let label = inner[..close].trim();
    if label.is_empty() {
        return None;
    }
    Some((label, &inner[close + 1..]))
}

/// Remove `&&` markers; the flag says whether block mode flips
fn strip_block_markers(text: &str) -> (String, bool) {
    let markers = text.matches(BLOCK_MARKER).count();
    if markers == 0 {
        (text.trim().to_string(), false)
    } else {
        (text.replace(BLOCK_MARKER, "").trim().to_string(), markers % 2 == 1)
    }
}

/// Find the start tag and count how many records it opens
fn prescan<'a>(lines: &[&'a str], start: StartTag<'a>) -> Option<(&'a str, usize)> {
    let mut start_label = match start {
        StartTag::FirstTag => None,
        StartTag::Named(label) => Some(label),
    };
    let mut entries = 0;

    for line in lines {
        if let Line::Tag { label, .. } = classify(line.trim()) {
            let start_label = *start_label.get_or_insert(label);
            if label == start_label {
                entries += 1;
            }
        }
    }
    start_label.map(|label| (label, entries))
}

/// Accumulates field slots and unassigned matter record by record
#[derive(Default)]
struct RecordBuilder {
    fields: Vec<String>,
    slots: BTreeMap<String, Vec<Option<String>>>,
    unassigned: Vec<Option<String>>,
    definitions: BTreeMap<String, String>,
    records: usize,
    current_field: Option<String>,
}

impl RecordBuilder {
    fn with_capacity(records: usize) -> Self {
        Self {
            unassigned: Vec::with_capacity(records),
            ..Self::default()
        }
    }

    fn has_record(&self) -> bool {
        self.records > 0
    }

    fn open_record(&mut self) {
        self.records += 1;
        for slots in self.slots.values_mut() {
            slots.push(None);
        }
        self.unassigned.push(None);
        self.current_field = None;
    }

    fn declare(&mut self, field: &str) {
        if !self.slots.contains_key(field) {
            self.fields.push(field.to_string());
            self.slots
                .insert(field.to_string(), vec![None; self.records]);
        }
    }

    fn define(&mut self, field: &str, text: &str) {
        self.declare(field);
        self.definitions
            .insert(field.to_string(), text.trim().to_string());
    }

    fn assign(&mut self, field: &str, value: String) {
        self.declare(field);
        if let Some(slot) = self.slots.get_mut(field).and_then(|s| s.last_mut()) {
            *slot = Some(value);
        }
        self.current_field = Some(field.to_string());
    }

    fn extend_field(&mut self, separator: &str, text: &str) {
        let Some(field) = self.current_field.as_ref() else {
            return;
        };
        if let Some(slot) = self.slots.get_mut(field).and_then(|s| s.last_mut()) {
            let value = slot.get_or_insert_with(String::new);
            value.push_str(separator);
            value.push_str(text);
        }
    }

    fn extend_unassigned(&mut self, raw: &str) {
        if let Some(slot) = self.unassigned.last_mut() {
            match slot {
                Some(text) => {
                    text.push('\n');
                    text.push_str(raw);
                }
                None => *slot = Some(raw.to_string()),
            }
        }
    }

    fn finish(self) -> Result<Table> {
        let mut table = Table::with_fields(&self.fields)?;

        for (field, slots) in self.slots {
            let values = slots
                .into_iter()
                .map(|slot| match slot {
                    Some(value) if !value.trim().is_empty() => value,
                    _ => NULL.to_string(),
                })
                .collect();
            table.strings.insert(field, values);
        }

        let unassigned: Vec<String> = self
            .unassigned
            .into_iter()
            .map(|slot| match slot {
                Some(text) if !text.trim().is_empty() => text.trim().to_string(),
                _ => NULL.to_string(),
            })
            .collect();
        if unassigned.iter().any(|u| u != NULL) {
            table.unassigned = unassigned;
        }

        table.definitions = self.definitions;
        table.drop_blank_definitions();
        Ok(table)
    }
}

/// Parse a tagged-text document
pub fn parse_tagged(content: &str, start: StartTag<'_>) -> Result<Parsed> {
    let lines: Vec<&str> = content.lines().collect();
    let Some((start_label, expected)) = prescan(&lines, start) else {
        let mut builder = RecordBuilder::default();
        for line in &lines {
            if let Line::Definition { label, text } = classify(line.trim()) {
                builder.define(label, text);
            }
        }
        return Ok(Parsed {
            table: builder.finish()?,
            warnings: Vec::new(),
        });
    };

    let mut builder = RecordBuilder::with_capacity(expected);
    let mut state = LineState::AwaitingTag;

    for (line_idx, raw) in lines.iter().enumerate() {
        let trimmed = raw.trim();
        let line = classify(trimmed);

        if !matches!(state, LineState::InBlock { .. }) {
            match line {
                Line::Definition { label, text } => {
                    builder.define(label, text);
                    continue;
                }
                Line::Tag { label, value } => {
                    if label == start_label {
                        builder.open_record();
                    }
                    if !builder.has_record() {
                        tracing::debug!(line = line_idx + 1, label, "tag before first record ignored");
                        continue;
                    }
                    let (value, toggled) = strip_block_markers(value);
                    builder.assign(label, value);
                    state = if toggled {
                        LineState::InBlock {
                            paragraph_open: true,
                        }
                    } else {
                        LineState::InField
                    };
                    continue;
                }
                _ => {}
            }
        }

        if !builder.has_record() {
            continue;
        }

        state = match (state, line) {
            (LineState::InUnassigned, Line::Partition) => LineState::InUnassigned,
            (LineState::InUnassigned, _) => {
                builder.extend_unassigned(raw);
                LineState::InUnassigned
            }
            (LineState::InBlock { .. }, Line::Blank | Line::Partition) => LineState::InBlock {
                paragraph_open: false,
            },
            (_, Line::Blank | Line::Partition) => LineState::AwaitingTag,
            (LineState::InField, _) => {
                let (text, toggled) = strip_block_markers(trimmed);
                builder.extend_field("\n", &text);
                if toggled {
                    LineState::InBlock {
                        paragraph_open: true,
                    }
                } else {
                    LineState::InField
                }
            }
            (LineState::InBlock { paragraph_open }, _) => {
                let (text, toggled) = strip_block_markers(trimmed);
                builder.extend_field(if paragraph_open { "\n" } else { "\n\n" }, &text);
                if toggled {
                    LineState::InField
                } else {
                    LineState::InBlock {
                        paragraph_open: true,
                    }
                }
            }
            (LineState::AwaitingTag, _) => {
                builder.extend_unassigned(raw);
                LineState::InUnassigned
            }
        };
    }

    if builder.records != expected {
        tracing::debug!(
            expected,
            found = builder.records,
            "start tags inside blocks were read as text"
        );
    }
    tracing::debug!(
        start = start_label,
        fields = builder.fields.len(),
        records = builder.records,
        "parsed tagged-text"
    );

    Ok(Parsed {
        table: builder.finish()?,
        warnings: Vec::new(),
    })
}

/// Write a table as a tagged-text document.
///
/// Definitions are written when the table has them, and also for a table
/// without records so its fields survive a round trip.
pub fn write_tagged(table: &Table) -> Result<String> {
    let count = table.record_count()?;
    let rule = "-".repeat(RULE_WIDTH);
    let mut out = String::new();

    if (!table.definitions.is_empty() || count == 0) && !table.columns.is_empty() {
        for field in &table.columns {
            out.push_str(&format!("* [{}] {}\n", field, table.definition(field)));
        }
        out.push('\n');
        out.push_str(&rule);
        out.push('\n');
    }

    for record in 0..count {
        out.push('\n');

        let mut closed_with_blank = false;
        for field in &table.columns {
            let value = table.value(field, record).unwrap_or(NULL);
            if value.contains("\n\n") {
                out.push_str(&format!("\n[{}] {} {} {}\n\n", field, BLOCK_MARKER, value, BLOCK_MARKER));
                closed_with_blank = true;
            } else if value.contains('\n') {
                out.push_str(&format!("\n[{}] {}\n\n", field, value));
                closed_with_blank = true;
            } else {
                out.push_str(&format!("[{}] {}\n", field, value));
                closed_with_blank = false;
            }
        }
        if !closed_with_blank {
            out.push('\n');
        }

        if let Some(text) = table.unassigned.get(record).filter(|u| u.as_str() != NULL) {
            out.push_str(text);
            if !text.ends_with("\n\n") {
                out.push_str(if text.ends_with('\n') { "\n" } else { "\n\n" });
            }
        }

        out.push_str(&rule);
        out.push('\n');
    }

    Ok(out)
}
