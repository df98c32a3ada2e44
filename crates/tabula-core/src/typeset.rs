//! Typeset table export (`.tex`, write-only)

use crate::error::{Error, Result};
use crate::format::{Format, Parsed};
use crate::table::Table;
use serde::{Deserialize, Serialize};

const NOTES_COLUMN: &str = "notes";

/// Column justification in the exported table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Justify {
    #[default]
    Left,
    Center,
    Right,
}

impl Justify {
    fn letter(self) -> char {
        match self {
            Justify::Left => 'l',
            Justify::Center => 'c',
            Justify::Right => 'r',
        }
    }
}

/// Layout options for the typeset export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypesetOptions {
    pub justify: Justify,
    pub caption: String,
}

impl Default for TypesetOptions {
    fn default() -> Self {
        Self {
            justify: Justify::Left,
            caption: "Table".to_string(),
        }
    }
}

/// Typeset documents cannot be read back
pub fn parse_typeset(_content: &[u8]) -> Result<Parsed> {
    Err(Error::UnsupportedFormat {
        format: Format::Typeset,
        operation: "parsing",
    })
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

/// Write a standalone typeset document holding the table.
///
/// Unassigned matter becomes a trailing `notes` column.
pub fn write_typeset(table: &Table, options: &TypesetOptions) -> Result<String> {
    let count = table.record_count()?;
    let notes = table.has_unassigned();

    let width = table.columns.len() + usize::from(notes);
    let columns: String = std::iter::repeat(options.justify.letter())
        .take(width)
        .collect();

    let mut header: Vec<String> = table.columns.iter().map(|c| escape(c)).collect();
    if notes {
        header.push(NOTES_COLUMN.to_string());
    }

    let mut out = String::new();
    out.push_str("\\documentclass[11pt]{article}\n");
    out.push_str("\\usepackage{fullpage}\n");
    out.push_str("\\usepackage[dvips]{graphicx}\n");
    out.push_str("\\begin{document}\n\n");
    out.push_str("\\begin{table}\n");
    out.push_str("\\begin{center}\n");
    out.push_str(&format!("\\caption{{{}}}\\vspace{{3mm}}\n", escape(&options.caption)));
    out.push_str(&format!("\\begin{{tabular}}{{{}}}\n", columns));
    out.push_str(&format!("{} \\\\\n", header.join(" & ")));
    out.push_str("\\hline\n");

    for record in 0..count {
        let mut row: Vec<String> = table
            .columns
            .iter()
            .map(|field| {
                let value = table.value(field, record).unwrap_or_default();
                escape(&table.formatted_value(field, value))
            })
            .collect();
        if notes {
            row.push(escape(&table.unassigned[record]));
        }
        out.push_str(&format!("{} \\\\\n", row.join(" & ")));
    }

    out.push_str("\\hline\n");
    out.push_str("\\end{tabular}\n");
    out.push_str("\\end{center}\n");
    out.push_str("\\end{table}\n\n");
    out.push_str("\\end{document}\n");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_typeset() {
        let mut table = Table::with_fields(&["item_no", "cost"]).unwrap();
        table.push_record(&["1", "2.499"]).unwrap();
        table.push_record(&["2", "10"]).unwrap();
        table
            .set_unassigned(vec!["50% off\nnow".to_string(), "null".to_string()])
            .unwrap();
        table.precision.insert("cost".to_string(), 1);

        let options = TypesetOptions {
            justify: Justify::Right,
            caption: "Prices & more".to_string(),
        };
        let doc = write_typeset(&table, &options).unwrap();

        assert!(doc.starts_with("\\documentclass[11pt]{article}\n"));
        assert!(doc.contains("\\caption{Prices \\& more}\\vspace{3mm}\n"));
        assert!(doc.contains("\\begin{tabular}{rrr}\n"));
        assert!(doc.contains("item\\_no & cost & notes \\\\\n\\hline\n"));
        assert!(doc.contains("1 & 2.5 & 50\\% off now \\\\\n"));
        assert!(doc.contains("2 & 10.0 & null \\\\\n"));
        assert!(doc.ends_with("\\end{table}\n\n\\end{document}\n"));
    }

    #[test]
    fn test_default_options() {
        let table = Table::with_fields(&["a"]).unwrap();
        let doc = write_typeset(&table, &TypesetOptions::default()).unwrap();
        assert!(doc.contains("\\caption{Table}"));
        assert!(doc.contains("\\begin{tabular}{l}\n"));
    }

    #[test]
    fn test_parse_is_unsupported() {
        assert!(matches!(
            parse_typeset(b"\\begin{document}"),
            Err(Error::UnsupportedFormat {
                format: Format::Typeset,
                ..
            })
        ));
    }
}
