//! Tables embedded in the records of another table

use crate::error::Result;
use crate::format::FormatChoice;
use crate::io::{load, LoadOptions};
use crate::table::{is_absent, Table, NULL};

/// Where each record keeps its embedded document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NestedSource<'a> {
    /// The record's unassigned matter
    #[default]
    Unassigned,
    /// The value of one field
    Field(&'a str),
}

impl Table {
    /// Parse every record's embedded document into a table of its own.
    ///
    /// Returns one table per record. Each carries its parent record's field
    /// values in `metadata`; a record without a document yields a table
    /// with metadata only.
    pub fn nested_tables(&self, source: NestedSource<'_>, format: FormatChoice) -> Result<Vec<Table>> {
        let count = self.record_count()?;
        let documents: Vec<&str> = match source {
            NestedSource::Unassigned if self.has_unassigned() => {
                self.unassigned.iter().map(String::as_str).collect()
            }
            NestedSource::Unassigned => vec![NULL; count],
            NestedSource::Field(field) => self.column(field)?.iter().map(String::as_str).collect(),
        };

        let options = LoadOptions {
            format,
            start_tag: None,
        };
        let mut tables = Vec::with_capacity(count);
        for (record, document) in documents.into_iter().enumerate() {
            let mut table = if is_absent(document.trim()) {
                Table::new()
            } else {
                load(document.as_bytes(), &options)?.table
            };
            for field in &self.columns {
                let value = self.value(field, record).unwrap_or(NULL);
                table.metadata.insert(field.clone(), value.to_string());
            }
            tables.push(table);
        }

        tracing::debug!(records = count, "extracted nested tables");
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Format;
    use crate::tagged::{parse_tagged, StartTag};

    const DOC: &str = "[site] north
[year] 2019

++ depth # count
1 # 4
2 # 9
++

--------------------------------------------------------------------------------

[site] south
[year] 2020

--------------------------------------------------------------------------------
";

    #[test]
    fn test_nested_indexed_tables() {
        let parent = parse_tagged(DOC, StartTag::FirstTag).unwrap().table;
        let nested = parent
            .nested_tables(NestedSource::Unassigned, FormatChoice::Explicit(Format::Indexed))
            .unwrap();

        assert_eq!(nested.len(), 2);
        assert_eq!(nested[0].column("count").unwrap(), &["4", "9"]);
        assert_eq!(nested[0].metadata["site"], "north");
        assert_eq!(nested[0].metadata["year"], "2019");
        assert!(nested[1].columns.is_empty());
        assert_eq!(nested[1].metadata["site"], "south");
    }

    #[test]
    fn test_nested_from_field() {
        let mut parent = Table::with_fields(&["name", "doc"]).unwrap();
        parent.push_record(&["a", "[k] 1\n[k] 2\n"]).unwrap();

        let nested = parent
            .nested_tables(NestedSource::Field("doc"), FormatChoice::Auto)
            .unwrap();
        assert_eq!(nested[0].column("k").unwrap(), &["1", "2"]);
        assert_eq!(nested[0].metadata["doc"], "[k] 1\n[k] 2\n");
        assert!(parent
            .nested_tables(NestedSource::Field("missing"), FormatChoice::Auto)
            .is_err());
    }
}
