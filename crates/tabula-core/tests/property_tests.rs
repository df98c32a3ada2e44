//! Property-based tests for the codec round trips

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use tabula_core::binary::{parse_binary, write_binary};
use tabula_core::delimited::{parse_delimited, write_delimited};
use tabula_core::indexed::{parse_indexed, write_indexed};
use tabula_core::tagged::{parse_tagged, write_tagged, StartTag};
use tabula_core::{NumericColumn, Table};

fn field_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[a-z][a-z0-9_]{0,6}", 1..5).prop_map(|names| {
        names
            .into_iter()
            .filter(|n| !n.eq_ignore_ascii_case("umat"))
            .collect::<Vec<_>>()
    })
    .prop_filter("at least one field", |names| !names.is_empty())
}

fn value() -> impl Strategy<Value = String> {
    prop_oneof![
        6 => "[A-Za-z0-9]([A-Za-z0-9 .,:-]{0,10}[A-Za-z0-9])?",
        1 => Just(String::new()),
        1 => Just("null".to_string()),
    ]
}

/// Blank values read back as `"null"`, and unassigned matter that is absent
/// everywhere may be dropped altogether.
fn normalized(mut table: Table) -> Table {
    table.nullify();
    if table.unassigned.iter().all(|u| u == "null") {
        table.unassigned.clear();
    }
    table
}

fn text_table() -> impl Strategy<Value = Table> {
    (field_names(), 0..6usize, any::<bool>()).prop_flat_map(|(fields, records, with_unassigned)| {
        let width = fields.len();
        let rows = prop::collection::vec(prop::collection::vec(value(), width), records);
        let unassigned = if with_unassigned {
            prop::collection::vec(value(), records).boxed()
        } else {
            Just(Vec::new()).boxed()
        };
        (Just(fields), rows, unassigned).prop_map(|(fields, rows, unassigned)| {
            let mut table = Table::with_fields(&fields).unwrap();
            for row in &rows {
                table.push_record(row).unwrap();
            }
            table.set_unassigned(unassigned).unwrap();
            table
        })
    })
}

fn numeric_table<T: Strategy + Clone>(element: T) -> impl Strategy<Value = (Vec<String>, Vec<Vec<T::Value>>)>
where
    T::Value: Clone,
{
    (field_names(), 0..8usize).prop_flat_map(move |(fields, records)| {
        let width = fields.len();
        let columns = prop::collection::vec(prop::collection::vec(element.clone(), records), width);
        (Just(fields), columns)
    })
}

proptest! {
    #[test]
    fn prop_indexed_round_trip(table in text_table()) {
        let doc = write_indexed(&table).unwrap();
        let parsed = parse_indexed(&doc).unwrap();
        prop_assert!(parsed.warnings.is_empty());
        prop_assert_eq!(normalized(parsed.table), normalized(table));
    }

    #[test]
    fn prop_tagged_round_trip(table in text_table()) {
        let doc = write_tagged(&table).unwrap();
        let parsed = parse_tagged(&doc, StartTag::FirstTag).unwrap();
        prop_assert_eq!(normalized(parsed.table), normalized(table));
    }

    #[test]
    fn prop_delimited_round_trip(table in text_table()) {
        let doc = write_delimited(&table).unwrap();
        let parsed = parse_delimited(&doc).unwrap();
        prop_assert!(parsed.warnings.is_empty());
        prop_assert_eq!(normalized(parsed.table), normalized(table));
    }

    #[test]
    fn prop_binary_integers_round_trip((fields, columns) in numeric_table(any::<i64>())) {
        let mut table = Table::with_fields(&fields).unwrap();
        for (field, values) in fields.iter().zip(&columns) {
            table.strings.insert(field.clone(), values.iter().map(i64::to_string).collect());
        }

        let parsed = parse_binary(&write_binary(&table).unwrap()).unwrap().table;
        prop_assert_eq!(&parsed.columns, &fields);
        for (field, values) in fields.iter().zip(columns) {
            prop_assert_eq!(parsed.numeric(field), Some(&NumericColumn::Integer(values)));
        }
    }

    #[test]
    fn prop_binary_floats_are_bit_identical((fields, columns) in numeric_table(any::<f64>())) {
        let mut table = Table::with_fields(&fields).unwrap();
        for (field, values) in fields.iter().zip(&columns) {
            table.strings.insert(field.clone(), vec!["null".to_string(); values.len()]);
            table.numerics.insert(field.clone(), NumericColumn::Float(values.clone()));
        }

        let parsed = parse_binary(&write_binary(&table).unwrap()).unwrap().table;
        for (field, values) in fields.iter().zip(columns) {
            let Some(NumericColumn::Float(read)) = parsed.numeric(field) else {
                return Err(TestCaseError::fail(format!("{} is not a float column", field)));
            };
            let expected: Vec<u64> = values.iter().map(|v| v.to_bits()).collect();
            let found: Vec<u64> = read.iter().map(|v| v.to_bits()).collect();
            prop_assert_eq!(found, expected);
        }
    }
}
