//! Merge engine for combining two tables on key fields

use crate::error::{Error, Result};
use crate::records::MatchQuery;
use crate::table::{is_absent, Table, NULL};

/// What happens to incoming records whose key matches nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Unmatched {
    /// Append them as new records
    #[default]
    Add,
    /// Drop them
    Skip,
}

/// Merge `incoming` into a copy of `base`, matching records on `keys`.
///
/// The result has `base`'s fields followed by fields only `incoming` has.
/// Each incoming record is matched against the result built so far:
/// one match has its values overwritten by the incoming ones that are not
/// absent, no match appends a record (unless `unmatched` is `Skip`), and
/// several matches fail with `NonUniqueMergeKey`.
pub fn merge_tables<S: AsRef<str>>(
    base: &Table,
    incoming: &Table,
    keys: &[S],
    unmatched: Unmatched,
) -> Result<Table> {
    let mut result = base.clone();
    result.nullify();
    let mut incoming = incoming.clone();
    incoming.nullify();

    for key in keys {
        let key = key.as_ref();
        if !result.has_field(key) || !incoming.has_field(key) {
            return Err(Error::UnknownField(key.to_string()));
        }
    }
    let base_count = result.record_count()?;
    let incoming_count = incoming.record_count()?;

    result.numerics.clear();
    for field in &incoming.columns {
        let definition = incoming
            .definitions
            .get(field)
            .filter(|d| !d.is_empty())
            .map(String::as_str);
        if result.has_field(field) {
            if let Some(definition) = definition {
                result
                    .definitions
                    .insert(field.clone(), definition.to_string());
            }
        } else {
            result.add_field(field, definition)?;
        }
    }
    result
        .metadata
        .extend(incoming.metadata.iter().map(|(k, v)| (k.clone(), v.clone())));
    result
        .precision
        .extend(incoming.precision.iter().map(|(k, v)| (k.clone(), *v)));
    if incoming.has_unassigned() && !result.has_unassigned() {
        result.unassigned = vec![NULL.to_string(); base_count];
    }

    let (mut updated, mut added, mut skipped) = (0, 0, 0);
    for record in 0..incoming_count {
        let mut query = MatchQuery::new();
        let mut key = Vec::with_capacity(keys.len());
        for field in keys {
            let field = field.as_ref();
            let value = incoming.value(field, record).unwrap_or(NULL);
            query.add(field, value);
            key.push((field.to_string(), value.to_string()));
        }

        let matches = result.matching_records(&query)?;
        match matches.len() {
            0 if unmatched == Unmatched::Add => {
                append_record(&mut result, &incoming, record);
                added += 1;
            }
            0 => skipped += 1,
            1 => {
                update_record(&mut result, &incoming, record, matches[0]);
                updated += 1;
            }
            _ => {
                return Err(Error::NonUniqueMergeKey {
                    key,
                    records: matches,
                })
            }
        }
    }

    tracing::debug!(updated, added, skipped, "merged tables");
    Ok(result)
}

fn append_record(result: &mut Table, incoming: &Table, record: usize) {
    for field in &result.columns {
        let value = incoming.value(field, record).unwrap_or(NULL).to_string();
        result.strings.entry(field.clone()).or_default().push(value);
    }
    if let Some(text) = incoming.unassigned.get(record) {
        result.unassigned.push(text.clone());
    } else if result.has_unassigned() {
        result.unassigned.push(NULL.to_string());
    }
}

fn update_record(result: &mut Table, incoming: &Table, record: usize, target: usize) {
    for field in &incoming.columns {
        let Some(value) = incoming.value(field, record).filter(|v| !is_absent(v)) else {
            continue;
        };
        if let Some(slot) = result.strings.get_mut(field).and_then(|v| v.get_mut(target)) {
            *slot = value.to_string();
        }
    }
    if let Some(text) = incoming.unassigned.get(record).filter(|u| !is_absent(u)) {
        if let Some(slot) = result.unassigned.get_mut(target) {
            *slot = text.clone();
        }
    }
}
