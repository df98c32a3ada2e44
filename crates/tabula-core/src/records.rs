//! Record-level operations: matching, searching, sorting and subsetting

use crate::error::{Error, Result};
use crate::table::{NumericColumn, Table};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// How a target value is compared against a record's value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Values must be equal
    Exact,
    /// The record's value must contain the target
    Partial,
}

/// Fields to match and the values accepted for each.
///
/// A record matches a field when its value matches any one of that field's
/// targets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchQuery {
    targets: BTreeMap<String, Vec<String>>,
}

impl MatchQuery {
    /// Create an empty query
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `value` for `field` (in addition to earlier targets)
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.add(field, value);
        self
    }

    /// Accept `value` for `field` (in addition to earlier targets)
    pub fn add(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.targets
            .entry(field.into())
            .or_default()
            .push(value.into());
    }

    /// Number of distinct fields in the query
    pub fn field_count(&self) -> usize {
        self.targets.len()
    }

    /// Iterate over fields and their targets
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.targets
            .iter()
            .map(|(field, values)| (field.as_str(), values.as_slice()))
    }
}

/// Inclusive numeric bounds on one field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRange {
    pub field: String,
    pub min: f64,
    pub max: f64,
}

impl FieldRange {
    pub fn new(field: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            field: field.into(),
            min,
            max,
        }
    }
}

/// Records selected by a query, in ascending record order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Matches {
    /// Records matching at least one field
    pub any: Vec<usize>,
    /// Records matching every field of the query
    pub all: Vec<usize>,
}

impl Table {
    /// Find records matching a query.
    ///
    /// `all` holds records for which every queried field matched one of its
    /// targets; the targets need not be the same across fields.
    pub fn find_records(&self, query: &MatchQuery, mode: MatchMode) -> Result<Matches> {
        let mut hits: BTreeMap<usize, usize> = BTreeMap::new();

        for (field, targets) in query.iter() {
            let values = self.column(field)?;
            let matched: BTreeSet<usize> = values
                .iter()
                .enumerate()
                .filter(|(_, value)| {
                    targets.iter().any(|target| match mode {
                        MatchMode::Exact => value.as_str() == target,
                        MatchMode::Partial => value.contains(target.as_str()),
                    })
                })
                .map(|(i, _)| i)
                .collect();

            for record in matched {
                *hits.entry(record).or_default() += 1;
            }
        }

        let wanted = query.field_count();
        Ok(Matches {
            any: hits.keys().copied().collect(),
            all: hits
                .iter()
                .filter(|(_, &count)| count == wanted)
                .map(|(&record, _)| record)
                .collect(),
        })
    }

    /// Records whose values equal a target in every queried field
    pub fn matching_records(&self, query: &MatchQuery) -> Result<Vec<usize>> {
        Ok(self.find_records(query, MatchMode::Exact)?.all)
    }

    /// Records whose values contain a target in any queried field
    pub fn search_records(&self, query: &MatchQuery) -> Result<Vec<usize>> {
        Ok(self.find_records(query, MatchMode::Partial)?.any)
    }

    /// Stable sort of every record by one field.
    ///
    /// Numeric fields compare as numbers, everything else as text. Records
    /// with equal keys keep their relative order in both directions.
    pub fn sort_records(&mut self, field: &str, descending: bool) -> Result<()> {
        let count = self.record_count()?;
        let keys = self.column(field)?;

        let mut order: Vec<usize> = (0..count).collect();
        match self.numerics.get(field).filter(|c| c.len() == count) {
            Some(NumericColumn::Integer(values)) => {
                order.sort_by(|&a, &b| directed(values[a].cmp(&values[b]), descending));
            }
            Some(NumericColumn::Float(values)) => {
                order.sort_by(|&a, &b| directed(values[a].total_cmp(&values[b]), descending));
            }
            None => {
                order.sort_by(|&a, &b| directed(keys[a].cmp(&keys[b]), descending));
            }
        }

        self.reorder(&order, count);
        Ok(())
    }

    /// Records whose numeric values fall inside every range.
    ///
    /// The fields must have been numerized; missing values never match.
    pub fn records_in_ranges(&self, ranges: &[FieldRange]) -> Result<Vec<usize>> {
        let count = self.record_count()?;
        let mut columns = Vec::with_capacity(ranges.len());
        for range in ranges {
            if !self.has_field(&range.field) {
                return Err(Error::UnknownField(range.field.clone()));
            }
            let column = self
                .numerics
                .get(&range.field)
                .filter(|c| c.len() == count)
                .ok_or_else(|| Error::NonNumericColumn(range.field.clone()))?;
            columns.push((range, column.to_f64()));
        }

        Ok((0..count)
            .filter(|&record| {
                columns.iter().all(|(range, values)| {
                    let value = values[record];
                    value >= range.min && value <= range.max
                })
            })
            .collect())
    }

    /// Keep only the records at `indices`, in that order
    pub fn shrink(&mut self, indices: &[usize]) -> Result<()> {
        let count = self.record_count()?;
        if let Some(&index) = indices.iter().find(|&&i| i >= count) {
            return Err(Error::RecordOutOfRange { index, len: count });
        }
        self.reorder(indices, count);
        Ok(())
    }

    /// Rebuild every column from the records at `order`.
    ///
    /// Numeric columns whose length no longer matches the record count are
    /// stale and get dropped rather than reordered.
    fn reorder(&mut self, order: &[usize], count: usize) {
        for values in self.strings.values_mut() {
            *values = order.iter().map(|&i| values[i].clone()).collect();
        }
        self.numerics.retain(|_, column| column.len() == count);
        for column in self.numerics.values_mut() {
            *column = column.pick(order);
        }
        if self.has_unassigned() {
            self.unassigned = order.iter().map(|&i| self.unassigned[i].clone()).collect();
        }
    }
}

fn directed(ordering: Ordering, descending: bool) -> Ordering {
    if descending {
        ordering.reverse()
    } else {
        ordering
    }
}
