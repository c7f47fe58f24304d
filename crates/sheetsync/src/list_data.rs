//! Bound list data
//!
//! Rows preloaded into a line sheet's list binding, and the reverse path for
//! values edited in a bound cell.

use crate::instantiate::header_label;
use indexmap::IndexMap;
use sheetsync_core::{list_id_for, BackingRecord, ColumnPolicy, Document, FieldValue, RecordId};
use tracing::debug;

/// Preload row of a binding: `id` first, then one entry per bound column
pub fn list_row(columns: &[String], record: &BackingRecord) -> IndexMap<String, String> {
    let mut row = IndexMap::with_capacity(columns.len() + 1);
    row.insert("id".to_string(), record.id.to_string());
    for column in columns {
        row.insert(column.clone(), record.value_of(column));
    }
    row
}

/// Preload rows of every binding in `document` whose record is known, keyed
/// by list id
pub fn list_rows(
    document: &Document,
    records: &[BackingRecord],
) -> IndexMap<String, IndexMap<String, String>> {
    let by_id: IndexMap<&RecordId, &BackingRecord> =
        records.iter().map(|record| (&record.id, record)).collect();
    document
        .bindings()
        .filter_map(|binding| {
            let record = by_id.get(&binding.record_id)?;
            Some((binding.list_id.clone(), list_row(&binding.columns, record)))
        })
        .collect()
}

/// Route a value edited in a bound cell back to its record
///
/// Static fields keep their type; anything else lands in the dynamic
/// attribute map. Returns whether the record's column set changed, in which
/// case the line sheet is recreated at the next reconciliation.
pub fn apply_edit(
    record: &mut BackingRecord,
    column: &str,
    text: &str,
    policy: &ColumnPolicy,
) -> bool {
    let column = header_label(column);
    if column == "id" {
        return false;
    }
    if let Some(value) = record.static_fields.get_mut(column) {
        *value = value.reinterpret(text);
        return false;
    }

    let before = policy.expected_columns(record);
    record
        .dynamic_attributes
        .insert(column.to_string(), text.to_string());
    let changed = policy.expected_columns(record) != before;
    if changed {
        debug!(record = %record.id, list = %list_id_for(&record.id), column, "edit added a column");
    }
    changed
}

/// Current static value of a column, if it is a static field
pub fn static_value<'a>(record: &'a BackingRecord, column: &str) -> Option<&'a FieldValue> {
    record.static_fields.get(header_label(column))
}
