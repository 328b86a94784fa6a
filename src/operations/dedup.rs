use crate::table::{RecordSet, Value};

/// Blanks the key columns of every row except the first in a run of
/// consecutive rows sharing identical key-column values.
///
/// Display deduplication only: the row count never changes, non-key columns
/// are untouched, and a key that reappears after a gap starts a new run with
/// its own intact first row.
pub fn blank_duplicate_keys(set: &mut RecordSet, key_columns: &[&str]) {
    let indices: Vec<usize> = key_columns
        .iter()
        .filter_map(|column| set.column_index(column))
        .collect();
    if indices.is_empty() {
        return;
    }

    let mut run_key: Option<Vec<Value>> = None;
    for row in 0..set.len() {
        let key: Vec<Value> = indices
            .iter()
            .map(|&column| set.value(row, column).clone())
            .collect();
        if run_key.as_ref() == Some(&key) {
            for &column in &indices {
                set.set_value(row, column, Value::text(""));
            }
        } else {
            run_key = Some(key);
        }
    }
}
