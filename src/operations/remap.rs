use anyhow::{bail, Result};
use std::collections::{HashMap, HashSet};

use crate::table::{RecordSet, Value};

/// Old-id → new-id partner mapping loaded from a two-column table.
#[derive(Debug, Default)]
pub struct PartnerMapping {
    mapping: HashMap<String, String>,
    seen_in_data: HashSet<String>,
}

impl PartnerMapping {
    /// The mapping table must have exactly two columns (old id, new id);
    /// anything else is a configuration error and the caller skips the step.
    pub fn from_record_set(set: &RecordSet) -> Result<PartnerMapping> {
        if set.columns().len() != 2 {
            bail!(
                "Partner mapping table must have exactly 2 columns, found {}",
                set.columns().len()
            );
        }
        let mut mapping = HashMap::new();
        for row in set.rows() {
            let old = row[0].to_string();
            if old.is_empty() {
                continue;
            }
            mapping.entry(old).or_insert_with(|| row[1].to_string());
        }
        Ok(PartnerMapping {
            mapping,
            seen_in_data: HashSet::new(),
        })
    }

    /// Rewrites the partner column in place. Identifiers without a mapping
    /// entry pass through unchanged. Returns the number of rewritten cells.
    pub fn apply(&mut self, set: &mut RecordSet, partner_column: &str) -> usize {
        let Some(column) = set.column_index(partner_column) else {
            return 0;
        };
        let mut remapped = 0;
        for row in 0..set.len() {
            let old = set.value(row, column).to_string();
            if old.is_empty() {
                continue;
            }
            self.seen_in_data.insert(old.clone());
            if let Some(new) = self.mapping.get(&old) {
                set.set_value(row, column, Value::text(new.clone()));
                remapped += 1;
            }
        }
        remapped
    }

    /// Two-way diagnostic report over everything [`apply`](Self::apply) has
    /// seen so far: identifiers present in the data but absent from the
    /// mapping, and mapping entries never seen in the data.
    pub fn mismatch_report(&self) -> RecordSet {
        let mut out = RecordSet::with_columns(&["partner_id", "status"]);

        let mut unmapped: Vec<&String> = self
            .seen_in_data
            .iter()
            .filter(|id| !self.mapping.contains_key(*id))
            .collect();
        unmapped.sort();
        for id in unmapped {
            out.push_row(vec![Value::text(id.clone()), Value::text("not in mapping")]);
        }

        let mut unused: Vec<&String> = self
            .mapping
            .keys()
            .filter(|id| !self.seen_in_data.contains(*id))
            .collect();
        unused.sort();
        for id in unused {
            out.push_row(vec![Value::text(id.clone()), Value::text("not in data")]);
        }
        out
    }
}
