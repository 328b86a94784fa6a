use anyhow::{Context as _, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

use crate::ir::{HmsRecord, JournalKind};
use crate::operations::amount::sanitize_amount;
use crate::operations::extract::{penultimate_segment, trailing_segment};
use crate::table::{RecordSet, Value};

pub mod template;

use template::{
    account_column, parse_blocks, write_blocks, BlockFit, TemplateRow, KEY_COLUMN,
    MAIN_RENT_COLUMN,
};

/// Counters for one reconciliation run, logged as JSON by the CLI.
#[derive(Debug, Default, Serialize)]
pub struct ReconcileSummary {
    pub groups: usize,
    pub matched_groups: usize,
    pub spilled_keys: usize,
    pub blocks_allocated: usize,
    pub blocks_reused: usize,
    pub groups_skipped_no_block: usize,
    pub cells_dropped_missing_column: usize,
}

pub struct ReconcileOutput {
    pub template: RecordSet,
    pub spill: RecordSet,
    pub summary: ReconcileSummary,
}

/// Matches VEN/AC2 source groups against the destination template, fills
/// repeating attribute blocks, and collects unmatched keys as spill rows.
///
/// Groups are keyed by (partner key, document number); the partner key is
/// matched against the template's `x_studio_rf_wb` column. Block state is
/// accumulated per key for the whole run and written back once at the end,
/// so two groups sharing a key land in different blocks of the same row.
pub fn reconcile(records: &[HmsRecord], mut template: RecordSet) -> Result<ReconcileOutput> {
    let key_column = template
        .require_column(KEY_COLUMN)
        .context("Destination template does not look like an Odoo export")?;

    let template_index = index_template_keys(&template, key_column);

    let mut selected: Vec<&HmsRecord> = records
        .iter()
        .filter(|record| {
            matches!(
                JournalKind::of(&record.journal),
                JournalKind::Ven | JournalKind::Ac2
            )
        })
        .collect();
    // deterministic grouping regardless of source row order
    selected.sort_by(|a, b| {
        (a.partner(), &a.docnumber).cmp(&(b.partner(), &b.docnumber))
    });

    let mut summary = ReconcileSummary::default();
    let mut matched: HashMap<String, TemplateRow> = HashMap::new();
    let mut spill_rows: Vec<TemplateRow> = Vec::new();
    let mut spill_index: HashMap<String, usize> = HashMap::new();

    let mut start = 0;
    while start < selected.len() {
        let first = selected[start];
        let key = first.partner();
        let mut end = start + 1;
        while end < selected.len()
            && selected[end].partner() == key
            && selected[end].docnumber == first.docnumber
        {
            end += 1;
        }
        let group = &selected[start..end];
        start = end;
        summary.groups += 1;

        let comment = first.comment_int.as_text();
        let code = comment.map(trailing_segment).unwrap_or("");
        let address = comment.and_then(penultimate_segment).unwrap_or("");

        let target = if let Some(&row) = template_index.get(&key) {
            summary.matched_groups += 1;
            matched
                .entry(key.clone())
                .or_insert_with(|| TemplateRow {
                    key: key.clone(),
                    blocks: parse_blocks(&template, row),
                })
        } else {
            let index = *spill_index.entry(key.clone()).or_insert_with(|| {
                spill_rows.push(TemplateRow::new(key.clone()));
                spill_rows.len() - 1
            });
            &mut spill_rows[index]
        };

        let fit = match target.find_block(code, address) {
            Some(fit) => fit,
            None => {
                log::warn!(
                    "No free attribute block for key {:?} document {:?}; group skipped",
                    key,
                    first.docnumber
                );
                summary.groups_skipped_no_block += 1;
                continue;
            }
        };
        match fit {
            BlockFit::New(_) => summary.blocks_allocated += 1,
            BlockFit::Existing(_) => summary.blocks_reused += 1,
        }

        let block = &mut target.blocks[fit.index()];
        let kind = JournalKind::of(&first.journal);
        let primary = kind.primary_rent_accounts();
        let mut rent_sum = Decimal::ZERO;
        let mut has_rent = false;
        for record in group {
            let amount = sanitize_amount(&record.montant_gen);
            if let Some(column) = account_column(record.gl_account()) {
                block.amounts.insert(column, amount);
            }
            if primary.contains(&record.gl_account()) {
                rent_sum += amount;
                has_rent = true;
            }
        }
        if has_rent {
            block.amounts.insert(MAIN_RENT_COLUMN, rent_sum);
        }
    }
    summary.spilled_keys = spill_rows.len();

    for row_state in matched.values() {
        let row = template_index[&row_state.key];
        summary.cells_dropped_missing_column += write_blocks(&mut template, row, &row_state.blocks);
    }

    let mut spill = RecordSet::new(template.columns().to_vec());
    for row_state in spill_rows {
        spill.push_row(vec![Value::Empty; spill.columns().len()]);
        let row = spill.len() - 1;
        spill.set_value(row, key_column, Value::text(row_state.key.clone()));
        summary.cells_dropped_missing_column += write_blocks(&mut spill, row, &row_state.blocks);
    }
    if summary.cells_dropped_missing_column > 0 {
        log::warn!(
            "{} block cell(s) had no matching template column and were dropped",
            summary.cells_dropped_missing_column
        );
    }

    Ok(ReconcileOutput {
        template,
        spill,
        summary,
    })
}

fn index_template_keys(template: &RecordSet, key_column: usize) -> HashMap<String, usize> {
    let mut index = HashMap::new();
    for row in 0..template.len() {
        let key = template.value(row, key_column).to_string();
        if key.is_empty() {
            continue;
        }
        index.entry(key).or_insert(row);
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        journal: &str,
        accountgl: i64,
        partner: &str,
        docnumber: &str,
        amount: &str,
        comment: &str,
    ) -> HmsRecord {
        HmsRecord {
            journal: journal.to_string(),
            accountgl: Value::Integer(accountgl),
            account_id: Value::text(partner),
            docnumber: docnumber.to_string(),
            bookyear: "2024".to_string(),
            datedoc: "2024-01-10".to_string(),
            duedate: "2024-02-10".to_string(),
            montant_gen: Value::text(amount),
            dc: "D".to_string(),
            comment_int: Value::text(comment),
        }
    }

    fn template_set(keys: &[&str]) -> RecordSet {
        let mut set = RecordSet::with_columns(&[
            KEY_COLUMN,
            "x_studio_code_analytique",
            "x_studio_adresse",
            "x_studio_loyer_actuel_index",
            "x_studio_provision_pour_charge",
            "x_studio_code_analytique_1",
            "x_studio_adresse_1",
            "x_studio_loyer_actuel_index_1",
            "x_studio_provision_pour_charge_1",
        ]);
        for key in keys {
            set.push_row(vec![Value::text(*key)]);
        }
        set
    }

    fn cell<'a>(set: &'a RecordSet, row: usize, column: &str) -> &'a Value {
        set.value(row, set.column_index(column).unwrap())
    }

    #[test]
    fn matched_group_fills_first_block() {
        let records = vec![
            record("VEN", 700100, "WB1", "1", "100,00", "X/ADR/CODE"),
            record("VEN", 700200, "WB1", "1", "50,00", "X/ADR/CODE"),
            record("VEN", 701000, "WB1", "1", "25,00", "X/ADR/CODE"),
        ];
        let out = reconcile(&records, template_set(&["WB1"])).unwrap();
        assert_eq!(out.summary.matched_groups, 1);
        assert_eq!(out.summary.blocks_allocated, 1);
        assert!(out.spill.is_empty());
        let template = &out.template;
        assert_eq!(
            cell(template, 0, "x_studio_code_analytique"),
            &Value::text("CODE")
        );
        assert_eq!(cell(template, 0, "x_studio_adresse"), &Value::text("ADR"));
        // main rent is the SUM over the primary accounts, not the last write
        assert_eq!(
            cell(template, 0, "x_studio_loyer_actuel_index"),
            &Value::Decimal(Decimal::from_str_exact("150.00").unwrap())
        );
        assert_eq!(
            cell(template, 0, "x_studio_provision_pour_charge"),
            &Value::Decimal(Decimal::from_str_exact("25.00").unwrap())
        );
    }

    #[test]
    fn second_document_of_same_key_takes_the_next_block() {
        let records = vec![
            record("VEN", 700100, "WB1", "1", "100,00", "X/A1/C1"),
            record("VEN", 700100, "WB1", "2", "200,00", "X/A2/C2"),
        ];
        let out = reconcile(&records, template_set(&["WB1"])).unwrap();
        assert_eq!(out.summary.blocks_allocated, 2);
        let template = &out.template;
        assert_eq!(
            cell(template, 0, "x_studio_code_analytique"),
            &Value::text("C1")
        );
        assert_eq!(
            cell(template, 0, "x_studio_code_analytique_1"),
            &Value::text("C2")
        );
        assert_eq!(
            cell(template, 0, "x_studio_loyer_actuel_index_1"),
            &Value::Decimal(Decimal::from_str_exact("200.00").unwrap())
        );
    }

    #[test]
    fn unmatched_key_spills_once() {
        let records = vec![
            record("AC2", 600100, "WB9", "1", "80,00", "X/A/C"),
            record("AC2", 601900, "WB9", "2", "20,00", "X/A/C"),
        ];
        let out = reconcile(&records, template_set(&["WB1"])).unwrap();
        assert_eq!(out.summary.spilled_keys, 1);
        assert_eq!(out.spill.len(), 1);
        assert_eq!(cell(&out.spill, 0, KEY_COLUMN), &Value::text("WB9"));
        // both documents share the (C, A) pair, so they share block 0
        assert_eq!(out.summary.blocks_allocated, 1);
        assert_eq!(out.summary.blocks_reused, 1);
        assert_eq!(
            cell(&out.spill, 0, "x_studio_loyer_actuel_index"),
            &Value::Decimal(Decimal::from_str_exact("80.00").unwrap())
        );
        assert_eq!(
            cell(&out.spill, 0, "x_studio_provision_pour_charge"),
            &Value::Decimal(Decimal::from_str_exact("20.00").unwrap())
        );
    }

    #[test]
    fn rerun_on_filled_template_reuses_blocks() {
        let records = vec![record("VEN", 700100, "WB1", "1", "100,00", "X/A/C")];
        let first = reconcile(&records, template_set(&["WB1"])).unwrap();
        let second = reconcile(&records, first.template.clone()).unwrap();
        assert_eq!(second.summary.blocks_allocated, 0);
        assert_eq!(second.summary.blocks_reused, 1);
        assert_eq!(
            second.template.rows()[0],
            first.template.rows()[0]
        );
    }

    #[test]
    fn other_journals_are_ignored() {
        let records = vec![
            record("ODGEST", 700100, "WB1", "1", "100,00", "X/A/C"),
            record("GESTIO", 700100, "WB1", "1", "100,00", "X/A/C"),
        ];
        let out = reconcile(&records, template_set(&["WB1"])).unwrap();
        assert_eq!(out.summary.groups, 0);
    }

    #[test]
    fn block_capacity_exhaustion_skips_silently() {
        let mut records = Vec::new();
        for n in 0..template::MAX_BLOCKS + 1 {
            records.push(record(
                "VEN",
                700100,
                "WB1",
                &format!("{}", n),
                "10,00",
                &format!("X/A/C{}", n),
            ));
        }
        let out = reconcile(&records, template_set(&["WB1"])).unwrap();
        assert_eq!(out.summary.groups_skipped_no_block, 1);
        assert_eq!(out.summary.blocks_allocated, template::MAX_BLOCKS);
    }

    #[test]
    fn blocks_beyond_template_capacity_are_reported_as_dropped() {
        let mut set = RecordSet::with_columns(&[
            KEY_COLUMN,
            "x_studio_code_analytique",
            "x_studio_adresse",
            "x_studio_loyer_actuel_index",
        ]);
        set.push_row(vec![Value::text("WB1")]);
        let records = vec![
            record("VEN", 700100, "WB1", "1", "100,00", "X/A1/C1"),
            record("VEN", 700100, "WB1", "2", "200,00", "X/A2/C2"),
        ];
        let out = reconcile(&records, set).unwrap();
        assert_eq!(out.summary.blocks_allocated, 2);
        // block 1 has no suffixed columns: its code, address and amount are
        // all dropped, and the summary says so
        assert_eq!(out.summary.cells_dropped_missing_column, 3);
        assert_eq!(out.template.columns().len(), 4);
        assert_eq!(
            cell(&out.template, 0, "x_studio_code_analytique"),
            &Value::text("C1")
        );
    }

    #[test]
    fn template_without_key_column_is_an_error() {
        let template = RecordSet::with_columns(&["id"]);
        assert!(reconcile(&[], template).is_err());
    }
}
