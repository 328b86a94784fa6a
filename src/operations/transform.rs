use anyhow::{anyhow, Result};
use chrono::{Datelike as _, NaiveDate};
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::ir::{HmsRecord, JournalKind, Schema};
use crate::operations::amount::sanitize_amount;
use crate::table::{RecordSet, Value};

/// Transforms the source rows of one journal into its output sheet.
///
/// Order of the steps matters: references are derived over the full journal
/// selection BEFORE the account filter drops the reference rows, so a
/// document's 400000/440100 row can supply the reference for the rest of its
/// group and then disappear from the output.
pub fn prepare_journal(records: &[HmsRecord], journal_code: &str) -> Result<RecordSet> {
    let kind = JournalKind::of(journal_code);
    let selected: Vec<&HmsRecord> = records
        .iter()
        .filter(|record| record.journal == journal_code)
        .collect();

    let references = derive_references(&selected, kind);

    let kept = selected
        .into_iter()
        .filter(|record| Some(record.gl_account()) != kind.dropped_account());

    let schema = kind.schema();
    let mut out = RecordSet::with_columns(schema.columns());
    for record in kept {
        let amount = sanitize_amount(&record.montant_gen);
        let datedoc = parse_date(&record.datedoc).map_err(|err| {
            anyhow!("Journal {}: invalid datedoc: {:#}", journal_code, err)
        })?;
        // Both date fields are normalized for every journal, even though the
        // ledger-entry schema does not carry the due date.
        let duedate = parse_date(&record.duedate).map_err(|err| {
            anyhow!("Journal {}: invalid duedate: {:#}", journal_code, err)
        })?;
        let name = derive_name(record, kind, datedoc);
        let label = kind.output_label(journal_code);
        match schema {
            Schema::LedgerEntry => {
                let credit = if record.dc == "C" { amount } else { Decimal::ZERO };
                let debit = if record.dc == "D" { amount } else { Decimal::ZERO };
                out.push_row(vec![
                    Value::text(name),
                    record.account_id.clone(),
                    Value::text(format_date(datedoc)),
                    Value::text(label),
                    Value::Decimal(credit),
                    Value::Decimal(debit),
                    record.comment_int.clone(),
                    record.accountgl.clone(),
                ]);
            }
            Schema::Invoice => {
                let reference = if kind.reference_account().is_some() {
                    references
                        .get(&group_key(record))
                        .cloned()
                        .unwrap_or_else(|| record.comment_int.clone())
                } else {
                    record.comment_int.clone()
                };
                out.push_row(vec![
                    Value::text(name),
                    record.account_id.clone(),
                    Value::text(format_date(datedoc)),
                    Value::text(format_date(duedate)),
                    Value::text(label),
                    record.accountgl.clone(),
                    Value::Decimal(kind.signed_amount(&record.dc, amount)),
                    reference,
                ]);
            }
        }
    }
    Ok(out)
}

fn group_key(record: &HmsRecord) -> (String, String) {
    (record.docnumber.clone(), record.partner())
}

/// Reference per (docnumber, account-id) group: the reference account's own
/// `comment-int` when the group has such a row, otherwise the group's first
/// row's `comment-int`.
fn derive_references(
    selected: &[&HmsRecord],
    kind: JournalKind,
) -> HashMap<(String, String), Value> {
    let mut references = HashMap::new();
    let Some(reference_account) = kind.reference_account() else {
        return references;
    };
    for record in selected {
        if record.gl_account() == reference_account {
            references
                .entry(group_key(record))
                .or_insert_with(|| record.comment_int.clone());
        }
    }
    for record in selected {
        references
            .entry(group_key(record))
            .or_insert_with(|| record.comment_int.clone());
    }
    references
}

fn derive_name(record: &HmsRecord, kind: JournalKind, datedoc: NaiveDate) -> String {
    match kind {
        JournalKind::Ac2 | JournalKind::Gestio => format!("2500-{}", zero_pad4(&record.docnumber)),
        JournalKind::Odgest => format!(
            "{}/{}/{:02}/{}",
            record.journal,
            datedoc.year(),
            datedoc.month(),
            zero_pad4(&record.docnumber)
        ),
        _ => format!("{}-{}", record.bookyear, zero_pad4(&record.docnumber)),
    }
}

fn zero_pad4(value: &str) -> String {
    format!("{:0>4}", value)
}

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

fn parse_date(raw: &str) -> Result<NaiveDate> {
    // Spreadsheet exports sometimes append a midnight timestamp; only the
    // date part matters.
    let date_part = raw.trim().split_whitespace().next().unwrap_or("");
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, format) {
            return Ok(date);
        }
    }
    Err(anyhow!("Cannot parse date {:?}", raw))
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y.%m.%d").to_string()
}
