use anyhow::{Context as _, Result};
use rust_decimal::Decimal;

use crate::table::{RecordSet, Value};

/// Required columns of the HMS source export, exact and case-sensitive.
pub const SOURCE_COLUMNS: [&str; 10] = [
    "journal",
    "accountgl",
    "account-id",
    "docnumber",
    "bookyear",
    "datedoc",
    "duedate",
    "montant-gen",
    "D-C",
    "comment-int",
];

/// One typed row of the HMS export.
///
/// Dates and amounts stay raw here: amounts are sanitized and dates parsed
/// during transformation, where their failure modes differ (amounts degrade
/// to zero, dates abort the journal's batch).
#[derive(Debug, Clone)]
pub struct HmsRecord {
    pub journal: String,
    pub accountgl: Value,
    pub account_id: Value,
    pub docnumber: String,
    pub bookyear: String,
    pub datedoc: String,
    pub duedate: String,
    pub montant_gen: Value,
    pub dc: String,
    pub comment_int: Value,
}

impl HmsRecord {
    pub fn gl_account(&self) -> i64 {
        self.accountgl.as_integer().unwrap_or(0)
    }

    pub fn partner(&self) -> String {
        self.account_id.to_string()
    }
}

/// Validates the source schema and lifts every row into an [`HmsRecord`].
pub fn load_hms_records(set: &RecordSet) -> Result<Vec<HmsRecord>> {
    let indices = SOURCE_COLUMNS
        .iter()
        .map(|column| set.require_column(column))
        .collect::<Result<Vec<_>>>()
        .context("HMS export does not match the expected source schema")?;

    Ok(set
        .rows()
        .iter()
        .map(|row| HmsRecord {
            journal: row[indices[0]].to_string(),
            accountgl: row[indices[1]].clone(),
            account_id: row[indices[2]].clone(),
            docnumber: row[indices[3]].to_string(),
            bookyear: row[indices[4]].to_string(),
            datedoc: row[indices[5]].to_string(),
            duedate: row[indices[6]].to_string(),
            montant_gen: row[indices[7]].clone(),
            dc: row[indices[8]].to_string(),
            comment_int: row[indices[9]].clone(),
        })
        .collect())
}

/// Distinct journal codes in first-seen order.
pub fn distinct_journals(records: &[HmsRecord]) -> Vec<String> {
    let mut journals: Vec<String> = Vec::new();
    for record in records {
        if !journals.contains(&record.journal) {
            journals.push(record.journal.clone());
        }
    }
    journals
}

/// Per-journal rule bundle. Journal codes outside the four special ones all
/// share the default rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalKind {
    Ven,
    Ac2,
    Gestio,
    Odgest,
    Other,
}

impl JournalKind {
    pub fn of(code: &str) -> JournalKind {
        match code {
            "VEN" => JournalKind::Ven,
            "AC2" => JournalKind::Ac2,
            "GESTIO" => JournalKind::Gestio,
            "ODGEST" => JournalKind::Odgest,
            _ => JournalKind::Other,
        }
    }

    /// GL account whose rows are dropped from this journal's output.
    pub fn dropped_account(&self) -> Option<i64> {
        match self {
            JournalKind::Ven | JournalKind::Gestio => Some(400000),
            JournalKind::Ac2 => Some(440100),
            _ => None,
        }
    }

    /// GL account whose `comment-int` supplies the group reference.
    pub fn reference_account(&self) -> Option<i64> {
        match self {
            JournalKind::Ven | JournalKind::Gestio => Some(400000),
            JournalKind::Ac2 => Some(440100),
            _ => None,
        }
    }

    /// Journal label as written to the output. The rewrite happens only at
    /// output-field assignment, never at filter time.
    pub fn output_label<'a>(&self, code: &'a str) -> &'a str {
        match self {
            JournalKind::Gestio => "GESTI",
            JournalKind::Odgest => "ODGES",
            _ => code,
        }
    }

    pub fn schema(&self) -> Schema {
        match self {
            JournalKind::Odgest => Schema::LedgerEntry,
            _ => Schema::Invoice,
        }
    }

    /// Signed unit price: sales-side journals negate debits, the purchase
    /// journal negates credits, everything else carries no unit price.
    pub fn signed_amount(&self, dc: &str, amount: Decimal) -> Decimal {
        match self {
            JournalKind::Ven | JournalKind::Gestio => {
                if dc == "D" {
                    -amount
                } else {
                    amount
                }
            }
            JournalKind::Ac2 => {
                if dc == "D" {
                    amount
                } else {
                    -amount
                }
            }
            _ => Decimal::ZERO,
        }
    }

    /// Primary rent accounts feeding the reconciler's main-rent sum.
    pub fn primary_rent_accounts(&self) -> &'static [i64] {
        match self {
            JournalKind::Ven => &[700100, 700200],
            JournalKind::Ac2 => &[600100, 600200],
            _ => &[],
        }
    }
}

/// Output schema variant. Exactly one per journal, fixed by journal identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    Invoice,
    LedgerEntry,
}

impl Schema {
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Schema::Invoice => &[
                "name",
                "partner_id",
                "invoice_date",
                "invoice_date_due",
                "journal_code",
                "account_id",
                "invoice_line_ids/price_unit",
                "Référence",
            ],
            Schema::LedgerEntry => &[
                "Numéro",
                "Écritures comptables/Partenaire",
                "Date",
                "Journal",
                "Écritures comptables/Crédit",
                "Écritures comptables/Débit",
                "Écritures comptables/Libellé",
                "Écritures comptables/Compte/Code",
            ],
        }
    }

    pub fn dedup_key_columns(&self) -> &'static [&'static str] {
        match self {
            Schema::Invoice => &[
                "name",
                "partner_id",
                "invoice_date",
                "invoice_date_due",
                "journal_code",
                "Référence",
            ],
            Schema::LedgerEntry => &["Numéro", "Date", "Journal"],
        }
    }

    pub fn partner_column(&self) -> &'static str {
        match self {
            Schema::Invoice => "partner_id",
            Schema::LedgerEntry => "Écritures comptables/Partenaire",
        }
    }
}
