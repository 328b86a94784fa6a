use anyhow::Result;

use crate::table::{RecordSet, Value};

const EXTRACT_JOURNALS: [&str; 2] = ["AC2", "VEN"];
const REFERENCE_ACCOUNTS: [i64; 2] = [400000, 440100];
const EXCLUDED_ACCOUNTS: [i64; 3] = [400000, 440100, 499200];

/// Segment after the last `/`. The whole string when there is no `/`.
pub fn trailing_segment(comment: &str) -> &str {
    comment.rsplit('/').next().unwrap_or(comment)
}

/// Second-to-last segment, present only when the comment has at least two
/// `/` separators.
pub fn penultimate_segment(comment: &str) -> Option<&str> {
    if comment.matches('/').count() < 2 {
        return None;
    }
    comment.rsplit('/').nth(1)
}

/// Reference-code report: AC2/VEN rows on the reference accounts, with the
/// comment reduced to its trailing segment. Non-text comment cells pass
/// through unchanged.
pub fn extract_reference_codes(source: &RecordSet) -> Result<RecordSet> {
    extract(source, false)
}

/// Address-code report: AC2/VEN rows off the reference accounts, with the
/// comment reduced to its second-to-last segment where one exists.
pub fn extract_address_codes(source: &RecordSet) -> Result<RecordSet> {
    extract(source, true)
}

fn extract(source: &RecordSet, addresses: bool) -> Result<RecordSet> {
    let journal = source.require_column("journal")?;
    let accountgl = source.require_column("accountgl")?;
    let account_id = source.require_column("account-id")?;
    let comment = source.require_column("comment-int")?;
    let montant = if addresses {
        Some(source.require_column("montant-gen")?)
    } else {
        None
    };

    let mut out = if addresses {
        RecordSet::with_columns(&[
            "journal",
            "accountgl",
            "account-id",
            "comment-int",
            "montant-gen",
        ])
    } else {
        RecordSet::with_columns(&["journal", "accountgl", "account-id", "comment-int"])
    };

    for row in source.rows() {
        let code = row[journal].to_string();
        if !EXTRACT_JOURNALS.contains(&code.as_str()) {
            continue;
        }
        let account = row[accountgl].as_integer().unwrap_or(0);
        let keep = if addresses {
            !EXCLUDED_ACCOUNTS.contains(&account)
        } else {
            REFERENCE_ACCOUNTS.contains(&account)
        };
        if !keep {
            continue;
        }

        let rewritten = match row[comment].as_text() {
            Some(text) => {
                if addresses {
                    match penultimate_segment(text) {
                        Some(segment) => Value::text(segment),
                        None => row[comment].clone(),
                    }
                } else {
                    Value::text(trailing_segment(text))
                }
            }
            None => row[comment].clone(),
        };

        let mut projected = vec![
            row[journal].clone(),
            row[accountgl].clone(),
            row[account_id].clone(),
            rewritten,
        ];
        if let Some(montant) = montant {
            projected.push(row[montant].clone());
        }
        out.push_row(projected);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("A/B/C123", "C123")]
    #[case("C123", "C123")]
    #[case("", "")]
    fn trailing(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(trailing_segment(input), expected);
    }

    #[rstest]
    #[case("A/B/C123", Some("B"))]
    #[case("A/B", None)]
    #[case("C123", None)]
    fn penultimate(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(penultimate_segment(input), expected);
    }

    fn source() -> RecordSet {
        let mut set = RecordSet::with_columns(&[
            "journal",
            "accountgl",
            "account-id",
            "comment-int",
            "montant-gen",
        ]);
        let rows = [
            ("VEN", 400000, "P1", Value::text("A/B/REF1")),
            ("VEN", 700100, "P1", Value::text("A/B/REF1")),
            ("AC2", 440100, "S1", Value::Integer(42)),
            ("AC2", 499200, "S1", Value::text("A/B/C")),
            ("ODGEST", 400000, "P2", Value::text("A/B/C")),
            ("VEN", 700500, "P1", Value::text("no-slashes")),
        ];
        for (journal, account, partner, comment) in rows {
            set.push_row(vec![
                Value::text(journal),
                Value::Integer(account),
                Value::text(partner),
                comment,
                Value::text("10,00"),
            ]);
        }
        set
    }

    #[test]
    fn reference_codes_keep_only_reference_accounts() {
        let out = extract_reference_codes(&source()).unwrap();
        assert_eq!(out.columns().len(), 4);
        assert_eq!(out.len(), 2);
        assert_eq!(out.value(0, 3), &Value::text("REF1"));
        // non-text comment passes through unchanged
        assert_eq!(out.value(1, 3), &Value::Integer(42));
    }

    #[test]
    fn address_codes_exclude_reference_and_suspense_accounts() {
        let out = extract_address_codes(&source()).unwrap();
        assert_eq!(out.columns().len(), 5);
        assert_eq!(out.len(), 2);
        // VEN/700100 row: penultimate segment
        assert_eq!(out.value(0, 3), &Value::text("B"));
        // fewer than two slashes: unchanged
        assert_eq!(out.value(1, 3), &Value::text("no-slashes"));
        assert_eq!(out.value(0, 4), &Value::text("10,00"));
    }

    #[test]
    fn missing_columns_abort() {
        let set = RecordSet::with_columns(&["journal"]);
        assert!(extract_reference_codes(&set).is_err());
    }
}
