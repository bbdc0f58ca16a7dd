use ledgerlens_core::TransactionRecord;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Economic-equivalence key: two records with the same normalized merchant,
/// currency, and 2-dp amounts describe the same economic event even when
/// their ids differ (e.g. the same statement imported twice).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DuplicateKey {
    pub merchant: String,
    pub currency: String,
    pub debit: Decimal,
    pub credit: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateCluster {
    pub key: DuplicateKey,
    /// Member ids ordered by timestamp, then id.
    pub record_ids: Vec<String>,
}

/// Group records by equivalence key and return every cluster with at least
/// two members, ordered by key. Advisory only: nothing is deleted or merged.
pub fn find_duplicates(records: &[TransactionRecord]) -> Vec<DuplicateCluster> {
    let mut groups: BTreeMap<DuplicateKey, Vec<&TransactionRecord>> = BTreeMap::new();
    for rec in records {
        let key = DuplicateKey {
            merchant: rec.merchant_key(),
            currency: rec.currency.clone(),
            debit: rec.debit().round_dp(2),
            credit: rec.credit().round_dp(2),
        };
        groups.entry(key).or_default().push(rec);
    }

    let mut clusters = Vec::new();
    for (key, mut members) in groups {
        if members.len() < 2 {
            continue;
        }
        members.sort_by(|a, b| {
            (a.date, &a.time, &a.id).cmp(&(b.date, &b.time, &b.id))
        });
        clusters.push(DuplicateCluster {
            key,
            record_ids: members.iter().map(|r| r.id.clone()).collect(),
        });
    }
    tracing::debug!(clusters = clusters.len(), "duplicate scan complete");
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ledgerlens_core::Category;
    use rust_decimal::Decimal;

    fn record(id: &str, merchant: &str, debit: &str, day: u32) -> TransactionRecord {
        TransactionRecord {
            id: id.to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, day),
            time: None,
            debit_amount: Some(debit.parse::<Decimal>().unwrap()),
            credit_amount: Some(Decimal::ZERO),
            currency: "CHF".to_string(),
            description_fields: vec![merchant.to_string()],
            merchant_raw: merchant.to_string(),
            merchant_normalized: String::new(),
            category: Category::default(),
            category_confidence: 0.0,
            category_rule: None,
            is_transfer: false,
            transfer_confidence: 0.0,
            counterparty_account: None,
            transfer_direction: Default::default(),
            source_file: String::new(),
            source_account: String::new(),
            quality: None,
        }
    }

    #[test]
    fn same_key_records_form_one_cluster() {
        let records = vec![
            record("a", "COOP", "12.50", 3),
            record("b", "COOP", "12.50", 1),
            record("c", "SBB", "12.50", 1),
        ];
        let clusters = find_duplicates(&records);
        assert_eq!(clusters.len(), 1);
        // Members ordered by timestamp.
        assert_eq!(clusters[0].record_ids, vec!["b", "a"]);
    }

    #[test]
    fn clustering_is_transitive_within_a_key() {
        let records = vec![
            record("a", "COOP", "12.50", 1),
            record("b", "COOP", "12.50", 2),
            record("c", "COOP", "12.50", 3),
        ];
        let clusters = find_duplicates(&records);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].record_ids.len(), 3);
    }

    #[test]
    fn amounts_compare_after_two_dp_rounding() {
        let records = vec![
            record("a", "COOP", "12.501", 1),
            record("b", "COOP", "12.499", 2),
        ];
        let clusters = find_duplicates(&records);
        assert_eq!(clusters.len(), 1);
    }

    #[test]
    fn different_currency_splits_the_key() {
        let mut a = record("a", "COOP", "12.50", 1);
        let b = record("b", "COOP", "12.50", 2);
        a.currency = "EUR".to_string();
        assert!(find_duplicates(&[a, b]).is_empty());
    }

    #[test]
    fn merchant_key_uses_normalized_form() {
        let records = vec![
            record("a", "Uber   * Eats", "32.50", 1),
            record("b", "UBER EATS", "32.50", 2),
        ];
        let clusters = find_duplicates(&records);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].key.merchant, "UBER EATS");
    }

    #[test]
    fn no_duplicates_yields_empty() {
        let records = vec![record("a", "COOP", "1.00", 1), record("b", "SBB", "2.00", 1)];
        assert!(find_duplicates(&records).is_empty());
    }
}
