use ledgerlens_core::{Category, RuleProvenance, TransactionRecord};
use ledgerlens_store::RuleStore;
use std::collections::BTreeMap;

use crate::learn::tokenize_mapping_text;
use crate::transfer::TRANSFER_CATEGORY_THRESHOLD;

/// Classifier output at or above this confidence is left alone.
pub const DEFAULT_LOW_CONFIDENCE_THRESHOLD: f64 = 0.75;
pub const MERCHANT_RULE_CONFIDENCE: f64 = 0.90;
pub const MERCHANT_HISTORY_CONFIDENCE: f64 = 0.70;
/// Peer records below this confidence do not vote in the history fallback.
pub const MERCHANT_HISTORY_MIN_CONFIDENCE: f64 = 0.85;
pub const PATTERN_RULE_CONF_BASE: f64 = 0.8;
pub const PATTERN_RULE_CONF_SPAN: f64 = 0.15;
pub const PATTERN_RULE_CONF_CAP: f64 = 0.95;

/// Apply the rule store to records the classifier was unsure about.
///
/// Precedence, highest first: merchant rule, learned pattern rules,
/// merchant-history majority, high-confidence transfer signal. Per-record
/// manual overrides are absolute and run last over the whole collection,
/// regardless of confidence.
pub fn apply_rules(
    mut records: Vec<TransactionRecord>,
    store: &RuleStore,
    low_confidence_threshold: f64,
) -> Vec<TransactionRecord> {
    let history = merchant_history(&records);

    for rec in &mut records {
        let unsure =
            rec.category.is_other() || rec.category_confidence < low_confidence_threshold;
        if unsure {
            apply_chain(rec, store, &history);
        }
    }

    for rec in &mut records {
        if let Some(category) = store.category_overrides.get(&rec.id) {
            rec.category = Category::parse(category);
            rec.category_confidence = 1.0;
            rec.category_rule = Some(RuleProvenance::ManualOverride);
        }
    }
    records
}

fn apply_chain(
    rec: &mut TransactionRecord,
    store: &RuleStore,
    history: &BTreeMap<String, Category>,
) {
    let merchant = rec.merchant_key();

    if let Some(category) = store.merchant_category_rules.get(&merchant) {
        rec.category = Category::parse(category);
        rec.category_confidence = rec.category_confidence.max(MERCHANT_RULE_CONFIDENCE);
        rec.category_rule = Some(RuleProvenance::MerchantRule);
        return;
    }

    if let Some(suggestion) = suggest_from_patterns(&rec.mapping_text(), store) {
        rec.category = suggestion.category;
        rec.category_confidence = rec.category_confidence.max(
            (PATTERN_RULE_CONF_BASE + PATTERN_RULE_CONF_SPAN * suggestion.score)
                .min(PATTERN_RULE_CONF_CAP),
        );
        rec.category_rule = Some(RuleProvenance::PatternRule(suggestion.token));
        return;
    }

    if let Some(category) = history.get(&merchant) {
        rec.category = category.clone();
        rec.category_confidence = rec.category_confidence.max(MERCHANT_HISTORY_CONFIDENCE);
        rec.category_rule = Some(RuleProvenance::MerchantHistory);
        return;
    }

    if rec.transfer_confidence >= TRANSFER_CATEGORY_THRESHOLD {
        rec.category = Category::Transfers;
        rec.category_confidence = rec.category_confidence.max(rec.transfer_confidence);
        rec.category_rule = Some(RuleProvenance::TransferSignal);
    }
    // Otherwise the record stays as classified (typically `Other`).
}

#[derive(Debug)]
struct PatternSuggestion {
    category: Category,
    token: String,
    /// Fraction of the record's tokens voting for the winning category.
    score: f64,
}

/// Vote learned token rules over the record's tokens. The category with the
/// most token hits wins; ties resolve to the category whose contributing
/// token comes first in sorted-token order, which is deterministic for a
/// given store snapshot.
fn suggest_from_patterns(text: &str, store: &RuleStore) -> Option<PatternSuggestion> {
    if store.pattern_category_rules.is_empty() {
        return None;
    }
    let tokens = tokenize_mapping_text(text);
    if tokens.is_empty() {
        return None;
    }

    struct Tally {
        hits: usize,
        first_token_index: usize,
    }
    let mut tallies: BTreeMap<Category, Tally> = BTreeMap::new();
    for (index, token) in tokens.iter().enumerate() {
        if let Some(category) = store.pattern_category_rules.get(token) {
            let entry = tallies
                .entry(Category::parse(category))
                .or_insert(Tally { hits: 0, first_token_index: index });
            entry.hits += 1;
        }
    }

    let (category, tally) = tallies.into_iter().max_by(|a, b| {
        a.1.hits
            .cmp(&b.1.hits)
            .then_with(|| b.1.first_token_index.cmp(&a.1.first_token_index))
    })?;

    Some(PatternSuggestion {
        token: tokens[tally.first_token_index].clone(),
        score: tally.hits as f64 / tokens.len() as f64,
        category,
    })
}

/// Majority category per merchant among high-confidence, non-`Other`,
/// non-transfer records; the fallback when no explicit rule matches.
fn merchant_history(records: &[TransactionRecord]) -> BTreeMap<String, Category> {
    let mut votes: BTreeMap<String, BTreeMap<Category, usize>> = BTreeMap::new();
    for rec in records {
        if rec.category.is_other()
            || rec.category == Category::Transfers
            || rec.category_confidence < MERCHANT_HISTORY_MIN_CONFIDENCE
        {
            continue;
        }
        let merchant = rec.merchant_key();
        if merchant.is_empty() {
            continue;
        }
        *votes
            .entry(merchant)
            .or_default()
            .entry(rec.category.clone())
            .or_insert(0) += 1;
    }

    votes
        .into_iter()
        .filter_map(|(merchant, counts)| {
            counts
                .into_iter()
                .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
                .map(|(category, _)| (merchant, category))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn record(id: &str, merchant: &str, category: &str, confidence: f64) -> TransactionRecord {
        TransactionRecord {
            id: id.to_string(),
            date: None,
            time: None,
            debit_amount: Some(Decimal::from(10)),
            credit_amount: Some(Decimal::ZERO),
            currency: "CHF".to_string(),
            description_fields: vec![merchant.to_string()],
            merchant_raw: merchant.to_string(),
            merchant_normalized: merchant.to_uppercase(),
            category: Category::parse(category),
            category_confidence: confidence,
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
    fn confident_labels_are_left_alone() {
        let mut store = RuleStore::default();
        store.set_merchant_rule("SWISSCOM", "Shopping & Retail");
        let records = vec![record("a", "SWISSCOM", "Utilities & Bills", 0.9)];
        let out = apply_rules(records, &store, 0.75);
        assert_eq!(out[0].category.name(), "Utilities & Bills");
    }

    #[test]
    fn merchant_rule_beats_pattern_rule() {
        let mut store = RuleStore::default();
        store.set_merchant_rule("COOP PRONTO", "Food & Drink");
        store.set_pattern_rule("COOP", "Shopping & Retail");
        let out = apply_rules(vec![record("a", "COOP PRONTO", "Other", 0.2)], &store, 0.75);
        assert_eq!(out[0].category.name(), "Food & Drink");
        assert_eq!(out[0].category_rule, Some(RuleProvenance::MerchantRule));
        assert!((out[0].category_confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn pattern_rule_sets_confidence_from_match_score() {
        let mut store = RuleStore::default();
        store.set_pattern_rule("NETFLIX", "Entertainment & Leisure");
        let out = apply_rules(vec![record("a", "NETFLIX", "Other", 0.2)], &store, 0.75);
        assert_eq!(out[0].category.name(), "Entertainment & Leisure");
        assert_eq!(
            out[0].category_rule,
            Some(RuleProvenance::PatternRule("NETFLIX".to_string()))
        );
        // Single token, full hit: 0.8 + 0.15·1.0 = 0.95, at the cap.
        assert!((out[0].category_confidence - 0.95).abs() < 1e-9);
    }

    #[test]
    fn pattern_vote_picks_category_with_most_hits() {
        let mut store = RuleStore::default();
        store.set_pattern_rule("UBER", "Transport");
        store.set_pattern_rule("EATS", "Food & Drink");
        store.set_pattern_rule("ZUERICH", "Food & Drink");
        let mut rec = record("a", "UBER EATS ZUERICH", "Other", 0.2);
        rec.description_fields = vec!["UBER EATS ZUERICH".to_string()];
        let out = apply_rules(vec![rec], &store, 0.75);
        assert_eq!(out[0].category.name(), "Food & Drink");
    }

    #[test]
    fn merchant_history_majority_fills_gaps() {
        let records = vec![
            record("a", "KIOSK AG", "Food & Drink", 0.9),
            record("b", "KIOSK AG", "Food & Drink", 0.88),
            record("c", "KIOSK AG", "Other", 0.2),
        ];
        let out = apply_rules(records, &RuleStore::default(), 0.75);
        let fixed = out.iter().find(|r| r.id == "c").unwrap();
        assert_eq!(fixed.category.name(), "Food & Drink");
        assert_eq!(fixed.category_rule, Some(RuleProvenance::MerchantHistory));
        assert!((fixed.category_confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn low_confidence_peers_do_not_vote_in_history() {
        let records = vec![
            record("a", "KIOSK AG", "Food & Drink", 0.5),
            record("b", "KIOSK AG", "Food & Drink", 0.5),
            record("c", "KIOSK AG", "Other", 0.2),
        ];
        let out = apply_rules(records, &RuleStore::default(), 0.75);
        let untouched = out.iter().find(|r| r.id == "c").unwrap();
        assert_eq!(untouched.category, Category::Other);
    }

    #[test]
    fn strong_transfer_signal_promotes_category() {
        let mut rec = record("a", "UNKNOWN", "Other", 0.2);
        rec.transfer_confidence = 0.85;
        rec.is_transfer = true;
        let out = apply_rules(vec![rec], &RuleStore::default(), 0.75);
        assert_eq!(out[0].category, Category::Transfers);
        assert_eq!(out[0].category_rule, Some(RuleProvenance::TransferSignal));

        // A weaker signal (flagged but under the stricter bar) must not
        // overwrite the category.
        let mut weak = record("b", "UNKNOWN", "Other", 0.2);
        weak.transfer_confidence = 0.55;
        weak.is_transfer = true;
        let out = apply_rules(vec![weak], &RuleStore::default(), 0.75);
        assert_eq!(out[0].category, Category::Other);
    }

    #[test]
    fn manual_override_is_absolute() {
        let mut store = RuleStore::default();
        store.set_merchant_rule("COOP", "Food & Drink");
        store.set_override("a", "Entertainment & Leisure");
        // Even a confident label yields to the per-record override.
        let out = apply_rules(vec![record("a", "COOP", "Food & Drink", 0.98)], &store, 0.75);
        assert_eq!(out[0].category.name(), "Entertainment & Leisure");
        assert_eq!(out[0].category_rule, Some(RuleProvenance::ManualOverride));
        assert!((out[0].category_confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn apply_rules_is_idempotent() {
        let mut store = RuleStore::default();
        store.set_pattern_rule("NETFLIX", "Entertainment & Leisure");
        store.set_override("b", "Transport");
        let records = vec![
            record("a", "NETFLIX", "Other", 0.2),
            record("b", "MYSTERY", "Other", 0.2),
        ];
        let once = apply_rules(records, &store, 0.75);
        let twice = apply_rules(once.clone(), &store, 0.75);
        for (a, b) in once.iter().zip(&twice) {
            assert_eq!(a.category, b.category);
            assert_eq!(a.category_confidence, b.category_confidence);
            assert_eq!(a.category_rule, b.category_rule);
        }
    }
}
