use ledgerlens_core::{Category, RuleProvenance, TransactionRecord};
use std::collections::BTreeMap;

pub const DEFAULT_MIN_EXAMPLES: usize = 3;
pub const DEFAULT_MIN_PRECISION: f64 = 0.8;
/// Auto-assigned labels at or above this confidence may join the training
/// set when the caller opts in.
pub const AUTO_TRUST_CONFIDENCE: f64 = 0.95;

/// Currency codes, generic banking words, and legal-entity suffixes carry no
/// merchant identity and are never mined into rules.
const STOPWORDS: &[&str] = &[
    "THE", "AND", "PAYMENT", "KARTE", "CARD", "CH", "CHF", "USD", "EUR", "GMBH", "AG", "LTD",
    "SA", "CO", "COMPANY", "PENDING", "TRANSAKTIONS", "TRANSACTION",
];

/// A learned token → category association with its supporting evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternRule {
    pub token: String,
    pub category: Category,
    pub occurrences: usize,
    pub precision: f64,
}

/// Uppercase alphanumeric tokens of length ≥ 3, minus stopwords and pure
/// numerics; deduplicated and sorted so each record votes once per token and
/// downstream iteration is deterministic.
pub fn tokenize_mapping_text(text: &str) -> Vec<String> {
    let upper = text.to_uppercase();
    let mut tokens: Vec<String> = upper
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| t.len() >= 3)
        .filter(|t| !STOPWORDS.contains(t))
        .filter(|t| !t.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
        .collect();
    tokens.sort();
    tokens.dedup();
    tokens
}

/// Select the records whose labels are trustworthy enough to learn from:
/// manual overrides always, very-high-confidence auto labels when
/// `include_auto` is set. `Other` never trains a rule.
pub fn trusted_training_set(
    records: &[TransactionRecord],
    include_auto: bool,
) -> Vec<&TransactionRecord> {
    records
        .iter()
        .filter(|r| !r.category.is_other())
        .filter(|r| {
            matches!(r.category_rule, Some(RuleProvenance::ManualOverride))
                || (include_auto && r.category_confidence >= AUTO_TRUST_CONFIDENCE)
        })
        .collect()
}

/// Mine token → category rules from labeled records.
///
/// A token becomes a rule only when its total occurrence count reaches
/// `min_examples` and the precision of its majority category reaches
/// `min_precision`. Deterministic: same labeled set, same rules, in the same
/// order (occurrences desc, precision desc, token asc).
pub fn learn_rules(
    records: &[TransactionRecord],
    min_examples: usize,
    min_precision: f64,
) -> Vec<PatternRule> {
    let mut token_counts: BTreeMap<String, BTreeMap<Category, usize>> = BTreeMap::new();

    for rec in records {
        if rec.category.is_other() {
            continue;
        }
        for token in tokenize_mapping_text(&rec.mapping_text()) {
            *token_counts
                .entry(token)
                .or_default()
                .entry(rec.category.clone())
                .or_insert(0) += 1;
        }
    }

    let mut rules = Vec::new();
    for (token, categories) in token_counts {
        let total: usize = categories.values().sum();
        if total < min_examples {
            continue;
        }
        // Majority category; count ties resolve to the first in category
        // order, which is stable for a given labeled set.
        let (category, majority) = categories
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(c, n)| (c.clone(), *n))
            .expect("non-empty category counts");
        let precision = majority as f64 / total as f64;
        if precision < min_precision {
            continue;
        }
        rules.push(PatternRule {
            token,
            category,
            occurrences: total,
            precision,
        });
    }

    rules.sort_by(|a, b| {
        b.occurrences
            .cmp(&a.occurrences)
            .then_with(|| {
                b.precision
                    .partial_cmp(&a.precision)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.token.cmp(&b.token))
    });
    tracing::debug!(
        rules = rules.len(),
        min_examples,
        min_precision,
        "pattern rule mining complete"
    );
    rules
}
