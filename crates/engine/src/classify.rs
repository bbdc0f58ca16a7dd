use ledgerlens_core::{Category, RuleProvenance, TransactionRecord};

use crate::keyword_table::KeywordTable;
use crate::transfer::TRANSFER_KEYWORDS;

// Calibrated score constants. The exact values are observed policy from the
// system this engine replaces; change them only with evidence.
pub const CONF_CASH_WITHDRAWAL: f64 = 0.96;
pub const CONF_FEE_PHRASE: f64 = 0.92;
pub const CONF_TRANSFER_KEYWORD: f64 = 0.93;
pub const CONF_INCOME_KEYWORD: f64 = 0.95;
pub const CONF_KEYWORD_BASE: f64 = 0.75;
pub const BONUS_MERCHANT_FIELD: f64 = 0.15;
pub const BONUS_DELIMITED_WORD: f64 = 0.06;
pub const CONF_KEYWORD_CAP: f64 = 0.98;
pub const CONF_INFLOW_FALLBACK: f64 = 0.58;
pub const CONF_OUTFLOW_FALLBACK: f64 = 0.22;
pub const CONF_ZERO_FALLBACK: f64 = 0.20;
pub const CONF_FLOW_DOWNGRADE_CAP: f64 = 0.35;

/// Cash-withdrawal phrases pre-empt everything else: an ATM line is an
/// internal movement no matter what else the memo says.
const CASH_WITHDRAWAL_PHRASES: &[&str] = &["BANCOMAT", "BARGELDBEZUG", "CASH WITHDRAWAL", "ATM"];

/// Interest settlements and card foreign-use fees land in the fixed utility
/// category.
const FEE_PHRASES: &[&str] = &[
    "ZINSABSCHLUSS",
    "AUSLANDEINSATZ",
    "JAHRESPREIS",
    "KONTOFUEHRUNG",
];
const FEE_CATEGORY: &str = "Utilities & Bills";

const INCOME_KEYWORDS: &[&str] = &[
    "SALARY",
    "LOHN",
    "GEHALT",
    "PAYROLL",
    "GUTSCHRIFT",
    "DIVIDEND",
    "PENSION",
    "REFUND",
];

/// Longer keywords that are still too ambiguous to match as substrings.
const STRICT_WORDS: &[&str] = &["PARKING", "STORE", "POWER"];

/// Output of one classification decision.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub category: Category,
    pub confidence: f64,
    pub rule: RuleProvenance,
}

impl Classification {
    fn new(category: Category, confidence: f64, rule: RuleProvenance) -> Self {
        Self { category, confidence, rule }
    }
}

pub struct Classifier {
    table: KeywordTable,
}

impl Classifier {
    pub fn new(table: KeywordTable) -> Self {
        Self { table }
    }

    /// Assign `(category, confidence, rule)` from the record's description
    /// text and flow direction. Deterministic: fixed rules first, then the
    /// transfer and income lists, then the caller's table in table order.
    pub fn classify(&self, rec: &TransactionRecord) -> Classification {
        let text = rec.match_text();
        let merchant = rec.merchant_raw.to_uppercase();
        let outgoing = rec.is_outgoing();
        let incoming = rec.is_incoming();

        for phrase in CASH_WITHDRAWAL_PHRASES {
            if contains_keyword(&text, phrase) {
                return Classification::new(
                    Category::Transfers,
                    CONF_CASH_WITHDRAWAL,
                    RuleProvenance::CashWithdrawal,
                );
            }
        }
        for phrase in FEE_PHRASES {
            if contains_keyword(&text, phrase) {
                return Classification::new(
                    Category::parse(FEE_CATEGORY),
                    CONF_FEE_PHRASE,
                    RuleProvenance::FeePhrase,
                );
            }
        }
        for keyword in TRANSFER_KEYWORDS {
            if contains_keyword(&text, keyword) {
                return Classification::new(
                    Category::Transfers,
                    CONF_TRANSFER_KEYWORD,
                    RuleProvenance::TransferKeyword((*keyword).to_string()),
                );
            }
        }
        if incoming {
            for keyword in INCOME_KEYWORDS {
                if contains_keyword(&text, keyword) {
                    return Classification::new(
                        Category::Income,
                        CONF_INCOME_KEYWORD,
                        RuleProvenance::IncomeKeyword((*keyword).to_string()),
                    );
                }
            }
        }

        for (category, keywords) in self.table.entries() {
            // Direction consistency: an outflow is never income or an
            // inbound transfer, an inflow is never an outbound transfer.
            if outgoing && matches!(category, Category::Transfers | Category::Income) {
                continue;
            }
            if incoming && *category == Category::Transfers {
                continue;
            }
            for keyword in keywords {
                if contains_keyword(&text, keyword) {
                    let mut confidence = CONF_KEYWORD_BASE;
                    if contains_keyword(&merchant, keyword) {
                        confidence += BONUS_MERCHANT_FIELD;
                    }
                    if contains_delimited(&text, keyword) {
                        confidence += BONUS_DELIMITED_WORD;
                    }
                    return Classification::new(
                        category.clone(),
                        confidence.min(CONF_KEYWORD_CAP),
                        RuleProvenance::Keyword(keyword.clone()),
                    );
                }
            }
        }

        if incoming {
            Classification::new(Category::Income, CONF_INFLOW_FALLBACK, RuleProvenance::FlowFallback)
        } else if outgoing {
            Classification::new(Category::Other, CONF_OUTFLOW_FALLBACK, RuleProvenance::FlowFallback)
        } else {
            Classification::new(Category::Other, CONF_ZERO_FALLBACK, RuleProvenance::FlowFallback)
        }
    }
}

/// Matching policy for one keyword against uppercased text. Short keywords
/// (≤4 alphanumeric characters, no separators) and the strict-word set only
/// count as delimited tokens, so "CAR" never fires inside "CARD".
fn contains_keyword(text: &str, keyword: &str) -> bool {
    if requires_delimiters(keyword) {
        contains_delimited(text, keyword)
    } else {
        text.contains(keyword)
    }
}

fn requires_delimiters(keyword: &str) -> bool {
    let short_plain = keyword.len() <= 4 && keyword.chars().all(|c| c.is_ascii_alphanumeric());
    short_plain || STRICT_WORDS.contains(&keyword)
}

/// True when `keyword` occurs with non-alphanumeric (or boundary) context on
/// both sides, i.e. as a delimited word rather than inside a larger token.
fn contains_delimited(text: &str, keyword: &str) -> bool {
    if keyword.is_empty() {
        return false;
    }
    let mut start = 0;
    while let Some(pos) = text[start..].find(keyword) {
        let at = start + pos;
        let end = at + keyword.len();
        let before_ok = text[..at]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = text[end..].chars().next().map_or(true, |c| !c.is_alphanumeric());
        if before_ok && after_ok {
            return true;
        }
        start = end;
    }
    false
}

/// Idempotent post-pass fixing labels that contradict the money flow.
/// Transfer-flagged records are exempt.
pub fn correct_flow(rec: &mut TransactionRecord) {
    if rec.is_transfer {
        return;
    }
    if rec.is_outgoing() && rec.category == Category::Income {
        rec.category = Category::Other;
        rec.category_confidence = rec.category_confidence.min(CONF_FLOW_DOWNGRADE_CAP);
        rec.category_rule = Some(RuleProvenance::FlowCorrection);
    } else if rec.is_incoming() && rec.category == Category::Other {
        rec.category = Category::Income;
        rec.category_confidence = rec.category_confidence.max(CONF_INFLOW_FALLBACK);
        rec.category_rule = Some(RuleProvenance::FlowCorrection);
    }
}

/// Classify a whole collection: populates category, confidence, provenance,
/// and the data-quality flag, then runs the flow-consistency correction.
/// Malformed records are annotated and classified with degraded semantics,
/// never skipped.
pub fn classify_records(
    mut records: Vec<TransactionRecord>,
    table: &KeywordTable,
) -> Vec<TransactionRecord> {
    let classifier = Classifier::new(table.clone());
    for rec in &mut records {
        rec.quality = rec.quality_check();
        if let Some(flag) = rec.quality {
            tracing::debug!(id = %rec.id, %flag, "data-quality defect on record");
        }
        let result = classifier.classify(rec);
        rec.category = result.category;
        rec.category_confidence = result.confidence;
        rec.category_rule = Some(result.rule);
        correct_flow(rec);
    }
    tracing::debug!(records = records.len(), "classification pass complete");
    records
}
