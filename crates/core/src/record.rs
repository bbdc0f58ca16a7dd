use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::category::{Category, TransferDirection};
use crate::merchant::normalize_merchant;
use crate::provenance::RuleProvenance;

/// One canonical ledger line as produced by ingestion.
///
/// Identity and raw fields are immutable after creation; the category and
/// transfer fields are derived and may be recomputed any number of times.
/// Amounts are `Option` so an absent amount is distinct from an explicit
/// zero: a record carrying neither amount is a data-quality defect, a
/// record with both at zero is a legitimate zero-value line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub debit_amount: Option<Decimal>,
    #[serde(default)]
    pub credit_amount: Option<Decimal>,
    #[serde(default)]
    pub currency: String,
    /// Ordered free-text fields: merchant line, memo lines, footnotes.
    #[serde(default)]
    pub description_fields: Vec<String>,
    #[serde(default)]
    pub merchant_raw: String,
    #[serde(default)]
    pub merchant_normalized: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub category_confidence: f64,
    #[serde(default)]
    pub category_rule: Option<RuleProvenance>,
    #[serde(default)]
    pub is_transfer: bool,
    #[serde(default)]
    pub transfer_confidence: f64,
    #[serde(default)]
    pub counterparty_account: Option<String>,
    #[serde(default)]
    pub transfer_direction: TransferDirection,
    #[serde(default)]
    pub source_file: String,
    #[serde(default)]
    pub source_account: String,
    /// Advisory data-quality annotation, never a processing failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityFlag>,
}

/// Flow of funds for one record. `Conflicting` marks the malformed case
/// where both amounts are strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowDirection {
    Outflow,
    Inflow,
    Zero,
    Conflicting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityFlag {
    /// Both debit and credit strictly positive on one record.
    ConflictingAmounts,
    /// Neither amount present at all.
    MissingAmounts,
}

impl fmt::Display for QualityFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityFlag::ConflictingAmounts => write!(f, "conflicting amounts"),
            QualityFlag::MissingAmounts => write!(f, "missing amounts"),
        }
    }
}

impl TransactionRecord {
    pub fn debit(&self) -> Decimal {
        self.debit_amount.unwrap_or(Decimal::ZERO)
    }

    pub fn credit(&self) -> Decimal {
        self.credit_amount.unwrap_or(Decimal::ZERO)
    }

    pub fn flow(&self) -> FlowDirection {
        let debit = self.debit() > Decimal::ZERO;
        let credit = self.credit() > Decimal::ZERO;
        match (debit, credit) {
            (true, true) => FlowDirection::Conflicting,
            (true, false) => FlowDirection::Outflow,
            (false, true) => FlowDirection::Inflow,
            (false, false) => FlowDirection::Zero,
        }
    }

    /// Purely outgoing: money left the account and nothing came in.
    pub fn is_outgoing(&self) -> bool {
        self.flow() == FlowDirection::Outflow
    }

    /// Purely incoming: money arrived and nothing left.
    pub fn is_incoming(&self) -> bool {
        self.flow() == FlowDirection::Inflow
    }

    pub fn quality_check(&self) -> Option<QualityFlag> {
        if self.flow() == FlowDirection::Conflicting {
            Some(QualityFlag::ConflictingAmounts)
        } else if self.debit_amount.is_none() && self.credit_amount.is_none() {
            Some(QualityFlag::MissingAmounts)
        } else {
            None
        }
    }

    /// Uppercased concatenation of all description fields; the classifier's
    /// and transfer detector's match text.
    pub fn match_text(&self) -> String {
        self.description_fields.join(" ").to_uppercase()
    }

    /// Wider text used for token mining: merchant forms first, then the
    /// description fields.
    pub fn mapping_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(self.description_fields.len() + 2);
        if !self.merchant_normalized.is_empty() {
            parts.push(&self.merchant_normalized);
        }
        if !self.merchant_raw.is_empty() {
            parts.push(&self.merchant_raw);
        }
        parts.extend(
            self.description_fields
                .iter()
                .map(String::as_str)
                .filter(|field| !field.trim().is_empty()),
        );
        parts.join(" ").to_uppercase()
    }

    /// Join key for merchant-level grouping; falls back to normalising the
    /// raw merchant when the derived field has not been populated yet.
    pub fn merchant_key(&self) -> String {
        if self.merchant_normalized.is_empty() {
            normalize_merchant(&self.merchant_raw)
        } else {
            self.merchant_normalized.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn record(debit: Option<i64>, credit: Option<i64>) -> TransactionRecord {
        TransactionRecord {
            id: "t1".to_string(),
            date: None,
            time: None,
            debit_amount: debit.map(Decimal::from),
            credit_amount: credit.map(Decimal::from),
            currency: "CHF".to_string(),
            description_fields: vec!["Coop Pronto".to_string(), "Zurich".to_string()],
            merchant_raw: "Coop Pronto".to_string(),
            merchant_normalized: String::new(),
            category: Category::default(),
            category_confidence: 0.0,
            category_rule: None,
            is_transfer: false,
            transfer_confidence: 0.0,
            counterparty_account: None,
            transfer_direction: TransferDirection::default(),
            source_file: String::new(),
            source_account: String::new(),
            quality: None,
        }
    }

    #[test]
    fn flow_direction_is_mutually_exclusive() {
        assert_eq!(record(Some(10), Some(0)).flow(), FlowDirection::Outflow);
        assert_eq!(record(Some(0), Some(10)).flow(), FlowDirection::Inflow);
        assert_eq!(record(Some(0), Some(0)).flow(), FlowDirection::Zero);
        assert_eq!(record(Some(5), Some(5)).flow(), FlowDirection::Conflicting);
    }

    #[test]
    fn conflicting_amounts_are_flagged_not_fatal() {
        let rec = record(Some(5), Some(5));
        assert_eq!(rec.quality_check(), Some(QualityFlag::ConflictingAmounts));
        assert!(!rec.is_outgoing());
        assert!(!rec.is_incoming());
    }

    #[test]
    fn missing_both_amounts_is_flagged() {
        assert_eq!(
            record(None, None).quality_check(),
            Some(QualityFlag::MissingAmounts)
        );
    }

    #[test]
    fn explicit_zero_is_not_a_quality_defect() {
        assert_eq!(record(Some(0), Some(0)).quality_check(), None);
        assert_eq!(record(Some(0), None).quality_check(), None);
    }

    #[test]
    fn match_text_uppercases_descriptions() {
        let text = record(Some(10), None).match_text();
        assert_eq!(text, "COOP PRONTO ZURICH");
    }

    #[test]
    fn merchant_key_falls_back_to_raw_name() {
        let mut rec = record(Some(10), None);
        assert_eq!(rec.merchant_key(), "COOP PRONTO");
        rec.merchant_normalized = "COOP".to_string();
        assert_eq!(rec.merchant_key(), "COOP");
    }

    #[test]
    fn serde_uses_camel_case_field_names() {
        let rec = record(Some(10), None);
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains("\"debitAmount\""));
        assert!(json.contains("\"merchantRaw\""));
        assert!(json.contains("\"transferDirection\":\"N/A\""));
        let back: TransactionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.debit(), Decimal::from(10));
    }
}
