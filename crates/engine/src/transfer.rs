use ledgerlens_core::{normalize_merchant, TransactionRecord, TransferDirection};
use regex::Regex;
use std::sync::OnceLock;

/// Fixed keyword list shared with the classifier's transfer pre-check.
pub const TRANSFER_KEYWORDS: &[&str] = &[
    "TRANSFER",
    "UEBERTRAG",
    "ÜBERTRAG",
    "EIGENKONTO",
    "KONTOUEBERTRAG",
    "ACCOUNT TRANSFER",
    "REVOLUT",
    "IBAN",
];

pub const TRANSFER_BASE_CONFIDENCE: f64 = 0.15;
pub const TRANSFER_KEYWORD_STEP: f64 = 0.10;
pub const TRANSFER_KEYWORD_CAP: f64 = 0.45;
pub const TRANSFER_COUNTERPARTY_BONUS: f64 = 0.35;
pub const TRANSFER_CONFIDENCE_CAP: f64 = 0.99;
/// Above this the record is flagged as a transfer.
pub const TRANSFER_FLAG_THRESHOLD: f64 = 0.5;
/// Stricter bar for letting the transfer signal overwrite a category
/// downstream in the rule-application chain.
pub const TRANSFER_CATEGORY_THRESHOLD: f64 = 0.7;

fn iban_pattern() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| {
        Regex::new(r"\b[A-Z]{2}\d{2}(?:\s?[A-Z0-9]{4}){3,8}\b").expect("invalid regex")
    })
}

fn local_account_pattern() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"\b\d{4}\s\d{8}\.\d{2}\b").expect("invalid regex"))
}

/// Derived transfer fields for one record.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferSignal {
    pub counterparty_account: Option<String>,
    pub is_transfer: bool,
    pub confidence: f64,
    pub direction: TransferDirection,
}

#[derive(Debug, Default)]
pub struct TransferDetector;

impl TransferDetector {
    pub fn new() -> Self {
        Self
    }

    /// Scan the description text for account identifiers and transfer
    /// keywords. Independent of the classifier; category promotion happens
    /// downstream behind `TRANSFER_CATEGORY_THRESHOLD`.
    pub fn detect(&self, rec: &TransactionRecord) -> TransferSignal {
        let text = rec.match_text();

        let counterparty = iban_pattern()
            .find(&text)
            .or_else(|| local_account_pattern().find(&text))
            .map(|m| m.as_str().to_string());

        let keyword_hits = TRANSFER_KEYWORDS
            .iter()
            .filter(|kw| text.contains(*kw))
            .count();

        let mut confidence = TRANSFER_BASE_CONFIDENCE;
        if keyword_hits > 0 {
            confidence += (TRANSFER_KEYWORD_STEP * keyword_hits as f64).min(TRANSFER_KEYWORD_CAP);
        }
        if counterparty.is_some() {
            confidence += TRANSFER_COUNTERPARTY_BONUS;
        }
        let confidence = round2(confidence.min(TRANSFER_CONFIDENCE_CAP));

        let is_transfer = confidence >= TRANSFER_FLAG_THRESHOLD;
        let direction = if !is_transfer {
            TransferDirection::NotApplicable
        } else if rec.is_outgoing() {
            TransferDirection::Out
        } else if rec.is_incoming() {
            TransferDirection::In
        } else {
            TransferDirection::Unknown
        };

        TransferSignal {
            counterparty_account: counterparty,
            is_transfer,
            confidence,
            direction,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Populate transfer fields on a whole collection, along with the normalized
/// merchant key and a default source account.
pub fn detect_transfers(mut records: Vec<TransactionRecord>) -> Vec<TransactionRecord> {
    let detector = TransferDetector::new();
    for rec in &mut records {
        rec.merchant_normalized = normalize_merchant(&rec.merchant_raw);
        if rec.source_account.trim().is_empty() {
            rec.source_account = "Unknown".to_string();
        }
        let signal = detector.detect(rec);
        rec.counterparty_account = signal.counterparty_account;
        rec.is_transfer = signal.is_transfer;
        rec.transfer_confidence = signal.confidence;
        rec.transfer_direction = signal.direction;
    }
    records
}
