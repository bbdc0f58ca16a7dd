use ledgerlens_core::TransactionRecord;
use ledgerlens_store::RuleStore;

use crate::apply::{apply_rules, DEFAULT_LOW_CONFIDENCE_THRESHOLD};
use crate::classify::classify_records;
use crate::keyword_table::KeywordTable;
use crate::transfer::detect_transfers;

pub const DEFAULT_REVIEW_CONFIDENCE: f64 = 0.65;

/// One full labeling pass: transfer detection, classification (with flow
/// correction), then rule-store application ending in manual overrides.
///
/// Transfer detection runs first so the flow-consistency correction can
/// honor its transfer exemption. The pass is a pure function of the inputs:
/// rerunning it over its own output changes nothing.
pub fn run_pipeline(
    records: Vec<TransactionRecord>,
    table: &KeywordTable,
    store: &RuleStore,
) -> Vec<TransactionRecord> {
    let records = detect_transfers(records);
    let records = classify_records(records, table);
    let records = apply_rules(records, store, DEFAULT_LOW_CONFIDENCE_THRESHOLD);
    tracing::info!(records = records.len(), "labeling pass complete");
    records
}

/// Records that deserve a human look: unresolved category, shaky
/// confidence, or transfer-flagged. Most recent first.
pub fn review_queue(
    records: &[TransactionRecord],
    min_confidence: f64,
) -> Vec<&TransactionRecord> {
    let mut queue: Vec<&TransactionRecord> = records
        .iter()
        .filter(|r| {
            r.category.is_other() || r.category_confidence < min_confidence || r.is_transfer
        })
        .collect();
    queue.sort_by(|a, b| (&b.date, &b.time).cmp(&(&a.date, &a.time)));
    queue
}
