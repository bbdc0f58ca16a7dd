use ledgerlens_core::{Category, TransactionRecord};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::stats;

pub const DEFAULT_ANOMALY_THRESHOLD: f64 = 2.5;

/// One flagged outflow, with a human-readable reason for review output.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyFlag {
    pub record_id: String,
    pub merchant: String,
    pub category: Category,
    pub amount: Decimal,
    pub score: f64,
    pub reason: String,
}

/// Flag outflows whose amount is statistically unusual against the record's
/// category and merchant history.
///
/// The score is `max(|catZ|, |merchZ|)` over sample-deviation z-scores; a
/// group with fewer than two members or zero spread contributes no component,
/// so zero-variance history can never produce a false flag (and never a
/// division by zero). Output is sorted by score descending.
pub fn detect_anomalies(records: &[TransactionRecord], threshold: f64) -> Vec<AnomalyFlag> {
    let spend: Vec<&TransactionRecord> = records
        .iter()
        .filter(|r| r.debit() > Decimal::ZERO)
        .collect();
    if spend.is_empty() {
        return Vec::new();
    }

    let mut by_category: BTreeMap<&Category, Vec<f64>> = BTreeMap::new();
    let mut by_merchant: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for rec in &spend {
        let amount = rec.debit().to_f64().unwrap_or(0.0);
        by_category.entry(&rec.category).or_default().push(amount);
        by_merchant.entry(rec.merchant_key()).or_default().push(amount);
    }

    let cat_stats: BTreeMap<&Category, (f64, Option<f64>)> = by_category
        .into_iter()
        .map(|(cat, v)| (cat, (stats::mean(&v), stats::sample_std(&v))))
        .collect();
    let merch_stats: BTreeMap<String, (f64, Option<f64>)> = by_merchant
        .into_iter()
        .map(|(m, v)| (m, (stats::mean(&v), stats::sample_std(&v))))
        .collect();

    let mut flagged = Vec::new();
    for rec in &spend {
        let amount = rec.debit().to_f64().unwrap_or(0.0);
        let cat_z = z_component(amount, cat_stats.get(&rec.category));
        let merch_z = z_component(amount, merch_stats.get(&rec.merchant_key()));
        let score = cat_z.abs().max(merch_z.abs());
        if score >= threshold {
            flagged.push(AnomalyFlag {
                record_id: rec.id.clone(),
                merchant: rec.merchant_key(),
                category: rec.category.clone(),
                amount: rec.debit(),
                score,
                reason: format!("High spend vs baseline (score {score:.2})"),
            });
        }
    }

    flagged.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.record_id.cmp(&b.record_id))
    });
    tracing::debug!(flagged = flagged.len(), threshold, "anomaly scan complete");
    flagged
}

/// Missing or degenerate group statistics contribute a zero component.
fn z_component(amount: f64, group: Option<&(f64, Option<f64>)>) -> f64 {
    match group {
        Some((mean, Some(std))) if *std > 0.0 => (amount - mean) / std,
        _ => 0.0,
    }
}
