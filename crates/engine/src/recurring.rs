use chrono::{Duration, NaiveDate};
use ledgerlens_core::TransactionRecord;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::stats;

pub const DEFAULT_MIN_OCCURRENCES: usize = 3;
/// Monthly-cadence acceptance window for the median day interval.
pub const CADENCE_MIN_DAYS: f64 = 20.0;
pub const CADENCE_MAX_DAYS: f64 = 40.0;

/// A merchant that charges (or pays) on a regular monthly-like cadence.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurringCandidate {
    pub merchant: String,
    pub occurrences: usize,
    /// Median day interval between consecutive occurrences.
    pub cadence_days: f64,
    /// Average of the non-zero debit amounts.
    pub avg_spend: Decimal,
    /// Average of the non-zero credit amounts.
    pub avg_earn: Decimal,
    pub last_seen: NaiveDate,
    pub expected_next: NaiveDate,
    /// 1 at a perfect 30-day cadence, fading to 0 at the window edges.
    pub confidence: f64,
}

/// Detect merchants with at least `min_occurrences` dated records whose
/// median interval falls inside the monthly window. Sorted by confidence,
/// then occurrence count, then average spend, descending.
pub fn find_recurring(
    records: &[TransactionRecord],
    min_occurrences: usize,
) -> Vec<RecurringCandidate> {
    let mut by_merchant: BTreeMap<String, Vec<&TransactionRecord>> = BTreeMap::new();
    for rec in records {
        if rec.date.is_none() {
            continue;
        }
        let merchant = rec.merchant_key();
        if merchant.is_empty() {
            continue;
        }
        by_merchant.entry(merchant).or_default().push(rec);
    }

    let mut candidates = Vec::new();
    for (merchant, mut group) in by_merchant {
        if group.len() < min_occurrences {
            continue;
        }
        group.sort_by_key(|r| r.date);
        let dates: Vec<NaiveDate> = group.iter().filter_map(|r| r.date).collect();

        let intervals: Vec<f64> = dates
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).num_days() as f64)
            .collect();
        if intervals.is_empty() {
            continue;
        }
        let cadence = stats::median(&intervals);
        if !(CADENCE_MIN_DAYS..=CADENCE_MAX_DAYS).contains(&cadence) {
            continue;
        }

        let confidence = (1.0 - ((cadence - 30.0).abs() / 20.0).min(1.0)).clamp(0.0, 1.0);
        let last_seen = dates[dates.len() - 1];
        let expected_next = last_seen + Duration::days(cadence.round() as i64);

        candidates.push(RecurringCandidate {
            merchant,
            occurrences: group.len(),
            cadence_days: cadence,
            avg_spend: average_non_zero(group.iter().map(|r| r.debit())),
            avg_earn: average_non_zero(group.iter().map(|r| r.credit())),
            last_seen,
            expected_next,
            confidence,
        });
    }

    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.occurrences.cmp(&a.occurrences))
            .then_with(|| b.avg_spend.cmp(&a.avg_spend))
            .then_with(|| a.merchant.cmp(&b.merchant))
    });
    tracing::debug!(candidates = candidates.len(), "recurring scan complete");
    candidates
}

fn average_non_zero(amounts: impl Iterator<Item = Decimal>) -> Decimal {
    let non_zero: Vec<Decimal> = amounts.filter(|a| *a > Decimal::ZERO).collect();
    if non_zero.is_empty() {
        return Decimal::ZERO;
    }
    let total: Decimal = non_zero.iter().copied().sum();
    (total / Decimal::from(non_zero.len())).round_dp(2)
}
