//! Transaction intelligence: classification, transfer/duplicate/anomaly/
//! recurring detection, rule learning, and rule application.
//!
//! Every operation here is a synchronous batch transform over an in-memory
//! record collection. Given the same records, keyword table, and rule store
//! snapshot, every function produces identical output; derived fields may be
//! recomputed any number of times.

pub mod anomaly;
pub mod apply;
pub mod classify;
pub mod duplicate;
pub mod keyword_table;
pub mod learn;
pub mod pipeline;
pub mod recurring;
pub mod transfer;
pub(crate) mod stats;

pub use anomaly::{detect_anomalies, AnomalyFlag, DEFAULT_ANOMALY_THRESHOLD};
pub use apply::{apply_rules, DEFAULT_LOW_CONFIDENCE_THRESHOLD};
pub use classify::{classify_records, correct_flow, Classification, Classifier};
pub use duplicate::{find_duplicates, DuplicateCluster, DuplicateKey};
pub use keyword_table::{KeywordTable, KeywordTableError};
pub use learn::{
    learn_rules, tokenize_mapping_text, trusted_training_set, PatternRule,
    DEFAULT_MIN_EXAMPLES, DEFAULT_MIN_PRECISION,
};
pub use pipeline::{review_queue, run_pipeline, DEFAULT_REVIEW_CONFIDENCE};
pub use recurring::{find_recurring, RecurringCandidate, DEFAULT_MIN_OCCURRENCES};
pub use transfer::{detect_transfers, TransferDetector, TransferSignal};
