//! Persisted rule state: per-record overrides, merchant-level rules, and
//! learned token rules.
//!
//! The store is an explicit value passed into the pipeline, loaded at session
//! start and saved on demand. The on-disk format is a JSON document with
//! exactly three string-to-string tables; `BTreeMap` keys plus two-space
//! pretty printing make save→load→save byte-stable.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid rule store document: {0}")]
    ParseError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleStore {
    /// recordId → category name. Highest precedence: a direct human
    /// correction of one specific record.
    #[serde(default)]
    pub category_overrides: BTreeMap<String, String>,
    /// normalized merchant → category name. Human-confirmed, applies to all
    /// records sharing that merchant.
    #[serde(default)]
    pub merchant_category_rules: BTreeMap<String, String>,
    /// learned token → category name, mined from labeled evidence.
    #[serde(default)]
    pub pattern_category_rules: BTreeMap<String, String>,
}

impl RuleStore {
    /// Load a store from `path`. A missing file yields an empty store; any
    /// other failure is propagated so the caller can keep its in-memory
    /// rules instead of silently starting fresh.
    pub fn load(path: impl AsRef<Path>) -> Result<RuleStore, StoreError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "rule store missing, starting empty");
            return Ok(RuleStore::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let store: RuleStore = serde_json::from_str(&raw)?;
        Ok(store.normalized())
    }

    /// Save to `path`, creating parent directories, and return the path
    /// written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<PathBuf, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut doc = serde_json::to_string_pretty(&self.clone().normalized())?;
        doc.push('\n');
        std::fs::write(path, doc)?;
        tracing::info!(
            path = %path.display(),
            overrides = self.category_overrides.len(),
            merchant_rules = self.merchant_category_rules.len(),
            pattern_rules = self.pattern_category_rules.len(),
            "rule store saved"
        );
        Ok(path.to_path_buf())
    }

    /// Drop blank keys/values and canonicalise merchant and token keys to
    /// uppercase. Keys within each table stay unique; last write wins.
    fn normalized(self) -> RuleStore {
        RuleStore {
            category_overrides: normalize_table(self.category_overrides, false),
            merchant_category_rules: normalize_table(self.merchant_category_rules, true),
            pattern_category_rules: normalize_table(self.pattern_category_rules, true),
        }
    }

    pub fn set_override(&mut self, record_id: &str, category: &str) {
        insert_trimmed(&mut self.category_overrides, record_id, category, false);
    }

    pub fn set_merchant_rule(&mut self, merchant_normalized: &str, category: &str) {
        insert_trimmed(
            &mut self.merchant_category_rules,
            merchant_normalized,
            category,
            true,
        );
    }

    pub fn set_pattern_rule(&mut self, token: &str, category: &str) {
        insert_trimmed(&mut self.pattern_category_rules, token, category, true);
    }

    /// Merge learned `(token, category)` pairs into the pattern table.
    /// Last write wins on token collisions. Returns how many entries were
    /// inserted or replaced.
    pub fn merge_pattern_rules<I, K, V>(&mut self, rules: I) -> usize
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut merged = 0;
        for (token, category) in rules {
            let token = token.as_ref().trim().to_uppercase();
            let category = category.as_ref().trim().to_string();
            if token.is_empty() || category.is_empty() {
                continue;
            }
            self.pattern_category_rules.insert(token, category);
            merged += 1;
        }
        merged
    }

    pub fn is_empty(&self) -> bool {
        self.category_overrides.is_empty()
            && self.merchant_category_rules.is_empty()
            && self.pattern_category_rules.is_empty()
    }
}

fn normalize_table(table: BTreeMap<String, String>, uppercase_keys: bool) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for (key, value) in table {
        insert_trimmed(&mut out, &key, &value, uppercase_keys);
    }
    out
}

fn insert_trimmed(
    table: &mut BTreeMap<String, String>,
    key: &str,
    value: &str,
    uppercase_key: bool,
) {
    let key = key.trim();
    let value = value.trim();
    if key.is_empty() || value.is_empty() {
        return;
    }
    let key = if uppercase_key {
        key.to_uppercase()
    } else {
        key.to_string()
    };
    table.insert(key, value.to_string());
}
