use ledgerlens_core::Category;
use serde::Deserialize;
use thiserror::Error;

/// Ordered category → keyword-list table driving the classifier.
///
/// Table order is the tie-break policy: the first category whose keyword list
/// matches wins, so callers control prioritisation by ordering entries. The
/// TOML form is an array of tables for the same reason — order is explicit,
/// not an accident of map iteration.
#[derive(Debug, Clone)]
pub struct KeywordTable {
    entries: Vec<(Category, Vec<String>)>,
}

#[derive(Error, Debug)]
pub enum KeywordTableError {
    #[error("Failed to parse keyword table: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Keyword table has no categories")]
    Empty,
}

#[derive(Deserialize)]
struct TableFile {
    #[serde(default)]
    category: Vec<TableEntry>,
}

#[derive(Deserialize)]
struct TableEntry {
    name: String,
    keywords: Vec<String>,
}

impl KeywordTable {
    /// Build a table from `(category name, keywords)` pairs. Keywords are
    /// uppercased; blank keywords are dropped.
    pub fn new<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<K>)>,
        K: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .map(|(name, keywords)| {
                let keywords = keywords
                    .iter()
                    .map(|kw| kw.as_ref().trim().to_uppercase())
                    .filter(|kw| !kw.is_empty())
                    .collect();
                (Category::parse(name.as_ref()), keywords)
            })
            .collect();
        Self { entries }
    }

    /// Parse a TOML document of `[[category]]` tables:
    ///
    /// ```toml
    /// [[category]]
    /// name = "Food & Drink"
    /// keywords = ["UBER EATS", "COOP"]
    /// ```
    pub fn from_toml(toml_content: &str) -> Result<Self, KeywordTableError> {
        let file: TableFile = toml::from_str(toml_content)?;
        if file.category.is_empty() {
            return Err(KeywordTableError::Empty);
        }
        Ok(Self::new(
            file.category
                .into_iter()
                .map(|entry| (entry.name, entry.keywords)),
        ))
    }

    pub fn entries(&self) -> &[(Category, Vec<String>)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Built-in Swiss-statement keyword table; the app's fallback when the caller
/// supplies none.
const DEFAULT_TABLE: &[(&str, &[&str])] = &[
    (
        "Food & Drink",
        &[
            "UBER EATS", "RESTAURANT", "SUSHI", "COOP", "SPAR", "METZGEREI", "CONFISERIE",
            "PIZZA", "STARBUCKS", "CAFE", "MCDON", "GOURMET", "BAECKEREI",
        ],
    ),
    (
        "Transport",
        &[
            "UBER", "TAXI", "SBB", "TANKSTELLE", "PARKING", "PARK", "AGROLA", "SOCAR", "ENI",
            "CAR",
        ],
    ),
    (
        "Utilities & Bills",
        &[
            "SWISSCOM", "POST", "E-BANKING", "ELECTRIC", "POWER", "INSURANCE", "KANTON",
            "STEUER", "FEDEX",
        ],
    ),
    (
        "Shopping & Retail",
        &["ZARA", "H&M", "STORE", "SHOP", "LEVIS", "MIGROS", "GALAXUS"],
    ),
    (
        "Income & Transfers",
        &["BANK", "REVOLUT", "TRANSFER", "UBS SWITZERLAND"],
    ),
    (
        "Entertainment & Leisure",
        &[
            "NETFLIX", "SPOTIFY", "APPLE.COM", "GYM", "SPA", "ART", "MUSEUM", "CINEMA", "BILL",
        ],
    ),
];

impl Default for KeywordTable {
    fn default() -> Self {
        Self::new(
            DEFAULT_TABLE
                .iter()
                .map(|(name, keywords)| (*name, keywords.to_vec())),
        )
    }
}
