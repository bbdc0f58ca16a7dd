use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Display name of the no-confident-match sentinel.
pub const OTHER: &str = "Other";
/// Display name of the internal-movement sentinel.
pub const TRANSFERS: &str = "Transfers";
/// Display name of the inflow category, treated specially by the flow rules.
pub const INCOME: &str = "Income & Transfers";

/// A spending/income category.
///
/// The two sentinels (`Other`, `Transfers`) and the direction-sensitive
/// `Income` variant are closed so the flow-consistency and precedence rules
/// can match on them exhaustively; everything else is a caller-defined name
/// carried in `Named`. `Named` never holds one of the reserved display names:
/// `Category::parse` folds those back into their variants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Other,
    Transfers,
    Income,
    Named(String),
}

impl Category {
    pub fn parse(name: &str) -> Category {
        match name.trim() {
            "" | OTHER => Category::Other,
            TRANSFERS => Category::Transfers,
            INCOME => Category::Income,
            other => Category::Named(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Category::Other => OTHER,
            Category::Transfers => TRANSFERS,
            Category::Income => INCOME,
            Category::Named(name) => name,
        }
    }

    pub fn is_other(&self) -> bool {
        matches!(self, Category::Other)
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Other
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&str> for Category {
    fn from(name: &str) -> Self {
        Category::parse(name)
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Category::parse(&name))
    }
}

/// Direction of an internal transfer, `NotApplicable` when the record is not
/// transfer-flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferDirection {
    Out,
    In,
    Unknown,
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl Default for TransferDirection {
    fn default() -> Self {
        TransferDirection::NotApplicable
    }
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferDirection::Out => write!(f, "Out"),
            TransferDirection::In => write!(f, "In"),
            TransferDirection::Unknown => write!(f, "Unknown"),
            TransferDirection::NotApplicable => write!(f, "N/A"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_folds_reserved_names_into_variants() {
        assert_eq!(Category::parse("Other"), Category::Other);
        assert_eq!(Category::parse("Transfers"), Category::Transfers);
        assert_eq!(Category::parse("Income & Transfers"), Category::Income);
        assert_eq!(
            Category::parse("Food & Drink"),
            Category::Named("Food & Drink".to_string())
        );
    }

    #[test]
    fn parse_treats_blank_as_other() {
        assert_eq!(Category::parse(""), Category::Other);
        assert_eq!(Category::parse("   "), Category::Other);
    }

    #[test]
    fn name_round_trips() {
        for name in ["Other", "Transfers", "Income & Transfers", "Groceries"] {
            assert_eq!(Category::parse(name).name(), name);
        }
    }

    #[test]
    fn serializes_as_display_name() {
        let json = serde_json::to_string(&Category::Income).unwrap();
        assert_eq!(json, "\"Income & Transfers\"");
        let back: Category = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Category::Income);
    }

    #[test]
    fn transfer_direction_display() {
        assert_eq!(TransferDirection::NotApplicable.to_string(), "N/A");
        assert_eq!(TransferDirection::Out.to_string(), "Out");
    }
}
