/// Alias table applied after whitespace collapse and `PENDING` removal.
/// Longer variants must come before their prefixes.
const MERCHANT_ALIASES: &[(&str, &str)] = &[
    ("UBER * EATS", "UBER EATS"),
    ("UBER *ONE MEMBERSHIP", "UBER ONE"),
    ("UBER *ONE", "UBER ONE"),
];

/// Canonical merchant form used as the join key for merchant-level rules:
/// uppercased, whitespace collapsed, `PENDING` markers stripped, a small
/// alias table resolved.
pub fn normalize_merchant(value: &str) -> String {
    let upper = value.to_uppercase();
    let collapsed = upper
        .split_whitespace()
        .filter(|word| *word != "PENDING")
        .collect::<Vec<_>>()
        .join(" ");
    for (alias, canonical) in MERCHANT_ALIASES {
        if collapsed.contains(alias) {
            return (*canonical).to_string();
        }
    }
    collapsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uppercases_and_collapses_whitespace() {
        assert_eq!(normalize_merchant("  coop   pronto "), "COOP PRONTO");
    }

    #[test]
    fn strips_pending_marker() {
        assert_eq!(normalize_merchant("Starbucks Pending"), "STARBUCKS");
    }

    #[test]
    fn resolves_card_processor_aliases() {
        assert_eq!(normalize_merchant("UBER   * EATS"), "UBER EATS");
        assert_eq!(normalize_merchant("UBER *ONE MEMBERSHIP"), "UBER ONE");
        assert_eq!(normalize_merchant("Uber * Eats Pending"), "UBER EATS");
    }

    #[test]
    fn plain_names_pass_through() {
        assert_eq!(normalize_merchant("SWISSCOM"), "SWISSCOM");
    }
}
