use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Which mechanism assigned a record's category.
///
/// Serialised as a compact tag string (`"Keyword:UBER EATS"`,
/// `"PatternRule:COOP"`, `"ManualOverride"`, ...) so the label survives
/// export round-trips and stays human-readable in review output. The tag is
/// also the training-set filter for the rule learner, which only trusts
/// `ManualOverride` labels by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleProvenance {
    /// Matched a keyword from the caller-supplied table.
    Keyword(String),
    /// Matched a fixed cash-withdrawal phrase.
    CashWithdrawal,
    /// Matched a fixed interest-settlement / foreign-fee phrase.
    FeePhrase,
    /// Matched the fixed transfer keyword list.
    TransferKeyword(String),
    /// Incoming record matched the income keyword list.
    IncomeKeyword(String),
    /// No keyword hit; label derived from flow direction alone.
    FlowFallback,
    /// Relabelled by the flow-consistency correction pass.
    FlowCorrection,
    /// Merchant-level rule from the rule store.
    MerchantRule,
    /// Learned token rule from the rule store; carries the matched token.
    PatternRule(String),
    /// Majority vote among high-confidence records of the same merchant.
    MerchantHistory,
    /// High-confidence transfer signal promoted the record to Transfers.
    TransferSignal,
    /// Direct per-record human correction.
    ManualOverride,
}

#[derive(Debug, Error)]
#[error("unknown rule provenance tag: '{0}'")]
pub struct ProvenanceParseError(String);

impl fmt::Display for RuleProvenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleProvenance::Keyword(kw) => write!(f, "Keyword:{kw}"),
            RuleProvenance::CashWithdrawal => write!(f, "CashWithdrawal"),
            RuleProvenance::FeePhrase => write!(f, "FeePhrase"),
            RuleProvenance::TransferKeyword(kw) => write!(f, "TransferKeyword:{kw}"),
            RuleProvenance::IncomeKeyword(kw) => write!(f, "IncomeKeyword:{kw}"),
            RuleProvenance::FlowFallback => write!(f, "FlowFallback"),
            RuleProvenance::FlowCorrection => write!(f, "FlowCorrection"),
            RuleProvenance::MerchantRule => write!(f, "MerchantRule"),
            RuleProvenance::PatternRule(token) => write!(f, "PatternRule:{token}"),
            RuleProvenance::MerchantHistory => write!(f, "MerchantHistory"),
            RuleProvenance::TransferSignal => write!(f, "TransferSignal"),
            RuleProvenance::ManualOverride => write!(f, "ManualOverride"),
        }
    }
}

impl FromStr for RuleProvenance {
    type Err = ProvenanceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tag, arg) = match s.split_once(':') {
            Some((tag, arg)) => (tag, arg),
            None => (s, ""),
        };
        match tag {
            "Keyword" if !arg.is_empty() => Ok(RuleProvenance::Keyword(arg.to_string())),
            "CashWithdrawal" => Ok(RuleProvenance::CashWithdrawal),
            "FeePhrase" => Ok(RuleProvenance::FeePhrase),
            "TransferKeyword" if !arg.is_empty() => {
                Ok(RuleProvenance::TransferKeyword(arg.to_string()))
            }
            "IncomeKeyword" if !arg.is_empty() => {
                Ok(RuleProvenance::IncomeKeyword(arg.to_string()))
            }
            "FlowFallback" => Ok(RuleProvenance::FlowFallback),
            "FlowCorrection" => Ok(RuleProvenance::FlowCorrection),
            "MerchantRule" => Ok(RuleProvenance::MerchantRule),
            "PatternRule" if !arg.is_empty() => Ok(RuleProvenance::PatternRule(arg.to_string())),
            "MerchantHistory" => Ok(RuleProvenance::MerchantHistory),
            "TransferSignal" => Ok(RuleProvenance::TransferSignal),
            "ManualOverride" => Ok(RuleProvenance::ManualOverride),
            _ => Err(ProvenanceParseError(s.to_string())),
        }
    }
}

impl Serialize for RuleProvenance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RuleProvenance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        tag.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_round_trip() {
        let cases = [
            RuleProvenance::Keyword("UBER EATS".to_string()),
            RuleProvenance::CashWithdrawal,
            RuleProvenance::PatternRule("COOP".to_string()),
            RuleProvenance::FlowCorrection,
            RuleProvenance::ManualOverride,
        ];
        for case in cases {
            let tag = case.to_string();
            assert_eq!(tag.parse::<RuleProvenance>().unwrap(), case);
        }
    }

    #[test]
    fn unknown_tag_is_an_error() {
        assert!("Banana".parse::<RuleProvenance>().is_err());
        assert!("Keyword:".parse::<RuleProvenance>().is_err());
    }

    #[test]
    fn pattern_rule_tag_embeds_token() {
        let p = RuleProvenance::PatternRule("MIGROS".to_string());
        assert_eq!(p.to_string(), "PatternRule:MIGROS");
    }
}
