pub mod category;
pub mod merchant;
pub mod provenance;
pub mod record;

pub use category::{Category, TransferDirection};
pub use merchant::normalize_merchant;
pub use provenance::{ProvenanceParseError, RuleProvenance};
pub use record::{FlowDirection, QualityFlag, TransactionRecord};
