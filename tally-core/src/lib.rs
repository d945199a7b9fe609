//! Domain vocabulary shared by the Tally crates.

pub mod code;
mod family;
mod ids;
mod record;
mod scope;

pub use code::{format_code, ParsedCode, SequenceStart};
pub use family::{
    CodeFamily, FamilyConfig, Recency, Scoping, LEDGER_WIDTH, PRODUCT_WIDTH,
    STOCK_ADJUSTMENT_PREFIX_KEY, TRANSACTION_WIDTH,
};
pub use ids::{FinancialYearId, LocationId};
pub use record::{IssuedRecord, NewRecord};
pub use scope::{DocumentContext, ScopeKey, ScopeQuery};
