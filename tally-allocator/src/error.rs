use std::fmt;

use tally_core::{CodeFamily, FinancialYearId, LocationId, STOCK_ADJUSTMENT_PREFIX_KEY};
use tally_store::StoreError;
use thiserror::Error;

/// Result alias for allocation operations.
pub type AllocationResult<T> = Result<T, AllocationError>;

/// What a code is being minted for: a numbered family or an ad-hoc stock adjustment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CodeKind {
    Family(CodeFamily),
    StockAdjustment,
}

impl CodeKind {
    pub fn prefix_key(self) -> &'static str {
        match self {
            CodeKind::Family(family) => family.config().prefix_key,
            CodeKind::StockAdjustment => STOCK_ADJUSTMENT_PREFIX_KEY,
        }
    }
}

impl From<CodeFamily> for CodeKind {
    fn from(value: CodeFamily) -> Self {
        CodeKind::Family(value)
    }
}

impl fmt::Display for CodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeKind::Family(family) => fmt::Display::fmt(family, f),
            CodeKind::StockAdjustment => f.write_str("stock_adjustment"),
        }
    }
}

/// Error type surfaced by the code allocator.
#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("no prefix configured for {kind} (settings key '{key}')")]
    MissingPrefix { kind: CodeKind, key: &'static str },
    #[error("{kind} document has no {field} reference")]
    MissingReference { kind: CodeKind, field: &'static str },
    #[error("unknown location {0}")]
    UnknownLocation(LocationId),
    #[error("unknown financial year {0}")]
    UnknownFinancialYear(FinancialYearId),
    #[error("no free {family} code after {attempts} probes (last candidate {last_candidate})")]
    RetriesExhausted {
        family: CodeFamily,
        attempts: u32,
        last_candidate: String,
    },
    #[error("requested {requested} {family} codes in one batch (limit {limit})")]
    BatchTooLarge {
        family: CodeFamily,
        requested: usize,
        limit: usize,
    },
    #[error("{family} sequence under prefix '{prefix}' overflowed")]
    SequenceOverflow { family: CodeFamily, prefix: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}
