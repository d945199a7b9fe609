use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{CodeFamily, DocumentContext, FinancialYearId, LocationId};

/// A persisted document or master-data row as seen by the allocator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedRecord {
    /// Identity assigned by the store on insert.
    pub id: u64,
    pub family: CodeFamily,
    pub code: String,
    pub location: Option<LocationId>,
    pub financial_year: Option<FinancialYearId>,
    pub created_at: NaiveDateTime,
}

/// Row handed to the store's write path once the caller has a code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    pub family: CodeFamily,
    pub code: String,
    pub location: Option<LocationId>,
    pub financial_year: Option<FinancialYearId>,
    pub created_at: NaiveDateTime,
}

impl NewRecord {
    pub fn new(
        family: CodeFamily,
        code: impl Into<String>,
        doc: &DocumentContext,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            family,
            code: code.into(),
            location: doc.location,
            financial_year: doc.financial_year,
            created_at,
        }
    }

    pub fn into_issued(self, id: u64) -> IssuedRecord {
        IssuedRecord {
            id,
            family: self.family,
            code: self.code,
            location: self.location,
            financial_year: self.financial_year,
            created_at: self.created_at,
        }
    }
}
