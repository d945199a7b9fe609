use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{CodeFamily, FinancialYearId, LocationId, Recency, Scoping};

/// References carried by a partially populated document before it is saved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentContext {
    pub location: Option<LocationId>,
    pub financial_year: Option<FinancialYearId>,
}

impl DocumentContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(location: LocationId, financial_year: FinancialYearId) -> Self {
        Self {
            location: Some(location),
            financial_year: Some(financial_year),
        }
    }

    pub fn with_location(mut self, location: LocationId) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_financial_year(mut self, financial_year: FinancialYearId) -> Self {
        self.financial_year = Some(financial_year);
        self
    }
}

/// Resolved prefix components of a numbering partition.
///
/// Master-data families carry neither a location prefix nor a year number.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeKey {
    pub location_prefix: Option<String>,
    pub financial_year_number: Option<u32>,
    pub type_prefix: String,
}

impl ScopeKey {
    pub fn global(type_prefix: impl Into<String>) -> Self {
        Self {
            location_prefix: None,
            financial_year_number: None,
            type_prefix: type_prefix.into(),
        }
    }

    pub fn scoped(
        location_prefix: impl Into<String>,
        financial_year_number: u32,
        type_prefix: impl Into<String>,
    ) -> Self {
        Self {
            location_prefix: Some(location_prefix.into()),
            financial_year_number: Some(financial_year_number),
            type_prefix: type_prefix.into(),
        }
    }

    /// Key under which allocations of `family` sharing this prefix are serialized.
    pub fn lock_key(&self, family: CodeFamily) -> String {
        format!("{family}/{}", self.prefix())
    }

    /// `location ‖ year ‖ type`, skipping absent components.
    pub fn prefix(&self) -> String {
        let mut out = String::new();
        if let Some(location) = &self.location_prefix {
            out.push_str(location);
        }
        if let Some(year) = self.financial_year_number {
            out.push_str(&year.to_string());
        }
        out.push_str(&self.type_prefix);
        out
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix())
    }
}

/// Filter handed to the store when looking up the most recent record of a scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScopeQuery {
    pub family: CodeFamily,
    pub location: Option<LocationId>,
    pub financial_year: Option<FinancialYearId>,
    pub recency: Recency,
}

impl ScopeQuery {
    /// Builds the filter for `family` from the document's references.
    ///
    /// References the family's scoping does not use are dropped.
    pub fn for_document(family: CodeFamily, doc: &DocumentContext) -> Self {
        let config = family.config();
        let (location, financial_year) = match config.scoping {
            Scoping::LocationAndYear => (doc.location, doc.financial_year),
            Scoping::YearOnly => (None, doc.financial_year),
            Scoping::Global => (None, None),
        };
        Self {
            family,
            location,
            financial_year,
            recency: config.recency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_concatenates_present_components() {
        let key = ScopeKey::scoped("H", 25, "S");
        assert_eq!(key.prefix(), "H25S");
        let master = ScopeKey::global("RM");
        assert_eq!(master.prefix(), "RM");
    }

    #[test]
    fn query_drops_unused_references() {
        let doc = DocumentContext::at(LocationId(3), FinancialYearId(7));

        let sale = ScopeQuery::for_document(CodeFamily::Sale, &doc);
        assert_eq!(sale.location, Some(LocationId(3)));
        assert_eq!(sale.financial_year, Some(FinancialYearId(7)));

        let purchase = ScopeQuery::for_document(CodeFamily::Purchase, &doc);
        assert_eq!(purchase.location, None);
        assert_eq!(purchase.financial_year, Some(FinancialYearId(7)));

        let ledger = ScopeQuery::for_document(CodeFamily::Ledger, &doc);
        assert_eq!(ledger.location, None);
        assert_eq!(ledger.financial_year, None);
        assert_eq!(ledger.recency, Recency::Identity);
    }

    #[test]
    fn lock_keys_follow_the_rendered_prefix() {
        let key = ScopeKey::scoped("H", 25, "S");
        assert_eq!(key.lock_key(CodeFamily::Sale), "sale/H25S");
        assert_eq!(
            key.lock_key(CodeFamily::Sale),
            ScopeKey::scoped("H", 25, "S").lock_key(CodeFamily::Sale)
        );
        assert_ne!(
            key.lock_key(CodeFamily::Sale),
            ScopeKey::scoped("K", 25, "S").lock_key(CodeFamily::Sale)
        );
        assert_ne!(
            key.lock_key(CodeFamily::Sale),
            key.lock_key(CodeFamily::SaleReturn)
        );
    }
}
