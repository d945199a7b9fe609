use std::sync::Arc;

use tally_core::{CodeFamily, DocumentContext, FinancialYearId, LocationId, ScopeKey, Scoping};
use tally_store::{MasterData, SettingsStore};

use crate::{AllocationError, AllocationResult, CodeKind};

/// Turns a document's references into the prefix components of its numbering scope.
#[derive(Clone)]
pub struct ScopeResolver {
    master_data: Arc<dyn MasterData>,
    settings: Arc<dyn SettingsStore>,
    primary_location: LocationId,
}

impl ScopeResolver {
    pub fn new(
        master_data: Arc<dyn MasterData>,
        settings: Arc<dyn SettingsStore>,
        primary_location: LocationId,
    ) -> Self {
        Self {
            master_data,
            settings,
            primary_location,
        }
    }

    pub fn primary_location(&self) -> LocationId {
        self.primary_location
    }

    pub async fn resolve(
        &self,
        family: CodeFamily,
        doc: &DocumentContext,
    ) -> AllocationResult<ScopeKey> {
        let kind = CodeKind::Family(family);
        match family.config().scoping {
            Scoping::LocationAndYear => {
                let location = required_location(kind, doc)?;
                self.scoped(kind, location, doc).await
            }
            Scoping::YearOnly => self.scoped(kind, self.primary_location, doc).await,
            Scoping::Global => Ok(ScopeKey::global(self.type_prefix(kind).await?)),
        }
    }

    /// Prefix for timestamp-based stock-adjustment codes; always the document's own location.
    pub async fn resolve_adjustment(&self, doc: &DocumentContext) -> AllocationResult<ScopeKey> {
        let kind = CodeKind::StockAdjustment;
        let location = required_location(kind, doc)?;
        self.scoped(kind, location, doc).await
    }

    pub async fn type_prefix(&self, kind: CodeKind) -> AllocationResult<String> {
        let key = kind.prefix_key();
        match self.settings.get(key).await? {
            Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
            _ => Err(AllocationError::MissingPrefix { kind, key }),
        }
    }

    async fn scoped(
        &self,
        kind: CodeKind,
        location: LocationId,
        doc: &DocumentContext,
    ) -> AllocationResult<ScopeKey> {
        let financial_year = doc
            .financial_year
            .ok_or(AllocationError::MissingReference {
                kind,
                field: "financial year",
            })?;
        let location_prefix = self.location_prefix(location).await?;
        let year_number = self.financial_year_number(financial_year).await?;
        let type_prefix = self.type_prefix(kind).await?;
        Ok(ScopeKey::scoped(location_prefix, year_number, type_prefix))
    }

    async fn location_prefix(&self, id: LocationId) -> AllocationResult<String> {
        self.master_data
            .location_prefix(id)
            .await?
            .ok_or(AllocationError::UnknownLocation(id))
    }

    async fn financial_year_number(&self, id: FinancialYearId) -> AllocationResult<u32> {
        self.master_data
            .financial_year_number(id)
            .await?
            .ok_or(AllocationError::UnknownFinancialYear(id))
    }
}

fn required_location(kind: CodeKind, doc: &DocumentContext) -> AllocationResult<LocationId> {
    doc.location.ok_or(AllocationError::MissingReference {
        kind,
        field: "location",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_store::InMemoryStore;

    fn resolver() -> ScopeResolver {
        let store = Arc::new(InMemoryStore::new());
        store
            .add_location(LocationId(1), "H")
            .add_location(LocationId(2), "K")
            .add_financial_year(FinancialYearId(10), 25)
            .set_setting("SaleTransactionPrefix", "S")
            .set_setting("PurchaseTransactionPrefix", " P ")
            .set_setting("RawMaterialCodePrefix", "RM")
            .set_setting("StockAdjustmentTransactionPrefix", "ADJ");
        ScopeResolver::new(store.clone(), store, LocationId(1))
    }

    #[tokio::test]
    async fn sale_uses_own_location() {
        let key = resolver()
            .resolve(
                CodeFamily::Sale,
                &DocumentContext::at(LocationId(2), FinancialYearId(10)),
            )
            .await
            .unwrap();
        assert_eq!(key.prefix(), "K25S");
    }

    #[tokio::test]
    async fn purchase_uses_primary_location() {
        let key = resolver()
            .resolve(
                CodeFamily::Purchase,
                &DocumentContext::at(LocationId(2), FinancialYearId(10)),
            )
            .await
            .unwrap();
        assert_eq!(key, ScopeKey::scoped("H", 25, "P"));
    }

    #[tokio::test]
    async fn master_data_has_no_location_or_year() {
        let key = resolver()
            .resolve(CodeFamily::RawMaterial, &DocumentContext::new())
            .await
            .unwrap();
        assert_eq!(key, ScopeKey::global("RM"));
    }

    #[tokio::test]
    async fn adjustment_prefix() {
        let key = resolver()
            .resolve_adjustment(&DocumentContext::at(LocationId(1), FinancialYearId(10)))
            .await
            .unwrap();
        assert_eq!(key.prefix(), "H25ADJ");
    }

    #[tokio::test]
    async fn missing_prefix_is_fatal() {
        let err = resolver()
            .resolve(CodeFamily::Ledger, &DocumentContext::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AllocationError::MissingPrefix {
                key: "LedgerCodePrefix",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn unknown_references_are_fatal() {
        let resolver = resolver();
        let err = resolver
            .resolve(
                CodeFamily::Sale,
                &DocumentContext::at(LocationId(9), FinancialYearId(10)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AllocationError::UnknownLocation(LocationId(9))));

        let err = resolver
            .resolve(
                CodeFamily::Purchase,
                &DocumentContext::new().with_financial_year(FinancialYearId(11)),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AllocationError::UnknownFinancialYear(FinancialYearId(11))
        ));
    }

    #[tokio::test]
    async fn missing_references_are_reported() {
        let resolver = resolver();
        let err = resolver
            .resolve(
                CodeFamily::Sale,
                &DocumentContext::new().with_financial_year(FinancialYearId(10)),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AllocationError::MissingReference {
                field: "location",
                ..
            }
        ));

        let err = resolver
            .resolve(
                CodeFamily::Accounting,
                &DocumentContext::new().with_location(LocationId(1)),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AllocationError::MissingReference {
                field: "financial year",
                ..
            }
        ));
    }
}
