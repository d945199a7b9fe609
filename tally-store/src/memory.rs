use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tally_core::{
    CodeFamily, FinancialYearId, IssuedRecord, LocationId, NewRecord, Recency, ScopeQuery,
};

use crate::{CodeRepository, MasterData, SettingsStore, StoreResult};

#[derive(Debug, Default)]
struct Tables {
    records: Vec<IssuedRecord>,
    last_id: u64,
    locations: HashMap<LocationId, String>,
    financial_years: HashMap<FinancialYearId, u32>,
    settings: HashMap<String, String>,
}

/// Process-local store used by tests and embedded deployments.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_location(&self, id: LocationId, prefix: impl Into<String>) -> &Self {
        self.tables.write().locations.insert(id, prefix.into());
        self
    }

    pub fn add_financial_year(&self, id: FinancialYearId, number: u32) -> &Self {
        self.tables.write().financial_years.insert(id, number);
        self
    }

    /// Keys match case-insensitively.
    pub fn set_setting(&self, key: impl Into<String>, value: impl Into<String>) -> &Self {
        self.tables
            .write()
            .settings
            .insert(key.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Insert without going through the async trait; used for seeding fixtures.
    pub fn push(&self, record: NewRecord) -> IssuedRecord {
        let mut tables = self.tables.write();
        tables.last_id += 1;
        let issued = record.into_issued(tables.last_id);
        tables.records.push(issued.clone());
        issued
    }

    pub fn records(&self, family: CodeFamily) -> Vec<IssuedRecord> {
        self.tables
            .read()
            .records
            .iter()
            .filter(|record| record.family == family)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tables.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn matches_scope(record: &IssuedRecord, query: &ScopeQuery) -> bool {
    record.family == query.family
        && query.location.map_or(true, |id| record.location == Some(id))
        && query
            .financial_year
            .map_or(true, |id| record.financial_year == Some(id))
}

#[async_trait]
impl CodeRepository for InMemoryStore {
    async fn find_by_code(
        &self,
        family: CodeFamily,
        code: &str,
    ) -> StoreResult<Option<IssuedRecord>> {
        Ok(self
            .tables
            .read()
            .records
            .iter()
            .find(|record| record.family == family && record.code == code)
            .cloned())
    }

    async fn most_recent(&self, query: &ScopeQuery) -> StoreResult<Option<IssuedRecord>> {
        let tables = self.tables.read();
        let candidates = tables
            .records
            .iter()
            .filter(|record| matches_scope(record, query));
        let latest = match query.recency {
            Recency::CreatedAt => candidates.max_by_key(|record| (record.created_at, record.id)),
            Recency::Identity => candidates.max_by_key(|record| record.id),
        };
        Ok(latest.cloned())
    }

    async fn insert(&self, record: NewRecord) -> StoreResult<IssuedRecord> {
        Ok(self.push(record))
    }
}

#[async_trait]
impl MasterData for InMemoryStore {
    async fn location_prefix(&self, id: LocationId) -> StoreResult<Option<String>> {
        Ok(self.tables.read().locations.get(&id).cloned())
    }

    async fn financial_year_number(&self, id: FinancialYearId) -> StoreResult<Option<u32>> {
        Ok(self.tables.read().financial_years.get(&id).copied())
    }
}

#[async_trait]
impl SettingsStore for InMemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self
            .tables
            .read()
            .settings
            .get(&key.to_ascii_lowercase())
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use tally_core::DocumentContext;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, 1)
            .and_then(|day| day.and_hms_opt(hour, 0, 0))
            .unwrap()
    }

    fn sale(code: &str, location: i64, year: i64, hour: u32) -> NewRecord {
        NewRecord::new(
            CodeFamily::Sale,
            code,
            &DocumentContext::at(LocationId(location), FinancialYearId(year)),
            at(hour),
        )
    }

    #[tokio::test]
    async fn most_recent_filters_by_location_and_year() {
        let store = InMemoryStore::new();
        store.push(sale("H25S000001", 1, 25, 9));
        store.push(sale("K25S000001", 2, 25, 10));
        store.push(sale("H24S000077", 1, 24, 11));

        let query = ScopeQuery::for_document(
            CodeFamily::Sale,
            &DocumentContext::at(LocationId(1), FinancialYearId(25)),
        );
        let latest = store.most_recent(&query).await.unwrap().unwrap();
        assert_eq!(latest.code, "H25S000001");
    }

    #[tokio::test]
    async fn created_at_ordering_beats_identity() {
        let store = InMemoryStore::new();
        store.push(sale("H25S000002", 1, 25, 12));
        // Back-dated row inserted later.
        store.push(sale("H25S000001", 1, 25, 8));

        let query = ScopeQuery::for_document(
            CodeFamily::Sale,
            &DocumentContext::at(LocationId(1), FinancialYearId(25)),
        );
        let latest = store.most_recent(&query).await.unwrap().unwrap();
        assert_eq!(latest.code, "H25S000002");
    }

    #[tokio::test]
    async fn identity_ordering_for_master_data() {
        let store = InMemoryStore::new();
        let doc = DocumentContext::new();
        store.push(NewRecord::new(CodeFamily::RawMaterial, "RM0002", &doc, at(12)));
        store.push(NewRecord::new(CodeFamily::RawMaterial, "RM0003", &doc, at(8)));

        let query = ScopeQuery::for_document(CodeFamily::RawMaterial, &doc);
        let latest = store.most_recent(&query).await.unwrap().unwrap();
        assert_eq!(latest.code, "RM0003");
        assert_eq!(latest.id, 2);
    }

    #[tokio::test]
    async fn find_by_code_is_family_specific() {
        let store = InMemoryStore::new();
        store.push(sale("H25S000001", 1, 25, 9));
        assert!(store.exists(CodeFamily::Sale, "H25S000001").await.unwrap());
        assert!(!store
            .exists(CodeFamily::SaleReturn, "H25S000001")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn master_data_lookups() {
        let store = InMemoryStore::new();
        store
            .add_location(LocationId(1), "H")
            .add_financial_year(FinancialYearId(9), 25)
            .set_setting("SaleTransactionPrefix", "S");
        assert_eq!(
            store.location_prefix(LocationId(1)).await.unwrap().as_deref(),
            Some("H")
        );
        assert_eq!(
            store.financial_year_number(FinancialYearId(9)).await.unwrap(),
            Some(25)
        );
        assert!(store.location_prefix(LocationId(2)).await.unwrap().is_none());
        assert_eq!(
            store.get("SaleTransactionPrefix").await.unwrap().as_deref(),
            Some("S")
        );
    }

    #[tokio::test]
    async fn settings_ignore_key_case() {
        let store = InMemoryStore::new();
        store
            .set_setting("ledgercodeprefix", "L")
            .set_setting("LEDGERCODEPREFIX", "LG");
        assert_eq!(
            store.get("LedgerCodePrefix").await.unwrap().as_deref(),
            Some("LG")
        );
    }
}
