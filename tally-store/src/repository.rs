use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use tally_core::{CodeFamily, FinancialYearId, IssuedRecord, LocationId, NewRecord, ScopeQuery};

use crate::StoreResult;

/// Read primitives over issued documents plus the caller's write path.
#[async_trait]
pub trait CodeRepository: Send + Sync {
    /// Load the record of `family` carrying exactly `code`, if any.
    async fn find_by_code(&self, family: CodeFamily, code: &str)
        -> StoreResult<Option<IssuedRecord>>;

    /// Load the most recent record matching the scope filter.
    async fn most_recent(&self, query: &ScopeQuery) -> StoreResult<Option<IssuedRecord>>;

    /// Persist a record and return it with its assigned identity.
    ///
    /// Code uniqueness is not enforced here.
    async fn insert(&self, record: NewRecord) -> StoreResult<IssuedRecord>;

    async fn exists(&self, family: CodeFamily, code: &str) -> StoreResult<bool> {
        Ok(self.find_by_code(family, code).await?.is_some())
    }
}

/// Location and financial-year lookups.
#[async_trait]
pub trait MasterData: Send + Sync {
    async fn location_prefix(&self, id: LocationId) -> StoreResult<Option<String>>;

    async fn financial_year_number(&self, id: FinancialYearId) -> StoreResult<Option<u32>>;
}

/// String-valued settings keyed by name.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;
}

/// Source of the local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Read-only settings backed by a map, typically filled from configuration.
///
/// Keys match case-insensitively.
#[derive(Clone, Debug, Default)]
pub struct StaticSettings {
    values: HashMap<String, String>,
}

impl StaticSettings {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self {
            values: values
                .into_iter()
                .map(|(key, value)| (key.to_ascii_lowercase(), value))
                .collect(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values
            .insert(key.into().to_ascii_lowercase(), value.into());
        self
    }
}

impl From<HashMap<String, String>> for StaticSettings {
    fn from(values: HashMap<String, String>) -> Self {
        Self::new(values)
    }
}

#[async_trait]
impl SettingsStore for StaticSettings {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.values.get(&key.to_ascii_lowercase()).cloned())
    }
}

#[async_trait]
impl<T: CodeRepository + ?Sized> CodeRepository for Arc<T> {
    async fn find_by_code(
        &self,
        family: CodeFamily,
        code: &str,
    ) -> StoreResult<Option<IssuedRecord>> {
        (**self).find_by_code(family, code).await
    }

    async fn most_recent(&self, query: &ScopeQuery) -> StoreResult<Option<IssuedRecord>> {
        (**self).most_recent(query).await
    }

    async fn insert(&self, record: NewRecord) -> StoreResult<IssuedRecord> {
        (**self).insert(record).await
    }
}

#[async_trait]
impl<T: MasterData + ?Sized> MasterData for Arc<T> {
    async fn location_prefix(&self, id: LocationId) -> StoreResult<Option<String>> {
        (**self).location_prefix(id).await
    }

    async fn financial_year_number(&self, id: FinancialYearId) -> StoreResult<Option<u32>> {
        (**self).financial_year_number(id).await
    }
}

#[async_trait]
impl<T: SettingsStore + ?Sized> SettingsStore for Arc<T> {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get(key).await
    }
}
