//! Fixtures shared by the Tally test suites.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::Mutex;
use tally_core::{
    CodeFamily, DocumentContext, FinancialYearId, IssuedRecord, LocationId, NewRecord, ScopeQuery,
};
use tally_store::{Clock, CodeRepository, InMemoryStore, StoreResult};

/// Head office, prefix `H`. Configured as the primary location.
pub const HEAD_OFFICE: LocationId = LocationId(1);
/// Outlet, prefix `K`.
pub const OUTLET: LocationId = LocationId(2);
/// Financial year numbered 25.
pub const FY25: FinancialYearId = FinancialYearId(3);
/// Financial year numbered 26.
pub const FY26: FinancialYearId = FinancialYearId(4);

/// Type prefixes matching `config/default.toml`.
pub fn standard_prefixes() -> HashMap<String, String> {
    [
        ("PurchaseTransactionPrefix", "P"),
        ("PurchaseReturnTransactionPrefix", "PR"),
        ("KitchenIssueTransactionPrefix", "KI"),
        ("KitchenProductionTransactionPrefix", "KP"),
        ("OrderTransactionPrefix", "O"),
        ("SaleTransactionPrefix", "S"),
        ("SaleReturnTransactionPrefix", "SR"),
        ("StockTransferTransactionPrefix", "ST"),
        ("AccountingTransactionPrefix", "A"),
        ("StockAdjustmentTransactionPrefix", "ADJ"),
        ("RawMaterialCodePrefix", "RM"),
        ("FinishedProductCodePrefix", "FP"),
        ("LedgerCodePrefix", "L"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect()
}

/// In-memory store with both locations, both financial years and every standard prefix.
pub fn seeded_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    store
        .add_location(HEAD_OFFICE, "H")
        .add_location(OUTLET, "K")
        .add_financial_year(FY25, 25)
        .add_financial_year(FY26, 26);
    for (key, value) in standard_prefixes() {
        store.set_setting(key, value);
    }
    store
}

pub fn timestamp(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|day| day.and_hms_opt(h, min, s))
        .expect("valid fixture timestamp")
}

/// Seed a record directly, bypassing the allocator.
pub fn seed_record(
    store: &InMemoryStore,
    family: CodeFamily,
    code: &str,
    doc: &DocumentContext,
    created_at: NaiveDateTime,
) -> IssuedRecord {
    store.push(NewRecord::new(family, code, doc, created_at))
}

/// Clock that only moves when told to, optionally stepping on every read.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
    step: chrono::Duration,
}

impl FixedClock {
    pub fn at(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
            step: chrono::Duration::zero(),
        }
    }

    /// Advance by `step` after every read.
    pub fn ticking(start: NaiveDateTime, step: chrono::Duration) -> Self {
        Self {
            now: Mutex::new(start),
            step,
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        let mut now = self.now.lock();
        let current = *now;
        *now += self.step;
        current
    }
}

/// Repository wrapper counting reads and optionally sleeping before each call.
pub struct CountingRepository<R> {
    inner: R,
    latency: Option<Duration>,
    probes: AtomicUsize,
    recent_reads: AtomicUsize,
    inserts: AtomicUsize,
}

impl<R: CodeRepository> CountingRepository<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            latency: None,
            probes: AtomicUsize::new(0),
            recent_reads: AtomicUsize::new(0),
            inserts: AtomicUsize::new(0),
        }
    }

    /// Sleep for `latency` before every call so concurrent callers interleave.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of `find_by_code` calls, i.e. duplicate probes.
    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn recent_reads(&self) -> usize {
        self.recent_reads.load(Ordering::SeqCst)
    }

    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.probes() + self.recent_reads() + self.inserts()
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl<R: CodeRepository> CodeRepository for CountingRepository<R> {
    async fn find_by_code(
        &self,
        family: CodeFamily,
        code: &str,
    ) -> StoreResult<Option<IssuedRecord>> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.inner.find_by_code(family, code).await
    }

    async fn most_recent(&self, query: &ScopeQuery) -> StoreResult<Option<IssuedRecord>> {
        self.recent_reads.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.inner.most_recent(query).await
    }

    async fn insert(&self, record: NewRecord) -> StoreResult<IssuedRecord> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.inner.insert(record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_store::{MasterData, SettingsStore};

    #[test]
    fn ticking_clock_steps_after_each_read() {
        let start = timestamp(2025, 5, 1, 9, 0, 0);
        let clock = FixedClock::ticking(start, chrono::Duration::seconds(1));
        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), timestamp(2025, 5, 1, 9, 0, 1));
        clock.set(start);
        clock.advance(chrono::Duration::minutes(5));
        assert_eq!(clock.now(), timestamp(2025, 5, 1, 9, 5, 0));
    }

    #[tokio::test]
    async fn seeded_store_has_fixtures() {
        let store = seeded_store();
        assert_eq!(
            store.location_prefix(OUTLET).await.unwrap().as_deref(),
            Some("K")
        );
        assert_eq!(store.financial_year_number(FY26).await.unwrap(), Some(26));
        assert_eq!(
            store.get("LedgerCodePrefix").await.unwrap().as_deref(),
            Some("L")
        );
    }

    #[tokio::test]
    async fn counting_repository_counts() {
        let store = seeded_store();
        let counting = CountingRepository::new(Arc::clone(&store));
        let doc = DocumentContext::at(HEAD_OFFICE, FY25);
        counting
            .insert(NewRecord::new(
                CodeFamily::Sale,
                "H25S000001",
                &doc,
                timestamp(2025, 5, 1, 9, 0, 0),
            ))
            .await
            .unwrap();
        assert!(counting
            .exists(CodeFamily::Sale, "H25S000001")
            .await
            .unwrap());
        counting
            .most_recent(&ScopeQuery::for_document(CodeFamily::Sale, &doc))
            .await
            .unwrap();
        assert_eq!(counting.probes(), 1);
        assert_eq!(counting.recent_reads(), 1);
        assert_eq!(counting.inserts(), 1);
        assert_eq!(store.len(), 1);
    }
}
