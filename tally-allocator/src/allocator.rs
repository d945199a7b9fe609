use std::future::Future;
use std::sync::Arc;

use tally_config::AllocatorSettings;
use tally_core::{
    CodeFamily, DocumentContext, FinancialYearId, IssuedRecord, LocationId, NewRecord, ScopeKey,
    ScopeQuery,
};
use tally_store::{Clock, CodeRepository, MasterData, SettingsStore, SystemClock};
use tracing::debug;

use crate::adjustment::adjustment_code;
use crate::guard::DuplicateGuard;
use crate::locks::ScopeLocks;
use crate::resolver::ScopeResolver;
use crate::sequence::{first_candidate, Candidate};
use crate::{AllocationError, AllocationResult};

/// Largest batch [`CodeAllocator::allocate_many`] computes in one call.
pub const MAX_BATCH_SIZE: usize = 10_000;

/// Tunables of a [`CodeAllocator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocatorOptions {
    pub primary_location: LocationId,
    pub max_attempts: u32,
}

impl Default for AllocatorOptions {
    fn default() -> Self {
        Self::from(&AllocatorSettings::default())
    }
}

impl From<&AllocatorSettings> for AllocatorOptions {
    fn from(value: &AllocatorSettings) -> Self {
        Self {
            primary_location: LocationId(value.primary_location_id),
            max_attempts: value.max_attempts,
        }
    }
}

/// Collaborators the allocator reads from.
#[derive(Clone)]
pub struct AllocatorDeps {
    pub repository: Arc<dyn CodeRepository>,
    pub master_data: Arc<dyn MasterData>,
    pub settings: Arc<dyn SettingsStore>,
    pub clock: Arc<dyn Clock>,
}

impl AllocatorDeps {
    /// Use one backend for records, master data and settings, with the system clock.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: CodeRepository + MasterData + SettingsStore + 'static,
    {
        Self {
            repository: store.clone(),
            master_data: store.clone(),
            settings: store,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_settings(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_repository(mut self, repository: Arc<dyn CodeRepository>) -> Self {
        self.repository = repository;
        self
    }
}

/// Mints sequential codes for document and master-data families.
///
/// Allocation only reads the store. The caller persists the record under the returned code;
/// [`CodeAllocator::allocate_with`] serializes that round trip per scope within this process.
pub struct CodeAllocator {
    repository: Arc<dyn CodeRepository>,
    clock: Arc<dyn Clock>,
    resolver: ScopeResolver,
    guard: DuplicateGuard,
    locks: ScopeLocks,
}

impl CodeAllocator {
    pub fn new(deps: AllocatorDeps, options: AllocatorOptions) -> Self {
        Self {
            resolver: ScopeResolver::new(deps.master_data, deps.settings, options.primary_location),
            repository: deps.repository,
            clock: deps.clock,
            guard: DuplicateGuard::new(options.max_attempts),
            locks: ScopeLocks::new(),
        }
    }

    pub fn resolver(&self) -> &ScopeResolver {
        &self.resolver
    }

    /// Resolve the prefix components a code for `doc` would carry.
    pub async fn preview_prefix(
        &self,
        family: CodeFamily,
        doc: &DocumentContext,
    ) -> AllocationResult<ScopeKey> {
        self.resolver.resolve(family, doc).await
    }

    /// Compute the next free code of `family` for `doc`.
    pub async fn allocate(
        &self,
        family: CodeFamily,
        doc: &DocumentContext,
    ) -> AllocationResult<String> {
        let (prefix, first) = self.resolve_first(family, doc).await?;
        let settled = self
            .guard
            .settle(self.repository.as_ref(), family, &prefix, first)
            .await?;
        debug!(family = %family, code = %settled.code, "allocated code");
        Ok(settled.code)
    }

    /// Compute `count` consecutive free codes without reserving any of them.
    ///
    /// At most [`MAX_BATCH_SIZE`] codes per call.
    pub async fn allocate_many(
        &self,
        family: CodeFamily,
        doc: &DocumentContext,
        count: usize,
    ) -> AllocationResult<Vec<String>> {
        if count > MAX_BATCH_SIZE {
            return Err(AllocationError::BatchTooLarge {
                family,
                requested: count,
                limit: MAX_BATCH_SIZE,
            });
        }
        let mut codes = Vec::with_capacity(count);
        if count == 0 {
            return Ok(codes);
        }
        let (prefix, mut next) = self.resolve_first(family, doc).await?;
        loop {
            let settled = self
                .guard
                .settle(self.repository.as_ref(), family, &prefix, next)
                .await?;
            codes.push(settled.code.clone());
            if codes.len() == count {
                break;
            }
            next = settled.successor(family, &prefix)?;
        }
        debug!(family = %family, count, first = %codes[0], "allocated code batch");
        Ok(codes)
    }

    /// Allocate a code and hand it to `persist` while holding the scope's lock.
    ///
    /// Concurrent callers of this method for the same family and prefix run one at a time, so
    /// each sees the previous caller's record.
    pub async fn allocate_with<F, Fut, T, E>(
        &self,
        family: CodeFamily,
        doc: &DocumentContext,
        persist: F,
    ) -> Result<T, E>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<AllocationError>,
    {
        let key = self.resolver.resolve(family, doc).await?;
        let _lease = self.locks.acquire(&key.lock_key(family)).await;
        let code = self.allocate(family, doc).await?;
        persist(code).await
    }

    /// Allocate a code and insert the record through the repository's write path.
    pub async fn issue(
        &self,
        family: CodeFamily,
        doc: &DocumentContext,
    ) -> AllocationResult<IssuedRecord> {
        let repository = Arc::clone(&self.repository);
        let clock = Arc::clone(&self.clock);
        let doc = *doc;
        self.allocate_with(family, &doc, move |code| async move {
            let record = NewRecord::new(family, code, &doc, clock.now());
            Ok::<_, AllocationError>(repository.insert(record).await?)
        })
        .await
    }

    /// `location ‖ year ‖ adjustment prefix ‖ ddMMyy ‖ HHmmss` at the clock's current time.
    ///
    /// Issued codes are never consulted.
    pub async fn stock_adjustment_code(
        &self,
        location: LocationId,
        financial_year: FinancialYearId,
    ) -> AllocationResult<String> {
        let key = self
            .resolver
            .resolve_adjustment(&DocumentContext::at(location, financial_year))
            .await?;
        let code = adjustment_code(&key, self.clock.now());
        debug!(code = %code, "issued stock adjustment code");
        Ok(code)
    }

    pub async fn next_purchase_code(
        &self,
        financial_year: FinancialYearId,
    ) -> AllocationResult<String> {
        self.allocate_back_office(CodeFamily::Purchase, financial_year)
            .await
    }

    pub async fn next_purchase_return_code(
        &self,
        financial_year: FinancialYearId,
    ) -> AllocationResult<String> {
        self.allocate_back_office(CodeFamily::PurchaseReturn, financial_year)
            .await
    }

    pub async fn next_kitchen_issue_code(
        &self,
        financial_year: FinancialYearId,
    ) -> AllocationResult<String> {
        self.allocate_back_office(CodeFamily::KitchenIssue, financial_year)
            .await
    }

    pub async fn next_kitchen_production_code(
        &self,
        financial_year: FinancialYearId,
    ) -> AllocationResult<String> {
        self.allocate_back_office(CodeFamily::KitchenProduction, financial_year)
            .await
    }

    pub async fn next_accounting_code(
        &self,
        financial_year: FinancialYearId,
    ) -> AllocationResult<String> {
        self.allocate_back_office(CodeFamily::Accounting, financial_year)
            .await
    }

    pub async fn next_order_code(
        &self,
        location: LocationId,
        financial_year: FinancialYearId,
    ) -> AllocationResult<String> {
        self.allocate(CodeFamily::Order, &DocumentContext::at(location, financial_year))
            .await
    }

    pub async fn next_sale_code(
        &self,
        location: LocationId,
        financial_year: FinancialYearId,
    ) -> AllocationResult<String> {
        self.allocate(CodeFamily::Sale, &DocumentContext::at(location, financial_year))
            .await
    }

    pub async fn next_sale_return_code(
        &self,
        location: LocationId,
        financial_year: FinancialYearId,
    ) -> AllocationResult<String> {
        self.allocate(
            CodeFamily::SaleReturn,
            &DocumentContext::at(location, financial_year),
        )
        .await
    }

    pub async fn next_stock_transfer_code(
        &self,
        location: LocationId,
        financial_year: FinancialYearId,
    ) -> AllocationResult<String> {
        self.allocate(
            CodeFamily::StockTransfer,
            &DocumentContext::at(location, financial_year),
        )
        .await
    }

    pub async fn next_raw_material_code(&self) -> AllocationResult<String> {
        self.allocate(CodeFamily::RawMaterial, &DocumentContext::new())
            .await
    }

    pub async fn next_finished_product_code(&self) -> AllocationResult<String> {
        self.allocate(CodeFamily::FinishedProduct, &DocumentContext::new())
            .await
    }

    pub async fn next_ledger_code(&self) -> AllocationResult<String> {
        self.allocate(CodeFamily::Ledger, &DocumentContext::new())
            .await
    }

    async fn allocate_back_office(
        &self,
        family: CodeFamily,
        financial_year: FinancialYearId,
    ) -> AllocationResult<String> {
        let doc = DocumentContext::new().with_financial_year(financial_year);
        self.allocate(family, &doc).await
    }

    async fn resolve_first(
        &self,
        family: CodeFamily,
        doc: &DocumentContext,
    ) -> AllocationResult<(String, Candidate)> {
        let key = self.resolver.resolve(family, doc).await?;
        let prefix = key.prefix();
        let query = ScopeQuery::for_document(family, doc);
        let candidate = first_candidate(self.repository.as_ref(), family, &prefix, &query).await?;
        debug!(
            family = %family,
            prefix = %prefix,
            candidate = %candidate.code,
            "computed first candidate"
        );
        Ok((prefix, candidate))
    }
}
