//! Tally: readable, sequential codes for business documents and master data.
//!
//! ```ignore
//! use tally::{build_allocator, load_config, FinancialYearId, LocationId};
//!
//! let config = load_config(None)?;
//! tally::telemetry::init_tracing(&config.logging)?;
//! let allocator = build_allocator(&config).await?;
//! let code = allocator.next_sale_code(LocationId(2), FinancialYearId(3)).await?;
//! ```

mod bootstrap;
pub mod telemetry;

pub use bootstrap::build_allocator;
pub use tally_allocator::{
    adjustment_code, AllocationError, AllocationResult, AllocatorDeps, AllocatorOptions,
    CodeAllocator, CodeKind,
};
pub use tally_config::{
    load_config, load_config_from, FinancialYearEntry, LocationEntry, TallyConfig,
};
pub use tally_core::{
    CodeFamily, DocumentContext, FamilyConfig, FinancialYearId, IssuedRecord, LocationId,
    NewRecord, ScopeKey, Scoping,
};
pub use tally_store::{
    Clock, CodeRepository, InMemoryStore, MasterData, SettingsStore, SqliteStore, StaticSettings,
    StoreError, SystemClock,
};
