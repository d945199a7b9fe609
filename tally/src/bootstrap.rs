use std::sync::Arc;

use anyhow::{Context, Result};
use tally_allocator::{AllocatorDeps, AllocatorOptions, CodeAllocator};
use tally_config::{StoreBackend, TallyConfig};
use tally_core::{FinancialYearId, LocationId};
use tally_store::{InMemoryStore, SqliteStore, StaticSettings};
use tracing::info;

/// Build an allocator over the configured backend.
///
/// Locations and financial years from the config are upserted into the backend first.
/// Prefixes from `[prefixes]` override the backend's settings table when any are configured.
pub async fn build_allocator(config: &TallyConfig) -> Result<CodeAllocator> {
    config.validate()?;
    let deps = match config.store.backend {
        StoreBackend::Memory => {
            let store = InMemoryStore::new();
            for location in &config.locations {
                store.add_location(LocationId(location.id), location.prefix.trim());
            }
            for year in &config.financial_years {
                store.add_financial_year(FinancialYearId(year.id), year.number);
            }
            AllocatorDeps::from_store(Arc::new(store))
        }
        StoreBackend::Sqlite => {
            let path = config
                .store
                .path
                .as_ref()
                .context("store.path is required for the sqlite backend")?;
            let store = SqliteStore::new(path)
                .with_context(|| format!("failed to open sqlite store at {}", path.display()))?;
            for location in &config.locations {
                store
                    .upsert_location(LocationId(location.id), location.prefix.trim())
                    .await
                    .with_context(|| format!("failed to seed location {}", location.id))?;
            }
            for year in &config.financial_years {
                store
                    .upsert_financial_year(FinancialYearId(year.id), year.number)
                    .await
                    .with_context(|| format!("failed to seed financial year {}", year.id))?;
            }
            AllocatorDeps::from_store(Arc::new(store))
        }
    };
    let deps = if config.prefixes.is_empty() {
        deps
    } else {
        deps.with_settings(Arc::new(StaticSettings::from(config.prefix_map())))
    };
    let options = AllocatorOptions::from(&config.allocator);
    info!(
        backend = ?config.store.backend,
        primary_location = options.primary_location.get(),
        max_attempts = options.max_attempts,
        configured_prefixes = config.prefixes.len(),
        seeded_locations = config.locations.len(),
        seeded_financial_years = config.financial_years.len(),
        "code allocator ready"
    );
    Ok(CodeAllocator::new(deps, options))
}
