//! Storage traits and backends consulted by the code allocator.

mod error;
mod memory;
mod repository;
mod sqlite;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use repository::{
    Clock, CodeRepository, MasterData, SettingsStore, StaticSettings, SystemClock,
};
pub use sqlite::SqliteStore;
