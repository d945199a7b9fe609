use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use tally_core::{
    CodeFamily, FinancialYearId, IssuedRecord, LocationId, NewRecord, Recency, ScopeQuery,
};
use tokio::task;
use tracing::debug;

use crate::{CodeRepository, MasterData, SettingsStore, StoreError, StoreResult};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS locations (
    id INTEGER PRIMARY KEY,
    prefix TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS financial_years (
    id INTEGER PRIMARY KEY,
    year_number INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY COLLATE NOCASE,
    value TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS issued_codes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    family TEXT NOT NULL,
    code TEXT NOT NULL,
    location_id INTEGER,
    financial_year_id INTEGER,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS issued_codes_idx_family_code
    ON issued_codes(family, code);
CREATE INDEX IF NOT EXISTS issued_codes_idx_scope
    ON issued_codes(family, location_id, financial_year_id);
"#;

const RECORD_COLUMNS: &str = "id, family, code, location_id, financial_year_id, created_at";

/// SQLite-backed store holding issued codes, master data and settings.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let store = Self { path: path.into() };
        let conn = open(&store.path)?;
        conn.execute_batch(SCHEMA)?;
        debug!(path = %store.path.display(), "sqlite store schema ready");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn upsert_location(&self, id: LocationId, prefix: impl Into<String>) -> StoreResult<()> {
        let prefix = prefix.into();
        self.with_connection(move |conn| {
            conn.execute(
                "INSERT INTO locations (id, prefix) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET prefix = excluded.prefix",
                params![id.get(), prefix],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn upsert_financial_year(&self, id: FinancialYearId, number: u32) -> StoreResult<()> {
        self.with_connection(move |conn| {
            conn.execute(
                "INSERT INTO financial_years (id, year_number) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET year_number = excluded.year_number",
                params![id.get(), number],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn set_setting(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> StoreResult<()> {
        let key = key.into();
        let value = value.into();
        self.with_connection(move |conn| {
            conn.execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
            Ok(())
        })
        .await
    }

    async fn with_connection<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
    {
        let path = self.path.clone();
        let result = task::spawn_blocking(move || {
            let mut conn = open(&path)?;
            op(&mut conn)
        })
        .await?;
        result
    }
}

fn open(path: &Path) -> StoreResult<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
    Ok(conn)
}

fn row_to_record(row: &rusqlite::Row<'_>) -> StoreResult<IssuedRecord> {
    let id: i64 = row.get(0)?;
    let family_str: String = row.get(1)?;
    let code: String = row.get(2)?;
    let location: Option<i64> = row.get(3)?;
    let financial_year: Option<i64> = row.get(4)?;
    let created_str: String = row.get(5)?;

    let family = CodeFamily::from_str(&family_str).map_err(StoreError::Serialization)?;
    let created_at = NaiveDateTime::parse_from_str(&created_str, TIMESTAMP_FORMAT).map_err(|err| {
        StoreError::Serialization(format!("invalid timestamp {created_str}: {err}"))
    })?;

    Ok(IssuedRecord {
        id: id as u64,
        family,
        code,
        location: location.map(LocationId),
        financial_year: financial_year.map(FinancialYearId),
        created_at,
    })
}

fn query_one(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> StoreResult<Option<IssuedRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_record(row)?)),
        None => Ok(None),
    }
}

#[async_trait]
impl CodeRepository for SqliteStore {
    async fn find_by_code(
        &self,
        family: CodeFamily,
        code: &str,
    ) -> StoreResult<Option<IssuedRecord>> {
        let code = code.to_string();
        self.with_connection(move |conn| {
            let sql = format!(
                "SELECT {RECORD_COLUMNS} FROM issued_codes
                 WHERE family = ?1 AND code = ?2
                 ORDER BY id ASC LIMIT 1"
            );
            query_one(conn, &sql, params![family.as_str(), code])
        })
        .await
    }

    async fn most_recent(&self, query: &ScopeQuery) -> StoreResult<Option<IssuedRecord>> {
        let query = *query;
        self.with_connection(move |conn| {
            let order = match query.recency {
                Recency::CreatedAt => "created_at DESC, id DESC",
                Recency::Identity => "id DESC",
            };
            let sql = format!(
                "SELECT {RECORD_COLUMNS} FROM issued_codes
                 WHERE family = ?1
                   AND (?2 IS NULL OR location_id = ?2)
                   AND (?3 IS NULL OR financial_year_id = ?3)
                 ORDER BY {order} LIMIT 1"
            );
            query_one(
                conn,
                &sql,
                params![
                    query.family.as_str(),
                    query.location.map(LocationId::get),
                    query.financial_year.map(FinancialYearId::get)
                ],
            )
        })
        .await
    }

    async fn insert(&self, record: NewRecord) -> StoreResult<IssuedRecord> {
        self.with_connection(move |conn| {
            conn.execute(
                "INSERT INTO issued_codes (family, code, location_id, financial_year_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.family.as_str(),
                    record.code,
                    record.location.map(LocationId::get),
                    record.financial_year.map(FinancialYearId::get),
                    record.created_at.format(TIMESTAMP_FORMAT).to_string()
                ],
            )?;
            let id = conn.last_insert_rowid() as u64;
            Ok(record.into_issued(id))
        })
        .await
    }
}

#[async_trait]
impl MasterData for SqliteStore {
    async fn location_prefix(&self, id: LocationId) -> StoreResult<Option<String>> {
        self.with_connection(move |conn| {
            let prefix = conn
                .query_row(
                    "SELECT prefix FROM locations WHERE id = ?1",
                    params![id.get()],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(prefix)
        })
        .await
    }

    async fn financial_year_number(&self, id: FinancialYearId) -> StoreResult<Option<u32>> {
        self.with_connection(move |conn| {
            let number = conn
                .query_row(
                    "SELECT year_number FROM financial_years WHERE id = ?1",
                    params![id.get()],
                    |row| row.get::<_, u32>(0),
                )
                .optional()?;
            Ok(number)
        })
        .await
    }
}

#[async_trait]
impl SettingsStore for SqliteStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let key = key.to_string();
        self.with_connection(move |conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM settings WHERE key = ?1",
                    params![key],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(value)
        })
        .await
    }
}
