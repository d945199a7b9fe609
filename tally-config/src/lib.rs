use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Top-level configuration for a Tally deployment.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TallyConfig {
    #[serde(default)]
    pub allocator: AllocatorSettings,
    /// Type prefixes keyed by settings name, e.g. `SaleTransactionPrefix`.
    #[serde(default)]
    pub prefixes: HashMap<String, String>,
    /// Locations upserted into the store at startup.
    #[serde(default)]
    pub locations: Vec<LocationEntry>,
    /// Financial years upserted into the store at startup.
    #[serde(default)]
    pub financial_years: Vec<FinancialYearEntry>,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LocationEntry {
    pub id: i64,
    /// Short code leading every location-scoped document code, e.g. `H`.
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FinancialYearEntry {
    pub id: i64,
    /// Ordinal rendered into codes, e.g. `25`.
    pub number: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AllocatorSettings {
    /// Location whose prefix back-office families carry.
    #[serde(default = "default_primary_location")]
    pub primary_location_id: i64,
    /// Upper bound on duplicate probes per allocation.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for AllocatorSettings {
    fn default() -> Self {
        Self {
            primary_location_id: default_primary_location(),
            max_attempts: default_max_attempts(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_primary_location() -> i64 {
    1
}

fn default_max_attempts() -> u32 {
    1000
}

fn default_log_level() -> String {
    "info".into()
}

impl TallyConfig {
    /// Parse configuration from an inline TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: TallyConfig = toml::from_str(raw).context("invalid tally configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.allocator.max_attempts == 0 {
            bail!("allocator.max_attempts must be at least 1");
        }
        if let Some((key, _)) = self
            .prefixes
            .iter()
            .find(|(_, value)| value.trim().is_empty())
        {
            bail!("prefix '{key}' must not be empty");
        }
        let mut location_ids = HashSet::new();
        for location in &self.locations {
            if location.prefix.trim().is_empty() {
                bail!("location {} has an empty prefix", location.id);
            }
            if !location_ids.insert(location.id) {
                bail!("location {} is declared more than once", location.id);
            }
        }
        let mut year_ids = HashSet::new();
        for year in &self.financial_years {
            if !year_ids.insert(year.id) {
                bail!("financial year {} is declared more than once", year.id);
            }
        }
        if self.store.backend == StoreBackend::Sqlite && self.store.path.is_none() {
            bail!("store.path is required for the sqlite backend");
        }
        Ok(())
    }

    /// Prefix map with surrounding whitespace trimmed from values.
    ///
    /// File and environment sources may fold key case; consumers should match keys
    /// case-insensitively.
    pub fn prefix_map(&self) -> HashMap<String, String> {
        self.prefixes
            .iter()
            .map(|(key, value)| (key.clone(), value.trim().to_string()))
            .collect()
    }
}

/// Load configuration from `config/default.toml`, the optional `config/{env}.toml`,
/// and `TALLY__`-prefixed environment variables, in that order of precedence.
pub fn load_config(env: Option<&str>) -> Result<TallyConfig> {
    let mut builder =
        Config::builder().add_source(File::with_name("config/default").required(false));
    if let Some(env) = env {
        builder = builder.add_source(File::with_name(&format!("config/{env}")).required(false));
    }
    finish(builder)
}

/// Load configuration from an explicit file plus environment overrides.
pub fn load_config_from(path: impl AsRef<Path>) -> Result<TallyConfig> {
    let path = path.as_ref();
    let builder = Config::builder().add_source(File::from(path.to_path_buf()).required(true));
    finish(builder).with_context(|| format!("failed to load {}", path.display()))
}

fn finish(builder: config::ConfigBuilder<config::builder::DefaultState>) -> Result<TallyConfig> {
    let settings = builder
        .add_source(Environment::with_prefix("TALLY").separator("__"))
        .build()?;
    let config: TallyConfig = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}
