//! Migration configuration.
//!
//! Handles loading, validating, and merging the configuration file passed as
//! the first positional argument. User values are merged over stock defaults,
//! so a config only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! [api]
//! host = "http://localhost"   # Store base URL, scheme included
//! port = 3000
//! client_id = "api-client"
//! secret = "secret"
//! version = "1.0"
//! database = "library"
//! media_path = "/media"       # Asset upload endpoint
//! timeout_secs = 30           # Applies to every store call
//!
//! [schema]
//! media_collection = "mediaStore"  # Target of `images` reference fields
//! multiline_threshold = 200        # Longer strings get a multiline editor
//! cache_ttl = 300
//! page_size = 50
//! publish_group = "Main"
//!
//! [scan]
//! # page_key = "blog"         # Only migrate pages whose path contains this
//! include_page_meta = false   # Add `uid` and `url` to every record
//!
//! [processing]
//! # max_processes = 4         # Parallel workers (omit for auto = CPU cores)
//! ```
//!
//! ## JSON configs
//!
//! A file ending in `.json` is read as JSON with the same shape. Its keys may
//! be camelCase (`clientId`, `timeoutSecs`) and nulls mean "use the default",
//! so configs written as `{"api": {"host": ..., "clientId": ...}}` keep working.
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("JSON config cannot be represented: {0}")]
    Convert(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Full migration configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrateConfig {
    /// Content store connection.
    pub api: ApiConfig,
    /// Defaults written into every inferred collection schema.
    pub schema: SchemaConfig,
    /// Tree building options.
    pub scan: ScanConfig,
    /// Parallel insertion settings.
    pub processing: ProcessingConfig,
}

impl MigrateConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.host.trim().is_empty() {
            return Err(ConfigError::Validation("api.host must not be empty".into()));
        }
        if self.api.port == 0 {
            return Err(ConfigError::Validation("api.port must be non-zero".into()));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "api.timeout_secs must be non-zero".into(),
            ));
        }
        if !self.api.media_path.starts_with('/') {
            return Err(ConfigError::Validation(
                "api.media_path must start with '/'".into(),
            ));
        }
        if self.schema.media_collection.is_empty() {
            return Err(ConfigError::Validation(
                "schema.media_collection must not be empty".into(),
            ));
        }
        if self.schema.page_size == 0 {
            return Err(ConfigError::Validation(
                "schema.page_size must be non-zero".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Content store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub secret: String,
    pub version: String,
    pub database: String,
    pub media_path: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".into(),
            port: 3000,
            client_id: String::new(),
            secret: String::new(),
            version: "1.0".into(),
            database: "library".into(),
            media_path: "/media".into(),
            timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    /// `host:port` with any trailing slash removed from the host.
    pub fn base_url(&self) -> String {
        format!("{}:{}", self.host.trim_end_matches('/'), self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Defaults for inferred collection schemas.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaConfig {
    /// Collection that `images` reference fields point at.
    pub media_collection: String,
    /// Strings longer than this many characters are marked multiline.
    pub multiline_threshold: usize,
    pub cache_ttl: u32,
    pub page_size: u32,
    pub publish_group: String,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            media_collection: "mediaStore".into(),
            multiline_threshold: 200,
            cache_ttl: 300,
            page_size: 50,
            publish_group: "Main".into(),
        }
    }
}

/// Tree building options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// Keep only pages whose directory path contains this substring.
    pub page_key: Option<String>,
    /// Add each page's `uid` and `url` to its record and schema.
    pub include_page_meta: bool,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel insertion workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(MigrateConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value. JSON files are converted.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        let json: serde_json::Value = serde_json::from_str(&content)?;
        Ok(toml::Value::try_from(normalize_json(json))?)
    } else {
        Ok(toml::from_str(&content)?)
    }
}

/// Snake-case object keys and drop nulls (TOML has none).
fn normalize_json(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (snake_case(&k), normalize_json(v)))
                .collect(),
        ),
        other => other,
    }
}

fn snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, c) in key.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Load the config at `path`, merged over stock defaults and validated.
pub fn load_config(path: &Path) -> Result<MigrateConfig, ConfigError> {
    let merged = merge_toml(stock_defaults_value()?, load_raw_config(path)?);
    let config: MigrateConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock config with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# kirby-migrate configuration
# ===========================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Content store connection
# ---------------------------------------------------------------------------
[api]
# Base URL of the store, scheme included.
host = "http://localhost"
port = 3000

# Client credentials exchanged for a bearer token at /token.
client_id = ""
secret = ""

# Records live under /<version>/<database>/<collection>.
version = "1.0"
database = "library"

# Multipart endpoint for image uploads.
media_path = "/media"

# Seconds before a store call is abandoned and reported as timed out.
timeout_secs = 30

# ---------------------------------------------------------------------------
# Inferred collection schemas
# ---------------------------------------------------------------------------
[schema]
# Collection that `images` reference fields point at.
media_collection = "mediaStore"

# Strings longer than this many characters get a multiline editor.
multiline_threshold = 200

# Collection settings written into every schema.
cache_ttl = 300
page_size = 50
publish_group = "Main"

# ---------------------------------------------------------------------------
# Scanning
# ---------------------------------------------------------------------------
[scan]
# Only migrate pages whose directory path contains this substring.
# page_key = "blog"

# Add each page's `uid` and `url` to its record.
include_page_meta = false

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel insertion workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
