//! Layered settings
//!
//! Every layer is a [`FileConfig`] of optional values. Layers are merged,
//! then resolved into an [`AppConfig`] with defaults applied and the
//! directory settings validated.

use serde::Deserialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use adbook_directory::config::{GC_PORT, GC_TLS_PORT};
use adbook_directory::GlobalCatalogConfig;
use adbook_export::{ExportOptions, DEFAULT_SETTLE_DELAY};

use super::{ConfigError, StoreKind};

/// Prefix of every environment variable read by the CLI.
pub const ENV_PREFIX: &str = "ADBOOK_";

/// One layer of optional settings.
///
/// Field names match the JSON config file keys (camelCase).
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileConfig {
    pub server: Option<String>,
    pub port: Option<u16>,
    pub use_tls: Option<bool>,
    pub base_dn: Option<String>,
    pub principal: Option<String>,
    pub domain: Option<String>,
    pub secret: Option<String>,
    pub filter: Option<String>,
    pub attributes: Option<Vec<String>>,
    pub page_size: Option<u32>,
    pub connect_timeout_secs: Option<u64>,
    pub output_dir: Option<PathBuf>,
    pub store: Option<StoreKind>,
    pub settle_delay_ms: Option<u64>,
}

impl FileConfig {
    /// Read a JSON config file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Read `ADBOOK_*` variables through `lookup`. Empty values count as unset.
    pub fn from_env<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(&format!("{ENV_PREFIX}{key}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Ok(Self {
            server: get("SERVER"),
            port: parse(&get, "PORT")?,
            use_tls: get("USE_TLS")
                .map(|v| parse_bool("USE_TLS", &v))
                .transpose()?,
            base_dn: get("BASE_DN"),
            principal: get("PRINCIPAL"),
            domain: get("DOMAIN"),
            secret: get("SECRET"),
            filter: get("FILTER"),
            attributes: get("ATTRIBUTES").map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(String::from)
                    .collect()
            }),
            page_size: parse(&get, "PAGE_SIZE")?,
            connect_timeout_secs: parse(&get, "CONNECT_TIMEOUT_SECS")?,
            output_dir: get("OUTPUT_DIR").map(PathBuf::from),
            store: parse(&get, "STORE")?,
            settle_delay_ms: parse(&get, "SETTLE_DELAY_MS")?,
        })
    }

    /// Layer `over` on top of `self`; values set in `over` win.
    #[must_use]
    pub fn merge(self, over: FileConfig) -> FileConfig {
        FileConfig {
            server: over.server.or(self.server),
            port: over.port.or(self.port),
            use_tls: over.use_tls.or(self.use_tls),
            base_dn: over.base_dn.or(self.base_dn),
            principal: over.principal.or(self.principal),
            domain: over.domain.or(self.domain),
            secret: over.secret.or(self.secret),
            filter: over.filter.or(self.filter),
            attributes: over.attributes.or(self.attributes),
            page_size: over.page_size.or(self.page_size),
            connect_timeout_secs: over.connect_timeout_secs.or(self.connect_timeout_secs),
            output_dir: over.output_dir.or(self.output_dir),
            store: over.store.or(self.store),
            settle_delay_ms: over.settle_delay_ms.or(self.settle_delay_ms),
        }
    }

    /// Apply defaults and validate.
    pub fn resolve(self) -> Result<AppConfig, ConfigError> {
        let server = self.server.ok_or(ConfigError::Missing {
            key: "server",
            env: "ADBOOK_SERVER",
        })?;
        let principal = self.principal.ok_or(ConfigError::Missing {
            key: "principal",
            env: "ADBOOK_PRINCIPAL",
        })?;
        let secret = self.secret.ok_or(ConfigError::Missing {
            key: "secret",
            env: "ADBOOK_SECRET",
        })?;

        let mut directory =
            GlobalCatalogConfig::new(server, principal, self.domain.unwrap_or_default())
                .with_password(secret);
        if self.use_tls.unwrap_or(false) {
            directory = directory.with_tls();
        }
        directory.port = self.port.unwrap_or(if directory.use_tls {
            GC_TLS_PORT
        } else {
            GC_PORT
        });
        if let Some(base_dn) = self.base_dn {
            directory.base_dn = base_dn;
        }
        if let Some(filter) = self.filter {
            directory.filter = filter;
        }
        if let Some(attributes) = self.attributes {
            directory.attributes = attributes;
        }
        if let Some(page_size) = self.page_size {
            directory.page_size = page_size;
        }
        if let Some(timeout) = self.connect_timeout_secs {
            directory.connect_timeout_secs = timeout;
        }
        directory.validate()?;

        let export = ExportSettings {
            output_dir: self.output_dir.unwrap_or_else(|| PathBuf::from(".")),
            store: self.store.unwrap_or_default(),
            settle_delay: self
                .settle_delay_ms
                .map_or(DEFAULT_SETTLE_DELAY, Duration::from_millis),
        };

        Ok(AppConfig { directory, export })
    }
}

fn parse<T, F>(get: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|v| {
            v.parse::<T>().map_err(|e| ConfigError::InvalidValue {
                var: format!("{ENV_PREFIX}{key}"),
                message: e.to_string(),
            })
        })
        .transpose()
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var: format!("{ENV_PREFIX}{key}"),
            message: format!("expected true or false, got '{value}'"),
        }),
    }
}

/// Where and how the contact store is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    pub output_dir: PathBuf,
    pub store: StoreKind,
    pub settle_delay: Duration,
}

impl ExportSettings {
    /// Exporter options for these settings.
    #[must_use]
    pub fn options(&self) -> ExportOptions {
        ExportOptions::default()
            .with_output_dir(&self.output_dir)
            .with_settle_delay(self.settle_delay)
    }
}

/// Fully resolved CLI configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub directory: GlobalCatalogConfig,
    pub export: ExportSettings,
}

impl AppConfig {
    /// Load from an optional config file, the process environment and `.env`,
    /// with `overrides` (command-line flags) on top.
    pub fn load(file: Option<&Path>, overrides: FileConfig) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "Loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => {
                return Err(ConfigError::InvalidValue {
                    var: ".env".to_string(),
                    message: e.to_string(),
                })
            }
        }

        Self::from_sources(file, |key| std::env::var(key).ok(), overrides)
    }

    /// Load with an explicit environment lookup.
    pub fn from_sources<F>(
        file: Option<&Path>,
        lookup: F,
        overrides: FileConfig,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = match file {
            Some(path) => FileConfig::from_path(path)?,
            None => FileConfig::default(),
        };

        let config = base
            .merge(FileConfig::from_env(lookup)?)
            .merge(overrides)
            .resolve()?;

        debug!(
            directory = ?config.directory.redacted(),
            store = %config.export.store,
            output_dir = %config.export.output_dir.display(),
            "Configuration loaded"
        );
        Ok(config)
    }
}
