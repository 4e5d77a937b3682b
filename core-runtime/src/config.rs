//! # Core Configuration Module
//!
//! Provides configuration management for the sync engine.
//!
//! ## Overview
//!
//! Configuration is loaded from a YAML (or JSON) file into an [`AppConfig`],
//! optionally overridden from the environment, validated fail-fast, and then
//! frozen into a [`SyncSettings`] value. The engine never reads global state:
//! every pass is constructed from its own `SyncSettings`, so running with new
//! settings means building a new coordinator.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::AppConfig;
//!
//! let mut config = AppConfig::from_file("notion-sync.yml")?;
//! config.apply_env_overrides();
//! config.validate()?;
//!
//! let settings = config.sync_settings()?;
//! ```
//!
//! ## File format
//!
//! ```yaml
//! notion_secret: secret_xxx        # or NOTION_SECRET
//! database_id: 0123abcd            # or NOTION_DATABASE_ID
//! migrate_image: true
//! picgo:
//!   server_url: http://127.0.0.1:36677
//!   skip_prefixes: ["https://cdn.example.com/"]
//! status:
//!   name: status
//!   unpublish: unpublish
//!   published: published
//! output_dir:
//!   page: source
//!   post: source/_posts
//!   clean_unpublished_post: true
//! timezone: Asia/Shanghai
//! last_sync_datetime: "2023-09-01T00:00:00Z"
//! keys_to_keep: [abbrlink]
//! logging:
//!   level: info
//!   format: compact
//! ```

use crate::error::{Error, Result};
use crate::logging::{redact_if_sensitive, LogFormat, LoggingConfig};
use bridge_traits::logging::LogLevel;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding [`AppConfig::notion_secret`]
pub const ENV_NOTION_SECRET: &str = "NOTION_SECRET";

/// Environment variable overriding [`AppConfig::database_id`]
pub const ENV_DATABASE_ID: &str = "NOTION_DATABASE_ID";

const DEFAULT_TIMEZONE: &str = "Asia/Shanghai";

/// User-facing configuration, as read from the configuration file.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Integration token used to authenticate against the Notion API
    #[serde(default)]
    pub notion_secret: String,

    /// Database holding the records to publish
    #[serde(default)]
    pub database_id: String,

    /// Re-host embedded images and external covers
    #[serde(default = "default_true")]
    pub migrate_image: bool,

    /// Upload server used when `migrate_image` is enabled
    #[serde(default)]
    pub picgo: Option<PicGoSettings>,

    pub status: StatusSettings,

    pub output_dir: OutputDirs,

    /// IANA timezone used to format dates in artifact headers
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Incremental watermark; only records edited after it are converted
    #[serde(default, deserialize_with = "deserialize_watermark")]
    pub last_sync_datetime: Option<String>,

    /// Header keys copied back to the remote record when it lacks them
    #[serde(default)]
    pub keys_to_keep: Vec<String>,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field(
                "notion_secret",
                &redact_if_sensitive("notion_secret", &self.notion_secret),
            )
            .field("database_id", &self.database_id)
            .field("migrate_image", &self.migrate_image)
            .field("picgo", &self.picgo)
            .field("status", &self.status)
            .field("output_dir", &self.output_dir)
            .field("timezone", &self.timezone)
            .field("last_sync_datetime", &self.last_sync_datetime)
            .field("keys_to_keep", &self.keys_to_keep)
            .field("logging", &self.logging)
            .finish()
    }
}

/// Publication status property and its lifecycle values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSettings {
    /// Name of the status property
    pub name: String,

    /// Value marking a record as waiting to be published
    pub unpublish: String,

    /// Value marking a record as published
    pub published: String,

    /// Also fetch records in the `unpublish` state and flip them to
    /// `published` remotely before converting them.
    #[serde(default)]
    pub publish_pending: bool,
}

/// Output locations for the two artifact kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDirs {
    /// Root for `page` records (`<page>/<filename>/index.md`)
    pub page: PathBuf,

    /// Root for `post` records (`<post>/<filename>.md`)
    pub post: PathBuf,

    /// Delete local posts whose record is gone or renamed
    #[serde(default = "default_true")]
    pub clean_unpublished_post: bool,
}

/// PicGo-compatible upload server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PicGoSettings {
    /// Base URL of the server, e.g. `http://127.0.0.1:36677`
    pub server_url: String,

    /// URL prefixes that are already re-hosted and must not be uploaded again
    #[serde(default)]
    pub skip_prefixes: Vec<String>,
}

/// Logging section of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `pretty`, `json` or `compact`; build-profile default when absent
    #[serde(default)]
    pub format: Option<String>,

    /// Raw `EnvFilter` directive string, overrides `level` when set
    #[serde(default)]
    pub filter: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
            filter: None,
        }
    }
}

impl LoggingSettings {
    /// Translate into the logging subsystem's configuration.
    pub fn to_logging_config(&self) -> Result<LoggingConfig> {
        let mut config = LoggingConfig::default().with_level(parse_log_level(&self.level)?);

        if let Some(format) = &self.format {
            config = config.with_format(parse_log_format(format)?);
        }

        if let Some(filter) = &self.filter {
            config = config.with_filter(filter.clone());
        }

        Ok(config)
    }
}

/// Parse a log level name (`trace` .. `error`, case-insensitive).
pub fn parse_log_level(value: &str) -> Result<LogLevel> {
    match value.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(LogLevel::Trace),
        "debug" => Ok(LogLevel::Debug),
        "info" => Ok(LogLevel::Info),
        "warn" | "warning" => Ok(LogLevel::Warn),
        "error" => Ok(LogLevel::Error),
        other => Err(Error::Config(format!(
            "Unknown log level '{}'. Expected one of: trace, debug, info, warn, error",
            other
        ))),
    }
}

fn parse_log_format(value: &str) -> Result<LogFormat> {
    match value.trim().to_ascii_lowercase().as_str() {
        "pretty" => Ok(LogFormat::Pretty),
        "json" => Ok(LogFormat::Json),
        "compact" => Ok(LogFormat::Compact),
        other => Err(Error::Config(format!(
            "Unknown log format '{}'. Expected one of: pretty, json, compact",
            other
        ))),
    }
}

fn default_true() -> bool {
    true
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Accepts a timestamp string, an epoch-milliseconds number, or nothing.
///
/// `0`, `null` and the empty string all mean "no watermark".
fn deserialize_watermark<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Millis(i64),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None | Some(Raw::Millis(0)) => Ok(None),
        Some(Raw::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Raw::Text(text)) => Ok(Some(text)),
        Some(Raw::Millis(millis)) => Ok(Some(
            DateTime::<Utc>::from_timestamp_millis(millis)
                .map(|dt| dt.to_rfc3339())
                .unwrap_or_else(|| millis.to_string()),
        )),
    }
}

impl AppConfig {
    /// Load configuration from a YAML or JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        Self::from_yaml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse configuration text. JSON documents are valid YAML and parse too.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid configuration: {}", e)))
    }

    /// Override credentials from `NOTION_SECRET` / `NOTION_DATABASE_ID`.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup(ENV_NOTION_SECRET).filter(|v| !v.is_empty()) {
            self.notion_secret = secret;
        }
        if let Some(database_id) = lookup(ENV_DATABASE_ID).filter(|v| !v.is_empty()) {
            self.database_id = database_id;
        }
    }

    /// Validates the configuration.
    ///
    /// The incremental watermark is not checked here. An invalid value is
    /// reported when a pass runs and yields an empty incremental set.
    pub fn validate(&self) -> Result<()> {
        if self.notion_secret.trim().is_empty() {
            return Err(Error::Config(format!(
                "notion_secret is required. Set it in the configuration file or via {}",
                ENV_NOTION_SECRET
            )));
        }

        if self.database_id.trim().is_empty() {
            return Err(Error::Config(format!(
                "database_id is required. Set it in the configuration file or via {}",
                ENV_DATABASE_ID
            )));
        }

        if self.status.name.trim().is_empty() {
            return Err(Error::Config(
                "status.name must name the database's status property".to_string(),
            ));
        }

        if self.status.published.trim().is_empty() || self.status.unpublish.trim().is_empty() {
            return Err(Error::Config(
                "status.published and status.unpublish must both be set".to_string(),
            ));
        }

        if self.output_dir.page.as_os_str().is_empty()
            || self.output_dir.post.as_os_str().is_empty()
        {
            return Err(Error::Config(
                "output_dir.page and output_dir.post must both be set".to_string(),
            ));
        }

        if self.migrate_image && self.picgo.is_none() {
            return Err(Error::CapabilityMissing {
                capability: "picgo".to_string(),
                message: "migrate_image is enabled but no picgo.server_url is configured. \
                          Add a picgo section or set migrate_image: false"
                    .to_string(),
            });
        }

        if let Some(picgo) = &self.picgo {
            if !picgo.server_url.starts_with("http://") && !picgo.server_url.starts_with("https://")
            {
                return Err(Error::Config(format!(
                    "picgo.server_url must be an http(s) URL, got '{}'",
                    picgo.server_url
                )));
            }
        }

        self.parse_timezone()?;
        self.logging.to_logging_config()?;

        Ok(())
    }

    fn parse_timezone(&self) -> Result<Tz> {
        self.timezone.parse::<Tz>().map_err(|e| {
            Error::Config(format!(
                "Unknown timezone '{}': {}. Use an IANA name such as Asia/Shanghai",
                self.timezone, e
            ))
        })
    }

    /// Freeze the configuration into the settings value consumed by a pass.
    pub fn sync_settings(&self) -> Result<SyncSettings> {
        let timezone = self.parse_timezone()?;

        Ok(SyncSettings {
            database_id: self.database_id.clone(),
            status: self.status.clone(),
            output: self.output_dir.clone(),
            timezone,
            watermark: self.last_sync_datetime.clone(),
            keys_to_keep: self.keys_to_keep.clone(),
            migrate_image: self.migrate_image,
            skip_prefixes: self
                .picgo
                .as_ref()
                .map(|p| p.skip_prefixes.clone())
                .unwrap_or_default(),
        })
    }
}

/// Immutable settings for one sync pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSettings {
    pub database_id: String,
    pub status: StatusSettings,
    pub output: OutputDirs,
    pub timezone: Tz,
    /// Raw watermark text; parsed (and reported if invalid) per pass
    pub watermark: Option<String>,
    pub keys_to_keep: Vec<String>,
    pub migrate_image: bool,
    /// Asset URL prefixes that count as already re-hosted
    pub skip_prefixes: Vec<String>,
}

impl SyncSettings {
    /// Settings with the default timezone, no watermark and no keep-keys.
    pub fn new(
        database_id: impl Into<String>,
        status: StatusSettings,
        output: OutputDirs,
    ) -> Self {
        Self {
            database_id: database_id.into(),
            status,
            output,
            timezone: chrono_tz::Asia::Shanghai,
            watermark: None,
            keys_to_keep: Vec::new(),
            migrate_image: false,
            skip_prefixes: Vec::new(),
        }
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn with_watermark(mut self, watermark: impl Into<String>) -> Self {
        self.watermark = Some(watermark.into());
        self
    }

    pub fn with_keys_to_keep(mut self, keys: Vec<String>) -> Self {
        self.keys_to_keep = keys;
        self
    }

    pub fn with_image_migration(mut self, enabled: bool) -> Self {
        self.migrate_image = enabled;
        self
    }

    pub fn with_skip_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.skip_prefixes = prefixes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const MINIMAL: &str = r#"
notion_secret: secret_abc
database_id: db123
migrate_image: false
status:
  name: status
  unpublish: unpublish
  published: published
output_dir:
  page: source
  post: source/_posts
"#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = AppConfig::from_yaml_str(MINIMAL).unwrap();

        assert_eq!(config.timezone, "Asia/Shanghai");
        assert!(config.output_dir.clean_unpublished_post);
        assert!(!config.status.publish_pending);
        assert!(config.keys_to_keep.is_empty());
        assert!(config.last_sync_datetime.is_none());
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
notion_secret: secret_abc
database_id: db123
picgo:
  server_url: http://127.0.0.1:36677
  skip_prefixes: ["https://cdn.example.com/"]
status:
  name: status
  unpublish: draft
  published: live
  publish_pending: true
output_dir:
  page: out/pages
  post: out/posts
  clean_unpublished_post: false
timezone: Europe/Berlin
last_sync_datetime: "2023-09-01T00:00:00Z"
keys_to_keep: [abbrlink, slug]
logging:
  level: debug
  format: json
"#;
        let config = AppConfig::from_yaml_str(yaml).unwrap();
        config.validate().unwrap();

        let settings = config.sync_settings().unwrap();
        assert_eq!(settings.timezone, chrono_tz::Europe::Berlin);
        assert_eq!(settings.watermark.as_deref(), Some("2023-09-01T00:00:00Z"));
        assert_eq!(settings.keys_to_keep, vec!["abbrlink", "slug"]);
        assert_eq!(settings.skip_prefixes, vec!["https://cdn.example.com/"]);
        assert!(settings.migrate_image);
        assert!(settings.status.publish_pending);
        assert!(!settings.output.clean_unpublished_post);

        let logging = config.logging.to_logging_config().unwrap();
        assert_eq!(logging.level, LogLevel::Debug);
        assert_eq!(logging.format, LogFormat::Json);
    }

    #[test]
    fn test_json_config_parses() {
        let json = r#"{
            "notion_secret": "s", "database_id": "d", "migrate_image": false,
            "status": {"name": "status", "unpublish": "u", "published": "p"},
            "output_dir": {"page": "a", "post": "b"}
        }"#;
        assert!(AppConfig::from_yaml_str(json).unwrap().validate().is_ok());
    }

    #[test]
    fn test_watermark_zero_means_none() {
        let yaml = format!("{}last_sync_datetime: 0\n", MINIMAL);
        let config = AppConfig::from_yaml_str(&yaml).unwrap();
        assert!(config.last_sync_datetime.is_none());
    }

    #[test]
    fn test_watermark_millis() {
        let yaml = format!("{}last_sync_datetime: 1693526400000\n", MINIMAL);
        let config = AppConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(
            config.last_sync_datetime.as_deref(),
            Some("2023-09-01T00:00:00+00:00")
        );
    }

    #[test]
    fn test_invalid_watermark_passes_validation() {
        let yaml = format!("{}last_sync_datetime: not-a-date\n", MINIMAL);
        let config = AppConfig::from_yaml_str(&yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.sync_settings().unwrap().watermark.as_deref(),
            Some("not-a-date")
        );
    }

    #[test]
    fn test_validate_requires_secret() {
        let mut config = AppConfig::from_yaml_str(MINIMAL).unwrap();
        config.notion_secret.clear();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("NOTION_SECRET"));
    }

    #[test]
    fn test_validate_requires_database_id() {
        let mut config = AppConfig::from_yaml_str(MINIMAL).unwrap();
        config.database_id = "  ".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("NOTION_DATABASE_ID"));
    }

    #[test]
    fn test_validate_rejects_unknown_timezone() {
        let mut config = AppConfig::from_yaml_str(MINIMAL).unwrap();
        config.timezone = "Mars/Olympus".to_string();

        assert!(matches!(config.validate(), Err(Error::Config(_))));
        assert!(config.sync_settings().is_err());
    }

    #[test]
    fn test_validate_image_migration_requires_uploader() {
        let mut config = AppConfig::from_yaml_str(MINIMAL).unwrap();
        config.migrate_image = true;

        match config.validate() {
            Err(Error::CapabilityMissing { capability, .. }) => assert_eq!(capability, "picgo"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_empty_status_values() {
        let mut config = AppConfig::from_yaml_str(MINIMAL).unwrap();
        config.status.published.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_log_level() {
        let mut config = AppConfig::from_yaml_str(MINIMAL).unwrap();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::from_yaml_str(MINIMAL).unwrap();
        let env: HashMap<&str, &str> = [
            (ENV_NOTION_SECRET, "secret_from_env"),
            (ENV_DATABASE_ID, ""),
        ]
        .into_iter()
        .collect();

        config.apply_overrides_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.notion_secret, "secret_from_env");
        // Empty values do not clobber the file's value
        assert_eq!(config.database_id, "db123");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = AppConfig::from_yaml_str(MINIMAL).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret_abc"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.database_id, "db123");

        let missing = AppConfig::from_file(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(Error::Io { .. })));
    }

    #[test]
    fn test_sync_settings_builder() {
        let settings = SyncSettings::new(
            "db",
            StatusSettings {
                name: "status".to_string(),
                unpublish: "unpublish".to_string(),
                published: "published".to_string(),
                publish_pending: false,
            },
            OutputDirs {
                page: PathBuf::from("pages"),
                post: PathBuf::from("posts"),
                clean_unpublished_post: true,
            },
        )
        .with_timezone(chrono_tz::UTC)
        .with_keys_to_keep(vec!["abbrlink".to_string()]);

        assert_eq!(settings.timezone, chrono_tz::UTC);
        assert_eq!(settings.keys_to_keep, vec!["abbrlink"]);
        assert!(!settings.migrate_image);
    }
}
