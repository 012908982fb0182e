//! Configuration loading.
//!
//! Settings come from three layers, later layers winning key by key:
//!
//! ```text
//! stock defaults  →  config file  →  TELEPRESS_* environment variables
//! ```
//!
//! ## Config File Location
//!
//! The first of these is used:
//!
//! 1. the `--config` path given on the command line
//! 2. the path in `TELEPRESS_CONFIG`
//! 3. `~/.telepress.toml`
//! 4. `~/.config/telepress.toml`
//!
//! Paths from (1) and (2) must exist. The home-directory files are optional.
//!
//! ## Environment Overrides
//!
//! | Variable | Key |
//! |---|---|
//! | `TELEPRESS_TOKEN` | `telegraph.access_token` |
//! | `TELEPRESS_AUTHOR` | `telegraph.author_name` |
//! | `TELEPRESS_IMAGE_HOST_TYPE` | `image_host.type` |
//! | `TELEPRESS_IMAGE_HOST_<KEY>` | `image_host.<key>` |
//!
//! ## Configuration Options
//!
//! See [`stock_config_toml`] (also printed by `telepress gen-config`).
//! Unknown keys are rejected to catch typos early.

use crate::cache::{FileCacheStore, default_cache_path};
use crate::host::HostConfig;
use crate::imaging::{OutputCodec, Quality};
use crate::upload::UploadOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_ENV: &str = "TELEPRESS_CONFIG";
const ENV_PREFIX: &str = "TELEPRESS_";
const HOST_ENV_PREFIX: &str = "TELEPRESS_IMAGE_HOST_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Everything telepress can be configured with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelepressConfig {
    pub telegraph: TelegraphConfig,
    pub publish: PublishConfig,
    pub upload: UploadConfig,
    /// Where images are uploaded. Required only for image and gallery
    /// publishing.
    pub image_host: Option<HostConfig>,
}

impl TelepressConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg: &str| Err(ConfigError::Validation(msg.to_string()));
        if self.publish.chunk_size == 0 {
            return fail("publish.chunk_size must be at least 1");
        }
        if self.publish.images_per_page == 0 {
            return fail("publish.images_per_page must be at least 1");
        }
        let up = &self.upload;
        if up.retries == 0 {
            return fail("upload.retries must be at least 1");
        }
        if up.max_workers == 0 {
            return fail("upload.max_workers must be at least 1");
        }
        if up.max_size_mb == 0 {
            return fail("upload.max_size_mb must be at least 1");
        }
        if !(1..=100).contains(&up.min_quality) {
            return fail("upload.min_quality must be 1-100");
        }
        if !(up.min_scale > 0.0 && up.min_scale <= 1.0) {
            return fail("upload.min_scale must be in (0, 1]");
        }
        if !(up.retry_delay_secs.is_finite() && up.retry_delay_secs >= 0.0) {
            return fail("upload.retry_delay_secs must be a non-negative number");
        }
        if !(up.max_retry_delay_secs.is_finite() && up.max_retry_delay_secs >= up.retry_delay_secs)
        {
            return fail("upload.max_retry_delay_secs must be at least upload.retry_delay_secs");
        }
        Ok(())
    }

    /// The Telegraph access token, or a message saying where to set one.
    pub fn access_token(&self) -> Result<&str, ConfigError> {
        self.telegraph
            .access_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::Validation(
                    "no Telegraph access token. Set TELEPRESS_TOKEN or telegraph.access_token"
                        .to_string(),
                )
            })
    }

    /// The configured image host, or a message listing the choices.
    pub fn image_host(&self) -> Result<&HostConfig, ConfigError> {
        self.image_host.as_ref().ok_or_else(|| {
            ConfigError::Validation(format!(
                "no image host configured. Add an [image_host] section with type = {}",
                HostConfig::NAMES.join(" | ")
            ))
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelegraphConfig {
    pub access_token: Option<String>,
    pub author_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublishConfig {
    /// Text bytes per page.
    pub chunk_size: usize,
    pub images_per_page: usize,
    /// Reuse the URL of an identical earlier text publish.
    pub skip_duplicate: bool,
    /// Defaults to `~/.telepress_cache.json`.
    pub cache_path: Option<PathBuf>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            chunk_size: crate::publish::DEFAULT_CHUNK_SIZE,
            images_per_page: crate::publish::DEFAULT_IMAGES_PER_PAGE,
            skip_duplicate: true,
            cache_path: None,
        }
    }
}

impl PublishConfig {
    /// The cache store to use, or `None` when duplicate detection is off or
    /// no location is known.
    pub fn cache_store(&self) -> Option<FileCacheStore> {
        if !self.skip_duplicate {
            return None;
        }
        self.cache_path
            .clone()
            .or_else(default_cache_path)
            .map(FileCacheStore::new)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    pub retries: u32,
    pub auto_compress: bool,
    pub max_size_mb: u64,
    pub max_workers: usize,
    pub retry_delay_secs: f64,
    pub max_retry_delay_secs: f64,
    pub codec: OutputCodec,
    pub min_quality: u32,
    pub min_scale: f32,
}

impl Default for UploadConfig {
    fn default() -> Self {
        let options = UploadOptions::default();
        Self {
            retries: options.retries,
            auto_compress: options.auto_compress,
            max_size_mb: options.max_size / (1024 * 1024),
            max_workers: options.max_workers,
            retry_delay_secs: options.retry_delay.as_secs_f64(),
            max_retry_delay_secs: options.max_retry_delay.as_secs_f64(),
            codec: options.codec,
            min_quality: options.min_quality.value(),
            min_scale: options.min_scale,
        }
    }
}

impl UploadConfig {
    pub fn to_options(&self) -> UploadOptions {
        UploadOptions {
            retries: self.retries,
            auto_compress: self.auto_compress,
            max_size: self.max_size_mb * 1024 * 1024,
            retry_delay: Duration::from_secs_f64(self.retry_delay_secs),
            max_retry_delay: Duration::from_secs_f64(self.max_retry_delay_secs),
            max_workers: self.max_workers,
            codec: self.codec,
            min_quality: Quality::new(self.min_quality),
            min_scale: self.min_scale,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(TelepressConfig::default())?)
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

/// Pick the config file to read.
///
/// `explicit` and `from_env` are returned as-is when given; home-directory
/// candidates only when the file exists.
pub fn locate_config(
    explicit: Option<&Path>,
    from_env: Option<PathBuf>,
    home: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = from_env.filter(|p| !p.as_os_str().is_empty()) {
        return Some(path);
    }
    let home = home?;
    [
        home.join(".telepress.toml"),
        home.join(".config").join("telepress.toml"),
    ]
    .into_iter()
    .find(|p| p.is_file())
}

/// Read a config file as a raw TOML value.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Build the overlay contributed by `TELEPRESS_*` variables.
///
/// Returns `None` when no relevant variable is set.
pub fn env_overlay<I>(vars: I) -> Option<toml::Value>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut telegraph = toml::Table::new();
    let mut host = toml::Table::new();

    for (key, value) in vars {
        if !key.starts_with(ENV_PREFIX) || key == CONFIG_ENV {
            continue;
        }
        if let Some(field) = key.strip_prefix(HOST_ENV_PREFIX) {
            if !field.is_empty() {
                host.insert(field.to_ascii_lowercase(), toml::Value::String(value));
            }
            continue;
        }
        match &key[ENV_PREFIX.len()..] {
            "TOKEN" => {
                telegraph.insert("access_token".into(), toml::Value::String(value));
            }
            "AUTHOR" => {
                telegraph.insert("author_name".into(), toml::Value::String(value));
            }
            other => tracing::debug!(variable = other, "ignoring unknown TELEPRESS_ variable"),
        }
    }

    let mut root = toml::Table::new();
    if !telegraph.is_empty() {
        root.insert("telegraph".into(), toml::Value::Table(telegraph));
    }
    if !host.is_empty() {
        root.insert("image_host".into(), toml::Value::Table(host));
    }
    (!root.is_empty()).then_some(toml::Value::Table(root))
}

/// Merge overlays onto the stock defaults in order, then deserialize and
/// validate.
pub fn resolve_config(
    overlays: impl IntoIterator<Item = toml::Value>,
) -> Result<TelepressConfig, ConfigError> {
    let merged = overlays
        .into_iter()
        .fold(stock_defaults_value()?, merge_toml);
    let config: TelepressConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the effective configuration from the process environment.
pub fn load_config(explicit: Option<&Path>) -> Result<TelepressConfig, ConfigError> {
    let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
    let home = dirs::home_dir();

    let mut overlays = Vec::new();
    if let Some(path) = locate_config(explicit, from_env, home.as_deref()) {
        tracing::debug!(path = %path.display(), "loading config");
        overlays.push(load_raw_config(&path)?);
    }
    overlays.extend(env_overlay(std::env::vars()));
    resolve_config(overlays)
}

/// Returns a fully-commented stock config file with all keys and
/// explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# telepress configuration
# =======================
# All settings are optional. Values shown below are the defaults.
# Save as ~/.telepress.toml or ~/.config/telepress.toml, or point
# TELEPRESS_CONFIG / --config at it. Unknown keys are an error.

# ---------------------------------------------------------------------------
# Telegraph account
# ---------------------------------------------------------------------------
[telegraph]
# Required for publishing. TELEPRESS_TOKEN overrides this.
# access_token = ""

# Shown under the page title. TELEPRESS_AUTHOR overrides this.
# author_name = ""

# ---------------------------------------------------------------------------
# Publishing
# ---------------------------------------------------------------------------
[publish]
# Text bytes per page. Long documents are split into linked pages.
chunk_size = 10000

# Images per gallery page.
images_per_page = 100

# Return the earlier URL when the same text and title were published before.
skip_duplicate = true

# Where published fingerprints are remembered.
# Defaults to ~/.telepress_cache.json.
# cache_path = "/path/to/cache.json"

# ---------------------------------------------------------------------------
# Image uploads
# ---------------------------------------------------------------------------
[upload]
# Attempts per image before giving up.
retries = 3

# Shrink images larger than max_size_mb before uploading.
auto_compress = true
max_size_mb = 5

# Parallel uploads.
max_workers = 4

# Backoff between attempts: doubles from retry_delay_secs, capped at
# max_retry_delay_secs, plus up to 10% jitter.
retry_delay_secs = 1.0
max_retry_delay_secs = 30.0

# Encoding for compressed images: "jpeg" or "webp" (lossless, scale only).
codec = "jpeg"

# How far compression may degrade an image.
min_quality = 30
min_scale = 0.3

# ---------------------------------------------------------------------------
# Image host (required for images and galleries)
# ---------------------------------------------------------------------------
# Copy into a directory served by a web server:
#
# [image_host]
# type = "directory"
# path = "/var/www/img"
# public_url = "https://example.com/img"
#
# Upload with rclone (must be on PATH):
#
# [image_host]
# type = "rclone"
# remote_path = "r2:bucket/img"
# public_url = "https://img.example.com"
#
# Any HTTP endpoint that accepts a multipart upload and answers with JSON:
#
# [image_host]
# type = "custom"
# upload_url = "https://host.example/api/upload"
# file_field = "file"
# response_url_path = "data.url"
# [image_host.headers]
# Authorization = "Bearer ..."
# [image_host.extra_data]
# album = "telepress"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn parse(toml: &str) -> toml::Value {
        toml::from_str(toml).unwrap()
    }

    // =========================================================================
    // Defaults and parsing
    // =========================================================================

    #[test]
    fn defaults() {
        let config = TelepressConfig::default();
        assert_eq!(config.publish.chunk_size, 10_000);
        assert_eq!(config.publish.images_per_page, 100);
        assert!(config.publish.skip_duplicate);
        assert_eq!(config.upload.retries, 3);
        assert_eq!(config.upload.max_size_mb, 5);
        assert_eq!(config.upload.codec, OutputCodec::Jpeg);
        assert!(config.image_host.is_none());
        assert!(config.telegraph.access_token.is_none());
    }

    #[test]
    fn upload_config_maps_to_options() {
        let options = UploadConfig::default().to_options();
        assert_eq!(options, UploadOptions::default());

        let custom = UploadConfig {
            max_size_mb: 2,
            retry_delay_secs: 0.5,
            min_quality: 150,
            ..UploadConfig::default()
        }
        .to_options();
        assert_eq!(custom.max_size, 2 * 1024 * 1024);
        assert_eq!(custom.retry_delay, Duration::from_millis(500));
        assert_eq!(custom.min_quality.value(), 100);
    }

    #[test]
    fn parse_partial_config() {
        let config = resolve_config([parse("[publish]\nchunk_size = 20000\n")]).unwrap();
        assert_eq!(config.publish.chunk_size, 20_000);
        assert_eq!(config.publish.images_per_page, 100);
        assert_eq!(config.upload.retries, 3);
    }

    #[test]
    fn parse_image_host_section() {
        let config = resolve_config([parse(
            r#"
[image_host]
type = "directory"
path = "/srv/img"
public_url = "https://example.com/img"
"#,
        )])
        .unwrap();
        assert!(matches!(
            config.image_host,
            Some(HostConfig::Directory(ref d)) if d.public_url == "https://example.com/img"
        ));
    }

    #[test]
    fn webp_codec_parses() {
        let config = resolve_config([parse("[upload]\ncodec = \"webp\"\n")]).unwrap();
        assert_eq!(config.upload.codec, OutputCodec::WebP);
    }

    #[test]
    fn unknown_key_rejected() {
        assert!(matches!(
            resolve_config([parse("[publish]\nchunk_sise = 5\n")]),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn unknown_section_rejected() {
        assert!(resolve_config([parse("[imagehost]\ntype = \"directory\"\n")]).is_err());
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(TelepressConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_sizes() {
        for toml in [
            "[publish]\nchunk_size = 0\n",
            "[publish]\nimages_per_page = 0\n",
            "[upload]\nretries = 0\n",
            "[upload]\nmax_workers = 0\n",
            "[upload]\nmax_size_mb = 0\n",
        ] {
            assert!(
                matches!(resolve_config([parse(toml)]), Err(ConfigError::Validation(_))),
                "{toml}"
            );
        }
    }

    #[test]
    fn validate_quality_and_scale() {
        assert!(resolve_config([parse("[upload]\nmin_quality = 100\n")]).is_ok());
        assert!(resolve_config([parse("[upload]\nmin_quality = 101\n")]).is_err());
        assert!(resolve_config([parse("[upload]\nmin_scale = 1.0\n")]).is_ok());
        assert!(resolve_config([parse("[upload]\nmin_scale = 0.0\n")]).is_err());
    }

    #[test]
    fn validate_retry_delays() {
        assert!(
            resolve_config([parse(
                "[upload]\nretry_delay_secs = 10.0\nmax_retry_delay_secs = 5.0\n"
            )])
            .is_err()
        );
        assert!(resolve_config([parse("[upload]\nretry_delay_secs = -1.0\n")]).is_err());
    }

    #[test]
    fn access_token_required() {
        let mut config = TelepressConfig::default();
        assert!(config.access_token().is_err());
        config.telegraph.access_token = Some("  ".into());
        assert!(config.access_token().is_err());
        config.telegraph.access_token = Some("abc".into());
        assert_eq!(config.access_token().unwrap(), "abc");
    }

    #[test]
    fn missing_image_host_lists_choices() {
        let msg = TelepressConfig::default()
            .image_host()
            .unwrap_err()
            .to_string();
        assert!(msg.contains("directory | rclone | custom"), "{msg}");
    }

    // =========================================================================
    // Environment overlay
    // =========================================================================

    #[test]
    fn env_token_and_author() {
        let overlay = env_overlay(vars(&[
            ("TELEPRESS_TOKEN", "tok"),
            ("TELEPRESS_AUTHOR", "Ann"),
        ]))
        .unwrap();
        let config = resolve_config([overlay]).unwrap();
        assert_eq!(config.telegraph.access_token.as_deref(), Some("tok"));
        assert_eq!(config.telegraph.author_name.as_deref(), Some("Ann"));
    }

    #[test]
    fn env_image_host() {
        let overlay = env_overlay(vars(&[
            ("TELEPRESS_IMAGE_HOST_TYPE", "rclone"),
            ("TELEPRESS_IMAGE_HOST_REMOTE_PATH", "r2:bucket"),
            ("TELEPRESS_IMAGE_HOST_PUBLIC_URL", "https://img.example.com"),
        ]))
        .unwrap();
        let config = resolve_config([overlay]).unwrap();
        assert!(matches!(
            config.image_host,
            Some(HostConfig::Rclone(ref r)) if r.remote_path == "r2:bucket"
        ));
    }

    #[test]
    fn unrelated_env_ignored() {
        assert!(env_overlay(vars(&[("PATH", "/bin"), ("TELEPRESS_CONFIG", "/x")])).is_none());
        assert!(env_overlay(vars(&[("TELEPRESS_UNKNOWN", "1")])).is_none());
    }

    #[test]
    fn env_overrides_file() {
        let file = parse("[telegraph]\naccess_token = \"from-file\"\nauthor_name = \"File\"\n");
        let env = env_overlay(vars(&[("TELEPRESS_TOKEN", "from-env")])).unwrap();
        let config = resolve_config([file, env]).unwrap();
        assert_eq!(config.telegraph.access_token.as_deref(), Some("from-env"));
        assert_eq!(config.telegraph.author_name.as_deref(), Some("File"));
    }

    // =========================================================================
    // File lookup
    // =========================================================================

    #[test]
    fn explicit_path_wins() {
        let tmp = TempDir::new().unwrap();
        let explicit = tmp.path().join("mine.toml");
        let found = locate_config(
            Some(&explicit),
            Some(tmp.path().join("env.toml")),
            Some(tmp.path()),
        );
        assert_eq!(found, Some(explicit));
    }

    #[test]
    fn env_path_before_home() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".telepress.toml"), "").unwrap();
        let env = tmp.path().join("env.toml");
        assert_eq!(
            locate_config(None, Some(env.clone()), Some(tmp.path())),
            Some(env)
        );
    }

    #[test]
    fn home_candidates_in_order() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(locate_config(None, None, Some(tmp.path())), None);

        fs::create_dir(tmp.path().join(".config")).unwrap();
        let xdg = tmp.path().join(".config/telepress.toml");
        fs::write(&xdg, "").unwrap();
        assert_eq!(locate_config(None, None, Some(tmp.path())), Some(xdg));

        let dot = tmp.path().join(".telepress.toml");
        fs::write(&dot, "").unwrap();
        assert_eq!(locate_config(None, None, Some(tmp.path())), Some(dot));
    }

    #[test]
    fn missing_explicit_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = load_raw_config(&tmp.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("nope.toml"));
    }

    #[test]
    fn invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        fs::write(&path, "this is not [valid toml").unwrap();
        assert!(matches!(load_raw_config(&path), Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // merge_toml
    // =========================================================================

    #[test]
    fn merge_toml_table_merge() {
        let base = parse("[upload]\nretries = 3\nmax_workers = 4\n");
        let overlay = parse("[upload]\nretries = 5\n");
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["upload"]["retries"].as_integer(), Some(5));
        assert_eq!(merged["upload"]["max_workers"].as_integer(), Some(4));
    }

    #[test]
    fn merge_toml_scalar_replaces_table() {
        let merged = merge_toml(parse("a = { b = 1 }"), parse("a = 2"));
        assert_eq!(merged["a"].as_integer(), Some(2));
    }

    // =========================================================================
    // Stock config
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config = resolve_config([parse(stock_config_toml())]).unwrap();
        assert_eq!(config, TelepressConfig::default());
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let toml = stock_config_toml();
        for section in ["[telegraph]", "[publish]", "[upload]", "[image_host]"] {
            assert!(toml.contains(section), "missing {section}");
        }
    }

    #[test]
    fn stock_defaults_value_is_table() {
        let value = stock_defaults_value().unwrap();
        assert!(value.get("publish").is_some_and(toml::Value::is_table));
        assert!(value.get("image_host").is_none());
    }

    #[test]
    fn cache_store_follows_skip_duplicate() {
        let mut publish = PublishConfig {
            cache_path: Some(PathBuf::from("/tmp/c.json")),
            ..PublishConfig::default()
        };
        assert_eq!(
            publish.cache_store().map(|s| s.path().to_path_buf()),
            Some(PathBuf::from("/tmp/c.json"))
        );
        publish.skip_duplicate = false;
        assert!(publish.cache_store().is_none());
    }
}
