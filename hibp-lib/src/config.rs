//! Configuration file parsing and management.
//!
//! Settings come from TOML files and `HIBP_*` environment variables. Both
//! layers are optional and only override what they set; callers apply them
//! on top of [`DispatchConfig::default`] in precedence order.

use crate::error::HibpError;
use crate::types::{DispatchConfig, MAX_CONCURRENCY};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration loaded from TOML files.
///
/// ```toml
/// [defaults]
/// concurrency = 20
/// timeout = "30s"
/// request_timeout = "5s"
/// json = false
///
/// [service]
/// base_url = "https://haveibeenpwned.com/api/v2/"
/// user_agent = "my-audit-tool"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Dispatch and output defaults
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Remote service settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceConfig>,
}

/// Default values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DefaultsConfig {
    /// Maximum concurrent queries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Batch deadline (as string, e.g. "10s", "2m")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Per-call HTTP timeout (as string, e.g. "5s", "500ms")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<String>,

    /// Emit JSON instead of text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,

    /// Print results as they complete
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streaming: Option<bool>,
}

/// Remote service settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServiceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl FileConfig {
    /// Overlay the values this file sets onto `config`.
    ///
    /// Assumes the file passed validation, so durations parse.
    pub fn apply_to(&self, mut config: DispatchConfig) -> DispatchConfig {
        if let Some(defaults) = &self.defaults {
            if let Some(concurrency) = defaults.concurrency {
                config = config.with_concurrency(concurrency);
            }
            if let Some(timeout) = defaults.timeout.as_deref().and_then(parse_duration_string) {
                config.timeout = timeout;
            }
            if let Some(timeout) = defaults
                .request_timeout
                .as_deref()
                .and_then(parse_duration_string)
            {
                config.request_timeout = timeout;
            }
        }

        if let Some(service) = &self.service {
            if let Some(base_url) = &service.base_url {
                config.base_url = base_url.clone();
            }
            if let Some(user_agent) = &service.user_agent {
                config.user_agent = user_agent.clone();
            }
        }

        config
    }
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to report which files were picked up
    pub verbose: bool,
}

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, HibpError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(HibpError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            HibpError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content)
            .map_err(|e| HibpError::config(format!("Failed to parse TOML configuration: {}", e)))?;

        self.validate_config(&config)?;

        debug!(path = %path.display(), "Loaded configuration file");

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config, then `$HOME`, then the current directory; later files win
    /// field by field. Files that fail to load are skipped with a warning.
    pub fn discover_and_load(&self) -> Result<FileConfig, HibpError> {
        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        Ok(self.load_and_merge(candidates.into_iter().flatten()))
    }

    /// Load each file in order, merging later files over earlier ones.
    fn load_and_merge<I>(&self, paths: I) -> FileConfig
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut merged_config = FileConfig::default();

        for path in paths {
            match self.load_file(&path) {
                Ok(config) => {
                    if self.verbose {
                        info!(path = %path.display(), "Using configuration file");
                    }
                    merged_config = self.merge_configs(merged_config, config);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping configuration file"),
            }
        }

        merged_config
    }

    /// Look for configuration files in the current directory.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./hibp.toml", "./.hibp.toml"]
            .into_iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Look for configuration files in the user's home directory.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".hibp.toml", "hibp.toml"]
            .into_iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// Follow the XDG Base Directory Specification.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("hibp").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations, with `higher` taking precedence field by field.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(mut lower_defaults), Some(higher_defaults)) => {
                    if higher_defaults.concurrency.is_some() {
                        lower_defaults.concurrency = higher_defaults.concurrency;
                    }
                    if higher_defaults.timeout.is_some() {
                        lower_defaults.timeout = higher_defaults.timeout;
                    }
                    if higher_defaults.request_timeout.is_some() {
                        lower_defaults.request_timeout = higher_defaults.request_timeout;
                    }
                    if higher_defaults.json.is_some() {
                        lower_defaults.json = higher_defaults.json;
                    }
                    if higher_defaults.streaming.is_some() {
                        lower_defaults.streaming = higher_defaults.streaming;
                    }
                    Some(lower_defaults)
                }
                (lower_defaults, higher_defaults) => higher_defaults.or(lower_defaults),
            },
            service: match (lower.service, higher.service) {
                (Some(mut lower_service), Some(higher_service)) => {
                    if higher_service.base_url.is_some() {
                        lower_service.base_url = higher_service.base_url;
                    }
                    if higher_service.user_agent.is_some() {
                        lower_service.user_agent = higher_service.user_agent;
                    }
                    Some(lower_service)
                }
                (lower_service, higher_service) => higher_service.or(lower_service),
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), HibpError> {
        if let Some(defaults) = &config.defaults {
            if let Some(concurrency) = defaults.concurrency {
                if concurrency == 0 || concurrency > MAX_CONCURRENCY {
                    return Err(HibpError::config(format!(
                        "Concurrency must be between 1 and {}",
                        MAX_CONCURRENCY
                    )));
                }
            }

            for (name, value) in [
                ("timeout", &defaults.timeout),
                ("request_timeout", &defaults.request_timeout),
            ] {
                if let Some(value) = value {
                    if parse_duration_string(value).is_none() {
                        return Err(HibpError::config(format!(
                            "Invalid {} format '{}'. Use format like '500ms', '5s', '2m'",
                            name, value
                        )));
                    }
                }
            }
        }

        if let Some(service) = &config.service {
            if let Some(base_url) = &service.base_url {
                if !is_http_url(base_url) {
                    return Err(HibpError::config(format!(
                        "Base URL '{}' must start with http:// or https://",
                        base_url
                    )));
                }
            }
            if let Some(user_agent) = &service.user_agent {
                if user_agent.trim().is_empty() {
                    return Err(HibpError::config("User agent cannot be empty"));
                }
            }
        }

        Ok(())
    }
}

/// Environment variable configuration that mirrors CLI options.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub concurrency: Option<usize>,
    pub timeout: Option<Duration>,
    pub request_timeout: Option<Duration>,
    pub base_url: Option<String>,
    pub user_agent: Option<String>,
    pub config: Option<String>,
}

impl EnvConfig {
    /// Overlay the values the environment sets onto `config`.
    pub fn apply_to(&self, mut config: DispatchConfig) -> DispatchConfig {
        if let Some(concurrency) = self.concurrency {
            config = config.with_concurrency(concurrency);
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(timeout) = self.request_timeout {
            config.request_timeout = timeout;
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(user_agent) = &self.user_agent {
            config.user_agent = user_agent.clone();
        }
        config
    }
}

/// Load configuration from `HIBP_*` environment variables.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    env_config_from(|key| env::var(key).ok())
}

fn env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    if let Some(val) = lookup("HIBP_CONCURRENCY") {
        match val.trim().parse::<usize>() {
            Ok(concurrency) if (1..=MAX_CONCURRENCY).contains(&concurrency) => {
                debug!(concurrency, "Using HIBP_CONCURRENCY");
                env_config.concurrency = Some(concurrency);
            }
            _ => warn!(value = %val, "Invalid HIBP_CONCURRENCY, must be 1-{}", MAX_CONCURRENCY),
        }
    }

    for (key, slot) in [
        ("HIBP_TIMEOUT", &mut env_config.timeout),
        ("HIBP_REQUEST_TIMEOUT", &mut env_config.request_timeout),
    ] {
        if let Some(val) = lookup(key) {
            match parse_duration_string(&val) {
                Some(duration) => {
                    debug!(key, ?duration, "Using timeout from environment");
                    *slot = Some(duration);
                }
                None => warn!(key, value = %val, "Invalid duration, use format like '5s', '2m'"),
            }
        }
    }

    if let Some(base_url) = lookup("HIBP_BASE_URL").filter(|v| !v.trim().is_empty()) {
        if is_http_url(&base_url) {
            debug!(base_url = %base_url, "Using HIBP_BASE_URL");
            env_config.base_url = Some(base_url);
        } else {
            warn!(value = %base_url, "Invalid HIBP_BASE_URL, must start with http:// or https://");
        }
    }

    if let Some(user_agent) = lookup("HIBP_USER_AGENT").filter(|v| !v.trim().is_empty()) {
        env_config.user_agent = Some(user_agent);
    }

    if let Some(config) = lookup("HIBP_CONFIG").filter(|v| !v.trim().is_empty()) {
        env_config.config = Some(config);
    }

    env_config
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Parse a duration string like "500ms", "5s", "2m" or a bare number of seconds.
pub fn parse_duration_string(value: &str) -> Option<Duration> {
    let value = value.trim().to_lowercase();

    if let Some(ms) = value.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = value.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = value.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        value.parse::<u64>().ok().map(Duration::from_secs)
    }
}
