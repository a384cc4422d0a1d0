use crate::error::{ErrorContext, Result};
use crate::types::{
    DnsFuzzerError, OutputConfig, OutputFormat, RunConfig, DEFAULT_DNS_PORT, DEFAULT_TIMEOUT_SECS,
    DEFAULT_WORKERS,
};
use serde::Deserialize;
use std::env;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_RESOLVER: &str = "DNSFUZZER_RESOLVER";
pub const ENV_WORKERS: &str = "DNSFUZZER_WORKERS";
pub const ENV_TIMEOUT: &str = "DNSFUZZER_TIMEOUT";

/// Raw, unvalidated settings. Numbers stay signed so that bad values from
/// any layer reach validation instead of failing to parse.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub domain: Option<String>,
    pub resolver: Option<String>,
    pub workers: i64,
    pub timeout: i64,
    pub show_failures: bool,
    pub output: FileOutputSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FileOutputSettings {
    pub format: OutputFormat,
    pub file: Option<PathBuf>,
}

impl Default for FileOutputSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            file: None,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            domain: None,
            resolver: None,
            workers: DEFAULT_WORKERS,
            timeout: DEFAULT_TIMEOUT_SECS,
            show_failures: false,
            output: FileOutputSettings::default(),
        }
    }
}

impl Settings {
    /// Checks every precondition of a run and freezes the result.
    pub fn validate(&self) -> Result<RunConfig> {
        let domain = self
            .domain
            .as_deref()
            .ok_or_else(|| DnsFuzzerError::ConfigError("A target domain is required".to_string()))?;

        if self.workers < 1 {
            return Err(DnsFuzzerError::ConfigError(format!(
                "Worker count must be at least 1 (got {})",
                self.workers
            )));
        }
        if self.timeout < 1 {
            return Err(DnsFuzzerError::ConfigError(format!(
                "Timeout must be a positive number of seconds (got {})",
                self.timeout
            )));
        }

        RunConfig::new(
            domain,
            self.resolver.as_deref(),
            self.workers as usize,
            Duration::from_secs(self.timeout as u64),
        )
    }

    pub fn output_config(&self) -> OutputConfig {
        OutputConfig {
            format: self.output.format.clone(),
            file: self.output.file.clone(),
            show_failures: self.show_failures,
            ..OutputConfig::default()
        }
    }
}

/// Accepts `1.1.1.1`, `1.1.1.1:5353`, `::1`, `[::1]` and `[::1]:5353`.
pub fn parse_resolver_addr(input: &str) -> Result<SocketAddr> {
    if let Ok(addr) = input.parse::<SocketAddr>() {
        return Ok(addr);
    }

    let bare = input.trim_start_matches('[').trim_end_matches(']');
    bare.parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, DEFAULT_DNS_PORT))
        .map_err(|_| DnsFuzzerError::InvalidResolver(input.to_string()))
}

/// Defaults, then the TOML file if one is given, then the environment.
pub fn load_config(config_path: Option<&Path>) -> Result<Settings> {
    let mut settings = match config_path {
        Some(path) => load_file(path)?,
        None => Settings::default(),
    };

    apply_env_overrides(&mut settings, |key| env::var(key).ok())?;
    Ok(settings)
}

fn load_file(path: &Path) -> Result<Settings> {
    let contents = fs::read_to_string(path)
        .config_context(|| format!("Failed to read config file {}", path.display()))?;

    toml::from_str(&contents).config_context(|| format!("Failed to parse config file {}", path.display()))
}

pub fn apply_env_overrides<F>(settings: &mut Settings, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(resolver) = lookup(ENV_RESOLVER) {
        settings.resolver = Some(resolver.trim().to_string());
    }
    if let Some(workers) = lookup(ENV_WORKERS) {
        settings.workers = workers.trim().parse::<i64>().config_context(|| ENV_WORKERS.to_string())?;
    }
    if let Some(timeout) = lookup(ENV_TIMEOUT) {
        settings.timeout = timeout.trim().parse::<i64>().config_context(|| ENV_TIMEOUT.to_string())?;
    }
    Ok(())
}
