use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Base URL of a local Ollama server.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "gemma2:9b";

pub const ENDPOINT_ENV: &str = "PROMPTSTREAM_ENDPOINT";
pub const MODEL_ENV: &str = "PROMPTSTREAM_MODEL";

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Server base URL, or the full chat URL
    pub endpoint: Option<String>,
    pub default_model: Option<String>,
    /// Prefix prompts with the date, time and user name
    pub inject_context: Option<bool>,
    pub user_name: Option<String>,
    /// IANA zone for the context preamble clock, e.g. `America/Montreal`
    pub timezone: Option<String>,
    /// Connect timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Settings after flags, environment and file have been merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub endpoint: String,
    pub model: String,
    pub inject_context: bool,
    pub user_name: Option<String>,
    /// `None` means the system's local zone.
    pub timezone: Option<Tz>,
    pub connect_timeout: Option<Duration>,
}

/// Values given on the command line; they win over everything else.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub inject_context: bool,
}

impl Config {
    /// Merge `overrides`, then `env`, then the file, then built-in defaults.
    ///
    /// `env` is a lookup so tests need not touch the process environment.
    pub fn resolve<F>(&self, overrides: &Overrides, env: F) -> ResolvedConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let endpoint = non_empty(overrides.endpoint.clone())
            .or_else(|| non_empty(env(ENDPOINT_ENV)))
            .or_else(|| self.endpoint.clone())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let model = non_empty(overrides.model.clone())
            .or_else(|| non_empty(env(MODEL_ENV)))
            .or_else(|| self.default_model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let timezone = self.timezone.as_deref().and_then(|name| {
            let tz = parse_timezone(name);
            if tz.is_none() {
                warn!(timezone = name, "unknown timezone in config; using local time");
            }
            tz
        });

        ResolvedConfig {
            endpoint,
            model,
            inject_context: overrides.inject_context || self.inject_context.unwrap_or(false),
            user_name: self.user_name.clone(),
            timezone,
            connect_timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Look up an IANA zone name such as `Europe/Paris`.
pub fn parse_timezone(name: &str) -> Option<Tz> {
    name.trim().parse::<Tz>().ok()
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
