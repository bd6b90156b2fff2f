//! `set` / `unset` support for config keys.

use std::fmt;

use crate::core::config::data::{parse_timezone, Config};

pub const KEYS: &[&str] = &["endpoint", "default-model", "context", "user-name", "timezone", "timeout"];

/// Errors that can occur when modifying configuration settings.
#[derive(Debug, PartialEq, Eq)]
pub enum SettingError {
    /// The provided setting key is not recognized.
    UnknownKey(String),
    /// The provided value could not be parsed as a boolean.
    InvalidBoolean(String),
    /// The provided value could not be parsed as a number of seconds.
    InvalidNumber(String),
    /// The provided value is not a known IANA timezone.
    InvalidTimezone(String),
    /// A value is required for this key.
    MissingValue(&'static str),
}

impl fmt::Display for SettingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingError::UnknownKey(key) => {
                write!(f, "Unknown config key: {key} (known keys: {})", KEYS.join(", "))
            }
            SettingError::InvalidBoolean(input) => write!(
                f,
                "Invalid boolean value: {input}. Use 'on' or 'off' (also accepts true/false, yes/no)"
            ),
            SettingError::InvalidNumber(input) => {
                write!(f, "Invalid number of seconds: {input}")
            }
            SettingError::InvalidTimezone(input) => {
                write!(f, "Unknown timezone: {input} (use an IANA name like America/Montreal)")
            }
            SettingError::MissingValue(key) => write!(f, "A value is required for {key}"),
        }
    }
}

impl std::error::Error for SettingError {}

fn parse_bool(input: &str) -> Result<bool, SettingError> {
    match input.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => Err(SettingError::InvalidBoolean(input.to_string())),
    }
}

impl Config {
    /// Apply `key = value`. Returns a confirmation line for the user.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<String, SettingError> {
        let value = value.trim();
        let key = key.trim().to_ascii_lowercase();
        if value.is_empty() {
            return Err(match KEYS.iter().copied().find(|known| *known == key) {
                Some(known) => SettingError::MissingValue(known),
                None => SettingError::UnknownKey(key),
            });
        }

        match key.as_str() {
            "endpoint" => self.endpoint = Some(value.to_string()),
            "default-model" => self.default_model = Some(value.to_string()),
            "context" => self.inject_context = Some(parse_bool(value)?),
            "user-name" => self.user_name = Some(value.to_string()),
            "timezone" => {
                let tz = parse_timezone(value)
                    .ok_or_else(|| SettingError::InvalidTimezone(value.to_string()))?;
                self.timezone = Some(tz.name().to_string());
            }
            "timeout" => {
                let secs = value
                    .parse::<u64>()
                    .map_err(|_| SettingError::InvalidNumber(value.to_string()))?;
                self.timeout_secs = Some(secs);
            }
            _ => return Err(SettingError::UnknownKey(key)),
        }
        Ok(format!("✅ Set {key} to: {value}"))
    }

    pub fn unset_value(&mut self, key: &str) -> Result<String, SettingError> {
        let key = key.trim().to_ascii_lowercase();
        match key.as_str() {
            "endpoint" => self.endpoint = None,
            "default-model" => self.default_model = None,
            "context" => self.inject_context = None,
            "user-name" => self.user_name = None,
            "timezone" => self.timezone = None,
            "timeout" => self.timeout_secs = None,
            _ => return Err(SettingError::UnknownKey(key)),
        }
        Ok(format!("✅ Unset {key}"))
    }
}
