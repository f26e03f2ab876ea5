// config.rs - Bot Configuration Module
// Loads botconfig.txt (KEY=VALUE) with multi-path fallback and builds the
// immutable settings used by the bot and the vv quote search command.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;

/// Locations searched for the bot configuration file, in order
pub const CONFIG_PATHS: [&str; 4] = [
    "botconfig.txt",
    "../botconfig.txt",
    "../../botconfig.txt",
    "src/botconfig.txt",
];

const TOKEN_PLACEHOLDER: &str = "YOUR_BOT_TOKEN_HERE";
const DEFAULT_PREFIX: &str = "^";

pub const DEFAULT_MAX_NUM: i64 = 10;
pub const DEFAULT_COOLDOWN_SECS: i64 = 30;
pub const DEFAULT_RETRY_TIMES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_SECS: f64 = 1.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No botconfig.txt file found in any expected location (., .., ../.., src/)")]
    NotFound,
    #[error("{0} not found in botconfig.txt")]
    Missing(&'static str),
    #[error("{0} in botconfig.txt is set to a placeholder value")]
    Placeholder(&'static str),
    #[error("Invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Parse KEY=VALUE lines, skipping blanks and `#` comments
pub fn parse_config_text(content: &str) -> HashMap<String, String> {
    // Remove BOM if present
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut config = HashMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(equals_pos) = line.find('=') {
            let key = line[..equals_pos].trim().to_string();
            let value = line[equals_pos + 1..].trim().to_string();
            config.insert(key, value);
        }
    }

    config
}

/// Read the first config file that exists among `paths`.
/// Returns the parsed map together with the path it came from.
pub fn load_config_map_from<P: AsRef<Path>>(
    paths: &[P],
) -> Result<(HashMap<String, String>, String), ConfigError> {
    for path in paths {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => return Ok((parse_config_text(&content), path.display().to_string())),
            Err(_) => continue,
        }
    }
    Err(ConfigError::NotFound)
}

pub fn load_config_map() -> Result<(HashMap<String, String>, String), ConfigError> {
    load_config_map_from(&CONFIG_PATHS)
}

/// Discord connection settings
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    pub prefix: String,
}

impl BotConfig {
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let token = map
            .get("DISCORD_TOKEN")
            .ok_or(ConfigError::Missing("DISCORD_TOKEN"))?
            .clone();
        if token.is_empty() || token == TOKEN_PLACEHOLDER {
            return Err(ConfigError::Placeholder("DISCORD_TOKEN"));
        }

        let prefix = map
            .get("PREFIX")
            .filter(|p| !p.is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string());

        Ok(Self { token, prefix })
    }
}

/// Settings of the vv quote search command. Built once at startup, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct VvQuestConfig {
    /// Upper bound on images per request, 1..=50
    pub max_num: u32,
    pub use_forward: bool,
    /// Custom search endpoint; empty means the public default
    pub api_base: String,
    pub cooldown: Duration,
    pub retry_times: u32,
    pub retry_delay: Duration,
}

impl Default for VvQuestConfig {
    fn default() -> Self {
        Self {
            max_num: clamp_max_num(DEFAULT_MAX_NUM),
            use_forward: true,
            api_base: String::new(),
            cooldown: Duration::from_secs(clamp_cooldown(DEFAULT_COOLDOWN_SECS)),
            retry_times: DEFAULT_RETRY_TIMES,
            retry_delay: Duration::from_secs_f64(DEFAULT_RETRY_DELAY_SECS),
        }
    }
}

pub fn clamp_max_num(value: i64) -> u32 {
    value.clamp(1, 50) as u32
}

pub fn clamp_cooldown(value: i64) -> u64 {
    value.clamp(1, 300) as u64
}

impl VvQuestConfig {
    /// Build from the `VVQUEST_*` keys of the config map. Absent keys keep
    /// their defaults; out-of-range numbers are clamped, unparseable ones rejected.
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = map.get("VVQUEST_MAX_NUM") {
            config.max_num = clamp_max_num(parse_int("VVQUEST_MAX_NUM", value)?);
        }
        if let Some(value) = map.get("VVQUEST_USE_FORWARD") {
            config.use_forward = parse_bool("VVQUEST_USE_FORWARD", value)?;
        }
        if let Some(value) = map.get("VVQUEST_API_BASE") {
            config.api_base = value.trim().to_string();
        }
        if let Some(value) = map.get("VVQUEST_COOLDOWN") {
            config.cooldown =
                Duration::from_secs(clamp_cooldown(parse_int("VVQUEST_COOLDOWN", value)?));
        }
        if let Some(value) = map.get("VVQUEST_RETRY_TIMES") {
            config.retry_times = value.parse().map_err(|e: std::num::ParseIntError| {
                invalid("VVQUEST_RETRY_TIMES", value, e.to_string())
            })?;
        }
        if let Some(value) = map.get("VVQUEST_RETRY_DELAY") {
            let secs: f64 = value.parse().map_err(|e: std::num::ParseFloatError| {
                invalid("VVQUEST_RETRY_DELAY", value, e.to_string())
            })?;
            config.retry_delay = Duration::try_from_secs_f64(secs)
                .map_err(|e| invalid("VVQUEST_RETRY_DELAY", value, e.to_string()))?;
        }

        Ok(config)
    }

    /// True when a custom endpoint was configured
    pub fn has_custom_api(&self) -> bool {
        !self.api_base.is_empty()
    }
}

fn invalid(key: &'static str, value: &str, reason: String) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason,
    }
}

fn parse_int(key: &'static str, value: &str) -> Result<i64, ConfigError> {
    value
        .parse::<i64>()
        .map_err(|e| invalid(key, value, e.to_string()))
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value, "expected true or false".to_string())),
    }
}
