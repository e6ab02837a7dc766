use std::{collections::HashMap, fs};

use serde::Deserialize;

pub const DEFAULT_DAILY_LIMIT: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    /// `None` means unlimited.
    pub daily_limit: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            daily_limit: Some(DEFAULT_DAILY_LIMIT),
        }
    }
}

pub fn load_settings() -> Settings {
    let file_cfg = fs::read_to_string("server.toml")
        .ok()
        .and_then(|raw| toml::from_str::<HashMap<String, toml::Value>>(&raw).ok());
    apply_overrides(Settings::default(), file_cfg.as_ref(), |key| {
        std::env::var(key).ok()
    })
}

fn apply_overrides<F>(
    mut settings: Settings,
    file_cfg: Option<&HashMap<String, toml::Value>>,
    env: F,
) -> Settings
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(file_cfg) = file_cfg {
        if let Some(v) = file_cfg.get("bind_addr").and_then(toml::Value::as_str) {
            settings.server_bind = v.to_string();
        }
        match file_cfg.get("daily_limit") {
            Some(toml::Value::Integer(n)) => {
                if let Ok(n) = u32::try_from(*n) {
                    settings.daily_limit = Some(n);
                }
            }
            Some(toml::Value::String(raw)) => {
                if let Some(limit) = parse_daily_limit(raw) {
                    settings.daily_limit = limit;
                }
            }
            _ => {}
        }
    }

    if let Some(v) = env("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = env("APP__DAILY_LIMIT") {
        if let Some(limit) = parse_daily_limit(&v) {
            settings.daily_limit = limit;
        }
    }

    settings
}

/// `"unlimited"` or `"none"` lift the limit; anything else must be a count.
pub fn parse_daily_limit(raw: &str) -> Option<Option<u32>> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("unlimited") || raw.eq_ignore_ascii_case("none") {
        return Some(None);
    }
    raw.parse::<u32>().ok().map(Some)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
