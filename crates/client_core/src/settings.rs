//! Client configuration: defaults, then `mailer.toml`, then environment.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{error::SettingsError, messages::Locale};

pub const DEFAULT_SETTINGS_FILE: &str = "mailer.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub server_url: String,
    /// Sent verbatim as the `Cookie` header.
    pub session_cookie: Option<String>,
    pub bearer_token: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub locale: Locale,
    pub refresh_quota_on_open: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".into(),
            session_cookie: None,
            bearer_token: None,
            request_timeout_secs: None,
            locale: Locale::default(),
            refresh_quota_on_open: false,
        }
    }
}

/// Loads settings from `path` (or `mailer.toml` in the working directory) and
/// the process environment.
pub fn load_settings(path: Option<&Path>) -> Result<ClientSettings, SettingsError> {
    let explicit = path.is_some();
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));
    load_settings_with(&path, explicit, |key| std::env::var(key).ok())
}

/// A missing file is an error only when it was named explicitly.
pub fn load_settings_with<F>(
    path: &Path,
    required: bool,
    env: F,
) -> Result<ClientSettings, SettingsError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = match fs::read_to_string(path) {
        Ok(raw) => toml::from_str::<ClientSettings>(&raw).map_err(|source| {
            SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?,
        Err(err) if err.kind() == ErrorKind::NotFound && !required => ClientSettings::default(),
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if let Some(v) = lookup(&env, &["MAILER_SERVER_URL", "APP__SERVER_URL"]) {
        settings.server_url = v;
    }
    if let Some(v) = lookup(&env, &["MAILER_SESSION_COOKIE", "APP__SESSION_COOKIE"]) {
        settings.session_cookie = Some(v);
    }
    if let Some(v) = lookup(&env, &["MAILER_BEARER_TOKEN", "APP__BEARER_TOKEN"]) {
        settings.bearer_token = Some(v);
    }
    if let Some(v) = lookup(
        &env,
        &["MAILER_REQUEST_TIMEOUT_SECS", "APP__REQUEST_TIMEOUT_SECS"],
    ) {
        let secs = v
            .trim()
            .parse::<u64>()
            .map_err(|_| SettingsError::InvalidValue {
                key: "request_timeout_secs",
                value: v.clone(),
            })?;
        settings.request_timeout_secs = Some(secs);
    }
    if let Some(v) = lookup(&env, &["MAILER_LOCALE", "APP__LOCALE"]) {
        settings.locale = v.parse().map_err(|_| SettingsError::InvalidValue {
            key: "locale",
            value: v.clone(),
        })?;
    }
    if let Some(v) = lookup(
        &env,
        &["MAILER_REFRESH_QUOTA_ON_OPEN", "APP__REFRESH_QUOTA_ON_OPEN"],
    ) {
        settings.refresh_quota_on_open = parse_bool(&v).ok_or(SettingsError::InvalidValue {
            key: "refresh_quota_on_open",
            value: v.clone(),
        })?;
    }

    Ok(settings)
}

// Later keys win, so `APP__*` overrides `MAILER_*`.
fn lookup<F>(env: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .filter_map(|key| env(*key))
        .filter(|v| !v.is_empty())
        .last()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
