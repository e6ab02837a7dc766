use super::{apply_overrides, parse_daily_limit, Settings};

use std::collections::HashMap;

fn file(raw: &str) -> HashMap<String, toml::Value> {
    toml::from_str(raw).expect("toml")
}

#[test]
fn parses_daily_limit_values() {
    assert_eq!(parse_daily_limit("25"), Some(Some(25)));
    assert_eq!(parse_daily_limit(" Unlimited "), Some(None));
    assert_eq!(parse_daily_limit("none"), Some(None));
    assert_eq!(parse_daily_limit("-1"), None);
    assert_eq!(parse_daily_limit("many"), None);
}

#[test]
fn file_values_override_defaults() {
    let cfg = file(
        r#"
bind_addr = "0.0.0.0:9000"
daily_limit = 3
"#,
    );
    let settings = apply_overrides(Settings::default(), Some(&cfg), |_| None);
    assert_eq!(settings.server_bind, "0.0.0.0:9000");
    assert_eq!(settings.daily_limit, Some(3));
}

#[test]
fn environment_wins_over_file() {
    let cfg = file(r#"daily_limit = "unlimited""#);
    let settings = apply_overrides(Settings::default(), Some(&cfg), |key| match key {
        "SERVER_BIND" => Some("127.0.0.1:1".to_string()),
        "APP__BIND_ADDR" => Some("127.0.0.1:2".to_string()),
        "APP__DAILY_LIMIT" => Some("5".to_string()),
        _ => None,
    });
    assert_eq!(settings.server_bind, "127.0.0.1:2");
    assert_eq!(settings.daily_limit, Some(5));
}

#[test]
fn unparseable_limit_keeps_previous_value() {
    let settings = apply_overrides(Settings::default(), None, |key| {
        (key == "APP__DAILY_LIMIT").then(|| "lots".to_string())
    });
    assert_eq!(settings, Settings::default());
}
