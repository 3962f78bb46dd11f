use std::{collections::HashMap, fs, path::Path, time::Duration};

use shared::domain::UiMode;

pub const DEFAULT_SETTINGS_FILE: &str = "client.toml";

/// Durations of the cosmetic timers the session schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Delay before the typing indicator reappears after a patient message.
    pub typing_delay: Duration,
    pub highlight: Duration,
    pub flash: Duration,
    /// Window during which the lead-simulation trigger stays disabled.
    pub simulate_cooldown: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            typing_delay: Duration::from_millis(500),
            highlight: Duration::from_millis(2000),
            flash: Duration::from_millis(500),
            simulate_cooldown: Duration::from_millis(8000),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub server_url: String,
    pub mode: UiMode,
    pub timings: Timings,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".into(),
            mode: UiMode::default(),
            timings: Timings::default(),
        }
    }
}

pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE), |key| {
        std::env::var(key).ok()
    })
}

/// Defaults, then the flat TOML file at `path` if it parses, then environment
/// overrides looked up through `env`.
pub fn load_settings_from<F>(path: &Path, env: F) -> ClientSettings
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            Ok(file_cfg) => {
                let file_cfg: HashMap<String, String> = file_cfg
                    .into_iter()
                    .filter_map(|(key, value)| scalar_to_string(value).map(|v| (key, v)))
                    .collect();
                apply_overrides(&mut settings, |key| file_cfg.get(key).cloned());
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "ignoring unparsable settings file");
            }
        }
    }

    apply_overrides(&mut settings, |key| env(&format!("FUNNEL_{}", key.to_ascii_uppercase())));
    settings
}

fn apply_overrides<F>(settings: &mut ClientSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("server_url") {
        settings.server_url = v;
    }
    if let Some(mode) = lookup("mode").as_deref().and_then(UiMode::parse) {
        settings.mode = mode;
    }
    if let Some(ms) = lookup_millis(&lookup, "typing_delay_ms") {
        settings.timings.typing_delay = ms;
    }
    if let Some(ms) = lookup_millis(&lookup, "highlight_ms") {
        settings.timings.highlight = ms;
    }
    if let Some(ms) = lookup_millis(&lookup, "flash_ms") {
        settings.timings.flash = ms;
    }
    if let Some(ms) = lookup_millis(&lookup, "simulate_cooldown_ms") {
        settings.timings.simulate_cooldown = ms;
    }
}

fn lookup_millis<F>(lookup: &F, key: &str) -> Option<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_millis)
}

fn scalar_to_string(value: toml::Value) -> Option<String> {
    match value {
        toml::Value::String(v) => Some(v),
        toml::Value::Integer(v) => Some(v.to_string()),
        toml::Value::Boolean(v) => Some(v.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
