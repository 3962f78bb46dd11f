use std::{collections::HashMap, fs, path::Path, time::Duration};

pub const DEFAULT_SETTINGS_FILE: &str = "server.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_bind: String,
    pub pacing: Pacing,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8000".into(),
            pacing: Pacing::default(),
        }
    }
}

/// How fast the scripted conversations play back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Wall-clock length of one scripted second.
    pub millis_per_second: u64,
    /// Upper bound on any single legacy-workflow delay, in scripted seconds.
    pub legacy_delay_cap_secs: u64,
    pub retention_interval_secs: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            millis_per_second: 1000,
            legacy_delay_cap_secs: 3,
            retention_interval_secs: 2,
        }
    }
}

impl Pacing {
    pub fn scaled(&self, secs: u64) -> Duration {
        Duration::from_millis(secs.saturating_mul(self.millis_per_second))
    }

    pub fn legacy_delay(&self, secs: u64) -> Duration {
        self.scaled(secs.min(self.legacy_delay_cap_secs))
    }

    pub fn retention_interval(&self) -> Duration {
        self.scaled(self.retention_interval_secs)
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE), |key| {
        std::env::var(key).ok()
    })
}

pub fn load_settings_from<F>(path: &Path, env: F) -> Settings
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.get("bind_addr").and_then(toml::Value::as_str) {
                    settings.server_bind = v.to_string();
                }
                let int = |key: &str| {
                    file_cfg
                        .get(key)
                        .and_then(toml::Value::as_integer)
                        .and_then(|v| u64::try_from(v).ok())
                };
                apply_pacing(&mut settings.pacing, int);
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "ignoring unparsable settings file");
            }
        }
    }

    if let Some(v) = env("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.server_bind = v;
    }
    apply_pacing(&mut settings.pacing, |key| {
        env(&format!("APP__{}", key.to_ascii_uppercase()))?
            .trim()
            .parse::<u64>()
            .ok()
    });

    settings
}

fn apply_pacing<F>(pacing: &mut Pacing, lookup: F)
where
    F: Fn(&str) -> Option<u64>,
{
    if let Some(v) = lookup("pace_millis_per_second") {
        pacing.millis_per_second = v;
    }
    if let Some(v) = lookup("legacy_delay_cap_secs") {
        pacing.legacy_delay_cap_secs = v;
    }
    if let Some(v) = lookup("retention_interval_secs") {
        pacing.retention_interval_secs = v;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
