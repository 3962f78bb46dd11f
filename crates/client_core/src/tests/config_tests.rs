use super::*;

use std::{
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn temp_settings_file(contents: &str) -> std::path::PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = env::temp_dir().join(format!("funnel_client_settings_{suffix}"));
    fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join("client.toml");
    fs::write(&path, contents).expect("write settings");
    path
}

#[test]
fn missing_file_and_env_yield_defaults() {
    let settings = load_settings_from(Path::new("/nonexistent/client.toml"), |_| None);
    assert_eq!(settings, ClientSettings::default());
    assert_eq!(settings.timings.typing_delay, Duration::from_millis(500));
    assert_eq!(settings.timings.simulate_cooldown, Duration::from_secs(8));
}

#[test]
fn file_values_apply_and_env_wins() {
    let path = temp_settings_file(
        "server_url = \"http://demo.local:9000\"\nmode = \"old\"\nhighlight_ms = 750\n",
    );

    let from_file = load_settings_from(&path, |_| None);
    assert_eq!(from_file.server_url, "http://demo.local:9000");
    assert_eq!(from_file.mode, UiMode::Legacy);
    assert_eq!(from_file.timings.highlight, Duration::from_millis(750));

    let overridden = load_settings_from(&path, |key| match key {
        "FUNNEL_MODE" => Some("assisted".to_string()),
        "FUNNEL_FLASH_MS" => Some("120".to_string()),
        _ => None,
    });
    assert_eq!(overridden.mode, UiMode::Assisted);
    assert_eq!(overridden.timings.flash, Duration::from_millis(120));
    assert_eq!(overridden.server_url, "http://demo.local:9000");

    if let Some(parent) = path.parent() {
        fs::remove_dir_all(parent).expect("cleanup");
    }
}

#[test]
fn unparsable_values_are_ignored() {
    let settings = load_settings_from(Path::new("/nonexistent/client.toml"), |key| match key {
        "FUNNEL_MODE" => Some("turbo".to_string()),
        "FUNNEL_TYPING_DELAY_MS" => Some("soon".to_string()),
        _ => None,
    });
    assert_eq!(settings.mode, UiMode::Assisted);
    assert_eq!(settings.timings.typing_delay, Duration::from_millis(500));
}
