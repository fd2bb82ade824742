use std::fs;

use quietbrowser::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use quietbrowser::types::errors::SettingsError;
use quietbrowser::types::settings::BrowserSettings;
use tempfile::TempDir;

fn engine_in_temp() -> (TempDir, SettingsEngine) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("settings.json");
    let engine = SettingsEngine::new(Some(path.to_string_lossy().to_string()));
    (dir, engine)
}

#[test]
fn test_defaults_match_documented_toggles() {
    let settings = BrowserSettings::default();
    assert!(settings.privacy.content_blocking);
    assert!(settings.privacy.canvas_protection);
    assert!(settings.privacy.https_upgrade);
    assert!(settings.privacy.ephemeral_storage);
    assert_eq!(settings.general.new_tab_url, "http://start/");
    assert_eq!(settings.general.search_url, "https://duckduckgo.com/?q=");
    assert_eq!((settings.window.width, settings.window.height), (1200, 800));
    assert_eq!((settings.window.min_width, settings.window.min_height), (1024, 768));
}

#[test]
fn test_set_value_persists_across_engines() {
    let (_dir, mut engine) = engine_in_temp();
    engine.load().unwrap();
    engine
        .set_value("privacy.https_upgrade", serde_json::json!(false))
        .unwrap();
    engine
        .set_value("general.search_url", serde_json::json!("https://search.example/?q="))
        .unwrap();

    let mut reloaded = SettingsEngine::new(Some(engine.get_config_path().to_string()));
    let settings = reloaded.load().unwrap();
    assert!(!settings.privacy.https_upgrade);
    assert_eq!(settings.general.search_url, "https://search.example/?q=");
}

#[test]
fn test_save_creates_parent_directories() {
    let (_dir, engine) = engine_in_temp();
    engine.save().unwrap();
    assert!(fs::metadata(engine.get_config_path()).unwrap().is_file());
}

#[test]
fn test_reset_restores_defaults_on_disk() {
    let (_dir, mut engine) = engine_in_temp();
    engine.set_value("window.height", serde_json::json!(900)).unwrap();
    engine.reset().unwrap();

    assert_eq!(*engine.get_settings(), BrowserSettings::default());
    let mut reloaded = SettingsEngine::new(Some(engine.get_config_path().to_string()));
    assert_eq!(reloaded.load().unwrap(), BrowserSettings::default());
}

#[test]
fn test_unknown_keys_are_rejected() {
    let (_dir, mut engine) = engine_in_temp();
    for key in ["", "privacy.telemetry", "nope.width", "window.width.px"] {
        let result = engine.set_value(key, serde_json::json!(1));
        assert!(matches!(result, Err(SettingsError::InvalidKey(_))), "key {:?}", key);
    }
    assert_eq!(*engine.get_settings(), BrowserSettings::default());
}

#[test]
fn test_wrong_value_type_is_rejected() {
    let (_dir, mut engine) = engine_in_temp();
    let result = engine.set_value("privacy.content_blocking", serde_json::json!("yes"));
    assert!(matches!(result, Err(SettingsError::InvalidValue(_))));
    assert!(engine.get_settings().privacy.content_blocking);
}

#[test]
fn test_malformed_file_is_serialization_error() {
    let (_dir, mut engine) = engine_in_temp();
    let path = std::path::PathBuf::from(engine.get_config_path());
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "[1, 2").unwrap();

    assert!(matches!(engine.load(), Err(SettingsError::SerializationError(_))));
}
